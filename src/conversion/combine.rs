//! Merging of the bones of a geometry collection into a single render mesh.

use crate::conversion::mesh_collection::{CollectionImportFlags, DynamicMeshCollection, UpdateError};
use crate::math::Isometry;
use crate::shape::{DynamicMesh, GeometryCollection, MAX_NUM_UV_CHANNELS};

/// The material slot of a triangle when every material gets one slot for its
/// authored faces and one for its fractured faces.
#[inline]
pub fn remap_material(material_id: i32, internal: bool) -> i32 {
    material_id * 2 + internal as i32
}

/// Combines the geometry of every bone but the root one into a single mesh, in the
/// collection space.
///
/// The root bone (transform `0`) holds the unfractured mesh and is skipped. The
/// result carries the UV layers of the collection followed by the bone UV channel
/// identifying the fragment of each vertex. If `odd_materials_are_internal` is
/// `true`, material identifiers are remapped with [`remap_material`].
pub fn combine_bones(
    collection: &GeometryCollection,
    odd_materials_are_internal: bool,
) -> Result<DynamicMesh, UpdateError> {
    let transform_indices: Vec<_> = (1..collection.num_transforms()).collect();
    let mut meshes = DynamicMeshCollection::init(
        collection,
        &collection.transforms,
        &transform_indices,
        &Isometry::identity(),
        CollectionImportFlags::empty(),
    )?;

    let mut combined = DynamicMesh::new();
    combined.augment((collection.num_uv_layers() + 1).min(MAX_NUM_UV_CHANNELS));

    for data in &mut meshes.meshes {
        let mesh = data.mesh_mut();
        if odd_materials_are_internal {
            let tids: Vec<_> = mesh.triangle_ids().collect();
            for tid in tids {
                let attrs = mesh.triangle_attributes(tid)?;
                mesh.set_material_id(tid, remap_material(attrs.material_id, attrs.internal))?;
            }
        }

        let _ = combined.append_mesh(mesh);
    }

    log::debug!(
        "Combined {} bones into a mesh with {} triangles.",
        meshes.meshes.len(),
        combined.triangle_count()
    );
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Color, Isometry3, Point3, Real, Vector2};

    #[test]
    fn material_slots_interleave_internal_faces() {
        assert_eq!(remap_material(0, false), 0);
        assert_eq!(remap_material(0, true), 1);
        assert_eq!(remap_material(3, true), 7);
    }

    #[test]
    fn root_bone_is_skipped() {
        let mut collection = GeometryCollection::new();
        let triangle = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let white = Color::new(1.0, 1.0, 1.0, 1.0);
        let _ = collection
            .append_geometry(Isometry3::identity(), None, &triangle, &[[0, 1, 2]], white)
            .unwrap();
        for x in [2.0, 4.0] {
            let _ = collection
                .append_geometry(
                    Isometry3::translation(x, 0.0, 0.0),
                    Some(0),
                    &triangle,
                    &[[0, 1, 2]],
                    white,
                )
                .unwrap();
        }
        collection.internal[2] = true;
        collection.material_ids[2] = 1;

        let combined = combine_bones(&collection, true).unwrap();
        assert_eq!(combined.triangle_count(), 2);
        assert_eq!(combined.vertex_count(), 6);
        assert_eq!(combined.num_uv_channels(), 1);
        assert_eq!(combined.material_id(0), Ok(0));
        assert_eq!(combined.material_id(1), Ok(3));

        // Vertices are in the collection space and carry their bone UV.
        assert_relative_eq!(combined.vertex(3).x, 4.0 as Real);
        assert_eq!(combined.vertex_uv(0, 0), Ok(Vector2::new(1.0 / 3.0, 0.0)));
        assert_eq!(combined.vertex_uv(3, 0), Ok(Vector2::new(2.0 / 3.0, 0.0)));
    }
}
