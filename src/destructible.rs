//! Data baked from a fractured geometry collection for GPU-driven destruction.
//!
//! The destruction driver renders every fragment of a collection with a single
//! mesh (see [`crate::conversion::combine_bones`]) and moves fragments by
//! looking up their rest location in a texture indexed by the bone UV channel.

use crate::math::{Point3, Vector3};
use crate::shape::GeometryCollection;

/// The smallest power of two greater than or equal to `n`, or `2` if `n <= 0`.
pub fn nearest_bigger_power_of_two(n: i32) -> i32 {
    if n <= 0 {
        2
    } else {
        (n as u32).next_power_of_two() as i32
    }
}

/// The side of the square render target storing one texel per bone.
pub fn bone_texture_size(bone_count: usize) -> i32 {
    nearest_bigger_power_of_two((bone_count as f32).sqrt().round() as i32)
}

/// Builds the material slots of the combined render mesh.
///
/// The last material of a collection is the selection material: it is dropped
/// unless some face of the collection uses it. If `odd_materials_are_internal`
/// is `true`, each material `i` fills the slots `2i` and `2i + 1`, matching
/// [`crate::conversion::remap_material`].
pub fn build_material_slots<T: Clone>(
    materials: &[T],
    used_material_ids: &[i32],
    odd_materials_are_internal: bool,
) -> Vec<T> {
    let last_used = materials
        .len()
        .checked_sub(1)
        .map(|last| used_material_ids.iter().any(|id| *id >= 0 && *id as usize == last))
        .unwrap_or(true);
    let num_kept = if last_used {
        materials.len()
    } else {
        materials.len() - 1
    };

    let kept = &materials[..num_kept];
    if odd_materials_are_internal {
        kept.iter().flat_map(|m| [m.clone(), m.clone()]).collect()
    } else {
        kept.to_vec()
    }
}

/// The rest location of each fragment, relative to the collection bounds.
///
/// The location of a geometry is the area-weighted average of the centroids of
/// its faces, in the collection space, divided component-wise by the half extents
/// of the collection bounds. Components of degenerate extents are zero. A geometry
/// without area is located at the origin.
pub fn fragment_centroids(collection: &GeometryCollection) -> Vec<Vector3<f32>> {
    let global_transforms = collection.global_transforms();
    let half_extents = collection.bounding_box().half_extents().cast::<f32>();

    (0..collection.num_geometries())
        .map(|g| {
            let transform = &global_transforms[collection.transform_index[g]];
            let start = collection.face_start[g];
            let mut centroid = Vector3::zeros();
            let mut total_area = 0.0;

            for tri in &collection.indices[start..start + collection.face_count[g]] {
                let [a, b, c]: [Point3<f32>; 3] =
                    tri.map(|vid| transform * collection.vertices[vid as usize]);
                let area = 0.5 * (b - a).cross(&(c - a)).norm();
                centroid += (a.coords + b.coords + c.coords) * (area / 3.0);
                total_area += area;
            }

            if total_area > f32::EPSILON {
                centroid /= total_area;
            }

            centroid.zip_map(&half_extents, |x, extent| {
                if extent > f32::EPSILON {
                    x / extent
                } else {
                    0.0
                }
            })
        })
        .collect()
}

/// Encodes a location with components in `[-1, 1]` as a BGRA8 texel.
///
/// The color channels store the magnitudes (saturating) and the alpha channel the
/// signs: bit `1` for a negative `x`, `2` for `y` and `4` for `z`.
pub fn encode_location_texel(location: &Vector3<f32>) -> [u8; 4] {
    let sign_flags = (location.x < 0.0) as u8
        | ((location.y < 0.0) as u8) << 1
        | ((location.z < 0.0) as u8) << 2;
    [
        (location.z.abs() * 255.0) as u8,
        (location.y.abs() * 255.0) as u8,
        (location.x.abs() * 255.0) as u8,
        sign_flags,
    ]
}

/// The BGRA8 texels of the bone location texture: one texel per geometry, in a
/// texture one texel high.
pub fn bone_location_texels(collection: &GeometryCollection) -> Vec<[u8; 4]> {
    let texels: Vec<_> = fragment_centroids(collection)
        .iter()
        .map(encode_location_texel)
        .collect();

    for (i, texel) in texels.iter().enumerate() {
        log::trace!("Bone {} location texel (BGRA): {:?}", i, texel);
    }

    texels
}
