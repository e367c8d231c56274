//! Extraction of augmented meshes from a geometry collection, and writeback of the
//! processed meshes.

use crate::bounding_volume::Aabb;
use crate::conversion::collision_samples::add_collision_samples_per_component;
use crate::conversion::split_islands::split_islands;
use crate::conversion::vertex_colors::set_unset_colors;
use crate::math::{Isometry, Isometry3, Real, Vector2};
use crate::shape::{
    AppendTriangleError, AttributeError, CollectionError, DynamicMesh, GeometryCollection,
    MaterialRole, SimulationType, TriangleAttributes, VertexAttributes, INVALID_ID,
    MAX_NUM_UV_CHANNELS,
};
use crate::utils::{PointHashGrid, NEIGHBOR_DISTANCE};
use core::cell::OnceCell;

#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
/// Controls how the meshes of a [`DynamicMeshCollection`] are extracted.
pub struct CollectionImportFlags(u8);

bitflags::bitflags! {
    impl CollectionImportFlags: u8 {
        /// If set, invisible faces are not extracted.
        const SKIP_INVISIBLE = 1;
        /// If set, the transforms given to [`DynamicMeshCollection::init`] are already
        /// relative to the collection space, so the bone hierarchy is not walked.
        const COMPONENT_SPACE_TRANSFORMS = 1 << 1;
        /// If set, vertices not referenced by any extracted face are kept.
        const SAVE_ISOLATED_VERTICES = 1 << 2;
    }
}

/// What happens to a geometry replaced by its islands in [`DynamicMeshCollection::split_all_islands`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ReplacedGeometry {
    /// The faces of the replaced geometry are hidden.
    #[default]
    Hide,
    /// The replaced geometry is removed from the collection. Its bone is kept.
    Remove,
}

/// Errors raised when moving meshes in and out of a geometry collection.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum UpdateError {
    /// The mesh does not have as many vertices and triangles as the geometry it should overwrite.
    #[error("the geometry {geometry} has {expected_vertices} vertices and {expected_faces} faces but the mesh has {vertices} vertices and {triangles} triangles.")]
    CountMismatch {
        /// The geometry that should have been overwritten.
        geometry: usize,
        /// The number of vertices of the geometry.
        expected_vertices: usize,
        /// The number of faces of the geometry.
        expected_faces: usize,
        /// The number of vertices of the mesh.
        vertices: usize,
        /// The number of triangles of the mesh.
        triangles: usize,
    },
    /// The mesh does not carry the augmented attribute set.
    #[error("the mesh does not carry the augmented attribute set.")]
    NotAugmented,
    /// The geometry index is out of bounds, or the bone has no geometry.
    #[error("the geometry index {0} is out of bounds.")]
    InvalidGeometry(usize),
    /// The collection rejected an operation.
    #[error(transparent)]
    Collection(#[from] CollectionError),
    /// An attribute of the mesh could not be accessed.
    #[error(transparent)]
    Attribute(#[from] AttributeError),
}

/// One mesh extracted from a bone of a geometry collection.
#[derive(Clone, Debug)]
pub struct MeshData {
    mesh: DynamicMesh,
    /// The bone the mesh was extracted from.
    pub transform_index: usize,
    /// The transformation from the collection space to the space of the mesh.
    pub from_collection: Isometry<Real>,
    bounds: OnceCell<Aabb>,
}

impl MeshData {
    /// Wraps a mesh extracted from the bone `transform_index`.
    pub fn new(mesh: DynamicMesh, transform_index: usize, from_collection: Isometry<Real>) -> Self {
        Self {
            mesh,
            transform_index,
            from_collection,
            bounds: OnceCell::new(),
        }
    }

    /// The mesh.
    pub fn mesh(&self) -> &DynamicMesh {
        &self.mesh
    }

    /// Mutable access to the mesh. Invalidates the cached bounds.
    pub fn mesh_mut(&mut self) -> &mut DynamicMesh {
        let _ = self.bounds.take();
        &mut self.mesh
    }

    /// The bounding box of the mesh, in the space of the mesh.
    pub fn bounds(&self) -> Aabb {
        *self.bounds.get_or_init(|| self.mesh.bounds())
    }

    /// Checks if two meshes touch each other in the collection space.
    ///
    /// The meshes are neighbors if their bounds intersect and a vertex of the mesh
    /// with fewer vertices lies within a tiny distance from a vertex of the other one.
    pub fn is_neighboring(&self, other: &MeshData) -> bool {
        let to_collection = [self.from_collection.inverse(), other.from_collection.inverse()];
        if !self
            .bounds()
            .transform_by(&to_collection[0])
            .intersects(&other.bounds().transform_by(&to_collection[1]))
        {
            return false;
        }

        let (small, big, small_pose, big_pose) = if self.mesh.vertex_count() > other.mesh.vertex_count() {
            (other, self, &to_collection[1], &to_collection[0])
        } else {
            (self, other, &to_collection[0], &to_collection[1])
        };

        let mut hash = PointHashGrid::new(NEIGHBOR_DISTANCE * 10.0);
        for vid in big.mesh.vertex_ids() {
            hash.insert(vid, big_pose * big.mesh.vertex(vid));
        }

        small.mesh.vertex_ids().any(|vid| {
            hash.find_nearest_in_radius(&(small_pose * small.mesh.vertex(vid)), NEIGHBOR_DISTANCE)
                .is_some()
        })
    }
}

/// Augmented meshes extracted from the bones of a geometry collection.
#[derive(Clone, Debug, Default)]
pub struct DynamicMeshCollection {
    /// The extracted meshes, in the order of the requested bones.
    pub meshes: Vec<MeshData>,
    /// The union of the bounds of all the meshes, each in its own space.
    pub bounds: Aabb,
    /// The flags the meshes were extracted with.
    pub flags: CollectionImportFlags,
    /// What [`Self::split_all_islands`] does with the geometries it replaces.
    pub replaced_geometry: ReplacedGeometry,
}

impl DynamicMeshCollection {
    /// Extracts one augmented mesh per bone of `transform_indices` having geometry.
    ///
    /// `transforms` are the bone transforms to use instead of the ones stored in the
    /// collection. They are relative to the parent bones, unless
    /// [`CollectionImportFlags::COMPONENT_SPACE_TRANSFORMS`] is set. Vertices are
    /// mapped by the global transform of their bone followed by `collection_transform`.
    ///
    /// Each mesh gets the UV layers of the collection plus one extra channel storing
    /// `(geometry_index / num_transforms, 0)`, identifying the fragment. Faces that
    /// would make the mesh non-manifold are kept by giving them their own copies of
    /// their vertices.
    pub fn init(
        collection: &GeometryCollection,
        transforms: &[Isometry3<f32>],
        transform_indices: &[usize],
        collection_transform: &Isometry<Real>,
        flags: CollectionImportFlags,
    ) -> Result<Self, UpdateError> {
        let num_transforms = collection.num_transforms();
        if transforms.len() != num_transforms {
            return Err(CollectionError::InconsistentGroupSize {
                group: "transform",
                expected: num_transforms,
                actual: transforms.len(),
            }
            .into());
        }

        let num_channels = (collection.num_uv_layers() + 1).min(MAX_NUM_UV_CHANNELS);
        let bone_channel = num_channels - 1;
        let mut result = Self {
            flags,
            ..Self::default()
        };

        for &transform_idx in transform_indices {
            if transform_idx >= num_transforms {
                return Err(CollectionError::InvalidTransform(transform_idx).into());
            }
            let Some(geometry_idx) = collection.transform_to_geometry_index[transform_idx] else {
                continue;
            };
            if geometry_idx >= collection.num_geometries() {
                return Err(UpdateError::InvalidGeometry(geometry_idx));
            }

            let bone_transform = if flags.contains(CollectionImportFlags::COMPONENT_SPACE_TRANSFORMS) {
                transforms[transform_idx]
            } else {
                GeometryCollection::global_transform_with(transforms, &collection.parents, transform_idx)
            };
            let from_collection = collection_transform * bone_transform.cast::<Real>();

            let bone_uv = Vector2::new(
                geometry_idx as f32 / collection.transform_to_geometry_index.len() as f32,
                0.0,
            );
            let mesh = extract_geometry(
                collection,
                geometry_idx,
                &from_collection,
                num_channels,
                bone_channel,
                bone_uv,
                flags,
            )?;

            let data = MeshData::new(mesh, transform_idx, from_collection);
            result.bounds.merge(&data.bounds());
            result.meshes.push(data);
        }

        log::debug!("Extracted {} meshes from the collection.", result.meshes.len());
        Ok(result)
    }

    /// Writes every mesh back into the geometry it was extracted from.
    ///
    /// The geometries are first resized to the vertex and triangle counts of their
    /// mesh. Triangles with an unassigned material get the material `-1`, and unset
    /// vertex colors are replaced by the default color. Returns `false` if any of
    /// the meshes failed to be written.
    pub fn update_all_collections(&mut self, collection: &mut GeometryCollection) -> bool {
        let mut all_succeeded = true;
        let mut vertex_counts = collection.vertex_count.clone();
        let mut face_counts = collection.face_count.clone();

        for data in &mut self.meshes {
            let Some(geometry_idx) = geometry_of(collection, data.transform_index) else {
                all_succeeded = false;
                continue;
            };
            let mesh = data.mesh_mut();
            if !mesh.is_compact() {
                let _ = mesh.compact_in_place();
            }
            vertex_counts[geometry_idx] = mesh.vertex_count();
            face_counts[geometry_idx] = mesh.triangle_count();
        }

        if let Err(err) = collection.resize_geometries(&vertex_counts, &face_counts) {
            log::warn!("Failed to resize the geometries of the collection: {}", err);
            return false;
        }

        for data in &mut self.meshes {
            let Some(geometry_idx) = geometry_of(collection, data.transform_index) else {
                continue;
            };
            let from_collection = data.from_collection;
            if let Err(err) =
                Self::update_collection(&from_collection, data.mesh_mut(), geometry_idx, collection, -1)
            {
                log::warn!("Failed to write the mesh of the geometry {}: {}", geometry_idx, err);
                all_succeeded = false;
            }
        }

        set_unset_colors(collection, 0, false);
        all_succeeded
    }

    /// Overwrites the geometry `geometry_idx` with `mesh`.
    ///
    /// The mesh is compacted first and must have exactly as many vertices and
    /// triangles as the geometry; otherwise the collection is left untouched.
    /// Positions and directions are mapped back by the inverse of `from_collection`.
    /// Triangles with an unassigned material become internal faces with the material
    /// `internal_material`.
    pub fn update_collection(
        from_collection: &Isometry<Real>,
        mesh: &mut DynamicMesh,
        geometry_idx: usize,
        collection: &mut GeometryCollection,
        internal_material: i32,
    ) -> Result<(), UpdateError> {
        if geometry_idx >= collection.num_geometries() {
            return Err(UpdateError::InvalidGeometry(geometry_idx));
        }
        if !mesh.is_augmented() {
            return Err(UpdateError::NotAugmented);
        }
        if !mesh.is_compact() {
            let _ = mesh.compact_in_place();
        }

        let (expected_vertices, expected_faces) = (
            collection.vertex_count[geometry_idx],
            collection.face_count[geometry_idx],
        );
        if mesh.vertex_count() != expected_vertices || mesh.triangle_count() != expected_faces {
            return Err(UpdateError::CountMismatch {
                geometry: geometry_idx,
                expected_vertices,
                expected_faces,
                vertices: mesh.vertex_count(),
                triangles: mesh.triangle_count(),
            });
        }

        collection.set_num_uv_layers(mesh.num_uv_channels());
        write_mesh(from_collection, mesh, geometry_idx, collection, internal_material)?;
        collection.update_bounding_box(geometry_idx);
        Ok(())
    }

    /// Adds `mesh` to the collection as a new geometry with its own bone.
    ///
    /// The new bone has an identity transform and is a rigid child of `parent` (which
    /// becomes a cluster) named `bone_name`, with the color of its parent. If
    /// `collision_sample_spacing` is positive, collision samples are added to the mesh
    /// first. Returns `Ok(None)` without modifying the collection if the mesh has no
    /// triangle, and the index of the new geometry otherwise.
    pub fn append_to_collection(
        from_collection: &Isometry<Real>,
        mesh: &mut DynamicMesh,
        collision_sample_spacing: Real,
        parent: Option<usize>,
        bone_name: String,
        collection: &mut GeometryCollection,
        internal_material: i32,
    ) -> Result<Option<usize>, UpdateError> {
        if mesh.triangle_count() == 0 {
            return Ok(None);
        }
        if !mesh.is_augmented() {
            return Err(UpdateError::NotAugmented);
        }
        if let Some(parent) = parent {
            if parent >= collection.num_transforms() {
                return Err(CollectionError::InvalidTransform(parent).into());
            }
        }

        if !mesh.is_compact() {
            let _ = mesh.compact_in_place();
        }
        if collision_sample_spacing > 0.0 {
            let _ = add_collision_samples_per_component(mesh, collision_sample_spacing)?;
        }

        let num_uv_layers = if mesh.num_uv_channels() == 0 {
            log::warn!("Appending a mesh without UV channel.");
            1
        } else {
            mesh.num_uv_channels()
        };

        let geometry_idx = collection.add_geometries(1);
        let transform_idx = collection.add_transforms(1);
        collection.transform_index[geometry_idx] = transform_idx;
        collection.transform_to_geometry_index[transform_idx] = Some(geometry_idx);
        collection.bone_names[transform_idx] = bone_name;
        collection.simulation_types[transform_idx] = SimulationType::Rigid;
        if let Some(parent) = parent {
            collection.bone_colors[transform_idx] = collection.bone_colors[parent];
            collection.parents[transform_idx] = Some(parent);
            let _ = collection.children[parent].insert(transform_idx);
            collection.simulation_types[parent] = SimulationType::Clustered;
        }

        collection.face_start[geometry_idx] = collection.add_faces(mesh.triangle_count());
        collection.face_count[geometry_idx] = mesh.triangle_count();
        collection.vertex_start[geometry_idx] = collection.add_vertices(mesh.vertex_count());
        collection.vertex_count[geometry_idx] = mesh.vertex_count();

        collection.set_num_uv_layers(num_uv_layers);
        write_mesh(from_collection, mesh, geometry_idx, collection, internal_material)?;
        collection.update_bounding_box(geometry_idx);
        Ok(Some(geometry_idx))
    }

    /// Replaces every mesh made of several islands by one new geometry per island.
    ///
    /// The new bones are children of the bone of the split mesh, named after it
    /// with the island index as suffix. The replaced geometries are hidden or
    /// removed depending on [`Self::replaced_geometry`]. Returns the index of the
    /// first new geometry, if any.
    pub fn split_all_islands(
        &self,
        collection: &mut GeometryCollection,
        collision_sample_spacing: Real,
    ) -> Result<Option<usize>, UpdateError> {
        let mut first_created = None;
        let mut replaced = vec![];

        for data in &self.meshes {
            let Some(source_geometry) = geometry_of(collection, data.transform_index) else {
                continue;
            };
            let Some(islands) = split_islands(&data.mesh) else {
                continue;
            };

            for (i, mut island) in islands.into_iter().enumerate() {
                let bone_name = format!("{}_{}", collection.bone_names[data.transform_index], i);
                // Islands have no unassigned triangle, so the fallback material is unused.
                let created = Self::append_to_collection(
                    &data.from_collection,
                    &mut island,
                    collision_sample_spacing,
                    Some(data.transform_index),
                    bone_name,
                    collection,
                    0,
                )?;
                if first_created.is_none() {
                    first_created = created;
                }
            }

            replaced.push(source_geometry);
        }

        if replaced.is_empty() {
            return Ok(first_created);
        }

        log::debug!("Split {} geometries into islands.", replaced.len());
        match self.replaced_geometry {
            ReplacedGeometry::Hide => {
                Self::set_geometry_visibility(collection, &replaced, false);
                Ok(first_created)
            }
            ReplacedGeometry::Remove => {
                replaced.sort_unstable();
                collection.remove_geometries(&replaced)?;
                // Replaced geometries all precede the appended ones.
                Ok(first_created.map(|first| first - replaced.len()))
            }
        }
    }

    /// Adds collision samples to every mesh. Returns the total number of samples added.
    pub fn add_collision_samples(&mut self, spacing: Real) -> Result<usize, AttributeError> {
        let mut num_added = 0;
        for data in &mut self.meshes {
            num_added += add_collision_samples_per_component(data.mesh_mut(), spacing)?;
        }
        Ok(num_added)
    }

    /// Shows or hides all the faces of the given geometries.
    pub fn set_geometry_visibility(
        collection: &mut GeometryCollection,
        geometries: &[usize],
        visible: bool,
    ) {
        collection.set_geometry_visibility(geometries, visible);
    }

    /// Checks if the meshes `a` and `b` touch each other, see [`MeshData::is_neighboring`].
    pub fn is_neighboring(&self, a: usize, b: usize) -> bool {
        self.meshes[a].is_neighboring(&self.meshes[b])
    }
}

fn geometry_of(collection: &GeometryCollection, transform_idx: usize) -> Option<usize> {
    collection
        .transform_to_geometry_index
        .get(transform_idx)
        .copied()
        .flatten()
        .filter(|g| *g < collection.num_geometries())
}

fn extract_geometry(
    collection: &GeometryCollection,
    geometry_idx: usize,
    from_collection: &Isometry<Real>,
    num_channels: usize,
    bone_channel: usize,
    bone_uv: Vector2<f32>,
    flags: CollectionImportFlags,
) -> Result<DynamicMesh, AttributeError> {
    let vertex_start = collection.vertex_start[geometry_idx];
    let vertex_end = vertex_start + collection.vertex_count[geometry_idx];
    let face_start = collection.face_start[geometry_idx];
    let face_end = face_start + collection.face_count[geometry_idx];
    let rotate = |v: &na::Vector3<f32>| from_collection.transform_vector(&v.cast::<Real>()).cast::<f32>();

    let mut mesh = DynamicMesh::new();
    mesh.augment(num_channels);

    for idx in vertex_start..vertex_end {
        let vid = mesh.append_vertex(from_collection * collection.vertices[idx].cast::<Real>());
        let mut uvs: smallvec::SmallVec<[Vector2<f32>; 4]> =
            collection.uvs[..bone_channel].iter().map(|layer| layer[idx]).collect();
        uvs.push(bone_uv);
        mesh.set_vertex_attributes(
            vid,
            &VertexAttributes {
                normal: rotate(&collection.normals[idx]),
                color: collection.colors[idx],
                tangent_u: rotate(&collection.tangents_u[idx]),
                tangent_v: rotate(&collection.tangents_v[idx]),
                uvs,
            },
        )?;
    }

    let skip_invisible = flags.contains(CollectionImportFlags::SKIP_INVISIBLE);
    for face in face_start..face_end {
        if skip_invisible && !collection.visible[face] {
            continue;
        }

        let tri = collection.indices[face]
            .map(|vid| vid.checked_sub(vertex_start as u32).unwrap_or(INVALID_ID));
        let tid = match mesh.append_triangle(tri) {
            Ok(tid) => tid,
            Err(AppendTriangleError::NonManifold { .. }) => {
                // Give the face its own copies of its vertices.
                let mut copy = [INVALID_ID; 3];
                for k in 0..3 {
                    copy[k] = mesh.append_vertex_copy(tri[k]).unwrap_or(INVALID_ID);
                }
                match mesh.append_triangle(copy) {
                    Ok(tid) => tid,
                    Err(err) => {
                        log::warn!("Dropping the face {} of the geometry {}: {}", face, geometry_idx, err);
                        continue;
                    }
                }
            }
            Err(err) => {
                log::warn!("Dropping the face {} of the geometry {}: {}", face, geometry_idx, err);
                continue;
            }
        };

        mesh.set_triangle_attributes(
            tid,
            TriangleAttributes {
                material_id: collection.material_ids[face],
                visible: collection.visible[face],
                internal: collection.internal[face],
            },
        )?;
    }

    if !flags.contains(CollectionImportFlags::SAVE_ISOLATED_VERTICES) {
        let _ = mesh.remove_isolated_vertices();
    }

    Ok(mesh)
}

/// Writes the compact `mesh` over the vertex and face ranges of `geometry_idx`.
fn write_mesh(
    from_collection: &Isometry<Real>,
    mesh: &DynamicMesh,
    geometry_idx: usize,
    collection: &mut GeometryCollection,
    internal_material: i32,
) -> Result<(), AttributeError> {
    let to_collection = from_collection.inverse();
    let rotate = |v: &na::Vector3<f32>| to_collection.transform_vector(&v.cast::<Real>()).cast::<f32>();
    let vertex_start = collection.vertex_start[geometry_idx];
    let face_start = collection.face_start[geometry_idx];
    let transform_idx = collection.transform_index[geometry_idx];

    for vid in 0..mesh.max_vertex_id() {
        let attrs = mesh.vertex_attributes(vid)?;
        let i = vertex_start + vid as usize;
        collection.vertices[i] = (to_collection * mesh.vertex(vid)).cast::<f32>();
        collection.normals[i] = rotate(&attrs.normal);
        collection.tangents_u[i] = rotate(&attrs.tangent_u);
        collection.tangents_v[i] = rotate(&attrs.tangent_v);
        collection.colors[i] = attrs.color;
        for (layer, uv) in collection.uvs.iter_mut().zip(attrs.uvs.iter()) {
            layer[i] = *uv;
        }
        collection.bone_map[i] = transform_idx;
    }

    for tid in 0..mesh.max_triangle_id() {
        let attrs = mesh.triangle_attributes(tid)?;
        let i = face_start + tid as usize;
        let (material_id, internal) = match MaterialRole::from_raw(attrs.material_id) {
            MaterialRole::Unassigned => (internal_material, true),
            role => (role.raw(), attrs.internal),
        };
        collection.material_ids[i] = material_id;
        collection.internal[i] = internal;
        collection.visible[i] = attrs.visible;
        collection.indices[i] = mesh.triangle(tid).map(|vid| vid + vertex_start as u32);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Color, Point, Point3, Translation3, UnitQuaternion, Vector3};

    fn two_bones() -> GeometryCollection {
        let mut collection = GeometryCollection::new();
        collection.set_num_uv_layers(1);
        let triangle = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let pose = Isometry3::from_parts(
            Translation3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.5),
        );
        let red = Color::new(1.0, 0.0, 0.0, 1.0);
        let _ = collection
            .append_geometry(Isometry3::identity(), None, &triangle, &[[0, 1, 2]], red)
            .unwrap();
        let _ = collection
            .append_geometry(pose, Some(0), &triangle, &[[0, 1, 2]], red)
            .unwrap();
        collection.uvs[0][4] = Vector2::new(0.25, 0.75);
        collection
    }

    fn extract(collection: &GeometryCollection) -> DynamicMeshCollection {
        DynamicMeshCollection::init(
            collection,
            &collection.transforms,
            &[0, 1],
            &Isometry::identity(),
            CollectionImportFlags::default(),
        )
        .unwrap()
    }

    #[test]
    fn extracted_meshes_carry_the_bone_uv_channel() {
        let collection = two_bones();
        let meshes = extract(&collection);
        assert_eq!(meshes.meshes.len(), 2);

        let mesh = meshes.meshes[1].mesh();
        assert_eq!(mesh.num_uv_channels(), 2);
        assert_eq!(mesh.vertex_uv(1, 0), Ok(Vector2::new(0.25, 0.75)));
        assert_eq!(mesh.vertex_uv(0, 1), Ok(Vector2::new(0.5, 0.0)));
        assert_eq!(meshes.meshes[0].mesh().vertex_uv(2, 1), Ok(Vector2::zeros()));

        // The second bone is a child of the first one.
        let expected = collection.global_transform(1).cast::<Real>() * Point::new(1.0, 0.0, 0.0);
        assert_relative_eq!(mesh.vertex(1), expected, epsilon = 1.0e-6);
    }

    #[test]
    fn writeback_reproduces_the_collection() {
        let mut collection = two_bones();
        let original = collection.clone();
        let mut meshes = extract(&collection);
        assert!(meshes.update_all_collections(&mut collection));

        assert_eq!(collection.indices, original.indices);
        assert_eq!(collection.material_ids, original.material_ids);
        assert_eq!(collection.colors, original.colors);
        assert_eq!(collection.bone_map, original.bone_map);
        assert_eq!(collection.num_uv_layers(), 2);
        assert_eq!(collection.uvs[0], original.uvs[0]);
        for (a, b) in collection.vertices.iter().zip(original.vertices.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1.0e-5);
        }
        for (a, b) in collection.normals.iter().zip(original.normals.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1.0e-5);
        }
        assert_eq!(collection.validate(), Ok(()));
    }

    #[test]
    fn count_mismatch_leaves_the_geometry_untouched() {
        let mut collection = two_bones();
        let original = collection.clone();
        let mut meshes = extract(&collection);
        let data = &mut meshes.meshes[0];
        let from_collection = data.from_collection;
        let _ = data.mesh_mut().append_vertex(Point::new(5.0, 5.0, 5.0));

        let result =
            DynamicMeshCollection::update_collection(&from_collection, data.mesh_mut(), 0, &mut collection, -1);
        assert!(matches!(result, Err(UpdateError::CountMismatch { vertices: 4, .. })));
        assert_eq!(collection, original);
    }

    #[test]
    fn unassigned_materials_become_internal() {
        let mut collection = two_bones();
        let mut meshes = extract(&collection);
        let data = &mut meshes.meshes[0];
        let from_collection = data.from_collection;
        data.mesh_mut().set_material_id(0, -1).unwrap();

        DynamicMeshCollection::update_collection(&from_collection, data.mesh_mut(), 0, &mut collection, 7)
            .unwrap();
        assert_eq!(collection.material_ids[0], 7);
        assert!(collection.internal[0]);
    }

    #[test]
    fn non_manifold_faces_get_their_own_vertices() {
        let mut collection = GeometryCollection::new();
        let vertices = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, -1.0, 0.0),
        ];
        // Both faces traverse the edge 0 -> 1.
        let _ = collection
            .append_geometry(Isometry3::identity(), None, &vertices, &[[0, 1, 2], [0, 1, 3]], Color::zeros())
            .unwrap();

        let meshes = DynamicMeshCollection::init(
            &collection,
            &collection.transforms,
            &[0],
            &Isometry::identity(),
            CollectionImportFlags::default(),
        )
        .unwrap();
        let mesh = meshes.meshes[0].mesh();
        assert_eq!(mesh.triangle_count(), 2);
        // The unused fourth vertex is isolated and removed.
        assert_eq!(mesh.vertex_count(), 6);
    }

    #[test]
    fn invisible_faces_are_skipped_on_request() {
        let mut collection = two_bones();
        collection.visible[0] = false;
        let meshes = DynamicMeshCollection::init(
            &collection,
            &collection.transforms,
            &[0, 1],
            &Isometry::identity(),
            CollectionImportFlags::SKIP_INVISIBLE | CollectionImportFlags::SAVE_ISOLATED_VERTICES,
        )
        .unwrap();
        assert_eq!(meshes.meshes[0].mesh().triangle_count(), 0);
        assert_eq!(meshes.meshes[0].mesh().vertex_count(), 3);
        assert_eq!(meshes.meshes[1].mesh().triangle_count(), 1);
    }

    #[test]
    fn touching_meshes_are_neighbors() {
        let mut collection = GeometryCollection::new();
        let left = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let right = [
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ];
        let far = [
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(11.0, 0.0, 0.0),
            Point3::new(11.0, 1.0, 0.0),
        ];
        for pts in [&left, &right, &far] {
            let _ = collection
                .append_geometry(Isometry3::identity(), None, pts, &[[0, 1, 2]], Color::zeros())
                .unwrap();
        }

        let meshes = DynamicMeshCollection::init(
            &collection,
            &collection.transforms,
            &[0, 1, 2],
            &Isometry::identity(),
            CollectionImportFlags::default(),
        )
        .unwrap();
        assert!(meshes.is_neighboring(0, 1));
        assert!(!meshes.is_neighboring(0, 2));
    }
}
