use crate::bounding_volume::Aabb;
use crate::math::{Color, Isometry3, Point3, Vector2, Vector3};
use crate::shape::augmented::DEFAULT_VERTEX_COLOR;
use alloc::collections::BTreeSet;

/// The simulation role of a bone.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SimulationType {
    /// The bone is not simulated.
    #[default]
    None,
    /// The bone is a rigid fragment.
    Rigid,
    /// The bone is a cluster of child fragments.
    Clustered,
}

/// Indicates a violation of the invariants of a [`GeometryCollection`].
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum CollectionError {
    /// The arrays of one group do not have the same length.
    #[error("an array of the {group} group has {actual} elements instead of {expected}.")]
    InconsistentGroupSize {
        /// The name of the group.
        group: &'static str,
        /// The number of elements of the group.
        expected: usize,
        /// The length of the offending array.
        actual: usize,
    },
    /// A transform index is out of bounds.
    #[error("the transform index {0} is out of bounds.")]
    InvalidTransform(usize),
    /// A geometry index is out of bounds.
    #[error("the geometry index {0} is out of bounds.")]
    InvalidGeometry(usize),
    /// A transform is its own ancestor.
    #[error("the transform {0} is its own ancestor.")]
    CyclicHierarchy(usize),
    /// A geometry and its transform do not reference each other.
    #[error("the geometry {geometry} and its transform {transform} do not reference each other.")]
    GeometryTransformMismatch {
        /// The geometry.
        geometry: usize,
        /// The transform referenced by the geometry.
        transform: usize,
    },
    /// The vertex range of a geometry exceeds the vertex array, or overlaps another one.
    #[error("the vertex range {start}..{end} of the geometry {geometry} is invalid.")]
    InvalidVertexRange {
        /// The geometry.
        geometry: usize,
        /// The first vertex of the range.
        start: usize,
        /// One past the last vertex of the range.
        end: usize,
    },
    /// The face range of a geometry exceeds the face array, or overlaps another one.
    #[error("the face range {start}..{end} of the geometry {geometry} is invalid.")]
    InvalidFaceRange {
        /// The geometry.
        geometry: usize,
        /// The first face of the range.
        start: usize,
        /// One past the last face of the range.
        end: usize,
    },
    /// A face references a vertex outside of the vertex range of its geometry.
    #[error("the face {face} of the geometry {geometry} references the vertex {vertex} outside of its range.")]
    IndexOutOfRange {
        /// The geometry.
        geometry: usize,
        /// The absolute face index.
        face: usize,
        /// The absolute vertex index.
        vertex: u32,
    },
}

/// A hierarchy of bones with triangle geometry, stored as parallel arrays.
///
/// The arrays are grouped in four groups, each group having one entry per element:
/// - the transform group (one entry per bone),
/// - the geometry group (one entry per bone having geometry),
/// - the vertices group,
/// - the faces group.
///
/// The vertices (resp. faces) of the geometry `g` are the contiguous range
/// `vertex_start[g]..vertex_start[g] + vertex_count[g]` (resp. with `face_start`
/// and `face_count`). Face indices are absolute indices into the vertices group,
/// and always point into the vertex range of the face's own geometry.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryCollection {
    /*
     * Transform group.
     */
    /// The transform of each bone relative to its parent.
    pub transforms: Vec<Isometry3<f32>>,
    /// The parent of each bone.
    pub parents: Vec<Option<usize>>,
    /// The children of each bone.
    pub children: Vec<BTreeSet<usize>>,
    /// The name of each bone.
    pub bone_names: Vec<String>,
    /// The display color of each bone.
    pub bone_colors: Vec<Color>,
    /// The simulation role of each bone.
    pub simulation_types: Vec<SimulationType>,
    /// The geometry attached to each bone.
    pub transform_to_geometry_index: Vec<Option<usize>>,

    /*
     * Geometry group.
     */
    /// The bone each geometry is attached to.
    pub transform_index: Vec<usize>,
    /// The first vertex of each geometry.
    pub vertex_start: Vec<usize>,
    /// The number of vertices of each geometry.
    pub vertex_count: Vec<usize>,
    /// The first face of each geometry.
    pub face_start: Vec<usize>,
    /// The number of faces of each geometry.
    pub face_count: Vec<usize>,
    /// The bounding box of each geometry, in the space of its bone.
    pub bounding_boxes: Vec<Aabb>,

    /*
     * Vertices group.
     */
    /// Vertex positions, in the space of their bone.
    pub vertices: Vec<Point3<f32>>,
    /// Vertex normals.
    pub normals: Vec<Vector3<f32>>,
    /// First vertex tangents.
    pub tangents_u: Vec<Vector3<f32>>,
    /// Second vertex tangents.
    pub tangents_v: Vec<Vector3<f32>>,
    /// Vertex colors.
    pub colors: Vec<Color>,
    /// One array of vertex UVs per UV layer.
    pub uvs: Vec<Vec<Vector2<f32>>>,
    /// The bone each vertex is attached to.
    pub bone_map: Vec<usize>,

    /*
     * Faces group.
     */
    /// The absolute vertex indices of each face.
    pub indices: Vec<[u32; 3]>,
    /// The material of each face.
    pub material_ids: Vec<i32>,
    /// Is each face rendered?
    pub visible: Vec<bool>,
    /// Was each face created by fracturing?
    pub internal: Vec<bool>,
}

fn gather<T: Clone>(column: &[T], sources: &[Option<usize>], default: &T) -> Vec<T> {
    sources
        .iter()
        .map(|src| src.map(|i| column[i].clone()).unwrap_or_else(|| default.clone()))
        .collect()
}

impl GeometryCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of bones.
    pub fn num_transforms(&self) -> usize {
        self.transforms.len()
    }

    /// The number of geometries.
    pub fn num_geometries(&self) -> usize {
        self.transform_index.len()
    }

    /// The number of vertices, all geometries included.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// The number of faces, all geometries included.
    pub fn num_faces(&self) -> usize {
        self.indices.len()
    }

    /// The number of UV layers.
    pub fn num_uv_layers(&self) -> usize {
        self.uvs.len()
    }

    /// Adds or removes UV layers. New layers are zero.
    pub fn set_num_uv_layers(&mut self, num_layers: usize) {
        let num_vertices = self.num_vertices();
        self.uvs
            .resize_with(num_layers, || vec![Vector2::zeros(); num_vertices]);
    }

    /*
     * Group growth.
     */
    /// Adds `count` bones with default values and returns the index of the first one.
    pub fn add_transforms(&mut self, count: usize) -> usize {
        let first = self.num_transforms();
        let new_len = first + count;
        self.transforms.resize(new_len, Isometry3::identity());
        self.parents.resize(new_len, None);
        self.children.resize_with(new_len, BTreeSet::new);
        self.bone_names.resize(new_len, String::new());
        self.bone_colors.resize(new_len, Color::new(1.0, 1.0, 1.0, 1.0));
        self.simulation_types
            .resize(new_len, SimulationType::default());
        self.transform_to_geometry_index.resize(new_len, None);
        first
    }

    /// Adds `count` empty geometries and returns the index of the first one.
    ///
    /// The caller is responsible for setting their transform and ranges.
    pub fn add_geometries(&mut self, count: usize) -> usize {
        let first = self.num_geometries();
        let new_len = first + count;
        self.transform_index.resize(new_len, 0);
        self.vertex_start.resize(new_len, self.vertices.len());
        self.vertex_count.resize(new_len, 0);
        self.face_start.resize(new_len, self.indices.len());
        self.face_count.resize(new_len, 0);
        self.bounding_boxes.resize(new_len, Aabb::new_invalid());
        first
    }

    /// Adds `count` default vertices and returns the index of the first one.
    pub fn add_vertices(&mut self, count: usize) -> usize {
        let first = self.num_vertices();
        let new_len = first + count;
        self.vertices.resize(new_len, Point3::origin());
        self.normals.resize(new_len, Vector3::z());
        self.tangents_u.resize(new_len, Vector3::x());
        self.tangents_v.resize(new_len, Vector3::y());
        self.colors.resize(new_len, DEFAULT_VERTEX_COLOR);
        for layer in &mut self.uvs {
            layer.resize(new_len, Vector2::zeros());
        }
        self.bone_map.resize(new_len, 0);
        first
    }

    /// Adds `count` default faces and returns the index of the first one.
    pub fn add_faces(&mut self, count: usize) -> usize {
        let first = self.num_faces();
        let new_len = first + count;
        self.indices.resize(new_len, [0; 3]);
        self.material_ids.resize(new_len, 0);
        self.visible.resize(new_len, true);
        self.internal.resize(new_len, false);
        first
    }

    /// Adds a bone carrying the given triangles and returns the index of its geometry.
    ///
    /// `indices` are relative to `vertices`. Normals are set to the area-weighted
    /// normals of the adjacent triangles, tangents to `+X` and `+Y`, colors to
    /// `color`, UVs to zero.
    pub fn append_geometry(
        &mut self,
        transform: Isometry3<f32>,
        parent: Option<usize>,
        vertices: &[Point3<f32>],
        indices: &[[u32; 3]],
        color: Color,
    ) -> Result<usize, CollectionError> {
        if let Some(parent) = parent {
            if parent >= self.num_transforms() {
                return Err(CollectionError::InvalidTransform(parent));
            }
        }

        let transform_idx = self.add_transforms(1);
        self.transforms[transform_idx] = transform;
        self.parents[transform_idx] = parent;
        self.bone_names[transform_idx] = format!("Bone_{}", transform_idx);
        self.simulation_types[transform_idx] = SimulationType::Rigid;
        if let Some(parent) = parent {
            let _ = self.children[parent].insert(transform_idx);
            self.simulation_types[parent] = SimulationType::Clustered;
        }

        let geometry_idx = self.add_geometries(1);
        let vertex_start = self.add_vertices(vertices.len());
        let face_start = self.add_faces(indices.len());
        self.transform_index[geometry_idx] = transform_idx;
        self.transform_to_geometry_index[transform_idx] = Some(geometry_idx);
        self.vertex_start[geometry_idx] = vertex_start;
        self.vertex_count[geometry_idx] = vertices.len();
        self.face_start[geometry_idx] = face_start;
        self.face_count[geometry_idx] = indices.len();

        let mut normals = vec![Vector3::zeros(); vertices.len()];
        for (i, tri) in indices.iter().enumerate() {
            let [a, b, c] = tri.map(|vid| vertices[vid as usize]);
            let normal = (b - a).cross(&(c - a));
            for vid in tri {
                normals[*vid as usize] += normal;
            }
            self.indices[face_start + i] = tri.map(|vid| vid + vertex_start as u32);
        }

        for (i, pt) in vertices.iter().enumerate() {
            let vid = vertex_start + i;
            self.vertices[vid] = *pt;
            self.normals[vid] = normals[i].try_normalize(f32::EPSILON).unwrap_or_else(Vector3::z);
            self.colors[vid] = color;
            self.bone_map[vid] = transform_idx;
        }

        self.update_bounding_box(geometry_idx);
        Ok(geometry_idx)
    }

    /*
     * Hierarchy.
     */
    /// The transform of the bone `transform_idx` relative to the collection space.
    ///
    /// Ancestors are visited at most once, so a cyclic hierarchy does not loop forever.
    pub fn global_transform(&self, transform_idx: usize) -> Isometry3<f32> {
        Self::global_transform_with(&self.transforms, &self.parents, transform_idx)
    }

    /// Same as [`Self::global_transform`], with the local transforms given explicitly.
    pub fn global_transform_with(
        transforms: &[Isometry3<f32>],
        parents: &[Option<usize>],
        transform_idx: usize,
    ) -> Isometry3<f32> {
        let mut result = transforms[transform_idx];
        let mut curr = parents[transform_idx];
        let mut depth = 0;

        while let Some(parent) = curr {
            if depth >= parents.len() {
                break;
            }
            result = transforms[parent] * result;
            curr = parents[parent];
            depth += 1;
        }

        result
    }

    /// The transforms of all the bones relative to the collection space.
    pub fn global_transforms(&self) -> Vec<Isometry3<f32>> {
        (0..self.num_transforms())
            .map(|i| self.global_transform(i))
            .collect()
    }

    /*
     * Geometry edition.
     */
    /// Recomputes the bounding box of the geometry `geometry_idx` from its vertices.
    pub fn update_bounding_box(&mut self, geometry_idx: usize) {
        let start = self.vertex_start[geometry_idx];
        let end = start + self.vertex_count[geometry_idx];
        self.bounding_boxes[geometry_idx] =
            Aabb::from_points(self.vertices[start..end].iter().map(|pt| pt.cast::<f64>()));
    }

    /// The bounding box of all the geometries, in the collection space.
    pub fn bounding_box(&self) -> Aabb {
        let mut result = Aabb::new_invalid();
        for g in 0..self.num_geometries() {
            let transform = self.global_transform(self.transform_index[g]).cast::<f64>();
            result.merge(&self.bounding_boxes[g].transform_by(&transform));
        }
        result
    }

    /// Sets the visibility of all the faces of the given geometries.
    pub fn set_geometry_visibility(&mut self, geometries: &[usize], visible: bool) {
        for &g in geometries {
            let start = self.face_start[g];
            let end = start + self.face_count[g];
            self.visible[start..end].fill(visible);
        }
    }

    /// Changes the number of vertices and faces of every geometry.
    ///
    /// The vertices and faces are laid out again in geometry order. The first
    /// `min(old, new)` vertices and faces of each geometry are kept (face indices
    /// are offset accordingly), and new elements get default values. Vertices and
    /// faces not owned by any geometry are dropped.
    pub fn resize_geometries(
        &mut self,
        vertex_counts: &[usize],
        face_counts: &[usize],
    ) -> Result<(), CollectionError> {
        let num_geometries = self.num_geometries();
        for counts in [vertex_counts, face_counts] {
            if counts.len() != num_geometries {
                return Err(CollectionError::InconsistentGroupSize {
                    group: "geometry",
                    expected: num_geometries,
                    actual: counts.len(),
                });
            }
        }

        if vertex_counts == self.vertex_count.as_slice() && face_counts == self.face_count.as_slice() {
            return Ok(());
        }

        let mut vertex_sources = vec![];
        let mut face_sources = vec![];
        let mut new_bone_map = vec![];
        let mut index_offsets = vec![];

        for g in 0..num_geometries {
            let new_vertex_start = vertex_sources.len();
            let new_face_start = face_sources.len();
            let (old_vertex_start, old_face_start) = (self.vertex_start[g], self.face_start[g]);

            for i in 0..vertex_counts[g] {
                if i < self.vertex_count[g] {
                    vertex_sources.push(Some(old_vertex_start + i));
                    new_bone_map.push(self.bone_map[old_vertex_start + i]);
                } else {
                    vertex_sources.push(None);
                    new_bone_map.push(self.transform_index[g]);
                }
            }
            for i in 0..face_counts[g] {
                if i < self.face_count[g] {
                    face_sources.push(Some(old_face_start + i));
                    index_offsets.push(Ok(new_vertex_start as i64 - old_vertex_start as i64));
                } else {
                    // New faces are degenerate until written, but stay inside their geometry.
                    face_sources.push(None);
                    index_offsets.push(Err(new_vertex_start as u32));
                }
            }

            self.vertex_start[g] = new_vertex_start;
            self.vertex_count[g] = vertex_counts[g];
            self.face_start[g] = new_face_start;
            self.face_count[g] = face_counts[g];
        }

        self.gather_vertices(&vertex_sources);
        self.bone_map = new_bone_map;
        self.gather_faces(&face_sources);
        for (face, fixup) in self.indices.iter_mut().zip(index_offsets) {
            *face = match fixup {
                Ok(offset) => face.map(|vid| (vid as i64 + offset).max(0) as u32),
                Err(start) => [start; 3],
            };
        }

        Ok(())
    }

    /// Removes the given geometries together with their vertices and faces.
    ///
    /// The bones are kept, without geometry. Geometry indices after the removed
    /// ones are shifted down.
    pub fn remove_geometries(&mut self, geometries: &[usize]) -> Result<(), CollectionError> {
        let num_geometries = self.num_geometries();
        let mut removed = vec![false; num_geometries];
        for &g in geometries {
            if g >= num_geometries {
                return Err(CollectionError::InvalidGeometry(g));
            }
            removed[g] = true;
        }

        let mut vertex_removed = vec![false; self.num_vertices()];
        let mut face_removed = vec![false; self.num_faces()];
        for g in (0..num_geometries).filter(|g| removed[*g]) {
            let vertex_range = self.vertex_start[g]..self.vertex_start[g] + self.vertex_count[g];
            let face_range = self.face_start[g]..self.face_start[g] + self.face_count[g];
            vertex_removed[vertex_range].fill(true);
            face_removed[face_range].fill(true);
        }

        let mut vertex_shift = vec![0; self.num_vertices() + 1];
        for i in 0..self.num_vertices() {
            vertex_shift[i + 1] = vertex_shift[i] + vertex_removed[i] as usize;
        }
        let mut face_shift = vec![0; self.num_faces() + 1];
        for i in 0..self.num_faces() {
            face_shift[i + 1] = face_shift[i] + face_removed[i] as usize;
        }

        let vertex_sources: Vec<_> = (0..self.num_vertices())
            .filter(|i| !vertex_removed[*i])
            .map(Some)
            .collect();
        let face_sources: Vec<_> = (0..self.num_faces())
            .filter(|i| !face_removed[*i])
            .map(Some)
            .collect();
        self.bone_map = gather(&self.bone_map, &vertex_sources, &0);
        self.gather_vertices(&vertex_sources);
        self.gather_faces(&face_sources);
        for face in &mut self.indices {
            *face = face.map(|vid| vid - vertex_shift[vid as usize] as u32);
        }

        let mut geometry_map = vec![None; num_geometries];
        let mut next = 0;
        for g in 0..num_geometries {
            if !removed[g] {
                geometry_map[g] = Some(next);
                next += 1;
            }
        }
        let geometry_sources: Vec<_> = (0..num_geometries).filter(|g| !removed[*g]).map(Some).collect();
        self.transform_index = gather(&self.transform_index, &geometry_sources, &0);
        self.vertex_start = gather(&self.vertex_start, &geometry_sources, &0)
            .into_iter()
            .map(|start| start - vertex_shift[start])
            .collect();
        self.vertex_count = gather(&self.vertex_count, &geometry_sources, &0);
        self.face_start = gather(&self.face_start, &geometry_sources, &0)
            .into_iter()
            .map(|start| start - face_shift[start])
            .collect();
        self.face_count = gather(&self.face_count, &geometry_sources, &0);
        self.bounding_boxes = gather(&self.bounding_boxes, &geometry_sources, &Aabb::new_invalid());

        for geometry in &mut self.transform_to_geometry_index {
            *geometry = geometry.and_then(|g| geometry_map.get(g).copied().flatten());
        }

        Ok(())
    }

    fn gather_vertices(&mut self, sources: &[Option<usize>]) {
        self.vertices = gather(&self.vertices, sources, &Point3::origin());
        self.normals = gather(&self.normals, sources, &Vector3::z());
        self.tangents_u = gather(&self.tangents_u, sources, &Vector3::x());
        self.tangents_v = gather(&self.tangents_v, sources, &Vector3::y());
        self.colors = gather(&self.colors, sources, &DEFAULT_VERTEX_COLOR);
        for layer in &mut self.uvs {
            *layer = gather(layer, sources, &Vector2::zeros());
        }
    }

    fn gather_faces(&mut self, sources: &[Option<usize>]) {
        self.indices = gather(&self.indices, sources, &[0; 3]);
        self.material_ids = gather(&self.material_ids, sources, &0);
        self.visible = gather(&self.visible, sources, &true);
        self.internal = gather(&self.internal, sources, &false);
    }

    /*
     * Validation.
     */
    /// Checks the invariants of this collection.
    pub fn validate(&self) -> Result<(), CollectionError> {
        fn check_len(group: &'static str, expected: usize, actual: usize) -> Result<(), CollectionError> {
            if expected != actual {
                Err(CollectionError::InconsistentGroupSize {
                    group,
                    expected,
                    actual,
                })
            } else {
                Ok(())
            }
        }

        let num_transforms = self.num_transforms();
        for len in [
            self.parents.len(),
            self.children.len(),
            self.bone_names.len(),
            self.bone_colors.len(),
            self.simulation_types.len(),
            self.transform_to_geometry_index.len(),
        ] {
            check_len("transform", num_transforms, len)?;
        }

        let num_geometries = self.num_geometries();
        for len in [
            self.vertex_start.len(),
            self.vertex_count.len(),
            self.face_start.len(),
            self.face_count.len(),
            self.bounding_boxes.len(),
        ] {
            check_len("geometry", num_geometries, len)?;
        }

        let num_vertices = self.num_vertices();
        for len in [
            self.normals.len(),
            self.tangents_u.len(),
            self.tangents_v.len(),
            self.colors.len(),
            self.bone_map.len(),
        ]
        .into_iter()
        .chain(self.uvs.iter().map(|layer| layer.len()))
        {
            check_len("vertices", num_vertices, len)?;
        }

        let num_faces = self.num_faces();
        for len in [
            self.material_ids.len(),
            self.visible.len(),
            self.internal.len(),
        ] {
            check_len("faces", num_faces, len)?;
        }

        for t in 0..num_transforms {
            if let Some(parent) = self.parents[t] {
                if parent >= num_transforms {
                    return Err(CollectionError::InvalidTransform(parent));
                }
            }

            let mut curr = self.parents[t];
            let mut depth = 0;
            while let Some(parent) = curr {
                depth += 1;
                if parent == t || depth > num_transforms {
                    return Err(CollectionError::CyclicHierarchy(t));
                }
                curr = self.parents[parent];
            }

            if let Some(g) = self.transform_to_geometry_index[t] {
                if g >= num_geometries {
                    return Err(CollectionError::InvalidGeometry(g));
                }
            }
        }

        let mut vertex_ranges = vec![];
        let mut face_ranges = vec![];
        for g in 0..num_geometries {
            let transform = self.transform_index[g];
            if transform >= num_transforms {
                return Err(CollectionError::InvalidTransform(transform));
            }
            if self.transform_to_geometry_index[transform] != Some(g) {
                return Err(CollectionError::GeometryTransformMismatch {
                    geometry: g,
                    transform,
                });
            }

            let (vstart, vend) = (self.vertex_start[g], self.vertex_start[g] + self.vertex_count[g]);
            if vend > num_vertices {
                return Err(CollectionError::InvalidVertexRange {
                    geometry: g,
                    start: vstart,
                    end: vend,
                });
            }
            let (fstart, fend) = (self.face_start[g], self.face_start[g] + self.face_count[g]);
            if fend > num_faces {
                return Err(CollectionError::InvalidFaceRange {
                    geometry: g,
                    start: fstart,
                    end: fend,
                });
            }

            for face in fstart..fend {
                for vertex in self.indices[face] {
                    if (vertex as usize) < vstart || (vertex as usize) >= vend {
                        return Err(CollectionError::IndexOutOfRange {
                            geometry: g,
                            face,
                            vertex,
                        });
                    }
                }
            }

            if vend > vstart {
                vertex_ranges.push((vstart, vend, g));
            }
            if fend > fstart {
                face_ranges.push((fstart, fend, g));
            }
        }

        vertex_ranges.sort_unstable();
        for pair in vertex_ranges.windows(2) {
            if pair[1].0 < pair[0].1 {
                return Err(CollectionError::InvalidVertexRange {
                    geometry: pair[1].2,
                    start: pair[1].0,
                    end: pair[1].1,
                });
            }
        }
        face_ranges.sort_unstable();
        for pair in face_ranges.windows(2) {
            if pair[1].0 < pair[0].1 {
                return Err(CollectionError::InvalidFaceRange {
                    geometry: pair[1].2,
                    start: pair[1].0,
                    end: pair[1].1,
                });
            }
        }

        Ok(())
    }
}
