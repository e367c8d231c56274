use crate::bounding_volume::Aabb;
use crate::math::{Point, Real, Vector};
use crate::shape::augmented::AugmentedAttributes;
use crate::utils::hashmap::{Entry, HashMap};
use na::Vector3;
use smallvec::SmallVec;

/// The identifier used to denote a missing vertex, triangle or edge.
pub const INVALID_ID: u32 = u32::MAX;

/// Indicates why a triangle could not be inserted into a [`DynamicMesh`].
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum AppendTriangleError {
    /// The triangle references a vertex that does not exist.
    #[error("the triangle references the missing vertex {0}.")]
    InvalidVertex(u32),
    /// The triangle has at least two identical vertices.
    #[error("the triangle has at least two identical vertices.")]
    Degenerate,
    /// The triangle would make the mesh non-manifold.
    ///
    /// Either the edge already has two triangles, or its only triangle already
    /// traverses it in the same direction.
    #[error("the edge {edge:?} cannot be shared by one more triangle.")]
    NonManifold {
        /// The vertices of the offending edge, in the order of the rejected triangle.
        edge: [u32; 2],
    },
}

/// An edge of a [`DynamicMesh`].
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MeshEdge {
    /// The two vertices of this edge, sorted by increasing identifier.
    pub vertices: [u32; 2],
    /// The triangles sharing this edge. The second one is [`INVALID_ID`] on a boundary edge.
    pub triangles: [u32; 2],
}

impl MeshEdge {
    /// Is this edge adjacent to exactly one triangle?
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.triangles[1] == INVALID_ID
    }

    /// The vertex of this edge that is not `vid`.
    #[inline]
    pub fn other_vertex(&self, vid: u32) -> u32 {
        if self.vertices[0] == vid {
            self.vertices[1]
        } else {
            self.vertices[0]
        }
    }
}

/// Maps the identifiers of a mesh to the identifiers they were given in another mesh.
///
/// Identifiers without a counterpart map to [`INVALID_ID`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshIndexMap {
    /// `vertices[old_vid]` is the new identifier of the vertex `old_vid`.
    pub vertices: Vec<u32>,
    /// `triangles[old_tid]` is the new identifier of the triangle `old_tid`.
    pub triangles: Vec<u32>,
}

/// An indexed triangle mesh supporting incremental insertion and removal.
///
/// Vertices, triangles and edges live in arenas indexed by `u32` identifiers.
/// Removed elements leave tombstones behind so that the identifiers of the
/// other elements remain stable; [`DynamicMesh::compact_in_place`] removes them.
///
/// The topology is restricted to orientable manifold configurations: each
/// edge is shared by at most two triangles traversing it in opposite
/// directions. Non-welded geometry (coincident but distinct vertices) is allowed.
///
/// The mesh optionally carries per-vertex normals and the fixed attribute set
/// described in [`crate::shape::augmented`].
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default)]
pub struct DynamicMesh {
    vertices: Vec<Point<Real>>,
    vertex_alive: Vec<bool>,
    vertex_edges: Vec<SmallVec<[u32; 8]>>,
    triangles: Vec<[u32; 3]>,
    triangle_alive: Vec<bool>,
    // Edge `k` of a triangle joins its vertices `k` and `(k + 1) % 3`.
    triangle_edges: Vec<[u32; 3]>,
    edges: Vec<MeshEdge>,
    edge_alive: Vec<bool>,
    num_vertices: usize,
    num_triangles: usize,
    num_edges: usize,
    pub(crate) normals: Option<Vec<Vector3<f32>>>,
    pub(crate) attributes: Option<AugmentedAttributes>,
}

fn retain_alive<T>(data: &mut Vec<T>, alive: &[bool]) {
    let mut i = 0;
    data.retain(|_| {
        i += 1;
        alive[i - 1]
    });
}

fn compaction_map(alive: &[bool]) -> Vec<u32> {
    let mut next = 0;
    alive
        .iter()
        .map(|alive| {
            if *alive {
                next += 1;
                next - 1
            } else {
                INVALID_ID
            }
        })
        .collect()
}

impl DynamicMesh {
    /// Creates an empty mesh without attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mesh from a vertex buffer and an index buffer.
    ///
    /// Triangles that cannot be inserted are skipped and logged.
    pub fn from_vertices_and_indices(vertices: &[Point<Real>], indices: &[[u32; 3]]) -> Self {
        let mut mesh = Self::new();
        for pt in vertices {
            let _ = mesh.append_vertex(*pt);
        }
        for tri in indices {
            if let Err(err) = mesh.append_triangle(*tri) {
                log::warn!("Skipping triangle {:?}: {}", tri, err);
            }
        }
        mesh
    }

    /*
     * Counts and identifiers.
     */
    /// The number of live vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.num_vertices
    }

    /// The number of live triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.num_triangles
    }

    /// The number of live edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.num_edges
    }

    /// One plus the largest vertex identifier ever allocated.
    #[inline]
    pub fn max_vertex_id(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// One plus the largest triangle identifier ever allocated.
    #[inline]
    pub fn max_triangle_id(&self) -> u32 {
        self.triangles.len() as u32
    }

    /// One plus the largest edge identifier ever allocated.
    #[inline]
    pub fn max_edge_id(&self) -> u32 {
        self.edges.len() as u32
    }

    /// Is `vid` the identifier of a live vertex?
    #[inline]
    pub fn is_vertex(&self, vid: u32) -> bool {
        self.vertex_alive.get(vid as usize).copied().unwrap_or(false)
    }

    /// Is `tid` the identifier of a live triangle?
    #[inline]
    pub fn is_triangle(&self, tid: u32) -> bool {
        self.triangle_alive.get(tid as usize).copied().unwrap_or(false)
    }

    /// Is `eid` the identifier of a live edge?
    #[inline]
    pub fn is_edge(&self, eid: u32) -> bool {
        self.edge_alive.get(eid as usize).copied().unwrap_or(false)
    }

    /// Are the vertex and triangle identifier spaces free of tombstones?
    pub fn is_compact(&self) -> bool {
        self.num_vertices == self.vertices.len() && self.num_triangles == self.triangles.len()
    }

    /// Iterates through the identifiers of the live vertices.
    pub fn vertex_ids(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.max_vertex_id()).filter(|vid| self.vertex_alive[*vid as usize])
    }

    /// Iterates through the identifiers of the live triangles.
    pub fn triangle_ids(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.max_triangle_id()).filter(|tid| self.triangle_alive[*tid as usize])
    }

    /// Iterates through the identifiers of the live edges.
    pub fn edge_ids(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.max_edge_id()).filter(|eid| self.edge_alive[*eid as usize])
    }

    /*
     * Element access.
     */
    /// The position of the vertex `vid`.
    #[inline]
    pub fn vertex(&self, vid: u32) -> Point<Real> {
        self.vertices[vid as usize]
    }

    /// Moves the vertex `vid` to `pt`.
    #[inline]
    pub fn set_vertex(&mut self, vid: u32, pt: Point<Real>) {
        self.vertices[vid as usize] = pt;
    }

    /// The vertex identifiers of the triangle `tid`.
    #[inline]
    pub fn triangle(&self, tid: u32) -> [u32; 3] {
        self.triangles[tid as usize]
    }

    /// The vertex positions of the triangle `tid`.
    #[inline]
    pub fn triangle_points(&self, tid: u32) -> [Point<Real>; 3] {
        self.triangles[tid as usize].map(|vid| self.vertices[vid as usize])
    }

    /// The edge identifiers of the triangle `tid`.
    ///
    /// The edge `k` joins the triangle vertices `k` and `(k + 1) % 3`.
    #[inline]
    pub fn triangle_edges(&self, tid: u32) -> [u32; 3] {
        self.triangle_edges[tid as usize]
    }

    /// The edge `eid`.
    #[inline]
    pub fn edge(&self, eid: u32) -> MeshEdge {
        self.edges[eid as usize]
    }

    /// The identifiers of the edges attached to the vertex `vid`.
    #[inline]
    pub fn vertex_edges(&self, vid: u32) -> &[u32] {
        &self.vertex_edges[vid as usize]
    }

    /// Is the vertex `vid` attached to no triangle?
    #[inline]
    pub fn is_isolated_vertex(&self, vid: u32) -> bool {
        self.vertex_edges[vid as usize].is_empty()
    }

    /// The identifiers of the triangles sharing the vertex `vid`, without duplicates.
    pub fn vertex_triangles(&self, vid: u32) -> Vec<u32> {
        let mut result: Vec<u32> = self.vertex_edges[vid as usize]
            .iter()
            .flat_map(|eid| self.edges[*eid as usize].triangles)
            .filter(|tid| *tid != INVALID_ID)
            .collect();
        result.sort_unstable();
        result.dedup();
        result
    }

    /// The edge joining `a` and `b`, if any.
    pub fn find_edge(&self, a: u32, b: u32) -> Option<u32> {
        if !self.is_vertex(a) || !self.is_vertex(b) {
            return None;
        }

        self.vertex_edges[a as usize]
            .iter()
            .copied()
            .find(|eid| self.edges[*eid as usize].other_vertex(a) == b)
    }

    /// Is `eid` a live edge with exactly one adjacent triangle?
    #[inline]
    pub fn is_boundary_edge(&self, eid: u32) -> bool {
        self.is_edge(eid) && self.edges[eid as usize].is_boundary()
    }

    /// Iterates through the identifiers of the boundary edges.
    pub fn boundary_edges(&self) -> impl Iterator<Item = u32> + '_ {
        self.edge_ids().filter(|eid| self.edges[*eid as usize].is_boundary())
    }

    /// The vertices of the boundary edge `eid`, in the order in which its only triangle traverses them.
    pub fn oriented_boundary_edge_vertices(&self, eid: u32) -> Option<[u32; 2]> {
        if !self.is_boundary_edge(eid) {
            return None;
        }

        let tid = self.edges[eid as usize].triangles[0];
        let k = self.triangle_edges[tid as usize]
            .iter()
            .position(|e| *e == eid)?;
        let tri = self.triangles[tid as usize];
        Some([tri[k], tri[(k + 1) % 3]])
    }

    /*
     * Geometric queries.
     */
    /// The unit normal of the triangle `tid`, or zero if it is degenerate.
    pub fn triangle_normal(&self, tid: u32) -> Vector<Real> {
        let [a, b, c] = self.triangle_points(tid);
        (b - a)
            .cross(&(c - a))
            .try_normalize(Real::EPSILON)
            .unwrap_or_else(Vector::zeros)
    }

    /// The area of the triangle `tid`.
    pub fn triangle_area(&self, tid: u32) -> Real {
        let [a, b, c] = self.triangle_points(tid);
        (b - a).cross(&(c - a)).norm() * 0.5
    }

    /// The centroid of the triangle `tid`.
    pub fn triangle_centroid(&self, tid: u32) -> Point<Real> {
        let [a, b, c] = self.triangle_points(tid);
        Point::from((a.coords + b.coords + c.coords) / 3.0)
    }

    /// The bounding box of all the live vertices, isolated ones included.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.vertex_ids().map(|vid| self.vertices[vid as usize]))
    }

    /*
     * Insertion.
     */
    /// Adds a vertex and returns its identifier.
    ///
    /// If the mesh carries attributes, the new vertex gets the default ones.
    pub fn append_vertex(&mut self, pt: Point<Real>) -> u32 {
        let vid = self.vertices.len() as u32;
        self.vertices.push(pt);
        self.vertex_alive.push(true);
        self.vertex_edges.push(SmallVec::new());
        self.num_vertices += 1;

        if let Some(normals) = &mut self.normals {
            normals.push(Vector3::z());
        }
        if let Some(attributes) = &mut self.attributes {
            attributes.push_default_vertex();
        }

        vid
    }

    /// Adds a copy of the vertex `vid`, including its normal and attributes.
    ///
    /// Returns `None` if `vid` is not a live vertex.
    pub fn append_vertex_copy(&mut self, vid: u32) -> Option<u32> {
        if !self.is_vertex(vid) {
            return None;
        }

        let new_vid = self.vertices.len() as u32;
        self.vertices.push(self.vertices[vid as usize]);
        self.vertex_alive.push(true);
        self.vertex_edges.push(SmallVec::new());
        self.num_vertices += 1;

        if let Some(normals) = &mut self.normals {
            normals.push(normals[vid as usize]);
        }
        if let Some(attributes) = &mut self.attributes {
            attributes.push_vertex_copy(vid as usize);
        }

        Some(new_vid)
    }

    /// Adds the triangle with the given vertices and returns its identifier.
    ///
    /// The insertion is atomic: the mesh is left untouched if an error is returned.
    pub fn append_triangle(&mut self, tri: [u32; 3]) -> Result<u32, AppendTriangleError> {
        for vid in tri {
            if !self.is_vertex(vid) {
                return Err(AppendTriangleError::InvalidVertex(vid));
            }
        }

        if tri[0] == tri[1] || tri[0] == tri[2] || tri[1] == tri[2] {
            return Err(AppendTriangleError::Degenerate);
        }

        let mut existing = [None; 3];
        for k in 0..3 {
            let (a, b) = (tri[k], tri[(k + 1) % 3]);
            if let Some(eid) = self.find_edge(a, b) {
                let edge = self.edges[eid as usize];
                if !edge.is_boundary() || self.traverses_edge(edge.triangles[0], a, b) {
                    return Err(AppendTriangleError::NonManifold { edge: [a, b] });
                }
                existing[k] = Some(eid);
            }
        }

        let tid = self.triangles.len() as u32;
        let mut tri_edges = [INVALID_ID; 3];
        for k in 0..3 {
            tri_edges[k] = match existing[k] {
                Some(eid) => {
                    self.edges[eid as usize].triangles[1] = tid;
                    eid
                }
                None => self.append_edge(tri[k], tri[(k + 1) % 3], tid),
            };
        }

        self.triangles.push(tri);
        self.triangle_alive.push(true);
        self.triangle_edges.push(tri_edges);
        self.num_triangles += 1;

        if let Some(attributes) = &mut self.attributes {
            attributes.push_default_triangle();
        }

        Ok(tid)
    }

    fn traverses_edge(&self, tid: u32, a: u32, b: u32) -> bool {
        let tri = self.triangles[tid as usize];
        (0..3).any(|k| tri[k] == a && tri[(k + 1) % 3] == b)
    }

    fn append_edge(&mut self, a: u32, b: u32, tid: u32) -> u32 {
        let eid = self.edges.len() as u32;
        self.edges.push(MeshEdge {
            vertices: [a.min(b), a.max(b)],
            triangles: [tid, INVALID_ID],
        });
        self.edge_alive.push(true);
        self.vertex_edges[a as usize].push(eid);
        self.vertex_edges[b as usize].push(eid);
        self.num_edges += 1;
        eid
    }

    /*
     * Removal.
     */
    /// Removes the triangle `tid`.
    ///
    /// Edges left without triangles are removed. If `remove_isolated_vertices` is
    /// `true`, the vertices of the triangle left without edges are removed too.
    /// Returns `false` if `tid` is not a live triangle.
    pub fn remove_triangle(&mut self, tid: u32, remove_isolated_vertices: bool) -> bool {
        if !self.is_triangle(tid) {
            return false;
        }

        for eid in self.triangle_edges[tid as usize] {
            let edge = &mut self.edges[eid as usize];
            if edge.triangles[0] == tid {
                edge.triangles = [edge.triangles[1], INVALID_ID];
            } else if edge.triangles[1] == tid {
                edge.triangles[1] = INVALID_ID;
            }

            if edge.triangles[0] == INVALID_ID {
                let [a, b] = edge.vertices;
                self.edge_alive[eid as usize] = false;
                self.num_edges -= 1;
                self.vertex_edges[a as usize].retain(|e| *e != eid);
                self.vertex_edges[b as usize].retain(|e| *e != eid);
            }
        }

        self.triangle_alive[tid as usize] = false;
        self.num_triangles -= 1;

        if remove_isolated_vertices {
            for vid in self.triangles[tid as usize] {
                if self.vertex_alive[vid as usize] && self.vertex_edges[vid as usize].is_empty() {
                    self.vertex_alive[vid as usize] = false;
                    self.num_vertices -= 1;
                }
            }
        }

        true
    }

    /// Removes every vertex attached to no triangle and returns how many were removed.
    pub fn remove_isolated_vertices(&mut self) -> usize {
        let mut removed = 0;
        for vid in 0..self.vertices.len() {
            if self.vertex_alive[vid] && self.vertex_edges[vid].is_empty() {
                self.vertex_alive[vid] = false;
                removed += 1;
            }
        }
        self.num_vertices -= removed;
        removed
    }

    /// Removes all the tombstones, renumbering vertices, triangles and edges.
    ///
    /// The relative order of the live elements is preserved. Returns the mapping
    /// from the old identifiers to the new ones.
    pub fn compact_in_place(&mut self) -> MeshIndexMap {
        let vertex_map = compaction_map(&self.vertex_alive);
        let triangle_map = compaction_map(&self.triangle_alive);
        let edge_map = compaction_map(&self.edge_alive);

        retain_alive(&mut self.vertices, &self.vertex_alive);
        retain_alive(&mut self.vertex_edges, &self.vertex_alive);
        if let Some(normals) = &mut self.normals {
            retain_alive(normals, &self.vertex_alive);
        }

        retain_alive(&mut self.triangles, &self.triangle_alive);
        retain_alive(&mut self.triangle_edges, &self.triangle_alive);
        retain_alive(&mut self.edges, &self.edge_alive);

        if let Some(attributes) = &mut self.attributes {
            attributes.retain_alive(&self.vertex_alive, &self.triangle_alive);
        }

        for edges in &mut self.vertex_edges {
            for eid in edges.iter_mut() {
                *eid = edge_map[*eid as usize];
            }
        }
        for tri in &mut self.triangles {
            *tri = tri.map(|vid| vertex_map[vid as usize]);
        }
        for tri_edges in &mut self.triangle_edges {
            *tri_edges = tri_edges.map(|eid| edge_map[eid as usize]);
        }
        for edge in &mut self.edges {
            edge.vertices = edge.vertices.map(|vid| vertex_map[vid as usize]);
            edge.triangles = edge.triangles.map(|tid| {
                if tid == INVALID_ID {
                    INVALID_ID
                } else {
                    triangle_map[tid as usize]
                }
            });
        }

        self.vertex_alive = vec![true; self.vertices.len()];
        self.triangle_alive = vec![true; self.triangles.len()];
        self.edge_alive = vec![true; self.edges.len()];

        MeshIndexMap {
            vertices: vertex_map,
            triangles: triangle_map,
        }
    }

    /*
     * Whole-mesh operations.
     */
    /// Appends all the live vertices and triangles of `other` to this mesh.
    ///
    /// Normals and attributes are copied when both meshes carry them. Triangles
    /// of `other` that cannot be inserted are skipped and map to [`INVALID_ID`].
    pub fn append_mesh(&mut self, other: &DynamicMesh) -> MeshIndexMap {
        let mut map = MeshIndexMap {
            vertices: vec![INVALID_ID; other.vertices.len()],
            triangles: vec![INVALID_ID; other.triangles.len()],
        };

        for vid in other.vertex_ids() {
            let new_vid = self.append_vertex(other.vertices[vid as usize]);
            if let (Some(dst), Some(src)) = (&mut self.normals, &other.normals) {
                dst[new_vid as usize] = src[vid as usize];
            }
            if let (Some(dst), Some(src)) = (&mut self.attributes, &other.attributes) {
                dst.copy_vertex_from(new_vid as usize, src, vid as usize);
            }
            map.vertices[vid as usize] = new_vid;
        }

        for tid in other.triangle_ids() {
            let tri = other.triangles[tid as usize].map(|vid| map.vertices[vid as usize]);
            match self.append_triangle(tri) {
                Ok(new_tid) => {
                    if let (Some(dst), Some(src)) = (&mut self.attributes, &other.attributes) {
                        dst.copy_triangle_from(new_tid as usize, src, tid as usize);
                    }
                    map.triangles[tid as usize] = new_tid;
                }
                Err(err) => log::warn!("Failed to append triangle {}: {}", tid, err),
            }
        }

        map
    }

    /// Splits this mesh into one mesh per distinct triangle key.
    ///
    /// `key` is evaluated once for each live triangle. The resulting meshes are
    /// ordered by the first appearance of their key, carry the same normals and
    /// attribute layout as `self`, and contain only the vertices referenced by their
    /// triangles (isolated vertices are dropped).
    pub fn split_by_component(&self, mut key: impl FnMut(u32) -> u32) -> Vec<DynamicMesh> {
        let mut key_to_part: HashMap<u32, usize> = HashMap::default();
        let mut parts: Vec<(DynamicMesh, HashMap<u32, u32>)> = vec![];

        for tid in self.triangle_ids() {
            let part_id = match key_to_part.entry(key(tid)) {
                Entry::Occupied(entry) => *entry.get(),
                Entry::Vacant(entry) => {
                    parts.push((self.empty_like(), HashMap::default()));
                    *entry.insert(parts.len() - 1)
                }
            };

            let (part, vertex_map) = &mut parts[part_id];
            let tri = self.triangles[tid as usize].map(|vid| {
                *vertex_map.entry(vid).or_insert_with(|| {
                    let new_vid = part.append_vertex(self.vertices[vid as usize]);
                    if let (Some(dst), Some(src)) = (&mut part.normals, &self.normals) {
                        dst[new_vid as usize] = src[vid as usize];
                    }
                    if let (Some(dst), Some(src)) = (&mut part.attributes, &self.attributes) {
                        dst.copy_vertex_from(new_vid as usize, src, vid as usize);
                    }
                    new_vid
                })
            });

            // The source triangle was valid so it cannot be rejected by a subset of its mesh.
            if let Ok(new_tid) = part.append_triangle(tri) {
                if let (Some(dst), Some(src)) = (&mut part.attributes, &self.attributes) {
                    dst.copy_triangle_from(new_tid as usize, src, tid as usize);
                }
            }
        }

        parts.into_iter().map(|(part, _)| part).collect()
    }

    /// An empty mesh with the same normal and attribute layout as `self`.
    pub fn empty_like(&self) -> DynamicMesh {
        DynamicMesh {
            normals: self.normals.as_ref().map(|_| vec![]),
            attributes: self.attributes.as_ref().map(|attrs| attrs.empty_like()),
            ..DynamicMesh::default()
        }
    }

    /// The signed volume enclosed by this mesh.
    ///
    /// Positive for a closed mesh with outward-facing triangles. Meaningless for open meshes.
    pub fn signed_volume(&self) -> Real {
        self.triangle_ids()
            .map(|tid| {
                let [a, b, c] = self.triangle_points(tid);
                a.coords.dot(&b.coords.cross(&c.coords))
            })
            .sum::<Real>()
            / 6.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> DynamicMesh {
        DynamicMesh::from_vertices_and_indices(
            &[
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(1.0, 1.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
            ],
            &[[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn shared_edge_topology() {
        let mesh = quad();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.edge_count(), 5);

        let diagonal = mesh.find_edge(2, 0).unwrap();
        assert!(!mesh.is_boundary_edge(diagonal));
        assert_eq!(mesh.edge(diagonal).triangles, [0, 1]);
        assert_eq!(mesh.boundary_edges().count(), 4);

        let bottom = mesh.find_edge(0, 1).unwrap();
        assert_eq!(mesh.oriented_boundary_edge_vertices(bottom), Some([0, 1]));
        assert_eq!(mesh.vertex_triangles(0), vec![0, 1]);
        assert_eq!(mesh.vertex_triangles(1), vec![0]);
    }

    #[test]
    fn rejected_triangles_leave_mesh_untouched() {
        let mut mesh = quad();
        assert_eq!(
            mesh.append_triangle([0, 1, 3]),
            Err(AppendTriangleError::NonManifold { edge: [0, 1] })
        );
        assert_eq!(
            mesh.append_triangle([0, 0, 3]),
            Err(AppendTriangleError::Degenerate)
        );
        assert_eq!(
            mesh.append_triangle([0, 1, 7]),
            Err(AppendTriangleError::InvalidVertex(7))
        );

        // A third triangle on the diagonal.
        let apex = mesh.append_vertex(Point::new(0.5, 0.5, 1.0));
        assert_eq!(
            mesh.append_triangle([0, 2, apex]),
            Err(AppendTriangleError::NonManifold { edge: [0, 2] })
        );
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.edge_count(), 5);
        assert!(mesh.is_isolated_vertex(apex));
    }

    #[test]
    fn removal_and_compaction() {
        let mut mesh = quad();
        assert!(mesh.remove_triangle(0, true));
        assert!(!mesh.remove_triangle(0, true));
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.edge_count(), 3);
        assert!(!mesh.is_compact());

        let map = mesh.compact_in_place();
        assert!(mesh.is_compact());
        assert_eq!(map.vertices, vec![0, INVALID_ID, 1, 2]);
        assert_eq!(map.triangles, vec![INVALID_ID, 0]);
        assert_eq!(mesh.triangle(0), [0, 1, 2]);
        assert_eq!(mesh.vertex(1), Point::new(1.0, 1.0, 0.0));

        for eid in mesh.triangle_edges(0) {
            assert!(mesh.is_boundary_edge(eid));
            assert_eq!(mesh.edge(eid).triangles[0], 0);
        }
        assert_eq!(mesh.find_edge(2, 0), Some(mesh.triangle_edges(0)[2]));
    }

    #[test]
    fn split_by_component_drops_isolated_vertices() {
        let mut mesh = quad();
        let _ = mesh.append_vertex(Point::new(5.0, 5.0, 5.0));
        let base = mesh.append_vertex(Point::new(3.0, 0.0, 0.0));
        let _ = mesh.append_vertex(Point::new(4.0, 0.0, 0.0));
        let _ = mesh.append_vertex(Point::new(4.0, 1.0, 0.0));
        let _ = mesh.append_triangle([base, base + 1, base + 2]).unwrap();

        let parts = mesh.split_by_component(|tid| if tid < 2 { 7 } else { 3 });
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].vertex_count(), 4);
        assert_eq!(parts[0].triangle_count(), 2);
        assert_eq!(parts[1].vertex_count(), 3);
        assert_eq!(parts[1].triangle_count(), 1);
        assert_eq!(parts[1].vertex(0), Point::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn append_mesh_offsets_indices() {
        let mut mesh = quad();
        let map = mesh.append_mesh(&quad());
        assert_eq!(map.vertices, vec![4, 5, 6, 7]);
        assert_eq!(map.triangles, vec![2, 3]);
        assert_eq!(mesh.triangle(3), [4, 6, 7]);
        assert_eq!(mesh.boundary_edges().count(), 8);
    }

    #[test]
    fn tetrahedron_volume() {
        let mesh = DynamicMesh::from_vertices_and_indices(
            &[
                Point::new(0.0, 0.0, 0.0),
                Point::new(1.0, 0.0, 0.0),
                Point::new(0.0, 1.0, 0.0),
                Point::new(0.0, 0.0, 1.0),
            ],
            &[[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        );
        assert_eq!(mesh.boundary_edges().count(), 0);
        assert_relative_eq!(mesh.signed_volume(), 1.0 / 6.0, epsilon = 1.0e-12);
    }
}
