//! Hole filling for non-welded augmented meshes.

use crate::math::{Point, Real, UnitQuaternion, UnitVector, Vector, Vector2};
use crate::shape::{AppendTriangleError, AttributeError, DynamicMesh};
use crate::transformation::{polygon_normal, triangulate_loop};
use crate::utils::hashmap::HashMap;
use crate::utils::{
    DisjointSet, PointHashGrid, FOLDED_TRIANGULATION_THRESHOLD, KINDA_SMALL_NUMBER, SNAP_DISTANCE,
};
use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

/// Parameters of [`fill_holes`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FillHolesOptions {
    /// Holes whose triangulation has a smaller total area are left open.
    pub min_hole_area: Real,
}

impl Default for FillHolesOptions {
    fn default() -> Self {
        Self {
            min_hole_area: KINDA_SMALL_NUMBER,
        }
    }
}

/// Statistics about a call to [`fill_holes`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FillHolesReport {
    /// The number of closed boundary loops found.
    pub holes_found: usize,
    /// The number of loops that received at least one triangle.
    pub holes_filled: usize,
    /// The total number of triangles inserted.
    pub triangles_added: usize,
}

/// Open oriented edges between canonical vertices, keyed by their first vertex.
///
/// Several edges may start at the same vertex. Insertion order is preserved so that
/// the loop tracing is deterministic.
#[derive(Default)]
struct OpenEdges {
    edges: IndexMap<u32, SmallVec<[(u32, u32); 2]>>,
    len: usize,
}

impl OpenEdges {
    fn insert(&mut self, a: u32, b: u32, eid: u32) {
        self.edges.entry(a).or_default().push((b, eid));
        self.len += 1;
    }

    fn remove(&mut self, a: u32, b: u32) -> bool {
        let Some(outgoing) = self.edges.get_mut(&a) else {
            return false;
        };
        let Some(pos) = outgoing.iter().position(|(other, _)| *other == b) else {
            return false;
        };

        let _ = outgoing.remove(pos);
        if outgoing.is_empty() {
            let _ = self.edges.shift_remove(&a);
        }
        self.len -= 1;
        true
    }

    fn first(&self) -> Option<(u32, (u32, u32))> {
        self.edges
            .first()
            .and_then(|(a, outgoing)| outgoing.first().map(|edge| (*a, *edge)))
    }

    fn find(&self, a: u32) -> Option<(u32, u32)> {
        self.edges.get(&a).and_then(|outgoing| outgoing.first().copied())
    }
}

/// A closed boundary loop: `edges[k]` joins `vertices[k]` and `vertices[k + 1]` (cyclically).
struct BoundaryLoop {
    vertices: Vec<u32>,
    edges: Vec<u32>,
}

impl BoundaryLoop {
    /// Iterates on `(k, k + 1)` index pairs, starting with the closing pair.
    fn index_pairs(&self) -> impl Iterator<Item = (usize, usize)> {
        let len = self.vertices.len();
        (0..len).map(move |k| ((k + len - 1) % len, k))
    }
}

fn trace_boundary_loops(open_edges: &mut OpenEdges) -> Vec<BoundaryLoop> {
    let mut loops = vec![];

    while let Some((start, (mut walk, first_edge))) = open_edges.first() {
        let _ = open_edges.remove(start, walk);
        let mut boundary = BoundaryLoop {
            vertices: vec![start],
            edges: vec![first_edge],
        };
        let mut dead_end = false;

        while walk != start {
            boundary.vertices.push(walk);
            let Some((next, eid)) = open_edges.find(walk) else {
                dead_end = true;
                break;
            };
            boundary.edges.push(eid);
            let _ = open_edges.remove(walk, next);
            walk = next;
        }

        if !dead_end && boundary.vertices.len() >= 3 {
            loops.push(boundary);
        }
    }

    loops
}

/// Fills the holes of a non-welded augmented mesh.
///
/// Only the holes touching at least one of the `candidate_edges` boundary edges are
/// considered. Vertices of different triangles closer than [`SNAP_DISTANCE`] are
/// treated as a single vertex, so holes are detected even if the mesh is not welded.
///
/// Each hole is attached to the adjacent connected component with a non-exterior
/// material whose average normal best matches the hole normal. The new triangles
/// are internal and visible, use the material of that component, and get UVs
/// continuing the UV layout of one of its boundary edges. Holes touching only
/// exterior materials, folded triangulations, and holes smaller than
/// `options.min_hole_area` are left open.
pub fn fill_holes(
    mesh: &mut DynamicMesh,
    candidate_edges: &[u32],
    options: &FillHolesOptions,
) -> Result<FillHolesReport, AttributeError> {
    if !mesh.is_augmented() {
        return Err(AttributeError::NotAugmented);
    }

    let mut report = FillHolesReport::default();
    let candidates: IndexSet<u32> = candidate_edges
        .iter()
        .copied()
        .filter(|eid| mesh.is_edge(*eid) && mesh.is_boundary_edge(*eid))
        .collect();

    /*
     * Snap the boundary vertices to canonical vertices.
     */
    let mut hash = PointHashGrid::new(SNAP_DISTANCE * 10.0);
    let mut canonical: HashMap<u32, u32> = HashMap::default();
    let mut hashed = IndexSet::new();

    for &eid in &candidates {
        for vid in mesh.edge(eid).vertices {
            if !hashed.insert(vid) {
                continue;
            }

            let pt = mesh.vertex(vid);
            if let Some((nearest, _)) = hash.find_nearest_in_radius(&pt, SNAP_DISTANCE) {
                let target = canonical.get(&nearest).copied().unwrap_or(nearest);
                let _ = canonical.insert(vid, target);
            }
            hash.insert(vid, pt);
        }
    }

    let canonical_vid = |vid: u32| canonical.get(&vid).copied().unwrap_or(vid);

    /*
     * Collect the boundary edges without a matching reverse edge.
     */
    let mut open_edges = OpenEdges::default();
    for &eid in &candidates {
        let Some([a, b]) = mesh.oriented_boundary_edge_vertices(eid) else {
            continue;
        };
        let (a, b) = (canonical_vid(a), canonical_vid(b));
        if a != b && !open_edges.remove(b, a) {
            open_edges.insert(a, b, eid);
        }
    }

    if open_edges.len < 3 {
        return Ok(report);
    }

    let loops = trace_boundary_loops(&mut open_edges);
    report.holes_found = loops.len();
    if loops.is_empty() {
        return Ok(report);
    }

    let mut components = DisjointSet::new(mesh.max_vertex_id() as usize);
    for tid in mesh.triangle_ids() {
        let [a, b, c] = mesh.triangle(tid);
        components.union(a, b);
        components.union(b, c);
    }

    /*
     * Pick the component each hole is attached to.
     */
    let mut hole_targets = Vec::with_capacity(loops.len());
    for boundary in &loops {
        let positions: Vec<_> = boundary.vertices.iter().map(|vid| mesh.vertex(*vid)).collect();
        // The loop runs along the triangles, so its own normal faces away from the surface.
        let hole_normal = -polygon_normal(&positions);
        let mut component_normals: IndexMap<u32, Vector<Real>> = IndexMap::new();

        for (last, _) in boundary.index_pairs() {
            let edge = mesh.edge(boundary.edges[last]);
            let tid = edge.triangles[0];
            if mesh.material_role(tid)?.is_exterior() {
                continue;
            }
            *component_normals
                .entry(components.find(edge.vertices[0]))
                .or_insert_with(Vector::zeros) += mesh.triangle_normal(tid);
        }

        let hole_normal = hole_normal.try_normalize(Real::EPSILON);
        let mut best: Option<(u32, Vector<Real>)> = None;
        let mut best_score = -2.0;

        for (component, normal) in &component_normals {
            let normal = normal.try_normalize(Real::EPSILON);
            let score = match (hole_normal, normal) {
                (Some(hole_normal), Some(normal)) => hole_normal.dot(&normal),
                (None, Some(_)) => 0.0,
                _ => -1.0,
            };
            if score > best_score {
                best_score = score;
                best = Some((*component, normal.unwrap_or_else(Vector::zeros)));
            }
        }

        hole_targets.push(best.map(|(component, component_normal)| {
            (component, hole_normal.unwrap_or(component_normal))
        }));
    }

    /*
     * Fill the holes.
     */
    let num_uvs = mesh.num_uv_channels();

    for (boundary, target) in loops.iter().zip(hole_targets) {
        let Some((component, hole_normal)) = target else {
            log::debug!("Skipping a hole bordered by exterior materials only.");
            continue;
        };
        let Some(axis) = UnitVector::try_new(hole_normal, Real::EPSILON) else {
            continue;
        };

        let positions: Vec<Point<Real>> =
            boundary.vertices.iter().map(|vid| mesh.vertex(*vid)).collect();
        let triangles = triangulate_loop(&positions, true);

        let mut hole_area = 0.0;
        let mut last_normal = Vector::zeros();
        let mut folded = false;
        for tri in &triangles {
            let [a, b, c] = tri.map(|i| positions[i as usize]);
            let cross = (b - a).cross(&(c - a));
            let area = cross.norm() / 2.0;
            let normal = cross.try_normalize(0.0).unwrap_or_else(Vector::zeros);
            hole_area += area;
            if last_normal.dot(&normal) < FOLDED_TRIANGULATION_THRESHOLD {
                folded = true;
                break;
            }
            if area != 0.0 {
                last_normal = normal;
            }
        }

        if hole_area < options.min_hole_area || folded {
            continue;
        }

        // The reference edge gives the hole its material and UV basis.
        let mut reference = None;
        for (last, _) in boundary.index_pairs() {
            let eid = boundary.edges[last];
            let edge = mesh.edge(eid);
            if edge.is_boundary() && components.find(edge.vertices[0]) == component {
                reference = mesh
                    .oriented_boundary_edge_vertices(eid)
                    .map(|vids| (mesh.material_id(edge.triangles[0]), vids));
                break;
            }
        }
        let Some((hole_material, [ref_a, ref_b])) = reference else {
            continue;
        };
        let hole_material = hole_material?;

        let origin = mesh.vertex(ref_a);
        let ref_edge = mesh.vertex(ref_b) - origin;
        let ref_len = ref_edge.norm();
        let mut uv_bases = Vec::with_capacity(num_uvs);
        for channel in 0..num_uvs {
            let uv_a = mesh.vertex_uv(ref_a, channel)?;
            let uv_edge = mesh.vertex_uv(ref_b, channel)? - uv_a;
            let angle = (uv_edge.y as Real).atan2(uv_edge.x as Real);
            let (dir, scale) = if ref_len > 0.0 {
                (ref_edge / ref_len, uv_edge.norm() as Real / ref_len)
            } else {
                (Vector::zeros(), 0.0)
            };
            let rot_t = UnitQuaternion::from_axis_angle(&axis, -angle);
            let rot_b = UnitQuaternion::from_axis_angle(&axis, core::f64::consts::FRAC_PI_2 - angle);
            uv_bases.push((uv_a, rot_t * dir * scale, rot_b * dir * scale));
        }

        let mut use_vids: Vec<Option<u32>> = vec![None; boundary.vertices.len()];
        for (last, k) in boundary.index_pairs() {
            let eid = boundary.edges[last];
            if !mesh.is_boundary_edge(eid) {
                continue;
            }
            if let Some([a, b]) = mesh.oriented_boundary_edge_vertices(eid) {
                if components.find(a) == component {
                    use_vids[last] = Some(a);
                    use_vids[k] = Some(b);
                }
            }
        }

        let hole_color = mesh.vertex_color(ref_a)?;
        let (hole_tangent_u, hole_tangent_v) = mesh.vertex_tangents(ref_a)?;
        let normal32 = hole_normal.cast::<f32>();
        let prev_max_vid = mesh.max_vertex_id();

        for (k, vid) in boundary.vertices.iter().enumerate() {
            if use_vids[k].is_some() {
                continue;
            }

            let pt = mesh.vertex(*vid);
            let new_vid = mesh.append_vertex(pt);
            mesh.set_vertex_color(new_vid, hole_color)?;
            mesh.set_vertex_tangents(new_vid, normal32, hole_tangent_u, hole_tangent_v)?;
            for (channel, (uv_a, t, b)) in uv_bases.iter().enumerate() {
                let diff = pt - origin;
                let uv = uv_a + Vector2::new(diff.dot(t) as f32, diff.dot(b) as f32);
                mesh.set_vertex_uv(new_vid, channel, uv)?;
            }
            use_vids[k] = Some(new_vid);
        }

        let mut added = 0;
        for tri in &triangles {
            let mut vids = [0; 3];
            for (dst, i) in vids.iter_mut().zip(tri.iter()) {
                // Every loop vertex was either reused or created above.
                *dst = use_vids[*i as usize].unwrap_or(crate::shape::INVALID_ID);
            }
            if vids[0] == vids[1] || vids[1] == vids[2] || vids[0] == vids[2] {
                continue;
            }

            let mut result = mesh.append_triangle(vids);
            if let Err(AppendTriangleError::NonManifold { .. }) = result {
                for vid in &mut vids {
                    if *vid < prev_max_vid {
                        if let Some(copy) = mesh.append_vertex_copy(*vid) {
                            mesh.set_vertex_tangents(
                                copy,
                                normal32,
                                hole_tangent_u,
                                hole_tangent_v,
                            )?;
                            *vid = copy;
                        }
                    }
                }
                result = mesh.append_triangle(vids);
            }

            match result {
                Ok(tid) => {
                    mesh.set_material_id(tid, hole_material)?;
                    mesh.set_visible(tid, true)?;
                    mesh.set_internal(tid, true)?;
                    added += 1;
                }
                Err(err) => log::warn!("Dropping a hole-filling triangle: {}", err),
            }
        }

        if added > 0 {
            report.holes_filled += 1;
            report.triangles_added += added;
        }
    }

    log::debug!(
        "Filled {} holes out of {} with {} triangles.",
        report.holes_filled,
        report.holes_found,
        report.triangles_added
    );

    Ok(report)
}
