//! Splitting of non-welded meshes into their disconnected islands.

use crate::conversion::spatial_sort::compute_nesting;
use crate::shape::DynamicMesh;
use crate::utils::{DisjointSet, PointHashGrid, SNAP_DISTANCE};

/// Groups the vertices of `mesh` that are coincident (closer than [`SNAP_DISTANCE`])
/// or connected by triangles.
///
/// The returned set is indexed by vertex identifier, so tombstoned vertices remain
/// singletons.
pub fn coincident_vertex_components(mesh: &DynamicMesh) -> DisjointSet {
    let mut hash = PointHashGrid::new(SNAP_DISTANCE * 10.0);
    let mut components = DisjointSet::new(mesh.max_vertex_id() as usize);

    for vid in mesh.vertex_ids() {
        let pt = mesh.vertex(vid);
        for neighbor in hash.find_points_in_ball(&pt, SNAP_DISTANCE) {
            components.union(vid, neighbor);
        }
        hash.insert(vid, pt);
    }

    for tid in mesh.triangle_ids() {
        let [a, b, c] = mesh.triangle(tid);
        components.union(a, b);
        components.union(b, c);
    }

    components
}

/// Splits `mesh` into its islands.
///
/// Two triangles belong to the same island if they are connected through shared or
/// coincident vertices. Islands enclosed by another island are merged back into
/// the largest island enclosing them, so that cavities stay attached to their shell.
///
/// Returns `None` if fewer than two islands remain once nested islands are merged
/// back (a single island, a shell with its cavities, or no triangle). The input
/// mesh is never modified.
pub fn split_islands(mesh: &DynamicMesh) -> Option<Vec<DynamicMesh>> {
    let mut components = coincident_vertex_components(mesh);
    let mut islands = mesh.split_by_component(|tid| components.find(mesh.triangle(tid)[0]));

    if islands.len() < 2 {
        return None;
    }

    let nests = compute_nesting(&islands);
    let mut keep = vec![true; islands.len()];

    for nest in &nests {
        for &inner in &nest.inners {
            let inner_mesh = core::mem::take(&mut islands[inner]);
            let _ = islands[nest.outer].append_mesh(&inner_mesh);
            keep[inner] = false;
        }
    }

    if !nests.is_empty() {
        log::debug!(
            "Merged {} nested islands back into their enclosing island.",
            keep.iter().filter(|k| !**k).count()
        );
    }

    let mut keep = keep.into_iter();
    islands.retain(|_| keep.next().unwrap_or(true));
    if islands.len() < 2 {
        return None;
    }
    Some(islands)
}
