//! Densification of meshes with isolated vertices used as collision samples.

use crate::math::{Point, Real, Vector};
use crate::shape::{AttributeError, DynamicMesh, DEFAULT_VERTEX_COLOR};
use crate::utils::hashmap::{Entry, HashMap};
use crate::utils::{DisjointSet, PointHashGrid, INV_SQRT_3};

/// Groups the live triangles of `mesh` connected through shared edges.
///
/// Components are ordered by their first triangle, and triangles are increasing
/// inside of each component.
pub fn edge_connected_components(mesh: &DynamicMesh) -> Vec<Vec<u32>> {
    let mut sets = DisjointSet::new(mesh.max_triangle_id() as usize);
    for eid in mesh.edge_ids() {
        let edge = mesh.edge(eid);
        if !edge.is_boundary() {
            sets.union(edge.triangles[0], edge.triangles[1]);
        }
    }

    let mut root_to_component: HashMap<_, usize> = HashMap::default();
    let mut components: Vec<Vec<u32>> = vec![];
    for tid in mesh.triangle_ids() {
        match root_to_component.entry(sets.find(tid)) {
            Entry::Occupied(entry) => components[*entry.get()].push(tid),
            Entry::Vacant(entry) => {
                let _ = entry.insert(components.len());
                components.push(vec![tid]);
            }
        }
    }

    components
}

/// Adds isolated vertices to `mesh` so that its surfaces are sampled at least every `spacing`.
///
/// Each triangle whose longest edge exceeds `spacing` is sampled on a grid spanned
/// by its two longest edges. A sample is kept only if no vertex of the same
/// connected component (original or previously added) lies closer than
/// `spacing / 2`. New vertices get the normal of their triangle and the default
/// color. Returns the number of vertices added.
///
/// Sampling per component keeps the samples of a thin slab on both of its sides.
pub fn add_collision_samples_per_component(
    mesh: &mut DynamicMesh,
    spacing: Real,
) -> Result<usize, AttributeError> {
    if !mesh.is_augmented() {
        return Err(AttributeError::NotAugmented);
    }
    if spacing <= 0.0 {
        return Ok(0);
    }

    let components = edge_connected_components(mesh);
    let mut known_samples: Vec<_> = components
        .iter()
        .map(|_| PointHashGrid::new(0.5 * spacing / INV_SQRT_3))
        .collect();

    let mut seen = vec![usize::MAX; mesh.max_vertex_id() as usize];
    for (component_id, component) in components.iter().enumerate() {
        for &tid in component {
            for vid in mesh.triangle(tid) {
                if seen[vid as usize] != component_id {
                    seen[vid as usize] = component_id;
                    known_samples[component_id].insert(vid, mesh.vertex(vid));
                }
            }
        }
    }

    let spacing_sq = spacing * spacing;
    let mut num_added = 0;

    for (component, samples) in components.iter().zip(known_samples.iter_mut()) {
        for &tid in component {
            let pts = mesh.triangle_points(tid);
            let mut edge_lens_sq = [0.0; 3];
            let mut max_edge = 0;
            let mut max_edge_len_sq = 0.0;
            // Edge `i` joins `pts[i]` and `pts[(i + 1) % 3]`.
            for i in [2, 0, 1] {
                let len_sq = na::distance_squared(&pts[i], &pts[(i + 1) % 3]);
                if len_sq > max_edge_len_sq {
                    max_edge = i;
                    max_edge_len_sq = len_sq;
                }
                edge_lens_sq[i] = len_sq;
            }

            if max_edge_len_sq <= spacing_sq {
                continue;
            }

            let normal = mesh.triangle_normal(tid).cast::<f32>();
            let divisions = (max_edge_len_sq.sqrt() / spacing).floor() as usize;
            let factor = 1.0 / (divisions + 1) as Real;
            let second_edge = (max_edge + 1) % 3;
            let third_edge = (max_edge + 2) % 3;
            let second_longest = if edge_lens_sq[second_edge] < edge_lens_sq[third_edge] {
                third_edge
            } else {
                second_edge
            };

            let barycentric_point = |bary: &Vector<Real>| {
                Point::from(pts[0].coords * bary[0] + pts[1].coords * bary[1] + pts[2].coords * bary[2])
            };

            for div_i in 0..divisions {
                let along = (div_i + 1) as Real * factor;
                let mut e1 = Vector::zeros();
                let mut e2 = Vector::zeros();
                e1[max_edge] = along;
                e1[second_edge] = 1.0 - along;
                e2[second_longest] = 1.0 - along;
                e2[(second_longest + 1) % 3] = along;

                let across = na::distance(&barycentric_point(&e1), &barycentric_point(&e2));
                let divisions_across = (across / spacing).ceil() as usize;
                let factor_across = 1.0 / (divisions_across + 1) as Real;

                for div_j in 0..divisions_across {
                    let bary = e1.lerp(&e2, (div_j + 1) as Real * factor_across);
                    let sample = barycentric_point(&bary);

                    // Samples sharing a cell with a known sample are skipped early.
                    if !samples.is_cell_empty(&sample) {
                        continue;
                    }
                    if samples.find_nearest_in_radius(&sample, spacing * 0.5).is_some() {
                        continue;
                    }

                    let vid = mesh.append_vertex(sample);
                    mesh.set_vertex_normal(vid, normal)?;
                    mesh.set_vertex_color(vid, DEFAULT_VERTEX_COLOR)?;
                    samples.insert(vid, sample);
                    num_added += 1;
                }
            }
        }
    }

    log::debug!("Added {} collision samples.", num_added);
    Ok(num_added)
}
