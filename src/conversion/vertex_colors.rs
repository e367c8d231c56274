//! Propagation of known vertex colors to the vertices whose color is unset.
//!
//! The unknown colors of each connected component are the solution of a discrete
//! Laplace equation whose boundary conditions are the known colors of coincident
//! vertices: known colors diffuse smoothly over the surfaces lacking them.

use crate::math::{Color, Point, Real};
use crate::shape::{is_unset_color, GeometryCollection, DEFAULT_VERTEX_COLOR};
use crate::utils::hashmap::HashSet;
use crate::utils::{DisjointSet, PointHashGrid, COLOR_EDGE_WEIGHT, COPY_COLOR_DISTANCE};
use na::DMatrix;
use nalgebra_sparse::factorization::CscCholesky;
use nalgebra_sparse::{CooMatrix, CscMatrix};

const UNMAPPED: u32 = u32::MAX;

/// A symmetric connection between two vertices of the diffusion graph.
#[derive(Copy, Clone, Debug)]
struct ColorLink {
    vertices: [u32; 2],
    weight: f32,
}

impl ColorLink {
    fn edge(a: u32, b: u32) -> Self {
        Self {
            vertices: [a, b],
            weight: COLOR_EDGE_WEIGHT,
        }
    }
}

/// Replaces the unset vertex colors of the geometries `first_geometry..`.
///
/// If `propagate_from_neighbors` is `true`, unset colors are first computed by
/// diffusing the colors of known vertices coincident (closer than
/// [`COPY_COLOR_DISTANCE`] in the collection space) with vertices of unset
/// triangles, over the connected components of these triangles. Every color still
/// unset afterwards is replaced by [`DEFAULT_VERTEX_COLOR`].
pub fn set_unset_colors(
    collection: &mut GeometryCollection,
    first_geometry: usize,
    propagate_from_neighbors: bool,
) {
    let num_geometries = collection.num_geometries();
    if first_geometry >= num_geometries {
        return;
    }

    if propagate_from_neighbors {
        propagate_known_colors(collection, first_geometry);
    }

    for g in first_geometry..num_geometries {
        let start = collection.vertex_start[g];
        for color in &mut collection.colors[start..start + collection.vertex_count[g]] {
            if is_unset_color(color) {
                *color = DEFAULT_VERTEX_COLOR;
            }
        }
    }
}

fn propagate_known_colors(collection: &mut GeometryCollection, first_geometry: usize) {
    let geometries = first_geometry..collection.num_geometries();
    let vertex_ranges: Vec<_> = geometries
        .clone()
        .map(|g| {
            let start = collection.vertex_start[g];
            start..start + collection.vertex_count[g]
        })
        .collect();
    let start_v = vertex_ranges.iter().map(|r| r.start).min().unwrap_or(0);
    let end_v = vertex_ranges.iter().map(|r| r.end).max().unwrap_or(0);
    let num_vertices = end_v - start_v;
    let local = |vid: u32| vid - start_v as u32;

    // Components of unset triangles (one solve per component), and groups of
    // coincident vertices (one unknown per group).
    let mut components = DisjointSet::new(num_vertices);
    let mut coincident = DisjointSet::new(num_vertices);
    let mut links = Vec::with_capacity(num_vertices * 3);

    for g in geometries.clone() {
        let start = collection.face_start[g];
        for tri in &collection.indices[start..start + collection.face_count[g]] {
            // Triangles are either fully set or fully unset.
            if is_unset_color(&collection.colors[tri[0] as usize]) {
                let [x, y, z] = tri.map(local);
                components.union(x, y);
                components.union(y, z);
                links.push(ColorLink::edge(x, y));
                links.push(ColorLink::edge(y, z));
                links.push(ColorLink::edge(z, x));
            }
        }
    }

    let global_transforms = collection.global_transforms();
    let global_vertices: Vec<Point<Real>> = (start_v..end_v)
        .map(|vid| (global_transforms[collection.bone_map[vid]] * collection.vertices[vid]).cast())
        .collect();

    let radius = COPY_COLOR_DISTANCE as Real;
    let mut unset_hash = PointHashGrid::new(radius * 4.0);

    for range in &vertex_ranges {
        for vid in range.clone() {
            if !is_unset_color(&collection.colors[vid]) {
                continue;
            }

            let l = local(vid as u32);
            if components.component_size(l) == 1 {
                // Not part of any triangle.
                collection.colors[vid] = DEFAULT_VERTEX_COLOR;
                continue;
            }

            let pt = global_vertices[l as usize];
            for neighbor in unset_hash.find_points_in_ball(&pt, radius) {
                coincident.union(l, neighbor);
                components.union(l, neighbor);
            }
            unset_hash.insert(l, pt);
        }
    }

    /*
     * Known colors coincident with unset vertices become fixed values.
     */
    let mut fixed_colors = vec![Color::zeros(); num_vertices];
    let mut fixed_weights = vec![0.0f32; num_vertices];
    let mut solvable = HashSet::default();

    for range in &vertex_ranges {
        for vid in range.clone() {
            let color = collection.colors[vid];
            if is_unset_color(&color) {
                continue;
            }

            let pt = global_vertices[vid - start_v];
            for neighbor in unset_hash.find_points_in_ball(&pt, radius) {
                let _ = solvable.insert(components.find(neighbor));
                let group = coincident.find(neighbor) as usize;
                fixed_colors[group] += color;
                fixed_weights[group] += 1.0;
            }
        }
    }

    for (color, weight) in fixed_colors.iter_mut().zip(fixed_weights.iter_mut()) {
        if *weight > 0.0 {
            *color /= *weight;
            *weight = 1.0;
        }
    }

    /*
     * One linear solve per component.
     */
    let contiguous = components.make_contiguous_components();
    let mut to_component = vec![UNMAPPED; num_vertices];
    let mut num_solved = 0;
    let mut start = 0;

    while start < num_vertices {
        let component = components.find(contiguous[start]);
        let size = components.component_size(component) as usize;
        let members = &contiguous[start..start + size];
        start += size;

        if size == 1 || !solvable.contains(&component) {
            continue;
        }

        to_component.fill(UNMAPPED);
        let mut num_unknowns = 0;
        for &l in members {
            let group = coincident.find(l) as usize;
            if fixed_weights[group] > 0.0 {
                collection.colors[l as usize + start_v] = fixed_colors[group];
            } else if to_component[group] == UNMAPPED {
                to_component[group] = num_unknowns;
                num_unknowns += 1;
            }
        }

        if num_unknowns == 0 {
            continue;
        }

        let n = num_unknowns as usize;
        let mut coo = CooMatrix::new(n, n);
        let mut rhs = [vec![0.0; n], vec![0.0; n], vec![0.0; n], vec![0.0; n]];
        let mut diagonal = vec![0.0; n];

        for link in &links {
            let mut groups = link.vertices.map(|l| coincident.find(l) as usize);
            let mut locals = groups.map(|group| to_component[group]);
            if locals[0] == UNMAPPED {
                if locals[1] == UNMAPPED {
                    continue;
                }
                groups.swap(0, 1);
                locals.swap(0, 1);
            }

            let weight = link.weight as Real;
            let a = locals[0] as usize;
            if locals[1] == UNMAPPED {
                if fixed_weights[groups[1]] > 0.0 {
                    for (channel, rhs) in rhs.iter_mut().enumerate() {
                        rhs[a] += fixed_colors[groups[1]][channel] as Real * weight;
                    }
                    diagonal[a] += weight;
                }
            } else {
                let b = locals[1] as usize;
                coo.push(a, b, -weight);
                coo.push(b, a, -weight);
                diagonal[a] += weight;
                diagonal[b] += weight;
            }
        }

        for (i, value) in diagonal.iter().enumerate() {
            coo.push(i, i, *value);
        }

        let Some(solution) = solve_channels(&CscMatrix::from(&coo), &rhs) else {
            log::warn!(
                "Failed to factorize the color diffusion system of a component with {} unknowns.",
                n
            );
            continue;
        };

        for &l in members {
            let group = coincident.find(l) as usize;
            let unknown = to_component[group];
            if unknown != UNMAPPED {
                let i = unknown as usize;
                collection.colors[l as usize + start_v] = Color::new(
                    solution[0][i].max(0.0) as f32,
                    solution[1][i].max(0.0) as f32,
                    solution[2][i].max(0.0) as f32,
                    solution[3][i].max(0.0) as f32,
                );
            }
        }
        num_solved += 1;
    }

    log::debug!("Diffused vertex colors over {} components.", num_solved);
}

fn solve_channels(matrix: &CscMatrix<Real>, rhs: &[Vec<Real>; 4]) -> Option<[DMatrix<Real>; 4]> {
    let cholesky = CscCholesky::factor(matrix).ok()?;
    Some(solve_each_channel(&cholesky, rhs))
}

#[cfg(feature = "parallel")]
fn solve_each_channel(cholesky: &CscCholesky<Real>, rhs: &[Vec<Real>; 4]) -> [DMatrix<Real>; 4] {
    use rayon::prelude::*;

    let mut solutions = [(); 4].map(|_| DMatrix::zeros(0, 1));
    solutions
        .par_iter_mut()
        .zip(rhs.par_iter())
        .for_each(|(x, b)| *x = cholesky.solve(&DMatrix::from_column_slice(b.len(), 1, b)));
    solutions
}

#[cfg(not(feature = "parallel"))]
fn solve_each_channel(cholesky: &CscCholesky<Real>, rhs: &[Vec<Real>; 4]) -> [DMatrix<Real>; 4] {
    rhs.each_ref()
        .map(|b| cholesky.solve(&DMatrix::from_column_slice(b.len(), 1, b)))
}
