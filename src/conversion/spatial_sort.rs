//! Detection of meshes nested inside other closed meshes.

use crate::bounding_volume::Aabb;
use crate::math::{Point, Real};
use crate::shape::DynamicMesh;
use ordered_float::OrderedFloat;

/// A closed mesh together with the meshes found inside of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshNesting {
    /// The index of the enclosing mesh.
    pub outer: usize,
    /// The indices of the enclosed meshes, sorted.
    pub inners: Vec<usize>,
}

/// The generalized winding number of `mesh` at `pt`.
///
/// Close to 1 for a point inside of a closed mesh with outward-facing triangles, close
/// to 0 outside of it. For open meshes this is a smooth measure of insideness.
pub fn winding_number(mesh: &DynamicMesh, pt: &Point<Real>) -> Real {
    let mut solid_angle = 0.0;

    for tid in mesh.triangle_ids() {
        let [a, b, c] = mesh.triangle_points(tid).map(|p| p - pt);
        let (la, lb, lc) = (a.norm(), b.norm(), c.norm());
        let numerator = a.dot(&b.cross(&c));
        let denominator = la * lb * lc + a.dot(&b) * lc + a.dot(&c) * lb + b.dot(&c) * la;
        solid_angle += 2.0 * numerator.atan2(denominator);
    }

    solid_angle / (4.0 * core::f64::consts::PI)
}

struct NestingCandidate {
    bounds: Aabb,
    volume: Real,
    sample: Option<Point<Real>>,
}

/// Finds the meshes enclosed by other meshes.
///
/// The mesh `i` is inside of the mesh `j` if the volume of `j` is positive and
/// larger than the magnitude of the volume of `i`, the bounds of `j` contain the
/// bounds of `i`, and the winding number of `j` at a vertex of `i` exceeds 0.5.
///
/// Each enclosed mesh is assigned to the largest mesh enclosing it. Enclosing meshes
/// that are themselves enclosed do not start a nesting: they are inner meshes of
/// their own largest parent. Nestings are sorted by outer index.
pub fn compute_nesting(meshes: &[DynamicMesh]) -> Vec<MeshNesting> {
    let candidates: Vec<_> = meshes
        .iter()
        .map(|mesh| NestingCandidate {
            bounds: mesh.bounds(),
            volume: mesh.signed_volume(),
            sample: mesh
                .vertex_ids()
                .find(|vid| !mesh.is_isolated_vertex(*vid))
                .map(|vid| mesh.vertex(vid)),
        })
        .collect();

    let mut largest_parent: Vec<Option<usize>> = vec![None; meshes.len()];

    for (i, inner) in candidates.iter().enumerate() {
        let Some(sample) = inner.sample else {
            continue;
        };

        largest_parent[i] = candidates
            .iter()
            .enumerate()
            .filter(|(j, outer)| {
                *j != i
                    && outer.volume > 0.0
                    && outer.volume > inner.volume.abs()
                    && outer.bounds.contains(&inner.bounds)
            })
            .filter(|(j, _)| winding_number(&meshes[*j], &sample) > 0.5)
            .max_by_key(|(_, outer)| OrderedFloat(outer.volume))
            .map(|(j, _)| j);
    }

    // Since parents are strictly larger than their children, following the chain terminates.
    let mut nests: Vec<MeshNesting> = vec![];
    for i in 0..meshes.len() {
        let Some(mut outer) = largest_parent[i] else {
            continue;
        };
        while let Some(parent) = largest_parent[outer] {
            outer = parent;
        }

        match nests.iter_mut().find(|nest| nest.outer == outer) {
            Some(nest) => nest.inners.push(i),
            None => nests.push(MeshNesting {
                outer,
                inners: vec![i],
            }),
        }
    }

    nests.sort_by_key(|nest| nest.outer);
    nests
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(center: Point<Real>, half: Real) -> DynamicMesh {
        let vertices: Vec<_> = (0..8)
            .map(|i| {
                center
                    + crate::math::Vector::new(
                        if i & 1 == 0 { -half } else { half },
                        if i & 2 == 0 { -half } else { half },
                        if i & 4 == 0 { -half } else { half },
                    )
            })
            .collect();
        let indices = [
            [0, 2, 1],
            [1, 2, 3],
            [4, 5, 6],
            [5, 7, 6],
            [0, 1, 4],
            [1, 5, 4],
            [2, 6, 3],
            [3, 6, 7],
            [0, 4, 2],
            [2, 4, 6],
            [1, 3, 5],
            [3, 7, 5],
        ];
        DynamicMesh::from_vertices_and_indices(&vertices, &indices)
    }

    #[test]
    fn winding_number_of_cube() {
        let mesh = cube(Point::origin(), 1.0);
        assert!(mesh.signed_volume() > 0.0);
        assert_relative_eq!(winding_number(&mesh, &Point::new(0.1, 0.2, -0.3)), 1.0, epsilon = 1.0e-9);
        assert_relative_eq!(winding_number(&mesh, &Point::new(3.0, 0.0, 0.0)), 0.0, epsilon = 1.0e-9);
    }

    #[test]
    fn nested_cubes_go_to_the_largest_parent() {
        let meshes = [
            cube(Point::new(0.0, 0.0, 0.0), 0.25),
            cube(Point::new(10.0, 0.0, 0.0), 1.0),
            cube(Point::new(0.0, 0.0, 0.0), 2.0),
            cube(Point::new(0.0, 0.0, 0.0), 1.0),
        ];
        let nests = compute_nesting(&meshes);
        assert_eq!(
            nests,
            vec![MeshNesting {
                outer: 2,
                inners: vec![0, 3]
            }]
        );
    }
}
