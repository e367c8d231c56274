use crate::math::{Point, Point2, Real, Vector};
use crate::transformation::ear_clipping::triangulate_ear_clipping;
use crate::utils::{orthonormal_basis, KINDA_SMALL_NUMBER};

/// The area-weighted normal of a closed 3D polygon (Newell's method).
///
/// The returned vector is not normalized: its norm is twice the area of the
/// polygon projected on the plane orthogonal to it. It points toward the side
/// from which the polygon appears counter-clockwise.
pub fn polygon_normal(points: &[Point<Real>]) -> Vector<Real> {
    if points.len() < 3 {
        return Vector::zeros();
    }

    let center = points
        .iter()
        .fold(Vector::zeros(), |acc, pt| acc + pt.coords)
        / points.len() as Real;
    let mut normal = Vector::zeros();

    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        normal += (a.coords - center).cross(&(b.coords - center));
    }

    normal
}

/// Triangulates a closed 3D polygon given as an ordered ring of points.
///
/// The polygon is projected on the plane orthogonal to its [`polygon_normal`] and
/// triangulated with ear clipping. If ear clipping fails, a constrained Delaunay
/// triangulation is attempted (with the `spade` feature), and a triangle fan is used
/// as a last resort.
///
/// If `orient_as_hole_fill` is `false`, the output triangles follow the ring order.
/// Otherwise they have the opposite orientation, which is what is needed to close a
/// hole whose ring was walked along the boundary edges of the surrounding triangles.
pub fn triangulate_loop(points: &[Point<Real>], orient_as_hole_fill: bool) -> Vec<[u32; 3]> {
    let n = points.len();
    if n < 3 {
        return vec![];
    }

    let mut triangles = if n == 3 {
        vec![[0, 1, 2]]
    } else if let Some(axis) = polygon_normal(points).try_normalize(KINDA_SMALL_NUMBER) {
        let projected = project_on_plane(points, &axis);
        triangulate_ear_clipping(&projected)
            .or_else(|| triangulate_projected_delaunay(&projected))
            .unwrap_or_else(|| triangle_fan(n))
    } else {
        triangle_fan(n)
    };

    if orient_as_hole_fill {
        for tri in &mut triangles {
            tri.swap(1, 2);
        }
    }

    triangles
}

fn project_on_plane(points: &[Point<Real>], axis: &Vector<Real>) -> Vec<Point2<Real>> {
    let [u, v] = orthonormal_basis(axis);
    let origin = points[0];

    points
        .iter()
        .map(|pt| {
            let d = pt - origin;
            Point2::new(d.dot(&u), d.dot(&v))
        })
        .collect()
}

fn triangle_fan(n: usize) -> Vec<[u32; 3]> {
    (1..n as u32 - 1).map(|i| [0, i, i + 1]).collect()
}

#[cfg(feature = "spade")]
fn triangulate_projected_delaunay(points: &[Point2<Real>]) -> Option<Vec<[u32; 3]>> {
    use crate::utils::point_in_poly2d;
    use spade::{ConstrainedDelaunayTriangulation, Point2 as Pt2, Triangulation};

    fn sanitize_spade_coord(coord: Real) -> Real {
        if coord.abs() <= spade::MIN_ALLOWED_VALUE {
            0.0
        } else if coord.abs() > spade::MAX_ALLOWED_VALUE {
            spade::MAX_ALLOWED_VALUE * coord.signum()
        } else {
            coord
        }
    }

    let mut cdt = ConstrainedDelaunayTriangulation::<Pt2<Real>>::new();
    let mut handles = Vec::with_capacity(points.len());
    for pt in points {
        let pt = Pt2::new(sanitize_spade_coord(pt.x), sanitize_spade_coord(pt.y));
        handles.push(cdt.insert(pt).ok()?);
    }

    for ia in 0..handles.len() {
        let ib = (ia + 1) % handles.len();
        if handles[ia] != handles[ib] {
            let _ = cdt.add_constraint_and_split(handles[ia], handles[ib], |v| v);
        }
    }

    // Duplicate input points share a handle, the first one wins.
    let mut handle_to_input = vec![None; cdt.num_vertices()];
    for (i, handle) in handles.iter().enumerate().rev() {
        handle_to_input[handle.index()] = Some(i as u32);
    }

    let mut result = vec![];
    for face in cdt.inner_faces() {
        let mut tri = [0; 3];
        for (k, vertex) in face.vertices().iter().enumerate() {
            // Vertices created by splitting constraints have no counterpart in the ring.
            tri[k] = (*handle_to_input.get(vertex.fix().index())?)?;
        }
        let center = Point2::from(
            (points[tri[0] as usize].coords
                + points[tri[1] as usize].coords
                + points[tri[2] as usize].coords)
                / 3.0,
        );
        if point_in_poly2d(&center, points) {
            result.push(tri);
        }
    }

    (!result.is_empty()).then_some(result)
}

#[cfg(not(feature = "spade"))]
fn triangulate_projected_delaunay(_points: &[Point2<Real>]) -> Option<Vec<[u32; 3]>> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal_of(points: &[Point<Real>], tri: [u32; 3]) -> Vector<Real> {
        let [a, b, c] = tri.map(|i| points[i as usize]);
        (b - a).cross(&(c - a))
    }

    #[test]
    fn polygon_normal_of_ccw_square() {
        let square = [
            Point::new(0.0, 0.0, 1.0),
            Point::new(1.0, 0.0, 1.0),
            Point::new(1.0, 1.0, 1.0),
            Point::new(0.0, 1.0, 1.0),
        ];
        assert_relative_eq!(polygon_normal(&square), Vector::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn concave_loop_triangles_follow_ring_orientation() {
        let ring = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(0.0, 2.0, 0.0),
            Point::new(0.0, 2.0, 2.0),
            Point::new(0.0, 1.0, 0.5),
            Point::new(0.0, 0.0, 2.0),
        ];
        let ring_normal = polygon_normal(&ring);
        let triangles = triangulate_loop(&ring, false);
        assert_eq!(triangles.len(), 3);
        let mut area = 0.0;
        for tri in &triangles {
            let n = normal_of(&ring, *tri);
            assert!(n.dot(&ring_normal) > 0.0);
            area += n.norm() / 2.0;
        }
        assert_relative_eq!(area, ring_normal.norm() / 2.0, epsilon = 1.0e-9);

        for tri in triangulate_loop(&ring, true) {
            assert!(normal_of(&ring, tri).dot(&ring_normal) < 0.0);
        }
    }

    #[test]
    fn collinear_loop_falls_back_to_fan() {
        let ring = [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
            Point::new(3.0, 0.0, 0.0),
        ];
        assert_eq!(triangulate_loop(&ring, false), vec![[0, 1, 2], [0, 2, 3]]);
    }
}
