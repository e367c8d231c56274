//! Ear-clipping algorithm for creating a triangle mesh from a simple polygon.
//! Based on <https://github.com/ivanfratric/polypartition>, contributed by embotech AG.

use crate::{
    math::{Point2, Real},
    utils::point_in_triangle::{corner_direction, is_point_in_triangle, Orientation},
};

/// The state of one polygon vertex during ear clipping.
#[derive(Clone, Default)]
struct VertexInfo {
    /// Whether the vertex has not been clipped yet.
    is_active: bool,
    /// Whether the vertex is the tip of an ear.
    is_ear: bool,
    /// Cosine of the ear angle. Pointier ears are clipped first.
    pointiness: Real,
    p_prev: usize,
    p_next: usize,
}

/// Updates `pointiness` and `is_ear` for the vertex `idx`.
///
/// Returns `false` if the neighborhood of the vertex is degenerate.
fn update_vertex(
    idx: usize,
    vertex_info: &mut [VertexInfo],
    points: &[Point2<Real>],
) -> bool {
    let VertexInfo { p_prev, p_next, .. } = vertex_info[idx];
    let p = points[idx];
    let p1 = points[p_prev];
    let p3 = points[p_next];

    let pointiness = (p1 - p).normalize().dot(&(p3 - p).normalize());
    if pointiness.is_nan() {
        return false;
    }

    // A vertex is an ear tip when it is convex and no other active vertex lies
    // inside the triangle it forms with its two neighbors.
    let mut error = false;
    let is_ear = corner_direction(&p1, &p, &p3) == Orientation::Ccw
        && (0..points.len())
            .filter(|&i| {
                vertex_info[i].is_active && i != p_prev && i != idx && i != p_next
            })
            .all(|i| match is_point_in_triangle(&points[i], &p1, &p, &p3) {
                Some(inside) => !inside,
                None => {
                    error = true;
                    true
                }
            });

    vertex_info[idx].pointiness = pointiness;
    vertex_info[idx].is_ear = is_ear;
    !error
}

/// Triangulates a simple polygon given as a counter-clockwise ring of vertices.
///
/// Returns `None` if the polygon has less than 3 vertices, is clockwise, or is too
/// degenerate for ear clipping (e.g. collinear or duplicate consecutive vertices).
/// The output triangles are counter-clockwise and index `vertices`.
pub fn triangulate_ear_clipping(vertices: &[Point2<Real>]) -> Option<Vec<[u32; 3]>> {
    let n_vertices = vertices.len();
    if n_vertices < 3 {
        return None;
    }

    let mut vertex_info = vec![VertexInfo::default(); n_vertices];
    for (i, info) in vertex_info.iter_mut().enumerate() {
        info.is_active = true;
        info.p_prev = if i == 0 { n_vertices - 1 } else { i - 1 };
        info.p_next = if i == n_vertices - 1 { 0 } else { i + 1 };
    }
    if !(0..n_vertices).all(|i| update_vertex(i, &mut vertex_info, vertices))
        || !vertex_info.iter().any(|info| info.is_ear)
    {
        return None;
    }

    let mut output_indices = Vec::with_capacity(n_vertices - 2);

    for i in 0..n_vertices - 3 {
        let (ear_i, _) = vertex_info
            .iter()
            .enumerate()
            .filter(|(_, info)| info.is_active && info.is_ear)
            .max_by(|(_, info1), (_, info2)| info1.pointiness.total_cmp(&info2.pointiness))?;

        vertex_info[ear_i].is_active = false;
        let VertexInfo { p_prev, p_next, .. } = vertex_info[ear_i];
        output_indices.push([p_prev as u32, ear_i as u32, p_next as u32]);

        vertex_info[p_prev].p_next = p_next;
        vertex_info[p_next].p_prev = p_prev;

        // The last three vertices always form a convex triangle.
        if i == n_vertices - 4 {
            break;
        }

        if !update_vertex(p_prev, &mut vertex_info, vertices)
            || !update_vertex(p_next, &mut vertex_info, vertices)
        {
            return None;
        }
    }

    let (i, info) = vertex_info
        .iter()
        .enumerate()
        .find(|(_, info)| info.is_active)?;
    output_indices.push([info.p_prev as u32, i as u32, info.p_next as u32]);

    Some(output_indices)
}
