use fracture_mesh::math::{Point3, Real};

/// The eight corners of an axis-aligned cube, indexed by their `xyz` bits.
pub fn cube_vertices(center: [Real; 3], half_extent: Real) -> Vec<Point3<Real>> {
    (0..8)
        .map(|i| {
            let sign = |bit: usize| if (i >> bit) & 1 == 1 { 1.0 } else { -1.0 };
            Point3::new(
                center[0] + sign(0) * half_extent,
                center[1] + sign(1) * half_extent,
                center[2] + sign(2) * half_extent,
            )
        })
        .collect()
}

/// Outward-facing triangles of [`cube_vertices`]. Faces `2` and `3` cover the `+Z` side.
pub const CUBE_INDICES: [[u32; 3]; 12] = [
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

pub fn to_f32(points: &[Point3<Real>]) -> Vec<Point3<f32>> {
    points.iter().map(|pt| pt.cast::<f32>()).collect()
}
