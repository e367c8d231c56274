use na::{RealField, Vector3};

/// Computes two vectors which, combined with the unit vector `n`, form a right-handed orthonormal basis.
///
/// The returned `[u, v]` satisfy `u.cross(&v) == n`.
// Robust and branchless implementation from Pixar:
// https://graphics.pixar.com/library/OrthonormalB/paper.pdf
pub fn orthonormal_basis<N: RealField + Copy>(n: &Vector3<N>) -> [Vector3<N>; 2] {
    let sign = if n.z < N::zero() { -N::one() } else { N::one() };
    let a = -N::one() / (sign + n.z);
    let b = n.x * n.y * a;

    [
        Vector3::new(N::one() + sign * n.x * n.x * a, sign * b, -sign * n.x),
        Vector3::new(b, sign + n.y * n.y * a, -n.y),
    ]
}
