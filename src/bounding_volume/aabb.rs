//! Axis Aligned Bounding Box.

use crate::math::{Isometry, Point, Real, Vector};
use na;

/// An Axis-Aligned Bounding Box (AABB).
///
/// An AABB is defined by its minimum and maximum corners. Its edges are always
/// parallel to the coordinate axes, which makes containment and intersection
/// tests a handful of coordinate comparisons.
///
/// # Structure
///
/// - **mins**: The point with the smallest coordinates on each axis
/// - **maxs**: The point with the largest coordinates on each axis
/// - **Invariant**: `mins.x ≤ maxs.x`, `mins.y ≤ maxs.y` and `mins.z ≤ maxs.z`, except
///   for the "invalid" (empty) AABB returned by [`Aabb::new_invalid`].
///
/// # Example
///
/// ```rust
/// use fracture_mesh::bounding_volume::Aabb;
/// use nalgebra::Point3;
///
/// let points = vec![
///     Point3::new(1.0, 2.0, 3.0),
///     Point3::new(-1.0, 4.0, 2.0),
///     Point3::new(0.0, 0.0, 5.0),
/// ];
/// let aabb = Aabb::from_points(points);
///
/// assert_eq!(aabb.mins, Point3::new(-1.0, 0.0, 2.0));
/// assert_eq!(aabb.maxs, Point3::new(1.0, 4.0, 5.0));
/// ```
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Aabb {
    /// The point with minimum coordinates.
    pub mins: Point<Real>,
    /// The point with maximum coordinates.
    pub maxs: Point<Real>,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new_invalid()
    }
}

impl Aabb {
    /// Creates a new AABB from its minimum and maximum corners.
    #[inline]
    pub fn new(mins: Point<Real>, maxs: Point<Real>) -> Aabb {
        Aabb { mins, maxs }
    }

    /// Creates an invalid AABB with inverted bounds.
    ///
    /// The resulting AABB has `mins` set to maximum values and `maxs` set to
    /// minimum values. This is the neutral element of [`Aabb::merge`] and
    /// [`Aabb::take_point`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use fracture_mesh::bounding_volume::Aabb;
    /// use nalgebra::Point3;
    ///
    /// let mut aabb = Aabb::new_invalid();
    /// assert!(!aabb.is_valid());
    ///
    /// aabb.take_point(Point3::new(1.0, 2.0, 3.0));
    /// aabb.take_point(Point3::new(-1.0, 0.0, 2.0));
    ///
    /// assert_eq!(aabb.mins, Point3::new(-1.0, 0.0, 2.0));
    /// assert_eq!(aabb.maxs, Point3::new(1.0, 2.0, 3.0));
    /// ```
    #[inline]
    pub fn new_invalid() -> Self {
        Self::new(
            Vector::repeat(Real::MAX).into(),
            Vector::repeat(-Real::MAX).into(),
        )
    }

    /// Creates a new AABB from its center and half-extents.
    #[inline]
    pub fn from_half_extents(center: Point<Real>, half_extents: Vector<Real>) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Computes the smallest AABB enclosing all the given points.
    ///
    /// Returns an invalid AABB if the iterator is empty.
    pub fn from_points<I>(pts: I) -> Self
    where
        I: IntoIterator<Item = Point<Real>>,
    {
        let mut result = Self::new_invalid();
        for pt in pts {
            result.take_point(pt);
        }
        result
    }

    /// Does this AABB enclose at least one point?
    #[inline]
    pub fn is_valid(&self) -> bool {
        na::partial_le(&self.mins, &self.maxs)
    }

    /// The center of this AABB.
    #[inline]
    pub fn center(&self) -> Point<Real> {
        na::center(&self.mins, &self.maxs)
    }

    /// The half-extents of this AABB.
    #[inline]
    pub fn half_extents(&self) -> Vector<Real> {
        (self.maxs - self.mins) * 0.5
    }

    /// The extents of this AABB.
    #[inline]
    pub fn extents(&self) -> Vector<Real> {
        self.maxs - self.mins
    }

    /// The volume of this AABB, zero if the AABB is invalid.
    #[inline]
    pub fn volume(&self) -> Real {
        if !self.is_valid() {
            return 0.0;
        }
        let extents = self.extents();
        extents.x * extents.y * extents.z
    }

    /// The length of the diagonal of this AABB.
    #[inline]
    pub fn diagonal_length(&self) -> Real {
        if self.is_valid() {
            self.extents().norm()
        } else {
            0.0
        }
    }

    /// Enlarges this AABB so it also contains the point `pt`.
    #[inline]
    pub fn take_point(&mut self, pt: Point<Real>) {
        self.mins = self.mins.coords.inf(&pt.coords).into();
        self.maxs = self.maxs.coords.sup(&pt.coords).into();
    }

    /// Computes the AABB bounding `self` transformed by `m`.
    #[inline]
    pub fn transform_by(&self, m: &Isometry<Real>) -> Self {
        if !self.is_valid() {
            return *self;
        }

        let center = m * self.center();
        let half_extents = self.half_extents();
        let abs_rot = m.rotation.to_rotation_matrix().into_inner().abs();
        let ws_half_extents = abs_rot * half_extents;

        Aabb::new(center - ws_half_extents, center + ws_half_extents)
    }

    /// Checks if this AABB contains the point `point`.
    #[inline]
    pub fn contains_local_point(&self, point: &Point<Real>) -> bool {
        (0..3).all(|i| point[i] >= self.mins[i] && point[i] <= self.maxs[i])
    }

    /// Checks if this AABB intersects with another one.
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        na::partial_le(&self.mins, &other.maxs) && na::partial_ge(&self.maxs, &other.mins)
    }

    /// Checks if this AABB fully contains another one.
    #[inline]
    pub fn contains(&self, other: &Aabb) -> bool {
        na::partial_le(&self.mins, &other.mins) && na::partial_ge(&self.maxs, &other.maxs)
    }

    /// Merges this AABB with another one, in-place.
    #[inline]
    pub fn merge(&mut self, other: &Aabb) {
        self.mins = self.mins.inf(&other.mins);
        self.maxs = self.maxs.sup(&other.maxs);
    }

    /// Computes the smallest AABB containing both `self` and `other`.
    #[inline]
    pub fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            mins: self.mins.inf(&other.mins),
            maxs: self.maxs.sup(&other.maxs),
        }
    }

    /// Creates a new AABB enlarged by `amount` on each side.
    #[inline]
    pub fn loosened(&self, amount: Real) -> Aabb {
        assert!(amount >= 0.0, "The loosening margin must be positive.");
        Aabb {
            mins: self.mins + Vector::repeat(-amount),
            maxs: self.maxs + Vector::repeat(amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Translation, UnitQuaternion};

    #[test]
    fn invalid_aabb_is_merge_neutral() {
        let aabb = Aabb::new(Point::new(-1.0, 0.0, 2.0), Point::new(1.0, 3.0, 4.0));
        assert_eq!(Aabb::new_invalid().merged(&aabb), aabb);
        assert_eq!(Aabb::new_invalid().volume(), 0.0);
    }

    #[test]
    fn containment_and_intersection() {
        let outer = Aabb::new(Point::new(-2.0, -2.0, -2.0), Point::new(2.0, 2.0, 2.0));
        let inner = Aabb::new(Point::new(-1.0, -1.0, -1.0), Point::new(1.0, 1.0, 1.0));
        let apart = Aabb::new(Point::new(3.0, 3.0, 3.0), Point::new(4.0, 4.0, 4.0));

        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.intersects(&inner));
        assert!(!outer.intersects(&apart));
        assert!(outer.contains_local_point(&Point::origin()));
        assert_eq!(outer.volume(), 64.0);
    }

    #[test]
    fn transformed_aabb_encloses_rotated_corners() {
        let aabb = Aabb::new(Point::new(0.0, 0.0, 0.0), Point::new(2.0, 1.0, 1.0));
        let iso = Isometry::from_parts(
            Translation::new(1.0, 0.0, 0.0),
            UnitQuaternion::from_euler_angles(0.0, 0.0, core::f64::consts::FRAC_PI_2),
        );
        let transformed = aabb.transform_by(&iso);
        let corner = iso * Point::new(2.0, 1.0, 1.0);
        assert!(transformed.loosened(1.0e-9).contains_local_point(&corner));
        assert_relative_eq!(transformed.extents(), Vector::new(1.0, 2.0, 1.0), epsilon = 1.0e-9);
    }
}
