//! A uniform hash grid for radius queries on point sets.

use crate::math::{Point, Real};
use crate::utils::hashmap::HashMap;
use smallvec::SmallVec;

type CellKey = [i64; 3];

/// A sparse uniform grid storing values attached to 3D points.
///
/// Only non-empty cells are allocated. Radius queries visit every cell overlapping
/// the bounding box of the query ball, so the cell size should be of the same order
/// of magnitude as the query radius.
#[derive(Clone, Debug)]
pub struct PointHashGrid<T> {
    inv_cell_size: Real,
    cells: HashMap<CellKey, SmallVec<[(T, Point<Real>); 4]>>,
}

impl<T: Copy> PointHashGrid<T> {
    /// Creates an empty grid with cubic cells of side `cell_size`.
    ///
    /// # Panics
    /// Panics if `cell_size` is not positive.
    pub fn new(cell_size: Real) -> Self {
        assert!(cell_size > 0.0, "The cell size must be positive.");
        Self {
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::default(),
        }
    }

    fn cell_key(&self, pt: &Point<Real>) -> CellKey {
        [
            (pt.x * self.inv_cell_size).floor() as i64,
            (pt.y * self.inv_cell_size).floor() as i64,
            (pt.z * self.inv_cell_size).floor() as i64,
        ]
    }

    /// Inserts `value` at the location `pt`.
    pub fn insert(&mut self, value: T, pt: Point<Real>) {
        let key = self.cell_key(&pt);
        self.cells.entry(key).or_default().push((value, pt));
    }

    /// Returns `true` if no point was inserted in the cell containing `pt`.
    ///
    /// A non-empty cell does not imply that a point lies within any particular radius of `pt`.
    pub fn is_cell_empty(&self, pt: &Point<Real>) -> bool {
        self.cells
            .get(&self.cell_key(pt))
            .map(|cell| cell.is_empty())
            .unwrap_or(true)
    }

    fn for_each_in_ball(&self, center: &Point<Real>, radius: Real, mut f: impl FnMut(T, Real)) {
        let radius_sq = radius * radius;
        let mins = self.cell_key(&(center - Point::new(radius, radius, radius).coords));
        let maxs = self.cell_key(&(center + Point::new(radius, radius, radius).coords));

        for i in mins[0]..=maxs[0] {
            for j in mins[1]..=maxs[1] {
                for k in mins[2]..=maxs[2] {
                    if let Some(cell) = self.cells.get(&[i, j, k]) {
                        for (value, pt) in cell {
                            let dist_sq = na::distance_squared(center, pt);
                            if dist_sq < radius_sq {
                                f(*value, dist_sq);
                            }
                        }
                    }
                }
            }
        }
    }

    /// All the values whose point lies strictly closer than `radius` to `center`.
    pub fn find_points_in_ball(&self, center: &Point<Real>, radius: Real) -> Vec<T> {
        let mut result = vec![];
        self.for_each_in_ball(center, radius, |value, _| result.push(value));
        result
    }

    /// The value whose point is the closest to `center`, if it lies closer than `radius`.
    ///
    /// Returns the value together with its distance to `center`.
    pub fn find_nearest_in_radius(&self, center: &Point<Real>, radius: Real) -> Option<(T, Real)> {
        let mut best: Option<(T, Real)> = None;
        self.for_each_in_ball(center, radius, |value, dist_sq| {
            if best.map(|(_, best_sq)| dist_sq < best_sq).unwrap_or(true) {
                best = Some((value, dist_sq));
            }
        });
        best.map(|(value, dist_sq)| (value, dist_sq.sqrt()))
    }
}

#[cfg(test)]
mod tests {
    use super::PointHashGrid;
    use crate::math::{Point, Real};

    fn random_points(seed: u64, count: usize) -> Vec<Point<Real>> {
        let mut rng = oorandom::Rand64::new(seed as u128);
        (0..count)
            .map(|_| Point::new(rng.rand_float(), rng.rand_float(), rng.rand_float()))
            .collect()
    }

    #[test]
    fn ball_query_agrees_with_brute_force() {
        let points = random_points(42, 500);
        let mut grid = PointHashGrid::new(0.05);
        for (i, pt) in points.iter().enumerate() {
            grid.insert(i, *pt);
        }

        for center in random_points(7, 20) {
            let radius = 0.08;
            let mut found = grid.find_points_in_ball(&center, radius);
            found.sort_unstable();
            let expected: Vec<_> = (0..points.len())
                .filter(|i| na::distance(&points[*i], &center) < radius)
                .collect();
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn nearest_in_radius() {
        let mut grid = PointHashGrid::new(1.0);
        grid.insert(0u32, Point::new(0.0, 0.0, 0.0));
        grid.insert(1u32, Point::new(0.5, 0.0, 0.0));
        grid.insert(2u32, Point::new(2.5, 0.0, 0.0));

        let (nearest, dist) = grid
            .find_nearest_in_radius(&Point::new(0.4, 0.0, 0.0), 1.0)
            .unwrap();
        assert_eq!(nearest, 1);
        assert_relative_eq!(dist, 0.1, epsilon = 1.0e-12);
        assert!(grid
            .find_nearest_in_radius(&Point::new(1.5, 0.0, 0.0), 0.5)
            .is_none());
        assert!(!grid.is_cell_empty(&Point::new(0.9, 0.1, 0.1)));
        assert!(grid.is_cell_empty(&Point::new(-0.1, 0.1, 0.1)));
    }

    #[test]
    #[should_panic]
    fn zero_cell_size_is_rejected() {
        let _ = PointHashGrid::<u32>::new(0.0);
    }
}
