//! Spatial indexing, union-find and other geometric utilities.

pub use self::consts::{COPY_COLOR_DISTANCE, SNAP_DISTANCE};
pub(crate) use self::consts::*;
pub use self::point_hash_grid::PointHashGrid;
pub use self::orthonormal_basis::orthonormal_basis;
pub use self::point_in_poly2d::point_in_poly2d;
pub use self::union_find::DisjointSet;

mod consts;
pub mod hashmap;
mod orthonormal_basis;
mod point_hash_grid;
mod point_in_poly2d;
pub mod point_in_triangle;
mod union_find;
