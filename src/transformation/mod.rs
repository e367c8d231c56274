//! Triangulation of simple polygons and boundary loops.

pub use self::ear_clipping::triangulate_ear_clipping;
pub use self::triangulate_loop::{polygon_normal, triangulate_loop};

mod ear_clipping;
mod triangulate_loop;
