/*!
fracture-mesh
========

**fracture-mesh** converts geometry collections (the flat, multi-bone
representation of pre-fractured destructible meshes) into augmented dynamic
meshes, repairs and processes them, and writes the results back.

The processing pipeline is made of:
- island splitting with coincident-vertex merging and nested island re-merge,
- hole filling with UV continuation,
- vertex color diffusion solved as a sparse linear system per connected component,
- collision sample densification.

*/

#![deny(non_camel_case_types)]
#![deny(unused_parens)]
#![deny(non_upper_case_globals)]
#![deny(unused_results)]
#![warn(missing_docs)]
#![warn(unused_imports)]
#![allow(missing_copy_implementations)]
#![allow(clippy::too_many_arguments)] // Maybe revisit this one later.
#![allow(clippy::module_inception)]
#![allow(clippy::manual_range_contains)] // This usually makes it way more verbose that it could be.
#![allow(clippy::type_complexity)] // Complains about closures that are fairly simple.

#[cfg(feature = "serde")]
#[macro_use]
extern crate serde;
#[macro_use]
extern crate approx;
extern crate alloc;

pub extern crate nalgebra as na;

pub mod bounding_volume;
pub mod conversion;
pub mod destructible;
pub mod shape;
pub mod transformation;
pub mod utils;

/// Aliases for mathematical types.
///
/// Meshes are processed in double precision while geometry collections store
/// single precision attributes, like the assets they are read from.
pub mod math {
    pub use na::{
        Isometry3, Matrix3, Point2, Point3, Translation3, UnitQuaternion, UnitVector3, Vector2,
        Vector3, Vector4,
    };

    /// The scalar type used for mesh processing.
    pub use f64 as Real;

    /// The default tolerance used for geometric operations.
    pub const DEFAULT_EPSILON: Real = Real::EPSILON;

    /// The dimension of the space.
    pub const DIM: usize = 3;

    /// The point type.
    pub use Point3 as Point;

    /// The vector type.
    pub use Vector3 as Vector;

    /// The unit vector type.
    pub use UnitVector3 as UnitVector;

    /// The matrix type.
    pub use Matrix3 as Matrix;

    /// The transformation matrix type.
    pub use Isometry3 as Isometry;

    /// The translation type.
    pub use Translation3 as Translation;

    /// A four-component linear color (red, green, blue, alpha).
    pub type Color = Vector4<f32>;
}
