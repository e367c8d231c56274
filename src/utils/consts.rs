use crate::math::Real;

/// Distance under which two vertices are considered coincident when looking for
/// islands and holes in meshes that are not welded.
pub const SNAP_DISTANCE: Real = 1.0e-3;

/// Distance under which a known vertex color is copied to a vertex with an unset color.
pub const COPY_COLOR_DISTANCE: f32 = 1.0e-3;

/// Distance under which two vertices of different meshes make these meshes neighbors.
pub(crate) const NEIGHBOR_DISTANCE: Real = 1.0e-5;

/// Hole triangulations with consecutive normals having a dot product smaller than this are rejected.
pub(crate) const FOLDED_TRIANGULATION_THRESHOLD: Real = -0.5;

/// Weight of a single half-edge in the color diffusion system.
pub(crate) const COLOR_EDGE_WEIGHT: f32 = 0.5;

/// Areas and lengths under this value are considered zero.
pub(crate) const KINDA_SMALL_NUMBER: Real = 1.0e-8;

pub(crate) const INV_SQRT_3: Real = 0.577_350_269_189_625_8;
