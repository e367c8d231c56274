//! Meshes and geometry collections.

pub use self::augmented::{
    is_unset_color, AttributeError, MaterialRole, TriangleAttributes, VertexAttributes,
    DEFAULT_VERTEX_COLOR, MAX_NUM_UV_CHANNELS, UNSET_VERTEX_COLOR,
};
pub use self::dynamic_mesh::{
    AppendTriangleError, DynamicMesh, MeshEdge, MeshIndexMap, INVALID_ID,
};
pub use self::geometry_collection::{CollectionError, GeometryCollection, SimulationType};

pub mod augmented;
mod dynamic_mesh;
mod geometry_collection;
