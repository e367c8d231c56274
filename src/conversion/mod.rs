//! Conversion between geometry collections and augmented meshes, and the repair
//! operations applied in between.

pub use self::collision_samples::{add_collision_samples_per_component, edge_connected_components};
pub use self::combine::{combine_bones, remap_material};
pub use self::fill_holes::{fill_holes, FillHolesOptions, FillHolesReport};
pub use self::mesh_collection::{
    CollectionImportFlags, DynamicMeshCollection, MeshData, ReplacedGeometry, UpdateError,
};
pub use self::spatial_sort::{compute_nesting, winding_number, MeshNesting};
pub use self::split_islands::{coincident_vertex_components, split_islands};
pub use self::vertex_colors::set_unset_colors;

mod collision_samples;
mod combine;
mod fill_holes;
mod mesh_collection;
pub mod spatial_sort;
mod split_islands;
mod vertex_colors;
