//! Spatial acceleration for ray tracing: bounding volume hierarchies over triangles, spheres and nested instances.
//!
//! Scenes are assembled as [`rendering::packing::ObjectPack`]s, prepared once into immutable
//! [`rendering::packing::PreparedPack`]s and then queried concurrently through
//! [`rendering::packing::PreparedScene`].

pub mod error;
pub mod rendering;
pub mod utilities;

pub use error::SceneError;
