//! TableCAD core data structures
//!
//! This crate contains the data the manipulation engine operates on:
//! - MeshData: indexed triangle meshes and their analysis helpers
//! - SceneObject: a mesh with a world transform and classification tags
//! - Scene: the object store
//! - Project: the serializable scene record
//! - EngineConfig: tunables shared by every crate

pub mod config;
pub mod mesh;
pub mod object;
pub mod project;
pub mod scene;

pub use config::*;
pub use mesh::*;
pub use object::*;
pub use project::*;
pub use scene::*;
