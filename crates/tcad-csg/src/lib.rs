//! TableCAD boolean mesh compositor
//!
//! Merges solid and hole meshes into a single printable mesh:
//! - `BooleanKernel`: the pairwise boolean backend seam
//! - `BspKernel`: BSP-tree implementation of the kernel
//! - `MeshMerger`: union of solids minus union of holes
//! - `MergeTask`: cancellable merge on a worker thread

pub mod bsp;
pub mod kernel;
pub mod merger;
pub mod task;

pub use bsp::BspKernel;
pub use kernel::*;
pub use merger::{CancelToken, MergeInput, MeshMerger};
pub use task::MergeTask;
