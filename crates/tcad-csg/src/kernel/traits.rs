//! Boolean kernel trait definitions
//!
//! These traits define the interface that every boolean backend must implement.

use tcad_core::{MeshData, MeshError};
use thiserror::Error;

/// Error type for boolean operations
#[derive(Debug, Clone, Error)]
pub enum CsgError {
    #[error("Invalid input mesh {index}: {source}")]
    InvalidMesh {
        index: usize,
        #[source]
        source: MeshError,
    },

    #[error("Boolean operation failed: {0}")]
    BooleanFailed(String),

    #[error("Merge cancelled")]
    Cancelled,

    #[error("Merge worker failed: {0}")]
    Worker(String),
}

/// Result type for boolean operations
pub type CsgResult<T> = Result<T, CsgError>;

/// Boolean operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    /// Union (add)
    Union,
    /// Subtraction (cut)
    Subtract,
    /// Intersection (common)
    Intersect,
}

/// The boolean kernel trait
///
/// Implementations combine two closed, outward-wound triangle meshes.
/// Either operand may be empty.
pub trait BooleanKernel: Send + Sync {
    /// Get the name of this kernel
    fn name(&self) -> &str;

    /// Apply a boolean operation to two meshes
    fn boolean(&self, a: &MeshData, b: &MeshData, op: BooleanOp) -> CsgResult<MeshData>;

    fn union(&self, a: &MeshData, b: &MeshData) -> CsgResult<MeshData> {
        self.boolean(a, b, BooleanOp::Union)
    }

    fn subtract(&self, a: &MeshData, b: &MeshData) -> CsgResult<MeshData> {
        self.boolean(a, b, BooleanOp::Subtract)
    }

    fn intersect(&self, a: &MeshData, b: &MeshData) -> CsgResult<MeshData> {
        self.boolean(a, b, BooleanOp::Intersect)
    }
}
