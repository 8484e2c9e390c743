//! Manipulation errors

use glam::Vec3;
use tcad_core::SceneError;
use tcad_csg::CsgError;
use uuid::Uuid;

use crate::constraint::Axis;

/// Error type for manipulation and action operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum ManipError {
    #[error("Selected object {0} is missing from the scene")]
    MissingObject(Uuid),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Merge failed: {0}")]
    Merge(#[from] CsgError),

    #[error("Selection has no extent along {0:?}")]
    DegenerateExtent(Axis),

    #[error("Invalid target size {0}")]
    InvalidExtent(f32),

    #[error("Nothing printable in the scene")]
    NothingToPrint,

    #[error("Model {size} is too large for printer volume {build_volume}")]
    TooLargeForPrinter { size: Vec3, build_volume: Vec3 },
}

/// Result type for manipulation operations
pub type ManipResult<T> = Result<T, ManipError>;
