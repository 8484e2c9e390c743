//! TableCAD manipulation engine
//!
//! Per drag tick the pipeline runs in one direction:
//! input event -> ConstraintPolicy -> TransformResolver -> BoundingVolume -> HandleLayout.
//!
//! - `SelectionSet`: ordered selection with printer exclusivity
//! - `BoundingVolume`: minimal box around the selected world vertices
//! - `HandleLayout`: handle placement derived from the volume
//! - `ConstraintPolicy`: axis lock, grid snap, uniform scale
//! - `TransformResolver`: vertex and transform updates per drag mode
//! - `ManipulationSession`: event-driven owner of all of the above

pub mod actions;
pub mod bounds;
pub mod constraint;
pub mod error;
pub mod handles;
pub mod resolver;
pub mod selection;
pub mod session;

pub use actions::{PendingCombine, PrintJob, begin_combine, combine, export_mesh, prepare_print};
pub use bounds::BoundingVolume;
pub use constraint::{
    Axis, AxisLock, ConstraintError, ConstraintPolicy, ConstraintState, GridFrame,
};
pub use error::{ManipError, ManipResult};
pub use handles::{Handle, HandleAxes, HandleId, HandleKind, HandleLayout};
pub use resolver::{
    AppliedTransform, CapturedObject, DragMode, GrabCapture, ObjectUpdate, TransformResolver,
};
pub use selection::{HighlightTag, SelectionChange, SelectionEntry, SelectionSet};
pub use session::{DragInput, DragOutcome, GrabOutcome, ManipulationSession};
