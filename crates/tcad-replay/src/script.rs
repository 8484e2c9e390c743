//! Replay script format
//!
//! A script is a RON list of actions applied in order. Objects are referred
//! to by names given when they are created.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tcad_manip::{Axis, AxisLock, HandleId};

use crate::runner::ReplayError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplayAction {
    // Scene
    AddPrimitive {
        name: String,
        /// Type tag such as "cube" or "triangularprism"
        kind: String,
        position: [f32; 3],
        #[serde(default)]
        hole: bool,
        #[serde(default)]
        reference: bool,
    },
    AddPrinter {
        name: String,
        position: [f32; 3],
    },
    ImportStl {
        name: String,
        path: String,
        position: [f32; 3],
    },
    Duplicate,
    Delete,
    /// Name the single selected object
    Name(String),

    // Selection
    Select {
        name: String,
        #[serde(default)]
        additive: bool,
    },
    ToggleSelect(String),
    Deselect(String),
    ClearSelection,
    SelectAll,

    // Constraints
    SetSnapping(bool),
    ToggleAxisLock(Axis),
    SetAxisLock(AxisLock),
    SetUniformScaling(bool),
    CycleGridSpacing,
    SetReferencePlane([f32; 3]),

    // Dragging
    Grab {
        handle: HandleId,
        #[serde(default)]
        at: Option<[f32; 3]>,
    },
    DragTo([f32; 3]),
    DragBy([f32; 3]),
    Release,
    SetAxisExtent {
        axis: Axis,
        size: f32,
    },

    // Merging and output
    Combine,
    CombineInBackground,
    FinishCombine,
    CancelCombine,
    Print {
        path: String,
    },
    SaveProject {
        path: String,
    },
    LoadProject {
        path: String,
    },
}

impl ReplayAction {
    /// Short label for logs
    pub fn description(&self) -> &'static str {
        match self {
            ReplayAction::AddPrimitive { .. } => "Add Primitive",
            ReplayAction::AddPrinter { .. } => "Add Printer",
            ReplayAction::ImportStl { .. } => "Import STL",
            ReplayAction::Duplicate => "Duplicate",
            ReplayAction::Delete => "Delete",
            ReplayAction::Name(_) => "Name",
            ReplayAction::Select { .. }
            | ReplayAction::ToggleSelect(_)
            | ReplayAction::Deselect(_)
            | ReplayAction::ClearSelection
            | ReplayAction::SelectAll => "Selection",
            ReplayAction::SetSnapping(_)
            | ReplayAction::ToggleAxisLock(_)
            | ReplayAction::SetAxisLock(_)
            | ReplayAction::SetUniformScaling(_)
            | ReplayAction::CycleGridSpacing
            | ReplayAction::SetReferencePlane(_) => "Constraint",
            ReplayAction::Grab { .. } => "Grab",
            ReplayAction::DragTo(_) | ReplayAction::DragBy(_) => "Drag",
            ReplayAction::Release => "Release",
            ReplayAction::SetAxisExtent { .. } => "Set Size",
            ReplayAction::Combine
            | ReplayAction::CombineInBackground
            | ReplayAction::FinishCombine
            | ReplayAction::CancelCombine => "Combine",
            ReplayAction::Print { .. } => "Print",
            ReplayAction::SaveProject { .. } => "Save Project",
            ReplayAction::LoadProject { .. } => "Load Project",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    pub actions: Vec<ReplayAction>,
}

impl ReplayScript {
    pub fn from_ron_str(text: &str) -> Result<Self, ReplayError> {
        ron::from_str(text).map_err(|e| ReplayError::Script(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ReplayError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_ron_str(&text)
    }
}
