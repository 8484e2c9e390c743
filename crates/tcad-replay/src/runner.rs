//! Applies replay scripts to a scene through a manipulation session

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec3;
use tcad_core::{
    Classification, EngineConfig, ObjectKind, Project, ProjectError, Scene, SceneError, StlError,
    Transform, load_stl,
};
use tcad_csg::{CsgError, MeshMerger};
use tcad_manip::{
    DragInput, GrabOutcome, ManipError, ManipulationSession, PendingCombine, SelectionChange,
    begin_combine, combine, prepare_print,
};
use uuid::Uuid;

use crate::script::{ReplayAction, ReplayScript};

/// Replay errors
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Script error: {0}")]
    Script(String),
    #[error("No object named '{0}'")]
    UnknownName(String),
    #[error("Unknown primitive type '{0}'")]
    UnknownKind(String),
    #[error(transparent)]
    Manip(#[from] ManipError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Stl(#[from] StlError),
    #[error("Step {index} ({action}) failed: {source}")]
    Step {
        index: usize,
        action: &'static str,
        #[source]
        source: Box<ReplayError>,
    },
}

pub type ReplayResult<T> = Result<T, ReplayError>;

/// Scene, session and merger driven by a script
pub struct Replay {
    scene: Scene,
    session: ManipulationSession,
    merger: Arc<MeshMerger>,
    config: EngineConfig,
    names: HashMap<String, Uuid>,
    pending: Option<PendingCombine>,
    base_dir: PathBuf,
}

impl Replay {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            scene: Scene::new(),
            session: ManipulationSession::new(&config),
            merger: Arc::new(MeshMerger::default()),
            config,
            names: HashMap::new(),
            pending: None,
            base_dir: PathBuf::from("."),
        }
    }

    /// Resolve relative file paths in actions against `dir`
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn session(&self) -> &ManipulationSession {
        &self.session
    }

    /// Id of a named object still in the scene
    pub fn id_of(&self, name: &str) -> Option<Uuid> {
        self.names
            .get(name)
            .copied()
            .filter(|id| self.scene.contains(*id))
    }

    /// Apply every action in order, stopping at the first failure
    pub fn run(&mut self, script: &ReplayScript) -> ReplayResult<()> {
        for (index, action) in script.actions.iter().enumerate() {
            tracing::debug!("[{}] {}", index, action.description());
            self.apply(action).map_err(|e| ReplayError::Step {
                index,
                action: action.description(),
                source: Box::new(e),
            })?;
        }
        if let Some(pending) = self.pending.take() {
            tracing::warn!("Script ended with a combine in flight, waiting for it");
            pending.finish(&mut self.scene, &mut self.session)?;
        }
        tracing::info!("Replayed {} actions, {} objects in scene", script.actions.len(), self.scene.len());
        Ok(())
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn lookup(&self, name: &str) -> ReplayResult<Uuid> {
        self.id_of(name)
            .ok_or_else(|| ReplayError::UnknownName(name.to_string()))
    }

    fn name(&mut self, name: &str, id: Uuid) {
        if self.names.insert(name.to_string(), id).is_some() {
            tracing::debug!("Name '{}' reassigned to {}", name, id);
        }
    }

    fn report_selection(change: SelectionChange, name: &str) {
        if change == SelectionChange::Refused {
            tracing::warn!("Selection change for '{}' refused", name);
        }
    }

    pub fn apply(&mut self, action: &ReplayAction) -> ReplayResult<()> {
        match action {
            ReplayAction::AddPrimitive {
                name,
                kind,
                position,
                hole,
                reference,
            } => {
                let kind = ObjectKind::from_type_tag(kind)
                    .ok_or_else(|| ReplayError::UnknownKind(kind.clone()))?;
                self.session.set_creation_flags(*hole, *reference);
                let created = self
                    .session
                    .add_primitive(&mut self.scene, kind, Vec3::from(*position));
                self.session.set_creation_flags(false, false);
                let id = created?;
                self.name(name, id);
            }
            ReplayAction::AddPrinter { name, position } => {
                let id = self
                    .scene
                    .add_printer(Vec3::from(*position), self.config.printer.build_volume());
                self.name(name, id);
            }
            ReplayAction::ImportStl {
                name,
                path,
                position,
            } => {
                let mesh = load_stl(self.resolve_path(path))?;
                let id = self.scene.add_custom(
                    mesh,
                    Transform::from_position(Vec3::from(*position)),
                    Classification::SOLID,
                )?;
                self.name(name, id);
            }
            ReplayAction::Duplicate => {
                let copies = self.session.duplicate_selected(&mut self.scene)?;
                tracing::info!("Duplicated {} objects", copies.len());
            }
            ReplayAction::Delete => {
                let removed = self.session.delete_selected(&mut self.scene)?;
                self.names.retain(|_, id| !removed.contains(id));
            }
            ReplayAction::Name(name) => {
                let ids = self.session.selection().ids();
                match ids.as_slice() {
                    [id] => self.name(name, *id),
                    _ => tracing::warn!("Cannot name {} selected objects as '{}'", ids.len(), name),
                }
            }

            ReplayAction::Select { name, additive } => {
                let id = self.lookup(name)?;
                Self::report_selection(self.session.select(&self.scene, id, *additive)?, name);
            }
            ReplayAction::ToggleSelect(name) => {
                let id = self.lookup(name)?;
                Self::report_selection(self.session.toggle_selection(&self.scene, id)?, name);
            }
            ReplayAction::Deselect(name) => {
                let id = self.lookup(name)?;
                Self::report_selection(self.session.deselect(&self.scene, id)?, name);
            }
            ReplayAction::ClearSelection => {
                let _ = self.session.clear_selection(&self.scene)?;
            }
            ReplayAction::SelectAll => {
                let _ = self.session.select_all(&self.scene)?;
            }

            ReplayAction::SetSnapping(enabled) => self.session.set_snapping(*enabled),
            ReplayAction::ToggleAxisLock(axis) => {
                if let Err(e) = self.session.toggle_axis_lock(*axis) {
                    tracing::warn!("Axis lock on {:?} rejected: {}", axis, e);
                }
            }
            ReplayAction::SetAxisLock(lock) => self.session.set_axis_lock(*lock),
            ReplayAction::SetUniformScaling(enabled) => self.session.set_uniform_scaling(*enabled),
            ReplayAction::CycleGridSpacing => {
                let spacing = self.session.cycle_grid_spacing();
                tracing::info!("Grid spacing {}", spacing);
            }
            ReplayAction::SetReferencePlane(position) => {
                self.session.set_reference_plane(Vec3::from(*position));
            }

            ReplayAction::Grab { handle, at } => {
                let outcome = match at {
                    Some(point) => {
                        self.session
                            .grab_begin_at(&self.scene, *handle, Vec3::from(*point))?
                    }
                    None => self.session.grab_begin(&self.scene, *handle)?,
                };
                if outcome == GrabOutcome::Ignored {
                    tracing::warn!("Grab of {:?} handle {} ignored", handle.kind, handle.index);
                }
            }
            ReplayAction::DragTo(position) => {
                self.session
                    .drag(&mut self.scene, DragInput::Position(Vec3::from(*position)))?;
            }
            ReplayAction::DragBy(delta) => {
                self.session
                    .drag(&mut self.scene, DragInput::Delta(Vec3::from(*delta)))?;
            }
            ReplayAction::Release => {
                self.session.grab_end(&self.scene)?;
            }
            ReplayAction::SetAxisExtent { axis, size } => {
                if !self.session.set_axis_extent(&mut self.scene, *axis, *size)? {
                    tracing::warn!("Size {} on {:?} not applied", size, axis);
                }
            }

            ReplayAction::Combine => {
                if let Some(id) = combine(&mut self.scene, &mut self.session, &self.merger)? {
                    tracing::info!("Combined into {}", id);
                }
            }
            ReplayAction::CombineInBackground => {
                if self.pending.is_some() {
                    tracing::warn!("A combine is already running");
                    return Ok(());
                }
                self.pending =
                    begin_combine(&mut self.scene, &self.session, Arc::clone(&self.merger))?;
            }
            ReplayAction::FinishCombine => match self.pending.take() {
                Some(pending) => {
                    pending.finish(&mut self.scene, &mut self.session)?;
                }
                None => tracing::warn!("No combine to finish"),
            },
            ReplayAction::CancelCombine => {
                let Some(pending) = self.pending.take() else {
                    tracing::warn!("No combine to cancel");
                    return Ok(());
                };
                pending.cancel();
                match pending.finish(&mut self.scene, &mut self.session) {
                    Ok(id) => tracing::info!("Combine completed before cancel: {}", id),
                    Err(ManipError::Merge(CsgError::Cancelled)) => {
                        tracing::info!("Combine cancelled");
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            ReplayAction::Print { path } => {
                let job = prepare_print(
                    &self.scene,
                    self.session.selection(),
                    &self.merger,
                    &self.config.export,
                )?;
                let path = self.resolve_path(path);
                std::fs::write(&path, &job.stl)
                    .map_err(|e| ReplayError::Io(format!("{}: {}", path.display(), e)))?;
                tracing::info!("Wrote {} triangles to {}", job.mesh.triangle_count(), path.display());
            }
            ReplayAction::SaveProject { path } => {
                Project::from_scene(&self.scene).save(self.resolve_path(path))?;
            }
            ReplayAction::LoadProject { path } => {
                let scene = Project::load(self.resolve_path(path))?.to_scene(&self.config.creation)?;
                if let Some(pending) = self.pending.take() {
                    pending.abandon(&mut self.scene);
                }
                if self.session.is_grabbing() {
                    self.session.grab_end(&self.scene)?;
                }
                self.scene = scene;
                self.names.clear();
                self.session.sync_selection(&self.scene)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use tcad_core::signed_volume;
    use tcad_manip::HandleId;

    use super::*;

    fn cube(name: &str, position: [f32; 3], hole: bool) -> ReplayAction {
        ReplayAction::AddPrimitive {
            name: name.to_string(),
            kind: "cube".to_string(),
            position,
            hole,
            reference: false,
        }
    }

    fn select(name: &str, additive: bool) -> ReplayAction {
        ReplayAction::Select {
            name: name.to_string(),
            additive,
        }
    }

    fn temp_path(extension: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tcad-replay-{}.{}", Uuid::new_v4(), extension))
    }

    #[test]
    fn test_drag_moves_selected_object() {
        let mut replay = Replay::new(EngineConfig::default());
        let script = ReplayScript {
            actions: vec![
                cube("a", [0.0, 0.05, 0.0], false),
                ReplayAction::SetSnapping(false),
                ReplayAction::Grab {
                    handle: HandleId::movement(),
                    at: None,
                },
                ReplayAction::DragBy([0.1, 0.0, 0.0]),
                ReplayAction::DragBy([0.1, 0.0, 0.0]),
                ReplayAction::Release,
            ],
        };
        replay.run(&script).unwrap();
        let id = replay.id_of("a").unwrap();
        let position = replay.scene().get(id).unwrap().transform.position;
        assert!(position.abs_diff_eq(Vec3::new(0.2, 0.05, 0.0), 1e-5));
        assert!(!replay.session().is_grabbing());
    }

    #[test]
    fn test_combine_and_name_result() {
        let mut replay = Replay::new(EngineConfig::default());
        let script = ReplayScript {
            actions: vec![
                cube("base", [0.0, 0.05, 0.0], false),
                cube("cut", [0.05, 0.05, 0.0], true),
                select("base", false),
                select("cut", true),
                ReplayAction::Combine,
                ReplayAction::Name("part".to_string()),
            ],
        };
        replay.run(&script).unwrap();
        assert_eq!(replay.scene().len(), 1);
        assert!(replay.id_of("base").is_none());
        let part = replay.id_of("part").unwrap();
        let mesh = &replay.scene().get(part).unwrap().mesh;
        assert_relative_eq!(signed_volume(mesh), 0.05 * 0.1 * 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_background_combine_finishes_at_end() {
        let mut replay = Replay::new(EngineConfig::default());
        let script = ReplayScript {
            actions: vec![
                cube("a", [0.0, 0.05, 0.0], false),
                cube("b", [0.0, 0.15, 0.0], false),
                ReplayAction::SelectAll,
                ReplayAction::CombineInBackground,
            ],
        };
        replay.run(&script).unwrap();
        assert_eq!(replay.scene().len(), 1);
        assert_eq!(replay.session().selection().len(), 1);
    }

    #[test]
    fn test_unknown_name_reports_step() {
        let mut replay = Replay::new(EngineConfig::default());
        let script = ReplayScript {
            actions: vec![cube("a", [0.0; 3], false), select("missing", false)],
        };
        let Err(ReplayError::Step { index, action, source }) = replay.run(&script) else {
            panic!("expected a step failure");
        };
        assert_eq!(index, 1);
        assert_eq!(action, "Selection");
        assert!(matches!(*source, ReplayError::UnknownName(ref n) if n == "missing"));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let mut replay = Replay::new(EngineConfig::default());
        let action = ReplayAction::AddPrimitive {
            name: "x".to_string(),
            kind: "torus".to_string(),
            position: [0.0; 3],
            hole: false,
            reference: false,
        };
        assert!(matches!(replay.apply(&action), Err(ReplayError::UnknownKind(_))));
        assert!(replay.scene().is_empty());
    }

    #[test]
    fn test_print_and_project_files() {
        let stl_path = temp_path("stl");
        let project_path = temp_path("ron");
        let mut replay = Replay::new(EngineConfig::default());
        let script = ReplayScript {
            actions: vec![
                ReplayAction::AddPrinter {
                    name: "printer".to_string(),
                    position: [0.0, 0.1, 0.0],
                },
                cube("a", [0.0, 0.05, 0.0], false),
                ReplayAction::Print {
                    path: stl_path.to_string_lossy().into_owned(),
                },
                ReplayAction::SaveProject {
                    path: project_path.to_string_lossy().into_owned(),
                },
                ReplayAction::LoadProject {
                    path: project_path.to_string_lossy().into_owned(),
                },
            ],
        };
        replay.run(&script).unwrap();

        let stl = std::fs::read_to_string(&stl_path).unwrap();
        assert!(stl.starts_with("solid tablecad"));
        assert_eq!(replay.scene().len(), 2);
        assert!(replay.scene().printer().is_some());
        assert!(replay.session().selection().is_empty());
        // Names do not survive a project load
        assert!(replay.id_of("a").is_none());

        let _ = std::fs::remove_file(stl_path);
        let _ = std::fs::remove_file(project_path);
    }
}
