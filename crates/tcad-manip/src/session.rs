//! Manipulation session
//!
//! Owns the selection, constraint state, bounding volume and handle layout
//! for one interaction controller. Grab, drag and release events are the
//! only transitions of the drag state machine:
//!
//! ```text
//!  Idle --grab_begin--> Grabbing --drag--> Grabbing --grab_end--> Idle
//! ```
//!
//! Each drag runs constraint, resolution, vertex update, volume recompute
//! and layout recompute, in that order.

use glam::{Quat, Vec3};
use tcad_core::{Classification, CreationConfig, EngineConfig, HandleConfig, ObjectKind, Scene};
use uuid::Uuid;

use crate::bounds::BoundingVolume;
use crate::constraint::{Axis, AxisLock, ConstraintError, ConstraintPolicy};
use crate::error::{ManipError, ManipResult};
use crate::handles::{HandleAxes, HandleId, HandleKind, HandleLayout};
use crate::resolver::{AppliedTransform, DragMode, GrabCapture, TransformResolver, scale_extent};
use crate::selection::{SelectionChange, SelectionSet};

/// Handle motion delivered by the input layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragInput {
    /// Absolute world position of the grabbed handle
    Position(Vec3),
    /// World offset since the previous drag event
    Delta(Vec3),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrabOutcome {
    Started(DragMode),
    /// The grab was not allowed and nothing changed
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragOutcome {
    Applied(AppliedTransform),
    /// No grab is active
    Idle,
}

struct ActiveGrab {
    handle: HandleId,
    resolver: TransformResolver,
    /// Unconstrained handle position
    raw: Vec3,
    /// Constrained handle position after the last tick
    constrained: Vec3,
    /// Handle position the axis lock holds to
    anchor: Vec3,
    /// Locked axes when `anchor` was captured
    locks: [bool; 3],
    last: Option<AppliedTransform>,
}

/// Interaction state passed to every manipulation operation
pub struct ManipulationSession {
    handle_config: HandleConfig,
    creation: CreationConfig,
    creation_flags: Classification,
    selection: SelectionSet,
    policy: ConstraintPolicy,
    workspace_rotation: Quat,
    reference_plane: Vec3,
    volume: Option<BoundingVolume>,
    layout: Option<HandleLayout>,
    grab: Option<ActiveGrab>,
}

impl ManipulationSession {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            handle_config: config.handles.clone(),
            creation: config.creation.clone(),
            creation_flags: Classification::SOLID,
            selection: SelectionSet::new(),
            policy: ConstraintPolicy::from_config(&config.grid),
            workspace_rotation: Quat::IDENTITY,
            reference_plane: Vec3::ZERO,
            volume: None,
            layout: None,
            grab: None,
        }
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn policy(&self) -> &ConstraintPolicy {
        &self.policy
    }

    /// Current bounding volume, None when nothing is selected
    pub fn volume(&self) -> Option<&BoundingVolume> {
        self.volume.as_ref()
    }

    pub fn layout(&self) -> Option<&HandleLayout> {
        self.layout.as_ref()
    }

    pub fn is_grabbing(&self) -> bool {
        self.grab.is_some()
    }

    pub fn grabbed_handle(&self) -> Option<HandleId> {
        self.grab.as_ref().map(|g| g.handle)
    }

    pub fn creation_config(&self) -> &CreationConfig {
        &self.creation
    }

    // Volume and layout pipeline

    /// Recompute the bounding volume and handle layout from the scene
    pub fn refresh(&mut self, scene: &Scene) -> ManipResult<()> {
        self.volume = BoundingVolume::recompute(scene, &self.selection, self.workspace_rotation)?;
        self.relayout();
        Ok(())
    }

    fn relayout(&mut self) {
        let printer_selected = self.selection.has_printer();
        self.layout = self.volume.as_ref().map(|volume| {
            HandleLayout::layout(
                volume,
                &self.handle_config,
                printer_selected,
                self.reference_plane.y,
            )
        });
    }

    // Selection

    fn selection_allowed(&self) -> bool {
        if self.grab.is_some() {
            tracing::warn!("Selection change refused while a handle is grabbed");
            return false;
        }
        true
    }

    fn finish_selection(&mut self, scene: &Scene, change: SelectionChange) -> ManipResult<SelectionChange> {
        if change.changed() {
            self.refresh(scene)?;
        }
        Ok(change)
    }

    pub fn select(&mut self, scene: &Scene, id: Uuid, additive: bool) -> ManipResult<SelectionChange> {
        let object = scene.require(id)?;
        if !self.selection_allowed() {
            return Ok(SelectionChange::Refused);
        }
        if scene.is_locked(id) {
            tracing::warn!("Object {} is held by a merge and cannot be selected", id);
            return Ok(SelectionChange::Refused);
        }
        let change = self.selection.add(object, additive);
        self.finish_selection(scene, change)
    }

    pub fn toggle_selection(&mut self, scene: &Scene, id: Uuid) -> ManipResult<SelectionChange> {
        let object = scene.require(id)?;
        if !self.selection_allowed() || scene.is_locked(id) {
            return Ok(SelectionChange::Refused);
        }
        let change = self.selection.toggle(object);
        self.finish_selection(scene, change)
    }

    pub fn deselect(&mut self, scene: &Scene, id: Uuid) -> ManipResult<SelectionChange> {
        if !self.selection_allowed() {
            return Ok(SelectionChange::Refused);
        }
        let change = self.selection.remove(id);
        self.finish_selection(scene, change)
    }

    pub fn clear_selection(&mut self, scene: &Scene) -> ManipResult<SelectionChange> {
        if !self.selection_allowed() {
            return Ok(SelectionChange::Refused);
        }
        let change = self.selection.clear();
        self.finish_selection(scene, change)
    }

    pub fn select_all(&mut self, scene: &Scene) -> ManipResult<SelectionChange> {
        if !self.selection_allowed() {
            return Ok(SelectionChange::Refused);
        }
        let change = self.selection.select_all(scene);
        self.finish_selection(scene, change)
    }

    /// Drop selected ids that left the scene, then recompute
    pub fn sync_selection(&mut self, scene: &Scene) -> ManipResult<()> {
        let _ = self.selection.retain_existing(scene);
        self.refresh(scene)
    }

    // Constraint toggles

    pub fn set_snapping(&mut self, enabled: bool) {
        self.policy.state.set_snapping(enabled);
        tracing::debug!("Grid snapping {}", if enabled { "on" } else { "off" });
    }

    pub fn toggle_snapping(&mut self) -> bool {
        let enabled = !self.policy.state.snapping_enabled();
        self.set_snapping(enabled);
        enabled
    }

    pub fn toggle_axis_lock(&mut self, axis: Axis) -> Result<(), ConstraintError> {
        self.policy.state.toggle_axis_lock(axis)
    }

    pub fn set_axis_lock(&mut self, lock: AxisLock) {
        self.policy.state.set_axis_lock(lock);
        tracing::debug!("Axis lock set to {:?}", lock);
    }

    pub fn set_uniform_scaling(&mut self, enabled: bool) {
        self.policy.state.set_uniform_scaling(enabled);
        if enabled && self.policy.state.any_locked() {
            tracing::debug!("Uniform scaling stays inactive while an axis is locked");
        }
    }

    /// Classification given to newly created objects
    pub fn set_creation_flags(&mut self, hole: bool, reference: bool) {
        self.creation_flags = Classification::from_flags(hole, reference);
    }

    pub fn set_reference_plane(&mut self, position: Vec3) {
        self.reference_plane = position;
        self.policy.grid.set_reference_plane(position);
        self.relayout();
    }

    pub fn cycle_grid_spacing(&mut self) -> f32 {
        self.policy.grid.cycle_spacing()
    }

    /// Recalibrate the frame the bounding volume is fitted in
    pub fn set_workspace_rotation(&mut self, scene: &Scene, rotation: Quat) -> ManipResult<()> {
        self.workspace_rotation = rotation.normalize();
        self.refresh(scene)
    }

    // Drag state machine

    fn mode_for(&self, handle: HandleId) -> DragMode {
        match handle.axes() {
            HandleAxes::Signed(signs) => {
                if handle.kind == HandleKind::Corner && self.policy.state.uniform_scaling_active() {
                    DragMode::UniformScale { signs }
                } else {
                    DragMode::Resize { signs }
                }
            }
            HandleAxes::Rotation(axis) => DragMode::Rotate(axis),
            HandleAxes::Free => DragMode::Translate,
        }
    }

    /// Grab a handle at its laid-out position
    pub fn grab_begin(&mut self, scene: &Scene, handle: HandleId) -> ManipResult<GrabOutcome> {
        self.begin(scene, handle, None)
    }

    /// Grab a handle at a specific world point
    ///
    /// Rotation wheels measure their angle from this point rather than from
    /// the laid-out handle, so the input layer can pass where the rim was hit.
    pub fn grab_begin_at(
        &mut self,
        scene: &Scene,
        handle: HandleId,
        grab_point: Vec3,
    ) -> ManipResult<GrabOutcome> {
        self.begin(scene, handle, Some(grab_point))
    }

    fn begin(
        &mut self,
        scene: &Scene,
        handle: HandleId,
        grab_point: Option<Vec3>,
    ) -> ManipResult<GrabOutcome> {
        if self.grab.is_some() {
            tracing::warn!("Grab on {:?} ignored, another handle is grabbed", handle);
            return Ok(GrabOutcome::Ignored);
        }
        if self.selection.is_empty() {
            return Ok(GrabOutcome::Ignored);
        }
        if self.selection.has_printer() && handle.kind != HandleKind::Movement {
            tracing::warn!("Printer can only be moved, ignoring {:?} handle", handle.kind);
            return Ok(GrabOutcome::Ignored);
        }
        let ids = self.selection.ids();
        if let Some(locked) = ids.iter().find(|id| scene.is_locked(**id)) {
            tracing::warn!("Object {} is held by a merge, ignoring grab", locked);
            return Ok(GrabOutcome::Ignored);
        }

        self.refresh(scene)?;
        let (Some(volume), Some(laid_out)) = (
            self.volume,
            self.layout.as_ref().and_then(|l| l.position(handle)),
        ) else {
            return Ok(GrabOutcome::Ignored);
        };
        let start = grab_point.unwrap_or(laid_out);

        let mode = self.mode_for(handle);
        let capture = GrabCapture::new(scene, &ids, mode, start, volume)?;
        self.grab = Some(ActiveGrab {
            handle,
            resolver: TransformResolver::new(capture),
            raw: start,
            constrained: start,
            anchor: start,
            locks: self.policy.state.locked_axes(),
            last: None,
        });
        tracing::info!("Grabbed {:?} handle {} in {:?} mode", handle.kind, handle.index, mode);
        Ok(GrabOutcome::Started(mode))
    }

    pub fn drag(&mut self, scene: &mut Scene, input: DragInput) -> ManipResult<DragOutcome> {
        let Some(grab) = self.grab.as_mut() else {
            return Ok(DragOutcome::Idle);
        };

        grab.raw = match input {
            DragInput::Position(p) => p,
            DragInput::Delta(d) => grab.raw + d,
        };

        // A lock change mid-drag holds the newly locked axes where they are now
        let locks = self.policy.state.locked_axes();
        if locks != grab.locks {
            grab.anchor = grab.constrained;
            grab.locks = locks;
        }

        let (applied, constrained) = grab.resolver.constrain(&self.policy, grab.raw, grab.anchor);
        grab.constrained = constrained;
        grab.last = Some(applied);
        tracing::trace!("Drag {:?} -> {:?}", grab.raw, applied);

        for update in grab.resolver.resolve(&applied) {
            update.apply(scene)?;
        }
        self.refresh(scene)?;
        Ok(DragOutcome::Applied(applied))
    }

    /// Release the grabbed handle, returning the last applied motion
    pub fn grab_end(&mut self, scene: &Scene) -> ManipResult<Option<AppliedTransform>> {
        let Some(grab) = self.grab.take() else {
            return Ok(None);
        };
        tracing::info!("Released {:?} handle {}", grab.handle.kind, grab.handle.index);
        self.refresh(scene)?;
        Ok(grab.last)
    }

    // Editing commands

    /// Create a primitive with the current creation flags and select it
    pub fn add_primitive(&mut self, scene: &mut Scene, kind: ObjectKind, position: Vec3) -> ManipResult<Uuid> {
        let id = scene.add_primitive(kind, position, self.creation_flags, &self.creation)?;
        if self.grab.is_none() {
            let _ = self.select(scene, id, false)?;
        }
        Ok(id)
    }

    /// Scale the selection about its center so its extent along `axis`
    /// becomes `size`; returns false when nothing was changed
    pub fn set_axis_extent(&mut self, scene: &mut Scene, axis: Axis, size: f32) -> ManipResult<bool> {
        if self.grab.is_some() || self.selection.has_printer() {
            return Ok(false);
        }
        self.refresh(scene)?;
        let Some(volume) = self.volume else {
            return Ok(false);
        };
        for update in scale_extent(scene, &self.selection.ids(), &volume, axis, size)? {
            update.apply(scene)?;
        }
        self.refresh(scene)?;
        Ok(true)
    }

    /// Remove every selected object from the scene
    pub fn delete_selected(&mut self, scene: &mut Scene) -> ManipResult<Vec<Uuid>> {
        if self.grab.is_some() {
            return Ok(Vec::new());
        }
        let ids = self.selection.ids();
        if let Some(locked) = ids.iter().find(|id| scene.is_locked(**id)) {
            return Err(ManipError::Scene(tcad_core::SceneError::Locked(*locked)));
        }
        for id in &ids {
            scene.remove(*id)?;
        }
        let _ = self.selection.clear();
        self.refresh(scene)?;
        tracing::info!("Deleted {} objects", ids.len());
        Ok(ids)
    }

    /// Copy the selected objects by the duplicate offset and select the copies
    pub fn duplicate_selected(&mut self, scene: &mut Scene) -> ManipResult<Vec<Uuid>> {
        if self.grab.is_some() || self.selection.has_printer() {
            return Ok(Vec::new());
        }
        let offset = self.creation.duplicate_offset();
        let copies = self
            .selection
            .ids()
            .into_iter()
            .map(|id| scene.duplicate(id, offset))
            .collect::<Result<Vec<_>, _>>()?;

        let _ = self.selection.clear();
        for id in &copies {
            let _ = self.selection.add(scene.require(*id)?, true);
        }
        self.refresh(scene)?;
        Ok(copies)
    }

    /// Replace the selection after an action produced new objects
    pub(crate) fn reselect(&mut self, scene: &Scene, ids: &[Uuid]) -> ManipResult<()> {
        let _ = self.selection.clear();
        for id in ids {
            let _ = self.selection.add(scene.require(*id)?, true);
        }
        self.refresh(scene)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn setup() -> (Scene, ManipulationSession, Uuid) {
        let config = EngineConfig::default();
        let mut scene = Scene::new();
        let mut session = ManipulationSession::new(&config);
        let id = session
            .add_primitive(&mut scene, ObjectKind::Cube, Vec3::ZERO)
            .unwrap();
        (scene, session, id)
    }

    #[test]
    fn test_add_primitive_selects_it() {
        let (_, session, id) = setup();
        assert_eq!(session.selection().ids(), vec![id]);
        let volume = session.volume().unwrap();
        assert!(volume.half_extents.abs_diff_eq(Vec3::splat(0.05), 1e-6));
        assert!(session.layout().is_some());
    }

    #[test]
    fn test_creation_flags() {
        let (mut scene, mut session, _) = setup();
        session.set_creation_flags(true, true);
        let id = session
            .add_primitive(&mut scene, ObjectKind::Sphere, Vec3::X)
            .unwrap();
        let c = scene.get(id).unwrap().classification;
        assert!(c.is_hole() && c.is_reference());
    }

    #[test]
    fn test_drag_without_grab_is_idle() {
        let (mut scene, mut session, _) = setup();
        assert_eq!(
            session.drag(&mut scene, DragInput::Delta(Vec3::X)).unwrap(),
            DragOutcome::Idle
        );
    }

    #[test]
    fn test_second_grab_ignored() {
        let (scene, mut session, _) = setup();
        assert!(matches!(
            session.grab_begin(&scene, HandleId::movement()).unwrap(),
            GrabOutcome::Started(DragMode::Translate)
        ));
        assert_eq!(
            session.grab_begin(&scene, HandleId::corner(Vec3::ONE)).unwrap(),
            GrabOutcome::Ignored
        );
        assert_eq!(session.grabbed_handle(), Some(HandleId::movement()));
    }

    #[test]
    fn test_selection_refused_during_grab() {
        let (mut scene, mut session, id) = setup();
        let other = scene
            .add_primitive(ObjectKind::Cube, Vec3::X, Classification::SOLID, &CreationConfig::default())
            .unwrap();
        let _ = session.grab_begin(&scene, HandleId::movement()).unwrap();
        assert_eq!(
            session.select(&scene, other, true).unwrap(),
            SelectionChange::Refused
        );
        assert_eq!(session.clear_selection(&scene).unwrap(), SelectionChange::Refused);
        assert_eq!(session.selection().ids(), vec![id]);
    }

    #[test]
    fn test_incremental_drag_accumulates() {
        let (mut scene, mut session, id) = setup();
        let _ = session.grab_begin(&scene, HandleId::movement()).unwrap();
        for _ in 0..4 {
            session
                .drag(&mut scene, DragInput::Delta(Vec3::new(0.025, 0.0, 0.0)))
                .unwrap();
        }
        session.grab_end(&scene).unwrap();
        assert_relative_eq!(scene.get(id).unwrap().transform.position.x, 0.1, epsilon = 1e-6);
        assert_relative_eq!(session.volume().unwrap().center.x, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_uniform_scale_mode_on_corner() {
        let (scene, mut session, _) = setup();
        session.set_uniform_scaling(true);
        assert!(matches!(
            session.grab_begin(&scene, HandleId::corner(Vec3::ONE)).unwrap(),
            GrabOutcome::Started(DragMode::UniformScale { .. })
        ));
    }

    #[test]
    fn test_set_axis_extent() {
        let (mut scene, mut session, _) = setup();
        assert!(session.set_axis_extent(&mut scene, Axis::Y, 0.25).unwrap());
        let size = session.volume().unwrap().size();
        assert_relative_eq!(size.y, 0.25, epsilon = 1e-5);
        assert_relative_eq!(size.x, 0.1, epsilon = 1e-5);
    }

    #[test]
    fn test_delete_and_duplicate() {
        let (mut scene, mut session, id) = setup();
        let copies = session.duplicate_selected(&mut scene).unwrap();
        assert_eq!(copies.len(), 1);
        assert_eq!(session.selection().ids(), copies);
        let copy = scene.get(copies[0]).unwrap();
        assert_relative_eq!(copy.transform.position.x, 0.11);

        let _ = session.select(&scene, id, true).unwrap();
        let deleted = session.delete_selected(&mut scene).unwrap();
        assert_eq!(deleted.len(), 2);
        assert!(scene.is_empty());
        assert!(session.volume().is_none());
        assert!(session.layout().is_none());
    }

    #[test]
    fn test_reference_plane_moves_footprint() {
        let (_, mut session, _) = setup();
        session.set_reference_plane(Vec3::new(0.0, -0.3, 0.0));
        for p in session.layout().unwrap().footprint {
            assert_eq!(p.y, -0.3);
        }
    }
}
