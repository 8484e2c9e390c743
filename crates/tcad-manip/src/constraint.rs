//! Constraint policy: axis lock, grid snap and uniform scale

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tcad_core::GridConfig;

use crate::bounds::BoundingVolume;

/// World axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }
}

/// Lock corner selection, named by the axes left free
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AxisLock {
    /// Nothing locked
    #[default]
    None,
    X,
    Y,
    Z,
    XY,
    XZ,
    YZ,
}

impl AxisLock {
    /// Locked flags per axis
    pub fn locked_axes(self) -> [bool; 3] {
        match self {
            AxisLock::None => [false, false, false],
            AxisLock::X => [false, true, true],
            AxisLock::Y => [true, false, true],
            AxisLock::Z => [true, true, false],
            AxisLock::XY => [false, false, true],
            AxisLock::XZ => [false, true, false],
            AxisLock::YZ => [true, false, false],
        }
    }

    /// Lock corner for a set of locked flags; None when all three are locked
    pub fn from_locked(locked: [bool; 3]) -> Option<Self> {
        match locked {
            [false, false, false] => Some(AxisLock::None),
            [false, true, true] => Some(AxisLock::X),
            [true, false, true] => Some(AxisLock::Y),
            [true, true, false] => Some(AxisLock::Z),
            [false, false, true] => Some(AxisLock::XY),
            [false, true, false] => Some(AxisLock::XZ),
            [true, false, false] => Some(AxisLock::YZ),
            [true, true, true] => None,
        }
    }
}

/// Rejected constraint requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintError {
    #[error("Cannot lock all three axes")]
    AllAxesLocked,
}

/// Long-lived modifier flags of a manipulation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConstraintState {
    snapping: bool,
    locked: [bool; 3],
    uniform_scaling: bool,
}

impl ConstraintState {
    pub fn snapping_enabled(&self) -> bool {
        self.snapping
    }

    pub fn set_snapping(&mut self, enabled: bool) {
        self.snapping = enabled;
    }

    pub fn locked_axes(&self) -> [bool; 3] {
        self.locked
    }

    pub fn is_locked(&self, axis: Axis) -> bool {
        self.locked[axis.index()]
    }

    pub fn any_locked(&self) -> bool {
        self.locked.iter().any(|&l| l)
    }

    pub fn axis_lock(&self) -> AxisLock {
        // All-three is never stored
        AxisLock::from_locked(self.locked).unwrap_or_default()
    }

    /// Select one of the seven lock corners
    pub fn set_axis_lock(&mut self, lock: AxisLock) {
        self.locked = lock.locked_axes();
    }

    /// Replace the locked flags; all three locked is rejected without change
    pub fn set_locked_axes(&mut self, locked: [bool; 3]) -> Result<(), ConstraintError> {
        if locked.iter().all(|&l| l) {
            tracing::warn!("Rejected request to lock all three axes");
            return Err(ConstraintError::AllAxesLocked);
        }
        self.locked = locked;
        Ok(())
    }

    /// Flip the lock of one axis
    pub fn toggle_axis_lock(&mut self, axis: Axis) -> Result<(), ConstraintError> {
        let mut locked = self.locked;
        locked[axis.index()] = !locked[axis.index()];
        self.set_locked_axes(locked)
    }

    pub fn uniform_scaling_enabled(&self) -> bool {
        self.uniform_scaling
    }

    pub fn set_uniform_scaling(&mut self, enabled: bool) {
        self.uniform_scaling = enabled;
    }

    /// Uniform scaling only applies while no axis is locked
    pub fn uniform_scaling_active(&self) -> bool {
        self.uniform_scaling && !self.any_locked()
    }
}

/// Snapping grid aligned to the reference plane
#[derive(Debug, Clone, PartialEq)]
pub struct GridFrame {
    spacing: f32,
    offset: Vec3,
    reference: Vec3,
    presets: Vec<f32>,
}

impl GridFrame {
    pub fn new(spacing: f32, presets: Vec<f32>) -> Self {
        Self {
            spacing,
            offset: Vec3::ZERO,
            reference: Vec3::ZERO,
            presets,
        }
    }

    pub fn from_config(config: &GridConfig) -> Self {
        Self::new(config.spacing, config.spacing_presets.clone())
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    /// Align the grid to the reference plane's world position
    pub fn set_reference_plane(&mut self, position: Vec3) {
        self.reference = position;
        self.recompute_offset();
    }

    pub fn set_spacing(&mut self, spacing: f32) {
        if spacing <= 0.0 || !spacing.is_finite() {
            tracing::warn!("Ignoring invalid grid spacing {}", spacing);
            return;
        }
        self.spacing = spacing;
        self.recompute_offset();
    }

    /// Step to the next spacing preset, returning the new spacing
    pub fn cycle_spacing(&mut self) -> f32 {
        if self.presets.is_empty() {
            return self.spacing;
        }
        let next = self
            .presets
            .iter()
            .position(|&s| (s - self.spacing).abs() < f32::EPSILON)
            .map_or(0, |i| (i + 1) % self.presets.len());
        self.set_spacing(self.presets[next]);
        tracing::info!("Grid spacing set to {}", self.spacing);
        self.spacing
    }

    fn recompute_offset(&mut self) {
        let s = self.spacing;
        self.offset = self.reference - s * (self.reference / s).floor();
    }

    /// Snap one coordinate to the nearest grid line, ties going down
    pub fn snap_scalar(&self, value: f32, axis: Axis) -> f32 {
        let offset = self.offset[axis.index()];
        let steps = ((value - offset) / self.spacing - 0.5).ceil();
        steps * self.spacing + offset
    }

    /// Snap the axes flagged in `free`, leaving the others untouched
    pub fn snap_point(&self, point: Vec3, free: [bool; 3]) -> Vec3 {
        let mut out = point;
        for axis in Axis::ALL {
            if free[axis.index()] {
                out[axis.index()] = self.snap_scalar(point[axis.index()], axis);
            }
        }
        out
    }
}

/// Turns raw handle motion into constrained motion
///
/// Axis lock is applied first and decides the free subspace; grid snap then
/// acts only on free axes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintPolicy {
    pub state: ConstraintState,
    pub grid: GridFrame,
    rotation_step: f32,
}

impl ConstraintPolicy {
    pub fn new(grid: GridFrame, rotation_step_degrees: f32) -> Self {
        Self {
            state: ConstraintState::default(),
            grid,
            rotation_step: rotation_step_degrees.to_radians(),
        }
    }

    pub fn from_config(config: &GridConfig) -> Self {
        Self::new(GridFrame::from_config(config), config.rotation_snap_degrees)
    }

    fn free_axes(&self) -> [bool; 3] {
        self.state.locked_axes().map(|locked| !locked)
    }

    /// Constrain a dragged point; locked components come from `anchor`
    pub fn constrain_point(&self, raw: Vec3, anchor: Vec3) -> Vec3 {
        let mut point = raw;
        for axis in Axis::ALL {
            if self.state.is_locked(axis) {
                point[axis.index()] = anchor[axis.index()];
            }
        }
        if self.state.snapping_enabled() {
            point = self.grid.snap_point(point, self.free_axes());
        }
        point
    }

    /// Constrain a rigid move of the box captured at grab start
    ///
    /// `raw` and `anchor` are handle positions and `origin` is the handle
    /// position at grab start. With snapping on, the box face leading the
    /// motion on each free axis lands on the grid; vertically the bottom face
    /// is always the one snapped.
    pub fn constrain_translation(
        &self,
        raw: Vec3,
        anchor: Vec3,
        origin: Vec3,
        volume: &BoundingVolume,
    ) -> Vec3 {
        let mut delta = raw - origin;
        for axis in Axis::ALL {
            if self.state.is_locked(axis) {
                delta[axis.index()] = anchor[axis.index()] - origin[axis.index()];
            }
        }
        if !self.state.snapping_enabled() {
            return delta;
        }

        let (min, max) = volume.world_bounds();
        for axis in Axis::ALL {
            let i = axis.index();
            if self.state.is_locked(axis) {
                continue;
            }
            let leading = if axis == Axis::Y || delta[i] <= 0.0 {
                min[i]
            } else {
                max[i]
            };
            delta[i] = self.grid.snap_scalar(leading + delta[i], axis) - leading;
        }
        delta
    }

    /// Quantize a rotation angle (radians) when snapping is on
    pub fn constrain_angle(&self, angle: f32) -> f32 {
        if self.state.snapping_enabled() && self.rotation_step > 0.0 {
            (angle / self.rotation_step).round() * self.rotation_step
        } else {
            angle
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::Quat;

    use super::*;

    fn policy() -> ConstraintPolicy {
        ConstraintPolicy::from_config(&GridConfig::default())
    }

    #[test]
    fn test_lock_corners_round_trip() {
        for lock in [
            AxisLock::None,
            AxisLock::X,
            AxisLock::Y,
            AxisLock::Z,
            AxisLock::XY,
            AxisLock::XZ,
            AxisLock::YZ,
        ] {
            assert_eq!(AxisLock::from_locked(lock.locked_axes()), Some(lock));
        }
        assert_eq!(AxisLock::from_locked([true; 3]), None);
    }

    #[test]
    fn test_lock_all_three_rejected_without_change() {
        let mut state = ConstraintState::default();
        state.toggle_axis_lock(Axis::X).unwrap();
        state.toggle_axis_lock(Axis::Y).unwrap();
        let before = state.locked_axes();
        assert_eq!(
            state.toggle_axis_lock(Axis::Z),
            Err(ConstraintError::AllAxesLocked)
        );
        assert_eq!(state.locked_axes(), before);
        assert_eq!(state.axis_lock(), AxisLock::Z);
    }

    #[test]
    fn test_axis_lock_suppresses_uniform_scaling() {
        let mut state = ConstraintState::default();
        state.set_uniform_scaling(true);
        assert!(state.uniform_scaling_active());
        state.set_axis_lock(AxisLock::XY);
        assert!(state.uniform_scaling_enabled());
        assert!(!state.uniform_scaling_active());
    }

    #[test]
    fn test_snap_is_idempotent() {
        let mut grid = GridFrame::new(0.02, vec![]);
        grid.set_reference_plane(Vec3::new(0.013, -0.271, 1.7));
        for i in -500..500 {
            let x = i as f32 * 0.0037 + 0.0001;
            for axis in Axis::ALL {
                let once = grid.snap_scalar(x, axis);
                assert_eq!(grid.snap_scalar(once, axis), once);
                assert!((once - x).abs() <= 0.01 + 1e-6);
            }
        }
    }

    #[test]
    fn test_snap_ties_go_down() {
        let grid = GridFrame::new(1.0, vec![]);
        assert_eq!(grid.snap_scalar(0.5, Axis::X), 0.0);
        assert_eq!(grid.snap_scalar(0.51, Axis::X), 1.0);
        assert_eq!(grid.snap_scalar(-0.5, Axis::X), -1.0);
        assert_eq!(grid.snap_scalar(1.49, Axis::X), 1.0);
    }

    #[test]
    fn test_grid_offset_follows_reference_plane() {
        let mut grid = GridFrame::new(0.5, vec![]);
        grid.set_reference_plane(Vec3::new(0.2, 1.3, -0.2));
        assert_relative_eq!(grid.offset().x, 0.2, epsilon = 1e-6);
        assert_relative_eq!(grid.offset().y, 0.3, epsilon = 1e-6);
        assert_relative_eq!(grid.offset().z, 0.3, epsilon = 1e-6);
        // The reference plane itself sits on a grid line
        assert_relative_eq!(grid.snap_scalar(1.3, Axis::Y), 1.3, epsilon = 1e-6);
    }

    #[test]
    fn test_cycle_spacing() {
        let mut grid = GridFrame::from_config(&GridConfig::default());
        assert_eq!(grid.cycle_spacing(), 0.01);
        assert_eq!(grid.cycle_spacing(), 0.005);
        assert_eq!(grid.cycle_spacing(), 0.05);
        assert_eq!(grid.cycle_spacing(), 0.02);
    }

    #[test]
    fn test_locked_axes_take_anchor_values() {
        let mut policy = policy();
        policy.state.set_axis_lock(AxisLock::X);
        let anchor = Vec3::new(1.0, 2.0, 3.0);
        for raw in [Vec3::new(5.0, -7.0, 9.0), Vec3::new(-1.0, 0.5, 0.25)] {
            let p = policy.constrain_point(raw, anchor);
            assert_eq!(p.x, raw.x);
            assert_eq!(p.y, anchor.y);
            assert_eq!(p.z, anchor.z);
        }
    }

    #[test]
    fn test_snap_only_touches_free_axes() {
        let mut policy = policy();
        policy.state.set_snapping(true);
        policy.state.set_axis_lock(AxisLock::Y);
        let anchor = Vec3::new(0.0123, 0.0, 0.0456);
        let p = policy.constrain_point(Vec3::new(0.5, 0.0312, 0.5), anchor);
        assert_eq!(p.x, anchor.x);
        assert_eq!(p.z, anchor.z);
        assert_relative_eq!(p.y, 0.04, epsilon = 1e-6);
    }

    #[test]
    fn test_translation_snaps_leading_face() {
        let mut policy = policy();
        policy.state.set_snapping(true);
        let volume =
            BoundingVolume::from_points([Vec3::new(0.001, 0.003, 0.0), Vec3::new(0.051, 0.053, 0.05)], Quat::IDENTITY)
                .unwrap();
        let delta = policy.constrain_translation(
            Vec3::new(0.03, 0.0, -0.011),
            Vec3::ZERO,
            Vec3::ZERO,
            &volume,
        );
        let (min, max) = volume.world_bounds();
        // +X motion: max face on grid; Y: bottom face; -Z motion: min face
        assert_relative_eq!(max.x + delta.x, 0.08, epsilon = 1e-6);
        assert_relative_eq!(min.y + delta.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(min.z + delta.z, -0.02, epsilon = 1e-6);
    }

    #[test]
    fn test_angle_quantization() {
        let mut policy = policy();
        assert_relative_eq!(policy.constrain_angle(22f32.to_radians()), 22f32.to_radians());
        policy.state.set_snapping(true);
        assert_relative_eq!(
            policy.constrain_angle(22f32.to_radians()),
            15f32.to_radians(),
            epsilon = 1e-6
        );
        assert_relative_eq!(
            policy.constrain_angle(-38f32.to_radians()),
            -45f32.to_radians(),
            epsilon = 1e-6
        );
    }
}
