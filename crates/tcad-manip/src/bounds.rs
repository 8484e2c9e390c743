//! Oriented bounding box around the selection

use glam::{Mat4, Quat, Vec3};
use tcad_core::Scene;

use crate::error::{ManipError, ManipResult};
use crate::selection::SelectionSet;

/// Minimal box enclosing every world-space vertex of the selection
///
/// The box is axis-aligned in the frame given by `rotation`, which is the
/// identity unless the workspace has been recalibrated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingVolume {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub rotation: Quat,
}

impl BoundingVolume {
    /// Fit a box to world-space points, in the frame of `rotation`
    pub fn from_points<I>(points: I, rotation: Quat) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let inverse = rotation.inverse();
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        let mut any = false;
        for p in points {
            let local = inverse * p;
            min = min.min(local);
            max = max.max(local);
            any = true;
        }
        if !any {
            return None;
        }
        let local_center = (min + max) * 0.5;
        Some(Self {
            center: rotation * local_center,
            half_extents: (max - min) * 0.5,
            rotation,
        })
    }

    /// Recompute from the current selection
    ///
    /// Returns None for an empty selection. A selected id that is no longer
    /// in the scene is an error rather than being skipped.
    pub fn recompute(
        scene: &Scene,
        selection: &SelectionSet,
        rotation: Quat,
    ) -> ManipResult<Option<Self>> {
        let mut points = Vec::new();
        for id in selection.ids() {
            let object = scene.get(id).ok_or(ManipError::MissingObject(id))?;
            points.extend(object.world_vertices());
        }
        Ok(Self::from_points(points, rotation))
    }

    pub fn size(&self) -> Vec3 {
        self.half_extents * 2.0
    }

    /// World position of the corner with the given per-axis signs
    pub fn corner(&self, signs: Vec3) -> Vec3 {
        self.to_world(signs * self.half_extents)
    }

    /// World point to box-local offset from the center
    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * (world - self.center)
    }

    /// Box-local offset to world point
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.center + self.rotation * local
    }

    /// World-space box axis for a local axis direction
    pub fn axis(&self, local: Vec3) -> Vec3 {
        self.rotation * local
    }

    /// Transform of the unit cube onto this box, for rendering
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.size(), self.rotation, self.center)
    }

    /// World-space axis-aligned bounds of the box
    pub fn world_bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for i in 0..8 {
            let c = self.corner(corner_signs(i));
            min = min.min(c);
            max = max.max(c);
        }
        (min, max)
    }

    /// Check that a world point lies inside the box, within `tolerance`
    pub fn contains(&self, world: Vec3, tolerance: f32) -> bool {
        let local = self.to_local(world);
        local.abs().cmple(self.half_extents + Vec3::splat(tolerance)).all()
    }
}

/// Sign vector for corner `index`; bit 0 is X, bit 1 is Y, bit 2 is Z
pub(crate) fn corner_signs(index: usize) -> Vec3 {
    let sign = |bit: usize| if index & (1 << bit) != 0 { 1.0 } else { -1.0 };
    Vec3::new(sign(0), sign(1), sign(2))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use tcad_core::{Classification, CreationConfig, ObjectKind};

    use super::*;

    #[test]
    fn test_from_points_is_minimal() {
        let points = [
            Vec3::new(-1.0, 0.5, 2.0),
            Vec3::new(3.0, -0.5, 1.0),
            Vec3::new(0.0, 2.0, -1.0),
        ];
        let volume = BoundingVolume::from_points(points, Quat::IDENTITY).unwrap();
        assert!(volume.center.abs_diff_eq(Vec3::new(1.0, 0.75, 0.5), 1e-6));
        assert!(volume.half_extents.abs_diff_eq(Vec3::new(2.0, 1.25, 1.5), 1e-6));
        for p in points {
            assert!(volume.contains(p, 1e-6));
        }
        // Every face touches at least one point
        for axis in 0..3 {
            let lo = points.iter().map(|p| p[axis]).fold(f32::INFINITY, f32::min);
            let hi = points.iter().map(|p| p[axis]).fold(f32::NEG_INFINITY, f32::max);
            assert_relative_eq!(volume.center[axis] - volume.half_extents[axis], lo);
            assert_relative_eq!(volume.center[axis] + volume.half_extents[axis], hi);
        }
    }

    #[test]
    fn test_from_points_empty() {
        assert!(BoundingVolume::from_points(Vec::new(), Quat::IDENTITY).is_none());
    }

    #[test]
    fn test_rotated_frame() {
        let rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        let points = [
            rotation * Vec3::new(-1.0, -1.0, -2.0),
            rotation * Vec3::new(1.0, 1.0, 2.0),
        ];
        let volume = BoundingVolume::from_points(points, rotation).unwrap();
        assert!(volume.half_extents.abs_diff_eq(Vec3::new(1.0, 1.0, 2.0), 1e-5));
        assert!(volume.center.abs_diff_eq(Vec3::ZERO, 1e-5));
        assert!(volume.corner(Vec3::ONE).abs_diff_eq(points[1], 1e-5));
    }

    #[test]
    fn test_recompute_uses_rotated_vertices() {
        let mut scene = Scene::new();
        let config = CreationConfig::default();
        let id = scene
            .add_primitive(ObjectKind::Cube, Vec3::ZERO, Classification::SOLID, &config)
            .unwrap();
        scene.get_mut(id).unwrap().transform.rotation =
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);

        let mut selection = SelectionSet::new();
        selection.add(scene.get(id).unwrap(), false);
        let volume = BoundingVolume::recompute(&scene, &selection, Quat::IDENTITY)
            .unwrap()
            .unwrap();
        // Cube of side 0.1 rotated 45 degrees about Y
        let expected = 0.05 * std::f32::consts::SQRT_2;
        assert_relative_eq!(volume.half_extents.x, expected, epsilon = 1e-6);
        assert_relative_eq!(volume.half_extents.y, 0.05, epsilon = 1e-6);
        assert_relative_eq!(volume.half_extents.z, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_recompute_missing_object_fails() {
        let mut scene = Scene::new();
        let config = CreationConfig::default();
        let id = scene
            .add_primitive(ObjectKind::Cube, Vec3::ZERO, Classification::SOLID, &config)
            .unwrap();
        let mut selection = SelectionSet::new();
        selection.add(scene.get(id).unwrap(), false);
        scene.remove(id).unwrap();
        assert!(matches!(
            BoundingVolume::recompute(&scene, &selection, Quat::IDENTITY),
            Err(ManipError::MissingObject(missing)) if missing == id
        ));
    }

    #[test]
    fn test_corner_signs_cover_all_corners() {
        let mut seen: Vec<[i32; 3]> = (0..8)
            .map(|i| corner_signs(i).to_array().map(|s| s as i32))
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 8);
    }
}
