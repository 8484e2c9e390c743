//! Transform resolution for the active drag mode
//!
//! A grab captures the bounding volume and every selected object's world
//! vertices. Each tick the constrained handle motion is turned into an
//! [`AppliedTransform`] and then into per-object updates computed from the
//! captured state, so a drag never accumulates rounding from earlier ticks.

use glam::{Quat, Vec3};
use tcad_core::{Scene, Transform};
use uuid::Uuid;

use crate::bounds::BoundingVolume;
use crate::constraint::{Axis, ConstraintPolicy};
use crate::error::{ManipError, ManipResult};

/// Extents below this are treated as flat
const MIN_EXTENT: f32 = 1e-6;

/// Transform mode selected by the grabbed handle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragMode {
    /// Rigid move of every selected object
    Translate,
    /// Anisotropic resize dragging the box point with these signs
    Resize { signs: Vec3 },
    /// Resize along the diagonal through the corner with these signs
    UniformScale { signs: Vec3 },
    Rotate(Axis),
}

/// An object as it was when the grab began
#[derive(Debug, Clone)]
pub struct CapturedObject {
    pub id: Uuid,
    pub transform: Transform,
    pub world_vertices: Vec<Vec3>,
}

/// State captured at grab begin
#[derive(Debug, Clone)]
pub struct GrabCapture {
    pub mode: DragMode,
    pub handle_start: Vec3,
    pub volume: BoundingVolume,
    pub objects: Vec<CapturedObject>,
}

impl GrabCapture {
    pub fn new(
        scene: &Scene,
        ids: &[Uuid],
        mode: DragMode,
        handle_start: Vec3,
        volume: BoundingVolume,
    ) -> ManipResult<Self> {
        Ok(Self {
            mode,
            handle_start,
            volume,
            objects: capture_objects(scene, ids)?,
        })
    }
}

/// Snapshot the world vertices and transforms of `ids`
pub fn capture_objects(scene: &Scene, ids: &[Uuid]) -> ManipResult<Vec<CapturedObject>> {
    ids.iter()
        .map(|&id| {
            let object = scene.get(id).ok_or(ManipError::MissingObject(id))?;
            Ok(CapturedObject {
                id,
                transform: object.transform,
                world_vertices: object.world_vertices(),
            })
        })
        .collect()
}

/// Constrained motion for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppliedTransform {
    /// World-space offset of the whole selection
    Translation(Vec3),
    /// Box-local movement of the dragged box point; zero signs mark
    /// untouched axes
    Resize { signs: Vec3, delta: Vec3 },
    /// Rotation about the captured box center
    Rotation { axis: Axis, angle: f32 },
}

/// Change to apply to one scene object
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectUpdate {
    Transform(Uuid, Transform),
    Vertices(Uuid, Vec<Vec3>),
}

impl ObjectUpdate {
    pub fn id(&self) -> Uuid {
        match self {
            ObjectUpdate::Transform(id, _) | ObjectUpdate::Vertices(id, _) => *id,
        }
    }

    /// Write the update into the scene, rebuilding the object's collider
    pub fn apply(self, scene: &mut Scene) -> ManipResult<()> {
        match self {
            ObjectUpdate::Transform(id, transform) => {
                scene.get_mut(id)?.transform = transform;
            }
            ObjectUpdate::Vertices(id, vertices) => {
                scene.get_mut(id)?.set_world_vertices(&vertices)?;
            }
        }
        Ok(())
    }
}

/// Resolves drag input for one grab
#[derive(Debug, Clone)]
pub struct TransformResolver {
    capture: GrabCapture,
}

impl TransformResolver {
    pub fn new(capture: GrabCapture) -> Self {
        Self { capture }
    }

    pub fn capture(&self) -> &GrabCapture {
        &self.capture
    }

    pub fn mode(&self) -> DragMode {
        self.capture.mode
    }

    /// Run the constraint policy over a raw handle position
    ///
    /// `anchor` holds the handle position captured when the current axis
    /// lock took effect. Returns the constrained motion and the constrained
    /// handle position.
    pub fn constrain(
        &self,
        policy: &ConstraintPolicy,
        raw: Vec3,
        anchor: Vec3,
    ) -> (AppliedTransform, Vec3) {
        let capture = &self.capture;
        match capture.mode {
            DragMode::Translate => {
                let delta =
                    policy.constrain_translation(raw, anchor, capture.handle_start, &capture.volume);
                (AppliedTransform::Translation(delta), capture.handle_start + delta)
            }
            DragMode::Resize { signs } => {
                // Constrain the dragged box point, not the offset handle
                let shift = capture.handle_start - capture.volume.corner(signs);
                let target = policy.constrain_point(raw - shift, anchor - shift);
                let applied = AppliedTransform::Resize {
                    signs,
                    delta: self.resize_delta(signs, target),
                };
                (applied, target + shift)
            }
            DragMode::UniformScale { signs } => {
                let applied = AppliedTransform::Resize {
                    signs,
                    delta: self.uniform_delta(signs, raw),
                };
                (applied, raw)
            }
            DragMode::Rotate(axis) => {
                let applied = AppliedTransform::Rotation {
                    axis,
                    angle: policy.constrain_angle(self.wheel_angle(axis, raw)),
                };
                (applied, raw)
            }
        }
    }

    /// Box-local movement of the dragged box point to `target`
    fn resize_delta(&self, signs: Vec3, target: Vec3) -> Vec3 {
        let volume = &self.capture.volume;
        let delta = volume.to_local(target) - signs * volume.half_extents;
        Vec3::select(signs.cmpne(Vec3::ZERO), delta, Vec3::ZERO)
    }

    /// Project the handle motion onto the diagonal through the dragged
    /// corner and express the scale ratio as an equal-ratio corner movement
    fn uniform_delta(&self, signs: Vec3, target: Vec3) -> Vec3 {
        let volume = &self.capture.volume;
        let diagonal = signs * volume.half_extents;
        let len_sq = diagonal.length_squared();
        if len_sq < MIN_EXTENT * MIN_EXTENT {
            return Vec3::ZERO;
        }
        let moved = volume.to_local(target) - volume.to_local(self.capture.handle_start);
        let ratio = 1.0 + moved.dot(diagonal) / len_sq;
        diagonal * (ratio - 1.0)
    }

    /// Angle swept by the wheel around `axis` since grab begin
    pub fn wheel_angle(&self, axis: Axis, current: Vec3) -> f32 {
        let volume = &self.capture.volume;
        let axis = volume.axis(axis.unit());
        let a = (self.capture.handle_start - volume.center).reject_from_normalized(axis);
        let b = (current - volume.center).reject_from_normalized(axis);
        if a.length_squared() < MIN_EXTENT * MIN_EXTENT || b.length_squared() < MIN_EXTENT * MIN_EXTENT {
            return 0.0;
        }
        axis.dot(a.cross(b)).atan2(a.dot(b))
    }

    /// Per-object updates for a constrained motion
    pub fn resolve(&self, applied: &AppliedTransform) -> Vec<ObjectUpdate> {
        let capture = &self.capture;
        match *applied {
            AppliedTransform::Translation(delta) => capture
                .objects
                .iter()
                .map(|o| {
                    let mut transform = o.transform;
                    transform.position += delta;
                    ObjectUpdate::Transform(o.id, transform)
                })
                .collect(),
            AppliedTransform::Resize { signs, delta } => capture
                .objects
                .iter()
                .map(|o| {
                    let vertices = o
                        .world_vertices
                        .iter()
                        .map(|&v| resize_vertex(&capture.volume, signs, delta, v))
                        .collect();
                    ObjectUpdate::Vertices(o.id, vertices)
                })
                .collect(),
            AppliedTransform::Rotation { axis, angle } => {
                let center = capture.volume.center;
                let rotation = Quat::from_axis_angle(capture.volume.axis(axis.unit()), angle);
                capture
                    .objects
                    .iter()
                    .map(|o| {
                        let vertices = o
                            .world_vertices
                            .iter()
                            .map(|&v| center + rotation * (v - center))
                            .collect();
                        ObjectUpdate::Vertices(o.id, vertices)
                    })
                    .collect()
            }
        }
    }
}

/// Move one vertex for a resize of the box
///
/// Along each dragged axis the vertex moves by the box delta weighted by its
/// closeness to the dragged point: full at the dragged face, zero at the
/// opposite one.
pub fn resize_vertex(volume: &BoundingVolume, signs: Vec3, delta: Vec3, vertex: Vec3) -> Vec3 {
    let mut local = volume.to_local(vertex);
    let size = volume.size();
    for axis in 0..3 {
        if signs[axis] == 0.0 {
            continue;
        }
        let dragged = signs[axis] * volume.half_extents[axis];
        let weight = if size[axis] < MIN_EXTENT {
            1.0
        } else {
            (size[axis] - (dragged - local[axis]).abs()) / size[axis]
        };
        local[axis] += delta[axis] * weight;
    }
    volume.to_world(local)
}

/// Updates that scale the selection about the box center so its extent
/// along `axis` becomes `size`
pub fn scale_extent(
    scene: &Scene,
    ids: &[Uuid],
    volume: &BoundingVolume,
    axis: Axis,
    size: f32,
) -> ManipResult<Vec<ObjectUpdate>> {
    if !(size.is_finite() && size > 0.0) {
        return Err(ManipError::InvalidExtent(size));
    }
    let current = volume.size()[axis.index()];
    if current < MIN_EXTENT {
        return Err(ManipError::DegenerateExtent(axis));
    }
    let mut factor = Vec3::ONE;
    factor[axis.index()] = size / current;

    Ok(capture_objects(scene, ids)?
        .into_iter()
        .map(|o| {
            let vertices = o
                .world_vertices
                .iter()
                .map(|&v| volume.to_world(volume.to_local(v) * factor))
                .collect();
            ObjectUpdate::Vertices(o.id, vertices)
        })
        .collect())
}
