//! Drag handles derived from the bounding volume
//!
//! Handle positions are a pure function of the volume, the handle offsets
//! and the handle id. Index conventions:
//!
//! - corner `0..8`: bit 0/1/2 set means the +X/+Y/+Z side
//! - edge `0..12`: `index / 4` is the axis the edge runs along, the two low
//!   bits give the sides on the remaining axes in X, Y, Z order
//! - face `0..6`: `index / 2` is the normal axis, even is the + side
//! - rotation wheel `0..3`: X, Y, Z, each placed on its rim
//! - movement `0`

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tcad_core::HandleConfig;

use crate::bounds::{BoundingVolume, corner_signs};
use crate::constraint::Axis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    Corner,
    Edge,
    Face,
    RotationWheel,
    Movement,
}

impl HandleKind {
    /// Number of handles of this kind
    pub fn count(self) -> usize {
        match self {
            HandleKind::Corner => 8,
            HandleKind::Edge => 12,
            HandleKind::Face => 6,
            HandleKind::RotationWheel => 3,
            HandleKind::Movement => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId {
    pub kind: HandleKind,
    pub index: usize,
}

impl HandleId {
    pub fn new(kind: HandleKind, index: usize) -> Option<Self> {
        (index < kind.count()).then_some(Self { kind, index })
    }

    pub fn corner(signs: Vec3) -> Self {
        let bit = |s: f32, b: usize| if s > 0.0 { 1 << b } else { 0 };
        Self {
            kind: HandleKind::Corner,
            index: bit(signs.x, 0) | bit(signs.y, 1) | bit(signs.z, 2),
        }
    }

    pub fn face(axis: Axis, positive: bool) -> Self {
        Self {
            kind: HandleKind::Face,
            index: axis.index() * 2 + usize::from(!positive),
        }
    }

    pub fn wheel(axis: Axis) -> Self {
        Self {
            kind: HandleKind::RotationWheel,
            index: axis.index(),
        }
    }

    pub fn movement() -> Self {
        Self {
            kind: HandleKind::Movement,
            index: 0,
        }
    }

    /// Every valid handle id, in layout order
    pub fn all() -> impl Iterator<Item = HandleId> {
        [
            HandleKind::Corner,
            HandleKind::Edge,
            HandleKind::Face,
            HandleKind::RotationWheel,
            HandleKind::Movement,
        ]
        .into_iter()
        .flat_map(|kind| (0..kind.count()).map(move |index| HandleId { kind, index }))
    }

    /// Axis/sign descriptor of this handle
    pub fn axes(self) -> HandleAxes {
        match self.kind {
            HandleKind::Corner => HandleAxes::Signed(corner_signs(self.index)),
            HandleKind::Edge => HandleAxes::Signed(edge_signs(self.index)),
            HandleKind::Face => HandleAxes::Signed(face_signs(self.index)),
            HandleKind::RotationWheel => {
                HandleAxes::Rotation(Axis::from_index(self.index).unwrap_or(Axis::X))
            }
            HandleKind::Movement => HandleAxes::Free,
        }
    }
}

/// Which degrees of freedom a handle drives
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HandleAxes {
    /// Per-axis signs of the box point the handle drags; zero for axes it
    /// does not touch
    Signed(Vec3),
    Rotation(Axis),
    Free,
}

fn edge_signs(index: usize) -> Vec3 {
    let along = index / 4;
    let bits = index % 4;
    let mut signs = Vec3::ZERO;
    let mut bit = 0;
    for axis in 0..3 {
        if axis == along {
            continue;
        }
        signs[axis] = if bits & (1 << bit) != 0 { 1.0 } else { -1.0 };
        bit += 1;
    }
    signs
}

fn face_signs(index: usize) -> Vec3 {
    let mut signs = Vec3::ZERO;
    signs[index / 2] = if index % 2 == 0 { 1.0 } else { -1.0 };
    signs
}

/// A handle with its current world placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub id: HandleId,
    pub axes: HandleAxes,
    pub position: Vec3,
    pub orientation: Quat,
}

/// All handle placements for one bounding volume
#[derive(Debug, Clone, PartialEq)]
pub struct HandleLayout {
    pub handles: Vec<Handle>,
    /// Bottom box corners dropped onto the reference plane height
    pub footprint: [Vec3; 4],
}

impl HandleLayout {
    pub fn layout(
        volume: &BoundingVolume,
        config: &HandleConfig,
        printer_selected: bool,
        reference_height: f32,
    ) -> Self {
        let handles = HandleId::all()
            .map(|id| Handle {
                id,
                axes: id.axes(),
                position: handle_position(volume, config, printer_selected, id),
                orientation: handle_orientation(volume, id),
            })
            .collect();

        let footprint = [0usize, 1, 4, 5].map(|i| {
            let mut p = volume.corner(corner_signs(i));
            p.y = reference_height;
            p
        });

        Self { handles, footprint }
    }

    pub fn get(&self, id: HandleId) -> Option<&Handle> {
        self.handles.iter().find(|h| h.id == id)
    }

    pub fn position(&self, id: HandleId) -> Option<Vec3> {
        self.get(id).map(|h| h.position)
    }
}

fn handle_position(
    volume: &BoundingVolume,
    config: &HandleConfig,
    printer_selected: bool,
    id: HandleId,
) -> Vec3 {
    let half = volume.half_extents;
    match id.kind {
        HandleKind::Corner => volume.corner(corner_signs(id.index)),
        HandleKind::Edge => volume.corner(edge_signs(id.index)),
        HandleKind::Face => {
            let signs = face_signs(id.index);
            volume.to_world(signs * (half + Vec3::splat(config.face_offset)))
        }
        // Each wheel sits on its rim, off the axis it turns about
        HandleKind::RotationWheel => {
            let w = config.wheel_offset;
            let local = match Axis::from_index(id.index) {
                Some(Axis::X) | None => Vec3::new(0.0, 0.0, -(half.z + 2.0 * w)),
                Some(Axis::Y) => Vec3::new(half.x + 2.0 * w, 0.0, 0.0),
                Some(Axis::Z) => Vec3::new(0.0, half.y + config.face_offset + w, 0.0),
            };
            volume.to_world(local)
        }
        HandleKind::Movement => {
            let mut height = half.y + config.face_offset + config.movement_offset;
            if printer_selected {
                height += config.printer_movement_offset;
            }
            volume.to_world(Vec3::new(0.0, height, 0.0))
        }
    }
}

fn handle_orientation(volume: &BoundingVolume, id: HandleId) -> Quat {
    match id.axes() {
        // Wheels lie in the plane perpendicular to their axis
        HandleAxes::Rotation(axis) => volume.rotation * Quat::from_rotation_arc(Vec3::Y, axis.unit()),
        HandleAxes::Signed(signs) if id.kind == HandleKind::Face => {
            volume.rotation * Quat::from_rotation_arc(Vec3::Y, signs)
        }
        _ => volume.rotation,
    }
}
