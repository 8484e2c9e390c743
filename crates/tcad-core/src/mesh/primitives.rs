//! Primitive mesh generation
//!
//! All primitives are centred on the origin with outward-facing,
//! counter-clockwise winding. Sizes follow the usual unit conventions:
//! cube side 1, sphere diameter 1, cylinder and capsule height 2.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec3;

use super::MeshData;

/// Incremental builder that keeps positions, uvs and indices in step
#[derive(Default)]
struct MeshBuilder {
    vertices: Vec<[f32; 3]>,
    uv0: Vec<[f32; 2]>,
    indices: Vec<u32>,
}

impl MeshBuilder {
    fn vertex(&mut self, position: Vec3, uv: [f32; 2]) -> u32 {
        self.vertices.push(position.to_array());
        self.uv0.push(uv);
        (self.vertices.len() - 1) as u32
    }

    fn triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Quad with corners in counter-clockwise order
    fn quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.triangle(a, b, c);
        self.triangle(a, c, d);
    }

    fn build(self) -> MeshData {
        let mut mesh = MeshData {
            vertices: self.vertices,
            indices: self.indices,
            uv0: self.uv0,
            ..Default::default()
        };
        mesh.recalculate_normals();
        mesh
    }
}

/// Unit cube with flat faces (4 vertices per face)
pub fn cube() -> MeshData {
    box_mesh(Vec3::splat(0.5))
}

/// Axis-aligned box with the given half extents
pub fn box_mesh(half: Vec3) -> MeshData {
    // (normal, u, v) with u x v == normal
    let faces = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y, Vec3::X),
    ];

    let mut builder = MeshBuilder::default();
    for (normal, u, v) in faces {
        let center = normal * half;
        let (u, v) = (u * half, v * half);
        let a = builder.vertex(center - u - v, [0.0, 0.0]);
        let b = builder.vertex(center + u - v, [1.0, 0.0]);
        let c = builder.vertex(center + u + v, [1.0, 1.0]);
        let d = builder.vertex(center - u + v, [0.0, 1.0]);
        builder.quad(a, b, c, d);
    }
    builder.build()
}

/// Surface of revolution around Y
///
/// `profile` lists (radius, height) rings from top to bottom. Rings with zero
/// radius act as poles and produce fans instead of quads.
fn lathe(profile: &[(f32, f32)], segments: u32) -> MeshData {
    let segments = segments.max(3);
    let mut builder = MeshBuilder::default();

    let ring_count = profile.len();
    for (k, &(radius, y)) in profile.iter().enumerate() {
        let v = k as f32 / (ring_count.max(2) - 1) as f32;
        for s in 0..=segments {
            let theta = TAU * s as f32 / segments as f32;
            let position = Vec3::new(radius * theta.cos(), y, radius * theta.sin());
            builder.vertex(position, [s as f32 / segments as f32, v]);
        }
    }

    let stride = segments + 1;
    for k in 0..ring_count.saturating_sub(1) {
        let top_pole = profile[k].0 == 0.0;
        let bottom_pole = profile[k + 1].0 == 0.0;
        for s in 0..segments {
            let a = k as u32 * stride + s;
            let d = a + 1;
            let b = a + stride;
            let c = b + 1;
            if !top_pole {
                builder.triangle(a, d, c);
            }
            if !bottom_pole {
                builder.triangle(a, c, b);
            }
        }
    }
    builder.build()
}

/// UV sphere with diameter 1
pub fn sphere(segments: u32, rings: u32) -> MeshData {
    let rings = rings.max(2);
    let profile: Vec<(f32, f32)> = (0..=rings)
        .map(|r| {
            let phi = PI * r as f32 / rings as f32;
            let radius = if r == 0 || r == rings { 0.0 } else { 0.5 * phi.sin() };
            (radius, 0.5 * phi.cos())
        })
        .collect();
    lathe(&profile, segments)
}

/// Sphere with an arbitrary radius
pub fn sphere_with_radius(radius: f32, segments: u32, rings: u32) -> MeshData {
    let mut mesh = sphere(segments, rings);
    for v in &mut mesh.vertices {
        *v = (Vec3::from(*v) * (radius * 2.0)).to_array();
    }
    mesh
}

/// Cylinder with radius 0.5 and height 2
pub fn cylinder(segments: u32) -> MeshData {
    lathe(&[(0.0, 1.0), (0.5, 1.0), (0.5, -1.0), (0.0, -1.0)], segments)
}

/// Cone with base radius 0.5 and height 1
pub fn cone(segments: u32) -> MeshData {
    lathe(&[(0.0, 0.5), (0.5, -0.5), (0.0, -0.5)], segments)
}

/// Capsule with radius 0.5 and total height 2
pub fn capsule(segments: u32, rings: u32) -> MeshData {
    let half_rings = (rings / 2).max(1);
    let mut profile = Vec::with_capacity(2 * half_rings as usize + 2);
    for r in 0..=half_rings {
        let phi = FRAC_PI_2 * r as f32 / half_rings as f32;
        let radius = if r == 0 { 0.0 } else { 0.5 * phi.sin() };
        profile.push((radius, 0.5 + 0.5 * phi.cos()));
    }
    for r in 0..=half_rings {
        let phi = FRAC_PI_2 + FRAC_PI_2 * r as f32 / half_rings as f32;
        let radius = if r == half_rings { 0.0 } else { 0.5 * phi.sin() };
        profile.push((radius, -0.5 + 0.5 * phi.cos()));
    }
    lathe(&profile, segments)
}

/// Square pyramid with a unit base and unit height
pub fn pyramid() -> MeshData {
    let base = [
        Vec3::new(-0.5, -0.5, -0.5),
        Vec3::new(0.5, -0.5, -0.5),
        Vec3::new(0.5, -0.5, 0.5),
        Vec3::new(-0.5, -0.5, 0.5),
    ];
    let apex = Vec3::new(0.0, 0.5, 0.0);

    let mut builder = MeshBuilder::default();
    let b: Vec<u32> = base
        .iter()
        .map(|p| builder.vertex(*p, [p.x + 0.5, p.z + 0.5]))
        .collect();
    builder.quad(b[0], b[1], b[2], b[3]);

    for i in 0..4 {
        let j = (i + 1) % 4;
        let p = builder.vertex(base[i], [0.0, 0.0]);
        let top = builder.vertex(apex, [0.5, 1.0]);
        let q = builder.vertex(base[j], [1.0, 0.0]);
        builder.triangle(p, top, q);
    }
    builder.build()
}

/// Triangular prism: a unit triangle in XY extruded along Z
pub fn triangular_prism() -> MeshData {
    let profile = [
        Vec3::new(-0.5, -0.5, 0.0),
        Vec3::new(0.5, -0.5, 0.0),
        Vec3::new(0.0, 0.5, 0.0),
    ];
    let front = Vec3::new(0.0, 0.0, 0.5);

    let mut builder = MeshBuilder::default();
    let f: Vec<u32> = profile
        .iter()
        .map(|p| builder.vertex(*p + front, [p.x + 0.5, p.y + 0.5]))
        .collect();
    builder.triangle(f[0], f[1], f[2]);
    let b: Vec<u32> = profile
        .iter()
        .map(|p| builder.vertex(*p - front, [p.x + 0.5, p.y + 0.5]))
        .collect();
    builder.triangle(b[0], b[2], b[1]);

    for i in 0..3 {
        let j = (i + 1) % 3;
        let a = builder.vertex(profile[i] - front, [0.0, 0.0]);
        let b = builder.vertex(profile[j] - front, [1.0, 0.0]);
        let c = builder.vertex(profile[j] + front, [1.0, 1.0]);
        let d = builder.vertex(profile[i] + front, [0.0, 1.0]);
        builder.quad(a, b, c, d);
    }
    builder.build()
}
