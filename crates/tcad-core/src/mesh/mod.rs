//! Indexed triangle meshes

mod analysis;
pub mod primitives;
mod stl;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

pub use analysis::{connected_components, is_closed, signed_volume, weld_vertices};
pub use stl::{StlError, load_stl, load_stl_from_bytes, save_ascii_stl, write_ascii_stl};

/// Mesh validation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum MeshError {
    #[error("Index count {0} is not a multiple of 3")]
    InvalidIndexCount(usize),
    #[error("Index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("Attribute '{name}' has {len} entries, expected 0 or {expected}")]
    AttributeLength {
        name: &'static str,
        len: usize,
        expected: usize,
    },
}

/// Indexed triangle mesh with optional per-vertex attributes
///
/// Attribute buffers are either empty or have one entry per vertex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    /// Vertex positions
    pub vertices: Vec<[f32; 3]>,
    /// Triangle indices (3 per triangle, counter-clockwise seen from outside)
    pub indices: Vec<u32>,
    /// Per-vertex normals
    pub normals: Vec<[f32; 3]>,
    /// Primary texture coordinates
    pub uv0: Vec<[f32; 2]>,
    /// Secondary texture coordinates
    pub uv1: Vec<[f32; 2]>,
    /// Per-vertex RGBA colors
    pub colors: Vec<[f32; 4]>,
}

impl MeshData {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from positions and indices, computing normals
    pub fn from_triangles(vertices: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        let mut mesh = Self {
            vertices,
            indices,
            ..Default::default()
        };
        mesh.recalculate_normals();
        mesh
    }

    /// Check if the mesh has no triangles
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check index and attribute buffer consistency
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::InvalidIndexCount(self.indices.len()));
        }
        let vertex_count = self.vertices.len();
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }
        let attributes = [
            ("normals", self.normals.len()),
            ("uv0", self.uv0.len()),
            ("uv1", self.uv1.len()),
            ("colors", self.colors.len()),
        ];
        for (name, len) in attributes {
            if len != 0 && len != vertex_count {
                return Err(MeshError::AttributeLength {
                    name,
                    len,
                    expected: vertex_count,
                });
            }
        }
        Ok(())
    }

    /// Iterate triangles as position triples
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                Vec3::from(self.vertices[tri[0] as usize]),
                Vec3::from(self.vertices[tri[1] as usize]),
                Vec3::from(self.vertices[tri[2] as usize]),
            ]
        })
    }

    /// Axis-aligned bounds of the vertex positions
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self.vertices.iter().map(|v| Vec3::from(*v));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(min, max), v| (min.min(v), max.max(v))))
    }

    /// Recompute area-weighted per-vertex normals
    pub fn recalculate_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertices.len()];
        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            if a >= accum.len() || b >= accum.len() || c >= accum.len() {
                continue;
            }
            let v0 = Vec3::from(self.vertices[a]);
            let face = (Vec3::from(self.vertices[b]) - v0).cross(Vec3::from(self.vertices[c]) - v0);
            accum[a] += face;
            accum[b] += face;
            accum[c] += face;
        }
        self.normals = accum
            .into_iter()
            .map(|n| n.normalize_or_zero().to_array())
            .collect();
    }

    /// Apply a transform to positions and normals, returning a new mesh
    pub fn transformed(&self, transform: &Mat4) -> Self {
        let normal_mat = transform.inverse().transpose();
        // Mirroring transforms flip the winding
        let flip = transform.determinant() < 0.0;

        let mut mesh = self.clone();
        for v in &mut mesh.vertices {
            *v = transform.transform_point3(Vec3::from(*v)).to_array();
        }
        for n in &mut mesh.normals {
            *n = normal_mat
                .transform_vector3(Vec3::from(*n))
                .normalize_or_zero()
                .to_array();
        }
        if flip {
            for tri in mesh.indices.chunks_exact_mut(3) {
                tri.swap(1, 2);
            }
        }
        mesh
    }

    /// Move every vertex by an offset
    pub fn translate(&mut self, offset: Vec3) {
        for v in &mut self.vertices {
            *v = (Vec3::from(*v) + offset).to_array();
        }
    }
}

/// Calculate the unit normal of a triangle, or +Z for degenerate input
pub fn triangle_normal(v0: Vec3, v1: Vec3, v2: Vec3) -> Vec3 {
    let n = (v1 - v0).cross(v2 - v0);
    if n.length_squared() > 0.0 {
        n.normalize()
    } else {
        Vec3::Z
    }
}
