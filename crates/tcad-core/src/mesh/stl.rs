//! STL reading and ASCII STL writing

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::{BufReader, Cursor};
use std::path::Path;

use glam::Vec3;

use super::{MeshData, triangle_normal};

/// Load an STL file (ASCII or binary) as an indexed mesh
pub fn load_stl(path: impl AsRef<Path>) -> Result<MeshData, StlError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| StlError::Io(e.to_string()))?;
    let mut reader = BufReader::new(file);

    let mesh = stl_io::read_stl(&mut reader).map_err(|e| StlError::Parse(e.to_string()))?;
    tracing::info!(
        "Loaded STL {:?} ({} triangles)",
        path,
        mesh.faces.len()
    );
    Ok(index_mesh(&mesh))
}

/// Load STL data from an in-memory buffer
pub fn load_stl_from_bytes(bytes: &[u8]) -> Result<MeshData, StlError> {
    let mut cursor = Cursor::new(bytes);
    let mesh = stl_io::read_stl(&mut cursor).map_err(|e| StlError::Parse(e.to_string()))?;
    Ok(index_mesh(&mesh))
}

/// Convert triangle soup to indexed mesh
fn index_mesh(mesh: &stl_io::IndexedMesh) -> MeshData {
    let mut unique_vertices: Vec<[f32; 3]> = Vec::new();
    let mut vertex_map: HashMap<[i32; 3], u32> = HashMap::new();
    let mut indices: Vec<u32> = Vec::new();

    // Precision for vertex comparison (multiply by this, then round to int)
    const PRECISION: f32 = 10000.0;

    for face in &mesh.faces {
        for &vertex_idx in &face.vertices {
            let vertex = mesh.vertices[vertex_idx];
            let v = [vertex[0], vertex[1], vertex[2]];

            let key = [
                (v[0] * PRECISION).round() as i32,
                (v[1] * PRECISION).round() as i32,
                (v[2] * PRECISION).round() as i32,
            ];

            let index = *vertex_map.entry(key).or_insert_with(|| {
                unique_vertices.push(v);
                (unique_vertices.len() - 1) as u32
            });
            indices.push(index);
        }
    }

    MeshData::from_triangles(unique_vertices, indices)
}

/// Render a mesh as ASCII STL text
///
/// Facet normals are recomputed from the winding of each triangle.
pub fn write_ascii_stl(name: &str, mesh: &MeshData) -> String {
    let mut out = String::with_capacity(64 + mesh.triangle_count() * 256);
    let _ = writeln!(out, "solid {name}");
    for [v1, v2, v3] in mesh.triangles() {
        let n = triangle_normal(v1, v2, v3);
        let _ = writeln!(out, "facet normal {} {} {}", n.x, n.y, n.z);
        let _ = writeln!(out, "outer loop");
        for v in [v1, v2, v3] {
            write_vertex(&mut out, v);
        }
        let _ = writeln!(out, "endloop");
        let _ = writeln!(out, "endfacet");
    }
    let _ = writeln!(out, "endsolid {name}");
    out
}

fn write_vertex(out: &mut String, v: Vec3) {
    let _ = writeln!(out, "vertex {} {} {}", v.x, v.y, v.z);
}

/// Write a mesh as an ASCII STL file
pub fn save_ascii_stl(name: &str, mesh: &MeshData, path: impl AsRef<Path>) -> Result<(), StlError> {
    let path = path.as_ref();
    std::fs::write(path, write_ascii_stl(name, mesh)).map_err(|e| StlError::Write(e.to_string()))?;
    tracing::info!("Exported {} triangles to {:?}", mesh.triangle_count(), path);
    Ok(())
}

/// STL-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum StlError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Write error: {0}")]
    Write(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::primitives::cube;

    #[test]
    fn test_ascii_layout() {
        let text = write_ascii_stl("part", &cube());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.first(), Some(&"solid part"));
        assert_eq!(lines.last(), Some(&"endsolid part"));
        // 7 lines per facet plus header and footer
        assert_eq!(lines.len(), 12 * 7 + 2);
        assert_eq!(text.matches("facet normal").count(), 12);
        assert_eq!(text.matches("outer loop").count(), 12);
        assert_eq!(text.matches("endfacet").count(), 12);
    }

    #[test]
    fn test_empty_mesh_has_header_and_footer() {
        let text = write_ascii_stl("empty", &MeshData::new());
        assert_eq!(text, "solid empty\nendsolid empty\n");
    }

    #[test]
    fn test_ascii_reads_back() {
        let text = write_ascii_stl("cube", &cube());
        let mesh = load_stl_from_bytes(text.as_bytes()).unwrap();
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.vertex_count(), 8);
    }

    #[test]
    fn test_facet_normals_point_outward() {
        let text = write_ascii_stl("cube", &cube());
        let first_normal: Vec<f32> = text
            .lines()
            .nth(1)
            .unwrap()
            .trim_start_matches("facet normal ")
            .split_whitespace()
            .map(|s| s.parse().unwrap())
            .collect();
        // First face of the cube is +X
        assert_eq!(first_normal, vec![1.0, 0.0, 0.0]);
    }
}
