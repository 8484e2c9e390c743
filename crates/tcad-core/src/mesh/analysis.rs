//! Mesh analysis: welding, volume, closure and connectivity

use std::collections::HashMap;

use super::MeshData;

/// Precision for vertex comparison (multiply by this, then round to int)
const PRECISION: f32 = 100_000.0;

/// Merge vertices that coincide after quantization
///
/// Returns the unique positions and the remapped index buffer.
pub fn weld_vertices(mesh: &MeshData) -> (Vec<[f32; 3]>, Vec<u32>) {
    let mut unique_vertices: Vec<[f32; 3]> = Vec::new();
    let mut vertex_map: HashMap<[i64; 3], u32> = HashMap::new();
    let mut remap: Vec<u32> = Vec::with_capacity(mesh.vertices.len());

    for v in &mesh.vertices {
        let key = [
            (v[0] * PRECISION).round() as i64,
            (v[1] * PRECISION).round() as i64,
            (v[2] * PRECISION).round() as i64,
        ];
        let index = *vertex_map.entry(key).or_insert_with(|| {
            unique_vertices.push(*v);
            (unique_vertices.len() - 1) as u32
        });
        remap.push(index);
    }

    let indices = mesh
        .indices
        .iter()
        .filter_map(|&i| remap.get(i as usize).copied())
        .collect();
    (unique_vertices, indices)
}

/// Signed volume enclosed by the mesh (positive for outward winding)
pub fn signed_volume(mesh: &MeshData) -> f64 {
    mesh.triangles()
        .map(|[a, b, c]| {
            let (a, b, c) = (a.as_dvec3(), b.as_dvec3(), c.as_dvec3());
            a.dot(b.cross(c)) / 6.0
        })
        .sum()
}

/// Check that every edge is shared by exactly two triangles after welding
pub fn is_closed(mesh: &MeshData) -> bool {
    let (_, indices) = weld_vertices(mesh);
    if indices.is_empty() {
        return false;
    }

    let mut edges: HashMap<(u32, u32), i32> = HashMap::new();
    for tri in indices.chunks_exact(3) {
        if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
            continue;
        }
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            *edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
        }
    }
    edges.values().all(|&count| count == 2)
}

/// Split a mesh into its vertex-connected components
pub fn connected_components(mesh: &MeshData) -> Vec<MeshData> {
    let (vertices, indices) = weld_vertices(mesh);

    let mut parent: Vec<usize> = (0..vertices.len()).collect();
    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for tri in indices.chunks_exact(3) {
        let root = find(&mut parent, tri[0] as usize);
        for &i in &tri[1..] {
            let other = find(&mut parent, i as usize);
            parent[other] = root;
        }
    }

    let mut component_of_root: HashMap<usize, usize> = HashMap::new();
    let mut components: Vec<(Vec<[f32; 3]>, Vec<u32>, HashMap<u32, u32>)> = Vec::new();
    for tri in indices.chunks_exact(3) {
        let root = find(&mut parent, tri[0] as usize);
        let slot = *component_of_root.entry(root).or_insert_with(|| {
            components.push((Vec::new(), Vec::new(), HashMap::new()));
            components.len() - 1
        });
        let (verts, idx, local) = &mut components[slot];
        for &i in tri {
            let mapped = *local.entry(i).or_insert_with(|| {
                verts.push(vertices[i as usize]);
                (verts.len() - 1) as u32
            });
            idx.push(mapped);
        }
    }

    components
        .into_iter()
        .map(|(verts, idx, _)| MeshData::from_triangles(verts, idx))
        .collect()
}
