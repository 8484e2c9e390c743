//! Convex polygons, splitting planes and mesh conversion

use std::collections::HashMap;

use glam::DVec3;
use tcad_core::MeshData;

/// Distance below which a point counts as lying on a plane
pub const EPSILON: f64 = 1e-5;

/// Plane with `dot(normal, p) == w`; the front side is where the normal points
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub normal: DVec3,
    pub w: f64,
}

impl Plane {
    /// Plane through three points, None if they are collinear
    pub fn from_points(a: DVec3, b: DVec3, c: DVec3) -> Option<Self> {
        let n = (b - a).cross(c - a);
        let len = n.length();
        if len <= f64::EPSILON {
            return None;
        }
        let normal = n / len;
        Some(Self {
            normal,
            w: normal.dot(a),
        })
    }

    pub fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    fn distance(&self, p: DVec3) -> f64 {
        self.normal.dot(p) - self.w
    }
}

/// Convex polygon with its supporting plane
#[derive(Debug, Clone)]
pub struct Polygon {
    pub vertices: Vec<DVec3>,
    pub plane: Plane,
}

impl Polygon {
    /// Build from counter-clockwise vertices, None if degenerate
    pub fn new(vertices: Vec<DVec3>) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }
        let plane = Plane::from_points(vertices[0], vertices[1], vertices[2])?;
        Some(Self { vertices, plane })
    }

    fn with_plane(vertices: Vec<DVec3>, plane: Plane) -> Self {
        Self { vertices, plane }
    }

    /// Reverse winding and plane orientation
    pub fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }
}

/// Where a polygon ended up relative to a plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    CoplanarFront,
    CoplanarBack,
    Front,
    Back,
    Spanning,
}

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

/// Output buckets for [`split_polygon`]
#[derive(Default)]
pub struct SplitBuckets {
    pub coplanar_front: Vec<Polygon>,
    pub coplanar_back: Vec<Polygon>,
    pub front: Vec<Polygon>,
    pub back: Vec<Polygon>,
}

/// Classify a polygon against a plane, splitting it if it spans the plane
///
/// Coplanar polygons are bucketed by whether they face the same way as the
/// plane.
pub fn split_polygon(plane: &Plane, polygon: Polygon, out: &mut SplitBuckets) -> Side {
    let mut polygon_type = COPLANAR;
    let types: Vec<u8> = polygon
        .vertices
        .iter()
        .map(|v| {
            let t = plane.distance(*v);
            let ty = if t < -EPSILON {
                BACK
            } else if t > EPSILON {
                FRONT
            } else {
                COPLANAR
            };
            polygon_type |= ty;
            ty
        })
        .collect();

    match polygon_type {
        COPLANAR => {
            if plane.normal.dot(polygon.plane.normal) > 0.0 {
                out.coplanar_front.push(polygon);
                Side::CoplanarFront
            } else {
                out.coplanar_back.push(polygon);
                Side::CoplanarBack
            }
        }
        FRONT => {
            out.front.push(polygon);
            Side::Front
        }
        BACK => {
            out.back.push(polygon);
            Side::Back
        }
        _ => {
            let n = polygon.vertices.len();
            let mut f = Vec::with_capacity(n + 1);
            let mut b = Vec::with_capacity(n + 1);
            for i in 0..n {
                let j = (i + 1) % n;
                let (ti, tj) = (types[i], types[j]);
                let (vi, vj) = (polygon.vertices[i], polygon.vertices[j]);
                if ti != BACK {
                    f.push(vi);
                }
                if ti != FRONT {
                    b.push(vi);
                }
                if ti | tj == SPANNING {
                    let t = (plane.w - plane.normal.dot(vi)) / plane.normal.dot(vj - vi);
                    let v = vi.lerp(vj, t);
                    f.push(v);
                    b.push(v);
                }
            }
            if f.len() >= 3 {
                out.front.push(Polygon::with_plane(f, polygon.plane));
            }
            if b.len() >= 3 {
                out.back.push(Polygon::with_plane(b, polygon.plane));
            }
            Side::Spanning
        }
    }
}

/// Convert mesh triangles into polygons, dropping degenerate triangles
pub fn mesh_to_polygons(mesh: &MeshData) -> Vec<Polygon> {
    mesh.triangles()
        .filter_map(|[a, b, c]| Polygon::new(vec![a.as_dvec3(), b.as_dvec3(), c.as_dvec3()]))
        .collect()
}

/// Fan-triangulate polygons into an indexed mesh with welded vertices
pub fn polygons_to_mesh(polygons: &[Polygon]) -> MeshData {
    // Precision for vertex comparison (multiply by this, then round to int)
    const PRECISION: f64 = 1e7;

    let mut vertices: Vec<[f32; 3]> = Vec::new();
    let mut vertex_map: HashMap<[i64; 3], u32> = HashMap::new();
    let mut indices: Vec<u32> = Vec::new();

    let mut index_of = |v: DVec3| -> u32 {
        let key = [
            (v.x * PRECISION).round() as i64,
            (v.y * PRECISION).round() as i64,
            (v.z * PRECISION).round() as i64,
        ];
        *vertex_map.entry(key).or_insert_with(|| {
            vertices.push(v.as_vec3().to_array());
            (vertices.len() - 1) as u32
        })
    };

    for polygon in polygons {
        let ids: Vec<u32> = polygon.vertices.iter().map(|v| index_of(*v)).collect();
        for k in 1..ids.len().saturating_sub(1) {
            let tri = [ids[0], ids[k], ids[k + 1]];
            if tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2] {
                indices.extend_from_slice(&tri);
            }
        }
    }

    MeshData::from_triangles(vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Polygon {
        Polygon::new(vec![
            DVec3::new(-1.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_degenerate_polygon_rejected() {
        let collinear = vec![DVec3::ZERO, DVec3::X, DVec3::X * 2.0];
        assert!(Polygon::new(collinear).is_none());
    }

    #[test]
    fn test_split_spanning() {
        let plane = Plane {
            normal: DVec3::X,
            w: 0.0,
        };
        let mut out = SplitBuckets::default();
        assert_eq!(split_polygon(&plane, unit_triangle(), &mut out), Side::Spanning);
        assert_eq!(out.front.len(), 1);
        assert_eq!(out.back.len(), 1);
        // Each half keeps the apex and gains the split point on the base
        assert_eq!(out.front[0].vertices.len(), 3);
        assert!(out.front[0].vertices.iter().all(|v| v.x >= -EPSILON));
        assert!(out.back[0].vertices.iter().all(|v| v.x <= EPSILON));
    }

    #[test]
    fn test_coplanar_bucket_follows_facing() {
        let mut plane = Plane {
            normal: DVec3::Z,
            w: 0.0,
        };
        let mut out = SplitBuckets::default();
        assert_eq!(split_polygon(&plane, unit_triangle(), &mut out), Side::CoplanarFront);
        plane.flip();
        assert_eq!(split_polygon(&plane, unit_triangle(), &mut out), Side::CoplanarBack);
    }

    #[test]
    fn test_polygons_to_mesh_welds() {
        let quad = Polygon::new(vec![
            DVec3::ZERO,
            DVec3::X,
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::Y,
        ])
        .unwrap();
        let mesh = polygons_to_mesh(&[quad]);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
    }
}
