//! BSP-tree boolean kernel
//!
//! Each operand is turned into a BSP tree of its boundary polygons. The trees
//! clip each other's polygons and the surviving fragments form the result:
//!
//! - **Union**: keep (A outside B) and (B outside A)
//! - **Subtract**: keep (A outside B) and (B inside A, reversed)
//! - **Intersect**: keep (A inside B) and (B inside A)
//!
//! Splitting along arbitrary planes yields more triangles than the inputs, and
//! coplanar faces shared by both operands are kept once.

mod node;
mod polygon;

use tcad_core::MeshData;

use crate::kernel::{BooleanKernel, BooleanOp, CsgResult};
use node::BspNode;
use polygon::{mesh_to_polygons, polygons_to_mesh};

/// Boolean kernel based on BSP-tree clipping
#[derive(Debug, Default, Clone, Copy)]
pub struct BspKernel;

impl BspKernel {
    pub fn new() -> Self {
        Self
    }
}

impl BooleanKernel for BspKernel {
    fn name(&self) -> &str {
        "bsp"
    }

    fn boolean(&self, a: &MeshData, b: &MeshData, op: BooleanOp) -> CsgResult<MeshData> {
        let pa = mesh_to_polygons(a);
        let pb = mesh_to_polygons(b);

        // Empty operands short-circuit
        match (op, pa.is_empty(), pb.is_empty()) {
            (_, true, true) => return Ok(MeshData::new()),
            (BooleanOp::Union, true, false) => return Ok(polygons_to_mesh(&pb)),
            (BooleanOp::Union | BooleanOp::Subtract, false, true) => {
                return Ok(polygons_to_mesh(&pa));
            }
            (BooleanOp::Subtract | BooleanOp::Intersect, true, false)
            | (BooleanOp::Intersect, false, true) => return Ok(MeshData::new()),
            _ => {}
        }

        let mut a = BspNode::new(pa);
        let mut b = BspNode::new(pb);

        let polygons = match op {
            BooleanOp::Union => {
                a.clip_to(&b);
                b.clip_to(&a);
                b.invert();
                b.clip_to(&a);
                b.invert();
                a.build(b.all_polygons());
                a.all_polygons()
            }
            BooleanOp::Subtract => {
                a.invert();
                a.clip_to(&b);
                b.clip_to(&a);
                b.invert();
                b.clip_to(&a);
                b.invert();
                a.build(b.all_polygons());
                a.invert();
                a.all_polygons()
            }
            BooleanOp::Intersect => {
                a.invert();
                b.clip_to(&a);
                b.invert();
                a.clip_to(&b);
                b.clip_to(&a);
                a.build(b.all_polygons());
                a.invert();
                a.all_polygons()
            }
        };

        let mesh = polygons_to_mesh(&polygons);
        tracing::trace!(
            "{:?}: {} polygons -> {} triangles",
            op,
            polygons.len(),
            mesh.triangle_count()
        );
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::Vec3;
    use tcad_core::mesh::primitives::{box_mesh, sphere_with_radius};
    use tcad_core::{connected_components, is_closed, signed_volume};

    use super::*;

    fn cube_at(center: Vec3, half: f32) -> MeshData {
        let mut mesh = box_mesh(Vec3::splat(half));
        mesh.translate(center);
        mesh
    }

    #[test]
    fn test_union_overlapping_cubes() {
        let a = cube_at(Vec3::ZERO, 1.0);
        let b = cube_at(Vec3::new(1.0, 0.0, 0.0), 1.0);
        let result = BspKernel.union(&a, &b).unwrap();
        // 2x2x2 and 2x2x2 overlapping by 1x2x2
        assert_relative_eq!(signed_volume(&result), 12.0, epsilon = 1e-4);
    }

    #[test]
    fn test_union_disjoint_cubes() {
        let a = cube_at(Vec3::ZERO, 1.0);
        let b = cube_at(Vec3::new(5.0, 0.0, 0.0), 1.0);
        let result = BspKernel.union(&a, &b).unwrap();
        let components = connected_components(&result);
        assert_eq!(components.len(), 2);
        for component in &components {
            assert!(is_closed(component));
            assert_relative_eq!(signed_volume(component), 8.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_subtract_overlapping_cubes() {
        let a = cube_at(Vec3::ZERO, 1.0);
        let b = cube_at(Vec3::new(1.0, 0.0, 0.0), 1.0);
        let result = BspKernel.subtract(&a, &b).unwrap();
        assert_relative_eq!(signed_volume(&result), 4.0, epsilon = 1e-4);
        let (_, max) = result.bounds().unwrap();
        assert_relative_eq!(max.x, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_intersect_overlapping_cubes() {
        let a = cube_at(Vec3::ZERO, 1.0);
        let b = cube_at(Vec3::new(1.0, 0.0, 0.0), 1.0);
        let result = BspKernel.intersect(&a, &b).unwrap();
        assert_relative_eq!(signed_volume(&result), 4.0, epsilon = 1e-4);
    }

    #[test]
    fn test_cube_minus_concentric_sphere() {
        let cube = cube_at(Vec3::ZERO, 1.0);
        let sphere = sphere_with_radius(1.5, 16, 8);
        let result = BspKernel.subtract(&cube, &sphere).unwrap();

        let volume = signed_volume(&result);
        assert!(volume > 0.0);
        assert!(volume < 8.0);
        // No surviving geometry lies inside the sphere's inscribed ball
        for v in &result.vertices {
            assert!(Vec3::from(*v).length() > 1.5 * 0.9);
        }
    }

    #[test]
    fn test_empty_operands() {
        let cube = cube_at(Vec3::ZERO, 1.0);
        let empty = MeshData::new();
        assert_eq!(BspKernel.union(&empty, &cube).unwrap().triangle_count(), 12);
        assert_eq!(BspKernel.subtract(&cube, &empty).unwrap().triangle_count(), 12);
        assert!(BspKernel.subtract(&empty, &cube).unwrap().is_empty());
        assert!(BspKernel.intersect(&cube, &empty).unwrap().is_empty());
        assert!(BspKernel.union(&empty, &empty).unwrap().is_empty());
    }
}
