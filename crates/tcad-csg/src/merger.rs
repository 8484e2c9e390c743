//! Mesh merger: union of all solids minus union of all holes

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tcad_core::{MeshData, Polarity};

use crate::bsp::BspKernel;
use crate::kernel::{BooleanKernel, CsgError, CsgResult};

/// Cooperative cancellation flag shared with a running merge
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn check(&self) -> CsgResult<()> {
        if self.is_cancelled() {
            Err(CsgError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// One world-space mesh submitted to a merge
#[derive(Debug, Clone)]
pub struct MergeInput {
    pub mesh: MeshData,
    pub polarity: Polarity,
}

impl MergeInput {
    pub fn solid(mesh: MeshData) -> Self {
        Self {
            mesh,
            polarity: Polarity::Solid,
        }
    }

    pub fn hole(mesh: MeshData) -> Self {
        Self {
            mesh,
            polarity: Polarity::Hole,
        }
    }
}

/// Combines classified meshes into one output mesh
///
/// Solids are unioned in input order, holes are unioned separately and then
/// subtracted. With no solids the result is an empty mesh.
pub struct MeshMerger<K: BooleanKernel = BspKernel> {
    kernel: K,
}

impl Default for MeshMerger<BspKernel> {
    fn default() -> Self {
        Self::new(BspKernel)
    }
}

impl<K: BooleanKernel> MeshMerger<K> {
    pub fn new(kernel: K) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Merge inputs, checking `cancel` between boolean steps
    pub fn merge(&self, inputs: &[MergeInput], cancel: &CancelToken) -> CsgResult<MeshData> {
        for (index, input) in inputs.iter().enumerate() {
            input
                .mesh
                .validate()
                .map_err(|source| CsgError::InvalidMesh { index, source })?;
        }

        let solids: Vec<&MeshData> = inputs
            .iter()
            .filter(|i| i.polarity == Polarity::Solid)
            .map(|i| &i.mesh)
            .collect();
        let holes: Vec<&MeshData> = inputs
            .iter()
            .filter(|i| i.polarity == Polarity::Hole)
            .map(|i| &i.mesh)
            .collect();

        tracing::info!(
            "Merging {} solids and {} holes with {} kernel",
            solids.len(),
            holes.len(),
            self.kernel.name()
        );

        if solids.is_empty() {
            tracing::debug!("No solids in merge, producing empty mesh");
            return Ok(MeshData::new());
        }

        let body = self.union_all(&solids, cancel)?;
        if holes.is_empty() {
            return Ok(body);
        }
        let cutter = self.union_all(&holes, cancel)?;
        cancel.check()?;
        let result = self.kernel.subtract(&body, &cutter)?;
        cancel.check()?;
        Ok(result)
    }

    fn union_all(&self, meshes: &[&MeshData], cancel: &CancelToken) -> CsgResult<MeshData> {
        let Some((first, rest)) = meshes.split_first() else {
            return Ok(MeshData::new());
        };
        let mut acc = (*first).clone();
        for mesh in rest {
            cancel.check()?;
            acc = self.kernel.union(&acc, mesh)?;
        }
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::Vec3;
    use tcad_core::mesh::primitives::{box_mesh, sphere_with_radius};
    use tcad_core::{connected_components, is_closed, signed_volume};

    use super::*;
    use crate::kernel::BooleanOp;

    fn cube_at(center: Vec3) -> MeshData {
        let mut mesh = box_mesh(Vec3::ONE);
        mesh.translate(center);
        mesh
    }

    #[test]
    fn test_empty_input_yields_empty_mesh() {
        let merged = MeshMerger::default().merge(&[], &CancelToken::new()).unwrap();
        assert!(merged.is_empty());
    }

    #[test]
    fn test_all_holes_yields_empty_mesh() {
        let inputs = [MergeInput::hole(cube_at(Vec3::ZERO))];
        let merged = MeshMerger::default()
            .merge(&inputs, &CancelToken::new())
            .unwrap();
        assert!(merged.is_empty());
        assert!(merged.validate().is_ok());
    }

    #[test]
    fn test_cube_with_sphere_hole() {
        let inputs = [
            MergeInput::solid(cube_at(Vec3::ZERO)),
            MergeInput::hole(sphere_with_radius(1.5, 16, 8)),
        ];
        let merged = MeshMerger::default()
            .merge(&inputs, &CancelToken::new())
            .unwrap();
        let volume = signed_volume(&merged);
        assert!(volume > 0.0 && volume < 8.0);
        for v in &merged.vertices {
            assert!(Vec3::from(*v).length() > 1.35);
        }
    }

    #[test]
    fn test_sphere_union_on_small_stack() {
        let mut offset = sphere_with_radius(1.0, 32, 16);
        offset.translate(Vec3::new(0.7, 0.1, 0.0));
        let inputs = vec![
            MergeInput::solid(sphere_with_radius(1.0, 32, 16)),
            MergeInput::solid(offset),
        ];
        let merged = std::thread::Builder::new()
            .stack_size(128 * 1024)
            .spawn(move || MeshMerger::default().merge(&inputs, &CancelToken::new()))
            .unwrap()
            .join()
            .unwrap()
            .unwrap();
        let volume = signed_volume(&merged);
        let single = 4.0 / 3.0 * std::f64::consts::PI;
        assert!(volume > single && volume < 2.0 * single);
    }

    #[test]
    fn test_disjoint_solids_stay_separate() {
        let inputs = [
            MergeInput::solid(cube_at(Vec3::ZERO)),
            MergeInput::solid(cube_at(Vec3::new(4.0, 0.0, 0.0))),
        ];
        let merged = MeshMerger::default()
            .merge(&inputs, &CancelToken::new())
            .unwrap();
        let components = connected_components(&merged);
        assert_eq!(components.len(), 2);
        for component in &components {
            assert!(is_closed(component));
            assert_relative_eq!(signed_volume(component), 8.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_solid_order_does_not_matter() {
        let a = cube_at(Vec3::ZERO);
        let b = cube_at(Vec3::new(1.0, 1.0, 0.0));
        let c = cube_at(Vec3::new(0.0, 1.0, 1.0));
        let merger = MeshMerger::default();
        let forward = merger
            .merge(
                &[
                    MergeInput::solid(a.clone()),
                    MergeInput::solid(b.clone()),
                    MergeInput::solid(c.clone()),
                ],
                &CancelToken::new(),
            )
            .unwrap();
        let backward = merger
            .merge(
                &[MergeInput::solid(c), MergeInput::solid(b), MergeInput::solid(a)],
                &CancelToken::new(),
            )
            .unwrap();
        assert_relative_eq!(signed_volume(&forward), signed_volume(&backward), epsilon = 1e-4);
        let (fmin, fmax) = forward.bounds().unwrap();
        let (bmin, bmax) = backward.bounds().unwrap();
        assert!(fmin.abs_diff_eq(bmin, 1e-5) && fmax.abs_diff_eq(bmax, 1e-5));
    }

    #[test]
    fn test_cancelled_merge_fails() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let inputs = [
            MergeInput::solid(cube_at(Vec3::ZERO)),
            MergeInput::solid(cube_at(Vec3::X)),
        ];
        assert!(matches!(
            MeshMerger::default().merge(&inputs, &cancel),
            Err(CsgError::Cancelled)
        ));
    }

    #[test]
    fn test_invalid_mesh_reports_index() {
        let mut broken = cube_at(Vec3::ZERO);
        broken.indices.push(0);
        let inputs = [MergeInput::solid(cube_at(Vec3::ZERO)), MergeInput::hole(broken)];
        assert!(matches!(
            MeshMerger::default().merge(&inputs, &CancelToken::new()),
            Err(CsgError::InvalidMesh { index: 1, .. })
        ));
    }

    /// Kernel that records the operations it is asked for
    struct RecordingKernel(parking_lot::Mutex<Vec<BooleanOp>>);

    impl BooleanKernel for RecordingKernel {
        fn name(&self) -> &str {
            "recording"
        }

        fn boolean(&self, a: &MeshData, _b: &MeshData, op: BooleanOp) -> CsgResult<MeshData> {
            self.0.lock().push(op);
            Ok(a.clone())
        }
    }

    #[test]
    fn test_holes_are_unioned_before_subtracting() {
        let merger = MeshMerger::new(RecordingKernel(Default::default()));
        let inputs = [
            MergeInput::hole(cube_at(Vec3::ZERO)),
            MergeInput::solid(cube_at(Vec3::ZERO)),
            MergeInput::hole(cube_at(Vec3::X)),
            MergeInput::solid(cube_at(Vec3::Y)),
        ];
        merger.merge(&inputs, &CancelToken::new()).unwrap();
        assert_eq!(
            *merger.kernel().0.lock(),
            vec![BooleanOp::Union, BooleanOp::Union, BooleanOp::Subtract]
        );
    }
}
