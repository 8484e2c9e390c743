//! Combine and print actions
//!
//! Both actions feed the world-space meshes of scene objects through the
//! [`MeshMerger`]. Combine replaces the selection with the merged object;
//! print produces the STL text handed to the slicer.

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use tcad_core::{
    Classification, ExportConfig, MeshData, ObjectKind, Scene, SceneObject, Transform,
    write_ascii_stl,
};
use tcad_csg::{BooleanKernel, CancelToken, MergeInput, MergeTask, MeshMerger};
use uuid::Uuid;

use crate::error::{ManipError, ManipResult};
use crate::selection::SelectionSet;
use crate::session::ManipulationSession;

/// World meshes of `ids` with their polarity, in order
fn merge_inputs(scene: &Scene, ids: &[Uuid]) -> ManipResult<Vec<MergeInput>> {
    ids.iter()
        .map(|&id| {
            let object = scene.get(id).ok_or(ManipError::MissingObject(id))?;
            Ok(MergeInput {
                mesh: object.world_mesh(),
                polarity: object.classification.polarity,
            })
        })
        .collect()
}

fn can_combine(session: &ManipulationSession) -> bool {
    let selection = session.selection();
    if session.is_grabbing() {
        tracing::warn!("Combine refused while a handle is grabbed");
        return false;
    }
    if selection.is_empty() {
        tracing::debug!("Nothing selected to combine");
        return false;
    }
    if selection.has_printer() {
        tracing::warn!("The printer cannot be combined");
        return false;
    }
    true
}

fn all_reference(scene: &Scene, ids: &[Uuid]) -> bool {
    ids.iter()
        .filter_map(|id| scene.get(*id))
        .all(|o| o.classification.is_reference())
}

/// Build the object that replaces a combined selection
///
/// The mesh is re-centred on its bounds so the object's position sits at
/// the middle of the merged geometry.
fn merged_object(mut mesh: MeshData, reference: bool) -> SceneObject {
    let center = mesh
        .bounds()
        .map_or(Vec3::ZERO, |(min, max)| (min + max) * 0.5);
    mesh.translate(-center);
    SceneObject::new(ObjectKind::Custom, mesh)
        .with_transform(Transform::from_position(center))
        .with_classification(Classification::from_flags(false, reference))
}

fn install_result(
    scene: &mut Scene,
    session: &mut ManipulationSession,
    ids: &[Uuid],
    mesh: MeshData,
    reference: bool,
) -> ManipResult<Uuid> {
    let triangles = mesh.triangle_count();
    let id = scene.swap_in(ids, merged_object(mesh, reference));
    tracing::info!("Combined {} objects into {} ({} triangles)", ids.len(), id, triangles);
    if session.is_grabbing() {
        session.sync_selection(scene)?;
    } else {
        session.reselect(scene, &[id])?;
    }
    Ok(id)
}

/// Merge the selection into one object on the calling thread
///
/// Returns None when there is nothing to combine. On failure the scene is
/// left unchanged.
pub fn combine<K: BooleanKernel>(
    scene: &mut Scene,
    session: &mut ManipulationSession,
    merger: &MeshMerger<K>,
) -> ManipResult<Option<Uuid>> {
    if !can_combine(session) {
        return Ok(None);
    }
    let ids = session.selection().ids();
    let inputs = merge_inputs(scene, &ids)?;
    let reference = all_reference(scene, &ids);
    let mesh = merger.merge(&inputs, &CancelToken::new())?;
    install_result(scene, session, &ids, mesh, reference).map(Some)
}

/// A combine running on a worker thread
///
/// The merged objects stay locked until [`PendingCombine::finish`] or
/// [`PendingCombine::abandon`]; dropping the handle cancels the merge but
/// leaves them locked.
#[must_use = "the combined objects stay locked until finish or abandon"]
pub struct PendingCombine {
    task: MergeTask,
    ids: Vec<Uuid>,
    reference: bool,
}

impl PendingCombine {
    /// Objects held by this combine
    pub fn ids(&self) -> &[Uuid] {
        &self.ids
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn cancel(&self) {
        self.task.cancel();
    }

    /// Wait for the merge and swap the result into the scene
    ///
    /// A failed or cancelled merge unlocks the objects and leaves them as
    /// they were.
    pub fn finish(self, scene: &mut Scene, session: &mut ManipulationSession) -> ManipResult<Uuid> {
        let Self {
            task,
            ids,
            reference,
        } = self;
        match task.wait() {
            Ok(mesh) => install_result(scene, session, &ids, mesh, reference),
            Err(e) => {
                tracing::warn!("Combine of {} objects failed: {}", ids.len(), e);
                scene.unlock(&ids);
                Err(e.into())
            }
        }
    }

    /// Cancel the merge and release the objects unchanged
    pub fn abandon(self, scene: &mut Scene) {
        self.task.cancel();
        scene.unlock(&self.ids);
        tracing::info!("Abandoned combine of {} objects", self.ids.len());
    }
}

/// Snapshot the selection and start merging it off the interactive thread
pub fn begin_combine<K>(
    scene: &mut Scene,
    session: &ManipulationSession,
    merger: Arc<MeshMerger<K>>,
) -> ManipResult<Option<PendingCombine>>
where
    K: BooleanKernel + 'static,
{
    if !can_combine(session) {
        return Ok(None);
    }
    let ids = session.selection().ids();
    if let Some(locked) = ids.iter().find(|id| scene.is_locked(**id)) {
        tracing::warn!("Object {} is already held by a merge", locked);
        return Ok(None);
    }
    let inputs = merge_inputs(scene, &ids)?;
    let reference = all_reference(scene, &ids);

    scene.lock(&ids);
    let task = match MergeTask::spawn(merger, inputs) {
        Ok(task) => task,
        Err(e) => {
            scene.unlock(&ids);
            return Err(e.into());
        }
    };
    tracing::info!("Started combine of {} objects", ids.len());
    Ok(Some(PendingCombine {
        task,
        ids,
        reference,
    }))
}

/// Merged print model
#[derive(Debug, Clone)]
pub struct PrintJob {
    /// ASCII STL in output units
    pub stl: String,
    /// Mesh after export conversion
    pub mesh: MeshData,
    /// Model size in scene units
    pub size: Vec3,
}

/// Merge the printable objects and convert them for the slicer
///
/// Printable objects are the selected ones, or every object when nothing
/// printable is selected; printers and reference objects never print.
pub fn prepare_print<K: BooleanKernel>(
    scene: &Scene,
    selection: &SelectionSet,
    merger: &MeshMerger<K>,
    export: &ExportConfig,
) -> ManipResult<PrintJob> {
    let printable = |o: &SceneObject| !o.is_printer() && !o.classification.is_reference();
    let mut ids = Vec::new();
    for id in selection.ids() {
        let object = scene.get(id).ok_or(ManipError::MissingObject(id))?;
        if printable(object) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        ids = scene.iter().filter(|o| printable(o)).map(|o| o.id).collect();
    }
    if ids.is_empty() {
        return Err(ManipError::NothingToPrint);
    }

    let inputs = merge_inputs(scene, &ids)?;
    let merged = merger.merge(&inputs, &CancelToken::new())?;
    let Some((min, max)) = merged.bounds().filter(|_| merged.triangle_count() > 0) else {
        return Err(ManipError::NothingToPrint);
    };
    let size = max - min;

    if let Some(printer) = scene.printer() {
        if let Some((pmin, pmax)) = printer.world_mesh().bounds() {
            let build_volume = pmax - pmin;
            if size.cmpgt(build_volume).any() {
                tracing::warn!("Model {} exceeds printer volume {}", size, build_volume);
                return Err(ManipError::TooLargeForPrinter { size, build_volume });
            }
        }
    }

    let mesh = export_mesh(&merged, export);
    let stl = write_ascii_stl(&export.solid_name, &mesh);
    tracing::info!(
        "Prepared print of {} objects: {} triangles, {} bytes of STL",
        ids.len(),
        mesh.triangle_count(),
        stl.len()
    );
    Ok(PrintJob { stl, mesh, size })
}

/// Convert a world-space mesh into printer coordinates
pub fn export_mesh(mesh: &MeshData, export: &ExportConfig) -> MeshData {
    let mut transform = Mat4::from_scale(Vec3::splat(export.unit_scale));
    if export.z_up {
        transform = Mat4::from_rotation_x(FRAC_PI_2) * transform;
    }
    let mut out = mesh.transformed(&transform);
    if export.drop_to_bed {
        if let Some((min, _)) = out.bounds() {
            let up = if export.z_up { Vec3::Z } else { Vec3::Y };
            out.translate(-up * min.dot(up));
        }
    }
    out
}
