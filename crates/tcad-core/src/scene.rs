//! Scene object store

use std::collections::HashSet;

use glam::Vec3;
use uuid::Uuid;

use crate::config::CreationConfig;
use crate::mesh::{MeshData, MeshError};
use crate::object::{Classification, ObjectKind, SceneObject, Transform};

/// Scene errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum SceneError {
    #[error("Object not found: {0}")]
    NotFound(Uuid),
    #[error("Object {0} is locked by a pending merge")]
    Locked(Uuid),
    #[error("Cannot generate a mesh for {0}")]
    NotAPrimitive(ObjectKind),
    #[error("Object {0} has a non-invertible transform")]
    SingularTransform(Uuid),
    #[error("Vertex count mismatch: expected {expected}, got {actual}")]
    VertexCountMismatch { expected: usize, actual: usize },
    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),
}

/// Ordered store of scene objects
///
/// Objects keep their creation order. Objects captured by an in-flight merge
/// are locked and refuse mutation until released.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
    locked: HashSet<Uuid>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object, returning its id
    pub fn add(&mut self, object: SceneObject) -> Uuid {
        let id = object.id;
        tracing::debug!("Adding {} object {}", object.kind, id);
        self.objects.push(object);
        id
    }

    /// Create a primitive with the configured creation scale
    pub fn add_primitive(
        &mut self,
        kind: ObjectKind,
        position: Vec3,
        classification: Classification,
        config: &CreationConfig,
    ) -> Result<Uuid, SceneError> {
        let object = SceneObject::primitive(kind, position, config)
            .ok_or(SceneError::NotAPrimitive(kind))?
            .with_classification(classification);
        Ok(self.add(object))
    }

    /// Add the printer build volume as a box
    pub fn add_printer(&mut self, position: Vec3, build_volume: Vec3) -> Uuid {
        let mut object = SceneObject::new(ObjectKind::Printer, crate::mesh::primitives::cube());
        object.transform = Transform {
            position,
            scale: build_volume,
            ..Default::default()
        };
        self.add(object)
    }

    /// Add a custom mesh object
    pub fn add_custom(
        &mut self,
        mesh: MeshData,
        transform: Transform,
        classification: Classification,
    ) -> Result<Uuid, SceneError> {
        mesh.validate()?;
        let object = SceneObject::new(ObjectKind::Custom, mesh)
            .with_transform(transform)
            .with_classification(classification);
        Ok(self.add(object))
    }

    pub fn get(&self, id: Uuid) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Get an object, failing if it is absent
    pub fn require(&self, id: Uuid) -> Result<&SceneObject, SceneError> {
        self.get(id).ok_or(SceneError::NotFound(id))
    }

    /// Get a mutable object, failing if it is absent or locked
    pub fn get_mut(&mut self, id: Uuid) -> Result<&mut SceneObject, SceneError> {
        if self.locked.contains(&id) {
            return Err(SceneError::Locked(id));
        }
        self.objects
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(SceneError::NotFound(id))
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.get(id).is_some()
    }

    /// Remove an object
    pub fn remove(&mut self, id: Uuid) -> Result<SceneObject, SceneError> {
        if self.locked.contains(&id) {
            return Err(SceneError::Locked(id));
        }
        let index = self
            .objects
            .iter()
            .position(|o| o.id == id)
            .ok_or(SceneError::NotFound(id))?;
        Ok(self.objects.remove(index))
    }

    /// Copy an object, shifted by `offset`
    pub fn duplicate(&mut self, id: Uuid, offset: Vec3) -> Result<Uuid, SceneError> {
        let mut copy = self.require(id)?.clone();
        copy.id = Uuid::new_v4();
        copy.transform.position += offset;
        Ok(self.add(copy))
    }

    /// Remove every unlocked object
    pub fn clear(&mut self) {
        let locked = &self.locked;
        self.objects.retain(|o| locked.contains(&o.id));
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// The printer object, if the scene has one
    pub fn printer(&self) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.is_printer())
    }

    /// Mark objects as held by an in-flight merge
    pub fn lock(&mut self, ids: &[Uuid]) {
        self.locked.extend(ids.iter().copied());
    }

    pub fn unlock(&mut self, ids: &[Uuid]) {
        for id in ids {
            self.locked.remove(id);
        }
    }

    pub fn is_locked(&self, id: Uuid) -> bool {
        self.locked.contains(&id)
    }

    /// Replace a set of objects with a single new object in one step
    ///
    /// The replaced objects are unlocked and removed; the new object takes
    /// the position of the first replaced one in creation order.
    pub fn swap_in(&mut self, replaced: &[Uuid], object: SceneObject) -> Uuid {
        self.unlock(replaced);
        let insert_at = self
            .objects
            .iter()
            .position(|o| replaced.contains(&o.id))
            .unwrap_or(self.objects.len());
        self.objects.retain(|o| !replaced.contains(&o.id));
        let id = object.id;
        let insert_at = insert_at.min(self.objects.len());
        self.objects.insert(insert_at, object);
        id
    }
}
