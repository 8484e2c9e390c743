//! Project file: the persisted list of scene object records

use std::path::Path;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::CreationConfig;
use crate::mesh::{MeshData, MeshError};
use crate::object::{Classification, ObjectKind, SceneObject, Transform};
use crate::scene::Scene;

/// Project errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
    #[error("Unknown object type '{0}'")]
    UnknownType(String),
    #[error("Custom object has no mesh data")]
    MissingMesh,
    #[error("Malformed mesh buffer '{0}'")]
    MalformedBuffer(&'static str),
    #[error("Invalid mesh: {0}")]
    Mesh(#[from] MeshError),
}

/// Flattened mesh buffers of a custom object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshRecord {
    pub vertices: Vec<f32>,
    pub triangles: Vec<u32>,
    #[serde(default)]
    pub uv: Vec<f32>,
    #[serde(default)]
    pub uv2: Vec<f32>,
    #[serde(default)]
    pub normals: Vec<f32>,
    #[serde(default)]
    pub colors: Vec<f32>,
}

impl MeshRecord {
    pub fn from_mesh(mesh: &MeshData) -> Self {
        Self {
            vertices: bytemuck::cast_slice(&mesh.vertices).to_vec(),
            triangles: mesh.indices.clone(),
            uv: bytemuck::cast_slice(&mesh.uv0).to_vec(),
            uv2: bytemuck::cast_slice(&mesh.uv1).to_vec(),
            normals: bytemuck::cast_slice(&mesh.normals).to_vec(),
            colors: bytemuck::cast_slice(&mesh.colors).to_vec(),
        }
    }

    pub fn to_mesh(&self) -> Result<MeshData, ProjectError> {
        let mesh = MeshData {
            vertices: unflatten(&self.vertices, "vertices")?,
            indices: self.triangles.clone(),
            normals: unflatten(&self.normals, "normals")?,
            uv0: unflatten(&self.uv, "uv")?,
            uv1: unflatten(&self.uv2, "uv2")?,
            colors: unflatten(&self.colors, "colors")?,
        };
        mesh.validate()?;
        Ok(mesh)
    }
}

fn unflatten<T: bytemuck::Pod>(data: &[f32], name: &'static str) -> Result<Vec<T>, ProjectError> {
    bytemuck::try_cast_slice::<f32, T>(data)
        .map(|s| s.to_vec())
        .map_err(|_| ProjectError::MalformedBuffer(name))
}

/// A persisted scene object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub type_tag: String,
    pub position: [f32; 3],
    /// Rotation quaternion (x, y, z, w)
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
    #[serde(default)]
    pub hole: bool,
    #[serde(default)]
    pub reference: bool,
    /// Full mesh for custom objects and reshaped primitives
    #[serde(default)]
    pub custom_mesh: Option<MeshRecord>,
}

impl ObjectRecord {
    pub fn from_object(object: &SceneObject) -> Self {
        let t = &object.transform;
        Self {
            type_tag: object.kind.type_tag().to_string(),
            position: t.position.to_array(),
            rotation: t.rotation.to_array(),
            scale: t.scale.to_array(),
            hole: object.classification.is_hole(),
            reference: object.classification.is_reference(),
            custom_mesh: (object.kind == ObjectKind::Custom || object.is_reshaped())
                .then(|| MeshRecord::from_mesh(&object.mesh)),
        }
    }

    /// Rebuild the scene object
    ///
    /// A stored mesh wins; otherwise primitive meshes are regenerated.
    pub fn to_object(&self, config: &CreationConfig) -> Result<SceneObject, ProjectError> {
        let kind = ObjectKind::from_type_tag(&self.type_tag)
            .ok_or_else(|| ProjectError::UnknownType(self.type_tag.clone()))?;

        let (mesh, reshaped) = match (&self.custom_mesh, kind.generate_mesh(config)) {
            (Some(record), generated) => (record.to_mesh()?, generated.is_some()),
            (None, Some(generated)) => (generated, false),
            (None, None) => return Err(ProjectError::MissingMesh),
        };

        let transform = Transform {
            position: Vec3::from(self.position),
            rotation: Quat::from_array(self.rotation),
            scale: Vec3::from(self.scale),
        };
        let mut object = SceneObject::new(kind, mesh)
            .with_transform(transform)
            .with_classification(Classification::from_flags(self.hole, self.reference));
        if reshaped {
            object.rebuild_collider();
        }
        Ok(object)
    }
}

/// Serializable project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub version: u32,
    pub objects: Vec<ObjectRecord>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            objects: Vec::new(),
        }
    }
}

impl Project {
    pub const CURRENT_VERSION: u32 = 1;

    /// Capture every object of a scene
    pub fn from_scene(scene: &Scene) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            objects: scene.iter().map(ObjectRecord::from_object).collect(),
        }
    }

    /// Rebuild a scene from the records
    pub fn to_scene(&self, config: &CreationConfig) -> Result<Scene, ProjectError> {
        let mut scene = Scene::new();
        for record in &self.objects {
            scene.add(record.to_object(config)?);
        }
        Ok(scene)
    }

    pub fn to_ron_string(&self) -> Result<String, ProjectError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ProjectError::Serialize(e.to_string()))
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ProjectError> {
        ron::from_str(text).map_err(|e| ProjectError::Deserialize(e.to_string()))
    }

    /// Save project to a RON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProjectError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_ron_string()?).map_err(|e| ProjectError::Io(e.to_string()))?;
        tracing::info!("Saved {} objects to {:?}", self.objects.len(), path);
        Ok(())
    }

    /// Load project from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ProjectError::Io(e.to_string()))?;
        let project = Self::from_ron_str(&text)?;
        tracing::info!("Loaded {} objects from {:?}", project.objects.len(), path);
        Ok(project)
    }
}
