//! Scene objects: a mesh with a world transform and classification tags

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::CreationConfig;
use crate::mesh::{MeshData, primitives};

/// Object type, also used as the persisted type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Cube,
    Sphere,
    Cylinder,
    Capsule,
    TriangularPrism,
    Pyramid,
    Cone,
    /// Build volume of the target printer
    Printer,
    /// Imported or merged mesh
    Custom,
}

impl ObjectKind {
    /// All kinds that can be created from a generator
    pub const PRIMITIVES: [ObjectKind; 7] = [
        ObjectKind::Cube,
        ObjectKind::Sphere,
        ObjectKind::Cylinder,
        ObjectKind::Capsule,
        ObjectKind::TriangularPrism,
        ObjectKind::Pyramid,
        ObjectKind::Cone,
    ];

    /// Persisted type tag
    pub fn type_tag(&self) -> &'static str {
        match self {
            ObjectKind::Cube => "cube",
            ObjectKind::Sphere => "sphere",
            ObjectKind::Cylinder => "cylinder",
            ObjectKind::Capsule => "capsule",
            ObjectKind::TriangularPrism => "triangularprism",
            ObjectKind::Pyramid => "pyramid",
            ObjectKind::Cone => "cone",
            ObjectKind::Printer => "printer",
            ObjectKind::Custom => "custom",
        }
    }

    /// Parse a persisted type tag
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        match tag {
            "cube" => Some(ObjectKind::Cube),
            "sphere" => Some(ObjectKind::Sphere),
            "cylinder" => Some(ObjectKind::Cylinder),
            "capsule" => Some(ObjectKind::Capsule),
            "triangularprism" => Some(ObjectKind::TriangularPrism),
            "pyramid" => Some(ObjectKind::Pyramid),
            "cone" => Some(ObjectKind::Cone),
            "printer" => Some(ObjectKind::Printer),
            "custom" => Some(ObjectKind::Custom),
            _ => None,
        }
    }

    /// Generate the unit mesh for this kind (None for custom meshes)
    pub fn generate_mesh(&self, config: &CreationConfig) -> Option<MeshData> {
        let segments = config.segments;
        let rings = config.rings;
        match self {
            ObjectKind::Cube | ObjectKind::Printer => Some(primitives::cube()),
            ObjectKind::Sphere => Some(primitives::sphere(segments, rings)),
            ObjectKind::Cylinder => Some(primitives::cylinder(segments)),
            ObjectKind::Capsule => Some(primitives::capsule(segments, rings)),
            ObjectKind::TriangularPrism => Some(primitives::triangular_prism()),
            ObjectKind::Pyramid => Some(primitives::pyramid()),
            ObjectKind::Cone => Some(primitives::cone(segments)),
            ObjectKind::Custom => None,
        }
    }

    /// Scale given to a freshly created object of this kind
    pub fn creation_scale(&self, config: &CreationConfig) -> Vec3 {
        match self {
            ObjectKind::Cone => Vec3::new(
                config.default_scale,
                config.cone_height_scale,
                config.default_scale,
            ),
            _ => Vec3::splat(config.default_scale),
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_tag())
    }
}

/// Whether an object adds or removes material in a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Polarity {
    #[default]
    Solid,
    Hole,
}

/// Whether an object is printable or only a guide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Role {
    #[default]
    Normal,
    Reference,
}

/// Classification tags of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Classification {
    pub polarity: Polarity,
    pub role: Role,
}

impl Classification {
    pub const SOLID: Self = Self {
        polarity: Polarity::Solid,
        role: Role::Normal,
    };
    pub const HOLE: Self = Self {
        polarity: Polarity::Hole,
        role: Role::Normal,
    };

    /// Build a classification from the carving and reference toggles
    pub fn from_flags(hole: bool, reference: bool) -> Self {
        Self {
            polarity: if hole { Polarity::Hole } else { Polarity::Solid },
            role: if reference { Role::Reference } else { Role::Normal },
        }
    }

    pub fn is_hole(&self) -> bool {
        self.polarity == Polarity::Hole
    }

    pub fn is_reference(&self) -> bool {
        self.role == Role::Reference
    }
}

/// World transform with non-uniform scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Local-to-world matrix
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Check that the transform can be inverted
    pub fn is_invertible(&self) -> bool {
        self.scale.abs().min_element() > f32::EPSILON
    }
}

/// Local bounding box used for hit testing, rebuilt whenever the vertex
/// buffer changes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Collider {
    pub min: Vec3,
    pub max: Vec3,
    /// Incremented on every rebuild
    pub revision: u64,
}

impl Collider {
    pub fn from_mesh(mesh: &MeshData) -> Self {
        let (min, max) = mesh.bounds().unwrap_or((Vec3::ZERO, Vec3::ZERO));
        Self {
            min,
            max,
            revision: 0,
        }
    }
}

/// A mesh object in the scene
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub id: Uuid,
    pub kind: ObjectKind,
    pub name: String,
    /// Mesh in local coordinates
    pub mesh: MeshData,
    pub transform: Transform,
    pub classification: Classification,
    pub collider: Collider,
}

impl SceneObject {
    /// Create a new object around a local mesh
    pub fn new(kind: ObjectKind, mesh: MeshData) -> Self {
        let collider = Collider::from_mesh(&mesh);
        Self {
            id: Uuid::new_v4(),
            kind,
            name: kind.type_tag().to_string(),
            mesh,
            transform: Transform::default(),
            classification: Classification::default(),
            collider,
        }
    }

    /// Create a primitive at a position with the configured creation scale
    pub fn primitive(kind: ObjectKind, position: Vec3, config: &CreationConfig) -> Option<Self> {
        let mesh = kind.generate_mesh(config)?;
        let mut object = Self::new(kind, mesh);
        object.transform = Transform {
            position,
            rotation: Quat::IDENTITY,
            scale: kind.creation_scale(config),
        };
        Some(object)
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn is_printer(&self) -> bool {
        self.kind == ObjectKind::Printer
    }

    /// Vertex positions in world space
    pub fn world_vertices(&self) -> Vec<Vec3> {
        let mat = self.transform.to_mat4();
        self.mesh
            .vertices
            .iter()
            .map(|v| mat.transform_point3(Vec3::from(*v)))
            .collect()
    }

    /// Mesh with the world transform baked into its vertices
    pub fn world_mesh(&self) -> MeshData {
        self.mesh.transformed(&self.transform.to_mat4())
    }

    /// Replace the vertex buffer from world-space positions
    ///
    /// Positions are mapped back through the inverse world transform; the
    /// transform itself is left unchanged. Normals and the collider are
    /// rebuilt.
    pub fn set_world_vertices(&mut self, world: &[Vec3]) -> Result<(), crate::SceneError> {
        if world.len() != self.mesh.vertices.len() {
            return Err(crate::SceneError::VertexCountMismatch {
                expected: self.mesh.vertices.len(),
                actual: world.len(),
            });
        }
        if !self.transform.is_invertible() {
            return Err(crate::SceneError::SingularTransform(self.id));
        }

        let inverse = self.transform.to_mat4().inverse();
        for (local, w) in self.mesh.vertices.iter_mut().zip(world) {
            *local = inverse.transform_point3(*w).to_array();
        }
        self.mesh.recalculate_normals();
        self.rebuild_collider();
        Ok(())
    }

    /// Replace the local mesh entirely
    pub fn set_mesh(&mut self, mesh: MeshData) {
        self.mesh = mesh;
        self.rebuild_collider();
    }

    /// Whether the vertex buffer has changed since creation
    ///
    /// A reshaped primitive no longer matches its generator output.
    pub fn is_reshaped(&self) -> bool {
        self.collider.revision > 0
    }

    /// Rebuild the collider from the current vertex buffer
    pub fn rebuild_collider(&mut self) {
        let revision = self.collider.revision + 1;
        self.collider = Collider::from_mesh(&self.mesh);
        self.collider.revision = revision;
    }
}
