//! Engine configuration module
//!
//! This module handles engine-wide tunables: snapping grid, handle offsets,
//! primitive creation defaults, export conversion and printer volume.

mod manager;

pub use manager::{ConfigError, ConfigManager, SharedConfig, create_shared_config};

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Snapping grid settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridConfig {
    /// Grid cell size in metres
    pub spacing: f32,
    /// Spacings cycled through by the grid size toggle
    pub spacing_presets: Vec<f32>,
    /// Rotation quantization step in degrees
    pub rotation_snap_degrees: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            spacing: 0.02,
            spacing_presets: vec![0.05, 0.02, 0.01, 0.005],
            rotation_snap_degrees: 15.0,
        }
    }
}

/// Handle placement offsets in metres
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandleConfig {
    /// Distance of face handles outside their face
    pub face_offset: f32,
    /// Distance of rotation wheels outside the box
    pub wheel_offset: f32,
    /// Height of the movement handle above the top face handle
    pub movement_offset: f32,
    /// Extra movement handle height while a printer is selected
    pub printer_movement_offset: f32,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            face_offset: 0.02,
            wheel_offset: 0.03,
            movement_offset: 0.05,
            printer_movement_offset: 0.05,
        }
    }
}

/// Defaults for newly created objects
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreationConfig {
    /// Uniform scale applied to new primitives
    pub default_scale: f32,
    /// Vertical scale applied to new cones
    pub cone_height_scale: f32,
    /// Offset applied to duplicated objects
    pub duplicate_offset: [f32; 3],
    /// Radial segments for round primitives
    pub segments: u32,
    /// Latitude rings for spheres and capsules
    pub rings: u32,
}

impl Default for CreationConfig {
    fn default() -> Self {
        Self {
            default_scale: 0.1,
            cone_height_scale: 0.08,
            duplicate_offset: [0.11, 0.0, 0.0],
            segments: 24,
            rings: 12,
        }
    }
}

impl CreationConfig {
    pub fn duplicate_offset(&self) -> Vec3 {
        Vec3::from(self.duplicate_offset)
    }
}

/// Conversion applied to meshes handed to the slicer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportConfig {
    /// Scene units to output units (metres to millimetres by default)
    pub unit_scale: f32,
    /// Rotate Y-up scene coordinates into Z-up printer coordinates
    pub z_up: bool,
    /// Translate the mesh so its lowest point rests on the bed
    pub drop_to_bed: bool,
    /// Name written on the solid line
    pub solid_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            unit_scale: 1000.0,
            z_up: true,
            drop_to_bed: true,
            solid_name: "tablecad".to_string(),
        }
    }
}

/// Target printer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrinterConfig {
    /// Build volume (width, height, depth) in metres
    pub build_volume: [f32; 3],
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            build_volume: [0.23, 0.20, 0.19],
        }
    }
}

impl PrinterConfig {
    pub fn build_volume(&self) -> Vec3 {
        Vec3::from(self.build_volume)
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EngineConfig {
    /// Configuration format version
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub handles: HandleConfig,
    #[serde(default)]
    pub creation: CreationConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub printer: PrinterConfig,
}

impl EngineConfig {
    /// Current configuration version
    pub const CURRENT_VERSION: u32 = 1;

    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: EngineConfig = ron::from_str("(version: 1, grid: (spacing: 0.01, spacing_presets: [0.01], rotation_snap_degrees: 5.0))").unwrap();
        assert_eq!(config.grid.spacing, 0.01);
        assert_eq!(config.handles, HandleConfig::default());
        assert_eq!(config.printer.build_volume(), Vec3::new(0.23, 0.20, 0.19));
    }

    #[test]
    fn test_ron_round_trip() {
        let config = EngineConfig::new();
        let text = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default()).unwrap();
        let parsed: EngineConfig = ron::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
