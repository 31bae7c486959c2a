/// Viewer tunables: camera, framing margin, lighting and the model list
use std::path::Path;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};

/// An entry in the model picker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub file: String,
}

/// Viewer configuration.
///
/// Every field has a default, so a JSON file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Multiplier on the tightest fitting distance, 1.0 = tight
    pub margin: f32,
    /// Camera position before any model is loaded
    pub initial_camera: [f32; 3],
    pub damping_factor: f32,
    /// Clear color as 0xRRGGBB
    pub background: u32,
    pub ambient_intensity: f32,
    pub directional_intensity: f32,
    pub light_position: [f32; 3],
    /// Mesh color as 0xRRGGBB
    pub material_color: u32,
    pub shininess: f32,
    pub models: Vec<ModelEntry>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            near: 0.1,
            far: 2000.0,
            margin: 1.0,
            initial_camera: [150.0, 150.0, 200.0],
            damping_factor: 0.05,
            background: 0x111111,
            ambient_intensity: 0.6,
            directional_intensity: 1.0,
            light_position: [100.0, 100.0, 200.0],
            material_color: 0xe0e0e0,
            shininess: 60.0,
            models: vec![ModelEntry {
                name: "Reactor Vessel".to_string(),
                file: "models/reactor_vessel.stl".to_string(),
            }],
        }
    }
}

impl ViewerConfig {
    /// Parse and validate a JSON document
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ViewerError::Config(format!("invalid configuration JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ViewerError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    pub fn initial_camera(&self) -> Point3<f32> {
        Point3::from(self.initial_camera)
    }

    /// Reject values the camera or the fitter cannot work with
    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| Err(ViewerError::Config(message));

        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return fail(format!("fov_degrees must be within (0, 180), got {}", self.fov_degrees));
        }
        if !(self.near > 0.0 && self.far > self.near) {
            return fail(format!("need 0 < near < far, got near {} far {}", self.near, self.far));
        }
        if !(self.margin >= 1.0 && self.margin.is_finite()) {
            return fail(format!("margin must be at least 1.0, got {}", self.margin));
        }
        if !(0.0..=1.0).contains(&self.damping_factor) {
            return fail(format!("damping_factor must be within [0, 1], got {}", self.damping_factor));
        }
        if self.ambient_intensity < 0.0 || self.directional_intensity < 0.0 {
            return fail("light intensities must not be negative".to_string());
        }
        if !self.initial_camera.iter().all(|c| c.is_finite()) {
            return fail("initial_camera must be finite".to_string());
        }
        Ok(())
    }
}

/// Split 0xRRGGBB into normalized channels
pub fn rgb(color: u32) -> [f32; 3] {
    [
        ((color >> 16) & 0xff) as f32 / 255.0,
        ((color >> 8) & 0xff) as f32 / 255.0,
        (color & 0xff) as f32 / 255.0,
    ]
}
