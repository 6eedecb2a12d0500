//! Configuration for the water simulation.
//!
//! Three groups of parameters:
//! - `EffectSettings`: the runtime-adjustable surface (panel sliders and toggles)
//! - `SimulationConstants`: fixed at startup (grid sizes, plane extent, light)
//! - `CameraParameters`: the initial orbit of the camera

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Parameters adjustable while the simulation runs.
///
/// Each field maps 1:1 onto a kernel parameter, except `speed`, which is
/// carried for the panel but not consumed by any stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSettings {
    /// Depth of the pointer disturbance
    pub mouse_deep: f32,
    /// Radius of the pointer disturbance (world units)
    pub mouse_size: f32,
    /// Per-step damping factor applied by the wave update
    pub viscosity: f32,
    /// Not wired to any stage
    pub speed: f32,
    pub caustics_enabled: bool,
    pub caustics_debug: bool,
    pub caustics_blur_enabled: bool,
    /// Intensity below which caustics are discarded
    pub caustics_threshold: f32,
    /// Caustics brightness multiplier
    pub caustics_gain: f32,
}

impl EffectSettings {
    pub const MOUSE_DEEP_RANGE: (f32, f32) = (0.0, 1.0);
    pub const MOUSE_SIZE_RANGE: (f32, f32) = (0.02, 0.5);
    pub const VISCOSITY_RANGE: (f32, f32) = (0.9, 0.999);
    pub const SPEED_RANGE: (f32, f32) = (1.0, 20.0);
    pub const THRESHOLD_RANGE: (f32, f32) = (0.0, 1.0);
    pub const GAIN_RANGE: (f32, f32) = (0.0, 1.0);

    /// Clamp every numeric control into its slider range.
    pub fn clamp_to_ranges(&mut self) {
        fn clamp(value: &mut f32, (lo, hi): (f32, f32)) {
            *value = value.clamp(lo, hi);
        }
        clamp(&mut self.mouse_deep, Self::MOUSE_DEEP_RANGE);
        clamp(&mut self.mouse_size, Self::MOUSE_SIZE_RANGE);
        clamp(&mut self.viscosity, Self::VISCOSITY_RANGE);
        clamp(&mut self.speed, Self::SPEED_RANGE);
        clamp(&mut self.caustics_threshold, Self::THRESHOLD_RANGE);
        clamp(&mut self.caustics_gain, Self::GAIN_RANGE);
    }
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            mouse_deep: 0.3,
            mouse_size: 0.12,
            viscosity: 0.995,
            speed: 10.0,
            caustics_enabled: true,
            caustics_debug: false,
            caustics_blur_enabled: true,
            caustics_threshold: 0.2,
            caustics_gain: 0.3,
        }
    }
}

/// Startup-only constants. Changing them requires recreating the GPU resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConstants {
    /// Cells per side of the simulation grids
    pub height_resolution: u32,
    /// Texels per side of the caustics textures
    pub caustics_size: u32,
    /// Full width of the square disturbance region on the y = 0 plane
    pub bounds: f32,
    /// World-space position of the single point light
    pub light_position: [f32; 3],
    /// Cells per side of the light-wave projection mesh
    pub light_wave_subdivision: u32,
    /// Compute workgroup edge used by the kernels
    pub workgroup_size: u32,
}

impl SimulationConstants {
    /// Half-width of the valid disturbance region.
    pub fn bounds_half(&self) -> f32 {
        self.bounds * 0.5
    }

    /// Workgroups per axis needed to cover `extent` cells.
    pub fn workgroups_for(&self, extent: u32) -> u32 {
        extent.div_ceil(self.workgroup_size)
    }
}

impl Default for SimulationConstants {
    fn default() -> Self {
        Self {
            height_resolution: 512,
            caustics_size: 512,
            bounds: 2.0,
            light_position: [0.0, 3.0, 0.0],
            light_wave_subdivision: 256,
            workgroup_size: 8,
        }
    }
}

/// Initial camera orbit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParameters {
    pub radius: f32,
    /// Polar angle from +Y (radians)
    pub phi: f32,
    /// Azimuth (radians)
    pub theta: f32,
}

impl Default for CameraParameters {
    fn default() -> Self {
        Self {
            radius: 3.5,
            phi: 0.8,
            theta: 0.8,
        }
    }
}

fn default_queue_capacity() -> usize {
    256
}

/// Complete configuration combining all parameter groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterConfig {
    #[serde(default)]
    pub effects: EffectSettings,

    #[serde(default)]
    pub simulation: SimulationConstants,

    #[serde(default)]
    pub camera: CameraParameters,

    /// Maximum number of pending input events between ticks
    #[serde(default = "default_queue_capacity")]
    pub input_queue_capacity: usize,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            effects: EffectSettings::default(),
            simulation: SimulationConstants::default(),
            camera: CameraParameters::default(),
            input_queue_capacity: default_queue_capacity(),
        }
    }
}

impl WaterConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|error| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            error,
        })?;
        let config: WaterConfig =
            serde_json::from_str(&contents).map_err(|error| ConfigError::Parse {
                path: path.as_ref().to_path_buf(),
                error,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a JSON file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path.as_ref(), contents).map_err(|error| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            error,
        })
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if sim.height_resolution == 0 {
            return Err(ConfigError::Invalid("height_resolution must be non-zero".into()));
        }
        if sim.caustics_size == 0 {
            return Err(ConfigError::Invalid("caustics_size must be non-zero".into()));
        }
        if sim.light_wave_subdivision == 0 {
            return Err(ConfigError::Invalid(
                "light_wave_subdivision must be non-zero".into(),
            ));
        }
        if sim.workgroup_size != 8 {
            return Err(ConfigError::Invalid(format!(
                "workgroup_size {} does not match the kernels (8)",
                sim.workgroup_size
            )));
        }
        if sim.bounds.is_nan() || sim.bounds <= 0.0 {
            return Err(ConfigError::Invalid("bounds must be positive".into()));
        }
        let camera = &self.camera;
        if !(1.5..=10.0).contains(&camera.radius) {
            return Err(ConfigError::Invalid(format!(
                "camera radius {} outside [1.5, 10.0]",
                camera.radius
            )));
        }
        if !(0.1..=std::f32::consts::PI - 0.1).contains(&camera.phi) {
            return Err(ConfigError::Invalid(format!(
                "camera phi {} outside [0.1, pi - 0.1]",
                camera.phi
            )));
        }
        if self.input_queue_capacity == 0 {
            return Err(ConfigError::Invalid("input_queue_capacity must be non-zero".into()));
        }
        Ok(())
    }
}

/// Error types for configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read/write config file '{}': {error}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {error}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        error: serde_json::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WaterConfig::default();
        assert_eq!(config.simulation.height_resolution, 512);
        assert_eq!(config.simulation.caustics_size, 512);
        assert!((config.simulation.bounds_half() - 1.0).abs() < f32::EPSILON);
        assert!((config.effects.viscosity - 0.995).abs() < f32::EPSILON);
        assert!((config.camera.radius - 3.5).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_workgroups_round_up() {
        let sim = SimulationConstants::default();
        assert_eq!(sim.workgroups_for(512), 64);
        assert_eq!(sim.workgroups_for(513), 65);
        assert_eq!(sim.workgroups_for(1), 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "effects": { "caustics_gain": 0.8 } }"#;
        let config: WaterConfig = serde_json::from_str(json).unwrap();
        assert!((config.effects.caustics_gain - 0.8).abs() < f32::EPSILON);
        assert!((config.effects.mouse_size - 0.12).abs() < f32::EPSILON);
        assert_eq!(config.simulation, SimulationConstants::default());
        assert_eq!(config.input_queue_capacity, 256);
    }

    #[test]
    fn test_validate_rejects_zero_resolution() {
        let mut config = WaterConfig::default();
        config.simulation.height_resolution = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_camera_outside_clamps() {
        let mut config = WaterConfig::default();
        config.camera.radius = 20.0;
        assert!(config.validate().is_err());

        let mut config = WaterConfig::default();
        config.camera.phi = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_clamp_to_ranges() {
        let mut effects = EffectSettings {
            mouse_size: 5.0,
            viscosity: 0.1,
            caustics_gain: -1.0,
            ..EffectSettings::default()
        };
        effects.clamp_to_ranges();
        assert!((effects.mouse_size - 0.5).abs() < f32::EPSILON);
        assert!((effects.viscosity - 0.9).abs() < f32::EPSILON);
        assert_eq!(effects.caustics_gain, 0.0);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("water.json");

        let mut config = WaterConfig::default();
        config.effects.caustics_debug = true;
        config.camera.theta = 1.25;
        config.to_file(&path).unwrap();

        let loaded = WaterConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = WaterConfig::from_file("/nonexistent/water.json");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
