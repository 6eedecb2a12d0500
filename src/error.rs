//! Error types for the water engine.
//!
//! Raycasts that miss the simulation plane are not errors; they are a normal
//! classification outcome of the gesture state machine.

use thiserror::Error;

/// Errors surfaced by the engine and its GPU backend.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The host has no usable GPU adapter or device. Terminal.
    #[error("GPU rendering is not supported on this system: {0}")]
    Capability(String),

    /// A kernel program failed to compile or its pipeline failed validation.
    #[error("Failed to load {stage} program: {message}")]
    ResourceLoad { stage: &'static str, message: String },

    /// The presentation surface could not provide a frame.
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    /// Mapping a GPU buffer for readback failed.
    #[error("GPU readback failed: {0}")]
    Readback(String),
}

impl EngineError {
    /// Whether the host should reconfigure the surface and keep running.
    pub fn is_surface_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_message() {
        let err = EngineError::Capability("no adapter".to_string());
        assert_eq!(
            err.to_string(),
            "GPU rendering is not supported on this system: no adapter"
        );
    }

    #[test]
    fn test_resource_load_message_names_stage() {
        let err = EngineError::ResourceLoad {
            stage: "blur",
            message: "bad binding".to_string(),
        };
        assert!(err.to_string().contains("blur"));
        assert!(err.to_string().contains("bad binding"));
    }

    #[test]
    fn test_surface_recoverability() {
        assert!(EngineError::Surface(wgpu::SurfaceError::Lost).is_surface_recoverable());
        assert!(EngineError::Surface(wgpu::SurfaceError::Outdated).is_surface_recoverable());
        assert!(!EngineError::Surface(wgpu::SurfaceError::OutOfMemory).is_surface_recoverable());
        assert!(!EngineError::Capability(String::new()).is_surface_recoverable());
    }
}
