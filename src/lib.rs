//! Interactive water surface with GPU caustics
//!
//! - Interaction: orbit camera, pointer raycasting, gesture classification
//! - Params: per-stage kernel parameter blocks
//! - Render: frame stage graph and the wgpu scheduler that executes it
//! - Engine: per-tick orchestration of input, parameters and rendering

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod interaction;
pub mod mesh;
pub mod params;
pub mod render;
pub mod ui;

pub use config::WaterConfig;
pub use engine::{tick, EngineContext, FrameReport, FrameStats};
pub use error::EngineError;
