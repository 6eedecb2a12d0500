//! GPU rendering modules
//!
//! - Graph: per-frame stages, their resource hazards and the recorded order
//! - Surface: backing-store sizing under the device texture limit
//! - Backend: the trait the engine drives each tick
//! - Kernels: wgpu pipelines for the five WGSL programs
//! - Scheduler: owns every GPU resource and records the frame
//! - Overlay: egui drawn over the composite

pub mod backend;
pub mod graph;
pub mod kernels;
pub mod overlay;
pub mod scheduler;
pub mod surface;

pub use backend::FrameBackend;
pub use graph::{FramePlan, Resource, Stage};
pub use overlay::OverlayFrame;
pub use scheduler::GpuScheduler;
pub use surface::SurfaceSize;
