//! Export of captured frames:
//! - Image: PNG export of rendered frames

pub mod image_export;

pub use image_export::{bgra_to_rgba, export_frame, screenshot_path, ExportError};
