//! On-screen controls
//!
//! - Panel: egui window bound to the runtime effect settings

pub mod panel;

pub use panel::{ControlPanel, PanelActions, PanelStats};
