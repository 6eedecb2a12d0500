//! Pointer and camera interaction
//!
//! - Camera: spherical orbit camera and its view basis
//! - Raycast: pointer rays against the simulation plane
//! - Input: discrete events and the bounded per-tick queue
//! - Gesture: orbit-or-disturb classification per gesture

pub mod camera;
pub mod gesture;
pub mod input;
pub mod raycast;

pub use camera::{CameraBasis, OrbitCamera};
pub use gesture::{GestureState, PointerRaycaster, PointerState};
pub use input::{InputEvent, InputQueue};
pub use raycast::{RayHit, Ray};
