//! Pointer gesture state machine.
//!
//! A gesture runs from pointer-down to pointer-up/leave and is classified
//! exactly once: if its first resolved sample hits the simulation plane inside
//! the disturbance square, the whole gesture disturbs the water and never
//! orbits the camera; otherwise the whole gesture orbits and never disturbs.

use glam::{Vec2, Vec3};

use super::camera::OrbitCamera;
use super::input::InputEvent;
use super::raycast::{normalized_device_coords, raycast, RayHit};

/// Forcing applied on the sample that snaps `mouse_pos` to a fresh hit.
pub const SNAP_KICK: Vec2 = Vec2::new(0.05, 0.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    /// Button held, mode not decided yet
    GestureUnresolved,
    GestureOrbiting,
    GestureDisturbing,
}

/// Snapshot of pointer-derived forcing, read once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerState {
    /// Cursor in normalized device coordinates
    pub ndc: Vec2,
    /// Last confirmed hit on the plane as (x, z)
    pub mouse_pos: Vec2,
    /// Displacement since the previous confirmed hit as (dx, dz)
    pub mouse_speed: Vec2,
    /// Re-snap instead of producing a raw delta on the next in-bounds sample
    pub pending_origin_reset: bool,
}

impl Default for PointerState {
    fn default() -> Self {
        Self {
            ndc: Vec2::ZERO,
            mouse_pos: Vec2::ZERO,
            mouse_speed: Vec2::ZERO,
            pending_origin_reset: false,
        }
    }
}

impl PointerState {
    /// Magnitude of the forcing passed to the wave update.
    pub fn forcing_magnitude(&self) -> f32 {
        self.mouse_speed.x.hypot(self.mouse_speed.y)
    }
}

/// Turns pointer events into camera orbit or plane forcing.
#[derive(Debug, Clone)]
pub struct PointerRaycaster {
    state: GestureState,
    pointer: PointerState,
    /// Last screen position seen during the gesture, for drag deltas
    last_screen: Vec2,
    /// Client area used to normalize pointer positions
    client_size: Vec2,
    /// Physical pixels per logical pixel; drag sensitivity is per logical pixel
    pixel_ratio: f32,
    bounds_half: f32,
}

impl PointerRaycaster {
    pub fn new(bounds_half: f32, client_width: u32, client_height: u32) -> Self {
        Self {
            state: GestureState::Idle,
            pointer: PointerState::default(),
            last_screen: Vec2::ZERO,
            client_size: Vec2::new(client_width as f32, client_height as f32),
            pixel_ratio: 1.0,
            bounds_half,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    /// True once the current gesture disturbs the water; cleared on release.
    pub fn orbit_locked(&self) -> bool {
        self.state == GestureState::GestureDisturbing
    }

    /// Still waiting for the first resolved sample of this gesture.
    pub fn first_sample_of_gesture(&self) -> bool {
        self.state == GestureState::GestureUnresolved
    }

    pub fn set_client_size(&mut self, width: u32, height: u32) {
        self.client_size = Vec2::new(width as f32, height as f32);
    }

    /// Set the display scale factor. Non-positive ratios are ignored.
    pub fn set_pixel_ratio(&mut self, ratio: f32) {
        if ratio > 0.0 && ratio.is_finite() {
            self.pixel_ratio = ratio;
        }
    }

    fn track(&mut self, x: f32, y: f32) {
        self.pointer.ndc = normalized_device_coords(x, y, self.client_size.x, self.client_size.y);
    }

    /// Apply one input event. Camera drag happens here, per move sample.
    pub fn handle_event(&mut self, event: &InputEvent, camera: &mut OrbitCamera) {
        match *event {
            InputEvent::PointerDown { x, y } => {
                self.state = GestureState::GestureUnresolved;
                self.pointer.pending_origin_reset = true;
                self.last_screen = Vec2::new(x, y);
                self.track(x, y);
            }
            InputEvent::PointerMove { x, y } => {
                if self.state == GestureState::GestureOrbiting {
                    let delta = (Vec2::new(x, y) - self.last_screen) / self.pixel_ratio;
                    camera.apply_drag(delta.x, delta.y);
                }
                self.last_screen = Vec2::new(x, y);
                self.track(x, y);
            }
            InputEvent::PointerUp { x, y } => {
                self.track(x, y);
                self.release();
            }
            InputEvent::PointerLeave => self.release(),
            InputEvent::Wheel { delta_y } => camera.apply_zoom(delta_y),
            InputEvent::Resize { width, height } => self.set_client_size(width, height),
            InputEvent::ResetSimulation => {}
        }
    }

    fn release(&mut self) {
        self.state = GestureState::Idle;
        self.pointer.mouse_speed = Vec2::ZERO;
        self.pointer.pending_origin_reset = false;
    }

    /// Resolve this tick's forcing from the latest pointer position.
    ///
    /// `aspect` is the backing-store aspect ratio used for the camera basis.
    pub fn resolve(&mut self, camera: &OrbitCamera, aspect: f32) -> PointerState {
        match self.state {
            GestureState::Idle | GestureState::GestureOrbiting => {
                self.pointer.mouse_speed = Vec2::ZERO;
            }
            GestureState::GestureUnresolved => {
                match raycast(camera, self.pointer.ndc, aspect, self.bounds_half) {
                    RayHit::InBounds(hit) => {
                        self.state = GestureState::GestureDisturbing;
                        self.snap(hit);
                    }
                    RayHit::OutOfBounds => {
                        self.state = GestureState::GestureOrbiting;
                        self.pointer.mouse_speed = Vec2::ZERO;
                    }
                }
            }
            GestureState::GestureDisturbing => {
                match raycast(camera, self.pointer.ndc, aspect, self.bounds_half) {
                    RayHit::InBounds(hit) if self.pointer.pending_origin_reset => self.snap(hit),
                    RayHit::InBounds(hit) => {
                        let hit = Vec2::new(hit.x, hit.z);
                        self.pointer.mouse_speed = hit - self.pointer.mouse_pos;
                        self.pointer.mouse_pos = hit;
                    }
                    RayHit::OutOfBounds => {
                        self.pointer.mouse_speed = Vec2::ZERO;
                        self.pointer.pending_origin_reset = true;
                    }
                }
            }
        }
        self.pointer
    }

    fn snap(&mut self, hit: Vec3) {
        self.pointer.mouse_pos = Vec2::new(hit.x, hit.z);
        self.pointer.mouse_speed = SNAP_KICK;
        self.pointer.pending_origin_reset = false;
    }
}
