//! Orbit camera on a sphere around the origin

use glam::Vec3;
use std::f32::consts::PI;

use crate::config::CameraParameters;

pub const MIN_RADIUS: f32 = 1.5;
pub const MAX_RADIUS: f32 = 10.0;
pub const MIN_PHI: f32 = 0.1;
pub const MAX_PHI: f32 = PI - 0.1;

/// Radians of rotation per pixel of drag (a tenth of a degree).
pub const DRAG_SENSITIVITY: f32 = (1.0 / 10.0) * (PI / 180.0);
/// Radius change per unit of wheel delta.
pub const ZOOM_SENSITIVITY: f32 = 0.01;

/// Orthonormal view basis. `right` is scaled by the aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

/// Spherical-coordinate camera looking at the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    /// Distance from the origin, clamped to [1.5, 10]
    pub radius: f32,
    /// Polar angle from +Y (radians), clamped away from the poles
    pub phi: f32,
    /// Azimuth (radians), unbounded
    pub theta: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::from_parameters(&CameraParameters::default())
    }
}

impl OrbitCamera {
    pub fn from_parameters(params: &CameraParameters) -> Self {
        Self {
            radius: params.radius.clamp(MIN_RADIUS, MAX_RADIUS),
            phi: params.phi.clamp(MIN_PHI, MAX_PHI),
            theta: params.theta,
        }
    }

    /// World-space eye position.
    pub fn position(&self) -> Vec3 {
        Vec3::new(
            self.radius * self.phi.sin() * self.theta.cos(),
            self.radius * self.phi.cos(),
            self.radius * self.phi.sin() * self.theta.sin(),
        )
    }

    /// View basis for the given aspect ratio (width / height).
    ///
    /// Degenerate vectors come out as zero instead of NaN.
    pub fn basis(&self, aspect: f32) -> CameraBasis {
        let forward = (Vec3::ZERO - self.position()).normalize_or_zero();
        let right = Vec3::new(self.theta.sin(), 0.0, -self.theta.cos()).normalize_or_zero();
        let up = right.cross(forward).normalize_or_zero();
        CameraBasis {
            forward,
            right: right * aspect,
            up,
        }
    }

    /// Rotate by a screen-space drag in pixels.
    pub fn apply_drag(&mut self, delta_x: f32, delta_y: f32) {
        self.theta += delta_x * DRAG_SENSITIVITY;
        self.phi += -delta_y * DRAG_SENSITIVITY;
        self.phi = self.phi.clamp(MIN_PHI, MAX_PHI);
    }

    /// Linear zoom; positive deltas move the camera away.
    pub fn apply_zoom(&mut self, delta_wheel: f32) {
        self.radius = (self.radius + delta_wheel * ZOOM_SENSITIVITY).clamp(MIN_RADIUS, MAX_RADIUS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_defaults() {
        let camera = OrbitCamera::default();
        assert!((camera.radius - 3.5).abs() < 1e-6);
        assert!((camera.phi - 0.8).abs() < 1e-6);
        assert!((camera.theta - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_camera_position_on_sphere() {
        let camera = OrbitCamera::default();
        let pos = camera.position();
        assert!((pos.length() - camera.radius).abs() < 1e-4);
        assert!((pos.y - camera.radius * camera.phi.cos()).abs() < 1e-5);
    }

    #[test]
    fn test_basis_is_orthonormal_at_unit_aspect() {
        let camera = OrbitCamera::default();
        let basis = camera.basis(1.0);
        assert!((basis.forward.length() - 1.0).abs() < 1e-5);
        assert!((basis.right.length() - 1.0).abs() < 1e-5);
        assert!((basis.up.length() - 1.0).abs() < 1e-5);
        assert!(basis.forward.dot(basis.right).abs() < 1e-5);
        assert!(basis.forward.dot(basis.up).abs() < 1e-5);
        assert!(basis.right.dot(basis.up).abs() < 1e-5);
    }

    #[test]
    fn test_forward_points_at_origin() {
        let camera = OrbitCamera::default();
        let basis = camera.basis(1.0);
        let expected = -camera.position().normalize();
        assert!((basis.forward - expected).length() < 1e-5);
    }

    #[test]
    fn test_right_scaled_by_aspect() {
        let camera = OrbitCamera::default();
        let basis = camera.basis(16.0 / 9.0);
        assert!((basis.right.length() - 16.0 / 9.0).abs() < 1e-4);
        // Up is unaffected by aspect
        assert!((basis.up.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_up_has_positive_y() {
        let camera = OrbitCamera::default();
        assert!(camera.basis(1.0).up.y > 0.0);
    }

    #[test]
    fn test_drag_right_increases_theta() {
        let mut camera = OrbitCamera::default();
        let initial = camera.theta;
        camera.apply_drag(100.0, 0.0);
        assert!(camera.theta > initial);
        assert!((camera.theta - initial - 100.0 * DRAG_SENSITIVITY).abs() < 1e-6);
    }

    #[test]
    fn test_drag_up_increases_phi() {
        let mut camera = OrbitCamera::default();
        let initial = camera.phi;
        camera.apply_drag(0.0, -50.0);
        assert!(camera.phi > initial);
    }

    #[test]
    fn test_phi_clamped_under_extreme_drags() {
        let mut camera = OrbitCamera::default();
        camera.apply_drag(0.0, -1.0e7);
        assert!((camera.phi - MAX_PHI).abs() < 1e-6);
        camera.apply_drag(0.0, 1.0e7);
        assert!((camera.phi - MIN_PHI).abs() < 1e-6);

        for step in 0..1000 {
            let dy = if step % 3 == 0 { 4000.0 } else { -2500.0 };
            camera.apply_drag(13.0, dy);
            assert!(camera.phi >= MIN_PHI && camera.phi <= MAX_PHI);
        }
    }

    #[test]
    fn test_theta_is_unbounded() {
        let mut camera = OrbitCamera::default();
        for _ in 0..10 {
            camera.apply_drag(10_000.0, 0.0);
        }
        assert!(camera.theta > 2.0 * PI);
    }

    #[test]
    fn test_zoom_is_linear() {
        let mut camera = OrbitCamera::default();
        camera.apply_zoom(100.0);
        assert!((camera.radius - 4.5).abs() < 1e-5);
        camera.apply_zoom(-50.0);
        assert!((camera.radius - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_radius_clamped_under_wheel_sequences() {
        let mut camera = OrbitCamera::default();
        camera.apply_zoom(1.0e6);
        assert!((camera.radius - MAX_RADIUS).abs() < 1e-6);
        camera.apply_zoom(-1.0e6);
        assert!((camera.radius - MIN_RADIUS).abs() < 1e-6);

        for step in 0..500 {
            let delta = if step % 2 == 0 { 333.0 } else { -120.0 };
            camera.apply_zoom(delta);
            assert!(camera.radius >= MIN_RADIUS && camera.radius <= MAX_RADIUS);
        }
    }

    #[test]
    fn test_from_parameters_clamps() {
        let camera = OrbitCamera::from_parameters(&CameraParameters {
            radius: 50.0,
            phi: 0.0,
            theta: -3.0,
        });
        assert_eq!(camera.radius, MAX_RADIUS);
        assert_eq!(camera.phi, MIN_PHI);
        assert_eq!(camera.theta, -3.0);
    }
}
