//! Pointer rays against the simulation plane (y = 0)

use glam::{Vec2, Vec3};

use super::camera::OrbitCamera;

/// Distance of the virtual image plane along `forward`.
pub const IMAGE_PLANE_DISTANCE: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Outcome of casting a pointer ray at the simulation plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RayHit {
    /// The ray meets the plane inside the disturbance square
    InBounds(Vec3),
    /// The ray meets the plane outside the square, or not at all
    OutOfBounds,
}

/// Convert a pixel position inside a `width` x `height` client area to
/// normalized device coordinates (+Y up).
pub fn normalized_device_coords(x: f32, y: f32, width: f32, height: f32) -> Vec2 {
    let width = width.max(1.0);
    let height = height.max(1.0);
    Vec2::new((x / width) * 2.0 - 1.0, -(y / height) * 2.0 + 1.0)
}

/// Build the ray from the eye through `ndc` on the image plane.
pub fn camera_ray(camera: &OrbitCamera, ndc: Vec2, aspect: f32) -> Ray {
    let eye = camera.position();
    let basis = camera.basis(aspect);
    let image_point =
        eye + basis.right * ndc.x + basis.up * ndc.y + basis.forward * IMAGE_PLANE_DISTANCE;
    Ray {
        origin: eye,
        direction: (image_point - eye).normalize_or_zero(),
    }
}

/// Intersect with the y = 0 plane. Parallel rays and hits behind the
/// origin return `None`.
pub fn intersect_plane(ray: &Ray) -> Option<Vec3> {
    if ray.direction.y == 0.0 {
        return None;
    }
    let t = -ray.origin.y / ray.direction.y;
    if !t.is_finite() || t < 0.0 {
        return None;
    }
    Some(ray.at(t))
}

/// Whether a plane point lies inside the square of half-width `bounds_half`.
pub fn in_bounds(hit: Vec3, bounds_half: f32) -> bool {
    hit.x.abs().max(hit.z.abs()) <= bounds_half
}

/// Cast through `ndc` and classify the hit against the disturbance square.
pub fn raycast(camera: &OrbitCamera, ndc: Vec2, aspect: f32, bounds_half: f32) -> RayHit {
    match intersect_plane(&camera_ray(camera, ndc, aspect)) {
        Some(hit) if in_bounds(hit, bounds_half) => RayHit::InBounds(hit),
        _ => RayHit::OutOfBounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ndc_corners_and_center() {
        let center = normalized_device_coords(400.0, 300.0, 800.0, 600.0);
        assert!(center.length() < 1e-6);

        let top_left = normalized_device_coords(0.0, 0.0, 800.0, 600.0);
        assert_eq!(top_left, Vec2::new(-1.0, 1.0));

        let bottom_right = normalized_device_coords(800.0, 600.0, 800.0, 600.0);
        assert_eq!(bottom_right, Vec2::new(1.0, -1.0));
    }

    #[test]
    fn test_center_ray_hits_origin() {
        let camera = OrbitCamera::default();
        let hit = intersect_plane(&camera_ray(&camera, Vec2::ZERO, 16.0 / 9.0)).unwrap();
        assert!(hit.length() < 1e-4, "center ray should hit near origin, got {hit:?}");
        assert!(matches!(
            raycast(&camera, Vec2::ZERO, 1.0, 1.0),
            RayHit::InBounds(_)
        ));
    }

    #[test]
    fn test_hit_lies_on_plane() {
        let camera = OrbitCamera::default();
        let ray = camera_ray(&camera, Vec2::new(0.3, -0.2), 1.5);
        let hit = intersect_plane(&ray).unwrap();
        assert!(hit.y.abs() < 1e-5);
    }

    #[test]
    fn test_parallel_ray_misses() {
        let ray = Ray {
            origin: Vec3::new(0.0, 1.0, 0.0),
            direction: Vec3::X,
        };
        assert!(intersect_plane(&ray).is_none());
    }

    #[test]
    fn test_ray_pointing_away_misses() {
        let ray = Ray {
            origin: Vec3::new(0.0, 1.0, 0.0),
            direction: Vec3::Y,
        };
        assert!(intersect_plane(&ray).is_none());
    }

    #[test]
    fn test_in_bounds_uses_chebyshev_distance() {
        assert!(in_bounds(Vec3::new(1.0, 0.0, -1.0), 1.0));
        assert!(in_bounds(Vec3::new(-0.99, 0.0, 0.5), 1.0));
        assert!(!in_bounds(Vec3::new(1.01, 0.0, 0.0), 1.0));
        assert!(!in_bounds(Vec3::new(0.0, 0.0, -1.2), 1.0));
        // Diagonal point outside the circle but inside the square
        assert!(in_bounds(Vec3::new(0.9, 0.0, 0.9), 1.0));
    }

    #[test]
    fn test_top_corner_ray_is_out_of_bounds() {
        // Default camera looks down at ~46 degrees; the top of the view lands
        // far beyond the plane square or above the horizon.
        let camera = OrbitCamera::default();
        assert_eq!(
            raycast(&camera, Vec2::new(-1.0, 1.0), 16.0 / 9.0, 1.0),
            RayHit::OutOfBounds
        );
    }

    #[test]
    fn test_in_bounds_classification_matches_predicate() {
        let camera = OrbitCamera::default();
        for i in -10..=10 {
            for j in -10..=10 {
                let ndc = Vec2::new(i as f32 / 10.0, j as f32 / 10.0);
                let ray = camera_ray(&camera, ndc, 1.25);
                let expected = intersect_plane(&ray).is_some_and(|hit| in_bounds(hit, 1.0));
                let classified = matches!(raycast(&camera, ndc, 1.25, 1.0), RayHit::InBounds(_));
                assert_eq!(expected, classified);
            }
        }
    }
}
