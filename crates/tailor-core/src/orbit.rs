//! Damped orbit controller
//!
//! Rotates the camera around a target on a sphere (Y up), pans the target in
//! the view plane, and dollies along the view ray. Input accumulates into
//! deltas that are bled into the camera a fraction per update, giving the
//! same inertial feel as browser orbit controls.

use glam::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};

use crate::camera::PerspectiveCamera;

const POLAR_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitController {
    pub enabled: bool,
    pub target: Vec3,
    /// Fraction of pending motion applied each update; 0 disables damping
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar: f32,
    pub max_polar: f32,
    /// Pending (theta, phi) rotation in radians
    rotate_delta: Vec2,
    pan_offset: Vec3,
    scale: f32,
}

impl OrbitController {
    pub fn new(damping_factor: f32) -> Self {
        Self {
            enabled: true,
            target: Vec3::ZERO,
            damping_factor,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.5,
            max_distance: 50.0,
            min_polar: 0.0,
            max_polar: PI,
            rotate_delta: Vec2::ZERO,
            pan_offset: Vec3::ZERO,
            scale: 1.0,
        }
    }

    /// Drag by `delta` pixels; a full viewport height turns a full circle
    pub fn rotate(&mut self, delta: Vec2, viewport_height: f32) {
        if !self.enabled || viewport_height <= 0.0 {
            return;
        }
        self.rotate_delta.x -= TAU * delta.x / viewport_height * self.rotate_speed;
        self.rotate_delta.y -= TAU * delta.y / viewport_height * self.rotate_speed;
    }

    /// Move the target so the scene follows the pointer
    pub fn pan(&mut self, delta: Vec2, camera: &PerspectiveCamera, viewport_height: f32) {
        if !self.enabled || viewport_height <= 0.0 {
            return;
        }
        let offset = camera.position - self.target;
        let forward = -offset.normalize_or_zero();
        let Some(right) = forward.cross(Vec3::Y).try_normalize() else {
            return;
        };
        let up = right.cross(forward);

        // World units per pixel at the target's depth
        let half_fov = camera.fov_y_degrees.to_radians() / 2.0;
        let units = 2.0 * offset.length() * half_fov.tan() / viewport_height * self.pan_speed;
        self.pan_offset += -right * delta.x * units + up * delta.y * units;
    }

    /// Positive steps move toward the target
    pub fn dolly(&mut self, steps: f32) {
        if !self.enabled {
            return;
        }
        self.scale *= 0.95f32.powf(steps * self.zoom_speed);
    }

    /// Forget pending motion and orbit around `target` from now on
    pub fn reset(&mut self, target: Vec3) {
        self.target = target;
        self.rotate_delta = Vec2::ZERO;
        self.pan_offset = Vec3::ZERO;
        self.scale = 1.0;
    }

    /// Apply pending motion to the camera. Returns whether it moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        if !self.enabled {
            self.reset(self.target);
            return false;
        }

        let offset = camera.position - self.target;
        let radius = offset.length();
        let (mut theta, mut phi) = if radius > 0.0 {
            (offset.x.atan2(offset.z), (offset.y / radius).clamp(-1.0, 1.0).acos())
        } else {
            (0.0, PI / 2.0)
        };

        let damped = self.damping_factor > 0.0;
        let share = if damped { self.damping_factor } else { 1.0 };

        theta += self.rotate_delta.x * share;
        phi += self.rotate_delta.y * share;
        phi = phi
            .clamp(self.min_polar, self.max_polar)
            .clamp(POLAR_EPSILON, PI - POLAR_EPSILON);

        let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);
        self.target += self.pan_offset * share;

        let offset = Vec3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        let before = camera.position;
        camera.position = self.target + offset;
        camera.look_at(self.target);

        if damped {
            self.rotate_delta *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.rotate_delta = Vec2::ZERO;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        before.distance_squared(camera.position) > 1e-10
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::CameraConfig;

    fn camera_at(position: Vec3) -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::from_config(&CameraConfig::default(), 1.0);
        camera.position = position;
        camera
    }

    #[test]
    fn test_idle_update_keeps_pose() {
        let mut orbit = OrbitController::new(0.05);
        let mut camera = camera_at(Vec3::new(5.0, 5.0, 5.0));
        assert!(!orbit.update(&mut camera));
        assert!((camera.position - Vec3::new(5.0, 5.0, 5.0)).length() < 1e-4);
    }

    #[test]
    fn test_damped_rotation_eases_out() {
        let mut orbit = OrbitController::new(0.1);
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 3.0));
        orbit.rotate(Vec2::new(-100.0, 0.0), 800.0);

        let mut steps = Vec::new();
        for _ in 0..100 {
            let before = camera.position;
            orbit.update(&mut camera);
            steps.push(before.distance(camera.position));
        }
        assert!(steps[0] > steps[10]);
        assert!(steps[10] > steps[50]);
        // Radius is preserved while orbiting
        assert!((camera.position.length() - 3.0).abs() < 1e-4);
        // Nearly all of the drag has been applied
        let theta = camera.position.x.atan2(camera.position.z);
        let full = TAU * 100.0 / 800.0;
        assert!((theta - full).abs() < full * 0.01, "theta {theta}");
    }

    #[test]
    fn test_polar_angle_is_clamped() {
        let mut orbit = OrbitController::new(0.0);
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 3.0));
        orbit.rotate(Vec2::new(0.0, 10_000.0), 100.0);
        orbit.update(&mut camera);
        assert!(camera.position.y > 2.99);
        assert!(camera.position.is_finite());
    }

    #[test]
    fn test_dolly_respects_limits() {
        let mut orbit = OrbitController::new(0.0);
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 3.0));
        orbit.dolly(5.0);
        orbit.update(&mut camera);
        assert!(camera.position.z < 3.0);

        orbit.dolly(1000.0);
        orbit.update(&mut camera);
        assert!((camera.position.length() - orbit.min_distance).abs() < 1e-4);
    }

    #[test]
    fn test_pan_moves_target() {
        let mut orbit = OrbitController::new(0.0);
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 3.0));
        orbit.pan(Vec2::new(10.0, 0.0), &camera, 600.0);
        orbit.update(&mut camera);
        assert!(orbit.target.x < 0.0);
        assert!(orbit.target.y.abs() < 1e-6);
        assert_eq!(camera.target, orbit.target);
    }

    #[test]
    fn test_disabled_ignores_input() {
        let mut orbit = OrbitController::new(0.05);
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 3.0));
        orbit.enabled = false;
        orbit.rotate(Vec2::new(300.0, 0.0), 600.0);
        orbit.dolly(10.0);
        assert!(!orbit.update(&mut camera));
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 3.0));

        orbit.enabled = true;
        assert!(!orbit.update(&mut camera));
    }
}
