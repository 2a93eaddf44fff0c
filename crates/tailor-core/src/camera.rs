//! Perspective camera, preset poses, and eased preset transitions

use glam::Vec3;

use crate::config::CameraDirective;
use crate::settings::CameraConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl PerspectiveCamera {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            fov_y_degrees: config.fov_degrees,
            aspect,
            near: config.near,
            far: config.far,
            position: Vec3::from_array(config.initial_position),
            target: Vec3::ZERO,
        }
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }
}

/// Preset camera position for a directive at the given zoom, `None` for free
pub fn preset_position(directive: CameraDirective, distance: f32, zoom: f32) -> Option<Vec3> {
    let direction = match directive {
        CameraDirective::Front => Vec3::Z,
        CameraDirective::Back => Vec3::NEG_Z,
        CameraDirective::Left => Vec3::NEG_X,
        CameraDirective::Right => Vec3::X,
        CameraDirective::Free => return None,
    };
    Some(direction * distance * zoom)
}

pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// One-shot interpolation of the camera position toward a preset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransition {
    from: Vec3,
    to: Vec3,
    elapsed: f32,
    duration: f32,
}

impl CameraTransition {
    pub fn new(from: Vec3, to: Vec3, duration_secs: f32) -> Self {
        Self {
            from,
            to,
            elapsed: 0.0,
            duration: duration_secs.max(f32::EPSILON),
        }
    }

    pub fn target(&self) -> Vec3 {
        self.to
    }

    pub fn progress(&self) -> f32 {
        (self.elapsed / self.duration).min(1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Advance by `dt` seconds and return the position for this frame
    pub fn advance(&mut self, dt: f32) -> Vec3 {
        self.elapsed += dt.max(0.0);
        if self.is_finished() {
            return self.to;
        }
        self.from.lerp(self.to, ease_out_cubic(self.progress()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_scale_with_zoom() {
        assert_eq!(preset_position(CameraDirective::Front, 3.0, 1.0), Some(Vec3::new(0.0, 0.0, 3.0)));
        assert_eq!(preset_position(CameraDirective::Back, 3.0, 1.0), Some(Vec3::new(0.0, 0.0, -3.0)));
        assert_eq!(preset_position(CameraDirective::Left, 3.0, 1.5), Some(Vec3::new(-4.5, 0.0, 0.0)));
        assert_eq!(preset_position(CameraDirective::Right, 3.0, 0.5), Some(Vec3::new(1.5, 0.0, 0.0)));
        assert_eq!(preset_position(CameraDirective::Free, 3.0, 1.0), None);
    }

    #[test]
    fn test_ease_out_cubic() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert_eq!(ease_out_cubic(0.5), 0.875);
        assert_eq!(ease_out_cubic(2.0), 1.0);
    }

    #[test]
    fn test_transition_reaches_target_exactly() {
        let mut transition = CameraTransition::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(-3.0, 0.0, 0.0), 0.5);
        let mut last_distance = f32::MAX;
        for _ in 0..29 {
            let p = transition.advance(1.0 / 60.0);
            let distance = p.distance(transition.target());
            assert!(distance < last_distance);
            last_distance = distance;
            assert!(!transition.is_finished());
        }
        // 30 frames at 60 Hz is exactly the duration, modulo float error
        let p = transition.advance(1.0 / 60.0 + 1e-4);
        assert!(transition.is_finished());
        assert_eq!(p, Vec3::new(-3.0, 0.0, 0.0));
    }
}
