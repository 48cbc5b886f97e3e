use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::render::CameraParams;

const MIN_POLAR: f32 = 1e-6;

/// Tuning of the orbit camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitSettings {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Fraction of the pending motion applied each frame. Zero disables damping.
    pub damping: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            damping: 0.9,
            rotate_speed: 0.5,
            zoom_speed: 0.7,
            pan_speed: 0.5,
            min_distance: 1.0,
            max_distance: 20.0,
        }
    }
}

/// Camera orbiting a target, driven by pointer drags and wheel steps.
///
/// Input accumulates pending motion; [`OrbitCamera::update`] applies a
/// damped share of it once per frame.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    settings: OrbitSettings,
    target: Vec3,
    radius: f32,
    /// Azimuth around +Y, measured from +Z.
    theta: f32,
    /// Polar angle from +Y.
    phi: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan_offset: Vec3,
}

impl OrbitCamera {
    pub fn new(settings: OrbitSettings) -> Self {
        let offset = settings.position - settings.target;
        let radius = offset.length().max(f32::EPSILON);
        Self {
            settings,
            target: settings.target,
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
        }
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    pub fn position(&self) -> Vec3 {
        let sin_phi = self.phi.sin();
        self.target
            + self.radius
                * Vec3::new(
                    sin_phi * self.theta.sin(),
                    self.phi.cos(),
                    sin_phi * self.theta.cos(),
                )
    }

    /// Queues a rotation for a pointer drag of `delta` pixels on a
    /// viewport `viewport_height` pixels tall.
    pub fn rotate(&mut self, delta: Vec2, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.delta_theta -= TAU * delta.x / height * self.settings.rotate_speed;
        self.delta_phi -= TAU * delta.y / height * self.settings.rotate_speed;
    }

    /// Queues a zoom step. Positive `steps` move the camera closer.
    pub fn zoom(&mut self, steps: f32) {
        let factor = 0.95_f32.powf(self.settings.zoom_speed);
        self.scale *= factor.powf(steps);
    }

    /// Queues a screen-space pan for a pointer drag of `delta` pixels.
    pub fn pan(&mut self, delta: Vec2, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        let half_fov = (self.settings.fov.to_radians() * 0.5).tan();
        let world_per_pixel = 2.0 * self.radius * half_fov / height * self.settings.pan_speed;
        let forward = (self.target - self.position()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward).normalize_or_zero();
        self.pan_offset += -right * delta.x * world_per_pixel + up * delta.y * world_per_pixel;
    }

    /// Applies pending motion. Called once per rendered frame.
    pub fn update(&mut self) {
        let damping = self.settings.damping.clamp(0.0, 1.0);
        let share = if damping > 0.0 { damping } else { 1.0 };

        self.theta += self.delta_theta * share;
        self.phi = (self.phi + self.delta_phi * share).clamp(MIN_POLAR, PI - MIN_POLAR);
        self.radius = (self.radius * self.scale).clamp(
            self.settings.min_distance,
            self.settings.max_distance.max(self.settings.min_distance),
        );
        self.target += self.pan_offset * share;

        if damping > 0.0 {
            self.delta_theta *= 1.0 - damping;
            self.delta_phi *= 1.0 - damping;
            self.pan_offset *= 1.0 - damping;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn params(&self, aspect: f32) -> CameraParams {
        let projection = Mat4::perspective_rh(
            self.settings.fov.to_radians(),
            aspect.max(0.01),
            self.settings.near,
            self.settings.far,
        );
        CameraParams {
            view_proj: projection * self.view_matrix(),
            position: self.position(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_configured_position() {
        let camera = OrbitCamera::new(OrbitSettings::default());
        assert!((camera.position() - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-4);
        assert!((camera.distance() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn damping_converges_to_full_rotation() {
        let mut camera = OrbitCamera::new(OrbitSettings::default());
        camera.rotate(Vec2::new(100.0, 0.0), 600.0);
        let expected = -TAU * 100.0 / 600.0 * 0.5;

        camera.update();
        let after_one = camera.theta;
        assert!((after_one - expected * 0.9).abs() < 1e-5);

        for _ in 0..20 {
            camera.update();
        }
        assert!((camera.theta - expected).abs() < 1e-4);
        assert!((camera.distance() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn zoom_respects_distance_limits() {
        let mut camera = OrbitCamera::new(OrbitSettings::default());
        camera.zoom(1000.0);
        camera.update();
        assert_eq!(camera.distance(), 1.0);
        camera.zoom(-1000.0);
        camera.update();
        assert_eq!(camera.distance(), 20.0);
    }

    #[test]
    fn polar_angle_never_flips() {
        let mut camera = OrbitCamera::new(OrbitSettings {
            damping: 0.0,
            ..OrbitSettings::default()
        });
        camera.rotate(Vec2::new(0.0, 10_000.0), 100.0);
        camera.update();
        assert!(camera.position().y > 0.0);
        assert!(camera.phi >= MIN_POLAR);
    }

    #[test]
    fn pan_moves_target_sideways() {
        let mut camera = OrbitCamera::new(OrbitSettings {
            damping: 0.0,
            ..OrbitSettings::default()
        });
        camera.pan(Vec2::new(100.0, 0.0), 600.0);
        camera.update();
        assert!(camera.target().x < 0.0);
        assert!(camera.target().y.abs() < 1e-5);
        assert!(camera.target().z.abs() < 1e-5);
    }
}
