use glam::{Mat4, Vec3};

use crate::scene::Scene;

/// Number of directional lights the shader evaluates.
pub const MAX_LIGHTS: usize = 4;

/// Camera parameters consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}

/// Directional light state consumed by the renderer's uniform buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct LightParams {
    /// Unit vector pointing towards the light.
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl LightParams {
    /// Collects the scene's lights, keeping at most [`MAX_LIGHTS`].
    pub fn from_scene(scene: &Scene) -> Vec<Self> {
        scene
            .lights()
            .iter()
            .take(MAX_LIGHTS)
            .map(|light| Self {
                direction: light.direction(),
                color: light.color,
                intensity: light.intensity.max(0.0),
            })
            .collect()
    }
}
