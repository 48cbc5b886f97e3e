use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::geometry::{plane, uv_sphere};
use crate::scene::{DirectionalLight, Material, NodeId, NodeKind, Scene, SceneNode, Transform};

pub const SUN_LIGHT: &str = "sun";

const SKY_RADIUS: f32 = 500.0;
const SUN_RADIUS: f32 = 20.0;
const GROUND_SIZE: f32 = 1000.0;
const GROUND_HEIGHT: f32 = -50.0;

/// Parameters of the sky dome gradient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyGradient {
    pub top_color: Vec3,
    pub bottom_color: Vec3,
    pub offset: f32,
    pub exponent: f32,
}

impl Default for SkyGradient {
    fn default() -> Self {
        Self {
            top_color: rgb(0x87ceeb),
            bottom_color: rgb(0xffffff),
            offset: 400.0,
            exponent: 0.6,
        }
    }
}

impl SkyGradient {
    /// Color of the dome at `world_position`. Mirrors the fragment shader.
    pub fn sample(&self, world_position: Vec3) -> Vec3 {
        let height = (world_position + Vec3::splat(self.offset))
            .normalize_or_zero()
            .y;
        let t = height.max(0.0).powf(self.exponent).max(0.0);
        self.bottom_color.lerp(self.top_color, t)
    }
}

/// Converts a `0xRRGGBB` literal to an RGB vector in `[0, 1]`.
pub fn rgb(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BackdropNodes {
    sky: NodeId,
    sun: NodeId,
    ground: NodeId,
}

/// Sky dome, sun and ground plane shown and hidden together.
#[derive(Debug, Clone, PartialEq)]
pub struct Backdrop {
    nodes: Option<BackdropNodes>,
    visible: bool,
    gradient: SkyGradient,
    sun_position: Vec3,
}

impl Default for Backdrop {
    fn default() -> Self {
        Self::new(SkyGradient::default())
    }
}

impl Backdrop {
    pub fn new(gradient: SkyGradient) -> Self {
        Self {
            nodes: None,
            visible: true,
            gradient,
            sun_position: Vec3::new(100.0, 150.0, -200.0),
        }
    }

    /// Adds the decorative nodes and the sun light to `scene`.
    ///
    /// Calling this again is a no-op.
    pub fn create(&mut self, scene: &mut Scene) {
        if self.nodes.is_some() {
            return;
        }

        let sky = SceneNode::new("sky", NodeKind::Sky, Arc::new(uv_sphere(SKY_RADIUS, 32, 32)))
            .with_material(Material::Sky(self.gradient));

        let sun = SceneNode::new("sun", NodeKind::Sun, Arc::new(uv_sphere(SUN_RADIUS, 64, 64)))
            .with_material(Material::Unlit {
                color: rgb(0xffd700),
            })
            .with_transform(Transform::from_position(self.sun_position));

        let ground = SceneNode::new(
            "ground",
            NodeKind::Ground,
            Arc::new(plane(GROUND_SIZE, GROUND_SIZE)),
        )
        .with_material(Material::Lambert {
            color: rgb(0x228b22),
        })
        .with_transform(
            Transform::from_position(Vec3::new(0.0, GROUND_HEIGHT, 0.0))
                .with_rotation(Vec3::new(-FRAC_PI_2, 0.0, 0.0)),
        );

        let nodes = BackdropNodes {
            sky: scene.attach(sky),
            sun: scene.attach(sun),
            ground: scene.attach(ground),
        };
        scene.add_light(DirectionalLight {
            name: SUN_LIGHT.to_string(),
            position: self.sun_position,
            color: rgb(0xffd700),
            intensity: 1.0,
        });
        apply_visibility(scene, &nodes, self.visible);
        self.nodes = Some(nodes);
    }

    /// Flips visibility of the sky, sun and ground together.
    pub fn toggle(&mut self, scene: &mut Scene) -> bool {
        self.visible = !self.visible;
        if let Some(nodes) = &self.nodes {
            apply_visibility(scene, nodes, self.visible);
        }
        self.visible
    }

    pub fn is_created(&self) -> bool {
        self.nodes.is_some()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

fn apply_visibility(scene: &mut Scene, nodes: &BackdropNodes, visible: bool) {
    for id in [nodes.sky, nodes.sun, nodes.ground] {
        if let Some(node) = scene.get_mut(id) {
            node.visible = visible;
        }
    }
}
