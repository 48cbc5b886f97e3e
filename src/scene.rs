use std::sync::Arc;

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::backdrop::SkyGradient;
use crate::geometry::MeshData;

/// Position, Euler rotation (XYZ order, radians) and scale of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: default_scale(),
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        )
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation(), self.position)
    }
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

/// Shading applied to a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Diffuse shading from the scene's directional lights.
    Lambert { color: Vec3 },
    /// Flat color, unaffected by lights.
    Unlit { color: Vec3 },
    /// Vertical gradient computed from the world position.
    Sky(SkyGradient),
}

/// Role of a node in the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Model,
    Sky,
    Sun,
    Ground,
}

/// A renderable node: a mesh with a material and a transform.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub mesh: Arc<MeshData>,
    pub material: Material,
    pub transform: Transform,
    pub visible: bool,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind, mesh: Arc<MeshData>) -> Self {
        Self {
            name: name.into(),
            kind,
            mesh,
            material: Material::Lambert { color: Vec3::ONE },
            transform: Transform::default(),
            visible: true,
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

/// Handle to a node attached to a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

/// Directional light shining from `position` towards the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    pub name: String,
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl DirectionalLight {
    /// Unit vector pointing from the surface towards the light.
    pub fn direction(&self) -> Vec3 {
        self.position.normalize_or_zero()
    }
}

/// Flat scene graph holding attached nodes and directional lights.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<(NodeId, SceneNode)>,
    lights: Vec<DirectionalLight>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its handle.
    pub fn attach(&mut self, node: SceneNode) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.push((id, node));
        id
    }

    /// Removes a node, returning it if it was attached.
    pub fn detach(&mut self, id: NodeId) -> Option<SceneNode> {
        let index = self.nodes.iter().position(|(node_id, _)| *node_id == id)?;
        Some(self.nodes.remove(index).1)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|(node_id, _)| *node_id == id)
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes
            .iter()
            .find(|(node_id, _)| *node_id == id)
            .map(|(_, node)| node)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes
            .iter_mut()
            .find(|(node_id, _)| *node_id == id)
            .map(|(_, node)| node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|(_, node)| node.kind == kind).count()
    }

    pub fn add_light(&mut self, light: DirectionalLight) {
        self.lights.push(light);
    }

    pub fn lights(&self) -> &[DirectionalLight] {
        &self.lights
    }

    pub fn light_mut(&mut self, name: &str) -> Option<&mut DirectionalLight> {
        self.lights.iter_mut().find(|light| light.name == name)
    }

    pub fn light(&self, name: &str) -> Option<&DirectionalLight> {
        self.lights.iter().find(|light| light.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::plane;
    use std::f32::consts::FRAC_PI_2;

    fn make_node(name: &str) -> SceneNode {
        SceneNode::new(name, NodeKind::Model, Arc::new(plane(1.0, 1.0)))
    }

    #[test]
    fn attach_and_detach_nodes() {
        let mut scene = Scene::new();
        let cube = scene.attach(make_node("Cube"));
        let sphere = scene.attach(make_node("Sphere"));
        assert_ne!(cube, sphere);
        assert_eq!(scene.len(), 2);

        let removed = scene.detach(cube).unwrap();
        assert_eq!(removed.name, "Cube");
        assert!(!scene.contains(cube));
        assert!(scene.detach(cube).is_none());
        assert_eq!(scene.get(sphere).unwrap().name, "Sphere");
    }

    #[test]
    fn transform_matrix_applies_euler_xyz() {
        let transform = Transform::from_position(Vec3::new(0.0, 0.0, 2.0))
            .with_rotation(Vec3::new(0.0, FRAC_PI_2, 0.0));
        let point = transform.matrix().transform_point3(Vec3::X);
        assert!((point - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn light_lookup_by_name() {
        let mut scene = Scene::new();
        scene.add_light(DirectionalLight {
            name: "key".to_string(),
            position: Vec3::new(5.0, 5.0, 5.0),
            color: Vec3::ONE,
            intensity: 1.0,
        });
        scene.light_mut("key").unwrap().intensity = 3.0;
        assert_eq!(scene.light("key").unwrap().intensity, 3.0);
        assert!(scene.light("missing").is_none());
    }
}
