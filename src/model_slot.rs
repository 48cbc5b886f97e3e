use std::f32::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

use crate::scene::{NodeId, Scene, SceneNode, Transform};

/// Rotation axis of the model's Euler angles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Holds the single model currently shown in the scene.
#[derive(Debug, Default)]
pub struct ModelSlot {
    current: Option<NodeId>,
    initial: Option<Transform>,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detaches the current model, attaches `node` and snapshots its transform.
    pub fn replace(&mut self, scene: &mut Scene, node: SceneNode) -> NodeId {
        if let Some(previous) = self.current.take() {
            scene.detach(previous);
        }
        self.initial = Some(node.transform);
        let id = scene.attach(node);
        self.current = Some(id);
        id
    }

    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    pub fn initial_transform(&self) -> Option<Transform> {
        self.initial
    }

    pub fn transform(&self, scene: &Scene) -> Option<Transform> {
        scene.get(self.current?).map(|node| node.transform)
    }

    /// Adds a quarter turn around `axis`. Returns `false` without a model.
    pub fn rotate(&self, scene: &mut Scene, axis: Axis) -> bool {
        let Some(node) = self.current.and_then(|id| scene.get_mut(id)) else {
            return false;
        };
        let rotation = &mut node.transform.rotation;
        match axis {
            Axis::X => rotation.x += FRAC_PI_2,
            Axis::Y => rotation.y += FRAC_PI_2,
            Axis::Z => rotation.z += FRAC_PI_2,
        }
        true
    }

    /// Restores the transform recorded when the model was attached.
    pub fn reset(&self, scene: &mut Scene) -> bool {
        let (Some(id), Some(initial)) = (self.current, self.initial) else {
            return false;
        };
        match scene.get_mut(id) {
            Some(node) => {
                node.transform = initial;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::plane;
    use crate::scene::NodeKind;
    use glam::Vec3;
    use std::sync::Arc;

    fn model(name: &str) -> SceneNode {
        SceneNode::new(name, NodeKind::Model, Arc::new(plane(1.0, 1.0))).with_transform(
            Transform::from_position(Vec3::new(0.0, 0.0, 2.0))
                .with_rotation(Vec3::new(0.0, FRAC_PI_2, 0.0)),
        )
    }

    #[test]
    fn sequential_replacements_keep_a_single_model() {
        let mut scene = Scene::new();
        let mut slot = ModelSlot::new();
        let mut last = None;
        for i in 0..5 {
            last = Some(slot.replace(&mut scene, model(&format!("model-{i}"))));
        }
        assert_eq!(scene.count_kind(NodeKind::Model), 1);
        assert_eq!(slot.current(), last);
        assert_eq!(scene.get(last.unwrap()).unwrap().name, "model-4");
    }

    #[test]
    fn rotation_accumulates_without_wrapping() {
        let mut scene = Scene::new();
        let mut slot = ModelSlot::new();
        slot.replace(&mut scene, model("m"));
        for _ in 0..7 {
            assert!(slot.rotate(&mut scene, Axis::X));
        }
        slot.rotate(&mut scene, Axis::Z);
        let transform = slot.transform(&scene).unwrap();
        assert!((transform.rotation.x - 7.0 * FRAC_PI_2).abs() < 1e-5);
        assert!((transform.rotation.y - FRAC_PI_2).abs() < 1e-6);
        assert!((transform.rotation.z - FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn reset_restores_initial_transform_exactly() {
        let mut scene = Scene::new();
        let mut slot = ModelSlot::new();
        slot.replace(&mut scene, model("m"));
        let initial = slot.initial_transform().unwrap();
        for axis in [Axis::X, Axis::Y, Axis::Z, Axis::Y] {
            slot.rotate(&mut scene, axis);
        }
        assert_ne!(slot.transform(&scene), Some(initial));
        assert!(slot.reset(&mut scene));
        assert_eq!(slot.transform(&scene), Some(initial));
    }

    #[test]
    fn controls_without_model_are_noops() {
        let mut scene = Scene::new();
        let slot = ModelSlot::new();
        assert!(!slot.rotate(&mut scene, Axis::Y));
        assert!(!slot.reset(&mut scene));
        assert!(scene.is_empty());
    }
}
