use std::sync::Arc;

use log::{debug, error, info};
use parking_lot::{RwLock, RwLockReadGuard};

use crate::backdrop::Backdrop;
use crate::config::ViewerConfig;
use crate::controls::{validate_selection, Background, ControlAction, LightSlider, SelectionError};
use crate::loader::{
    LoadOrigin, LoadOutcome, LoadRequest, LoadSource, LoadTracker, ModelInfo, ModelPlacement,
};
use crate::model_slot::ModelSlot;
use crate::scene::{DirectionalLight, NodeId, Scene, Transform};

pub const KEY_LIGHT: &str = "key";

/// What happened to a finished load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// The model became current.
    Attached(NodeId),
    /// A newer request was issued after this one; the result was dropped.
    Superseded,
    /// Loading failed; the scene is unchanged.
    Failed,
}

/// All mutable viewer state, mutated only by control handlers and load
/// completions.
#[derive(Debug)]
pub struct ViewerState {
    scene: Scene,
    slot: ModelSlot,
    model_info: Option<ModelInfo>,
    slider: LightSlider,
    background: Background,
    backdrop: Backdrop,
    loads: LoadTracker,
    placement: ModelPlacement,
    accepted_extension: String,
}

impl ViewerState {
    pub fn new(config: &ViewerConfig) -> Self {
        let slider = config.light.slider();
        let mut scene = Scene::new();
        scene.add_light(DirectionalLight {
            name: KEY_LIGHT.to_string(),
            position: config.light.position,
            color: config.light.color,
            intensity: slider.value(),
        });
        let mut backdrop = Backdrop::new(config.sky);
        if config.backdrop {
            backdrop.create(&mut scene);
        }
        Self {
            scene,
            slot: ModelSlot::new(),
            model_info: None,
            slider,
            background: Background::new(config.dark_background),
            backdrop,
            loads: LoadTracker::new(),
            placement: config.placement,
            accepted_extension: config.accepted_extension.clone(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn current_model(&self) -> Option<NodeId> {
        self.slot.current()
    }

    pub fn model_transform(&self) -> Option<Transform> {
        self.slot.transform(&self.scene)
    }

    pub fn model_info(&self) -> Option<&ModelInfo> {
        self.model_info.as_ref()
    }

    pub fn light_intensity(&self) -> f32 {
        self.slider.value()
    }

    pub fn slider(&self) -> &LightSlider {
        &self.slider
    }

    pub fn background(&self) -> Background {
        self.background
    }

    pub fn backdrop(&self) -> &Backdrop {
        &self.backdrop
    }

    pub fn accepted_extension(&self) -> &str {
        &self.accepted_extension
    }

    /// Adds the sky, sun and ground if they are not present yet.
    pub fn create_backdrop(&mut self) {
        self.backdrop.create(&mut self.scene);
    }

    /// Applies a control action. Returns `false` when it had no effect.
    pub fn apply(&mut self, action: &ControlAction) -> bool {
        match action {
            ControlAction::Rotate(axis) => self.slot.rotate(&mut self.scene, *axis),
            ControlAction::ResetModel => self.slot.reset(&mut self.scene),
            ControlAction::LightInput(raw) => match self.slider.input(raw) {
                Some(_) => {
                    self.sync_light();
                    true
                }
                None => {
                    debug!("ignoring light slider value {raw:?}");
                    false
                }
            },
            ControlAction::NudgeLight(steps) => {
                self.slider.nudge(*steps);
                self.sync_light();
                true
            }
            ControlAction::ToggleBackground => {
                self.background.toggle();
                true
            }
            ControlAction::ToggleBackdrop => {
                self.backdrop.toggle(&mut self.scene);
                true
            }
        }
    }

    fn sync_light(&mut self) {
        let intensity = self.slider.value();
        if let Some(light) = self.scene.light_mut(KEY_LIGHT) {
            light.intensity = intensity;
        }
    }

    /// Issues a request that supersedes every earlier one.
    pub fn begin_load(&mut self, source: LoadSource, origin: LoadOrigin) -> LoadRequest {
        LoadRequest {
            ticket: self.loads.issue(),
            origin,
            source,
        }
    }

    /// Validates a picked file and turns it into an upload request.
    pub fn select_file(
        &mut self,
        name: Option<&str>,
        source: LoadSource,
    ) -> Result<LoadRequest, SelectionError> {
        validate_selection(name, &self.accepted_extension)?;
        Ok(self.begin_load(source, LoadOrigin::Upload))
    }

    /// Applies a finished load to the scene.
    pub fn complete_load(&mut self, outcome: LoadOutcome) -> LoadStatus {
        if !self.loads.settle(outcome.ticket) {
            debug!("discarding superseded load {}", outcome.ticket);
            return LoadStatus::Superseded;
        }
        match outcome.result {
            Ok(model) => {
                info!(
                    "loaded {} ({} vertices, {} triangles)",
                    model.info.label, model.info.vertex_count, model.info.triangle_count
                );
                let info = model.info.clone();
                let node = model.into_node(&self.placement, outcome.origin);
                let id = self.slot.replace(&mut self.scene, node);
                self.model_info = Some(info);
                LoadStatus::Attached(id)
            }
            Err(err) => {
                error!("Error loading the model: {:#}", anyhow::Error::from(err));
                LoadStatus::Failed
            }
        }
    }
}

/// Cloneable handle to the viewer state shared by the event loop and the
/// control surfaces.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<RwLock<ViewerState>>,
}

impl SharedState {
    pub fn new(state: ViewerState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, ViewerState> {
        self.inner.read()
    }

    /// Runs `f` with exclusive access to the state.
    pub fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut ViewerState) -> R,
    {
        f(&mut self.inner.write())
    }
}
