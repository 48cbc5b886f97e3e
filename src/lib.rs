//! Building blocks of the sudo3d model viewer.
//!
//! The viewer shows one binary glTF model at a time over a dark or light
//! background, optionally surrounded by a decorative sky, sun and ground.
//! All scene mutation goes through [`ViewerState`], which keeps the crate
//! usable headless; the window host in [`app`] and the browser bindings in
//! `web` only translate platform events into its operations.

pub mod app;
pub mod backdrop;
pub mod camera;
pub mod config;
pub mod controls;
pub mod geometry;
pub mod input;
pub mod loader;
pub mod model_slot;
pub mod render;
pub mod scene;
pub mod state;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use app::{Viewer, ViewerEvent};
pub use backdrop::{Backdrop, SkyGradient};
pub use camera::{OrbitCamera, OrbitSettings};
pub use config::ViewerConfig;
pub use controls::{Background, ControlAction, LightSlider, SelectionError};
pub use geometry::{Aabb, MeshData};
pub use loader::{LoadError, LoadOrigin, LoadOutcome, LoadSource, ModelInfo};
pub use model_slot::{Axis, ModelSlot};
pub use render::{CameraParams, LightParams, Renderer};
pub use scene::{Scene, SceneNode, Transform};
pub use state::{LoadStatus, SharedState, ViewerState};
