mod common;
mod gpu;
mod shared;

pub use common::{CameraParams, LightParams, MAX_LIGHTS};
pub use gpu::Renderer;
