//! Scene host shared by the desktop binary and the browser build.
//!
//! [`Viewer`] owns the renderer and the orbit camera, feeds window events to
//! the shared [`ViewerState`] and draws one frame per redraw request. Model
//! loads run off the event loop and come back as [`ViewerEvent::Loaded`].

use anyhow::{anyhow, Result};
use glam::Vec2;
use log::{error, info, warn};
use winit::event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{EventLoopProxy, EventLoopWindowTarget};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::camera::OrbitCamera;
use crate::config::ViewerConfig;
use crate::controls::{ControlAction, SelectionError};
use crate::input::{key_binding, Key, PointerButton, PointerDrag, PointerState};
use crate::loader::{spawn_load, LoadOrigin, LoadOutcome, LoadRequest, LoadSink, LoadSource};
use crate::render::{LightParams, Renderer};
use crate::state::{LoadStatus, SharedState, ViewerState};

/// Lines scrolled per wheel notch when the platform reports pixels.
const PIXELS_PER_LINE: f32 = 100.0;

/// Custom events posted to the viewer's event loop.
#[derive(Debug)]
pub enum ViewerEvent {
    Loaded(LoadOutcome),
}

impl LoadSink for EventLoopProxy<ViewerEvent> {
    fn deliver(&self, outcome: LoadOutcome) {
        if self.send_event(ViewerEvent::Loaded(outcome)).is_err() {
            warn!("event loop closed before the model finished loading");
        }
    }
}

/// Starts a load and logs when no worker could be started for it.
pub fn dispatch_load<S>(request: LoadRequest, sink: S)
where
    S: LoadSink + Send,
{
    let label = request.source.label().to_string();
    if let Err(err) = spawn_load(request, sink) {
        error!("unable to start loading {label}: {err}");
    }
}

/// Validates a picked file and, when accepted, starts loading it.
pub fn submit_selection<S>(
    state: &SharedState,
    name: Option<&str>,
    source: LoadSource,
    sink: S,
) -> Result<(), SelectionError>
where
    S: LoadSink + Send,
{
    let request = state.update(|state| state.select_file(name, source))?;
    info!("loading selected file {}", request.source.label());
    dispatch_load(request, sink);
    Ok(())
}

/// Creates the shared state and requests the default model.
pub fn start_state<S>(config: &ViewerConfig, sink: S) -> SharedState
where
    S: LoadSink + Send,
{
    let state = SharedState::new(ViewerState::new(config));
    let request = state.update(|state| {
        state.begin_load(
            LoadSource::Location(config.default_model.clone()),
            LoadOrigin::Startup,
        )
    });
    dispatch_load(request, sink);
    state
}

/// Window-side half of the viewer.
pub struct Viewer {
    renderer: Renderer,
    camera: OrbitCamera,
    state: SharedState,
    pointer: PointerState,
    proxy: EventLoopProxy<ViewerEvent>,
}

impl Viewer {
    pub fn new(
        renderer: Renderer,
        config: &ViewerConfig,
        state: SharedState,
        proxy: EventLoopProxy<ViewerEvent>,
    ) -> Self {
        Self {
            renderer,
            camera: OrbitCamera::new(config.camera),
            state,
            pointer: PointerState::new(),
            proxy,
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn handle_event(
        &mut self,
        event: Event<ViewerEvent>,
        elwt: &EventLoopWindowTarget<ViewerEvent>,
    ) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if window_id == self.renderer.window_id() => {
                self.handle_window_event(event, elwt)?;
            }
            Event::UserEvent(ViewerEvent::Loaded(outcome)) => {
                let status = self.state.update(|state| state.complete_load(outcome));
                if let LoadStatus::Attached(_) = status {
                    self.renderer.window().request_redraw();
                }
            }
            Event::AboutToWait => {
                self.renderer.window().request_redraw();
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_window_event(
        &mut self,
        event: WindowEvent,
        elwt: &EventLoopWindowTarget<ViewerEvent>,
    ) -> Result<()> {
        match event {
            WindowEvent::CloseRequested => elwt.exit(),
            WindowEvent::Resized(size) => self.renderer.resize(size),
            WindowEvent::KeyboardInput { event, .. } => self.handle_keyboard(&event, elwt),
            WindowEvent::MouseInput { state, button, .. } => {
                let Some(button) = map_mouse_button(button) else {
                    return Ok(());
                };
                match state {
                    ElementState::Pressed => self.pointer.press(button),
                    ElementState::Released => self.pointer.release(button),
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let height = self.renderer.size().height as f32;
                match self
                    .pointer
                    .moved(Vec2::new(position.x as f32, position.y as f32))
                {
                    Some(PointerDrag::Orbit(delta)) => self.camera.rotate(delta, height),
                    Some(PointerDrag::Pan(delta)) => self.camera.pan(delta, height),
                    None => {}
                }
            }
            WindowEvent::CursorLeft { .. } => self.pointer.leave(),
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
                };
                self.camera.zoom(steps);
            }
            WindowEvent::DroppedFile(path) => {
                let name = path.file_name().and_then(|name| name.to_str());
                let source = LoadSource::Location(path.to_string_lossy().into_owned());
                if let Err(err) =
                    submit_selection(&self.state, name, source, self.proxy.clone())
                {
                    warn!("ignored dropped file {}: {err}", path.display());
                }
            }
            WindowEvent::RedrawRequested => self.redraw()?,
            _ => {}
        }
        Ok(())
    }

    fn handle_keyboard(&mut self, event: &KeyEvent, elwt: &EventLoopWindowTarget<ViewerEvent>) {
        if event.state != ElementState::Pressed {
            return;
        }
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        match map_keycode(code) {
            Some(Key::Escape) => elwt.exit(),
            Some(key) => {
                if let Some(action) = key_binding(key) {
                    self.apply(&action);
                }
            }
            None => {}
        }
    }

    /// Applies a control action to the shared state.
    pub fn apply(&self, action: &ControlAction) -> bool {
        self.state.update(|state| state.apply(action))
    }

    fn redraw(&mut self) -> Result<()> {
        self.camera.update();
        let camera = self.camera.params(self.renderer.aspect());
        let state = self.state.read();
        self.renderer
            .update_globals(&camera, &LightParams::from_scene(state.scene()));
        let result = self
            .renderer
            .render(state.scene(), state.background().clear_color());
        drop(state);

        match result {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.renderer.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(anyhow!("GPU is out of memory"));
            }
            Err(wgpu::SurfaceError::Timeout) => {
                info!("Surface timeout; retrying next frame");
            }
            Err(err) => {
                warn!("Surface error: {err}");
            }
        }
        Ok(())
    }
}

fn map_mouse_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        MouseButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}

fn map_keycode(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::KeyX => Key::Character('X'),
        KeyCode::KeyY => Key::Character('Y'),
        KeyCode::KeyZ => Key::Character('Z'),
        KeyCode::KeyR => Key::Character('R'),
        KeyCode::KeyB => Key::Character('B'),
        KeyCode::KeyK => Key::Character('K'),
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::Escape => Key::Escape,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_slot::Axis;

    #[test]
    fn physical_keys_map_to_bindings() {
        let action = map_keycode(KeyCode::KeyX).and_then(key_binding);
        assert_eq!(action, Some(ControlAction::Rotate(Axis::X)));
        assert_eq!(map_keycode(KeyCode::Escape), Some(Key::Escape));
        assert_eq!(map_keycode(KeyCode::KeyQ), None);
    }

    #[test]
    fn only_three_mouse_buttons_drive_the_camera() {
        assert_eq!(
            map_mouse_button(MouseButton::Left),
            Some(PointerButton::Primary)
        );
        assert_eq!(map_mouse_button(MouseButton::Other(7)), None);
    }
}
