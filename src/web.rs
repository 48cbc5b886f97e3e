#![cfg(target_arch = "wasm32")]

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{Document, HtmlCanvasElement, HtmlElement, HtmlInputElement};
use winit::dpi::LogicalSize;
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::platform::web::{EventLoopExtWebSys, WindowBuilderExtWebSys};
use winit::window::WindowBuilder;

use crate::app::{dispatch_load, start_state, ViewerEvent};
use crate::config::ViewerConfig;
use crate::controls::{ControlAction, FOOTER_TEXT, FOOTER_URL};
use crate::loader::{LoadError, LoadOutcome, LoadSink, LoadSource};
use crate::model_slot::Axis;
use crate::state::SharedState;
use crate::{Renderer, Viewer};

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
}

/// Mounts the viewer on the canvas with id `canvas_id` and builds the
/// control panels around it. `sky` creates the backdrop at startup.
#[wasm_bindgen]
pub fn start_viewer(canvas_id: String, sky: bool) -> Result<(), JsValue> {
    let config = ViewerConfig {
        backdrop: sky,
        ..ViewerConfig::default()
    };
    spawn_local(async move {
        if let Err(err) = run_viewer(canvas_id, config).await {
            log::error!("viewer error: {err:?}");
        }
    });
    Ok(())
}

async fn run_viewer(canvas_id: String, config: ViewerConfig) -> Result<()> {
    let browser = web_sys::window().context("window not available")?;
    let document = browser.document().context("document not available")?;
    let canvas: HtmlCanvasElement = document
        .get_element_by_id(&canvas_id)
        .with_context(|| format!("canvas element {canvas_id} not found"))?
        .dyn_into()
        .map_err(|_| anyhow!("element {canvas_id} is not a canvas"))?;
    set_styles(&canvas, &[("width", "100vw"), ("height", "100vh"), ("display", "block")])?;

    let width = browser.inner_width().map_err(js_error)?.as_f64().unwrap_or(1280.0);
    let height = browser.inner_height().map_err(js_error)?.as_f64().unwrap_or(720.0);

    let event_loop = EventLoopBuilder::<ViewerEvent>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("sudo3d")
            .with_canvas(Some(canvas))
            .with_inner_size(LogicalSize::new(width, height))
            .build(&event_loop)
            .map_err(|err| anyhow!("failed to create window: {err}"))?,
    );

    let proxy = event_loop.create_proxy();
    let state = start_state(&config, proxy.clone());
    let renderer = Renderer::new(Arc::clone(&window)).await?;
    build_controls(&document, &state, &proxy)?;

    let mut viewer = Viewer::new(renderer, &config, state, proxy);
    event_loop.spawn(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);
        if let Err(err) = viewer.handle_event(event, elwt) {
            log::error!("Error: {err:#}");
            elwt.exit();
        }
    });
    Ok(())
}

fn js_error(err: JsValue) -> anyhow::Error {
    anyhow!("{err:?}")
}

fn set_styles(element: &HtmlElement, styles: &[(&str, &str)]) -> Result<()> {
    let style = element.style();
    for (property, value) in styles {
        style.set_property(property, value).map_err(js_error)?;
    }
    Ok(())
}

fn create<T: JsCast>(document: &Document, tag: &str) -> Result<T> {
    document
        .create_element(tag)
        .map_err(js_error)?
        .dyn_into::<T>()
        .map_err(|_| anyhow!("<{tag}> has an unexpected element type"))
}

fn on<F>(target: &web_sys::EventTarget, event: &str, handler: F) -> Result<()>
where
    F: FnMut(web_sys::Event) + 'static,
{
    let closure = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
    target
        .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        .map_err(js_error)?;
    // Listeners live as long as the page.
    closure.forget();
    Ok(())
}

fn panel(document: &Document, styles: &[(&str, &str)]) -> Result<HtmlElement> {
    let panel: HtmlElement = create(document, "div")?;
    set_styles(&panel, &[("position", "absolute"), ("display", "flex"), ("gap", "8px")])?;
    set_styles(&panel, styles)?;
    Ok(panel)
}

fn action_button(
    document: &Document,
    parent: &HtmlElement,
    label: &str,
    state: &SharedState,
    action: ControlAction,
    after: impl Fn(&SharedState) + 'static,
) -> Result<()> {
    let button: HtmlElement = create(document, "button")?;
    button.set_text_content(Some(label));
    let state = state.clone();
    on(&button, "click", move |_| {
        state.update(|state| state.apply(&action));
        after(&state);
    })?;
    parent.append_child(&button).map_err(js_error)?;
    Ok(())
}

fn build_controls(
    document: &Document,
    state: &SharedState,
    proxy: &EventLoopProxy<ViewerEvent>,
) -> Result<()> {
    let body = document.body().context("document has no body")?;
    let footer: HtmlElement = create(document, "footer")?;
    footer.set_text_content(Some(FOOTER_TEXT));
    set_styles(
        &footer,
        &[
            ("position", "absolute"),
            ("bottom", "10px"),
            ("width", "100%"),
            ("text-align", "center"),
            ("font-family", "sans-serif"),
        ],
    )?;
    apply_page_colors(&body, &footer, state)?;
    on(&footer, "click", |_| {
        if let Err(err) = open_footer_link() {
            log::warn!("unable to open {FOOTER_URL}: {err:#}");
        }
    })?;

    let rotate = panel(document, &[("top", "10px"), ("left", "10px")])?;
    for (label, axis) in [
        ("Rotate X", Axis::X),
        ("Rotate Y", Axis::Y),
        ("Rotate Z", Axis::Z),
    ] {
        action_button(document, &rotate, label, state, ControlAction::Rotate(axis), |_| {})?;
    }
    action_button(document, &rotate, "Reset", state, ControlAction::ResetModel, |_| {})?;

    let light = panel(document, &[("top", "50px"), ("left", "10px")])?;
    let slider: HtmlInputElement = create(document, "input")?;
    let range = *state.read().slider();
    slider.set_type("range");
    slider.set_min(&range.min.to_string());
    slider.set_max(&range.max.to_string());
    slider.set_step(&range.step.to_string());
    slider.set_value(&range.value().to_string());
    {
        let state = state.clone();
        let input = slider.clone();
        on(&slider, "input", move |_| {
            let action = ControlAction::LightInput(input.value());
            state.update(|state| state.apply(&action));
        })?;
    }
    light.append_child(&slider).map_err(js_error)?;

    let upload = panel(document, &[("top", "10px"), ("right", "10px")])?;
    let picker: HtmlInputElement = create(document, "input")?;
    picker.set_type("file");
    picker.set_accept(state.read().accepted_extension());
    {
        let state = state.clone();
        let proxy = proxy.clone();
        let input = picker.clone();
        on(&picker, "change", move |_| {
            select_file(&state, &proxy, &input);
            input.set_value("");
        })?;
    }
    upload.append_child(&picker).map_err(js_error)?;

    let toggles = panel(document, &[("top", "50px"), ("right", "10px")])?;
    {
        let body = body.clone();
        let footer = footer.clone();
        action_button(
            document,
            &toggles,
            "Toggle Background",
            state,
            ControlAction::ToggleBackground,
            move |state| {
                if let Err(err) = apply_page_colors(&body, &footer, state) {
                    log::warn!("unable to restyle page: {err:#}");
                }
            },
        )?;
    }
    action_button(
        document,
        &toggles,
        "Toggle Sky",
        state,
        ControlAction::ToggleBackdrop,
        |_| {},
    )?;

    for element in [&rotate, &light, &upload, &toggles, &footer] {
        body.append_child(element).map_err(js_error)?;
    }
    Ok(())
}

fn apply_page_colors(body: &HtmlElement, footer: &HtmlElement, state: &SharedState) -> Result<()> {
    let background = state.read().background();
    set_styles(body, &[("margin", "0"), ("background-color", background.css_color())])?;
    set_styles(footer, &background.footer_styles())
}

fn open_footer_link() -> Result<()> {
    let browser = web_sys::window().context("window not available")?;
    browser.location().set_href(FOOTER_URL).map_err(js_error)
}

fn select_file(state: &SharedState, proxy: &EventLoopProxy<ViewerEvent>, input: &HtmlInputElement) {
    let file = input.files().and_then(|files| files.get(0));
    let name = file.as_ref().map(|file| file.name());
    // The ticket is issued now so a later pick supersedes this one even if
    // its bytes arrive first.
    let placeholder = LoadSource::Location(name.clone().unwrap_or_default());
    let request = match state.update(|state| state.select_file(name.as_deref(), placeholder)) {
        Ok(request) => request,
        Err(err) => {
            log::info!("ignoring file selection: {err}");
            return;
        }
    };
    let (Some(file), Some(name)) = (file, name) else {
        return;
    };

    let proxy = proxy.clone();
    spawn_local(async move {
        match read_file(&file).await {
            Ok(bytes) => {
                let mut request = request;
                request.source = LoadSource::buffer(name, bytes);
                dispatch_load(request, proxy);
            }
            Err(message) => proxy.deliver(LoadOutcome {
                ticket: request.ticket,
                origin: request.origin,
                result: Err(LoadError::Fetch {
                    location: name,
                    message,
                }),
            }),
        }
    });
}

async fn read_file(file: &web_sys::File) -> Result<Vec<u8>, String> {
    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|err| format!("{err:?}"))?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}
