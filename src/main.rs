#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = native::run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::any::Any;
    use std::fmt;
    use std::panic::{self, AssertUnwindSafe};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use clap::Parser;
    use log::info;
    use pollster::block_on;
    use winit::dpi::LogicalSize;
    use winit::event_loop::{ControlFlow, EventLoopBuilder};
    use winit::window::WindowBuilder;

    use sudo3d::app::start_state;
    use sudo3d::loader::{load_blocking, LoadRequest};
    use sudo3d::{
        ControlAction, LoadOrigin, LoadOutcome, LoadSource, Renderer, Viewer, ViewerConfig,
        ViewerEvent, ViewerState,
    };

    /// Picked up from the working directory when `--config` is not given.
    const DEFAULT_CONFIG: &str = "sudo3d.xml";

    #[derive(Parser, Debug)]
    #[command(name = "sudo3d")]
    #[command(about = "View a binary glTF model", long_about = None)]
    struct Cli {
        /// Model loaded at startup (defaults to the configured model)
        model: Option<PathBuf>,

        /// XML viewer configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Create the sky, sun and ground backdrop
        #[arg(long)]
        sky: bool,

        /// Load and print the final state without opening a window
        #[arg(long)]
        summary_only: bool,

        /// File picked after startup, as if chosen in the file picker (headless only)
        #[arg(long = "select", value_name = "FILE")]
        selections: Vec<PathBuf>,

        /// Control applied after loading: rotate-x, rotate-y, rotate-z, reset,
        /// background, sky, light-up, light-down or light=VALUE (headless only)
        #[arg(long = "action", value_name = "NAME", value_parser = parse_action)]
        actions: Vec<ControlAction>,
    }

    fn parse_action(name: &str) -> Result<ControlAction, String> {
        ControlAction::from_name(name).ok_or_else(|| format!("unknown action {name}"))
    }

    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        let config = load_config(&cli)?;

        if cli.summary_only {
            run_headless(&config, &cli)
        } else {
            match run_interactive(&config) {
                Ok(()) => Ok(()),
                Err(err) => {
                    if err.downcast_ref::<WindowInitError>().is_some() {
                        eprintln!(
                            "{err}. Falling back to --summary-only mode \
                             (set DISPLAY or install X11 libs to enable rendering)."
                        );
                        run_headless(&config, &cli)
                    } else {
                        Err(err)
                    }
                }
            }
        }
    }

    fn load_config(cli: &Cli) -> Result<ViewerConfig> {
        let mut config = match &cli.config {
            Some(path) => ViewerConfig::load(path)?,
            None if Path::new(DEFAULT_CONFIG).is_file() => {
                info!("using {DEFAULT_CONFIG}");
                ViewerConfig::load(DEFAULT_CONFIG)?
            }
            None => ViewerConfig::default(),
        };
        if let Some(model) = &cli.model {
            config.default_model = model.to_string_lossy().into_owned();
        }
        if cli.sky {
            config.backdrop = true;
        }
        Ok(config)
    }

    fn run_headless(config: &ViewerConfig, cli: &Cli) -> Result<()> {
        let mut state = ViewerState::new(config);
        let request = state.begin_load(
            LoadSource::Location(config.default_model.clone()),
            LoadOrigin::Startup,
        );
        finish_load(&mut state, request);

        for file in &cli.selections {
            let name = file.file_name().and_then(|name| name.to_str());
            let source = LoadSource::Location(file.to_string_lossy().into_owned());
            match state.select_file(name, source) {
                Ok(request) => finish_load(&mut state, request),
                Err(err) => println!("Ignored file selection {}: {err}", file.display()),
            }
        }

        for action in &cli.actions {
            if !state.apply(action) {
                println!("Action {action:?} had no effect");
            }
        }

        print_summary(&state);
        Ok(())
    }

    fn finish_load(state: &mut ViewerState, request: LoadRequest) {
        let result = load_blocking(&request.source);
        state.complete_load(LoadOutcome {
            ticket: request.ticket,
            origin: request.origin,
            result,
        });
    }

    fn run_interactive(config: &ViewerConfig) -> Result<()> {
        let default_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let event_loop = panic::catch_unwind(AssertUnwindSafe(|| {
            EventLoopBuilder::<ViewerEvent>::with_user_event().build()
        }));
        panic::set_hook(default_hook);
        let event_loop = event_loop
            .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
            .map_err(|err| WindowInitError::from_error("event loop", err))?;
        let window = Arc::new(
            WindowBuilder::new()
                .with_title("sudo3d")
                .with_inner_size(LogicalSize::new(1280.0, 720.0))
                .build(&event_loop)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );

        let renderer = block_on(Renderer::new(Arc::clone(&window)))?;
        let proxy = event_loop.create_proxy();
        let state = start_state(config, proxy.clone());
        let mut viewer = Viewer::new(renderer, config, state, proxy);

        let mut last_error = None;
        event_loop
            .run(|event, elwt| {
                elwt.set_control_flow(ControlFlow::Poll);
                if let Err(err) = viewer.handle_event(event, elwt) {
                    last_error = Some(err);
                    elwt.exit();
                }
            })
            .context("event loop terminated abnormally")?;

        print_summary(&viewer.state().read());

        match last_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn print_summary(state: &ViewerState) {
        match (state.model_info(), state.model_transform()) {
            (Some(info), Some(transform)) => {
                println!(
                    "Loaded model {} ({} vertices, {} triangles, {} bytes)",
                    info.label, info.vertex_count, info.triangle_count, info.byte_len
                );
                println!(
                    " - position=({:.2}, {:.2}, {:.2}) rotation=({:.2}, {:.2}, {:.2})",
                    transform.position.x,
                    transform.position.y,
                    transform.position.z,
                    transform.rotation.x,
                    transform.rotation.y,
                    transform.rotation.z
                );
            }
            _ => println!("No model loaded"),
        }
        println!("Light intensity: {:.1}", state.light_intensity());
        println!("Background: {}", state.background().css_color());
        let backdrop = state.backdrop();
        let backdrop = match (backdrop.is_created(), backdrop.is_visible()) {
            (false, _) => "off",
            (true, true) => "visible",
            (true, false) => "hidden",
        };
        println!("Backdrop: {backdrop}");
        println!("Scene nodes: {}", state.scene().len());
    }

    #[derive(Debug)]
    struct WindowInitError {
        message: String,
    }

    impl WindowInitError {
        fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
            Self {
                message: format!("failed to initialize {stage}: {}", panic_message(panic)),
            }
        }

        fn from_error(stage: &str, err: impl fmt::Display) -> Self {
            Self {
                message: format!("failed to initialize {stage}: {err}"),
            }
        }
    }

    impl fmt::Display for WindowInitError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.message)
        }
    }

    impl std::error::Error for WindowInitError {}

    fn panic_message(panic: Box<dyn Any + Send>) -> String {
        match panic.downcast::<String>() {
            Ok(msg) => *msg,
            Err(panic) => match panic.downcast::<&'static str>() {
                Ok(msg) => (*msg).to_string(),
                Err(_) => "unknown panic".into(),
            },
        }
    }
}
