use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rhino_core::{
    BackendClient, ColorGains, ComparisonSession, ImageSet, JsonFileStore, LandmarkSchema,
    MeshFetcher, MeshSource, Normalization, SessionError, SingleSession,
};
use rhino_viewport::{Page, PrepareOptions, Renderer};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

mod loader;

use loader::{LoadJob, Loads};

#[derive(Parser, Debug)]
#[command(name = "rhino_viewer", version, about = "Nasal reconstruction result viewer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// View one reconstruction result
    View {
        #[command(flatten)]
        view: ViewArgs,

        /// Load a local OBJ instead of the session's result
        #[arg(long)]
        mesh: Option<PathBuf>,
    },
    /// View pre-op and post-op results side by side
    Compare {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Upload four photographs for reconstruction
    Upload {
        #[command(flatten)]
        images: ImageArgs,

        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Upload pre-op and post-op photographs for comparison
    UploadComparison {
        #[command(flatten)]
        images: ImageArgs,

        #[arg(long)]
        post_front: PathBuf,
        #[arg(long)]
        post_left: PathBuf,
        #[arg(long)]
        post_right: PathBuf,
        #[arg(long)]
        post_basal: PathBuf,

        #[command(flatten)]
        backend: BackendArgs,
    },
}

#[derive(Args, Debug)]
struct BackendArgs {
    /// Session file shared by uploads and viewers
    #[arg(long, default_value = JsonFileStore::DEFAULT_PATH)]
    store: PathBuf,

    /// Reconstruction backend
    #[arg(long, default_value = MeshFetcher::DEFAULT_BASE_URL)]
    base_url: String,
}

#[derive(Args, Debug)]
struct ViewArgs {
    #[command(flatten)]
    backend: BackendArgs,

    /// Rotation about the vertical axis, in radians
    #[arg(long, default_value_t = std::f32::consts::FRAC_PI_2, allow_negative_numbers = true)]
    yaw: f32,

    /// Turn the face around by an extra half turn
    #[arg(long)]
    flip_front: bool,

    /// Landmark schema JSON (defaults to the built-in nasal schema)
    #[arg(long)]
    schema: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ImageArgs {
    #[arg(long)]
    front: PathBuf,
    #[arg(long)]
    left: PathBuf,
    #[arg(long)]
    right: PathBuf,
    #[arg(long)]
    basal: PathBuf,
}

impl ImageArgs {
    fn image_set(&self) -> ImageSet {
        ImageSet::new(&self.front, &self.left, &self.right, &self.basal)
    }
}

impl ViewArgs {
    /// Prepare options shared by every page; both comparison panes use the
    /// same color gains as the single view.
    fn options(&self) -> Result<PrepareOptions> {
        let schema = match &self.schema {
            Some(path) => LandmarkSchema::load(path)
                .with_context(|| format!("Failed to load landmark schema {:?}", path))?,
            None => LandmarkSchema::nasal(),
        };

        Ok(PrepareOptions {
            normalization: Normalization::new(self.yaw, self.flip_front),
            gains: ColorGains::SINGLE_VIEW,
            schema,
            ..PrepareOptions::default()
        })
    }
}

/// A page plus the loads that fill its views.
struct Launch {
    page: Page,
    loads: Loads,
}

/// Message for sessions that cannot be viewed yet.
fn no_data(err: SessionError) -> Result<Launch> {
    match err {
        SessionError::MissingInput { .. } | SessionError::InvalidValue { .. } => {
            log::warn!("{}", err);
            Ok(Launch {
                page: Page::no_data("No data available. Please run an upload first."),
                loads: Loads::spawn(&MeshFetcher::default(), Vec::new()),
            })
        }
        other => Err(other.into()),
    }
}

fn launch_single(args: &ViewArgs, mesh: Option<PathBuf>) -> Result<Launch> {
    let mut options = args.options()?;
    let fetcher = MeshFetcher::new(&args.backend.base_url);

    let source = match mesh {
        Some(path) => MeshSource::Local(path),
        None => {
            let store = JsonFileStore::open(&args.backend.store)?;
            let session = match SingleSession::from_store(&store) {
                Ok(session) => session,
                Err(err) => return no_data(err),
            };
            options.overrides = session.scores.clone();
            MeshSource::Remote(session.mesh_name())
        }
    };

    let page = Page::single(&source.label());
    let jobs = vec![LoadJob {
        view: 0,
        source,
        options,
    }];

    Ok(Launch {
        page,
        loads: Loads::spawn(&fetcher, jobs),
    })
}

fn comparison_jobs(args: &ViewArgs, session: &ComparisonSession) -> Result<Vec<LoadJob>> {
    let options = args.options()?;
    Ok(vec![
        LoadJob {
            view: 0,
            source: MeshSource::Remote(session.pre_mesh_name()),
            options: options.clone(),
        },
        LoadJob {
            view: 1,
            source: MeshSource::Remote(session.post_mesh_name()),
            options,
        },
    ])
}

fn launch_comparison(args: &ViewArgs) -> Result<Launch> {
    let fetcher = MeshFetcher::new(&args.backend.base_url);

    let store = JsonFileStore::open(&args.backend.store)?;
    let session = match ComparisonSession::from_store(&store) {
        Ok(session) => session,
        Err(err) => return no_data(err),
    };
    let jobs = comparison_jobs(args, &session)?;

    Ok(Launch {
        page: Page::comparison(session.scores),
        loads: Loads::spawn(&fetcher, jobs),
    })
}

fn upload(images: &ImageArgs, backend: &BackendArgs) -> Result<()> {
    let client = BackendClient::new(&backend.base_url)?;
    let response = client.upload(&images.image_set())?;

    let mut store = JsonFileStore::open(&backend.store)?;
    response.store_into(&mut store)?;

    if let Some(message) = &response.message {
        log::info!("Backend: {}", message);
    }
    println!("Stored result {} in {:?}", response.result_name, store.path());
    Ok(())
}

fn upload_comparison(pre: &ImageSet, post: &ImageSet, backend: &BackendArgs) -> Result<()> {
    let client = BackendClient::new(&backend.base_url)?;
    let response = client.upload_comparison(pre, post)?;

    let mut store = JsonFileStore::open(&backend.store)?;
    response.store_into(&mut store)?;

    println!(
        "Stored results {} / {} in {:?}",
        response.pre_name,
        response.post_name,
        store.path()
    );
    Ok(())
}

/// Application state
struct App {
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    page: Option<Page>,
    loads: Loads,

    // Input state
    left_mouse_pressed: bool,
    drag_view: Option<usize>,
    last_mouse_pos: Option<(f64, f64)>,
    cursor_pos: Option<(f64, f64)>,
}

impl App {
    fn new(launch: Launch) -> Self {
        Self {
            window: None,
            renderer: None,
            page: Some(launch.page),
            loads: launch.loads,
            left_mouse_pressed: false,
            drag_view: None,
            last_mouse_pos: None,
            cursor_pos: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let Some(page) = self.page.take() else {
            return Ok(());
        };

        let window_attrs = Window::default_attributes()
            .with_title(page.title.clone())
            .with_inner_size(winit::dpi::PhysicalSize::new(1280, 720));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let renderer = pollster::block_on(Renderer::new(window.clone(), page))?;

        self.window = Some(window);
        self.renderer = Some(renderer);
        Ok(())
    }

    /// Hand finished loads to the renderer.
    fn poll_loads(&mut self) {
        let Some(renderer) = &mut self.renderer else {
            return;
        };
        for (view, result) in self.loads.poll() {
            renderer.set_view_result(view, result);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                log::error!("Failed to initialize viewer: {:#}", e);
                event_loop.exit();
                return;
            }
            log::info!("Window and renderer initialized");
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::CursorMoved { position, .. } = &event {
            self.cursor_pos = Some((position.x, position.y));
        }

        // Let egui handle the event first
        if let (Some(renderer), Some(window)) = (&mut self.renderer, &self.window) {
            if renderer.handle_egui_event(window, &event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize((physical_size.width, physical_size.height));
                    log::debug!("Resized to {}x{}", physical_size.width, physical_size.height);
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.left_mouse_pressed = state == ElementState::Pressed;
                if self.left_mouse_pressed {
                    // A drag stays with the pane it started in
                    self.drag_view = match (&self.renderer, self.cursor_pos) {
                        (Some(renderer), Some(pos)) => renderer.view_at(pos),
                        _ => None,
                    };
                } else {
                    self.drag_view = None;
                    self.last_mouse_pos = None;
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.left_mouse_pressed {
                    if let (Some(last_pos), Some(view), Some(renderer)) =
                        (self.last_mouse_pos, self.drag_view, &mut self.renderer)
                    {
                        renderer.drag(view, (position.x - last_pos.0, position.y - last_pos.1));
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if let (Some(renderer), Some(pos)) = (&mut self.renderer, self.cursor_pos) {
                    let scroll_amount = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                    };
                    if let Some(view) = renderer.view_at(pos) {
                        renderer.scroll(view, scroll_amount);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                self.poll_loads();

                if let (Some(renderer), Some(window)) = (&mut self.renderer, &self.window) {
                    renderer.update();

                    // Near-black backdrop
                    let clear_color = wgpu::Color {
                        r: 0.02,
                        g: 0.02,
                        b: 0.03,
                        a: 1.0,
                    };

                    if let Err(e) = renderer.render(clear_color, window) {
                        if let Some(surface_err) = e.downcast_ref::<wgpu::SurfaceError>() {
                            match surface_err {
                                wgpu::SurfaceError::Lost => {
                                    renderer.resize(renderer.size);
                                }
                                wgpu::SurfaceError::OutOfMemory => {
                                    log::error!("Out of memory!");
                                    event_loop.exit();
                                }
                                _ => {
                                    log::error!("Surface error: {:?}", surface_err);
                                }
                            }
                        } else {
                            log::error!("Render error: {:?}", e);
                        }
                    }
                }

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if !self.loads.is_finished() {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }
}

fn run_viewer(launch: Launch) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(launch);

    log::info!("Running event loop");
    event_loop.run_app(&mut app)?;

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    log::info!("Starting Rhino Viewer");

    match cli.command {
        Command::View { view, mesh } => run_viewer(launch_single(&view, mesh)?),
        Command::Compare { view } => run_viewer(launch_comparison(&view)?),
        Command::Upload { images, backend } => upload(&images, &backend),
        Command::UploadComparison {
            images,
            post_front,
            post_left,
            post_right,
            post_basal,
            backend,
        } => {
            let post = ImageSet::new(post_front, post_left, post_right, post_basal);
            upload_comparison(&images.image_set(), &post, &backend)
        }
    }
}
