//! Caustic Water
//!
//! Interactive water surface with refracted-light caustics.

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use caustic_water::engine::{tick, EngineContext};
use caustic_water::error::EngineError;
use caustic_water::interaction::InputEvent;
use caustic_water::render::{GpuScheduler, OverlayFrame, SurfaceSize};
use caustic_water::ui::{ControlPanel, PanelActions, PanelStats};
use caustic_water::WaterConfig;

const WINDOW_TITLE: &str = "Caustic Water";

/// Wheel line deltas are scaled to pixel-like units before zooming.
const LINE_DELTA_PIXELS: f32 = 100.0;

/// Interactive water surface with GPU caustics
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Disable the caustics blur passes
    #[arg(long)]
    no_blur: bool,

    /// Show the raw caustics texture on the water plane
    #[arg(long)]
    debug_caustics: bool,
}

/// Everything that exists once the GPU is up.
struct Running {
    window: Arc<Window>,
    engine: EngineContext<GpuScheduler>,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    panel: ControlPanel,
}

enum AppState {
    Starting,
    Running(Box<Running>),
    /// No usable GPU; the window stays open showing the reason in its title
    Unsupported { _window: Arc<Window> },
}

/// Application state
struct App {
    config: WaterConfig,
    state: AppState,
    last_frame: Instant,
    cursor: (f32, f32),
    startup_error: Option<EngineError>,
}

impl App {
    fn new(config: WaterConfig) -> Self {
        Self {
            config,
            state: AppState::Starting,
            last_frame: Instant::now(),
            cursor: (0.0, 0.0),
            startup_error: None,
        }
    }

    fn redraw(running: &mut Running, dt: f32, event_loop: &ActiveEventLoop) {
        let stats = PanelStats {
            fps: running.engine.stats().fps(),
            frames: running.engine.stats().frames(),
            resolution: running.engine.requested_size(),
            camera_radius: running.engine.camera().radius,
            camera_phi: running.engine.camera().phi,
            camera_theta: running.engine.camera().theta,
            gesture: running.engine.raycaster().state(),
            elapsed: running.engine.elapsed(),
        };

        let raw_input = running.egui_state.take_egui_input(&running.window);
        let mut actions = PanelActions::default();
        let egui_output = running.egui_ctx.run(raw_input, |ctx| {
            actions = running.panel.show(ctx, running.engine.settings_mut(), &stats);
        });
        running
            .egui_state
            .handle_platform_output(&running.window, egui_output.platform_output);
        let primitives = running
            .egui_ctx
            .tessellate(egui_output.shapes, egui_output.pixels_per_point);
        running.engine.backend_mut().set_overlay_frame(OverlayFrame {
            primitives,
            textures_delta: egui_output.textures_delta,
            pixels_per_point: egui_output.pixels_per_point,
        });

        if actions.reset_requested {
            running.engine.push_input(InputEvent::ResetSimulation);
        }
        if actions.screenshot_requested {
            running.engine.backend_mut().request_screenshot();
        }

        match tick(&mut running.engine, dt) {
            Ok(_) => {}
            Err(e) if e.is_surface_recoverable() => {
                log::warn!("{}, reconfiguring", e);
                running.engine.backend_mut().reconfigure();
            }
            Err(EngineError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                log::error!("Out of memory!");
                event_loop.exit();
            }
            Err(e) => log::warn!("Frame skipped: {}", e),
        }

        running.window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !matches!(self.state, AppState::Starting) {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(1280, 720));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .expect("Failed to create window"),
        );

        let mut scheduler = match pollster::block_on(GpuScheduler::new(window.clone(), &self.config)) {
            Ok(scheduler) => scheduler,
            Err(EngineError::Capability(reason)) => {
                log::error!("GPU rendering is not supported on this system: {}", reason);
                window.set_title(&format!("{} (GPU rendering is not supported on this system)", WINDOW_TITLE));
                self.state = AppState::Unsupported { _window: window };
                return;
            }
            Err(e) => {
                log::error!("Startup failed: {}", e);
                self.startup_error = Some(e);
                event_loop.exit();
                return;
            }
        };

        scheduler.enable_overlay();

        let size = window.inner_size();
        let mut engine = EngineContext::new(scheduler, &self.config, SurfaceSize::new(size.width, size.height));
        engine.set_pixel_ratio(window.scale_factor() as f32);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        self.state = AppState::Running(Box::new(Running {
            window: window.clone(),
            engine,
            egui_ctx,
            egui_state,
            panel: ControlPanel::default(),
        }));
        self.last_frame = Instant::now();
        window.request_redraw();

        log::info!("Window created, rendering started");
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let WindowEvent::CloseRequested = event {
            log::info!("Close requested, exiting");
            event_loop.exit();
            return;
        }

        let running = match &mut self.state {
            AppState::Running(running) => running,
            _ => return,
        };

        // egui sees every event first; consumed pointer input stays in the panel
        let egui_consumed = running
            .egui_state
            .on_window_event(&running.window, &event)
            .consumed;

        match event {
            WindowEvent::Resized(new_size) => {
                running.engine.push_input(InputEvent::Resize {
                    width: new_size.width,
                    height: new_size.height,
                });
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                running.engine.set_pixel_ratio(scale_factor as f32);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
                if !egui_consumed {
                    running.engine.push_input(InputEvent::PointerMove {
                        x: self.cursor.0,
                        y: self.cursor.1,
                    });
                }
            }
            WindowEvent::CursorLeft { .. } => {
                running.engine.push_input(InputEvent::PointerLeave);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let (x, y) = self.cursor;
                match state {
                    ElementState::Pressed if !egui_consumed => {
                        running.engine.push_input(InputEvent::PointerDown { x, y });
                    }
                    ElementState::Released => {
                        running.engine.push_input(InputEvent::PointerUp { x, y });
                    }
                    _ => {}
                }
            }
            WindowEvent::MouseWheel { delta, .. } if !egui_consumed => {
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * LINE_DELTA_PIXELS,
                    MouseScrollDelta::PixelDelta(pos) => -(pos.y as f32),
                };
                running.engine.push_input(InputEvent::Wheel { delta_y });
            }
            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if event.state == ElementState::Pressed {
                    use winit::keyboard::{Key, NamedKey};
                    match event.logical_key {
                        Key::Named(NamedKey::Escape) => event_loop.exit(),
                        Key::Named(NamedKey::F12) => {
                            running.engine.backend_mut().request_screenshot();
                        }
                        _ => {}
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now.duration_since(self.last_frame).as_secs_f32();
                self.last_frame = now;
                Self::redraw(running, dt, event_loop);
            }
            _ => {}
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match WaterConfig::from_file(path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path);
                cfg
            }
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                WaterConfig::default()
            }
        },
        None => WaterConfig::default(),
    };

    if args.no_blur {
        config.effects.caustics_blur_enabled = false;
    }
    if args.debug_caustics {
        config.effects.caustics_debug = true;
    }

    log::info!(
        "Starting: grid {}x{}, caustics {}x{}, blur {}",
        config.simulation.height_resolution,
        config.simulation.height_resolution,
        config.simulation.caustics_size,
        config.simulation.caustics_size,
        if config.effects.caustics_blur_enabled { "on" } else { "off" }
    );

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app).expect("Event loop failed");

    if let Some(e) = app.startup_error {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
