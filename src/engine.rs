//! Frame orchestration.
//!
//! [`EngineContext`] holds every piece of mutable state (camera, gesture,
//! settings, pending input, GPU backend). The host calls [`tick`] once per
//! display refresh; the engine never schedules itself.

use std::collections::VecDeque;

use crate::config::{EffectSettings, SimulationConstants, WaterConfig};
use crate::error::EngineError;
use crate::interaction::{
    GestureState, InputEvent, InputQueue, OrbitCamera, PointerRaycaster, PointerState,
};
use crate::params::{FrameParams, ParamInputs};
use crate::render::backend::FrameBackend;
use crate::render::graph::{FramePlan, Stage};
use crate::render::surface::{fit_to_max_dimension, SurfaceSize};

/// Number of frame deltas averaged for the FPS readout.
const STATS_WINDOW: usize = 60;

/// Rolling frame-time statistics.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    frame_times: VecDeque<f32>,
    frames: u64,
}

impl FrameStats {
    pub fn record(&mut self, dt: f32) {
        self.frames += 1;
        if dt <= 0.0 {
            return;
        }
        self.frame_times.push_back(dt);
        if self.frame_times.len() > STATS_WINDOW {
            self.frame_times.pop_front();
        }
    }

    /// Average frames per second over the window.
    pub fn fps(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        let avg_dt: f32 = self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        1.0 / avg_dt
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// What a tick did, for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Stages recorded, in order. Empty when the target has no area.
    pub stages: Vec<Stage>,
    pub surface: SurfaceSize,
    pub gesture: GestureState,
    pub pointer: PointerState,
    pub reset: bool,
}

/// All engine state, owned by the host's frame loop.
pub struct EngineContext<B: FrameBackend> {
    backend: B,
    camera: OrbitCamera,
    raycaster: PointerRaycaster,
    settings: EffectSettings,
    constants: SimulationConstants,
    input: InputQueue,
    requested_size: SurfaceSize,
    elapsed: f32,
    stats: FrameStats,
}

impl<B: FrameBackend> EngineContext<B> {
    /// `client_size` is the host's client area in physical pixels.
    pub fn new(backend: B, config: &WaterConfig, client_size: SurfaceSize) -> Self {
        let constants = config.simulation.clone();
        let mut settings = config.effects.clone();
        settings.clamp_to_ranges();
        Self {
            backend,
            camera: OrbitCamera::from_parameters(&config.camera),
            raycaster: PointerRaycaster::new(
                constants.bounds_half(),
                client_size.width,
                client_size.height,
            ),
            settings,
            constants,
            input: InputQueue::new(config.input_queue_capacity),
            requested_size: client_size,
            elapsed: 0.0,
            stats: FrameStats::default(),
        }
    }

    /// Queue an input event for the next tick. Never blocks.
    pub fn push_input(&mut self, event: InputEvent) -> bool {
        self.input.push(event)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn raycaster(&self) -> &PointerRaycaster {
        &self.raycaster
    }

    pub fn settings(&self) -> &EffectSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut EffectSettings {
        &mut self.settings
    }

    pub fn constants(&self) -> &SimulationConstants {
        &self.constants
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn requested_size(&self) -> SurfaceSize {
        self.requested_size
    }

    /// Physical pixels per logical pixel of the host display.
    pub fn set_pixel_ratio(&mut self, ratio: f32) {
        self.raycaster.set_pixel_ratio(ratio);
    }
}

/// Advance the engine by one frame.
///
/// Drains pending input, reconfigures the surface if its size changed,
/// resolves the gesture, builds every parameter block and hands the frame
/// plan to the backend. A failed tick is not retried.
pub fn tick<B: FrameBackend>(ctx: &mut EngineContext<B>, dt: f32) -> Result<FrameReport, EngineError> {
    let dt = dt.max(0.0);
    ctx.elapsed += dt;
    ctx.stats.record(dt);

    let mut reset = false;
    for event in ctx.input.drain() {
        match event {
            InputEvent::Resize { width, height } => {
                ctx.requested_size = SurfaceSize::new(width, height);
                ctx.raycaster.handle_event(&event, &mut ctx.camera);
            }
            InputEvent::ResetSimulation => reset = true,
            _ => ctx.raycaster.handle_event(&event, &mut ctx.camera),
        }
    }

    let fitted = fit_to_max_dimension(ctx.requested_size, ctx.backend.max_texture_dimension());
    if !fitted.is_empty() && fitted != ctx.backend.surface_size() {
        log::debug!(
            "Reconfiguring surface to {}x{} (requested {}x{})",
            fitted.width,
            fitted.height,
            ctx.requested_size.width,
            ctx.requested_size.height
        );
        ctx.backend.configure_surface(fitted);
    }

    if reset {
        log::info!("Resetting simulation grids");
        ctx.backend.reset_simulation();
    }

    let surface = ctx.backend.surface_size();
    let pointer = ctx.raycaster.resolve(&ctx.camera, surface.aspect());

    // A minimized window keeps the backend's last size; nothing to draw into
    if fitted.is_empty() || surface.is_empty() {
        return Ok(FrameReport {
            stages: Vec::new(),
            surface: if fitted.is_empty() { fitted } else { surface },
            gesture: ctx.raycaster.state(),
            pointer,
            reset,
        });
    }

    let params = FrameParams::build(&ParamInputs {
        camera: &ctx.camera,
        pointer: &pointer,
        settings: &ctx.settings,
        constants: &ctx.constants,
        viewport: (surface.width, surface.height),
        elapsed: ctx.elapsed,
    });
    let plan = FramePlan::build(ctx.settings.caustics_blur_enabled);
    ctx.backend.execute(&plan, &params)?;

    Ok(FrameReport {
        stages: plan.stages().to_vec(),
        surface,
        gesture: ctx.raycaster.state(),
        pointer,
        reset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    /// Records what the engine asked of it.
    #[derive(Default)]
    struct RecordingBackend {
        size: Option<SurfaceSize>,
        max_dimension: u32,
        configured: Vec<SurfaceSize>,
        resets: usize,
        frames: Vec<(Vec<Stage>, FrameParams)>,
    }

    impl RecordingBackend {
        fn new(max_dimension: u32) -> Self {
            Self {
                max_dimension,
                ..Self::default()
            }
        }
    }

    impl FrameBackend for RecordingBackend {
        fn max_texture_dimension(&self) -> u32 {
            self.max_dimension
        }

        fn surface_size(&self) -> SurfaceSize {
            self.size.unwrap_or(SurfaceSize::new(0, 0))
        }

        fn configure_surface(&mut self, size: SurfaceSize) {
            // GPU targets cannot be configured to zero area
            if size.is_empty() {
                return;
            }
            self.size = Some(size);
            self.configured.push(size);
        }

        fn reset_simulation(&mut self) {
            self.resets += 1;
        }

        fn execute(&mut self, plan: &FramePlan, params: &FrameParams) -> Result<(), EngineError> {
            plan.validate().expect("plan must be ordered");
            self.frames.push((plan.stages().to_vec(), *params));
            Ok(())
        }
    }

    fn engine() -> EngineContext<RecordingBackend> {
        EngineContext::new(
            RecordingBackend::new(8192),
            &WaterConfig::default(),
            SurfaceSize::new(800, 600),
        )
    }

    #[test]
    fn test_first_tick_configures_surface_and_runs_all_stages() {
        let mut ctx = engine();
        let report = tick(&mut ctx, 1.0 / 60.0).unwrap();
        assert_eq!(ctx.backend().configured, vec![SurfaceSize::new(800, 600)]);
        assert_eq!(report.stages.len(), 6);
        assert_eq!(ctx.backend().frames.len(), 1);
    }

    #[test]
    fn test_surface_not_reconfigured_without_change() {
        let mut ctx = engine();
        tick(&mut ctx, 0.016).unwrap();
        tick(&mut ctx, 0.016).unwrap();
        assert_eq!(ctx.backend().configured.len(), 1);
    }

    #[test]
    fn test_resize_respects_max_dimension() {
        let mut ctx = EngineContext::new(
            RecordingBackend::new(2048),
            &WaterConfig::default(),
            SurfaceSize::new(800, 600),
        );
        tick(&mut ctx, 0.016).unwrap();
        ctx.push_input(InputEvent::Resize {
            width: 4096,
            height: 2048,
        });
        let report = tick(&mut ctx, 0.016).unwrap();
        assert_eq!(report.surface, SurfaceSize::new(2048, 1024));
        let params = ctx.backend().frames.last().unwrap().1;
        assert_eq!(params.render.viewport_width, 2048.0);
        assert_eq!(params.render.viewport_height, 1024.0);
    }

    #[test]
    fn test_blur_toggle_changes_plan() {
        let mut ctx = engine();
        ctx.settings_mut().caustics_blur_enabled = false;
        let report = tick(&mut ctx, 0.016).unwrap();
        assert_eq!(report.stages.len(), 4);
        assert!(!report.stages.contains(&Stage::BlurHorizontal));
    }

    #[test]
    fn test_reset_is_applied_once() {
        let mut ctx = engine();
        ctx.push_input(InputEvent::ResetSimulation);
        assert!(tick(&mut ctx, 0.016).unwrap().reset);
        assert!(!tick(&mut ctx, 0.016).unwrap().reset);
        assert_eq!(ctx.backend().resets, 1);
    }

    #[test]
    fn test_elapsed_time_accumulates_into_params() {
        let mut ctx = engine();
        tick(&mut ctx, 0.5).unwrap();
        tick(&mut ctx, 0.25).unwrap();
        let params = ctx.backend().frames.last().unwrap().1;
        assert!((params.render.time - 0.75).abs() < 1e-6);
        assert!((params.caustics.time - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_center_press_sends_snap_forcing() {
        let mut ctx = engine();
        tick(&mut ctx, 0.016).unwrap();
        ctx.push_input(InputEvent::PointerDown { x: 400.0, y: 300.0 });
        let report = tick(&mut ctx, 0.016).unwrap();

        assert_eq!(report.gesture, GestureState::GestureDisturbing);
        assert_eq!(report.pointer.mouse_speed, Vec2::new(0.05, 0.0));
        let wave = ctx.backend().frames.last().unwrap().1.wave;
        assert!((wave.forcing_magnitude - 0.05).abs() < 1e-6);
        assert!(wave.forcing_x.abs() < 1e-3 && wave.forcing_z.abs() < 1e-3);
    }

    #[test]
    fn test_corner_drag_orbits_camera() {
        let mut ctx = engine();
        tick(&mut ctx, 0.016).unwrap();
        ctx.push_input(InputEvent::PointerDown { x: 0.0, y: 0.0 });
        tick(&mut ctx, 0.016).unwrap();
        assert_eq!(ctx.raycaster().state(), GestureState::GestureOrbiting);

        let mut last_theta = ctx.camera().theta;
        for step in 1..=10 {
            ctx.push_input(InputEvent::PointerMove {
                x: step as f32 * 12.0,
                y: 0.0,
            });
            let report = tick(&mut ctx, 0.016).unwrap();
            assert_eq!(report.pointer.mouse_speed, Vec2::ZERO);
            assert!(ctx.camera().theta > last_theta);
            last_theta = ctx.camera().theta;
        }
        let params = ctx.backend().frames.last().unwrap().1;
        assert_eq!(params.wave.forcing_magnitude, 0.0);
        assert!((params.render.camera_theta - last_theta).abs() < 1e-6);
    }

    #[test]
    fn test_wheel_zoom_reaches_render_params() {
        let mut ctx = engine();
        ctx.push_input(InputEvent::Wheel { delta_y: 100.0 });
        tick(&mut ctx, 0.016).unwrap();
        let params = ctx.backend().frames.last().unwrap().1;
        assert!((params.render.camera_radius - 4.5).abs() < 1e-5);
    }

    #[test]
    fn test_zero_area_target_skips_recording() {
        let mut ctx = EngineContext::new(
            RecordingBackend::new(8192),
            &WaterConfig::default(),
            SurfaceSize::new(0, 0),
        );
        let report = tick(&mut ctx, 0.016).unwrap();
        assert!(report.stages.is_empty());
        assert!(ctx.backend().frames.is_empty());
    }

    #[test]
    fn test_minimized_window_records_nothing() {
        let mut ctx = engine();
        assert_eq!(tick(&mut ctx, 0.016).unwrap().stages.len(), 6);

        ctx.push_input(InputEvent::Resize { width: 0, height: 0 });
        let report = tick(&mut ctx, 0.016).unwrap();
        assert!(report.stages.is_empty());
        assert!(report.surface.is_empty());
        assert_eq!(ctx.backend().frames.len(), 1);

        ctx.push_input(InputEvent::Resize {
            width: 800,
            height: 600,
        });
        let report = tick(&mut ctx, 0.016).unwrap();
        assert_eq!(report.stages.len(), 6);
        assert_eq!(ctx.backend().frames.len(), 2);
    }

    #[test]
    fn test_frame_stats_average() {
        let mut stats = FrameStats::default();
        for _ in 0..10 {
            stats.record(0.02);
        }
        assert!((stats.fps() - 50.0).abs() < 0.01);
        assert_eq!(stats.frames(), 10);

        for _ in 0..100 {
            stats.record(0.01);
        }
        assert!((stats.fps() - 100.0).abs() < 0.01);
        assert_eq!(stats.frame_times.len(), STATS_WINDOW);
    }
}
