//! egui control panel for the runtime effect settings.

use crate::config::EffectSettings;
use crate::interaction::GestureState;
use crate::render::surface::SurfaceSize;

/// Read-only values shown in the stats section.
#[derive(Debug, Clone, Copy)]
pub struct PanelStats {
    pub fps: f32,
    pub frames: u64,
    pub resolution: SurfaceSize,
    pub camera_radius: f32,
    pub camera_phi: f32,
    pub camera_theta: f32,
    pub gesture: GestureState,
    pub elapsed: f32,
}

/// Commands issued from the panel this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelActions {
    pub reset_requested: bool,
    pub screenshot_requested: bool,
}

/// Panel window state.
pub struct ControlPanel {
    pub visible: bool,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self { visible: true }
    }
}

fn gesture_label(state: GestureState) -> &'static str {
    match state {
        GestureState::Idle => "idle",
        GestureState::GestureUnresolved => "pressed",
        GestureState::GestureOrbiting => "orbiting",
        GestureState::GestureDisturbing => "disturbing",
    }
}

fn range(bounds: (f32, f32)) -> std::ops::RangeInclusive<f32> {
    bounds.0..=bounds.1
}

impl ControlPanel {
    /// Draw the panel and apply slider edits to `settings`.
    pub fn show(&mut self, ctx: &egui::Context, settings: &mut EffectSettings, stats: &PanelStats) -> PanelActions {
        let mut actions = PanelActions::default();
        if !self.visible {
            return actions;
        }

        egui::Window::new("Water")
            .default_pos([10.0, 10.0])
            .default_width(260.0)
            .resizable(false)
            .show(ctx, |ui| {
                ui.heading("Interaction");
                ui.separator();

                ui.add(
                    egui::Slider::new(&mut settings.mouse_size, range(EffectSettings::MOUSE_SIZE_RANGE))
                        .text("Mouse size")
                        .step_by(0.001),
                );
                ui.add(
                    egui::Slider::new(&mut settings.mouse_deep, range(EffectSettings::MOUSE_DEEP_RANGE))
                        .text("Mouse deep")
                        .step_by(0.01),
                );
                ui.add(
                    egui::Slider::new(&mut settings.viscosity, range(EffectSettings::VISCOSITY_RANGE))
                        .text("Viscosity")
                        .step_by(0.001)
                        .fixed_decimals(3),
                );
                ui.add(
                    egui::Slider::new(&mut settings.speed, range(EffectSettings::SPEED_RANGE))
                        .text("Speed")
                        .step_by(1.0),
                );

                ui.separator();
                ui.collapsing("Caustics", |ui| {
                    ui.checkbox(&mut settings.caustics_enabled, "Enabled");
                    ui.checkbox(&mut settings.caustics_debug, "Debug view");
                    ui.checkbox(&mut settings.caustics_blur_enabled, "Blur");
                    ui.add(
                        egui::Slider::new(
                            &mut settings.caustics_threshold,
                            range(EffectSettings::THRESHOLD_RANGE),
                        )
                        .text("Threshold")
                        .step_by(0.01),
                    );
                    ui.add(
                        egui::Slider::new(&mut settings.caustics_gain, range(EffectSettings::GAIN_RANGE))
                            .text("Gain")
                            .step_by(0.01),
                    );
                });

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Reset water").clicked() {
                        actions.reset_requested = true;
                    }
                    if ui.button("\u{1F4F7} Screenshot").clicked() {
                        actions.screenshot_requested = true;
                    }
                });

                ui.separator();
                ui.collapsing("Stats", |ui| {
                    egui::Grid::new("stats_grid")
                        .num_columns(2)
                        .spacing([20.0, 4.0])
                        .show(ui, |ui| {
                            ui.label("FPS:");
                            ui.label(format!("{:.0}", stats.fps));
                            ui.end_row();

                            ui.label("Frames:");
                            ui.label(format!("{}", stats.frames));
                            ui.end_row();

                            ui.label("Resolution:");
                            ui.label(format!("{}x{}", stats.resolution.width, stats.resolution.height));
                            ui.end_row();

                            ui.label("Camera r:");
                            ui.label(format!("{:.2}", stats.camera_radius));
                            ui.end_row();

                            ui.label("Camera φ:");
                            ui.label(format!("{:.1}°", stats.camera_phi.to_degrees()));
                            ui.end_row();

                            ui.label("Camera θ:");
                            ui.label(format!("{:.1}°", stats.camera_theta.to_degrees()));
                            ui.end_row();

                            ui.label("Pointer:");
                            ui.label(gesture_label(stats.gesture));
                            ui.end_row();

                            ui.label("Time:");
                            ui.label(format!("{:.1} s", stats.elapsed));
                            ui.end_row();
                        });
                });

                ui.separator();
                ui.small("Drag water to disturb | Drag outside to orbit | Scroll to zoom");
                ui.small("F12: Screenshot | ESC: Exit");
            });

        settings.clamp_to_ranges();
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> PanelStats {
        PanelStats {
            fps: 60.0,
            frames: 10,
            resolution: SurfaceSize::new(800, 600),
            camera_radius: 3.5,
            camera_phi: 0.8,
            camera_theta: 0.8,
            gesture: GestureState::Idle,
            elapsed: 1.0,
        }
    }

    #[test]
    fn test_panel_runs_without_actions() {
        let ctx = egui::Context::default();
        let mut panel = ControlPanel::default();
        let mut settings = EffectSettings::default();
        let mut actions = PanelActions::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            actions = panel.show(ctx, &mut settings, &stats());
        });
        assert_eq!(actions, PanelActions::default());
        let defaults = EffectSettings::default();
        assert!((settings.mouse_size - defaults.mouse_size).abs() < 1e-4);
        assert!((settings.viscosity - defaults.viscosity).abs() < 1e-4);
        assert!(settings.caustics_enabled && settings.caustics_blur_enabled);
    }

    #[test]
    fn test_panel_clamps_out_of_range_settings() {
        let ctx = egui::Context::default();
        let mut panel = ControlPanel::default();
        let mut settings = EffectSettings {
            viscosity: 2.0,
            caustics_gain: -1.0,
            ..EffectSettings::default()
        };
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            panel.show(ctx, &mut settings, &stats());
        });
        assert!((settings.viscosity - 0.999).abs() < 1e-6);
        assert_eq!(settings.caustics_gain, 0.0);
    }

    #[test]
    fn test_hidden_panel_draws_nothing() {
        let ctx = egui::Context::default();
        let mut panel = ControlPanel { visible: false };
        let mut settings = EffectSettings::default();
        let output = ctx.run(egui::RawInput::default(), |ctx| {
            panel.show(ctx, &mut settings, &stats());
        });
        assert!(output.shapes.is_empty());
    }

    #[test]
    fn test_gesture_labels() {
        assert_eq!(gesture_label(GestureState::GestureOrbiting), "orbiting");
        assert_eq!(gesture_label(GestureState::GestureDisturbing), "disturbing");
    }
}
