//! Per-stage kernel parameter blocks.
//!
//! Every block is a flat run of `f32` with a fixed field order; the kernels
//! index them by offset, so layouts must not change. All blocks are rebuilt
//! from scratch every tick by [`FrameParams::build`].

use bytemuck::{Pod, Zeroable};

use crate::config::{EffectSettings, SimulationConstants};
use crate::interaction::{OrbitCamera, PointerState};

/// Composite stage parameters (16 floats).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct RenderParams {
    pub viewport_width: f32,
    pub viewport_height: f32,
    /// Elapsed time (s)
    pub time: f32,
    pub _reserved0: f32,
    pub grid_width: f32,
    pub grid_height: f32,
    /// 0 or 1
    pub caustics_enabled: f32,
    /// 0 or 1
    pub caustics_debug: f32,
    pub camera_radius: f32,
    pub camera_phi: f32,
    pub camera_theta: f32,
    pub _reserved1: f32,
    pub light_x: f32,
    pub light_y: f32,
    pub light_z: f32,
    pub _reserved2: f32,
}

/// Wave update parameters (8 floats).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct WaveUpdateParams {
    pub grid_width: f32,
    pub grid_height: f32,
    /// World-space x of the forcing hit
    pub forcing_x: f32,
    /// World-space z of the forcing hit
    pub forcing_z: f32,
    /// Length of the pointer displacement
    pub forcing_magnitude: f32,
    /// Disturbance radius (mouse size)
    pub forcing_radius: f32,
    /// Disturbance depth (mouse deep)
    pub forcing_depth: f32,
    /// Damping (viscosity)
    pub damping: f32,
}

/// State copy parameters (4 floats).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CopyParams {
    pub grid_width: f32,
    pub grid_height: f32,
    pub _reserved: [f32; 2],
}

/// Caustics projection parameters (16 floats).
///
/// The light position appears three times; each copy feeds a different
/// shading term and sits at a fixed offset the kernel reads directly.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CausticsParams {
    pub time: f32,
    pub grid_width: f32,
    pub grid_height: f32,
    pub caustics_width: f32,
    pub caustics_height: f32,
    /// Offsets 5..8
    pub light_refract: [f32; 3],
    /// Offsets 8..11
    pub light_attenuation: [f32; 3],
    pub threshold: f32,
    /// Offsets 12..15
    pub light_falloff: [f32; 3],
    pub gain: f32,
}

/// Separable blur parameters (4 floats). The axis pair is one-hot.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BlurParams {
    pub width: f32,
    pub height: f32,
    pub axis_x: f32,
    pub axis_y: f32,
}

impl BlurParams {
    pub fn horizontal(width: u32, height: u32) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
            axis_x: 1.0,
            axis_y: 0.0,
        }
    }

    pub fn vertical(width: u32, height: u32) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
            axis_x: 0.0,
            axis_y: 1.0,
        }
    }
}

/// Everything the parameter blocks are derived from.
#[derive(Debug, Clone, Copy)]
pub struct ParamInputs<'a> {
    pub camera: &'a OrbitCamera,
    pub pointer: &'a PointerState,
    pub settings: &'a EffectSettings,
    pub constants: &'a SimulationConstants,
    /// Backing-store size of the presentation target
    pub viewport: (u32, u32),
    /// Seconds since the engine started
    pub elapsed: f32,
}

/// The full set of parameter blocks for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    pub render: RenderParams,
    pub wave: WaveUpdateParams,
    pub copy: CopyParams,
    pub caustics: CausticsParams,
    pub blur_horizontal: BlurParams,
    pub blur_vertical: BlurParams,
}

fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

impl FrameParams {
    /// Pure function of the inputs; no side effects.
    pub fn build(inputs: &ParamInputs<'_>) -> Self {
        let constants = inputs.constants;
        let settings = inputs.settings;
        let grid = constants.height_resolution as f32;
        let caustics = constants.caustics_size as f32;
        let light = constants.light_position;

        let render = RenderParams {
            viewport_width: inputs.viewport.0 as f32,
            viewport_height: inputs.viewport.1 as f32,
            time: inputs.elapsed,
            _reserved0: 0.0,
            grid_width: grid,
            grid_height: grid,
            caustics_enabled: flag(settings.caustics_enabled),
            caustics_debug: flag(settings.caustics_debug),
            camera_radius: inputs.camera.radius,
            camera_phi: inputs.camera.phi,
            camera_theta: inputs.camera.theta,
            _reserved1: 0.0,
            light_x: light[0],
            light_y: light[1],
            light_z: light[2],
            _reserved2: 0.0,
        };

        let wave = WaveUpdateParams {
            grid_width: grid,
            grid_height: grid,
            forcing_x: inputs.pointer.mouse_pos.x,
            forcing_z: inputs.pointer.mouse_pos.y,
            forcing_magnitude: inputs.pointer.forcing_magnitude(),
            forcing_radius: settings.mouse_size,
            forcing_depth: settings.mouse_deep,
            damping: settings.viscosity,
        };

        let copy = CopyParams {
            grid_width: grid,
            grid_height: grid,
            _reserved: [0.0; 2],
        };

        let caustics_params = CausticsParams {
            time: inputs.elapsed,
            grid_width: grid,
            grid_height: grid,
            caustics_width: caustics,
            caustics_height: caustics,
            light_refract: light,
            light_attenuation: light,
            threshold: settings.caustics_threshold,
            light_falloff: light,
            gain: settings.caustics_gain,
        };

        Self {
            render,
            wave,
            copy,
            caustics: caustics_params,
            blur_horizontal: BlurParams::horizontal(
                constants.caustics_size,
                constants.caustics_size,
            ),
            blur_vertical: BlurParams::vertical(constants.caustics_size, constants.caustics_size),
        }
    }
}
