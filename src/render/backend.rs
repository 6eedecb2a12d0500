//! The seam between the frame engine and the GPU.

use crate::error::EngineError;
use crate::params::FrameParams;
use crate::render::graph::FramePlan;
use crate::render::surface::SurfaceSize;

/// Owner of the simulation grids, caustics textures and presentation target.
///
/// The engine calls these once per tick, in the order: surface
/// reconfiguration, reset, then `execute`. Implementations must record the
/// plan's stages in the given order into a single submission.
pub trait FrameBackend {
    /// Largest texture edge the device supports.
    fn max_texture_dimension(&self) -> u32;

    /// Current backing-store size of the presentation target.
    fn surface_size(&self) -> SurfaceSize;

    /// Resize the presentation target. `size` already respects the maximum.
    fn configure_surface(&mut self, size: SurfaceSize);

    /// Restore both simulation grids to all zeros.
    fn reset_simulation(&mut self);

    /// Upload the parameter blocks and run the plan's stages.
    fn execute(&mut self, plan: &FramePlan, params: &FrameParams) -> Result<(), EngineError>;
}
