//! Backing-store sizing for the presentation surface.

/// Size of the presentation target in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Fit a requested size under `max_dimension`.
///
/// Oversized requests are scaled down uniformly so the longest side equals
/// `max_dimension` (aspect preserved, the other side floored);
/// smaller requests pass through unchanged and are never upscaled.
pub fn fit_to_max_dimension(requested: SurfaceSize, max_dimension: u32) -> SurfaceSize {
    if requested.is_empty() {
        return requested;
    }
    let max = max_dimension.max(1);
    if requested.width <= max && requested.height <= max {
        return requested;
    }
    // Integer scaling by max / longest side keeps the floor exact
    let (w, h, m) = (requested.width as u64, requested.height as u64, max as u64);
    let (width, height) = if w >= h {
        (m, h * m / w)
    } else {
        (w * m / h, m)
    };
    SurfaceSize {
        width: (width as u32).max(1),
        height: (height as u32).max(1),
    }
}
