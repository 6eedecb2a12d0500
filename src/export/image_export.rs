//! PNG export of captured frames

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during export
#[derive(Error, Debug)]
pub enum ExportError {
    /// Pixel data does not describe a width x height RGBA image
    #[error("Failed to create image buffer: {0}")]
    BufferCreation(String),

    /// Failed to write the image file
    #[error("Failed to save image: {0}")]
    SaveError(#[from] image::ImageError),

    /// Zero-sized image
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Export tightly packed RGBA8 pixels to a PNG file.
///
/// `data` must hold exactly `width * height * 4` bytes, rows top to bottom.
pub fn export_frame<P: AsRef<Path>>(
    path: P,
    width: u32,
    height: u32,
    data: &[u8],
) -> Result<(), ExportError> {
    if width == 0 || height == 0 {
        return Err(ExportError::InvalidDimensions { width, height });
    }

    let expected_len = width as usize * height as usize * 4;
    if data.len() != expected_len {
        return Err(ExportError::BufferCreation(format!(
            "data length {} doesn't match expected {} ({}x{}x4)",
            data.len(),
            expected_len,
            width,
            height
        )));
    }

    let image_buffer: image::RgbaImage = image::ImageBuffer::from_raw(width, height, data.to_vec())
        .ok_or_else(|| ExportError::BufferCreation("raw data rejected by image buffer".to_string()))?;

    image_buffer.save_with_format(path.as_ref(), image::ImageFormat::Png)?;
    Ok(())
}

/// Swap the red and blue channels of BGRA8 pixels in place.
pub fn bgra_to_rgba(pixels: &mut [u8]) {
    for chunk in pixels.chunks_exact_mut(4) {
        chunk.swap(0, 2);
    }
}

/// `screenshot_NNNN.png` inside `dir`.
pub fn screenshot_path(dir: &Path, index: u32) -> PathBuf {
    dir.join(format!("screenshot_{:04}.png", index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let red_pixel = [255u8, 0, 0, 255];
        let data: Vec<u8> = red_pixel.iter().cycle().take(16).copied().collect();

        export_frame(&path, 2, 2, &data).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.get_pixel(1, 1).0, red_pixel);
    }

    #[test]
    fn test_invalid_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let result = export_frame(dir.path().join("empty.png"), 0, 100, &[]);
        assert!(matches!(result, Err(ExportError::InvalidDimensions { .. })));
    }

    #[test]
    fn test_wrong_data_length() {
        let dir = tempfile::tempdir().unwrap();
        let result = export_frame(dir.path().join("short.png"), 10, 10, &[0u8; 100]);
        assert!(matches!(result, Err(ExportError::BufferCreation(_))));
    }

    #[test]
    fn test_bgra_swizzle() {
        let mut pixels = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        bgra_to_rgba(&mut pixels);
        assert_eq!(pixels, vec![3, 2, 1, 4, 7, 6, 5, 8]);
    }

    #[test]
    fn test_screenshot_naming() {
        let path = screenshot_path(Path::new("screenshots"), 7);
        assert_eq!(path, Path::new("screenshots").join("screenshot_0007.png"));
    }
}
