//! Image conversion: numeric result array to displayable grayscale pixels.

pub mod normalize;

pub use normalize::{normalize_to_grayscale, ValueRange, BYTES_PER_PIXEL, FALLBACK_GRAY};

/// Errors from building an image out of a value array.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Image must be at least 1x1, got {width}x{height}")]
    Empty { width: u32, height: u32 },
    #[error("{width}x{height} image needs {expected} values, got {got}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        expected: usize,
        got: usize,
    },
}

/// Row-major RGBA8 image whose color channels hold one gray level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayscaleImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl GrayscaleImage {
    /// Normalize `values` into a `width` x `height` image.
    pub fn from_values(values: &[f32], width: u32, height: u32) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::Empty { width, height });
        }
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(ImageError::DimensionMismatch {
                width,
                height,
                expected,
                got: values.len(),
            });
        }

        Ok(Self {
            width,
            height,
            pixels: normalize_to_grayscale(values),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA bytes, `width * height * 4` long.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.width * BYTES_PER_PIXEL as u32
    }

    /// Gray level at column `x`, row `y` (row 0 at the top).
    pub fn gray_at(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        Some(self.pixels[offset])
    }
}
