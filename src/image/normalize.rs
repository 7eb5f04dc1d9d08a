//! Min/max normalization of float arrays into 8-bit gray.

/// Gray level used when the input has no usable range.
pub const FALLBACK_GRAY: u8 = 128;

/// Bytes per output pixel (gray, gray, gray, alpha).
pub const BYTES_PER_PIXEL: usize = 4;

/// Range of the finite values in a buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    /// Scan `values` for the smallest and largest finite element.
    ///
    /// Returns `None` when no element is finite.
    pub fn of(values: &[f32]) -> Option<Self> {
        values
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |range, &v| {
                let v = v as f64;
                Some(match range {
                    None => ValueRange { min: v, max: v },
                    Some(r) => ValueRange {
                        min: r.min.min(v),
                        max: r.max.max(v),
                    },
                })
            })
    }

    /// Whether every finite value is the same.
    pub fn is_constant(&self) -> bool {
        self.max == self.min
    }

    /// Map `v` into `0..=255`.
    ///
    /// The range must not be constant. Non-finite values pin to the ends:
    /// NaN and -inf to 0, +inf to 255.
    pub fn gray(&self, v: f32) -> u8 {
        if v.is_nan() {
            return 0;
        }
        if v.is_infinite() {
            return if v > 0.0 { 255 } else { 0 };
        }
        let norm = (v as f64 - self.min) / (self.max - self.min);
        (norm * 255.0).round().clamp(0.0, 255.0) as u8
    }
}

/// Convert `values` to RGBA pixels: `[g, g, g, 255]` per element.
///
/// The smallest finite value maps to 0 and the largest to 255. Constant
/// input, or input with no finite values, becomes uniform [`FALLBACK_GRAY`].
pub fn normalize_to_grayscale(values: &[f32]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(values.len() * BYTES_PER_PIXEL);

    match ValueRange::of(values).filter(|r| !r.is_constant()) {
        Some(range) => {
            for &v in values {
                let g = range.gray(v);
                pixels.extend_from_slice(&[g, g, g, 255]);
            }
        }
        None => {
            log::debug!(
                "normalizing {} values with no range, using fallback gray",
                values.len()
            );
            for _ in values {
                pixels.extend_from_slice(&[FALLBACK_GRAY, FALLBACK_GRAY, FALLBACK_GRAY, 255]);
            }
        }
    }

    pixels
}
