//! Write-back of corrected intensities into the caller's 16-bit buffer.

use tracing::warn;

use crate::spatial::common::error::{CorrectionError, Result};
use crate::spatial::common::Grid;

/// Largest value a 16-bit output pixel can hold.
const MAX_OUTPUT: f32 = 65535.0;

/// Peak value after an overflow rescale, leaving some headroom below `MAX_OUTPUT`.
const RESCALE_TARGET: f32 = 65000.0;

/// Summary of the image written back to the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageStats {
    /// Sum of all written pixel values
    pub total_counts: f64,
    pub max_value: u16,
    /// First pixel (column-major) holding `max_value`
    pub max_at: (usize, usize),
    /// Divisor applied to every value when the corrected image overflowed
    pub rescale_factor: Option<f32>,
}

/// Converts the corrected floating point image to `u16` and writes it into
/// `pixels`.
///
/// If the brightest value exceeds the 16-bit range, the whole image is
/// scaled down so that it peaks at 65000. Nothing is written when the image
/// cannot be brought into range.
pub fn finalize(intensity: &mut Grid<f32>, pixels: &mut [u16]) -> Result<ImageStats> {
    let shape = intensity.shape();
    if pixels.len() != shape.len() {
        return Err(CorrectionError::InvalidDimensions(
            shape.width as i64,
            shape.height as i64,
            pixels.len(),
        ));
    }

    let values = intensity.as_mut_slice();
    let peak = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    let mut rescale_factor = None;
    if peak > MAX_OUTPUT {
        let factor = peak / RESCALE_TARGET;
        warn!(peak, factor, "Corrected image overflows 16 bits, rescaling");
        for v in values.iter_mut() {
            *v /= factor;
        }
        rescale_factor = Some(factor);
    }

    if let Some(&bad) = values.iter().find(|v| !v.is_finite() || **v > MAX_OUTPUT) {
        return Err(CorrectionError::OverflowUnrecoverable(bad));
    }

    let mut stats = ImageStats {
        total_counts: 0.0,
        max_value: 0,
        max_at: (0, 0),
        rescale_factor,
    };
    let mut first = true;
    for (((col, row), &v), out) in shape.coords().zip(values.iter()).zip(pixels.iter_mut()) {
        let q = v.round().clamp(0.0, MAX_OUTPUT) as u16;
        *out = q;
        stats.total_counts += f64::from(q);
        if first || q > stats.max_value {
            stats.max_value = q;
            stats.max_at = (col, row);
            first = false;
        }
    }
    Ok(stats)
}
