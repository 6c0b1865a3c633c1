use tracing::debug;

use crate::spatial::calibration::SplineCalibration;
use crate::spatial::common::DFUZZ;
use crate::spatial::common::error::{CorrectionError, Result};
use crate::spatial::common::{Grid, GridShape};
use crate::spatial::resample::interpolate::GridInterpolator;

/// Extent of the undistorted positions of all visited pixels, together with
/// the pixel where each extreme was found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RealSpaceBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub x_min_at: (usize, usize),
    pub x_max_at: (usize, usize),
    pub y_min_at: (usize, usize),
    pub y_max_at: (usize, usize),
    /// Number of pixels that contributed a finite position
    pub visited: usize,
}

/// Affine map from undistorted space into output pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub x_scale: f64,
    pub x_offset: f64,
    pub y_scale: f64,
    pub y_offset: f64,
}

impl AffineTransform {
    /// Stretches `bounds` over the full image. The y axis is inverted: output
    /// row 0 holds the largest undistorted y.
    pub fn from_bounds(bounds: &RealSpaceBounds, shape: GridShape) -> Result<Self> {
        if bounds.x_max - bounds.x_min <= DFUZZ || bounds.y_max - bounds.y_min <= DFUZZ {
            return Err(CorrectionError::InvalidCalibration(format!(
                "degenerate extent x [{}, {}], y [{}, {}]",
                bounds.x_min, bounds.x_max, bounds.y_min, bounds.y_max
            )));
        }
        let x_scale = (shape.width as f64 - 1.0) / (bounds.x_max - bounds.x_min);
        let y_scale = (shape.height as f64 - 1.0) / (bounds.y_min - bounds.y_max);
        Ok(Self {
            x_scale,
            x_offset: -bounds.x_min * x_scale,
            y_scale,
            y_offset: -bounds.y_max * y_scale,
        })
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.x_scale * x + self.x_offset, self.y_scale * y + self.y_offset)
    }
}

/// Returns `Ok(())` if `mask` is absent or matches `shape`.
pub(crate) fn check_mask(mask: Option<&Grid<u8>>, shape: GridShape) -> Result<()> {
    match mask {
        Some(mask) if mask.shape() != shape => Err(CorrectionError::MaskDimensionMismatch {
            expected: (shape.width, shape.height),
            found: (mask.shape().width, mask.shape().height),
        }),
        _ => Ok(()),
    }
}

/// Walks every pixel (only active ones when a mask is given) and records the
/// extent of their undistorted positions.
pub fn scan_bounds(
    interpolator: &GridInterpolator<'_>,
    mask: Option<&Grid<u8>>,
) -> Result<RealSpaceBounds> {
    let shape = interpolator.shape();
    check_mask(mask, shape)?;

    let mut bounds = RealSpaceBounds {
        x_min: f64::INFINITY,
        x_max: f64::NEG_INFINITY,
        y_min: f64::INFINITY,
        y_max: f64::NEG_INFINITY,
        x_min_at: (0, 0),
        x_max_at: (0, 0),
        y_min_at: (0, 0),
        y_max_at: (0, 0),
        visited: 0,
    };

    for (col, row) in shape.coords() {
        if mask.is_some_and(|m| m[(col, row)] == 0) {
            continue;
        }
        let (xc, yc) = interpolator.real_space(col, row);
        if !xc.is_finite() || !yc.is_finite() {
            continue;
        }
        bounds.visited += 1;
        if xc < bounds.x_min {
            bounds.x_min = xc;
            bounds.x_min_at = (col, row);
        }
        if xc > bounds.x_max {
            bounds.x_max = xc;
            bounds.x_max_at = (col, row);
        }
        if yc < bounds.y_min {
            bounds.y_min = yc;
            bounds.y_min_at = (col, row);
        }
        if yc > bounds.y_max {
            bounds.y_max = yc;
            bounds.y_max_at = (col, row);
        }
    }

    if bounds.visited == 0 {
        return Err(CorrectionError::InvalidCalibration(
            "no pixel produced a finite undistorted position".to_string(),
        ));
    }
    debug!(
        x_min = bounds.x_min,
        x_max = bounds.x_max,
        y_min = bounds.y_min,
        y_max = bounds.y_max,
        visited = bounds.visited,
        "Scanned undistorted extent"
    );
    Ok(bounds)
}

/// Computes the transform that spreads the undistorted extent of the
/// (active) detector over the full output image.
pub fn find_limits(
    calibration: &SplineCalibration,
    shape: GridShape,
    mask: Option<&Grid<u8>>,
) -> Result<AffineTransform> {
    let interpolator = GridInterpolator::new(calibration, shape)?;
    let bounds = scan_bounds(&interpolator, mask)?;
    AffineTransform::from_bounds(&bounds, shape)
}
