use tracing::debug;

use crate::spatial::common::FUZZ;
use crate::spatial::common::error::{CorrectionError, Result};
use crate::spatial::calibration::types::SplineCalibration;

/// What [`rescale`] did to the calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RescaleOutcome {
    /// Image and calibration already share dimensions
    Unchanged,
    /// Pixel-space values were multiplied by these factors
    Scaled { x_scale: f64, y_scale: f64 },
}

/// Adapts the calibration's pixel axes to a `target_width x target_height`
/// image, so binned or sub-sampled frames can reuse a full-resolution spline.
///
/// Real-space (cm) values are left untouched.
pub fn rescale(
    calibration: &mut SplineCalibration,
    target_width: usize,
    target_height: usize,
) -> Result<RescaleOutcome> {
    if calibration.detector_width < 1 || calibration.detector_height < 1 {
        return Err(CorrectionError::InvalidCalibration(format!(
            "calibration dimensions {}x{} are not positive",
            calibration.detector_width, calibration.detector_height
        )));
    }

    let x_scale = target_width as f64 / f64::from(calibration.detector_width);
    let y_scale = target_height as f64 / f64::from(calibration.detector_height);
    if x_scale < FUZZ || y_scale < FUZZ {
        return Err(CorrectionError::InvalidCalibration(format!(
            "cannot rescale {}x{} calibration to {}x{}",
            calibration.detector_width, calibration.detector_height, target_width, target_height
        )));
    }

    if (x_scale - 1.0).abs() <= FUZZ && (y_scale - 1.0).abs() <= FUZZ {
        debug!("No rescaling of spline required: image and spline have same dimensions");
        return Ok(RescaleOutcome::Unchanged);
    }

    debug!("Rescaling spline by a factor of {:.4} in X, {:.4} in Y", x_scale, y_scale);

    let scale_i16 = |v: i16, s: f64| (f64::from(v) * s).round() as i16;
    let scale_f32 = |v: f32, s: f64| (f64::from(v) * s) as f32;

    calibration.detector_width = scale_i16(calibration.detector_width, x_scale);
    calibration.detector_height = scale_i16(calibration.detector_height, y_scale);
    calibration.axc = scale_f32(calibration.axc, x_scale);
    calibration.ayc = scale_f32(calibration.ayc, y_scale);
    calibration.rxc = scale_f32(calibration.rxc, x_scale);
    calibration.ryc = scale_f32(calibration.ryc, y_scale);
    calibration.xrpx = scale_f32(calibration.xrpx, x_scale);
    calibration.yrpx = scale_f32(calibration.yrpx, y_scale);
    for point in &mut calibration.points {
        point.cm_to_pixel.0 = scale_f32(point.cm_to_pixel.0, x_scale);
        point.cm_to_pixel.1 = scale_f32(point.cm_to_pixel.1, y_scale);
    }

    Ok(RescaleOutcome::Scaled { x_scale, y_scale })
}
