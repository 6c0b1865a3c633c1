//! Resampling module
//!
//! This module maps every detector pixel through the calibration grid into
//! undistorted space and scatters its intensity into the corrected image.
//! Limit finding and resampling share one interpolation routine so both stages
//! see identical positions.

mod interpolate;
mod limits;
mod scatter;

pub use interpolate::GridInterpolator;
pub use limits::{AffineTransform, RealSpaceBounds, find_limits, scan_bounds};
pub use scatter::{Accumulator, ResampleStats, resample};
