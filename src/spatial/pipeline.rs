//! Correction pipeline module
//!
//! Chains the calibration, mask, resampling, fill and write-back stages into
//! a single in-place correction of a 16-bit image.

mod corrector;
mod timing;


pub use corrector::{correct, CorrectionReport, SpatialCorrector};
pub use timing::{PipelineTimings, StepTiming};
