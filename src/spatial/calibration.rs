//! Spline calibration module
//!
//! This module reads `.uca` spline correction files and adapts them to the
//! pixel dimensions of the image being corrected.

mod reader;
mod uca_file_reader;
mod rescale;
pub mod types;

pub use reader::CalibrationReader;
pub use uca_file_reader::{UcaFileReader, load_calibration, HEADER_BYTES, POINT_BYTES};
pub use rescale::{rescale, RescaleOutcome};
pub use types::{CalibrationPoint, SplineCalibration};
