use std::path::Path;

use crate::spatial::common::error::Result;
use crate::spatial::calibration::types::SplineCalibration;

pub trait CalibrationReader {
    fn read_calibration(&self, path: &Path) -> Result<SplineCalibration>;
}
