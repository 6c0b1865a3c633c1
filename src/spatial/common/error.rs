use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorrectionError {
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("Failed to open file: {0}")]
    FileOpenFailed(String),

    #[error("Failed to read file: {0}")]
    FileReadFailed(String),

    #[error("Invalid calibration: {0}")]
    InvalidCalibration(String),

    #[error("Invalid image dimensions: width={0}, height={1}, pixels={2}")]
    InvalidDimensions(i64, i64, usize),

    #[error("Mask dimensions {found:?} do not match image dimensions {expected:?}")]
    MaskDimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("16-bit overflow persists after rescaling (brightest value {0})")]
    OverflowUnrecoverable(f32),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CorrectionError {
    /// errno-style status code used by the legacy C entry point.
    pub fn legacy_code(&self) -> i32 {
        match self {
            CorrectionError::OutOfMemory(_) => 12,
            CorrectionError::FileOpenFailed(_) => 2,
            CorrectionError::FileReadFailed(_) | CorrectionError::IoError(_) => 5,
            CorrectionError::InvalidCalibration(_)
            | CorrectionError::InvalidDimensions(..)
            | CorrectionError::MaskDimensionMismatch { .. }
            | CorrectionError::OverflowUnrecoverable(_) => 22,
        }
    }
}

pub type Result<T> = std::result::Result<T, CorrectionError>;
