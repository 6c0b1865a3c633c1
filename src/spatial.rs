//! Spatial distortion correction module
//!
//! This module corrects the geometric distortion of 2-D detector images using a
//! spline calibration file, with separate modules for calibration loading,
//! active-area masks, scatter resampling, gap filling and 16-bit write-back.

pub mod common;
pub mod calibration;
pub mod mask;
pub mod resample;
pub mod fill;
pub mod quantize;
pub mod config;
pub mod pipeline;

pub use common::{
    CorrectionError,
    Result,
    Grid,
    GridShape,
};

pub use calibration::{
    CalibrationPoint,
    CalibrationReader,
    RescaleOutcome,
    SplineCalibration,
    UcaFileReader,
    load_calibration,
    rescale,
};

pub use mask::{
    MaskReader,
    MaskStats,
    SmvMaskReader,
    load_mask,
};

pub use resample::{
    Accumulator,
    AffineTransform,
    GridInterpolator,
    RealSpaceBounds,
    ResampleStats,
    find_limits,
    resample,
    scan_bounds,
};

pub use fill::{
    ExtrapolationStats,
    MissingCount,
    NormalizeStats,
    extrapolate,
    normalize,
};

pub use quantize::{ImageStats, finalize};

pub use config::{CorrectionConfig, CorrectionConfigBuilder, Verbosity, flags};

pub use pipeline::{
    CorrectionReport,
    PipelineTimings,
    SpatialCorrector,
    StepTiming,
    correct,
};
