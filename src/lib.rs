pub mod logger;
pub mod spatial;

pub use spatial::{correct, CorrectionConfig, CorrectionError, Result, SpatialCorrector};
