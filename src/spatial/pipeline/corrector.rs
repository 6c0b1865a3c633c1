use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span, instrument, warn};

use crate::spatial::calibration::{
    rescale, CalibrationReader, RescaleOutcome, SplineCalibration, UcaFileReader,
};
use crate::spatial::common::error::{CorrectionError, Result};
use crate::spatial::common::{Grid, GridShape};
use crate::spatial::config::{CorrectionConfig, Verbosity};
use crate::spatial::fill::{extrapolate, normalize, ExtrapolationStats, NormalizeStats};
use crate::spatial::mask::{MaskReader, MaskStats, SmvMaskReader};
use crate::spatial::pipeline::timing::PipelineTimings;
use crate::spatial::quantize::{finalize, ImageStats};
use crate::spatial::resample::{
    resample, scan_bounds, AffineTransform, GridInterpolator, RealSpaceBounds, ResampleStats,
};

/// Stage summaries go to `info` when the caller asked for verbose output.
macro_rules! report {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+);
        } else {
            tracing::debug!($($arg)+);
        }
    };
}

/// Everything one correction learned about the image and the calibration.
#[derive(Debug, Clone)]
pub struct CorrectionReport {
    pub rescale: RescaleOutcome,
    /// Present when an active-area mask was applied
    pub mask: Option<MaskStats>,
    pub bounds: RealSpaceBounds,
    pub affine: AffineTransform,
    pub resample: ResampleStats,
    pub normalize: NormalizeStats,
    /// `None` when extrapolation is disabled in the configuration
    pub extrapolation: Option<ExtrapolationStats>,
    pub image: ImageStats,
}

struct CachedCalibration {
    path: PathBuf,
    calibration: SplineCalibration,
}

/// Corrects images against spline calibrations, keeping the last calibration
/// file in memory so that a series of frames only reads it once.
pub struct SpatialCorrector<C: CalibrationReader, M: MaskReader> {
    reader: C,
    mask_reader: M,
    config: CorrectionConfig,
    cached: Option<CachedCalibration>,
}

impl SpatialCorrector<UcaFileReader, SmvMaskReader> {
    pub fn new(config: CorrectionConfig) -> Self {
        Self {
            reader: UcaFileReader,
            mask_reader: SmvMaskReader,
            config,
            cached: None,
        }
    }
}

impl Default for SpatialCorrector<UcaFileReader, SmvMaskReader> {
    fn default() -> Self {
        Self::new(CorrectionConfig::default())
    }
}

impl<C: CalibrationReader, M: MaskReader> SpatialCorrector<C, M> {
    pub fn with_custom(reader: C, mask_reader: M, config: CorrectionConfig) -> Self {
        Self {
            reader,
            mask_reader,
            config,
            cached: None,
        }
    }

    fn validate_dimensions(width: usize, height: usize, pixels: usize) -> Result<GridShape> {
        let shape = GridShape::new(width, height);
        if width == 0 || height == 0 || shape.checked_len() != Some(pixels) {
            return Err(CorrectionError::InvalidDimensions(
                width as i64,
                height as i64,
                pixels,
            ));
        }
        Ok(shape)
    }

    /// Working copy of the calibration at `path`, read from disk only when
    /// it is not the one already cached.
    fn working_calibration(&mut self, path: &Path) -> Result<SplineCalibration> {
        if let Some(cached) = &self.cached {
            if cached.path.as_path() == path {
                debug!(path = %path.display(), "Reusing cached calibration");
                return Ok(cached.calibration.clone());
            }
        }

        let calibration = self.reader.read_calibration(path)?;
        if !calibration.is_populated() {
            return Err(CorrectionError::InvalidCalibration(format!(
                "{}: implausible detector size {}x{} with {} points",
                path.display(),
                calibration.detector_width,
                calibration.detector_height,
                calibration.points.len()
            )));
        }
        let working = calibration.clone();
        self.cached = Some(CachedCalibration {
            path: path.to_path_buf(),
            calibration,
        });
        Ok(working)
    }

    fn active_area(&self, shape: GridShape) -> Result<Option<Grid<u8>>> {
        let Some(path) = self.config.effective_mask_path() else {
            if self.config.active_only {
                debug!("Active-area mode requested without a mask file");
            }
            return Ok(None);
        };
        let mask = self.mask_reader.read_mask(path, shape)?;
        if mask.is_none() {
            warn!(
                path = %path.display(),
                "Active-area mask not found, correcting the full image"
            );
        }
        Ok(mask)
    }

    /// Corrects `pixels` (a column-major `width x height` image) in place.
    ///
    /// The buffer is only written once every stage has succeeded.
    pub fn correct<P: AsRef<Path>>(
        &mut self,
        pixels: &mut [u16],
        width: usize,
        height: usize,
        calibration_path: P,
    ) -> Result<CorrectionReport> {
        let (report, timings) =
            self.correct_with_timings(pixels, width, height, calibration_path)?;
        if self.config.verbosity == Verbosity::Very {
            timings.log_summary();
        }
        Ok(report)
    }

    #[instrument(
        skip_all,
        fields(width = width, height = height, calibration = %calibration_path.as_ref().display())
    )]
    pub fn correct_with_timings<P: AsRef<Path>>(
        &mut self,
        pixels: &mut [u16],
        width: usize,
        height: usize,
        calibration_path: P,
    ) -> Result<(CorrectionReport, PipelineTimings)> {
        let calibration_path = calibration_path.as_ref();
        let verbose = self.config.is_verbose();
        let very_verbose = self.config.verbosity == Verbosity::Very;
        let mut timings = PipelineTimings::new();

        let shape = Self::validate_dimensions(width, height, pixels.len())?;
        info!("Starting spatial correction of {}x{} image", width, height);

        let mut calibration = timings.time("load_calibration", || {
            let _span = info_span!("load_calibration").entered();
            self.working_calibration(calibration_path)
        })?;

        let rescaled = timings.time("rescale", || {
            let _span = info_span!("rescale").entered();
            rescale(&mut calibration, width, height)
        })?;
        if let RescaleOutcome::Scaled { x_scale, y_scale } = rescaled {
            report!(verbose, x_scale, y_scale, "Spline rescaled to image dimensions");
        }

        let mask = timings.time("load_mask", || {
            let _span = info_span!("load_mask").entered();
            self.active_area(shape)
        })?;
        let mask_stats = mask.as_ref().map(MaskStats::of);
        if let Some(stats) = mask_stats {
            report!(verbose, active = stats.active, total = stats.total, "Active-area mask applied");
        }

        let interpolator = GridInterpolator::new(&calibration, shape)?;

        let (bounds, affine) = timings.time("find_limits", || {
            let _span = info_span!("find_limits").entered();
            let bounds = scan_bounds(&interpolator, mask.as_ref())?;
            let affine = AffineTransform::from_bounds(&bounds, shape)?;
            Ok::<_, CorrectionError>((bounds, affine))
        })?;
        report!(
            verbose,
            x_min = bounds.x_min,
            x_max = bounds.x_max,
            y_min = bounds.y_min,
            y_max = bounds.y_max,
            "Undistorted image extent"
        );
        if very_verbose {
            info!(
                x_min_at = ?bounds.x_min_at,
                x_max_at = ?bounds.x_max_at,
                y_min_at = ?bounds.y_min_at,
                y_max_at = ?bounds.y_max_at,
                "Extremes found at pixels"
            );
            info!(
                x_scale = affine.x_scale,
                x_offset = affine.x_offset,
                y_scale = affine.y_scale,
                y_offset = affine.y_offset,
                "Affine transform"
            );
        }

        let (mut accumulator, resample_stats) = timings.time("resample", || {
            let _span = info_span!("resample").entered();
            resample(&interpolator, &affine, mask.as_ref(), pixels)
        })?;

        let normalize_stats = timings.time("normalize", || {
            let _span = info_span!("normalize").entered();
            normalize(&mut accumulator)
        });
        report!(
            verbose,
            missing = normalize_stats.missing.total,
            near_edge = normalize_stats.missing.near_edge,
            on_edge = normalize_stats.missing.on_edge,
            "Pixels not interpolated"
        );

        let extrapolation = if self.config.extrapolate {
            let stats = timings.time("extrapolate", || {
                let _span = info_span!("extrapolate").entered();
                extrapolate(&mut accumulator, normalize_stats.missing.total)
            });
            report!(verbose, corrected = stats.corrected, "Pixels extrapolated");
            if stats.remaining.total > 0 {
                warn!(
                    remaining = stats.remaining.total,
                    near_edge = stats.remaining.near_edge,
                    on_edge = stats.remaining.on_edge,
                    "Pixels left without a value after extrapolation"
                );
            }
            Some(stats)
        } else {
            None
        };

        let image = timings.time("finalize", || {
            let _span = info_span!("finalize").entered();
            finalize(&mut accumulator.intensity, pixels)
        })?;
        report!(
            verbose,
            total_counts = image.total_counts,
            max_value = image.max_value,
            max_at = ?image.max_at,
            "Corrected image written"
        );

        info!(
            "Spatial correction complete: {}x{} in {:.3}ms",
            width,
            height,
            timings.total_duration().as_secs_f64() * 1000.0
        );

        let report = CorrectionReport {
            rescale: rescaled,
            mask: mask_stats,
            bounds,
            affine,
            resample: resample_stats,
            normalize: normalize_stats,
            extrapolation,
            image,
        };
        Ok((report, timings))
    }

    /// Drops the cached calibration so the next correction rereads the file.
    pub fn invalidate_calibration(&mut self) {
        self.cached = None;
    }

    pub fn config(&self) -> &CorrectionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: CorrectionConfig) {
        self.config = config;
    }
}

/// One-shot correction with a legacy-style argument list.
///
/// `flags` is a combination of the bits in [`flags`](crate::spatial::flags);
/// `mask_path` is only consulted with the active-area bit set.
pub fn correct(
    pixels: &mut [u16],
    width: i32,
    height: i32,
    flags: u32,
    calibration_path: &str,
    mask_path: Option<&str>,
) -> Result<()> {
    let len = pixels.len();
    let invalid = || CorrectionError::InvalidDimensions(i64::from(width), i64::from(height), len);
    let w = usize::try_from(width).map_err(|_| invalid())?;
    let h = usize::try_from(height).map_err(|_| invalid())?;

    let mut config = CorrectionConfig::from_flags(flags);
    config.mask_path = mask_path.map(PathBuf::from);

    SpatialCorrector::new(config).correct(pixels, w, h, calibration_path)?;
    Ok(())
}
