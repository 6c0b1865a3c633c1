use tracing::debug;

use crate::spatial::common::error::{CorrectionError, Result};
use crate::spatial::common::{Grid, GridShape};
use crate::spatial::resample::interpolate::GridInterpolator;
use crate::spatial::resample::limits::{check_mask, AffineTransform};

/// Weighted intensity and weight sums for every output pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    pub intensity: Grid<f32>,
    pub weight: Grid<f32>,
}

impl Accumulator {
    pub fn new(shape: GridShape) -> Result<Self> {
        Ok(Self {
            intensity: Grid::filled(shape, 0.0)?,
            weight: Grid::filled(shape, 0.0)?,
        })
    }

    pub fn shape(&self) -> GridShape {
        self.intensity.shape()
    }

    /// Spreads `value`, landing at output position `(x, y)`, over the four
    /// surrounding pixels with bilinear weights. Returns `false` when the
    /// position lies outside `[-1, width) x [-1, height)`; neighbours that fall
    /// off the image are skipped individually.
    pub fn deposit(&mut self, x: f64, y: f64, value: f64) -> bool {
        let shape = self.shape();
        let inside = x >= -1.0 && x < shape.width as f64 && y >= -1.0 && y < shape.height as f64;
        if !inside {
            return false;
        }

        let (fx, fy) = (x.floor(), y.floor());
        let (px, py) = (x - fx, y - fy);
        let (ix, iy) = (fx as isize, fy as isize);
        let corners = [
            (0, 0, (1.0 - px) * (1.0 - py)),
            (0, 1, py * (1.0 - px)),
            (1, 0, px * (1.0 - py)),
            (1, 1, px * py),
        ];

        let intensity = self.intensity.as_mut_slice();
        let weight = self.weight.as_mut_slice();
        for (dc, dr, wt) in corners {
            if let Some(i) = shape.offset(ix + dc, iy + dr) {
                intensity[i] += (wt * value) as f32;
                weight[i] += wt as f32;
            }
        }
        true
    }
}

/// Counters from one resampling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResampleStats {
    /// Input pixels scattered into the output
    pub contributing: usize,
    /// Input pixels whose position fell outside the output image
    pub out_of_bounds: usize,
    /// Input pixels skipped as inactive
    pub masked: usize,
}

/// Scatters every (active) input pixel into a fresh accumulator.
///
/// This is forward resampling: several input pixels may land on the same
/// output pixel and each input pixel may feed up to four output pixels.
pub fn resample(
    interpolator: &GridInterpolator<'_>,
    affine: &AffineTransform,
    mask: Option<&Grid<u8>>,
    pixels: &[u16],
) -> Result<(Accumulator, ResampleStats)> {
    let shape = interpolator.shape();
    if pixels.len() != shape.len() {
        return Err(CorrectionError::InvalidDimensions(
            shape.width as i64,
            shape.height as i64,
            pixels.len(),
        ));
    }
    check_mask(mask, shape)?;

    let mut accumulator = Accumulator::new(shape)?;
    let mut stats = ResampleStats::default();

    for ((col, row), &value) in shape.coords().zip(pixels) {
        if mask.is_some_and(|m| m[(col, row)] == 0) {
            stats.masked += 1;
            continue;
        }
        let (xc, yc) = interpolator.real_space(col, row);
        let (x, y) = affine.apply(xc, yc);
        if accumulator.deposit(x, y, f64::from(value)) {
            stats.contributing += 1;
        } else {
            stats.out_of_bounds += 1;
        }
    }

    debug!(
        contributing = stats.contributing,
        out_of_bounds = stats.out_of_bounds,
        masked = stats.masked,
        "Scatter resampling complete"
    );
    Ok((accumulator, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::calibration::SplineCalibration;
    use crate::spatial::resample::limits::find_limits;

    #[test]
    fn test_deposit_splits_bilinearly() {
        let mut acc = Accumulator::new(GridShape::new(4, 4)).unwrap();
        assert!(acc.deposit(1.25, 2.5, 100.0));

        assert!((acc.weight[(1, 2)] - 0.375).abs() < 1e-6);
        assert!((acc.weight[(1, 3)] - 0.375).abs() < 1e-6);
        assert!((acc.weight[(2, 2)] - 0.125).abs() < 1e-6);
        assert!((acc.weight[(2, 3)] - 0.125).abs() < 1e-6);
        assert!((acc.intensity[(1, 2)] - 37.5).abs() < 1e-4);
        let total: f32 = acc.weight.as_slice().iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_deposit_rejects_far_positions() {
        let mut acc = Accumulator::new(GridShape::new(4, 4)).unwrap();
        assert!(!acc.deposit(-1.5, 1.0, 1.0));
        assert!(!acc.deposit(1.0, 4.0, 1.0));
        assert!(!acc.deposit(f64::NAN, 1.0, 1.0));
        assert!(acc.weight.as_slice().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_deposit_left_of_image_keeps_inner_share() {
        let mut acc = Accumulator::new(GridShape::new(4, 4)).unwrap();
        assert!(acc.deposit(-0.25, 1.0, 8.0));
        // three quarters land on column 0, the rest falls off the edge
        assert!((acc.weight[(0, 1)] - 0.75).abs() < 1e-6);
        assert!((acc.intensity[(0, 1)] - 6.0).abs() < 1e-5);
        let total: f32 = acc.weight.as_slice().iter().sum();
        assert!((total - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_weights_are_conserved() {
        let shape = GridShape::new(16, 12);
        let calibration = SplineCalibration::uniform(16, 12, 4, 3);
        let interpolator = GridInterpolator::new(&calibration, shape).unwrap();
        let affine = find_limits(&calibration, shape, None).unwrap();
        let pixels: Vec<u16> = (0..shape.len()).map(|i| (i % 50) as u16).collect();

        let (acc, stats) = resample(&interpolator, &affine, None, &pixels).unwrap();

        assert_eq!(stats.contributing, shape.len());
        assert_eq!(stats.out_of_bounds, 0);
        let total: f64 = acc.weight.as_slice().iter().map(|&w| f64::from(w)).sum();
        assert!((total - shape.len() as f64).abs() < 1e-3, "total weight {total}");
    }

    #[test]
    fn test_masked_pixels_do_not_contribute() {
        let shape = GridShape::new(6, 6);
        let calibration = SplineCalibration::uniform(6, 6, 2, 2);
        let interpolator = GridInterpolator::new(&calibration, shape).unwrap();
        let mut mask = Grid::filled(shape, 1u8).unwrap();
        mask[(0, 0)] = 0;
        mask[(5, 5)] = 0;
        let affine = find_limits(&calibration, shape, Some(&mask)).unwrap();
        let pixels = vec![10u16; shape.len()];

        let (acc, stats) = resample(&interpolator, &affine, Some(&mask), &pixels).unwrap();

        assert_eq!(stats.masked, 2);
        assert_eq!(stats.contributing, 34);
        let total: f64 = acc.weight.as_slice().iter().map(|&w| f64::from(w)).sum();
        assert!((total - 34.0).abs() < 1e-3);
    }

    #[test]
    fn test_pixel_count_must_match_shape() {
        let shape = GridShape::new(4, 4);
        let calibration = SplineCalibration::uniform(4, 4, 2, 2);
        let interpolator = GridInterpolator::new(&calibration, shape).unwrap();
        let affine = find_limits(&calibration, shape, None).unwrap();
        let err = resample(&interpolator, &affine, None, &[0u16; 15]).unwrap_err();
        assert!(matches!(err, CorrectionError::InvalidDimensions(4, 4, 15)));
    }
}
