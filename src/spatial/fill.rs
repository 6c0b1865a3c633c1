//! Gap filling module
//!
//! After resampling, each output pixel holds a weighted sum. This module turns
//! those sums into intensities and fills pixels that received no contribution
//! from their neighbours.

mod normalize;
mod extrapolate;

#[cfg(test)]
mod tests;

pub use normalize::{normalize, NormalizeStats};
pub use extrapolate::{extrapolate, ExtrapolationStats};

use crate::spatial::common::{GridShape, FUZZ};

/// Pixels without an interpolated value, broken down by distance to the border.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MissingCount {
    pub total: usize,
    /// Within three pixels of the image edge
    pub near_edge: usize,
    /// Within one pixel of the image edge
    pub on_edge: usize,
}

impl MissingCount {
    fn record(&mut self, shape: GridShape, col: usize, row: usize) {
        self.total += 1;
        if shape.near_border(col, row, 4) {
            self.near_edge += 1;
            if shape.near_border(col, row, 2) {
                self.on_edge += 1;
            }
        }
    }

    /// Counts pixels whose accumulated weight is at most `FUZZ`.
    pub fn scan(shape: GridShape, weight: &[f32]) -> Self {
        let mut count = Self::default();
        for ((col, row), &w) in shape.coords().zip(weight) {
            if is_missing(w) {
                count.record(shape, col, row);
            }
        }
        count
    }
}

fn is_missing(weight: f32) -> bool {
    f64::from(weight) <= FUZZ
}
