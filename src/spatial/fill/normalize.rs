use crate::spatial::fill::{is_missing, MissingCount};
use crate::spatial::resample::Accumulator;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Pixels whose weighted sum was turned into an intensity
    pub resolved: usize,
    pub missing: MissingCount,
}

/// Divides every accumulated intensity by its weight. Pixels without weight
/// are left untouched and counted for the extrapolation pass.
pub fn normalize(accumulator: &mut Accumulator) -> NormalizeStats {
    let shape = accumulator.shape();
    let mut stats = NormalizeStats::default();
    let Accumulator { intensity, weight } = accumulator;

    for (((col, row), value), &w) in shape
        .coords()
        .zip(intensity.as_mut_slice())
        .zip(weight.as_slice())
    {
        if is_missing(w) {
            stats.missing.record(shape, col, row);
        } else {
            *value /= w;
            stats.resolved += 1;
        }
    }
    stats
}
