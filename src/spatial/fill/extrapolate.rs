use crate::spatial::common::{GridShape, FUZZ};
use crate::spatial::fill::{is_missing, MissingCount};
use crate::spatial::resample::Accumulator;

/// Weight given to an extrapolated pixel so it can seed its own neighbours
/// without outweighing genuinely interpolated ones.
const EXTRAPOLATED_WEIGHT: f32 = 0.1;

const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtrapolationStats {
    pub corrected: usize,
    /// Pixels still without a value after the pass
    pub remaining: MissingCount,
}

/// Indices `0..n` ordered from the middle outward: `c, c-1, c+1, c-2, ...`.
fn center_out(n: usize) -> impl Iterator<Item = usize> {
    let c = n / 2;
    std::iter::once(Some(c))
        .chain((1..=n).flat_map(move |k| [c.checked_sub(k), Some(c + k)]))
        .flatten()
        .filter(move |&i| i < n)
}

/// Fills missing pixels with the weighted mean of their (up to eight)
/// neighbours, working outward from the image centre so that freshly filled
/// pixels can seed the ones beyond them.
///
/// `missing` is the count reported by [`normalize`](super::normalize); the
/// pass stops as soon as that many pixels have been filled.
pub fn extrapolate(accumulator: &mut Accumulator, missing: usize) -> ExtrapolationStats {
    if missing == 0 {
        return ExtrapolationStats::default();
    }

    let shape = accumulator.shape();
    let Accumulator { intensity, weight } = accumulator;
    let intensity = intensity.as_mut_slice();
    let weight = weight.as_mut_slice();
    let mut corrected = 0;

    'columns: for col in center_out(shape.width) {
        for row in center_out(shape.height) {
            let Some(idx) = shape.index(col, row) else { continue };
            if is_missing(weight[idx]) {
                let (sum_value, sum_weight) = neighbour_sums(shape, intensity, weight, col, row);
                if f64::from(sum_weight) > FUZZ {
                    intensity[idx] = sum_value / sum_weight;
                    weight[idx] = EXTRAPOLATED_WEIGHT;
                    corrected += 1;
                } else {
                    intensity[idx] = 0.0;
                    weight[idx] = 0.0;
                }
            }
            if corrected >= missing {
                break 'columns;
            }
        }
    }

    let remaining = if corrected >= missing {
        MissingCount::default()
    } else {
        MissingCount::scan(shape, weight)
    };
    ExtrapolationStats { corrected, remaining }
}

fn neighbour_sums(
    shape: GridShape,
    intensity: &[f32],
    weight: &[f32],
    col: usize,
    row: usize,
) -> (f32, f32) {
    let mut sum_value = 0.0;
    let mut sum_weight = 0.0;
    for (dc, dr) in NEIGHBOURS {
        let Some(n) = shape.offset(col as isize + dc, row as isize + dr) else { continue };
        let w = weight[n];
        if f64::from(w) > FUZZ {
            sum_weight += w;
            sum_value += w * intensity[n];
        }
    }
    (sum_value, sum_weight)
}
