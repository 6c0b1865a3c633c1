use super::*;
use crate::spatial::common::GridShape;
use crate::spatial::resample::Accumulator;

fn accumulator_with(shape: GridShape, value: f32, weight: f32) -> Accumulator {
    let mut acc = Accumulator::new(shape).unwrap();
    for v in acc.intensity.as_mut_slice() {
        *v = value * weight;
    }
    for w in acc.weight.as_mut_slice() {
        *w = weight;
    }
    acc
}

#[test]
fn test_normalize_divides_by_weight() {
    let shape = GridShape::new(3, 3);
    let mut acc = accumulator_with(shape, 40.0, 0.5);

    let stats = normalize(&mut acc);

    assert_eq!(stats.resolved, 9);
    assert_eq!(stats.missing, MissingCount::default());
    assert!(acc.intensity.as_slice().iter().all(|&v| (v - 40.0).abs() < 1e-4));
}

#[test]
fn test_normalize_classifies_missing_pixels() {
    let shape = GridShape::new(12, 12);
    let mut acc = accumulator_with(shape, 5.0, 1.0);
    // centre, three pixels from the edge, and on the edge
    acc.weight[(6, 6)] = 0.0;
    acc.weight[(3, 6)] = 0.0;
    acc.weight[(6, 0)] = 0.0;

    let stats = normalize(&mut acc);

    assert_eq!(stats.resolved, 141);
    assert_eq!(
        stats.missing,
        MissingCount {
            total: 3,
            near_edge: 2,
            on_edge: 1,
        }
    );
}

#[test]
fn test_single_interior_hole_is_repaired() {
    let shape = GridShape::new(5, 5);
    let mut acc = accumulator_with(shape, 10.0, 1.0);
    acc.intensity[(2, 2)] = 0.0;
    acc.weight[(2, 2)] = 0.0;

    let normalized = normalize(&mut acc);
    assert_eq!(normalized.missing.total, 1);

    let stats = extrapolate(&mut acc, normalized.missing.total);

    assert_eq!(stats.corrected, 1);
    assert_eq!(stats.remaining, MissingCount::default());
    assert!((acc.intensity[(2, 2)] - 10.0).abs() < 1e-5);
    assert!((acc.weight[(2, 2)] - 0.1).abs() < 1e-7);
}

#[test]
fn test_filled_pixels_seed_outer_neighbours() {
    // 7x1 strip, columns 0 and 1 empty: column 1 is reached first and then
    // feeds column 0
    let shape = GridShape::new(7, 1);
    let mut acc = accumulator_with(shape, 30.0, 1.0);
    for col in 0..2 {
        acc.intensity[(col, 0)] = 0.0;
        acc.weight[(col, 0)] = 0.0;
    }
    let normalized = normalize(&mut acc);

    let stats = extrapolate(&mut acc, normalized.missing.total);

    assert_eq!(stats.corrected, 2);
    assert!((acc.intensity[(1, 0)] - 30.0).abs() < 1e-4);
    assert!((acc.intensity[(0, 0)] - 30.0).abs() < 1e-4);
}

#[test]
fn test_neighbour_mean_is_weighted() {
    let shape = GridShape::new(3, 1);
    let mut acc = Accumulator::new(shape).unwrap();
    acc.intensity[(0, 0)] = 10.0;
    acc.weight[(0, 0)] = 1.0;
    acc.intensity[(2, 0)] = 40.0 * 3.0;
    acc.weight[(2, 0)] = 3.0;
    let normalized = normalize(&mut acc);

    extrapolate(&mut acc, normalized.missing.total);

    // (1*10 + 3*40) / 4
    assert!((acc.intensity[(1, 0)] - 32.5).abs() < 1e-4);
}

#[test]
fn test_empty_image_stays_empty() {
    let shape = GridShape::new(4, 3);
    let mut acc = Accumulator::new(shape).unwrap();
    acc.intensity[(1, 1)] = 1e-9;

    let normalized = normalize(&mut acc);
    let stats = extrapolate(&mut acc, normalized.missing.total);

    assert_eq!(stats.corrected, 0);
    assert_eq!(stats.remaining.total, 12);
    assert!(acc.intensity.as_slice().iter().all(|&v| v == 0.0));
}

#[test]
fn test_nothing_missing_is_a_no_op() {
    let shape = GridShape::new(3, 3);
    let mut acc = accumulator_with(shape, 2.0, 1.0);
    let before = acc.clone();

    let stats = extrapolate(&mut acc, 0);

    assert_eq!(stats, ExtrapolationStats::default());
    assert_eq!(acc, before);
}
