use std::io::Write;
use std::path::Path;

use smvspatial::spatial::{
    flags, load_calibration, CorrectionConfig, CorrectionError, RescaleOutcome,
    SplineCalibration, SpatialCorrector,
};
use tempfile::{NamedTempFile, TempDir};

fn setup() {
    let _ = smvspatial::logger::try_init();
}

fn write_calibration(dir: &Path, name: &str, calibration: &SplineCalibration) -> String {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    calibration.write_to(file).unwrap();
    path.to_string_lossy().into_owned()
}

/// 8x8 detector on a 3x3 grid with the centre node pulled off its nominal
/// position, so the correction actually moves intensity around.
fn distorted_calibration() -> SplineCalibration {
    let mut calibration = SplineCalibration::uniform(8, 8, 3, 3);
    let centre = &mut calibration.points[4];
    centre.cm_to_pixel.0 += 0.6;
    centre.cm_to_pixel.1 -= 0.4;
    calibration
}

fn write_mask(width: usize, height: usize, active: impl Fn(usize, usize) -> bool) -> NamedTempFile {
    let text = format!(
        "{{\nHEADER_BYTES=512;\nSIZE1={};\nSIZE2={};\nBYTE_ORDER=little_endian;\n}}\n",
        width, height
    );
    let mut header = vec![0u8; 512];
    header[..text.len()].copy_from_slice(text.as_bytes());

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&header).unwrap();
    for col in 0..width {
        for row in 0..height {
            file.write_all(&u16::from(active(col, row)).to_le_bytes()).unwrap();
        }
    }
    file.flush().unwrap();
    file
}

fn gradient(width: usize, height: usize) -> Vec<u16> {
    (0..width * height).map(|i| 500 + (i as u16 * 37) % 3000).collect()
}

#[test]
fn test_identity_round_trip_through_file() {
    setup();
    let dir = TempDir::new().unwrap();
    let path = write_calibration(dir.path(), "identity.uca", &SplineCalibration::uniform(4, 4, 2, 2));
    let original: Vec<u16> = (1..=16).map(|v| v * 1000).collect();
    let mut pixels = original.clone();

    smvspatial::correct(&mut pixels, 4, 4, 0, &path, None).unwrap();

    assert_eq!(pixels, original);
}

#[test]
fn test_calibration_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let calibration = distorted_calibration();
    let path = write_calibration(dir.path(), "distorted.uca", &calibration);

    let loaded = load_calibration(&path).unwrap();

    assert_eq!(loaded, calibration);
}

#[test]
fn test_all_ones_mask_matches_unmasked_run() {
    setup();
    let dir = TempDir::new().unwrap();
    let path = write_calibration(dir.path(), "distorted.uca", &distorted_calibration());
    let mask = write_mask(8, 8, |_, _| true);
    let mask_path = mask.path().to_string_lossy().into_owned();
    let original = gradient(8, 8);

    let mut unmasked = original.clone();
    smvspatial::correct(&mut unmasked, 8, 8, 0, &path, None).unwrap();

    let mut masked = original.clone();
    smvspatial::correct(&mut masked, 8, 8, flags::ACTIVE_ONLY, &path, Some(mask_path.as_str())).unwrap();

    let mut flag_off = original.clone();
    smvspatial::correct(&mut flag_off, 8, 8, 0, &path, Some(mask_path.as_str())).unwrap();

    assert_ne!(unmasked, original);
    assert_eq!(masked, unmasked);
    assert_eq!(flag_off, unmasked);
}

#[test]
fn test_inactive_pixels_never_contribute() {
    setup();
    let dir = TempDir::new().unwrap();
    let path = write_calibration(dir.path(), "identity.uca", &SplineCalibration::uniform(8, 8, 2, 2));
    let inside = |col: usize, row: usize| (2..6).contains(&col) && (1..5).contains(&row);
    let mask = write_mask(8, 8, inside);

    let mut pixels = vec![0u16; 64];
    for col in 0..8 {
        for row in 0..8 {
            pixels[col * 8 + row] = if inside(col, row) { 100 } else { 60000 };
        }
    }

    let config = CorrectionConfig::builder()
        .active_only(true)
        .mask_path(Some(mask.path()))
        .build();
    let mut corrector = SpatialCorrector::new(config);
    let report = corrector.correct(&mut pixels, 8, 8, &path).unwrap();

    assert_eq!(report.mask.map(|m| m.active), Some(16));
    assert_eq!(report.bounds.visited, 16);
    assert_eq!(report.resample.masked, 48);
    assert_eq!(report.resample.contributing, 16);
    assert_eq!(report.image.max_value, 100);
    assert!(pixels.iter().all(|&p| p == 100));
}

#[test]
fn test_binned_image_uses_full_resolution_calibration() {
    setup();
    let dir = TempDir::new().unwrap();
    let path = write_calibration(dir.path(), "full.uca", &SplineCalibration::uniform(8, 8, 2, 2));
    let original: Vec<u16> = (0..16).map(|v| v * 250).collect();
    let mut pixels = original.clone();

    let mut corrector = SpatialCorrector::default();
    let report = corrector.correct(&mut pixels, 4, 4, &path).unwrap();

    assert!(matches!(report.rescale, RescaleOutcome::Scaled { .. }));
    assert_eq!(pixels, original);
}

#[test]
fn test_cached_calibration_survives_file_removal() {
    setup();
    let dir = TempDir::new().unwrap();
    let path = write_calibration(dir.path(), "cached.uca", &SplineCalibration::uniform(4, 4, 2, 2));
    let mut corrector = SpatialCorrector::default();
    let mut pixels: Vec<u16> = (0..16).collect();

    corrector.correct(&mut pixels, 4, 4, &path).unwrap();
    std::fs::remove_file(&path).unwrap();
    corrector.correct(&mut pixels, 4, 4, &path).unwrap();

    corrector.invalidate_calibration();
    let err = corrector.correct(&mut pixels, 4, 4, &path).unwrap_err();
    assert!(matches!(err, CorrectionError::FileOpenFailed(_)));
}

#[test]
fn test_missing_calibration_reports_open_failure() {
    setup();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.uca");
    let mut pixels = vec![42u16; 16];

    let err = smvspatial::correct(&mut pixels, 4, 4, 0, &path.to_string_lossy(), None).unwrap_err();

    assert!(matches!(err, CorrectionError::FileOpenFailed(_)));
    assert_eq!(err.legacy_code(), 2);
    assert!(pixels.iter().all(|&p| p == 42));
}

#[test]
fn test_truncated_calibration_reports_read_failure() {
    let dir = TempDir::new().unwrap();
    let bytes = SplineCalibration::uniform(4, 4, 2, 2).to_bytes();
    let path = dir.path().join("short.uca");
    std::fs::write(&path, &bytes[..bytes.len() - 10]).unwrap();
    let mut pixels = vec![0u16; 16];

    let err = smvspatial::correct(&mut pixels, 4, 4, 0, &path.to_string_lossy(), None).unwrap_err();

    assert!(matches!(err, CorrectionError::FileReadFailed(_)));
    assert_eq!(err.legacy_code(), 5);
}

#[test]
fn test_mask_of_wrong_size_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_calibration(dir.path(), "identity.uca", &SplineCalibration::uniform(4, 4, 2, 2));
    let mask = write_mask(8, 8, |_, _| true);
    let mask_path = mask.path().to_string_lossy().into_owned();
    let mut pixels = vec![7u16; 16];

    let err = smvspatial::correct(
        &mut pixels,
        4,
        4,
        flags::ACTIVE_ONLY,
        &path,
        Some(mask_path.as_str()),
    )
    .unwrap_err();

    assert!(matches!(err, CorrectionError::MaskDimensionMismatch { .. }));
    assert_eq!(err.legacy_code(), 22);
    assert!(pixels.iter().all(|&p| p == 7));
}

#[test]
fn test_invalid_dimensions() {
    let mut pixels = vec![0u16; 16];
    let err = smvspatial::correct(&mut pixels, -4, 4, 0, "unused.uca", None).unwrap_err();
    assert!(matches!(err, CorrectionError::InvalidDimensions(-4, 4, 16)));

    let err = smvspatial::correct(&mut pixels, 4, 3, 0, "unused.uca", None).unwrap_err();
    assert!(matches!(err, CorrectionError::InvalidDimensions(4, 3, 16)));
}
