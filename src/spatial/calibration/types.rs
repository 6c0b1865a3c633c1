//! Spline calibration data types

/// One node of the calibration grid (32 bytes on disk).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CalibrationPoint {
    /// Forward pixel to cm coefficients; carried but unused by the correction
    pub pixel_to_cm: (f32, f32),
    /// Inverse coefficients into the undistorted coordinate space
    pub cm_to_pixel: (f32, f32),
    pub qec: f32,
    pub reserved: [f32; 2],
    pub node_type: u8,
    pub set_id: u8,
    pub calibration_set: u8,
    pub reserved_flag: u8,
}

/// Complete spline calibration: a 512-byte header plus a row-major point grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplineCalibration {
    /// Calibration-native detector width in pixels
    pub detector_width: i16,
    /// Calibration-native detector height in pixels
    pub detector_height: i16,
    pub num_cols: i16,
    pub num_rows: i16,
    pub num_true_regions: i16,
    pub mid_col: i16,
    pub mid_row: i16,
    /// Number of detector tiles; 2 and 4 enable seam handling
    pub num_regions: i16,

    pub axc: f32,
    pub ayc: f32,
    pub rxc: f32,
    pub ryc: f32,
    pub xrcm: f32,
    pub yrcm: f32,
    /// Pixel spacing of grid columns
    pub xrpx: f32,
    /// Pixel spacing of grid rows
    pub yrpx: f32,
    pub x0cm: f32,
    pub y0cm: f32,
    /// Pixel position of grid column 0
    pub x0px: f32,
    /// Pixel position of grid row 0
    pub y0px: f32,
    pub rms_shift: f32,
    pub max_shift: f32,
    pub max_x: f32,
    pub max_y: f32,

    pub lax: [f64; 21],
    pub lay: [f64; 21],
    pub ldx: [f64; 6],
    pub ldy: [f64; 6],

    pub points: Vec<CalibrationPoint>,
}

impl SplineCalibration {
    /// Number of grid nodes the header declares (0 if either count is negative).
    pub fn point_count(&self) -> usize {
        let cols = usize::try_from(self.num_cols).unwrap_or(0);
        let rows = usize::try_from(self.num_rows).unwrap_or(0);
        cols * rows
    }

    /// Plausibility check used to decide whether a cached calibration can be reused.
    pub fn is_populated(&self) -> bool {
        (2..32000).contains(&self.detector_width)
            && (2..32000).contains(&self.detector_height)
            && !self.points.is_empty()
    }

    /// Builds a calibration whose grid reproduces pixel positions exactly:
    /// `num_cols x num_rows` nodes spread evenly over a `width x height`
    /// detector, with real-space y measured upward from the bottom row.
    pub fn uniform(width: i16, height: i16, num_cols: i16, num_rows: i16) -> Self {
        let xrpx = f32::from(width - 1) / f32::from(num_cols - 1);
        let yrpx = f32::from(height - 1) / f32::from(num_rows - 1);
        let top = f32::from(height - 1);
        let mut points = Vec::with_capacity(usize::try_from(num_cols * num_rows).unwrap_or(0));
        for row in 0..num_rows {
            for col in 0..num_cols {
                let x = f32::from(col) * xrpx;
                let y = f32::from(row) * yrpx;
                points.push(CalibrationPoint {
                    pixel_to_cm: (x, y),
                    cm_to_pixel: (x, top - y),
                    ..CalibrationPoint::default()
                });
            }
        }
        Self {
            detector_width: width,
            detector_height: height,
            num_cols,
            num_rows,
            num_true_regions: 1,
            mid_col: num_cols / 2,
            mid_row: num_rows / 2,
            num_regions: 1,
            axc: f32::from(width) / 2.0,
            ayc: f32::from(height) / 2.0,
            xrpx,
            yrpx,
            max_x: f32::from(width) + 10.0,
            max_y: f32::from(height) + 10.0,
            points,
            ..Self::default()
        }
    }
}
