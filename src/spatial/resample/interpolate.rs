use crate::spatial::calibration::{CalibrationPoint, SplineCalibration};
use crate::spatial::common::error::{CorrectionError, Result};
use crate::spatial::common::GridShape;

/// Grid cell and fractional offset of one pixel coordinate along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisCell {
    index: usize,
    frac: f64,
}

/// Bilinear lookup of undistorted positions from a calibration grid.
///
/// Cell indices depend only on the column (or only on the row), so both axes
/// are resolved once up front and every pixel lookup is four reads and a blend.
pub struct GridInterpolator<'a> {
    points: &'a [CalibrationPoint],
    grid_cols: usize,
    shape: GridShape,
    col_cells: Vec<AxisCell>,
    row_cells: Vec<AxisCell>,
}

impl<'a> GridInterpolator<'a> {
    pub fn new(calibration: &'a SplineCalibration, shape: GridShape) -> Result<Self> {
        let grid_cols = usize::try_from(calibration.num_cols).unwrap_or(0);
        let grid_rows = usize::try_from(calibration.num_rows).unwrap_or(0);
        if grid_cols < 2 || grid_rows < 2 {
            return Err(CorrectionError::InvalidCalibration(format!(
                "grid of {} columns x {} rows cannot be interpolated",
                calibration.num_cols, calibration.num_rows
            )));
        }
        if calibration.points.len() != grid_cols * grid_rows {
            return Err(CorrectionError::InvalidCalibration(format!(
                "grid declares {} points but holds {}",
                grid_cols * grid_rows,
                calibration.points.len()
            )));
        }
        for (name, spacing) in [("xrpx", calibration.xrpx), ("yrpx", calibration.yrpx)] {
            if !spacing.is_finite() || spacing == 0.0 {
                return Err(CorrectionError::InvalidCalibration(format!(
                    "grid spacing {} = {}",
                    name, spacing
                )));
            }
        }

        // A two-tile detector is split between columns; four tiles split both ways.
        let seam_cols = matches!(calibration.num_regions, 2 | 4);
        let seam_rows = calibration.num_regions == 4;

        let col_cells = (0..shape.width)
            .map(|col| {
                axis_cell(
                    col as f64,
                    f64::from(calibration.x0px),
                    f64::from(calibration.xrpx),
                    grid_cols,
                    seam_cols,
                )
            })
            .collect();
        let row_cells = (0..shape.height)
            .map(|row| {
                axis_cell(
                    row as f64,
                    f64::from(calibration.y0px),
                    f64::from(calibration.yrpx),
                    grid_rows,
                    seam_rows,
                )
            })
            .collect();

        Ok(Self {
            points: &calibration.points,
            grid_cols,
            shape,
            col_cells,
            row_cells,
        })
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Undistorted `(x, y)` of pixel `(col, row)`.
    ///
    /// Panics if the pixel lies outside the image shape.
    pub fn real_space(&self, col: usize, row: usize) -> (f64, f64) {
        let cx = self.col_cells[col];
        let cy = self.row_cells[row];
        let (p, q) = (cx.frac, cy.frac);
        let (omp, omq) = (1.0 - p, 1.0 - q);

        let base = cy.index * self.grid_cols + cx.index;
        let c00 = &self.points[base];
        let c01 = &self.points[base + 1];
        let c10 = &self.points[base + self.grid_cols];
        let c11 = &self.points[base + self.grid_cols + 1];

        let blend = |v00: f32, v01: f32, v10: f32, v11: f32| {
            omp * omq * f64::from(v00)
                + omp * q * f64::from(v10)
                + p * omq * f64::from(v01)
                + p * q * f64::from(v11)
        };
        let xc = blend(c00.cm_to_pixel.0, c01.cm_to_pixel.0, c10.cm_to_pixel.0, c11.cm_to_pixel.0);
        let yc = blend(c00.cm_to_pixel.1, c01.cm_to_pixel.1, c10.cm_to_pixel.1, c11.cm_to_pixel.1);
        (xc, yc)
    }
}

/// Locates `pixel` along one grid axis with `nodes` points.
///
/// The index is clamped to `[0, nodes - 2]` so the cell always has a far edge;
/// pixels beyond the grid extrapolate linearly from the outermost cell. With
/// `seam` set, the cell touching the tile boundary in the middle of the grid
/// is avoided so no interpolation spans the physical gap between tiles.
fn axis_cell(pixel: f64, origin: f64, spacing: f64, nodes: usize, seam: bool) -> AxisCell {
    let last = (nodes - 2) as isize;
    let r = (pixel - origin) / spacing;
    let mut index = if r < 0.0 {
        0
    } else if r < (nodes - 1) as f64 {
        r as isize
    } else {
        last
    };
    if seam {
        let mid = (nodes / 2) as isize;
        if index == mid - 1 {
            index -= 1;
        } else if index == mid {
            index += 1;
        }
    }
    let index = index.clamp(0, last) as usize;
    AxisCell { index, frac: r - index as f64 }
}
