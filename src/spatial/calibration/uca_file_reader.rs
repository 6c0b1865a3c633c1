//! Reader for X-GEN `.uca` spline correction files.
//!
//! The format is a bit-exact legacy layout, big-endian on disk:
//!
//! | offset | contents                                              |
//! |--------|-------------------------------------------------------|
//! | 0      | 8 × i16: width, height, cols, rows, true regions, mid col, mid row, regions |
//! | 16     | 16 × f32: centre, radius and origin scalars           |
//! | 80     | `lax[21]`, `lay[21]`, `ldx[6]`, `ldy[6]` as f64         |
//! | 512    | `rows × cols` 32-byte [`CalibrationPoint`] records      |

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::Path;

use tracing::{debug, instrument};

use crate::spatial::common::byte_order::{BigEndianCursor, BigEndianWriter};
use crate::spatial::common::error::{CorrectionError, Result};
use crate::spatial::calibration::reader::CalibrationReader;
use crate::spatial::calibration::types::{CalibrationPoint, SplineCalibration};

/// Size of the fixed header record.
pub const HEADER_BYTES: usize = 512;

/// Size of one grid-node record.
pub const POINT_BYTES: usize = 32;

/// Calibration reader backed by `.uca` files on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct UcaFileReader;

impl CalibrationReader for UcaFileReader {
    fn read_calibration(&self, path: &Path) -> Result<SplineCalibration> {
        load_calibration(path)
    }
}

/// Opens and decodes a spline calibration file.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_calibration<P: AsRef<Path>>(path: P) -> Result<SplineCalibration> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        CorrectionError::FileOpenFailed(format!("{}: {}", path.display(), e))
    })?;
    let calibration = SplineCalibration::read_from(BufReader::new(file)).map_err(|e| match e {
        CorrectionError::FileReadFailed(msg) => {
            CorrectionError::FileReadFailed(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })?;
    debug!(
        width = calibration.detector_width,
        height = calibration.detector_height,
        cols = calibration.num_cols,
        rows = calibration.num_rows,
        "Loaded correction file"
    );
    Ok(calibration)
}

fn read_block<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => CorrectionError::FileReadFailed(format!(
            "{} truncated: expected {} bytes",
            what,
            buf.len()
        )),
        _ => CorrectionError::FileReadFailed(format!("{}: {}", what, e)),
    })
}

impl SplineCalibration {
    /// Decodes a calibration from any byte stream.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut header = [0u8; HEADER_BYTES];
        read_block(&mut reader, &mut header, "calibration header")?;
        let mut calibration = Self::decode_header(&header)?;

        if calibration.num_cols < 2 || calibration.num_rows < 2 {
            return Err(CorrectionError::InvalidCalibration(format!(
                "grid of {} columns x {} rows cannot be interpolated",
                calibration.num_cols, calibration.num_rows
            )));
        }

        let count = calibration.point_count();
        let byte_len = count * POINT_BYTES;
        let mut raw = Vec::new();
        raw.try_reserve_exact(byte_len).map_err(|e| {
            CorrectionError::OutOfMemory(format!("{} calibration points: {}", count, e))
        })?;
        raw.resize(byte_len, 0);
        read_block(&mut reader, &mut raw, "calibration points")?;

        let mut points = Vec::new();
        points.try_reserve_exact(count).map_err(|e| {
            CorrectionError::OutOfMemory(format!("{} calibration points: {}", count, e))
        })?;
        let mut cursor = BigEndianCursor::new(&raw, "calibration points");
        for _ in 0..count {
            points.push(decode_point(&mut cursor)?);
        }
        calibration.points = points;
        Ok(calibration)
    }

    /// Decodes a calibration held entirely in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from(bytes)
    }

    fn decode_header(header: &[u8; HEADER_BYTES]) -> Result<Self> {
        let mut c = BigEndianCursor::new(header, "calibration header");
        let mut calibration = SplineCalibration {
            detector_width: c.read_i16()?,
            detector_height: c.read_i16()?,
            num_cols: c.read_i16()?,
            num_rows: c.read_i16()?,
            num_true_regions: c.read_i16()?,
            mid_col: c.read_i16()?,
            mid_row: c.read_i16()?,
            num_regions: c.read_i16()?,
            axc: c.read_f32()?,
            ayc: c.read_f32()?,
            rxc: c.read_f32()?,
            ryc: c.read_f32()?,
            xrcm: c.read_f32()?,
            yrcm: c.read_f32()?,
            xrpx: c.read_f32()?,
            yrpx: c.read_f32()?,
            x0cm: c.read_f32()?,
            y0cm: c.read_f32()?,
            x0px: c.read_f32()?,
            y0px: c.read_f32()?,
            rms_shift: c.read_f32()?,
            max_shift: c.read_f32()?,
            max_x: c.read_f32()?,
            max_y: c.read_f32()?,
            ..SplineCalibration::default()
        };
        for slot in calibration
            .lax
            .iter_mut()
            .chain(calibration.lay.iter_mut())
            .chain(calibration.ldx.iter_mut())
            .chain(calibration.ldy.iter_mut())
        {
            *slot = c.read_f64()?;
        }
        debug_assert_eq!(c.position(), HEADER_BYTES);
        Ok(calibration)
    }

    /// Encodes the calibration in the on-disk layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = BigEndianWriter::with_capacity(HEADER_BYTES + self.points.len() * POINT_BYTES);
        for value in [
            self.detector_width,
            self.detector_height,
            self.num_cols,
            self.num_rows,
            self.num_true_regions,
            self.mid_col,
            self.mid_row,
            self.num_regions,
        ] {
            w.write_i16(value);
        }
        for value in [
            self.axc, self.ayc, self.rxc, self.ryc,
            self.xrcm, self.yrcm, self.xrpx, self.yrpx,
            self.x0cm, self.y0cm, self.x0px, self.y0px,
            self.rms_shift, self.max_shift, self.max_x, self.max_y,
        ] {
            w.write_f32(value);
        }
        for &value in self.lax.iter().chain(&self.lay).chain(&self.ldx).chain(&self.ldy) {
            w.write_f64(value);
        }
        for point in &self.points {
            for value in [
                point.pixel_to_cm.0,
                point.pixel_to_cm.1,
                point.cm_to_pixel.0,
                point.cm_to_pixel.1,
                point.qec,
                point.reserved[0],
                point.reserved[1],
            ] {
                w.write_f32(value);
            }
            for value in [point.node_type, point.set_id, point.calibration_set, point.reserved_flag] {
                w.write_u8(value);
            }
        }
        w.into_inner()
    }

    pub fn write_to<W: Write>(&self, mut output: W) -> Result<()> {
        output.write_all(&self.to_bytes())?;
        Ok(())
    }
}

fn decode_point(c: &mut BigEndianCursor<'_>) -> Result<CalibrationPoint> {
    Ok(CalibrationPoint {
        pixel_to_cm: (c.read_f32()?, c.read_f32()?),
        cm_to_pixel: (c.read_f32()?, c.read_f32()?),
        qec: c.read_f32()?,
        reserved: [c.read_f32()?, c.read_f32()?],
        node_type: c.read_u8()?,
        set_id: c.read_u8()?,
        calibration_set: c.read_u8()?,
        reserved_flag: c.read_u8()?,
    })
}
