//! Active-area mask reader for SMV-style mask images.
//!
//! A mask file is a 512-byte text header followed by `width` columns of
//! `height` 16-bit samples. Any nonzero sample marks an active pixel.
//!
//! The mask must have been produced at the same binning level as the image it
//! is applied to; the loader does not resample it. When the header declares
//! `SIZE1=`/`SIZE2=` the declared dimensions are checked against the image.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use tracing::{debug, warn};

use crate::spatial::common::byte_order::ByteOrder;
use crate::spatial::common::error::{CorrectionError, Result};
use crate::spatial::common::{Grid, GridShape};
use crate::spatial::mask::reader::MaskReader;

/// Size of the header preceding the mask samples.
pub const MASK_HEADER_BYTES: usize = 512;

#[derive(Debug, Clone, Copy, Default)]
pub struct SmvMaskReader;

impl MaskReader for SmvMaskReader {
    fn read_mask(&self, path: &Path, shape: GridShape) -> Result<Option<Grid<u8>>> {
        load_mask(path, shape.width, shape.height)
    }
}

/// Header keywords relevant to the mask samples.
#[derive(Debug, Default, PartialEq)]
struct MaskHeader {
    size1: Option<usize>,
    size2: Option<usize>,
    byte_order: Option<ByteOrder>,
}

impl MaskHeader {
    /// Only the last occurrence of a keyword counts, and a keyword must start
    /// a header entry (`DETECTOR_SIZE1=` is not `SIZE1=`).
    fn parse(header: &[u8]) -> Self {
        let end = header.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        let text = String::from_utf8_lossy(&header[..end]);

        let value_of = |key: &str| -> Option<String> {
            let (at, _) = text
                .match_indices(key)
                .filter(|&(i, _)| {
                    matches!(
                        text[..i].chars().next_back(),
                        None | Some('{' | ';' | '\n' | '\r' | ' ' | '\t')
                    )
                })
                .last()?;
            let start = at + key.len();
            let value: String = text[start..]
                .chars()
                .take_while(|c| !matches!(c, ';' | '\n' | '\r' | '}' | '\0'))
                .collect();
            Some(value.trim().to_string())
        };

        Self {
            size1: value_of("SIZE1=").and_then(|v| v.parse().ok()),
            size2: value_of("SIZE2=").and_then(|v| v.parse().ok()),
            byte_order: value_of("BYTE_ORDER=").and_then(|v| match v.as_str() {
                "little_endian" => Some(ByteOrder::Little),
                "big_endian" => Some(ByteOrder::Big),
                _ => None,
            }),
        }
    }
}

/// Loads the active-area mask for a `width x height` image.
///
/// An empty path or a path that does not exist yields `Ok(None)`; that is the
/// common case of a detector without a mask.
pub fn load_mask<P: AsRef<Path>>(path: P, width: usize, height: usize) -> Result<Option<Grid<u8>>> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() || !path.exists() {
        debug!(path = %path.display(), "No active-area mask available");
        return Ok(None);
    }

    let file = File::open(path).map_err(|e| {
        CorrectionError::FileOpenFailed(format!("{}: {}", path.display(), e))
    })?;
    let mut reader = BufReader::new(file);

    let mut header = [0u8; MASK_HEADER_BYTES];
    reader.read_exact(&mut header).map_err(|e| {
        CorrectionError::FileReadFailed(format!("{}: mask header: {}", path.display(), e))
    })?;
    let header = MaskHeader::parse(&header);

    if let (Some(size1), Some(size2)) = (header.size1, header.size2) {
        if (size1, size2) != (width, height) {
            return Err(CorrectionError::MaskDimensionMismatch {
                expected: (width, height),
                found: (size1, size2),
            });
        }
    }
    let byte_order = header.byte_order.unwrap_or_else(ByteOrder::native);

    let shape = GridShape::new(width, height);
    let mut mask = Grid::filled(shape, 0u8)?;
    let mut column = column_buffer(height)?;
    let mut weighted = 0usize;
    for col in 0..width {
        reader.read_exact(&mut column).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => CorrectionError::FileReadFailed(format!(
                "{}: mask truncated at column {} of {}",
                path.display(),
                col,
                width
            )),
            _ => CorrectionError::FileReadFailed(format!("{}: {}", path.display(), e)),
        })?;
        for (row, sample) in column.chunks_exact(2).enumerate() {
            let value = byte_order.read_u16([sample[0], sample[1]]);
            if value > 1 {
                weighted += 1;
            }
            mask[(col, row)] = u8::from(value != 0);
        }
    }

    if weighted > 0 {
        warn!(weighted, "Mask contains weighted values; treating every nonzero pixel as active");
    }
    Ok(Some(mask))
}

/// Scratch buffer for one column of 16-bit samples.
fn column_buffer(height: usize) -> Result<Vec<u8>> {
    let len = height.checked_mul(2).ok_or_else(|| {
        CorrectionError::OutOfMemory(format!("mask column of {} rows", height))
    })?;
    let mut column = Vec::new();
    column.try_reserve_exact(len).map_err(|e| {
        CorrectionError::OutOfMemory(format!("mask column of {} rows: {}", height, e))
    })?;
    column.resize(len, 0);
    Ok(column)
}
