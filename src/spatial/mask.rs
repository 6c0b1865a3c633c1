//! Active-area mask module
//!
//! This module loads the optional per-pixel mask marking which pixels are live
//! detector area (as opposed to inter-tile gaps and dead regions).

mod reader;
mod smv_mask_reader;

pub use reader::MaskReader;
pub use smv_mask_reader::{SmvMaskReader, load_mask, MASK_HEADER_BYTES};

use crate::spatial::common::Grid;

/// Summary of an active-area mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskStats {
    pub active: usize,
    pub total: usize,
}

impl MaskStats {
    pub fn of(mask: &Grid<u8>) -> Self {
        Self {
            active: mask.as_slice().iter().filter(|&&v| v != 0).count(),
            total: mask.as_slice().len(),
        }
    }
}
