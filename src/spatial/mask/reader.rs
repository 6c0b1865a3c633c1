use std::path::Path;

use crate::spatial::common::{Grid, GridShape, Result};

pub trait MaskReader {
    /// Returns `Ok(None)` when no mask is available at `path`.
    fn read_mask(&self, path: &Path, shape: GridShape) -> Result<Option<Grid<u8>>>;
}
