//! Column-major 2-D storage
//!
//! Detector images are stored column by column (`index = col * height + row`),
//! the on-disk convention of SMV frames. [`GridShape`] owns that offset math so
//! no stage has to do it by hand.

use std::ops::{Index, IndexMut};

use crate::spatial::common::error::{CorrectionError, Result};

/// Dimensions of a column-major image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    /// Number of columns (fast-varying detector dimension)
    pub width: usize,
    /// Number of rows within each column
    pub height: usize,
}

impl GridShape {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Pixel count. Only meaningful for shapes that passed [`GridShape::checked_len`].
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Pixel count, or `None` when `width * height` overflows `usize`.
    pub fn checked_len(&self) -> Option<usize> {
        self.width.checked_mul(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear offset of `(col, row)`, or `None` when outside the grid.
    pub fn index(&self, col: usize, row: usize) -> Option<usize> {
        if col < self.width && row < self.height {
            Some(col * self.height + row)
        } else {
            None
        }
    }

    /// Signed variant of [`GridShape::index`] for neighbour lookups.
    pub fn offset(&self, col: isize, row: isize) -> Option<usize> {
        if col < 0 || row < 0 {
            return None;
        }
        self.index(col as usize, row as usize)
    }

    /// All `(col, row)` pairs in storage order.
    pub fn coords(&self) -> impl Iterator<Item = (usize, usize)> + use<> {
        let height = self.height;
        (0..self.width).flat_map(move |col| (0..height).map(move |row| (col, row)))
    }

    /// True if the pixel lies within `margin` pixels of any border.
    pub fn near_border(&self, col: usize, row: usize, margin: usize) -> bool {
        col < margin
            || row < margin
            || col + margin >= self.width
            || row + margin >= self.height
    }
}

/// Owned column-major buffer with bounds-checked accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    shape: GridShape,
    data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Allocates a grid filled with `value`, reporting allocation failure
    /// instead of aborting.
    pub fn filled(shape: GridShape, value: T) -> Result<Self> {
        let len = shape.checked_len().ok_or_else(|| {
            CorrectionError::OutOfMemory(format!("{}x{} grid", shape.width, shape.height))
        })?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            CorrectionError::OutOfMemory(format!(
                "{}x{} grid: {}",
                shape.width, shape.height, e
            ))
        })?;
        data.resize(len, value);
        Ok(Self { shape, data })
    }
}

impl<T> Grid<T> {
    pub fn from_vec(shape: GridShape, data: Vec<T>) -> Result<Self> {
        if data.len() != shape.len() {
            return Err(CorrectionError::InvalidDimensions(
                shape.width as i64,
                shape.height as i64,
                data.len(),
            ));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    fn index(&self, (col, row): (usize, usize)) -> &T {
        assert!(
            col < self.shape.width && row < self.shape.height,
            "grid index ({col}, {row}) out of bounds for {}x{}",
            self.shape.width,
            self.shape.height
        );
        &self.data[col * self.shape.height + row]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    fn index_mut(&mut self, (col, row): (usize, usize)) -> &mut T {
        assert!(
            col < self.shape.width && row < self.shape.height,
            "grid index ({col}, {row}) out of bounds for {}x{}",
            self.shape.width,
            self.shape.height
        );
        &mut self.data[col * self.shape.height + row]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_column_major() {
        let shape = GridShape::new(3, 2);
        assert_eq!(shape.index(0, 0), Some(0));
        assert_eq!(shape.index(0, 1), Some(1));
        assert_eq!(shape.index(1, 0), Some(2));
        assert_eq!(shape.index(2, 1), Some(5));
        assert_eq!(shape.index(3, 0), None);
        assert_eq!(shape.index(0, 2), None);
        assert_eq!(shape.offset(-1, 0), None);
    }

    #[test]
    fn test_checked_len_detects_overflow() {
        assert_eq!(GridShape::new(3, 2).checked_len(), Some(6));
        assert_eq!(GridShape::new(usize::MAX, 2).checked_len(), None);
        let err = Grid::filled(GridShape::new(usize::MAX, 2), 0u8).unwrap_err();
        assert!(matches!(err, CorrectionError::OutOfMemory(_)));
    }

    #[test]
    fn test_coords_follow_storage_order() {
        let shape = GridShape::new(2, 3);
        let coords: Vec<_> = shape.coords().collect();
        assert_eq!(coords, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
        for (i, (col, row)) in coords.into_iter().enumerate() {
            assert_eq!(shape.index(col, row), Some(i));
        }
    }

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        let result = Grid::from_vec(GridShape::new(2, 2), vec![0u16; 3]);
        assert!(matches!(result, Err(CorrectionError::InvalidDimensions(2, 2, 3))));
    }

    #[test]
    fn test_near_border() {
        let shape = GridShape::new(10, 10);
        assert!(shape.near_border(0, 5, 2));
        assert!(shape.near_border(8, 5, 2));
        assert!(!shape.near_border(2, 2, 2));
        assert!(!shape.near_border(7, 7, 2));
        assert!(shape.near_border(6, 6, 4));
    }
}
