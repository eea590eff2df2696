//! Rectangular ranges over rendered row/column positions.

use serde::{Deserialize, Serialize};

/// A rectangular range of cells, in view coordinates.
///
/// Rows are positions among the currently rendered rows and columns are
/// positions in the ordered column schema. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRange {
    /// Start row (0-indexed).
    pub start_row: usize,
    /// Start column (0-indexed).
    pub start_col: usize,
    /// End row (inclusive, 0-indexed).
    pub end_row: usize,
    /// End column (inclusive, 0-indexed).
    pub end_col: usize,
}

impl CellRange {
    /// Create a new cell range from two corners in any order.
    pub fn new(start_row: usize, start_col: usize, end_row: usize, end_col: usize) -> Self {
        Self {
            start_row: start_row.min(end_row),
            start_col: start_col.min(end_col),
            end_row: start_row.max(end_row),
            end_col: start_col.max(end_col),
        }
    }

    /// Create a range for a single cell.
    pub fn single(row: usize, col: usize) -> Self {
        Self::new(row, col, row, col)
    }

    /// Check if this range contains the given cell.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.start_row && row <= self.end_row
            && col >= self.start_col && col <= self.end_col
    }

    /// Number of cells in this range.
    pub fn cell_count(&self) -> usize {
        (self.end_row - self.start_row + 1) * (self.end_col - self.start_col + 1)
    }

    pub fn rows(&self) -> std::ops::RangeInclusive<usize> {
        self.start_row..=self.end_row
    }

    pub fn cols(&self) -> std::ops::RangeInclusive<usize> {
        self.start_col..=self.end_col
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_range_normalizes_corners() {
        let range = CellRange::new(5, 3, 1, 0);
        assert_eq!(range, CellRange::new(1, 0, 5, 3));
        assert_eq!(range.start_row, 1);
        assert_eq!(range.end_col, 3);
    }

    #[test]
    fn test_cell_range_contains() {
        let range = CellRange::new(1, 1, 3, 2);
        assert!(range.contains(1, 1));
        assert!(range.contains(3, 2));
        assert!(!range.contains(0, 1));
        assert!(!range.contains(2, 3));
    }

    #[test]
    fn test_cell_range_single() {
        let range = CellRange::single(4, 2);
        assert_eq!(range.cell_count(), 1);
        assert_eq!(range.rows().collect::<Vec<_>>(), vec![4]);
        assert_eq!(range.cols().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_cell_count() {
        assert_eq!(CellRange::new(0, 0, 2, 1).cell_count(), 6);
    }
}
