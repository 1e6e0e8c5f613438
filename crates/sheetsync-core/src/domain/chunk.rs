//! Rectangular payload chunks
//!
//! Coordinates are 1-based, inclusive, and relative to the top-left of the
//! payload the chunk was cut from.

use serde::Serialize;

use super::dataset::Row;

/// One rectangular slice of a write payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    /// Cell values, `row_count()` rows of exactly `col_count()` cells
    pub data: Vec<Row>,
    pub start_row: u32,
    pub end_row: u32,
    pub start_col: u32,
    pub end_col: u32,
}

impl Chunk {
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    #[must_use]
    pub fn col_count(&self) -> u32 {
        self.end_col - self.start_col + 1
    }

    #[must_use]
    pub fn cell_count(&self) -> u64 {
        u64::from(self.row_count()) * u64::from(self.col_count())
    }

    /// Split into two row-halves over the same columns
    ///
    /// The first half holds `row_count() / 2` rows, the second the rest.
    /// Returns `None` for a single-row chunk.
    #[must_use]
    pub fn bisect(self) -> Option<(Chunk, Chunk)> {
        let n = self.row_count();
        if n < 2 {
            return None;
        }
        let mid = n / 2;
        let mut first_rows = self.data;
        let second_rows = first_rows.split_off(mid as usize);
        let first = Chunk {
            data: first_rows,
            start_row: self.start_row,
            end_row: self.start_row + mid - 1,
            start_col: self.start_col,
            end_col: self.end_col,
        };
        let second = Chunk {
            data: second_rows,
            start_row: self.start_row + mid,
            end_row: self.end_row,
            start_col: self.start_col,
            end_col: self.end_col,
        };
        Some((first, second))
    }
}
