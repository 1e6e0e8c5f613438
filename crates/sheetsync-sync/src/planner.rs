//! Static chunk planning
//!
//! A payload is cut into rectangles no larger than `row_batch_size` x
//! `col_batch_size`. Column bands are the outer loop and row bands the inner
//! one, so a wide table is delivered band by band, left to right.

use sheetsync_core::config::BatchingConfig;
use sheetsync_core::domain::{CellValue, Chunk, Row, WritePrimitive};

/// Splits payloads into bounded, column-major chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlanner {
    row_batch_size: u32,
    col_batch_size: u32,
}

impl ChunkPlanner {
    /// Planner with the given bounds; zero bounds are raised to 1
    pub fn new(row_batch_size: u32, col_batch_size: u32) -> Self {
        Self {
            row_batch_size: row_batch_size.max(1),
            col_batch_size: col_batch_size.max(1),
        }
    }

    pub fn from_config(config: &BatchingConfig) -> Self {
        Self::new(config.row_batch_size, config.col_batch_size)
    }

    #[must_use]
    pub fn row_batch_size(&self) -> u32 {
        self.row_batch_size
    }

    #[must_use]
    pub fn col_batch_size(&self) -> u32 {
        self.col_batch_size
    }

    /// Chunks for a payload written with `primitive`
    ///
    /// Row-inserting primitives must carry whole rows, so they are never
    /// split by column.
    #[must_use]
    pub fn plan_for(&self, primitive: WritePrimitive, payload: &[Row]) -> Vec<Chunk> {
        if primitive.inserts_rows() {
            let width = payload_width(payload).max(1);
            plan(payload, self.row_batch_size, width)
        } else {
            plan(payload, self.row_batch_size, self.col_batch_size)
        }
    }
}

impl Default for ChunkPlanner {
    fn default() -> Self {
        Self::from_config(&BatchingConfig::default())
    }
}

fn payload_width(payload: &[Row]) -> u32 {
    payload.iter().map(Vec::len).max().unwrap_or(0) as u32
}

/// Partition `payload` into chunks of at most `row_batch_size` rows and
/// `col_batch_size` columns
///
/// Coordinates are 1-based and inclusive. Short rows are padded with empty
/// cells to the payload width. An empty payload yields no chunks.
#[must_use]
pub fn plan(payload: &[Row], row_batch_size: u32, col_batch_size: u32) -> Vec<Chunk> {
    let rows = payload.len() as u32;
    let cols = payload_width(payload);
    if rows == 0 || cols == 0 {
        return Vec::new();
    }
    let row_batch = row_batch_size.max(1);
    let col_batch = col_batch_size.max(1);

    let mut chunks = Vec::new();
    let mut start_col = 1;
    while start_col <= cols {
        let end_col = start_col.saturating_add(col_batch - 1).min(cols);
        let mut start_row = 1;
        while start_row <= rows {
            let end_row = start_row.saturating_add(row_batch - 1).min(rows);
            let data = payload[(start_row - 1) as usize..end_row as usize]
                .iter()
                .map(|row| {
                    (start_col..=end_col)
                        .map(|c| row.get(c as usize - 1).cloned().unwrap_or(CellValue::Empty))
                        .collect()
                })
                .collect();
            chunks.push(Chunk {
                data,
                start_row,
                end_row,
                start_col,
                end_col,
            });
            start_row = end_row + 1;
        }
        start_col = end_col + 1;
    }
    chunks
}
