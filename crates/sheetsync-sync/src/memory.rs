//! In-memory sheet adapter
//!
//! [`MemorySheet`] implements [`ISheetClient`] over a plain cell grid. It
//! mirrors how the real service places appended and prepended rows, can be
//! told to reject oversized requests or fail the next few calls, and records
//! every call it receives. The engine, transport, uploader and mode tests drive it.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use sheetsync_core::domain::{CellRange, CellValue, RangeValues, Row, WritePrimitive};
use sheetsync_core::ports::{ISheetClient, RemoteError};
use tokio::time::Instant;

/// Which capability a recorded call used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Read,
    Write(WritePrimitive),
}

/// One request as seen by the sheet
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: CallKind,
    /// A1 ranges addressed by the request
    pub ranges: Vec<String>,
    /// Rows of payload carried
    pub rows: usize,
    /// Cells of payload carried
    pub cells: u64,
    pub at: Instant,
    /// Whether the sheet accepted the request
    pub accepted: bool,
}

#[derive(Debug, Default)]
struct State {
    /// Row-major grid; `cells[0][0]` is A1
    cells: Vec<Row>,
    failures: VecDeque<RemoteError>,
    max_cells: Option<u64>,
    calls: Vec<RecordedCall>,
}

/// A sheet held in memory
#[derive(Debug, Default)]
pub struct MemorySheet {
    state: Mutex<State>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sheet whose grid starts as `rows`, anchored at A1
    pub fn with_rows(rows: Vec<Row>) -> Self {
        let sheet = Self::new();
        sheet.lock().cells = rows;
        sheet
    }

    /// Reject write requests carrying more than `cells` cells as too large
    pub fn set_max_cells_per_request(&self, cells: u64) {
        self.lock().max_cells = Some(cells);
    }

    /// Fail the next call with `error`; queued failures are consumed in order
    pub fn push_failure(&self, error: RemoteError) {
        self.lock().failures.push_back(error);
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Accepted write calls, in order
    pub fn accepted_writes(&self) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.accepted && matches!(c.kind, CallKind::Write(_)))
            .cloned()
            .collect()
    }

    /// The grid with trailing empty rows and cells removed
    pub fn grid(&self) -> Vec<Row> {
        let mut cells = self.lock().cells.clone();
        for row in &mut cells {
            while row.last().is_some_and(CellValue::is_empty) {
                row.pop();
            }
        }
        while cells.last().is_some_and(Vec::is_empty) {
            cells.pop();
        }
        cells
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test panicked mid-call; the grid is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call, then apply `op` unless a failure is queued or the
    /// payload is over the size limit
    fn handle<T>(
        &self,
        kind: CallKind,
        ranges: Vec<String>,
        payload: &[Row],
        op: impl FnOnce(&mut State) -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        let mut state = self.lock();
        let rows = payload.len();
        let cells: u64 = payload.iter().map(|r| r.len() as u64).sum();
        let mut call = RecordedCall {
            kind,
            ranges,
            rows,
            cells,
            at: Instant::now(),
            accepted: false,
        };

        let result = if let Some(error) = state.failures.pop_front() {
            Err(error)
        } else if state
            .max_cells
            .is_some_and(|max| matches!(kind, CallKind::Write(_)) && cells > max)
        {
            Err(RemoteError::RequestTooLarge)
        } else {
            op(&mut *state)
        };

        call.accepted = result.is_ok();
        state.calls.push(call);
        result
    }
}

fn range_mismatch(range: &CellRange) -> RemoteError {
    RemoteError::Fatal {
        code: 90202,
        message: format!("values do not fit range {range}"),
    }
}

fn check_fits(range: &CellRange, rows: &[Row]) -> Result<(), RemoteError> {
    let too_tall = rows.len() > range.row_count() as usize;
    let too_wide = rows.iter().any(|r| r.len() > range.col_count() as usize);
    if too_tall || too_wide {
        Err(range_mismatch(range))
    } else {
        Ok(())
    }
}

impl State {
    fn ensure_size(&mut self, rows: usize, cols: usize) {
        if self.cells.len() < rows {
            self.cells.resize_with(rows, Vec::new);
        }
        for row in self.cells.iter_mut().take(rows) {
            if row.len() < cols {
                row.resize(cols, CellValue::Empty);
            }
        }
    }

    /// Write `rows` with their top-left at (`row`, `col`), both 1-based
    fn write_block(&mut self, row: u32, col: u32, rows: &[Row]) {
        let top = row as usize - 1;
        let left = col as usize - 1;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        self.ensure_size(top + rows.len(), left + width);
        for (r, values) in rows.iter().enumerate() {
            for (c, value) in values.iter().enumerate() {
                self.cells[top + r][left + c] = value.clone();
            }
        }
    }

    fn clear_block(&mut self, range: &CellRange) {
        let top = range.start.row as usize - 1;
        let left = range.start.col as usize - 1;
        let right = range.end.col as usize;
        for row in self
            .cells
            .iter_mut()
            .skip(top)
            .take(range.row_count() as usize)
        {
            for cell in row.iter_mut().take(right).skip(left) {
                *cell = CellValue::Empty;
            }
        }
    }

    /// Last 1-based row at or below the start of `range` holding a value in its columns
    fn last_filled_row(&self, range: &CellRange) -> Option<u32> {
        let left = range.start.col as usize - 1;
        let right = range.end.col as usize;
        self.cells
            .iter()
            .enumerate()
            .skip(range.start.row as usize - 1)
            .filter(|(_, row)| {
                row.iter()
                    .take(right)
                    .skip(left)
                    .any(|cell| !cell.is_empty())
            })
            .map(|(i, _)| i as u32 + 1)
            .last()
    }
}

#[async_trait::async_trait]
impl ISheetClient for MemorySheet {
    async fn read_range(&self, range: &CellRange) -> Result<Vec<Row>, RemoteError> {
        self.handle(CallKind::Read, vec![range.to_string()], &[], |state| {
            let left = range.start.col as usize - 1;
            let right = range.end.col as usize;
            Ok(state
                .cells
                .iter()
                .skip(range.start.row as usize - 1)
                .take(range.row_count() as usize)
                .map(|row| row.iter().take(right).skip(left).cloned().collect())
                .collect())
        })
    }

    async fn overwrite_range(&self, range: &CellRange, rows: &[Row]) -> Result<(), RemoteError> {
        let kind = CallKind::Write(WritePrimitive::Overwrite);
        self.handle(kind, vec![range.to_string()], rows, |state| {
            check_fits(range, rows)?;
            state.write_block(range.start.row, range.start.col, rows);
            Ok(())
        })
    }

    async fn batch_overwrite_ranges(&self, ranges: &[RangeValues]) -> Result<(), RemoteError> {
        let kind = CallKind::Write(WritePrimitive::BatchOverwrite);
        let labels = ranges.iter().map(|r| r.range.to_string()).collect();
        let payload: Vec<Row> = ranges.iter().flat_map(|r| r.values.clone()).collect();
        self.handle(kind, labels, &payload, |state| {
            for entry in ranges {
                check_fits(&entry.range, &entry.values)?;
            }
            for entry in ranges {
                if entry.values.is_empty() {
                    state.clear_block(&entry.range);
                } else {
                    state.write_block(entry.range.start.row, entry.range.start.col, &entry.values);
                }
            }
            Ok(())
        })
    }

    async fn prepend_rows(&self, range: &CellRange, rows: &[Row]) -> Result<(), RemoteError> {
        let kind = CallKind::Write(WritePrimitive::Prepend);
        self.handle(kind, vec![range.to_string()], rows, |state| {
            check_fits(range, rows)?;
            let at = range.start.row as usize - 1;
            if state.cells.len() < at {
                state.cells.resize_with(at, Vec::new);
            }
            for _ in 0..rows.len() {
                state.cells.insert(at, Vec::new());
            }
            state.write_block(range.start.row, range.start.col, rows);
            Ok(())
        })
    }

    async fn append_rows(&self, range: &CellRange, rows: &[Row]) -> Result<(), RemoteError> {
        let kind = CallKind::Write(WritePrimitive::Append);
        self.handle(kind, vec![range.to_string()], rows, |state| {
            if rows.iter().any(|r| r.len() > range.col_count() as usize) {
                return Err(range_mismatch(range));
            }
            let target = state
                .last_filled_row(range)
                .map_or(range.start.row, |last| last + 1);
            state.write_block(target, range.start.col, rows);
            Ok(())
        })
    }
}
