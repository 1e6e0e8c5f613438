//! Adaptive chunk delivery
//!
//! Static planning cannot know the service's real size limit, which depends
//! on cell contents. When a request is rejected as too large, the
//! [`AdaptiveUploader`] bisects the chunk by rows and delivers both halves,
//! first half first. A single row that is still too large ends the sync.

use serde::Serialize;
use sheetsync_core::domain::Chunk;
use tracing::{debug, warn};

use crate::transport::{CallError, Destination, ResilientTransport};
use crate::SyncError;

/// Counters for delivered payload
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadStats {
    /// Requests the service accepted
    pub requests: u32,
    /// Chunks bisected after a "too large" rejection
    pub splits: u32,
    /// Payload rows delivered
    pub rows: u64,
    /// Payload cells delivered
    pub cells: u64,
}

impl UploadStats {
    pub fn merge(&mut self, other: UploadStats) {
        self.requests += other.requests;
        self.splits += other.splits;
        self.rows += other.rows;
        self.cells += other.cells;
    }
}

/// Delivers planned chunks, splitting those the service refuses
pub struct AdaptiveUploader {
    transport: ResilientTransport,
}

impl AdaptiveUploader {
    pub fn new(transport: ResilientTransport) -> Self {
        Self { transport }
    }

    #[must_use]
    pub fn transport(&self) -> &ResilientTransport {
        &self.transport
    }

    /// Deliver `chunk` completely, or fail
    ///
    /// Pending pieces are kept on a LIFO stack with the second half pushed
    /// first, so pieces reach the service in top-to-bottom order.
    pub async fn deliver(
        &self,
        destination: &Destination,
        chunk: Chunk,
    ) -> Result<UploadStats, SyncError> {
        let mut stats = UploadStats::default();
        let mut pending = vec![chunk];

        while let Some(piece) = pending.pop() {
            match self.transport.call(destination, &piece).await {
                Ok(()) => {
                    debug!(
                        start_row = piece.start_row,
                        end_row = piece.end_row,
                        "Chunk delivered"
                    );
                    stats.requests += 1;
                    stats.rows += u64::from(piece.row_count());
                    stats.cells += piece.cell_count();
                }
                Err(CallError::RequestTooLarge) => {
                    let (start_row, end_row) = (piece.start_row, piece.end_row);
                    let Some((first, second)) = piece.bisect() else {
                        warn!(row = start_row, "Single row rejected as too large");
                        return Err(SyncError::RowTooLarge { row: start_row });
                    };
                    warn!(
                        start_row,
                        end_row,
                        mid = first.end_row,
                        "Request too large, splitting chunk"
                    );
                    stats.splits += 1;
                    pending.push(second);
                    pending.push(first);
                }
                Err(CallError::Fatal(err)) => return Err(err),
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;
    use sheetsync_core::domain::{Anchor, CellRef, CellValue, Row, SheetId, WritePrimitive};
    use sheetsync_core::ports::{ISheetClient, RemoteError};

    use super::*;
    use crate::memory::MemorySheet;
    use crate::rate_limit::RateLimiter;
    use crate::transport::RetryPolicy;

    fn uploader(sheet: &Arc<MemorySheet>) -> AdaptiveUploader {
        AdaptiveUploader::new(ResilientTransport::new(
            Arc::clone(sheet) as Arc<dyn ISheetClient>,
            RateLimiter::from_millis(0),
            RetryPolicy::default(),
        ))
    }

    fn destination(primitive: WritePrimitive) -> Destination {
        Destination::new(
            primitive,
            Anchor::new(SheetId::new("s".into()).unwrap(), CellRef::origin()),
        )
    }

    fn rows(n: u32, width: usize) -> Vec<Row> {
        (1..=n)
            .map(|r| vec![CellValue::Number(f64::from(r)); width])
            .collect()
    }

    fn chunk_of(data: Vec<Row>) -> Chunk {
        let n = data.len() as u32;
        let width = data.first().map_or(1, Vec::len) as u32;
        Chunk {
            data,
            start_row: 1,
            end_row: n,
            start_col: 1,
            end_col: width,
        }
    }

    fn ceil_log2(n: u32) -> u32 {
        32 - (n - 1).leading_zeros()
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_chunk_is_one_request() {
        let sheet = Arc::new(MemorySheet::new());
        let stats = uploader(&sheet)
            .deliver(&destination(WritePrimitive::Overwrite), chunk_of(rows(10, 2)))
            .await
            .unwrap();
        assert_eq!(
            stats,
            UploadStats {
                requests: 1,
                splits: 0,
                rows: 10,
                cells: 20
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_chunk_is_bisected_in_order() {
        let sheet = Arc::new(MemorySheet::new());
        // 2 columns, so at most 3 rows per request
        sheet.set_max_cells_per_request(6);

        let stats = uploader(&sheet)
            .deliver(&destination(WritePrimitive::Overwrite), chunk_of(rows(10, 2)))
            .await
            .unwrap();

        let accepted: Vec<String> = sheet
            .accepted_writes()
            .iter()
            .map(|c| c.ranges[0].clone())
            .collect();
        // 10 -> 5 + 5 -> (2 + 3) + (2 + 3)
        assert_eq!(
            accepted,
            vec!["s!A1:B2", "s!A3:B5", "s!A6:B7", "s!A8:B10"]
        );
        assert_eq!(stats.requests, 4);
        assert_eq!(stats.splits, 3);
        assert_eq!(stats.rows, 10);
        assert_eq!(sheet.grid(), rows(10, 2));
    }

    #[tokio::test(start_paused = true)]
    async fn split_appends_keep_row_order() {
        let sheet = Arc::new(MemorySheet::new());
        sheet.set_max_cells_per_request(2);
        uploader(&sheet)
            .deliver(&destination(WritePrimitive::Append), chunk_of(rows(7, 1)))
            .await
            .unwrap();
        assert_eq!(sheet.grid(), rows(7, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn split_prepends_keep_row_order() {
        let existing = vec![vec![CellValue::Text("old".into())]];
        let sheet = Arc::new(MemorySheet::with_rows(existing.clone()));
        sheet.set_max_cells_per_request(2);
        uploader(&sheet)
            .deliver(&destination(WritePrimitive::Prepend), chunk_of(rows(5, 1)))
            .await
            .unwrap();

        let mut expected = rows(5, 1);
        expected.extend(existing);
        assert_eq!(sheet.grid(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn single_oversized_row_is_fatal() {
        let sheet = Arc::new(MemorySheet::new());
        // Every row carries 4 cells
        sheet.set_max_cells_per_request(3);

        let err = uploader(&sheet)
            .deliver(&destination(WritePrimitive::Overwrite), chunk_of(rows(4, 4)))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::RowTooLarge { row: 1 }));
        // 4 rows -> 2 -> 1
        assert_eq!(sheet.calls().len(), 3);
        assert!(sheet.accepted_writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_stops_remaining_halves() {
        let sheet = Arc::new(MemorySheet::new());
        sheet.push_failure(RemoteError::RequestTooLarge);
        sheet.push_failure(RemoteError::Fatal {
            code: 1310214,
            message: "sheet not found".into(),
        });

        let err = uploader(&sheet)
            .deliver(&destination(WritePrimitive::Overwrite), chunk_of(rows(4, 1)))
            .await
            .unwrap_err();
        assert_eq!(err.remote_code(), Some(1310214));
        assert_eq!(sheet.calls().len(), 2);
    }

    proptest! {
        #[test]
        fn persistent_rejection_terminates_within_log_levels(n in 1u32..300) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .start_paused(true)
                .build()
                .unwrap();
            let sheet = Arc::new(MemorySheet::new());
            sheet.set_max_cells_per_request(0);

            let result = runtime.block_on(
                uploader(&sheet).deliver(&destination(WritePrimitive::Overwrite), chunk_of(rows(n, 1))),
            );

            let is_row_too_large = matches!(result, Err(SyncError::RowTooLarge { row: 1 }));
            prop_assert!(is_row_too_large);
            let levels = if n == 1 { 0 } else { ceil_log2(n) };
            prop_assert!(sheet.calls().len() as u32 <= levels + 1);
        }

        #[test]
        fn halves_are_contiguous_and_disjoint(n in 2u32..500, offset in 1u32..1000) {
            let chunk = Chunk {
                data: rows(n, 1),
                start_row: offset,
                end_row: offset + n - 1,
                start_col: 3,
                end_col: 3,
            };
            let (first, second) = chunk.bisect().unwrap();
            prop_assert_eq!(first.row_count(), n / 2);
            prop_assert_eq!(second.row_count(), n - n / 2);
            prop_assert_eq!(first.start_row, offset);
            prop_assert_eq!(second.start_row, first.end_row + 1);
            prop_assert_eq!(second.end_row, offset + n - 1);
            prop_assert_eq!((first.start_col, first.end_col), (3, 3));
            prop_assert_eq!((second.start_col, second.end_col), (3, 3));
            prop_assert_eq!(first.data.len() + second.data.len(), n as usize);
        }
    }
}
