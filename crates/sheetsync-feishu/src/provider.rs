//! FeishuSheetProvider - ISheetClient implementation for Feishu Sheets
//!
//! Maps the port's read and four write capabilities onto the v2 value
//! endpoints of one spreadsheet:
//!
//! | Capability | Endpoint |
//! |---|---|
//! | read | `GET values/{range}` |
//! | overwrite | `PUT values` |
//! | batch overwrite | `POST values_batch_update` |
//! | prepend | `POST values_prepend` |
//! | append | `POST values_append` |
//!
//! ## Design Notes
//!
//! - Every failure is converted to [`RemoteError`] here; the sync pipeline
//!   never sees HTTP details.
//! - A batch that only clears ranges treats "invalid range" as success,
//!   since clearing cells that do not exist leaves nothing to do.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sheetsync_core::domain::{CellRange, CellValue, RangeValues, Row, SpreadsheetToken};
use sheetsync_core::ports::{ISheetClient, RemoteError};

use crate::client::FeishuClient;
use crate::{FeishuError, CODE_INVALID_RANGE};

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ValueRange<'a> {
    range: String,
    values: &'a [Row],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SingleRangeBody<'a> {
    value_range: ValueRange<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchBody<'a> {
    value_ranges: Vec<ValueRange<'a>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadData {
    value_range: Option<ReadValueRange>,
}

#[derive(Debug, Deserialize)]
struct ReadValueRange {
    #[serde(default)]
    values: Option<Vec<Vec<serde_json::Value>>>,
}

/// Converts the values of a read response into rows
///
/// Null cells become empty and rich-text segments are flattened to text.
fn rows_from_wire(data: Option<ReadData>) -> Vec<Row> {
    data.and_then(|d| d.value_range)
        .and_then(|vr| vr.values)
        .unwrap_or_default()
        .into_iter()
        .map(|row| row.into_iter().map(CellValue::from).collect())
        .collect()
}

// ============================================================================
// FeishuSheetProvider
// ============================================================================

/// One spreadsheet reached through the Feishu Open API
pub struct FeishuSheetProvider {
    client: FeishuClient,
    spreadsheet: SpreadsheetToken,
}

impl FeishuSheetProvider {
    pub fn new(client: FeishuClient, spreadsheet: SpreadsheetToken) -> Self {
        Self {
            client,
            spreadsheet,
        }
    }

    pub fn spreadsheet(&self) -> &SpreadsheetToken {
        &self.spreadsheet
    }

    fn path(&self, endpoint: &str) -> String {
        format!(
            "/open-apis/sheets/v2/spreadsheets/{}/{}",
            self.spreadsheet.as_str(),
            endpoint
        )
    }

    async fn write_single(
        &self,
        method: Method,
        endpoint: &str,
        range: &CellRange,
        rows: &[Row],
    ) -> Result<(), FeishuError> {
        let body = SingleRangeBody {
            value_range: ValueRange {
                range: range.to_string(),
                values: rows,
            },
        };
        debug!(endpoint, range = %range, rows = rows.len(), "Writing values");
        self.client
            .send::<_, serde_json::Value>(method, &self.path(endpoint), Some(&body))
            .await
            .map(|_| ())
    }
}

#[async_trait::async_trait]
impl ISheetClient for FeishuSheetProvider {
    async fn read_range(&self, range: &CellRange) -> Result<Vec<Row>, RemoteError> {
        debug!(range = %range, "Reading values");
        let data: Option<ReadData> = self
            .client
            .send::<(), _>(Method::GET, &self.path(&format!("values/{range}")), None)
            .await?;
        Ok(rows_from_wire(data))
    }

    async fn overwrite_range(&self, range: &CellRange, rows: &[Row]) -> Result<(), RemoteError> {
        Ok(self.write_single(Method::PUT, "values", range, rows).await?)
    }

    async fn batch_overwrite_ranges(&self, ranges: &[RangeValues]) -> Result<(), RemoteError> {
        let clear_only = ranges.iter().all(|r| r.values.is_empty());
        let body = BatchBody {
            value_ranges: ranges
                .iter()
                .map(|r| ValueRange {
                    range: r.range.to_string(),
                    values: &r.values,
                })
                .collect(),
        };
        debug!(ranges = ranges.len(), clear_only, "Writing value batch");

        match self
            .client
            .send::<_, serde_json::Value>(Method::POST, &self.path("values_batch_update"), Some(&body))
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if clear_only && err.code() == Some(CODE_INVALID_RANGE) => {
                warn!(error = %err, "Clear hit an invalid range, nothing to clear");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn prepend_rows(&self, range: &CellRange, rows: &[Row]) -> Result<(), RemoteError> {
        Ok(self
            .write_single(Method::POST, "values_prepend", range, rows)
            .await?)
    }

    async fn append_rows(&self, range: &CellRange, rows: &[Row]) -> Result<(), RemoteError> {
        Ok(self
            .write_single(Method::POST, "values_append", range, rows)
            .await?)
    }
}
