//! Tabular datasets
//!
//! A [`Dataset`] is a header row plus ordered data rows. The same shape is
//! used for the local table being synced and for the snapshot read back from
//! the remote sheet.

use serde::{Deserialize, Serialize};

use super::cell::CellValue;
use super::errors::DomainError;

/// One row of cells, left to right
pub type Row = Vec<CellValue>;

/// An ordered table with named columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Column names, left to right
    pub headers: Vec<String>,
    /// Data rows, top to bottom; rows may be shorter than `headers`
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Number of data rows (the header row is not counted)
    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Widest extent across the header and every row
    #[must_use]
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    /// True when there are no data rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when there is neither a header nor any data
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    /// Position of the first column named `name`
    ///
    /// # Errors
    /// Returns [`DomainError::UnknownColumn`] when no header matches
    pub fn column_index(&self, name: &str) -> Result<usize, DomainError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DomainError::UnknownColumn(name.to_string()))
    }

    /// Narrow to the named columns, keeping their local order
    ///
    /// Returns the narrowed dataset and the requested names no header
    /// carries.
    #[must_use]
    pub fn select(&self, columns: &[String]) -> (Dataset, Vec<String>) {
        let mut kept: Vec<String> = Vec::new();
        for header in &self.headers {
            if columns.contains(header) && !kept.contains(header) {
                kept.push(header.clone());
            }
        }
        let missing = ColumnMapping::dropped_columns(columns, &kept);
        let mapping = ColumnMapping::between(&self.headers, &kept);
        let rows = self.rows.iter().map(|row| mapping.project(row)).collect();
        (Dataset::new(kept, rows), missing)
    }

    /// The header rendered as a row of text cells
    #[must_use]
    pub fn header_row(&self) -> Row {
        self.headers.iter().map(|h| CellValue::text(h.clone())).collect()
    }

    /// Header row followed by every data row
    #[must_use]
    pub fn to_table(&self) -> Vec<Row> {
        let mut table = Vec::with_capacity(self.rows.len() + 1);
        table.push(self.header_row());
        table.extend(self.rows.iter().cloned());
        table
    }

    /// Interpret a raw value grid whose first row is the header
    ///
    /// Trailing rows and columns that hold no value are dropped; the remote
    /// service pads read ranges with nulls.
    #[must_use]
    pub fn from_table(mut values: Vec<Row>) -> Self {
        while values
            .last()
            .is_some_and(|row| row.iter().all(CellValue::is_empty))
        {
            values.pop();
        }
        let width = values
            .iter()
            .map(|row| {
                row.iter()
                    .rposition(|c| !c.is_empty())
                    .map_or(0, |last| last + 1)
            })
            .max()
            .unwrap_or(0);
        for row in &mut values {
            row.truncate(width);
        }

        let mut rows = values.into_iter();
        let headers = rows
            .next()
            .map(|header| header.iter().map(ToString::to_string).collect())
            .unwrap_or_default();
        Self {
            headers,
            rows: rows.collect(),
        }
    }

    /// Parse a dataset from JSON
    ///
    /// Accepts either `{"headers": [...], "rows": [[...], ...]}` or an array
    /// of arrays whose first element is the header row.
    ///
    /// # Errors
    /// Returns [`DomainError::ValidationFailed`] for any other shape
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, DomainError> {
        match value {
            serde_json::Value::Array(_) => {
                let grid: Vec<Row> = serde_json::from_value(value).map_err(|e| {
                    DomainError::ValidationFailed(format!("expected an array of rows: {e}"))
                })?;
                let mut rows = grid.into_iter();
                let headers = rows
                    .next()
                    .map(|header| header.iter().map(ToString::to_string).collect())
                    .unwrap_or_default();
                Ok(Self::new(headers, rows.collect()))
            }
            serde_json::Value::Object(_) => serde_json::from_value(value).map_err(|e| {
                DomainError::ValidationFailed(format!("expected headers and rows: {e}"))
            }),
            other => Err(DomainError::ValidationFailed(format!(
                "dataset must be a JSON object or array, got {other}"
            ))),
        }
    }
}

// ============================================================================
// Column mapping
// ============================================================================

/// Reorders rows from one header layout into another by column name
///
/// Target columns with no counterpart in the source come out empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    sources: Vec<Option<usize>>,
}

impl ColumnMapping {
    /// Map columns of `source` onto the layout of `target`
    #[must_use]
    pub fn between(source: &[String], target: &[String]) -> Self {
        let sources = target
            .iter()
            .map(|name| source.iter().position(|s| s == name))
            .collect();
        Self { sources }
    }

    /// Rearrange one source row into the target layout
    #[must_use]
    pub fn project(&self, row: &[CellValue]) -> Row {
        self.sources
            .iter()
            .map(|src| src.and_then(|i| row.get(i)).cloned().unwrap_or_default())
            .collect()
    }

    /// Write the mapped cells of `row` over `base`
    ///
    /// Target columns the source lacks keep their `base` value.
    #[must_use]
    pub fn overlay(&self, base: &[CellValue], row: &[CellValue]) -> Row {
        let mut merged: Row = base.to_vec();
        merged.resize(self.sources.len().max(base.len()), CellValue::Empty);
        for (target, src) in self.sources.iter().enumerate() {
            if let Some(i) = src {
                merged[target] = row.get(*i).cloned().unwrap_or_default();
            }
        }
        merged
    }

    /// Whether every target column is fed by the same source position
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.sources
            .iter()
            .enumerate()
            .all(|(i, src)| *src == Some(i))
    }

    /// Source columns that the target layout has no room for
    #[must_use]
    pub fn dropped_columns(source: &[String], target: &[String]) -> Vec<String> {
        source
            .iter()
            .filter(|name| !target.contains(name))
            .cloned()
            .collect()
    }
}

/// Union layout: `primary` in order, then columns only `secondary` has
#[must_use]
pub fn union_headers(primary: &[String], secondary: &[String]) -> Vec<String> {
    let mut headers = primary.to_vec();
    for name in secondary {
        if !headers.contains(name) {
            headers.push(name.clone());
        }
    }
    headers
}
