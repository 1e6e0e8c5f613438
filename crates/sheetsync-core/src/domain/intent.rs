//! Write intents
//!
//! A [`WriteIntent`] is one remote write a sync mode has decided on, before
//! it is cut into chunks and delivered.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::dataset::Row;
use super::errors::DomainError;
use super::newtypes::SheetId;
use super::range::{CellRange, CellRef};

/// The four write operations the remote sheet exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePrimitive {
    /// Replace the values of one range
    Overwrite,
    /// Replace the values of several ranges in one request
    BatchOverwrite,
    /// Insert rows above an anchor row
    Prepend,
    /// Insert rows after the last non-empty row
    Append,
}

impl WritePrimitive {
    /// Whether the primitive inserts whole rows rather than writing cells in place
    #[must_use]
    pub fn inserts_rows(self) -> bool {
        matches!(self, WritePrimitive::Prepend | WritePrimitive::Append)
    }
}

impl Display for WritePrimitive {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            WritePrimitive::Overwrite => "overwrite",
            WritePrimitive::BatchOverwrite => "batch_overwrite",
            WritePrimitive::Prepend => "prepend",
            WritePrimitive::Append => "append",
        };
        f.write_str(name)
    }
}

/// Where a payload's top-left cell lands
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub sheet: SheetId,
    pub origin: CellRef,
}

impl Anchor {
    pub fn new(sheet: SheetId, origin: CellRef) -> Self {
        Self { sheet, origin }
    }

    /// Absolute range of a block given in 1-based payload coordinates
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidRange`] if the block falls outside the sheet
    pub fn range_of(
        &self,
        start_row: u32,
        end_row: u32,
        start_col: u32,
        end_col: u32,
    ) -> Result<CellRange, DomainError> {
        if start_row == 0 || start_col == 0 {
            return Err(DomainError::InvalidRange(
                "payload coordinates are 1-based".into(),
            ));
        }
        let start = self.origin.offset(start_row - 1, start_col - 1)?;
        let end = self.origin.offset(end_row.saturating_sub(1), end_col.saturating_sub(1))?;
        CellRange::new(self.sheet.clone(), start, end)
    }
}

/// Values destined for one range of a batch write
#[derive(Debug, Clone, PartialEq)]
pub struct RangeValues {
    pub range: CellRange,
    /// Row-major values; empty means "clear the range"
    pub values: Vec<Row>,
}

impl RangeValues {
    /// A clear of `range`
    pub fn clear(range: CellRange) -> Self {
        Self {
            range,
            values: Vec::new(),
        }
    }
}

/// One remote write decided by a sync mode
#[derive(Debug, Clone, PartialEq)]
pub enum WriteIntent {
    Overwrite { anchor: Anchor, rows: Vec<Row> },
    BatchOverwrite { ranges: Vec<RangeValues> },
    Prepend { anchor: Anchor, rows: Vec<Row> },
    Append { anchor: Anchor, rows: Vec<Row> },
}

impl WriteIntent {
    #[must_use]
    pub fn primitive(&self) -> WritePrimitive {
        match self {
            WriteIntent::Overwrite { .. } => WritePrimitive::Overwrite,
            WriteIntent::BatchOverwrite { .. } => WritePrimitive::BatchOverwrite,
            WriteIntent::Prepend { .. } => WritePrimitive::Prepend,
            WriteIntent::Append { .. } => WritePrimitive::Append,
        }
    }

    /// Number of payload rows carried (clears carry none)
    #[must_use]
    pub fn row_count(&self) -> usize {
        match self {
            WriteIntent::Overwrite { rows, .. }
            | WriteIntent::Prepend { rows, .. }
            | WriteIntent::Append { rows, .. } => rows.len(),
            WriteIntent::BatchOverwrite { ranges } => ranges.iter().map(|r| r.values.len()).sum(),
        }
    }

    /// True for a batch write whose every range is cleared
    #[must_use]
    pub fn is_clear(&self) -> bool {
        match self {
            WriteIntent::BatchOverwrite { ranges } => ranges.iter().all(|r| r.values.is_empty()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CellValue;

    fn anchor(row: u32, col: u32) -> Anchor {
        Anchor::new(
            SheetId::new("s".to_string()).unwrap(),
            CellRef::new(row, col).unwrap(),
        )
    }

    #[test]
    fn range_of_applies_origin_offset() {
        let range = anchor(2, 3).range_of(1, 500, 1, 80).unwrap();
        assert_eq!(range.to_string(), "s!C2:CD501");

        let range = anchor(1, 1).range_of(501, 600, 81, 100).unwrap();
        assert_eq!(range.to_string(), "s!CC501:CV600");
    }

    #[test]
    fn range_of_rejects_zero_coordinates() {
        assert!(anchor(1, 1).range_of(0, 1, 1, 1).is_err());
    }

    #[test]
    fn clear_detection() {
        let range = anchor(1, 1).range_of(1, 3, 1, 3).unwrap();
        let clear = WriteIntent::BatchOverwrite {
            ranges: vec![RangeValues::clear(range.clone())],
        };
        assert!(clear.is_clear());
        assert_eq!(clear.primitive(), WritePrimitive::BatchOverwrite);

        let write = WriteIntent::BatchOverwrite {
            ranges: vec![RangeValues {
                range,
                values: vec![vec![CellValue::Bool(true)]],
            }],
        };
        assert!(!write.is_clear());
        assert_eq!(write.row_count(), 1);
    }

    #[test]
    fn primitive_traits() {
        assert!(WritePrimitive::Append.inserts_rows());
        assert!(WritePrimitive::Prepend.inserts_rows());
        assert!(!WritePrimitive::Overwrite.inserts_rows());
        assert_eq!(WritePrimitive::BatchOverwrite.to_string(), "batch_overwrite");
    }
}
