//! A1-notation cell references and ranges
//!
//! All coordinates are 1-based and inclusive. Columns are rendered as
//! spreadsheet letters (`1 -> A`, `27 -> AA`).

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::SheetId;

/// Largest row number a sheet can address
pub const MAX_ROWS: u32 = 1_048_576;

/// Largest column number a sheet can address (`XFD`)
pub const MAX_COLUMNS: u32 = 16_384;

/// Convert a 1-based column number to its letter form
///
/// Returns an empty string for 0.
#[must_use]
pub fn column_letters(mut n: u32) -> String {
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Parse column letters (case-insensitive) into a 1-based column number
///
/// # Errors
/// Returns [`DomainError::InvalidColumn`] for empty input, non-letters, or
/// columns beyond [`MAX_COLUMNS`]
pub fn column_number(letters: &str) -> Result<u32, DomainError> {
    if letters.is_empty() {
        return Err(DomainError::InvalidColumn("column cannot be empty".into()));
    }
    let mut n: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(DomainError::InvalidColumn(letters.to_string()));
        }
        let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        n = n
            .checked_mul(26)
            .and_then(|n| n.checked_add(digit))
            .filter(|n| *n <= MAX_COLUMNS)
            .ok_or_else(|| DomainError::InvalidColumn(letters.to_string()))?;
    }
    Ok(n)
}

// ============================================================================
// CellRef
// ============================================================================

/// A single cell position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    /// Create a reference, checking it is addressable
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidRange`] for zero or out-of-bounds coordinates
    pub fn new(row: u32, col: u32) -> Result<Self, DomainError> {
        if row == 0 || col == 0 || row > MAX_ROWS || col > MAX_COLUMNS {
            return Err(DomainError::InvalidRange(format!(
                "cell (row {row}, col {col}) is outside the sheet"
            )));
        }
        Ok(Self { row, col })
    }

    /// The top-left cell `A1`
    #[must_use]
    pub const fn origin() -> Self {
        Self { row: 1, col: 1 }
    }

    /// Shift by a number of rows and columns
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidRange`] when the result leaves the sheet
    pub fn offset(self, rows: u32, cols: u32) -> Result<Self, DomainError> {
        Self::new(
            self.row.saturating_add(rows),
            self.col.saturating_add(cols),
        )
    }
}

impl Display for CellRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

impl FromStr for CellRef {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| DomainError::InvalidRange(format!("missing row number: {s}")))?;
        let (letters, digits) = s.split_at(split);
        let col = column_number(letters)?;
        let row = digits
            .parse::<u32>()
            .map_err(|_| DomainError::InvalidRange(format!("invalid row number: {s}")))?;
        Self::new(row, col)
    }
}

// ============================================================================
// CellRange
// ============================================================================

/// A rectangular block of cells on one sheet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub sheet: SheetId,
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    /// Create a range from its corners
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidRange`] if `end` lies above or left of `start`
    pub fn new(sheet: SheetId, start: CellRef, end: CellRef) -> Result<Self, DomainError> {
        if end.row < start.row || end.col < start.col {
            return Err(DomainError::InvalidRange(format!(
                "{start}:{end} is inverted"
            )));
        }
        Ok(Self { sheet, start, end })
    }

    /// Range covering `rows` x `cols` cells anchored at `start`
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidRange`] for an empty or out-of-bounds block
    pub fn with_size(
        sheet: SheetId,
        start: CellRef,
        rows: u32,
        cols: u32,
    ) -> Result<Self, DomainError> {
        if rows == 0 || cols == 0 {
            return Err(DomainError::InvalidRange(format!(
                "{rows}x{cols} block at {start} is empty"
            )));
        }
        let end = start.offset(rows - 1, cols - 1)?;
        Self::new(sheet, start, end)
    }

    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    #[must_use]
    pub fn col_count(&self) -> u32 {
        self.end.col - self.start.col + 1
    }
}

impl Display for CellRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}:{}", self.sheet, self.start, self.end)
    }
}

impl FromStr for CellRange {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sheet, cells) = s
            .split_once('!')
            .ok_or_else(|| DomainError::InvalidRange(format!("missing sheet prefix: {s}")))?;
        let (start, end) = cells
            .split_once(':')
            .ok_or_else(|| DomainError::InvalidRange(format!("missing ':' separator: {s}")))?;
        Self::new(SheetId::new(sheet.to_string())?, start.parse()?, end.parse()?)
    }
}
