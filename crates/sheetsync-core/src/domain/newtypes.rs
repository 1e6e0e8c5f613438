//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for remote identifiers.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// UUID-based ID types
// ============================================================================

/// Identifier for a single sync invocation, used to correlate log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::ValidationFailed(format!("Invalid run id: {e}")))
    }
}

// ============================================================================
// Remote identifiers
// ============================================================================

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Token identifying a remote spreadsheet document
///
/// Tokens are opaque ASCII strings; the path segment they are placed in
/// must not need escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpreadsheetToken(String);

impl SpreadsheetToken {
    /// Create a new SpreadsheetToken
    ///
    /// # Errors
    /// Returns error if the token is empty or contains characters outside `[A-Za-z0-9_-]`
    pub fn new(token: String) -> Result<Self, DomainError> {
        if token.is_empty() {
            return Err(DomainError::InvalidSpreadsheetToken(
                "Spreadsheet token cannot be empty".to_string(),
            ));
        }
        if !token.chars().all(is_token_char) {
            return Err(DomainError::InvalidSpreadsheetToken(format!(
                "Spreadsheet token contains invalid characters: {token}"
            )));
        }
        Ok(Self(token))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SpreadsheetToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SpreadsheetToken {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for SpreadsheetToken {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<SpreadsheetToken> for String {
    fn from(token: SpreadsheetToken) -> Self {
        token.0
    }
}

/// Identifier of one sheet (tab) inside a spreadsheet
///
/// Used as the prefix of every A1 range (`<sheet_id>!A1:C3`), so it may not
/// contain `!` or `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SheetId(String);

impl SheetId {
    /// Create a new SheetId
    ///
    /// # Errors
    /// Returns error if the id is empty or contains range separators
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidSheetId(
                "Sheet id cannot be empty".to_string(),
            ));
        }
        if !id.chars().all(is_token_char) {
            return Err(DomainError::InvalidSheetId(format!(
                "Sheet id contains invalid characters: {id}"
            )));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SheetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SheetId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for SheetId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<SheetId> for String {
    fn from(id: SheetId) -> Self {
        id.0
    }
}
