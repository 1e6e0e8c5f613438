//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including malformed identifiers, invalid cell references and
//! inconsistent dataset shapes.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid spreadsheet token format or content
    #[error("Invalid spreadsheet token: {0}")]
    InvalidSpreadsheetToken(String),

    /// Invalid sheet identifier
    #[error("Invalid sheet id: {0}")]
    InvalidSheetId(String),

    /// Column letters could not be parsed or are out of range
    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    /// A cell reference or range string could not be parsed
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// The named column does not exist in the dataset headers
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Unrecognized synchronization mode name
    #[error("Invalid sync mode: {0}")]
    InvalidMode(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidColumn("A1".to_string());
        assert_eq!(err.to_string(), "Invalid column: A1");

        let err = DomainError::InvalidRange("sheet!:B".to_string());
        assert_eq!(err.to_string(), "Invalid range: sheet!:B");

        let err = DomainError::InvalidMode("mirror".to_string());
        assert_eq!(err.to_string(), "Invalid sync mode: mirror");
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::UnknownColumn("id".to_string());
        let err2 = DomainError::UnknownColumn("id".to_string());
        let err3 = DomainError::UnknownColumn("name".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
