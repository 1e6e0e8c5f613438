//! Synchronization modes

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// How local rows are reconciled with what the sheet already holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Update rows whose key exists remotely, append the rest
    #[default]
    Full,
    /// Append only rows whose key is not yet present
    Incremental,
    /// Replace matching remote rows with the local version, keep the others
    Overwrite,
    /// Clear the sheet and write the local table
    Clone,
}

impl SyncMode {
    pub const ALL: [SyncMode; 4] = [
        SyncMode::Full,
        SyncMode::Incremental,
        SyncMode::Overwrite,
        SyncMode::Clone,
    ];

    /// Whether rows are matched by the index column in this mode
    ///
    /// Clone replaces the whole table, so it never looks at keys.
    #[must_use]
    pub fn uses_index(self) -> bool {
        !matches!(self, SyncMode::Clone)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncMode::Full => "full",
            SyncMode::Incremental => "incremental",
            SyncMode::Overwrite => "overwrite",
            SyncMode::Clone => "clone",
        }
    }
}

impl Display for SyncMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncMode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::InvalidMode(s.to_string()))
    }
}

/// Which local row wins when several share an index key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    #[default]
    LastWins,
    FirstWins,
}
