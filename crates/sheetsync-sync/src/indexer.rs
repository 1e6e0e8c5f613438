//! Index-key lookups
//!
//! An [`Indexer`] maps the normalized value of one column to the position of
//! the row holding it. Rows with a blank key are never indexed.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use sheetsync_core::domain::{CellValue, DuplicateKeyPolicy, IndexKey, Row};

/// Key of `row` in `column`, if the cell is present and not blank
#[must_use]
pub fn key_of(row: &[CellValue], column: usize) -> Option<IndexKey> {
    row.get(column).and_then(IndexKey::from_cell)
}

/// Mapping from index key to 0-based row position
#[derive(Debug, Clone, Default)]
pub struct Indexer {
    positions: HashMap<IndexKey, usize>,
    duplicates: usize,
}

impl Indexer {
    /// Index `rows` by `column`; the first row seen for a key wins
    #[must_use]
    pub fn build(rows: &[Row], column: usize) -> Self {
        Self::build_with_policy(rows, column, DuplicateKeyPolicy::FirstWins)
    }

    /// Index `rows` by `column`, resolving repeated keys with `policy`
    #[must_use]
    pub fn build_with_policy(rows: &[Row], column: usize, policy: DuplicateKeyPolicy) -> Self {
        let mut positions = HashMap::with_capacity(rows.len());
        let mut duplicates = 0;
        for (position, row) in rows.iter().enumerate() {
            let Some(key) = key_of(row, column) else {
                continue;
            };
            match positions.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(position);
                }
                Entry::Occupied(mut slot) => {
                    duplicates += 1;
                    if policy == DuplicateKeyPolicy::LastWins {
                        slot.insert(position);
                    }
                }
            }
        }
        Self {
            positions,
            duplicates,
        }
    }

    /// Row position holding `key`
    #[must_use]
    pub fn position(&self, key: &IndexKey) -> Option<usize> {
        self.positions.get(key).copied()
    }

    #[must_use]
    pub fn contains(&self, key: &IndexKey) -> bool {
        self.positions.contains_key(key)
    }

    /// Number of distinct keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Rows skipped because their key had already been seen
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}
