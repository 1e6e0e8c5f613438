//! Domain types
//!
//! This module contains the core domain types for sheetsync:
//! - Cell values and normalized index keys
//! - Datasets (header + rows) and column mappings
//! - A1 cell references and ranges
//! - Payload chunks and write intents
//! - Synchronization modes
//! - Newtypes for remote identifiers
//! - Domain-specific error types

pub mod cell;
pub mod chunk;
pub mod dataset;
pub mod errors;
pub mod intent;
pub mod mode;
pub mod newtypes;
pub mod range;

// Re-export commonly used types
pub use cell::{CellValue, IndexKey};
pub use chunk::Chunk;
pub use dataset::{union_headers, ColumnMapping, Dataset, Row};
pub use errors::DomainError;
pub use intent::{Anchor, RangeValues, WriteIntent, WritePrimitive};
pub use mode::{DuplicateKeyPolicy, SyncMode};
pub use newtypes::*;
pub use range::{column_letters, column_number, CellRange, CellRef, MAX_COLUMNS, MAX_ROWS};
