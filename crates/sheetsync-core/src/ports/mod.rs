//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the sync pipeline
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ISheetClient`] - Raw reads and writes against a remote spreadsheet

pub mod sheet_client;

pub use sheet_client::{ISheetClient, RemoteError};
