//! sheetsync Core - Domain types and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `CellValue`, `Dataset`, `CellRange`, `Chunk`, `WriteIntent`, `SyncMode`
//! - **Port definitions** - The `ISheetClient` trait that remote adapters implement
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure data types with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! The sync pipeline in `sheetsync-sync` drives those ports.

pub mod config;
pub mod domain;
pub mod ports;
