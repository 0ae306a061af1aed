//! Durable offline player records for playerbridge.
//!
//! # Key types
//!
//! - [`Database`]: the document database seam (string key → bytes)
//! - [`MemoryDatabase`]: in-process database, insertion order
//! - [`FileDatabase`]: one JSON file per player, key order
//! - [`OfflineStore`]: typed records on top of any database
//! - [`StoreError`]
//!
//! Everything here may block. The directory facade routes calls from
//! latency-sensitive paths through an executor.

mod database;
mod error;
mod file;
mod store;

pub use database::{Database, MemoryDatabase};
pub use error::StoreError;
pub use file::FileDatabase;
pub use store::OfflineStore;
