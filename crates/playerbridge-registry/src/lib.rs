//! Online player tracking for playerbridge.
//!
//! This crate holds the node's authoritative view of who is connected
//! ([`PlayerRegistry`]). It knows nothing about persistence or the bus;
//! the directory facade keeps it in step with the offline store.
//!
//! # How it fits in the stack
//!
//! ```text
//! Directory facade (above)  ← writes the store, then the registry
//!     ↕
//! Registry (this crate)     ← who is online right now
//!     ↕
//! Protocol (below)          ← OnlinePlayerRecord, ServiceRef
//! ```

mod registry;

pub use registry::PlayerRegistry;
