//! Error types for the storage layer.

use playerbridge_protocol::ProtocolError;

/// Errors that can occur while reading or writing player documents.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing medium failed (disk full, permission denied, ...).
    #[error("database i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded, a stored document could not be
    /// decoded, or a record failed validation before being written.
    #[error(transparent)]
    Codec(#[from] ProtocolError),

    /// The key can't be used by this database (e.g. it would escape the
    /// data directory of a file database).
    #[error("invalid document key: {0:?}")]
    InvalidKey(String),

    /// The database can't serve requests right now (poisoned lock,
    /// unreachable backend).
    #[error("database {0} is unavailable")]
    Unavailable(String),
}
