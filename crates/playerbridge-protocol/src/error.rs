//! Error types for the protocol layer.
//!
//! Every crate in playerbridge owns its error enum. A `ProtocolError`
//! always means the problem is in the shape of a record or command
//! (encoding, decoding, or a field that breaks the schema), never in
//! storage or transport.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a record or command into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a record or command).
    ///
    /// Common causes: a document written by an incompatible version,
    /// missing required fields, or a topic this build does not know.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The value deserialized fine but violates the schema rules,
    /// e.g. a nil unique id or an empty player name.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
