//! Codec trait and implementations for player documents and bus messages.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The store persists records as encoded documents and the command bus
//! ships encoded [`ChannelMessage`](crate::ChannelMessage)s; neither cares
//! HOW the bytes are produced, only that something implements [`Codec`].
//!
//! [`JsonCodec`] is the only implementation today. JSON keeps documents
//! readable in the database and matches the field names peers expect.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Turns records and messages into stored or transmitted bytes.
///
/// ## Bounds
///
/// - `Send + Sync` → one codec instance is shared by the store and the
///   bus, which are used from many threads at once.
/// - `'static` → the codec owns everything it needs, so it can live
///   inside long-lived `Arc`s and blocking tasks.
///
/// `decode` returns `DeserializeOwned` values: the result never borrows
/// from the input, so storage buffers can be dropped right after decoding.
pub trait Codec: Send + Sync + 'static {
    /// Produces the document or frame for `value`.
    ///
    /// # Errors
    /// [`ProtocolError::Encode`] when `value` has no representation in
    /// this format (for example a map with non-string keys in JSON).
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Reads a `T` out of a stored document or received frame.
    ///
    /// # Errors
    /// [`ProtocolError::Decode`] for truncated input or a document whose
    /// shape is not a `T`.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// Plain `serde_json` documents with the camelCase field names peers use.
///
/// ## Example
///
/// ```rust
/// use playerbridge_protocol::{Codec, JsonCodec, PlayerIdentity};
/// use uuid::Uuid;
///
/// let codec = JsonCodec;
/// let identity = PlayerIdentity::new(Uuid::new_v4(), "Steve");
///
/// let bytes = codec.encode(&identity).unwrap();
/// let decoded: PlayerIdentity = codec.decode(&bytes).unwrap();
/// assert_eq!(identity, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::OfflinePlayerRecord;

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result: Result<OfflinePlayerRecord, _> =
            JsonCodec.decode(b"{not json");

        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_missing_field_returns_decode_error() {
        // A document without `uniqueId` can't be a player record.
        let result: Result<OfflinePlayerRecord, _> =
            JsonCodec.decode(br#"{"name":"Steve"}"#);

        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
