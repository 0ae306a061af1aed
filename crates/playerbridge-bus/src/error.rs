use playerbridge_protocol::ProtocolError;

/// Errors that can occur while publishing or decoding bus messages.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// A subscriber's queue on the channel is full. The message was not
    /// delivered to that subscriber.
    #[error("channel {0} is saturated")]
    Saturated(String),

    /// The messenger was shut down.
    #[error("messenger closed: {0}")]
    Closed(String),

    /// Encoding an outgoing or decoding an incoming message failed.
    #[error(transparent)]
    Codec(#[from] ProtocolError),
}
