//! Command propagation for playerbridge.
//!
//! Provides the [`Messenger`] trait that abstracts over the cluster's
//! pub/sub transport, and the [`CommandBus`] that turns typed
//! [`PlayerCommand`](playerbridge_protocol::PlayerCommand)s into channel
//! messages on top of it.
//!
//! [`LocalMessenger`] is an in-process fan-out implementation used by
//! tests and by single-process deployments that run several nodes.

mod bus;
mod error;
mod local;

pub use bus::CommandBus;
pub use error::BusError;
pub use local::{LocalMessenger, Subscription};

use std::sync::Arc;

/// Delivers raw bytes to every subscriber of a named channel.
///
/// Delivery is fire-and-forget: `Ok(())` means the transport accepted the
/// message, not that anyone processed it. Implementations must not block
/// waiting for queue space; a full queue is reported as
/// [`BusError::Saturated`].
pub trait Messenger: Send + Sync + 'static {
    /// Hands `data` to the transport for delivery on `channel`.
    fn send_channel_message(
        &self,
        channel: &str,
        data: Vec<u8>,
    ) -> Result<(), BusError>;
}

impl<M: Messenger> Messenger for Arc<M> {
    fn send_channel_message(
        &self,
        channel: &str,
        data: Vec<u8>,
    ) -> Result<(), BusError> {
        (**self).send_channel_message(channel, data)
    }
}
