//! Typed publication on top of a [`Messenger`].

use playerbridge_protocol::{
    ChannelMessage, Codec, JsonCodec, PLAYER_API_CHANNEL, PlayerCommand,
};

use crate::{BusError, Messenger};

/// Publishes [`PlayerCommand`]s on one channel.
///
/// Publication is fire-and-forget. There is no acknowledgement and no
/// retry; a transport that can't take the message right now fails the
/// call with [`BusError::Saturated`] instead of waiting.
#[derive(Debug)]
pub struct CommandBus<M: Messenger, C: Codec = JsonCodec> {
    messenger: M,
    codec: C,
    channel: String,
}

impl<M: Messenger> CommandBus<M> {
    /// A JSON bus on [`PLAYER_API_CHANNEL`].
    pub fn new(messenger: M) -> Self {
        Self::with_channel(messenger, PLAYER_API_CHANNEL)
    }

    /// A JSON bus on a custom channel.
    pub fn with_channel(messenger: M, channel: impl Into<String>) -> Self {
        Self::with_codec(messenger, JsonCodec, channel)
    }
}

impl<M: Messenger, C: Codec> CommandBus<M, C> {
    pub fn with_codec(
        messenger: M,
        codec: C,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            messenger,
            codec,
            channel: channel.into(),
        }
    }

    /// The channel commands are published on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn messenger(&self) -> &M {
        &self.messenger
    }

    /// Encodes `command` as a [`ChannelMessage`] and hands it to the
    /// messenger.
    pub fn publish(&self, command: PlayerCommand) -> Result<(), BusError> {
        let topic = command.topic();
        let message = ChannelMessage::new(self.channel.as_str(), command);
        let data = self.codec.encode(&message)?;
        self.messenger.send_channel_message(&self.channel, data)?;
        tracing::debug!(channel = %self.channel, topic, "command published");
        Ok(())
    }

    /// Turns bytes received from the messenger back into a message.
    ///
    /// The message's own `channel` field is returned as sent; callers
    /// that share a subscription across channels filter on it.
    pub fn decode(&self, data: &[u8]) -> Result<ChannelMessage, BusError> {
        Ok(self.codec.decode(data)?)
    }
}
