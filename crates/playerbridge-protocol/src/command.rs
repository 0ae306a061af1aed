//! Bridge commands: the messages nodes and proxies exchange on the
//! player API channel.
//!
//! Every command has a fixed topic string and a fixed payload schema.
//! Peers written against the same channel match on the topic, so the
//! strings in [`topics`] are a compatibility contract and must not change.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{OfflinePlayerRecord, OnlinePlayerRecord};

/// Default name of the channel every node and proxy subscribes to.
pub const PLAYER_API_CHANNEL: &str = "bridge_player_api_channel";

/// Topic strings, one per [`PlayerCommand`] variant.
pub mod topics {
    pub const UPDATE_OFFLINE_CLOUD_PLAYER: &str = "update_offline_cloud_player";
    pub const UPDATE_ONLINE_CLOUD_PLAYER: &str = "update_online_cloud_player";
    pub const SEND_ON_PROXY_PLAYER_TO_SERVER: &str =
        "send_on_proxy_player_to_server";
    pub const SEND_MESSAGE_TO_PROXY_PLAYER: &str =
        "send_message_to_proxy_player";
    pub const KICK_ON_PROXY_PLAYER_FROM_NETWORK: &str =
        "kick_on_proxy_player_from_network";
    pub const BROADCAST_MESSAGE: &str = "broadcast_message";
}

/// A command published on the player API channel.
///
/// `#[serde(tag = "topic", content = "payload")]` makes this an
/// "adjacently tagged" enum. A kick serializes as:
///
/// ```json
/// { "topic": "kick_on_proxy_player_from_network",
///   "payload": { "uniqueId": "...", "name": "Steve", "kickMessage": "bye" } }
/// ```
///
/// so the topic is readable without knowing the payload type, and a
/// payload that doesn't fit its topic fails to decode instead of
/// surfacing later as a missing field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload")]
pub enum PlayerCommand {
    /// A durable record changed.
    #[serde(rename = "update_offline_cloud_player", rename_all = "camelCase")]
    UpdateOfflinePlayer { offline_cloud_player: OfflinePlayerRecord },

    /// An online record changed (login, rename, service switch).
    #[serde(rename = "update_online_cloud_player", rename_all = "camelCase")]
    UpdateOnlinePlayer { cloud_player: OnlinePlayerRecord },

    /// Ask the owning proxy to move a player to another service.
    #[serde(rename = "send_on_proxy_player_to_server", rename_all = "camelCase")]
    SendPlayerToService { unique_id: Uuid, service_name: String },

    /// Ask the owning proxy to show a chat message to a player.
    #[serde(rename = "send_message_to_proxy_player", rename_all = "camelCase")]
    SendMessage {
        unique_id: Uuid,
        name: String,
        message: String,
    },

    /// Ask the owning proxy to disconnect a player.
    #[serde(
        rename = "kick_on_proxy_player_from_network",
        rename_all = "camelCase"
    )]
    KickPlayer {
        unique_id: Uuid,
        name: String,
        kick_message: String,
    },

    /// Show a message to every player, or only to those holding
    /// `permission`.
    #[serde(rename = "broadcast_message")]
    BroadcastMessage {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        permission: Option<String>,
    },
}

impl PlayerCommand {
    /// The topic string this command is published under.
    pub fn topic(&self) -> &'static str {
        match self {
            Self::UpdateOfflinePlayer { .. } => {
                topics::UPDATE_OFFLINE_CLOUD_PLAYER
            }
            Self::UpdateOnlinePlayer { .. } => {
                topics::UPDATE_ONLINE_CLOUD_PLAYER
            }
            Self::SendPlayerToService { .. } => {
                topics::SEND_ON_PROXY_PLAYER_TO_SERVER
            }
            Self::SendMessage { .. } => topics::SEND_MESSAGE_TO_PROXY_PLAYER,
            Self::KickPlayer { .. } => {
                topics::KICK_ON_PROXY_PLAYER_FROM_NETWORK
            }
            Self::BroadcastMessage { .. } => topics::BROADCAST_MESSAGE,
        }
    }

    /// `true` for the two update topics, which carry state peers mirror.
    /// Everything else is a directive aimed at whoever owns the player's
    /// connection.
    pub fn is_state_update(&self) -> bool {
        matches!(
            self,
            Self::UpdateOfflinePlayer { .. } | Self::UpdateOnlinePlayer { .. }
        )
    }
}

/// A command addressed to a channel. This is the unit the bus encodes
/// and hands to the messenger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// Channel name, normally [`PLAYER_API_CHANNEL`].
    pub channel: String,
    pub command: PlayerCommand,
}

impl ChannelMessage {
    pub fn new(channel: impl Into<String>, command: PlayerCommand) -> Self {
        Self {
            channel: channel.into(),
            command,
        }
    }

    /// Shorthand for `self.command.topic()`.
    pub fn topic(&self) -> &'static str {
        self.command.topic()
    }
}
