//! Shared vocabulary for playerbridge.
//!
//! This crate defines what every node and proxy agrees on:
//!
//! - **Records** ([`PlayerIdentity`], [`OnlinePlayerRecord`],
//!   [`OfflinePlayerRecord`], [`ServiceRef`]): the player data that is
//!   stored and mirrored.
//! - **Commands** ([`PlayerCommand`], [`ChannelMessage`]): the typed
//!   messages published on the player API channel.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how both become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Registry / Store / Bus  →  Protocol (records, commands)  →  bytes
//! ```

mod codec;
mod command;
mod error;
mod player;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use command::{ChannelMessage, PLAYER_API_CHANNEL, PlayerCommand, topics};
pub use error::ProtocolError;
pub use player::{
    OfflinePlayerRecord, OnlinePlayerRecord, PlayerIdentity, Properties,
    ServiceEnvironmentType, ServiceRef, storage_key,
};
