//! # playerbridge
//!
//! Cluster-wide player directory for a network of game servers and
//! proxies.
//!
//! Each node keeps the players connected through it in a
//! [`PlayerRegistry`], persists every player it has ever seen in an
//! [`OfflineStore`], and propagates changes and directives (move, message,
//! kick, broadcast) to its peers over a [`CommandBus`]. The
//! [`DirectoryService`] is the single entry point for all of it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use playerbridge::prelude::*;
//!
//! # fn main() -> Result<(), DirectoryError> {
//! let config = DirectoryConfig::default();
//! let messenger = Arc::new(LocalMessenger::new(config.messenger_capacity));
//! let directory = DirectoryService::with_config(
//!     &config,
//!     MemoryDatabase::new(config.database_name.as_str()),
//!     messenger,
//!     InlineExecutor,
//! );
//!
//! let steve = PlayerIdentity::new(Uuid::new_v4(), "Steve");
//! let proxy = ServiceRef::new(ServiceEnvironmentType::Velocity, "Proxy-1");
//! directory.login_player(steve.clone(), proxy)?;
//! directory.send_message_to_player(&steve, "Welcome!")?;
//! # Ok(())
//! # }
//! ```

mod config;
mod directory;
mod error;
pub mod logging;
mod pending;

pub use config::{ConfigError, DirectoryConfig, ENV_PREFIX, LoggingConfig};
pub use directory::DirectoryService;
pub use error::DirectoryError;
pub use pending::Pending;

pub use playerbridge_bus::{
    BusError, CommandBus, LocalMessenger, Messenger, Subscription,
};
pub use playerbridge_protocol::{
    ChannelMessage, Codec, JsonCodec, OfflinePlayerRecord, OnlinePlayerRecord,
    PLAYER_API_CHANNEL, PlayerCommand, PlayerIdentity, ProtocolError,
    ServiceEnvironmentType, ServiceRef, topics,
};
pub use playerbridge_registry::PlayerRegistry;
pub use playerbridge_store::{
    Database, FileDatabase, MemoryDatabase, OfflineStore, StoreError,
};
pub use playerbridge_task::{
    Executor, InlineExecutor, Task, TaskError, TokioExecutor,
};
pub use uuid::Uuid;

/// Everything a node needs to run a directory.
pub mod prelude {
    pub use crate::logging::init_logging;
    pub use crate::{
        DirectoryConfig, DirectoryError, DirectoryService, Executor,
        FileDatabase, InlineExecutor, LocalMessenger, MemoryDatabase,
        Messenger, OfflinePlayerRecord, OnlinePlayerRecord, Pending,
        PlayerCommand, PlayerIdentity, ServiceEnvironmentType, ServiceRef,
        TokioExecutor, Uuid,
    };
}
