//! Player records shared by every node and proxy in the fleet.
//!
//! These are the structures that get persisted in the offline store and
//! embedded in bus commands. Field names serialize as camelCase so the
//! documents match what peers already read and write.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ProtocolError;

/// Free-form key/value properties attached to a player.
///
/// Plugins stash arbitrary data here (permissions group, locale, ...).
/// `BTreeMap` keeps serialization order stable, so re-encoding an
/// unchanged record produces identical bytes.
pub type Properties = BTreeMap<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// PlayerIdentity
// ---------------------------------------------------------------------------

/// Who a player is: a 128-bit unique id plus the display name.
///
/// The fields are private and there are no setters, so an identity can't
/// be mutated after construction. A rename produces a new identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerIdentity {
    unique_id: Uuid,
    name: String,
}

impl PlayerIdentity {
    /// Creates an identity. Use [`validate`](Self::validate) before
    /// trusting values that came from outside the process.
    pub fn new(unique_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            unique_id,
            name: name.into(),
        }
    }

    /// The player's unique id.
    pub fn unique_id(&self) -> Uuid {
        self.unique_id
    }

    /// The player's display name (not unique).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive name comparison used by every name lookup.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// Rejects the nil UUID and blank names.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] naming the bad field.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.unique_id.is_nil() {
            return Err(ProtocolError::InvalidMessage(
                "player unique id must not be nil".into(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(ProtocolError::InvalidMessage(format!(
                "player {} has an empty name",
                self.unique_id
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.unique_id)
    }
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// The kind of server or proxy software a service instance runs.
///
/// Serialized in SCREAMING_SNAKE_CASE (`"BUNGEECORD"`, `"GO_MINT"`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceEnvironmentType {
    MinecraftServer,
    Glowstone,
    Nukkit,
    GoMint,
    Bungeecord,
    Velocity,
    Waterdog,
}

impl ServiceEnvironmentType {
    /// Every known environment, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::MinecraftServer,
        Self::Glowstone,
        Self::Nukkit,
        Self::GoMint,
        Self::Bungeecord,
        Self::Velocity,
        Self::Waterdog,
    ];

    /// Returns `true` for proxy software (the services that receive
    /// kick/send/message directives).
    pub fn is_proxy(&self) -> bool {
        matches!(self, Self::Bungeecord | Self::Velocity | Self::Waterdog)
    }
}

impl fmt::Display for ServiceEnvironmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MinecraftServer => "MINECRAFT_SERVER",
            Self::Glowstone => "GLOWSTONE",
            Self::Nukkit => "NUKKIT",
            Self::GoMint => "GO_MINT",
            Self::Bungeecord => "BUNGEECORD",
            Self::Velocity => "VELOCITY",
            Self::Waterdog => "WATERDOG",
        };
        f.write_str(s)
    }
}

/// A reference to one running service instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRef {
    /// What software the service runs.
    pub environment: ServiceEnvironmentType,
    /// The service instance's unique id.
    pub unique_id: Uuid,
    /// Human-readable service name, e.g. `"Lobby-1"`.
    pub service_name: String,
}

impl ServiceRef {
    /// Creates a reference with a fresh random service id.
    pub fn new(
        environment: ServiceEnvironmentType,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            environment,
            unique_id: Uuid::new_v4(),
            service_name: service_name.into(),
        }
    }

    /// Rejects blank service names.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.service_name.trim().is_empty() {
            return Err(ProtocolError::InvalidMessage(format!(
                "service {} has an empty name",
                self.unique_id
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// OnlinePlayerRecord
// ---------------------------------------------------------------------------

/// A player who is connected right now.
///
/// Lives in the registry of the node that owns the connection and is
/// mirrored to peers through `update_online_cloud_player` commands. It
/// carries the same snapshot fields as [`OfflinePlayerRecord`] so the
/// projection written to the store loses nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlinePlayerRecord {
    #[serde(flatten)]
    pub identity: PlayerIdentity,

    /// The first service the player connected through this session
    /// (normally a proxy).
    #[serde(default)]
    pub login_service: Option<ServiceRef>,

    /// The service the player is on right now. Changes on redirect.
    #[serde(default)]
    pub connected_service: Option<ServiceRef>,

    /// Unix millis of the very first connection ever.
    pub first_login_time: u64,

    /// Unix millis of the connection that started this session.
    pub last_login_time: u64,

    /// Previous display names, oldest first.
    #[serde(default)]
    pub name_history: Vec<String>,

    #[serde(default)]
    pub properties: Properties,
}

impl OnlinePlayerRecord {
    /// Shorthand for `self.identity.unique_id()`.
    pub fn unique_id(&self) -> Uuid {
        self.identity.unique_id()
    }

    /// Shorthand for `self.identity.name()`.
    pub fn name(&self) -> &str {
        self.identity.name()
    }

    /// Returns `true` if either the login service or the connected
    /// service runs `environment`.
    pub fn runs_on(&self, environment: ServiceEnvironmentType) -> bool {
        let on = |service: &Option<ServiceRef>| {
            service
                .as_ref()
                .is_some_and(|s| s.environment == environment)
        };
        on(&self.login_service) || on(&self.connected_service)
    }

    /// Checks the identity and any attached service references.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        self.identity.validate()?;
        for service in
            [&self.login_service, &self.connected_service].into_iter().flatten()
        {
            service.validate()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// OfflinePlayerRecord
// ---------------------------------------------------------------------------

/// The durable record of a player, online or not.
///
/// One document per player in the offline store, keyed by the hyphenated
/// string form of the unique id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflinePlayerRecord {
    #[serde(flatten)]
    pub identity: PlayerIdentity,

    /// Previous display names, oldest first.
    #[serde(default)]
    pub name_history: Vec<String>,

    /// Unix millis of the very first connection ever.
    pub first_login_time: u64,

    /// Unix millis of the most recent connection.
    pub last_login_time: u64,

    /// Unix millis of the most recent disconnect. `None` while the
    /// player has never left or is in an online projection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_logout_time: Option<u64>,

    #[serde(default)]
    pub properties: Properties,
}

impl OfflinePlayerRecord {
    /// Creates the record for a player seen for the first time.
    pub fn first_seen(identity: PlayerIdentity, now: u64) -> Self {
        Self {
            identity,
            name_history: Vec::new(),
            first_login_time: now,
            last_login_time: now,
            last_logout_time: None,
            properties: Properties::new(),
        }
    }

    /// Shorthand for `self.identity.unique_id()`.
    pub fn unique_id(&self) -> Uuid {
        self.identity.unique_id()
    }

    /// Shorthand for `self.identity.name()`.
    pub fn name(&self) -> &str {
        self.identity.name()
    }

    /// The key this record is stored under.
    pub fn storage_key(&self) -> String {
        storage_key(&self.unique_id())
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        self.identity.validate()
    }
}

/// Projects an online record onto its durable form.
///
/// The service references are connection state and are dropped. An
/// online record carries no logout time, so the projection has none;
/// writers that overwrite a stored record keep the stored one.
impl From<&OnlinePlayerRecord> for OfflinePlayerRecord {
    fn from(online: &OnlinePlayerRecord) -> Self {
        Self {
            identity: online.identity.clone(),
            name_history: online.name_history.clone(),
            first_login_time: online.first_login_time,
            last_login_time: online.last_login_time,
            last_logout_time: None,
            properties: online.properties.clone(),
        }
    }
}

/// The document key for a unique id: its hyphenated lowercase form.
pub fn storage_key(unique_id: &Uuid) -> String {
    unique_id.hyphenated().to_string()
}
