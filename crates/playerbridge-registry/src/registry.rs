//! The player registry: every player connected through this node.
//!
//! This is the authoritative online view on the node that owns the
//! connection. It is responsible for:
//! - Adding a record when a player connects
//! - Removing it when the player disconnects
//! - Tracking service switches during a session
//! - Answering lookups by id, name, and service environment
//!
//! # Concurrency note
//!
//! Unlike a plain `HashMap` behind a mutex, the registry is a `DashMap`:
//! a sharded concurrent map where each shard has its own lock. Platform
//! event threads insert and remove players while request threads read,
//! and callers never lock anything themselves. Operations on one id are
//! linearizable; there is no ordering across different ids.
//!
//! Nothing here is persisted. After a restart the registry is rebuilt
//! from the connections that come back.

use dashmap::DashMap;
use playerbridge_protocol::{
    OnlinePlayerRecord, ServiceEnvironmentType, ServiceRef,
};
use uuid::Uuid;

/// Concurrent table of online players, keyed by unique id.
///
/// ## Lifecycle of an entry
///
/// ```text
/// insert() ──→ [Online] ──update_connected_service()──→ [Online*]
///                  │                                        │
///                  └──────────────── remove() ◄─────────────┘
/// ```
///
/// Lookups return clones. A record handed out is a snapshot and does
/// not keep a shard locked.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: DashMap<Uuid, OnlinePlayerRecord>,
}

impl PlayerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            players: DashMap::new(),
        }
    }

    /// Adds or replaces the record for `record.unique_id()`.
    ///
    /// Last write wins for the same id. Returns the record that was
    /// replaced, if any.
    pub fn insert(
        &self,
        record: OnlinePlayerRecord,
    ) -> Option<OnlinePlayerRecord> {
        let unique_id = record.unique_id();
        let previous = self.players.insert(unique_id, record);
        tracing::debug!(
            %unique_id,
            replaced = previous.is_some(),
            "online player registered"
        );
        previous
    }

    /// Replaces the record only if the player is already registered.
    ///
    /// Returns `true` if an entry was updated. Used to refresh a local
    /// entry without resurrecting a player who disconnected meanwhile.
    pub fn replace_existing(&self, record: OnlinePlayerRecord) -> bool {
        match self.players.get_mut(&record.unique_id()) {
            Some(mut entry) => {
                *entry = record;
                true
            }
            None => false,
        }
    }

    /// Removes a player. Returns their last record, or `None` if they
    /// were not registered.
    pub fn remove(&self, unique_id: &Uuid) -> Option<OnlinePlayerRecord> {
        let removed = self.players.remove(unique_id).map(|(_, r)| r);
        if removed.is_some() {
            tracing::debug!(%unique_id, "online player unregistered");
        }
        removed
    }

    /// Points a player at a new connected service.
    ///
    /// The identity and login service stay the same. Returns the updated
    /// record, or `None` if the player isn't online here.
    pub fn update_connected_service(
        &self,
        unique_id: &Uuid,
        service: ServiceRef,
    ) -> Option<OnlinePlayerRecord> {
        let mut entry = self.players.get_mut(unique_id)?;
        entry.connected_service = Some(service);
        Some(entry.value().clone())
    }

    /// Looks up a player by unique id.
    pub fn get(&self, unique_id: &Uuid) -> Option<OnlinePlayerRecord> {
        self.players.get(unique_id).map(|entry| entry.value().clone())
    }

    /// Returns `true` if the player is online here.
    pub fn contains(&self, unique_id: &Uuid) -> bool {
        self.players.contains_key(unique_id)
    }

    /// All players whose name equals `name`, ignoring case.
    ///
    /// Names are not unique, so this can return several records. Order
    /// is unspecified.
    pub fn find_by_name(&self, name: &str) -> Vec<OnlinePlayerRecord> {
        self.players
            .iter()
            .filter(|entry| entry.identity.name_matches(name))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// All players whose login service or connected service runs
    /// `environment`.
    pub fn find_by_environment(
        &self,
        environment: ServiceEnvironmentType,
    ) -> Vec<OnlinePlayerRecord> {
        self.players
            .iter()
            .filter(|entry| entry.runs_on(environment))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// A snapshot of every online player.
    pub fn all(&self) -> Vec<OnlinePlayerRecord> {
        self.players.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Number of online players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns `true` if nobody is online.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
