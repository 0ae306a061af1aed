//! `DirectoryService`: the node-side player directory.
//!
//! Ties the three layers together:
//!
//! ```text
//!   caller ──→ DirectoryService ──→ PlayerRegistry   (who is online here)
//!                     │        └──→ OfflineStore     (everyone ever seen)
//!                     └───────────→ CommandBus       (tell the peers)
//! ```
//!
//! Writes always hit the store before the registry, so every online id
//! has a durable record. Reads against the registry answer immediately;
//! reads against the store may block, and their `_async` variants run on
//! the executor.
//!
//! ## Player lifecycle
//!
//! ```text
//!   Unknown ──(login)──→ Online ──(update / switch)──→ Online
//!                          │
//!                          └──(logout)──→ Offline ──(login)──→ Online
//! ```

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use playerbridge_bus::{CommandBus, Messenger};
use playerbridge_protocol::{
    OfflinePlayerRecord, OnlinePlayerRecord, PlayerCommand, PlayerIdentity,
    ServiceEnvironmentType, ServiceRef,
};
use playerbridge_registry::PlayerRegistry;
use playerbridge_store::{Database, OfflineStore, StoreError};
use playerbridge_task::Executor;
use uuid::Uuid;

use crate::{DirectoryConfig, DirectoryError, Pending};

/// The player directory of one node.
///
/// Constructed once per node and shared by `Arc`. Every method takes
/// `&self`; the registry and store do their own synchronization.
///
/// ## Type parameters
///
/// - `D` → where offline records live
/// - `M` → how commands reach peer nodes and proxies
/// - `E` → where blocking store work runs for `_async` calls
pub struct DirectoryService<D: Database, M: Messenger, E: Executor> {
    registry: Arc<PlayerRegistry>,
    store: Arc<OfflineStore<D>>,
    bus: CommandBus<M>,
    executor: E,
}

impl<D, M, E> DirectoryService<D, M, E>
where
    D: Database,
    M: Messenger,
    E: Executor,
{
    /// Creates a directory publishing on the default player API channel.
    pub fn new(database: D, messenger: M, executor: E) -> Self {
        Self::from_parts(
            OfflineStore::new(database),
            CommandBus::new(messenger),
            executor,
        )
    }

    /// Creates a directory publishing on `config.channel`.
    pub fn with_config(
        config: &DirectoryConfig,
        database: D,
        messenger: M,
        executor: E,
    ) -> Self {
        Self::from_parts(
            OfflineStore::new(database),
            CommandBus::with_channel(messenger, config.channel.as_str()),
            executor,
        )
    }

    pub fn from_parts(
        store: OfflineStore<D>,
        bus: CommandBus<M>,
        executor: E,
    ) -> Self {
        tracing::info!(
            database = store.database().name(),
            channel = bus.channel(),
            "player directory started"
        );
        Self {
            registry: Arc::new(PlayerRegistry::new()),
            store: Arc::new(store),
            bus,
            executor,
        }
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn store(&self) -> &OfflineStore<D> {
        &self.store
    }

    pub fn bus(&self) -> &CommandBus<M> {
        &self.bus
    }

    // =====================================================================
    // Counts
    // =====================================================================

    /// Players online on this node.
    pub fn online_count(&self) -> usize {
        self.registry.len()
    }

    pub fn online_count_async(&self) -> Pending<usize> {
        Pending::ready(self.online_count())
    }

    /// Players ever seen, cluster-wide.
    pub fn registered_count(&self) -> Result<usize, DirectoryError> {
        Ok(self.store.count_all()?)
    }

    pub fn registered_count_async(&self) -> Pending<usize> {
        let store = Arc::clone(&self.store);
        self.schedule(move || Ok(store.count_all()?))
    }

    // =====================================================================
    // Online queries (registry, never block)
    // =====================================================================

    pub fn get_online_player(
        &self,
        unique_id: &Uuid,
    ) -> Option<OnlinePlayerRecord> {
        self.registry.get(unique_id)
    }

    pub fn get_online_player_async(
        &self,
        unique_id: &Uuid,
    ) -> Pending<Option<OnlinePlayerRecord>> {
        Pending::ready(self.get_online_player(unique_id))
    }

    /// Online players named `name`, ignoring case.
    pub fn get_online_players_by_name(
        &self,
        name: &str,
    ) -> Vec<OnlinePlayerRecord> {
        self.registry.find_by_name(name)
    }

    pub fn get_online_players_by_name_async(
        &self,
        name: &str,
    ) -> Pending<Vec<OnlinePlayerRecord>> {
        Pending::ready(self.get_online_players_by_name(name))
    }

    /// Online players whose login or connected service runs
    /// `environment`.
    pub fn get_online_players_by_environment(
        &self,
        environment: ServiceEnvironmentType,
    ) -> Vec<OnlinePlayerRecord> {
        self.registry.find_by_environment(environment)
    }

    pub fn get_online_players_by_environment_async(
        &self,
        environment: ServiceEnvironmentType,
    ) -> Pending<Vec<OnlinePlayerRecord>> {
        Pending::ready(self.get_online_players_by_environment(environment))
    }

    pub fn get_online_players(&self) -> Vec<OnlinePlayerRecord> {
        self.registry.all()
    }

    pub fn get_online_players_async(&self) -> Pending<Vec<OnlinePlayerRecord>> {
        Pending::ready(self.get_online_players())
    }

    /// Calls `visitor` once per online player on the executor. The
    /// snapshot is taken when the scheduled work starts.
    pub fn request_online_players_async(
        &self,
        mut visitor: impl FnMut(OnlinePlayerRecord) + Send + 'static,
    ) -> Pending<()> {
        let registry = Arc::clone(&self.registry);
        self.schedule(move || {
            for record in registry.all() {
                visitor(record);
            }
            Ok(())
        })
    }

    /// Blocking form of [`request_online_players_async`]. Scheduling
    /// failures are returned, not logged away.
    ///
    /// [`request_online_players_async`]: Self::request_online_players_async
    pub fn request_online_players(
        &self,
        visitor: impl FnMut(OnlinePlayerRecord) + Send + 'static,
    ) -> Result<(), DirectoryError> {
        self.request_online_players_async(visitor).wait()
    }

    // =====================================================================
    // Offline queries (store, may block)
    // =====================================================================

    pub fn get_offline_player(
        &self,
        unique_id: &Uuid,
    ) -> Result<Option<OfflinePlayerRecord>, DirectoryError> {
        Ok(self.store.get(unique_id)?)
    }

    pub fn get_offline_player_async(
        &self,
        unique_id: &Uuid,
    ) -> Pending<Option<OfflinePlayerRecord>> {
        let store = Arc::clone(&self.store);
        let unique_id = *unique_id;
        self.schedule(move || Ok(store.get(&unique_id)?))
    }

    /// Stored players named `name`, ignoring case.
    pub fn get_offline_players_by_name(
        &self,
        name: &str,
    ) -> Result<Vec<OfflinePlayerRecord>, DirectoryError> {
        Ok(self.store.find_by_name(name)?)
    }

    pub fn get_offline_players_by_name_async(
        &self,
        name: &str,
    ) -> Pending<Vec<OfflinePlayerRecord>> {
        let store = Arc::clone(&self.store);
        let name = name.to_string();
        self.schedule(move || Ok(store.find_by_name(&name)?))
    }

    /// Every stored player. Undecodable documents are skipped.
    pub fn get_registered_players(
        &self,
    ) -> Result<Vec<OfflinePlayerRecord>, DirectoryError> {
        collect_registered(&self.store)
    }

    pub fn get_registered_players_async(
        &self,
    ) -> Pending<Vec<OfflinePlayerRecord>> {
        let store = Arc::clone(&self.store);
        self.schedule(move || collect_registered(&store))
    }

    /// A page of stored players in storage order.
    pub fn registered_players_in_range(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<OfflinePlayerRecord>, DirectoryError> {
        Ok(self.store.range_query(offset, limit)?)
    }

    /// Streams every stored player to `visitor` on the calling thread.
    /// Returns how many were visited.
    pub fn request_registered_players(
        &self,
        visitor: impl FnMut(OfflinePlayerRecord),
    ) -> Result<usize, DirectoryError> {
        Ok(self.store.iterate_all(visitor)?)
    }

    /// Not supported: always resolves to
    /// [`DirectoryError::Unimplemented`]. Use
    /// [`request_registered_players`](Self::request_registered_players)
    /// or [`get_registered_players_async`](Self::get_registered_players_async).
    pub fn request_registered_players_async(
        &self,
        _visitor: impl FnMut(OfflinePlayerRecord) + Send + 'static,
    ) -> Pending<()> {
        Pending::failed(DirectoryError::Unimplemented(
            "request_registered_players_async",
        ))
    }

    // =====================================================================
    // State updates
    // =====================================================================

    /// Persists the durable projection of `record` (keeping the stored
    /// logout time), refreshes the local
    /// registry entry if the player is online here, and publishes
    /// `update_online_cloud_player`.
    ///
    /// A player not online on this node is not added to the registry.
    pub fn update_online_player(
        &self,
        record: &OnlinePlayerRecord,
    ) -> Result<(), DirectoryError> {
        record.validate()?;
        self.store.upsert(&self.stored_projection(record)?)?;
        self.registry.replace_existing(record.clone());
        self.bus.publish(PlayerCommand::UpdateOnlinePlayer {
            cloud_player: record.clone(),
        })?;
        Ok(())
    }

    /// Persists `record` and publishes `update_offline_cloud_player`.
    pub fn update_offline_player(
        &self,
        record: &OfflinePlayerRecord,
    ) -> Result<(), DirectoryError> {
        record.validate()?;
        self.store.upsert(record)?;
        self.bus.publish(PlayerCommand::UpdateOfflinePlayer {
            offline_cloud_player: record.clone(),
        })?;
        Ok(())
    }

    // =====================================================================
    // Directives (publish only, no local state)
    // =====================================================================

    /// Asks the proxy holding `player` to move them to `service_name`.
    /// A blank service name can't be routed and is rejected.
    pub fn send_player_to_service(
        &self,
        player: &PlayerIdentity,
        service_name: &str,
    ) -> Result<(), DirectoryError> {
        player.validate()?;
        require_text("service name", service_name)?;
        self.bus.publish(PlayerCommand::SendPlayerToService {
            unique_id: player.unique_id(),
            service_name: service_name.to_string(),
        })?;
        Ok(())
    }

    pub fn send_message_to_player(
        &self,
        player: &PlayerIdentity,
        message: &str,
    ) -> Result<(), DirectoryError> {
        player.validate()?;
        self.bus.publish(PlayerCommand::SendMessage {
            unique_id: player.unique_id(),
            name: player.name().to_string(),
            message: message.to_string(),
        })?;
        Ok(())
    }

    pub fn kick_player(
        &self,
        player: &PlayerIdentity,
        reason: &str,
    ) -> Result<(), DirectoryError> {
        player.validate()?;
        self.bus.publish(PlayerCommand::KickPlayer {
            unique_id: player.unique_id(),
            name: player.name().to_string(),
            kick_message: reason.to_string(),
        })?;
        Ok(())
    }

    /// Shows `message` to every player, or only to those holding
    /// `permission`. Any text is accepted, empty included.
    pub fn broadcast_message(
        &self,
        message: &str,
        permission: Option<&str>,
    ) -> Result<(), DirectoryError> {
        self.bus.publish(PlayerCommand::BroadcastMessage {
            message: message.to_string(),
            permission: permission.map(str::to_string),
        })?;
        Ok(())
    }

    // =====================================================================
    // Connection lifecycle
    // =====================================================================

    /// Registers a player who just connected through `service`.
    ///
    /// Returning players keep their first-login time and properties; a
    /// changed name pushes the old one onto the name history. The store
    /// is written first, then the registry, then
    /// `update_online_cloud_player` is published.
    pub fn login_player(
        &self,
        identity: PlayerIdentity,
        service: ServiceRef,
    ) -> Result<OnlinePlayerRecord, DirectoryError> {
        identity.validate()?;
        service.validate()?;
        let now = now_millis();

        let offline = match self.store.get(&identity.unique_id())? {
            Some(mut known) => {
                if known.name() != identity.name() {
                    let old_name = known.name().to_string();
                    if !known.name_history.contains(&old_name) {
                        known.name_history.push(old_name);
                    }
                }
                known.identity = identity;
                known.last_login_time = now;
                known
            }
            None => OfflinePlayerRecord::first_seen(identity, now),
        };
        self.store.upsert(&offline)?;

        let online = OnlinePlayerRecord {
            identity: offline.identity.clone(),
            login_service: Some(service.clone()),
            connected_service: Some(service),
            first_login_time: offline.first_login_time,
            last_login_time: offline.last_login_time,
            name_history: offline.name_history,
            properties: offline.properties,
        };
        if self.registry.insert(online.clone()).is_some() {
            tracing::debug!(
                unique_id = %online.unique_id(),
                "login replaced an existing session"
            );
        }
        tracing::info!(
            unique_id = %online.unique_id(),
            name = online.name(),
            "player logged in"
        );

        self.bus.publish(PlayerCommand::UpdateOnlinePlayer {
            cloud_player: online.clone(),
        })?;
        Ok(online)
    }

    /// Removes a disconnected player from the registry, stamps the
    /// logout time on their stored record and publishes
    /// `update_offline_cloud_player`.
    ///
    /// `Ok(None)` if the player wasn't online here.
    pub fn logout_player(
        &self,
        unique_id: &Uuid,
    ) -> Result<Option<OfflinePlayerRecord>, DirectoryError> {
        let Some(online) = self.registry.remove(unique_id) else {
            return Ok(None);
        };
        let now = now_millis();

        let mut offline = self
            .store
            .get(unique_id)?
            .unwrap_or_else(|| OfflinePlayerRecord::from(&online));
        offline.identity = online.identity;
        offline.name_history = online.name_history;
        offline.properties = online.properties;
        offline.last_logout_time = Some(now);
        self.store.upsert(&offline)?;

        tracing::info!(
            %unique_id,
            name = offline.name(),
            "player logged out"
        );
        self.bus.publish(PlayerCommand::UpdateOfflinePlayer {
            offline_cloud_player: offline.clone(),
        })?;
        Ok(Some(offline))
    }

    /// Records that an online player moved to `service` and publishes
    /// `update_online_cloud_player`.
    ///
    /// `Ok(None)` if the player wasn't online here.
    pub fn switch_service(
        &self,
        unique_id: &Uuid,
        service: ServiceRef,
    ) -> Result<Option<OnlinePlayerRecord>, DirectoryError> {
        service.validate()?;
        let Some(updated) =
            self.registry.update_connected_service(unique_id, service)
        else {
            return Ok(None);
        };
        tracing::debug!(
            %unique_id,
            service = updated
                .connected_service
                .as_ref()
                .map(|s| s.service_name.as_str()),
            "player switched service"
        );
        self.bus.publish(PlayerCommand::UpdateOnlinePlayer {
            cloud_player: updated.clone(),
        })?;
        Ok(Some(updated))
    }

    // =====================================================================
    // Peer updates
    // =====================================================================

    /// Applies a state update received from a peer. Nothing is
    /// published.
    ///
    /// - `update_online_cloud_player` → store projection, then the
    ///   registry mirror entry is inserted or replaced
    /// - `update_offline_cloud_player` → store; the mirror entry is
    ///   dropped unless it logged in after the record's logout
    ///
    /// Returns `false` for directive topics, which carry no state.
    pub fn apply_remote(
        &self,
        command: PlayerCommand,
    ) -> Result<bool, DirectoryError> {
        match command {
            PlayerCommand::UpdateOnlinePlayer { cloud_player } => {
                cloud_player.validate()?;
                self.store.upsert(&self.stored_projection(&cloud_player)?)?;
                self.registry.insert(cloud_player);
                Ok(true)
            }
            PlayerCommand::UpdateOfflinePlayer {
                offline_cloud_player: record,
            } => {
                record.validate()?;
                self.store.upsert(&record)?;
                let unique_id = record.unique_id();
                let logged_out = self.registry.get(&unique_id).is_some_and(
                    |mirror| {
                        record
                            .last_logout_time
                            .is_some_and(|logout| logout >= mirror.last_login_time)
                    },
                );
                if logged_out {
                    self.registry.remove(&unique_id);
                }
                Ok(true)
            }
            other => {
                tracing::trace!(topic = other.topic(), "directive ignored");
                Ok(false)
            }
        }
    }

    /// The durable form of `record`, carrying over the logout time of
    /// the record already on file. An undecodable stored document is
    /// replaced.
    fn stored_projection(
        &self,
        record: &OnlinePlayerRecord,
    ) -> Result<OfflinePlayerRecord, DirectoryError> {
        let mut projected = OfflinePlayerRecord::from(record);
        projected.last_logout_time = match self.store.get(&record.unique_id()) {
            Ok(known) => known.and_then(|known| known.last_logout_time),
            Err(StoreError::Codec(e)) => {
                tracing::warn!(
                    unique_id = %record.unique_id(),
                    error = %e,
                    "overwriting undecodable player document"
                );
                None
            }
            Err(e) => return Err(e.into()),
        };
        Ok(projected)
    }

    fn schedule<T, F>(&self, work: F) -> Pending<T>
    where
        F: FnOnce() -> Result<T, DirectoryError> + Send + 'static,
        T: Send + 'static,
    {
        Pending::new(self.executor.schedule(work))
    }
}

impl<D, M, E> std::fmt::Debug for DirectoryService<D, M, E>
where
    D: Database,
    M: Messenger,
    E: Executor,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryService")
            .field("database", &self.store.database().name())
            .field("channel", &self.bus.channel())
            .field("online", &self.registry.len())
            .finish()
    }
}

fn collect_registered<D: Database>(
    store: &OfflineStore<D>,
) -> Result<Vec<OfflinePlayerRecord>, DirectoryError> {
    let mut players = Vec::new();
    store.iterate_all(|record| players.push(record))?;
    Ok(players)
}

fn require_text(what: &str, value: &str) -> Result<(), DirectoryError> {
    if value.trim().is_empty() {
        return Err(DirectoryError::InvalidArgument(format!(
            "{what} must not be empty"
        )));
    }
    Ok(())
}

/// Wall-clock unix millis. A clock before 1970 reads as zero.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
