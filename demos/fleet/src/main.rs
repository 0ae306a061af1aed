//! Two directory nodes sharing one in-process messenger.
//!
//! The proxy node owns player connections: it logs players in and out
//! and carries out directives (kick, send) aimed at them. The lobby node
//! owns none; it mirrors the proxy's state updates and issues
//! directives.
//!
//! ```text
//! cargo run -p fleet [-- playerbridge.toml]
//! ```

use std::sync::Arc;
use std::time::Duration;

use playerbridge::prelude::*;
use playerbridge::Subscription;

type Node = DirectoryService<MemoryDatabase, Arc<LocalMessenger>, TokioExecutor>;

// ---------------------------------------------------------------------------
// Subscription loops
// ---------------------------------------------------------------------------

/// Applies every state update seen on the channel to `node`.
async fn mirror_loop(mut sub: Subscription, node: Arc<Node>) {
    while let Some(data) = sub.recv().await {
        let message = match node.bus().decode(&data) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "undecodable frame skipped");
                continue;
            }
        };
        if message.channel != node.bus().channel() {
            continue;
        }
        let topic = message.topic();
        if let Err(e) = node.apply_remote(message.command) {
            tracing::warn!(topic, error = %e, "peer update rejected");
        }
    }
}

/// Carries out directives for players connected through `node`.
async fn proxy_loop(mut sub: Subscription, node: Arc<Node>) {
    while let Some(data) = sub.recv().await {
        let Ok(message) = node.bus().decode(&data) else {
            continue;
        };
        if let Err(e) = handle_directive(&node, message.command) {
            tracing::warn!(error = %e, "directive failed");
        }
    }
}

fn handle_directive(
    node: &Node,
    command: PlayerCommand,
) -> Result<(), DirectoryError> {
    match command {
        PlayerCommand::KickPlayer {
            unique_id,
            name,
            kick_message,
        } if node.registry().contains(&unique_id) => {
            tracing::info!(%unique_id, %name, reason = %kick_message, "kicking player");
            node.logout_player(&unique_id)?;
        }
        PlayerCommand::SendPlayerToService {
            unique_id,
            service_name,
        } if node.registry().contains(&unique_id) => {
            let target = ServiceRef::new(
                ServiceEnvironmentType::MinecraftServer,
                service_name,
            );
            node.switch_service(&unique_id, target)?;
        }
        PlayerCommand::SendMessage { name, message, .. } => {
            tracing::info!(%name, %message, "chat message delivered");
        }
        PlayerCommand::BroadcastMessage {
            message,
            permission,
        } => {
            tracing::info!(%message, ?permission, "broadcast delivered");
        }
        _ => {}
    }
    Ok(())
}

/// Polls `check` until it holds or about a second has passed.
async fn settle(what: &str, check: impl Fn() -> bool) {
    for _ in 0..50 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tracing::warn!(what, "fleet did not settle");
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

fn load_config() -> Result<DirectoryConfig, playerbridge::ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => DirectoryConfig::load(path),
        None => {
            let mut config = DirectoryConfig::default();
            config.apply_env_overrides()?;
            config.validate()?;
            Ok(config)
        }
    }
}

fn start_node(
    config: &DirectoryConfig,
    messenger: &Arc<LocalMessenger>,
) -> Result<Arc<Node>, DirectoryError> {
    Ok(Arc::new(DirectoryService::with_config(
        config,
        MemoryDatabase::new(config.database_name.as_str()),
        Arc::clone(messenger),
        TokioExecutor::current()?,
    )))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    init_logging(&config.logging)?;

    let messenger = Arc::new(LocalMessenger::new(config.messenger_capacity));
    let proxy_node = start_node(&config, &messenger)?;
    let lobby_node = start_node(&config, &messenger)?;

    let mirror = tokio::spawn(mirror_loop(
        messenger.subscribe(&config.channel),
        Arc::clone(&lobby_node),
    ));
    let proxy = tokio::spawn(proxy_loop(
        messenger.subscribe(&config.channel),
        Arc::clone(&proxy_node),
    ));

    // Players connect through the proxy node.
    let velocity = ServiceRef::new(ServiceEnvironmentType::Velocity, "Proxy-1");
    let steve = PlayerIdentity::new(Uuid::new_v4(), "Steve");
    let alex = PlayerIdentity::new(Uuid::new_v4(), "Alex");
    let notch = PlayerIdentity::new(Uuid::new_v4(), "Notch");
    let players = [&steve, &alex, &notch];
    for player in players {
        proxy_node.login_player(player.clone(), velocity.clone())?;
    }

    settle("mirror logins", || lobby_node.online_count() == players.len()).await;
    tracing::info!(
        online = lobby_node.online_count(),
        on_velocity = lobby_node
            .get_online_players_by_environment(ServiceEnvironmentType::Velocity)
            .len(),
        "lobby node sees the proxy's players"
    );

    // The lobby node issues directives; the proxy node carries them out.
    lobby_node.send_player_to_service(&alex, "Lobby-2")?;
    lobby_node.send_message_to_player(&steve, "Welcome back!")?;
    lobby_node.broadcast_message("Event starts in 5 minutes", Some("event.notify"))?;
    lobby_node.kick_player(&notch, "Maintenance")?;

    settle("kick", || lobby_node.online_count() == players.len() - 1).await;

    let notch_record = lobby_node.get_offline_player_async(&notch.unique_id()).await?;
    let registered = lobby_node.registered_count_async().await?;
    tracing::info!(
        online = lobby_node.online_count(),
        registered,
        notch_logged_out = notch_record.and_then(|r| r.last_logout_time).is_some(),
        alex_on = ?lobby_node
            .get_online_player(&alex.unique_id())
            .and_then(|r| r.connected_service)
            .map(|s| s.service_name),
        "fleet converged"
    );

    messenger.close();
    mirror.await?;
    proxy.await?;
    Ok(())
}
