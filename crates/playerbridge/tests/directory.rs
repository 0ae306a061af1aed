//! Integration tests for the directory's queries, updates and directives.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use playerbridge::prelude::*;
use playerbridge::{BusError, ChannelMessage, Codec, JsonCodec, topics};

// =========================================================================
// Recording messenger
// =========================================================================

/// Keeps every frame the directory publishes so tests can inspect it.
#[derive(Default)]
struct RecordingMessenger {
    frames: Mutex<Vec<(String, Vec<u8>)>>,
    saturated: Mutex<bool>,
}

impl RecordingMessenger {
    fn messages(&self) -> Vec<ChannelMessage> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .map(|(_, data)| JsonCodec.decode(data).unwrap())
            .collect()
    }

    fn saturate(&self) {
        *self.saturated.lock().unwrap() = true;
    }
}

impl Messenger for RecordingMessenger {
    fn send_channel_message(
        &self,
        channel: &str,
        data: Vec<u8>,
    ) -> Result<(), BusError> {
        if *self.saturated.lock().unwrap() {
            return Err(BusError::Saturated(channel.to_string()));
        }
        self.frames
            .lock()
            .unwrap()
            .push((channel.to_string(), data));
        Ok(())
    }
}

type TestDirectory =
    DirectoryService<MemoryDatabase, Arc<RecordingMessenger>, InlineExecutor>;

fn directory() -> (TestDirectory, Arc<RecordingMessenger>) {
    let messenger = Arc::new(RecordingMessenger::default());
    let directory = DirectoryService::new(
        MemoryDatabase::new("cloudnet_cloud_players"),
        Arc::clone(&messenger),
        InlineExecutor,
    );
    (directory, messenger)
}

fn identity(name: &str) -> PlayerIdentity {
    PlayerIdentity::new(Uuid::new_v4(), name)
}

fn online(
    name: &str,
    login: Option<ServiceEnvironmentType>,
    connected: Option<ServiceEnvironmentType>,
) -> OnlinePlayerRecord {
    OnlinePlayerRecord {
        identity: identity(name),
        login_service: login.map(|env| ServiceRef::new(env, "Proxy-1")),
        connected_service: connected.map(|env| ServiceRef::new(env, "Lobby-1")),
        first_login_time: 1_000,
        last_login_time: 5_000,
        name_history: Vec::new(),
        properties: Default::default(),
    }
}

// =========================================================================
// Online queries
// =========================================================================

#[test]
fn test_get_online_players_by_name_ignores_case() {
    let (directory, _) = directory();
    for name in ["Steve", "STEVE", "Alex"] {
        directory.registry().insert(online(name, None, None));
    }

    let found = directory.get_online_players_by_name("steve");

    assert_eq!(found.len(), 2);
    assert_eq!(directory.online_count(), 3);
}

#[test]
fn test_get_online_players_by_environment_matches_login_or_connected() {
    use ServiceEnvironmentType::{MinecraftServer, Velocity};
    let (directory, _) = directory();
    let login_only = online("LoginOnly", Some(Velocity), None);
    let connected_only = online("ConnectedOnly", None, Some(Velocity));
    let neither = online("Neither", Some(MinecraftServer), Some(MinecraftServer));
    for record in [&login_only, &connected_only, &neither] {
        directory.registry().insert(record.clone());
    }

    let mut names: Vec<_> = directory
        .get_online_players_by_environment(Velocity)
        .into_iter()
        .map(|r| r.name().to_string())
        .collect();
    names.sort();

    assert_eq!(names, vec!["ConnectedOnly", "LoginOnly"]);
}

#[test]
fn test_get_online_player_unknown_is_none() {
    let (directory, _) = directory();

    assert!(directory.get_online_player(&Uuid::new_v4()).is_none());
    assert!(
        directory
            .get_online_player_async(&Uuid::new_v4())
            .wait()
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_request_online_players_visits_every_player() {
    let (directory, _) = directory();
    directory.registry().insert(online("Steve", None, None));
    directory.registry().insert(online("Alex", None, None));
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);

    directory
        .request_online_players(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

// =========================================================================
// Offline queries
// =========================================================================

#[test]
fn test_update_offline_player_then_get_returns_equal_record() {
    let (directory, _) = directory();
    let record = OfflinePlayerRecord::first_seen(identity("Steve"), 1_000);

    directory.update_offline_player(&record).unwrap();

    assert_eq!(
        directory.get_offline_player(&record.unique_id()).unwrap(),
        Some(record.clone())
    );
    assert_eq!(
        directory.get_offline_player_async(&record.unique_id()).wait().unwrap(),
        Some(record)
    );
}

#[test]
fn test_update_offline_player_twice_keeps_registered_count() {
    let (directory, _) = directory();
    let record = OfflinePlayerRecord::first_seen(identity("Steve"), 1_000);

    directory.update_offline_player(&record).unwrap();
    directory.update_offline_player(&record).unwrap();

    assert_eq!(directory.registered_count().unwrap(), 1);
    assert_eq!(directory.registered_count_async().wait().unwrap(), 1);
}

#[test]
fn test_get_offline_players_by_name_ignores_case() {
    let (directory, _) = directory();
    for name in ["Notch", "notch", "jeb_"] {
        directory
            .update_offline_player(&OfflinePlayerRecord::first_seen(identity(name), 1))
            .unwrap();
    }

    assert_eq!(directory.get_offline_players_by_name("NOTCH").unwrap().len(), 2);
    assert_eq!(
        directory
            .get_offline_players_by_name_async("Jeb_")
            .wait()
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_registered_players_in_range_pages_in_storage_order() {
    let (directory, _) = directory();
    let records: Vec<_> = (0..5)
        .map(|i| OfflinePlayerRecord::first_seen(identity(&format!("p{i}")), i))
        .collect();
    for record in &records {
        directory.update_offline_player(record).unwrap();
    }

    let page = directory.registered_players_in_range(1, 2).unwrap();

    assert_eq!(page, records[1..3].to_vec());
    assert_eq!(directory.get_registered_players().unwrap(), records);
    assert_eq!(directory.request_registered_players(|_| {}).unwrap(), 5);
}

#[test]
fn test_request_registered_players_async_is_unimplemented() {
    let (directory, _) = directory();

    let result = directory.request_registered_players_async(|_| {}).wait();

    assert!(matches!(result, Err(DirectoryError::Unimplemented(_))));
}

// =========================================================================
// update_online_player()
// =========================================================================

#[test]
fn test_update_online_player_stores_projection_and_publishes_once() {
    let (directory, messenger) = directory();
    let record = online("Steve", Some(ServiceEnvironmentType::Bungeecord), None);

    directory.update_online_player(&record).unwrap();

    let stored = directory.get_offline_player(&record.unique_id()).unwrap();
    assert_eq!(stored, Some(OfflinePlayerRecord::from(&record)));

    let messages = messenger.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].channel, "bridge_player_api_channel");
    assert_eq!(messages[0].topic(), topics::UPDATE_ONLINE_CLOUD_PLAYER);
    assert_eq!(
        messages[0].command,
        PlayerCommand::UpdateOnlinePlayer {
            cloud_player: record
        }
    );
}

#[test]
fn test_update_online_player_refreshes_only_existing_entry() {
    let (directory, _) = directory();
    let mut here = online("Here", None, None);
    let elsewhere = online("Elsewhere", None, None);
    directory.registry().insert(here.clone());

    here.name_history.push("WasHere".into());
    directory.update_online_player(&here).unwrap();
    directory.update_online_player(&elsewhere).unwrap();

    assert_eq!(directory.get_online_player(&here.unique_id()), Some(here));
    assert!(!directory.registry().contains(&elsewhere.unique_id()));
}

#[test]
fn test_update_online_player_nil_id_touches_nothing() {
    let (directory, messenger) = directory();
    let mut record = online("Steve", None, None);
    record.identity = PlayerIdentity::new(Uuid::nil(), "Steve");

    let result = directory.update_online_player(&record);

    assert!(matches!(result, Err(DirectoryError::InvalidArgument(_))));
    assert_eq!(directory.registered_count().unwrap(), 0);
    assert!(messenger.messages().is_empty());
}

#[test]
fn test_update_offline_player_saturated_bus_reports_error() {
    let (directory, messenger) = directory();
    messenger.saturate();
    let record = OfflinePlayerRecord::first_seen(identity("Steve"), 1);

    let result = directory.update_offline_player(&record);

    assert!(matches!(
        result,
        Err(DirectoryError::Bus(BusError::Saturated(_)))
    ));
}

// =========================================================================
// Directives
// =========================================================================

#[test]
fn test_directives_publish_once_and_change_nothing() {
    let (directory, messenger) = directory();
    let steve = identity("Steve");
    let proxy = ServiceRef::new(ServiceEnvironmentType::Velocity, "Proxy-1");
    directory.login_player(steve.clone(), proxy).unwrap();
    let online_before = directory.get_online_player(&steve.unique_id());
    let offline_before = directory.get_offline_player(&steve.unique_id()).unwrap();

    directory.send_player_to_service(&steve, "Lobby-2").unwrap();
    directory.send_message_to_player(&steve, "hello").unwrap();
    directory.kick_player(&steve, "afk").unwrap();
    directory.broadcast_message("restart", Some("server.notify")).unwrap();
    directory.broadcast_message("hi all", None).unwrap();

    assert!(online_before.is_some());
    assert_eq!(directory.get_online_player(&steve.unique_id()), online_before);
    assert_eq!(
        directory.get_offline_player(&steve.unique_id()).unwrap(),
        offline_before
    );
    assert_eq!(directory.online_count(), 1);
    assert_eq!(directory.registered_count().unwrap(), 1);
    let commands: Vec<_> = messenger
        .messages()
        .into_iter()
        .skip(1)
        .map(|m| m.command)
        .collect();
    assert_eq!(
        commands,
        vec![
            PlayerCommand::SendPlayerToService {
                unique_id: steve.unique_id(),
                service_name: "Lobby-2".into(),
            },
            PlayerCommand::SendMessage {
                unique_id: steve.unique_id(),
                name: "Steve".into(),
                message: "hello".into(),
            },
            PlayerCommand::KickPlayer {
                unique_id: steve.unique_id(),
                name: "Steve".into(),
                kick_message: "afk".into(),
            },
            PlayerCommand::BroadcastMessage {
                message: "restart".into(),
                permission: Some("server.notify".into()),
            },
            PlayerCommand::BroadcastMessage {
                message: "hi all".into(),
                permission: None,
            },
        ]
    );
}

#[test]
fn test_broadcast_without_permission_omits_field_on_wire() {
    let (directory, messenger) = directory();

    directory.broadcast_message("hi all", None).unwrap();

    let frames = messenger.frames.lock().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&frames[0].1).unwrap();
    assert_eq!(json["command"]["topic"], "broadcast_message");
    assert!(json["command"]["payload"].get("permission").is_none());
}

#[test]
fn test_directives_reject_invalid_arguments_without_publishing() {
    let (directory, messenger) = directory();
    let steve = identity("Steve");
    let nobody = PlayerIdentity::new(Uuid::nil(), "Nobody");
    let nameless = PlayerIdentity::new(Uuid::new_v4(), "");

    let results = [
        directory.send_player_to_service(&steve, ""),
        directory.send_player_to_service(&steve, "  "),
        directory.send_player_to_service(&nobody, "Lobby-1"),
        directory.send_message_to_player(&nameless, "hi"),
        directory.kick_player(&nobody, "afk"),
    ];

    for result in results {
        assert!(matches!(result, Err(DirectoryError::InvalidArgument(_))));
    }
    assert!(messenger.messages().is_empty());
}

#[test]
fn test_directives_accept_empty_text() {
    let (directory, messenger) = directory();
    let steve = identity("Steve");

    directory.send_message_to_player(&steve, "").unwrap();
    directory.kick_player(&steve, "").unwrap();
    directory.broadcast_message(" ", None).unwrap();
    directory.broadcast_message("hi", Some("")).unwrap();

    let commands: Vec<_> = messenger
        .messages()
        .into_iter()
        .map(|m| m.command)
        .collect();
    assert_eq!(commands.len(), 4);
    assert_eq!(
        commands[1],
        PlayerCommand::KickPlayer {
            unique_id: steve.unique_id(),
            name: "Steve".into(),
            kick_message: String::new(),
        }
    );
    assert_eq!(
        commands[3],
        PlayerCommand::BroadcastMessage {
            message: "hi".into(),
            permission: Some(String::new()),
        }
    );
}
