//! Integration tests for the command bus over the in-process messenger.
//!
//! A bus publishes on one side and a subscription reads on the other,
//! the same path two nodes in one process use to converge.

use std::sync::Arc;
use std::time::Duration;

use playerbridge_bus::{BusError, CommandBus, LocalMessenger};
use playerbridge_protocol::{PLAYER_API_CHANNEL, PlayerCommand, topics};
use uuid::Uuid;

fn broadcast(message: &str) -> PlayerCommand {
    PlayerCommand::BroadcastMessage {
        message: message.into(),
        permission: None,
    }
}

#[tokio::test]
async fn test_published_command_reaches_subscriber() {
    let messenger = Arc::new(LocalMessenger::new(8));
    let mut sub = messenger.subscribe(PLAYER_API_CHANNEL);
    let bus = CommandBus::new(Arc::clone(&messenger));

    bus.publish(broadcast("restart in 5 minutes")).unwrap();

    let data = tokio::time::timeout(Duration::from_secs(1), sub.recv())
        .await
        .expect("message should arrive")
        .expect("subscription should be open");
    let message = bus.decode(&data).unwrap();
    assert_eq!(message.topic(), topics::BROADCAST_MESSAGE);
    assert_eq!(message.command, broadcast("restart in 5 minutes"));
}

#[tokio::test]
async fn test_two_buses_share_one_messenger() {
    let messenger = Arc::new(LocalMessenger::new(8));
    let mut sub = messenger.subscribe(PLAYER_API_CHANNEL);
    let node_a = CommandBus::new(Arc::clone(&messenger));
    let node_b = CommandBus::new(Arc::clone(&messenger));
    let id = Uuid::new_v4();

    node_a.publish(broadcast("from a")).unwrap();
    node_b
        .publish(PlayerCommand::SendPlayerToService {
            unique_id: id,
            service_name: "Lobby-1".into(),
        })
        .unwrap();

    let first = node_a.decode(&sub.recv().await.unwrap()).unwrap();
    let second = node_a.decode(&sub.recv().await.unwrap()).unwrap();
    assert_eq!(first.topic(), topics::BROADCAST_MESSAGE);
    assert_eq!(second.topic(), topics::SEND_ON_PROXY_PLAYER_TO_SERVER);
}

#[tokio::test]
async fn test_subscriptions_racing_close_all_end() {
    let messenger = LocalMessenger::new(8);

    let subscriptions: Vec<_> = std::thread::scope(|scope| {
        let subscribers: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    (0..100)
                        .map(|_| messenger.subscribe(PLAYER_API_CHANNEL))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        messenger.close();
        subscribers
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(messenger.subscriber_count(PLAYER_API_CHANNEL), 0);
    for mut sub in subscriptions {
        let next = tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("subscription should end, not hang");
        assert!(next.is_none());
    }
}

#[tokio::test]
async fn test_subscription_ends_when_messenger_closes() {
    let messenger = Arc::new(LocalMessenger::new(8));
    let mut sub = messenger.subscribe(PLAYER_API_CHANNEL);
    let bus = CommandBus::new(Arc::clone(&messenger));

    messenger.close();

    assert_eq!(sub.recv().await, None);
    assert!(matches!(
        bus.publish(broadcast("too late")),
        Err(BusError::Closed(_))
    ));
}

#[test]
fn test_slow_subscriber_saturates_publish() {
    let messenger = Arc::new(LocalMessenger::new(2));
    let _sub = messenger.subscribe(PLAYER_API_CHANNEL);
    let bus = CommandBus::new(Arc::clone(&messenger));

    bus.publish(broadcast("one")).unwrap();
    bus.publish(broadcast("two")).unwrap();

    assert!(matches!(
        bus.publish(broadcast("three")),
        Err(BusError::Saturated(channel)) if channel == PLAYER_API_CHANNEL
    ));
}
