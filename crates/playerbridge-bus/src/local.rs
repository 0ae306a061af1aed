//! In-process [`Messenger`] with bounded per-subscriber queues.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::{BusError, Messenger};

/// Default queue capacity per subscriber.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Fans every message on a channel out to all of its current subscribers.
///
/// Each subscriber gets its own bounded queue. Sending never waits: if a
/// subscriber's queue is full the message is still offered to the
/// others, and the send reports [`BusError::Saturated`]. Subscribers that
/// were dropped are pruned on the next send.
#[derive(Debug)]
pub struct LocalMessenger {
    capacity: usize,
    channels: DashMap<String, Vec<mpsc::Sender<Vec<u8>>>>,
    closed: AtomicBool,
}

impl LocalMessenger {
    /// Creates a messenger whose subscriber queues hold `capacity`
    /// messages each. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Starts receiving every message sent on `channel` from now on.
    pub fn subscribe(&self, channel: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        // The flag is read while holding the entry's shard lock: either
        // `close` clears this sender afterwards, or the flag is already
        // set here.
        let mut senders = self.channels.entry(channel.to_string()).or_default();
        if self.closed.load(Ordering::Acquire) {
            drop(senders);
            self.channels.remove_if(channel, |_, senders| senders.is_empty());
            // Without a sender the subscription reports end of stream
            // right away.
            drop(tx);
        } else {
            senders.push(tx);
            drop(senders);
            tracing::debug!(channel, "subscribed");
        }
        Subscription {
            channel: channel.to_string(),
            receiver: rx,
        }
    }

    /// Live subscribers on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    /// Stops accepting messages and ends every subscription.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.channels.clear();
        tracing::info!("local messenger closed");
    }
}

impl Default for LocalMessenger {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Messenger for LocalMessenger {
    fn send_channel_message(
        &self,
        channel: &str,
        data: Vec<u8>,
    ) -> Result<(), BusError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BusError::Closed(channel.to_string()));
        }

        let mut saturated = false;
        let now_empty = match self.channels.get_mut(channel) {
            Some(mut senders) => {
                senders.retain(|tx| match tx.try_send(data.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        saturated = true;
                        true
                    }
                    Err(TrySendError::Closed(_)) => false,
                });
                senders.is_empty()
            }
            // Nobody listening is not an error for fire-and-forget.
            None => false,
        };
        if now_empty {
            self.channels.remove_if(channel, |_, senders| senders.is_empty());
        }

        if saturated {
            tracing::warn!(channel, "subscriber queue full, message dropped");
            return Err(BusError::Saturated(channel.to_string()));
        }
        Ok(())
    }
}

/// The receiving end of [`LocalMessenger::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    channel: String,
    receiver: mpsc::Receiver<Vec<u8>>,
}

impl Subscription {
    /// The channel this subscription listens on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Waits for the next message. `None` once the messenger is closed.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.receiver.recv().await
    }

    /// Takes the next queued message without waiting.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.receiver.try_recv().ok()
    }
}
