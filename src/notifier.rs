//! Cross-context change signalling.
//!
//! `SyncChannel` is a shared key-value store that publishes a `StorageEvent`
//! for every effective write or removal, mirroring browser storage events:
//! subscribers never see events that originated from their own context, and
//! a context rewriting the value it already stored publishes nothing. The same
//! value written by a different context is a new event.
//!
//! `Notifier` sits on top and implements the change-signal protocol: write a
//! `ChangeNotification` under a well-known key, then clear it after a short
//! delay. Readers react to the write and ignore the removal.

use crate::models::{ChangeKind, ChangeNotification};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, error, warn};

pub const DEFAULT_SYNC_KEY: &str = "bsit_data_updated";
pub const DEFAULT_CLEAR_AFTER: Duration = Duration::from_millis(100);

/// Retained events per subscriber. A subscriber that falls further behind
/// skips ahead to the retained tail, so the latest write is still delivered.
const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    /// `None` when the key was removed.
    pub new_value: Option<String>,
    pub origin: ContextId,
}

#[derive(Clone)]
pub struct SyncChannel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    store: Mutex<HashMap<String, StoredValue>>,
    events: broadcast::Sender<StorageEvent>,
    next_context: AtomicU64,
}

impl Default for SyncChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncChannel {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(ChannelInner {
                store: Mutex::new(HashMap::new()),
                events,
                next_context: AtomicU64::new(1),
            }),
        }
    }

    /// Registers a new participant (a page, tab or window).
    pub fn open_context(&self) -> ContextId {
        ContextId(self.inner.next_context.fetch_add(1, Ordering::Relaxed))
    }

    pub fn subscribe(&self, context: ContextId) -> StorageSubscription {
        StorageSubscription {
            context,
            events: self.inner.events.subscribe(),
        }
    }

    pub async fn get_item(&self, key: &str) -> Option<String> {
        self.inner
            .store
            .lock()
            .await
            .get(key)
            .map(|stored| stored.value.clone())
    }

    /// Stores `value` and notifies every other context, unless `origin`
    /// itself already stored exactly this value under the key.
    pub async fn set_item(&self, origin: ContextId, key: &str, value: String) {
        let mut store = self.inner.store.lock().await;
        if store
            .get(key)
            .is_some_and(|stored| stored.origin == origin && stored.value == value)
        {
            return;
        }
        store.insert(
            key.to_string(),
            StoredValue {
                value: value.clone(),
                origin,
            },
        );
        self.publish(StorageEvent {
            key: key.to_string(),
            new_value: Some(value),
            origin,
        });
    }

    pub async fn remove_item(&self, origin: ContextId, key: &str) -> bool {
        let mut store = self.inner.store.lock().await;
        if store.remove(key).is_none() {
            return false;
        }
        self.publish(StorageEvent {
            key: key.to_string(),
            new_value: None,
            origin,
        });
        true
    }

    /// Removes the key only while it still holds `expected` as written by
    /// `origin`.
    pub async fn remove_item_if(&self, origin: ContextId, key: &str, expected: &str) -> bool {
        let mut store = self.inner.store.lock().await;
        let still_ours = store
            .get(key)
            .is_some_and(|stored| stored.origin == origin && stored.value == expected);
        if !still_ours {
            return false;
        }
        store.remove(key);
        self.publish(StorageEvent {
            key: key.to_string(),
            new_value: None,
            origin,
        });
        true
    }

    fn publish(&self, event: StorageEvent) {
        // No subscribers is not an error: nobody else is open.
        let _ = self.inner.events.send(event);
    }
}

struct StoredValue {
    value: String,
    origin: ContextId,
}

pub struct StorageSubscription {
    context: ContextId,
    events: broadcast::Receiver<StorageEvent>,
}

impl StorageSubscription {
    /// Waits for the next event from another context. Returns `None` once the
    /// channel is gone.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) if event.origin == self.context => continue,
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "storage subscriber lagged, resuming at latest");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.events.try_recv() {
                Ok(event) if event.origin == self.context => continue,
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "storage subscriber lagged, resuming at latest");
                }
                Err(_) => return None,
            }
        }
    }
}

/// Writes change signals on behalf of one context.
#[derive(Clone)]
pub struct Notifier {
    channel: SyncChannel,
    context: ContextId,
    key: String,
    clear_after: Duration,
}

impl Notifier {
    pub fn new(channel: &SyncChannel, key: impl Into<String>, clear_after: Duration) -> Self {
        Self {
            channel: channel.clone(),
            context: channel.open_context(),
            key: key.into(),
            clear_after,
        }
    }

    pub fn listener(&self) -> SyncListener {
        SyncListener {
            key: self.key.clone(),
            subscription: self.channel.subscribe(self.context),
        }
    }

    /// Publishes a change signal and schedules its removal. Must be called
    /// from within a tokio runtime.
    pub async fn broadcast(&self, kind: ChangeKind) -> Option<ChangeNotification> {
        let notification = ChangeNotification::now(kind);
        let value = match serde_json::to_string(&notification) {
            Ok(value) => value,
            Err(err) => {
                error!("failed to encode change notification: {err}");
                return None;
            }
        };

        self.channel
            .set_item(self.context, &self.key, value.clone())
            .await;
        debug!(?kind, timestamp = notification.timestamp, "change signal sent");

        let channel = self.channel.clone();
        let context = self.context;
        let key = self.key.clone();
        let clear_after = self.clear_after;
        tokio::spawn(async move {
            tokio::time::sleep(clear_after).await;
            channel.remove_item_if(context, &key, &value).await;
        });

        Some(notification)
    }
}

/// Receives change signals written by other contexts.
pub struct SyncListener {
    key: String,
    subscription: StorageSubscription,
}

impl SyncListener {
    pub async fn recv(&mut self) -> Option<ChangeNotification> {
        loop {
            let event = self.subscription.recv().await?;
            if let Some(notification) = self.decode(event) {
                return Some(notification);
            }
        }
    }

    /// Non-blocking variant: the next pending signal, if any.
    pub fn try_recv(&mut self) -> Option<ChangeNotification> {
        loop {
            let event = self.subscription.try_recv()?;
            if let Some(notification) = self.decode(event) {
                return Some(notification);
            }
        }
    }

    fn decode(&self, event: StorageEvent) -> Option<ChangeNotification> {
        if event.key != self.key {
            return None;
        }
        let value = event.new_value?;
        match serde_json::from_str(&value) {
            Ok(notification) => Some(notification),
            Err(err) => {
                warn!("ignoring malformed change signal: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier(channel: &SyncChannel, clear_after: Duration) -> Notifier {
        Notifier::new(channel, DEFAULT_SYNC_KEY, clear_after)
    }

    #[tokio::test]
    async fn writer_does_not_hear_itself() {
        let channel = SyncChannel::new();
        let writer = notifier(&channel, DEFAULT_CLEAR_AFTER);
        let reader = notifier(&channel, DEFAULT_CLEAR_AFTER);
        let mut own = writer.listener();
        let mut other = reader.listener();

        let sent = writer.broadcast(ChangeKind::Student).await.unwrap();

        assert_eq!(other.recv().await, Some(sent));
        assert_eq!(own.try_recv(), None);
    }

    #[tokio::test]
    async fn every_reader_sees_the_last_write() {
        let channel = SyncChannel::with_capacity(2);
        let writer = notifier(&channel, Duration::from_secs(5));
        let mut readers: Vec<_> = (0..3)
            .map(|_| notifier(&channel, DEFAULT_CLEAR_AFTER).listener())
            .collect();

        let mut last = None;
        for kind in [
            ChangeKind::Student,
            ChangeKind::Attendance,
            ChangeKind::Student,
            ChangeKind::Attendance,
            ChangeKind::Attendance,
        ] {
            last = writer.broadcast(kind).await;
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        for reader in &mut readers {
            let mut observed = None;
            while let Some(notification) = reader.try_recv() {
                observed = Some(notification);
            }
            assert_eq!(observed, last);
        }
    }

    #[tokio::test]
    async fn signal_is_cleared_after_delay() {
        let channel = SyncChannel::new();
        let writer = notifier(&channel, Duration::from_millis(10));
        let mut reader = notifier(&channel, DEFAULT_CLEAR_AFTER).listener();

        writer.broadcast(ChangeKind::Attendance).await;
        assert!(channel.get_item(DEFAULT_SYNC_KEY).await.is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(channel.get_item(DEFAULT_SYNC_KEY).await.is_none());

        // one signal, the removal is not reported
        assert!(reader.try_recv().is_some());
        assert!(reader.try_recv().is_none());
    }

    #[tokio::test]
    async fn identical_value_publishes_nothing() {
        let channel = SyncChannel::new();
        let a = channel.open_context();
        let b = channel.open_context();
        let mut sub = channel.subscribe(b);

        channel.set_item(a, "k", "v".to_string()).await;
        channel.set_item(a, "k", "v".to_string()).await;

        assert!(sub.try_recv().is_some());
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn same_value_from_another_context_is_published() {
        let channel = SyncChannel::new();
        let a = channel.open_context();
        let b = channel.open_context();
        let mut reader = notifier(&channel, DEFAULT_CLEAR_AFTER).listener();
        let same = r#"{"type":"attendance","timestamp":1700000000000}"#;

        channel.set_item(a, DEFAULT_SYNC_KEY, same.to_string()).await;
        channel.set_item(b, DEFAULT_SYNC_KEY, same.to_string()).await;

        assert!(reader.try_recv().is_some());
        assert!(reader.try_recv().is_some());
        assert!(reader.try_recv().is_none());

        // a's delayed clear must not erase b's write
        assert!(!channel.remove_item_if(a, DEFAULT_SYNC_KEY, same).await);
        assert!(channel.remove_item_if(b, DEFAULT_SYNC_KEY, same).await);
    }

    #[tokio::test]
    async fn stale_removal_keeps_newer_value() {
        let channel = SyncChannel::new();
        let a = channel.open_context();
        channel.set_item(a, "k", "new".to_string()).await;

        assert!(!channel.remove_item_if(a, "k", "old").await);
        assert_eq!(channel.get_item("k").await.as_deref(), Some("new"));
        assert!(channel.remove_item(a, "k").await);
        assert!(!channel.remove_item(a, "k").await);
    }

    #[tokio::test]
    async fn malformed_values_and_other_keys_are_skipped() {
        let channel = SyncChannel::new();
        let writer = channel.open_context();
        let mut listener = notifier(&channel, DEFAULT_CLEAR_AFTER).listener();

        channel
            .set_item(writer, DEFAULT_SYNC_KEY, "not json".to_string())
            .await;
        channel
            .set_item(writer, "unrelated", r#"{"type":"student","timestamp":1}"#.to_string())
            .await;
        channel
            .set_item(
                writer,
                DEFAULT_SYNC_KEY,
                r#"{"type":"student","timestamp":2}"#.to_string(),
            )
            .await;

        assert_eq!(
            listener.try_recv(),
            Some(ChangeNotification {
                kind: ChangeKind::Student,
                timestamp: 2
            })
        );
        assert_eq!(listener.try_recv(), None);
    }
}
