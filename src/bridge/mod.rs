//! Hand-off point between the synchronous worker threads and the async
//! delivery side.
//!
//! Workers call [`EventBridge::publish`], which never blocks: it tries to push
//! into the bounded channel of the one attached consumer and drops the message
//! when there is no consumer or the channel is full. The async side owns the
//! [`Subscription`] and does the actual network I/O.

pub mod messages;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};

use log::{debug, info};
use tokio::sync::mpsc::{self, error::TrySendError};

pub use messages::{FrameUpdate, Notification, OutboundMessage};

pub const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Delivered,
    NoConsumer,
    /// The consumer is attached but its channel is full.
    Dropped,
    /// The consumer went away; it has been detached.
    Disconnected,
}

struct Consumer {
    id: u64,
    tx: mpsc::Sender<OutboundMessage>,
}

struct BridgeInner {
    consumer: Mutex<Option<Consumer>>,
    next_id: AtomicU64,
    capacity: usize,
    dropped: AtomicU64,
}

#[derive(Clone)]
pub struct EventBridge {
    inner: Arc<BridgeInner>,
}

impl Default for EventBridge {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBridge {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                consumer: Mutex::new(None),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    fn consumer(&self) -> MutexGuard<'_, Option<Consumer>> {
        match self.inner.consumer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Non-blocking, best effort. Safe to call from any thread.
    pub fn publish(&self, message: OutboundMessage) -> PublishOutcome {
        let mut guard = self.consumer();
        let Some(consumer) = guard.as_ref() else {
            return PublishOutcome::NoConsumer;
        };

        match consumer.tx.try_send(message) {
            Ok(()) => PublishOutcome::Delivered,
            Err(TrySendError::Full(_)) => {
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("consumer {} saturated, dropping message", consumer.id);
                PublishOutcome::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                info!("consumer {} closed, detaching", consumer.id);
                *guard = None;
                PublishOutcome::Disconnected
            }
        }
    }

    /// Registers a new consumer, replacing the current one if any.
    pub fn attach(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.capacity);

        let previous = self.consumer().replace(Consumer { id, tx });
        if let Some(previous) = previous {
            info!("consumer {} replaced by {}", previous.id, id);
        }

        Subscription {
            id,
            rx,
            bridge: self.clone(),
        }
    }

    /// Removes whichever consumer is attached. Idempotent.
    pub fn detach(&self) {
        if let Some(consumer) = self.consumer().take() {
            info!("consumer {} detached", consumer.id);
        }
    }

    /// Removes the consumer only if it is still `id`, so a stale connection
    /// cannot evict its replacement.
    pub fn detach_consumer(&self, id: u64) -> bool {
        let mut guard = self.consumer();
        if guard.as_ref().map(|c| c.id) == Some(id) {
            *guard = None;
            debug!("consumer {id} detached");
            true
        } else {
            false
        }
    }

    pub fn is_attached(&self) -> bool {
        self.consumer().is_some()
    }

    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

/// Receiving end held by the async delivery task. Dropping it detaches.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<OutboundMessage>,
    bridge: EventBridge,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// `None` once this subscription has been replaced or detached and the
    /// buffered messages are drained.
    pub async fn recv(&mut self) -> Option<OutboundMessage> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<OutboundMessage> {
        self.rx.try_recv().ok()
    }

    /// Stops accepting messages while keeping buffered ones readable. The
    /// bridge notices on the next publish and detaches.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bridge.detach_consumer(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerEvent;
    use chrono::Utc;
    use std::time::{Duration, Instant};

    fn note(event: TimerEvent) -> OutboundMessage {
        OutboundMessage::Notification(Notification::for_event(event, 0, Utc::now()))
    }

    #[test]
    fn publish_without_consumer_is_a_quick_noop() {
        let bridge = EventBridge::new(2);
        let started = Instant::now();
        for _ in 0..1000 {
            assert_eq!(bridge.publish(note(TimerEvent::TimerStarted)), PublishOutcome::NoConsumer);
        }
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn attached_consumer_sees_next_message_exactly_once() {
        let bridge = EventBridge::new(4);
        bridge.publish(note(TimerEvent::TimerStarted));

        let mut sub = bridge.attach();
        assert_eq!(bridge.publish(note(TimerEvent::BreakStarted)), PublishOutcome::Delivered);

        match sub.try_recv() {
            Some(OutboundMessage::Notification(n)) => assert_eq!(n.kind, TimerEvent::BreakStarted),
            other => panic!("unexpected {other:?}"),
        }
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let bridge = EventBridge::new(1);
        let _sub = bridge.attach();

        assert_eq!(bridge.publish(note(TimerEvent::TimerStarted)), PublishOutcome::Delivered);
        assert_eq!(bridge.publish(note(TimerEvent::BreakStarted)), PublishOutcome::Dropped);
        assert_eq!(bridge.dropped_count(), 1);
    }

    #[test]
    fn later_attach_replaces_earlier() {
        let bridge = EventBridge::new(4);
        let mut first = bridge.attach();
        let mut second = bridge.attach();

        bridge.publish(note(TimerEvent::BreakEnded));
        assert!(first.try_recv().is_none());
        assert!(second.try_recv().is_some());

        // the stale subscription must not evict its replacement
        drop(first);
        assert!(bridge.is_attached());
    }

    #[test]
    fn detach_is_idempotent_and_publish_noops_after() {
        let bridge = EventBridge::new(4);
        let _sub = bridge.attach();
        bridge.detach();
        bridge.detach();
        assert_eq!(bridge.publish(note(TimerEvent::TimerComplete)), PublishOutcome::NoConsumer);
    }

    #[test]
    fn closed_receiver_detaches_on_publish() {
        let bridge = EventBridge::new(4);
        let mut sub = bridge.attach();
        let id = sub.id();
        sub.close();

        assert_eq!(bridge.publish(note(TimerEvent::TimerStarted)), PublishOutcome::Disconnected);
        assert!(!bridge.is_attached());
        assert!(!bridge.detach_consumer(id));
    }

    #[tokio::test]
    async fn worker_thread_publishes_into_async_consumer() {
        let bridge = EventBridge::new(8);
        let mut sub = bridge.attach();

        let producer = bridge.clone();
        std::thread::spawn(move || {
            producer.publish(note(TimerEvent::BreakEndingSoon));
        })
        .join()
        .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .unwrap();
        assert!(matches!(
            received,
            Some(OutboundMessage::Notification(Notification { kind: TimerEvent::BreakEndingSoon, .. }))
        ));
    }
}
