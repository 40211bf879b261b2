//! Topic-based event bus (spec §4.2).
//!
//! Ordering is per-topic FIFO to each subscriber; there is no durability.
//! A slow subscriber never stalls a publisher: when its queue is full the
//! oldest buffered message is dropped to make room and a per-subscriber
//! counter is incremented, mirroring the priority-lane backpressure
//! signalling in the reference bus this crate is grounded on
//! (`sx9-atlas-bus::bus::DispatchResult::Backpressure`), adapted here to an
//! unconditional drop-oldest policy per spec §4.2.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, RwLock};
use tracing::warn;

pub type Topic = String;

/// Default per-subscriber queue depth before drop-oldest kicks in.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 256;

struct Inner<M> {
    queue: Mutex<VecDeque<M>>,
    capacity: usize,
    notify: Notify,
    dropped: AtomicU64,
}

/// A subscriber's receive handle. Cloning an `EventBus` and calling
/// `subscribe` repeatedly gives each caller an independent queue even for
/// the same topic (per-subscriber FIFO, not shared).
pub struct Subscription<M> {
    inner: Arc<Inner<M>>,
}

impl<M> Subscription<M> {
    /// Number of messages dropped from this subscription so far because its
    /// queue was full.
    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Await the next message published to this subscription's topic.
    pub async fn recv(&self) -> M {
        loop {
            {
                let mut q = self.inner.queue.lock().await;
                if let Some(m) = q.pop_front() {
                    return m;
                }
            }
            self.inner.notify.notified().await;
        }
    }

    /// Non-blocking poll; returns `None` if nothing is queued right now.
    pub async fn try_recv(&self) -> Option<M> {
        self.inner.queue.lock().await.pop_front()
    }
}

/// A topic-keyed table of subscriber queues. Cheaply cloneable (internally
/// `Arc`-backed) so every component can hold its own handle.
#[derive(Clone)]
pub struct EventBus<M> {
    topics: Arc<RwLock<HashMap<Topic, Vec<Arc<Inner<M>>>>>>,
    capacity: usize,
}

impl<M: Clone + Send + 'static> Default for EventBus<M> {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_CAPACITY)
    }
}

impl<M: Clone + Send + 'static> EventBus<M> {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Subscribe to `topic`. Returns an independent, per-subscriber FIFO
    /// queue; multiple subscribers to the same topic each get their own
    /// copy of every published message.
    pub async fn subscribe(&self, topic: impl Into<Topic>) -> Subscription<M> {
        let inner = Arc::new(Inner {
            queue: Mutex::new(VecDeque::with_capacity(self.capacity.min(64))),
            capacity: self.capacity,
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        });
        let topic = topic.into();
        self.topics
            .write()
            .await
            .entry(topic)
            .or_default()
            .push(inner.clone());
        Subscription { inner }
    }

    /// Publish `message` to every current subscriber of `topic`. Never
    /// blocks: queues that are full drop their oldest entry first.
    pub async fn publish(&self, topic: impl AsRef<str>, message: M) {
        let topics = self.topics.read().await;
        let Some(subs) = topics.get(topic.as_ref()) else {
            return;
        };
        for sub in subs {
            let mut q = sub.queue.lock().await;
            if q.len() >= sub.capacity {
                q.pop_front();
                sub.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(topic = topic.as_ref(), "subscriber queue full, dropping oldest message");
            }
            q.push_back(message.clone());
            sub.notify.notify_one();
        }
    }

    pub async fn subscriber_count(&self, topic: impl AsRef<str>) -> usize {
        self.topics
            .read()
            .await
            .get(topic.as_ref())
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn per_topic_fifo_delivery() {
        let bus: EventBus<u32> = EventBus::new(8);
        let sub = bus.subscribe("ssa:conjunctions").await;
        bus.publish("ssa:conjunctions", 1).await;
        bus.publish("ssa:conjunctions", 2).await;
        bus.publish("ssa:conjunctions", 3).await;
        assert_eq!(sub.recv().await, 1);
        assert_eq!(sub.recv().await, 2);
        assert_eq!(sub.recv().await, 3);
    }

    #[tokio::test]
    async fn slow_subscriber_drops_oldest_never_blocks_publisher() {
        let bus: EventBus<u32> = EventBus::new(2);
        let sub = bus.subscribe("missions:*").await;
        bus.publish("missions:*", 1).await;
        bus.publish("missions:*", 2).await;
        bus.publish("missions:*", 3).await; // drops `1`
        assert_eq!(sub.dropped_count(), 1);
        assert_eq!(sub.recv().await, 2);
        assert_eq!(sub.recv().await, 3);
    }

    #[tokio::test]
    async fn each_subscriber_gets_its_own_copy() {
        let bus: EventBus<u32> = EventBus::new(4);
        let a = bus.subscribe("alarms:all").await;
        let b = bus.subscribe("alarms:all").await;
        bus.publish("alarms:all", 42).await;
        assert_eq!(a.recv().await, 42);
        assert_eq!(b.recv().await, 42);
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_is_a_no_op() {
        let bus: EventBus<u32> = EventBus::new(4);
        bus.publish("alarms:all", 1).await;
        assert_eq!(bus.subscriber_count("alarms:all").await, 0);
    }
}
