//! Event hub for broadcasting newly created entities to live subscribers

use dashmap::DashMap;
use futures::Stream;
use serde::Serialize;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Semaphore;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};
use uuid::Uuid;

/// Default per-subscription buffer capacity
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

/// Snapshot of hub counters, exposed on the health endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    /// Items passed to `publish`
    pub published: u64,
    /// Item copies accepted by a subscription buffer
    pub delivered: u64,
    /// Subscriptions detached because their buffer overflowed
    pub subscriptions_dropped: u64,
}

struct Shared<T> {
    subscribers: DashMap<Uuid, mpsc::Sender<T>>,
    capacity: usize,
    published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl<T> Shared<T> {
    fn detach(&self, id: &Uuid) -> bool {
        self.subscribers.remove(id).is_some()
    }
}

/// Multicast point that fans published items out to every live [`Subscription`].
///
/// Each subscription owns a bounded buffer of `capacity` items. Publishing never
/// blocks: a closed buffer is reclaimed, and a full one gets its subscription
/// detached. A detached subscriber still drains what was already buffered, in
/// order, and then its stream ends. Nothing is skipped inside a subscription
/// that stays live.
pub struct EventHub<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for EventHub<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> EventHub<T> {
    /// Create a hub whose subscriptions buffer at most `capacity` items.
    ///
    /// The capacity is clamped to what a tokio channel accepts: at least one
    /// slot and at most `Semaphore::MAX_PERMITS`.
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                subscribers: DashMap::new(),
                capacity: capacity.clamp(1, Semaphore::MAX_PERMITS),
                published: AtomicU64::new(0),
                delivered: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Attach a new subscriber.
    ///
    /// The subscription is registered before this returns, so it receives every
    /// item published from now on and nothing published before.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::channel(self.shared.capacity);
        let id = Uuid::new_v4();
        self.shared.subscribers.insert(id, tx);
        debug!(
            subscription_id = %id,
            subscribers = self.shared.subscribers.len(),
            "Subscription attached"
        );

        Subscription {
            id,
            stream: ReceiverStream::new(rx),
            shared: self.shared.clone(),
        }
    }

    /// Offer `item` to every live subscription without waiting.
    ///
    /// Returns how many subscriptions accepted it. The count is diagnostic only;
    /// rejected deliveries are handled here and never reach the caller.
    pub fn publish(&self, item: T) -> usize {
        self.shared.published.fetch_add(1, Ordering::Relaxed);

        let mut accepted = 0;
        let mut closed = Vec::new();
        let mut overflowed = Vec::new();

        // Removals wait until iteration is done: DashMap shards are read-locked here.
        for entry in self.shared.subscribers.iter() {
            match entry.value().try_send(item.clone()) {
                Ok(()) => accepted += 1,
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
                Err(TrySendError::Full(_)) => overflowed.push(*entry.key()),
            }
        }

        for id in closed {
            if self.shared.detach(&id) {
                debug!(subscription_id = %id, "Reclaimed closed subscription");
            }
        }

        for id in overflowed {
            if self.shared.detach(&id) {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    subscription_id = %id,
                    capacity = self.shared.capacity,
                    "Subscriber buffer full, detaching slow subscription"
                );
            }
        }

        self.shared
            .delivered
            .fetch_add(accepted as u64, Ordering::Relaxed);
        accepted
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }

    /// Per-subscription buffer capacity
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            published: self.shared.published.load(Ordering::Relaxed),
            delivered: self.shared.delivered.load(Ordering::Relaxed),
            subscriptions_dropped: self.shared.dropped.load(Ordering::Relaxed),
        }
    }
}

impl<T: Clone + Send + 'static> Default for EventHub<T> {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

/// A live subscriber's handle into an [`EventHub`].
///
/// Yields items in publish order. Dropping it detaches it from the hub and
/// frees its buffer.
pub struct Subscription<T> {
    id: Uuid,
    stream: ReceiverStream<T>,
    shared: Arc<Shared<T>>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the hub still delivers to this subscription
    pub fn is_active(&self) -> bool {
        self.shared.subscribers.contains_key(&self.id)
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        Pin::new(&mut self.stream).poll_next(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if self.shared.detach(&self.id) {
            debug!(subscription_id = %self.id, "Subscription detached");
        }
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
