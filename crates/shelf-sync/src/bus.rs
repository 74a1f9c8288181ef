//! # Pub/Sub Bus
//!
//! In-process topic bus with hierarchical keys and single-segment wildcards.
//!
//! ## Routing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            Hub<M>                                       │
//! │                                                                         │
//! │  publish("reader.tag.product", msg)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │ Subscriber 1: ["*.tag.*", "*.update.*"]   ✔ match → mpsc send    │  │
//! │  │ Subscriber 2: ["*.product.current"]       ✘ skip                 │  │
//! │  │ Subscriber 3: (receiver dropped)          ✘ pruned               │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  "*" matches exactly one segment; pattern and key lengths must agree.  │
//! │  One subscription = one channel, so its messages keep publish order.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{SyncError, SyncResult};

/// Segment that matches any single key segment.
pub const WILDCARD: &str = "*";

/// Default per-subscription channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// Key
// =============================================================================

/// A hierarchical topic key such as `reader.tag.product`.
///
/// The same type doubles as a subscription pattern when it contains `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    segments: Vec<String>,
}

impl Key {
    /// Builds a key from segments.
    ///
    /// ## Errors
    /// `InvalidKey` if there are no segments, or a segment is empty or
    /// contains a dot.
    pub fn new<I, S>(segments: I) -> SyncResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        let invalid = |reason: &str| SyncError::InvalidKey {
            key: segments.join("."),
            reason: reason.to_string(),
        };

        if segments.is_empty() {
            return Err(invalid("no segments"));
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("empty segment"));
        }
        if segments.iter().any(|s| s.contains('.')) {
            return Err(invalid("segment contains '.'"));
        }

        Ok(Key { segments })
    }

    /// Parses the dotted form, e.g. `"*.tag.*"`.
    pub fn parse(s: &str) -> SyncResult<Self> {
        Key::new(s.split('.'))
    }

    /// Builds a key from segments known to be valid.
    fn fixed(segments: &[&str]) -> Self {
        Key {
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: a key has at least one segment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns `self` followed by the segments of `suffix`.
    pub fn join(&self, suffix: &Key) -> Key {
        let mut segments = self.segments.clone();
        segments.extend(suffix.segments.iter().cloned());
        Key { segments }
    }

    /// Returns true if this pattern matches `key`.
    ///
    /// ## Example
    /// ```rust
    /// use shelf_sync::bus::Key;
    ///
    /// let pattern = Key::parse("*.tag.*").unwrap();
    /// assert!(pattern.matches(&Key::parse("reader.tag.product").unwrap()));
    /// assert!(!pattern.matches(&Key::parse("reader.update.product").unwrap()));
    /// assert!(!pattern.matches(&Key::parse("reader.tag").unwrap()));
    /// ```
    pub fn matches(&self, key: &Key) -> bool {
        self.segments.len() == key.segments.len()
            && self
                .segments
                .iter()
                .zip(&key.segments)
                .all(|(p, k)| p == WILDCARD || p == k)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl FromStr for Key {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::parse(s)
    }
}

// =============================================================================
// Well-Known Keys
// =============================================================================

/// Pattern for tag-presence events: `*.tag.*`.
pub fn tag_events() -> Key {
    Key::fixed(&[WILDCARD, "tag", WILDCARD])
}

/// Pattern for remote product-update events: `*.update.*`.
pub fn update_events() -> Key {
    Key::fixed(&[WILDCARD, "update", WILDCARD])
}

/// Key the engine publishes the head product under: `shelf.product.current`.
pub fn current_product() -> Key {
    Key::fixed(&["shelf", "product", "current"])
}

// =============================================================================
// Hub
// =============================================================================

struct Subscriber<M> {
    id: u64,
    patterns: Vec<Key>,
    tx: mpsc::Sender<(Key, M)>,
}

struct HubInner<M> {
    subscribers: RwLock<Vec<Subscriber<M>>>,
    capacity: usize,
    next_id: AtomicU64,
}

/// Cloneable handle to a topic bus.
pub struct Hub<M> {
    inner: Arc<HubInner<M>>,
}

impl<M> Clone for Hub<M> {
    fn clone(&self) -> Self {
        Hub {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M> fmt::Debug for Hub<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("capacity", &self.inner.capacity)
            .finish_non_exhaustive()
    }
}

impl<M: Clone + Send + 'static> Default for Hub<M> {
    fn default() -> Self {
        Hub::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl<M: Clone + Send + 'static> Hub<M> {
    /// Creates a hub whose subscriptions buffer up to `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Hub {
            inner: Arc::new(HubInner {
                subscribers: RwLock::new(Vec::new()),
                capacity: capacity.max(1),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers one listener for one or more patterns.
    ///
    /// Messages matching any of the patterns arrive on the returned
    /// subscription in publish order. Dropping the subscription unsubscribes.
    pub fn subscribe<I>(&self, patterns: I) -> Subscription<M>
    where
        I: IntoIterator<Item = Key>,
    {
        let patterns: Vec<Key> = patterns.into_iter().collect();
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        debug!(id, patterns = ?patterns.iter().map(Key::to_string).collect::<Vec<_>>(), "Bus subscription added");

        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber { id, patterns, tx });

        Subscription { id, rx }
    }

    /// Delivers `msg` to every live subscription with a matching pattern.
    ///
    /// Waits while a matching subscription's buffer is full. Returns the
    /// number of subscriptions that received the message.
    pub async fn publish(&self, key: Key, msg: M) -> usize {
        let targets: Vec<(u64, mpsc::Sender<(Key, M)>)> = {
            let subscribers = self
                .inner
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers
                .iter()
                .filter(|s| s.patterns.iter().any(|p| p.matches(&key)))
                .map(|s| (s.id, s.tx.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, tx) in targets {
            if tx.send((key.clone(), msg.clone())).await.is_ok() {
                delivered += 1;
            } else {
                closed.push(id);
            }
        }

        if !closed.is_empty() {
            self.prune(&closed);
        }

        trace!(%key, delivered, "Published");
        delivered
    }

    /// Returns a publisher that prefixes every key with `prefix`.
    pub fn publisher(&self, prefix: Key) -> Publisher<M> {
        Publisher {
            hub: self.clone(),
            prefix,
        }
    }

    /// Number of registered subscriptions, including ones not yet pruned.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn prune(&self, closed: &[u64]) {
        let mut subscribers = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|s| !closed.contains(&s.id) && !s.tx.is_closed());
        debug!(pruned = closed.len(), "Dropped bus subscriptions removed");
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Receiving end of a bus subscription.
#[derive(Debug)]
pub struct Subscription<M> {
    id: u64,
    rx: mpsc::Receiver<(Key, M)>,
}

impl<M> Subscription<M> {
    /// Waits for the next message. `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<(Key, M)> {
        self.rx.recv().await
    }

    /// Returns the next message if one is already buffered.
    pub fn try_recv(&mut self) -> Option<(Key, M)> {
        self.rx.try_recv().ok()
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

// =============================================================================
// Publisher
// =============================================================================

/// A hub handle bound to a key prefix, e.g. `console`.
#[derive(Debug, Clone)]
pub struct Publisher<M> {
    hub: Hub<M>,
    prefix: Key,
}

impl<M: Clone + Send + 'static> Publisher<M> {
    /// Publishes under `<prefix>.<suffix>`.
    pub async fn publish(&self, suffix: &str, msg: M) -> SyncResult<usize> {
        let key = self.prefix.join(&Key::parse(suffix)?);
        Ok(self.hub.publish(key, msg).await)
    }

    pub fn prefix(&self) -> &Key {
        &self.prefix
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Key {
        Key::parse(s).unwrap()
    }

    #[test]
    fn test_key_parsing() {
        assert_eq!(key("reader.tag.product").len(), 3);
        assert_eq!(key("reader.tag.product").to_string(), "reader.tag.product");
        assert!(Key::parse("").is_err());
        assert!(Key::parse("reader..product").is_err());
        assert!(Key::new(["a.b"]).is_err());
        assert!(Key::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_wildcard_matching() {
        assert!(tag_events().matches(&key("reader.tag.product")));
        assert!(tag_events().matches(&key("console.tag.scan")));
        assert!(!tag_events().matches(&key("reader.update.product")));
        assert!(!tag_events().matches(&key("reader.tag.product.extra")));
        assert!(update_events().matches(&key("cloud.update.product")));
        assert!(current_product().matches(&key("shelf.product.current")));
        assert!(key("*.product.current").matches(&current_product()));
    }

    #[test]
    fn test_join() {
        assert_eq!(key("reader").join(&key("tag.product")), key("reader.tag.product"));
    }

    #[tokio::test]
    async fn test_publish_routes_by_pattern() {
        let hub: Hub<u32> = Hub::new(8);
        let mut tags = hub.subscribe([tag_events()]);
        let mut current = hub.subscribe([current_product()]);

        assert_eq!(hub.publish(key("reader.tag.product"), 1).await, 1);
        assert_eq!(hub.publish(current_product(), 2).await, 1);
        assert_eq!(hub.publish(key("nobody.listens"), 3).await, 0);

        assert_eq!(tags.recv().await, Some((key("reader.tag.product"), 1)));
        assert_eq!(current.recv().await, Some((current_product(), 2)));
        assert!(tags.try_recv().is_none());
        assert!(current.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_multi_pattern_subscription_keeps_order() {
        let hub: Hub<u32> = Hub::new(8);
        let mut sub = hub.subscribe([tag_events(), update_events()]);

        hub.publish(key("a.tag.x"), 1).await;
        hub.publish(key("b.update.y"), 2).await;
        hub.publish(key("c.tag.z"), 3).await;

        let received: Vec<u32> = (0..3).filter_map(|_| sub.try_recv()).map(|(_, m)| m).collect();
        assert_eq!(received, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let hub: Hub<u32> = Hub::new(8);
        let sub = hub.subscribe([tag_events()]);
        let _other = hub.subscribe([tag_events()]);
        assert_eq!(hub.subscriber_count(), 2);

        drop(sub);
        assert_eq!(hub.publish(key("a.tag.x"), 1).await, 1);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_publisher_prefixes_keys() {
        let hub: Hub<&'static str> = Hub::new(8);
        let mut sub = hub.subscribe([tag_events()]);
        let publisher = hub.publisher(key("console"));

        assert_eq!(publisher.publish("tag.scan", "hello").await.unwrap(), 1);
        assert_eq!(sub.recv().await, Some((key("console.tag.scan"), "hello")));
        assert!(publisher.publish("bad..suffix", "x").await.is_err());
    }
}
