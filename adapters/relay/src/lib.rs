#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Publish/subscribe transport used for matchmaking and match signalling.
//!
//! The bus is addressed by topic strings. Publishing is fire-and-forget and
//! subscriptions deliver an unordered, possibly delayed and possibly lossy
//! stream, optionally replaying history. [`Relay::poll`] re-fetches a topic's
//! history independently of the stream and backs up whatever it dropped.

mod memory;
mod ntfy;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

pub use memory::MemoryRelay;
pub use ntfy::{NtfyConfig, NtfyRelay};

/// A message received from the bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// Identifier assigned by the bus; equal across stream and poll replays.
    pub id: String,
    /// Unix time in seconds at which the bus accepted the message.
    pub time: u64,
    /// Topic the message was published on.
    pub topic: String,
    /// Raw message body.
    pub payload: String,
}

/// How much history a poll or subscription replays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Since {
    /// Only messages published from now on.
    Now,
    /// Every retained message.
    All,
    /// Messages younger than the window.
    Window(Duration),
    /// Messages published at or after the Unix time in seconds.
    Time(u64),
    /// Messages published after the one with this identifier.
    After(String),
}

impl Since {
    /// Query parameter value understood by ntfy-compatible servers.
    #[must_use]
    pub fn query_value(&self) -> Option<String> {
        match self {
            Self::Now => None,
            Self::All => Some("all".to_owned()),
            Self::Window(window) => Some(format!("{}s", window.as_secs())),
            Self::Time(time) => Some(time.to_string()),
            Self::After(id) => Some(id.clone()),
        }
    }
}

/// Transport failures; callers log them and carry on.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The HTTP request failed.
    #[error("relay request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The relay answered with a non-success status.
    #[error("relay rejected {topic}: HTTP {status}")]
    Status {
        /// Topic of the rejected request.
        topic: String,
        /// HTTP status code.
        status: u16,
    },
    /// The relay is unreachable.
    #[error("relay offline")]
    Offline,
}

/// A publish/subscribe transport.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Publishes `payload` on `topic` without waiting for any subscriber.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), RelayError>;

    /// Fetches the retained history of `topic`.
    async fn poll(&self, topic: &str, since: Since) -> Result<Vec<Delivery>, RelayError>;

    /// Streams deliveries of `topic` into `sink` until the subscription closes.
    fn subscribe(
        &self,
        topic: &str,
        since: Since,
        sink: mpsc::UnboundedSender<Delivery>,
    ) -> Subscription;
}

/// Handle of an open subscription; dropping it tears the stream down.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    closed: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(topic: &str, closed: Arc<AtomicBool>, task: Option<JoinHandle<()>>) -> Self {
        Self {
            topic: topic.to_owned(),
            closed,
            task,
        }
    }

    /// Topic being streamed.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Reports whether the subscription was torn down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        debug!(topic = %self.topic, "subscription closed");
    }
}

/// Registry holding at most one subscription per topic, all feeding one inbox.
pub struct Subscriptions {
    relay: Arc<dyn Relay>,
    sink: mpsc::UnboundedSender<Delivery>,
    open: HashMap<String, Subscription>,
}

impl std::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriptions")
            .field("open", &self.open.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Subscriptions {
    /// Creates an empty registry and the inbox its subscriptions feed.
    #[must_use]
    pub fn new(relay: Arc<dyn Relay>) -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (sink, inbox) = mpsc::unbounded_channel();
        let registry = Self {
            relay,
            sink,
            open: HashMap::new(),
        };
        (registry, inbox)
    }

    /// Relay backing the registry.
    #[must_use]
    pub fn relay(&self) -> &Arc<dyn Relay> {
        &self.relay
    }

    /// Opens `topic`, tearing down any subscription already open on it first.
    pub fn open(&mut self, topic: &str, since: Since) {
        if let Some(previous) = self.open.remove(topic) {
            drop(previous);
        }
        let subscription = self.relay.subscribe(topic, since, self.sink.clone());
        let _ = self.open.insert(topic.to_owned(), subscription);
    }

    /// Closes `topic`, returning whether it was open.
    pub fn close(&mut self, topic: &str) -> bool {
        self.open.remove(topic).is_some()
    }

    /// Closes every subscription.
    pub fn close_all(&mut self) {
        self.open.clear();
    }

    /// Reports whether `topic` is open; late deliveries of closed topics are stale.
    #[must_use]
    pub fn is_open(&self, topic: &str) -> bool {
        self.open.contains_key(topic)
    }

    /// Number of open subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.open.len()
    }

    /// Reports whether nothing is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}
