//! In-process relay used by tests and offline play.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::{Delivery, Relay, RelayError, Since, Subscription};

#[derive(Debug)]
struct Listener {
    sink: mpsc::UnboundedSender<Delivery>,
    closed: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
struct Bus {
    next_id: u64,
    history: HashMap<String, Vec<Delivery>>,
    listeners: HashMap<String, Vec<Listener>>,
    published: u64,
    offline: bool,
}

/// Relay keeping every topic's history in memory.
///
/// Clones share the same bus, so two sessions holding clones talk to each
/// other. The live stream can be made lossy to exercise polling fallbacks;
/// dropped messages still reach the history.
#[derive(Clone, Debug, Default)]
pub struct MemoryRelay {
    bus: Arc<Mutex<Bus>>,
    drop_every: Option<u64>,
}

impl MemoryRelay {
    /// Creates an empty, reliable bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle on the same bus whose streams skip every `n`th publication.
    #[must_use]
    pub fn lossy(&self, n: u64) -> Self {
        Self {
            bus: Arc::clone(&self.bus),
            drop_every: Some(n.max(1)),
        }
    }

    /// Makes every operation fail with [`RelayError::Offline`] while set.
    pub fn set_offline(&self, offline: bool) {
        self.bus.lock().offline = offline;
    }

    /// Retained history of `topic`.
    #[must_use]
    pub fn history(&self, topic: &str) -> Vec<Delivery> {
        self.bus.lock().history.get(topic).cloned().unwrap_or_default()
    }

    /// Number of open, live listeners on `topic`.
    #[must_use]
    pub fn listeners(&self, topic: &str) -> usize {
        self.bus.lock().listeners.get(topic).map_or(0, |listeners| {
            listeners
                .iter()
                .filter(|listener| !listener.closed.load(Ordering::Acquire))
                .count()
        })
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

fn replay(history: &[Delivery], since: &Since) -> Vec<Delivery> {
    match since {
        Since::Now => Vec::new(),
        Since::All => history.to_vec(),
        Since::Window(window) => {
            let cutoff = unix_now().saturating_sub(window.as_secs());
            history.iter().filter(|d| d.time >= cutoff).cloned().collect()
        }
        Since::Time(time) => history.iter().filter(|d| d.time >= *time).cloned().collect(),
        Since::After(id) => match history.iter().position(|d| d.id == *id) {
            Some(index) => history[index + 1..].to_vec(),
            None => history.to_vec(),
        },
    }
}

#[async_trait]
impl Relay for MemoryRelay {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), RelayError> {
        let mut bus = self.bus.lock();
        if bus.offline {
            return Err(RelayError::Offline);
        }
        bus.next_id += 1;
        bus.published += 1;
        let delivery = Delivery {
            id: format!("m{}", bus.next_id),
            time: unix_now(),
            topic: topic.to_owned(),
            payload: payload.to_owned(),
        };
        bus.history
            .entry(topic.to_owned())
            .or_default()
            .push(delivery.clone());

        let dropped = self
            .drop_every
            .is_some_and(|n| bus.published % n == 0);
        if let Some(listeners) = bus.listeners.get_mut(topic) {
            listeners.retain(|listener| {
                !listener.closed.load(Ordering::Acquire) && !listener.sink.is_closed()
            });
            if !dropped {
                for listener in listeners.iter() {
                    let _ = listener.sink.send(delivery.clone());
                }
            }
        }
        Ok(())
    }

    async fn poll(&self, topic: &str, since: Since) -> Result<Vec<Delivery>, RelayError> {
        let bus = self.bus.lock();
        if bus.offline {
            return Err(RelayError::Offline);
        }
        Ok(bus
            .history
            .get(topic)
            .map(|history| replay(history, &since))
            .unwrap_or_default())
    }

    fn subscribe(
        &self,
        topic: &str,
        since: Since,
        sink: mpsc::UnboundedSender<Delivery>,
    ) -> Subscription {
        let closed = Arc::new(AtomicBool::new(false));
        let mut bus = self.bus.lock();
        if let Some(history) = bus.history.get(topic) {
            for delivery in replay(history, &since) {
                let _ = sink.send(delivery);
            }
        }
        bus.listeners
            .entry(topic.to_owned())
            .or_default()
            .push(Listener {
                sink,
                closed: Arc::clone(&closed),
            });
        Subscription::new(topic, closed, None)
    }
}
