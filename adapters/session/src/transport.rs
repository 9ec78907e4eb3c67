//! Glue between sync components and a relay.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use brain_defense_relay::{Delivery, Relay, Since, Subscriptions};
use brain_defense_system_sync::Outbound;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}

/// Publishes outbound messages in background tasks, honouring their delays.
pub(crate) struct Publisher {
    relay: Arc<dyn Relay>,
    pending: Vec<JoinHandle<()>>,
}

impl Publisher {
    pub(crate) fn new(relay: Arc<dyn Relay>) -> Self {
        Self {
            relay,
            pending: Vec::new(),
        }
    }

    pub(crate) fn send(&mut self, outbound: Outbound) {
        let body = match outbound.payload.encode() {
            Ok(body) => body,
            Err(error) => {
                warn!(topic = %outbound.topic, %error, "failed to encode publication");
                return;
            }
        };
        let relay = Arc::clone(&self.relay);
        let Outbound { topic, delay, .. } = outbound;
        self.pending.retain(|task| !task.is_finished());
        self.pending.push(tokio::spawn(async move {
            if !delay.is_zero() {
                time::sleep(delay).await;
            }
            match relay.publish(&topic, &body).await {
                Ok(()) => debug!(%topic, "published"),
                Err(error) => warn!(%topic, %error, "publish failed"),
            }
        }));
    }

    pub(crate) fn send_all(&mut self, outbound: Vec<Outbound>) {
        for publication in outbound {
            self.send(publication);
        }
    }

    /// Waits until every queued publication, delayed ones included, went out.
    pub(crate) async fn settle(&mut self) {
        for task in self.pending.drain(..) {
            let _ = task.await;
        }
    }
}

/// Merges the live stream of some topics with a periodic history poll.
///
/// Each topic's poll resumes after the newest delivery its previous poll
/// returned. Polled history still repeats deliveries the stream already
/// produced; consumers filter them by delivery id.
pub(crate) struct Channel {
    subscriptions: Subscriptions,
    inbox: mpsc::UnboundedReceiver<Delivery>,
    topics: Vec<String>,
    poll: Option<Interval>,
    cursors: HashMap<String, Since>,
    polled_tx: mpsc::UnboundedSender<Vec<Delivery>>,
    polled_rx: mpsc::UnboundedReceiver<Vec<Delivery>>,
    backlog: VecDeque<Delivery>,
}

impl Channel {
    /// Streams `topics` from `stream_since`.
    pub(crate) fn open(relay: Arc<dyn Relay>, topics: &[&str], stream_since: Since) -> Self {
        let (mut subscriptions, inbox) = Subscriptions::new(relay);
        for topic in topics {
            subscriptions.open(topic, stream_since.clone());
        }
        let (polled_tx, polled_rx) = mpsc::unbounded_channel();
        Self {
            subscriptions,
            inbox,
            topics: topics.iter().map(|topic| (*topic).to_owned()).collect(),
            poll: None,
            cursors: HashMap::new(),
            polled_tx,
            polled_rx,
            backlog: VecDeque::new(),
        }
    }

    /// Fetches history every `every`, starting from `since`.
    pub(crate) fn with_polling(mut self, every: Duration, since: Since) -> Self {
        let mut interval = time::interval_at(Instant::now() + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.poll = Some(interval);
        self.cursors = self
            .topics
            .iter()
            .map(|topic| (topic.clone(), since.clone()))
            .collect();
        self
    }

    /// Next delivery of an open topic. Cancel-safe.
    pub(crate) async fn next(&mut self) -> Delivery {
        loop {
            if let Some(delivery) = self.backlog.pop_front() {
                if self.subscriptions.is_open(&delivery.topic) {
                    return delivery;
                }
                continue;
            }
            tokio::select! {
                Some(delivery) = self.inbox.recv() => self.backlog.push_back(delivery),
                Some(batch) = self.polled_rx.recv() => {
                    self.advance_cursor(&batch);
                    self.backlog.extend(batch);
                }
                _ = tick(&mut self.poll) => self.spawn_polls(),
            }
        }
    }

    fn advance_cursor(&mut self, batch: &[Delivery]) {
        if let Some(newest) = batch.last() {
            let _ = self
                .cursors
                .insert(newest.topic.clone(), Since::After(newest.id.clone()));
        }
    }

    fn spawn_polls(&self) {
        for (topic, since) in &self.cursors {
            let relay = Arc::clone(self.subscriptions.relay());
            let sink = self.polled_tx.clone();
            let topic = topic.clone();
            let since = since.clone();
            let _ = tokio::spawn(async move {
                match relay.poll(&topic, since).await {
                    Ok(batch) => {
                        debug!(%topic, count = batch.len(), "polled history");
                        let _ = sink.send(batch);
                    }
                    Err(error) => warn!(%topic, %error, "poll failed"),
                }
            });
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.subscriptions.close_all();
    }
}

async fn tick(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            let _ = interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
