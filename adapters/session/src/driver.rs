//! Async loop running a session against a relay.

use std::sync::Arc;
use std::time::Duration;

use brain_defense_core::{Event, TICK_DURATION};
use brain_defense_relay::{Relay, Since};
use brain_defense_storage::KeyValueStore;
use tokio::time::{self, MissedTickBehavior};
use tracing::info;

use crate::session::{Conclusion, Session};
use crate::transport::{unix_now, Channel, Publisher};

/// Period of the history poll backing up the match stream.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Timing of the match loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriverOptions {
    /// Simulated time advanced per frame.
    pub frame: Duration,
    /// Period of the history poll.
    pub poll_interval: Duration,
}

impl DriverOptions {
    /// Sixty frames per second with the standard poll period.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frame: TICK_DURATION,
            poll_interval: POLL_INTERVAL,
        }
    }
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `session` until it concludes.
///
/// Frames, stream deliveries and polled history are handled one at a time,
/// so peer messages land strictly between frames. `on_frame` sees every
/// frame's events and may act on the session, for instance to place towers,
/// render, or abandon. Publications go out in the background; the ones still
/// queued when the match ends are awaited before returning.
pub async fn run_match<S, F>(
    session: &mut Session<S>,
    relay: Arc<dyn Relay>,
    options: DriverOptions,
    mut on_frame: F,
) -> Conclusion
where
    S: KeyValueStore,
    F: FnMut(&mut Session<S>, &[Event]),
{
    let mut publisher = Publisher::new(Arc::clone(&relay));
    let mut channel = session.match_topic().map(|topic| {
        Channel::open(Arc::clone(&relay), &[topic], Since::Now)
            .with_polling(options.poll_interval, Since::Time(unix_now()))
    });
    let mut frames = time::interval(options.frame);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        publisher.send_all(session.drain_outbound());
        if let Some(conclusion) = session.conclusion() {
            drop(channel);
            publisher.settle().await;
            info!(?conclusion, "match loop finished");
            return conclusion;
        }

        tokio::select! {
            _ = frames.tick() => {
                let events = session.frame(options.frame);
                on_frame(session, &events);
            }
            delivery = next_delivery(&mut channel) => {
                session.receive(&delivery.id, &delivery.payload);
            }
        }
    }
}

async fn next_delivery(channel: &mut Option<Channel>) -> brain_defense_relay::Delivery {
    match channel {
        Some(channel) => channel.next().await,
        None => std::future::pending().await,
    }
}
