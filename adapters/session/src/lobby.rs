//! Async drivers for everything that happens before a match starts.

use std::sync::Arc;
use std::time::Duration;

use brain_defense_core::SeededRng;
use brain_defense_relay::{Delivery, Relay, Since};
use brain_defense_system_sync::{
    InviteGuest, InviteHost, Mailbox, MailboxNotice, MatchEntropy, MatchFound, Matchmaker,
    Message, PendingInvite, SeenMessages, Topics,
};
use tokio::time::{self, Instant};
use tracing::{debug, info};

use crate::driver::POLL_INTERVAL;
use crate::transport::{unix_millis, Channel, Publisher};
use crate::SessionError;

/// History replayed when joining a lobby or a match topic.
pub const LOBBY_HISTORY: Duration = Duration::from_secs(10 * 60);

/// History replayed when opening a mailbox.
pub const MAILBOX_HISTORY: Duration = Duration::from_secs(60 * 60);

/// Largest shared seed handed out by a host.
const SEED_RANGE: u32 = 1_000_000;

/// Timing of the pre-match drivers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LobbyOptions {
    /// Period of the history poll.
    pub poll_interval: Duration,
    /// How often the beacon timer is advanced.
    pub beacon_check: Duration,
    /// History replayed on lobby and match topics.
    pub lobby_history: Duration,
    /// History replayed on mailboxes.
    pub mailbox_history: Duration,
    /// Give up after this long; `None` waits forever.
    pub timeout: Option<Duration>,
}

impl LobbyOptions {
    /// Standard timings without a deadline.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            beacon_check: Duration::from_millis(250),
            lobby_history: LOBBY_HISTORY,
            mailbox_history: MAILBOX_HISTORY,
            timeout: None,
        }
    }

    /// Gives up after `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for LobbyOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Topic nonce and shared seed for a match hosted now.
#[must_use]
pub fn fresh_entropy() -> MatchEntropy {
    let nonce = unix_millis();
    let mut rng = SeededRng::new(nonce ^ u64::from(std::process::id()));
    MatchEntropy {
        nonce,
        seed: u64::from(rng.next_below(SEED_RANGE)),
    }
}

/// Searches the matchmaker's lobby until a partner is found.
///
/// The beacon is published as soon as the lobby is open and again on every
/// beacon interval.
pub async fn search(
    relay: Arc<dyn Relay>,
    mut matchmaker: Matchmaker,
    options: LobbyOptions,
) -> Result<MatchFound, SessionError> {
    let mut publisher = Publisher::new(Arc::clone(&relay));
    let mut channel = Channel::open(
        relay,
        &[matchmaker.lobby()],
        Since::Window(options.lobby_history),
    );
    let mut seen = SeenMessages::default();
    info!(lobby = matchmaker.lobby(), "searching for a partner");
    publisher.send(matchmaker.announce());

    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
    let mut beacons = time::interval(options.beacon_check);
    let mut last_beacon_check = Instant::now();
    let found = loop {
        let mut out = Vec::new();
        tokio::select! {
            _ = beacons.tick() => {
                let now = Instant::now();
                matchmaker.tick(now - last_beacon_check, &mut out);
                last_beacon_check = now;
            }
            delivery = channel.next() => {
                let found = decode_once(&mut seen, &delivery)
                    .and_then(|message| matchmaker.receive(&message, fresh_entropy(), &mut out));
                if let Some(found) = found {
                    publisher.send_all(out);
                    break found;
                }
            }
            () = expire(deadline) => return Err(SessionError::TimedOut("a lobby partner")),
        }
        publisher.send_all(out);
    };

    drop(channel);
    publisher.settle().await;
    Ok(found)
}

/// Invites `friend` and starts `level` once they accept.
///
/// Fails with [`SessionError::Invite`] when the friend declines or has not
/// unlocked `level`.
pub async fn host_invite(
    relay: Arc<dyn Relay>,
    me: &str,
    friend: &str,
    topics: &Topics,
    level: u32,
    completed_levels: &[u32],
    options: LobbyOptions,
) -> Result<MatchFound, SessionError> {
    let mut publisher = Publisher::new(Arc::clone(&relay));
    let (mut host, invite) = InviteHost::invite(me, friend, topics, fresh_entropy());
    let history = Since::Window(options.lobby_history);
    let mut channel = Channel::open(relay, &[host.match_topic()], history.clone())
        .with_polling(options.poll_interval, history);
    let mut seen = SeenMessages::default();
    info!(%friend, topic = host.match_topic(), "inviting friend");
    publisher.send(invite);

    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
    loop {
        tokio::select! {
            delivery = channel.next() => {
                let answered = decode_once(&mut seen, &delivery)
                    .is_some_and(|message| host.receive(&message));
                if answered {
                    break;
                }
            }
            () = expire(deadline) => return Err(SessionError::TimedOut("the invited friend")),
        }
    }

    let mut out = Vec::new();
    let found = host.start(level, completed_levels, &mut out)?;
    publisher.send_all(out);
    drop(channel);
    publisher.settle().await;
    Ok(found)
}

/// Accepts `invite` and waits for the host to start the match.
pub async fn join_invite(
    relay: Arc<dyn Relay>,
    me: &str,
    invite: PendingInvite,
    completed_levels: &[u32],
    options: LobbyOptions,
) -> Result<MatchFound, SessionError> {
    let mut publisher = Publisher::new(Arc::clone(&relay));
    let (mut guest, accept) = InviteGuest::accept(me, invite, completed_levels);
    let history = Since::Window(options.lobby_history);
    let mut channel = Channel::open(relay, &[guest.match_topic()], history.clone())
        .with_polling(options.poll_interval, history);
    let mut seen = SeenMessages::default();
    info!(topic = guest.match_topic(), "accepted invitation");
    publisher.send(accept);

    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
    let found = loop {
        tokio::select! {
            delivery = channel.next() => {
                if let Some(found) = decode_once(&mut seen, &delivery)
                    .and_then(|message| guest.receive(&message))
                {
                    break found;
                }
            }
            () = expire(deadline) => return Err(SessionError::TimedOut("the host to start")),
        }
    };

    drop(channel);
    publisher.settle().await;
    Ok(found)
}

/// Reads the mailbox until a game invitation arrives.
///
/// Friend requests and answers arriving meanwhile are recorded in `mailbox`.
pub async fn await_invite(
    relay: Arc<dyn Relay>,
    mailbox: &mut Mailbox,
    options: LobbyOptions,
) -> Result<PendingInvite, SessionError> {
    let history = Since::Window(options.mailbox_history);
    let topic = mailbox.topic();
    let mut channel = Channel::open(relay, &[topic.as_str()], history.clone())
        .with_polling(options.poll_interval, history);
    let mut seen = SeenMessages::default();
    info!(%topic, "watching mailbox");

    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
    loop {
        tokio::select! {
            delivery = channel.next() => {
                let notice = decode_once(&mut seen, &delivery)
                    .and_then(|message| mailbox.receive(&message));
                match notice {
                    Some(MailboxNotice::GameInvite(invite)) => return Ok(invite),
                    Some(other) => info!(notice = ?other, "mailbox"),
                    None => {}
                }
            }
            () = expire(deadline) => return Err(SessionError::TimedOut("an invitation")),
        }
    }
}

fn decode_once(seen: &mut SeenMessages, delivery: &Delivery) -> Option<Message> {
    if !seen.first_sighting(&delivery.id) {
        return None;
    }
    match Message::decode(&delivery.payload) {
        Ok(message) => Some(message),
        Err(error) => {
            debug!(id = %delivery.id, %error, "discarding malformed message");
            None
        }
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
