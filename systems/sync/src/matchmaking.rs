//! Public matchmaking over a per-level lobby topic.
//!
//! Every searcher rebroadcasts an `LFG` beacon. When two searchers see each
//! other, the one whose id sorts greater becomes host and addresses a
//! `MATCH_OFFER` to the other, which becomes client on receipt. Both sides
//! evaluate the same comparison, so exactly one offer is made per pair.

use std::cmp::Ordering;
use std::time::Duration;

use brain_defense_core::{CoopDescriptor, Role};
use tracing::{debug, info};

use crate::message::{Message, Outbound};
use crate::topics::Topics;

/// Interval between presence beacons.
pub const BEACON_INTERVAL: Duration = Duration::from_secs(3);

/// Role the local player takes against `other`, or `None` for identical ids.
#[must_use]
pub fn tie_break(me: &str, other: &str) -> Option<Role> {
    match me.cmp(other) {
        Ordering::Greater => Some(Role::Host),
        Ordering::Less => Some(Role::Client),
        Ordering::Equal => None,
    }
}

/// Values a host needs to mint a new match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchEntropy {
    /// Suffix making the match topic unique.
    pub nonce: u64,
    /// Shared seed for the match.
    pub seed: u64,
}

/// A match found through the lobby.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchFound {
    /// Level to play.
    pub level: u32,
    /// Match descriptor for the local player.
    pub descriptor: CoopDescriptor,
}

/// Matchmaking state machine for one search.
#[derive(Debug)]
pub struct Matchmaker {
    me: String,
    level: u32,
    topics: Topics,
    lobby: String,
    beacon_interval: Duration,
    since_beacon: Duration,
    found: bool,
}

impl Matchmaker {
    /// Starts searching for a partner on `level`.
    #[must_use]
    pub fn new(me: impl Into<String>, level: u32, topics: Topics) -> Self {
        let lobby = topics.lobby(level);
        Self {
            me: me.into(),
            level,
            topics,
            lobby,
            beacon_interval: BEACON_INTERVAL,
            since_beacon: Duration::ZERO,
            found: false,
        }
    }

    /// Overrides the beacon interval.
    #[must_use]
    pub fn with_beacon_interval(mut self, interval: Duration) -> Self {
        self.beacon_interval = interval;
        self
    }

    /// Lobby topic the search runs on.
    #[must_use]
    pub fn lobby(&self) -> &str {
        &self.lobby
    }

    /// Reports whether the search concluded.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.found
    }

    /// Beacon to publish as soon as the lobby subscription opens.
    #[must_use]
    pub fn announce(&mut self) -> Outbound {
        self.since_beacon = Duration::ZERO;
        Outbound::now(
            self.lobby.clone(),
            Message::Lfg {
                sender: self.me.clone(),
                level: self.level,
            },
        )
    }

    /// Advances the beacon timer, emitting a beacon when it is due.
    pub fn tick(&mut self, elapsed: Duration, out: &mut Vec<Outbound>) {
        if self.found {
            return;
        }
        self.since_beacon = self.since_beacon.saturating_add(elapsed);
        if self.since_beacon >= self.beacon_interval {
            out.push(self.announce());
        }
    }

    /// Processes a lobby message.
    ///
    /// `entropy` is only consumed when the local player becomes host.
    pub fn receive(
        &mut self,
        message: &Message,
        entropy: MatchEntropy,
        out: &mut Vec<Outbound>,
    ) -> Option<MatchFound> {
        if self.found || message.is_from_player(&self.me) {
            return None;
        }

        match message {
            Message::Lfg { sender, level } if *level == self.level => {
                if tie_break(&self.me, sender) != Some(Role::Host) {
                    return None;
                }
                let match_topic = self.topics.match_topic(&self.me, sender, entropy.nonce);
                info!(peer = %sender, topic = %match_topic, "offering match");
                out.push(Outbound::now(
                    self.lobby.clone(),
                    Message::MatchOffer {
                        target: sender.clone(),
                        sender: self.me.clone(),
                        match_id: match_topic.clone(),
                        level: self.level,
                        seed: entropy.seed,
                    },
                ));
                self.found = true;
                Some(MatchFound {
                    level: self.level,
                    descriptor: CoopDescriptor {
                        match_topic,
                        role: Role::Host,
                        seed: entropy.seed,
                        peer: Some(sender.clone()),
                    },
                })
            }
            Message::MatchOffer {
                target,
                sender,
                match_id,
                seed,
                ..
            } if *target == self.me => {
                info!(peer = %sender, topic = %match_id, "accepted match offer");
                self.found = true;
                Some(MatchFound {
                    level: self.level,
                    descriptor: CoopDescriptor {
                        match_topic: match_id.clone(),
                        role: Role::Client,
                        seed: *seed,
                        peer: Some(sender.clone()),
                    },
                })
            }
            other => {
                debug!(message = ?other.origin(), "lobby message ignored");
                None
            }
        }
    }
}
