//! In-match synchronisation between host and client.
//!
//! Both participants run their own simulation. This component turns local
//! events into replication messages and peer messages into world commands
//! or session actions; it never blocks on the peer and never orders its
//! messages. Every handler tolerates replays: tower replication is keyed by
//! instance id and wave announcements by index.

use std::time::Duration;

use brain_defense_core::{
    Command, CoopDescriptor, Event, MatchSnapshot, NormalizedPoint, OverwriteScope, Role, Viewport,
};
use tracing::debug;

use crate::message::{Message, Outbound};
use crate::surrender::{Ballot, SurrenderVote, VoteSignal, VoteState};

/// Delay before a wave announcement is published a second time.
pub const ANNOUNCE_RESEND_DELAY: Duration = Duration::from_secs(1);

/// What the session must do in response to a peer message.
#[derive(Clone, Debug, PartialEq)]
pub enum CoopAction {
    /// Apply the command to the local world.
    Apply(Command),
    /// The host started wave `index`; hand it to wave control.
    WaveAnnounced(u32),
    /// Publish the local match state.
    ShareState,
    /// Surface a surrender vote change.
    Surrender(VoteSignal),
}

/// Synchronisation endpoint of one participant.
#[derive(Debug)]
pub struct CoopSync {
    descriptor: CoopDescriptor,
    vote: SurrenderVote,
}

impl CoopSync {
    /// Creates the endpoint for the match described by `descriptor`.
    #[must_use]
    pub fn new(descriptor: CoopDescriptor) -> Self {
        let vote = SurrenderVote::new(descriptor.role);
        Self { descriptor, vote }
    }

    /// Role of the local participant.
    #[must_use]
    pub fn role(&self) -> Role {
        self.descriptor.role
    }

    /// Match topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.descriptor.match_topic
    }

    /// Match descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &CoopDescriptor {
        &self.descriptor
    }

    /// Current surrender vote state.
    #[must_use]
    pub fn vote_state(&self) -> VoteState {
        self.vote.state()
    }

    /// Catch-up request to publish whenever the match topic is (re)opened.
    #[must_use]
    pub fn connect(&self) -> Outbound {
        self.publish(Message::SyncRequest { role: self.role() })
    }

    /// Full state answering a peer's catch-up request.
    #[must_use]
    pub fn share_state(&self, snapshot: MatchSnapshot) -> Outbound {
        self.publish(Message::SyncData {
            role: self.role(),
            state: Box::new(snapshot),
        })
    }

    /// Turns local world events into replication messages.
    ///
    /// Local placements are replicated in normalized coordinates. Wave starts
    /// are announced by the host only, once immediately and once more after
    /// [`ANNOUNCE_RESEND_DELAY`].
    pub fn observe(&self, events: &[Event], viewport: Viewport, out: &mut Vec<Outbound>) {
        for event in events {
            match event {
                Event::TowerPlaced {
                    tower,
                    kind,
                    position,
                    replicated: false,
                } => {
                    let NormalizedPoint { nx, ny } = viewport.normalize(*position);
                    out.push(self.publish(Message::TowerPlaced {
                        role: self.role(),
                        nx,
                        ny,
                        id: *tower,
                        config_id: *kind,
                    }));
                }
                Event::WaveStarted { wave } if self.role() == Role::Host => {
                    let announce = Message::StartWave {
                        role: Role::Host,
                        wave_index: *wave,
                    };
                    out.push(self.publish(announce.clone()));
                    out.push(Outbound::after(
                        self.descriptor.match_topic.clone(),
                        announce,
                        ANNOUNCE_RESEND_DELAY,
                    ));
                }
                _ => {}
            }
        }
    }

    /// Interprets a peer message; the participant's own messages are dropped.
    pub fn receive(&mut self, message: Message, viewport: Viewport) -> Option<CoopAction> {
        if message.is_from_role(self.role()) {
            debug!(role = %self.role(), "dropping own message");
            return None;
        }
        match message {
            Message::TowerPlaced {
                nx,
                ny,
                id,
                config_id,
                ..
            } => Some(CoopAction::Apply(Command::ReplicateTower {
                tower: id,
                kind: config_id,
                position: viewport.denormalize(NormalizedPoint { nx, ny }),
            })),
            Message::StartWave { wave_index, .. } if self.role() == Role::Client => {
                Some(CoopAction::WaveAnnounced(wave_index))
            }
            Message::SyncRequest { .. } => Some(CoopAction::ShareState),
            Message::SyncData { state, .. } => Some(CoopAction::Apply(Command::Overwrite {
                snapshot: state,
                scope: OverwriteScope::Peer,
            })),
            Message::VoteSurrenderRequest { .. } => self.ballot(Ballot::Request),
            Message::VoteSurrenderAccept { .. } => self.ballot(Ballot::Accept),
            Message::VoteSurrenderDeny { .. } => self.ballot(Ballot::Deny),
            other => {
                debug!(origin = ?other.origin(), "message not handled in match");
                None
            }
        }
    }

    /// Proposes to surrender, if no vote is running.
    pub fn request_surrender(&mut self) -> Option<Outbound> {
        self.vote.request().map(|ballot| self.cast(ballot))
    }

    /// Answers the peer's surrender proposal.
    pub fn answer_surrender(&mut self, agree: bool) -> Option<Outbound> {
        self.vote.respond(agree).map(|ballot| self.cast(ballot))
    }

    fn ballot(&mut self, ballot: Ballot) -> Option<CoopAction> {
        self.vote.receive(ballot).map(CoopAction::Surrender)
    }

    fn cast(&self, ballot: Ballot) -> Outbound {
        let role = self.role();
        self.publish(match ballot {
            Ballot::Request => Message::VoteSurrenderRequest { role },
            Ballot::Accept => Message::VoteSurrenderAccept { role },
            Ballot::Deny => Message::VoteSurrenderDeny { role },
        })
    }

    fn publish(&self, message: Message) -> Outbound {
        Outbound::now(self.descriptor.match_topic.clone(), message)
    }
}
