//! Two-party vote to abandon a cooperative match.

use brain_defense_core::Role;

/// Vote message kinds, without their origin tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ballot {
    /// Proposal to surrender.
    Request,
    /// Agreement to surrender.
    Accept,
    /// Refusal to surrender.
    Deny,
}

/// State of the vote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoteState {
    /// No vote is running.
    #[default]
    None,
    /// A vote is waiting for the other participant.
    Requested {
        /// Participant that proposed the surrender.
        initiator: Role,
    },
    /// Both participants agreed; the match is over.
    Accepted,
}

/// What the local player must be shown after a peer ballot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteSignal {
    /// The peer asks to surrender; a blocking prompt is due.
    Prompt,
    /// Both agreed; leave the match.
    Exit,
    /// The peer refused; the local player may ask again later.
    Denied,
}

/// Surrender vote as seen by one participant.
#[derive(Debug)]
pub struct SurrenderVote {
    me: Role,
    state: VoteState,
}

impl SurrenderVote {
    /// Creates an idle vote for the participant playing `me`.
    #[must_use]
    pub const fn new(me: Role) -> Self {
        Self {
            me,
            state: VoteState::None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> VoteState {
        self.state
    }

    /// Starts a vote, returning the ballot to publish.
    pub fn request(&mut self) -> Option<Ballot> {
        if self.state != VoteState::None {
            return None;
        }
        self.state = VoteState::Requested { initiator: self.me };
        Some(Ballot::Request)
    }

    /// Answers the peer's proposal, returning the ballot to publish.
    pub fn respond(&mut self, agree: bool) -> Option<Ballot> {
        if self.state != (VoteState::Requested { initiator: self.me.peer() }) {
            return None;
        }
        if agree {
            self.state = VoteState::Accepted;
            Some(Ballot::Accept)
        } else {
            self.state = VoteState::None;
            Some(Ballot::Deny)
        }
    }

    /// Applies a ballot published by the peer.
    pub fn receive(&mut self, ballot: Ballot) -> Option<VoteSignal> {
        let peer = self.me.peer();
        match (self.state, ballot) {
            (VoteState::None, Ballot::Request) => {
                self.state = VoteState::Requested { initiator: peer };
                Some(VoteSignal::Prompt)
            }
            // Crossing proposals count as mutual agreement.
            (VoteState::Requested { initiator }, Ballot::Request) if initiator == self.me => {
                self.state = VoteState::Accepted;
                Some(VoteSignal::Exit)
            }
            (VoteState::Requested { initiator }, Ballot::Accept) if initiator == self.me => {
                self.state = VoteState::Accepted;
                Some(VoteSignal::Exit)
            }
            (VoteState::Requested { initiator }, Ballot::Deny) if initiator == self.me => {
                self.state = VoteState::None;
                Some(VoteSignal::Denied)
            }
            _ => None,
        }
    }
}
