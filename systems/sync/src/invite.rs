//! Friend-invite handshake on a dedicated match topic.
//!
//! The host drops a `GAME_INVITE` into the friend's mailbox and waits on the
//! match topic. The guest answers with `MATCH_ACCEPT` (carrying its completed
//! levels) or `MATCH_REJECT`. Once accepted, the host picks a level both
//! players have unlocked and publishes `HOST_START_CONFIRM` twice, one second
//! apart, so a single lost publication does not strand the guest.

use std::time::Duration;

use brain_defense_core::{is_level_unlocked, CoopDescriptor, Role};
use thiserror::Error;
use tracing::info;

use crate::matchmaking::{MatchEntropy, MatchFound};
use crate::message::{Message, Outbound};
use crate::topics::Topics;

/// Delay before the start confirmation is published a second time.
pub const CONFIRM_RESEND_DELAY: Duration = Duration::from_secs(1);

/// Reasons a host cannot start the invited match.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum InviteError {
    /// The guest has not accepted yet.
    #[error("the invited player has not accepted yet")]
    NotAccepted,
    /// The guest declined the invitation.
    #[error("the invited player declined")]
    Declined,
    /// The host has not unlocked the level.
    #[error("level {0} is locked for you")]
    LockedForHost(u32),
    /// The guest has not unlocked the level.
    #[error("level {0} is locked for your friend")]
    LockedForGuest(u32),
    /// A start confirmation was already sent.
    #[error("the match already started")]
    AlreadyStarted,
}

/// Progress of the host side of an invitation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostState {
    /// Waiting for the guest's answer.
    Waiting,
    /// The guest accepted and reported its completed levels.
    Accepted {
        /// Levels completed by the guest.
        guest_completed: Vec<u32>,
    },
    /// The guest declined.
    Declined,
    /// The host confirmed a level.
    Started,
}

/// Host side of a friend invitation.
#[derive(Debug)]
pub struct InviteHost {
    friend: String,
    match_topic: String,
    seed: u64,
    state: HostState,
}

impl InviteHost {
    /// Creates the invitation and the mailbox message delivering it.
    #[must_use]
    pub fn invite(
        me: &str,
        friend: &str,
        topics: &Topics,
        entropy: MatchEntropy,
    ) -> (Self, Outbound) {
        let match_topic = topics.match_topic(me, friend, entropy.nonce);
        let invite = Outbound::now(
            topics.mailbox(friend),
            Message::GameInvite {
                sender: me.to_owned(),
                match_id: match_topic.clone(),
                level: 1,
            },
        );
        let host = Self {
            friend: friend.to_owned(),
            match_topic,
            seed: entropy.seed,
            state: HostState::Waiting,
        };
        (host, invite)
    }

    /// Topic the host listens on.
    #[must_use]
    pub fn match_topic(&self) -> &str {
        &self.match_topic
    }

    /// Current progress.
    #[must_use]
    pub const fn state(&self) -> &HostState {
        &self.state
    }

    /// Processes a message from the match topic, returning whether the state changed.
    pub fn receive(&mut self, message: &Message) -> bool {
        if self.state != HostState::Waiting {
            return false;
        }
        match message {
            Message::MatchAccept {
                completed_levels, ..
            } => {
                info!(friend = %self.friend, "invitation accepted");
                self.state = HostState::Accepted {
                    guest_completed: completed_levels.clone(),
                };
                true
            }
            Message::MatchReject { .. } => {
                info!(friend = %self.friend, "invitation declined");
                self.state = HostState::Declined;
                true
            }
            _ => false,
        }
    }

    /// Reports whether `level` may be chosen given both players' progress.
    pub fn check_level(&self, level: u32, host_completed: &[u32]) -> Result<(), InviteError> {
        let guest_completed = match &self.state {
            HostState::Waiting => return Err(InviteError::NotAccepted),
            HostState::Declined => return Err(InviteError::Declined),
            HostState::Started => return Err(InviteError::AlreadyStarted),
            HostState::Accepted { guest_completed } => guest_completed,
        };
        if !is_level_unlocked(level, host_completed) {
            return Err(InviteError::LockedForHost(level));
        }
        if !is_level_unlocked(level, guest_completed) {
            return Err(InviteError::LockedForGuest(level));
        }
        Ok(())
    }

    /// Commits to `level`, emitting the start confirmation and its resend.
    pub fn start(
        &mut self,
        level: u32,
        host_completed: &[u32],
        out: &mut Vec<Outbound>,
    ) -> Result<MatchFound, InviteError> {
        self.check_level(level, host_completed)?;
        let confirm = Message::HostStartConfirm {
            seed: self.seed,
            level,
        };
        out.push(Outbound::now(self.match_topic.clone(), confirm.clone()));
        out.push(Outbound::after(
            self.match_topic.clone(),
            confirm,
            CONFIRM_RESEND_DELAY,
        ));
        self.state = HostState::Started;
        Ok(MatchFound {
            level,
            descriptor: CoopDescriptor {
                match_topic: self.match_topic.clone(),
                role: Role::Host,
                seed: self.seed,
                peer: Some(self.friend.clone()),
            },
        })
    }
}

/// Invitation received through the mailbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingInvite {
    /// Inviting player.
    pub sender: String,
    /// Topic of the proposed match.
    pub match_topic: String,
    /// Suggested level.
    pub level: u32,
}

/// Guest side of a friend invitation, waiting for the host to start.
#[derive(Debug)]
pub struct InviteGuest {
    invite: PendingInvite,
    started: bool,
}

impl InviteGuest {
    /// Accepts `invite`, returning the guest and the acceptance message.
    #[must_use]
    pub fn accept(me: &str, invite: PendingInvite, completed_levels: &[u32]) -> (Self, Outbound) {
        let accept = Outbound::now(
            invite.match_topic.clone(),
            Message::MatchAccept {
                sender: me.to_owned(),
                level: invite.level,
                completed_levels: completed_levels.to_vec(),
            },
        );
        (
            Self {
                invite,
                started: false,
            },
            accept,
        )
    }

    /// Message declining `invite`.
    #[must_use]
    pub fn decline(me: &str, invite: &PendingInvite) -> Outbound {
        Outbound::now(
            invite.match_topic.clone(),
            Message::MatchReject {
                sender: me.to_owned(),
            },
        )
    }

    /// Topic the guest listens on.
    #[must_use]
    pub fn match_topic(&self) -> &str {
        &self.invite.match_topic
    }

    /// Processes a message from the match topic; the first confirmation starts the match.
    pub fn receive(&mut self, message: &Message) -> Option<MatchFound> {
        let Message::HostStartConfirm { seed, level } = message else {
            return None;
        };
        if self.started {
            return None;
        }
        self.started = true;
        info!(host = %self.invite.sender, level = *level, "host confirmed start");
        Some(MatchFound {
            level: *level,
            descriptor: CoopDescriptor {
                match_topic: self.invite.match_topic.clone(),
                role: Role::Client,
                seed: *seed,
                peer: Some(self.invite.sender.clone()),
            },
        })
    }
}
