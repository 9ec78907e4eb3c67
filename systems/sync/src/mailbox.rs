//! Personal inbox carrying friend requests and game invitations.

use tracing::debug;

use crate::invite::PendingInvite;
use crate::message::{Message, Outbound};
use crate::topics::Topics;

/// Something the player should be told about after a mailbox message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MailboxNotice {
    /// A new friend request arrived.
    FriendRequest(String),
    /// A request the player sent was accepted.
    FriendAccepted(String),
    /// A request the player sent was declined.
    FriendRejected(String),
    /// A friend invited the player to a match.
    GameInvite(PendingInvite),
}

/// Friend list, pending requests, and the latest invitation.
#[derive(Debug)]
pub struct Mailbox {
    me: String,
    topics: Topics,
    friends: Vec<String>,
    requests: Vec<String>,
    invite: Option<PendingInvite>,
}

impl Mailbox {
    /// Creates a mailbox for `me` seeded with persisted friends and requests.
    #[must_use]
    pub fn new(me: impl Into<String>, topics: Topics, friends: Vec<String>, requests: Vec<String>) -> Self {
        Self {
            me: me.into(),
            topics,
            friends,
            requests,
            invite: None,
        }
    }

    /// Topic this mailbox listens on.
    #[must_use]
    pub fn topic(&self) -> String {
        self.topics.mailbox(&self.me)
    }

    /// Confirmed friends.
    #[must_use]
    pub fn friends(&self) -> &[String] {
        &self.friends
    }

    /// Requests awaiting an answer.
    #[must_use]
    pub fn requests(&self) -> &[String] {
        &self.requests
    }

    /// Invitation awaiting an answer.
    #[must_use]
    pub fn pending_invite(&self) -> Option<&PendingInvite> {
        self.invite.as_ref()
    }

    /// Removes and returns the pending invitation.
    pub fn take_invite(&mut self) -> Option<PendingInvite> {
        self.invite.take()
    }

    /// Processes a mailbox message. Replays produce no second notice.
    pub fn receive(&mut self, message: &Message) -> Option<MailboxNotice> {
        if message.is_from_player(&self.me) {
            return None;
        }
        match message {
            Message::FriendRequest { sender } => {
                if self.friends.contains(sender) || self.requests.contains(sender) {
                    return None;
                }
                self.requests.push(sender.clone());
                Some(MailboxNotice::FriendRequest(sender.clone()))
            }
            Message::FriendAccepted { sender } => {
                if self.friends.contains(sender) {
                    return None;
                }
                self.friends.push(sender.clone());
                Some(MailboxNotice::FriendAccepted(sender.clone()))
            }
            Message::FriendRejected { sender } => {
                Some(MailboxNotice::FriendRejected(sender.clone()))
            }
            Message::GameInvite {
                sender,
                match_id,
                level,
            } => {
                if self
                    .invite
                    .as_ref()
                    .is_some_and(|invite| invite.match_topic == *match_id)
                {
                    return None;
                }
                let invite = PendingInvite {
                    sender: sender.clone(),
                    match_topic: match_id.clone(),
                    level: *level,
                };
                self.invite = Some(invite.clone());
                Some(MailboxNotice::GameInvite(invite))
            }
            other => {
                debug!(message = ?other.origin(), "unexpected mailbox message");
                None
            }
        }
    }

    /// Message delivering a friend request to `target`.
    #[must_use]
    pub fn send_request(&self, target: &str) -> Outbound {
        Outbound::now(
            self.topics.mailbox(target),
            Message::FriendRequest {
                sender: self.me.clone(),
            },
        )
    }

    /// Accepts the request from `sender`, befriending them.
    pub fn accept_request(&mut self, sender: &str) -> Outbound {
        self.requests.retain(|id| id != sender);
        if !self.friends.iter().any(|id| id == sender) {
            self.friends.push(sender.to_owned());
        }
        Outbound::now(
            self.topics.mailbox(sender),
            Message::FriendAccepted {
                sender: self.me.clone(),
            },
        )
    }

    /// Declines the request from `sender`.
    pub fn reject_request(&mut self, sender: &str) -> Outbound {
        self.requests.retain(|id| id != sender);
        Outbound::now(
            self.topics.mailbox(sender),
            Message::FriendRejected {
                sender: self.me.clone(),
            },
        )
    }

    /// Drops `friend` from the friend list.
    pub fn remove_friend(&mut self, friend: &str) {
        self.friends.retain(|id| id != friend);
    }
}
