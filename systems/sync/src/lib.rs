#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cooperative sync protocol over an unreliable publish/subscribe bus.
//!
//! Components here are pure state machines: they consume decoded
//! [`Message`] values and produce [`Outbound`] publications, leaving the
//! transport, timers, and world mutation to the session that owns them. The
//! bus may drop, duplicate, delay, or reorder anything, so every handler is
//! idempotent and every progress-gating message is either resent or covered
//! by the polling fallback, whose replays [`SeenMessages`] filters out.

mod chat;
mod coop;
mod dedup;
mod invite;
mod mailbox;
mod matchmaking;
mod message;
mod surrender;
pub mod topics;

pub use chat::Conversation;
pub use coop::{CoopAction, CoopSync, ANNOUNCE_RESEND_DELAY};
pub use dedup::{SeenMessages, DEFAULT_CAPACITY};
pub use invite::{
    HostState, InviteError, InviteGuest, InviteHost, PendingInvite, CONFIRM_RESEND_DELAY,
};
pub use mailbox::{Mailbox, MailboxNotice};
pub use matchmaking::{tie_break, MatchEntropy, MatchFound, Matchmaker, BEACON_INTERVAL};
pub use message::{ChatLine, Message, Origin, Outbound, Payload};
pub use surrender::{Ballot, SurrenderVote, VoteSignal, VoteState};
pub use topics::Topics;
