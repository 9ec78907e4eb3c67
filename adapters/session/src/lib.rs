#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Orchestration of a Brain Defense match and the signalling around it.
//!
//! [`Session`] owns the authoritative world together with every pure system
//! and runs them in a fixed order once per frame. Peer messages, placement
//! attempts and autosaves are applied strictly between frames, so the world
//! only ever has one writer. The async drivers in this crate connect a
//! session, a matchmaker, or an invitation to a [`Relay`] and feed it
//! deliveries from both the live stream and the polling fallback.
//!
//! [`Relay`]: brain_defense_relay::Relay

mod driver;
mod lobby;
mod progression;
mod session;
mod transport;

use brain_defense_core::CatalogError;
use brain_defense_system_sync::InviteError;
use thiserror::Error;

pub use driver::{run_match, DriverOptions, POLL_INTERVAL};
pub use lobby::{
    await_invite, fresh_entropy, host_invite, join_invite, search, LobbyOptions,
    LOBBY_HISTORY, MAILBOX_HISTORY,
};
pub use progression::{LocalProfile, Progression, MAX_EQUIPPED};
pub use session::{Conclusion, Notice, Session, SessionOptions};

/// Failures surfaced to the front end.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A match cannot start without at least one equipped tower.
    #[error("equip at least one tower before starting a match")]
    EmptyLoadout,
    /// The stage or loadout referenced something the catalog lacks.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// A friend invitation could not be started.
    #[error(transparent)]
    Invite(#[from] InviteError),
    /// Nothing arrived before the deadline.
    #[error("timed out waiting for {0}")]
    TimedOut(&'static str),
}
