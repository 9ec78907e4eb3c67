#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Durable local state: periodic match snapshots and the active-session record.
//!
//! Snapshots exist purely for crash and reload recovery. Anything unreadable
//! is logged, cleared, and reported as absent so the caller falls back to a
//! fresh match.

mod store;

use brain_defense_core::{CoopDescriptor, MatchSnapshot};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub use store::{FileStore, KeyValueStore, MemoryStore};

/// Key of the periodic match snapshot.
pub const SNAPSHOT_KEY: &str = "bd_game_snapshot";

/// Key of the active-session record.
pub const SESSION_KEY: &str = "bd_active_session";

/// Ticks between automatic snapshots.
pub const AUTOSAVE_INTERVAL_TICKS: u64 = 60;

/// Failures of the underlying store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing a key failed.
    #[error("storage key {key} is inaccessible")]
    Io {
        /// Key being accessed.
        key: String,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// A value could not be encoded.
    #[error("failed to encode {key}")]
    Encode {
        /// Key being written.
        key: String,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Record of the level being played, used to resume an interrupted session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    /// Index of the stage in the campaign.
    pub stage_index: usize,
    /// Cooperative match descriptor, absent in single-player.
    pub multiplayer: Option<CoopDescriptor>,
}

impl ActiveSession {
    /// Reports whether the session is a cooperative match.
    #[must_use]
    pub const fn is_multiplayer(&self) -> bool {
        self.multiplayer.is_some()
    }
}

/// Cadence of automatic snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Autosave {
    interval_ticks: u64,
}

impl Default for Autosave {
    fn default() -> Self {
        Self::new(AUTOSAVE_INTERVAL_TICKS)
    }
}

impl Autosave {
    /// Saves every `interval_ticks` ticks.
    #[must_use]
    pub const fn new(interval_ticks: u64) -> Self {
        Self { interval_ticks }
    }

    /// Reports whether a snapshot is due at `tick`.
    #[must_use]
    pub const fn is_due(&self, tick: u64) -> bool {
        self.interval_ticks > 0 && tick > 0 && tick % self.interval_ticks == 0
    }
}

/// Typed access to snapshots and session records on top of a [`KeyValueStore`].
#[derive(Debug)]
pub struct SnapshotVault<S> {
    store: S,
}

impl<S: KeyValueStore> SnapshotVault<S> {
    /// Wraps `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Persists `snapshot`, replacing the previous one.
    pub fn save_snapshot(&self, snapshot: &MatchSnapshot) -> Result<(), StorageError> {
        self.write(SNAPSHOT_KEY, snapshot)
    }

    /// Loads the snapshot; missing or corrupt data yields `None`.
    #[must_use]
    pub fn load_snapshot(&self) -> Option<MatchSnapshot> {
        self.read(SNAPSHOT_KEY)
    }

    /// Records the session being started.
    ///
    /// A snapshot left behind by a different session is dropped first so it
    /// can never be resumed under the new record.
    pub fn begin_session(&self, session: &ActiveSession) -> Result<(), StorageError> {
        if self.active_session().as_ref() != Some(session) {
            self.store.remove(SNAPSHOT_KEY)?;
        }
        self.write(SESSION_KEY, session)
    }

    /// Loads the active-session record; missing or corrupt data yields `None`.
    #[must_use]
    pub fn active_session(&self) -> Option<ActiveSession> {
        self.read(SESSION_KEY)
    }

    /// Snapshot to resume when `session` matches the recorded active session.
    #[must_use]
    pub fn resume(&self, session: &ActiveSession) -> Option<MatchSnapshot> {
        if self.active_session().as_ref() != Some(session) {
            return None;
        }
        self.load_snapshot()
    }

    /// Clears the session record and its snapshot after a win, loss, or exit.
    pub fn end_session(&self) -> Result<(), StorageError> {
        self.store.remove(SNAPSHOT_KEY)?;
        self.store.remove(SESSION_KEY)
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: key.to_owned(),
            source,
        })?;
        self.store.put(key, &encoded)?;
        debug!(key, bytes = encoded.len(), "stored");
        Ok(())
    }

    fn read<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(error) => {
                warn!(key, %error, "storage read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(key, %error, "discarding corrupt record");
                if let Err(error) = self.store.remove(key) {
                    warn!(key, %error, "failed to clear corrupt record");
                }
                None
            }
        }
    }
}
