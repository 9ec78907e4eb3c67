//! Account data kept next to the snapshots.

use anyhow::{Context, Result};
use brain_defense_session::LocalProfile;
use brain_defense_storage::KeyValueStore;
use brain_defense_system_sync::{topics::sanitize, Mailbox, Topics};
use serde::{Deserialize, Serialize};
use tracing::warn;

const FRIENDS_KEY: &str = "bd_friends";

/// Friends and unanswered requests of the local player.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct FriendBook {
    #[serde(default)]
    pub(crate) friends: Vec<String>,
    #[serde(default)]
    pub(crate) requests: Vec<String>,
}

impl FriendBook {
    pub(crate) fn mailbox(&self, me: &str, topics: Topics) -> Mailbox {
        Mailbox::new(me, topics, self.friends.clone(), self.requests.clone())
    }

    pub(crate) fn from_mailbox(mailbox: &Mailbox) -> Self {
        Self {
            friends: mailbox.friends().to_vec(),
            requests: mailbox.requests().to_vec(),
        }
    }
}

/// Typed access to the profile and friend book of one player.
#[derive(Debug)]
pub(crate) struct Accounts<S> {
    store: S,
    player: String,
}

impl<S: KeyValueStore> Accounts<S> {
    pub(crate) fn new(store: S, player: &str) -> Self {
        Self {
            store,
            player: sanitize(player),
        }
    }

    pub(crate) fn player(&self) -> &str {
        &self.player
    }

    fn profile_key(&self) -> String {
        format!("bd_profile_{}", self.player)
    }

    /// Loads the profile, starting a fresh one when none is stored or it is unreadable.
    pub(crate) fn profile(&self) -> LocalProfile {
        self.read(&self.profile_key())
            .map_or_else(|| LocalProfile::new(self.player.clone()), LocalProfile::normalized)
    }

    pub(crate) fn save_profile(&self, profile: &LocalProfile) -> Result<()> {
        self.write(&self.profile_key(), profile)
    }

    pub(crate) fn friends(&self) -> FriendBook {
        self.read(FRIENDS_KEY).unwrap_or_default()
    }

    pub(crate) fn save_friends(&self, book: &FriendBook) -> Result<()> {
        self.write(FRIENDS_KEY, book)
    }

    fn read<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(error) => {
                warn!(key, %error, "failed to read account data");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(key, %error, "ignoring unreadable account data");
                None
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let encoded =
            serde_json::to_string_pretty(value).with_context(|| format!("failed to encode {key}"))?;
        self.store
            .put(key, &encoded)
            .with_context(|| format!("failed to store {key}"))
    }
}

#[cfg(test)]
mod tests {
    use brain_defense_core::TowerKind;
    use brain_defense_session::Progression;
    use brain_defense_storage::MemoryStore;

    use super::*;

    #[test]
    fn missing_profile_starts_fresh() {
        let accounts = Accounts::new(MemoryStore::default(), "amy");
        let profile = accounts.profile();

        assert_eq!(accounts.player(), "AMY");
        assert_eq!(profile.player_id(), "AMY");
        assert_eq!(profile.equipped_towers(), [TowerKind::BonecaAmbalabu]);
    }

    #[test]
    fn saved_profile_is_read_back() {
        let accounts = Accounts::new(MemoryStore::default(), "AMY");
        let mut profile = LocalProfile::new("AMY")
            .with_balance(45)
            .with_unlocked(TowerKind::Wifirmino);
        profile.equip(&[TowerKind::Wifirmino]);
        accounts.save_profile(&profile).expect("memory store");

        assert_eq!(accounts.profile(), profile);
    }

    #[test]
    fn corrupt_profile_falls_back_to_a_fresh_one() {
        let store = MemoryStore::default();
        store.put("bd_profile_AMY", "{not json").expect("memory store");
        let accounts = Accounts::new(store, "AMY");

        assert_eq!(accounts.profile(), LocalProfile::new("AMY"));
    }

    #[test]
    fn friend_book_follows_the_mailbox() {
        let accounts = Accounts::new(MemoryStore::default(), "AMY");
        let book = FriendBook {
            friends: vec!["ZED".into()],
            requests: vec!["BOB".into()],
        };
        accounts.save_friends(&book).expect("memory store");

        let mut mailbox = accounts.friends().mailbox("AMY", Topics::default());
        let _ = mailbox.accept_request("BOB");

        let updated = FriendBook::from_mailbox(&mailbox);
        assert!(updated.friends.contains(&"BOB".to_owned()));
        assert!(updated.requests.is_empty());
    }
}
