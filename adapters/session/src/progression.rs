//! Account-level progression consulted when a match starts and settled when it ends.

use brain_defense_core::TowerKind;
use serde::{Deserialize, Serialize};

/// Maximum number of towers a player may take into a match.
pub const MAX_EQUIPPED: usize = 5;

/// Account state owned outside the match.
pub trait Progression {
    /// Stable identifier addressing the player's mailbox and chats.
    fn player_id(&self) -> &str;

    /// Account currency balance.
    fn balance(&self) -> u32;

    /// Towers the player owns.
    fn unlocked_towers(&self) -> &[TowerKind];

    /// Towers taken into matches, at most [`MAX_EQUIPPED`].
    fn equipped_towers(&self) -> &[TowerKind];

    /// Levels finished so far.
    fn completed_levels(&self) -> &[u32];

    /// Deducts `amount` if affordable, returning whether it was.
    fn spend(&mut self, amount: u32) -> bool;

    /// Adds `amount` to the balance.
    fn credit(&mut self, amount: u32);

    /// Records `level` as finished.
    fn mark_level_complete(&mut self, level: u32);
}

/// Progression kept in a local profile file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalProfile {
    player_id: String,
    #[serde(default)]
    balance: u32,
    #[serde(default = "starter_towers")]
    unlocked: Vec<TowerKind>,
    #[serde(default)]
    equipped: Vec<TowerKind>,
    #[serde(default)]
    completed_levels: Vec<u32>,
}

fn starter_towers() -> Vec<TowerKind> {
    vec![TowerKind::BonecaAmbalabu]
}

impl LocalProfile {
    /// Fresh profile owning and equipping the starter tower.
    #[must_use]
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            balance: 0,
            unlocked: starter_towers(),
            equipped: starter_towers(),
            completed_levels: Vec::new(),
        }
    }

    /// Overrides the balance.
    #[must_use]
    pub fn with_balance(mut self, balance: u32) -> Self {
        self.balance = balance;
        self
    }

    /// Unlocks `kind`.
    #[must_use]
    pub fn with_unlocked(mut self, kind: TowerKind) -> Self {
        if !self.unlocked.contains(&kind) {
            self.unlocked.push(kind);
        }
        self
    }

    /// Overrides the completed levels.
    #[must_use]
    pub fn with_completed_levels(mut self, levels: Vec<u32>) -> Self {
        self.completed_levels = levels;
        self
    }

    /// Replaces the loadout, keeping only unlocked towers and at most [`MAX_EQUIPPED`].
    pub fn equip(&mut self, loadout: &[TowerKind]) {
        self.equipped = loadout
            .iter()
            .copied()
            .filter(|kind| self.unlocked.contains(kind))
            .take(MAX_EQUIPPED)
            .collect();
    }

    /// Repairs a profile read from disk: the starter tower is always owned and
    /// an empty loadout falls back to the first unlocked towers.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.unlocked.is_empty() {
            self.unlocked = starter_towers();
        }
        self.equipped.retain(|kind| self.unlocked.contains(kind));
        self.equipped.truncate(MAX_EQUIPPED);
        if self.equipped.is_empty() {
            self.equipped = self.unlocked.iter().copied().take(MAX_EQUIPPED).collect();
        }
        self
    }
}

impl Progression for LocalProfile {
    fn player_id(&self) -> &str {
        &self.player_id
    }

    fn balance(&self) -> u32 {
        self.balance
    }

    fn unlocked_towers(&self) -> &[TowerKind] {
        &self.unlocked
    }

    fn equipped_towers(&self) -> &[TowerKind] {
        &self.equipped
    }

    fn completed_levels(&self) -> &[u32] {
        &self.completed_levels
    }

    fn spend(&mut self, amount: u32) -> bool {
        match self.balance.checked_sub(amount) {
            Some(rest) => {
                self.balance = rest;
                true
            }
            None => false,
        }
    }

    fn credit(&mut self, amount: u32) {
        self.balance = self.balance.saturating_add(amount);
    }

    fn mark_level_complete(&mut self, level: u32) {
        if !self.completed_levels.contains(&level) {
            self.completed_levels.push(level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spending_never_goes_negative() {
        let mut profile = LocalProfile::new("ANA").with_balance(30);
        assert!(!profile.spend(31));
        assert_eq!(profile.balance(), 30);
        assert!(profile.spend(30));
        assert_eq!(profile.balance(), 0);
    }

    #[test]
    fn loadout_is_capped_and_limited_to_unlocked_towers() {
        let mut profile = TowerKind::ALL
            .iter()
            .fold(LocalProfile::new("ANA"), |profile, kind| profile.with_unlocked(*kind));
        profile.equip(TowerKind::ALL);
        assert_eq!(profile.equipped_towers().len(), MAX_EQUIPPED);

        let mut fresh = LocalProfile::new("BO");
        fresh.equip(&[TowerKind::Trulimero, TowerKind::BonecaAmbalabu]);
        assert_eq!(fresh.equipped_towers(), [TowerKind::BonecaAmbalabu]);
    }

    #[test]
    fn levels_are_recorded_once() {
        let mut profile = LocalProfile::new("ANA");
        profile.mark_level_complete(1);
        profile.mark_level_complete(1);
        assert_eq!(profile.completed_levels(), [1]);
    }

    #[test]
    fn sparse_profiles_are_repaired() {
        let profile: LocalProfile =
            serde_json::from_str(r#"{"playerId":"ANA","equipped":[]}"#).expect("decode");
        let profile = profile.normalized();
        assert_eq!(profile.unlocked_towers(), [TowerKind::BonecaAmbalabu]);
        assert_eq!(profile.equipped_towers(), [TowerKind::BonecaAmbalabu]);
        assert_eq!(profile.balance(), 0);
    }
}
