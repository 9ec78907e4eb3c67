//! Authoritative tower state management utilities.

use brain_defense_core::{Role, TowerId, TowerState};

/// Registry that stores towers in placement order and allocates local ids.
#[derive(Debug)]
pub(crate) struct TowerRegistry {
    entries: Vec<TowerState>,
    local_role: Role,
    next_serial: u32,
}

impl TowerRegistry {
    /// Creates an empty registry that allocates identifiers for `local_role`.
    pub(crate) fn new(local_role: Role) -> Self {
        Self {
            entries: Vec::new(),
            local_role,
            next_serial: 0,
        }
    }

    /// Reserves the next identifier owned by the local participant.
    pub(crate) fn allocate(&mut self) -> TowerId {
        let id = TowerId::new(self.local_role, self.next_serial);
        self.next_serial = self.next_serial.saturating_add(1);
        id
    }

    /// Inserts a tower unless one with the same identifier already exists.
    pub(crate) fn insert(&mut self, tower: TowerState) -> bool {
        if self.contains(tower.id) {
            return false;
        }
        self.observe(tower.id);
        self.entries.push(tower);
        true
    }

    pub(crate) fn contains(&self, id: TowerId) -> bool {
        self.entries.iter().any(|tower| tower.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: TowerId) -> Option<&mut TowerState> {
        self.entries.iter_mut().find(|tower| tower.id == id)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut TowerState> {
        self.entries.iter_mut()
    }

    pub(crate) fn as_slice(&self) -> &[TowerState] {
        &self.entries
    }

    /// Replaces every tower and re-derives the local identifier counter.
    pub(crate) fn replace_all(&mut self, towers: Vec<TowerState>) {
        self.entries.clear();
        self.next_serial = 0;
        for tower in towers {
            let _ = self.insert(tower);
        }
    }

    fn observe(&mut self, id: TowerId) {
        if id.owner == self.local_role && id.serial >= self.next_serial {
            self.next_serial = id.serial.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_defense_core::{Point, TowerKind};

    fn tower(owner: Role, serial: u32) -> TowerState {
        TowerState {
            id: TowerId::new(owner, serial),
            kind: TowerKind::TrippiCat,
            position: Point::new(10.0, 10.0),
            last_shot: None,
        }
    }

    #[test]
    fn allocation_counts_up_for_local_role() {
        let mut registry = TowerRegistry::new(Role::Client);
        assert_eq!(registry.allocate(), TowerId::new(Role::Client, 0));
        assert_eq!(registry.allocate(), TowerId::new(Role::Client, 1));
    }

    #[test]
    fn duplicate_identifiers_are_refused() {
        let mut registry = TowerRegistry::new(Role::Host);
        assert!(registry.insert(tower(Role::Client, 3)));
        assert!(!registry.insert(tower(Role::Client, 3)));
        assert_eq!(registry.as_slice().len(), 1);
    }

    #[test]
    fn replacing_towers_skips_past_existing_local_serials() {
        let mut registry = TowerRegistry::new(Role::Host);
        registry.replace_all(vec![tower(Role::Host, 4), tower(Role::Client, 9)]);
        assert_eq!(registry.allocate(), TowerId::new(Role::Host, 5));
    }
}
