#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure systems that fire projectiles from ready towers and resolve their flight.

mod projectiles;

use std::time::Duration;

use brain_defense_core::{Catalog, Command, TowerId, TowerState, TowerTarget};

pub use projectiles::ProjectileFlight;

/// Tower combat system that queues firing commands for ready towers.
#[derive(Debug, Default)]
pub struct TowerCombat {
    scratch: Vec<Command>,
}

impl TowerCombat {
    /// Creates a new tower combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::FireProjectile` entries for towers ready to fire.
    ///
    /// A tower is ready once the simulated clock `now` is at least its attack
    /// interval past the previous shot.
    pub fn handle(
        &mut self,
        towers: &[TowerState],
        catalog: &Catalog,
        now: Duration,
        tower_targets: &[TowerTarget],
        out: &mut Vec<Command>,
    ) {
        if tower_targets.is_empty() {
            return;
        }

        self.scratch.clear();

        for target in tower_targets {
            let Some(tower) = find_tower(towers, target.tower) else {
                continue;
            };
            let Some(config) = catalog.tower(tower.kind) else {
                continue;
            };
            if tower.is_ready(now, config.attack_interval) {
                self.scratch.push(Command::FireProjectile {
                    tower: target.tower,
                    target: target.enemy,
                });
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

fn find_tower(towers: &[TowerState], id: TowerId) -> Option<&TowerState> {
    towers.iter().find(|tower| tower.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_defense_core::{EnemyId, Point, Role, TowerKind};

    fn tower(serial: u32, last_shot: Option<Duration>) -> TowerState {
        TowerState {
            id: TowerId::new(Role::Host, serial),
            kind: TowerKind::Wifirmino,
            position: Point::default(),
            last_shot,
        }
    }

    fn target(serial: u32, ordinal: u32) -> TowerTarget {
        TowerTarget {
            tower: TowerId::new(Role::Host, serial),
            enemy: EnemyId::new(0, ordinal, 0),
        }
    }

    #[test]
    fn firing_respects_cooldown_readiness() {
        let mut system = TowerCombat::new();
        let towers = [
            tower(0, None),
            tower(1, Some(Duration::from_millis(500))),
            tower(2, Some(Duration::ZERO)),
        ];
        let targets = [target(0, 4), target(1, 4), target(2, 1)];
        let mut out = Vec::new();

        system.handle(
            &towers,
            &Catalog::standard(),
            Duration::from_millis(1_000),
            &targets,
            &mut out,
        );

        assert_eq!(
            out,
            vec![
                Command::FireProjectile {
                    tower: TowerId::new(Role::Host, 0),
                    target: EnemyId::new(0, 4, 0),
                },
                Command::FireProjectile {
                    tower: TowerId::new(Role::Host, 2),
                    target: EnemyId::new(0, 1, 0),
                },
            ]
        );
    }

    #[test]
    fn unknown_towers_are_skipped() {
        let mut system = TowerCombat::new();
        let mut out = Vec::new();

        system.handle(
            &[],
            &Catalog::standard(),
            Duration::ZERO,
            &[target(9, 0)],
            &mut out,
        );

        assert!(out.is_empty());
    }
}
