#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that assigns each tower the first live enemy within range.
//!
//! Candidates are scanned in spawn order, so the oldest enemy inside a
//! tower's radius wins. No nearest-first or health-based priority applies.

use brain_defense_core::{Catalog, EnemyId, EnemyState, Point, TowerState, TowerTarget};

#[derive(Clone, Copy, Debug)]
struct EnemyCandidate {
    id: EnemyId,
    position: Point,
}

/// Tower targeting system that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    enemy_workspace: Vec<EnemyCandidate>,
}

impl TowerTargeting {
    /// Creates a new tower targeting system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes tower targets for the provided entity records.
    ///
    /// The output buffer is cleared before populating it with the latest
    /// assignments. Towers whose kind has no catalog record are skipped.
    pub fn handle(
        &mut self,
        towers: &[TowerState],
        enemies: &[EnemyState],
        catalog: &Catalog,
        out: &mut Vec<TowerTarget>,
    ) {
        out.clear();
        if towers.is_empty() {
            return;
        }

        self.prepare_enemy_workspace(enemies);
        if self.enemy_workspace.is_empty() {
            return;
        }

        for tower in towers {
            let Some(config) = catalog.tower(tower.kind) else {
                continue;
            };
            let first = self
                .enemy_workspace
                .iter()
                .find(|candidate| tower.position.distance(candidate.position) <= config.range);
            if let Some(candidate) = first {
                out.push(TowerTarget {
                    tower: tower.id,
                    enemy: candidate.id,
                });
            }
        }
    }

    fn prepare_enemy_workspace(&mut self, enemies: &[EnemyState]) {
        self.enemy_workspace.clear();
        self.enemy_workspace.extend(
            enemies
                .iter()
                .filter(|enemy| enemy.is_alive())
                .map(|enemy| EnemyCandidate {
                    id: enemy.id,
                    position: enemy.position,
                }),
        );
    }
}

#[cfg(test)]
mod tests {
    use brain_defense_core::{EnemyKind, Role, TowerId, TowerKind};

    use super::*;

    fn enemy(ordinal: u32, x: f32, hp: i32) -> EnemyState {
        EnemyState {
            id: EnemyId::new(0, ordinal, 0),
            kind: EnemyKind::Noobini,
            position: Point::new(x, 0.0),
            path_index: 0,
            hp,
            max_hp: 25,
            frozen: false,
        }
    }

    fn tower(serial: u32, x: f32) -> TowerState {
        TowerState {
            id: TowerId::new(Role::Host, serial),
            kind: TowerKind::Wifirmino,
            position: Point::new(x, 0.0),
            last_shot: None,
        }
    }

    #[test]
    fn picks_first_enemy_in_spawn_order() {
        let mut targeting = TowerTargeting::new();
        let enemies = [enemy(0, 110.0, 5), enemy(1, 10.0, 5)];
        let mut out = Vec::new();

        targeting.handle(&[tower(0, 0.0)], &enemies, &Catalog::standard(), &mut out);

        assert_eq!(
            out,
            vec![TowerTarget {
                tower: TowerId::new(Role::Host, 0),
                enemy: EnemyId::new(0, 0, 0),
            }]
        );
    }

    #[test]
    fn range_boundary_is_inclusive() {
        let mut targeting = TowerTargeting::new();
        let mut out = Vec::new();
        let catalog = Catalog::standard();

        targeting.handle(&[tower(0, 0.0)], &[enemy(0, 120.0, 5)], &catalog, &mut out);
        assert_eq!(out.len(), 1);

        targeting.handle(&[tower(0, 0.0)], &[enemy(0, 121.0, 5)], &catalog, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn dead_enemies_are_never_targeted() {
        let mut targeting = TowerTargeting::new();
        let mut out = Vec::new();

        targeting.handle(
            &[tower(0, 0.0)],
            &[enemy(0, 5.0, 0), enemy(1, 6.0, 3)],
            &Catalog::standard(),
            &mut out,
        );

        assert_eq!(out[0].enemy, EnemyId::new(0, 1, 0));
    }
}
