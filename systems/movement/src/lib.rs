#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Movement system that walks enemies along the path and detects leaks.

use brain_defense_core::{Catalog, Command, EnemyState, Event, Path, Viewport};

/// Immutable inputs the movement system reads each tick.
#[derive(Clone, Copy, Debug)]
pub struct PathView<'a> {
    /// Path enemies follow.
    pub path: &'a Path,
    /// Viewport the path is resolved against.
    pub viewport: Viewport,
    /// Enemy records providing per-kind speed.
    pub catalog: &'a Catalog,
}

/// Pure system that reacts to world ticks and emits movement commands.
#[derive(Debug, Default)]
pub struct Movement;

impl Movement {
    /// Creates a new movement system.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Consumes world events and the live enemies to emit movement commands.
    ///
    /// Enemies within one step of their next waypoint snap onto it so corners
    /// never overshoot. Snapping onto the exit waypoint produces a leak
    /// instead of a move.
    pub fn handle(
        &mut self,
        events: &[Event],
        enemies: &[EnemyState],
        view: PathView<'_>,
        out: &mut Vec<Command>,
    ) {
        if !events
            .iter()
            .any(|event| matches!(event, Event::TimeAdvanced { .. }))
        {
            return;
        }

        let final_index = view.path.final_index();
        for enemy in enemies.iter().filter(|enemy| enemy.is_alive()) {
            let Some(config) = view.catalog.enemy(enemy.kind) else {
                continue;
            };
            let Some(next) = view.path.waypoint(enemy.path_index + 1, view.viewport) else {
                continue;
            };

            if enemy.position.distance(next) <= config.speed {
                let path_index = enemy.path_index + 1;
                if path_index >= final_index {
                    out.push(Command::LeakEnemy { enemy: enemy.id });
                } else {
                    out.push(Command::MoveEnemy {
                        enemy: enemy.id,
                        position: next,
                        path_index,
                    });
                }
            } else {
                out.push(Command::MoveEnemy {
                    enemy: enemy.id,
                    position: enemy.position.step_towards(next, config.speed),
                    path_index: enemy.path_index,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use brain_defense_core::{EnemyId, EnemyKind, Point};

    use super::*;

    fn enemy(position: Point, path_index: usize) -> EnemyState {
        EnemyState {
            id: EnemyId::new(0, 0, 0),
            kind: EnemyKind::Noobini,
            position,
            path_index,
            hp: 5,
            max_hp: 5,
            frozen: false,
        }
    }

    fn tick() -> Event {
        Event::TimeAdvanced {
            dt: Duration::from_millis(16),
            tick: 1,
        }
    }

    #[test]
    fn snaps_to_waypoint_within_one_step() {
        let path = Path::standard();
        let catalog = Catalog::standard();
        let viewport = Viewport::new(100.0, 100.0);
        let view = PathView {
            path: &path,
            viewport,
            catalog: &catalog,
        };
        let mut commands = Vec::new();

        Movement::new().handle(
            &[tick()],
            &[enemy(Point::new(19.0, 15.0), 0)],
            view,
            &mut commands,
        );

        assert_eq!(
            commands,
            vec![Command::MoveEnemy {
                enemy: EnemyId::new(0, 0, 0),
                position: Point::new(20.0, 15.0),
                path_index: 1,
            }]
        );
    }

    #[test]
    fn dead_enemies_are_left_alone() {
        let path = Path::standard();
        let catalog = Catalog::standard();
        let view = PathView {
            path: &path,
            viewport: Viewport::default(),
            catalog: &catalog,
        };
        let mut dead = enemy(Point::new(0.0, 90.0), 0);
        dead.hp = 0;
        let mut commands = Vec::new();

        Movement::new().handle(&[tick()], &[dead], view, &mut commands);

        assert!(commands.is_empty());
    }
}
