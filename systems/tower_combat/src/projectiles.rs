//! Homing projectile resolution.

use brain_defense_core::{Command, EnemyState, Event, ProjectileState};

/// Pure system that re-homes projectiles on their target's current position.
///
/// A projectile within one tick of travel of its target impacts; one whose
/// target is gone or already dead is discarded without dealing damage.
#[derive(Debug, Default)]
pub struct ProjectileFlight;

impl ProjectileFlight {
    /// Creates a new projectile flight system.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Emits move, impact, or discard commands for every live projectile.
    pub fn handle(
        &mut self,
        events: &[Event],
        projectiles: &[ProjectileState],
        enemies: &[EnemyState],
        out: &mut Vec<Command>,
    ) {
        if !events
            .iter()
            .any(|event| matches!(event, Event::TimeAdvanced { .. }))
        {
            return;
        }

        for projectile in projectiles.iter().filter(|p| !p.is_consumed()) {
            let target = enemies
                .iter()
                .find(|enemy| enemy.id == projectile.target && enemy.is_alive());
            let Some(target) = target else {
                out.push(Command::DiscardProjectile {
                    projectile: projectile.id,
                });
                continue;
            };

            if projectile.position.distance(target.position) <= projectile.speed {
                out.push(Command::ImpactProjectile {
                    projectile: projectile.id,
                });
            } else {
                out.push(Command::MoveProjectile {
                    projectile: projectile.id,
                    position: projectile
                        .position
                        .step_towards(target.position, projectile.speed),
                });
            }
        }
    }
}
