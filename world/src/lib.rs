#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Brain Defense.
//!
//! The world owns every mutable piece of a match: economy, wave progress,
//! and the enemy, tower, and projectile collections. Placement, the frame
//! loop, and peer messages all funnel through [`apply`], so the invariants
//! below hold regardless of which of them issued a command:
//!
//! * currency never goes negative and is checked against the live balance;
//! * lives saturate at zero and the loss is signalled exactly once;
//! * a wave clears only once its quota spawned and no enemy remains.

mod towers;

use std::time::Duration;

use brain_defense_core::{
    Catalog, Command, EnemyId, EnemyState, Event, MatchSnapshot, Outcome, OverwriteScope, Path,
    PlacementError, ProjectileId, ProjectileState, Role, StageConfig, TowerState, Viewport,
    WaveConfig, DEFAULT_LIVES, PROJECTILE_SPEED, WIN_BONUS,
};
use tracing::{debug, info};

use crate::towers::TowerRegistry;

/// Static parameters a match is created from.
#[derive(Clone, Debug)]
pub struct MatchConfig {
    /// Stage being played.
    pub stage: StageConfig,
    /// Tower and enemy records resolved during the match.
    pub catalog: Catalog,
    /// Path enemies follow.
    pub path: Path,
    /// Initial viewport.
    pub viewport: Viewport,
    /// Lives the match starts with.
    pub lives: u32,
    /// Role that owns locally placed towers; single-player matches use host.
    pub local_role: Role,
}

impl MatchConfig {
    /// Creates a single-player configuration with default lives and viewport.
    #[must_use]
    pub fn new(stage: StageConfig, catalog: Catalog) -> Self {
        Self {
            stage,
            catalog,
            path: Path::standard(),
            viewport: Viewport::default(),
            lives: DEFAULT_LIVES,
            local_role: Role::Host,
        }
    }

    /// Overrides the initial viewport.
    #[must_use]
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Overrides the starting lives.
    #[must_use]
    pub fn with_lives(mut self, lives: u32) -> Self {
        self.lives = lives;
        self
    }

    /// Overrides the role that owns local placements.
    #[must_use]
    pub fn with_local_role(mut self, role: Role) -> Self {
        self.local_role = role;
        self
    }

    /// Overrides the path.
    #[must_use]
    pub fn with_path(mut self, path: Path) -> Self {
        self.path = path;
        self
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct WaveState {
    index: u32,
    active: bool,
    spawned: u32,
    spawn_timer: u32,
}

/// Represents the authoritative Brain Defense match state.
#[derive(Debug)]
pub struct World {
    stage: StageConfig,
    catalog: Catalog,
    path: Path,
    viewport: Viewport,
    local_role: Role,
    coins: u32,
    lives: u32,
    wave: WaveState,
    tick: u64,
    clock: Duration,
    outcome: Option<Outcome>,
    enemies: Vec<EnemyState>,
    towers: TowerRegistry,
    projectiles: Vec<ProjectileState>,
    next_projectile: u32,
}

impl World {
    /// Creates a fresh match ready for its first wave.
    #[must_use]
    pub fn new(config: MatchConfig) -> Self {
        Self {
            coins: config.stage.starting_money,
            stage: config.stage,
            catalog: config.catalog,
            path: config.path,
            viewport: config.viewport,
            local_role: config.local_role,
            lives: config.lives,
            wave: WaveState::default(),
            tick: 0,
            clock: Duration::ZERO,
            outcome: None,
            enemies: Vec::new(),
            towers: TowerRegistry::new(config.local_role),
            projectiles: Vec::new(),
            next_projectile: 0,
        }
    }

    fn current_wave(&self) -> Option<WaveConfig> {
        self.stage.waves.get(self.wave.index as usize).copied()
    }

    fn wave_count(&self) -> u32 {
        self.stage.waves.len() as u32
    }

    fn enemy_mut(&mut self, id: EnemyId) -> Option<&mut EnemyState> {
        self.enemies.iter_mut().find(|enemy| enemy.id == id)
    }

    fn projectile_mut(&mut self, id: ProjectileId) -> Option<&mut ProjectileState> {
        self.projectiles
            .iter_mut()
            .find(|projectile| projectile.id == id && !projectile.is_consumed())
    }

    fn advance_wave(&mut self, out_events: &mut Vec<Event>) {
        let Some(wave) = self.current_wave() else {
            return;
        };
        if !self.wave.active {
            return;
        }
        if self.wave.spawned < wave.count {
            self.wave.spawn_timer = self.wave.spawn_timer.saturating_add(1);
            return;
        }
        if !self.enemies.is_empty() {
            return;
        }

        let cleared = self.wave.index;
        self.wave.active = false;
        self.wave.index += 1;
        let more_waves = self.wave.index < self.wave_count();
        out_events.push(Event::WaveCleared {
            wave: cleared,
            more_waves,
        });
        if !more_waves {
            self.conclude(Outcome::Won, out_events);
        }
    }

    fn conclude(&mut self, outcome: Outcome, out_events: &mut Vec<Event>) {
        if self.outcome.is_some() {
            return;
        }
        self.outcome = Some(outcome);
        info!(?outcome, tick = self.tick, coins = self.coins, lives = self.lives, "match concluded");
        out_events.push(match outcome {
            Outcome::Won => Event::MatchWon { bonus: WIN_BONUS },
            Outcome::Lost => Event::MatchLost,
        });
    }

    fn rescale(&mut self, from: Viewport) {
        let to = self.viewport;
        if from == to {
            return;
        }
        for enemy in &mut self.enemies {
            enemy.position = to.rescale(enemy.position, from);
        }
        for tower in self.towers.iter_mut() {
            tower.position = to.rescale(tower.position, from);
        }
        for projectile in &mut self.projectiles {
            projectile.position = to.rescale(projectile.position, from);
        }
    }

    fn overwrite(&mut self, mut snapshot: MatchSnapshot, scope: OverwriteScope) {
        let (from, to) = (snapshot.viewport, self.viewport);
        for enemy in &mut snapshot.enemies {
            enemy.position = to.rescale(enemy.position, from);
        }
        for tower in &mut snapshot.towers {
            tower.position = to.rescale(tower.position, from);
        }
        for projectile in &mut snapshot.projectiles {
            projectile.position = to.rescale(projectile.position, from);
        }

        self.coins = snapshot.coins;
        self.lives = snapshot.lives;
        self.wave.index = snapshot.wave_index;
        self.wave.active = snapshot.wave_active;
        self.wave.spawned = snapshot.enemies_spawned_in_wave;
        self.enemies = snapshot.enemies;

        match scope {
            OverwriteScope::Restore => {
                self.towers.replace_all(snapshot.towers);
                self.wave.spawn_timer = snapshot.spawn_timer;
                self.tick = snapshot.tick;
                self.clock = snapshot.clock;
                self.outcome = snapshot.outcome;
                self.next_projectile = snapshot
                    .projectiles
                    .iter()
                    .map(|projectile| projectile.id.get().saturating_add(1))
                    .max()
                    .unwrap_or(0);
                self.projectiles = snapshot.projectiles;
            }
            OverwriteScope::Peer => {
                // Cooldowns were recorded against the peer's clock.
                let towers = snapshot
                    .towers
                    .into_iter()
                    .map(|tower| TowerState {
                        last_shot: None,
                        ..tower
                    })
                    .collect();
                self.towers.replace_all(towers);
            }
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    if world.outcome.is_some()
        && !matches!(command, Command::Resize { .. } | Command::Overwrite { .. })
    {
        return;
    }

    match command {
        Command::Tick { dt } => {
            world.tick = world.tick.saturating_add(1);
            world.clock = world.clock.saturating_add(dt);
            out_events.push(Event::TimeAdvanced {
                dt,
                tick: world.tick,
            });
            world.advance_wave(out_events);
        }
        Command::Resize { viewport } => {
            let from = world.viewport;
            if from == viewport {
                return;
            }
            world.viewport = viewport;
            world.rescale(from);
            out_events.push(Event::Resized { from, to: viewport });
        }
        Command::StartWave => {
            if world.wave.active || world.wave.index >= world.wave_count() {
                return;
            }
            world.wave.active = true;
            world.wave.spawned = 0;
            world.wave.spawn_timer = 0;
            debug!(wave = world.wave.index, "wave started");
            out_events.push(Event::WaveStarted {
                wave: world.wave.index,
            });
        }
        Command::SpawnEnemy { kind, salt } => {
            let Some(wave) = world.current_wave() else {
                return;
            };
            if !world.wave.active || world.wave.spawned >= wave.count {
                return;
            }
            let (Some(config), Some(position)) = (
                world.catalog.enemy(kind).copied(),
                world.path.waypoint(0, world.viewport),
            ) else {
                return;
            };
            let id = EnemyId::new(world.wave.index, world.wave.spawned, salt);
            world.enemies.push(EnemyState {
                id,
                kind,
                position,
                path_index: 0,
                hp: config.hp,
                max_hp: config.hp,
                frozen: false,
            });
            world.wave.spawned += 1;
            world.wave.spawn_timer = 0;
            out_events.push(Event::EnemySpawned { enemy: id, kind });
        }
        Command::MoveEnemy {
            enemy,
            position,
            path_index,
        } => {
            if let Some(state) = world.enemy_mut(enemy).filter(|state| state.is_alive()) {
                state.position = position;
                state.path_index = path_index;
            }
        }
        Command::LeakEnemy { enemy } => {
            let Some(index) = world
                .enemies
                .iter()
                .position(|state| state.id == enemy && state.is_alive())
            else {
                return;
            };
            let leaked = world.enemies.remove(index);
            let damage = world
                .catalog
                .enemy(leaked.kind)
                .map_or(0, |config| config.damage);
            world.lives = world.lives.saturating_sub(damage);
            out_events.push(Event::EnemyLeaked {
                enemy,
                damage,
                lives: world.lives,
            });
            if world.lives == 0 {
                world.conclude(Outcome::Lost, out_events);
            }
        }
        Command::FireProjectile { tower, target } => {
            let clock = world.clock;
            if !world
                .enemies
                .iter()
                .any(|state| state.id == target && state.is_alive())
            {
                return;
            }
            let Some(tower_state) = world.towers.get_mut(tower) else {
                return;
            };
            let Some(config) = world.catalog.tower(tower_state.kind).copied() else {
                return;
            };
            // At most one shot per tick, even for towers without a cooldown.
            if tower_state.last_shot == Some(clock)
                || !tower_state.is_ready(clock, config.attack_interval)
            {
                return;
            }
            tower_state.last_shot = Some(clock);
            let id = ProjectileId::new(world.next_projectile);
            world.next_projectile = world.next_projectile.saturating_add(1);
            world.projectiles.push(ProjectileState {
                id,
                position: tower_state.position,
                target,
                speed: PROJECTILE_SPEED,
                damage: config.damage,
                kind: Some(tower_state.kind),
            });
            out_events.push(Event::ProjectileFired {
                projectile: id,
                tower,
                target,
            });
        }
        Command::MoveProjectile {
            projectile,
            position,
        } => {
            if let Some(state) = world.projectile_mut(projectile) {
                state.position = position;
            }
        }
        Command::ImpactProjectile { projectile } => {
            let Some(state) = world.projectile_mut(projectile) else {
                return;
            };
            let damage = state.damage;
            let target = state.target;
            state.damage = 0;

            let Some(enemy) = world.enemy_mut(target).filter(|enemy| enemy.is_alive()) else {
                return;
            };
            enemy.hp = enemy.hp.saturating_sub(damage);
            if enemy.is_alive() {
                return;
            }
            let kind = enemy.kind;
            let reward = world.catalog.enemy(kind).map_or(0, |config| config.reward);
            world.coins = world.coins.saturating_add(reward);
            out_events.push(Event::EnemyKilled {
                enemy: target,
                reward,
            });
        }
        Command::DiscardProjectile { projectile } => {
            if let Some(state) = world.projectile_mut(projectile) {
                state.damage = 0;
            }
        }
        Command::Sweep => {
            world.enemies.retain(EnemyState::is_alive);
            world.projectiles.retain(|projectile| !projectile.is_consumed());
        }
        Command::PlaceTower { kind, position } => {
            let Some(config) = world.catalog.tower(kind).copied() else {
                out_events.push(Event::TowerPlacementRejected {
                    kind,
                    reason: PlacementError::Unavailable(kind),
                });
                return;
            };
            if world.coins < config.cost {
                debug!(%kind, cost = config.cost, coins = world.coins, "placement refused");
                out_events.push(Event::TowerPlacementRejected {
                    kind,
                    reason: PlacementError::InsufficientFunds {
                        required: config.cost,
                        available: world.coins,
                    },
                });
                return;
            }
            world.coins -= config.cost;
            let tower = world.towers.allocate();
            let _ = world.towers.insert(TowerState {
                id: tower,
                kind,
                position,
                last_shot: None,
            });
            out_events.push(Event::TowerPlaced {
                tower,
                kind,
                position,
                replicated: false,
            });
        }
        Command::ReplicateTower {
            tower,
            kind,
            position,
        } => {
            let inserted = world.towers.insert(TowerState {
                id: tower,
                kind,
                position,
                last_shot: None,
            });
            if inserted {
                out_events.push(Event::TowerPlaced {
                    tower,
                    kind,
                    position,
                    replicated: true,
                });
            }
        }
        Command::Spend { amount } => {
            if world.coins >= amount {
                world.coins -= amount;
            } else {
                out_events.push(Event::SpendRejected {
                    amount,
                    balance: world.coins,
                });
            }
        }
        Command::Overwrite { snapshot, scope } => {
            world.overwrite(*snapshot, scope);
            out_events.push(Event::StateOverwritten { scope });
            if world.lives == 0 {
                world.conclude(Outcome::Lost, out_events);
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use brain_defense_core::{
        Catalog, EnemyState, MatchPhase, MatchSnapshot, Outcome, Path, ProjectileState, Role,
        StageConfig, TowerId, TowerState, Viewport, WaveProgress,
    };

    use super::World;

    /// Current currency balance.
    #[must_use]
    pub fn coins(world: &World) -> u32 {
        world.coins
    }

    /// Remaining lives.
    #[must_use]
    pub fn lives(world: &World) -> u32 {
        world.lives
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick(world: &World) -> u64 {
        world.tick
    }

    /// Simulated time elapsed since the match began.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Terminal result, once decided.
    #[must_use]
    pub fn outcome(world: &World) -> Option<Outcome> {
        world.outcome
    }

    /// Viewport positions are currently expressed in.
    #[must_use]
    pub fn viewport(world: &World) -> Viewport {
        world.viewport
    }

    /// Role that owns locally placed towers.
    #[must_use]
    pub fn local_role(world: &World) -> Role {
        world.local_role
    }

    /// Path enemies follow.
    #[must_use]
    pub fn path(world: &World) -> &Path {
        &world.path
    }

    /// Tower and enemy records used by the match.
    #[must_use]
    pub fn catalog(world: &World) -> &Catalog {
        &world.catalog
    }

    /// Stage being played.
    #[must_use]
    pub fn stage(world: &World) -> &StageConfig {
        &world.stage
    }

    /// Live enemies in spawn order, including those awaiting removal.
    #[must_use]
    pub fn enemies(world: &World) -> &[EnemyState] {
        &world.enemies
    }

    /// Towers in placement order.
    #[must_use]
    pub fn towers(world: &World) -> &[TowerState] {
        world.towers.as_slice()
    }

    /// Reports whether a tower with the identifier exists.
    #[must_use]
    pub fn has_tower(world: &World, tower: TowerId) -> bool {
        world.towers.contains(tower)
    }

    /// In-flight projectiles, including those awaiting removal.
    #[must_use]
    pub fn projectiles(world: &World) -> &[ProjectileState] {
        &world.projectiles
    }

    /// Captures the state spawning and wave control react to.
    #[must_use]
    pub fn wave_progress(world: &World) -> WaveProgress {
        WaveProgress {
            index: world.wave.index,
            total: world.wave_count(),
            active: world.wave.active,
            spawned: world.wave.spawned,
            spawn_timer: world.wave.spawn_timer,
            current: world.current_wave(),
        }
    }

    /// Reports the phase of the match state machine.
    #[must_use]
    pub fn phase(world: &World) -> MatchPhase {
        match world.outcome {
            Some(Outcome::Won) => MatchPhase::Won,
            Some(Outcome::Lost) => MatchPhase::Lost,
            None if !world.wave.active => MatchPhase::Idle,
            None if wave_progress(world).quota_reached() => MatchPhase::Draining,
            None => MatchPhase::Spawning,
        }
    }

    /// Serialisable copy of the full match state.
    #[must_use]
    pub fn snapshot(world: &World) -> MatchSnapshot {
        MatchSnapshot {
            viewport: world.viewport,
            coins: world.coins,
            lives: world.lives,
            wave_index: world.wave.index,
            wave_active: world.wave.active,
            enemies_spawned_in_wave: world.wave.spawned,
            spawn_timer: world.wave.spawn_timer,
            tick: world.tick,
            clock: world.clock,
            outcome: world.outcome,
            enemies: world.enemies.clone(),
            towers: world.towers.as_slice().to_vec(),
            projectiles: world.projectiles.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_defense_core::{
        EnemyConfig, EnemyKind, MatchPhase, Point, Theme, TowerConfig, TowerId, TowerKind,
        TICK_DURATION,
    };

    fn stage(waves: Vec<WaveConfig>) -> StageConfig {
        StageConfig {
            id: 1,
            theme: Theme::Forest,
            starting_money: 100,
            waves,
        }
    }

    fn world_with(waves: Vec<WaveConfig>, lives: u32) -> World {
        let catalog = Catalog::standard()
            .with_enemy(EnemyKind::Noobini, EnemyConfig::new(10, 1.0, 20, 5))
            .with_tower(
                TowerKind::Wifirmino,
                TowerConfig::new(25, f32::INFINITY, 10, Duration::ZERO),
            );
        World::new(
            MatchConfig::new(stage(waves), catalog)
                .with_lives(lives)
                .with_viewport(Viewport::new(1000.0, 1000.0)),
        )
    }

    fn run(world: &mut World, commands: Vec<Command>) -> Vec<Event> {
        let mut events = Vec::new();
        for command in commands {
            apply(world, command, &mut events);
        }
        events
    }

    fn spawn_one(world: &mut World) -> EnemyId {
        let _ = run(
            world,
            vec![
                Command::StartWave,
                Command::SpawnEnemy {
                    kind: EnemyKind::Noobini,
                    salt: 7,
                },
            ],
        );
        query::enemies(world)[0].id
    }

    #[test]
    fn new_world_starts_idle_with_stage_money() {
        let world = world_with(vec![WaveConfig::new(EnemyKind::Noobini, 1, 1)], 100);
        assert_eq!(query::coins(&world), 100);
        assert_eq!(query::lives(&world), 100);
        assert_eq!(query::phase(&world), MatchPhase::Idle);
    }

    #[test]
    fn wave_does_not_clear_while_an_enemy_lives() {
        let mut world = world_with(
            vec![
                WaveConfig::new(EnemyKind::Noobini, 1, 1),
                WaveConfig::new(EnemyKind::Noobini, 1, 1),
            ],
            100,
        );
        let _ = spawn_one(&mut world);
        assert_eq!(query::phase(&world), MatchPhase::Draining);

        for _ in 0..10 {
            let events = run(&mut world, vec![Command::Tick { dt: TICK_DURATION }]);
            assert!(!events
                .iter()
                .any(|event| matches!(event, Event::WaveCleared { .. })));
        }
        assert_eq!(query::wave_progress(&world).index, 0);
    }

    #[test]
    fn leaks_clamp_lives_and_signal_loss_once() {
        let mut world = world_with(vec![WaveConfig::new(EnemyKind::Noobini, 3, 1)], 15);
        let mut events = Vec::new();
        apply(&mut world, Command::StartWave, &mut events);
        for salt in 0..2 {
            apply(
                &mut world,
                Command::SpawnEnemy {
                    kind: EnemyKind::Noobini,
                    salt,
                },
                &mut events,
            );
        }
        let ids: Vec<EnemyId> = query::enemies(&world).iter().map(|enemy| enemy.id).collect();
        for enemy in ids {
            apply(&mut world, Command::LeakEnemy { enemy }, &mut events);
        }

        assert_eq!(query::lives(&world), 0);
        assert_eq!(query::outcome(&world), Some(Outcome::Lost));
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, Event::MatchLost))
                .count(),
            1
        );
        assert!(events.contains(&Event::EnemyLeaked {
            enemy: EnemyId::new(0, 0, 0),
            damage: 20,
            lives: 0,
        }));
    }

    #[test]
    fn overkill_grants_reward_once() {
        let mut world = world_with(vec![WaveConfig::new(EnemyKind::Noobini, 1, 1)], 100);
        let enemy = spawn_one(&mut world);
        let mut events = run(
            &mut world,
            vec![Command::PlaceTower {
                kind: TowerKind::Wifirmino,
                position: Point::new(500.0, 500.0),
            }],
        );
        let tower = TowerId::new(Role::Host, 0);
        apply(
            &mut world,
            Command::FireProjectile {
                tower,
                target: enemy,
            },
            &mut events,
        );
        apply(&mut world, Command::Tick { dt: TICK_DURATION }, &mut events);
        apply(
            &mut world,
            Command::FireProjectile {
                tower,
                target: enemy,
            },
            &mut events,
        );
        assert_eq!(query::projectiles(&world).len(), 2);

        let balance = query::coins(&world);
        for id in [0, 1] {
            apply(
                &mut world,
                Command::ImpactProjectile {
                    projectile: ProjectileId::new(id),
                },
                &mut events,
            );
        }
        assert_eq!(query::coins(&world), balance + 5);

        apply(&mut world, Command::Sweep, &mut events);
        assert!(query::enemies(&world).is_empty());
        assert!(query::projectiles(&world).is_empty());
    }

    #[test]
    fn tower_fires_once_per_tick_even_without_cooldown() {
        let mut world = world_with(vec![WaveConfig::new(EnemyKind::Noobini, 1, 1)], 100);
        let enemy = spawn_one(&mut world);
        let fire = Command::FireProjectile {
            tower: TowerId::new(Role::Host, 0),
            target: enemy,
        };
        let _ = run(
            &mut world,
            vec![
                Command::PlaceTower {
                    kind: TowerKind::Wifirmino,
                    position: Point::new(500.0, 500.0),
                },
                fire.clone(),
                fire,
            ],
        );
        assert_eq!(query::projectiles(&world).len(), 1);
    }

    #[test]
    fn placement_requires_live_balance() {
        let mut world = world_with(vec![WaveConfig::new(EnemyKind::Noobini, 1, 1)], 100);
        let _ = run(&mut world, vec![Command::Spend { amount: 75 }]);
        assert_eq!(query::coins(&world), 25);

        let events = run(
            &mut world,
            vec![
                Command::PlaceTower {
                    kind: TowerKind::Wifirmino,
                    position: Point::new(1.0, 1.0),
                },
                Command::PlaceTower {
                    kind: TowerKind::Wifirmino,
                    position: Point::new(2.0, 2.0),
                },
            ],
        );
        assert_eq!(query::coins(&world), 0);
        assert_eq!(query::towers(&world).len(), 1);
        assert!(events.contains(&Event::TowerPlacementRejected {
            kind: TowerKind::Wifirmino,
            reason: PlacementError::InsufficientFunds {
                required: 25,
                available: 0,
            },
        }));
    }

    #[test]
    fn replicated_towers_are_free_and_idempotent() {
        let mut world = world_with(vec![WaveConfig::new(EnemyKind::Noobini, 1, 1)], 100);
        let replicate = Command::ReplicateTower {
            tower: TowerId::new(Role::Client, 4),
            kind: TowerKind::Chocolatini,
            position: Point::new(900.0, 100.0),
        };
        let events = run(&mut world, vec![replicate.clone(), replicate]);

        assert_eq!(query::towers(&world).len(), 1);
        assert_eq!(query::coins(&world), 100);
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, Event::TowerPlaced { replicated: true, .. }))
                .count(),
            1
        );
    }

    #[test]
    fn final_wave_clear_wins_once() {
        let mut world = world_with(vec![WaveConfig::new(EnemyKind::Noobini, 1, 1)], 100);
        let enemy = spawn_one(&mut world);
        let events = run(
            &mut world,
            vec![
                Command::LeakEnemy { enemy },
                Command::Tick { dt: TICK_DURATION },
                Command::Tick { dt: TICK_DURATION },
            ],
        );

        assert!(events.contains(&Event::WaveCleared {
            wave: 0,
            more_waves: false,
        }));
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, Event::MatchWon { .. }))
                .count(),
            1
        );
        assert_eq!(query::coins(&world), 100);
        assert_eq!(query::phase(&world), MatchPhase::Won);
    }

    #[test]
    fn resize_rescales_live_entities() {
        let mut world = world_with(vec![WaveConfig::new(EnemyKind::Noobini, 1, 1)], 100);
        let _ = spawn_one(&mut world);
        let _ = run(
            &mut world,
            vec![
                Command::PlaceTower {
                    kind: TowerKind::Wifirmino,
                    position: Point::new(400.0, 600.0),
                },
                Command::Resize {
                    viewport: Viewport::new(500.0, 2000.0),
                },
            ],
        );

        assert_eq!(query::towers(&world)[0].position, Point::new(200.0, 1200.0));
        assert_eq!(query::enemies(&world)[0].position, Point::new(0.0, 300.0));
    }

    #[test]
    fn snapshot_restores_field_for_field() {
        let mut world = world_with(vec![WaveConfig::new(EnemyKind::Noobini, 2, 1)], 100);
        let _ = spawn_one(&mut world);
        let _ = run(
            &mut world,
            vec![
                Command::PlaceTower {
                    kind: TowerKind::Wifirmino,
                    position: Point::new(300.0, 300.0),
                },
                Command::Tick { dt: TICK_DURATION },
            ],
        );
        let snapshot = query::snapshot(&world);
        let encoded = serde_json::to_string(&snapshot).expect("encode snapshot");
        drop(world);

        let decoded: MatchSnapshot = serde_json::from_str(&encoded).expect("decode snapshot");
        let mut restored = world_with(vec![WaveConfig::new(EnemyKind::Noobini, 2, 1)], 100);
        let _ = run(
            &mut restored,
            vec![Command::Overwrite {
                snapshot: Box::new(decoded),
                scope: OverwriteScope::Restore,
            }],
        );

        assert_eq!(query::snapshot(&restored), snapshot);
        let _ = run(
            &mut restored,
            vec![Command::PlaceTower {
                kind: TowerKind::Wifirmino,
                position: Point::new(600.0, 600.0),
            }],
        );
        assert_eq!(query::towers(&restored)[1].id, TowerId::new(Role::Host, 1));
    }

    #[test]
    fn peer_overwrite_resets_cooldowns_and_keeps_clock() {
        let mut host = world_with(vec![WaveConfig::new(EnemyKind::Noobini, 1, 1)], 100);
        let enemy = spawn_one(&mut host);
        let _ = run(
            &mut host,
            vec![
                Command::PlaceTower {
                    kind: TowerKind::Wifirmino,
                    position: Point::new(300.0, 300.0),
                },
                Command::Tick { dt: TICK_DURATION },
                Command::FireProjectile {
                    tower: TowerId::new(Role::Host, 0),
                    target: enemy,
                },
            ],
        );
        let mut client = world_with(vec![WaveConfig::new(EnemyKind::Noobini, 1, 1)], 100);
        let events = run(
            &mut client,
            vec![Command::Overwrite {
                snapshot: Box::new(query::snapshot(&host)),
                scope: OverwriteScope::Peer,
            }],
        );

        assert!(events.contains(&Event::StateOverwritten {
            scope: OverwriteScope::Peer,
        }));
        assert_eq!(query::tick(&client), 0);
        assert_eq!(query::coins(&client), query::coins(&host));
        assert_eq!(query::towers(&client)[0].last_shot, None);
        assert_eq!(query::enemies(&client), query::enemies(&host));
    }

    #[test]
    fn concluded_match_ignores_further_commands() {
        let mut world = world_with(vec![WaveConfig::new(EnemyKind::Noobini, 1, 1)], 20);
        let enemy = spawn_one(&mut world);
        let events = run(
            &mut world,
            vec![
                Command::LeakEnemy { enemy },
                Command::Tick { dt: TICK_DURATION },
                Command::StartWave,
            ],
        );
        assert_eq!(events.last(), Some(&Event::MatchLost));
        assert_eq!(query::tick(&world), 0);
    }
}
