use std::time::Duration;

use brain_defense_core::{
    Catalog, Command, EnemyConfig, EnemyKind, Event, Outcome, Point, StageConfig, Theme,
    TowerConfig, TowerKind, TowerTarget, Viewport, WaveConfig, TICK_DURATION,
};
use brain_defense_system_movement::{Movement, PathView};
use brain_defense_system_spawning::{Config, Spawning};
use brain_defense_system_tower_combat::{ProjectileFlight, TowerCombat};
use brain_defense_system_tower_targeting::TowerTargeting;
use brain_defense_world::{self as world, query, MatchConfig, World};

struct Harness {
    world: World,
    spawning: Spawning,
    movement: Movement,
    targeting: TowerTargeting,
    combat: TowerCombat,
    flight: ProjectileFlight,
    targets: Vec<TowerTarget>,
}

impl Harness {
    fn new(world: World) -> Self {
        Self {
            world,
            spawning: Spawning::new(Config::new(11)),
            movement: Movement::new(),
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            flight: ProjectileFlight::new(),
            targets: Vec::new(),
        }
    }

    fn submit(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        events
    }

    fn frame(&mut self) -> Vec<Event> {
        let mut events = self.submit(Command::Tick { dt: TICK_DURATION });
        let mut commands = Vec::new();

        self.spawning
            .handle(&events, query::wave_progress(&self.world), &mut commands);
        self.flush(&mut commands, &mut events);

        let path = query::path(&self.world).clone();
        let catalog = query::catalog(&self.world).clone();
        self.movement.handle(
            &events,
            query::enemies(&self.world),
            PathView {
                path: &path,
                viewport: query::viewport(&self.world),
                catalog: &catalog,
            },
            &mut commands,
        );
        self.flush(&mut commands, &mut events);

        self.targeting.handle(
            query::towers(&self.world),
            query::enemies(&self.world),
            &catalog,
            &mut self.targets,
        );
        self.combat.handle(
            query::towers(&self.world),
            &catalog,
            query::clock(&self.world),
            &self.targets,
            &mut commands,
        );
        self.flush(&mut commands, &mut events);

        self.flight.handle(
            &events,
            query::projectiles(&self.world),
            query::enemies(&self.world),
            &mut commands,
        );
        self.flush(&mut commands, &mut events);
        world::apply(&mut self.world, Command::Sweep, &mut events);
        events
    }

    fn flush(&mut self, commands: &mut Vec<Command>, events: &mut Vec<Event>) {
        for command in commands.drain(..) {
            world::apply(&mut self.world, command, events);
        }
    }
}

fn stage(count: u32) -> StageConfig {
    StageConfig {
        id: 1,
        theme: Theme::Forest,
        starting_money: 100,
        waves: vec![WaveConfig::new(EnemyKind::Noobini, count, 30)],
    }
}

#[test]
fn single_wave_drains_into_win_with_exact_rewards() {
    let catalog = Catalog::standard()
        .with_enemy(EnemyKind::Noobini, EnemyConfig::new(10, 1.5, 5, 5))
        .with_tower(
            TowerKind::BonecaAmbalabu,
            TowerConfig::new(30, f32::INFINITY, 10, Duration::ZERO),
        );
    let world = World::new(
        MatchConfig::new(stage(3), catalog).with_viewport(Viewport::new(1000.0, 1000.0)),
    );
    let mut harness = Harness::new(world);
    let _ = harness.submit(Command::PlaceTower {
        kind: TowerKind::BonecaAmbalabu,
        position: Point::new(500.0, 500.0),
    });
    let _ = harness.submit(Command::StartWave);
    let before = query::coins(&harness.world);

    let mut kills = 0;
    let mut wins = 0;
    for _ in 0..5_000 {
        for event in harness.frame() {
            match event {
                Event::EnemyKilled { .. } => kills += 1,
                Event::MatchWon { .. } => wins += 1,
                Event::EnemyLeaked { .. } => panic!("no enemy should leak"),
                _ => {}
            }
        }
        if query::outcome(&harness.world).is_some() {
            break;
        }
    }

    assert_eq!(kills, 3);
    assert_eq!(wins, 1);
    assert_eq!(query::coins(&harness.world), before + 15);
    assert_eq!(query::outcome(&harness.world), Some(Outcome::Won));
}

#[test]
fn standard_tower_respects_attack_interval() {
    let world = World::new(
        MatchConfig::new(stage(1), Catalog::standard())
            .with_viewport(Viewport::new(1000.0, 1000.0)),
    );
    let mut harness = Harness::new(world);
    let _ = harness.submit(Command::PlaceTower {
        kind: TowerKind::Wifirmino,
        position: Point::new(100.0, 200.0),
    });
    let _ = harness.submit(Command::StartWave);

    let mut fired_at = Vec::new();
    for _ in 0..200 {
        for event in harness.frame() {
            if let Event::ProjectileFired { .. } = event {
                fired_at.push(query::clock(&harness.world));
            }
        }
    }

    assert!(fired_at.len() >= 2, "expected repeated fire, got {fired_at:?}");
    for pair in fired_at.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(1_000));
    }
}

#[test]
fn projectiles_in_flight_are_discarded_after_target_dies() {
    let catalog = Catalog::standard()
        .with_enemy(EnemyKind::Noobini, EnemyConfig::new(1, 0.5, 5, 7))
        .with_tower(
            TowerKind::Wifirmino,
            TowerConfig::new(0, f32::INFINITY, 1, Duration::ZERO),
        );
    let world = World::new(
        MatchConfig::new(stage(1), catalog).with_viewport(Viewport::new(1000.0, 1000.0)),
    );
    let mut harness = Harness::new(world);
    let _ = harness.submit(Command::PlaceTower {
        kind: TowerKind::Wifirmino,
        position: Point::new(900.0, 900.0),
    });
    let _ = harness.submit(Command::StartWave);

    let mut rewards = 0;
    for _ in 0..2_000 {
        for event in harness.frame() {
            if let Event::EnemyKilled { reward, .. } = event {
                rewards += reward;
            }
        }
        if query::outcome(&harness.world).is_some() {
            break;
        }
    }

    assert_eq!(rewards, 7);
    assert_eq!(query::outcome(&harness.world), Some(Outcome::Won));
}
