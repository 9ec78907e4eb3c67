use brain_defense_core::{
    Catalog, Command, EnemyId, EnemyKind, Event, Point, StageConfig, Theme, TowerId, TowerKind,
    TowerTarget, WaveConfig,
};
use brain_defense_system_tower_targeting::TowerTargeting;
use brain_defense_world::{self as world, query, MatchConfig, World};

const NEAR_TOWER: Point = Point::new(60.0, 150.0);
const FAR_TOWER: Point = Point::new(480.0, 300.0);

#[derive(Debug, PartialEq)]
struct ReplayOutcome {
    assignments: Vec<Vec<TowerTarget>>,
    enemies: Vec<EnemyId>,
    towers: Vec<TowerId>,
}

fn new_world() -> World {
    let stage = StageConfig {
        id: 1,
        theme: Theme::Forest,
        starting_money: 500,
        waves: vec![WaveConfig::new(EnemyKind::Noobini, 2, 1)],
    };
    World::new(MatchConfig::new(stage, Catalog::standard()))
}

fn opening() -> Vec<Command> {
    vec![
        Command::StartWave,
        Command::SpawnEnemy {
            kind: EnemyKind::Noobini,
            salt: 1,
        },
        Command::SpawnEnemy {
            kind: EnemyKind::Noobini,
            salt: 2,
        },
        Command::PlaceTower {
            kind: TowerKind::BonecaAmbalabu,
            position: NEAR_TOWER,
        },
        Command::PlaceTower {
            kind: TowerKind::Wifirmino,
            position: FAR_TOWER,
        },
    ]
}

fn replay() -> ReplayOutcome {
    let mut world = new_world();
    let mut targeting = TowerTargeting::new();
    let mut outcome = ReplayOutcome {
        assignments: Vec::new(),
        enemies: Vec::new(),
        towers: Vec::new(),
    };

    let mut record = |world: &mut World, command: Command, outcome: &mut ReplayOutcome| {
        let mut events = Vec::new();
        world::apply(world, command, &mut events);
        for event in events {
            match event {
                Event::EnemySpawned { enemy, .. } => outcome.enemies.push(enemy),
                Event::TowerPlaced { tower, .. } => outcome.towers.push(tower),
                _ => {}
            }
        }
        let mut targets = Vec::new();
        targeting.handle(
            query::towers(world),
            query::enemies(world),
            query::catalog(world),
            &mut targets,
        );
        outcome.assignments.push(targets);
    };

    for command in opening() {
        record(&mut world, command, &mut outcome);
    }

    let (first, second) = (outcome.enemies[0], outcome.enemies[1]);
    record(
        &mut world,
        Command::MoveEnemy {
            enemy: first,
            position: Point::new(700.0, 560.0),
            path_index: 6,
        },
        &mut outcome,
    );
    record(
        &mut world,
        Command::MoveEnemy {
            enemy: second,
            position: Point::new(500.0, 320.0),
            path_index: 3,
        },
        &mut outcome,
    );
    outcome
}

#[test]
fn deterministic_replay_follows_spawn_order_and_range() {
    let first = replay();
    let second = replay();
    assert_eq!(first, second, "replay diverged between runs");

    assert_eq!(first.enemies.len(), 2);
    assert_eq!(first.towers.len(), 2);
    let [oldest, youngest] = [first.enemies[0], first.enemies[1]];
    let [near, far] = [first.towers[0], first.towers[1]];

    // Both enemies wait at the entrance once the near tower is down.
    let after_placement = &first.assignments[4];
    assert_eq!(
        after_placement,
        &vec![TowerTarget {
            tower: near,
            enemy: oldest,
        }]
    );

    // The oldest enemy left every radius; the near tower falls back to the next one.
    assert_eq!(
        first.assignments[5],
        vec![TowerTarget {
            tower: near,
            enemy: youngest,
        }]
    );

    // The youngest enemy walked from the near tower into the far tower's radius.
    assert_eq!(
        first.assignments[6],
        vec![TowerTarget {
            tower: far,
            enemy: youngest,
        }]
    );
}
