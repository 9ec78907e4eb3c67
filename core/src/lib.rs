#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Brain Defense engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to. Systems consume event streams, read immutable entity records,
//! and respond exclusively with new command batches.
//!
//! Everything that crosses the network or lands on disk is defined here as
//! well, so the persisted snapshot and the peer catch-up payload share one
//! schema.

mod catalog;
mod geometry;
mod rng;

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use catalog::{
    is_level_unlocked, Campaign, Catalog, CatalogError, EnemyConfig, EnemyKind, StageConfig,
    Theme, TowerConfig, TowerKind, WaveConfig, STAGES_PER_LEVEL,
};
pub use geometry::{
    distance_to_segment, NormalizedPoint, Path, PercentPoint, Point, Viewport, STANDARD_WAYPOINTS,
};
pub use rng::SeededRng;

/// Simulation ticks executed per second of wall time.
pub const TICKS_PER_SECOND: u32 = 60;

/// Simulated duration covered by a single tick.
pub const TICK_DURATION: Duration = Duration::from_nanos(1_000_000_000 / TICKS_PER_SECOND as u64);

/// Lives a match starts with unless configured otherwise.
pub const DEFAULT_LIVES: u32 = 100;

/// Pixels a projectile travels per tick.
pub const PROJECTILE_SPEED: f32 = 5.0;

/// Currency granted when the final wave of a stage clears.
pub const WIN_BONUS: u32 = 20;

/// Participant role in a cooperative match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Elected participant that owns wave-advance authority and the left half.
    Host,
    /// Joining participant that follows the host and owns the right half.
    Client,
}

impl Role {
    /// Half of the map the role may build on.
    #[must_use]
    pub const fn side(self) -> Side {
        match self {
            Self::Host => Side::Left,
            Self::Client => Side::Right,
        }
    }

    /// Role of the other participant.
    #[must_use]
    pub const fn peer(self) -> Self {
        match self {
            Self::Host => Self::Client,
            Self::Client => Self::Host,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Host => "HOST",
            Self::Client => "CLIENT",
        })
    }
}

/// Half of the map split along the vertical centre line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Everything strictly left of the centre line.
    Left,
    /// The centre line and everything to its right.
    Right,
}

/// Identifier of a tower, unique per owning participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TowerId {
    /// Participant that placed the tower; single-player towers belong to the host.
    pub owner: Role,
    /// Per-owner sequence number.
    pub serial: u32,
}

impl TowerId {
    /// Creates a tower identifier.
    #[must_use]
    pub const fn new(owner: Role, serial: u32) -> Self {
        Self { owner, serial }
    }
}

impl fmt::Display for TowerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t-{}-{}", self.owner, self.serial)
    }
}

/// Identifier of an enemy: wave, spawn ordinal, and a seeded label salt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnemyId {
    /// Wave index the enemy was spawned in.
    pub wave: u32,
    /// Zero-based position of the enemy within its wave.
    pub ordinal: u32,
    /// Distinguishing label drawn from the match RNG.
    pub salt: u32,
}

impl EnemyId {
    /// Creates an enemy identifier.
    #[must_use]
    pub const fn new(wave: u32, ordinal: u32, salt: u32) -> Self {
        Self {
            wave,
            ordinal,
            salt,
        }
    }
}

impl fmt::Display for EnemyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e-{}-{}-{}", self.wave, self.ordinal, self.salt)
    }
}

/// Identifier of an in-flight projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a projectile identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Terminal result of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Every wave cleared with lives remaining.
    Won,
    /// Lives reached zero.
    Lost,
}

/// Observable phase of the per-match state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchPhase {
    /// No wave is running; waiting for an explicit or scheduled start.
    Idle,
    /// The active wave still has spawns outstanding.
    Spawning,
    /// Every spawn was issued; waiting for live enemies to leave.
    Draining,
    /// The final wave cleared.
    Won,
    /// Lives ran out.
    Lost,
}

/// Scope of a wholesale state overwrite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverwriteScope {
    /// Restores every field from a locally persisted snapshot.
    Restore,
    /// Applies a peer's catch-up payload: entities, economy, and wave progress.
    Peer,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Changes the viewport and rescales every live entity position.
    Resize {
        /// Dimensions of the new viewport.
        viewport: Viewport,
    },
    /// Starts the next configured wave when the match is idle.
    StartWave,
    /// Spawns one enemy of the active wave at the start of the path.
    SpawnEnemy {
        /// Kind configured for the active wave.
        kind: EnemyKind,
        /// Label salt drawn from the match RNG.
        salt: u32,
    },
    /// Moves an enemy along the path.
    MoveEnemy {
        /// Enemy being moved.
        enemy: EnemyId,
        /// Position after the move.
        position: Point,
        /// Index of the last waypoint the enemy reached.
        path_index: usize,
    },
    /// Consumes an enemy that reached the exit and deducts lives.
    LeakEnemy {
        /// Enemy that reached the exit.
        enemy: EnemyId,
    },
    /// Launches a projectile from a ready tower toward an enemy.
    FireProjectile {
        /// Tower that fires.
        tower: TowerId,
        /// Enemy the projectile homes toward.
        target: EnemyId,
    },
    /// Moves a projectile toward its target.
    MoveProjectile {
        /// Projectile being moved.
        projectile: ProjectileId,
        /// Position after the move.
        position: Point,
    },
    /// Resolves a projectile against its target.
    ImpactProjectile {
        /// Projectile that reached its target.
        projectile: ProjectileId,
    },
    /// Drops a projectile whose target no longer exists.
    DiscardProjectile {
        /// Projectile to drop.
        projectile: ProjectileId,
    },
    /// Removes dead enemies and consumed projectiles.
    Sweep,
    /// Places a validated local tower and deducts its cost.
    PlaceTower {
        /// Kind of tower to construct.
        kind: TowerKind,
        /// Pixel position of the tower.
        position: Point,
    },
    /// Inserts a tower announced by the peer without charging for it.
    ReplicateTower {
        /// Identifier assigned by the owning peer.
        tower: TowerId,
        /// Kind of tower announced.
        kind: TowerKind,
        /// Pixel position resolved against the local viewport.
        position: Point,
    },
    /// Deducts currency on behalf of an external collaborator.
    Spend {
        /// Amount to deduct.
        amount: u32,
    },
    /// Replaces match state wholesale.
    Overwrite {
        /// State to adopt.
        snapshot: Box<MatchSnapshot>,
        /// Which fields to adopt.
        scope: OverwriteScope,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
        /// Tick counter after the advance.
        tick: u64,
    },
    /// Reports that the viewport changed.
    Resized {
        /// Previous viewport.
        from: Viewport,
        /// Current viewport.
        to: Viewport,
    },
    /// Announces that a wave began spawning.
    WaveStarted {
        /// Zero-based index of the wave.
        wave: u32,
    },
    /// Announces that a wave issued every spawn and every enemy left play.
    WaveCleared {
        /// Zero-based index of the cleared wave.
        wave: u32,
        /// Whether another wave follows.
        more_waves: bool,
    },
    /// Confirms that an enemy entered the path.
    EnemySpawned {
        /// Identifier of the new enemy.
        enemy: EnemyId,
        /// Kind of the new enemy.
        kind: EnemyKind,
    },
    /// Reports that an enemy reached the exit.
    EnemyLeaked {
        /// Enemy that leaked.
        enemy: EnemyId,
        /// Lives deducted by the leak.
        damage: u32,
        /// Lives remaining after the deduction.
        lives: u32,
    },
    /// Reports that an impact brought an enemy to zero hit points.
    EnemyKilled {
        /// Enemy that died.
        enemy: EnemyId,
        /// Currency granted for the kill.
        reward: u32,
    },
    /// Confirms that a tower fired.
    ProjectileFired {
        /// Identifier of the new projectile.
        projectile: ProjectileId,
        /// Tower that fired.
        tower: TowerId,
        /// Enemy targeted by the projectile.
        target: EnemyId,
    },
    /// Confirms that a tower now stands on the map.
    TowerPlaced {
        /// Identifier of the tower.
        tower: TowerId,
        /// Kind of the tower.
        kind: TowerKind,
        /// Pixel position of the tower.
        position: Point,
        /// Whether the tower mirrors a peer placement.
        replicated: bool,
    },
    /// Reports that a placement could not be honoured.
    TowerPlacementRejected {
        /// Kind of tower requested.
        kind: TowerKind,
        /// Reason for the rejection.
        reason: PlacementError,
    },
    /// Reports that an external spend exceeded the balance.
    SpendRejected {
        /// Amount requested.
        amount: u32,
        /// Balance at the time of the request.
        balance: u32,
    },
    /// Reports that match state was replaced wholesale.
    StateOverwritten {
        /// Which fields were replaced.
        scope: OverwriteScope,
    },
    /// Signals that the match was won. Emitted at most once.
    MatchWon {
        /// Bonus currency granted for the win.
        bonus: u32,
    },
    /// Signals that the match was lost. Emitted at most once.
    MatchLost,
}

/// Reasons a placement attempt can be rejected.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum PlacementError {
    /// The balance does not cover the tower's cost.
    #[error("insufficient funds: {required} required, {available} available")]
    InsufficientFunds {
        /// Cost of the requested tower.
        required: u32,
        /// Balance at the time of the request.
        available: u32,
    },
    /// The point lies on the half of the map owned by the other participant.
    #[error("placement must stay on the {assigned:?} half")]
    WrongSide {
        /// Half assigned to the local participant.
        assigned: Side,
    },
    /// The point lies within the minimum clearance of the path.
    #[error("too close to the path ({distance:.1}px)")]
    TooCloseToPath {
        /// Distance to the nearest path segment.
        distance: f32,
    },
    /// The point lies within the minimum clearance of another tower.
    #[error("too close to tower {tower}")]
    TooCloseToTower {
        /// Tower that blocks the placement.
        tower: TowerId,
    },
    /// The tower kind has no configuration record.
    #[error("tower {0} is not available")]
    Unavailable(TowerKind),
}

/// Live enemy record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyState {
    /// Identifier of the enemy.
    pub id: EnemyId,
    /// Kind of the enemy.
    pub kind: EnemyKind,
    /// Current position in pixel space.
    pub position: Point,
    /// Index of the last waypoint reached.
    pub path_index: usize,
    /// Remaining hit points.
    pub hp: i32,
    /// Hit points at spawn.
    pub max_hp: i32,
    /// Reserved status flag; no effect applies it yet.
    #[serde(default)]
    pub frozen: bool,
}

impl EnemyState {
    /// Reports whether the enemy still has hit points.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Remaining hit points as a fraction of the spawn value.
    #[must_use]
    pub fn health_fraction(&self) -> f32 {
        if self.max_hp <= 0 {
            return 0.0;
        }
        (self.hp.max(0) as f32 / self.max_hp as f32).min(1.0)
    }
}

/// Placed tower record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TowerState {
    /// Identifier of the tower.
    pub id: TowerId,
    /// Kind of the tower.
    pub kind: TowerKind,
    /// Pixel position of the tower.
    pub position: Point,
    /// Simulated time of the most recent shot.
    pub last_shot: Option<Duration>,
}

impl TowerState {
    /// Reports whether the cooldown elapsed at simulated time `now`.
    #[must_use]
    pub fn is_ready(&self, now: Duration, interval: Duration) -> bool {
        self.last_shot
            .map_or(true, |last| now.saturating_sub(last) >= interval)
    }
}

/// In-flight projectile record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileState {
    /// Identifier of the projectile.
    pub id: ProjectileId,
    /// Current position in pixel space.
    pub position: Point,
    /// Enemy the projectile homes toward.
    pub target: EnemyId,
    /// Pixels travelled per tick.
    pub speed: f32,
    /// Damage payload; zero marks the projectile as consumed.
    pub damage: i32,
    /// Tower kind used for the projectile's visual treatment.
    pub kind: Option<TowerKind>,
}

impl ProjectileState {
    /// Reports whether the projectile already delivered or lost its payload.
    #[must_use]
    pub const fn is_consumed(&self) -> bool {
        self.damage <= 0
    }
}

/// Enemy selected by a tower during the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerTarget {
    /// Tower that acquired the target.
    pub tower: TowerId,
    /// Enemy within the tower's range.
    pub enemy: EnemyId,
}

/// Read-only view of wave progress used by spawning and wave control.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveProgress {
    /// Zero-based index of the current or next wave.
    pub index: u32,
    /// Number of waves in the stage.
    pub total: u32,
    /// Whether the wave at `index` is running.
    pub active: bool,
    /// Enemies spawned so far in the current wave.
    pub spawned: u32,
    /// Ticks accumulated toward the next spawn.
    pub spawn_timer: u32,
    /// Configuration of the wave at `index`, when one exists.
    pub current: Option<WaveConfig>,
}

impl WaveProgress {
    /// Reports whether the active wave is due to emit its next enemy.
    #[must_use]
    pub fn spawn_due(&self) -> Option<EnemyKind> {
        let wave = self.current?;
        (self.active && self.spawned < wave.count && self.spawn_timer >= wave.interval_ticks)
            .then_some(wave.enemy)
    }

    /// Reports whether every spawn of the active wave was issued.
    #[must_use]
    pub fn quota_reached(&self) -> bool {
        self.current.map_or(true, |wave| self.spawned >= wave.count)
    }
}

/// Complete serialisable match state.
///
/// Persisted locally for crash recovery and shipped to the peer as the
/// catch-up payload. Positions are stored in the pixel space of `viewport`
/// and rescaled when adopted under a different viewport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSnapshot {
    /// Viewport the positions were captured under.
    pub viewport: Viewport,
    /// Currency balance.
    pub coins: u32,
    /// Remaining lives.
    pub lives: u32,
    /// Zero-based index of the current or next wave.
    pub wave_index: u32,
    /// Whether a wave is running.
    pub wave_active: bool,
    /// Enemies spawned so far in the current wave.
    pub enemies_spawned_in_wave: u32,
    /// Ticks accumulated toward the next spawn.
    pub spawn_timer: u32,
    /// Global tick counter.
    pub tick: u64,
    /// Simulated clock.
    pub clock: Duration,
    /// Terminal result, once decided.
    pub outcome: Option<Outcome>,
    /// Live enemies in spawn order.
    pub enemies: Vec<EnemyState>,
    /// Placed towers in placement order.
    pub towers: Vec<TowerState>,
    /// In-flight projectiles.
    pub projectiles: Vec<ProjectileState>,
}

/// Descriptor of a cooperative match, shared with menus and persisted state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoopDescriptor {
    /// Topic carrying the match's signalling traffic.
    pub match_topic: String,
    /// Role of the local participant.
    pub role: Role,
    /// Seed shared by both participants.
    pub seed: u64,
    /// Identifier of the other participant, when known.
    pub peer: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_own_opposite_sides() {
        assert_eq!(Role::Host.side(), Side::Left);
        assert_eq!(Role::Client.side(), Side::Right);
        assert_eq!(Role::Host.peer(), Role::Client);
    }

    #[test]
    fn role_wire_names_are_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Client).expect("encode"), "\"CLIENT\"");
        assert_eq!(Role::Host.to_string(), "HOST");
    }

    #[test]
    fn tower_cooldown_uses_simulated_clock() {
        let mut tower = TowerState {
            id: TowerId::new(Role::Host, 0),
            kind: TowerKind::Wifirmino,
            position: Point::default(),
            last_shot: None,
        };
        let interval = Duration::from_millis(500);
        assert!(tower.is_ready(Duration::ZERO, interval));

        tower.last_shot = Some(Duration::from_millis(1_000));
        assert!(!tower.is_ready(Duration::from_millis(1_499), interval));
        assert!(tower.is_ready(Duration::from_millis(1_500), interval));
        assert!(!tower.is_ready(Duration::from_millis(200), interval));
    }

    #[test]
    fn spawn_due_requires_active_wave_and_elapsed_timer() {
        let mut progress = WaveProgress {
            index: 0,
            total: 1,
            active: true,
            spawned: 0,
            spawn_timer: 9,
            current: Some(WaveConfig::new(EnemyKind::Fluri, 2, 10)),
        };
        assert_eq!(progress.spawn_due(), None);

        progress.spawn_timer = 10;
        assert_eq!(progress.spawn_due(), Some(EnemyKind::Fluri));

        progress.spawned = 2;
        assert_eq!(progress.spawn_due(), None);
        assert!(progress.quota_reached());
    }

    #[test]
    fn health_fraction_is_clamped() {
        let mut enemy = EnemyState {
            id: EnemyId::new(0, 0, 0),
            kind: EnemyKind::Noobini,
            position: Point::default(),
            path_index: 0,
            hp: 10,
            max_hp: 20,
            frozen: false,
        };
        assert_eq!(enemy.health_fraction(), 0.5);
        enemy.hp = -5;
        assert_eq!(enemy.health_fraction(), 0.0);
        assert!(!enemy.is_alive());
    }
}
