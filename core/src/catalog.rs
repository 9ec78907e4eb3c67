//! Closed registry of tower, enemy, and stage definitions.
//!
//! Type ids are enums rather than free-form strings, so looking up a config
//! record can only miss when a catalog was deliberately built without it.
//! [`Catalog::validate`] catches that case when a match is configured.

use std::{collections::BTreeMap, fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while resolving catalog identifiers or validating stages.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// A tower identifier did not name any known tower kind.
    #[error("unknown tower id `{0}`")]
    UnknownTower(String),
    /// An enemy identifier did not name any known enemy kind.
    #[error("unknown enemy id `{0}`")]
    UnknownEnemy(String),
    /// A tower kind was referenced without a configuration record.
    #[error("tower {0} has no configuration record")]
    MissingTower(TowerKind),
    /// A stage wave referenced an enemy kind without a configuration record.
    #[error("stage {stage} references enemy {enemy} without a configuration record")]
    MissingEnemy {
        /// Identifier of the offending stage.
        stage: u32,
        /// Enemy kind that could not be resolved.
        enemy: EnemyKind,
    },
    /// A stage declared no waves.
    #[error("stage {0} declares no waves")]
    EmptyStage(u32),
    /// A stage index fell outside the campaign.
    #[error("stage index {0} is outside the campaign")]
    UnknownStage(usize),
}

macro_rules! catalog_ids {
    ($name:ident, $error:ident, { $($variant:ident => $id:literal),+ $(,)? }) => {
        impl $name {
            /// Every kind in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stable upper-case identifier used on the wire and in saves.
            #[must_use]
            pub const fn id(self) -> &'static str {
                match self {
                    $(Self::$variant => $id),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.id())
            }
        }

        impl FromStr for $name {
            type Err = CatalogError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($id => Ok(Self::$variant),)+
                    other => Err(CatalogError::$error(other.to_owned())),
                }
            }
        }
    };
}

/// Enumerates every tower that can be placed on the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TowerKind {
    /// Cheap starter tower with a quick attack.
    BonecaAmbalabu,
    /// Budget tower with short range.
    Wifirmino,
    /// Rapid-fire mid-tier tower.
    SapiniCaiderini,
    /// Balanced mid-tier tower.
    TrippiCat,
    /// Heavy hitter with long range.
    Trulimero,
    /// Fast heavy hitter.
    Toiletrot,
    /// Long-range artillery.
    VacaSaturno,
    /// Premium rapid heavy tower.
    Chocolatini,
    /// Endgame tower that erases anything in reach.
    LaGrandeCombinacion,
    /// Evolved networking variant of Wifirmino.
    WifirminoOnline,
    /// Final evolution of Wifirmino.
    WifirminoTecnoraiz,
}

catalog_ids!(TowerKind, UnknownTower, {
    BonecaAmbalabu => "BONECA_AMBALABU",
    Wifirmino => "WIFIRMINO",
    SapiniCaiderini => "SAPINI_CAIDERINI",
    TrippiCat => "TRIPPI_CAT",
    Trulimero => "TRULIMERO",
    Toiletrot => "TOILETROT",
    VacaSaturno => "VACA_SATURNO",
    Chocolatini => "CHOCOLATINI",
    LaGrandeCombinacion => "LA_GRANDE_COMBINACION",
    WifirminoOnline => "WIFIRMINO_ONLINE",
    WifirminoTecnoraiz => "WIFIRMINO_TECNORAIZ",
});

/// Enumerates every enemy that can walk the path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnemyKind {
    /// Fragile forest grunt.
    Noobini,
    /// Sturdier forest grunt.
    Fluri,
    /// Slow forest bruiser.
    Svinino,
    /// Slow snow boss.
    MrBlackfrost,
    /// Fast snow runner.
    KrampusCookie,
    /// Dangerous snow wraith.
    PeppermintWraith,
}

catalog_ids!(EnemyKind, UnknownEnemy, {
    Noobini => "NOOBINI",
    Fluri => "FLURI",
    Svinino => "SVININO",
    MrBlackfrost => "MR_BLACKFROST",
    KrampusCookie => "KRAMPUS_COOKIE",
    PeppermintWraith => "PEPPERMINT_WRAITH",
});

/// Immutable combat statistics of a tower kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerConfig {
    /// Currency deducted when the tower is placed.
    pub cost: u32,
    /// Targeting radius in pixels.
    pub range: f32,
    /// Damage carried by each projectile.
    pub damage: i32,
    /// Minimum simulated time between two shots.
    pub attack_interval: Duration,
}

impl TowerConfig {
    /// Creates a tower configuration.
    #[must_use]
    pub const fn new(cost: u32, range: f32, damage: i32, attack_interval: Duration) -> Self {
        Self {
            cost,
            range,
            damage,
            attack_interval,
        }
    }
}

/// Immutable statistics of an enemy kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyConfig {
    /// Hit points the enemy spawns with.
    pub hp: i32,
    /// Pixels travelled per tick.
    pub speed: f32,
    /// Lives removed when the enemy leaks.
    pub damage: u32,
    /// Currency granted when the enemy is killed.
    pub reward: u32,
}

impl EnemyConfig {
    /// Creates an enemy configuration.
    #[must_use]
    pub const fn new(hp: i32, speed: f32, damage: u32, reward: u32) -> Self {
        Self {
            hp,
            speed,
            damage,
            reward,
        }
    }
}

const fn millis(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// Lookup from tower and enemy kinds to their configuration records.
#[derive(Clone, Debug, PartialEq)]
pub struct Catalog {
    towers: BTreeMap<TowerKind, TowerConfig>,
    enemies: BTreeMap<EnemyKind, EnemyConfig>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalog {
    /// Catalog with no records; populate it with the `with_*` builders.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            towers: BTreeMap::new(),
            enemies: BTreeMap::new(),
        }
    }

    /// Catalog shipped with the game.
    #[must_use]
    pub fn standard() -> Self {
        Self::empty()
            .with_tower(TowerKind::BonecaAmbalabu, TowerConfig::new(30, 150.0, 3, millis(500)))
            .with_tower(TowerKind::Wifirmino, TowerConfig::new(25, 120.0, 5, millis(1_000)))
            .with_tower(TowerKind::SapiniCaiderini, TowerConfig::new(50, 130.0, 6, millis(400)))
            .with_tower(TowerKind::TrippiCat, TowerConfig::new(40, 140.0, 8, millis(800)))
            .with_tower(TowerKind::Trulimero, TowerConfig::new(75, 160.0, 15, millis(500)))
            .with_tower(TowerKind::Toiletrot, TowerConfig::new(90, 145.0, 25, millis(400)))
            .with_tower(TowerKind::VacaSaturno, TowerConfig::new(100, 180.0, 18, millis(600)))
            .with_tower(TowerKind::Chocolatini, TowerConfig::new(250, 180.0, 80, millis(300)))
            .with_tower(
                TowerKind::LaGrandeCombinacion,
                TowerConfig::new(5_000, 400.0, 99_999, millis(200)),
            )
            .with_tower(TowerKind::WifirminoOnline, TowerConfig::new(75, 150.0, 15, millis(800)))
            .with_tower(
                TowerKind::WifirminoTecnoraiz,
                TowerConfig::new(250, 220.0, 45, millis(600)),
            )
            .with_enemy(EnemyKind::Noobini, EnemyConfig::new(25, 1.5, 5, 8))
            .with_enemy(EnemyKind::Fluri, EnemyConfig::new(50, 1.5, 8, 12))
            .with_enemy(EnemyKind::Svinino, EnemyConfig::new(120, 1.2, 15, 20))
            .with_enemy(EnemyKind::MrBlackfrost, EnemyConfig::new(300, 1.0, 30, 50))
            .with_enemy(EnemyKind::KrampusCookie, EnemyConfig::new(100, 1.8, 15, 25))
            .with_enemy(EnemyKind::PeppermintWraith, EnemyConfig::new(220, 1.6, 40, 45))
    }

    /// Adds or replaces the record for a tower kind.
    #[must_use]
    pub fn with_tower(mut self, kind: TowerKind, config: TowerConfig) -> Self {
        let _ = self.towers.insert(kind, config);
        self
    }

    /// Adds or replaces the record for an enemy kind.
    #[must_use]
    pub fn with_enemy(mut self, kind: EnemyKind, config: EnemyConfig) -> Self {
        let _ = self.enemies.insert(kind, config);
        self
    }

    /// Looks up the configuration of a tower kind.
    #[must_use]
    pub fn tower(&self, kind: TowerKind) -> Option<&TowerConfig> {
        self.towers.get(&kind)
    }

    /// Looks up the configuration of an enemy kind.
    #[must_use]
    pub fn enemy(&self, kind: EnemyKind) -> Option<&EnemyConfig> {
        self.enemies.get(&kind)
    }

    /// Confirms that every stage wave and every listed tower resolves.
    pub fn validate(&self, stages: &[StageConfig], towers: &[TowerKind]) -> Result<(), CatalogError> {
        for stage in stages {
            if stage.waves.is_empty() {
                return Err(CatalogError::EmptyStage(stage.id));
            }
            if let Some(wave) = stage.waves.iter().find(|wave| self.enemy(wave.enemy).is_none()) {
                return Err(CatalogError::MissingEnemy {
                    stage: stage.id,
                    enemy: wave.enemy,
                });
            }
        }
        match towers.iter().find(|kind| self.tower(**kind).is_none()) {
            Some(kind) => Err(CatalogError::MissingTower(*kind)),
            None => Ok(()),
        }
    }
}

/// Visual theme applied to a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Theme {
    /// Green forest backdrop.
    Forest,
    /// Snow backdrop with falling flakes.
    Snow,
}

/// Batch of identical enemies spawned at a fixed cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveConfig {
    /// Enemy kind produced by the wave.
    pub enemy: EnemyKind,
    /// Number of enemies spawned before the wave drains.
    pub count: u32,
    /// Ticks between two consecutive spawns.
    pub interval_ticks: u32,
}

impl WaveConfig {
    /// Creates a wave definition.
    #[must_use]
    pub const fn new(enemy: EnemyKind, count: u32, interval_ticks: u32) -> Self {
        Self {
            enemy,
            count,
            interval_ticks,
        }
    }
}

/// Playable stage: starting economy and an ordered list of waves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Stable stage identifier, starting at one.
    pub id: u32,
    /// Backdrop used when drawing the stage.
    pub theme: Theme,
    /// Currency available when the stage starts.
    pub starting_money: u32,
    /// Waves played in order.
    pub waves: Vec<WaveConfig>,
}

/// Number of consecutive stages that make up a level.
pub const STAGES_PER_LEVEL: usize = 3;

/// Ordered list of stages grouped into levels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Campaign {
    stages: Vec<StageConfig>,
}

impl Default for Campaign {
    fn default() -> Self {
        Self::standard()
    }
}

impl Campaign {
    /// Creates a campaign from explicit stages.
    #[must_use]
    pub fn new(stages: Vec<StageConfig>) -> Self {
        Self { stages }
    }

    /// Campaign shipped with the game: two levels of three stages each.
    #[must_use]
    pub fn standard() -> Self {
        use EnemyKind::{Fluri, KrampusCookie, MrBlackfrost, Noobini, PeppermintWraith, Svinino};

        let stage = |id, theme, starting_money, waves: &[WaveConfig]| StageConfig {
            id,
            theme,
            starting_money,
            waves: waves.to_vec(),
        };

        Self::new(vec![
            stage(
                1,
                Theme::Forest,
                100,
                &[WaveConfig::new(Noobini, 5, 100), WaveConfig::new(Fluri, 5, 150)],
            ),
            stage(
                2,
                Theme::Forest,
                150,
                &[
                    WaveConfig::new(Noobini, 5, 80),
                    WaveConfig::new(Fluri, 5, 120),
                    WaveConfig::new(Svinino, 5, 200),
                ],
            ),
            stage(
                3,
                Theme::Forest,
                200,
                &[
                    WaveConfig::new(Noobini, 5, 60),
                    WaveConfig::new(Fluri, 5, 100),
                    WaveConfig::new(Svinino, 5, 150),
                ],
            ),
            stage(
                4,
                Theme::Snow,
                250,
                &[
                    WaveConfig::new(MrBlackfrost, 10, 150),
                    WaveConfig::new(KrampusCookie, 10, 120),
                    WaveConfig::new(PeppermintWraith, 10, 100),
                ],
            ),
            stage(
                5,
                Theme::Snow,
                300,
                &[
                    WaveConfig::new(KrampusCookie, 10, 80),
                    WaveConfig::new(MrBlackfrost, 8, 150),
                ],
            ),
            stage(
                6,
                Theme::Snow,
                350,
                &[
                    WaveConfig::new(MrBlackfrost, 12, 100),
                    WaveConfig::new(KrampusCookie, 20, 60),
                ],
            ),
        ])
    }

    /// Every stage in play order.
    #[must_use]
    pub fn stages(&self) -> &[StageConfig] {
        &self.stages
    }

    /// Looks up a stage by zero-based index.
    pub fn stage(&self, index: usize) -> Result<&StageConfig, CatalogError> {
        self.stages.get(index).ok_or(CatalogError::UnknownStage(index))
    }

    /// Number of levels the campaign spans.
    #[must_use]
    pub fn level_count(&self) -> u32 {
        self.stages.len().div_ceil(STAGES_PER_LEVEL) as u32
    }

    /// Index of the first stage belonging to a one-based level.
    #[must_use]
    pub fn first_stage_of(level: u32) -> usize {
        (level.max(1) as usize - 1) * STAGES_PER_LEVEL
    }

    /// One-based level that contains the stage index.
    #[must_use]
    pub fn level_of(stage_index: usize) -> u32 {
        (stage_index / STAGES_PER_LEVEL) as u32 + 1
    }

    /// Level completed by winning the stage, when it is the level's last stage.
    #[must_use]
    pub fn completes_level(&self, stage_index: usize) -> Option<u32> {
        let last_of_level = stage_index % STAGES_PER_LEVEL == STAGES_PER_LEVEL - 1;
        let is_last_stage = stage_index + 1 == self.stages.len();
        (stage_index < self.stages.len() && (last_of_level || is_last_stage))
            .then(|| Self::level_of(stage_index))
    }
}

/// Reports whether a level is playable given the completed levels.
///
/// Level one is always open; every later level requires its predecessor.
#[must_use]
pub fn is_level_unlocked(level: u32, completed: &[u32]) -> bool {
    level <= 1 || completed.contains(&(level - 1))
}
