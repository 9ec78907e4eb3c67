#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Brain Defense adapters.
//!
//! Rendering never touches the simulation: a [`Scene`] is captured from a
//! read-only [`MatchView`] and handed to a [`RenderingBackend`].

mod sprites;
mod text;

use anyhow::Result as AnyResult;
use brain_defense_core::{
    EnemyId, EnemyKind, EnemyState, Path, Point, ProjectileState, Role, Side, Theme, TowerId,
    TowerKind, TowerState, Viewport, WaveProgress,
};
use glam::Vec2;

pub use sprites::{Sprite, SpriteCache, SpriteKey, SpriteLoader};
pub use text::TextRenderer;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }

    /// Returns the color with every channel replaced by its luminance.
    #[must_use]
    pub fn grayscale(self) -> Self {
        let luma = 0.2126 * self.red + 0.7152 * self.green + 0.0722 * self.blue;
        Self::new(luma, luma, luma, self.alpha)
    }

    /// Returns the color with a different opacity.
    #[must_use]
    pub const fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Colors of the fixed scene elements for one stage theme.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    /// Fill behind everything else.
    pub backdrop: Color,
    /// Wide outer stroke of the path.
    pub path_edge: Color,
    /// Narrow inner stroke of the path.
    pub path_core: Color,
    /// Dashed co-op centre line.
    pub divider: Color,
}

impl Palette {
    /// Palette used for `theme`.
    #[must_use]
    pub const fn for_theme(theme: Theme) -> Self {
        let divider = Color::new(1.0, 1.0, 1.0, 0.4);
        match theme {
            Theme::Forest => Self {
                backdrop: Color::from_rgb_u8(0x14, 0x53, 0x2d),
                path_edge: Color::from_rgb_u8(0x92, 0x40, 0x0e),
                path_core: Color::from_rgb_u8(0xb4, 0x53, 0x09),
                divider,
            },
            Theme::Snow => Self {
                backdrop: Color::from_rgb_u8(0x02, 0x06, 0x17),
                path_edge: Color::from_rgb_u8(0x33, 0x41, 0x55),
                path_core: Color::from_rgb_u8(0xba, 0xe6, 0xfd),
                divider,
            },
        }
    }
}

/// Whose tower a scene tower is, from the viewer's perspective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Allegiance {
    /// Placed by the local player.
    Mine,
    /// Replicated from the partner; drawn faded and desaturated.
    Ally,
}

/// Horizontal direction an enemy sprite faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Facing {
    /// Mirrored sprite, walking towards smaller x.
    Left,
    /// Unmirrored sprite.
    Right,
}

/// Tower drawn in the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneTower {
    /// Identifier of the tower.
    pub id: TowerId,
    /// Kind selecting the sprite.
    pub kind: TowerKind,
    /// Centre in viewport pixels.
    pub position: Vec2,
    /// Whether the viewer placed the tower.
    pub allegiance: Allegiance,
}

/// Enemy drawn in the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneEnemy {
    /// Identifier of the enemy.
    pub id: EnemyId,
    /// Kind selecting the sprite.
    pub kind: EnemyKind,
    /// Centre in viewport pixels.
    pub position: Vec2,
    /// Direction of travel towards the next waypoint.
    pub facing: Facing,
    /// Remaining hit points as a fraction in 0.0..=1.0.
    pub health: f32,
}

impl SceneEnemy {
    /// Fill of the health bar: green above half health, red otherwise.
    #[must_use]
    pub fn health_color(&self) -> Color {
        if self.health > 0.5 {
            Color::from_rgb_u8(0x22, 0xc5, 0x5e)
        } else {
            Color::from_rgb_u8(0xef, 0x44, 0x44)
        }
    }
}

/// Projectile drawn in the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneProjectile {
    /// Centre in viewport pixels.
    pub position: Vec2,
    /// Unit vector towards the target, absent once the target is gone.
    pub heading: Option<Vec2>,
    /// Tower kind that fired it, when known.
    pub kind: Option<TowerKind>,
}

impl SceneProjectile {
    /// Sprite rotation in radians; zero without a heading.
    #[must_use]
    pub fn rotation_radians(&self) -> f32 {
        self.heading
            .map_or(0.0, |heading| heading.y.atan2(heading.x))
    }
}

/// Label of one half of a cooperative map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Zone {
    /// The viewer's half.
    Yours,
    /// The partner's half.
    Ally,
}

impl Zone {
    /// Caption drawn at the top of the half.
    #[must_use]
    pub const fn caption(self) -> &'static str {
        match self {
            Self::Yours => "YOUR ZONE",
            Self::Ally => "ALLY ZONE",
        }
    }

    /// Caption color.
    #[must_use]
    pub const fn color(self) -> Color {
        match self {
            Self::Yours => Color::new(100.0 / 255.0, 1.0, 100.0 / 255.0, 0.6),
            Self::Ally => Color::new(100.0 / 255.0, 200.0 / 255.0, 1.0, 0.6),
        }
    }
}

/// Centre line splitting a cooperative map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Divider {
    /// Horizontal position in viewport pixels.
    pub x: f32,
    /// Label of the host's half.
    pub left: Zone,
    /// Label of the client's half.
    pub right: Zone,
}

/// Match status shown above the map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hud {
    /// In-match currency.
    pub coins: u32,
    /// Remaining lives.
    pub lives: u32,
    /// Remaining lives as a fraction of the starting lives.
    pub lives_fraction: f32,
    /// One-based wave shown to the player.
    pub wave: u32,
    /// Number of waves in the stage.
    pub waves: u32,
    /// Whether a wave is running.
    pub wave_active: bool,
}

/// Read-only inputs a scene is captured from.
#[derive(Clone, Copy, Debug)]
pub struct MatchView<'a> {
    /// Current viewport.
    pub viewport: Viewport,
    /// Path enemies follow.
    pub path: &'a Path,
    /// Stage theme.
    pub theme: Theme,
    /// Role of the viewer.
    pub local_role: Role,
    /// Whether the match is cooperative.
    pub cooperative: bool,
    /// In-match currency.
    pub coins: u32,
    /// Remaining lives.
    pub lives: u32,
    /// Lives the match started with.
    pub starting_lives: u32,
    /// Wave progress.
    pub wave: WaveProgress,
    /// Placed towers.
    pub towers: &'a [TowerState],
    /// Live enemies.
    pub enemies: &'a [EnemyState],
    /// In-flight projectiles.
    pub projectiles: &'a [ProjectileState],
}

/// Scene description consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Size of the drawable area in pixels.
    pub size: Vec2,
    /// Colors of the fixed elements.
    pub palette: Palette,
    /// Path waypoints in pixels.
    pub path: Vec<Vec2>,
    /// Towers in placement order.
    pub towers: Vec<SceneTower>,
    /// Enemies in spawn order.
    pub enemies: Vec<SceneEnemy>,
    /// Projectiles in flight.
    pub projectiles: Vec<SceneProjectile>,
    /// Co-op centre line; absent in single-player.
    pub divider: Option<Divider>,
    /// Status line.
    pub hud: Hud,
}

impl Scene {
    /// Captures everything visible in `view`.
    #[must_use]
    pub fn capture(view: &MatchView<'_>) -> Self {
        let viewport = view.viewport;
        let path = view
            .path
            .segments(viewport)
            .enumerate()
            .flat_map(|(index, (start, end))| {
                let head = (index == 0).then_some(to_vec(start));
                head.into_iter().chain([to_vec(end)])
            })
            .collect();

        let towers = view
            .towers
            .iter()
            .map(|tower| SceneTower {
                id: tower.id,
                kind: tower.kind,
                position: to_vec(tower.position),
                allegiance: allegiance(tower.id, view.local_role),
            })
            .collect();

        let enemies = view
            .enemies
            .iter()
            .map(|enemy| SceneEnemy {
                id: enemy.id,
                kind: enemy.kind,
                position: to_vec(enemy.position),
                facing: facing(enemy, view.path, viewport),
                health: enemy.health_fraction(),
            })
            .collect();

        let projectiles = view
            .projectiles
            .iter()
            .filter(|projectile| !projectile.is_consumed())
            .map(|projectile| {
                let heading = view
                    .enemies
                    .iter()
                    .find(|enemy| enemy.id == projectile.target)
                    .map(|enemy| {
                        (to_vec(enemy.position) - to_vec(projectile.position)).normalize_or_zero()
                    });
                SceneProjectile {
                    position: to_vec(projectile.position),
                    heading,
                    kind: projectile.kind,
                }
            })
            .collect();

        let divider = view.cooperative.then(|| Divider {
            x: viewport.centre_line(),
            left: zone(Side::Left, view.local_role),
            right: zone(Side::Right, view.local_role),
        });

        let waves = view.wave.total;
        let lives_fraction = if view.starting_lives == 0 {
            0.0
        } else {
            (view.lives as f32 / view.starting_lives as f32).min(1.0)
        };

        Self {
            size: Vec2::new(viewport.width, viewport.height),
            palette: Palette::for_theme(view.theme),
            path,
            towers,
            enemies,
            projectiles,
            divider,
            hud: Hud {
                coins: view.coins,
                lives: view.lives,
                lives_fraction,
                wave: (view.wave.index + 1).min(waves.max(1)),
                waves,
                wave_active: view.wave.active,
            },
        }
    }
}

fn to_vec(point: Point) -> Vec2 {
    Vec2::new(point.x, point.y)
}

fn allegiance(tower: TowerId, viewer: Role) -> Allegiance {
    if tower.owner == viewer {
        Allegiance::Mine
    } else {
        Allegiance::Ally
    }
}

fn facing(enemy: &EnemyState, path: &Path, viewport: Viewport) -> Facing {
    match path.waypoint(enemy.path_index + 1, viewport) {
        Some(next) if next.x < enemy.position.x => Facing::Left,
        _ => Facing::Right,
    }
}

fn zone(side: Side, viewer: Role) -> Zone {
    if viewer.side() == side {
        Zone::Yours
    } else {
        Zone::Ally
    }
}

/// Rendering backend capable of presenting Brain Defense scenes.
pub trait RenderingBackend {
    /// Presents one frame.
    fn present(&mut self, scene: &Scene) -> AnyResult<()>;
}
