use std::collections::HashMap;

use brain_defense_core::{EnemyKind, TowerKind};

use crate::{Allegiance, Color};

/// Identifies a drawable asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpriteKey {
    /// Tower of the given kind.
    Tower(TowerKind),
    /// Enemy of the given kind.
    Enemy(EnemyKind),
    /// Projectile without a tower-specific look.
    Projectile,
    /// Base guarding the end of the path.
    Base,
}

/// Loaded sprite: a glyph for text backends and a tint for the rest.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sprite {
    /// Character drawn by text backends.
    pub glyph: char,
    /// Base tint.
    pub tint: Color,
}

impl Sprite {
    /// Applies the treatment of `allegiance`.
    ///
    /// Ally sprites are desaturated, brightened and drawn at 60% opacity; text
    /// backends show them in lower case.
    #[must_use]
    pub fn treated(self, allegiance: Allegiance) -> Self {
        match allegiance {
            Allegiance::Mine => self,
            Allegiance::Ally => Self {
                glyph: self.glyph.to_ascii_lowercase(),
                tint: self.tint.grayscale().lighten(0.5).with_alpha(0.6),
            },
        }
    }
}

/// Loader invoked the first time a key is requested.
pub type SpriteLoader = fn(SpriteKey) -> Sprite;

/// Lazily populated sprite cache owned by a renderer.
#[derive(Debug)]
pub struct SpriteCache {
    sprites: HashMap<SpriteKey, Sprite>,
    loader: SpriteLoader,
    loads: usize,
}

impl Default for SpriteCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SpriteCache {
    /// Cache backed by the built-in sprite table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_loader(builtin_sprite)
    }

    /// Cache backed by a custom loader.
    #[must_use]
    pub fn with_loader(loader: SpriteLoader) -> Self {
        Self {
            sprites: HashMap::new(),
            loader,
            loads: 0,
        }
    }

    /// Sprite for `key`, loading it on first use.
    pub fn sprite(&mut self, key: SpriteKey) -> Sprite {
        let loader = self.loader;
        let loads = &mut self.loads;
        *self.sprites.entry(key).or_insert_with(|| {
            *loads += 1;
            loader(key)
        })
    }

    /// Number of loader invocations so far.
    #[must_use]
    pub fn loads(&self) -> usize {
        self.loads
    }

    /// Number of cached sprites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    /// Reports whether nothing was loaded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

fn builtin_sprite(key: SpriteKey) -> Sprite {
    let (glyph, tint) = match key {
        SpriteKey::Tower(kind) => tower_look(kind),
        SpriteKey::Enemy(kind) => enemy_look(kind),
        SpriteKey::Projectile => ('*', Color::from_rgb_u8(0xfa, 0xcc, 0x15)),
        SpriteKey::Base => ('H', Color::from_rgb_u8(0xe5, 0xe7, 0xeb)),
    };
    Sprite { glyph, tint }
}

fn tower_look(kind: TowerKind) -> (char, Color) {
    match kind {
        TowerKind::BonecaAmbalabu => ('B', Color::from_rgb_u8(0xa1, 0x62, 0x07)),
        TowerKind::Wifirmino => ('W', Color::from_rgb_u8(0x38, 0xbd, 0xf8)),
        TowerKind::SapiniCaiderini => ('S', Color::from_rgb_u8(0xf4, 0x72, 0xb6)),
        TowerKind::TrippiCat => ('T', Color::from_rgb_u8(0xfb, 0x92, 0x3c)),
        TowerKind::Trulimero => ('R', Color::from_rgb_u8(0x2d, 0xd4, 0xbf)),
        TowerKind::Toiletrot => ('O', Color::from_rgb_u8(0xe5, 0xe7, 0xeb)),
        TowerKind::VacaSaturno => ('V', Color::from_rgb_u8(0xc0, 0x84, 0xfc)),
        TowerKind::Chocolatini => ('C', Color::from_rgb_u8(0x78, 0x35, 0x0f)),
        TowerKind::LaGrandeCombinacion => ('G', Color::from_rgb_u8(0xfa, 0xcc, 0x15)),
        TowerKind::WifirminoOnline => ('N', Color::from_rgb_u8(0x60, 0xa5, 0xfa)),
        TowerKind::WifirminoTecnoraiz => ('Z', Color::from_rgb_u8(0x4a, 0xde, 0x80)),
    }
}

// Digits keep enemies apart from the lower-case ally towers.
fn enemy_look(kind: EnemyKind) -> (char, Color) {
    match kind {
        EnemyKind::Noobini => ('1', Color::from_rgb_u8(0x86, 0xef, 0xac)),
        EnemyKind::Fluri => ('2', Color::from_rgb_u8(0xfd, 0xe0, 0x47)),
        EnemyKind::Svinino => ('3', Color::from_rgb_u8(0xf9, 0xa8, 0xd4)),
        EnemyKind::MrBlackfrost => ('4', Color::from_rgb_u8(0x1e, 0x29, 0x3b)),
        EnemyKind::KrampusCookie => ('5', Color::from_rgb_u8(0xb4, 0x53, 0x09)),
        EnemyKind::PeppermintWraith => ('6', Color::from_rgb_u8(0xef, 0x44, 0x44)),
    }
}
