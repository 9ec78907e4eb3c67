use std::io::Write;

use anyhow::{Context, Result};
use glam::Vec2;

use crate::{RenderingBackend, Scene, SpriteCache, SpriteKey};

const BACKDROP: char = ' ';
const PATH: char = '#';
const DIVIDER: char = ':';

/// Renders scenes as character grids for terminals and logs.
#[derive(Debug)]
pub struct TextRenderer<W> {
    out: W,
    columns: usize,
    rows: usize,
    sprites: SpriteCache,
}

impl<W: Write> TextRenderer<W> {
    /// Creates a renderer drawing `columns` x `rows` cells into `out`.
    #[must_use]
    pub fn new(out: W, columns: usize, rows: usize) -> Self {
        Self {
            out,
            columns: columns.max(8),
            rows: rows.max(4),
            sprites: SpriteCache::new(),
        }
    }

    /// Sprite cache used by this renderer.
    #[must_use]
    pub fn sprites(&self) -> &SpriteCache {
        &self.sprites
    }

    /// Draws `scene` into a string: one status line followed by the map.
    pub fn render(&mut self, scene: &Scene) -> String {
        let mut grid = vec![vec![BACKDROP; self.columns]; self.rows];

        for pair in scene.path.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let steps = ((end - start).length() / self.cell_size(scene).min_element()).ceil();
            let steps = (steps as usize).max(1) * 2;
            for step in 0..=steps {
                let point = start.lerp(end, step as f32 / steps as f32);
                self.plot(&mut grid, scene, point, PATH);
            }
        }

        if let Some(divider) = scene.divider {
            let column = self.column(scene, divider.x);
            for row in &mut grid {
                row[column] = DIVIDER;
            }
            let quarter = self.columns / 4;
            stamp(&mut grid[0], quarter, divider.left.caption());
            stamp(&mut grid[0], quarter * 3, divider.right.caption());
        }

        if let Some(end) = scene.path.last() {
            let base = self.sprites.sprite(SpriteKey::Base);
            self.plot(&mut grid, scene, *end, base.glyph);
        }

        for tower in &scene.towers {
            let sprite = self
                .sprites
                .sprite(SpriteKey::Tower(tower.kind))
                .treated(tower.allegiance);
            self.plot(&mut grid, scene, tower.position, sprite.glyph);
        }
        for projectile in &scene.projectiles {
            let sprite = self.sprites.sprite(SpriteKey::Projectile);
            self.plot(&mut grid, scene, projectile.position, sprite.glyph);
        }
        for enemy in &scene.enemies {
            let sprite = self.sprites.sprite(SpriteKey::Enemy(enemy.kind));
            self.plot(&mut grid, scene, enemy.position, sprite.glyph);
        }

        let hud = scene.hud;
        let mut frame = format!(
            "coins {}  lives {} ({:.0}%)  wave {}/{}{}\n",
            hud.coins,
            hud.lives,
            hud.lives_fraction * 100.0,
            hud.wave,
            hud.waves,
            if hud.wave_active { " running" } else { "" },
        );
        for row in grid {
            frame.extend(row);
            frame.push('\n');
        }
        frame
    }

    fn cell_size(&self, scene: &Scene) -> Vec2 {
        Vec2::new(
            scene.size.x / self.columns as f32,
            scene.size.y / self.rows as f32,
        )
        .max(Vec2::splat(f32::EPSILON))
    }

    fn column(&self, scene: &Scene, x: f32) -> usize {
        let column = (x / self.cell_size(scene).x).floor().max(0.0) as usize;
        column.min(self.columns - 1)
    }

    fn row(&self, scene: &Scene, y: f32) -> usize {
        let row = (y / self.cell_size(scene).y).floor().max(0.0) as usize;
        row.min(self.rows - 1)
    }

    fn plot(&self, grid: &mut [Vec<char>], scene: &Scene, point: Vec2, glyph: char) {
        grid[self.row(scene, point.y)][self.column(scene, point.x)] = glyph;
    }
}

impl<W: Write> RenderingBackend for TextRenderer<W> {
    fn present(&mut self, scene: &Scene) -> Result<()> {
        let frame = self.render(scene);
        self.out
            .write_all(frame.as_bytes())
            .context("failed to write frame")?;
        self.out.flush().context("failed to flush frame")
    }
}

fn stamp(row: &mut [char], centre: usize, caption: &str) {
    let start = centre.saturating_sub(caption.len() / 2);
    for (cell, glyph) in row.iter_mut().skip(start).zip(caption.chars()) {
        *cell = glyph;
    }
}
