//! Running a match from the terminal.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use brain_defense_core::{Campaign, Event, Point, TowerKind};
use brain_defense_rendering::{MatchView, RenderingBackend, Scene, TextRenderer};
use brain_defense_session::{
    fresh_entropy, run_match, Conclusion, Notice, Progression, Session, SessionOptions,
};
use brain_defense_storage::{ActiveSession, FileStore, KeyValueStore, SnapshotVault};
use brain_defense_system_sync::MatchFound;
use brain_defense_world::query;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::App;

const MAP_COLUMNS: usize = 80;
const MAP_ROWS: usize = 24;

/// What the terminal does on the player's behalf during a match.
#[derive(Clone, Debug, Default)]
pub(crate) struct Plan {
    /// Tower selected before placing.
    pub(crate) tower: Option<TowerKind>,
    /// Pointer positions placed on the first frame, in viewport pixels.
    pub(crate) placements: Vec<Point>,
    /// Leave (or propose to surrender) after this much play.
    pub(crate) time_limit: Option<Duration>,
    /// Answer to a partner's surrender proposal.
    pub(crate) agree_to_surrender: bool,
    /// Draw the map into the terminal.
    pub(crate) render: bool,
}

/// Record for a fresh single-player run of `stage_index`.
pub(crate) fn solo_record(stage_index: usize) -> ActiveSession {
    ActiveSession {
        stage_index,
        multiplayer: None,
    }
}

/// Record for a cooperative match found in the lobby or through an invitation.
pub(crate) fn coop_record(found: MatchFound) -> ActiveSession {
    let MatchFound { level, descriptor } = found;
    ActiveSession {
        stage_index: Campaign::first_stage_of(level),
        multiplayer: Some(descriptor),
    }
}

/// Active session left behind by an interrupted run.
pub(crate) fn interrupted(store: &FileStore) -> Option<ActiveSession> {
    SnapshotVault::new(store.clone()).active_session()
}

/// Plays `record` to the end and settles the result into the profile.
pub(crate) async fn play(app: &App, record: ActiveSession, plan: &Plan) -> Result<Conclusion> {
    let mut profile = app.accounts.profile();
    let options = SessionOptions::new(app.settings.viewport())
        .with_lives(app.settings.lives)
        .with_seed(fresh_entropy().seed);
    let mut session = Session::start(
        &Campaign::standard(),
        record,
        profile.equipped_towers(),
        SnapshotVault::new(app.store.clone()),
        options,
    )
    .context("failed to start the match")?;
    info!(
        stage = session.record().stage_index,
        role = %session.role(),
        topic = session.match_topic().unwrap_or("-"),
        "match started"
    );

    let mut pilot = Pilot::new(&app.settings, plan, io::stdout());
    let conclusion = run_match(
        &mut session,
        Arc::clone(&app.relay),
        app.settings.driver_options(),
        |session, events| pilot.on_frame(session, events),
    )
    .await;

    conclusion.settle(&mut profile);
    app.accounts
        .save_profile(&profile)
        .context("failed to save the profile")?;
    info!(?conclusion, balance = profile.balance(), "match settled");
    Ok(conclusion)
}

struct Pilot<'a, W> {
    plan: &'a Plan,
    frame: Duration,
    first_wave_delay: Duration,
    render_every: u32,
    starting_lives: u32,
    elapsed: Duration,
    frames: u32,
    wave_requested: bool,
    out_of_time: bool,
    renderer: Option<TextRenderer<W>>,
}

impl<'a, W: io::Write> Pilot<'a, W> {
    fn new(settings: &Settings, plan: &'a Plan, out: W) -> Self {
        Self {
            plan,
            frame: settings.frame(),
            first_wave_delay: settings.first_wave_delay(),
            render_every: settings.render_every.max(1),
            starting_lives: settings.lives,
            elapsed: Duration::ZERO,
            frames: 0,
            wave_requested: false,
            out_of_time: false,
            renderer: plan
                .render
                .then(|| TextRenderer::new(out, MAP_COLUMNS, MAP_ROWS)),
        }
    }

    fn on_frame<S: KeyValueStore>(&mut self, session: &mut Session<S>, events: &[Event]) {
        self.frames += 1;
        self.elapsed += self.frame;

        if self.frames == 1 {
            self.place_planned(session);
        }
        if !self.wave_requested && self.elapsed >= self.first_wave_delay {
            self.wave_requested = true;
            if session.start_next_wave() {
                info!("first wave started");
            }
        }

        for event in events {
            match event {
                Event::WaveStarted { wave } => info!(wave = wave + 1, "wave started"),
                Event::WaveCleared { wave, .. } => info!(wave = wave + 1, "wave cleared"),
                Event::EnemyLeaked { lives, .. } => debug!(lives, "enemy reached the base"),
                _ => {}
            }
        }
        for notice in session.drain_notices() {
            match notice {
                Notice::PlacementRejected(reason) => warn!(%reason, "placement rejected"),
                Notice::SurrenderRequested => {
                    info!(agree = self.plan.agree_to_surrender, "partner proposes to surrender");
                    session.answer_surrender(self.plan.agree_to_surrender);
                }
                Notice::SurrenderDenied => info!("partner wants to keep playing"),
                Notice::Concluded(conclusion) => info!(?conclusion, "match over"),
            }
        }

        if let Some(limit) = self.plan.time_limit {
            if !self.out_of_time && self.elapsed >= limit {
                self.out_of_time = true;
                if session.request_surrender() {
                    info!("time is up, proposing to surrender");
                } else {
                    session.abandon();
                }
            }
        }

        if self.frames % self.render_every == 0 {
            self.draw(session);
        }
    }

    fn place_planned<S: KeyValueStore>(&mut self, session: &mut Session<S>) {
        if let Some(kind) = self.plan.tower {
            if !session.select(kind) {
                warn!(%kind, "tower is not equipped, keeping {}", session.selected());
            }
        }
        for pointer in &self.plan.placements {
            // Rejections surface through the notice queue.
            if let Ok(tower) = session.place_tower(*pointer) {
                info!(%tower, x = pointer.x, y = pointer.y, "tower placed");
            }
        }
    }

    fn draw<S: KeyValueStore>(&mut self, session: &Session<S>) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let world = session.world();
        let scene = Scene::capture(&MatchView {
            viewport: query::viewport(world),
            path: query::path(world),
            theme: query::stage(world).theme,
            local_role: query::local_role(world),
            cooperative: session.record().is_multiplayer(),
            coins: query::coins(world),
            lives: query::lives(world),
            starting_lives: self.starting_lives,
            wave: query::wave_progress(world),
            towers: query::towers(world),
            enemies: query::enemies(world),
            projectiles: query::projectiles(world),
        });
        if let Err(error) = renderer.present(&scene) {
            warn!(%error, "failed to draw the map");
        }
    }
}
