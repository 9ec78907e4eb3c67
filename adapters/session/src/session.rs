//! Per-frame orchestration of one match.

use std::time::Duration;

use brain_defense_core::{
    Campaign, Catalog, Command, Event, OverwriteScope, PlacementError, Point, Role, TowerId,
    TowerKind, TowerTarget, Viewport, DEFAULT_LIVES,
};
use brain_defense_storage::{ActiveSession, Autosave, KeyValueStore, SnapshotVault};
use brain_defense_system_builder::{
    Builder, Config as BuilderConfig, PlacementContext, PlacementPreview,
};
use brain_defense_system_movement::{Movement, PathView};
use brain_defense_system_spawning::{Config as SpawningConfig, Spawning};
use brain_defense_system_sync::{
    CoopAction, CoopSync, Message, Outbound, SeenMessages, VoteSignal, VoteState,
};
use brain_defense_system_tower_combat::{ProjectileFlight, TowerCombat};
use brain_defense_system_tower_targeting::TowerTargeting;
use brain_defense_system_wave_control::{
    Authority, Config as WaveControlConfig, WaveControl, AUTO_ADVANCE_DELAY,
};
use brain_defense_world::{self as world, query, MatchConfig, World};
use tracing::{debug, info, warn};

use crate::progression::Progression;
use crate::SessionError;

/// Tunables of a session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionOptions {
    viewport: Viewport,
    lives: u32,
    seed: u64,
    autosave: Autosave,
    auto_advance: Duration,
}

impl SessionOptions {
    /// Options for a match drawn into `viewport`.
    #[must_use]
    pub const fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            lives: DEFAULT_LIVES,
            seed: 0,
            autosave: Autosave::new(brain_defense_storage::AUTOSAVE_INTERVAL_TICKS),
            auto_advance: AUTO_ADVANCE_DELAY,
        }
    }

    /// Overrides the starting lives.
    #[must_use]
    pub const fn with_lives(mut self, lives: u32) -> Self {
        self.lives = lives;
        self
    }

    /// Seed of single-player matches; cooperative matches use the shared seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Overrides the snapshot cadence.
    #[must_use]
    pub const fn with_autosave(mut self, autosave: Autosave) -> Self {
        self.autosave = autosave;
        self
    }

    /// Overrides the pause between a cleared wave and the next.
    #[must_use]
    pub const fn with_auto_advance(mut self, delay: Duration) -> Self {
        self.auto_advance = delay;
        self
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

/// How a match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conclusion {
    /// Every wave was cleared.
    Won {
        /// Account bonus earned by the win.
        bonus: u32,
        /// Level finished by winning this stage, if it was the level's last.
        completed_level: Option<u32>,
    },
    /// Lives ran out.
    Lost,
    /// The player left, alone or by an agreed surrender.
    Abandoned,
}

impl Conclusion {
    /// Reports the result to the account.
    pub fn settle<P: Progression + ?Sized>(&self, progression: &mut P) {
        if let Self::Won {
            bonus,
            completed_level,
        } = *self
        {
            progression.credit(bonus);
            if let Some(level) = completed_level {
                progression.mark_level_complete(level);
            }
        }
    }
}

/// Transient, user-facing notices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Notice {
    /// A placement attempt was refused; nothing changed.
    PlacementRejected(PlacementError),
    /// The partner proposes to surrender and awaits an answer.
    SurrenderRequested,
    /// The partner refused to surrender.
    SurrenderDenied,
    /// The match is over.
    Concluded(Conclusion),
}

/// One running match.
#[derive(Debug)]
pub struct Session<S> {
    world: World,
    record: ActiveSession,
    completes_level: Option<u32>,
    loadout: Vec<TowerKind>,
    selected: TowerKind,
    spawning: Spawning,
    movement: Movement,
    targeting: TowerTargeting,
    combat: TowerCombat,
    flight: ProjectileFlight,
    targets: Vec<TowerTarget>,
    builder: Builder,
    waves: WaveControl,
    coop: Option<CoopSync>,
    seen: SeenMessages,
    vault: SnapshotVault<S>,
    autosave: Autosave,
    outbound: Vec<Outbound>,
    notices: Vec<Notice>,
    conclusion: Option<Conclusion>,
}

impl<S: KeyValueStore> Session<S> {
    /// Starts the stage named by `record`, resuming its snapshot when the
    /// vault holds one for the same session.
    ///
    /// Cooperative sessions queue a catch-up request for the peer.
    pub fn start(
        campaign: &Campaign,
        record: ActiveSession,
        loadout: &[TowerKind],
        vault: SnapshotVault<S>,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let selected = *loadout.first().ok_or(SessionError::EmptyLoadout)?;
        let stage = campaign.stage(record.stage_index)?.clone();
        let catalog = Catalog::standard();
        catalog.validate(std::slice::from_ref(&stage), loadout)?;

        let coop = record.multiplayer.clone().map(CoopSync::new);
        let role = coop.as_ref().map_or(Role::Host, CoopSync::role);
        let seed = coop.as_ref().map_or(options.seed, |coop| coop.descriptor().seed);
        let (builder, authority) = match &coop {
            Some(_) => (
                Builder::new(BuilderConfig::restricted_to(role.side())),
                Authority::from(role),
            ),
            None => (Builder::new(BuilderConfig::solo()), Authority::Autonomous),
        };

        let mut world = World::new(
            MatchConfig::new(stage, catalog)
                .with_viewport(options.viewport)
                .with_lives(options.lives)
                .with_local_role(role),
        );
        let mut waves =
            WaveControl::new(WaveControlConfig::new(authority).with_delay(options.auto_advance));

        if let Some(snapshot) = vault.resume(&record) {
            info!(stage = record.stage_index, tick = snapshot.tick, "resuming saved match");
            let mut events = Vec::new();
            world::apply(
                &mut world,
                Command::Overwrite {
                    snapshot: Box::new(snapshot),
                    scope: OverwriteScope::Restore,
                },
                &mut events,
            );
            waves.resume(query::wave_progress(&world));
        }
        if let Err(error) = vault.begin_session(&record) {
            warn!(%error, "failed to record active session");
        }

        let mut outbound = Vec::new();
        if let Some(coop) = &coop {
            info!(topic = coop.topic(), role = %role, "joining cooperative match");
            outbound.push(coop.connect());
        }

        Ok(Self {
            world,
            completes_level: campaign.completes_level(record.stage_index),
            record,
            loadout: loadout.to_vec(),
            selected,
            spawning: Spawning::new(SpawningConfig::new(seed)),
            movement: Movement::new(),
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            flight: ProjectileFlight::new(),
            targets: Vec::new(),
            builder,
            waves,
            coop,
            seen: SeenMessages::default(),
            vault,
            autosave: options.autosave,
            outbound,
            notices: Vec::new(),
            conclusion: None,
        })
    }

    /// Read-only access to the match.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Record this session was started from.
    #[must_use]
    pub fn record(&self) -> &ActiveSession {
        &self.record
    }

    /// Role of the local player; single-player sessions play as host.
    #[must_use]
    pub fn role(&self) -> Role {
        query::local_role(&self.world)
    }

    /// Match topic of a cooperative session.
    #[must_use]
    pub fn match_topic(&self) -> Option<&str> {
        self.coop.as_ref().map(CoopSync::topic)
    }

    /// State of the surrender vote; always idle in single-player.
    #[must_use]
    pub fn vote_state(&self) -> VoteState {
        self.coop.as_ref().map_or(VoteState::None, CoopSync::vote_state)
    }

    /// Wave control, exposing the pending auto-advance.
    #[must_use]
    pub fn waves(&self) -> &WaveControl {
        &self.waves
    }

    /// Towers available for placement.
    #[must_use]
    pub fn loadout(&self) -> &[TowerKind] {
        &self.loadout
    }

    /// Tower placed by the next [`Session::place_tower`].
    #[must_use]
    pub fn selected(&self) -> TowerKind {
        self.selected
    }

    /// Selects `kind` if it is part of the loadout.
    pub fn select(&mut self, kind: TowerKind) -> bool {
        if !self.loadout.contains(&kind) {
            return false;
        }
        self.selected = kind;
        true
    }

    /// How the match ended, once it has.
    #[must_use]
    pub fn conclusion(&self) -> Option<Conclusion> {
        self.conclusion
    }

    /// Describes whether the selected tower could be placed at `pointer`.
    #[must_use]
    pub fn preview(&self, pointer: Point) -> PlacementPreview {
        self.builder
            .preview(self.selected, pointer, &placement_context(&self.world))
    }

    /// Places the selected tower at `pointer`, in viewport pixels.
    ///
    /// A refused placement changes nothing and raises a notice.
    pub fn place_tower(&mut self, pointer: Point) -> Result<TowerId, PlacementError> {
        let kind = self.selected;
        if self.conclusion.is_some() {
            return Err(PlacementError::Unavailable(kind));
        }
        let mut commands = Vec::new();
        let attempt =
            self.builder
                .handle(kind, pointer, &placement_context(&self.world), &mut commands);
        if let Err(reason) = attempt {
            debug!(%kind, %reason, "placement rejected");
            self.notices.push(Notice::PlacementRejected(reason));
            return Err(reason);
        }

        let events = self.submit(commands);
        let placed = events.iter().find_map(|event| match event {
            Event::TowerPlaced { tower, .. } => Some(Ok(*tower)),
            Event::TowerPlacementRejected { reason, .. } => Some(Err(*reason)),
            _ => None,
        });
        match placed {
            Some(Ok(tower)) => Ok(tower),
            Some(Err(reason)) => {
                self.notices.push(Notice::PlacementRejected(reason));
                Err(reason)
            }
            None => Err(PlacementError::Unavailable(kind)),
        }
    }

    /// Starts the next wave now, if the local player may.
    pub fn start_next_wave(&mut self) -> bool {
        let mut commands = Vec::new();
        if !self
            .waves
            .request_start(query::wave_progress(&self.world), &mut commands)
        {
            return false;
        }
        let events = self.submit(commands);
        events
            .iter()
            .any(|event| matches!(event, Event::WaveStarted { .. }))
    }

    /// Deducts `amount` from the in-match balance if affordable.
    pub fn spend(&mut self, amount: u32) -> bool {
        if self.conclusion.is_some() {
            return false;
        }
        let events = self.submit(vec![Command::Spend { amount }]);
        !events
            .iter()
            .any(|event| matches!(event, Event::SpendRejected { .. }))
    }

    /// Adopts a new viewport, rescaling every live position.
    pub fn resize(&mut self, viewport: Viewport) {
        let _ = self.submit(vec![Command::Resize { viewport }]);
    }

    /// Runs one simulation frame and returns everything it produced.
    pub fn frame(&mut self, dt: Duration) -> Vec<Event> {
        if self.conclusion.is_some() {
            return Vec::new();
        }

        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Tick { dt }, &mut events);
        let mut commands = Vec::new();

        self.spawning
            .handle(&events, query::wave_progress(&self.world), &mut commands);
        self.flush(&mut commands, &mut events);

        self.movement.handle(
            &events,
            query::enemies(&self.world),
            PathView {
                path: query::path(&self.world),
                viewport: query::viewport(&self.world),
                catalog: query::catalog(&self.world),
            },
            &mut commands,
        );
        self.flush(&mut commands, &mut events);

        self.targeting.handle(
            query::towers(&self.world),
            query::enemies(&self.world),
            query::catalog(&self.world),
            &mut self.targets,
        );
        self.combat.handle(
            query::towers(&self.world),
            query::catalog(&self.world),
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

        self.waves
            .handle(&events, query::wave_progress(&self.world), &mut commands);
        self.flush(&mut commands, &mut events);

        self.observe(&events);
        if self.conclusion.is_none() && self.autosave.is_due(query::tick(&self.world)) {
            if let Err(error) = self.vault.save_snapshot(&query::snapshot(&self.world)) {
                warn!(%error, "autosave failed");
            }
        }
        events
    }

    /// Applies a delivery from the match topic.
    ///
    /// Replays of an already processed delivery id, malformed payloads and
    /// the local player's own messages are dropped.
    pub fn receive(&mut self, id: &str, payload: &str) {
        if !self.seen.first_sighting(id) {
            return;
        }
        let message = match Message::decode(payload) {
            Ok(message) => message,
            Err(error) => {
                debug!(id, %error, "discarding malformed message");
                return;
            }
        };
        let viewport = query::viewport(&self.world);
        let Some(action) = self
            .coop
            .as_mut()
            .and_then(|coop| coop.receive(message, viewport))
        else {
            return;
        };

        match action {
            CoopAction::Apply(command) => {
                let events = self.submit(vec![command]);
                let overwritten = events.iter().any(|event| {
                    matches!(
                        event,
                        Event::StateOverwritten {
                            scope: OverwriteScope::Peer
                        }
                    )
                });
                if overwritten {
                    self.waves.resume(query::wave_progress(&self.world));
                }
            }
            CoopAction::WaveAnnounced(index) => {
                let mut commands = Vec::new();
                let announcement =
                    self.waves
                        .announce(index, query::wave_progress(&self.world), &mut commands);
                debug!(index, ?announcement, "host announced wave");
                let _ = self.submit(commands);
            }
            CoopAction::ShareState => {
                if let Some(coop) = &self.coop {
                    self.outbound
                        .push(coop.share_state(query::snapshot(&self.world)));
                }
            }
            CoopAction::Surrender(VoteSignal::Prompt) => {
                self.notices.push(Notice::SurrenderRequested);
            }
            CoopAction::Surrender(VoteSignal::Denied) => {
                self.notices.push(Notice::SurrenderDenied);
            }
            CoopAction::Surrender(VoteSignal::Exit) => self.conclude(Conclusion::Abandoned),
        }
    }

    /// Proposes to surrender; only possible in a cooperative match.
    pub fn request_surrender(&mut self) -> bool {
        let Some(ballot) = self.coop.as_mut().and_then(CoopSync::request_surrender) else {
            return false;
        };
        self.outbound.push(ballot);
        true
    }

    /// Answers the partner's proposal; agreeing ends the match for both.
    pub fn answer_surrender(&mut self, agree: bool) {
        let Some(ballot) = self
            .coop
            .as_mut()
            .and_then(|coop| coop.answer_surrender(agree))
        else {
            return;
        };
        self.outbound.push(ballot);
        if agree {
            self.conclude(Conclusion::Abandoned);
        }
    }

    /// Leaves the match.
    pub fn abandon(&mut self) {
        self.conclude(Conclusion::Abandoned);
    }

    /// Publications queued since the last call.
    pub fn drain_outbound(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbound)
    }

    /// Notices raised since the last call.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn submit(&mut self, commands: Vec<Command>) -> Vec<Event> {
        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }
        self.observe(&events);
        events
    }

    fn flush(&mut self, commands: &mut Vec<Command>, events: &mut Vec<Event>) {
        for command in commands.drain(..) {
            world::apply(&mut self.world, command, events);
        }
    }

    fn observe(&mut self, events: &[Event]) {
        if let Some(coop) = &self.coop {
            coop.observe(events, query::viewport(&self.world), &mut self.outbound);
        }
        for event in events {
            match event {
                Event::MatchWon { bonus } => self.conclude(Conclusion::Won {
                    bonus: *bonus,
                    completed_level: self.completes_level,
                }),
                Event::MatchLost => self.conclude(Conclusion::Lost),
                _ => {}
            }
        }
    }

    fn conclude(&mut self, conclusion: Conclusion) {
        if self.conclusion.is_some() {
            return;
        }
        info!(?conclusion, stage = self.record.stage_index, "session over");
        self.conclusion = Some(conclusion);
        self.notices.push(Notice::Concluded(conclusion));
        if let Err(error) = self.vault.end_session() {
            warn!(%error, "failed to clear session records");
        }
    }
}

fn placement_context(world: &World) -> PlacementContext<'_> {
    PlacementContext {
        balance: query::coins(world),
        catalog: query::catalog(world),
        path: query::path(world),
        viewport: query::viewport(world),
        towers: query::towers(world),
    }
}
