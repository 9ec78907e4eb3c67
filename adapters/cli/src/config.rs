use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use brain_defense_core::{Viewport, TICK_DURATION};
use brain_defense_session::{DriverOptions, LobbyOptions};
use brain_defense_system_sync::Topics;
use clap::Args;
use serde::Deserialize;

/// Settings file read when `--config` is not given and the file exists.
pub(crate) const DEFAULT_CONFIG: &str = "brain-defense.toml";

/// Flags shared by every subcommand; each one overrides the settings file.
#[derive(Args, Debug, Default)]
pub(crate) struct GlobalArgs {
    /// Settings file in TOML format.
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,
    /// Base URL of the ntfy-compatible relay.
    #[arg(long, global = true)]
    pub(crate) relay: Option<String>,
    /// Prefix of every topic.
    #[arg(long, global = true)]
    pub(crate) namespace: Option<String>,
    /// Directory holding profiles, snapshots and the active session.
    #[arg(long, global = true)]
    pub(crate) data_dir: Option<PathBuf>,
    /// Player identifier.
    #[arg(long, global = true)]
    pub(crate) player: Option<String>,
    /// Use an in-process relay instead of the network.
    #[arg(long, global = true)]
    pub(crate) offline: bool,
}

/// Runtime settings of the command-line front end.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    pub(crate) relay_url: String,
    pub(crate) namespace: String,
    pub(crate) data_dir: PathBuf,
    pub(crate) player: String,
    pub(crate) offline: bool,
    pub(crate) poll_interval_ms: u64,
    pub(crate) beacon_interval_ms: u64,
    pub(crate) lobby_history_secs: u64,
    pub(crate) mailbox_history_secs: u64,
    pub(crate) viewport_width: f32,
    pub(crate) viewport_height: f32,
    pub(crate) frames_per_second: u32,
    pub(crate) render_every: u32,
    pub(crate) first_wave_delay_ms: u64,
    pub(crate) lives: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            relay_url: "https://ntfy.sh".to_owned(),
            namespace: brain_defense_system_sync::topics::DEFAULT_NAMESPACE.to_owned(),
            data_dir: PathBuf::from(".brain-defense"),
            player: "GUEST".to_owned(),
            offline: false,
            poll_interval_ms: 5_000,
            beacon_interval_ms: 3_000,
            lobby_history_secs: 10 * 60,
            mailbox_history_secs: 60 * 60,
            viewport_width: 800.0,
            viewport_height: 600.0,
            frames_per_second: 60,
            render_every: 30,
            first_wave_delay_ms: 1_000,
            lives: brain_defense_core::DEFAULT_LIVES,
        }
    }
}

impl Settings {
    /// Reads the settings file, if any, and applies the command-line overrides.
    pub(crate) fn load(args: &GlobalArgs) -> Result<Self> {
        let settings = match &args.config {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG).exists() => Self::from_file(Path::new(DEFAULT_CONFIG))?,
            None => Self::default(),
        };
        Ok(settings.with_overrides(args))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid settings in {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn with_overrides(mut self, args: &GlobalArgs) -> Self {
        if let Some(relay) = &args.relay {
            self.relay_url.clone_from(relay);
        }
        if let Some(namespace) = &args.namespace {
            self.namespace.clone_from(namespace);
        }
        if let Some(data_dir) = &args.data_dir {
            self.data_dir.clone_from(data_dir);
        }
        if let Some(player) = &args.player {
            self.player.clone_from(player);
        }
        self.offline |= args.offline;
        self
    }

    pub(crate) fn topics(&self) -> Topics {
        Topics::new(self.namespace.clone())
    }

    pub(crate) fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width, self.viewport_height)
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(100))
    }

    pub(crate) fn beacon_interval(&self) -> Duration {
        Duration::from_millis(self.beacon_interval_ms.max(100))
    }

    pub(crate) fn first_wave_delay(&self) -> Duration {
        Duration::from_millis(self.first_wave_delay_ms)
    }

    pub(crate) fn frame(&self) -> Duration {
        match self.frames_per_second {
            0 | 60 => TICK_DURATION,
            fps => Duration::from_secs_f64(1.0 / f64::from(fps)),
        }
    }

    pub(crate) fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            frame: self.frame(),
            poll_interval: self.poll_interval(),
        }
    }

    pub(crate) fn lobby_options(&self) -> LobbyOptions {
        LobbyOptions {
            poll_interval: self.poll_interval(),
            lobby_history: Duration::from_secs(self.lobby_history_secs),
            mailbox_history: Duration::from_secs(self.mailbox_history_secs),
            ..LobbyOptions::new()
        }
    }
}
