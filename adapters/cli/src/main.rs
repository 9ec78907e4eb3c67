#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line front end for Brain Defense.
//!
//! Plays single-player stages and cooperative matches headlessly, with an
//! optional text rendering of the map, and manages friends, invitations
//! and direct chat over the relay.

mod config;
mod play;
mod profile;
mod social;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use brain_defense_core::{is_level_unlocked, Campaign, Point, TowerKind};
use brain_defense_relay::{MemoryRelay, NtfyConfig, NtfyRelay, Relay};
use brain_defense_session::{
    await_invite, host_invite, join_invite, search, Conclusion, LobbyOptions, Progression,
};
use brain_defense_storage::FileStore;
use brain_defense_system_sync::{MailboxNotice, Matchmaker};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{GlobalArgs, Settings};
use crate::play::Plan;
use crate::profile::Accounts;
use crate::social::Social;

#[derive(Parser, Debug)]
#[command(name = "brain-defense", version, about = "Cooperative tower defense over a public relay")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a single-player stage.
    Solo {
        /// One-based stage number.
        #[arg(long, default_value_t = 1)]
        stage: usize,
        #[command(flatten)]
        plan: PlanArgs,
    },
    /// Resume the match interrupted last.
    Resume {
        #[command(flatten)]
        plan: PlanArgs,
    },
    /// Look for a partner in a level's public lobby.
    Search {
        /// One-based level number.
        #[arg(long, default_value_t = 1)]
        level: u32,
        #[command(flatten)]
        lobby: LobbyArgs,
        #[command(flatten)]
        plan: PlanArgs,
    },
    /// Invite a friend and host the match once they accept.
    Invite {
        /// Friend to invite.
        friend: String,
        /// One-based level number.
        #[arg(long, default_value_t = 1)]
        level: u32,
        #[command(flatten)]
        lobby: LobbyArgs,
        #[command(flatten)]
        plan: PlanArgs,
    },
    /// Wait for a friend's invitation and join their match.
    Join {
        #[command(flatten)]
        lobby: LobbyArgs,
        #[command(flatten)]
        plan: PlanArgs,
    },
    /// Show the conversation with a friend, optionally sending a line.
    Chat {
        /// Friend to talk to.
        friend: String,
        /// Line to send.
        message: Option<String>,
    },
    /// Manage friends.
    Friend {
        #[command(subcommand)]
        action: FriendCommand,
    },
    /// Choose the towers taken into matches.
    Equip {
        /// Tower ids such as BONECA_AMBALABU.
        #[arg(required = true, value_parser = parse_tower)]
        towers: Vec<TowerKind>,
    },
    /// Show the local profile.
    Profile,
}

#[derive(Subcommand, Debug)]
enum FriendCommand {
    /// Send a friend request.
    Add {
        /// Player to befriend.
        player: String,
    },
    /// Accept a pending request.
    Accept {
        /// Player whose request to accept.
        player: String,
    },
    /// Decline a pending request.
    Reject {
        /// Player whose request to decline.
        player: String,
    },
    /// Forget a friend.
    Remove {
        /// Friend to forget.
        player: String,
    },
    /// List friends and pending requests.
    List,
    /// Read the mailbox.
    Inbox,
}

#[derive(Args, Debug, Clone)]
struct PlanArgs {
    /// Tower to place, defaults to the first equipped one.
    #[arg(long, value_parser = parse_tower)]
    tower: Option<TowerKind>,
    /// Place a tower at X,Y pixels when the match starts; repeatable.
    #[arg(long = "place", value_name = "X,Y", value_parser = parse_point)]
    placements: Vec<Point>,
    /// Leave after this many seconds; cooperative matches propose to surrender instead.
    #[arg(long, value_name = "SECONDS")]
    seconds: Option<u64>,
    /// Agree when the partner proposes to surrender.
    #[arg(long)]
    agree_surrender: bool,
    /// Draw the map into the terminal.
    #[arg(long)]
    render: bool,
}

impl PlanArgs {
    fn plan(&self) -> Plan {
        Plan {
            tower: self.tower,
            placements: self.placements.clone(),
            time_limit: self.seconds.map(Duration::from_secs),
            agree_to_surrender: self.agree_surrender,
            render: self.render,
        }
    }
}

#[derive(Args, Debug, Clone, Copy)]
struct LobbyArgs {
    /// Give up waiting after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,
}

impl LobbyArgs {
    fn options(self, settings: &Settings) -> LobbyOptions {
        let options = settings.lobby_options();
        match self.timeout {
            Some(seconds) => options.with_timeout(Duration::from_secs(seconds)),
            None => options,
        }
    }
}

fn parse_tower(value: &str) -> Result<TowerKind, String> {
    value
        .trim()
        .to_ascii_uppercase()
        .replace('-', "_")
        .parse()
        .map_err(|error: brain_defense_core::CatalogError| error.to_string())
}

fn parse_point(value: &str) -> Result<Point, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got {value:?}"))?;
    let coordinate = |raw: &str| {
        raw.trim()
            .parse::<f32>()
            .map_err(|error| format!("invalid coordinate {raw:?}: {error}"))
    };
    Ok(Point::new(coordinate(x)?, coordinate(y)?))
}

/// Everything a command needs: settings, transport and local storage.
pub(crate) struct App {
    pub(crate) settings: Settings,
    pub(crate) relay: Arc<dyn Relay>,
    pub(crate) store: FileStore,
    pub(crate) accounts: Accounts<FileStore>,
}

impl App {
    fn open(settings: Settings) -> Result<Self> {
        let store = FileStore::open(&settings.data_dir).with_context(|| {
            format!("failed to open data directory {}", settings.data_dir.display())
        })?;
        let relay: Arc<dyn Relay> = if settings.offline {
            info!("playing offline");
            Arc::new(MemoryRelay::new())
        } else {
            let config = NtfyConfig {
                base_url: settings.relay_url.trim_end_matches('/').to_owned(),
                ..NtfyConfig::default()
            };
            Arc::new(NtfyRelay::new(config).context("failed to build the relay client")?)
        };
        let accounts = Accounts::new(store.clone(), &settings.player);
        if accounts.player().is_empty() {
            bail!("player ids use letters, digits and underscores");
        }
        Ok(Self {
            settings,
            relay,
            store,
            accounts,
        })
    }

    fn social(&self) -> Social<'_, FileStore> {
        Social::new(
            self.relay.as_ref(),
            &self.accounts,
            self.settings.topics(),
            Duration::from_secs(self.settings.mailbox_history_secs),
        )
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.global)?;
    let app = App::open(settings)?;
    run(&app, cli.command).await
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Solo { stage, plan } => {
            let Some(index) = stage.checked_sub(1) else {
                bail!("stages are numbered from 1");
            };
            let profile = app.accounts.profile();
            let level = Campaign::level_of(index);
            if !is_level_unlocked(level, profile.completed_levels()) {
                bail!("level {level} is locked; finish level {} first", level - 1);
            }
            let conclusion = play::play(app, play::solo_record(index), &plan.plan()).await?;
            report(conclusion);
        }
        Command::Resume { plan } => {
            let Some(record) = play::interrupted(&app.store) else {
                bail!("there is no interrupted match to resume");
            };
            let conclusion = play::play(app, record, &plan.plan()).await?;
            report(conclusion);
        }
        Command::Search { level, lobby, plan } => {
            let profile = app.accounts.profile();
            if !is_level_unlocked(level, profile.completed_levels()) {
                bail!("level {level} is locked");
            }
            let matchmaker = Matchmaker::new(app.accounts.player(), level, app.settings.topics())
                .with_beacon_interval(app.settings.beacon_interval());
            let found = search(
                Arc::clone(&app.relay),
                matchmaker,
                lobby.options(&app.settings),
            )
            .await
            .context("matchmaking failed")?;
            println!("partner found, playing level {}", found.level);
            let conclusion = play::play(app, play::coop_record(found), &plan.plan()).await?;
            report(conclusion);
        }
        Command::Invite {
            friend,
            level,
            lobby,
            plan,
        } => {
            let profile = app.accounts.profile();
            let friend = brain_defense_system_sync::topics::sanitize(&friend);
            if !app.accounts.friends().friends.contains(&friend) {
                bail!("{friend} is not on your friend list");
            }
            let found = host_invite(
                Arc::clone(&app.relay),
                app.accounts.player(),
                &friend,
                &app.settings.topics(),
                level,
                profile.completed_levels(),
                lobby.options(&app.settings),
            )
            .await
            .context("the invitation did not lead to a match")?;
            println!("{friend} joined, playing level {}", found.level);
            let conclusion = play::play(app, play::coop_record(found), &plan.plan()).await?;
            report(conclusion);
        }
        Command::Join { lobby, plan } => {
            let profile = app.accounts.profile();
            let social = app.social();
            let mut mailbox = social.mailbox();
            println!("waiting for an invitation");
            let invite = await_invite(
                Arc::clone(&app.relay),
                &mut mailbox,
                lobby.options(&app.settings),
            )
            .await;
            social.keep(&mailbox)?;
            let invite = invite.context("no invitation arrived")?;
            println!("{} invited you to level {}", invite.sender, invite.level);
            let found = join_invite(
                Arc::clone(&app.relay),
                app.accounts.player(),
                invite,
                profile.completed_levels(),
                lobby.options(&app.settings),
            )
            .await
            .context("the host did not start the match")?;
            let conclusion = play::play(app, play::coop_record(found), &plan.plan()).await?;
            report(conclusion);
        }
        Command::Chat { friend, message } => {
            for line in app.social().chat(&friend, message.as_deref()).await? {
                println!("[{}] {}: {}", line.timestamp, line.sender, line.text);
            }
        }
        Command::Friend { action } => friend(app, action).await?,
        Command::Equip { towers } => {
            let mut profile = app.accounts.profile();
            profile.equip(&towers);
            if profile.equipped_towers().is_empty() {
                bail!("none of those towers is unlocked");
            }
            app.accounts.save_profile(&profile)?;
            println!("equipped: {}", list(profile.equipped_towers()));
        }
        Command::Profile => {
            let profile = app.accounts.profile();
            println!("player:    {}", profile.player_id());
            println!("balance:   {}", profile.balance());
            println!("unlocked:  {}", list(profile.unlocked_towers()));
            println!("equipped:  {}", list(profile.equipped_towers()));
            println!("completed: {}", list(profile.completed_levels()));
            if let Some(record) = play::interrupted(&app.store) {
                let mode = if record.is_multiplayer() { "cooperative" } else { "single-player" };
                println!("interrupted {mode} match on stage {}", record.stage_index + 1);
            }
        }
    }
    Ok(())
}

async fn friend(app: &App, action: FriendCommand) -> Result<()> {
    let social = app.social();
    match action {
        FriendCommand::Add { player } => social.send_request(&player).await?,
        FriendCommand::Accept { player } => social.accept(&player).await?,
        FriendCommand::Reject { player } => social.reject(&player).await?,
        FriendCommand::Remove { player } => social.remove(&player)?,
        FriendCommand::List => {
            let book = app.accounts.friends();
            println!("friends:  {}", list(&book.friends));
            println!("requests: {}", list(&book.requests));
        }
        FriendCommand::Inbox => {
            for notice in social.inbox().await? {
                match notice {
                    MailboxNotice::FriendRequest(player) => println!("{player} wants to be friends"),
                    MailboxNotice::FriendAccepted(player) => println!("{player} accepted"),
                    MailboxNotice::FriendRejected(player) => println!("{player} declined"),
                    MailboxNotice::GameInvite(invite) => println!(
                        "{} invites you to level {}; run `join` to play",
                        invite.sender, invite.level
                    ),
                }
            }
        }
    }
    Ok(())
}

fn report(conclusion: Conclusion) {
    match conclusion {
        Conclusion::Won {
            bonus,
            completed_level,
        } => {
            println!("victory, +{bonus} coins");
            if let Some(level) = completed_level {
                println!("level {level} complete");
            }
        }
        Conclusion::Lost => println!("the base fell"),
        Conclusion::Abandoned => println!("match abandoned"),
    }
}

fn list<T: std::fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "-".to_owned();
    }
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
