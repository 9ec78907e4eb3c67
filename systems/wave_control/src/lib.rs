#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave control system deciding when the next wave starts.
//!
//! Waves never start on their own when a match loads. The first wave is an
//! explicit request; afterwards an autonomous participant (solo player or
//! co-op host) schedules the next wave a fixed delay after a non-final
//! clear. A follower (co-op client) never advances by itself and only starts
//! the waves its host announces. It remembers the highest wave announced so
//! far and works through every wave up to it as its own waves clear, so
//! announcements that arrive early or out of order are never lost.

use std::time::Duration;

use brain_defense_core::{Command, Event, Role, WaveProgress};

/// Delay between a wave clearing and the next one starting automatically.
pub const AUTO_ADVANCE_DELAY: Duration = Duration::from_secs(2);

/// Who is allowed to advance waves locally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authority {
    /// Starts waves on request and advances automatically after a clear.
    Autonomous,
    /// Starts waves only when the authoritative peer announces them.
    Follower,
}

impl From<Role> for Authority {
    fn from(role: Role) -> Self {
        match role {
            Role::Host => Self::Autonomous,
            Role::Client => Self::Follower,
        }
    }
}

/// Configuration parameters required to construct the wave control system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    authority: Authority,
    delay: Duration,
}

impl Config {
    /// Creates a configuration with the given authority and the default delay.
    #[must_use]
    pub const fn new(authority: Authority) -> Self {
        Self {
            authority,
            delay: AUTO_ADVANCE_DELAY,
        }
    }

    /// Overrides the automatic advance delay.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Authority::Autonomous)
    }
}

/// Result of feeding a remote wave announcement to the system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Announcement {
    /// The wave was started immediately.
    Started,
    /// The wave will start once the local waves before it have cleared.
    Deferred,
    /// The local match is already at or past the announced wave.
    Ignored,
}

/// Pure system scheduling wave starts.
#[derive(Debug, Default)]
pub struct WaveControl {
    config: Config,
    countdown: Option<Duration>,
    deferred: Option<u32>,
}

impl WaveControl {
    /// Creates a new wave control system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            countdown: None,
            deferred: None,
        }
    }

    /// Returns the authority this system was configured with.
    #[must_use]
    pub const fn authority(&self) -> Authority {
        self.config.authority
    }

    /// Time left before the scheduled automatic start, if one is pending.
    #[must_use]
    pub const fn countdown(&self) -> Option<Duration> {
        self.countdown
    }

    /// Highest wave announced by the peer that has not started locally yet.
    #[must_use]
    pub const fn deferred(&self) -> Option<u32> {
        self.deferred
    }

    /// Handles an explicit "start next wave" request from the player.
    ///
    /// Followers cannot start waves and the request is dropped. Returns
    /// whether a start command was emitted.
    pub fn request_start(&mut self, wave: WaveProgress, out: &mut Vec<Command>) -> bool {
        if self.config.authority == Authority::Follower || !startable(wave) {
            return false;
        }
        self.countdown = None;
        out.push(Command::StartWave);
        true
    }

    /// Handles a peer announcement that wave `index` has started.
    pub fn announce(
        &mut self,
        index: u32,
        wave: WaveProgress,
        out: &mut Vec<Command>,
    ) -> Announcement {
        if index < wave.index || (index == wave.index && wave.active) || index >= wave.total {
            return Announcement::Ignored;
        }
        if index == wave.index {
            if self.deferred.is_some_and(|pending| pending <= index) {
                self.deferred = None;
            }
            out.push(Command::StartWave);
            return Announcement::Started;
        }
        self.deferred = Some(self.deferred.map_or(index, |pending| pending.max(index)));
        Announcement::Deferred
    }

    /// Re-synchronises with a wave state that was replaced wholesale, either
    /// by a restored snapshot or by a peer overwrite.
    ///
    /// Autonomous participants idle between waves re-arm the automatic
    /// advance. Pending announcements the new state already reached are
    /// dropped.
    pub fn resume(&mut self, wave: WaveProgress) {
        self.countdown = (self.config.authority == Authority::Autonomous
            && wave.index > 0
            && startable(wave))
        .then_some(self.config.delay);
        self.deferred = self.deferred.filter(|pending| *pending >= wave.index);
    }

    /// Consumes world events and emits start commands when a wave is due.
    pub fn handle(&mut self, events: &[Event], wave: WaveProgress, out: &mut Vec<Command>) {
        let mut elapsed = Duration::ZERO;
        for event in events {
            match event {
                Event::TimeAdvanced { dt, .. } => elapsed = elapsed.saturating_add(*dt),
                Event::WaveCleared {
                    more_waves: true, ..
                } if self.config.authority == Authority::Autonomous => {
                    self.countdown = Some(self.config.delay);
                }
                Event::WaveStarted { .. } => self.countdown = None,
                Event::MatchWon { .. } | Event::MatchLost => {
                    self.countdown = None;
                    self.deferred = None;
                }
                _ => {}
            }
        }

        if let Some(pending) = self.deferred {
            if wave.index > pending {
                self.deferred = None;
            } else if startable(wave) {
                if wave.index == pending {
                    self.deferred = None;
                }
                out.push(Command::StartWave);
                return;
            }
        }

        let Some(remaining) = self.countdown else {
            return;
        };
        let remaining = remaining.saturating_sub(elapsed);
        if !remaining.is_zero() {
            self.countdown = Some(remaining);
            return;
        }
        self.countdown = None;
        if startable(wave) {
            out.push(Command::StartWave);
        }
    }
}

fn startable(wave: WaveProgress) -> bool {
    !wave.active && wave.index < wave.total
}
