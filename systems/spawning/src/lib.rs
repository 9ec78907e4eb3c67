#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spawning system responsible for emitting enemy spawn commands.
//!
//! The world advances the per-wave spawn timer on every tick; this system
//! watches the resulting [`WaveProgress`] and requests a spawn whenever the
//! configured interval has elapsed. Each spawn carries a label salt drawn
//! from the match's [`SeededRng`], which is the only consumer of the shared
//! seed.

use brain_defense_core::{Command, Event, SeededRng, WaveProgress};

/// Upper bound of the salt drawn for each spawned enemy label.
const SALT_RANGE: u32 = 1_000_000;

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration seeded with the match seed.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Pure system that emits spawn commands while a wave is active.
#[derive(Debug)]
pub struct Spawning {
    rng: SeededRng,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: SeededRng::new(config.rng_seed),
        }
    }

    /// Consumes events and the current wave progress to emit spawn commands.
    pub fn handle(&mut self, events: &[Event], wave: WaveProgress, out: &mut Vec<Command>) {
        let ticked = events
            .iter()
            .any(|event| matches!(event, Event::TimeAdvanced { .. }));
        if !ticked {
            return;
        }

        if let Some(kind) = wave.spawn_due() {
            let salt = self.rng.next_below(SALT_RANGE);
            out.push(Command::SpawnEnemy { kind, salt });
        }
    }
}
