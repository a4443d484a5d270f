//! Tick callback that saves the game periodically.

use std::path::PathBuf;

use colonia_core::{Simulation, TickCallback, TickSummary};
use tracing::{info, warn};

/// Writes a save every `every_ticks` ticks (0 disables it).
pub struct AutosaveCallback {
    path: PathBuf,
    every_ticks: u64,
    saves: u64,
}

impl AutosaveCallback {
    /// Create a callback saving to `path`.
    pub const fn new(path: PathBuf, every_ticks: u64) -> Self {
        Self {
            path,
            every_ticks,
            saves: 0,
        }
    }

    /// Successful saves so far.
    pub const fn saves(&self) -> u64 {
        self.saves
    }
}

impl TickCallback for AutosaveCallback {
    fn on_tick(&mut self, summary: &TickSummary, simulation: &Simulation) {
        if summary.tick.checked_rem(self.every_ticks) != Some(0) {
            return;
        }
        match simulation.save_to(&self.path) {
            Ok(()) => {
                self.saves = self.saves.saturating_add(1);
                info!(
                    tick = summary.tick,
                    population = summary.population,
                    money = summary.money,
                    enemies = summary.enemies_alive,
                    path = %self.path.display(),
                    "autosaved"
                );
            }
            Err(e) => {
                warn!(tick = summary.tick, error = %e, "autosave failed");
            }
        }
    }
}
