//! Paced simulation loop.
//!
//! [`run_simulation`] drives [`Simulation::tick`] repeatedly with support
//! for:
//!
//! - **Bounded runs**: stop after `max_ticks`
//! - **Pacing**: a fixed real-time delay between ticks
//! - **Clean stop**: a stop request ends the loop before the next tick
//!
//! Each tick is reported to a [`TickCallback`], which is where the binary
//! hangs autosave and progress logging.

use std::sync::Arc;

use tracing::{info, warn};

use crate::clock::ClockError;
use crate::control::{RunControl, RunEndReason};
use crate::simulation::{Simulation, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick could not advance the clock.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// Why the run ended.
    pub end_reason: RunEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Ticks executed by this run.
    pub total_ticks: u64,
}

/// Callback invoked after each tick completes.
pub trait TickCallback: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, simulation: &Simulation);
}

/// A callback that does nothing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _simulation: &Simulation) {}
}

/// Run the simulation until the tick bound is reached or a stop is
/// requested.
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick fails.
pub async fn run_simulation(
    simulation: &mut Simulation,
    control: &Arc<RunControl>,
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;

    info!(
        max_ticks = control.max_ticks(),
        tick_interval_ms = control.tick_interval_ms(),
        start_tick = simulation.clock().tick(),
        "Simulation starting"
    );

    loop {
        if control.is_stop_requested() {
            info!("Stop requested");
            return Ok(SimulationResult {
                end_reason: RunEndReason::StopRequested,
                final_summary: last_summary,
                total_ticks,
            });
        }

        let summary = simulation.tick()?;
        total_ticks = total_ticks.saturating_add(1);

        callback.on_tick(&summary, simulation);

        // summary.tick counts from the start of the game, so a restored
        // save may already be past the bound.
        if control.tick_limit_reached(summary.tick) {
            info!(
                tick = summary.tick,
                max_ticks = control.max_ticks(),
                "Tick limit reached"
            );
            return Ok(SimulationResult {
                end_reason: RunEndReason::MaxTicksReached,
                final_summary: Some(summary),
                total_ticks,
            });
        }

        last_summary = Some(summary);

        let interval_ms = control.tick_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
        }
    }
}

/// Log how the run ended.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            population = summary.population,
            money = summary.money,
            agents_alive = summary.agents_alive,
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}
