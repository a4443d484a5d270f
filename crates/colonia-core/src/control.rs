//! Run control shared between the paced runner and whoever drives it.
//!
//! The runner polls [`RunControl`] between ticks; the binary's signal
//! handler (or any other task) requests the stop. The stop flag is atomic
//! so reads on the tick path never take a lock.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEndReason {
    /// The configured `max_ticks` was reached.
    MaxTicksReached,
    /// A stop was requested.
    StopRequested,
}

/// Stop flag, pacing and tick bound for a running simulation.
#[derive(Debug)]
pub struct RunControl {
    stop_requested: AtomicBool,
    tick_interval_ms: u64,
    max_ticks: u64,
}

impl RunControl {
    /// Control state for a run pacing ticks `tick_interval_ms` apart and
    /// stopping after `max_ticks` (0 = unbounded).
    pub const fn new(tick_interval_ms: u64, max_ticks: u64) -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            tick_interval_ms,
            max_ticks,
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Ask the runner to stop before the next tick.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Pacing and bounds
    // -----------------------------------------------------------------------

    /// Real-time delay between ticks in milliseconds.
    pub const fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    /// Configured tick bound.
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Whether `tick` has reached the bound. Always false when unbounded.
    pub const fn tick_limit_reached(&self, tick: u64) -> bool {
        self.max_ticks > 0 && tick >= self.max_ticks
    }
}
