//! Simulation clock for the Colonia settlement.
//!
//! The clock counts ticks and accumulates simulated seconds. Every system
//! receives the same `dt` for a tick; the clock is the single place that
//! validates it and keeps the running totals.
//!
//! All arithmetic is checked: the tick counter refuses to overflow and a
//! `dt` that is negative or not finite is rejected before any state moves.

/// Errors that can occur during clock operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// The time step is negative, NaN or infinite.
    #[error("invalid time step: {dt}")]
    InvalidDt {
        /// The rejected step.
        dt: f32,
    },
}

/// Tick counter plus elapsed simulated time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    /// Ticks completed so far.
    tick: u64,

    /// Simulated seconds elapsed. Kept in `f64` so long runs do not lose
    /// sub-tick precision.
    elapsed: f64,
}

impl SimClock {
    /// A clock at tick 0.
    pub const fn new() -> Self {
        Self {
            tick: 0,
            elapsed: 0.0,
        }
    }

    /// Restore a clock from saved parts.
    pub const fn from_parts(tick: u64, elapsed: f64) -> Self {
        Self { tick, elapsed }
    }

    /// Check a time step without advancing.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidDt`] if `dt` is negative or not finite.
    pub fn validate_dt(dt: f32) -> Result<f32, ClockError> {
        if dt.is_finite() && dt >= 0.0 {
            Ok(dt)
        } else {
            Err(ClockError::InvalidDt { dt })
        }
    }

    /// Advance by one tick of `dt` seconds. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidDt`] for a bad step, or
    /// [`ClockError::TickOverflow`] if the counter would exceed `u64::MAX`.
    /// The clock is unchanged on error.
    pub fn advance(&mut self, dt: f32) -> Result<u64, ClockError> {
        let dt = Self::validate_dt(dt)?;
        let tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        self.tick = tick;
        self.elapsed += f64::from(dt);
        Ok(tick)
    }

    /// Ticks completed so far.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds elapsed.
    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_zero() {
        let clock = SimClock::new();
        assert_eq!(clock.tick(), 0);
        assert!(clock.elapsed().abs() < f64::EPSILON);
    }

    #[test]
    fn advance_accumulates_time() {
        let mut clock = SimClock::new();
        assert_eq!(clock.advance(0.5).unwrap(), 1);
        assert_eq!(clock.advance(0.25).unwrap(), 2);
        assert!((clock.elapsed() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn zero_dt_still_counts_a_tick() {
        let mut clock = SimClock::new();
        assert_eq!(clock.advance(0.0).unwrap(), 1);
    }

    #[test]
    fn invalid_dt_is_rejected_without_change() {
        let mut clock = SimClock::new();
        assert!(matches!(clock.advance(-1.0), Err(ClockError::InvalidDt { .. })));
        assert!(clock.advance(f32::NAN).is_err());
        assert!(clock.advance(f32::INFINITY).is_err());
        assert_eq!(clock.tick(), 0);
    }

    #[test]
    fn tick_overflow() {
        let mut clock = SimClock::from_parts(u64::MAX, 0.0);
        assert!(matches!(clock.advance(0.1), Err(ClockError::TickOverflow)));
        assert_eq!(clock.tick(), u64::MAX);
    }
}
