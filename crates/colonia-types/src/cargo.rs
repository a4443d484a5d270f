//! Goods in transit.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::Good;

/// A quantity of one good carried by an agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Cargo {
    /// The good being carried.
    pub good: Good,
    /// Amount still on board. Never negative.
    pub amount: f32,
}

impl Cargo {
    /// Construct a load, clamping negative amounts to zero.
    pub const fn new(good: Good, amount: f32) -> Self {
        Self {
            good,
            amount: amount.max(0.0),
        }
    }

    /// Whether nothing is left on board.
    pub fn is_empty(&self) -> bool {
        self.amount <= f32::EPSILON
    }

    /// Remove up to `amount` from the load and return what was removed.
    pub const fn unload(&mut self, amount: f32) -> f32 {
        let taken = amount.max(0.0).min(self.amount);
        self.amount -= taken;
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unload_is_capped_by_load() {
        let mut cargo = Cargo::new(Good::Food, 3.0);
        assert!((cargo.unload(2.0) - 2.0).abs() < f32::EPSILON);
        assert!((cargo.unload(5.0) - 1.0).abs() < f32::EPSILON);
        assert!(cargo.is_empty());
    }

    #[test]
    fn negative_loads_clamp_to_zero() {
        let cargo = Cargo::new(Good::Clay, -4.0);
        assert!(cargo.is_empty());
    }
}
