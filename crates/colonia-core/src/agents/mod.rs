//! Mobile agents and their shared update contract.
//!
//! Every agent is one variant of the closed [`Agent`] enum and advances
//! through [`Agent::advance`], which reads and mutates the settlement
//! through an [`AgentContext`] and reports whether it stays alive.
//!
//! Agents refer to buildings only by [`BuildingId`]; a handle that no
//! longer resolves is a normal condition every agent tolerates.
//!
//! # Modules
//!
//! - [`walker`] -- Patrol walkers: services, distribution, tax and repair.
//! - [`cart`] -- Goal-directed goods delivery.
//! - [`enemy`] -- Raiders that path-find toward buildings and attack them.
//! - [`projectile`] -- Tower shots homing on an enemy.

pub mod cart;
pub mod enemy;
pub mod projectile;
pub mod walker;

use std::collections::BTreeMap;

use colonia_types::{AgentId, AgentKind, BuildingId, Facing, Point, TilePos};

use crate::config::{AgentsConfig, EnemyConfig};
use crate::economy::Economy;
use crate::settlement::Settlement;

pub use cart::CartWalker;
pub use enemy::Enemy;
pub use projectile::Projectile;
pub use walker::Walker;

/// Why an agent left the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DespawnReason {
    /// Walked or drove back to its origin.
    ReturnedHome,
    /// Its origin building no longer exists.
    OriginLost,
    /// Nothing left to attack.
    NoTarget,
    /// Gave up after making no progress for too long.
    Stuck,
    /// Hit points reached zero.
    Killed,
    /// A projectile reached its target.
    Hit,
    /// A projectile's target is gone.
    TargetLost,
}

/// Result of advancing an agent by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentOutcome {
    /// Keep the agent.
    Continue,
    /// Remove the agent once the current pass completes.
    Despawn(DespawnReason),
}

/// An effect on another agent, applied after the agent pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Remove hit points from an enemy.
    DamageEnemy {
        /// The enemy hit.
        target: AgentId,
        /// Hit points removed.
        amount: f32,
    },
}

/// Where an enemy stood, and how healthy it was, when the pass began.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemySighting {
    /// Position at the start of the pass.
    pub position: Point,
    /// Hit points at the start of the pass.
    pub hp: f32,
}

/// Everything an agent may read or mutate while advancing.
#[derive(Debug)]
pub struct AgentContext<'a> {
    /// Buildings, terrain and roads.
    pub settlement: &'a mut Settlement,
    /// Treasury, credited by tax collectors.
    pub economy: &'a mut Economy,
    /// Walker and cart parameters.
    pub agents: &'a AgentsConfig,
    /// Enemy parameters.
    pub enemies: &'a EnemyConfig,
    /// Enemies alive when the pass began.
    pub roster: &'a BTreeMap<AgentId, EnemySighting>,
    /// Effects on other agents, applied after the pass.
    pub effects: &'a mut Vec<Effect>,
}

/// A mobile entity.
#[derive(Debug, Clone)]
pub enum Agent {
    /// Patrol walker.
    Walker(Walker),
    /// Goods cart.
    Cart(CartWalker),
    /// Hostile raider.
    Enemy(Enemy),
    /// Tower shot.
    Projectile(Projectile),
}

impl Agent {
    /// Coarse category, for observers.
    pub const fn kind(&self) -> AgentKind {
        match self {
            Self::Walker(_) => AgentKind::Walker,
            Self::Cart(_) => AgentKind::Cart,
            Self::Enemy(_) => AgentKind::Enemy,
            Self::Projectile(_) => AgentKind::Projectile,
        }
    }

    /// Sub-tile position.
    pub const fn position(&self) -> Point {
        match self {
            Self::Walker(a) => a.position,
            Self::Cart(a) => a.position,
            Self::Enemy(a) => a.position,
            Self::Projectile(a) => a.position,
        }
    }

    /// Direction of travel.
    pub const fn facing(&self) -> Facing {
        match self {
            Self::Walker(a) => a.facing,
            Self::Cart(a) => a.facing,
            Self::Enemy(a) => a.facing,
            Self::Projectile(a) => a.facing,
        }
    }

    /// The building that spawned this agent, for walkers and carts.
    pub const fn origin(&self) -> Option<BuildingId> {
        match self {
            Self::Walker(a) => Some(a.origin),
            Self::Cart(a) => Some(a.origin),
            Self::Enemy(_) | Self::Projectile(_) => None,
        }
    }

    /// The enemy record, if this is one.
    pub const fn as_enemy(&self) -> Option<&Enemy> {
        match self {
            Self::Enemy(enemy) => Some(enemy),
            _ => None,
        }
    }

    /// Advance by `dt` seconds.
    pub fn advance(&mut self, dt: f32, ctx: &mut AgentContext<'_>) -> AgentOutcome {
        match self {
            Self::Walker(a) => a.advance(dt, ctx),
            Self::Cart(a) => a.advance(dt, ctx),
            Self::Enemy(a) => a.advance(dt, ctx),
            Self::Projectile(a) => a.advance(dt, ctx),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared movement
// ---------------------------------------------------------------------------

/// Move from `position` toward the centre of `waypoint`.
///
/// Snaps onto the waypoint once within `epsilon` and returns `true` in that
/// case; otherwise steps by at most `speed * dt` without overshooting.
pub(crate) fn advance_toward(
    position: &mut Point,
    facing: &mut Facing,
    waypoint: TilePos,
    speed: f32,
    dt: f32,
    epsilon: f32,
) -> bool {
    let target = waypoint.center();
    let dx = target.x - position.x;
    let dy = target.y - position.y;
    if position.distance_to(target) < epsilon {
        *position = target;
        return true;
    }
    *facing = Facing::from_delta(dx, dy);
    let (next, reached) = position.step_toward(target, speed * dt);
    *position = next;
    reached
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_toward_never_overshoots() {
        let mut position = Point::new(0.0, 0.0);
        let mut facing = Facing::default();
        let waypoint = TilePos::new(1, 0);

        assert!(!advance_toward(&mut position, &mut facing, waypoint, 2.0, 0.25, 0.05));
        assert!((position.x - 0.5).abs() < 1e-6);
        assert_eq!(facing, Facing::East);

        assert!(advance_toward(&mut position, &mut facing, waypoint, 2.0, 1.0, 0.05));
        assert!((position.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn advance_toward_snaps_within_epsilon() {
        let mut position = Point::new(0.97, 2.0);
        let mut facing = Facing::North;
        assert!(advance_toward(&mut position, &mut facing, TilePos::new(1, 2), 1.0, 0.0, 0.05));
        assert_eq!(position, Point::new(1.0, 2.0));
        assert_eq!(facing, Facing::North);
    }
}
