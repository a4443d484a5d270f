//! Tower shots.
//!
//! A projectile homes on one enemy using the position recorded at the start
//! of the pass. Damage is queued as an [`Effect`] and applied once every
//! agent has moved, so no agent mutates another mid-pass.

use colonia_types::{AgentId, Facing, Point};

use super::{AgentContext, AgentOutcome, DespawnReason, Effect};

/// Distance at which a shot counts as a hit.
const HIT_RADIUS: f32 = 0.3;

/// A homing shot fired by a tower.
#[derive(Debug, Clone)]
pub struct Projectile {
    /// Sub-tile position.
    pub position: Point,
    /// Direction of flight.
    pub facing: Facing,
    /// Enemy being chased.
    pub target: AgentId,
    /// Hit points removed on impact.
    pub damage: f32,
    /// Tiles per second.
    pub speed: f32,
}

impl Projectile {
    /// A shot leaving `position` toward `target`.
    pub const fn new(position: Point, target: AgentId, damage: f32, speed: f32) -> Self {
        Self {
            position,
            facing: Facing::South,
            target,
            damage,
            speed,
        }
    }

    /// Advance by `dt` seconds.
    pub fn advance(&mut self, dt: f32, ctx: &mut AgentContext<'_>) -> AgentOutcome {
        let Some(sighting) = ctx.roster.get(&self.target).filter(|s| s.hp > 0.0) else {
            return AgentOutcome::Despawn(DespawnReason::TargetLost);
        };
        let aim = sighting.position;
        if self.position.distance_to(aim) < HIT_RADIUS {
            ctx.effects.push(Effect::DamageEnemy {
                target: self.target,
                amount: self.damage,
            });
            return AgentOutcome::Despawn(DespawnReason::Hit);
        }

        self.facing = Facing::from_delta(aim.x - self.position.x, aim.y - self.position.y);
        let (next, reached) = self.position.step_toward(aim, self.speed * dt);
        self.position = next;
        if reached {
            ctx.effects.push(Effect::DamageEnemy {
                target: self.target,
                amount: self.damage,
            });
            return AgentOutcome::Despawn(DespawnReason::Hit);
        }
        AgentOutcome::Continue
    }
}
