//! The agent scheduler.
//!
//! [`AgentScheduler`] owns every live agent, keyed by [`AgentId`] so
//! iteration order is stable. One pass advances each agent exactly once;
//! agents that despawn are collected in a side buffer and removed only
//! after the pass, and effects on other agents (projectile hits) are
//! applied after that.

use std::collections::BTreeMap;

use colonia_types::{AgentId, AgentKind};
use tracing::debug;

use crate::agents::{Agent, AgentContext, AgentOutcome, DespawnReason, Effect, Enemy, EnemySighting};
use crate::config::{AgentsConfig, EnemyConfig};
use crate::economy::Economy;
use crate::settlement::Settlement;

/// What one scheduler pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerTick {
    /// Despawn counts by reason.
    pub despawned: BTreeMap<DespawnReason, u32>,
}

impl SchedulerTick {
    /// Total agents removed.
    pub fn total(&self) -> u32 {
        self.despawned.values().copied().fold(0, u32::saturating_add)
    }

    /// Agents removed for `reason`.
    pub fn count(&self, reason: DespawnReason) -> u32 {
        self.despawned.get(&reason).copied().unwrap_or(0)
    }

    fn record(&mut self, reason: DespawnReason) {
        let count = self.despawned.entry(reason).or_insert(0);
        *count = count.saturating_add(1);
    }
}

/// Owner of every live agent.
#[derive(Debug, Clone)]
pub struct AgentScheduler {
    agents: BTreeMap<AgentId, Agent>,
    next_id: AgentId,
}

impl Default for AgentScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentScheduler {
    /// An empty scheduler.
    pub const fn new() -> Self {
        Self {
            agents: BTreeMap::new(),
            next_id: AgentId::new(1),
        }
    }

    /// Add an agent and return its handle.
    pub fn spawn(&mut self, agent: Agent) -> AgentId {
        let id = self.next_id;
        self.next_id = id.next();
        self.agents.insert(id, agent);
        id
    }

    /// Resolve a handle.
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Every live agent, by handle.
    pub const fn agents(&self) -> &BTreeMap<AgentId, Agent> {
        &self.agents
    }

    /// Live enemies, by handle.
    pub fn enemies(&self) -> impl Iterator<Item = (AgentId, &Enemy)> {
        self.agents
            .iter()
            .filter_map(|(id, agent)| agent.as_enemy().map(|enemy| (*id, enemy)))
    }

    /// Number of live agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether no agent is alive.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Live agents of one kind.
    pub fn count_kind(&self, kind: AgentKind) -> usize {
        self.agents.values().filter(|a| a.kind() == kind).count()
    }

    /// Drop every agent, as when a save is restored.
    pub fn clear(&mut self) {
        self.agents.clear();
    }

    /// Advance every agent by `dt` seconds.
    pub fn update(
        &mut self,
        dt: f32,
        settlement: &mut Settlement,
        economy: &mut Economy,
        agents: &AgentsConfig,
        enemies: &EnemyConfig,
    ) -> SchedulerTick {
        let roster: BTreeMap<AgentId, EnemySighting> = self
            .enemies()
            .map(|(id, enemy)| {
                (
                    id,
                    EnemySighting {
                        position: enemy.position,
                        hp: enemy.hp,
                    },
                )
            })
            .collect();
        let mut effects = Vec::new();
        let mut removals = Vec::new();

        {
            let mut ctx = AgentContext {
                settlement,
                economy,
                agents,
                enemies,
                roster: &roster,
                effects: &mut effects,
            };
            for (id, agent) in &mut self.agents {
                if let AgentOutcome::Despawn(reason) = agent.advance(dt, &mut ctx) {
                    removals.push((*id, reason));
                }
            }
        }

        let mut tick = SchedulerTick::default();
        for (id, reason) in removals {
            if let Some(agent) = self.agents.remove(&id) {
                debug!(agent_id = %id, kind = ?agent.kind(), ?reason, "agent despawned");
                tick.record(reason);
            }
        }

        for effect in effects {
            match effect {
                Effect::DamageEnemy { target, amount } => {
                    let killed = match self.agents.get_mut(&target) {
                        Some(Agent::Enemy(enemy)) => {
                            enemy.take_damage(amount);
                            enemy.is_dead()
                        }
                        _ => false,
                    };
                    if killed {
                        self.agents.remove(&target);
                        debug!(agent_id = %target, "enemy killed");
                        tick.record(DespawnReason::Killed);
                    }
                }
            }
        }

        tick
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use colonia_types::{Point, TilePos};
    use colonia_world::{TerrainField, default_catalog};

    use super::*;
    use crate::agents::Projectile;

    fn settlement() -> Settlement {
        Settlement::new(
            TerrainField::new(10, 10).unwrap(),
            default_catalog().unwrap(),
        )
    }

    fn run(scheduler: &mut AgentScheduler, settlement: &mut Settlement) -> SchedulerTick {
        let mut economy = Economy::with_money(0);
        scheduler.update(
            0.1,
            settlement,
            &mut economy,
            &AgentsConfig::default(),
            &EnemyConfig::default(),
        )
    }

    #[test]
    fn handles_are_sequential_and_never_reused() {
        let mut scheduler = AgentScheduler::new();
        let config = EnemyConfig::default();
        let a = scheduler.spawn(Agent::Enemy(Enemy::new(TilePos::new(0, 0), &config)));
        let b = scheduler.spawn(Agent::Enemy(Enemy::new(TilePos::new(1, 0), &config)));
        assert_eq!(a, AgentId::new(1));
        assert_eq!(b, AgentId::new(2));
        assert_eq!(scheduler.len(), 2);

        scheduler.clear();
        assert!(scheduler.is_empty());
        let c = scheduler.spawn(Agent::Enemy(Enemy::new(TilePos::new(2, 0), &config)));
        assert_eq!(c, AgentId::new(3));
    }

    #[test]
    fn removals_are_deferred_to_the_end_of_the_pass() {
        let mut s = settlement();
        let mut scheduler = AgentScheduler::new();
        // no buildings: every enemy despawns for lack of a target
        for x in 0..4 {
            scheduler.spawn(Agent::Enemy(Enemy::new(TilePos::new(x, 0), &EnemyConfig::default())));
        }
        assert_eq!(scheduler.len(), 4);

        let tick = run(&mut scheduler, &mut s);

        assert!(scheduler.is_empty());
        assert_eq!(tick.count(DespawnReason::NoTarget), 4);
        assert_eq!(tick.total(), 4);
    }

    #[test]
    fn projectile_damage_lands_after_the_pass() {
        let mut s = settlement();
        s.place_building(TilePos::new(8, 8), "garden").unwrap();
        let mut scheduler = AgentScheduler::new();
        let mut enemy = Enemy::new(TilePos::new(2, 2), &EnemyConfig::default());
        enemy.hp = 15.0;
        let target = scheduler.spawn(Agent::Enemy(enemy));
        scheduler.spawn(Agent::Projectile(Projectile::new(
            Point::new(2.1, 2.0),
            target,
            20.0,
            8.0,
        )));

        let tick = run(&mut scheduler, &mut s);

        assert_eq!(tick.count(DespawnReason::Hit), 1);
        assert_eq!(tick.count(DespawnReason::Killed), 1);
        assert!(scheduler.get(target).is_none());
        assert_eq!(scheduler.count_kind(AgentKind::Projectile), 0);
    }

    #[test]
    fn wounded_enemy_survives_a_light_hit() {
        let mut s = settlement();
        s.place_building(TilePos::new(8, 8), "garden").unwrap();
        let mut scheduler = AgentScheduler::new();
        let target = scheduler.spawn(Agent::Enemy(Enemy::new(TilePos::new(2, 2), &EnemyConfig::default())));
        scheduler.spawn(Agent::Projectile(Projectile::new(
            Point::new(2.0, 2.1),
            target,
            20.0,
            8.0,
        )));

        run(&mut scheduler, &mut s);

        let enemy = scheduler.get(target).and_then(Agent::as_enemy).unwrap();
        assert!((enemy.hp - 30.0).abs() < f32::EPSILON);
        assert_eq!(scheduler.enemies().count(), 1);
    }
}
