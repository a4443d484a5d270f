//! Patrol walkers.
//!
//! A walker leaves its origin's road access tile on a bounded random walk,
//! then heads home along the shortest road route (retracing its steps if
//! the network has been cut). At every waypoint, out and back, it applies
//! its role to each building within the coverage radius.

use colonia_types::{BuildingId, Cargo, CoverageKind, Facing, Point, TilePos, WalkerRole};

use super::{AgentContext, AgentOutcome, DespawnReason, advance_toward};

/// Which half of the patrol the walker is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    Outbound,
    Returning,
}

/// A service, distribution, tax or engineering patrol.
#[derive(Debug, Clone)]
pub struct Walker {
    /// Building that spawned the walker.
    pub origin: BuildingId,
    /// Slot index in the origin.
    pub slot: usize,
    /// What the walker does at each waypoint.
    pub role: WalkerRole,
    /// Sub-tile position.
    pub position: Point,
    /// Direction of travel.
    pub facing: Facing,
    /// Goods still on board (distributors only).
    pub cargo: Vec<Cargo>,
    path: Vec<TilePos>,
    index: usize,
    leg: Leg,
}

impl Walker {
    /// A walker standing on the first tile of its outbound `path`.
    pub fn new(
        origin: BuildingId,
        slot: usize,
        role: WalkerRole,
        cargo: Vec<Cargo>,
        path: Vec<TilePos>,
    ) -> Self {
        let position = path.first().map(|t| t.center()).unwrap_or_default();
        Self {
            origin,
            slot,
            role,
            position,
            facing: Facing::default(),
            cargo,
            path,
            index: 0,
            leg: Leg::Outbound,
        }
    }

    /// Whether the walker is heading home.
    pub fn is_returning(&self) -> bool {
        self.leg == Leg::Returning
    }

    /// Waypoints of the current leg.
    pub fn path(&self) -> &[TilePos] {
        &self.path
    }

    /// Advance by `dt` seconds.
    pub fn advance(&mut self, dt: f32, ctx: &mut AgentContext<'_>) -> AgentOutcome {
        if let Some(&waypoint) = self.path.get(self.index) {
            let arrived = advance_toward(
                &mut self.position,
                &mut self.facing,
                waypoint,
                ctx.agents.walker_speed,
                dt,
                ctx.agents.arrival_epsilon,
            );
            if !arrived {
                return AgentOutcome::Continue;
            }
            self.emit(waypoint, ctx);
            self.index = self.index.saturating_add(1);
            if self.index < self.path.len() {
                return AgentOutcome::Continue;
            }
        }

        match self.leg {
            Leg::Outbound => self.start_return(ctx),
            Leg::Returning => self.arrive_home(ctx),
        }
    }

    /// Plan the way home from the current tile.
    fn start_return(&mut self, ctx: &mut AgentContext<'_>) -> AgentOutcome {
        let Some(origin) = ctx.settlement.building(self.origin) else {
            return AgentOutcome::Despawn(DespawnReason::OriginLost);
        };
        let here = self.position.tile();
        let route = origin
            .road_access
            .and_then(|home| ctx.settlement.roads().find_path(here, home))
            .unwrap_or_else(|| self.path.iter().rev().copied().collect());

        self.path = route.into_iter().skip(1).collect();
        self.index = 0;
        self.leg = Leg::Returning;
        if self.path.is_empty() {
            return self.arrive_home(ctx);
        }
        AgentOutcome::Continue
    }

    fn arrive_home(&mut self, ctx: &mut AgentContext<'_>) -> AgentOutcome {
        let Some(origin) = ctx.settlement.building_mut(self.origin) else {
            return AgentOutcome::Despawn(DespawnReason::OriginLost);
        };
        for cargo in self.cargo.drain(..) {
            origin.return_goods(cargo);
        }
        origin.on_walker_returned(self.slot);
        AgentOutcome::Despawn(DespawnReason::ReturnedHome)
    }

    /// Apply the role to every building near `tile`.
    fn emit(&mut self, tile: TilePos, ctx: &mut AgentContext<'_>) {
        let nearby = ctx
            .settlement
            .terrain()
            .buildings_near(tile, ctx.agents.coverage_radius);
        let per_occupant = ctx.agents.distribute_per_occupant;

        for id in nearby {
            let Some(building) = ctx.settlement.building_mut(id) else {
                continue;
            };
            if building.collapsed {
                continue;
            }
            match self.role {
                WalkerRole::Service { coverage } => building.receive_coverage(coverage),
                WalkerRole::TaxCollector => {
                    let amount = building.pay_tax();
                    ctx.economy.collect_tax(amount);
                    building.receive_coverage(CoverageKind::Administration);
                }
                WalkerRole::Engineer => building.repair(),
                WalkerRole::Distributor => {
                    if !building.is_house() {
                        continue;
                    }
                    #[allow(clippy::cast_precision_loss)]
                    let wanted = per_occupant * building.occupants() as f32;
                    for cargo in &mut self.cargo {
                        let accepted = building.receive_goods(cargo.good, wanted.min(cargo.amount));
                        cargo.unload(accepted);
                    }
                }
                WalkerRole::Cart => {}
            }
        }
        self.cargo.retain(|c| !c.is_empty());
    }
}
