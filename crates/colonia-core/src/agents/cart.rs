//! Goods carts.
//!
//! A cart follows a precomputed road route to its receiver, unloads the
//! whole cargo there (anything the receiver cannot take is dropped), then
//! retraces the same route home.

use colonia_types::{BuildingId, Cargo, Facing, Point, TilePos};
use tracing::debug;

use super::{AgentContext, AgentOutcome, DespawnReason, advance_toward};

/// A two-leg delivery from a producer to a receiver.
#[derive(Debug, Clone)]
pub struct CartWalker {
    /// Building that loaded the cart.
    pub origin: BuildingId,
    /// Slot index in the origin.
    pub slot: usize,
    /// Building the cargo is bound for.
    pub target: BuildingId,
    /// Load still on board; `None` once delivered.
    pub cargo: Option<Cargo>,
    /// Sub-tile position.
    pub position: Point,
    /// Direction of travel.
    pub facing: Facing,
    path: Vec<TilePos>,
    index: usize,
    returning: bool,
}

impl CartWalker {
    /// A cart standing on the first tile of `path`.
    pub fn new(
        origin: BuildingId,
        slot: usize,
        target: BuildingId,
        cargo: Cargo,
        path: Vec<TilePos>,
    ) -> Self {
        let position = path.first().map(|t| t.center()).unwrap_or_default();
        Self {
            origin,
            slot,
            target,
            cargo: Some(cargo),
            position,
            facing: Facing::default(),
            path,
            index: 0,
            returning: false,
        }
    }

    /// Whether the cart has delivered and is heading home.
    pub const fn is_returning(&self) -> bool {
        self.returning
    }

    /// Advance by `dt` seconds.
    pub fn advance(&mut self, dt: f32, ctx: &mut AgentContext<'_>) -> AgentOutcome {
        if self.path.len() <= 1 && !self.returning {
            // Already at the receiver's door.
            self.deliver(ctx);
            return self.arrive_home(ctx);
        }

        let Some(&waypoint) = self.path.get(self.index) else {
            return self.arrive_home(ctx);
        };
        let arrived = advance_toward(
            &mut self.position,
            &mut self.facing,
            waypoint,
            ctx.agents.cart_speed,
            dt,
            ctx.agents.arrival_epsilon,
        );
        if !arrived {
            return AgentOutcome::Continue;
        }

        if self.returning {
            match self.index.checked_sub(1) {
                Some(previous) => self.index = previous,
                None => return self.arrive_home(ctx),
            }
        } else {
            self.index = self.index.saturating_add(1);
            if self.index >= self.path.len() {
                self.deliver(ctx);
                self.returning = true;
                match self.path.len().checked_sub(2) {
                    Some(previous) => self.index = previous,
                    None => return self.arrive_home(ctx),
                }
            }
        }
        AgentOutcome::Continue
    }

    /// Unload everything at the target. A vanished target keeps the cargo
    /// on board so it can go back home.
    fn deliver(&mut self, ctx: &mut AgentContext<'_>) {
        let Some(cargo) = self.cargo else {
            return;
        };
        let Some(target) = ctx.settlement.building_mut(self.target) else {
            debug!(target_id = %self.target, "cart target vanished; returning cargo");
            return;
        };
        let accepted = target.receive_goods(cargo.good, cargo.amount);
        if accepted < cargo.amount {
            debug!(
                target_id = %self.target,
                good = ?cargo.good,
                dropped = cargo.amount - accepted,
                "receiver full; excess dropped"
            );
        }
        self.cargo = None;
    }

    fn arrive_home(&mut self, ctx: &mut AgentContext<'_>) -> AgentOutcome {
        let Some(origin) = ctx.settlement.building_mut(self.origin) else {
            return AgentOutcome::Despawn(DespawnReason::OriginLost);
        };
        if let Some(cargo) = self.cargo.take() {
            origin.return_goods(cargo);
        }
        origin.on_walker_returned(self.slot);
        AgentOutcome::Despawn(DespawnReason::ReturnedHome)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use colonia_types::{Deposit, Good};
    use colonia_world::{TerrainField, default_catalog};

    use super::*;
    use crate::config::{AgentsConfig, EnemyConfig};
    use crate::economy::Economy;
    use crate::settlement::Settlement;

    struct Route {
        settlement: Settlement,
        farm: BuildingId,
        market: BuildingId,
    }

    fn route() -> Route {
        let mut settlement = Settlement::new(
            TerrainField::new(14, 6).unwrap(),
            default_catalog().unwrap(),
        );
        for x in 0..14 {
            settlement.place_road(TilePos::new(x, 3)).unwrap();
        }
        settlement
            .terrain_mut()
            .set_deposit(TilePos::new(1, 1), Some(Deposit::Fertility));
        let farm = settlement.place_building(TilePos::new(0, 0), "farm").unwrap();
        let market = settlement.place_building(TilePos::new(8, 1), "market").unwrap();
        settlement.building_mut(farm).unwrap().on_walker_spawned(0);
        Route {
            settlement,
            farm,
            market,
        }
    }

    fn cart_path(route: &Route) -> Vec<TilePos> {
        let from = route.settlement.building(route.farm).unwrap().road_access.unwrap();
        let to = route.settlement.building(route.market).unwrap().road_access.unwrap();
        route.settlement.roads().find_path(from, to).unwrap()
    }

    fn run(cart: &mut CartWalker, settlement: &mut Settlement) -> Option<DespawnReason> {
        let agents = AgentsConfig::default();
        let enemies = EnemyConfig::default();
        let roster = BTreeMap::new();
        let mut effects = Vec::new();
        let mut economy = Economy::with_money(0);
        let mut ctx = AgentContext {
            settlement,
            economy: &mut economy,
            agents: &agents,
            enemies: &enemies,
            roster: &roster,
            effects: &mut effects,
        };
        for _ in 0..2000 {
            if let AgentOutcome::Despawn(reason) = cart.advance(0.1, &mut ctx) {
                return Some(reason);
            }
        }
        None
    }

    #[test]
    fn cart_delivers_and_returns() {
        let mut route = route();
        let path = cart_path(&route);
        let mut cart = CartWalker::new(route.farm, 0, route.market, Cargo::new(Good::Food, 20.0), path);

        assert_eq!(run(&mut cart, &mut route.settlement), Some(DespawnReason::ReturnedHome));

        let market = route.settlement.building(route.market).unwrap();
        assert!((market.stored(Good::Food) - 20.0).abs() < 1e-4);
        let farm = route.settlement.building(route.farm).unwrap();
        assert_eq!(farm.slots.first().unwrap().active, 0);
        assert!(farm.stored(Good::Food).abs() < f32::EPSILON);
    }

    #[test]
    fn excess_is_dropped_at_a_full_receiver() {
        let mut route = route();
        route
            .settlement
            .building_mut(route.market)
            .unwrap()
            .receive_goods(Good::Food, 95.0);
        let path = cart_path(&route);
        let mut cart = CartWalker::new(route.farm, 0, route.market, Cargo::new(Good::Food, 20.0), path);

        run(&mut cart, &mut route.settlement);

        let market = route.settlement.building(route.market).unwrap();
        assert!((market.stored(Good::Food) - 100.0).abs() < 1e-4);
        let farm = route.settlement.building(route.farm).unwrap();
        assert!(farm.stored(Good::Food).abs() < f32::EPSILON);
    }

    #[test]
    fn single_tile_path_delivers_immediately() {
        let mut route = route();
        let door = route.settlement.building(route.market).unwrap().road_access.unwrap();
        let mut cart = CartWalker::new(route.farm, 0, route.market, Cargo::new(Good::Food, 5.0), vec![door]);

        assert_eq!(run(&mut cart, &mut route.settlement), Some(DespawnReason::ReturnedHome));
        let market = route.settlement.building(route.market).unwrap();
        assert!((market.stored(Good::Food) - 5.0).abs() < 1e-4);
    }

    #[test]
    fn vanished_target_sends_cargo_home() {
        let mut route = route();
        let path = cart_path(&route);
        route.settlement.remove_building(route.market);
        let mut cart = CartWalker::new(route.farm, 0, route.market, Cargo::new(Good::Food, 12.0), path);

        assert_eq!(run(&mut cart, &mut route.settlement), Some(DespawnReason::ReturnedHome));
        let farm = route.settlement.building(route.farm).unwrap();
        assert!((farm.stored(Good::Food) - 12.0).abs() < 1e-4);
    }

    #[test]
    fn vanished_origin_despawns() {
        let mut route = route();
        let path = cart_path(&route);
        route.settlement.remove_building(route.farm);
        let mut cart = CartWalker::new(route.farm, 0, route.market, Cargo::new(Good::Food, 12.0), path);

        assert_eq!(run(&mut cart, &mut route.settlement), Some(DespawnReason::OriginLost));
        let market = route.settlement.building(route.market).unwrap();
        assert!((market.stored(Good::Food) - 12.0).abs() < 1e-4);
    }
}
