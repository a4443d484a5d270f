//! Treasury, population and labour market.
//!
//! The [`Economy`] is the settlement's aggregator: it holds the money,
//! recomputes population from houses every tick and hands the available
//! labour to buildings that want workers, cheapest building type first.

use std::collections::BTreeMap;

use colonia_types::BuildingId;
use colonia_world::Building;
use tracing::debug;

use crate::config::EconomyConfig;

/// Treasury and labour totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Economy {
    /// Coins in the treasury. Signed so that a restored save with debt
    /// still loads.
    pub money: i64,
    /// Sum of occupants over all houses.
    pub population: u32,
    /// Workers currently assigned to buildings.
    pub employed: u32,
}

impl Economy {
    /// A fresh treasury with the configured starting money.
    pub const fn new(config: &EconomyConfig) -> Self {
        Self::with_money(config.starting_money)
    }

    /// A treasury holding `money`, with no population yet.
    pub const fn with_money(money: i64) -> Self {
        Self {
            money,
            population: 0,
            employed: 0,
        }
    }

    /// Population not assigned to any building.
    pub const fn labor_pool(&self) -> u32 {
        self.population.saturating_sub(self.employed)
    }

    /// Whether the treasury covers `cost`.
    pub fn can_afford(&self, cost: u32) -> bool {
        self.money >= i64::from(cost)
    }

    /// Debit `cost`. Returns `false`, leaving the treasury untouched, when
    /// funds are short.
    pub fn spend(&mut self, cost: u32) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.money = self.money.saturating_sub(i64::from(cost));
        true
    }

    /// Credit `amount`.
    pub fn earn(&mut self, amount: u32) {
        self.money = self.money.saturating_add(i64::from(amount));
    }

    /// Credit a tax payment. Returns whether anything was collected.
    pub fn collect_tax(&mut self, amount: u32) -> bool {
        if amount == 0 {
            return false;
        }
        self.earn(amount);
        true
    }

    /// Recompute population and reassign labour.
    pub fn update(&mut self, buildings: &mut BTreeMap<BuildingId, Building>) {
        self.population = buildings
            .values()
            .filter(|b| !b.collapsed)
            .map(Building::occupants)
            .fold(0_u32, u32::saturating_add);
        self.assign_workers(buildings);
    }

    /// Reset every worker count, then fill buildings in order of type
    /// cost (ties by id) until the population runs out.
    fn assign_workers(&mut self, buildings: &mut BTreeMap<BuildingId, Building>) {
        let mut wanting: Vec<&mut Building> = buildings
            .values_mut()
            .filter_map(|b| {
                b.workers = 0;
                (!b.collapsed && b.workers_wanted() > 0).then_some(b)
            })
            .collect();
        wanting.sort_by_key(|b| (b.kind.cost, b.id));

        let mut available = self.population;
        let mut employed = 0_u32;
        for building in wanting {
            let assigned = building.workers_wanted().min(available);
            building.workers = assigned;
            available = available.saturating_sub(assigned);
            employed = employed.saturating_add(assigned);
        }
        if employed != self.employed {
            debug!(
                population = self.population,
                employed,
                "labour reassigned"
            );
        }
        self.employed = employed;
    }
}
