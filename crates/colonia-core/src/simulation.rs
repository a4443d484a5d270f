//! The simulation facade.
//!
//! [`Simulation`] bundles everything one settlement needs: configuration,
//! clock, settlement, agent scheduler, economy, wave spawner and a seeded
//! RNG. [`Simulation::tick`] runs one fixed step; the player-facing
//! operations validate, charge the treasury and edit the settlement
//! all-or-nothing.
//!
//! # Tick order
//!
//! 1. The labour market recomputes population and reassigns workers.
//! 2. The settlement runs its orchestration pass and spawns slot agents.
//! 3. Ready towers fire.
//! 4. The wave spawner may launch a wave.
//! 5. The scheduler advances every agent once and flushes removals.
//! 6. The clock advances.

use std::path::Path;

use colonia_types::{AgentKind, BuildingId, TilePos};
use colonia_world::{TerrainField, WorldError, generate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info};

use crate::agents::{Agent, DespawnReason, Enemy};
use crate::clock::{ClockError, SimClock};
use crate::config::{ConfigError, SimulationConfig};
use crate::defense;
use crate::economy::Economy;
use crate::persistence::{PersistenceError, SaveGame};
use crate::scheduler::AgentScheduler;
use crate::settlement::{PlacementError, RemovedTile, Settlement};
use crate::waves::WaveSpawner;

/// Errors raised while building or restoring a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The configuration is invalid.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// The world grid could not be created.
    #[error("world error: {source}")]
    World {
        /// The underlying grid error.
        #[from]
        source: WorldError,
    },

    /// A save could not be read, written or applied.
    #[error("persistence error: {source}")]
    Persistence {
        /// The underlying persistence error.
        #[from]
        source: PersistenceError,
    },
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickSummary {
    /// Tick number just completed.
    pub tick: u64,
    /// Simulated seconds elapsed after the tick.
    pub elapsed_seconds: f64,
    /// Total occupants.
    pub population: u32,
    /// Workers assigned to buildings.
    pub employed: u32,
    /// Treasury after the tick.
    pub money: i64,
    /// Live agents after the tick.
    pub agents_alive: usize,
    /// Live enemies after the tick.
    pub enemies_alive: usize,
    /// Agents added this tick (walkers, carts, shots and raiders).
    pub spawned: u32,
    /// Agents removed this tick.
    pub despawned: u32,
    /// Enemies killed this tick.
    pub enemies_killed: u32,
    /// Collapsed buildings cleared this tick.
    pub collapsed: u32,
    /// Houses that evolved this tick.
    pub upgrades: u32,
    /// Houses that devolved this tick.
    pub downgrades: u32,
}

/// One running settlement.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    clock: SimClock,
    settlement: Settlement,
    scheduler: AgentScheduler,
    economy: Economy,
    waves: WaveSpawner,
    rng: StdRng,
}

impl Simulation {
    /// A fresh simulation with procedurally generated terrain.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.world.seed);
        let mut terrain = TerrainField::new(config.world.width, config.world.height)?;
        generate(&mut terrain, &config.generation, &mut rng);
        Self::assemble(config, terrain, rng)
    }

    /// A fresh simulation over a prepared terrain field.
    pub fn with_terrain(
        config: SimulationConfig,
        terrain: TerrainField,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.world.seed);
        Self::assemble(config, terrain, rng)
    }

    fn assemble(
        config: SimulationConfig,
        terrain: TerrainField,
        rng: StdRng,
    ) -> Result<Self, SimulationError> {
        let catalog = config.catalog()?;
        info!(
            world = %config.world.name,
            width = terrain.width(),
            height = terrain.height(),
            building_types = catalog.len(),
            "simulation created"
        );
        Ok(Self {
            clock: SimClock::new(),
            settlement: Settlement::new(terrain, catalog),
            scheduler: AgentScheduler::new(),
            economy: Economy::new(&config.economy),
            waves: WaveSpawner::new(&config.waves),
            rng,
            config,
        })
    }

    // -------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------

    /// Configuration in effect.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Tick counter and elapsed time.
    pub const fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Grid, roads and buildings.
    pub const fn settlement(&self) -> &Settlement {
        &self.settlement
    }

    /// Live agents.
    pub const fn scheduler(&self) -> &AgentScheduler {
        &self.scheduler
    }

    /// Treasury and labour totals.
    pub const fn economy(&self) -> &Economy {
        &self.economy
    }

    /// Wave countdown.
    pub const fn waves(&self) -> &WaveSpawner {
        &self.waves
    }

    // -------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------

    /// Run one step of the configured `tick_seconds`.
    pub fn tick(&mut self) -> Result<TickSummary, ClockError> {
        self.step(self.config.time.tick_seconds)
    }

    /// Run one step of `dt` seconds.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError`] for a negative or non-finite `dt` (nothing is
    /// advanced) or when the tick counter would overflow.
    pub fn step(&mut self, dt: f32) -> Result<TickSummary, ClockError> {
        let dt = SimClock::validate_dt(dt)?;
        let mut spawned = 0_u32;

        self.economy.update(self.settlement.buildings_mut());

        let orchestration = self.settlement.update(dt, &mut self.rng);
        for agent in orchestration.spawned {
            self.scheduler.spawn(agent);
            spawned = spawned.saturating_add(1);
        }

        for shot in defense::fire_towers(&mut self.settlement, &self.scheduler) {
            self.scheduler.spawn(shot);
            spawned = spawned.saturating_add(1);
        }

        let wave = self
            .waves
            .update(dt, &self.config.waves, &self.settlement, &mut self.rng);
        for tile in wave {
            self.scheduler
                .spawn(Agent::Enemy(Enemy::new(tile, &self.config.enemies)));
            spawned = spawned.saturating_add(1);
        }

        let removed = self.scheduler.update(
            dt,
            &mut self.settlement,
            &mut self.economy,
            &self.config.agents,
            &self.config.enemies,
        );

        let tick = self.clock.advance(dt)?;
        let summary = TickSummary {
            tick,
            elapsed_seconds: self.clock.elapsed(),
            population: self.economy.population,
            employed: self.economy.employed,
            money: self.economy.money,
            agents_alive: self.scheduler.len(),
            enemies_alive: self.scheduler.count_kind(AgentKind::Enemy),
            spawned,
            despawned: removed.total(),
            enemies_killed: removed.count(DespawnReason::Killed),
            collapsed: u32::try_from(orchestration.cleared.len()).unwrap_or(u32::MAX),
            upgrades: orchestration.upgrades,
            downgrades: orchestration.downgrades,
        };
        debug!(
            tick = summary.tick,
            population = summary.population,
            money = summary.money,
            agents = summary.agents_alive,
            enemies = summary.enemies_alive,
            "tick complete"
        );
        Ok(summary)
    }

    // -------------------------------------------------------------------
    // Player operations
    // -------------------------------------------------------------------

    fn ensure_funds(&self, cost: u32) -> Result<(), PlacementError> {
        if self.economy.can_afford(cost) {
            Ok(())
        } else {
            Err(PlacementError::InsufficientFunds {
                cost,
                available: self.economy.money,
            })
        }
    }

    /// Lay a road tile for `economy.road_cost`.
    pub fn place_road(&mut self, pos: TilePos) -> Result<(), PlacementError> {
        let cost = self.config.economy.road_cost;
        self.ensure_funds(cost)?;
        self.settlement.place_road(pos)?;
        self.economy.spend(cost);
        Ok(())
    }

    /// Lay a bridge tile over water for `economy.bridge_cost`.
    pub fn place_bridge(&mut self, pos: TilePos) -> Result<(), PlacementError> {
        let cost = self.config.economy.bridge_cost;
        self.ensure_funds(cost)?;
        self.settlement.place_bridge(pos)?;
        self.economy.spend(cost);
        Ok(())
    }

    /// Place a building of `type_id` at `origin` for its type cost.
    pub fn place_building(
        &mut self,
        origin: TilePos,
        type_id: &str,
    ) -> Result<BuildingId, PlacementError> {
        let cost = self
            .settlement
            .catalog()
            .get(type_id)
            .map(|kind| kind.cost)
            .ok_or_else(|| PlacementError::UnknownBuildingType(type_id.to_owned()))?;
        self.ensure_funds(cost)?;
        let id = self.settlement.place_building(origin, type_id)?;
        self.economy.spend(cost);
        Ok(id)
    }

    /// Clear whatever occupies `pos`, refunding `economy.refund_ratio` of
    /// its price.
    pub fn remove_tile(&mut self, pos: TilePos) -> Result<RemovedTile, PlacementError> {
        let removed = self.settlement.remove_tile(pos)?;
        let price = match &removed {
            RemovedTile::Road => self.config.economy.road_cost,
            RemovedTile::Bridge => self.config.economy.bridge_cost,
            RemovedTile::Building { cost, .. } => *cost,
        };
        let refund = refund_amount(price, self.config.economy.refund_ratio);
        if refund > 0 {
            self.economy.earn(refund);
        }
        Ok(removed)
    }

    /// Raise the upgrade level of the building covering `pos`. Returns the
    /// new level.
    pub fn upgrade_building(&mut self, pos: TilePos) -> Result<u32, PlacementError> {
        let (id, cost) = self.settlement.upgrade_cost(pos)?;
        self.ensure_funds(cost)?;
        let level = self
            .settlement
            .apply_upgrade(id)
            .ok_or(PlacementError::NotUpgradable(pos))?;
        self.economy.spend(cost);
        Ok(level)
    }

    // -------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------

    /// Capture the current state.
    pub fn save(&self) -> SaveGame {
        SaveGame::capture(&self.settlement, &self.economy, &self.clock)
    }

    /// Capture the current state and write it to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), SimulationError> {
        self.save().write(path)?;
        Ok(())
    }

    /// Replace the current state with `save`. Agents in flight are dropped
    /// and the wave countdown restarts. Returns how many entries were
    /// skipped.
    pub fn restore(&mut self, save: &SaveGame) -> Result<usize, SimulationError> {
        save.check_grid(self.config.world.width, self.config.world.height)?;
        let restored = save.restore(self.settlement.catalog().clone())?;
        self.settlement = restored.settlement;
        self.economy = restored.economy;
        self.clock = restored.clock;
        self.scheduler.clear();
        self.waves = WaveSpawner::new(&self.config.waves);
        Ok(restored.skipped)
    }

    /// Read a save from `path` and restore it.
    pub fn restore_from(&mut self, path: &Path) -> Result<usize, SimulationError> {
        let save = SaveGame::read(path)?;
        self.restore(&save)
    }
}

/// `price * ratio`, rounded down, never negative.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn refund_amount(price: u32, ratio: f32) -> u32 {
    (f64::from(price) * f64::from(ratio.clamp(0.0, 1.0))).floor() as u32
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use colonia_types::{CoverageKind, Terrain};

    use super::*;
    use crate::config::{EconomyConfig, WaveConfig};

    fn config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.world.width = 16;
        config.world.height = 12;
        config.waves = WaveConfig {
            enabled: false,
            ..WaveConfig::default()
        };
        config
    }

    fn flat(config: SimulationConfig) -> Simulation {
        let terrain = TerrainField::new(config.world.width, config.world.height).unwrap();
        Simulation::with_terrain(config, terrain).unwrap()
    }

    #[test]
    fn placement_charges_the_treasury() {
        let mut sim = flat(config());
        sim.place_road(TilePos::new(0, 4)).unwrap();
        sim.place_road(TilePos::new(1, 4)).unwrap();
        sim.place_building(TilePos::new(0, 2), "house").unwrap();
        assert_eq!(sim.economy().money, 460);
    }

    #[test]
    fn insufficient_funds_leave_the_grid_untouched() {
        let mut config = config();
        config.economy = EconomyConfig {
            starting_money: 3,
            ..EconomyConfig::default()
        };
        let mut sim = flat(config);

        let err = sim.place_road(TilePos::new(0, 0)).unwrap_err();
        assert_eq!(
            err,
            PlacementError::InsufficientFunds {
                cost: 5,
                available: 3
            }
        );
        assert!(!sim.settlement().terrain().has_road(TilePos::new(0, 0)));
        assert_eq!(sim.economy().money, 3);
    }

    #[test]
    fn failed_placement_costs_nothing() {
        let mut sim = flat(config());
        let err = sim.place_building(TilePos::new(5, 5), "house").unwrap_err();
        assert!(matches!(err, PlacementError::World { .. }));
        assert_eq!(sim.economy().money, 500);

        let err = sim.place_building(TilePos::new(5, 5), "palace").unwrap_err();
        assert_eq!(err, PlacementError::UnknownBuildingType("palace".to_owned()));
    }

    #[test]
    fn removal_refunds_by_ratio() {
        let mut config = config();
        config.economy.refund_ratio = 0.5;
        let mut sim = flat(config);
        sim.place_road(TilePos::new(0, 4)).unwrap();
        sim.place_building(TilePos::new(0, 2), "house").unwrap();
        assert_eq!(sim.economy().money, 465);

        let removed = sim.remove_tile(TilePos::new(1, 3)).unwrap();
        assert!(matches!(removed, RemovedTile::Building { cost: 30, .. }));
        assert_eq!(sim.economy().money, 480);

        sim.remove_tile(TilePos::new(0, 4)).unwrap();
        assert_eq!(sim.economy().money, 482);
    }

    #[test]
    fn bridge_costs_more_than_road() {
        let mut config = config();
        config.economy.starting_money = 100;
        let mut terrain = TerrainField::new(16, 12).unwrap();
        terrain.set_terrain(TilePos::new(3, 3), Some(Terrain::Water));
        let mut sim = Simulation::with_terrain(config, terrain).unwrap();

        assert!(sim.place_road(TilePos::new(3, 3)).is_err());
        sim.place_bridge(TilePos::new(3, 3)).unwrap();
        assert_eq!(sim.economy().money, 80);
    }

    #[test]
    fn upgrade_charges_half_cost_per_level() {
        let mut sim = flat(config());
        for x in 0..6 {
            sim.place_road(TilePos::new(x, 4)).unwrap();
        }
        sim.place_building(TilePos::new(0, 2), "market").unwrap();
        let before = sim.economy().money;

        assert_eq!(sim.upgrade_building(TilePos::new(1, 3)).unwrap(), 1);
        assert_eq!(sim.economy().money, before.saturating_sub(50));
        assert_eq!(sim.upgrade_building(TilePos::new(0, 2)).unwrap(), 2);
        assert_eq!(sim.economy().money, before.saturating_sub(150));
        assert!(matches!(
            sim.upgrade_building(TilePos::new(0, 2)),
            Err(PlacementError::MaxUpgradeLevel { level: 2, .. })
        ));
    }

    #[test]
    fn ticks_advance_the_clock_and_report_totals() {
        let mut sim = flat(config());
        for x in 0..8 {
            sim.place_road(TilePos::new(x, 4)).unwrap();
        }
        let house = sim.place_building(TilePos::new(0, 2), "house").unwrap();
        sim.place_building(TilePos::new(2, 3), "well").unwrap();

        let summary = sim.tick().unwrap();
        assert_eq!(summary.tick, 1);
        assert!((summary.elapsed_seconds - 0.1).abs() < 1e-6);

        let summary = sim.tick().unwrap();
        let occupants = sim.settlement().building(house).unwrap().occupants();
        assert!(occupants >= 1);
        assert_eq!(summary.population, occupants);
        assert!(
            sim.settlement()
                .building(house)
                .unwrap()
                .coverage(CoverageKind::Water)
                > 0.0
        );
    }

    #[test]
    fn invalid_dt_is_rejected() {
        let mut sim = flat(config());
        assert!(sim.step(-1.0).is_err());
        assert!(sim.step(f32::NAN).is_err());
        assert_eq!(sim.clock().tick(), 0);
    }

    #[test]
    fn waves_bring_enemies() {
        let mut config = config();
        config.waves = WaveConfig {
            enabled: true,
            first_wave_delay: 0.05,
            interval: 1000.0,
            base_count: 3,
            growth: 0,
            max_per_wave: 3,
        };
        let mut sim = flat(config);
        sim.place_road(TilePos::new(8, 6)).unwrap();
        sim.place_building(TilePos::new(8, 4), "house").unwrap();

        let summary = sim.tick().unwrap();
        assert_eq!(summary.spawned, 3);
        assert_eq!(summary.enemies_alive, 3);
        assert_eq!(sim.waves().waves_launched(), 1);
    }

    #[test]
    fn restore_replaces_state_and_drops_agents() {
        let mut sim = flat(config());
        for x in 0..8 {
            sim.place_road(TilePos::new(x, 4)).unwrap();
        }
        sim.place_building(TilePos::new(0, 2), "house").unwrap();
        sim.tick().unwrap();
        let save = sim.save();

        sim.place_building(TilePos::new(4, 2), "house").unwrap();
        let skipped = sim.restore(&save).unwrap();

        assert_eq!(skipped, 0);
        assert_eq!(sim.settlement().buildings().len(), 1);
        assert_eq!(sim.clock().tick(), 1);
        assert!(sim.scheduler().is_empty());
    }

    #[test]
    fn restore_rejects_a_different_grid() {
        let mut sim = flat(config());
        let mut save = sim.save();
        save.width = 99;
        assert!(matches!(
            sim.restore(&save),
            Err(SimulationError::Persistence {
                source: PersistenceError::GridMismatch { .. }
            })
        ));
    }

    #[test]
    fn refund_rounds_down() {
        assert_eq!(refund_amount(30, 0.5), 15);
        assert_eq!(refund_amount(5, 0.5), 2);
        assert_eq!(refund_amount(100, 0.0), 0);
        assert_eq!(refund_amount(100, 3.0), 100);
    }
}
