//! The settlement orchestrator.
//!
//! [`Settlement`] owns the terrain field, the building catalog and every
//! placed [`Building`]. It is the only writer of occupancy: roads, bridges
//! and building footprints are laid and cleared here, so the road graph
//! and the tile grid can never drift apart.
//!
//! Each call to [`Settlement::update`] runs one orchestration pass:
//!
//! 1. Clear away buildings that collapsed since the last pass.
//! 2. Reset the statically sourced coverage kinds on every house.
//! 3. Let every static emitter add its falloff to nearby houses.
//! 4. Advance every building's own state machine.
//! 5. Spawn an agent for every walker slot that is ready.

use std::collections::BTreeMap;
use std::sync::Arc;

use colonia_types::{BuildingId, Facing, Good, TilePos, WalkerRole};
use colonia_world::catalog::StaticCoverage;
use colonia_world::{
    Building, Catalog, EvolutionChange, Occupant, RoadGraph, SlotPhase, TerrainField, WorldError,
};
use rand::Rng;
use tracing::{debug, info};

use crate::agents::{Agent, CartWalker, Walker};

/// Reasons a player edit is refused. Nothing is mutated when one is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    /// The grid rejected the edit.
    #[error(transparent)]
    World {
        /// The underlying grid error.
        #[from]
        source: WorldError,
    },

    /// The treasury does not cover the cost.
    #[error("insufficient funds: need {cost}, have {available}")]
    InsufficientFunds {
        /// Price of the edit.
        cost: u32,
        /// Money in the treasury.
        available: i64,
    },

    /// No building type with this id exists in the catalog.
    #[error("unknown building type '{0}'")]
    UnknownBuildingType(String),

    /// The tile holds nothing that can be removed.
    #[error("nothing to remove at {0}")]
    NothingToRemove(TilePos),

    /// The tile holds no building that accepts manual upgrades.
    #[error("building at {0} cannot be upgraded")]
    NotUpgradable(TilePos),

    /// The building is already at its highest upgrade level.
    #[error("building at {pos} is already at upgrade level {level}")]
    MaxUpgradeLevel {
        /// A footprint tile of the building.
        pos: TilePos,
        /// Its current level.
        level: u32,
    },
}

/// What [`Settlement::remove_tile`] cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovedTile {
    /// A road tile.
    Road,
    /// A bridge tile.
    Bridge,
    /// A whole building.
    Building {
        /// Handle of the removed building.
        id: BuildingId,
        /// Its type id.
        type_id: String,
        /// Its placement cost.
        cost: u32,
    },
}

/// Everything that happened during one orchestration pass.
#[derive(Debug, Default)]
pub struct SettlementTick {
    /// Agents spawned from walker slots, ready for the scheduler.
    pub spawned: Vec<Agent>,
    /// Collapsed buildings cleared from the grid.
    pub cleared: Vec<BuildingId>,
    /// Houses that moved up a level.
    pub upgrades: u32,
    /// Houses that moved down a level.
    pub downgrades: u32,
}

/// Door tile, road-access tile and facing found for a footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorSite {
    /// Footprint edge tile.
    pub door: TilePos,
    /// Road tile next to the door, outside the footprint.
    pub road: TilePos,
    /// Direction from door to road.
    pub facing: Facing,
}

/// Owner of the grid, the catalog and every placed building.
#[derive(Debug, Clone)]
pub struct Settlement {
    terrain: TerrainField,
    catalog: Catalog,
    buildings: BTreeMap<BuildingId, Building>,
    next_id: BuildingId,
}

impl Settlement {
    /// An empty settlement over `terrain`.
    pub const fn new(terrain: TerrainField, catalog: Catalog) -> Self {
        Self {
            terrain,
            catalog,
            buildings: BTreeMap::new(),
            next_id: BuildingId::new(1),
        }
    }

    // -------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------

    /// The tile grid.
    pub const fn terrain(&self) -> &TerrainField {
        &self.terrain
    }

    /// The tile grid, for terrain generation before any placement.
    pub const fn terrain_mut(&mut self) -> &mut TerrainField {
        &mut self.terrain
    }

    /// The building catalog.
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Read view of the road network.
    pub const fn roads(&self) -> RoadGraph<'_> {
        RoadGraph::new(&self.terrain)
    }

    /// Every placed building, by handle.
    pub const fn buildings(&self) -> &BTreeMap<BuildingId, Building> {
        &self.buildings
    }

    /// Mutable access to every placed building, for the labour market.
    pub const fn buildings_mut(&mut self) -> &mut BTreeMap<BuildingId, Building> {
        &mut self.buildings
    }

    /// Resolve a handle.
    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(&id)
    }

    /// Resolve a handle mutably.
    pub fn building_mut(&mut self, id: BuildingId) -> Option<&mut Building> {
        self.buildings.get_mut(&id)
    }

    /// The building covering `pos`, if any.
    pub fn building_at(&self, pos: TilePos) -> Option<&Building> {
        self.terrain
            .building_at(pos)
            .and_then(|id| self.buildings.get(&id))
    }

    /// Handle the next placed building will receive.
    pub const fn next_id(&self) -> BuildingId {
        self.next_id
    }

    /// Whether an enemy may stand on `pos`: inside the grid, not on
    /// impassable terrain unless bridged, and not on an intact wall.
    pub fn is_walkable(&self, pos: TilePos) -> bool {
        let Some(tile) = self.terrain.tile(pos) else {
            return false;
        };
        match tile.occupant {
            Some(Occupant::Road | Occupant::Bridge) => true,
            Some(Occupant::Building(id)) => {
                !tile.is_impassable()
                    && self
                        .buildings
                        .get(&id)
                        .is_none_or(|b| !b.is_wall() || b.collapsed)
            }
            None => !tile.is_impassable(),
        }
    }

    // -------------------------------------------------------------------
    // Player edits
    // -------------------------------------------------------------------

    /// Lay a road tile.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::World`] if the tile is out of bounds,
    /// occupied or impassable.
    pub fn place_road(&mut self, pos: TilePos) -> Result<(), PlacementError> {
        self.terrain.add_road(pos)?;
        debug!(%pos, "road placed");
        Ok(())
    }

    /// Lay a bridge tile over water.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::World`] if the tile is out of bounds,
    /// occupied or not water.
    pub fn place_bridge(&mut self, pos: TilePos) -> Result<(), PlacementError> {
        self.terrain.add_bridge(pos)?;
        debug!(%pos, "bridge placed");
        Ok(())
    }

    /// Check that `type_id` can be placed at `origin` and find its door.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::UnknownBuildingType`] or the first grid
    /// violation: footprint out of bounds, occupied, wrong terrain, missing
    /// deposit or no road access.
    pub fn check_placement(
        &self,
        origin: TilePos,
        type_id: &str,
    ) -> Result<Option<DoorSite>, PlacementError> {
        let kind = self
            .catalog
            .get(type_id)
            .ok_or_else(|| PlacementError::UnknownBuildingType(type_id.to_owned()))?;
        self.terrain
            .check_area(origin, kind.width, kind.height, kind.required_terrain)?;
        if let Some(deposit) = kind.required_deposit {
            if !self
                .terrain
                .area_has_deposit(origin, kind.width, kind.height, deposit)
            {
                return Err(WorldError::MissingDeposit { origin, deposit }.into());
            }
        }
        let door = self.find_door(origin, kind.width, kind.height);
        if kind.requires_road && door.is_none() {
            return Err(WorldError::NoRoadAccess(origin).into());
        }
        Ok(door)
    }

    /// Place a building of `type_id` with its top-left tile at `origin`.
    ///
    /// All-or-nothing: on error the grid is untouched. Funds are the
    /// caller's concern.
    ///
    /// # Errors
    ///
    /// See [`Self::check_placement`].
    pub fn place_building(
        &mut self,
        origin: TilePos,
        type_id: &str,
    ) -> Result<BuildingId, PlacementError> {
        let door = match self.check_placement(origin, type_id) {
            Ok(door) => door,
            Err(err) => {
                debug!(%origin, type_id, error = %err, "placement rejected");
                return Err(err);
            }
        };
        let kind = self
            .catalog
            .get(type_id)
            .map(Arc::clone)
            .ok_or_else(|| PlacementError::UnknownBuildingType(type_id.to_owned()))?;

        let id = self.next_id;
        self.next_id = id.next();
        let mut building = Building::new(id, origin, kind);
        if let Some(site) = door {
            building.door = Some(site.door);
            building.road_access = Some(site.road);
            building.facing = site.facing;
        }
        self.insert(building);
        info!(building_id = %id, type_id, %origin, "building placed");
        Ok(id)
    }

    /// Insert a fully built instance, restored from a save.
    ///
    /// # Errors
    ///
    /// Returns a [`WorldError`] if the footprint is out of bounds, overlaps
    /// something or sits on the wrong terrain.
    pub fn insert_restored(&mut self, building: Building) -> Result<(), WorldError> {
        let kind = Arc::clone(&building.kind);
        self.terrain
            .check_area(building.origin, kind.width, kind.height, kind.required_terrain)?;
        if building.id >= self.next_id {
            self.next_id = building.id.next();
        }
        self.insert(building);
        Ok(())
    }

    /// Raise the handle counter, used when a save records a higher value
    /// than any surviving building.
    pub fn reserve_ids_up_to(&mut self, next_id: BuildingId) {
        self.next_id = self.next_id.max(next_id);
    }

    fn insert(&mut self, building: Building) {
        self.terrain.occupy(
            building.origin,
            building.kind.width,
            building.kind.height,
            building.id,
        );
        self.buildings.insert(building.id, building);
    }

    /// Scan the footprint edge for an adjacent road.
    ///
    /// Top and bottom edges are scanned column by column, then left and
    /// right edges row by row; the first road outside the footprint wins.
    pub fn find_door(&self, origin: TilePos, width: u32, height: u32) -> Option<DoorSite> {
        let w = i32::try_from(width).ok()?;
        let h = i32::try_from(height).ok()?;
        let far = origin.offset(w.saturating_sub(1), h.saturating_sub(1));
        let inside = |p: TilePos| p.x >= origin.x && p.y >= origin.y && p.x <= far.x && p.y <= far.y;

        let mut edges = Vec::new();
        for dx in 0..w {
            edges.push(origin.offset(dx, 0));
            edges.push(TilePos::new(origin.x.saturating_add(dx), far.y));
        }
        for dy in 0..h {
            edges.push(origin.offset(0, dy));
            edges.push(TilePos::new(far.x, origin.y.saturating_add(dy)));
        }

        edges.into_iter().find_map(|door| {
            self.terrain
                .adjacent_road_tiles(door)
                .into_iter()
                .find(|road| !inside(*road))
                .map(|road| DoorSite {
                    door,
                    road,
                    facing: facing_between(door, road),
                })
        })
    }

    /// Remove the building with handle `id`, clearing its tiles.
    pub fn remove_building(&mut self, id: BuildingId) -> Option<Building> {
        let building = self.buildings.remove(&id)?;
        self.terrain.vacate(
            building.origin,
            building.kind.width,
            building.kind.height,
            building.id,
        );
        Some(building)
    }

    /// Clear whatever occupies `pos`: a road, a bridge, or the whole
    /// building covering it.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::NothingToRemove`] for empty or
    /// out-of-bounds tiles.
    pub fn remove_tile(&mut self, pos: TilePos) -> Result<RemovedTile, PlacementError> {
        let occupant = self
            .terrain
            .tile(pos)
            .and_then(|t| t.occupant)
            .ok_or(PlacementError::NothingToRemove(pos))?;
        let removed = match occupant {
            Occupant::Road => {
                self.terrain.remove_road(pos);
                RemovedTile::Road
            }
            Occupant::Bridge => {
                self.terrain.remove_road(pos);
                RemovedTile::Bridge
            }
            Occupant::Building(id) => {
                let building = self
                    .remove_building(id)
                    .ok_or(PlacementError::NothingToRemove(pos))?;
                info!(building_id = %id, type_id = building.type_id(), "building removed");
                RemovedTile::Building {
                    id,
                    type_id: building.kind.id.clone(),
                    cost: building.kind.cost,
                }
            }
        };
        debug!(%pos, ?removed, "tile cleared");
        Ok(removed)
    }

    /// Price of the next manual upgrade of the building covering `pos`:
    /// half the type cost times the target level.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::NotUpgradable`] for empty tiles, houses and
    /// types without upgrades, or [`PlacementError::MaxUpgradeLevel`].
    pub fn upgrade_cost(&self, pos: TilePos) -> Result<(BuildingId, u32), PlacementError> {
        let building = self
            .building_at(pos)
            .ok_or(PlacementError::NotUpgradable(pos))?;
        if building.is_house() || building.kind.max_upgrade_level == 0 {
            return Err(PlacementError::NotUpgradable(pos));
        }
        let level = building.upgrade_level;
        if level >= building.kind.max_upgrade_level {
            return Err(PlacementError::MaxUpgradeLevel { pos, level });
        }
        let cost = building
            .kind
            .cost
            .saturating_mul(level.saturating_add(1))
            / 2;
        Ok((building.id, cost))
    }

    /// Raise a building's upgrade level by one, up to its type maximum.
    /// Returns the new level.
    pub fn apply_upgrade(&mut self, id: BuildingId) -> Option<u32> {
        let building = self.buildings.get_mut(&id)?;
        if building.upgrade_level >= building.kind.max_upgrade_level {
            return None;
        }
        building.upgrade_level = building.upgrade_level.saturating_add(1);
        info!(building_id = %id, level = building.upgrade_level, "building upgraded");
        Some(building.upgrade_level)
    }

    // -------------------------------------------------------------------
    // Orchestration
    // -------------------------------------------------------------------

    /// Run one orchestration pass of `dt` seconds.
    pub fn update(&mut self, dt: f32, rng: &mut impl Rng) -> SettlementTick {
        let mut tick = SettlementTick {
            cleared: self.clear_collapsed(),
            ..SettlementTick::default()
        };

        self.apply_static_coverage();

        for building in self.buildings.values_mut() {
            let result = building.update(dt);
            match result.evolution {
                Some(EvolutionChange::Upgraded { from, to }) => {
                    tick.upgrades = tick.upgrades.saturating_add(1);
                    debug!(building_id = %building.id, from, to, "house evolved");
                }
                Some(EvolutionChange::Downgraded { from, to }) => {
                    tick.downgrades = tick.downgrades.saturating_add(1);
                    debug!(building_id = %building.id, from, to, "house devolved");
                }
                None => {}
            }
            if result.collapsed {
                info!(
                    building_id = %building.id,
                    type_id = building.type_id(),
                    "building collapsed"
                );
            }
        }

        let ids: Vec<BuildingId> = self.buildings.keys().copied().collect();
        for id in ids {
            let slot_count = self.buildings.get(&id).map_or(0, |b| b.slots.len());
            for slot in 0..slot_count {
                let ready = self
                    .buildings
                    .get(&id)
                    .is_some_and(|b| b.slot_phase(slot) == SlotPhase::Ready);
                if ready {
                    if let Some(agent) = self.spawn_from_slot(id, slot, rng) {
                        tick.spawned.push(agent);
                    }
                }
            }
        }

        tick
    }

    fn clear_collapsed(&mut self) -> Vec<BuildingId> {
        let collapsed: Vec<BuildingId> = self
            .buildings
            .values()
            .filter(|b| b.collapsed)
            .map(|b| b.id)
            .collect();
        for id in &collapsed {
            if let Some(building) = self.remove_building(*id) {
                info!(building_id = %id, type_id = building.type_id(), "collapsed building cleared");
            }
        }
        collapsed
    }

    /// Reset statically sourced kinds, then let every emitter add the
    /// amount for its Manhattan distance to each house. Emitters stack up
    /// to the coverage cap.
    fn apply_static_coverage(&mut self) {
        let emitters: Vec<(TilePos, StaticCoverage)> = self
            .buildings
            .values()
            .filter(|b| !b.collapsed)
            .filter_map(|b| {
                b.kind
                    .static_coverage
                    .as_ref()
                    .map(|sc| (b.center_tile(), sc.clone()))
            })
            .collect();

        for house in self.buildings.values_mut().filter(|b| b.is_house()) {
            house.reset_static_coverage();
            for (center, emission) in &emitters {
                if let Some(amount) = emission.amount_at(house.manhattan_to(*center)) {
                    house.add_coverage(emission.kind, amount);
                }
            }
        }
    }

    fn spawn_from_slot(
        &mut self,
        id: BuildingId,
        slot: usize,
        rng: &mut impl Rng,
    ) -> Option<Agent> {
        let (road_access, template) = {
            let building = self.buildings.get(&id)?;
            (building.road_access, building.slot_template(slot)?.clone())
        };
        let Some(start) = road_access else {
            self.buildings.get_mut(&id)?.on_spawn_failed(slot);
            return None;
        };

        match template.role {
            WalkerRole::Cart => {
                let planned = template.good.and_then(|good| {
                    self.plan_cart_route(id, good, start)
                        .map(|(target, path)| (good, target, path))
                });
                let building = self.buildings.get_mut(&id)?;
                let Some((good, target, path)) = planned else {
                    debug!(building_id = %id, good = ?template.good, "no cart receiver reachable");
                    building.on_spawn_failed(slot);
                    return None;
                };
                let Some(cargo) = building.take_goods_for_cart(good, template.load) else {
                    building.on_spawn_failed(slot);
                    return None;
                };
                building.on_walker_spawned(slot);
                debug!(building_id = %id, target_id = %target, ?good, amount = cargo.amount, "cart dispatched");
                Some(Agent::Cart(CartWalker::new(id, slot, target, cargo, path)))
            }
            role => {
                let path = self.roads().random_path(start, template.max_steps, rng);
                let building = self.buildings.get_mut(&id)?;
                if path.len() <= 1 {
                    building.on_spawn_failed(slot);
                    return None;
                }
                let cargo = if role == WalkerRole::Distributor {
                    building.take_goods_for_distributor(template.load)
                } else {
                    Vec::new()
                };
                building.on_walker_spawned(slot);
                Some(Agent::Walker(Walker::new(id, slot, role, cargo, path)))
            }
        }
    }

    /// Buildings that may receive `good` from `source`, best first.
    ///
    /// Candidates accept the good, do not ship it themselves, are not full
    /// and have a road access tile. They are ordered by fill ratio, ties
    /// by handle.
    pub fn cart_targets(&self, source: BuildingId, good: Good) -> Vec<BuildingId> {
        let mut candidates: Vec<(f32, BuildingId)> = self
            .buildings
            .values()
            .filter(|b| {
                b.id != source
                    && !b.collapsed
                    && b.road_access.is_some()
                    && b.kind.receives(good)
                    && !b.kind.ships(good)
            })
            .filter_map(|b| b.fill_ratio(good).map(|ratio| (ratio, b.id)))
            .filter(|(ratio, _)| *ratio < 1.0)
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        candidates.into_iter().map(|(_, id)| id).collect()
    }

    /// The least-filled receiver reachable by road from `start`, with the
    /// route to its road access tile.
    fn plan_cart_route(
        &self,
        source: BuildingId,
        good: Good,
        start: TilePos,
    ) -> Option<(BuildingId, Vec<TilePos>)> {
        let roads = self.roads();
        self.cart_targets(source, good).into_iter().find_map(|target| {
            let end = self.buildings.get(&target)?.road_access?;
            roads.find_path(start, end).map(|path| (target, path))
        })
    }
}

/// Facing of a step between two neighbouring tiles.
fn facing_between(from: TilePos, to: TilePos) -> Facing {
    let dx = to.x.saturating_sub(from.x).signum();
    let dy = to.y.saturating_sub(from.y).signum();
    match (dx, dy) {
        (1, _) => Facing::East,
        (-1, _) => Facing::West,
        (_, -1) => Facing::North,
        _ => Facing::South,
    }
}
