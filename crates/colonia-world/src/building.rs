//! Per-instance building state.
//!
//! A [`Building`] pairs an immutable [`BuildingType`] with mutable runtime
//! state. Which parts of the state are meaningful depends on the type's
//! profiles: houses track coverage and evolution, producers and markets
//! track storage, and anything with walker slots tracks spawn timers.
//!
//! # Tick order
//!
//! [`Building::update`] advances one building in a fixed order:
//!
//! 1. Slot timers and the tax cooldown count down.
//! 2. Decaying coverage kinds lose `decay_rate * dt`.
//! 3. Staffed producers run their production lines.
//! 4. Houses eat from their larder.
//! 5. Storage is clamped to capacity and storage-driven coverage is
//!    recomputed from larder fullness.
//! 6. Houses advance evolution.
//! 7. Collapse risk grows; the building may collapse.
//!
//! Static-emitter coverage is applied by the settlement before this runs,
//! so evolution always sees this tick's static values.

use std::collections::BTreeMap;
use std::sync::Arc;

use colonia_types::{BuildingId, Cargo, CoverageKind, Facing, Good, Point, TilePos, WalkerRole};
use serde::{Deserialize, Serialize};

use crate::catalog::{BuildingType, HouseLevel, HouseProfile, WalkerSlotTemplate};
use crate::terrain::footprint;

/// Upper bound of every coverage level.
pub const MAX_COVERAGE: f32 = 100.0;

/// Upper bound of collapse risk.
pub const MAX_COLLAPSE_RISK: f32 = 100.0;

/// Evolution progress after any level change.
pub const PROGRESS_AFTER_TRANSITION: f32 = 0.5;

// ---------------------------------------------------------------------------
// Sub-records
// ---------------------------------------------------------------------------

/// Runtime state of one walker slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalkerSlot {
    /// Seconds until the slot may spawn again. Never negative.
    pub timer: f32,
    /// Agents from this slot currently in the world.
    pub active: u32,
}

/// Why a slot can or cannot spawn right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPhase {
    /// The building has collapsed and is waiting to be cleared.
    Collapsed,
    /// The building lacks its base workforce.
    Unstaffed,
    /// The spawn timer has not elapsed.
    CoolingDown,
    /// The slot already runs its effective maximum of agents.
    AtCapacity,
    /// The slot moves goods and there are none to move.
    Starved,
    /// The slot may spawn.
    Ready,
}

/// House evolution state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evolution {
    /// Index into the house profile's levels.
    pub level: usize,
    /// Progress toward the next transition, within `0.0..=1.0`.
    pub progress: f32,
}

/// A level change produced by one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvolutionChange {
    /// The house moved up a level.
    Upgraded {
        /// Previous level.
        from: usize,
        /// New level.
        to: usize,
    },
    /// The house fell back a level.
    Downgraded {
        /// Previous level.
        from: usize,
        /// New level.
        to: usize,
    },
}

/// What happened to a building during one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildingTick {
    /// Evolution transition, if any.
    pub evolution: Option<EvolutionChange>,
    /// Whether the building collapsed during this update.
    pub collapsed: bool,
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// A placed building.
#[derive(Debug, Clone)]
pub struct Building {
    /// Handle stored in tiles and agents.
    pub id: BuildingId,
    /// Top-left footprint tile.
    pub origin: TilePos,
    /// Shared type configuration.
    pub kind: Arc<BuildingType>,
    /// Footprint edge tile agents leave from.
    pub door: Option<TilePos>,
    /// Road tile adjacent to the door; agents start and end here.
    pub road_access: Option<TilePos>,
    /// Side of the footprint facing the road.
    pub facing: Facing,
    /// One runtime record per slot template.
    pub slots: Vec<WalkerSlot>,
    /// Seconds until the house can be taxed again.
    pub tax_cooldown: f32,
    /// Current hit points, within `0.0..=max_hp`.
    pub hp: f32,
    /// Collapse risk, within `0.0..=100.0`.
    pub collapse_risk: f32,
    /// Set once the building has collapsed; it is cleared away next update.
    pub collapsed: bool,
    /// Manual upgrade level.
    pub upgrade_level: u32,
    /// Workers assigned by the labour market.
    pub workers: u32,
    /// Seconds until a tower may fire again.
    pub tower_cooldown: f32,
    coverage: BTreeMap<CoverageKind, f32>,
    storage: BTreeMap<Good, f32>,
    evolution: Option<Evolution>,
}

impl Building {
    /// Create a fresh instance of `kind` at `origin`.
    pub fn new(id: BuildingId, origin: TilePos, kind: Arc<BuildingType>) -> Self {
        let slots = kind
            .walker_slots
            .iter()
            .map(|t| WalkerSlot {
                timer: t.initial_delay.max(0.0),
                active: 0,
            })
            .collect();
        let coverage = kind
            .house
            .as_ref()
            .map(|h| h.tracked_kinds().into_iter().map(|k| (k, 0.0)).collect())
            .unwrap_or_default();
        let evolution = kind.house.as_ref().map(|h| Evolution {
            level: h.min_level,
            progress: PROGRESS_AFTER_TRANSITION,
        });
        let hp = kind.max_hp;
        Self {
            id,
            origin,
            kind,
            door: None,
            road_access: None,
            facing: Facing::default(),
            slots,
            tax_cooldown: 0.0,
            hp,
            collapse_risk: 0.0,
            collapsed: false,
            upgrade_level: 0,
            workers: 0,
            tower_cooldown: 0.0,
            coverage,
            storage: BTreeMap::new(),
            evolution,
        }
    }

    // -------------------------------------------------------------------
    // Geometry
    // -------------------------------------------------------------------

    /// Type identifier.
    pub fn type_id(&self) -> &str {
        &self.kind.id
    }

    /// Whether this building is a house.
    pub fn is_house(&self) -> bool {
        self.kind.house.is_some()
    }

    /// Whether this building is a wall.
    pub fn is_wall(&self) -> bool {
        self.kind.is_wall
    }

    /// Footprint tiles, row by row.
    pub fn tiles(&self) -> impl Iterator<Item = TilePos> + use<> {
        footprint(self.origin, self.kind.width, self.kind.height)
    }

    /// Whether `pos` lies on the footprint.
    pub fn contains(&self, pos: TilePos) -> bool {
        let (w, h) = self.extent();
        pos.x >= self.origin.x
            && pos.y >= self.origin.y
            && pos.x < self.origin.x.saturating_add(w)
            && pos.y < self.origin.y.saturating_add(h)
    }

    fn extent(&self) -> (i32, i32) {
        (
            i32::try_from(self.kind.width).unwrap_or(i32::MAX),
            i32::try_from(self.kind.height).unwrap_or(i32::MAX),
        )
    }

    /// Centre tile, rounding down for even sizes.
    pub fn center_tile(&self) -> TilePos {
        let (w, h) = self.extent();
        self.origin.offset(w / 2, h / 2)
    }

    /// Exact geometric centre.
    #[allow(clippy::cast_precision_loss)]
    pub fn center_point(&self) -> Point {
        let origin = self.origin.center();
        Point::new(
            origin.x + (self.kind.width as f32 - 1.0) / 2.0,
            origin.y + (self.kind.height as f32 - 1.0) / 2.0,
        )
    }

    /// Manhattan distance from `pos` to the closest footprint tile.
    pub fn manhattan_to(&self, pos: TilePos) -> u32 {
        self.tiles().map(|t| t.manhattan(pos)).min().unwrap_or(u32::MAX)
    }

    /// Euclidean distance from `point` to the nearest footprint tile
    /// centre, clamping each axis to the footprint. Zero on the footprint.
    pub fn distance_to_bounds(&self, point: Point) -> f32 {
        let (w, h) = self.extent();
        let min = self.origin.center();
        let max = self
            .origin
            .offset(w.saturating_sub(1), h.saturating_sub(1))
            .center();
        let nearest = Point::new(point.x.clamp(min.x, max.x), point.y.clamp(min.y, max.y));
        point.distance_to(nearest)
    }

    // -------------------------------------------------------------------
    // Coverage
    // -------------------------------------------------------------------

    /// Current level of `kind`, zero when untracked.
    pub fn coverage(&self, kind: CoverageKind) -> f32 {
        self.coverage.get(&kind).copied().unwrap_or(0.0)
    }

    /// All tracked coverage levels.
    pub fn coverage_levels(&self) -> &BTreeMap<CoverageKind, f32> {
        &self.coverage
    }

    /// Refresh `kind` to maximum. Ignored for untracked kinds.
    pub fn receive_coverage(&mut self, kind: CoverageKind) {
        if let Some(level) = self.coverage.get_mut(&kind) {
            *level = MAX_COVERAGE;
        }
    }

    /// Add `amount` to `kind`, clamping into `0.0..=100.0`.
    pub fn add_coverage(&mut self, kind: CoverageKind, amount: f32) {
        if let Some(level) = self.coverage.get_mut(&kind) {
            *level = (*level + amount).clamp(0.0, MAX_COVERAGE);
        }
    }

    /// Overwrite a tracked level, clamped. Used when restoring a save.
    pub fn restore_coverage(&mut self, kind: CoverageKind, level: f32) {
        if let Some(current) = self.coverage.get_mut(&kind) {
            *current = level.clamp(0.0, MAX_COVERAGE);
        }
    }

    /// Zero every kind fed only by static emitters.
    pub fn reset_static_coverage(&mut self) {
        for (kind, level) in &mut self.coverage {
            if kind.is_static_sourced() {
                *level = 0.0;
            }
        }
    }

    // -------------------------------------------------------------------
    // Population and tax
    // -------------------------------------------------------------------

    fn house(&self) -> Option<&HouseProfile> {
        self.kind.house.as_ref()
    }

    fn current_level(&self) -> Option<&HouseLevel> {
        let evolution = self.evolution?;
        self.house()?.levels.get(evolution.level)
    }

    /// Evolution state, for houses.
    pub const fn evolution(&self) -> Option<Evolution> {
        self.evolution
    }

    /// Overwrite evolution state, clamping level and progress into range.
    /// Ignored for non-houses.
    pub fn restore_evolution(&mut self, level: usize, progress: f32) {
        let Some(house) = self.kind.house.as_ref() else {
            return;
        };
        let level = level.clamp(house.min_level, house.max_level());
        self.evolution = Some(Evolution {
            level,
            progress: progress.clamp(0.0, 1.0),
        });
    }

    /// Occupants: level capacity scaled by water coverage, rounded up.
    /// Zero without water.
    pub fn occupants(&self) -> u32 {
        let Some(level) = self.current_level() else {
            return 0;
        };
        let water = self.coverage(CoverageKind::Water);
        if water <= 0.0 {
            return 0;
        }
        #[allow(clippy::cast_precision_loss)]
        let scaled = (level.capacity as f32 * water / MAX_COVERAGE).ceil();
        to_count(scaled).min(level.capacity)
    }

    /// Collect tax if the cooldown has elapsed.
    ///
    /// Returns occupants times the level multiplier, rounded. A non-zero
    /// collection restarts the cooldown; non-houses and empty houses yield 0.
    pub fn pay_tax(&mut self) -> u32 {
        if self.tax_cooldown > 0.0 {
            return 0;
        }
        let (Some(house), Some(level)) = (self.house(), self.current_level()) else {
            return 0;
        };
        let cooldown = house.tax_cooldown;
        #[allow(clippy::cast_precision_loss)]
        let amount = to_count((self.occupants() as f32 * level.tax_multiplier).round());
        if amount > 0 {
            self.tax_cooldown = cooldown;
        }
        amount
    }

    // -------------------------------------------------------------------
    // Goods
    // -------------------------------------------------------------------

    /// Storage capacity for `good`; zero for goods the building never holds.
    pub fn storage_capacity(&self, good: Good) -> f32 {
        if let Some(house) = self.house() {
            if !house.stocked_goods().contains(&good) {
                return 0.0;
            }
            #[allow(clippy::cast_precision_loss)]
            let occupants = self.occupants() as f32;
            return house.storage_per_occupant * occupants;
        }
        match &self.kind.goods {
            Some(goods) if goods.handles(good) => goods.capacity,
            _ => 0.0,
        }
    }

    /// Units of `good` in storage.
    pub fn stored(&self, good: Good) -> f32 {
        self.storage.get(&good).copied().unwrap_or(0.0)
    }

    /// All stored goods.
    pub fn storage(&self) -> &BTreeMap<Good, f32> {
        &self.storage
    }

    /// Fill ratio for `good`, or `None` if the building cannot hold it.
    pub fn fill_ratio(&self, good: Good) -> Option<f32> {
        let capacity = self.storage_capacity(good);
        (capacity > 0.0).then(|| self.stored(good) / capacity)
    }

    /// Whether storage for `good` is full.
    pub fn is_full(&self, good: Good) -> bool {
        self.stored(good) >= self.storage_capacity(good)
    }

    fn set_stored(&mut self, good: Good, amount: f32) {
        let capped = amount.clamp(0.0, self.storage_capacity(good));
        if capped > 0.0 {
            self.storage.insert(good, capped);
        } else {
            self.storage.remove(&good);
        }
    }

    /// Store up to `amount` of `good`; returns the amount accepted.
    pub fn receive_goods(&mut self, good: Good, amount: f32) -> f32 {
        let room = (self.storage_capacity(good) - self.stored(good)).max(0.0);
        let accepted = amount.max(0.0).min(room);
        if accepted > 0.0 {
            self.set_stored(good, self.stored(good) + accepted);
        }
        accepted
    }

    /// Put back goods an agent brings home; excess beyond capacity is lost.
    pub fn return_goods(&mut self, cargo: Cargo) -> f32 {
        self.receive_goods(cargo.good, cargo.amount)
    }

    /// Remove up to `max` of `good` for a cart.
    pub fn take_goods_for_cart(&mut self, good: Good, max: f32) -> Option<Cargo> {
        let taken = self.stored(good).min(max.max(0.0));
        if taken <= 0.0 {
            return None;
        }
        self.set_stored(good, self.stored(good) - taken);
        Some(Cargo::new(good, taken))
    }

    /// Remove up to `max_each` of every stored good for a distributor.
    pub fn take_goods_for_distributor(&mut self, max_each: f32) -> Vec<Cargo> {
        let goods: Vec<Good> = self.storage.keys().copied().collect();
        goods
            .into_iter()
            .filter_map(|good| self.take_goods_for_cart(good, max_each))
            .collect()
    }

    /// Overwrite storage, clamped to capacity. Used when restoring a save.
    pub fn restore_storage(&mut self, good: Good, amount: f32) {
        self.set_stored(good, amount);
    }

    // -------------------------------------------------------------------
    // Staffing, slots and upgrades
    // -------------------------------------------------------------------

    /// Whether the base workforce is assigned.
    pub fn is_staffed(&self) -> bool {
        self.workers >= self.kind.workers_needed
    }

    /// Workers this building asks the labour market for.
    pub fn workers_wanted(&self) -> u32 {
        let slots = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.kind
            .workers_needed
            .saturating_add(self.upgrade_level.saturating_mul(slots))
    }

    /// Concurrent agents a slot may run.
    ///
    /// The template maximum, plus one for every `slot_count` workers beyond
    /// the base requirement, never more than the upgrade level.
    pub fn effective_walker_max(&self, slot: usize) -> u32 {
        let Some(template) = self.kind.walker_slots.get(slot) else {
            return 0;
        };
        let slot_count = u32::try_from(self.kind.walker_slots.len()).unwrap_or(u32::MAX);
        let extra = self.workers.saturating_sub(self.kind.workers_needed);
        let unlocked = extra.checked_div(slot_count).unwrap_or(0);
        template
            .max_walkers
            .saturating_add(unlocked.min(self.upgrade_level))
    }

    /// Template of a slot.
    pub fn slot_template(&self, slot: usize) -> Option<&WalkerSlotTemplate> {
        self.kind.walker_slots.get(slot)
    }

    /// Whether a slot has goods to move.
    pub fn slot_has_goods(&self, slot: usize) -> bool {
        let Some(template) = self.slot_template(slot) else {
            return false;
        };
        match template.role {
            WalkerRole::Cart => template
                .good
                .is_some_and(|g| self.stored(g) >= template.load),
            WalkerRole::Distributor => self.storage.values().any(|v| *v > 0.0),
            _ => true,
        }
    }

    /// Phase of a slot.
    pub fn slot_phase(&self, slot: usize) -> SlotPhase {
        let (Some(state), Some(template)) = (self.slots.get(slot), self.slot_template(slot)) else {
            return SlotPhase::Unstaffed;
        };
        if self.collapsed {
            SlotPhase::Collapsed
        } else if !self.is_staffed() {
            SlotPhase::Unstaffed
        } else if state.timer > 0.0 {
            SlotPhase::CoolingDown
        } else if state.active >= self.effective_walker_max(slot) {
            SlotPhase::AtCapacity
        } else if template.role.moves_goods() && !self.slot_has_goods(slot) {
            SlotPhase::Starved
        } else {
            SlotPhase::Ready
        }
    }

    /// Record a spawn: restart the timer and count the agent.
    pub fn on_walker_spawned(&mut self, slot: usize) {
        let interval = self
            .slot_template(slot)
            .map_or(0.0, |t| t.spawn_interval);
        if let Some(state) = self.slots.get_mut(slot) {
            state.timer = interval;
            state.active = state.active.saturating_add(1);
        }
    }

    /// Record an agent coming home.
    pub fn on_walker_returned(&mut self, slot: usize) {
        if let Some(state) = self.slots.get_mut(slot) {
            state.active = state.active.saturating_sub(1);
        }
    }

    /// Record a spawn that could not go ahead (no route, no receiver):
    /// restart the timer without counting an agent.
    pub fn on_spawn_failed(&mut self, slot: usize) {
        let interval = self
            .slot_template(slot)
            .map_or(0.0, |t| t.spawn_interval);
        if let Some(state) = self.slots.get_mut(slot) {
            state.timer = interval;
        }
    }

    // -------------------------------------------------------------------
    // Damage and repair
    // -------------------------------------------------------------------

    /// Remove hit points; collapses the building at zero.
    pub fn take_damage(&mut self, amount: f32) {
        self.hp = (self.hp - amount.max(0.0)).max(0.0);
        if self.hp <= 0.0 {
            self.collapsed = true;
        }
    }

    /// Reset collapse risk and restore full hit points.
    pub fn repair(&mut self) {
        if self.collapsed {
            return;
        }
        self.collapse_risk = 0.0;
        self.hp = self.kind.max_hp;
    }

    // -------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------

    /// Advance this building by `dt` seconds.
    pub fn update(&mut self, dt: f32) -> BuildingTick {
        let dt = dt.max(0.0);
        let mut tick = BuildingTick::default();
        if self.collapsed {
            return tick;
        }

        for state in &mut self.slots {
            state.timer = (state.timer - dt).max(0.0);
        }
        self.tax_cooldown = (self.tax_cooldown - dt).max(0.0);
        self.tower_cooldown = (self.tower_cooldown - dt).max(0.0);

        self.decay_coverage(dt);
        if self.is_staffed() {
            self.produce(dt);
        }
        self.consume(dt);
        self.refresh_storage_coverage();
        tick.evolution = self.evolve(dt);

        self.collapse_risk =
            self.kind.collapse_rate.mul_add(dt, self.collapse_risk).clamp(0.0, MAX_COLLAPSE_RISK);
        if self.collapse_risk >= MAX_COLLAPSE_RISK || self.hp <= 0.0 {
            self.collapsed = true;
            tick.collapsed = true;
        }
        tick
    }

    fn decay_coverage(&mut self, dt: f32) {
        let Some(house) = self.kind.house.as_ref() else {
            return;
        };
        let loss = house.decay_rate * dt;
        for (kind, level) in &mut self.coverage {
            if kind.is_static_sourced() || house.is_storage_sourced(*kind) {
                continue;
            }
            *level = (*level - loss).clamp(0.0, MAX_COVERAGE);
        }
    }

    fn produce(&mut self, dt: f32) {
        let kind = Arc::clone(&self.kind);
        let Some(goods) = kind.goods.as_ref() else {
            return;
        };
        for line in &goods.produces {
            let room = (self.storage_capacity(line.good) - self.stored(line.good)).max(0.0);
            let mut amount = (line.rate * dt).min(room);
            for (input, ratio) in &line.inputs {
                if *ratio > 0.0 {
                    amount = amount.min(self.stored(*input) / ratio);
                }
            }
            if amount <= 0.0 {
                continue;
            }
            for (input, ratio) in &line.inputs {
                self.set_stored(*input, self.stored(*input) - amount * ratio);
            }
            self.set_stored(line.good, self.stored(line.good) + amount);
        }
    }

    fn consume(&mut self, dt: f32) {
        let kind = Arc::clone(&self.kind);
        let (Some(house), Some(evolution)) = (kind.house.as_ref(), self.evolution) else {
            return;
        };
        let Some(level) = house.levels.get(evolution.level) else {
            return;
        };
        #[allow(clippy::cast_precision_loss)]
        let occupants = self.occupants() as f32;
        for (good, rate) in &level.consumption {
            let eaten = (rate * occupants * dt).min(self.stored(*good));
            if eaten > 0.0 {
                self.set_stored(*good, self.stored(*good) - eaten);
            }
        }
    }

    fn refresh_storage_coverage(&mut self) {
        let kind = Arc::clone(&self.kind);
        let Some(house) = kind.house.as_ref() else {
            return;
        };
        for good in house.stocked_goods() {
            // Capacity follows occupants, so a shrinking household spills.
            self.set_stored(good, self.stored(good));
        }
        for (good, coverage) in &house.goods_coverage {
            let level = self
                .fill_ratio(*good)
                .map_or(0.0, |ratio| ratio * MAX_COVERAGE);
            self.restore_coverage(*coverage, level);
        }
    }

    fn requirements_met(&self, level: &HouseLevel) -> bool {
        level
            .requirements
            .iter()
            .all(|(kind, req)| self.coverage(*kind) / MAX_COVERAGE >= *req)
    }

    /// Smallest normalised margin above requirement, scaled so that
    /// reaching the upgrade threshold counts as full surplus.
    fn surplus(&self, level: &HouseLevel) -> f32 {
        level
            .requirements
            .iter()
            .map(|(kind, req)| {
                let span = level.upgrade_threshold - req;
                if span <= f32::EPSILON {
                    return 1.0;
                }
                ((self.coverage(*kind) / MAX_COVERAGE - req) / span).clamp(0.0, 1.0)
            })
            .fold(1.0, f32::min)
    }

    fn evolve(&mut self, dt: f32) -> Option<EvolutionChange> {
        let kind = Arc::clone(&self.kind);
        let house = kind.house.as_ref()?;
        let mut evolution = self.evolution?;
        let current = house.levels.get(evolution.level)?;

        if self.requirements_met(current) {
            let surplus = self.surplus(current);
            evolution.progress += house.evolution_rate * surplus * dt;
        } else {
            evolution.progress -= house.devolution_rate * dt;
        }
        evolution.progress = evolution.progress.clamp(0.0, 1.0);

        let mut change = None;
        if evolution.progress >= 1.0 {
            let next_index = evolution.level.saturating_add(1);
            if let Some(next) = house.levels.get(next_index) {
                if self.requirements_met(next) {
                    change = Some(EvolutionChange::Upgraded {
                        from: evolution.level,
                        to: next_index,
                    });
                    evolution.level = next_index;
                    evolution.progress = PROGRESS_AFTER_TRANSITION;
                }
            }
        } else if evolution.progress <= 0.0 && evolution.level > house.min_level {
            let prev_index = evolution.level.saturating_sub(1);
            change = Some(EvolutionChange::Downgraded {
                from: evolution.level,
                to: prev_index,
            });
            evolution.level = prev_index;
            evolution.progress = PROGRESS_AFTER_TRANSITION;
        }

        self.evolution = Some(evolution);
        change
    }
}

/// Convert a non-negative float count to `u32`, saturating.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_count(value: f32) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= u32::MAX as f32 {
        u32::MAX
    } else {
        value as u32
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;

    fn make(type_id: &str) -> Building {
        let catalog = default_catalog().unwrap();
        let kind = Arc::clone(catalog.get(type_id).unwrap());
        Building::new(BuildingId::new(1), TilePos::new(2, 3), kind)
    }

    fn water(house: &mut Building, level: f32) {
        house.add_coverage(CoverageKind::Water, level);
    }

    #[test]
    fn coverage_is_clamped() {
        let mut house = make("house");
        house.add_coverage(CoverageKind::Religion, 250.0);
        assert!((house.coverage(CoverageKind::Religion) - 100.0).abs() < f32::EPSILON);
        house.add_coverage(CoverageKind::Religion, -400.0);
        assert!(house.coverage(CoverageKind::Religion).abs() < f32::EPSILON);
        house.receive_coverage(CoverageKind::Religion);
        house.update(1000.0);
        assert!(house.coverage(CoverageKind::Religion).abs() < f32::EPSILON);
    }

    #[test]
    fn non_houses_ignore_coverage() {
        let mut farm = make("farm");
        farm.receive_coverage(CoverageKind::Water);
        assert!(farm.coverage(CoverageKind::Water).abs() < f32::EPSILON);
        assert_eq!(farm.occupants(), 0);
    }

    #[test]
    fn static_kinds_do_not_decay() {
        let mut house = make("house");
        water(&mut house, 60.0);
        house.receive_coverage(CoverageKind::Religion);
        house.update(2.0);
        assert!((house.coverage(CoverageKind::Water) - 60.0).abs() < 1e-4);
        assert!((house.coverage(CoverageKind::Religion) - 90.0).abs() < 1e-4);
        house.reset_static_coverage();
        assert!(house.coverage(CoverageKind::Water).abs() < f32::EPSILON);
    }

    #[test]
    fn occupants_follow_water() {
        let mut house = make("house");
        assert_eq!(house.occupants(), 0);
        water(&mut house, 10.0);
        // capacity 5 at the first level, ceil(5 * 0.1) = 1
        assert_eq!(house.occupants(), 1);
        water(&mut house, 90.0);
        assert_eq!(house.occupants(), 5);
    }

    #[test]
    fn tax_respects_cooldown() {
        let mut house = make("house");
        water(&mut house, 100.0);
        assert!(house.pay_tax() > 0);
        assert_eq!(house.pay_tax(), 0);
        house.update(10.0);
        assert!(house.pay_tax() > 0);
    }

    #[test]
    fn empty_house_pays_nothing_and_keeps_cooldown_clear() {
        let mut house = make("house");
        assert_eq!(house.pay_tax(), 0);
        assert!(house.tax_cooldown.abs() < f32::EPSILON);
    }

    #[test]
    fn non_house_pays_nothing() {
        let mut temple = make("temple");
        temple.workers = temple.kind.workers_needed;
        temple.update(10.0);
        assert_eq!(temple.pay_tax(), 0);
    }

    #[test]
    fn unstaffed_farm_never_produces() {
        let mut farm = make("farm");
        for _ in 0..100 {
            farm.update(1.0);
        }
        assert!(farm.stored(Good::Food).abs() < f32::EPSILON);
        assert_eq!(farm.slot_phase(0), SlotPhase::Unstaffed);
    }

    #[test]
    fn staffed_farm_fills_to_capacity() {
        let mut farm = make("farm");
        farm.workers = farm.kind.workers_needed;
        for _ in 0..100 {
            farm.update(1.0);
        }
        assert!((farm.stored(Good::Food) - 40.0).abs() < 1e-3);
        assert!(farm.is_full(Good::Food));
        assert_eq!(farm.slot_phase(0), SlotPhase::Ready);
    }

    #[test]
    fn pottery_is_limited_by_clay() {
        let mut pottery = make("pottery");
        pottery.workers = pottery.kind.workers_needed;
        assert!((pottery.receive_goods(Good::Clay, 2.0) - 2.0).abs() < f32::EPSILON);
        for _ in 0..20 {
            pottery.update(1.0);
        }
        assert!((pottery.stored(Good::Pottery) - 2.0).abs() < 1e-3);
        assert!(pottery.stored(Good::Clay).abs() < 1e-3);
    }

    #[test]
    fn goods_transfers_respect_capacity() {
        let mut market = make("market");
        assert!((market.receive_goods(Good::Food, 150.0) - 100.0).abs() < f32::EPSILON);
        assert!(market.receive_goods(Good::Food, 5.0).abs() < f32::EPSILON);
        assert!(market.receive_goods(Good::Clay, 5.0).abs() < f32::EPSILON);

        let cargo = market.take_goods_for_distributor(30.0);
        assert_eq!(cargo.len(), 1);
        assert!((market.stored(Good::Food) - 70.0).abs() < f32::EPSILON);

        let taken = market.take_goods_for_cart(Good::Food, 500.0).unwrap();
        assert!((taken.amount - 70.0).abs() < f32::EPSILON);
        assert!(market.take_goods_for_cart(Good::Food, 1.0).is_none());
        assert!(market.stored(Good::Food) >= 0.0);
    }

    #[test]
    fn house_larder_scales_with_occupants() {
        let mut house = make("house");
        assert!(house.receive_goods(Good::Food, 10.0).abs() < f32::EPSILON);
        water(&mut house, 100.0);
        // 5 occupants at 4 units each
        assert!((house.receive_goods(Good::Food, 50.0) - 20.0).abs() < f32::EPSILON);
        house.update(0.0);
        assert!((house.coverage(CoverageKind::Food) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn evolution_upgrades_when_next_level_is_met() {
        let mut house = make("house");
        water(&mut house, 100.0);
        let mut upgraded = false;
        for _ in 0..20 {
            if let Some(EvolutionChange::Upgraded { from, to }) = house.update(1.0).evolution {
                assert_eq!((from, to), (0, 1));
                upgraded = true;
                break;
            }
        }
        assert!(upgraded);
        let evo = house.evolution().unwrap();
        assert_eq!(evo.level, 1);
        assert!((evo.progress - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn evolution_stalls_at_one_without_next_requirements() {
        let mut house = make("house");
        for _ in 0..20 {
            assert!(house.update(1.0).evolution.is_none());
        }
        let evo = house.evolution().unwrap();
        assert_eq!(evo.level, 0);
        assert!((evo.progress - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn evolution_downgrades_when_requirements_lapse() {
        let mut house = make("house");
        house.restore_evolution(1, 0.5);
        let mut change = None;
        for _ in 0..20 {
            change = house.update(1.0).evolution;
            if change.is_some() {
                break;
            }
        }
        assert_eq!(change, Some(EvolutionChange::Downgraded { from: 1, to: 0 }));
        // Cannot fall below the minimum level.
        for _ in 0..40 {
            assert!(house.update(1.0).evolution.is_none() || house.evolution().unwrap().level == 0);
        }
        assert_eq!(house.evolution().unwrap().level, 0);
    }

    #[test]
    fn extra_staff_unlocks_walkers_up_to_upgrade_level() {
        let mut temple = make("temple");
        temple.workers = temple.kind.workers_needed;
        assert_eq!(temple.effective_walker_max(0), 3);
        temple.workers = temple.workers.saturating_add(2);
        assert_eq!(temple.effective_walker_max(0), 3);
        temple.upgrade_level = 2;
        assert_eq!(temple.effective_walker_max(0), 5);
        assert_eq!(temple.workers_wanted(), temple.kind.workers_needed + 2);
        assert_eq!(temple.effective_walker_max(7), 0);
    }

    #[test]
    fn slot_phases() {
        let mut temple = make("temple");
        assert_eq!(temple.slot_phase(0), SlotPhase::Unstaffed);
        temple.workers = temple.kind.workers_needed;
        assert_eq!(temple.slot_phase(0), SlotPhase::CoolingDown);
        temple.update(5.0);
        assert_eq!(temple.slot_phase(0), SlotPhase::Ready);
        for _ in 0..3 {
            temple.on_walker_spawned(0);
        }
        temple.update(10.0);
        assert_eq!(temple.slot_phase(0), SlotPhase::AtCapacity);
        temple.on_walker_returned(0);
        assert_eq!(temple.slot_phase(0), SlotPhase::Ready);

        let mut market = make("market");
        market.workers = market.kind.workers_needed;
        market.update(5.0);
        assert_eq!(market.slot_phase(0), SlotPhase::Starved);
    }

    #[test]
    fn collapsed_slot_never_ready() {
        let mut temple = make("temple");
        temple.workers = temple.kind.workers_needed;
        temple.update(5.0);
        assert_eq!(temple.slot_phase(0), SlotPhase::Ready);
        temple.take_damage(1000.0);
        assert_eq!(temple.slot_phase(0), SlotPhase::Collapsed);
    }

    #[test]
    fn damage_collapses_and_repair_restores() {
        let mut wall = make("wall");
        wall.take_damage(100.0);
        wall.repair();
        assert!((wall.hp - 300.0).abs() < f32::EPSILON);
        wall.take_damage(1000.0);
        assert!(wall.collapsed);
        assert!(wall.hp.abs() < f32::EPSILON);
    }

    #[test]
    fn collapse_risk_accumulates() {
        let mut temple = make("temple");
        let tick = temple.update(2000.0);
        assert!(tick.collapsed);
        assert!(temple.collapsed);
        temple.repair();
        assert!(temple.collapsed);
    }

    #[test]
    fn bounding_box_distance() {
        let house = make("house"); // covers (2..=3, 3..=4)
        assert!(house.distance_to_bounds(Point::new(2.5, 3.5)).abs() < f32::EPSILON);
        assert!((house.distance_to_bounds(Point::new(5.5, 3.0)) - 2.5).abs() < 1e-5);
        assert!((house.distance_to_bounds(Point::new(4.0, 5.0)) - 2.0_f32.sqrt()).abs() < 1e-5);
        assert!(house.contains(TilePos::new(3, 4)));
        assert!(!house.contains(TilePos::new(4, 4)));
        assert_eq!(house.center_tile(), TilePos::new(3, 4));
        assert_eq!(house.manhattan_to(TilePos::new(5, 3)), 2);
    }
}
