//! Building type catalog: the immutable configuration every placed building
//! shares by reference.
//!
//! A [`BuildingType`] is a strongly-typed record whose optional profiles
//! decide what category a building falls into:
//!
//! - [`HouseProfile`] -- the building is a house: it tracks coverage, evolves
//!   between levels, houses occupants and pays tax.
//! - [`StaticCoverage`] -- the building emits coverage to nearby houses
//!   every tick by proximity alone.
//! - [`GoodsProfile`] -- the building produces, stores or receives goods.
//! - [`WalkerSlotTemplate`] -- each entry is an agent-spawn budget.
//! - [`TowerProfile`] -- the building shoots at enemies in range.
//!
//! Types are validated when loaded; an invalid entry rejects the whole
//! catalog rather than surfacing as odd behaviour mid-simulation.

use std::collections::BTreeMap;
use std::sync::Arc;

use colonia_types::{CoverageKind, Deposit, Good, Terrain, WalkerRole};
use serde::{Deserialize, Serialize};

use crate::error::WorldError;

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// One evolution level of a house.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseLevel {
    /// Display name of the level.
    pub name: String,
    /// Minimum normalised coverage (`0.0..=1.0`) per kind to hold this level.
    #[serde(default)]
    pub requirements: BTreeMap<CoverageKind, f32>,
    /// Normalised coverage at which surplus saturates. Must exceed every
    /// requirement of the level.
    #[serde(default = "default_upgrade_threshold")]
    pub upgrade_threshold: f32,
    /// Maximum occupants at this level.
    pub capacity: u32,
    /// Tax paid per occupant per collection.
    #[serde(default)]
    pub tax_multiplier: f32,
    /// Goods eaten per occupant per second.
    #[serde(default)]
    pub consumption: BTreeMap<Good, f32>,
}

/// Everything that makes a building a house.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseProfile {
    /// Levels from lowest to highest.
    pub levels: Vec<HouseLevel>,
    /// Lowest level a house can devolve to; new houses start here.
    #[serde(default)]
    pub min_level: usize,
    /// Coverage lost per second for kinds that decay.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f32,
    /// Evolution progress gained per second at full surplus.
    #[serde(default = "default_evolution_rate")]
    pub evolution_rate: f32,
    /// Evolution progress lost per second while requirements are unmet.
    #[serde(default = "default_devolution_rate")]
    pub devolution_rate: f32,
    /// Seconds between two successful tax collections.
    #[serde(default = "default_tax_cooldown")]
    pub tax_cooldown: f32,
    /// Storage granted per good for every occupant.
    #[serde(default = "default_storage_per_occupant")]
    pub storage_per_occupant: f32,
    /// Coverage kinds recomputed from how full the larder is for a good.
    #[serde(default = "default_goods_coverage")]
    pub goods_coverage: BTreeMap<Good, CoverageKind>,
}

impl HouseProfile {
    /// Every coverage kind the house tracks: all level requirements plus
    /// the storage-driven kinds.
    pub fn tracked_kinds(&self) -> Vec<CoverageKind> {
        let mut kinds: Vec<CoverageKind> = self
            .levels
            .iter()
            .flat_map(|l| l.requirements.keys().copied())
            .chain(self.goods_coverage.values().copied())
            .collect();
        kinds.sort_unstable();
        kinds.dedup();
        kinds
    }

    /// Whether a coverage kind is recomputed from storage fullness.
    pub fn is_storage_sourced(&self, kind: CoverageKind) -> bool {
        self.goods_coverage.values().any(|k| *k == kind)
    }

    /// Goods the house keeps in its larder.
    pub fn stocked_goods(&self) -> Vec<Good> {
        let mut goods: Vec<Good> = self
            .goods_coverage
            .keys()
            .copied()
            .chain(self.levels.iter().flat_map(|l| l.consumption.keys().copied()))
            .collect();
        goods.sort_unstable();
        goods.dedup();
        goods
    }

    /// Index of the highest level.
    pub fn max_level(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }
}

/// Proximity-based coverage emitted every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticCoverage {
    /// The kind emitted.
    pub kind: CoverageKind,
    /// Amount added per Manhattan distance band; index 0 is distance 0.
    /// Houses beyond the last band receive nothing.
    pub falloff: Vec<f32>,
}

impl StaticCoverage {
    /// Amount granted at a given Manhattan distance.
    pub fn amount_at(&self, distance: u32) -> Option<f32> {
        usize::try_from(distance)
            .ok()
            .and_then(|d| self.falloff.get(d))
            .copied()
    }
}

/// One production line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Production {
    /// The good produced.
    pub good: Good,
    /// Units produced per second while staffed.
    pub rate: f32,
    /// Units of each input consumed per unit produced.
    #[serde(default)]
    pub inputs: BTreeMap<Good, f32>,
}

/// Goods handling of a non-house building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodsProfile {
    /// Production lines.
    #[serde(default)]
    pub produces: Vec<Production>,
    /// Goods accepted from carts.
    #[serde(default)]
    pub receives: Vec<Good>,
    /// Storage capacity per good.
    pub capacity: f32,
}

impl GoodsProfile {
    /// Whether the building stores `good` at all.
    pub fn handles(&self, good: Good) -> bool {
        self.receives.contains(&good)
            || self
                .produces
                .iter()
                .any(|p| p.good == good || p.inputs.contains_key(&good))
    }
}

/// Template for one walker slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkerSlotTemplate {
    /// What the spawned agent does.
    pub role: WalkerRole,
    /// Good moved by a cart slot.
    #[serde(default)]
    pub good: Option<Good>,
    /// Seconds between spawns.
    #[serde(default = "default_spawn_interval")]
    pub spawn_interval: f32,
    /// Seconds before the first spawn.
    #[serde(default = "default_initial_delay")]
    pub initial_delay: f32,
    /// Concurrent agents before upgrades and extra staff.
    #[serde(default = "default_max_walkers")]
    pub max_walkers: u32,
    /// Outbound patrol steps.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Units loaded per good when the agent leaves.
    #[serde(default = "default_load")]
    pub load: f32,
}

/// Defensive tower parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerProfile {
    /// Reach in tiles, measured from the tower centre.
    pub range: f32,
    /// Hit points removed per projectile.
    pub damage: f32,
    /// Seconds between shots.
    pub cooldown: f32,
    /// Projectile speed in tiles per second.
    pub projectile_speed: f32,
}

// ---------------------------------------------------------------------------
// BuildingType
// ---------------------------------------------------------------------------

/// Immutable building configuration, shared across instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingType {
    /// Stable identifier, used in saves.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Footprint width in tiles.
    pub width: u32,
    /// Footprint height in tiles.
    pub height: u32,
    /// Placement cost.
    pub cost: u32,
    /// Whether placement needs a road touching the footprint.
    #[serde(default = "default_true")]
    pub requires_road: bool,
    /// Terrain every footprint tile must carry (bare ground when absent).
    #[serde(default)]
    pub required_terrain: Option<Terrain>,
    /// Deposit at least one footprint tile must carry.
    #[serde(default)]
    pub required_deposit: Option<Deposit>,
    /// Workers needed to count as staffed.
    #[serde(default)]
    pub workers_needed: u32,
    /// Hit points when intact.
    #[serde(default = "default_max_hp")]
    pub max_hp: f32,
    /// Collapse risk gained per second.
    #[serde(default)]
    pub collapse_rate: f32,
    /// Walls block enemies and are their target of last resort.
    #[serde(default)]
    pub is_wall: bool,
    /// Highest manual upgrade level.
    #[serde(default)]
    pub max_upgrade_level: u32,
    /// House behaviour.
    #[serde(default)]
    pub house: Option<HouseProfile>,
    /// Proximity coverage emitter.
    #[serde(default)]
    pub static_coverage: Option<StaticCoverage>,
    /// Goods behaviour.
    #[serde(default)]
    pub goods: Option<GoodsProfile>,
    /// Agent-spawn budgets.
    #[serde(default)]
    pub walker_slots: Vec<WalkerSlotTemplate>,
    /// Tower behaviour.
    #[serde(default)]
    pub tower: Option<TowerProfile>,
}

impl BuildingType {
    /// Whether instances are houses.
    pub const fn is_house(&self) -> bool {
        self.house.is_some()
    }

    /// Whether a cart slot of this type ships `good`.
    pub fn ships(&self, good: Good) -> bool {
        self.walker_slots
            .iter()
            .any(|s| s.role == WalkerRole::Cart && s.good == Some(good))
    }

    /// Whether carts may deliver `good` here.
    pub fn receives(&self, good: Good) -> bool {
        self.goods.as_ref().is_some_and(|g| g.receives.contains(&good))
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidCatalog`] describing the first problem.
    pub fn validate(&self) -> Result<(), WorldError> {
        let fail = |reason: &str| {
            Err(WorldError::InvalidCatalog {
                type_id: self.id.clone(),
                reason: reason.to_owned(),
            })
        };

        if self.id.is_empty() {
            return fail("empty id");
        }
        if self.width == 0 || self.height == 0 {
            return fail("footprint must be at least 1x1");
        }
        if self.max_hp <= 0.0 {
            return fail("max_hp must be positive");
        }
        if self.collapse_rate < 0.0 {
            return fail("collapse_rate must not be negative");
        }
        if self.required_terrain.is_some_and(Terrain::is_impassable) {
            return fail("buildings cannot stand on impassable terrain");
        }

        if let Some(house) = &self.house {
            if house.levels.is_empty() {
                return fail("house needs at least one level");
            }
            if house.min_level > house.max_level() {
                return fail("min_level beyond last level");
            }
            if !self.walker_slots.is_empty() {
                return fail("houses cannot spawn walkers");
            }
            for level in &house.levels {
                for req in level.requirements.values() {
                    if !(0.0..=1.0).contains(req) {
                        return fail("requirements must be within 0..=1");
                    }
                    if *req >= level.upgrade_threshold {
                        return fail("upgrade_threshold must exceed every requirement");
                    }
                }
                if level.upgrade_threshold > 1.0 {
                    return fail("upgrade_threshold must be at most 1");
                }
            }
        }

        if let Some(emitter) = &self.static_coverage {
            if emitter.falloff.is_empty() {
                return fail("static coverage needs at least one band");
            }
        }

        if let Some(goods) = &self.goods {
            if goods.capacity <= 0.0 {
                return fail("goods capacity must be positive");
            }
        }

        for slot in &self.walker_slots {
            if slot.spawn_interval <= 0.0 {
                return fail("spawn_interval must be positive");
            }
            match slot.role {
                WalkerRole::Cart => {
                    let Some(good) = slot.good else {
                        return fail("cart slot needs a good");
                    };
                    let Some(goods) = &self.goods else {
                        return fail("cart slot needs a goods profile");
                    };
                    if !goods.handles(good) {
                        return fail("cart slot ships a good the building never stores");
                    }
                    if slot.load <= 0.0 || slot.load > goods.capacity {
                        return fail("cart load must be positive and fit in storage");
                    }
                }
                WalkerRole::Distributor => {
                    if self.goods.is_none() {
                        return fail("distributor slot needs a goods profile");
                    }
                }
                _ => {}
            }
        }

        if let Some(tower) = &self.tower {
            if tower.range <= 0.0 || tower.cooldown <= 0.0 || tower.projectile_speed <= 0.0 {
                return fail("tower range, cooldown and projectile speed must be positive");
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Validated set of building types keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    types: BTreeMap<String, Arc<BuildingType>>,
}

impl Catalog {
    /// Build a catalog from a list of types.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidCatalog`] if any entry is invalid or an
    /// id repeats.
    pub fn from_types(types: Vec<BuildingType>) -> Result<Self, WorldError> {
        let mut catalog = Self::default();
        for building_type in types {
            building_type.validate()?;
            let id = building_type.id.clone();
            if catalog.types.contains_key(&id) {
                return Err(WorldError::InvalidCatalog {
                    type_id: id,
                    reason: "duplicate id".to_owned(),
                });
            }
            catalog.types.insert(id, Arc::new(building_type));
        }
        Ok(catalog)
    }

    /// Look up a type by id.
    pub fn get(&self, id: &str) -> Option<&Arc<BuildingType>> {
        self.types.get(id)
    }

    /// All types in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<BuildingType>> {
        self.types.values()
    }

    /// Number of types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Built-in catalog
// ---------------------------------------------------------------------------

fn level(
    name: &str,
    requirements: &[(CoverageKind, f32)],
    upgrade_threshold: f32,
    capacity: u32,
    tax_multiplier: f32,
    consumption: &[(Good, f32)],
) -> HouseLevel {
    HouseLevel {
        name: name.to_owned(),
        requirements: requirements.iter().copied().collect(),
        upgrade_threshold,
        capacity,
        tax_multiplier,
        consumption: consumption.iter().copied().collect(),
    }
}

fn base(id: &str, name: &str, size: (u32, u32), cost: u32) -> BuildingType {
    BuildingType {
        id: id.to_owned(),
        name: name.to_owned(),
        width: size.0,
        height: size.1,
        cost,
        requires_road: true,
        required_terrain: None,
        required_deposit: None,
        workers_needed: 0,
        max_hp: default_max_hp(),
        collapse_rate: 0.0,
        is_wall: false,
        max_upgrade_level: 0,
        house: None,
        static_coverage: None,
        goods: None,
        walker_slots: Vec::new(),
        tower: None,
    }
}

fn slot(role: WalkerRole) -> WalkerSlotTemplate {
    WalkerSlotTemplate {
        role,
        good: None,
        spawn_interval: default_spawn_interval(),
        initial_delay: default_initial_delay(),
        max_walkers: default_max_walkers(),
        max_steps: default_max_steps(),
        load: default_load(),
    }
}

fn cart_slot(good: Good, load: f32) -> WalkerSlotTemplate {
    WalkerSlotTemplate {
        good: Some(good),
        max_walkers: 1,
        load,
        ..slot(WalkerRole::Cart)
    }
}

fn service(id: &str, name: &str, size: (u32, u32), cost: u32, role: WalkerRole) -> BuildingType {
    BuildingType {
        workers_needed: 3,
        collapse_rate: 0.1,
        max_upgrade_level: 2,
        walker_slots: vec![slot(role)],
        ..base(id, name, size, cost)
    }
}

/// The built-in building types.
#[allow(clippy::too_many_lines)] // One literal per type; splitting would scatter the table.
pub fn default_types() -> Vec<BuildingType> {
    use CoverageKind::{Administration, Desirability, Entertainment, Food, Religion, Wares, Water};

    let house = BuildingType {
        collapse_rate: 0.1,
        house: Some(HouseProfile {
            levels: vec![
                level("tent", &[], 0.5, 5, 0.5, &[(Good::Food, 0.02)]),
                level("shack", &[(Water, 0.3)], 0.8, 8, 1.0, &[(Good::Food, 0.02)]),
                level(
                    "cottage",
                    &[(Water, 0.3), (Food, 0.3)],
                    0.8,
                    12,
                    1.5,
                    &[(Good::Food, 0.03)],
                ),
                level(
                    "house",
                    &[(Water, 0.4), (Food, 0.4), (Religion, 0.3)],
                    0.8,
                    16,
                    2.0,
                    &[(Good::Food, 0.03), (Good::Pottery, 0.01)],
                ),
                level(
                    "villa",
                    &[
                        (Water, 0.5),
                        (Food, 0.5),
                        (Wares, 0.3),
                        (Religion, 0.4),
                        (Entertainment, 0.3),
                        (Administration, 0.3),
                        (Desirability, 0.4),
                    ],
                    0.9,
                    24,
                    3.0,
                    &[(Good::Food, 0.04), (Good::Pottery, 0.02)],
                ),
            ],
            min_level: 0,
            decay_rate: default_decay_rate(),
            evolution_rate: default_evolution_rate(),
            devolution_rate: default_devolution_rate(),
            tax_cooldown: default_tax_cooldown(),
            storage_per_occupant: default_storage_per_occupant(),
            goods_coverage: default_goods_coverage(),
        }),
        ..base("house", "House", (2, 2), 30)
    };

    let well = BuildingType {
        requires_road: false,
        static_coverage: Some(StaticCoverage {
            kind: Water,
            falloff: vec![50.0, 50.0, 35.0, 20.0],
        }),
        ..base("well", "Well", (1, 1), 50)
    };

    let fountain = BuildingType {
        static_coverage: Some(StaticCoverage {
            kind: Water,
            falloff: vec![100.0, 100.0, 90.0, 75.0, 60.0, 40.0, 20.0],
        }),
        ..base("fountain", "Fountain", (1, 1), 120)
    };

    let garden = BuildingType {
        requires_road: false,
        static_coverage: Some(StaticCoverage {
            kind: Desirability,
            falloff: vec![40.0, 40.0, 30.0, 20.0, 10.0],
        }),
        ..base("garden", "Garden", (1, 1), 20)
    };

    let farm = BuildingType {
        required_deposit: Some(Deposit::Fertility),
        workers_needed: 6,
        collapse_rate: 0.05,
        goods: Some(GoodsProfile {
            produces: vec![Production {
                good: Good::Food,
                rate: 1.0,
                inputs: BTreeMap::new(),
            }],
            receives: Vec::new(),
            capacity: 40.0,
        }),
        walker_slots: vec![cart_slot(Good::Food, 20.0)],
        ..base("farm", "Farm", (3, 3), 80)
    };

    let clay_pit = BuildingType {
        required_deposit: Some(Deposit::Clay),
        workers_needed: 4,
        collapse_rate: 0.1,
        goods: Some(GoodsProfile {
            produces: vec![Production {
                good: Good::Clay,
                rate: 0.8,
                inputs: BTreeMap::new(),
            }],
            receives: Vec::new(),
            capacity: 30.0,
        }),
        walker_slots: vec![cart_slot(Good::Clay, 15.0)],
        ..base("clay_pit", "Clay Pit", (2, 2), 60)
    };

    let pottery = BuildingType {
        workers_needed: 5,
        collapse_rate: 0.1,
        goods: Some(GoodsProfile {
            produces: vec![Production {
                good: Good::Pottery,
                rate: 0.5,
                inputs: [(Good::Clay, 1.0)].into_iter().collect(),
            }],
            receives: vec![Good::Clay],
            capacity: 30.0,
        }),
        walker_slots: vec![cart_slot(Good::Pottery, 10.0)],
        ..base("pottery", "Pottery Workshop", (2, 2), 90)
    };

    let market = BuildingType {
        workers_needed: 4,
        collapse_rate: 0.1,
        max_upgrade_level: 2,
        goods: Some(GoodsProfile {
            produces: Vec::new(),
            receives: vec![Good::Food, Good::Pottery],
            capacity: 100.0,
        }),
        walker_slots: vec![WalkerSlotTemplate {
            max_walkers: 2,
            load: 10.0,
            ..slot(WalkerRole::Distributor)
        }],
        ..base("market", "Market", (2, 2), 100)
    };

    let temple = service(
        "temple",
        "Temple",
        (3, 3),
        200,
        WalkerRole::Service { coverage: Religion },
    );
    let theater = service(
        "theater",
        "Theater",
        (2, 2),
        150,
        WalkerRole::Service {
            coverage: Entertainment,
        },
    );
    let forum = service("forum", "Forum", (2, 2), 120, WalkerRole::TaxCollector);
    let engineer_post = BuildingType {
        workers_needed: 2,
        collapse_rate: 0.0,
        ..service(
            "engineer_post",
            "Engineer's Post",
            (1, 1),
            40,
            WalkerRole::Engineer,
        )
    };

    let tower = BuildingType {
        workers_needed: 2,
        max_hp: 200.0,
        tower: Some(TowerProfile {
            range: 5.0,
            damage: 20.0,
            cooldown: 1.5,
            projectile_speed: 8.0,
        }),
        ..base("tower", "Tower", (1, 1), 150)
    };

    let wall = BuildingType {
        requires_road: false,
        is_wall: true,
        max_hp: 300.0,
        ..base("wall", "Wall", (1, 1), 10)
    };

    vec![
        house,
        well,
        fountain,
        garden,
        farm,
        clay_pit,
        pottery,
        market,
        temple,
        theater,
        forum,
        engineer_post,
        tower,
        wall,
    ]
}

/// The built-in catalog.
///
/// # Errors
///
/// Returns [`WorldError::InvalidCatalog`] only if the built-in table itself
/// is inconsistent.
pub fn default_catalog() -> Result<Catalog, WorldError> {
    Catalog::from_types(default_types())
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_true() -> bool {
    true
}

const fn default_max_hp() -> f32 {
    100.0
}

const fn default_upgrade_threshold() -> f32 {
    0.8
}

const fn default_decay_rate() -> f32 {
    5.0
}

const fn default_evolution_rate() -> f32 {
    0.1
}

const fn default_devolution_rate() -> f32 {
    0.05
}

const fn default_tax_cooldown() -> f32 {
    10.0
}

const fn default_storage_per_occupant() -> f32 {
    4.0
}

fn default_goods_coverage() -> BTreeMap<Good, CoverageKind> {
    [
        (Good::Food, CoverageKind::Food),
        (Good::Pottery, CoverageKind::Wares),
    ]
    .into_iter()
    .collect()
}

const fn default_spawn_interval() -> f32 {
    5.0
}

const fn default_initial_delay() -> f32 {
    2.0
}

const fn default_max_walkers() -> u32 {
    3
}

const fn default_max_steps() -> usize {
    15
}

const fn default_load() -> f32 {
    20.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn built_in_catalog_is_valid() {
        let catalog = default_catalog().unwrap();
        assert_eq!(catalog.len(), 14);
        let house = catalog.get("house").unwrap();
        assert!(house.is_house());
        assert_eq!((house.width, house.height, house.cost), (2, 2, 30));
        assert!(!catalog.get("well").unwrap().requires_road);
    }

    #[test]
    fn house_tracks_requirement_and_storage_kinds() {
        let catalog = default_catalog().unwrap();
        let profile = catalog.get("house").unwrap().house.clone().unwrap();
        let kinds = profile.tracked_kinds();
        assert_eq!(kinds.len(), CoverageKind::ALL.len());
        assert!(profile.is_storage_sourced(CoverageKind::Food));
        assert!(!profile.is_storage_sourced(CoverageKind::Religion));
        assert_eq!(profile.stocked_goods(), vec![Good::Food, Good::Pottery]);
    }

    #[test]
    fn ship_and_receive_sets() {
        let catalog = default_catalog().unwrap();
        let farm = catalog.get("farm").unwrap();
        let market = catalog.get("market").unwrap();
        let pottery = catalog.get("pottery").unwrap();
        assert!(farm.ships(Good::Food));
        assert!(!farm.receives(Good::Food));
        assert!(market.receives(Good::Food));
        assert!(pottery.receives(Good::Clay));
        assert!(pottery.ships(Good::Pottery));
    }

    #[test]
    fn falloff_lookup() {
        let emitter = StaticCoverage {
            kind: CoverageKind::Water,
            falloff: vec![50.0, 30.0],
        };
        assert_eq!(emitter.amount_at(1), Some(30.0));
        assert_eq!(emitter.amount_at(2), None);
    }

    #[test]
    fn cart_slot_without_good_is_rejected() {
        let mut farm = default_types()
            .into_iter()
            .find(|t| t.id == "farm")
            .unwrap();
        if let Some(slot) = farm.walker_slots.first_mut() {
            slot.good = None;
        }
        assert!(matches!(
            farm.validate(),
            Err(WorldError::InvalidCatalog { .. })
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut types = default_types();
        let copy = types.first().cloned().unwrap();
        types.push(copy);
        assert!(Catalog::from_types(types).is_err());
    }

    #[test]
    fn threshold_below_requirement_is_rejected() {
        let mut house = default_types().into_iter().next().unwrap();
        if let Some(profile) = house.house.as_mut() {
            if let Some(level) = profile.levels.get_mut(1) {
                level.upgrade_threshold = 0.2;
            }
        }
        assert!(house.validate().is_err());
    }

    #[test]
    fn type_parses_with_defaults() {
        let json = r#"{
            "id": "shrine", "name": "Shrine", "width": 1, "height": 1, "cost": 25,
            "walker_slots": [{"role": {"kind": "service", "coverage": "religion"}}]
        }"#;
        let parsed: BuildingType = serde_json::from_str(json).unwrap();
        assert!(parsed.requires_road);
        let slot = parsed.walker_slots.first().unwrap();
        assert_eq!(slot.max_walkers, 3);
        assert!(parsed.validate().is_ok());
    }
}
