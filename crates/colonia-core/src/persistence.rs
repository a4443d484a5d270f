//! Save games.
//!
//! A [`SaveGame`] is a versioned JSON document holding everything needed to
//! rebuild a settlement: the grid size, sparse terrain and deposit cells,
//! road and bridge coordinates, full building records, the handle counter,
//! the treasury and the clock. Agents in flight are not saved; walker slots
//! come back with no active agents.
//!
//! Restoring is forgiving per entry. A building whose type id is unknown,
//! whose footprint leaves the grid or overlaps something already restored
//! is skipped with a warning, and the rest of the save still loads.
//! Population and employment are recomputed from the restored buildings,
//! never read from the file.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use colonia_types::{BuildingId, CoverageKind, Deposit, Facing, Good, Terrain, TilePos};
use colonia_world::building::Evolution;
use colonia_world::{Building, Catalog, Occupant, TerrainField, WorldError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clock::SimClock;
use crate::economy::Economy;
use crate::settlement::Settlement;

/// Format version written by this build.
pub const SAVE_VERSION: u32 = 1;

/// Errors raised while reading, writing or restoring a save.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// The document is not valid JSON for a save.
    #[error("save JSON error: {source}")]
    Json {
        /// The underlying serde error.
        #[from]
        source: serde_json::Error,
    },

    /// Reading or writing the file failed.
    #[error("save I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The save was written by an incompatible format version.
    #[error("unsupported save version {found} (expected {expected})")]
    VersionMismatch {
        /// Version this build reads.
        expected: u32,
        /// Version found in the document.
        found: u32,
    },

    /// The save's grid does not match the configured world.
    #[error("save grid is {found_width}x{found_height}, world is {expected_width}x{expected_height}")]
    GridMismatch {
        /// Configured width.
        expected_width: u32,
        /// Configured height.
        expected_height: u32,
        /// Width in the save.
        found_width: u32,
        /// Height in the save.
        found_height: u32,
    },

    /// The save describes a grid that cannot exist.
    #[error("invalid save grid: {source}")]
    Grid {
        /// The underlying grid error.
        #[from]
        source: WorldError,
    },
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A tile with a terrain tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainCell {
    /// Tile position.
    pub pos: TilePos,
    /// Its terrain.
    pub terrain: Terrain,
}

/// A tile with a resource deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositCell {
    /// Tile position.
    pub pos: TilePos,
    /// Its deposit.
    pub deposit: Deposit,
}

/// Saved state of one building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingRecord {
    /// Handle.
    pub id: BuildingId,
    /// Catalog type id.
    pub type_id: String,
    /// Top-left footprint tile.
    pub origin: TilePos,
    /// Door tile.
    pub door: Option<TilePos>,
    /// Road access tile.
    pub road_access: Option<TilePos>,
    /// Side facing the road.
    pub facing: Facing,
    /// Manual upgrade level.
    pub upgrade_level: u32,
    /// Per-slot spawn timers.
    pub slot_timers: Vec<f32>,
    /// Coverage levels, houses only.
    #[serde(default)]
    pub coverage: BTreeMap<CoverageKind, f32>,
    /// Evolution state, houses only.
    #[serde(default)]
    pub evolution: Option<Evolution>,
    /// Stored goods.
    #[serde(default)]
    pub storage: BTreeMap<Good, f32>,
    /// Hit points.
    pub hp: f32,
    /// Collapse risk.
    pub collapse_risk: f32,
    /// Seconds until the house can be taxed again.
    pub tax_cooldown: f32,
}

impl BuildingRecord {
    /// Capture a building.
    pub fn capture(building: &Building) -> Self {
        Self {
            id: building.id,
            type_id: building.kind.id.clone(),
            origin: building.origin,
            door: building.door,
            road_access: building.road_access,
            facing: building.facing,
            upgrade_level: building.upgrade_level,
            slot_timers: building.slots.iter().map(|s| s.timer).collect(),
            coverage: building.coverage_levels().clone(),
            evolution: building.evolution(),
            storage: building.storage().clone(),
            hp: building.hp,
            collapse_risk: building.collapse_risk,
            tax_cooldown: building.tax_cooldown,
        }
    }

    /// Rebuild the building against `catalog`. Returns `None` when the type
    /// id is unknown.
    pub fn rebuild(&self, catalog: &Catalog) -> Option<Building> {
        let kind = catalog.get(&self.type_id)?;
        let mut building = Building::new(self.id, self.origin, Arc::clone(kind));
        building.door = self.door;
        building.road_access = self.road_access;
        building.facing = self.facing;
        building.upgrade_level = self.upgrade_level.min(kind.max_upgrade_level);
        for (slot, timer) in building.slots.iter_mut().zip(&self.slot_timers) {
            slot.timer = timer.max(0.0);
        }
        for (coverage, level) in &self.coverage {
            building.restore_coverage(*coverage, *level);
        }
        if let Some(evolution) = self.evolution {
            building.restore_evolution(evolution.level, evolution.progress);
        }
        for (good, amount) in &self.storage {
            building.restore_storage(*good, *amount);
        }
        building.hp = self.hp.clamp(0.0, kind.max_hp);
        building.collapse_risk = self.collapse_risk.clamp(0.0, 100.0);
        building.tax_cooldown = self.tax_cooldown.max(0.0);
        Some(building)
    }
}

/// A complete save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    /// Format version.
    pub version: u32,
    /// When the save was taken.
    pub saved_at: DateTime<Utc>,
    /// Grid width.
    pub width: u32,
    /// Grid height.
    pub height: u32,
    /// Tiles carrying a terrain tag.
    pub terrain: Vec<TerrainCell>,
    /// Tiles carrying a deposit.
    pub deposits: Vec<DepositCell>,
    /// Road tiles on dry land.
    pub roads: Vec<TilePos>,
    /// Road tiles over water.
    pub bridges: Vec<TilePos>,
    /// Every standing building, by handle.
    pub buildings: Vec<BuildingRecord>,
    /// Handle the next placed building receives.
    pub next_building_id: BuildingId,
    /// Treasury.
    pub money: i64,
    /// Ticks completed.
    pub ticks: u64,
    /// Simulated seconds elapsed.
    pub elapsed_seconds: f64,
}

/// Everything rebuilt from a save.
#[derive(Debug)]
pub struct Restored {
    /// Grid, roads and buildings.
    pub settlement: Settlement,
    /// Treasury with population and employment recomputed.
    pub economy: Economy,
    /// Clock at the saved tick.
    pub clock: SimClock,
    /// Entries that could not be restored.
    pub skipped: usize,
}

impl SaveGame {
    /// Capture the current state.
    pub fn capture(settlement: &Settlement, economy: &Economy, clock: &SimClock) -> Self {
        let terrain = settlement.terrain();
        let mut terrain_cells = Vec::new();
        let mut deposit_cells = Vec::new();
        for (pos, tile) in terrain.tiles() {
            if let Some(kind) = tile.terrain {
                terrain_cells.push(TerrainCell { pos, terrain: kind });
            }
            if let Some(deposit) = tile.deposit {
                deposit_cells.push(DepositCell { pos, deposit });
            }
        }
        // rubble is not saved
        let buildings = settlement
            .buildings()
            .values()
            .filter(|b| !b.collapsed)
            .map(BuildingRecord::capture)
            .collect();

        Self {
            version: SAVE_VERSION,
            saved_at: Utc::now(),
            width: terrain.width(),
            height: terrain.height(),
            terrain: terrain_cells,
            deposits: deposit_cells,
            roads: terrain
                .tiles()
                .filter(|(_, tile)| tile.occupant == Some(Occupant::Road))
                .map(|(pos, _)| pos)
                .collect(),
            bridges: terrain.bridge_tiles().collect(),
            buildings,
            next_building_id: settlement.next_id(),
            money: economy.money,
            ticks: clock.tick(),
            elapsed_seconds: clock.elapsed(),
        }
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a JSON document and check its version.
    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        let save: Self = serde_json::from_str(json)?;
        if save.version != SAVE_VERSION {
            return Err(PersistenceError::VersionMismatch {
                expected: SAVE_VERSION,
                found: save.version,
            });
        }
        Ok(save)
    }

    /// Write to `path`.
    pub fn write(&self, path: &Path) -> Result<(), PersistenceError> {
        std::fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), buildings = self.buildings.len(), "game saved");
        Ok(())
    }

    /// Read from `path`.
    pub fn read(path: &Path) -> Result<Self, PersistenceError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Fail unless the save's grid is `width` x `height`.
    pub const fn check_grid(&self, width: u32, height: u32) -> Result<(), PersistenceError> {
        if self.width == width && self.height == height {
            Ok(())
        } else {
            Err(PersistenceError::GridMismatch {
                expected_width: width,
                expected_height: height,
                found_width: self.width,
                found_height: self.height,
            })
        }
    }

    /// Rebuild a settlement, economy and clock against `catalog`.
    pub fn restore(&self, catalog: Catalog) -> Result<Restored, PersistenceError> {
        let mut skipped = 0_usize;
        let mut field = TerrainField::new(self.width, self.height)?;
        for cell in &self.terrain {
            if !field.set_terrain(cell.pos, Some(cell.terrain)) {
                warn!(pos = %cell.pos, "terrain cell outside the grid skipped");
                skipped = skipped.saturating_add(1);
            }
        }
        for cell in &self.deposits {
            if !field.set_deposit(cell.pos, Some(cell.deposit)) {
                warn!(pos = %cell.pos, "deposit cell outside the grid skipped");
                skipped = skipped.saturating_add(1);
            }
        }
        for pos in &self.roads {
            if let Err(err) = field.add_road(*pos) {
                warn!(%pos, error = %err, "road skipped");
                skipped = skipped.saturating_add(1);
            }
        }
        for pos in &self.bridges {
            if let Err(err) = field.add_bridge(*pos) {
                warn!(%pos, error = %err, "bridge skipped");
                skipped = skipped.saturating_add(1);
            }
        }

        let mut settlement = Settlement::new(field, catalog);
        for record in &self.buildings {
            let Some(building) = record.rebuild(settlement.catalog()) else {
                warn!(building_id = %record.id, type_id = %record.type_id, "unknown building type skipped");
                skipped = skipped.saturating_add(1);
                continue;
            };
            if let Err(err) = settlement.insert_restored(building) {
                warn!(building_id = %record.id, error = %err, "building skipped");
                skipped = skipped.saturating_add(1);
            }
        }
        settlement.reserve_ids_up_to(self.next_building_id);

        let mut economy = Economy::with_money(self.money);
        economy.update(settlement.buildings_mut());

        info!(
            buildings = settlement.buildings().len(),
            population = economy.population,
            skipped,
            "game restored"
        );
        Ok(Restored {
            settlement,
            economy,
            clock: SimClock::from_parts(self.ticks, self.elapsed_seconds),
            skipped,
        })
    }
}
