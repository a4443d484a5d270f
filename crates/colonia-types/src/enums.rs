//! Enumeration types for the Colonia simulation.
//!
//! Terrain and deposits describe the land; coverage kinds and goods
//! describe what buildings need and trade; walker roles describe what a
//! spawned agent does on its patrol.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Land
// ---------------------------------------------------------------------------

/// Terrain tag carried by a tile independently of what occupies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Terrain {
    /// Open water. Impassable; only bridges may be built on it.
    Water,
    /// Woodland. Passable, but blocks footprints that do not ask for it.
    Forest,
}

impl Terrain {
    /// Whether this terrain can never hold a road or building footprint and
    /// cannot be walked over.
    pub const fn is_impassable(self) -> bool {
        matches!(self, Self::Water)
    }
}

/// Resource deposit tag carried by a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Deposit {
    /// Fertile soil; farms need it.
    Fertility,
    /// Clay beds; clay pits need them.
    Clay,
    /// Iron ore pockets.
    IronOre,
}

// ---------------------------------------------------------------------------
// Services and goods
// ---------------------------------------------------------------------------

/// A service need tracked per house as a level in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum CoverageKind {
    /// Fresh water from wells and fountains.
    Water,
    /// Food, derived from how full the house larder is.
    Food,
    /// Household wares, derived from stocked pottery.
    Wares,
    /// Temple access.
    Religion,
    /// Theater access.
    Entertainment,
    /// Visits from the tax collector.
    Administration,
    /// Attractiveness of the neighbourhood.
    Desirability,
}

impl CoverageKind {
    /// Every coverage kind, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Water,
        Self::Food,
        Self::Wares,
        Self::Religion,
        Self::Entertainment,
        Self::Administration,
        Self::Desirability,
    ];

    /// Whether this kind is driven exclusively by static emitters.
    ///
    /// Static kinds are zeroed and re-accumulated every tick instead of
    /// decaying.
    pub const fn is_static_sourced(self) -> bool {
        matches!(self, Self::Water | Self::Desirability)
    }
}

/// A tradeable good held in building storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Good {
    /// Staple food grown on farms.
    Food,
    /// Raw clay dug from clay beds.
    Clay,
    /// Pottery fired from clay.
    Pottery,
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// What a walker spawned from a building slot does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum WalkerRole {
    /// Patrols and refreshes one coverage kind on nearby houses.
    Service {
        /// The coverage refreshed to maximum on every waypoint.
        coverage: CoverageKind,
    },
    /// Patrols with goods from the origin's storage and hands them out.
    Distributor,
    /// Patrols collecting tax; also refreshes administration coverage.
    TaxCollector,
    /// Patrols resetting collapse risk and repairing every nearby building.
    Engineer,
    /// Goal-directed delivery of one good to another building.
    Cart,
}

impl WalkerRole {
    /// Whether this role moves goods and therefore needs stock to spawn.
    pub const fn moves_goods(self) -> bool {
        matches!(self, Self::Distributor | Self::Cart)
    }
}

/// Coarse agent category, used by observers that only need to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AgentKind {
    /// Patrolling service or distribution walker.
    Walker,
    /// Goods cart.
    Cart,
    /// Hostile raider.
    Enemy,
    /// Tower projectile.
    Projectile,
}
