//! Terrain, roads and buildings for the Colonia settlement simulation.
//!
//! This crate models everything that stands still: the tile grid with its
//! terrain and deposits, the road network derived from it, the catalog of
//! building types and the per-building state machine.
//!
//! # Modules
//!
//! - [`building`] -- [`Building`] runtime state: coverage, evolution, goods,
//!   tax, staffing, walker slots, hit points and collapse.
//! - [`catalog`] -- Strongly-typed [`BuildingType`] configuration and the
//!   built-in catalog.
//! - [`error`] -- Error types for grid edits and catalog validation.
//! - [`generation`] -- Declarative terrain and deposit generation.
//! - [`road`] -- [`RoadGraph`] view: connectivity, random patrol walks and
//!   shortest paths.
//! - [`terrain`] -- [`TerrainField`], the tile grid and single source of
//!   truth for occupancy.
//!
//! [`Building`]: building::Building
//! [`BuildingType`]: catalog::BuildingType
//! [`RoadGraph`]: road::RoadGraph
//! [`TerrainField`]: terrain::TerrainField

pub mod building;
pub mod catalog;
pub mod error;
pub mod generation;
pub mod road;
pub mod terrain;

// Re-export primary types at crate root.
pub use building::{Building, BuildingTick, EvolutionChange, SlotPhase, WalkerSlot};
pub use catalog::{BuildingType, Catalog, default_catalog};
pub use error::WorldError;
pub use generation::{GenerationSpec, generate};
pub use road::RoadGraph;
pub use terrain::{Occupant, TerrainField, Tile};
