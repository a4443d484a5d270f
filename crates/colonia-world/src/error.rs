//! Error types for the `colonia-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias.

use colonia_types::{Deposit, Terrain, TilePos};

/// Errors that can occur while editing the terrain field or validating the
/// building catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// A tile coordinate lies outside the grid.
    #[error("tile {0} is out of bounds")]
    OutOfBounds(TilePos),

    /// A tile that must be empty already holds a road, bridge or building.
    #[error("tile {0} is occupied")]
    Occupied(TilePos),

    /// A tile's terrain does not match what the footprint requires.
    #[error("tile {pos} has terrain {found:?}, expected {expected:?}")]
    TerrainMismatch {
        /// The offending tile.
        pos: TilePos,
        /// The terrain the footprint requires (`None` means bare ground).
        expected: Option<Terrain>,
        /// The terrain actually present.
        found: Option<Terrain>,
    },

    /// No footprint tile carries the deposit the building type requires.
    #[error("no {deposit:?} deposit under footprint at {origin}")]
    MissingDeposit {
        /// Footprint origin.
        origin: TilePos,
        /// The required deposit.
        deposit: Deposit,
    },

    /// No road touches the footprint edge.
    #[error("no road adjacent to footprint at {0}")]
    NoRoadAccess(TilePos),

    /// The tile does not hold a road or bridge.
    #[error("tile {0} is not a road")]
    NotARoad(TilePos),

    /// The grid dimensions are zero or too large to allocate.
    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// A building catalog entry failed validation.
    #[error("invalid building type '{type_id}': {reason}")]
    InvalidCatalog {
        /// The offending type id.
        type_id: String,
        /// What is wrong with it.
        reason: String,
    },
}
