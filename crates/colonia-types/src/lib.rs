//! Shared type definitions for the Colonia settlement simulation.
//!
//! This crate is the common vocabulary of the workspace. Every type that
//! crosses a crate boundary, or that the external renderer reads, lives
//! here. Types flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Non-owning handles for buildings and agents
//! - [`enums`] -- Terrain, deposits, coverage kinds, goods, walker roles
//! - [`geometry`] -- Tile coordinates, sub-tile points, facings
//! - [`cargo`] -- Goods carried by agents

pub mod cargo;
pub mod enums;
pub mod geometry;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use cargo::Cargo;
pub use enums::{AgentKind, CoverageKind, Deposit, Good, Terrain, WalkerRole};
pub use geometry::{Facing, Point, TilePos};
pub use ids::{AgentId, BuildingId};
