//! Settlement orchestration, agents and the tick loop for the Colonia
//! simulation.
//!
//! This crate owns everything that moves: the per-tick orchestration of
//! buildings, the agent scheduler, the treasury, enemy waves and tower
//! fire, saves, and the paced async runner.
//!
//! # Modules
//!
//! - [`agents`] -- [`Agent`] variants (walkers, carts, enemies,
//!   projectiles) and their update contract.
//! - [`clock`] -- Tick counter and elapsed simulated time.
//! - [`config`] -- Configuration loading from `colonia-config.yaml` into
//!   strongly-typed structs.
//! - [`control`] -- [`RunControl`]: stop flag, pacing and tick bound.
//! - [`defense`] -- Tower targeting.
//! - [`economy`] -- Treasury, population and the labour market.
//! - [`persistence`] -- JSON saves.
//! - [`runner`] -- The paced async loop around [`Simulation::tick`].
//! - [`scheduler`] -- [`AgentScheduler`], owner of every live agent.
//! - [`settlement`] -- [`Settlement`]: placement and the orchestration
//!   pass.
//! - [`simulation`] -- The [`Simulation`] facade tying it all together.
//! - [`waves`] -- Enemy wave countdown and spawn sites.
//!
//! [`Agent`]: agents::Agent
//! [`AgentScheduler`]: scheduler::AgentScheduler
//! [`RunControl`]: control::RunControl
//! [`Settlement`]: settlement::Settlement
//! [`Simulation`]: simulation::Simulation
//! [`Simulation::tick`]: simulation::Simulation::tick

pub mod agents;
pub mod clock;
pub mod config;
pub mod control;
pub mod defense;
pub mod economy;
pub mod persistence;
pub mod runner;
pub mod scheduler;
pub mod settlement;
pub mod simulation;
pub mod waves;

pub use clock::{ClockError, SimClock};
pub use config::{ConfigError, SimulationConfig};
pub use control::{RunControl, RunEndReason};
pub use economy::Economy;
pub use persistence::{PersistenceError, SaveGame};
pub use runner::{
    NoOpCallback, RunnerError, SimulationResult, TickCallback, log_simulation_end, run_simulation,
};
pub use scheduler::AgentScheduler;
pub use settlement::{PlacementError, RemovedTile, Settlement};
pub use simulation::{Simulation, SimulationError, TickSummary};
