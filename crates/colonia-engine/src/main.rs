//! Headless engine binary for the Colonia settlement simulation.
//!
//! Wires configuration, terrain generation, the starter layout (or a
//! restored save) and the paced runner together, then runs until the tick
//! bound is reached or Ctrl-C is pressed.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `colonia-config.yaml` (or `COLONIA_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Generate terrain and build the simulation
//! 4. Restore the save file if one exists, else lay out a starter town
//! 5. Install the Ctrl-C handler
//! 6. Run the simulation loop with autosave
//! 7. Write a final save and log the result

mod autosave;
mod error;
mod layout;

use std::path::PathBuf;
use std::sync::Arc;

use colonia_core::{RunControl, Simulation, SimulationConfig, runner};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::autosave::AutosaveCallback;
use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "colonia-config.yaml";

/// Environment variable overriding the configuration path.
const CONFIG_PATH_ENV: &str = "COLONIA_CONFIG";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::var(CONFIG_PATH_ENV)
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, from_file) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .try_init()
        .map_err(|e| EngineError::Logging {
            message: e.to_string(),
        })?;

    info!("colonia-engine starting");
    if from_file {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        world_name = config.world.name,
        seed = config.world.seed,
        width = config.world.width,
        height = config.world.height,
        tick_seconds = config.time.tick_seconds,
        tick_interval_ms = config.time.tick_interval_ms,
        "World configured"
    );

    // 3. Build the simulation.
    let save_path = config.persistence.save_path.clone();
    let autosave_every = config.persistence.autosave_every_ticks;
    let control = Arc::new(RunControl::new(
        config.time.tick_interval_ms,
        config.time.max_ticks,
    ));
    let mut sim = Simulation::new(config).map_err(EngineError::from)?;

    // 4. Restore or lay out.
    if save_path.exists() {
        let skipped = sim.restore_from(&save_path).map_err(EngineError::from)?;
        info!(
            path = %save_path.display(),
            tick = sim.clock().tick(),
            buildings = sim.settlement().buildings().len(),
            skipped,
            "Save restored"
        );
    } else {
        layout::lay_out(&mut sim);
    }

    // 5. Ctrl-C requests a clean stop.
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown signal received");
                    control.request_stop();
                }
                Err(e) => warn!(error = %e, "failed to listen for shutdown signal"),
            }
        });
    }

    // 6. Run the simulation.
    let mut callback = AutosaveCallback::new(save_path.clone(), autosave_every);
    let result = runner::run_simulation(&mut sim, &control, &mut callback)
        .await
        .map_err(EngineError::from)?;
    runner::log_simulation_end(&result);

    // 7. Final save.
    sim.save_to(&save_path).map_err(EngineError::from)?;
    info!(
        path = %save_path.display(),
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        autosaves = callback.saves(),
        "colonia-engine shutdown complete"
    );

    Ok(())
}

/// Load the configuration file, or defaults when it does not exist.
/// Returns whether the file was read.
fn load_config(path: &std::path::Path) -> Result<(SimulationConfig, bool), EngineError> {
    if path.exists() {
        Ok((SimulationConfig::from_file(path)?, true))
    } else {
        Ok((SimulationConfig::default(), false))
    }
}
