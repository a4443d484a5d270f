//! Configuration loading and typed config structures for the Colonia
//! simulation.
//!
//! The canonical configuration lives in `colonia-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.
//! Every section is optional; missing sections and fields fall back to the
//! defaults documented on each field.

use std::path::{Path, PathBuf};

use colonia_world::GenerationSpec;
use colonia_world::catalog::{self, BuildingType, Catalog};
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but is not usable.
    #[error("invalid configuration: {reason}")]
    Validation {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `colonia-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World identity and grid size.
    #[serde(default)]
    pub world: WorldConfig,

    /// Tick length and pacing.
    #[serde(default)]
    pub time: TimeConfig,

    /// Treasury and construction costs.
    #[serde(default)]
    pub economy: EconomyConfig,

    /// Walker and cart parameters.
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Enemy parameters.
    #[serde(default)]
    pub enemies: EnemyConfig,

    /// Enemy wave schedule.
    #[serde(default)]
    pub waves: WaveConfig,

    /// Terrain and deposit generation.
    #[serde(default)]
    pub generation: GenerationSpec,

    /// Replacement building catalog. The built-in catalog is used when
    /// absent.
    #[serde(default)]
    pub buildings: Option<Vec<BuildingType>>,

    /// Save file settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Validation`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Validation`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges across all sections.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason: &str| {
            Err(ConfigError::Validation {
                reason: reason.to_owned(),
            })
        };

        if self.world.width == 0 || self.world.height == 0 {
            return fail("world.width and world.height must be at least 1");
        }
        if self.time.tick_seconds.is_nan() || self.time.tick_seconds <= 0.0 {
            return fail("time.tick_seconds must be positive");
        }
        if self.agents.walker_speed <= 0.0 || self.agents.cart_speed <= 0.0 {
            return fail("agent speeds must be positive");
        }
        if self.agents.arrival_epsilon < 0.0 {
            return fail("agents.arrival_epsilon must not be negative");
        }
        if self.enemies.hp <= 0.0 || self.enemies.speed <= 0.0 {
            return fail("enemies.hp and enemies.speed must be positive");
        }
        if self.enemies.attack_cooldown <= 0.0 || self.enemies.path_recalc_interval <= 0.0 {
            return fail("enemy cooldown and path recalculation interval must be positive");
        }
        if self.enemies.blocked_retarget_after >= self.enemies.stuck_despawn_after {
            return fail("enemies.blocked_retarget_after must be below stuck_despawn_after");
        }
        if self.waves.enabled && self.waves.interval <= 0.0 {
            return fail("waves.interval must be positive when waves are enabled");
        }
        if !(0.0..=1.0).contains(&self.economy.refund_ratio) {
            return fail("economy.refund_ratio must be within 0..=1");
        }
        self.catalog().map(|_| ()).map_err(|e| ConfigError::Validation {
            reason: e.to_string(),
        })
    }

    /// The building catalog: the configured override, or the built-in one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the override is invalid.
    pub fn catalog(&self) -> Result<Catalog, ConfigError> {
        let result = match &self.buildings {
            Some(types) => Catalog::from_types(types.clone()),
            None => catalog::default_catalog(),
        };
        result.map_err(|e| ConfigError::Validation {
            reason: e.to_string(),
        })
    }
}

/// World identity and grid size.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable settlement name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for terrain, patrols and waves.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Grid width in tiles.
    #[serde(default = "default_world_size")]
    pub width: u32,

    /// Grid height in tiles.
    #[serde(default = "default_world_size")]
    pub height: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            width: default_world_size(),
            height: default_world_size(),
        }
    }
}

/// Tick length and pacing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeConfig {
    /// Simulated seconds per tick.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f32,

    /// Real-time milliseconds between ticks (0 = as fast as possible).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Stop after this many ticks (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: 0,
        }
    }
}

/// Treasury and construction costs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EconomyConfig {
    /// Money at the start of a new game.
    #[serde(default = "default_starting_money")]
    pub starting_money: i64,

    /// Cost of one road tile.
    #[serde(default = "default_road_cost")]
    pub road_cost: u32,

    /// Cost of one bridge tile.
    #[serde(default = "default_bridge_cost")]
    pub bridge_cost: u32,

    /// Share of the build cost refunded on removal.
    #[serde(default)]
    pub refund_ratio: f32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_money: default_starting_money(),
            road_cost: default_road_cost(),
            bridge_cost: default_bridge_cost(),
            refund_ratio: 0.0,
        }
    }
}

/// Walker and cart parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentsConfig {
    /// Patrol walker speed in tiles per second.
    #[serde(default = "default_walker_speed")]
    pub walker_speed: f32,

    /// Cart speed in tiles per second.
    #[serde(default = "default_cart_speed")]
    pub cart_speed: f32,

    /// Square radius, in tiles, a walker affects at each waypoint.
    #[serde(default = "default_coverage_radius")]
    pub coverage_radius: u32,

    /// Goods a distributor hands each house per occupant per visit.
    #[serde(default = "default_distribute_per_occupant")]
    pub distribute_per_occupant: f32,

    /// Distance at which a walker or cart snaps onto its waypoint.
    #[serde(default = "default_arrival_epsilon")]
    pub arrival_epsilon: f32,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            walker_speed: default_walker_speed(),
            cart_speed: default_cart_speed(),
            coverage_radius: default_coverage_radius(),
            distribute_per_occupant: default_distribute_per_occupant(),
            arrival_epsilon: default_arrival_epsilon(),
        }
    }
}

/// Enemy parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnemyConfig {
    /// Hit points at spawn.
    #[serde(default = "default_enemy_hp")]
    pub hp: f32,

    /// Speed in tiles per second.
    #[serde(default = "default_enemy_speed")]
    pub speed: f32,

    /// Reach, in tiles, from the nearest footprint tile.
    #[serde(default = "default_attack_range")]
    pub attack_range: f32,

    /// Hit points removed per blow.
    #[serde(default = "default_attack_damage")]
    pub attack_damage: f32,

    /// Seconds between blows.
    #[serde(default = "default_attack_cooldown")]
    pub attack_cooldown: f32,

    /// Seconds between path recalculations.
    #[serde(default = "default_path_recalc_interval")]
    pub path_recalc_interval: f32,

    /// Seconds without progress before switching to the nearest wall.
    #[serde(default = "default_blocked_retarget_after")]
    pub blocked_retarget_after: f32,

    /// Seconds without progress before giving up and despawning.
    #[serde(default = "default_stuck_despawn_after")]
    pub stuck_despawn_after: f32,

    /// Node expansions allowed per path search.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Distance at which an enemy counts as on its waypoint.
    #[serde(default = "default_enemy_waypoint_epsilon")]
    pub waypoint_epsilon: f32,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            hp: default_enemy_hp(),
            speed: default_enemy_speed(),
            attack_range: default_attack_range(),
            attack_damage: default_attack_damage(),
            attack_cooldown: default_attack_cooldown(),
            path_recalc_interval: default_path_recalc_interval(),
            blocked_retarget_after: default_blocked_retarget_after(),
            stuck_despawn_after: default_stuck_despawn_after(),
            search_limit: default_search_limit(),
            waypoint_epsilon: default_enemy_waypoint_epsilon(),
        }
    }
}

/// Enemy wave schedule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WaveConfig {
    /// Whether waves spawn at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds before the first wave.
    #[serde(default = "default_first_wave_delay")]
    pub first_wave_delay: f32,

    /// Seconds between waves.
    #[serde(default = "default_wave_interval")]
    pub interval: f32,

    /// Enemies in the first wave.
    #[serde(default = "default_base_count")]
    pub base_count: u32,

    /// Extra enemies per subsequent wave.
    #[serde(default = "default_growth")]
    pub growth: u32,

    /// Upper bound on enemies per wave.
    #[serde(default = "default_max_per_wave")]
    pub max_per_wave: u32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            first_wave_delay: default_first_wave_delay(),
            interval: default_wave_interval(),
            base_count: default_base_count(),
            growth: default_growth(),
            max_per_wave: default_max_per_wave(),
        }
    }
}

/// Save file settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistenceConfig {
    /// Where the game is saved and restored from.
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,

    /// Save every this many ticks (0 = only at shutdown).
    #[serde(default = "default_autosave_every_ticks")]
    pub autosave_every_ticks: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            save_path: default_save_path(),
            autosave_every_ticks: default_autosave_every_ticks(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "Colonia".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_world_size() -> u32 {
    48
}

const fn default_tick_seconds() -> f32 {
    0.1
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_starting_money() -> i64 {
    500
}

const fn default_road_cost() -> u32 {
    5
}

const fn default_bridge_cost() -> u32 {
    20
}

const fn default_walker_speed() -> f32 {
    2.0
}

const fn default_cart_speed() -> f32 {
    1.5
}

const fn default_coverage_radius() -> u32 {
    1
}

const fn default_distribute_per_occupant() -> f32 {
    1.0
}

const fn default_arrival_epsilon() -> f32 {
    0.05
}

const fn default_enemy_hp() -> f32 {
    50.0
}

const fn default_enemy_speed() -> f32 {
    1.2
}

const fn default_attack_range() -> f32 {
    1.0
}

const fn default_attack_damage() -> f32 {
    10.0
}

const fn default_attack_cooldown() -> f32 {
    1.0
}

const fn default_path_recalc_interval() -> f32 {
    1.5
}

const fn default_blocked_retarget_after() -> f32 {
    5.0
}

const fn default_stuck_despawn_after() -> f32 {
    15.0
}

const fn default_search_limit() -> usize {
    8000
}

const fn default_enemy_waypoint_epsilon() -> f32 {
    0.15
}

const fn default_true() -> bool {
    true
}

const fn default_first_wave_delay() -> f32 {
    120.0
}

const fn default_wave_interval() -> f32 {
    90.0
}

const fn default_base_count() -> u32 {
    2
}

const fn default_growth() -> u32 {
    1
}

const fn default_max_per_wave() -> u32 {
    12
}

fn default_save_path() -> PathBuf {
    PathBuf::from("colonia-save.json")
}

const fn default_autosave_every_ticks() -> u64 {
    600
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_yaml() {
        let config = SimulationConfig::parse("{}").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.economy.starting_money, 500);
        assert_eq!(config.economy.road_cost, 5);
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = r"
world:
  name: Test Town
  seed: 7
  width: 20
  height: 12
time:
  tick_seconds: 0.25
  max_ticks: 100
enemies:
  hp: 80
waves:
  enabled: false
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.world.name, "Test Town");
        assert_eq!((config.world.width, config.world.height), (20, 12));
        assert_eq!(config.time.max_ticks, 100);
        assert!((config.enemies.hp - 80.0).abs() < f32::EPSILON);
        assert!((config.enemies.speed - 1.2).abs() < f32::EPSILON);
        assert!(!config.waves.enabled);
    }

    #[test]
    fn parse_generation_and_catalog_override() {
        let yaml = r"
generation:
  terrain:
    - terrain: forest
      strategies:
        - strategy: cluster
          count: 3
          min_radius: 1
          max_radius: 2
  deposits: []
buildings:
  - id: hut
    name: Hut
    width: 1
    height: 1
    cost: 10
    house:
      levels:
        - name: hut
          capacity: 3
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.generation.terrain.len(), 1);
        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("hut").unwrap().is_house());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let zero_width = "world:\n  width: 0\n";
        assert!(matches!(
            SimulationConfig::parse(zero_width),
            Err(ConfigError::Validation { .. })
        ));

        let bad_refund = "economy:\n  refund_ratio: 1.5\n";
        assert!(SimulationConfig::parse(bad_refund).is_err());

        let bad_catalog = "buildings:\n  - {id: x, name: X, width: 0, height: 1, cost: 1}\n";
        assert!(SimulationConfig::parse(bad_catalog).is_err());
    }

    #[test]
    fn shipped_config_parses() {
        let config = SimulationConfig::parse(include_str!("../../../colonia-config.yaml")).unwrap();
        assert_eq!(config.world.width, 48);
        assert_eq!(config.economy.starting_money, 2000);
        assert_eq!(config.generation, GenerationSpec::default());
        assert_eq!(config.enemies, EnemyConfig::default());
        assert_eq!(config.waves, WaveConfig::default());
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        assert!(matches!(
            SimulationConfig::parse("world: [unclosed"),
            Err(ConfigError::Yaml { .. })
        ));
    }
}
