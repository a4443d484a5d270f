//! Enemy waves.
//!
//! The first wave arrives `first_wave_delay` seconds into the run, then one
//! every `interval` seconds. Wave `n` (counting from zero) brings
//! `base_count + growth * n` enemies, capped at `max_per_wave`, each on a
//! random walkable border tile.

use colonia_types::TilePos;
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{debug, info};

use crate::config::WaveConfig;
use crate::settlement::Settlement;

/// Countdown to the next wave.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveSpawner {
    timer: f32,
    index: u32,
}

impl WaveSpawner {
    /// A spawner waiting for the first wave.
    pub const fn new(config: &WaveConfig) -> Self {
        Self {
            timer: config.first_wave_delay,
            index: 0,
        }
    }

    /// Seconds until the next wave.
    pub const fn time_to_next(&self) -> f32 {
        self.timer
    }

    /// Waves launched so far.
    pub const fn waves_launched(&self) -> u32 {
        self.index
    }

    /// Size of wave `index`.
    pub fn wave_size(config: &WaveConfig, index: u32) -> u32 {
        config
            .base_count
            .saturating_add(config.growth.saturating_mul(index))
            .min(config.max_per_wave)
    }

    /// Count down by `dt` seconds. When a wave is due, returns the tiles its
    /// enemies spawn on; otherwise an empty list.
    pub fn update(
        &mut self,
        dt: f32,
        config: &WaveConfig,
        settlement: &Settlement,
        rng: &mut impl Rng,
    ) -> Vec<TilePos> {
        if !config.enabled {
            return Vec::new();
        }
        self.timer -= dt;
        if self.timer > 0.0 {
            return Vec::new();
        }
        self.timer += config.interval;

        let size = Self::wave_size(config, self.index);
        let wave = self.index;
        self.index = self.index.saturating_add(1);

        let border = spawn_tiles(settlement);
        if border.is_empty() {
            debug!(wave, "no walkable border tile; wave skipped");
            return Vec::new();
        }
        let tiles: Vec<TilePos> = (0..size)
            .filter_map(|_| border.choose(rng).copied())
            .collect();
        info!(wave, enemies = tiles.len(), "enemy wave spawned");
        tiles
    }
}

/// Walkable, unbuilt tiles on the edge of the grid.
fn spawn_tiles(settlement: &Settlement) -> Vec<TilePos> {
    let terrain = settlement.terrain();
    let last_x = i32::try_from(terrain.width()).unwrap_or(i32::MAX).saturating_sub(1);
    let last_y = i32::try_from(terrain.height()).unwrap_or(i32::MAX).saturating_sub(1);
    terrain
        .positions()
        .filter(|p| p.x == 0 || p.y == 0 || p.x == last_x || p.y == last_y)
        .filter(|p| settlement.is_walkable(*p) && terrain.building_at(*p).is_none())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use colonia_types::Terrain;
    use colonia_world::{TerrainField, default_catalog};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn config() -> WaveConfig {
        WaveConfig {
            enabled: true,
            first_wave_delay: 10.0,
            interval: 5.0,
            base_count: 2,
            growth: 3,
            max_per_wave: 6,
        }
    }

    fn settlement() -> Settlement {
        Settlement::new(
            TerrainField::new(8, 8).unwrap(),
            default_catalog().unwrap(),
        )
    }

    #[test]
    fn wave_sizes_grow_up_to_the_cap() {
        let config = config();
        let sizes: Vec<u32> = (0..4).map(|i| WaveSpawner::wave_size(&config, i)).collect();
        assert_eq!(sizes, vec![2, 5, 6, 6]);
    }

    #[test]
    fn waves_follow_delay_then_interval() {
        let config = config();
        let s = settlement();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut spawner = WaveSpawner::new(&config);

        let mut launches = Vec::new();
        for tick in 0..230 {
            let tiles = spawner.update(0.1, &config, &s, &mut rng);
            if !tiles.is_empty() {
                launches.push((tick, tiles.len()));
            }
        }

        let ticks: Vec<i32> = launches.iter().map(|(t, _)| *t).collect();
        let sizes: Vec<usize> = launches.iter().map(|(_, n)| *n).collect();
        assert_eq!(ticks.len(), 3);
        assert!((98..=100).contains(ticks.first().unwrap()));
        assert_eq!(sizes, vec![2, 5, 6]);
        assert_eq!(spawner.waves_launched(), 3);
    }

    #[test]
    fn enemies_spawn_on_walkable_border_tiles() {
        let config = config();
        let mut s = settlement();
        for x in 0..8 {
            s.terrain_mut().set_terrain(TilePos::new(x, 0), Some(Terrain::Water));
        }
        let mut rng = SmallRng::seed_from_u64(9);
        let mut spawner = WaveSpawner::new(&config);

        let tiles = spawner.update(10.0, &config, &s, &mut rng);

        assert_eq!(tiles.len(), 2);
        for tile in tiles {
            assert!(tile.x == 0 || tile.x == 7 || tile.y == 7);
            assert!(s.is_walkable(tile));
        }
    }

    #[test]
    fn disabled_waves_never_spawn() {
        let config = WaveConfig {
            enabled: false,
            ..config()
        };
        let s = settlement();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut spawner = WaveSpawner::new(&config);
        assert!(spawner.update(1000.0, &config, &s, &mut rng).is_empty());
        assert_eq!(spawner.waves_launched(), 0);
    }
}
