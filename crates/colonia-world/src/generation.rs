//! Procedural terrain and resource generation.
//!
//! Generation is declarative: a [`GenerationSpec`] lists terrain kinds,
//! each with one or more [`SpawnStrategy`] entries, and deposit kinds with
//! a density. Both are loaded from configuration and applied to a fresh
//! [`TerrainField`] with a caller-supplied RNG, so the same seed always
//! yields the same map.
//!
//! # Strategies
//!
//! - **Cluster**: `count` blobs at random centres with a random radius and
//!   a probabilistic soft edge. A tile at distance `d` from the centre is
//!   painted if `d <= r - 0.5`, or with probability one half if
//!   `d <= r + 0.5`.
//! - **River**: a biased random walk that starts on a random border edge
//!   and heads across the field in straight segments, painting a band of
//!   random width as it goes.
//!
//! Deposits use the cluster strategy with the count derived from the grid
//! area. They never overwrite terrain, and only overwrite another deposit
//! when its [`DepositSpec`] allows it.

use colonia_types::{Deposit, Terrain, TilePos};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::terrain::{TerrainField, span};

/// How a terrain kind is scattered over the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SpawnStrategy {
    /// Random round blobs.
    Cluster {
        /// Number of blobs.
        count: u32,
        /// Smallest blob radius in tiles.
        min_radius: u32,
        /// Largest blob radius in tiles.
        max_radius: u32,
    },
    /// A band crossing the field from one border.
    River {
        /// Narrowest band width in tiles.
        min_width: u32,
        /// Widest band width in tiles.
        max_width: u32,
        /// Tiles walked before the heading is re-rolled.
        segment_length: u32,
    },
}

/// One terrain kind and how to spawn it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainSpec {
    /// The terrain painted.
    pub terrain: Terrain,
    /// Strategies applied in order.
    pub strategies: Vec<SpawnStrategy>,
}

/// One deposit kind and its density.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositSpec {
    /// The deposit painted.
    pub deposit: Deposit,
    /// Grid area per cluster; a 50 here means one cluster per 50 tiles.
    pub tiles_per_cluster: u32,
    /// Smallest cluster radius.
    pub min_radius: u32,
    /// Largest cluster radius.
    pub max_radius: u32,
    /// Whether this deposit may replace another deposit.
    #[serde(default)]
    pub allow_overwrite: bool,
}

/// Full generation recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSpec {
    /// Terrain kinds, painted first.
    #[serde(default)]
    pub terrain: Vec<TerrainSpec>,
    /// Deposit kinds, painted after terrain in order.
    #[serde(default)]
    pub deposits: Vec<DepositSpec>,
}

impl Default for GenerationSpec {
    fn default() -> Self {
        Self {
            terrain: vec![
                TerrainSpec {
                    terrain: Terrain::Water,
                    strategies: vec![SpawnStrategy::River {
                        min_width: 1,
                        max_width: 2,
                        segment_length: 4,
                    }],
                },
                TerrainSpec {
                    terrain: Terrain::Forest,
                    strategies: vec![SpawnStrategy::Cluster {
                        count: 4,
                        min_radius: 1,
                        max_radius: 3,
                    }],
                },
            ],
            deposits: vec![
                DepositSpec {
                    deposit: Deposit::Fertility,
                    tiles_per_cluster: 50,
                    min_radius: 2,
                    max_radius: 4,
                    allow_overwrite: true,
                },
                DepositSpec {
                    deposit: Deposit::Clay,
                    tiles_per_cluster: 150,
                    min_radius: 1,
                    max_radius: 2,
                    allow_overwrite: false,
                },
                DepositSpec {
                    deposit: Deposit::IronOre,
                    tiles_per_cluster: 250,
                    min_radius: 1,
                    max_radius: 2,
                    allow_overwrite: false,
                },
            ],
        }
    }
}

/// Clear all terrain and deposits, then apply `spec`.
///
/// Occupied tiles keep their occupant and are never painted with terrain.
pub fn generate(field: &mut TerrainField, spec: &GenerationSpec, rng: &mut impl Rng) {
    for pos in field.positions() {
        field.set_terrain(pos, None);
        field.set_deposit(pos, None);
    }

    for terrain_spec in &spec.terrain {
        for strategy in &terrain_spec.strategies {
            apply_terrain(field, terrain_spec.terrain, strategy, rng);
        }
    }

    for deposit_spec in &spec.deposits {
        apply_deposit(field, deposit_spec, rng);
    }

    debug!(
        width = field.width(),
        height = field.height(),
        terrain_kinds = spec.terrain.len(),
        deposit_kinds = spec.deposits.len(),
        "terrain generated"
    );
}

fn apply_terrain(
    field: &mut TerrainField,
    terrain: Terrain,
    strategy: &SpawnStrategy,
    rng: &mut impl Rng,
) {
    let mut paint = |field: &mut TerrainField, pos: TilePos| {
        if let Some(tile) = field.tile_mut(pos) {
            if tile.occupant.is_none() {
                tile.terrain = Some(terrain);
                // Deposits never sit under terrain.
                tile.deposit = None;
            }
        }
    };

    match *strategy {
        SpawnStrategy::Cluster {
            count,
            min_radius,
            max_radius,
        } => {
            for _ in 0..count {
                let center = random_tile(field, rng);
                let radius = random_between(rng, min_radius, max_radius);
                paint_cluster(field, center, radius, rng, &mut paint);
            }
        }
        SpawnStrategy::River {
            min_width,
            max_width,
            segment_length,
        } => {
            let width = random_between(rng, min_width, max_width).max(1);
            paint_river(field, width, segment_length.max(1), rng, &mut paint);
        }
    }
}

fn apply_deposit(field: &mut TerrainField, spec: &DepositSpec, rng: &mut impl Rng) {
    let area = field.width().saturating_mul(field.height());
    let count = area.checked_div(spec.tiles_per_cluster).unwrap_or(0);
    let deposit = spec.deposit;
    let allow_overwrite = spec.allow_overwrite;

    let mut paint = |field: &mut TerrainField, pos: TilePos| {
        if let Some(tile) = field.tile_mut(pos) {
            if tile.terrain.is_none() && (allow_overwrite || tile.deposit.is_none()) {
                tile.deposit = Some(deposit);
            }
        }
    };

    for _ in 0..count {
        let center = random_tile(field, rng);
        let radius = random_between(rng, spec.min_radius, spec.max_radius);
        paint_cluster(field, center, radius, rng, &mut paint);
    }
}

// ---------------------------------------------------------------------------
// Painters
// ---------------------------------------------------------------------------

fn paint_cluster<R, F>(field: &mut TerrainField, center: TilePos, radius: u32, rng: &mut R, paint: &mut F)
where
    R: Rng,
    F: FnMut(&mut TerrainField, TilePos),
{
    let r = span(radius);
    let inner = f64::from(radius) - 0.5;
    let outer = f64::from(radius) + 0.5;
    for dy in r.saturating_neg()..=r {
        for dx in r.saturating_neg()..=r {
            let pos = center.offset(dx, dy);
            if !field.is_in_bounds(pos) {
                continue;
            }
            let dist = f64::from(dx).hypot(f64::from(dy));
            if dist <= inner || (dist <= outer && rng.random_bool(0.5)) {
                paint(field, pos);
            }
        }
    }
}

fn paint_river<R, F>(field: &mut TerrainField, width: u32, segment_length: u32, rng: &mut R, paint: &mut F)
where
    R: Rng,
    F: FnMut(&mut TerrainField, TilePos),
{
    let w = span(field.width());
    let h = span(field.height());
    let (mut pos, heading): (TilePos, (i32, i32)) = match rng.random_range(0..4_u8) {
        0 => (TilePos::new(rng.random_range(0..w), 0), (0, 1)),
        1 => (TilePos::new(w.saturating_sub(1), rng.random_range(0..h)), (-1, 0)),
        2 => (TilePos::new(rng.random_range(0..w), h.saturating_sub(1)), (0, -1)),
        _ => (TilePos::new(0, rng.random_range(0..h)), (1, 0)),
    };
    let drift_a = (heading.1, heading.0);
    let drift_b = (heading.1.saturating_neg(), heading.0.saturating_neg());

    let band = span(width);
    let half = band / 2;
    let max_steps = w.saturating_add(h).saturating_mul(4);
    let mut steps = 0_i32;

    while field.is_in_bounds(pos) && steps < max_steps {
        let (dx, dy) = match rng.random_range(0..5_u8) {
            0 => drift_a,
            1 => drift_b,
            _ => heading,
        };
        for _ in 0..segment_length {
            for oy in 0..band {
                for ox in 0..band {
                    let cell = pos.offset(ox.saturating_sub(half), oy.saturating_sub(half));
                    if field.is_in_bounds(cell) {
                        paint(field, cell);
                    }
                }
            }
            steps = steps.saturating_add(1);
            let next = pos.offset(dx, dy);
            // Only the main heading may carry the river off the field.
            if !field.is_in_bounds(next) && (dx, dy) != heading {
                break;
            }
            pos = next;
            if !field.is_in_bounds(pos) {
                break;
            }
        }
        steps = steps.saturating_add(1);
    }
}

fn random_tile(field: &TerrainField, rng: &mut impl Rng) -> TilePos {
    TilePos::new(
        rng.random_range(0..span(field.width())),
        rng.random_range(0..span(field.height())),
    )
}

fn random_between(rng: &mut impl Rng, low: u32, high: u32) -> u32 {
    if high <= low {
        low
    } else {
        rng.random_range(low..=high)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn count_terrain(field: &TerrainField, terrain: Terrain) -> usize {
        field
            .tiles()
            .filter(|(_, t)| t.terrain == Some(terrain))
            .count()
    }

    #[test]
    fn same_seed_same_map() {
        let spec = GenerationSpec::default();
        let mut a = TerrainField::new(30, 20).unwrap();
        let mut b = TerrainField::new(30, 20).unwrap();
        generate(&mut a, &spec, &mut SmallRng::seed_from_u64(9));
        generate(&mut b, &spec, &mut SmallRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn river_reaches_from_a_border() {
        let spec = GenerationSpec {
            terrain: vec![TerrainSpec {
                terrain: Terrain::Water,
                strategies: vec![SpawnStrategy::River {
                    min_width: 1,
                    max_width: 1,
                    segment_length: 3,
                }],
            }],
            deposits: Vec::new(),
        };
        let mut field = TerrainField::new(20, 20).unwrap();
        generate(&mut field, &spec, &mut SmallRng::seed_from_u64(3));

        let on_border = field.tiles().any(|(pos, t)| {
            t.terrain == Some(Terrain::Water)
                && (pos.x == 0 || pos.y == 0 || pos.x == 19 || pos.y == 19)
        });
        assert!(on_border);
        assert!(count_terrain(&field, Terrain::Water) >= 10);
    }

    #[test]
    fn deposits_never_sit_under_terrain() {
        let mut field = TerrainField::new(40, 40).unwrap();
        generate(
            &mut field,
            &GenerationSpec::default(),
            &mut SmallRng::seed_from_u64(11),
        );
        assert!(
            field
                .tiles()
                .all(|(_, t)| t.terrain.is_none() || t.deposit.is_none())
        );
        assert!(field.tiles().any(|(_, t)| t.deposit == Some(Deposit::Fertility)));
    }

    #[test]
    fn non_overwriting_deposit_keeps_existing() {
        let spec = GenerationSpec {
            terrain: Vec::new(),
            deposits: vec![
                DepositSpec {
                    deposit: Deposit::Fertility,
                    tiles_per_cluster: 1,
                    min_radius: 6,
                    max_radius: 6,
                    allow_overwrite: true,
                },
                DepositSpec {
                    deposit: Deposit::IronOre,
                    tiles_per_cluster: 1,
                    min_radius: 2,
                    max_radius: 2,
                    allow_overwrite: false,
                },
            ],
        };
        let mut field = TerrainField::new(5, 5).unwrap();
        generate(&mut field, &spec, &mut SmallRng::seed_from_u64(5));
        // 25 fertility clusters of radius 6 blanket a 5x5 field.
        assert!(
            field
                .tiles()
                .all(|(_, t)| t.deposit == Some(Deposit::Fertility))
        );
    }

    #[test]
    fn spec_parses_from_json() {
        let json = r#"{
            "terrain": [
                {"terrain": "forest", "strategies": [
                    {"strategy": "cluster", "count": 2, "min_radius": 1, "max_radius": 2}
                ]}
            ],
            "deposits": [
                {"deposit": "clay", "tiles_per_cluster": 100, "min_radius": 1, "max_radius": 1}
            ]
        }"#;
        let spec: GenerationSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.terrain.len(), 1);
        assert!(!spec.deposits.first().unwrap().allow_overwrite);
    }
}
