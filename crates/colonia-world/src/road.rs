//! Road connectivity, exploratory walks and shortest paths.
//!
//! [`RoadGraph`] is a borrowed view over a [`TerrainField`]: a tile is a
//! road node when its occupant is a road or bridge, and adjacency is
//! computed on demand from the four cardinal neighbours. Adding or removing
//! roads happens on the field itself, so there is never a second copy of
//! road membership to keep in sync.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use colonia_types::TilePos;
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::terrain::TerrainField;

/// Read-only road view over a terrain field.
#[derive(Debug, Clone, Copy)]
pub struct RoadGraph<'a> {
    terrain: &'a TerrainField,
}

impl<'a> RoadGraph<'a> {
    /// Wrap a terrain field.
    pub const fn new(terrain: &'a TerrainField) -> Self {
        Self { terrain }
    }

    /// Whether `pos` is a road or bridge.
    pub fn has_road(&self, pos: TilePos) -> bool {
        self.terrain.has_road(pos)
    }

    /// Number of road and bridge tiles.
    pub fn road_count(&self) -> usize {
        self.terrain.road_tiles().count()
    }

    /// Up to four cardinal neighbours of `pos` that are roads, in north,
    /// east, south, west order.
    pub fn connected_roads(&self, pos: TilePos) -> Vec<TilePos> {
        self.terrain.adjacent_road_tiles(pos)
    }

    /// A random exploratory walk of at most `max_length` steps.
    ///
    /// Each step picks uniformly among connected roads other than the tile
    /// just left; turning back is allowed only when it is the sole option.
    /// The walk stops early on an isolated road tile. The returned path
    /// starts with `start`, or is empty when `start` is not a road.
    pub fn random_path(&self, start: TilePos, max_length: usize, rng: &mut impl Rng) -> Vec<TilePos> {
        if !self.has_road(start) {
            return Vec::new();
        }
        let mut path = vec![start];
        let mut current = start;
        let mut previous: Option<TilePos> = None;

        for _ in 0..max_length {
            let neighbors = self.connected_roads(current);
            let forward: Vec<TilePos> = neighbors
                .iter()
                .copied()
                .filter(|n| Some(*n) != previous)
                .collect();
            let options = if forward.is_empty() { &neighbors } else { &forward };
            let Some(&next) = options.choose(rng) else {
                break;
            };
            previous = Some(current);
            current = next;
            path.push(next);
        }
        path
    }

    /// Shortest road route from `start` to `end`, both inclusive.
    ///
    /// Returns `None` if either endpoint is not a road or no route exists.
    /// Edges have uniform cost. Among equally short routes the frontier
    /// expands the smallest `(x, y)` coordinate first, so the result is
    /// deterministic.
    pub fn find_path(&self, start: TilePos, end: TilePos) -> Option<Vec<TilePos>> {
        if !self.has_road(start) || !self.has_road(end) {
            return None;
        }
        if start == end {
            return Some(vec![start]);
        }

        let mut dist: BTreeMap<TilePos, u32> = BTreeMap::new();
        let mut prev: BTreeMap<TilePos, TilePos> = BTreeMap::new();
        let mut queue: BTreeSet<(u32, TilePos)> = BTreeSet::new();

        dist.insert(start, 0);
        queue.insert((0, start));

        while let Some((current_dist, current)) = queue.pop_first() {
            if current == end {
                break;
            }
            let Some(next_dist) = current_dist.checked_add(1) else {
                continue;
            };
            for neighbor in self.connected_roads(current) {
                let is_shorter = dist
                    .get(&neighbor)
                    .is_none_or(|&existing| next_dist < existing);
                if is_shorter {
                    if let Some(&old) = dist.get(&neighbor) {
                        queue.remove(&(old, neighbor));
                    }
                    dist.insert(neighbor, next_dist);
                    prev.insert(neighbor, current);
                    queue.insert((next_dist, neighbor));
                }
            }
        }

        if !prev.contains_key(&end) {
            return None;
        }

        let mut path = VecDeque::new();
        let mut current = end;
        path.push_front(current);
        while let Some(&predecessor) = prev.get(&current) {
            path.push_front(predecessor);
            current = predecessor;
            if current == start {
                break;
            }
        }
        Some(path.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn field_with_roads(roads: &[(i32, i32)]) -> TerrainField {
        let mut field = TerrainField::new(10, 10).unwrap();
        for &(x, y) in roads {
            field.add_road(TilePos::new(x, y)).unwrap();
        }
        field
    }

    #[test]
    fn straight_road_path_has_five_tiles() {
        let field = field_with_roads(&[(1, 4), (2, 4), (3, 4), (4, 4), (5, 4)]);
        let graph = RoadGraph::new(&field);
        let path = graph.find_path(TilePos::new(1, 4), TilePos::new(5, 4)).unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path.first(), Some(&TilePos::new(1, 4)));
        assert_eq!(path.last(), Some(&TilePos::new(5, 4)));
    }

    #[test]
    fn disconnected_roads_have_no_path() {
        let field = field_with_roads(&[(1, 1), (2, 1), (6, 6), (7, 6)]);
        let graph = RoadGraph::new(&field);
        assert!(graph.find_path(TilePos::new(1, 1), TilePos::new(7, 6)).is_none());
    }

    #[test]
    fn non_road_endpoint_has_no_path() {
        let field = field_with_roads(&[(1, 1), (2, 1)]);
        let graph = RoadGraph::new(&field);
        assert!(graph.find_path(TilePos::new(1, 1), TilePos::new(3, 1)).is_none());
    }

    #[test]
    fn loop_takes_shorter_side() {
        // A ring around (2..=4, 2..=4) plus a long detour is never chosen.
        let mut roads = Vec::new();
        for x in 2..=6 {
            roads.push((x, 2));
            roads.push((x, 4));
        }
        roads.push((2, 3));
        roads.push((6, 3));
        let field = field_with_roads(&roads);
        let graph = RoadGraph::new(&field);
        let path = graph.find_path(TilePos::new(2, 2), TilePos::new(2, 4)).unwrap();
        assert_eq!(
            path,
            vec![TilePos::new(2, 2), TilePos::new(2, 3), TilePos::new(2, 4)]
        );
    }

    #[test]
    fn ties_are_deterministic() {
        // Square loop: both sides are equally short.
        let field = field_with_roads(&[(1, 1), (2, 1), (1, 2), (2, 2)]);
        let graph = RoadGraph::new(&field);
        let a = graph.find_path(TilePos::new(1, 1), TilePos::new(2, 2)).unwrap();
        let b = graph.find_path(TilePos::new(1, 1), TilePos::new(2, 2)).unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(a, b);
    }

    #[test]
    fn random_walk_follows_roads_without_immediate_backtrack() {
        let field = field_with_roads(&[(1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]);
        let graph = RoadGraph::new(&field);
        let mut rng = SmallRng::seed_from_u64(1);
        let path = graph.random_path(TilePos::new(1, 5), 3, &mut rng);
        assert_eq!(
            path,
            vec![
                TilePos::new(1, 5),
                TilePos::new(2, 5),
                TilePos::new(3, 5),
                TilePos::new(4, 5)
            ]
        );
    }

    #[test]
    fn random_walk_turns_back_at_dead_end() {
        let field = field_with_roads(&[(1, 1), (2, 1)]);
        let graph = RoadGraph::new(&field);
        let mut rng = SmallRng::seed_from_u64(2);
        let path = graph.random_path(TilePos::new(1, 1), 3, &mut rng);
        assert_eq!(
            path,
            vec![
                TilePos::new(1, 1),
                TilePos::new(2, 1),
                TilePos::new(1, 1),
                TilePos::new(2, 1)
            ]
        );
    }

    #[test]
    fn random_walk_stops_on_isolated_tile() {
        let field = field_with_roads(&[(4, 4)]);
        let graph = RoadGraph::new(&field);
        let mut rng = SmallRng::seed_from_u64(3);
        assert_eq!(
            graph.random_path(TilePos::new(4, 4), 10, &mut rng),
            vec![TilePos::new(4, 4)]
        );
        assert!(graph.random_path(TilePos::new(0, 0), 10, &mut rng).is_empty());
    }
}
