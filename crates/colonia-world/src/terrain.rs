//! The tile grid: occupancy, terrain and resource deposits.
//!
//! [`TerrainField`] is the single source of truth for what stands on every
//! tile. Road membership is derived from tile occupancy, so the road graph
//! (see [`crate::road`]) is a read-only view and can never drift out of
//! sync with the grid.
//!
//! Tiles are stored row-major in a flat `Vec`. All lookups go through
//! [`TerrainField::tile`] which returns `None` out of bounds, so no caller
//! ever indexes the backing store directly.

use std::collections::BTreeSet;

use colonia_types::{BuildingId, Deposit, Terrain, TilePos};

use crate::error::WorldError;

/// What occupies a tile. Terrain and deposits are tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    /// A road on dry land.
    Road,
    /// A road segment built across water.
    Bridge,
    /// Part of a building footprint.
    Building(BuildingId),
}

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tile {
    /// At most one occupant.
    pub occupant: Option<Occupant>,
    /// Optional terrain tag, independent of occupancy.
    pub terrain: Option<Terrain>,
    /// Optional resource deposit, independent of occupancy.
    pub deposit: Option<Deposit>,
}

impl Tile {
    /// Whether the tile is part of the road graph (roads and bridges).
    pub const fn is_road(&self) -> bool {
        matches!(self.occupant, Some(Occupant::Road | Occupant::Bridge))
    }

    /// The building occupying this tile, if any.
    pub const fn building(&self) -> Option<BuildingId> {
        match self.occupant {
            Some(Occupant::Building(id)) => Some(id),
            _ => None,
        }
    }

    /// Whether the terrain on this tile can never be walked or built on.
    pub fn is_impassable(&self) -> bool {
        self.terrain.is_some_and(Terrain::is_impassable)
    }
}

/// A `width` x `height` grid of tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainField {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

/// Convert a footprint extent to a signed offset bound.
pub(crate) fn span(extent: u32) -> i32 {
    i32::try_from(extent).unwrap_or(i32::MAX)
}

/// Iterate the tiles of a `width` x `height` rectangle anchored at `origin`,
/// row by row.
pub fn footprint(origin: TilePos, width: u32, height: u32) -> impl Iterator<Item = TilePos> {
    (0..span(height)).flat_map(move |dy| (0..span(width)).map(move |dx| origin.offset(dx, dy)))
}

impl TerrainField {
    /// Create an empty field.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] if either side is zero or
    /// the tile count does not fit the coordinate space.
    pub fn new(width: u32, height: u32) -> Result<Self, WorldError> {
        let invalid = WorldError::InvalidDimensions { width, height };
        if width == 0 || height == 0 {
            return Err(invalid);
        }
        if i32::try_from(width).is_err() || i32::try_from(height).is_err() {
            return Err(invalid);
        }
        let count = width.checked_mul(height).ok_or_else(|| invalid.clone())?;
        let count = usize::try_from(count).map_err(|_| invalid)?;
        Ok(Self {
            width,
            height,
            tiles: vec![Tile::default(); count],
        })
    }

    /// Grid width in tiles.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in tiles.
    pub const fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, pos: TilePos) -> Option<usize> {
        let x = u32::try_from(pos.x).ok()?;
        let y = u32::try_from(pos.y).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.width)?.checked_add(x)?;
        usize::try_from(idx).ok()
    }

    /// Whether the coordinate lies on the grid.
    pub fn is_in_bounds(&self, pos: TilePos) -> bool {
        self.index(pos).is_some()
    }

    /// Look up a tile.
    pub fn tile(&self, pos: TilePos) -> Option<&Tile> {
        self.index(pos).and_then(|i| self.tiles.get(i))
    }

    /// Look up a tile mutably.
    pub fn tile_mut(&mut self, pos: TilePos) -> Option<&mut Tile> {
        self.index(pos).and_then(|i| self.tiles.get_mut(i))
    }

    /// Replace a tile wholesale. Returns `false` out of bounds.
    pub fn set_tile(&mut self, pos: TilePos, tile: Tile) -> bool {
        self.tile_mut(pos).map(|t| *t = tile).is_some()
    }

    /// Every coordinate on the grid, row by row.
    pub fn positions(&self) -> impl Iterator<Item = TilePos> + use<> {
        footprint(TilePos::new(0, 0), self.width, self.height)
    }

    /// Every tile with its coordinate, row by row.
    pub fn tiles(&self) -> impl Iterator<Item = (TilePos, &Tile)> {
        self.positions().zip(self.tiles.iter())
    }

    /// Terrain tag at `pos`.
    pub fn terrain(&self, pos: TilePos) -> Option<Terrain> {
        self.tile(pos).and_then(|t| t.terrain)
    }

    /// Deposit tag at `pos`.
    pub fn deposit(&self, pos: TilePos) -> Option<Deposit> {
        self.tile(pos).and_then(|t| t.deposit)
    }

    /// Set the terrain tag. Returns `false` out of bounds.
    pub fn set_terrain(&mut self, pos: TilePos, terrain: Option<Terrain>) -> bool {
        self.tile_mut(pos).map(|t| t.terrain = terrain).is_some()
    }

    /// Set the deposit tag. Returns `false` out of bounds.
    pub fn set_deposit(&mut self, pos: TilePos, deposit: Option<Deposit>) -> bool {
        self.tile_mut(pos).map(|t| t.deposit = deposit).is_some()
    }

    // -------------------------------------------------------------------
    // Area checks
    // -------------------------------------------------------------------

    /// Check that a rectangle can take a new footprint.
    ///
    /// Every covered tile must be in bounds, unoccupied, and carry exactly
    /// `required` terrain (bare ground when `required` is `None`).
    ///
    /// # Errors
    ///
    /// Returns the first violation found, scanning row by row.
    pub fn check_area(
        &self,
        origin: TilePos,
        width: u32,
        height: u32,
        required: Option<Terrain>,
    ) -> Result<(), WorldError> {
        for pos in footprint(origin, width, height) {
            let tile = self.tile(pos).ok_or(WorldError::OutOfBounds(pos))?;
            if tile.occupant.is_some() {
                return Err(WorldError::Occupied(pos));
            }
            if tile.terrain != required {
                return Err(WorldError::TerrainMismatch {
                    pos,
                    expected: required,
                    found: tile.terrain,
                });
            }
        }
        Ok(())
    }

    /// Boolean form of [`Self::check_area`].
    pub fn is_area_empty(
        &self,
        origin: TilePos,
        width: u32,
        height: u32,
        required: Option<Terrain>,
    ) -> bool {
        self.check_area(origin, width, height, required).is_ok()
    }

    /// Whether any tile of the rectangle carries `deposit`.
    pub fn area_has_deposit(
        &self,
        origin: TilePos,
        width: u32,
        height: u32,
        deposit: Deposit,
    ) -> bool {
        footprint(origin, width, height).any(|pos| self.deposit(pos) == Some(deposit))
    }

    // -------------------------------------------------------------------
    // Occupancy
    // -------------------------------------------------------------------

    /// Whether `pos` is a road or bridge.
    pub fn has_road(&self, pos: TilePos) -> bool {
        self.tile(pos).is_some_and(Tile::is_road)
    }

    /// Lay a road on an empty, passable tile.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`], [`WorldError::Occupied`] or
    /// [`WorldError::TerrainMismatch`] for impassable terrain.
    pub fn add_road(&mut self, pos: TilePos) -> Result<(), WorldError> {
        let tile = self.tile_mut(pos).ok_or(WorldError::OutOfBounds(pos))?;
        if tile.occupant.is_some() {
            return Err(WorldError::Occupied(pos));
        }
        if tile.is_impassable() {
            return Err(WorldError::TerrainMismatch {
                pos,
                expected: None,
                found: tile.terrain,
            });
        }
        tile.occupant = Some(Occupant::Road);
        Ok(())
    }

    /// Lay a bridge on an empty water tile.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`], [`WorldError::Occupied`] or
    /// [`WorldError::TerrainMismatch`] when the tile is not water.
    pub fn add_bridge(&mut self, pos: TilePos) -> Result<(), WorldError> {
        let tile = self.tile_mut(pos).ok_or(WorldError::OutOfBounds(pos))?;
        if tile.occupant.is_some() {
            return Err(WorldError::Occupied(pos));
        }
        if tile.terrain != Some(Terrain::Water) {
            return Err(WorldError::TerrainMismatch {
                pos,
                expected: Some(Terrain::Water),
                found: tile.terrain,
            });
        }
        tile.occupant = Some(Occupant::Bridge);
        Ok(())
    }

    /// Remove a road or bridge. Returns `false` if `pos` held neither.
    pub fn remove_road(&mut self, pos: TilePos) -> bool {
        match self.tile_mut(pos) {
            Some(tile) if tile.is_road() => {
                tile.occupant = None;
                true
            }
            _ => false,
        }
    }

    /// Mark every tile of a footprint as belonging to `id`.
    ///
    /// Callers validate the area with [`Self::check_area`] first; tiles
    /// outside the grid are skipped.
    pub fn occupy(&mut self, origin: TilePos, width: u32, height: u32, id: BuildingId) {
        for pos in footprint(origin, width, height) {
            if let Some(tile) = self.tile_mut(pos) {
                tile.occupant = Some(Occupant::Building(id));
            }
        }
    }

    /// Clear the footprint tiles that still belong to `id`.
    pub fn vacate(&mut self, origin: TilePos, width: u32, height: u32, id: BuildingId) {
        for pos in footprint(origin, width, height) {
            if let Some(tile) = self.tile_mut(pos) {
                if tile.building() == Some(id) {
                    tile.occupant = None;
                }
            }
        }
    }

    /// The building occupying `pos`, if any.
    pub fn building_at(&self, pos: TilePos) -> Option<BuildingId> {
        self.tile(pos).and_then(Tile::building)
    }

    // -------------------------------------------------------------------
    // Neighbourhood queries
    // -------------------------------------------------------------------

    /// In-bounds cardinal neighbours in north, east, south, west order.
    pub fn neighbors4(&self, pos: TilePos) -> impl Iterator<Item = TilePos> + '_ {
        pos.neighbors4()
            .into_iter()
            .filter(|n| self.is_in_bounds(*n))
    }

    /// Cardinal neighbours of `pos` that are roads or bridges.
    pub fn adjacent_road_tiles(&self, pos: TilePos) -> Vec<TilePos> {
        self.neighbors4(pos).filter(|n| self.has_road(*n)).collect()
    }

    /// Buildings with at least one footprint tile inside the square of
    /// half-side `radius` centred on `center`.
    ///
    /// Each building appears once, in the order it is first met scanning
    /// the square row by row.
    pub fn buildings_near(&self, center: TilePos, radius: u32) -> Vec<BuildingId> {
        let r = span(radius);
        let mut seen = BTreeSet::new();
        let mut found = Vec::new();
        for dy in r.saturating_neg()..=r {
            for dx in r.saturating_neg()..=r {
                if let Some(id) = self.building_at(center.offset(dx, dy)) {
                    if seen.insert(id) {
                        found.push(id);
                    }
                }
            }
        }
        found
    }

    /// All road and bridge coordinates, row by row.
    pub fn road_tiles(&self) -> impl Iterator<Item = TilePos> + '_ {
        self.tiles()
            .filter(|(_, tile)| tile.is_road())
            .map(|(pos, _)| pos)
    }

    /// Coordinates holding a bridge, row by row.
    pub fn bridge_tiles(&self) -> impl Iterator<Item = TilePos> + '_ {
        self.tiles()
            .filter(|(_, tile)| tile.occupant == Some(Occupant::Bridge))
            .map(|(pos, _)| pos)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn field() -> TerrainField {
        TerrainField::new(10, 10).unwrap()
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(TerrainField::new(0, 5).is_err());
        assert!(TerrainField::new(5, 0).is_err());
    }

    #[test]
    fn bounds_checks() {
        let f = field();
        assert!(f.is_in_bounds(TilePos::new(0, 0)));
        assert!(f.is_in_bounds(TilePos::new(9, 9)));
        assert!(!f.is_in_bounds(TilePos::new(10, 0)));
        assert!(!f.is_in_bounds(TilePos::new(0, -1)));
        assert!(f.tile(TilePos::new(-3, 2)).is_none());
    }

    #[test]
    fn area_rejects_roads_buildings_and_terrain() {
        let mut f = field();
        assert!(f.is_area_empty(TilePos::new(0, 0), 2, 2, None));

        f.add_road(TilePos::new(1, 1)).unwrap();
        assert_eq!(
            f.check_area(TilePos::new(0, 0), 2, 2, None),
            Err(WorldError::Occupied(TilePos::new(1, 1)))
        );

        f.occupy(TilePos::new(4, 4), 2, 2, BuildingId::new(1));
        assert!(!f.is_area_empty(TilePos::new(5, 5), 1, 1, None));

        f.set_terrain(TilePos::new(7, 7), Some(Terrain::Forest));
        assert!(!f.is_area_empty(TilePos::new(7, 7), 1, 1, None));
        assert!(f.is_area_empty(TilePos::new(7, 7), 1, 1, Some(Terrain::Forest)));
        assert!(!f.is_area_empty(TilePos::new(7, 6), 1, 2, Some(Terrain::Forest)));
    }

    #[test]
    fn area_past_edge_is_not_empty() {
        let f = field();
        assert_eq!(
            f.check_area(TilePos::new(9, 9), 2, 1, None),
            Err(WorldError::OutOfBounds(TilePos::new(10, 9)))
        );
    }

    #[test]
    fn roads_refuse_water_and_bridges_require_it() {
        let mut f = field();
        let wet = TilePos::new(3, 3);
        f.set_terrain(wet, Some(Terrain::Water));
        assert!(f.add_road(wet).is_err());
        assert!(f.add_bridge(TilePos::new(4, 4)).is_err());
        f.add_bridge(wet).unwrap();
        assert!(f.has_road(wet));
        assert_eq!(f.bridge_tiles().collect::<Vec<_>>(), vec![wet]);
        assert!(f.remove_road(wet));
        assert!(!f.has_road(wet));
        assert!(!f.remove_road(wet));
    }

    #[test]
    fn adjacent_roads_are_cardinal_only() {
        let mut f = field();
        f.add_road(TilePos::new(2, 1)).unwrap();
        f.add_road(TilePos::new(3, 3)).unwrap();
        f.add_road(TilePos::new(1, 2)).unwrap();
        let roads = f.adjacent_road_tiles(TilePos::new(2, 2));
        assert_eq!(roads, vec![TilePos::new(2, 1), TilePos::new(1, 2)]);
    }

    #[test]
    fn buildings_near_deduplicates() {
        let mut f = field();
        f.occupy(TilePos::new(2, 2), 2, 2, BuildingId::new(7));
        f.occupy(TilePos::new(5, 3), 1, 1, BuildingId::new(3));
        let near = f.buildings_near(TilePos::new(4, 3), 1);
        assert_eq!(near, vec![BuildingId::new(7), BuildingId::new(3)]);
        assert!(f.buildings_near(TilePos::new(8, 8), 1).is_empty());
    }

    #[test]
    fn vacate_only_clears_own_tiles() {
        let mut f = field();
        f.occupy(TilePos::new(0, 0), 2, 1, BuildingId::new(1));
        f.add_road(TilePos::new(2, 0)).unwrap();
        f.vacate(TilePos::new(0, 0), 3, 1, BuildingId::new(1));
        assert!(f.building_at(TilePos::new(0, 0)).is_none());
        assert!(f.has_road(TilePos::new(2, 0)));
    }
}
