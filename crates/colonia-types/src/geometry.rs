//! Grid coordinates and sub-tile positions.
//!
//! The grid uses screen orientation: `x` grows east, `y` grows south, so
//! "north" is `y - 1`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// TilePos
// ---------------------------------------------------------------------------

/// Integer coordinate of a single grid tile.
///
/// Ordering is lexicographic on `(x, y)`. Shortest-path search relies on
/// this ordering to break ties deterministically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct TilePos {
    /// Column, growing east.
    pub x: i32,
    /// Row, growing south.
    pub y: i32,
}

impl TilePos {
    /// Construct a tile coordinate.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Return the coordinate shifted by `(dx, dy)`, saturating at the
    /// `i32` limits.
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Manhattan distance to another tile.
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x
            .abs_diff(other.x)
            .saturating_add(self.y.abs_diff(other.y))
    }

    /// The four cardinal neighbours in north, east, south, west order.
    ///
    /// Neighbours may lie outside the grid; callers filter by bounds.
    pub const fn neighbors4(self) -> [Self; 4] {
        [
            self.offset(0, -1),
            self.offset(1, 0),
            self.offset(0, 1),
            self.offset(-1, 0),
        ]
    }

    /// The sub-tile point at the center of this tile.
    #[allow(clippy::cast_precision_loss)]
    pub const fn center(self) -> Point {
        Point {
            x: self.x as f32,
            y: self.y as f32,
        }
    }
}

impl core::fmt::Display for TilePos {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// A position at sub-tile precision.
///
/// Tile `(x, y)` spans the square centred on `(x as f32, y as f32)`, so
/// rounding a point yields the tile it stands on.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Point {
    /// Horizontal position in tiles.
    pub x: f32,
    /// Vertical position in tiles.
    pub y: f32,
}

impl Point {
    /// Construct a point.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(self, other: Self) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// The tile this point stands on.
    #[allow(clippy::cast_possible_truncation)]
    pub fn tile(self) -> TilePos {
        TilePos {
            x: self.x.round() as i32,
            y: self.y.round() as i32,
        }
    }

    /// Move toward `target` by at most `max_step`, never overshooting.
    ///
    /// Returns the new point and whether the target was reached.
    pub fn step_toward(self, target: Self, max_step: f32) -> (Self, bool) {
        let dist = self.distance_to(target);
        if dist <= max_step || dist <= f32::EPSILON {
            return (target, true);
        }
        let ratio = max_step / dist;
        (
            Self {
                x: (target.x - self.x).mul_add(ratio, self.x),
                y: (target.y - self.y).mul_add(ratio, self.y),
            },
            false,
        )
    }
}

// ---------------------------------------------------------------------------
// Facing
// ---------------------------------------------------------------------------

/// Cardinal direction a building or agent faces.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Facing {
    /// Toward decreasing `y`.
    North,
    /// Toward increasing `x`.
    East,
    /// Toward increasing `y`.
    #[default]
    South,
    /// Toward decreasing `x`.
    West,
}

impl Facing {
    /// The dominant direction of a displacement vector.
    ///
    /// Horizontal wins ties. A zero vector keeps the default facing.
    pub fn from_delta(dx: f32, dy: f32) -> Self {
        if dx.abs() < f32::EPSILON && dy.abs() < f32::EPSILON {
            return Self::default();
        }
        if dx.abs() >= dy.abs() {
            if dx > 0.0 { Self::East } else { Self::West }
        } else if dy > 0.0 {
            Self::South
        } else {
            Self::North
        }
    }
}
