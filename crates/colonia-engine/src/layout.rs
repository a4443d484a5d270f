//! Starter settlement for a fresh game.
//!
//! A main street runs east-west through the middle of the map, bridged
//! where it crosses water. Buildings from [`STARTER_PLAN`] are then placed
//! along both sides of the street, each at the first origin that passes
//! placement. Everything goes through the paid player operations, so a
//! small treasury simply yields a smaller town.

use colonia_core::{PlacementError, Simulation};
use colonia_types::TilePos;
use tracing::{debug, info};

/// Building types placed at startup, in order.
pub const STARTER_PLAN: &[&str] = &[
    "house",
    "well",
    "house",
    "house",
    "well",
    "house",
    "market",
    "farm",
    "temple",
    "engineer_post",
    "forum",
    "clay_pit",
    "pottery",
    "tower",
    "tower",
];

/// What the starter layout managed to build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StarterLayout {
    /// Road tiles laid.
    pub roads: u32,
    /// Bridge tiles laid.
    pub bridges: u32,
    /// Buildings placed.
    pub buildings: u32,
    /// Plan entries that found no site or no money.
    pub skipped: Vec<String>,
}

/// Lay out the starter settlement.
pub fn lay_out(sim: &mut Simulation) -> StarterLayout {
    let mut layout = StarterLayout::default();
    let width = i32::try_from(sim.config().world.width).unwrap_or(i32::MAX);
    let height = i32::try_from(sim.config().world.height).unwrap_or(i32::MAX);
    let street = height / 2;
    let west = width / 4;
    let east = width.saturating_sub(west);

    for x in west..east {
        let pos = TilePos::new(x, street);
        if sim.place_road(pos).is_ok() {
            layout.roads = layout.roads.saturating_add(1);
        } else if sim.place_bridge(pos).is_ok() {
            layout.bridges = layout.bridges.saturating_add(1);
        } else {
            debug!(%pos, "street tile skipped");
        }
    }

    for &type_id in STARTER_PLAN {
        match place_along_street(sim, type_id, street, west..east) {
            Ok(origin) => {
                debug!(type_id, %origin, "starter building placed");
                layout.buildings = layout.buildings.saturating_add(1);
            }
            Err(reason) => {
                debug!(type_id, %reason, "starter building skipped");
                layout.skipped.push(type_id.to_owned());
            }
        }
    }

    info!(
        roads = layout.roads,
        bridges = layout.bridges,
        buildings = layout.buildings,
        skipped = layout.skipped.len(),
        money = sim.economy().money,
        "starter settlement laid out"
    );
    layout
}

/// Try origins north of the street, then south, west to east. Stops early
/// when the treasury cannot cover the type.
fn place_along_street(
    sim: &mut Simulation,
    type_id: &str,
    street: i32,
    span: std::ops::Range<i32>,
) -> Result<TilePos, PlacementError> {
    let depth = sim
        .settlement()
        .catalog()
        .get(type_id)
        .and_then(|kind| i32::try_from(kind.height).ok())
        .ok_or_else(|| PlacementError::UnknownBuildingType(type_id.to_owned()))?;

    let rows = [street.saturating_sub(depth), street.saturating_add(1)];
    let mut last = PlacementError::UnknownBuildingType(type_id.to_owned());
    for y in rows {
        for x in span.clone() {
            let origin = TilePos::new(x, y);
            match sim.place_building(origin, type_id) {
                Ok(_) => return Ok(origin),
                Err(err @ PlacementError::InsufficientFunds { .. }) => return Err(err),
                Err(err) => last = err,
            }
        }
    }
    Err(last)
}
