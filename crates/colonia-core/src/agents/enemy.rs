//! Hostile raiders.
//!
//! An enemy targets the nearest intact non-wall building, falling back to
//! walls when nothing else stands. Distances are measured to the nearest
//! footprint tile, not the centre. In reach it strikes on a cooldown; out
//! of reach it follows a breadth-first route over walkable tiles toward any
//! tile within attack range, re-planning on a timer or when the route is
//! exhausted or blocked.
//!
//! Two timers guard against endless loops: after `blocked_retarget_after`
//! seconds without progress an enemy besieges the nearest wall instead,
//! and after `stuck_despawn_after` seconds it gives up and despawns.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use colonia_types::{BuildingId, Facing, Point, TilePos};
use colonia_world::Building;
use tracing::debug;

use super::{AgentContext, AgentOutcome, DespawnReason};
use crate::config::EnemyConfig;
use crate::settlement::Settlement;

/// Slack added to the attack range when deciding whether to strike, so an
/// enemy stopping short of a tile centre still counts as in reach.
const REACH_SLACK: f32 = 0.5;

/// Cardinal steps, tried before diagonals.
const CARDINALS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Diagonal steps.
const DIAGONALS: [(i32, i32); 4] = [(1, -1), (1, 1), (-1, 1), (-1, -1)];

/// Which buildings a target search considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetFilter {
    NonWalls,
    Walls,
}

/// A raider.
#[derive(Debug, Clone)]
pub struct Enemy {
    /// Sub-tile position.
    pub position: Point,
    /// Direction of travel or attack.
    pub facing: Facing,
    /// Current hit points.
    pub hp: f32,
    /// Hit points at spawn.
    pub max_hp: f32,
    target: Option<BuildingId>,
    path: Vec<TilePos>,
    index: usize,
    recalc_timer: f32,
    attack_cooldown: f32,
    blocked_for: f32,
    stuck_for: f32,
}

impl Enemy {
    /// A fresh enemy standing on `tile`.
    pub fn new(tile: TilePos, config: &EnemyConfig) -> Self {
        Self {
            position: tile.center(),
            facing: Facing::default(),
            hp: config.hp,
            max_hp: config.hp,
            target: None,
            path: Vec::new(),
            index: 0,
            recalc_timer: 0.0,
            attack_cooldown: 0.0,
            blocked_for: 0.0,
            stuck_for: 0.0,
        }
    }

    /// The building currently targeted.
    pub const fn target(&self) -> Option<BuildingId> {
        self.target
    }

    /// Remaining waypoints of the current route.
    pub fn route(&self) -> &[TilePos] {
        self.path.get(self.index..).unwrap_or_default()
    }

    /// Seconds spent without making progress toward the target.
    pub const fn blocked_for(&self) -> f32 {
        self.blocked_for
    }

    /// Remove hit points.
    pub fn take_damage(&mut self, amount: f32) {
        self.hp -= amount.max(0.0);
    }

    /// Whether hit points are exhausted.
    pub const fn is_dead(&self) -> bool {
        self.hp <= 0.0
    }

    /// Advance by `dt` seconds.
    pub fn advance(&mut self, dt: f32, ctx: &mut AgentContext<'_>) -> AgentOutcome {
        if self.is_dead() {
            return AgentOutcome::Despawn(DespawnReason::Killed);
        }
        let config = ctx.enemies;
        self.attack_cooldown = (self.attack_cooldown - dt).max(0.0);

        let target_valid = self
            .target
            .and_then(|id| ctx.settlement.building(id))
            .is_some_and(|b| !b.collapsed);
        if !target_valid {
            self.set_target(self.find_target(ctx.settlement));
        }
        let Some(target_id) = self.target else {
            return AgentOutcome::Despawn(DespawnReason::NoTarget);
        };

        let in_reach = ctx
            .settlement
            .building(target_id)
            .is_some_and(|b| b.distance_to_bounds(self.position) <= config.attack_range + REACH_SLACK);
        if in_reach {
            self.strike(target_id, ctx.settlement, config);
            return AgentOutcome::Continue;
        }

        self.recalc_timer -= dt;
        if self.route().is_empty() || self.recalc_timer <= 0.0 {
            self.refresh_target(ctx.settlement);
            self.replan(ctx.settlement, config);
            self.recalc_timer = config.path_recalc_interval;
        }

        if self.follow_route(dt, ctx.settlement, config) {
            self.stuck_for = 0.0;
            self.blocked_for = 0.0;
        } else {
            self.stuck_for += dt;
            self.blocked_for += dt;
        }

        if self.blocked_for > config.blocked_retarget_after && !self.targets_wall(ctx.settlement) {
            if let Some(wall) = self.nearest(ctx.settlement, TargetFilter::Walls) {
                debug!(wall_id = %wall, blocked_for = self.blocked_for, "enemy besieging wall");
                self.set_target(Some(wall));
            }
        }

        if self.stuck_for > config.stuck_despawn_after {
            debug!(position = ?self.position.tile(), "enemy stuck; despawning");
            return AgentOutcome::Despawn(DespawnReason::Stuck);
        }
        AgentOutcome::Continue
    }

    fn set_target(&mut self, target: Option<BuildingId>) {
        self.target = target;
        self.blocked_for = 0.0;
        self.path.clear();
        self.index = 0;
    }

    fn targets_wall(&self, settlement: &Settlement) -> bool {
        self.target
            .and_then(|id| settlement.building(id))
            .is_some_and(Building::is_wall)
    }

    /// Face the target and hit it when the cooldown allows.
    fn strike(&mut self, target_id: BuildingId, settlement: &mut Settlement, config: &EnemyConfig) {
        let Some(target) = settlement.building_mut(target_id) else {
            return;
        };
        let center = target.center_point();
        self.facing = Facing::from_delta(center.x - self.position.x, center.y - self.position.y);
        if self.attack_cooldown <= 0.0 {
            target.take_damage(config.attack_damage);
            self.attack_cooldown = config.attack_cooldown;
        }
        self.blocked_for = 0.0;
        self.stuck_for = 0.0;
        self.path.clear();
        self.index = 0;
    }

    /// Nearest non-wall building, else nearest wall.
    fn find_target(&self, settlement: &Settlement) -> Option<BuildingId> {
        self.nearest(settlement, TargetFilter::NonWalls)
            .or_else(|| self.nearest(settlement, TargetFilter::Walls))
    }

    /// Keep chasing the nearest non-wall building while not besieging.
    fn refresh_target(&mut self, settlement: &Settlement) {
        if self.targets_wall(settlement) {
            return;
        }
        let nearest = self.nearest(settlement, TargetFilter::NonWalls);
        if nearest.is_some() && nearest != self.target {
            self.set_target(nearest);
        }
    }

    fn nearest(&self, settlement: &Settlement, filter: TargetFilter) -> Option<BuildingId> {
        let wants_wall = filter == TargetFilter::Walls;
        settlement
            .buildings()
            .values()
            .filter(|b| !b.collapsed && b.is_wall() == wants_wall)
            .map(|b| (b.distance_to_bounds(self.position), b.id))
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, id)| id)
    }

    fn replan(&mut self, settlement: &Settlement, config: &EnemyConfig) {
        self.path = self
            .target
            .and_then(|id| settlement.building(id))
            .map(|target| find_route(settlement, self.position.tile(), target, config))
            .unwrap_or_default();
        self.index = 0;
    }

    /// Step along the route. Returns whether the enemy made progress.
    fn follow_route(&mut self, dt: f32, settlement: &Settlement, config: &EnemyConfig) -> bool {
        let Some(&waypoint) = self.path.get(self.index) else {
            return false;
        };
        let target = waypoint.center();
        if self.position.distance_to(target) < config.waypoint_epsilon {
            self.index = self.index.saturating_add(1);
            return true;
        }

        let (next, _) = self.position.step_toward(target, config.speed * dt);
        let here = self.position.tile();
        let there = next.tile();
        let diagonal_blocked = there.x != here.x
            && there.y != here.y
            && (!settlement.is_walkable(TilePos::new(there.x, here.y))
                || !settlement.is_walkable(TilePos::new(here.x, there.y)));
        if !settlement.is_walkable(there) || diagonal_blocked {
            self.path.clear();
            self.index = 0;
            self.recalc_timer = 0.0;
            return false;
        }

        self.facing = Facing::from_delta(next.x - self.position.x, next.y - self.position.y);
        self.position = next;
        true
    }
}

/// Breadth-first route from `start` to the nearest walkable tile within
/// attack range of `target`'s footprint.
///
/// Moves are 8-directional, cardinals first; a diagonal step is allowed
/// only when both flanking cardinal tiles are walkable. The search gives
/// up after `config.search_limit` expansions. The route excludes `start`
/// and is empty when no goal is reachable or `start` is already a goal.
pub fn find_route(
    settlement: &Settlement,
    start: TilePos,
    target: &Building,
    config: &EnemyConfig,
) -> Vec<TilePos> {
    let goals = goal_tiles(settlement, target, config.attack_range);
    if goals.is_empty() {
        return Vec::new();
    }

    let mut visited = BTreeSet::from([start]);
    let mut came_from: BTreeMap<TilePos, TilePos> = BTreeMap::new();
    let mut queue = VecDeque::from([start]);
    let mut expansions = 0_usize;
    let mut found = None;

    while let Some(current) = queue.pop_front() {
        if expansions >= config.search_limit {
            break;
        }
        expansions = expansions.saturating_add(1);
        if goals.contains(&current) {
            found = Some(current);
            break;
        }

        let steps = CARDINALS.iter().chain(DIAGONALS.iter());
        for &(dx, dy) in steps {
            let next = current.offset(dx, dy);
            if visited.contains(&next) || !settlement.is_walkable(next) {
                continue;
            }
            let is_diagonal = dx != 0 && dy != 0;
            if is_diagonal
                && (!settlement.is_walkable(current.offset(dx, 0))
                    || !settlement.is_walkable(current.offset(0, dy)))
            {
                continue;
            }
            visited.insert(next);
            came_from.insert(next, current);
            queue.push_back(next);
        }
    }

    let Some(goal) = found else {
        return Vec::new();
    };
    let mut route = VecDeque::new();
    let mut current = goal;
    while current != start {
        route.push_front(current);
        match came_from.get(&current) {
            Some(&previous) => current = previous,
            None => break,
        }
    }
    route.into_iter().collect()
}

/// Walkable tiles in the footprint's one-tile ring (and the footprint
/// itself) whose centre lies within `range` of the nearest footprint tile.
fn goal_tiles(settlement: &Settlement, target: &Building, range: f32) -> BTreeSet<TilePos> {
    let w = i32::try_from(target.kind.width).unwrap_or(i32::MAX);
    let h = i32::try_from(target.kind.height).unwrap_or(i32::MAX);
    let mut goals = BTreeSet::new();
    for dy in -1..=h {
        for dx in -1..=w {
            let pos = target.origin.offset(dx, dy);
            if settlement.is_walkable(pos) && target.distance_to_bounds(pos.center()) <= range {
                goals.insert(pos);
            }
        }
    }
    goals
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use colonia_types::Terrain;
    use colonia_world::{TerrainField, default_catalog};

    use super::*;
    use crate::config::AgentsConfig;
    use crate::economy::Economy;

    fn open_field(width: u32, height: u32) -> Settlement {
        Settlement::new(
            TerrainField::new(width, height).unwrap(),
            default_catalog().unwrap(),
        )
    }

    fn step(enemy: &mut Enemy, settlement: &mut Settlement, dt: f32) -> AgentOutcome {
        let agents = AgentsConfig::default();
        let enemies = EnemyConfig::default();
        let roster = BTreeMap::new();
        let mut effects = Vec::new();
        let mut economy = Economy::with_money(0);
        let mut ctx = AgentContext {
            settlement,
            economy: &mut economy,
            agents: &agents,
            enemies: &enemies,
            roster: &roster,
            effects: &mut effects,
        };
        enemy.advance(dt, &mut ctx)
    }

    #[test]
    fn route_reaches_attack_range() {
        let mut s = open_field(12, 12);
        let wall = s.place_building(TilePos::new(8, 5), "wall").unwrap();
        let target = s.building(wall).unwrap().clone();
        let route = find_route(&s, TilePos::new(1, 5), &target, &EnemyConfig::default());
        assert_eq!(route.last(), Some(&TilePos::new(7, 5)));
        assert_eq!(route.len(), 6);
        assert!(!route.contains(&TilePos::new(1, 5)));
    }

    #[test]
    fn diagonal_moves_do_not_cut_corners() {
        let mut s = open_field(6, 6);
        // walls at (2,1) and (1,2) seal the diagonal from (1,1) to (2,2)
        s.place_building(TilePos::new(2, 1), "wall").unwrap();
        s.place_building(TilePos::new(1, 2), "wall").unwrap();
        let goal = s.place_building(TilePos::new(4, 4), "wall").unwrap();
        let target = s.building(goal).unwrap().clone();
        let route = find_route(&s, TilePos::new(1, 1), &target, &EnemyConfig::default());
        let first = route.first().copied().unwrap();
        assert_ne!(first, TilePos::new(2, 2));
        assert!([TilePos::new(1, 0), TilePos::new(0, 1), TilePos::new(0, 0)].contains(&first));
    }

    #[test]
    fn unreachable_goal_yields_empty_route() {
        let mut s = open_field(7, 7);
        for y in 0..7 {
            s.place_building(TilePos::new(3, y), "wall").unwrap();
        }
        let garden = s.place_building(TilePos::new(6, 3), "garden").unwrap();
        let target = s.building(garden).unwrap().clone();
        assert!(find_route(&s, TilePos::new(0, 3), &target, &EnemyConfig::default()).is_empty());
    }

    #[test]
    fn attacking_clears_stuck_time() {
        let mut s = open_field(12, 6);
        s.place_building(TilePos::new(9, 2), "garden").unwrap();
        let mut enemy = Enemy::new(TilePos::new(8, 2), &EnemyConfig::default());
        enemy.stuck_for = 14.0;
        enemy.blocked_for = 4.0;

        assert_eq!(step(&mut enemy, &mut s, 0.1), AgentOutcome::Continue);
        assert!(enemy.stuck_for.abs() < f32::EPSILON);
        assert!(enemy.blocked_for().abs() < f32::EPSILON);
    }

    #[test]
    fn enemy_walks_up_and_attacks() {
        let mut s = open_field(12, 6);
        let garden = s.place_building(TilePos::new(9, 2), "garden").unwrap();
        let mut enemy = Enemy::new(TilePos::new(0, 2), &EnemyConfig::default());

        let mut damaged = false;
        for _ in 0..300 {
            assert_eq!(step(&mut enemy, &mut s, 0.1), AgentOutcome::Continue);
            let building = s.building(garden).unwrap();
            if building.hp < building.kind.max_hp {
                damaged = true;
                break;
            }
        }
        assert!(damaged);
        assert_eq!(enemy.target(), Some(garden));
        assert_eq!(enemy.facing, Facing::East);
        assert!(enemy.position.x > 7.0);
    }

    #[test]
    fn prefers_buildings_over_walls() {
        let mut s = open_field(12, 6);
        s.place_building(TilePos::new(2, 2), "wall").unwrap();
        let garden = s.place_building(TilePos::new(10, 2), "garden").unwrap();
        let mut enemy = Enemy::new(TilePos::new(0, 2), &EnemyConfig::default());
        step(&mut enemy, &mut s, 0.1);
        assert_eq!(enemy.target(), Some(garden));
    }

    #[test]
    fn sealed_target_leads_to_wall_siege() {
        let mut s = open_field(9, 9);
        // ring of walls around a garden at (6,4)
        for y in 2..=6 {
            for x in 4..=8 {
                if x == 4 || x == 8 || y == 2 || y == 6 {
                    s.place_building(TilePos::new(x, y), "wall").unwrap();
                }
            }
        }
        s.place_building(TilePos::new(6, 4), "garden").unwrap();
        let mut enemy = Enemy::new(TilePos::new(0, 4), &EnemyConfig::default());

        let mut sieging = false;
        for _ in 0..120 {
            step(&mut enemy, &mut s, 0.1);
            let target = enemy.target().and_then(|id| s.building(id));
            if target.is_some_and(Building::is_wall) {
                sieging = true;
                break;
            }
        }
        assert!(sieging);
    }

    #[test]
    fn hopeless_enemy_eventually_despawns() {
        let mut s = open_field(9, 9);
        for y in 0..9 {
            s.terrain_mut().set_terrain(TilePos::new(4, y), Some(Terrain::Water));
        }
        s.place_building(TilePos::new(7, 4), "garden").unwrap();
        let mut enemy = Enemy::new(TilePos::new(0, 4), &EnemyConfig::default());

        let mut outcome = AgentOutcome::Continue;
        for _ in 0..200 {
            outcome = step(&mut enemy, &mut s, 0.1);
            if outcome != AgentOutcome::Continue {
                break;
            }
        }
        assert_eq!(outcome, AgentOutcome::Despawn(DespawnReason::Stuck));
        assert!(enemy.blocked_for() > 0.0);
    }

    #[test]
    fn dead_enemy_despawns() {
        let mut s = open_field(6, 6);
        s.place_building(TilePos::new(4, 4), "garden").unwrap();
        let mut enemy = Enemy::new(TilePos::new(0, 0), &EnemyConfig::default());
        enemy.take_damage(1000.0);
        assert_eq!(
            step(&mut enemy, &mut s, 0.1),
            AgentOutcome::Despawn(DespawnReason::Killed)
        );
    }

    #[test]
    fn no_buildings_means_no_target() {
        let mut s = open_field(6, 6);
        let mut enemy = Enemy::new(TilePos::new(0, 0), &EnemyConfig::default());
        assert_eq!(
            step(&mut enemy, &mut s, 0.1),
            AgentOutcome::Despawn(DespawnReason::NoTarget)
        );
    }
}
