//! Tower fire control.
//!
//! Every staffed tower whose cooldown has elapsed fires one projectile at
//! the nearest living enemy within range of its centre. Towers without a
//! target in range keep their cooldown at zero and fire as soon as one
//! appears.

use tracing::debug;

use crate::agents::{Agent, Projectile};
use crate::scheduler::AgentScheduler;
use crate::settlement::Settlement;

/// Fire every ready tower. Returns the projectiles to hand to the
/// scheduler.
pub fn fire_towers(settlement: &mut Settlement, scheduler: &AgentScheduler) -> Vec<Agent> {
    let mut shots = Vec::new();
    for tower in settlement.buildings_mut().values_mut() {
        let Some(profile) = tower.kind.tower.clone() else {
            continue;
        };
        if tower.collapsed || !tower.is_staffed() || tower.tower_cooldown > 0.0 {
            continue;
        }
        let origin = tower.center_point();
        let target = scheduler
            .enemies()
            .filter(|(_, enemy)| !enemy.is_dead())
            .map(|(id, enemy)| (enemy.position.distance_to(origin), id))
            .filter(|(distance, _)| *distance <= profile.range)
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, id)| id);
        let Some(target) = target else {
            continue;
        };

        tower.tower_cooldown = profile.cooldown;
        debug!(tower_id = %tower.id, target_id = %target, "tower fired");
        shots.push(Agent::Projectile(Projectile::new(
            origin,
            target,
            profile.damage,
            profile.projectile_speed,
        )));
    }
    shots
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use colonia_types::{AgentId, BuildingId, TilePos};
    use colonia_world::{TerrainField, default_catalog};

    use super::*;
    use crate::agents::Enemy;
    use crate::config::EnemyConfig;

    fn fort() -> (Settlement, BuildingId) {
        let mut s = Settlement::new(
            TerrainField::new(16, 8).unwrap(),
            default_catalog().unwrap(),
        );
        for x in 0..16 {
            s.place_road(TilePos::new(x, 4)).unwrap();
        }
        let tower = s.place_building(TilePos::new(2, 3), "tower").unwrap();
        s.building_mut(tower).unwrap().workers = 2;
        (s, tower)
    }

    fn enemy_at(scheduler: &mut AgentScheduler, x: i32, y: i32) -> AgentId {
        scheduler.spawn(Agent::Enemy(Enemy::new(TilePos::new(x, y), &EnemyConfig::default())))
    }

    #[test]
    fn tower_targets_nearest_enemy_in_range() {
        let (mut s, tower) = fort();
        let mut scheduler = AgentScheduler::new();
        let far = enemy_at(&mut scheduler, 6, 3);
        let near = enemy_at(&mut scheduler, 4, 3);
        enemy_at(&mut scheduler, 14, 3);

        let shots = fire_towers(&mut s, &scheduler);

        let targets: Vec<AgentId> = shots
            .iter()
            .filter_map(|agent| match agent {
                Agent::Projectile(shot) => Some(shot.target),
                _ => None,
            })
            .collect();
        assert_eq!(targets, vec![near]);
        assert!(!targets.contains(&far));
        assert!((s.building(tower).unwrap().tower_cooldown - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn tower_waits_for_cooldown() {
        let (mut s, tower) = fort();
        let mut scheduler = AgentScheduler::new();
        enemy_at(&mut scheduler, 4, 3);

        assert_eq!(fire_towers(&mut s, &scheduler).len(), 1);
        assert!(fire_towers(&mut s, &scheduler).is_empty());

        s.building_mut(tower).unwrap().tower_cooldown = 0.0;
        assert_eq!(fire_towers(&mut s, &scheduler).len(), 1);
    }

    #[test]
    fn unstaffed_tower_holds_fire() {
        let (mut s, tower) = fort();
        s.building_mut(tower).unwrap().workers = 0;
        let mut scheduler = AgentScheduler::new();
        enemy_at(&mut scheduler, 3, 3);

        assert!(fire_towers(&mut s, &scheduler).is_empty());
    }

    #[test]
    fn out_of_range_enemies_are_ignored() {
        let (mut s, tower) = fort();
        let mut scheduler = AgentScheduler::new();
        enemy_at(&mut scheduler, 12, 3);

        assert!(fire_towers(&mut s, &scheduler).is_empty());
        assert!(s.building(tower).unwrap().tower_cooldown.abs() < f32::EPSILON);
    }
}
