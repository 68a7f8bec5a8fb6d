//! Comparison of two peers' worlds.
//!
//! Peers are expected to differ in transit and converge once traffic
//! settles; the headless runner and tests use this to measure how far apart
//! they are.

use serde::Serialize;
use skirmish_core::world::GameWorld;

/// How far two worlds disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Divergence {
    /// Live entities present in both worlds.
    pub shared: usize,
    /// Live entities only in the first world.
    pub only_in_first: usize,
    /// Live entities only in the second world.
    pub only_in_second: usize,
    /// Largest distance between the two copies of a unit.
    pub max_position_drift: f64,
    /// Mean distance over shared units.
    pub mean_position_drift: f64,
    /// Shared entities whose health differs.
    pub health_mismatches: usize,
}

impl Divergence {
    /// Whether the worlds hold the same entities with the same health.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.only_in_first == 0 && self.only_in_second == 0 && self.health_mismatches == 0
    }
}

/// Compare the live entities of `first` and `second`.
#[must_use]
pub fn compare(first: &GameWorld, second: &GameWorld) -> Divergence {
    let mut result = Divergence::default();
    let mut drift_total = 0.0;
    let mut drift_samples = 0_u32;

    for entity in first.sim().entities().iter().filter(|e| !e.is_dead()) {
        let Some(other) = second.sim().get_entity(&entity.id).filter(|e| !e.is_dead()) else {
            result.only_in_first += 1;
            continue;
        };
        result.shared += 1;
        if entity.health.current != other.health.current {
            result.health_mismatches += 1;
        }
        if entity.is_unit() {
            let drift = entity.position.distance(other.position).to_num::<f64>();
            result.max_position_drift = result.max_position_drift.max(drift);
            drift_total += drift;
            drift_samples += 1;
        }
    }

    result.only_in_second = second
        .sim()
        .entities()
        .iter()
        .filter(|e| {
            !e.is_dead() && first.sim().get_entity(&e.id).filter(|f| !f.is_dead()).is_none()
        })
        .count();
    if drift_samples > 0 {
        result.mean_position_drift = drift_total / f64::from(drift_samples);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::config::GameConfig;
    use skirmish_core::math::Vec2Fixed;
    use skirmish_core::team::Team;
    use skirmish_core::world::starting_marine_id;

    #[test]
    fn test_identical_worlds_agree() {
        let a = GameWorld::new_match(GameConfig::default());
        let b = a.clone();
        let divergence = compare(&a, &b);
        assert!(divergence.is_consistent());
        assert_eq!(divergence.max_position_drift, 0.0);
        assert_eq!(divergence.shared, a.sim().entities().len());
    }

    #[test]
    fn test_drift_and_health_are_measured() {
        let a = GameWorld::new_match(GameConfig::default());
        let mut b = a.clone();
        let marine = starting_marine_id(Team::Enemy, 1);
        let entity = b.sim_mut().get_entity_mut(&marine).unwrap();
        entity.position = entity.position + Vec2Fixed::from_ints(30, 40);
        entity.set_health(10);
        b.sim_mut().remove_entity(&starting_marine_id(Team::Player, 2));

        let divergence = compare(&a, &b);
        assert!((divergence.max_position_drift - 50.0).abs() < 1e-3);
        assert_eq!(divergence.health_mismatches, 1);
        assert_eq!(divergence.only_in_first, 1);
        assert_eq!(divergence.only_in_second, 0);
        assert!(!divergence.is_consistent());
    }
}
