//! Building slots around each team's base.
//!
//! Every base has a fixed set of slots on two rings. Slots open up as the
//! base is upgraded. A building can only be placed on a free, unlocked slot
//! and its footprint must not overlap any other standing building.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::entity_kind::BuildingKind;
use crate::error::PlacementError;
use crate::math::{fx, Fixed, Vec2Fixed};
use crate::simulation::Simulation;
use crate::team::Team;

/// How far from a slot a requested position may be and still snap to it.
pub const SNAP_DISTANCE: i32 = 48;

/// Slot offsets (forward, lateral) and the upgrade level that unlocks them.
/// Forward points toward the middle of the map.
const SLOTS: [(i32, i32, u8); 12] = [
    // Inner ring.
    (160, 0, 0),
    (80, 139, 0),
    (80, -139, 0),
    (-80, 139, 0),
    (-80, -139, 1),
    (-160, 0, 1),
    // Outer ring.
    (260, 70, 1),
    (260, -70, 1),
    (170, 210, 2),
    (170, -210, 2),
    (0, 280, 2),
    (0, -280, 2),
];

/// One slot in a base layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingSpot {
    /// Footprint center for a building on this slot.
    pub position: Vec2Fixed,
    /// Base upgrade level needed to use the slot.
    pub unlock_level: u8,
    /// Building standing on the slot (non-owning).
    pub occupant: Option<EntityId>,
}

impl BuildingSpot {
    /// Whether the slot holds a building.
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }
}

/// The slots around one team's base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseLayout {
    team: Team,
    center: Vec2Fixed,
    upgrade_level: u8,
    spots: Vec<BuildingSpot>,
}

impl BaseLayout {
    /// Lay out the slots around a base at `center`.
    #[must_use]
    pub fn new(team: Team, center: Vec2Fixed) -> Self {
        let forward = match team {
            Team::Player => 1,
            Team::Enemy => -1,
        };
        let spots = SLOTS
            .iter()
            .map(|&(dx, dy, unlock_level)| BuildingSpot {
                position: center + Vec2Fixed::from_ints(dx * forward, dy),
                unlock_level,
                occupant: None,
            })
            .collect();
        Self {
            team,
            center,
            upgrade_level: 0,
            spots,
        }
    }

    /// Owning team.
    #[must_use]
    pub const fn team(&self) -> Team {
        self.team
    }

    /// Base center.
    #[must_use]
    pub const fn center(&self) -> Vec2Fixed {
        self.center
    }

    /// Current upgrade level.
    #[must_use]
    pub const fn upgrade_level(&self) -> u8 {
        self.upgrade_level
    }

    /// All slots.
    #[must_use]
    pub fn spots(&self) -> &[BuildingSpot] {
        &self.spots
    }

    /// Slots usable at the current level that are still free.
    pub fn free_spots(&self) -> impl Iterator<Item = (usize, &BuildingSpot)> {
        self.spots
            .iter()
            .enumerate()
            .filter(|(_, spot)| spot.unlock_level <= self.upgrade_level && !spot.is_occupied())
    }

    /// Raise the upgrade level by one, up to `max_level`.
    pub fn upgrade(&mut self, max_level: u8) -> Option<u8> {
        if self.upgrade_level >= max_level {
            return None;
        }
        self.upgrade_level += 1;
        Some(self.upgrade_level)
    }

    /// Slot nearest to `position` within snapping distance.
    #[must_use]
    pub fn spot_near(&self, position: Vec2Fixed) -> Option<usize> {
        let snap_sq = fx(SNAP_DISTANCE) * fx(SNAP_DISTANCE);
        self.spots
            .iter()
            .enumerate()
            .map(|(index, spot)| (index, spot.position.distance_squared(position)))
            .filter(|(_, distance)| *distance <= snap_sq)
            .min_by_key(|(index, distance)| (*distance, *index))
            .map(|(index, _)| index)
    }

    /// Check whether `kind` can be placed at `position`.
    ///
    /// Returns the slot the building would occupy.
    pub fn validate(
        &self,
        kind: BuildingKind,
        position: Vec2Fixed,
        base_range: Fixed,
        sim: &Simulation,
    ) -> Result<usize, PlacementError> {
        if !kind.stats().placeable {
            return Err(PlacementError::NotPlaceable(kind));
        }
        let Some(index) = self.spot_near(position) else {
            if position.distance_squared(self.center) > base_range.saturating_mul(base_range) {
                return Err(PlacementError::OutOfBaseRange);
            }
            return Err(PlacementError::NoBuildingSpot);
        };
        let spot = &self.spots[index];
        if spot.position.distance_squared(self.center) > base_range.saturating_mul(base_range) {
            return Err(PlacementError::OutOfBaseRange);
        }
        if spot.unlock_level > self.upgrade_level {
            return Err(PlacementError::SpotLocked(index));
        }
        if spot.is_occupied() {
            return Err(PlacementError::SpotOccupied(index));
        }

        let half = kind.stats().size / fx(2);
        for entity in sim.entities().iter() {
            if entity.is_dead() {
                continue;
            }
            let Some(other) = entity.as_building() else {
                continue;
            };
            let reach = half + other.size / fx(2);
            let delta = entity.position - spot.position;
            if delta.x.abs() < reach && delta.y.abs() < reach {
                return Err(PlacementError::Overlap(entity.id.clone()));
            }
        }
        Ok(index)
    }

    /// Mark slot `index` as held by `building`.
    pub fn occupy(&mut self, index: usize, building: EntityId) {
        if let Some(spot) = self.spots.get_mut(index) {
            spot.occupant = Some(building);
        }
    }

    /// Free whichever slot `building` holds. Returns the slot index.
    pub fn release(&mut self, building: &EntityId) -> Option<usize> {
        let index = self
            .spots
            .iter()
            .position(|spot| spot.occupant.as_ref() == Some(building))?;
        self.spots[index].occupant = None;
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;

    fn setup() -> (BaseLayout, Simulation) {
        let center = Vec2Fixed::from_ints(300, 800);
        let mut sim = Simulation::new(Vec2Fixed::from_ints(2400, 1600));
        let base = Entity::completed_building(Team::Player, BuildingKind::Base, center);
        sim.add_entity(base.with_id("player-base")).unwrap();
        (BaseLayout::new(Team::Player, center), sim)
    }

    #[test]
    fn test_enemy_layout_is_mirrored() {
        let layout = BaseLayout::new(Team::Enemy, Vec2Fixed::from_ints(2100, 800));
        assert_eq!(layout.spots()[0].position, Vec2Fixed::from_ints(1940, 800));
    }

    #[test]
    fn test_valid_placement_snaps_to_spot() {
        let (layout, sim) = setup();
        let spot = layout
            .validate(BuildingKind::SupplyDepot, Vec2Fixed::from_ints(470, 810), fx(360), &sim)
            .unwrap();
        assert_eq!(spot, 0);
    }

    #[test]
    fn test_placement_errors() {
        let (mut layout, mut sim) = setup();
        let range = fx(360);

        assert_eq!(
            layout.validate(BuildingKind::Base, Vec2Fixed::from_ints(460, 800), range, &sim),
            Err(PlacementError::NotPlaceable(BuildingKind::Base))
        );
        assert_eq!(
            layout.validate(BuildingKind::Reactor, Vec2Fixed::from_ints(1200, 800), range, &sim),
            Err(PlacementError::OutOfBaseRange)
        );
        assert_eq!(
            layout.validate(BuildingKind::Reactor, Vec2Fixed::from_ints(390, 800), range, &sim),
            Err(PlacementError::NoBuildingSpot)
        );
        assert_eq!(
            layout.validate(BuildingKind::Reactor, Vec2Fixed::from_ints(140, 800), range, &sim),
            Err(PlacementError::SpotLocked(5))
        );

        layout.occupy(0, EntityId::from("depot"));
        assert_eq!(
            layout.validate(BuildingKind::Reactor, Vec2Fixed::from_ints(460, 800), range, &sim),
            Err(PlacementError::SpotOccupied(0))
        );

        sim.add_entity(
            Entity::completed_building(
                Team::Enemy,
                BuildingKind::Generic,
                Vec2Fixed::from_ints(380, 660),
            )
            .with_id("blocker"),
        )
        .unwrap();
        assert_eq!(
            layout.validate(BuildingKind::Reactor, Vec2Fixed::from_ints(380, 939), range, &sim),
            Ok(1)
        );
        assert_eq!(
            layout.validate(BuildingKind::Reactor, Vec2Fixed::from_ints(380, 661), range, &sim),
            Err(PlacementError::Overlap(EntityId::from("blocker")))
        );
    }

    #[test]
    fn test_upgrade_unlocks_more_spots() {
        let (mut layout, _) = setup();
        assert_eq!(layout.free_spots().count(), 4);
        assert_eq!(layout.upgrade(2), Some(1));
        assert_eq!(layout.free_spots().count(), 8);
        assert_eq!(layout.upgrade(2), Some(2));
        assert_eq!(layout.upgrade(2), None);
        assert_eq!(layout.free_spots().count(), 12);
    }

    #[test]
    fn test_release_frees_spot() {
        let (mut layout, _) = setup();
        layout.occupy(3, EntityId::from("b"));
        assert_eq!(layout.release(&EntityId::from("b")), Some(3));
        assert!(!layout.spots()[3].is_occupied());
    }
}
