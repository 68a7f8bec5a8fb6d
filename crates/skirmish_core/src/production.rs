//! Rally point search for produced units.

use crate::math::{fx, Fixed, Vec2Fixed};
use crate::systems::Obstacle;

/// Gap between a building's footprint and its nominal rally point.
pub const RALLY_GAP: i32 = 12;

/// Number of rings searched around the nominal rally point.
pub const RALLY_RINGS: i32 = 4;

/// Spacing added between neighboring candidate bodies on a ring.
const RING_PADDING: i32 = 6;

/// Integer headings, counter-clockwise from straight down.
const HEADINGS: [(i32, i32); 16] = [
    (0, 1),
    (1, 2),
    (1, 1),
    (2, 1),
    (1, 0),
    (2, -1),
    (1, -1),
    (1, -2),
    (0, -1),
    (-1, -2),
    (-1, -1),
    (-2, -1),
    (-1, 0),
    (-2, 1),
    (-1, 1),
    (-1, 2),
];

/// A unit body occupying space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Body {
    /// Center.
    pub position: Vec2Fixed,
    /// Radius.
    pub radius: Fixed,
}

/// Spot just below a building where its output appears by default.
#[must_use]
pub fn nominal_rally_point(
    building_position: Vec2Fixed,
    building_size: Fixed,
    unit_radius: Fixed,
) -> Vec2Fixed {
    let offset = building_size / fx(2) + unit_radius + fx(RALLY_GAP);
    building_position + Vec2Fixed::new(Fixed::ZERO, offset)
}

/// Find where a freshly produced unit should appear.
///
/// Searches concentric rings outward from the nominal rally point for the
/// first position that is inside the world, clear of other units and clear
/// of buildings. Falls back to the nominal point when every candidate fails.
#[must_use]
pub fn find_rally_point(
    building_position: Vec2Fixed,
    building_size: Fixed,
    unit_radius: Fixed,
    world_size: Vec2Fixed,
    bodies: &[Body],
    obstacles: &[Obstacle],
) -> Vec2Fixed {
    let nominal = nominal_rally_point(building_position, building_size, unit_radius);
    let is_clear = |candidate: Vec2Fixed| {
        in_world(candidate, unit_radius, world_size)
            && bodies.iter().all(|body| {
                let min = body.radius + unit_radius;
                candidate.distance_squared(body.position) >= min * min
            })
            && obstacles
                .iter()
                .all(|obstacle| !obstacle.contains_inflated(candidate, unit_radius))
    };

    if is_clear(nominal) {
        return nominal;
    }

    let spacing = unit_radius * fx(2) + fx(RING_PADDING);
    for ring in 1..=RALLY_RINGS {
        let distance = spacing * fx(ring);
        for (dx, dy) in HEADINGS {
            let heading = Vec2Fixed::from_ints(dx, dy).normalize();
            let candidate = nominal + heading.scale(distance);
            if is_clear(candidate) {
                return candidate;
            }
        }
    }

    nominal
}

fn in_world(point: Vec2Fixed, radius: Fixed, world_size: Vec2Fixed) -> bool {
    point.x >= radius
        && point.y >= radius
        && point.x <= world_size.x - radius
        && point.y <= world_size.y - radius
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> Vec2Fixed {
        Vec2Fixed::from_ints(2400, 1600)
    }

    fn rally(x: i32, y: i32, bodies: &[Body], obstacles: &[Obstacle]) -> Vec2Fixed {
        find_rally_point(Vec2Fixed::from_ints(x, y), fx(90), fx(10), world(), bodies, obstacles)
    }

    #[test]
    fn test_nominal_when_clear() {
        let point = rally(500, 500, &[], &[]);
        assert_eq!(point, Vec2Fixed::from_ints(500, 567));
    }

    #[test]
    fn test_skips_occupied_nominal() {
        let blocker = Body {
            position: Vec2Fixed::from_ints(500, 567),
            radius: fx(10),
        };
        let point = rally(500, 500, &[blocker], &[]);
        assert_ne!(point, Vec2Fixed::from_ints(500, 567));
        assert!(point.distance(blocker.position) >= fx(20) - fx(1) / fx(100));
    }

    #[test]
    fn test_falls_back_when_everything_blocked() {
        let wall = Obstacle {
            center: Vec2Fixed::from_ints(500, 567),
            half_extent: fx(500),
        };
        let point = rally(500, 500, &[], &[wall]);
        assert_eq!(point, Vec2Fixed::from_ints(500, 567));
    }

    #[test]
    fn test_stays_inside_world() {
        let point = rally(300, 1560, &[], &[]);
        assert!(point.y <= fx(1590));
    }
}
