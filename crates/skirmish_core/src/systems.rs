//! Movement and building-avoidance steering.
//!
//! Systems here are pure functions over copied state so both peers get the
//! same answer for the same inputs. The simulation gathers the inputs,
//! calls in, and writes the results back.

use crate::math::{fx, Fixed, Vec2Fixed};

/// Distance at which a unit counts as having arrived.
pub const ARRIVAL_THRESHOLD: i32 = 6;

/// How far ahead of its body a unit looks for buildings in the way.
pub const LOOKAHEAD_DISTANCE: i32 = 24;

/// Extra clearance kept around building footprints.
pub const AVOIDANCE_MARGIN: i32 = 4;

/// A square building footprint that units steer around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Obstacle {
    /// Footprint center.
    pub center: Vec2Fixed,
    /// Half the side length.
    pub half_extent: Fixed,
}

impl Obstacle {
    /// Whether `point` lies inside the footprint grown by `inflate` on every side.
    #[must_use]
    pub fn contains_inflated(&self, point: Vec2Fixed, inflate: Fixed) -> bool {
        let reach = self.half_extent + inflate;
        (point.x - self.center.x).abs() <= reach && (point.y - self.center.y).abs() <= reach
    }
}

/// Kinematic state of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Motion {
    /// Current position.
    pub position: Vec2Fixed,
    /// Current velocity.
    pub velocity: Vec2Fixed,
    /// Speed cap.
    pub max_speed: Fixed,
    /// Acceleration cap.
    pub acceleration: Fixed,
    /// Body radius.
    pub radius: Fixed,
}

/// Result of one movement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementStep {
    /// New position.
    pub position: Vec2Fixed,
    /// New velocity.
    pub velocity: Vec2Fixed,
    /// The destination was reached this step.
    pub arrived: bool,
}

/// Advance `motion` toward `destination` by `dt` seconds.
///
/// Velocity accelerates toward the desired heading, clamped to the unit's
/// acceleration and maximum speed. The heading blends the goal direction
/// with a sideways push around any building whose inflated footprint the
/// look-ahead point would enter. Buildings containing the destination are
/// ignored so units can close in on building targets. The result is clamped
/// to the world rectangle.
#[must_use]
pub fn steer(
    motion: &Motion,
    destination: Vec2Fixed,
    obstacles: &[Obstacle],
    world_size: Vec2Fixed,
    dt: Fixed,
) -> MovementStep {
    let to_goal = destination - motion.position;
    let remaining = to_goal.length();

    if remaining <= fx(ARRIVAL_THRESHOLD) {
        return MovementStep {
            position: keep_inside(destination, world_size, motion.radius),
            velocity: Vec2Fixed::ZERO,
            arrived: true,
        };
    }

    let goal_dir = to_goal.normalize();
    let lookahead = motion.position + goal_dir.scale(motion.radius + fx(LOOKAHEAD_DISTANCE));
    let inflate = motion.radius + fx(AVOIDANCE_MARGIN);

    let mut push = Vec2Fixed::ZERO;
    for obstacle in obstacles {
        if obstacle.contains_inflated(destination, inflate) {
            continue;
        }
        if obstacle.contains_inflated(lookahead, inflate) {
            let away = lookahead - obstacle.center;
            let side = goal_dir.x * away.y - goal_dir.y * away.x;
            push += if side >= Fixed::ZERO {
                Vec2Fixed::new(-goal_dir.y, goal_dir.x)
            } else {
                Vec2Fixed::new(goal_dir.y, -goal_dir.x)
            };
        }
    }

    let heading = if push.is_zero() {
        goal_dir
    } else {
        (goal_dir + push.normalize().scale(fx(3) / fx(2))).normalize()
    };
    let heading = if heading.is_zero() { goal_dir } else { heading };

    let desired = heading.scale(motion.max_speed);
    let delta = (desired - motion.velocity).clamp_length(motion.acceleration * dt);
    let velocity = (motion.velocity + delta).clamp_length(motion.max_speed);
    let step = velocity.scale(dt);

    if push.is_zero() && step.length() >= remaining {
        return MovementStep {
            position: keep_inside(destination, world_size, motion.radius),
            velocity: Vec2Fixed::ZERO,
            arrived: true,
        };
    }

    MovementStep {
        position: keep_inside(motion.position + step, world_size, motion.radius),
        velocity,
        arrived: false,
    }
}

fn keep_inside(point: Vec2Fixed, world_size: Vec2Fixed, radius: Fixed) -> Vec2Fixed {
    point.clamp_to(
        Vec2Fixed::new(radius, radius),
        Vec2Fixed::new(world_size.x - radius, world_size.y - radius),
    )
}
