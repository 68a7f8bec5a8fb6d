//! Test fixtures and helpers.
//!
//! Pre-built worlds and entity placement for consistent testing.

use fixed::types::I32F32;
use skirmish_core::combat::Authority;
use skirmish_core::components::EntityId;
use skirmish_core::config::GameConfig;
use skirmish_core::entity::Entity;
use skirmish_core::entity_kind::{BuildingKind, UnitKind};
use skirmish_core::math::Vec2Fixed;
use skirmish_core::team::Team;
use skirmish_core::world::GameWorld;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Shorthand for an integer position.
#[must_use]
pub fn pos(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// A fresh single-player match with the default configuration.
#[must_use]
pub fn match_world() -> GameWorld {
    GameWorld::new_match(GameConfig::default())
}

/// A fresh match as seen by the peer playing `team`.
#[must_use]
pub fn peer_world(team: Team) -> GameWorld {
    peer_world_with(GameConfig::default(), team)
}

/// A fresh match for the peer playing `team`, with a custom configuration.
#[must_use]
pub fn peer_world_with(config: GameConfig, team: Team) -> GameWorld {
    let mut world = GameWorld::new_match(config);
    world.configure_peer(Authority::Peer { local_team: team }, team.as_str());
    world
}

/// An empty battlefield: no bases, no units.
#[must_use]
pub fn empty_world() -> GameWorld {
    GameWorld::empty(GameConfig::default())
}

/// Place a unit and return its id.
///
/// # Panics
///
/// Panics if the entity cannot be added.
pub fn spawn_unit(
    world: &mut GameWorld,
    team: Team,
    kind: UnitKind,
    position: Vec2Fixed,
) -> EntityId {
    world
        .sim_mut()
        .add_entity(Entity::unit(team, kind, position))
        .expect("unit should be added")
}

/// Place a unit under a chosen id, as a remote peer would have named it.
///
/// # Panics
///
/// Panics if the id is already in use.
pub fn spawn_unit_with_id(
    world: &mut GameWorld,
    id: &str,
    team: Team,
    kind: UnitKind,
    position: Vec2Fixed,
) -> EntityId {
    world
        .sim_mut()
        .add_entity(Entity::unit(team, kind, position).with_id(id))
        .expect("unit should be added")
}

/// Place a finished building and return its id.
///
/// # Panics
///
/// Panics if the entity cannot be added.
pub fn spawn_building(
    world: &mut GameWorld,
    team: Team,
    kind: BuildingKind,
    position: Vec2Fixed,
) -> EntityId {
    world
        .sim_mut()
        .add_entity(Entity::completed_building(team, kind, position))
        .expect("building should be added")
}

/// Position of slot `index` of `team`'s base.
///
/// # Panics
///
/// Panics if the slot does not exist.
#[must_use]
pub fn spot(world: &GameWorld, team: Team, index: usize) -> Vec2Fixed {
    world.layout(team).spots()[index].position
}

/// Current health of an entity, or `None` once it is gone.
#[must_use]
pub fn health_of(world: &GameWorld, id: &EntityId) -> Option<u32> {
    world.sim().get_entity(id).map(|entity| entity.health.current)
}
