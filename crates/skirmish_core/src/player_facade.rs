//! Unified player interface for AI and human input.
//!
//! Both the AI controller and the input layer drive the world through the
//! [`PlayerFacade`] trait, so the AI can do exactly what a player can and
//! nothing more. Every order is a [`PlayerCommand`] and is validated by
//! [`GameWorld::issue`] before it touches the simulation.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, UnitState};
use crate::entity_kind::{BuildingKind, UnitKind};
use crate::error::Result;
use crate::events::WorldEvent;
use crate::math::Vec2Fixed;
use crate::team::Team;
use crate::world::GameWorld;

/// An order a player can give.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerCommand {
    /// Move units to a point.
    Move {
        /// Units to move.
        units: Vec<EntityId>,
        /// Where to go.
        destination: Vec2Fixed,
    },
    /// Move units to a point, engaging enemies on the way.
    AttackMove {
        /// Units to move.
        units: Vec<EntityId>,
        /// Where to go.
        destination: Vec2Fixed,
    },
    /// Attack a specific enemy.
    Attack {
        /// Attacking units.
        units: Vec<EntityId>,
        /// Enemy to attack.
        target: EntityId,
    },
    /// Halt units in place.
    Stop {
        /// Units to stop.
        units: Vec<EntityId>,
    },
    /// Place a building on a base slot.
    Build {
        /// Building type.
        kind: BuildingKind,
        /// Requested position; snaps to the nearest slot.
        position: Vec2Fixed,
    },
    /// Cancel a building that is queued or under construction.
    CancelConstruction {
        /// Building to cancel.
        building: EntityId,
    },
    /// Queue a unit at a production building.
    Produce {
        /// Producing building.
        building: EntityId,
        /// Unit type.
        unit_kind: UnitKind,
    },
    /// Unlock the next ring of base slots.
    UpgradeBase,
}

/// What a player knows about one of their units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitInfo {
    /// Entity id.
    pub id: EntityId,
    /// Unit type.
    pub kind: UnitKind,
    /// Current position.
    pub position: Vec2Fixed,
    /// Behavior state.
    pub state: UnitState,
    /// Current health.
    pub health: u32,
}

/// What a player knows about one of their buildings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingInfo {
    /// Entity id.
    pub id: EntityId,
    /// Building type.
    pub kind: BuildingKind,
    /// Footprint center.
    pub position: Vec2Fixed,
    /// Still being built.
    pub under_construction: bool,
    /// Producing or with units queued.
    pub busy: bool,
}

/// An enemy entity on the battlefield.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleEnemy {
    /// Entity id.
    pub id: EntityId,
    /// Current position.
    pub position: Vec2Fixed,
    /// Whether this is a unit rather than a building.
    pub is_unit: bool,
    /// Whether this is the enemy base.
    pub is_base: bool,
}

/// Snapshot of a team's resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSnapshot {
    /// Whole supplies.
    pub supplies: u32,
    /// Power.
    pub power: u32,
    /// Population in use.
    pub population: u32,
    /// Population cap.
    pub max_population: u32,
}

/// What a player (human or AI) can see and do.
///
/// The battlefield has no fog of war, so every enemy is visible.
pub trait PlayerFacade {
    /// The team this facade controls.
    fn team(&self) -> Team;

    /// Current match time.
    fn now_ms(&self) -> u64;

    /// Issue an order.
    ///
    /// # Errors
    /// Returns an error if the order is invalid, unaffordable or refers to
    /// entities the team does not own.
    fn issue(&mut self, command: PlayerCommand) -> Result<()>;

    /// All of this team's live units.
    fn own_units(&self) -> Vec<UnitInfo>;

    /// All of this team's live buildings.
    fn own_buildings(&self) -> Vec<BuildingInfo>;

    /// All live enemy entities.
    fn visible_enemies(&self) -> Vec<VisibleEnemy>;

    /// Current resources.
    fn resources(&self) -> ResourceSnapshot;

    /// Positions of base slots currently open for building.
    fn free_building_spots(&self) -> Vec<Vec2Fixed>;

    /// This team's base position.
    fn base_position(&self) -> Vec2Fixed;
}

/// A [`PlayerFacade`] over one team of a [`GameWorld`].
///
/// Collects the events produced by accepted orders so the caller can forward
/// them (for example to the multiplayer layer).
pub struct TeamView<'a> {
    world: &'a mut GameWorld,
    team: Team,
    now_ms: u64,
    events: Vec<WorldEvent>,
}

impl<'a> TeamView<'a> {
    /// View `world` as `team` at `now_ms`.
    pub fn new(world: &'a mut GameWorld, team: Team, now_ms: u64) -> Self {
        Self {
            world,
            team,
            now_ms,
            events: Vec::new(),
        }
    }

    /// Events produced by the orders issued so far.
    #[must_use]
    pub fn into_events(self) -> Vec<WorldEvent> {
        self.events
    }
}

impl PlayerFacade for TeamView<'_> {
    fn team(&self) -> Team {
        self.team
    }

    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn issue(&mut self, command: PlayerCommand) -> Result<()> {
        let events = self.world.issue(self.team, command, self.now_ms)?;
        self.events.extend(events);
        Ok(())
    }

    fn own_units(&self) -> Vec<UnitInfo> {
        self.world
            .sim()
            .entities()
            .iter()
            .filter(|entity| entity.team == self.team && !entity.is_dead())
            .filter_map(|entity| {
                entity.as_unit().map(|unit| UnitInfo {
                    id: entity.id.clone(),
                    kind: unit.unit_kind,
                    position: entity.position,
                    state: unit.state,
                    health: entity.health.current,
                })
            })
            .collect()
    }

    fn own_buildings(&self) -> Vec<BuildingInfo> {
        self.world
            .sim()
            .entities()
            .iter()
            .filter(|entity| entity.team == self.team && !entity.is_dead())
            .filter_map(|entity| {
                entity.as_building().map(|building| BuildingInfo {
                    id: entity.id.clone(),
                    kind: building.building_kind,
                    position: entity.position,
                    under_construction: building.under_construction,
                    busy: building.is_producing() || !building.production_queue.is_empty(),
                })
            })
            .collect()
    }

    fn visible_enemies(&self) -> Vec<VisibleEnemy> {
        self.world
            .sim()
            .entities()
            .iter()
            .filter(|entity| entity.team != self.team && !entity.is_dead())
            .map(|entity| VisibleEnemy {
                id: entity.id.clone(),
                position: entity.position,
                is_unit: entity.is_unit(),
                is_base: entity.entity_type().is_building(BuildingKind::Base),
            })
            .collect()
    }

    fn resources(&self) -> ResourceSnapshot {
        let ledger = self.world.ledger(self.team);
        ResourceSnapshot {
            supplies: ledger.supplies(),
            power: ledger.power(),
            population: ledger.current_population(),
            max_population: ledger.max_population(),
        }
    }

    fn free_building_spots(&self) -> Vec<Vec2Fixed> {
        self.world
            .layout(self.team)
            .free_spots()
            .map(|(_, spot)| spot.position)
            .collect()
    }

    fn base_position(&self) -> Vec2Fixed {
        self.world.layout(self.team).center()
    }
}
