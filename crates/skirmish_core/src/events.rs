//! Events produced by the simulation and the match world.
//!
//! The game layer uses these for effects and UI; the multiplayer layer maps
//! the ones about locally owned entities onto outbound actions.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::entity_kind::{BuildingKind, EntityType, UnitKind};
use crate::math::Vec2Fixed;
use crate::team::Team;

/// What dealt a hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageSource {
    /// A unit's weapon.
    Unit(EntityId),
    /// A turret's weapon.
    Turret(EntityId),
}

/// Something observable that happened in the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldEvent {
    /// A unit was ordered to move.
    UnitMoved {
        /// Moving unit.
        unit: EntityId,
        /// Owner.
        team: Team,
        /// Where it is going.
        destination: Vec2Fixed,
    },
    /// A unit was ordered to attack-move.
    AttackMoveOrdered {
        /// Moving unit.
        unit: EntityId,
        /// Owner.
        team: Team,
        /// Where it is going.
        destination: Vec2Fixed,
    },
    /// A unit started attacking, by order or on sight.
    AttackStarted {
        /// Attacking unit.
        attacker: EntityId,
        /// Its target.
        target: EntityId,
        /// Attacker's team.
        team: Team,
    },
    /// A unit fired its weapon.
    AttackPerformed {
        /// Attacking unit.
        attacker: EntityId,
        /// Its target.
        target: EntityId,
        /// Attacker's team.
        team: Team,
        /// Shot time.
        at_ms: u64,
    },
    /// Health was taken from an entity.
    Damaged {
        /// Who dealt it.
        source: DamageSource,
        /// Who took it.
        target: EntityId,
        /// Owner of the target.
        target_team: Team,
        /// Damage dealt.
        amount: u32,
        /// Health after the hit.
        new_health: u32,
    },
    /// An entity died and was purged.
    Died {
        /// The dead entity.
        entity: EntityId,
        /// Its owner.
        team: Team,
        /// What it was.
        entity_type: EntityType,
    },
    /// A turret picked a new target.
    TurretTargetAcquired {
        /// The turret.
        turret: EntityId,
        /// Its target.
        target: EntityId,
        /// Turret owner.
        team: Team,
    },
    /// A turret shot landed.
    TurretFired {
        /// The turret.
        turret: EntityId,
        /// Its target.
        target: EntityId,
        /// Turret owner.
        team: Team,
        /// Damage dealt.
        damage: u32,
        /// Owner of the target.
        target_team: Team,
        /// Shot time.
        at_ms: u64,
    },
    /// A building was placed and its construction started immediately.
    BuildingPlaced {
        /// The building.
        building: EntityId,
        /// Owner.
        team: Team,
        /// Building type.
        kind: BuildingKind,
        /// Footprint center.
        position: Vec2Fixed,
    },
    /// A building was placed behind another construction.
    BuildingQueued {
        /// The building.
        building: EntityId,
        /// Owner.
        team: Team,
        /// Building type.
        kind: BuildingKind,
        /// Footprint center.
        position: Vec2Fixed,
    },
    /// A queued building started construction.
    ConstructionStarted {
        /// The building.
        building: EntityId,
        /// Owner.
        team: Team,
        /// Building type.
        kind: BuildingKind,
        /// Footprint center.
        position: Vec2Fixed,
    },
    /// A building finished construction.
    ConstructionCompleted {
        /// The building.
        building: EntityId,
        /// Owner.
        team: Team,
        /// Building type.
        kind: BuildingKind,
    },
    /// A construction was cancelled and refunded.
    ConstructionCancelled {
        /// The building.
        building: EntityId,
        /// Owner.
        team: Team,
        /// Supplies returned.
        refund: u32,
    },
    /// A unit was added to a production queue.
    ProductionQueued {
        /// Producing building.
        building: EntityId,
        /// Owner.
        team: Team,
        /// Queued unit type.
        unit_kind: UnitKind,
    },
    /// A produced unit appeared at its rally point.
    UnitSpawned {
        /// The new unit.
        unit: EntityId,
        /// Owner.
        team: Team,
        /// Unit type.
        unit_kind: UnitKind,
        /// Spawn position.
        position: Vec2Fixed,
        /// Producing building.
        building: EntityId,
    },
    /// A team upgraded its base layout.
    BaseUpgraded {
        /// Owner.
        team: Team,
        /// New upgrade level.
        level: u8,
    },
    /// The match is decided.
    GameOver {
        /// Winning team.
        winner: Team,
    },
}

impl WorldEvent {
    /// Team on whose behalf this event happened, if any.
    ///
    /// For damage this is the target's owner, which is the team that holds
    /// authority over the resulting health.
    #[must_use]
    pub fn team(&self) -> Option<Team> {
        match self {
            Self::UnitMoved { team, .. }
            | Self::AttackMoveOrdered { team, .. }
            | Self::AttackStarted { team, .. }
            | Self::AttackPerformed { team, .. }
            | Self::Died { team, .. }
            | Self::TurretTargetAcquired { team, .. }
            | Self::TurretFired { team, .. }
            | Self::BuildingPlaced { team, .. }
            | Self::BuildingQueued { team, .. }
            | Self::ConstructionStarted { team, .. }
            | Self::ConstructionCompleted { team, .. }
            | Self::ConstructionCancelled { team, .. }
            | Self::ProductionQueued { team, .. }
            | Self::UnitSpawned { team, .. }
            | Self::BaseUpgraded { team, .. } => Some(*team),
            Self::Damaged { target_team, .. } => Some(*target_team),
            Self::GameOver { .. } => None,
        }
    }
}
