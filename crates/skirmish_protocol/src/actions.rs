//! Action tags and their payloads.
//!
//! Field names are camelCase on the wire. Entity and building types travel as
//! their variant names (`"Marine"`, `"SupplyDepot"`), teams as `"player"` /
//! `"enemy"`, positions as floating-point `{x, y}`.

use serde::{Deserialize, Serialize};
use skirmish_core::components::EntityId;
use skirmish_core::entity_kind::{BuildingKind, UnitKind};
use skirmish_core::math::Vec2Fixed;
use skirmish_core::team::Team;

/// A position on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WirePoint {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl From<Vec2Fixed> for WirePoint {
    fn from(point: Vec2Fixed) -> Self {
        let (x, y) = point.to_f64();
        Self { x, y }
    }
}

impl From<WirePoint> for Vec2Fixed {
    fn from(point: WirePoint) -> Self {
        Vec2Fixed::from_f64(point.x, point.y)
    }
}

/// `unitMove` and `attackMove`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePayload {
    /// Unit being moved.
    pub unit_id: EntityId,
    /// Where it goes.
    pub destination: WirePoint,
    /// Unit's team.
    pub team: Team,
}

/// `attack`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackPayload {
    /// Attacking unit.
    pub attacker_id: EntityId,
    /// Attacked entity.
    pub target_id: EntityId,
    /// Attacker's team.
    pub team: Team,
}

/// `attackPerformed`, a visual-only echo of a shot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackPerformedPayload {
    /// Attacking unit.
    pub attacker_id: EntityId,
    /// Attacked entity.
    pub target_id: EntityId,
    /// Attacker's team.
    pub team: Team,
    /// Match time of the shot.
    pub timestamp: u64,
}

/// `unitDamage`, sent by the damaged unit's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitDamagePayload {
    /// Damaged entity.
    pub target_id: EntityId,
    /// Damage dealt.
    pub damage: u32,
    /// Health after the hit, authoritative.
    pub new_health: u32,
    /// Target's team.
    pub team: Team,
}

/// `turretDamage`, sent by the turret's owner for each shot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurretDamagePayload {
    /// Firing turret.
    pub turret_id: EntityId,
    /// Hit entity.
    pub target_id: EntityId,
    /// Damage dealt.
    pub damage: u32,
    /// Hit entity's team.
    pub target_team: Team,
    /// Match time of the shot.
    pub timestamp: u64,
}

/// `turretTarget`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurretTargetPayload {
    /// Turret.
    pub turret_id: EntityId,
    /// New target.
    pub target_id: EntityId,
    /// Turret's team.
    pub team: Team,
}

/// `turretAttack`, visual only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurretAttackPayload {
    /// Turret.
    pub turret_id: EntityId,
    /// Target.
    pub target_id: EntityId,
}

/// `buildingPlace` and `buildingQueue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingPayload {
    /// Building type.
    #[serde(rename = "type")]
    pub kind: BuildingKind,
    /// Footprint center.
    pub position: WirePoint,
    /// Owning team.
    pub team: Team,
    /// Id assigned by the placing peer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_id: Option<EntityId>,
}

/// `buildingStart`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingStartPayload {
    /// Building whose construction began.
    pub building_id: EntityId,
    /// Owning team.
    pub team: Team,
    /// Building type.
    #[serde(rename = "type")]
    pub kind: BuildingKind,
    /// Footprint center.
    pub position: WirePoint,
}

/// `buildingComplete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingCompletePayload {
    /// Finished building.
    pub building_id: EntityId,
    /// Owning team.
    pub team: Team,
}

/// `buildingCancel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingCancelPayload {
    /// Cancelled building.
    pub building_id: EntityId,
    /// Owning team.
    pub team: Team,
}

/// `unitProduce`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitProducePayload {
    /// Unit type queued.
    pub unit_type: UnitKind,
    /// Producing building.
    pub building_id: EntityId,
    /// Owning team.
    pub team: Team,
}

/// `unitSpawn`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSpawnPayload {
    /// Unit type.
    pub unit_type: UnitKind,
    /// Spawn position.
    pub position: WirePoint,
    /// Owning team.
    pub team: Team,
    /// Id assigned by the owner.
    pub unit_id: EntityId,
    /// Building that produced it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_id: Option<EntityId>,
}

/// One entry of a `positionSync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitPosition {
    /// Unit.
    pub id: EntityId,
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Unit's team.
    pub team: Team,
}

impl UnitPosition {
    /// Position as a simulation vector.
    #[must_use]
    pub fn position(&self) -> Vec2Fixed {
        Vec2Fixed::from_f64(self.x, self.y)
    }
}

/// `positionSync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSyncPayload {
    /// Every live unit of the sender's team.
    pub units: Vec<UnitPosition>,
}

/// A peer-to-peer action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum Action {
    /// Plain move order.
    UnitMove(MovePayload),
    /// Attack-move order.
    AttackMove(MovePayload),
    /// Explicit attack order.
    Attack(AttackPayload),
    /// A shot was fired.
    AttackPerformed(AttackPerformedPayload),
    /// A unit's owner applied damage to it.
    UnitDamage(UnitDamagePayload),
    /// A turret's owner resolved a shot.
    TurretDamage(TurretDamagePayload),
    /// A turret picked a target.
    TurretTarget(TurretTargetPayload),
    /// A turret fired.
    TurretAttack(TurretAttackPayload),
    /// A building was placed and started.
    BuildingPlace(BuildingPayload),
    /// A building was placed and is waiting for the construction slot.
    BuildingQueue(BuildingPayload),
    /// A queued building started construction.
    BuildingStart(BuildingStartPayload),
    /// A building finished construction.
    BuildingComplete(BuildingCompletePayload),
    /// A building's construction was cancelled.
    BuildingCancel(BuildingCancelPayload),
    /// A unit was queued for production.
    UnitProduce(UnitProducePayload),
    /// A produced unit appeared.
    UnitSpawn(UnitSpawnPayload),
    /// Periodic position correction.
    PositionSync(PositionSyncPayload),
}

impl Action {
    /// Every tag this build understands.
    pub const TAGS: [&'static str; 16] = [
        "unitMove",
        "attackMove",
        "attack",
        "attackPerformed",
        "unitDamage",
        "turretDamage",
        "turretTarget",
        "turretAttack",
        "buildingPlace",
        "buildingQueue",
        "buildingStart",
        "buildingComplete",
        "buildingCancel",
        "unitProduce",
        "unitSpawn",
        "positionSync",
    ];

    /// Wire tag.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::UnitMove(_) => "unitMove",
            Self::AttackMove(_) => "attackMove",
            Self::Attack(_) => "attack",
            Self::AttackPerformed(_) => "attackPerformed",
            Self::UnitDamage(_) => "unitDamage",
            Self::TurretDamage(_) => "turretDamage",
            Self::TurretTarget(_) => "turretTarget",
            Self::TurretAttack(_) => "turretAttack",
            Self::BuildingPlace(_) => "buildingPlace",
            Self::BuildingQueue(_) => "buildingQueue",
            Self::BuildingStart(_) => "buildingStart",
            Self::BuildingComplete(_) => "buildingComplete",
            Self::BuildingCancel(_) => "buildingCancel",
            Self::UnitProduce(_) => "unitProduce",
            Self::UnitSpawn(_) => "unitSpawn",
            Self::PositionSync(_) => "positionSync",
        }
    }

    /// Whether the action only drives visuals and changes no state.
    #[must_use]
    pub const fn is_visual_only(&self) -> bool {
        matches!(self, Self::AttackPerformed(_) | Self::TurretAttack(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_wire_shape() {
        let action = Action::UnitMove(MovePayload {
            unit_id: EntityId::from("u1"),
            destination: WirePoint { x: 100.0, y: 200.0 },
            team: Team::Enemy,
        });
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "unitMove");
        assert_eq!(json["data"]["unitId"], "u1");
        assert_eq!(json["data"]["destination"]["y"], 200.0);
        assert_eq!(json["data"]["team"], "enemy");
    }

    #[test]
    fn test_building_type_field() {
        let action = Action::BuildingQueue(BuildingPayload {
            kind: BuildingKind::SupplyDepot,
            position: WirePoint { x: 460.0, y: 800.0 },
            team: Team::Player,
            building_id: None,
        });
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["data"]["type"], "SupplyDepot");
        assert!(json["data"].get("buildingId").is_none());
    }

    #[test]
    fn test_tags_match_serde_names() {
        let action = Action::TurretDamage(TurretDamagePayload {
            turret_id: EntityId::from("t"),
            target_id: EntityId::from("u"),
            damage: 20,
            target_team: Team::Player,
            timestamp: 5,
        });
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], action.tag());
        assert!(Action::TAGS.contains(&action.tag()));
    }

    #[test]
    fn test_wire_point_conversion() {
        let point = Vec2Fixed::from_ints(300, 800);
        let wire = WirePoint::from(point);
        assert_eq!(wire, WirePoint { x: 300.0, y: 800.0 });
        assert_eq!(Vec2Fixed::from(wire), point);
    }
}
