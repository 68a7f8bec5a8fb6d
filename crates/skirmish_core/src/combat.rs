//! Target acquisition and damage authority.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::entity::Entity;
use crate::math::{Fixed, Vec2Fixed};
use crate::team::Team;

/// Which peer's simulation decides a team's state.
///
/// In a single-player match the local simulation decides everything. In a
/// multiplayer match each peer is authoritative for its own team only: it
/// applies unit damage only to its own entities and completes its own
/// construction and production. Turret damage is the exception and is
/// applied by whichever simulation resolves the shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Authority {
    /// Single player.
    #[default]
    Local,
    /// One of two reconciling peers.
    Peer {
        /// The team this peer controls.
        local_team: Team,
    },
}

impl Authority {
    /// Whether this simulation decides state transitions for `team`.
    #[must_use]
    pub fn owns(self, team: Team) -> bool {
        match self {
            Self::Local => true,
            Self::Peer { local_team } => local_team == team,
        }
    }

    /// Whether a unit's hit on an entity of `target_team` changes health here.
    #[must_use]
    pub fn applies_unit_damage(self, target_team: Team) -> bool {
        self.owns(target_team)
    }

    /// The team played by this peer, if this is a multiplayer peer.
    #[must_use]
    pub fn local_team(self) -> Option<Team> {
        match self {
            Self::Local => None,
            Self::Peer { local_team } => Some(local_team),
        }
    }
}

/// Snapshot of a potential target, taken at the start of a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    /// Entity id.
    pub id: EntityId,
    /// Owner.
    pub team: Team,
    /// Center.
    pub position: Vec2Fixed,
    /// Collision radius.
    pub radius: Fixed,
    /// Units are preferred over buildings.
    pub is_unit: bool,
}

impl TargetInfo {
    /// Snapshot a live entity.
    #[must_use]
    pub fn of(entity: &Entity) -> Self {
        Self {
            id: entity.id.clone(),
            team: entity.team,
            position: entity.position,
            radius: entity.radius(),
            is_unit: entity.is_unit(),
        }
    }
}

/// Distance from `from` to the edge of a target's body.
#[must_use]
pub fn edge_distance(from: Vec2Fixed, target_position: Vec2Fixed, target_radius: Fixed) -> Fixed {
    let distance = from.distance(target_position) - target_radius;
    if distance < Fixed::ZERO {
        Fixed::ZERO
    } else {
        distance
    }
}

/// Whether a target's body is within `range` of `from`.
#[must_use]
pub fn in_range(
    from: Vec2Fixed,
    range: Fixed,
    target_position: Vec2Fixed,
    target_radius: Fixed,
) -> bool {
    edge_distance(from, target_position, target_radius) <= range
}

/// Pick the best enemy of `team` within `reach` of `from`.
///
/// Units win over buildings; within a class the nearest wins, ties broken
/// by id so every peer picks the same target.
#[must_use]
pub fn select_target<'a>(
    from: Vec2Fixed,
    team: Team,
    reach: Fixed,
    candidates: &'a [TargetInfo],
) -> Option<&'a TargetInfo> {
    candidates
        .iter()
        .filter(|candidate| candidate.team != team)
        .map(|candidate| (candidate, edge_distance(from, candidate.position, candidate.radius)))
        .filter(|(_, distance)| *distance <= reach)
        .min_by(|(a, da), (b, db)| {
            (!a.is_unit, *da, &a.id).cmp(&(!b.is_unit, *db, &b.id))
        })
        .map(|(candidate, _)| candidate)
}
