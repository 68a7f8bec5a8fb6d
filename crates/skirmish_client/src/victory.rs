//! Match result from the local player's point of view.

use serde::Serialize;
use skirmish_core::entity_kind::EntityType;
use skirmish_core::events::WorldEvent;
use skirmish_core::team::Team;

/// Current state of the match.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchState {
    /// Still going.
    #[default]
    Playing,
    /// The local team won.
    Victory,
    /// The local team lost.
    Defeat,
}

impl MatchState {
    /// State for `local` given the declared winner.
    #[must_use]
    pub fn from_winner(winner: Option<Team>, local: Team) -> Self {
        match winner {
            None => Self::Playing,
            Some(team) if team == local => Self::Victory,
            Some(_) => Self::Defeat,
        }
    }

    /// Whether the match has ended.
    #[must_use]
    pub const fn is_over(self) -> bool {
        !matches!(self, Self::Playing)
    }
}

/// Statistics tracked during the match.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    /// Units produced by the local team.
    pub units_produced: u32,
    /// Local units lost.
    pub units_lost: u32,
    /// Enemy units killed.
    pub enemies_killed: u32,
    /// Buildings the local team completed.
    pub buildings_built: u32,
    /// Match time.
    pub duration_ms: u64,
}

impl MatchStats {
    /// Fold a batch of world events into the counters.
    pub fn record(&mut self, events: &[WorldEvent], local: Team) {
        for event in events {
            match event {
                WorldEvent::UnitSpawned { team, .. } if *team == local => self.units_produced += 1,
                WorldEvent::ConstructionCompleted { team, .. } if *team == local => {
                    self.buildings_built += 1;
                }
                WorldEvent::Died {
                    team,
                    entity_type: EntityType::Unit(_),
                    ..
                } => {
                    if *team == local {
                        self.units_lost += 1;
                    } else {
                        self.enemies_killed += 1;
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::components::EntityId;
    use skirmish_core::entity_kind::{BuildingKind, UnitKind};

    #[test]
    fn test_state_from_winner() {
        assert_eq!(MatchState::from_winner(None, Team::Player), MatchState::Playing);
        assert_eq!(MatchState::from_winner(Some(Team::Player), Team::Player), MatchState::Victory);
        assert_eq!(MatchState::from_winner(Some(Team::Player), Team::Enemy), MatchState::Defeat);
        assert!(MatchState::Defeat.is_over());
    }

    #[test]
    fn test_stats_count_local_perspective() {
        let died = |team| WorldEvent::Died {
            entity: EntityId::from("x"),
            team,
            entity_type: EntityType::Unit(UnitKind::Marine),
        };
        let events = vec![
            died(Team::Player),
            died(Team::Enemy),
            died(Team::Enemy),
            WorldEvent::ConstructionCompleted {
                building: EntityId::from("b"),
                team: Team::Player,
                kind: BuildingKind::Barracks,
            },
            WorldEvent::ConstructionCompleted {
                building: EntityId::from("c"),
                team: Team::Enemy,
                kind: BuildingKind::Barracks,
            },
        ];
        let mut stats = MatchStats::default();
        stats.record(&events, Team::Player);
        assert_eq!(stats.units_lost, 1);
        assert_eq!(stats.enemies_killed, 2);
        assert_eq!(stats.buildings_built, 1);
    }
}
