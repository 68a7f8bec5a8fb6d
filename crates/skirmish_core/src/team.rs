//! The two sides of a match.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two symbolic factions on the battlefield.
///
/// Serialized as `"player"` / `"enemy"` on the wire. In a multiplayer room the
/// room creator controls [`Team::Player`] and the joiner [`Team::Enemy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    /// Left-hand base.
    Player,
    /// Right-hand base.
    Enemy,
}

impl Team {
    /// Both teams in a fixed order.
    pub const ALL: [Team; 2] = [Team::Player, Team::Enemy];

    /// The other team.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }

    /// Lowercase name used in ids and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Enemy => "enemy",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value stored once per team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamMap<T> {
    /// Value for [`Team::Player`].
    pub player: T,
    /// Value for [`Team::Enemy`].
    pub enemy: T,
}

impl<T> TeamMap<T> {
    /// Build a map by calling `f` for each team.
    pub fn from_fn(mut f: impl FnMut(Team) -> T) -> Self {
        Self {
            player: f(Team::Player),
            enemy: f(Team::Enemy),
        }
    }

    /// Value for `team`.
    #[must_use]
    pub fn get(&self, team: Team) -> &T {
        match team {
            Team::Player => &self.player,
            Team::Enemy => &self.enemy,
        }
    }

    /// Mutable value for `team`.
    pub fn get_mut(&mut self, team: Team) -> &mut T {
        match team {
            Team::Player => &mut self.player,
            Team::Enemy => &mut self.enemy,
        }
    }
}

impl<T> std::ops::Index<Team> for TeamMap<T> {
    type Output = T;

    fn index(&self, team: Team) -> &T {
        self.get(team)
    }
}

impl<T> std::ops::IndexMut<Team> for TeamMap<T> {
    fn index_mut(&mut self, team: Team) -> &mut T {
        self.get_mut(team)
    }
}
