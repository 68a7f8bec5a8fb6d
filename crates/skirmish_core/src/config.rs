//! Match configuration.
//!
//! Loaded from RON. Every field has a default, so a config file only needs to
//! list what it changes:
//!
//! ```ron
//! (
//!     starting_supplies: 1000,
//!     max_retries: 8,
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::Vec2Fixed;
use crate::team::Team;

/// Tunable constants for one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// World width in world units.
    pub world_width: i32,
    /// World height in world units.
    pub world_height: i32,
    /// Supplies each team starts with.
    pub starting_supplies: u32,
    /// Supplies per second generated by each completed depot.
    pub supply_rate_per_depot: u32,
    /// Population cap with no barracks.
    pub base_population: u32,
    /// Population cap added by each completed barracks.
    pub population_per_barracks: u32,
    /// Hard population cap.
    pub population_cap: u32,
    /// Maximum distance from a base at which buildings may be placed.
    pub base_range: i32,
    /// Supplies needed for each base upgrade, in order.
    pub base_upgrade_costs: Vec<u32>,
    /// Period of the background tick.
    pub background_tick_ms: u64,
    /// Period of the pending-action retry tick.
    pub retry_tick_ms: u64,
    /// Minimum spacing between retries of one pending action.
    pub retry_spacing_ms: u64,
    /// Retries before a pending action is dropped.
    pub max_retries: u32,
    /// Period of the position resync broadcast.
    pub position_sync_ms: u64,
    /// Default interval between AI decisions.
    pub ai_decision_interval_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            world_width: 2400,
            world_height: 1600,
            starting_supplies: 500,
            supply_rate_per_depot: 4,
            base_population: 25,
            population_per_barracks: 5,
            population_cap: 50,
            base_range: 360,
            base_upgrade_costs: vec![200, 350],
            background_tick_ms: 50,
            retry_tick_ms: 50,
            retry_spacing_ms: 200,
            max_retries: 5,
            position_sync_ms: 1000,
            ai_decision_interval_ms: 2000,
        }
    }
}

impl GameConfig {
    /// Parse a config from RON text.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| GameError::ConfigError {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load a config from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| GameError::ConfigError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        ron::from_str(&contents).map_err(|e| GameError::ConfigError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// World dimensions as a vector.
    #[must_use]
    pub fn world_size(&self) -> Vec2Fixed {
        Vec2Fixed::from_ints(self.world_width, self.world_height)
    }

    /// Center of `team`'s base. Bases sit on the horizontal midline, an
    /// eighth of the world width in from their edge.
    #[must_use]
    pub fn base_position(&self, team: Team) -> Vec2Fixed {
        let inset = self.world_width / 8;
        let x = match team {
            Team::Player => inset,
            Team::Enemy => self.world_width - inset,
        };
        Vec2Fixed::from_ints(x, self.world_height / 2)
    }

    /// Highest base upgrade level.
    #[must_use]
    pub fn max_upgrade_level(&self) -> u8 {
        u8::try_from(self.base_upgrade_costs.len()).unwrap_or(u8::MAX)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_bases() {
        let config = GameConfig::default();
        assert_eq!(config.base_position(Team::Player), Vec2Fixed::from_ints(300, 800));
        assert_eq!(config.base_position(Team::Enemy), Vec2Fixed::from_ints(2100, 800));
        assert_eq!(config.max_upgrade_level(), 2);
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = GameConfig::from_ron_str("(starting_supplies: 1000, max_retries: 8)").unwrap();
        assert_eq!(config.starting_supplies, 1000);
        assert_eq!(config.max_retries, 8);
        assert_eq!(config.retry_spacing_ms, 200);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(world_width: 3200)").unwrap();
        let config = GameConfig::load(file.path()).unwrap();
        assert_eq!(config.world_width, 3200);
    }

    #[test]
    fn test_bad_ron_reports_path() {
        let err = GameConfig::from_ron_str("(world_width: \"wide\")").unwrap_err();
        assert!(matches!(err, GameError::ConfigError { .. }));
    }
}
