//! Closed set of concrete entity types and their stat tables.
//!
//! Every unit and building type is a variant here. Capabilities such as
//! "can attack" or "can produce" are read from the stat tables rather than
//! inferred from the type, so adding a type means adding one match arm.

use serde::{Deserialize, Serialize};

use crate::components::{Cost, WeaponStats};
use crate::math::{fx, Fixed};

/// Concrete unit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// Cheap infantry.
    Marine,
    /// Fast light vehicle.
    Warthog,
    /// Slow heavy tank.
    Scorpion,
}

/// Concrete building types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildingKind {
    /// Team headquarters. Losing it loses the match.
    Base,
    /// Generates supplies while standing.
    SupplyDepot,
    /// Produces units and raises the population cap.
    Barracks,
    /// Provides one point of power while standing.
    Reactor,
    /// Static defense, simulated identically by both peers.
    Turret,
    /// Plain structure with no special role.
    Generic,
}

/// Discriminator covering both entity families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// A mobile unit.
    Unit(UnitKind),
    /// A static building.
    Building(BuildingKind),
}

/// Stats shared by every unit of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitStats {
    /// Maximum health.
    pub max_health: u32,
    /// Weapon carried by the unit.
    pub weapon: WeaponStats,
    /// Maximum speed in world units per second.
    pub max_speed: Fixed,
    /// Acceleration in world units per second squared.
    pub acceleration: Fixed,
    /// Collision radius.
    pub radius: Fixed,
    /// Production cost.
    pub cost: Cost,
    /// Production time in milliseconds.
    pub build_time_ms: u64,
}

/// Stats shared by every building of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingStats {
    /// Maximum health.
    pub max_health: u32,
    /// Side length of the square footprint.
    pub size: Fixed,
    /// Construction cost.
    pub cost: Cost,
    /// Construction time in milliseconds.
    pub construction_time_ms: u64,
    /// Unit types this building can produce.
    pub produces: &'static [UnitKind],
    /// Weapon, for defensive structures.
    pub weapon: Option<WeaponStats>,
    /// Whether players may place this building.
    pub placeable: bool,
}

impl UnitKind {
    /// All unit kinds.
    pub const ALL: [UnitKind; 3] = [UnitKind::Marine, UnitKind::Warthog, UnitKind::Scorpion];

    /// Stat table for this kind.
    #[must_use]
    pub fn stats(self) -> UnitStats {
        match self {
            Self::Marine => UnitStats {
                max_health: 80,
                weapon: WeaponStats::new(25, fx(150), 800),
                max_speed: fx(90),
                acceleration: fx(360),
                radius: fx(10),
                cost: Cost::new(50, 0, 1),
                build_time_ms: 3_000,
            },
            Self::Warthog => UnitStats {
                max_health: 200,
                weapon: WeaponStats::new(35, fx(180), 1_000),
                max_speed: fx(130),
                acceleration: fx(390),
                radius: fx(14),
                cost: Cost::new(100, 1, 2),
                build_time_ms: 5_000,
            },
            Self::Scorpion => UnitStats {
                max_health: 350,
                weapon: WeaponStats::new(60, fx(220), 1_500),
                max_speed: fx(70),
                acceleration: fx(210),
                radius: fx(18),
                cost: Cost::new(175, 2, 3),
                build_time_ms: 7_000,
            },
        }
    }

    /// Lowercase tag used in generated ids.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Marine => "marine",
            Self::Warthog => "warthog",
            Self::Scorpion => "scorpion",
        }
    }
}

const BARRACKS_OUTPUT: &[UnitKind] = &[UnitKind::Marine, UnitKind::Warthog, UnitKind::Scorpion];

impl BuildingKind {
    /// Building kinds a player can order.
    pub const PLACEABLE: [BuildingKind; 5] = [
        BuildingKind::SupplyDepot,
        BuildingKind::Barracks,
        BuildingKind::Reactor,
        BuildingKind::Turret,
        BuildingKind::Generic,
    ];

    /// Stat table for this kind.
    #[must_use]
    pub fn stats(self) -> BuildingStats {
        match self {
            Self::Base => BuildingStats {
                max_health: 2_000,
                size: fx(120),
                cost: Cost::free(),
                construction_time_ms: 0,
                produces: &[],
                weapon: None,
                placeable: false,
            },
            Self::SupplyDepot => BuildingStats {
                max_health: 500,
                size: fx(70),
                cost: Cost::new(100, 0, 0),
                construction_time_ms: 8_000,
                produces: &[],
                weapon: None,
                placeable: true,
            },
            Self::Barracks => BuildingStats {
                max_health: 800,
                size: fx(90),
                cost: Cost::new(150, 0, 0),
                construction_time_ms: 12_000,
                produces: BARRACKS_OUTPUT,
                weapon: None,
                placeable: true,
            },
            Self::Reactor => BuildingStats {
                max_health: 500,
                size: fx(70),
                cost: Cost::new(150, 0, 0),
                construction_time_ms: 10_000,
                produces: &[],
                weapon: None,
                placeable: true,
            },
            Self::Turret => BuildingStats {
                max_health: 600,
                size: fx(50),
                cost: Cost::new(125, 1, 0),
                construction_time_ms: 10_000,
                produces: &[],
                weapon: Some(WeaponStats::new(20, fx(250), 600)),
                placeable: true,
            },
            Self::Generic => BuildingStats {
                max_health: 400,
                size: fx(60),
                cost: Cost::new(50, 0, 0),
                construction_time_ms: 4_000,
                produces: &[],
                weapon: None,
                placeable: true,
            },
        }
    }

    /// Whether this building carries a weapon.
    #[must_use]
    pub fn can_attack(self) -> bool {
        self.stats().weapon.is_some()
    }

    /// Whether this building can produce `unit`.
    #[must_use]
    pub fn can_produce(self, unit: UnitKind) -> bool {
        self.stats().produces.contains(&unit)
    }

    /// Lowercase tag used in generated ids.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::SupplyDepot => "depot",
            Self::Barracks => "barracks",
            Self::Reactor => "reactor",
            Self::Turret => "turret",
            Self::Generic => "structure",
        }
    }
}

impl EntityType {
    /// Whether this is a unit.
    #[must_use]
    pub const fn is_unit(self) -> bool {
        matches!(self, Self::Unit(_))
    }

    /// Whether this is the given building kind.
    #[must_use]
    pub fn is_building(self, kind: BuildingKind) -> bool {
        self == Self::Building(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marine_stats() {
        let stats = UnitKind::Marine.stats();
        assert_eq!(stats.weapon.damage, 25);
        assert_eq!(stats.weapon.cooldown_ms, 800);
        assert_eq!(stats.cost.population, 1);
    }

    #[test]
    fn test_capabilities_come_from_tables() {
        assert!(BuildingKind::Turret.can_attack());
        assert!(!BuildingKind::Barracks.can_attack());
        assert!(BuildingKind::Barracks.can_produce(UnitKind::Scorpion));
        assert!(!BuildingKind::Base.can_produce(UnitKind::Marine));
    }

    #[test]
    fn test_base_is_not_placeable() {
        assert!(!BuildingKind::Base.stats().placeable);
        assert!(BuildingKind::PLACEABLE
            .iter()
            .all(|kind| kind.stats().placeable));
    }
}
