//! Plain data pieces shared by units and buildings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity_kind::UnitKind;
use crate::math::{fixed_serde, Fixed};

/// Globally unique entity identifier.
///
/// Either generated locally (`<namespace>-<team>-<n>`) or assigned by the
/// originating peer and carried verbatim. An empty id means "not yet
/// assigned"; [`crate::simulation::Simulation::add_entity`] fills it in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an existing id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The unassigned id.
    #[must_use]
    pub const fn unassigned() -> Self {
        Self(String::new())
    }

    /// Whether an id has been assigned.
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        !self.0.is_empty()
    }

    /// Borrow the id text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Health component for damageable entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Create new health component at full health.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Health has reached zero.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.current == 0
    }

    /// Apply damage, returning actual damage dealt.
    /// Uses saturating subtraction so health clamps at zero.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current);
        self.current -= actual;
        actual
    }

    /// Overwrite current health, clamped to `max`.
    pub fn set(&mut self, value: u32) {
        self.current = value.min(self.max);
    }

    /// Get health as a percentage (0-100).
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.max == 0 {
            0
        } else {
            (self.current * 100) / self.max
        }
    }
}

/// Resource cost of a unit or building.
///
/// Only `supplies` is ever deducted. `power` and `population` are
/// requirements checked against derived counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cost {
    /// Supplies deducted on purchase.
    pub supplies: u32,
    /// Power that must be available.
    pub power: u32,
    /// Population slots occupied.
    pub population: u32,
}

impl Cost {
    /// Create a cost.
    #[must_use]
    pub const fn new(supplies: u32, power: u32, population: u32) -> Self {
        Self {
            supplies,
            power,
            population,
        }
    }

    /// A zero cost.
    #[must_use]
    pub const fn free() -> Self {
        Self::new(0, 0, 0)
    }
}

/// Weapon stats for anything that can attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponStats {
    /// Damage per landed hit.
    pub damage: u32,
    /// Attack range in world units.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Minimum milliseconds between attacks.
    pub cooldown_ms: u64,
}

impl WeaponStats {
    /// Create weapon stats.
    #[must_use]
    pub const fn new(damage: u32, range: Fixed, cooldown_ms: u64) -> Self {
        Self {
            damage,
            range,
            cooldown_ms,
        }
    }

    /// Whether the cooldown has elapsed since `last_attack_ms`.
    #[must_use]
    pub fn is_ready(&self, last_attack_ms: Option<u64>, now_ms: u64) -> bool {
        match last_attack_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.cooldown_ms,
        }
    }
}

/// Unit behavior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitState {
    /// Standing still.
    #[default]
    Idle,
    /// Travelling toward a destination.
    Moving,
    /// Engaging a target in range.
    Attacking,
    /// Terminal.
    Dead,
}

/// The unit a building is currently producing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionItem {
    /// Unit being produced.
    pub unit_kind: UnitKind,
    /// Production time in milliseconds.
    pub build_time_ms: u64,
    /// Progress in `[0, 1]`.
    #[serde(with = "fixed_serde")]
    pub progress: Fixed,
    /// When production of this item started.
    pub started_at_ms: u64,
}

impl ProductionItem {
    /// Start producing `unit_kind` at `now_ms`.
    #[must_use]
    pub fn start(unit_kind: UnitKind, now_ms: u64) -> Self {
        Self {
            unit_kind,
            build_time_ms: unit_kind.stats().build_time_ms,
            progress: Fixed::ZERO,
            started_at_ms: now_ms,
        }
    }

    /// Whether production has finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress >= Fixed::from_num(1)
    }
}
