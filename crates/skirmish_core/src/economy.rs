//! Per-team resource ledger.
//!
//! Supplies accumulate continuously from completed depots. Power and
//! population are not stored quantities: they are recounted from the live
//! entities on every tick, so destroying a reactor drops power at once and
//! nothing can drift out of sync with the battlefield.

use serde::{Deserialize, Serialize};

use crate::components::Cost;
use crate::config::GameConfig;
use crate::entity_kind::BuildingKind;
use crate::error::{GameError, Result};
use crate::math::{fx, ms_to_seconds, Fixed};
use crate::simulation::Simulation;
use crate::team::Team;

/// Counts derived from one team's live entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TeamCensus {
    /// Completed, standing supply depots.
    pub depots: u32,
    /// Completed, standing reactors.
    pub reactors: u32,
    /// Completed, standing barracks.
    pub barracks: u32,
    /// Population used by live units plus production in progress or queued.
    pub population: u32,
}

impl TeamCensus {
    /// Count `team`'s entities in `sim`.
    #[must_use]
    pub fn take(sim: &Simulation, team: Team) -> Self {
        let mut census = Self::default();
        for entity in sim.entities().iter() {
            if entity.team != team || entity.is_dead() {
                continue;
            }
            if let Some(unit) = entity.as_unit() {
                census.population += unit.cost.population;
                continue;
            }
            if let Some(building) = entity.as_building() {
                census.population += building
                    .reserved_units()
                    .map(|kind| kind.stats().cost.population)
                    .sum::<u32>();
                if building.under_construction {
                    continue;
                }
                match building.building_kind {
                    BuildingKind::SupplyDepot => census.depots += 1,
                    BuildingKind::Reactor => census.reactors += 1,
                    BuildingKind::Barracks => census.barracks += 1,
                    _ => {}
                }
            }
        }
        census
    }
}

/// One team's resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLedger {
    #[serde(with = "crate::math::fixed_serde")]
    supplies: Fixed,
    supply_rate: u32,
    power: u32,
    current_population: u32,
    max_population: u32,
}

impl ResourceLedger {
    /// Starting ledger for a match.
    #[must_use]
    pub fn new(config: &GameConfig) -> Self {
        Self {
            supplies: Fixed::from_num(config.starting_supplies),
            supply_rate: 0,
            power: 0,
            current_population: 0,
            max_population: config.base_population.min(config.population_cap),
        }
    }

    /// Rederive power, population and supply rate from a census.
    pub fn recompute(&mut self, census: &TeamCensus, config: &GameConfig) {
        self.supply_rate = census.depots * config.supply_rate_per_depot;
        self.power = census.reactors;
        self.current_population = census.population;
        self.max_population = (config.base_population
            + census.barracks * config.population_per_barracks)
            .min(config.population_cap);
    }

    /// Accumulate supplies for `elapsed_ms` at the current rate.
    pub fn accrue(&mut self, elapsed_ms: u64) {
        if self.supply_rate == 0 || elapsed_ms == 0 {
            return;
        }
        let gained = Fixed::from_num(self.supply_rate) * ms_to_seconds(elapsed_ms);
        self.supplies = self.supplies.saturating_add(gained);
    }

    /// Whole supplies available.
    #[must_use]
    pub fn supplies(&self) -> u32 {
        self.supplies.to_num::<u32>()
    }

    /// Supplies gained per second.
    #[must_use]
    pub const fn supply_rate(&self) -> u32 {
        self.supply_rate
    }

    /// Power available.
    #[must_use]
    pub const fn power(&self) -> u32 {
        self.power
    }

    /// Population in use, including reserved production.
    #[must_use]
    pub const fn current_population(&self) -> u32 {
        self.current_population
    }

    /// Population cap.
    #[must_use]
    pub const fn max_population(&self) -> u32 {
        self.max_population
    }

    /// Whether `cost` is affordable right now.
    #[must_use]
    pub fn can_afford(&self, cost: &Cost) -> bool {
        self.check(cost).is_ok()
    }

    /// Like [`ResourceLedger::can_afford`], naming the first missing resource.
    pub fn check(&self, cost: &Cost) -> Result<()> {
        if self.supplies() < cost.supplies {
            return Err(GameError::InsufficientResources {
                resource: "supplies",
                required: cost.supplies,
                available: self.supplies(),
            });
        }
        if self.power < cost.power {
            return Err(GameError::InsufficientResources {
                resource: "power",
                required: cost.power,
                available: self.power,
            });
        }
        let free = self.max_population.saturating_sub(self.current_population);
        if cost.population > free {
            return Err(GameError::InsufficientResources {
                resource: "population",
                required: cost.population,
                available: free,
            });
        }
        Ok(())
    }

    /// Pay for `cost`. Only supplies are deducted.
    pub fn spend(&mut self, cost: &Cost) -> Result<()> {
        self.check(cost)?;
        self.supplies -= Fixed::from_num(cost.supplies);
        self.current_population += cost.population;
        Ok(())
    }

    /// Pay a plain supply amount, for purchases with no power or population side.
    pub fn spend_supplies(&mut self, amount: u32) -> Result<()> {
        self.spend(&Cost::new(amount, 0, 0))
    }

    /// Return supplies, for refunds and admin adjustments.
    pub fn grant(&mut self, amount: u32) {
        self.supplies = self.supplies.saturating_add(Fixed::from_num(amount));
    }

    /// Overwrite supplies, for admin adjustments.
    pub fn set_supplies(&mut self, amount: u32) {
        self.supplies = Fixed::from_num(amount);
    }

    /// Fractional supplies, for display.
    #[must_use]
    pub fn supplies_exact(&self) -> Fixed {
        self.supplies
    }

    /// Fraction of the population cap in use.
    #[must_use]
    pub fn population_ratio(&self) -> Fixed {
        if self.max_population == 0 {
            return fx(1);
        }
        Fixed::from_num(self.current_population) / Fixed::from_num(self.max_population)
    }
}
