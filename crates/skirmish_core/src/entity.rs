//! Units and buildings.
//!
//! An [`Entity`] carries the state every battlefield object shares (identity,
//! team, position, health, death flag) and an [`EntityKind`] with the
//! unit- or building-specific state. Per-entity state machines live here as
//! methods; the systems that drive them live in [`crate::systems`] and
//! [`crate::combat`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::components::{Cost, EntityId, Health, ProductionItem, UnitState, WeaponStats};
use crate::entity_kind::{BuildingKind, EntityType, UnitKind};
use crate::error::{GameError, Result};
use crate::math::{fixed_serde, fx, progress_ratio, Fixed, Vec2Fixed};
use crate::team::Team;

/// Maximum number of units waiting behind the current production item.
pub const MAX_PRODUCTION_QUEUE: usize = 5;

/// A live battlefield object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier. Unassigned until added to a simulation.
    pub id: EntityId,
    /// Owning team.
    pub team: Team,
    /// World position (center).
    pub position: Vec2Fixed,
    /// Health points.
    pub health: Health,
    /// Unit- or building-specific state.
    pub kind: EntityKind,
    is_dead: bool,
}

/// Unit- or building-specific state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// Mobile unit.
    Unit(Unit),
    /// Static building.
    Building(Building),
}

/// State carried by mobile units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Concrete unit type.
    pub unit_kind: UnitKind,
    /// Current velocity in world units per second.
    pub velocity: Vec2Fixed,
    /// Where the unit is heading.
    pub destination: Option<Vec2Fixed>,
    /// Entity being attacked (non-owning).
    pub attack_target: Option<EntityId>,
    /// Destination to resume after an opportunistic attack.
    pub saved_destination: Option<Vec2Fixed>,
    /// Behavior state.
    pub state: UnitState,
    /// Weapon stats.
    pub weapon: WeaponStats,
    /// Time of the last attack, in simulation milliseconds.
    pub last_attack_ms: Option<u64>,
    /// Maximum speed.
    #[serde(with = "fixed_serde")]
    pub max_speed: Fixed,
    /// Acceleration.
    #[serde(with = "fixed_serde")]
    pub acceleration: Fixed,
    /// Collision radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Production cost.
    pub cost: Cost,
    /// Engage anything met on the way to `destination`.
    pub attack_move: bool,
    /// Selection highlight. Local to one peer, never synchronized.
    #[serde(skip)]
    pub selected: bool,
}

/// State carried by buildings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    /// Concrete building type.
    pub building_kind: BuildingKind,
    /// Side length of the square footprint.
    #[serde(with = "fixed_serde")]
    pub size: Fixed,
    /// Still being built.
    pub under_construction: bool,
    /// Construction progress in `[0, 1]`.
    #[serde(with = "fixed_serde")]
    pub construction_progress: Fixed,
    /// When construction started. `None` while waiting in the construction queue.
    pub construction_started_ms: Option<u64>,
    /// Total construction time.
    pub construction_time_ms: u64,
    /// Unit currently in production.
    pub current_production: Option<ProductionItem>,
    /// Units waiting to be produced, oldest first.
    pub production_queue: VecDeque<UnitKind>,
    /// Unit types this building can produce.
    pub can_produce: Vec<UnitKind>,
    /// Finished and operational.
    pub is_active: bool,
    /// Weapon for defensive structures.
    pub weapon: Option<WeaponStats>,
    /// Current turret target (non-owning).
    pub attack_target: Option<EntityId>,
    /// Time of the last turret shot.
    pub last_attack_ms: Option<u64>,
    /// Construction cost, refunded on cancellation.
    pub cost: Cost,
    /// Base layout slot this building occupies.
    pub spot: Option<usize>,
}

impl Entity {
    /// Create a unit of `unit_kind` at full health with an unassigned id.
    #[must_use]
    pub fn unit(team: Team, unit_kind: UnitKind, position: Vec2Fixed) -> Self {
        let stats = unit_kind.stats();
        Self {
            id: EntityId::unassigned(),
            team,
            position,
            health: Health::new(stats.max_health),
            kind: EntityKind::Unit(Unit {
                unit_kind,
                velocity: Vec2Fixed::ZERO,
                destination: None,
                attack_target: None,
                saved_destination: None,
                state: UnitState::Idle,
                weapon: stats.weapon,
                last_attack_ms: None,
                max_speed: stats.max_speed,
                acceleration: stats.acceleration,
                radius: stats.radius,
                cost: stats.cost,
                attack_move: false,
                selected: false,
            }),
            is_dead: false,
        }
    }

    /// Create a building of `building_kind` waiting for construction to start.
    #[must_use]
    pub fn building(team: Team, building_kind: BuildingKind, position: Vec2Fixed) -> Self {
        let stats = building_kind.stats();
        Self {
            id: EntityId::unassigned(),
            team,
            position,
            health: Health::new(stats.max_health),
            kind: EntityKind::Building(Building {
                building_kind,
                size: stats.size,
                under_construction: true,
                construction_progress: Fixed::ZERO,
                construction_started_ms: None,
                construction_time_ms: stats.construction_time_ms,
                current_production: None,
                production_queue: VecDeque::new(),
                can_produce: stats.produces.to_vec(),
                is_active: false,
                weapon: stats.weapon,
                attack_target: None,
                last_attack_ms: None,
                cost: stats.cost,
                spot: None,
            }),
            is_dead: false,
        }
    }

    /// Create an already finished building, used for match setup.
    #[must_use]
    pub fn completed_building(
        team: Team,
        building_kind: BuildingKind,
        position: Vec2Fixed,
    ) -> Self {
        let mut entity = Self::building(team, building_kind, position);
        if let EntityKind::Building(building) = &mut entity.kind {
            building.finish_construction();
        }
        entity
    }

    /// Builder-style id assignment.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = id.into();
        self
    }

    /// Whether the entity has died. Never reverts once true.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.is_dead
    }

    /// Mark the entity dead. Idempotent.
    pub fn kill(&mut self) {
        if self.is_dead {
            return;
        }
        self.is_dead = true;
        self.health.current = 0;
        match &mut self.kind {
            EntityKind::Unit(unit) => {
                unit.state = UnitState::Dead;
                unit.velocity = Vec2Fixed::ZERO;
                unit.destination = None;
                unit.attack_target = None;
                unit.saved_destination = None;
            }
            EntityKind::Building(building) => {
                building.is_active = false;
                building.attack_target = None;
            }
        }
    }

    /// Apply damage and return the amount actually dealt.
    ///
    /// Dead entities are inert and take no damage.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        if self.is_dead {
            return 0;
        }
        let dealt = self.health.apply_damage(amount);
        if self.health.is_depleted() {
            self.kill();
        }
        dealt
    }

    /// Overwrite health with a value reported by the authoritative peer.
    pub fn set_health(&mut self, value: u32) {
        if self.is_dead {
            return;
        }
        self.health.set(value);
        if self.health.is_depleted() {
            self.kill();
        }
    }

    /// Concrete type discriminator.
    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        match &self.kind {
            EntityKind::Unit(unit) => EntityType::Unit(unit.unit_kind),
            EntityKind::Building(building) => EntityType::Building(building.building_kind),
        }
    }

    /// Whether this is a unit.
    #[must_use]
    pub fn is_unit(&self) -> bool {
        matches!(self.kind, EntityKind::Unit(_))
    }

    /// Unit state, if this is a unit.
    #[must_use]
    pub fn as_unit(&self) -> Option<&Unit> {
        match &self.kind {
            EntityKind::Unit(unit) => Some(unit),
            EntityKind::Building(_) => None,
        }
    }

    /// Mutable unit state, if this is a unit.
    pub fn as_unit_mut(&mut self) -> Option<&mut Unit> {
        match &mut self.kind {
            EntityKind::Unit(unit) => Some(unit),
            EntityKind::Building(_) => None,
        }
    }

    /// Building state, if this is a building.
    #[must_use]
    pub fn as_building(&self) -> Option<&Building> {
        match &self.kind {
            EntityKind::Building(building) => Some(building),
            EntityKind::Unit(_) => None,
        }
    }

    /// Mutable building state, if this is a building.
    pub fn as_building_mut(&mut self) -> Option<&mut Building> {
        match &mut self.kind {
            EntityKind::Building(building) => Some(building),
            EntityKind::Unit(_) => None,
        }
    }

    /// Collision radius: unit radius, or half the building footprint.
    #[must_use]
    pub fn radius(&self) -> Fixed {
        match &self.kind {
            EntityKind::Unit(unit) => unit.radius,
            EntityKind::Building(building) => building.size / fx(2),
        }
    }

    /// Whether this is a finished building of `kind` that is still standing.
    #[must_use]
    pub fn is_completed(&self, kind: BuildingKind) -> bool {
        !self.is_dead
            && self
                .as_building()
                .is_some_and(|b| b.building_kind == kind && !b.under_construction)
    }
}

impl Unit {
    /// Order a plain move. Clears any target.
    pub fn move_to(&mut self, destination: Vec2Fixed) {
        self.destination = Some(destination);
        self.attack_target = None;
        self.saved_destination = None;
        self.attack_move = false;
        self.state = UnitState::Moving;
    }

    /// Order an attack-move: travel, engaging enemies met on the way.
    pub fn attack_move_to(&mut self, destination: Vec2Fixed) {
        self.move_to(destination);
        self.attack_move = true;
    }

    /// Explicitly attack `target`, abandoning any current trip.
    pub fn attack(&mut self, target: EntityId) {
        self.attack_target = Some(target);
        self.saved_destination = None;
        self.destination = None;
        self.attack_move = false;
        self.state = UnitState::Attacking;
    }

    /// Opportunistically engage `target`, remembering where we were going.
    pub fn engage(&mut self, target: EntityId) {
        if self.state == UnitState::Moving {
            self.saved_destination = self.destination.take();
        }
        self.attack_target = Some(target);
        self.velocity = Vec2Fixed::ZERO;
        self.state = UnitState::Attacking;
    }

    /// Drop the current target and resume the saved trip, or go idle.
    ///
    /// Returns the destination of a resumed trip.
    pub fn disengage(&mut self) -> Option<Vec2Fixed> {
        self.attack_target = None;
        match self.saved_destination.take() {
            Some(destination) => {
                self.destination = Some(destination);
                self.state = UnitState::Moving;
                Some(destination)
            }
            None => {
                self.destination = None;
                self.velocity = Vec2Fixed::ZERO;
                self.attack_move = false;
                self.state = UnitState::Idle;
                None
            }
        }
    }

    /// Head toward a target that is out of range while keeping it targeted.
    pub fn chase(&mut self, target_position: Vec2Fixed) {
        self.destination = Some(target_position);
        self.state = UnitState::Moving;
    }

    /// Stop in place.
    pub fn stop(&mut self) {
        self.destination = None;
        self.attack_target = None;
        self.saved_destination = None;
        self.attack_move = false;
        self.velocity = Vec2Fixed::ZERO;
        self.state = UnitState::Idle;
    }

    /// Arrived at the destination.
    pub fn arrive(&mut self) {
        self.destination = None;
        self.velocity = Vec2Fixed::ZERO;
        if self.attack_target.is_none() {
            self.attack_move = false;
            self.state = UnitState::Idle;
        }
    }

    /// Whether the unit may pick a target on its own right now.
    #[must_use]
    pub fn may_acquire(&self) -> bool {
        self.attack_target.is_none() && matches!(self.state, UnitState::Idle | UnitState::Moving)
    }

    /// Reach used when scanning for targets.
    #[must_use]
    pub fn acquisition_range(&self) -> Fixed {
        if self.attack_move {
            self.weapon.range * fx(3) / fx(2)
        } else {
            self.weapon.range
        }
    }
}

impl Building {
    /// Start construction at `now_ms`. No-op if already started.
    pub fn start_construction(&mut self, now_ms: u64) -> bool {
        if !self.under_construction || self.construction_started_ms.is_some() {
            return false;
        }
        self.construction_started_ms = Some(now_ms);
        true
    }

    /// Advance construction progress toward `now_ms`.
    ///
    /// Progress never decreases. Returns `true` when progress has reached 1,
    /// without finishing the building; call [`Building::finish_construction`]
    /// for that.
    pub fn advance_construction(&mut self, now_ms: u64) -> bool {
        if !self.under_construction {
            return false;
        }
        let Some(started) = self.construction_started_ms else {
            return false;
        };
        let ratio = progress_ratio(now_ms.saturating_sub(started), self.construction_time_ms);
        if ratio > self.construction_progress {
            self.construction_progress = ratio;
        }
        self.construction_progress >= fx(1)
    }

    /// Finish construction. Returns `true` only on the transition.
    pub fn finish_construction(&mut self) -> bool {
        if !self.under_construction {
            return false;
        }
        self.under_construction = false;
        self.construction_progress = fx(1);
        self.is_active = true;
        true
    }

    /// Whether a unit is in production.
    #[must_use]
    pub fn is_producing(&self) -> bool {
        self.current_production.is_some()
    }

    /// Units reserved by this building: current item plus the queue.
    #[must_use]
    pub fn reserved_units(&self) -> impl Iterator<Item = UnitKind> + '_ {
        self.current_production
            .iter()
            .map(|item| item.unit_kind)
            .chain(self.production_queue.iter().copied())
    }

    /// Append `unit_kind` to the production queue.
    pub fn enqueue(&mut self, unit_kind: UnitKind, id: &EntityId) -> Result<()> {
        if !self.can_produce.contains(&unit_kind) {
            return Err(GameError::CannotProduce {
                building: self.building_kind,
                unit: unit_kind,
            });
        }
        if self.under_construction {
            return Err(GameError::BuildingNotConstructed(id.clone()));
        }
        if self.production_queue.len() >= MAX_PRODUCTION_QUEUE {
            return Err(GameError::QueueFull(id.clone()));
        }
        self.production_queue.push_back(unit_kind);
        Ok(())
    }

    /// Move the oldest queued unit into production if nothing is running.
    pub fn start_next_production(&mut self, now_ms: u64) -> bool {
        if self.current_production.is_some() || !self.is_active {
            return false;
        }
        match self.production_queue.pop_front() {
            Some(unit_kind) => {
                self.current_production = Some(ProductionItem::start(unit_kind, now_ms));
                true
            }
            None => false,
        }
    }

    /// Advance the current item. Returns its kind once it is complete.
    pub fn advance_production(&mut self, now_ms: u64) -> Option<UnitKind> {
        let item = self.current_production.as_mut()?;
        let ratio = progress_ratio(now_ms.saturating_sub(item.started_at_ms), item.build_time_ms);
        if ratio > item.progress {
            item.progress = ratio;
        }
        item.is_complete().then_some(item.unit_kind)
    }

    /// Clear the current item after its unit has spawned.
    pub fn finish_production(&mut self) -> Option<UnitKind> {
        self.current_production.take().map(|item| item.unit_kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marine() -> Entity {
        Entity::unit(Team::Player, UnitKind::Marine, Vec2Fixed::ZERO).with_id("m1")
    }

    #[test]
    fn test_death_is_monotonic() {
        let mut entity = marine();
        assert_eq!(entity.apply_damage(100), 80);
        assert!(entity.is_dead());
        entity.set_health(80);
        assert!(entity.is_dead());
        assert_eq!(entity.health.current, 0);
        assert_eq!(entity.apply_damage(10), 0);
    }

    #[test]
    fn test_set_health_zero_kills() {
        let mut entity = marine();
        entity.set_health(0);
        assert!(entity.is_dead());
        assert_eq!(entity.as_unit().map(|u| u.state), Some(UnitState::Dead));
    }

    #[test]
    fn test_engage_saves_destination() {
        let mut entity = marine();
        let unit = entity.as_unit_mut().unwrap();
        unit.move_to(Vec2Fixed::from_ints(500, 500));
        unit.engage(EntityId::from("e1"));
        assert_eq!(unit.state, UnitState::Attacking);
        assert_eq!(unit.saved_destination, Some(Vec2Fixed::from_ints(500, 500)));

        assert_eq!(unit.disengage(), Some(Vec2Fixed::from_ints(500, 500)));
        assert_eq!(unit.state, UnitState::Moving);
        assert_eq!(unit.destination, Some(Vec2Fixed::from_ints(500, 500)));
        assert!(unit.attack_target.is_none());
    }

    #[test]
    fn test_disengage_without_saved_goes_idle() {
        let mut entity = marine();
        let unit = entity.as_unit_mut().unwrap();
        unit.attack(EntityId::from("e1"));
        assert_eq!(unit.disengage(), None);
        assert_eq!(unit.state, UnitState::Idle);
    }

    #[test]
    fn test_attack_move_widens_acquisition() {
        let mut entity = marine();
        let unit = entity.as_unit_mut().unwrap();
        assert_eq!(unit.acquisition_range(), fx(150));
        unit.attack_move_to(Vec2Fixed::from_ints(10, 10));
        assert_eq!(unit.acquisition_range(), fx(225));
    }

    #[test]
    fn test_construction_completes_once() {
        let mut entity = Entity::building(Team::Player, BuildingKind::Reactor, Vec2Fixed::ZERO);
        let building = entity.as_building_mut().unwrap();
        assert!(!building.advance_construction(5_000));
        assert!(building.start_construction(1_000));
        assert!(!building.start_construction(2_000));
        assert!(!building.advance_construction(6_000));
        assert_eq!(building.construction_progress, Fixed::from_num(0.5));
        assert!(building.advance_construction(11_000));
        assert!(building.finish_construction());
        assert!(!building.finish_construction());
        assert!(building.is_active);
    }

    #[test]
    fn test_production_fifo() {
        let id = EntityId::from("b1");
        let mut entity =
            Entity::completed_building(Team::Player, BuildingKind::Barracks, Vec2Fixed::ZERO);
        let building = entity.as_building_mut().unwrap();
        building.enqueue(UnitKind::Warthog, &id).unwrap();
        building.enqueue(UnitKind::Marine, &id).unwrap();
        assert!(building.start_next_production(0));
        assert!(!building.start_next_production(0));
        assert_eq!(building.advance_production(4_999), None);
        assert_eq!(building.advance_production(5_000), Some(UnitKind::Warthog));
        assert_eq!(building.finish_production(), Some(UnitKind::Warthog));
        assert!(building.start_next_production(5_000));
        assert_eq!(building.reserved_units().collect::<Vec<_>>(), vec![UnitKind::Marine]);
    }

    #[test]
    fn test_enqueue_rejections() {
        let id = EntityId::from("d1");
        let mut depot =
            Entity::completed_building(Team::Player, BuildingKind::SupplyDepot, Vec2Fixed::ZERO);
        assert!(matches!(
            depot.as_building_mut().unwrap().enqueue(UnitKind::Marine, &id),
            Err(GameError::CannotProduce { .. })
        ));

        let mut barracks = Entity::building(Team::Player, BuildingKind::Barracks, Vec2Fixed::ZERO);
        assert!(matches!(
            barracks.as_building_mut().unwrap().enqueue(UnitKind::Marine, &id),
            Err(GameError::BuildingNotConstructed(_))
        ));
    }
}
