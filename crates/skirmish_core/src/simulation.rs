//! The simulation engine.
//!
//! Owns the live entity collection and advances it in time. Each call to
//! [`Simulation::tick`] runs every entity's update (movement and combat for
//! units; construction, production and turret fire for buildings), advances
//! visual effects and projectiles, and only then purges everything that died.
//! Purging once per tick keeps an entity killed mid-tick visible to the
//! queries of entities updated after it, so combat resolution does not
//! depend on update order.
//!
//! # Determinism
//!
//! - Fixed-point math only
//! - Entities update in sorted id order
//! - Ties in target selection are broken by id
//!
//! Two peers holding the same entities with the same ids and feeding the same
//! timestamps end up in the same state.
//!
//! # Example
//!
//! ```
//! use skirmish_core::entity::Entity;
//! use skirmish_core::entity_kind::UnitKind;
//! use skirmish_core::math::Vec2Fixed;
//! use skirmish_core::simulation::Simulation;
//! use skirmish_core::team::Team;
//!
//! let mut sim = Simulation::new(Vec2Fixed::from_ints(2400, 1600));
//! let id = sim
//!     .add_entity(Entity::unit(Team::Player, UnitKind::Marine, Vec2Fixed::from_ints(100, 100)))
//!     .unwrap();
//! sim.get_entity_mut(&id)
//!     .and_then(|e| e.as_unit_mut())
//!     .unwrap()
//!     .move_to(Vec2Fixed::from_ints(400, 100));
//! sim.tick(50);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::combat::{in_range, select_target, Authority, TargetInfo};
use crate::components::{EntityId, UnitState};
use crate::entity::Entity;
use crate::entity_kind::UnitKind;
use crate::error::{GameError, Result};
use crate::events::{DamageSource, WorldEvent};
use crate::math::{fx, ms_to_seconds, progress_ratio, Fixed, Vec2Fixed};
use crate::production::{find_rally_point, Body};
use crate::systems::{steer, Motion, Obstacle};
use crate::team::Team;

/// Longest movement step integrated in one tick.
///
/// A peer that stalls (backgrounded host, debugger) resumes with one bounded
/// step instead of teleporting units.
pub const MAX_STEP_MS: u64 = 100;

/// Speed of visual tracer projectiles.
pub const PROJECTILE_SPEED: i32 = 900;

/// Kind of short-lived visual effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Flash at a weapon's muzzle.
    MuzzleFlash,
    /// Impact spark.
    Hit,
    /// Something died.
    Explosion,
}

impl EffectKind {
    /// Lifetime in milliseconds.
    #[must_use]
    pub const fn duration_ms(self) -> u64 {
        match self {
            Self::MuzzleFlash => 80,
            Self::Hit => 150,
            Self::Explosion => 500,
        }
    }
}

/// A short-lived visual effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    /// What to draw.
    pub kind: EffectKind,
    /// Where to draw it.
    pub position: Vec2Fixed,
    /// When it appeared.
    pub started_ms: u64,
}

impl Effect {
    /// Whether the effect has run its course at `now_ms`.
    #[must_use]
    pub fn is_dead(&self, now_ms: u64) -> bool {
        now_ms >= self.started_ms + self.kind.duration_ms()
    }

    /// Fraction of the lifetime elapsed.
    #[must_use]
    pub fn progress(&self, now_ms: u64) -> Fixed {
        progress_ratio(now_ms.saturating_sub(self.started_ms), self.kind.duration_ms())
    }
}

/// A tracer travelling from a shooter to its target. Visual only; damage
/// is resolved when the shot is fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Shooter.
    pub source: EntityId,
    /// Target.
    pub target: EntityId,
    /// Launch point.
    pub from: Vec2Fixed,
    /// Impact point.
    pub to: Vec2Fixed,
    /// Launch time.
    pub started_ms: u64,
    /// Flight time.
    pub travel_ms: u64,
}

impl Projectile {
    fn launch(
        source: EntityId,
        target: EntityId,
        from: Vec2Fixed,
        to: Vec2Fixed,
        now_ms: u64,
    ) -> Self {
        let travel = from.distance(to) * fx(1000) / fx(PROJECTILE_SPEED);
        Self {
            source,
            target,
            from,
            to,
            started_ms: now_ms,
            travel_ms: travel.to_num::<u64>().max(1),
        }
    }

    /// Interpolated position at `now_ms`.
    #[must_use]
    pub fn position(&self, now_ms: u64) -> Vec2Fixed {
        self.from.lerp(
            self.to,
            progress_ratio(now_ms.saturating_sub(self.started_ms), self.travel_ms),
        )
    }

    /// Whether the tracer has arrived.
    #[must_use]
    pub fn is_dead(&self, now_ms: u64) -> bool {
        now_ms >= self.started_ms + self.travel_ms
    }
}

/// Storage for all live entities.
///
/// Uses a `HashMap` for O(1) lookup by id and keeps a sorted id list for
/// deterministic iteration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStorage {
    entities: HashMap<EntityId, Entity>,
    order: Vec<EntityId>,
}

impl EntityStorage {
    /// Create empty entity storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, entity: Entity) {
        let id = entity.id.clone();
        if let Err(slot) = self.order.binary_search(&id) {
            self.order.insert(slot, id.clone());
        }
        self.entities.insert(id, entity);
    }

    fn remove(&mut self, id: &EntityId) -> Option<Entity> {
        if let Ok(slot) = self.order.binary_search(id) {
            self.order.remove(slot);
        }
        self.entities.remove(id)
    }

    /// Get an entity by id.
    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    fn get_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Get the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity ids in sorted order.
    #[must_use]
    pub fn ids(&self) -> &[EntityId] {
        &self.order
    }

    /// Iterate over all entities in sorted id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }
}

/// The core game simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    clock_ms: u64,
    entities: EntityStorage,
    purged: BTreeSet<EntityId>,
    effects: Vec<Effect>,
    projectiles: Vec<Projectile>,
    id_namespace: String,
    next_id: u64,
    authority: Authority,
    world_size: Vec2Fixed,
    #[serde(skip)]
    selection: BTreeSet<EntityId>,
}

impl Simulation {
    /// Create an empty single-player simulation of the given world size.
    #[must_use]
    pub fn new(world_size: Vec2Fixed) -> Self {
        Self {
            clock_ms: 0,
            entities: EntityStorage::new(),
            purged: BTreeSet::new(),
            effects: Vec::new(),
            projectiles: Vec::new(),
            id_namespace: "local".to_string(),
            next_id: 1,
            authority: Authority::Local,
            world_size,
            selection: BTreeSet::new(),
        }
    }

    /// Set who decides what in this simulation.
    pub fn set_authority(&mut self, authority: Authority) {
        self.authority = authority;
    }

    /// Current authority model.
    #[must_use]
    pub const fn authority(&self) -> Authority {
        self.authority
    }

    /// Set the prefix for locally generated ids. Peers must use distinct namespaces.
    pub fn set_id_namespace(&mut self, namespace: impl Into<String>) {
        self.id_namespace = namespace.into();
    }

    /// Time of the last movement tick.
    #[must_use]
    pub const fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    /// World dimensions.
    #[must_use]
    pub const fn world_size(&self) -> Vec2Fixed {
        self.world_size
    }

    /// Get a reference to the entity storage.
    #[must_use]
    pub fn entities(&self) -> &EntityStorage {
        &self.entities
    }

    /// Get an entity by id.
    #[must_use]
    pub fn get_entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Get a mutable entity by id.
    pub fn get_entity_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Whether `id` belonged to an entity that has since been purged.
    #[must_use]
    pub fn was_purged(&self, id: &EntityId) -> bool {
        self.purged.contains(id)
    }

    /// Generate a fresh id for an entity owned by `team`.
    pub fn generate_id(&mut self, team: Team) -> EntityId {
        loop {
            let id = EntityId::new(format!("{}-{}-{}", self.id_namespace, team, self.next_id));
            self.next_id += 1;
            if !self.entities.contains(&id) && !self.purged.contains(&id) {
                return id;
            }
        }
    }

    /// Add an entity to the live collection.
    ///
    /// An id is generated only when the entity has none, so ids assigned by
    /// a remote peer are kept verbatim. Ids are never reused.
    pub fn add_entity(&mut self, mut entity: Entity) -> Result<EntityId> {
        if !entity.id.is_assigned() {
            entity.id = self.generate_id(entity.team);
        } else if self.entities.contains(&entity.id) || self.purged.contains(&entity.id) {
            return Err(GameError::DuplicateEntity(entity.id));
        }
        let id = entity.id.clone();
        self.entities.insert(entity);
        Ok(id)
    }

    /// Remove an entity from the live collection and from the selection.
    ///
    /// The id is retired and never reassigned.
    pub fn remove_entity(&mut self, id: &EntityId) -> Option<Entity> {
        let removed = self.entities.remove(id)?;
        self.selection.remove(id);
        self.purged.insert(id.clone());
        Some(removed)
    }

    /// All entities within `radius` of `point`, inclusive.
    #[must_use]
    pub fn get_entities_near(&self, point: Vec2Fixed, radius: Fixed) -> Vec<&Entity> {
        let radius_sq = radius.saturating_mul(radius);
        self.entities
            .iter()
            .filter(|entity| entity.position.distance_squared(point) <= radius_sq)
            .collect()
    }

    /// All entities whose position lies in the rectangle at (`x`, `y`) of
    /// size `width` × `height`. Negative sizes extend left or up.
    #[must_use]
    pub fn get_entities_in_area(
        &self,
        x: Fixed,
        y: Fixed,
        width: Fixed,
        height: Fixed,
    ) -> Vec<&Entity> {
        let (min_x, max_x) = if width < Fixed::ZERO { (x + width, x) } else { (x, x + width) };
        let (min_y, max_y) = if height < Fixed::ZERO { (y + height, y) } else { (y, y + height) };
        self.entities
            .iter()
            .filter(|entity| {
                let p = entity.position;
                p.x >= min_x && p.x <= max_x && p.y >= min_y && p.y <= max_y
            })
            .collect()
    }

    /// Add a live entity to the selection.
    pub fn select(&mut self, id: &EntityId) -> bool {
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        if entity.is_dead() {
            return false;
        }
        if let Some(unit) = entity.as_unit_mut() {
            unit.selected = true;
        }
        self.selection.insert(id.clone())
    }

    /// Remove an entity from the selection.
    pub fn deselect(&mut self, id: &EntityId) {
        if let Some(unit) = self.entities.get_mut(id).and_then(Entity::as_unit_mut) {
            unit.selected = false;
        }
        self.selection.remove(id);
    }

    /// Empty the selection.
    pub fn clear_selection(&mut self) {
        for id in std::mem::take(&mut self.selection) {
            if let Some(unit) = self.entities.get_mut(&id).and_then(Entity::as_unit_mut) {
                unit.selected = false;
            }
        }
    }

    /// Selected entity ids in sorted order.
    pub fn selection(&self) -> impl Iterator<Item = &EntityId> {
        self.selection.iter()
    }

    /// Active visual effects.
    #[must_use]
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Tracers in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Spawn a visual effect.
    pub fn add_effect(&mut self, kind: EffectKind, position: Vec2Fixed, now_ms: u64) {
        self.effects.push(Effect {
            kind,
            position,
            started_ms: now_ms,
        });
    }

    /// Footprints of every standing building.
    #[must_use]
    pub fn building_obstacles(&self) -> Vec<Obstacle> {
        self.entities
            .iter()
            .filter(|entity| !entity.is_dead())
            .filter_map(|entity| {
                entity.as_building().map(|building| Obstacle {
                    center: entity.position,
                    half_extent: building.size / fx(2),
                })
            })
            .collect()
    }

    /// Advance the simulation to `now_ms`.
    ///
    /// Returns events generated during this tick for use by the game layer.
    pub fn tick(&mut self, now_ms: u64) -> Vec<WorldEvent> {
        let dt_ms = now_ms.saturating_sub(self.clock_ms).min(MAX_STEP_MS);
        self.clock_ms = self.clock_ms.max(now_ms);
        let dt = ms_to_seconds(dt_ms);

        let ids = self.entities.ids().to_vec();
        let targets: Vec<TargetInfo> = self
            .entities
            .iter()
            .filter(|entity| !entity.is_dead())
            .map(TargetInfo::of)
            .collect();
        let obstacles = self.building_obstacles();

        let mut events = Vec::new();
        for id in &ids {
            let is_unit = match self.entities.get(id) {
                Some(entity) if !entity.is_dead() => entity.is_unit(),
                _ => continue,
            };
            if is_unit {
                self.update_unit(id, now_ms, dt, &targets, &obstacles, &mut events);
            } else {
                self.update_building(id, now_ms, Some(&targets), &mut events);
            }
        }

        self.purge(now_ms, &mut events);

        #[cfg(feature = "debug-validation")]
        tracing::trace!(now_ms, state_hash = self.state_hash(), "Simulation state hash");

        events
    }

    /// Advance construction and production timers only.
    ///
    /// Used by the background tick so buildings keep progressing while the
    /// frame-driven tick is throttled. Units do not move and turrets do not
    /// fire.
    pub fn tick_background(&mut self, now_ms: u64) -> Vec<WorldEvent> {
        let ids = self.entities.ids().to_vec();
        let mut events = Vec::new();
        for id in &ids {
            let is_building = self
                .entities
                .get(id)
                .is_some_and(|entity| !entity.is_dead() && !entity.is_unit());
            if is_building {
                self.update_building(id, now_ms, None, &mut events);
            }
        }
        self.purge(now_ms, &mut events);
        events
    }

    fn update_unit(
        &mut self,
        id: &EntityId,
        now_ms: u64,
        dt: Fixed,
        targets: &[TargetInfo],
        obstacles: &[Obstacle],
        events: &mut Vec<WorldEvent>,
    ) {
        let may_acquire = self.entities.get(id).is_some_and(|entity| {
            self.authority.owns(entity.team)
                && entity.as_unit().is_some_and(|unit| unit.may_acquire())
        });

        if may_acquire {
            let Some(entity) = self.entities.get_mut(id) else {
                return;
            };
            let team = entity.team;
            let position = entity.position;
            if let Some(unit) = entity.as_unit_mut() {
                let range = unit.acquisition_range();
                if let Some(found) = select_target(position, team, range, targets) {
                    unit.engage(found.id.clone());
                    tracing::trace!(attacker = %id, target = %found.id, "Acquired target on sight");
                    events.push(WorldEvent::AttackStarted {
                        attacker: id.clone(),
                        target: found.id.clone(),
                        team,
                    });
                }
            }
        }

        let target_id = self
            .entities
            .get(id)
            .and_then(Entity::as_unit)
            .and_then(|unit| unit.attack_target.clone());

        if let Some(target_id) = target_id {
            let target = self
                .entities
                .get(&target_id)
                .filter(|target| !target.is_dead())
                .map(|target| (target.position, target.radius()));

            let authority = self.authority;
            let Some(entity) = self.entities.get_mut(id) else {
                return;
            };
            let position = entity.position;
            let team = entity.team;
            let Some(unit) = entity.as_unit_mut() else {
                return;
            };

            let owned = authority.owns(team);
            let attack_move = unit.attack_move;
            let mut resumed = None;
            match target {
                None => resumed = unit.disengage(),
                Some((target_position, target_radius)) => {
                    if in_range(position, unit.weapon.range, target_position, target_radius) {
                        unit.state = UnitState::Attacking;
                        unit.destination = None;
                        unit.velocity = Vec2Fixed::ZERO;
                        if unit.weapon.is_ready(unit.last_attack_ms, now_ms) {
                            unit.last_attack_ms = Some(now_ms);
                            let damage = unit.weapon.damage;
                            self.resolve_unit_attack(id, &target_id, damage, now_ms, events);
                        }
                    } else if unit.saved_destination.is_some()
                        && !in_range(
                            position,
                            unit.acquisition_range(),
                            target_position,
                            target_radius,
                        )
                    {
                        resumed = unit.disengage();
                    } else {
                        unit.chase(target_position);
                    }
                }
            }

            // The other peer mirrored a plain attack, so it cannot resume on its own.
            if let Some(destination) = resumed.filter(|_| owned) {
                let event = if attack_move {
                    WorldEvent::AttackMoveOrdered {
                        unit: id.clone(),
                        team,
                        destination,
                    }
                } else {
                    WorldEvent::UnitMoved {
                        unit: id.clone(),
                        team,
                        destination,
                    }
                };
                tracing::trace!(unit = %id, "Resumed trip after engagement");
                events.push(event);
            }
        }

        let world_size = self.world_size;
        let Some(entity) = self.entities.get_mut(id) else {
            return;
        };
        let position = entity.position;
        let Some(unit) = entity.as_unit_mut() else {
            return;
        };
        if unit.state != UnitState::Moving {
            return;
        }
        let Some(destination) = unit.destination else {
            unit.arrive();
            return;
        };
        let motion = Motion {
            position,
            velocity: unit.velocity,
            max_speed: unit.max_speed,
            acceleration: unit.acceleration,
            radius: unit.radius,
        };
        let step = steer(&motion, destination, obstacles, world_size, dt);
        unit.velocity = step.velocity;
        if step.arrived {
            unit.arrive();
        }
        entity.position = step.position;
    }

    fn resolve_unit_attack(
        &mut self,
        attacker: &EntityId,
        target_id: &EntityId,
        damage: u32,
        now_ms: u64,
        events: &mut Vec<WorldEvent>,
    ) {
        let Some((team, from)) = self.entities.get(attacker).map(|e| (e.team, e.position)) else {
            return;
        };
        events.push(WorldEvent::AttackPerformed {
            attacker: attacker.clone(),
            target: target_id.clone(),
            team,
            at_ms: now_ms,
        });

        let authority = self.authority;
        let Some(target) = self.entities.get_mut(target_id) else {
            return;
        };
        let to = target.position;
        if authority.applies_unit_damage(target.team) {
            let dealt = target.apply_damage(damage);
            let died = target.is_dead();
            if dealt > 0 {
                events.push(WorldEvent::Damaged {
                    source: DamageSource::Unit(attacker.clone()),
                    target: target_id.clone(),
                    target_team: target.team,
                    amount: dealt,
                    new_health: target.health.current,
                });
            }
            if died {
                self.add_effect(EffectKind::Explosion, to, now_ms);
            }
        }

        self.add_effect(EffectKind::MuzzleFlash, from, now_ms);
        self.add_effect(EffectKind::Hit, to, now_ms);
        self.projectiles.push(Projectile::launch(
            attacker.clone(),
            target_id.clone(),
            from,
            to,
            now_ms,
        ));
    }

    fn update_building(
        &mut self,
        id: &EntityId,
        now_ms: u64,
        targets: Option<&[TargetInfo]>,
        events: &mut Vec<WorldEvent>,
    ) {
        let authority = self.authority;
        let Some(entity) = self.entities.get_mut(id) else {
            return;
        };
        let team = entity.team;
        let owned = authority.owns(team);
        let Some(building) = entity.as_building_mut() else {
            return;
        };

        if building.under_construction {
            if building.advance_construction(now_ms) && owned && building.finish_construction() {
                tracing::debug!(
                    building = %id,
                    kind = ?building.building_kind,
                    "Construction complete"
                );
                events.push(WorldEvent::ConstructionCompleted {
                    building: id.clone(),
                    team,
                    kind: building.building_kind,
                });
            }
            return;
        }

        building.start_next_production(now_ms);
        if let Some(unit_kind) = building.advance_production(now_ms) {
            if owned {
                self.spawn_produced(id, unit_kind, now_ms, events);
            }
        }

        if let Some(targets) = targets {
            self.update_turret(id, now_ms, targets, events);
        }
    }

    fn spawn_produced(
        &mut self,
        building_id: &EntityId,
        unit_kind: UnitKind,
        now_ms: u64,
        events: &mut Vec<WorldEvent>,
    ) {
        let position = self.rally_point_for(building_id, unit_kind);
        let Some((team, finished)) = self.entities.get_mut(building_id).and_then(|entity| {
            let team = entity.team;
            entity.as_building_mut().map(|b| (team, b.finish_production()))
        }) else {
            return;
        };
        if finished.is_none() {
            return;
        }

        match self.add_entity(Entity::unit(team, unit_kind, position)) {
            Ok(unit) => {
                tracing::debug!(
                    building = %building_id,
                    unit = %unit,
                    kind = ?unit_kind,
                    "Unit produced"
                );
                events.push(WorldEvent::UnitSpawned {
                    unit,
                    team,
                    unit_kind,
                    position,
                    building: building_id.clone(),
                });
            }
            Err(error) => {
                tracing::warn!(building = %building_id, %error, "Failed to spawn produced unit");
            }
        }

        if let Some(building) =
            self.entities.get_mut(building_id).and_then(Entity::as_building_mut)
        {
            building.start_next_production(now_ms);
        }
    }

    /// Where a unit produced by `building_id` would appear right now.
    #[must_use]
    pub fn rally_point_for(&self, building_id: &EntityId, unit_kind: UnitKind) -> Vec2Fixed {
        let Some(entity) = self.entities.get(building_id) else {
            return Vec2Fixed::ZERO;
        };
        let size = entity.as_building().map_or(Fixed::ZERO, |b| b.size);
        let bodies: Vec<Body> = self
            .entities
            .iter()
            .filter(|e| !e.is_dead())
            .filter_map(|e| {
                e.as_unit().map(|unit| Body {
                    position: e.position,
                    radius: unit.radius,
                })
            })
            .collect();
        find_rally_point(
            entity.position,
            size,
            unit_kind.stats().radius,
            self.world_size,
            &bodies,
            &self.building_obstacles(),
        )
    }

    fn update_turret(
        &mut self,
        id: &EntityId,
        now_ms: u64,
        targets: &[TargetInfo],
        events: &mut Vec<WorldEvent>,
    ) {
        let Some(entity) = self.entities.get(id) else {
            return;
        };
        let team = entity.team;
        let position = entity.position;
        let Some(building) = entity.as_building() else {
            return;
        };
        let Some(weapon) = building.weapon.filter(|_| building.is_active) else {
            return;
        };

        let current = building.attack_target.clone().filter(|target_id| {
            self.entities
                .get(target_id)
                .is_some_and(|t| {
                    !t.is_dead() && in_range(position, weapon.range, t.position, t.radius())
                })
        });
        let (target_id, acquired) = match current {
            Some(target_id) => (Some(target_id), false),
            None => (
                select_target(position, team, weapon.range, targets).map(|t| t.id.clone()),
                true,
            ),
        };

        let ready = weapon.is_ready(building.last_attack_ms, now_ms);
        let Some(building) = self.entities.get_mut(id).and_then(Entity::as_building_mut) else {
            return;
        };
        building.attack_target = target_id.clone();
        let Some(target_id) = target_id else {
            return;
        };
        if acquired {
            events.push(WorldEvent::TurretTargetAcquired {
                turret: id.clone(),
                target: target_id.clone(),
                team,
            });
        }
        if !ready {
            return;
        }
        building.last_attack_ms = Some(now_ms);

        let Some(target) = self.entities.get_mut(&target_id) else {
            return;
        };
        if target.is_dead() {
            return;
        }
        let target_team = target.team;
        let to = target.position;
        let dealt = target.apply_damage(weapon.damage);
        let new_health = target.health.current;
        let died = target.is_dead();

        events.push(WorldEvent::TurretFired {
            turret: id.clone(),
            target: target_id.clone(),
            team,
            damage: dealt,
            target_team,
            at_ms: now_ms,
        });
        events.push(WorldEvent::Damaged {
            source: DamageSource::Turret(id.clone()),
            target: target_id.clone(),
            target_team,
            amount: dealt,
            new_health,
        });

        self.add_effect(EffectKind::MuzzleFlash, position, now_ms);
        if died {
            self.add_effect(EffectKind::Explosion, to, now_ms);
        }
        self.projectiles
            .push(Projectile::launch(id.clone(), target_id, position, to, now_ms));
    }

    /// Filter out dead entities, expired effects and arrived tracers.
    fn purge(&mut self, now_ms: u64, events: &mut Vec<WorldEvent>) {
        let dead: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|entity| entity.is_dead())
            .map(|entity| entity.id.clone())
            .collect();
        for id in dead {
            if let Some(entity) = self.remove_entity(&id) {
                tracing::debug!(entity = %id, team = %entity.team, "Purged dead entity");
                events.push(WorldEvent::Died {
                    entity: id,
                    team: entity.team,
                    entity_type: entity.entity_type(),
                });
            }
        }
        self.effects.retain(|effect| !effect.is_dead(now_ms));
        self.projectiles.retain(|projectile| !projectile.is_dead(now_ms));
    }

    /// Compute a deterministic hash of the simulation state.
    ///
    /// Covers what both peers must agree on: ids, positions, health, death
    /// flags and construction state. Selection and visuals are excluded.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.entities.len().hash(&mut hasher);

        for entity in self.entities.iter() {
            entity.id.hash(&mut hasher);
            entity.team.hash(&mut hasher);
            entity.position.hash(&mut hasher);
            entity.health.current.hash(&mut hasher);
            entity.is_dead().hash(&mut hasher);
            entity.entity_type().hash(&mut hasher);

            if let Some(building) = entity.as_building() {
                building.under_construction.hash(&mut hasher);
                building.construction_progress.to_bits().hash(&mut hasher);
            }
        }

        hasher.finish()
    }

    /// Serialize the simulation state to bytes.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize simulation: {e}")))
    }

    /// Deserialize a simulation state from bytes.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize simulation: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Health;
    use crate::entity_kind::BuildingKind;

    fn world() -> Vec2Fixed {
        Vec2Fixed::from_ints(2400, 1600)
    }

    fn marine(team: Team, x: i32, y: i32) -> Entity {
        Entity::unit(team, UnitKind::Marine, Vec2Fixed::from_ints(x, y))
    }

    #[test]
    fn test_add_entity_keeps_assigned_ids() {
        let mut sim = Simulation::new(world());
        let generated = sim.add_entity(marine(Team::Player, 0, 0)).unwrap();
        assert_eq!(generated.as_str(), "local-player-1");

        let kept = sim.add_entity(marine(Team::Enemy, 0, 0).with_id("u1")).unwrap();
        assert_eq!(kept.as_str(), "u1");
        assert!(matches!(
            sim.add_entity(marine(Team::Enemy, 0, 0).with_id("u1")),
            Err(GameError::DuplicateEntity(_))
        ));
    }

    #[test]
    fn test_removed_ids_are_never_reused() {
        let mut sim = Simulation::new(world());
        let id = sim.add_entity(marine(Team::Player, 0, 0).with_id("u1")).unwrap();
        sim.select(&id);
        assert!(sim.remove_entity(&id).is_some());
        assert_eq!(sim.selection().count(), 0);
        assert!(sim.was_purged(&id));
        assert!(sim.add_entity(marine(Team::Player, 0, 0).with_id("u1")).is_err());
    }

    #[test]
    fn test_spatial_queries() {
        let mut sim = Simulation::new(world());
        sim.add_entity(marine(Team::Player, 100, 100).with_id("a")).unwrap();
        sim.add_entity(marine(Team::Player, 150, 100).with_id("b")).unwrap();
        sim.add_entity(marine(Team::Player, 400, 400).with_id("c")).unwrap();

        let near = sim.get_entities_near(Vec2Fixed::from_ints(100, 100), fx(50));
        assert_eq!(near.len(), 2);

        let area = sim.get_entities_in_area(fx(90), fx(90), fx(20), fx(20));
        assert_eq!(area.len(), 1);
        let backwards = sim.get_entities_in_area(fx(410), fx(410), fx(-20), fx(-20));
        assert_eq!(backwards[0].id.as_str(), "c");
    }

    #[test]
    fn test_unit_moves_toward_destination() {
        let mut sim = Simulation::new(world());
        let id = sim.add_entity(marine(Team::Player, 100, 100)).unwrap();
        sim.get_entity_mut(&id)
            .and_then(Entity::as_unit_mut)
            .unwrap()
            .move_to(Vec2Fixed::from_ints(130, 100));

        for step in 1..=40 {
            sim.tick(step * 50);
        }
        let entity = sim.get_entity(&id).unwrap();
        assert_eq!(entity.position, Vec2Fixed::from_ints(130, 100));
        assert_eq!(entity.as_unit().unwrap().state, UnitState::Idle);
    }

    #[test]
    fn test_dead_entities_purged_after_tick() {
        let mut sim = Simulation::new(world());
        let id = sim.add_entity(marine(Team::Enemy, 900, 900)).unwrap();
        sim.get_entity_mut(&id).unwrap().apply_damage(1_000);
        assert!(sim.get_entity(&id).is_some());
        let events = sim.tick(50);
        assert!(sim.get_entity(&id).is_none());
        assert!(events
            .iter()
            .any(|e| matches!(e, WorldEvent::Died { entity, .. } if *entity == id)));
    }

    #[test]
    fn test_marine_kills_in_four_hits() {
        let mut sim = Simulation::new(world());
        let attacker = sim.add_entity(marine(Team::Player, 100, 100)).unwrap();
        let mut dummy = Entity::completed_building(
            Team::Enemy,
            BuildingKind::Generic,
            Vec2Fixed::from_ints(200, 100),
        );
        dummy.health = Health::new(80);
        let target = sim.add_entity(dummy).unwrap();

        let mut hits = 0;
        let mut now = 0;
        while sim.get_entity(&target).is_some() && now < 10_000 {
            now += 50;
            let events = sim.tick(now);
            hits += events
                .iter()
                .filter(|e| {
                    matches!(
                        e,
                        WorldEvent::Damaged { target: t, source: DamageSource::Unit(a), .. }
                            if *t == target && *a == attacker
                    )
                })
                .count();
        }
        assert!(sim.get_entity(&target).is_none());
        assert_eq!(hits, 4);
    }

    #[test]
    fn test_peer_does_not_damage_remote_units() {
        let mut sim = Simulation::new(world());
        sim.set_authority(Authority::Peer {
            local_team: Team::Player,
        });
        sim.add_entity(marine(Team::Player, 100, 100).with_id("mine")).unwrap();
        sim.add_entity(marine(Team::Enemy, 200, 100).with_id("theirs")).unwrap();

        let events = sim.tick(50);
        let theirs = sim.get_entity(&EntityId::from("theirs")).unwrap();
        assert_eq!(theirs.health.current, 80);
        assert!(events
            .iter()
            .any(|e| matches!(e, WorldEvent::AttackPerformed { .. })));
        assert!(!events.iter().any(|e| matches!(e, WorldEvent::Damaged { .. })));

        // Remote units never pick targets on their own.
        let mine = sim.get_entity(&EntityId::from("mine")).unwrap();
        assert_eq!(mine.health.current, 80);
    }

    #[test]
    fn test_target_death_releases_attacker() {
        let mut sim = Simulation::new(world());
        let attacker = sim.add_entity(marine(Team::Player, 100, 100)).unwrap();
        let target = sim.add_entity(marine(Team::Enemy, 200, 100)).unwrap();
        sim.tick(50);
        assert_eq!(
            sim.get_entity(&attacker).and_then(Entity::as_unit).map(|u| u.state),
            Some(UnitState::Attacking)
        );

        sim.get_entity_mut(&target).unwrap().kill();
        sim.tick(100);
        let unit = sim.get_entity(&attacker).and_then(Entity::as_unit).unwrap();
        assert_ne!(unit.state, UnitState::Attacking);
        assert!(unit.attack_target.is_none());
    }

    #[test]
    fn test_interrupted_move_resumes() {
        let mut sim = Simulation::new(world());
        let mover = sim.add_entity(marine(Team::Player, 100, 100)).unwrap();
        let target = sim.add_entity(marine(Team::Enemy, 200, 100)).unwrap();
        sim.get_entity_mut(&mover)
            .and_then(Entity::as_unit_mut)
            .unwrap()
            .move_to(Vec2Fixed::from_ints(100, 900));

        sim.tick(50);
        let unit = sim.get_entity(&mover).and_then(Entity::as_unit).unwrap();
        assert_eq!(unit.state, UnitState::Attacking);
        assert_eq!(unit.saved_destination, Some(Vec2Fixed::from_ints(100, 900)));

        sim.get_entity_mut(&target).unwrap().kill();
        sim.tick(100);
        let unit = sim.get_entity(&mover).and_then(Entity::as_unit).unwrap();
        assert_eq!(unit.state, UnitState::Moving);
        assert_eq!(unit.destination, Some(Vec2Fixed::from_ints(100, 900)));
    }

    #[test]
    fn test_resumed_trip_is_announced_by_owner() {
        let mut sim = Simulation::new(world());
        sim.set_authority(Authority::Peer {
            local_team: Team::Player,
        });
        let mover = sim.add_entity(marine(Team::Player, 100, 100).with_id("mine")).unwrap();
        let dummy = Entity::completed_building(
            Team::Enemy,
            BuildingKind::Generic,
            Vec2Fixed::from_ints(200, 100),
        );
        let target = sim.add_entity(dummy.with_id("dummy")).unwrap();
        sim.get_entity_mut(&mover)
            .and_then(Entity::as_unit_mut)
            .unwrap()
            .move_to(Vec2Fixed::from_ints(100, 900));

        let events = sim.tick(50);
        assert!(events
            .iter()
            .any(|e| matches!(e, WorldEvent::AttackStarted { target: t, .. } if *t == target)));

        sim.get_entity_mut(&target).unwrap().kill();
        let events = sim.tick(100);
        let resumed: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                WorldEvent::UnitMoved { unit, destination, .. } if *unit == mover => {
                    Some(*destination)
                }
                _ => None,
            })
            .collect();
        assert_eq!(resumed, vec![Vec2Fixed::from_ints(100, 900)]);
    }

    #[test]
    fn test_remote_unit_resume_stays_silent() {
        let mut sim = Simulation::new(world());
        sim.set_authority(Authority::Peer {
            local_team: Team::Enemy,
        });
        let mover = sim.add_entity(marine(Team::Player, 100, 100).with_id("theirs")).unwrap();
        let target = sim.add_entity(marine(Team::Enemy, 200, 100).with_id("mine")).unwrap();
        {
            let unit = sim.get_entity_mut(&mover).and_then(Entity::as_unit_mut).unwrap();
            unit.move_to(Vec2Fixed::from_ints(100, 900));
            unit.engage(target.clone());
        }

        sim.get_entity_mut(&target).unwrap().kill();
        let events = sim.tick(50);
        assert!(!events
            .iter()
            .any(|e| matches!(e, WorldEvent::UnitMoved { unit, .. } if *unit == mover)));
        let unit = sim.get_entity(&mover).and_then(Entity::as_unit).unwrap();
        assert_eq!(unit.state, UnitState::Moving);
    }

    #[test]
    fn test_remote_construction_waits_for_completion() {
        let mut sim = Simulation::new(world());
        sim.set_authority(Authority::Peer {
            local_team: Team::Player,
        });
        let at = Vec2Fixed::from_ints(2000, 800);
        let mut depot = Entity::building(Team::Enemy, BuildingKind::SupplyDepot, at);
        depot.as_building_mut().unwrap().start_construction(0);
        let id = sim.add_entity(depot).unwrap();

        let events = sim.tick_background(20_000);
        assert!(events.is_empty());
        let building = sim.get_entity(&id).and_then(Entity::as_building).unwrap();
        assert!(building.under_construction);
        assert_eq!(building.construction_progress, fx(1));
    }

    #[test]
    fn test_barracks_spawns_at_rally_point() {
        let mut sim = Simulation::new(world());
        let id = sim
            .add_entity(Entity::completed_building(
                Team::Player,
                BuildingKind::Barracks,
                Vec2Fixed::from_ints(500, 500),
            ))
            .unwrap();
        sim.get_entity_mut(&id)
            .and_then(Entity::as_building_mut)
            .unwrap()
            .enqueue(UnitKind::Marine, &id)
            .unwrap();

        sim.tick_background(0);
        let events = sim.tick_background(3_000);
        let spawned = events.iter().find_map(|e| match e {
            WorldEvent::UnitSpawned { unit, position, .. } => Some((unit.clone(), *position)),
            _ => None,
        });
        let (unit, position) = spawned.unwrap();
        assert_eq!(position, Vec2Fixed::from_ints(500, 567));
        assert!(sim.get_entity(&unit).is_some());
        assert!(!sim.get_entity(&id).and_then(Entity::as_building).unwrap().is_producing());
    }

    #[test]
    fn test_turret_damages_any_team() {
        let mut sim = Simulation::new(world());
        sim.set_authority(Authority::Peer {
            local_team: Team::Player,
        });
        let at = Vec2Fixed::from_ints(500, 500);
        let turret = Entity::completed_building(Team::Enemy, BuildingKind::Turret, at);
        sim.add_entity(turret.with_id("turret")).unwrap();
        sim.add_entity(marine(Team::Player, 500, 650).with_id("victim")).unwrap();
        sim.get_entity_mut(&EntityId::from("victim"))
            .and_then(Entity::as_unit_mut)
            .unwrap()
            .stop();

        let events = sim.tick(50);
        assert!(events
            .iter()
            .any(|e| matches!(e, WorldEvent::TurretFired { damage: 20, .. })));
        assert_eq!(sim.get_entity(&EntityId::from("victim")).unwrap().health.current, 60);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut sim = Simulation::new(world());
        sim.add_entity(marine(Team::Player, 100, 100)).unwrap();
        sim.tick(50);
        let bytes = sim.serialize().unwrap();
        let restored = Simulation::deserialize(&bytes).unwrap();
        assert_eq!(sim.state_hash(), restored.state_hash());
    }
}
