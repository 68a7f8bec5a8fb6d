//! The match world: simulation plus per-team economy, construction and base
//! layouts.
//!
//! [`GameWorld`] is the one place that changes match state. Local orders come
//! in through [`GameWorld::issue`] and are validated before anything is
//! spent. State announced by a remote peer comes in through the `mirror_*`
//! methods, which apply it verbatim and never re-derive it.

use serde::{Deserialize, Serialize};

use crate::base_layout::BaseLayout;
use crate::combat::Authority;
use crate::components::EntityId;
use crate::construction::{ConstructionQueue, Submission};
use crate::config::GameConfig;
use crate::economy::{ResourceLedger, TeamCensus};
use crate::entity::Entity;
use crate::entity_kind::{BuildingKind, EntityType, UnitKind};
use crate::error::{GameError, Result};
use crate::events::WorldEvent;
use crate::math::{fx, Fixed, Vec2Fixed};
use crate::player_facade::PlayerCommand;
use crate::simulation::Simulation;
use crate::team::{Team, TeamMap};

/// Marines each team starts with.
pub const STARTING_MARINES: u32 = 2;

/// Forward distance from the base to the starting marines, clear of every slot.
const MARINE_OFFSET: i32 = 340;

/// Fixed id of a team's base, identical on both peers.
#[must_use]
pub fn base_id(team: Team) -> EntityId {
    EntityId::new(format!("{team}-base"))
}

/// Fixed id of a starting marine, identical on both peers.
#[must_use]
pub fn starting_marine_id(team: Team, n: u32) -> EntityId {
    EntityId::new(format!("{team}-marine-{n}"))
}

/// A whole match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameWorld {
    config: GameConfig,
    sim: Simulation,
    ledgers: TeamMap<ResourceLedger>,
    construction: TeamMap<ConstructionQueue>,
    layouts: TeamMap<BaseLayout>,
    winner: Option<Team>,
    last_economy_ms: Option<u64>,
}

impl GameWorld {
    /// An empty world: no bases, no units.
    #[must_use]
    pub fn empty(config: GameConfig) -> Self {
        let sim = Simulation::new(config.world_size());
        let ledgers = TeamMap::from_fn(|_| ResourceLedger::new(&config));
        let layouts = TeamMap::from_fn(|team| BaseLayout::new(team, config.base_position(team)));
        Self {
            config,
            sim,
            ledgers,
            construction: TeamMap::default(),
            layouts,
            winner: None,
            last_economy_ms: None,
        }
    }

    /// A world set up for a match: both bases and their starting marines.
    ///
    /// Setup entities get fixed ids so both peers agree on them without
    /// exchanging a message.
    #[must_use]
    pub fn new_match(config: GameConfig) -> Self {
        let mut world = Self::empty(config);
        for team in Team::ALL {
            let center = world.config.base_position(team);
            let base = Entity::completed_building(team, BuildingKind::Base, center);
            if let Err(error) = world.sim.add_entity(base.with_id(base_id(team))) {
                tracing::warn!(%team, %error, "Failed to place base");
            }

            let forward = match team {
                Team::Player => 1,
                Team::Enemy => -1,
            };
            for (n, lateral) in (1..=STARTING_MARINES).zip([-40, 40]) {
                let position = center + Vec2Fixed::from_ints(MARINE_OFFSET * forward, lateral);
                let marine = Entity::unit(team, UnitKind::Marine, position)
                    .with_id(starting_marine_id(team, n));
                if let Err(error) = world.sim.add_entity(marine) {
                    tracing::warn!(%team, %error, "Failed to place starting marine");
                }
            }
        }
        world.refresh_ledgers(0);
        world
    }

    /// Match configuration.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The simulation.
    #[must_use]
    pub fn sim(&self) -> &Simulation {
        &self.sim
    }

    /// The simulation, mutably. For local-only affordances such as selection.
    pub fn sim_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    /// Set the authority model and the id namespace for generated ids.
    pub fn configure_peer(&mut self, authority: Authority, id_namespace: impl Into<String>) {
        self.sim.set_authority(authority);
        self.sim.set_id_namespace(id_namespace);
    }

    /// `team`'s resources.
    #[must_use]
    pub fn ledger(&self, team: Team) -> &ResourceLedger {
        self.ledgers.get(team)
    }

    /// `team`'s resources, mutably. For admin adjustments.
    pub fn ledger_mut(&mut self, team: Team) -> &mut ResourceLedger {
        self.ledgers.get_mut(team)
    }

    /// `team`'s base slots.
    #[must_use]
    pub fn layout(&self, team: Team) -> &BaseLayout {
        self.layouts.get(team)
    }

    /// `team`'s construction queue.
    #[must_use]
    pub fn construction(&self, team: Team) -> &ConstructionQueue {
        self.construction.get(team)
    }

    /// The winning team, once decided.
    #[must_use]
    pub const fn winner(&self) -> Option<Team> {
        self.winner
    }

    /// Whether the match is over.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// Frame-driven step: the full simulation tick plus bookkeeping.
    pub fn tick(&mut self, now_ms: u64) -> Vec<WorldEvent> {
        let mut events = self.sim.tick(now_ms);
        self.settle(now_ms, &mut events);
        events
    }

    /// Fixed-period step that keeps construction, production and the
    /// economy moving when frames are not being delivered.
    pub fn background_tick(&mut self, now_ms: u64) -> Vec<WorldEvent> {
        let mut events = self.sim.tick_background(now_ms);
        self.settle(now_ms, &mut events);
        events
    }

    fn settle(&mut self, now_ms: u64, events: &mut Vec<WorldEvent>) {
        let mut follow_up = Vec::new();
        for event in events.iter() {
            match event {
                WorldEvent::ConstructionCompleted { building, team, .. } => {
                    self.advance_construction_queue(*team, building, now_ms, &mut follow_up);
                }
                WorldEvent::Died {
                    entity,
                    team,
                    entity_type,
                } => {
                    self.layouts.get_mut(*team).release(entity);
                    if matches!(entity_type, EntityType::Building(_)) {
                        self.advance_construction_queue(*team, entity, now_ms, &mut follow_up);
                    }
                    if *entity_type == EntityType::Building(BuildingKind::Base)
                        && self.winner.is_none()
                    {
                        let winner = team.opponent();
                        self.winner = Some(winner);
                        tracing::info!(%winner, loser = %team, "Base destroyed, match over");
                        follow_up.push(WorldEvent::GameOver { winner });
                    }
                }
                _ => {}
            }
        }
        events.extend(follow_up);
        self.refresh_ledgers(now_ms);
    }

    fn advance_construction_queue(
        &mut self,
        team: Team,
        finished: &EntityId,
        now_ms: u64,
        events: &mut Vec<WorldEvent>,
    ) {
        let Some(next) = self.construction.get_mut(team).release(finished) else {
            return;
        };
        let Some(entity) = self.sim.get_entity_mut(&next) else {
            return;
        };
        let position = entity.position;
        let Some(building) = entity.as_building_mut() else {
            return;
        };
        if building.start_construction(now_ms) {
            tracing::debug!(building = %next, %team, "Queued construction started");
            events.push(WorldEvent::ConstructionStarted {
                building: next.clone(),
                team,
                kind: building.building_kind,
                position,
            });
        }
    }

    fn refresh_ledgers(&mut self, now_ms: u64) {
        let elapsed = self
            .last_economy_ms
            .map_or(0, |last| now_ms.saturating_sub(last));
        self.last_economy_ms = Some(self.last_economy_ms.map_or(now_ms, |last| last.max(now_ms)));
        for team in Team::ALL {
            let census = TeamCensus::take(&self.sim, team);
            let ledger = self.ledgers.get_mut(team);
            ledger.recompute(&census, &self.config);
            ledger.accrue(elapsed);
        }
    }

    /// Validate and apply an order from `team`.
    ///
    /// Nothing is spent and no event is produced when validation fails.
    pub fn issue(
        &mut self,
        team: Team,
        command: PlayerCommand,
        now_ms: u64,
    ) -> Result<Vec<WorldEvent>> {
        if self.is_over() {
            return Err(GameError::InvalidState("match is over".to_string()));
        }
        match command {
            PlayerCommand::Move { units, destination } => {
                self.order_move(team, &units, destination, false)
            }
            PlayerCommand::AttackMove { units, destination } => {
                self.order_move(team, &units, destination, true)
            }
            PlayerCommand::Attack { units, target } => self.order_attack(team, &units, &target),
            PlayerCommand::Stop { units } => {
                self.check_own_units(team, &units)?;
                for id in &units {
                    if let Some(unit) = self.sim.get_entity_mut(id).and_then(Entity::as_unit_mut) {
                        unit.stop();
                    }
                }
                Ok(Vec::new())
            }
            PlayerCommand::Build { kind, position } => {
                self.order_build(team, kind, position, now_ms)
            }
            PlayerCommand::CancelConstruction { building } => {
                self.order_cancel(team, &building, now_ms)
            }
            PlayerCommand::Produce { building, unit_kind } => {
                self.order_produce(team, &building, unit_kind)
            }
            PlayerCommand::UpgradeBase => self.order_upgrade(team),
        }
    }

    fn check_own_units(&self, team: Team, units: &[EntityId]) -> Result<()> {
        for id in units {
            let entity = self
                .sim
                .get_entity(id)
                .filter(|e| !e.is_dead())
                .ok_or_else(|| GameError::EntityNotFound(id.clone()))?;
            if entity.team != team {
                return Err(GameError::NotOwned(id.clone()));
            }
            if !entity.is_unit() {
                return Err(GameError::InvalidState(format!("{id} is not a unit")));
            }
        }
        Ok(())
    }

    fn order_move(
        &mut self,
        team: Team,
        units: &[EntityId],
        destination: Vec2Fixed,
        attack_move: bool,
    ) -> Result<Vec<WorldEvent>> {
        self.check_own_units(team, units)?;
        let destination = self.clamp_to_world(destination);
        let mut events = Vec::with_capacity(units.len());
        for id in units {
            let Some(unit) = self.sim.get_entity_mut(id).and_then(Entity::as_unit_mut) else {
                continue;
            };
            if attack_move {
                unit.attack_move_to(destination);
                events.push(WorldEvent::AttackMoveOrdered {
                    unit: id.clone(),
                    team,
                    destination,
                });
            } else {
                unit.move_to(destination);
                events.push(WorldEvent::UnitMoved {
                    unit: id.clone(),
                    team,
                    destination,
                });
            }
        }
        Ok(events)
    }

    fn order_attack(
        &mut self,
        team: Team,
        units: &[EntityId],
        target: &EntityId,
    ) -> Result<Vec<WorldEvent>> {
        self.check_own_units(team, units)?;
        let target_entity = self
            .sim
            .get_entity(target)
            .filter(|e| !e.is_dead())
            .ok_or_else(|| GameError::EntityNotFound(target.clone()))?;
        if target_entity.team == team {
            return Err(GameError::InvalidState(format!("{target} is friendly")));
        }

        let mut events = Vec::with_capacity(units.len());
        for id in units {
            if let Some(unit) = self.sim.get_entity_mut(id).and_then(Entity::as_unit_mut) {
                unit.attack(target.clone());
                events.push(WorldEvent::AttackStarted {
                    attacker: id.clone(),
                    target: target.clone(),
                    team,
                });
            }
        }
        Ok(events)
    }

    fn order_build(
        &mut self,
        team: Team,
        kind: BuildingKind,
        position: Vec2Fixed,
        now_ms: u64,
    ) -> Result<Vec<WorldEvent>> {
        let layout = self.layouts.get(team);
        let spot = layout.validate(kind, position, fx(self.config.base_range), &self.sim)?;
        let spot_position = layout.spots()[spot].position;
        self.ledgers.get_mut(team).spend(&kind.stats().cost)?;

        let mut building = Entity::building(team, kind, spot_position);
        if let Some(state) = building.as_building_mut() {
            state.spot = Some(spot);
        }
        let id = self.sim.add_entity(building)?;
        self.layouts.get_mut(team).occupy(spot, id.clone());

        let event = match self.construction.get_mut(team).submit(id.clone()) {
            Submission::Started => {
                let state = self.sim.get_entity_mut(&id).and_then(Entity::as_building_mut);
                if let Some(state) = state {
                    state.start_construction(now_ms);
                }
                WorldEvent::BuildingPlaced {
                    building: id.clone(),
                    team,
                    kind,
                    position: spot_position,
                }
            }
            Submission::Queued => WorldEvent::BuildingQueued {
                building: id.clone(),
                team,
                kind,
                position: spot_position,
            },
        };
        tracing::debug!(building = %id, %team, ?kind, spot, "Building placed");
        Ok(vec![event])
    }

    fn order_cancel(
        &mut self,
        team: Team,
        building_id: &EntityId,
        now_ms: u64,
    ) -> Result<Vec<WorldEvent>> {
        let entity = self
            .sim
            .get_entity(building_id)
            .ok_or_else(|| GameError::EntityNotFound(building_id.clone()))?;
        if entity.team != team {
            return Err(GameError::NotOwned(building_id.clone()));
        }
        let refund = match entity.as_building() {
            Some(building) if building.under_construction => building.cost.supplies,
            _ => {
                return Err(GameError::InvalidState(format!(
                    "{building_id} is not under construction"
                )))
            }
        };

        self.sim.remove_entity(building_id);
        self.layouts.get_mut(team).release(building_id);
        self.ledgers.get_mut(team).grant(refund);

        let mut events = vec![WorldEvent::ConstructionCancelled {
            building: building_id.clone(),
            team,
            refund,
        }];
        self.advance_construction_queue(team, building_id, now_ms, &mut events);
        Ok(events)
    }

    fn order_produce(
        &mut self,
        team: Team,
        building_id: &EntityId,
        unit_kind: UnitKind,
    ) -> Result<Vec<WorldEvent>> {
        let cost = unit_kind.stats().cost;
        let owner = self
            .sim
            .get_entity(building_id)
            .filter(|e| !e.is_dead())
            .map(|e| e.team)
            .ok_or_else(|| GameError::EntityNotFound(building_id.clone()))?;
        if owner != team {
            return Err(GameError::NotOwned(building_id.clone()));
        }
        self.ledgers.get(team).check(&cost)?;

        let building = self
            .sim
            .get_entity_mut(building_id)
            .and_then(Entity::as_building_mut)
            .ok_or_else(|| GameError::InvalidState(format!("{building_id} is not a building")))?;
        building.enqueue(unit_kind, building_id)?;
        self.ledgers.get_mut(team).spend(&cost)?;

        tracing::debug!(building = %building_id, %team, ?unit_kind, "Production queued");
        Ok(vec![WorldEvent::ProductionQueued {
            building: building_id.clone(),
            team,
            unit_kind,
        }])
    }

    fn order_upgrade(&mut self, team: Team) -> Result<Vec<WorldEvent>> {
        let level = self.layouts.get(team).upgrade_level();
        let cost = self
            .config
            .base_upgrade_costs
            .get(usize::from(level))
            .copied()
            .ok_or_else(|| GameError::InvalidState("base is fully upgraded".to_string()))?;
        self.ledgers.get_mut(team).spend_supplies(cost)?;
        let max = self.config.max_upgrade_level();
        let level = self
            .layouts
            .get_mut(team)
            .upgrade(max)
            .ok_or_else(|| GameError::InvalidState("base is fully upgraded".to_string()))?;
        tracing::info!(%team, level, "Base upgraded");
        Ok(vec![WorldEvent::BaseUpgraded { team, level }])
    }

    fn clamp_to_world(&self, point: Vec2Fixed) -> Vec2Fixed {
        point.clamp_to(Vec2Fixed::ZERO, self.sim.world_size())
    }

    fn require(&mut self, id: &EntityId) -> Result<&mut Entity> {
        self.sim
            .get_entity_mut(id)
            .filter(|e| !e.is_dead())
            .ok_or_else(|| GameError::EntityNotFound(id.clone()))
    }

    /// Apply a remote move order verbatim.
    pub fn mirror_move(
        &mut self,
        unit_id: &EntityId,
        destination: Vec2Fixed,
        attack_move: bool,
    ) -> Result<()> {
        let unit = self
            .require(unit_id)?
            .as_unit_mut()
            .ok_or_else(|| GameError::InvalidState(format!("{unit_id} is not a unit")))?;
        if attack_move {
            unit.attack_move_to(destination);
        } else {
            unit.move_to(destination);
        }
        Ok(())
    }

    /// Apply a remote attack order.
    pub fn mirror_attack(&mut self, attacker: &EntityId, target: &EntityId) -> Result<()> {
        self.require(target)?;
        let unit = self
            .require(attacker)?
            .as_unit_mut()
            .ok_or_else(|| GameError::InvalidState(format!("{attacker} is not a unit")))?;
        unit.attack(target.clone());
        Ok(())
    }

    /// Overwrite health with the value reported by the target's owner.
    pub fn mirror_health(&mut self, target: &EntityId, new_health: u32) -> Result<()> {
        self.require(target)?.set_health(new_health);
        Ok(())
    }

    /// Reconcile a turret shot reported by the turret's owner.
    ///
    /// A live local copy of the turret resolves its own shots, so the
    /// report only retargets it. Without one the damage is applied here.
    /// Returns whether damage was applied.
    pub fn mirror_turret_damage(
        &mut self,
        turret: &EntityId,
        target: &EntityId,
        damage: u32,
    ) -> Result<bool> {
        self.require(target)?;
        let local_turret_active = match self.sim.get_entity_mut(turret).filter(|e| !e.is_dead()) {
            Some(entity) => match entity.as_building_mut() {
                Some(building) if building.is_active => {
                    building.attack_target = Some(target.clone());
                    true
                }
                _ => false,
            },
            None => false,
        };
        if local_turret_active {
            return Ok(false);
        }
        self.require(target)?.apply_damage(damage);
        Ok(true)
    }

    /// Point a mirrored turret at a target.
    pub fn mirror_turret_target(&mut self, turret: &EntityId, target: &EntityId) -> Result<()> {
        self.require(target)?;
        let building = self
            .require(turret)?
            .as_building_mut()
            .ok_or_else(|| GameError::InvalidState(format!("{turret} is not a building")))?;
        building.attack_target = Some(target.clone());
        Ok(())
    }

    /// Instantiate a building announced by its owner.
    ///
    /// `started` is true for placements whose construction began right away.
    /// If the building already exists, only its construction start is applied.
    pub fn mirror_building(
        &mut self,
        id: Option<EntityId>,
        team: Team,
        kind: BuildingKind,
        position: Vec2Fixed,
        started: bool,
        now_ms: u64,
    ) -> Result<EntityId> {
        if let Some(existing) = id.as_ref().filter(|id| self.sim.get_entity(id).is_some()) {
            if started {
                let building = self.sim.get_entity_mut(existing).and_then(Entity::as_building_mut);
                if let Some(building) = building {
                    building.start_construction(now_ms);
                }
            }
            return Ok(existing.clone());
        }

        let mut entity = Entity::building(team, kind, position);
        if let Some(id) = id {
            entity.id = id;
        }
        let layout = self.layouts.get(team);
        let spot = layout
            .spot_near(position)
            .filter(|index| !layout.spots()[*index].is_occupied());
        if let Some(building) = entity.as_building_mut() {
            building.spot = spot;
            if started {
                building.start_construction(now_ms);
            }
        }
        let id = self.sim.add_entity(entity)?;
        if let Some(spot) = spot {
            self.layouts.get_mut(team).occupy(spot, id.clone());
        }
        Ok(id)
    }

    /// Finish a building's construction as announced by its owner.
    pub fn mirror_completion(&mut self, building_id: &EntityId) -> Result<bool> {
        let building = self
            .require(building_id)?
            .as_building_mut()
            .ok_or_else(|| GameError::InvalidState(format!("{building_id} is not a building")))?;
        Ok(building.finish_construction())
    }

    /// Remove a building whose construction its owner cancelled.
    pub fn mirror_cancel(&mut self, building_id: &EntityId) -> Result<()> {
        let team = self.require(building_id)?.team;
        self.sim.remove_entity(building_id);
        self.layouts.get_mut(team).release(building_id);
        Ok(())
    }

    /// Queue a unit announced by the producing building's owner.
    pub fn mirror_production(&mut self, building_id: &EntityId, unit_kind: UnitKind) -> Result<()> {
        let building = self
            .require(building_id)?
            .as_building_mut()
            .ok_or_else(|| GameError::InvalidState(format!("{building_id} is not a building")))?;
        building.enqueue(unit_kind, building_id)
    }

    /// Create a unit spawned by its owner, keeping its id.
    pub fn mirror_spawn(
        &mut self,
        unit_id: EntityId,
        team: Team,
        unit_kind: UnitKind,
        position: Vec2Fixed,
        building_id: Option<&EntityId>,
        now_ms: u64,
    ) -> Result<EntityId> {
        if self.sim.get_entity(&unit_id).is_some() {
            return Ok(unit_id);
        }
        let id = self
            .sim
            .add_entity(Entity::unit(team, unit_kind, position).with_id(unit_id))?;

        if let Some(building) = building_id
            .and_then(|b| self.sim.get_entity_mut(b))
            .and_then(Entity::as_building_mut)
        {
            let current = building.current_production.as_ref().map(|item| item.unit_kind);
            if current == Some(unit_kind) {
                building.finish_production();
                building.start_next_production(now_ms);
            } else if let Some(slot) =
                building.production_queue.iter().position(|k| *k == unit_kind)
            {
                building.production_queue.remove(slot);
            }
        }
        Ok(id)
    }

    /// Overwrite positions reported by their owner. Only entities of `team`
    /// that are units are touched; unknown ids are skipped.
    pub fn mirror_positions(&mut self, team: Team, positions: &[(EntityId, Vec2Fixed)]) -> usize {
        let mut applied = 0;
        for (id, position) in positions {
            let entity = self.sim.get_entity_mut(id);
            let Some(entity) = entity.filter(|e| !e.is_dead() && e.team == team) else {
                continue;
            };
            if entity.is_unit() {
                entity.position = *position;
                applied += 1;
            }
        }
        applied
    }

    /// Positions of `team`'s live units, for the periodic resync broadcast.
    #[must_use]
    pub fn unit_positions(&self, team: Team) -> Vec<(EntityId, Vec2Fixed)> {
        self.sim
            .entities()
            .iter()
            .filter(|e| e.team == team && e.is_unit() && !e.is_dead())
            .map(|e| (e.id.clone(), e.position))
            .collect()
    }

    /// Record a winner decided outside the simulation (peer loss, relay verdict).
    pub fn declare_winner(&mut self, winner: Team) {
        if self.winner.is_none() {
            tracing::info!(%winner, "Winner declared");
            self.winner = Some(winner);
        }
    }

    /// Total health of `team`'s live units, a cheap strength estimate.
    #[must_use]
    pub fn army_strength(&self, team: Team) -> Fixed {
        self.sim
            .entities()
            .iter()
            .filter(|e| e.team == team && e.is_unit() && !e.is_dead())
            .map(|e| Fixed::from_num(e.health.current))
            .fold(Fixed::ZERO, |acc, hp| acc.saturating_add(hp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> GameWorld {
        GameWorld::new_match(GameConfig::default())
    }

    fn spot(world: &GameWorld, team: Team, index: usize) -> Vec2Fixed {
        world.layout(team).spots()[index].position
    }

    #[test]
    fn test_match_setup_uses_fixed_ids() {
        let world = world();
        assert!(world.sim().get_entity(&base_id(Team::Player)).is_some());
        assert!(world.sim().get_entity(&base_id(Team::Enemy)).is_some());
        assert!(world.sim().get_entity(&starting_marine_id(Team::Enemy, 2)).is_some());
        assert_eq!(world.ledger(Team::Player).current_population(), 2);
    }

    #[test]
    fn test_build_spends_and_places() {
        let mut world = world();
        let position = spot(&world, Team::Player, 0);
        let events = world
            .issue(
                Team::Player,
                PlayerCommand::Build {
                    kind: BuildingKind::SupplyDepot,
                    position,
                },
                0,
            )
            .unwrap();
        assert!(matches!(events[0], WorldEvent::BuildingPlaced { .. }));
        assert_eq!(world.ledger(Team::Player).supplies(), 400);
        assert!(world.layout(Team::Player).spots()[0].is_occupied());
    }

    #[test]
    fn test_second_build_is_queued_then_started() {
        let mut world = world();
        let first = spot(&world, Team::Player, 0);
        let second = spot(&world, Team::Player, 1);
        let kind = BuildingKind::Generic;
        world
            .issue(Team::Player, PlayerCommand::Build { kind, position: first }, 0)
            .unwrap();
        let queued = world
            .issue(Team::Player, PlayerCommand::Build { kind, position: second }, 0)
            .unwrap();
        assert!(matches!(queued[0], WorldEvent::BuildingQueued { .. }));

        let events = world.background_tick(4_000);
        assert!(events.iter().any(|e| matches!(e, WorldEvent::ConstructionCompleted { .. })));
        assert!(events.iter().any(|e| matches!(e, WorldEvent::ConstructionStarted { .. })));
    }

    #[test]
    fn test_invalid_placement_spends_nothing() {
        let mut world = world();
        let result = world.issue(
            Team::Player,
            PlayerCommand::Build {
                kind: BuildingKind::Reactor,
                position: Vec2Fixed::from_ints(1200, 800),
            },
            0,
        );
        assert!(matches!(result, Err(GameError::InvalidPlacement(_))));
        assert_eq!(world.ledger(Team::Player).supplies(), 500);
    }

    #[test]
    fn test_cancel_refunds_and_frees_spot() {
        let mut world = world();
        let position = spot(&world, Team::Player, 0);
        let events = world
            .issue(Team::Player, PlayerCommand::Build { kind: BuildingKind::Barracks, position }, 0)
            .unwrap();
        let WorldEvent::BuildingPlaced { building, .. } = &events[0] else {
            panic!("expected placement");
        };
        let cancel = PlayerCommand::CancelConstruction {
            building: building.clone(),
        };
        world.issue(Team::Player, cancel, 10).unwrap();
        assert_eq!(world.ledger(Team::Player).supplies(), 500);
        assert!(!world.layout(Team::Player).spots()[0].is_occupied());
        assert!(world.construction(Team::Player).is_empty());
    }

    #[test]
    fn test_produce_requires_affordable_unit() {
        let mut world = world();
        world.ledger_mut(Team::Player).set_supplies(20);
        let barracks = world
            .sim
            .add_entity(Entity::completed_building(
                Team::Player,
                BuildingKind::Barracks,
                Vec2Fixed::from_ints(460, 800),
            ))
            .unwrap();
        let result = world.issue(
            Team::Player,
            PlayerCommand::Produce {
                building: barracks.clone(),
                unit_kind: UnitKind::Marine,
            },
            0,
        );
        assert!(matches!(result, Err(GameError::InsufficientResources { .. })));
        let queued = world
            .sim()
            .get_entity(&barracks)
            .and_then(Entity::as_building)
            .map(|b| b.production_queue.len());
        assert_eq!(queued, Some(0));
    }

    #[test]
    fn test_cannot_order_enemy_units() {
        let mut world = world();
        let result = world.issue(
            Team::Player,
            PlayerCommand::Move {
                units: vec![starting_marine_id(Team::Enemy, 1)],
                destination: Vec2Fixed::from_ints(10, 10),
            },
            0,
        );
        assert!(matches!(result, Err(GameError::NotOwned(_))));
    }

    #[test]
    fn test_base_death_ends_match() {
        let mut world = world();
        if let Some(base) = world.sim.get_entity_mut(&base_id(Team::Enemy)) {
            base.kill();
        }
        let events = world.tick(50);
        assert!(events.contains(&WorldEvent::GameOver { winner: Team::Player }));
        assert_eq!(world.winner(), Some(Team::Player));
    }

    #[test]
    fn test_upgrade_base_costs_supplies() {
        let mut world = world();
        world.issue(Team::Player, PlayerCommand::UpgradeBase, 0).unwrap();
        assert_eq!(world.layout(Team::Player).upgrade_level(), 1);
        assert_eq!(world.ledger(Team::Player).supplies(), 300);
        assert!(world.issue(Team::Player, PlayerCommand::UpgradeBase, 0).is_err());
        assert_eq!(world.layout(Team::Player).upgrade_level(), 1);
    }

    #[test]
    fn test_turret_report_applies_only_without_local_turret() {
        let mut world = world();
        world.configure_peer(Authority::Peer { local_team: Team::Player }, "p");
        let target = starting_marine_id(Team::Player, 1);
        let applied = world
            .mirror_turret_damage(&EntityId::from("enemy-turret-9"), &target, 20)
            .unwrap();
        assert!(applied);
        assert_eq!(world.sim().get_entity(&target).unwrap().health.current, 60);

        world
            .sim
            .add_entity(
                Entity::completed_building(
                    Team::Enemy,
                    BuildingKind::Turret,
                    Vec2Fixed::from_ints(600, 800),
                )
                .with_id("enemy-turret-1"),
            )
            .unwrap();
        let applied = world
            .mirror_turret_damage(&EntityId::from("enemy-turret-1"), &target, 20)
            .unwrap();
        assert!(!applied);
        assert_eq!(world.sim().get_entity(&target).unwrap().health.current, 60);
    }

    #[test]
    fn test_mirror_spawn_clears_production() {
        let mut world = world();
        world.configure_peer(Authority::Peer { local_team: Team::Player }, "p");
        let barracks = world
            .mirror_building(
                Some(EntityId::from("e-barracks")),
                Team::Enemy,
                BuildingKind::Barracks,
                spot(&world, Team::Enemy, 0),
                true,
                0,
            )
            .unwrap();
        world.mirror_completion(&barracks).unwrap();
        world.mirror_production(&barracks, UnitKind::Marine).unwrap();
        world.background_tick(100);

        world
            .mirror_spawn(
                EntityId::from("e-unit-1"),
                Team::Enemy,
                UnitKind::Marine,
                Vec2Fixed::from_ints(1940, 867),
                Some(&barracks),
                3_100,
            )
            .unwrap();
        let building = world.sim().get_entity(&barracks).and_then(Entity::as_building).unwrap();
        assert!(!building.is_producing());
        assert!(world.sim().get_entity(&EntityId::from("e-unit-1")).is_some());
    }
}
