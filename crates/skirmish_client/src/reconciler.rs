//! Merges the remote peer's announced state changes into the local world.
//!
//! Every state category has exactly one authoritative peer:
//! - unit orders, health and position: the unit's owner
//! - building placement, construction and production: the building's owner
//! - turret shots: both peers simulate turrets; the turret's owner also
//!   reports each shot so a peer without an active copy still applies it
//!
//! Outbound, [`Reconciler::outbound`] turns the local world's events into
//! actions for the state this peer is authoritative over. Inbound,
//! [`Reconciler::apply_remote`] applies an action if every entity it names
//! exists locally, and otherwise parks it in the pending queue.
//! [`Reconciler::retry_pending`] re-attempts parked actions at a fixed
//! spacing and drops them after a bounded number of retries.

use std::collections::VecDeque;

use skirmish_core::components::EntityId;
use skirmish_core::config::GameConfig;
use skirmish_core::error::Result as GameResult;
use skirmish_core::events::{DamageSource, WorldEvent};
use skirmish_core::simulation::EffectKind;
use skirmish_core::team::Team;
use skirmish_core::world::GameWorld;
use skirmish_protocol::actions::{
    AttackPayload, AttackPerformedPayload, BuildingCancelPayload, BuildingCompletePayload,
    BuildingPayload, BuildingStartPayload, MovePayload, PositionSyncPayload, TurretDamagePayload,
    TurretTargetPayload, UnitDamagePayload, UnitPosition, UnitProducePayload, UnitSpawnPayload,
};
use skirmish_protocol::Action;

/// What happened to a remote action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The effect was applied.
    Applied,
    /// A referenced entity is missing; the action is pending.
    Deferred,
    /// The action refers to a dead entity or to state this peer owns.
    Ignored,
    /// The world refused the effect.
    Rejected,
}

/// A remote action waiting for the entities it references.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    /// The parked action.
    pub action: Action,
    /// Retries attempted so far.
    pub retries: u32,
    /// Earliest time of the next retry.
    pub next_retry_ms: u64,
}

/// Counters for diagnostics and the headless summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReconcileStats {
    /// Actions applied, immediately or after retrying.
    pub applied: u64,
    /// Actions parked at least once.
    pub deferred: u64,
    /// Retry attempts.
    pub retries: u64,
    /// Actions dropped after exhausting retries.
    pub dropped: u64,
    /// Actions ignored.
    pub ignored: u64,
    /// Actions the world refused.
    pub rejected: u64,
}

/// Result of one pass over the pending queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReport {
    /// Actions applied this pass.
    pub applied: usize,
    /// Actions dropped this pass.
    pub dropped: usize,
    /// Actions still waiting.
    pub remaining: usize,
}

enum Resolution<'a> {
    Ready,
    Missing(&'a EntityId),
    Gone(&'a EntityId),
}

/// Reconciliation state for one peer.
#[derive(Debug, Clone)]
pub struct Reconciler {
    local_team: Team,
    retry_spacing_ms: u64,
    max_retries: u32,
    pending: VecDeque<PendingAction>,
    stats: ReconcileStats,
}

impl Reconciler {
    /// Reconciler for the peer controlling `local_team`.
    #[must_use]
    pub fn new(local_team: Team, config: &GameConfig) -> Self {
        Self {
            local_team,
            retry_spacing_ms: config.retry_spacing_ms,
            max_retries: config.max_retries,
            pending: VecDeque::new(),
            stats: ReconcileStats::default(),
        }
    }

    /// Team this peer controls.
    #[must_use]
    pub const fn local_team(&self) -> Team {
        self.local_team
    }

    /// Team the other peer controls.
    #[must_use]
    pub const fn remote_team(&self) -> Team {
        self.local_team.opponent()
    }

    /// Whether any action is waiting.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Actions waiting, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &PendingAction> {
        self.pending.iter()
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> ReconcileStats {
        self.stats
    }

    /// Forget every pending action, on teardown.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Actions announcing the local events this peer is authoritative for.
    #[must_use]
    pub fn outbound(&self, events: &[WorldEvent]) -> Vec<Action> {
        events
            .iter()
            .filter(|event| event.team() == Some(self.local_team))
            .filter_map(to_action)
            .collect()
    }

    /// The periodic position correction for this peer's units.
    #[must_use]
    pub fn position_sync(&self, world: &GameWorld) -> Action {
        let units = world
            .unit_positions(self.local_team)
            .into_iter()
            .map(|(id, position)| {
                let (x, y) = position.to_f64();
                UnitPosition {
                    id,
                    x,
                    y,
                    team: self.local_team,
                }
            })
            .collect();
        Action::PositionSync(PositionSyncPayload { units })
    }

    /// Apply a remote action, or park it if an entity it names is missing.
    pub fn apply_remote(
        &mut self,
        world: &mut GameWorld,
        action: Action,
        now_ms: u64,
    ) -> ApplyOutcome {
        match resolve(world, &action) {
            Resolution::Ready => self.apply(world, &action, now_ms),
            Resolution::Gone(id) => {
                tracing::debug!(
                    action = action.tag(),
                    entity = %id,
                    "Remote action refers to a dead entity"
                );
                self.stats.ignored += 1;
                ApplyOutcome::Ignored
            }
            Resolution::Missing(id) => {
                tracing::debug!(action = action.tag(), entity = %id, "Deferring remote action");
                self.stats.deferred += 1;
                self.pending.push_back(PendingAction {
                    action,
                    retries: 0,
                    next_retry_ms: now_ms + self.retry_spacing_ms,
                });
                ApplyOutcome::Deferred
            }
        }
    }

    /// Retry every pending action that is due.
    pub fn retry_pending(&mut self, world: &mut GameWorld, now_ms: u64) -> RetryReport {
        let mut report = RetryReport::default();
        let mut waiting = VecDeque::with_capacity(self.pending.len());

        while let Some(mut entry) = self.pending.pop_front() {
            if entry.next_retry_ms > now_ms {
                waiting.push_back(entry);
                continue;
            }
            entry.retries += 1;
            self.stats.retries += 1;

            match resolve(world, &entry.action) {
                Resolution::Ready => {
                    tracing::debug!(
                        action = entry.action.tag(),
                        retries = entry.retries,
                        "Pending action resolved"
                    );
                    if self.apply(world, &entry.action, now_ms) == ApplyOutcome::Applied {
                        report.applied += 1;
                    }
                }
                Resolution::Gone(id) => {
                    tracing::debug!(
                        action = entry.action.tag(),
                        entity = %id,
                        "Pending action refers to a dead entity"
                    );
                    self.stats.ignored += 1;
                }
                Resolution::Missing(id) if entry.retries >= self.max_retries => {
                    tracing::warn!(
                        action = entry.action.tag(),
                        entity = %id,
                        retries = entry.retries,
                        "Dropping remote action, entity never appeared"
                    );
                    self.stats.dropped += 1;
                    report.dropped += 1;
                }
                Resolution::Missing(_) => {
                    entry.next_retry_ms = now_ms + self.retry_spacing_ms;
                    waiting.push_back(entry);
                }
            }
        }

        self.pending = waiting;
        report.remaining = self.pending.len();
        report
    }

    fn apply(&mut self, world: &mut GameWorld, action: &Action, now_ms: u64) -> ApplyOutcome {
        if let Some(team) = claimed_team(action) {
            if team == self.local_team {
                tracing::debug!(
                    action = action.tag(),
                    %team,
                    "Ignoring remote claim about local state"
                );
                self.stats.ignored += 1;
                return ApplyOutcome::Ignored;
            }
        }

        match self.mutate(world, action, now_ms) {
            Ok(()) => {
                self.stats.applied += 1;
                ApplyOutcome::Applied
            }
            Err(error) => {
                tracing::warn!(action = action.tag(), %error, "Remote action rejected");
                self.stats.rejected += 1;
                ApplyOutcome::Rejected
            }
        }
    }

    fn mutate(&self, world: &mut GameWorld, action: &Action, now_ms: u64) -> GameResult<()> {
        match action {
            Action::UnitMove(p) => world.mirror_move(&p.unit_id, p.destination.into(), false),
            Action::AttackMove(p) => world.mirror_move(&p.unit_id, p.destination.into(), true),
            Action::Attack(p) => world.mirror_attack(&p.attacker_id, &p.target_id),
            Action::AttackPerformed(p) => {
                show_shot(world, &p.attacker_id, &p.target_id, now_ms);
                Ok(())
            }
            Action::TurretAttack(p) => {
                show_shot(world, &p.turret_id, &p.target_id, now_ms);
                Ok(())
            }
            Action::UnitDamage(p) => world.mirror_health(&p.target_id, p.new_health),
            Action::TurretDamage(p) => world
                .mirror_turret_damage(&p.turret_id, &p.target_id, p.damage)
                .map(|applied| {
                    tracing::trace!(
                        turret = %p.turret_id,
                        target = %p.target_id,
                        applied,
                        "Turret report"
                    );
                }),
            Action::TurretTarget(p) => world.mirror_turret_target(&p.turret_id, &p.target_id),
            Action::BuildingPlace(p) => world
                .mirror_building(
                    p.building_id.clone(),
                    p.team,
                    p.kind,
                    p.position.into(),
                    true,
                    now_ms,
                )
                .map(drop),
            Action::BuildingQueue(p) => world
                .mirror_building(
                    p.building_id.clone(),
                    p.team,
                    p.kind,
                    p.position.into(),
                    false,
                    now_ms,
                )
                .map(drop),
            Action::BuildingStart(p) => world
                .mirror_building(
                    Some(p.building_id.clone()),
                    p.team,
                    p.kind,
                    p.position.into(),
                    true,
                    now_ms,
                )
                .map(drop),
            Action::BuildingComplete(p) => world.mirror_completion(&p.building_id).map(drop),
            Action::BuildingCancel(p) => world.mirror_cancel(&p.building_id),
            Action::UnitProduce(p) => world.mirror_production(&p.building_id, p.unit_type),
            Action::UnitSpawn(p) => world
                .mirror_spawn(
                    p.unit_id.clone(),
                    p.team,
                    p.unit_type,
                    p.position.into(),
                    p.building_id.as_ref(),
                    now_ms,
                )
                .map(drop),
            Action::PositionSync(p) => {
                let remote = self.remote_team();
                let positions: Vec<_> = p
                    .units
                    .iter()
                    .filter(|entry| entry.team == remote)
                    .map(|entry| (entry.id.clone(), entry.position()))
                    .collect();
                let applied = world.mirror_positions(remote, &positions);
                tracing::trace!(applied, total = p.units.len(), "Positions resynced");
                Ok(())
            }
        }
    }
}

/// Entities that must exist locally before `action` can be applied.
#[must_use]
pub fn required_ids(action: &Action) -> Vec<&EntityId> {
    match action {
        Action::UnitMove(p) | Action::AttackMove(p) => vec![&p.unit_id],
        Action::Attack(p) => vec![&p.attacker_id, &p.target_id],
        Action::UnitDamage(p) => vec![&p.target_id],
        Action::TurretDamage(p) => vec![&p.target_id],
        Action::TurretTarget(p) => vec![&p.turret_id, &p.target_id],
        Action::BuildingComplete(p) => vec![&p.building_id],
        Action::BuildingCancel(p) => vec![&p.building_id],
        Action::UnitProduce(p) => vec![&p.building_id],
        Action::AttackPerformed(_)
        | Action::TurretAttack(_)
        | Action::BuildingPlace(_)
        | Action::BuildingQueue(_)
        | Action::BuildingStart(_)
        | Action::UnitSpawn(_)
        | Action::PositionSync(_) => Vec::new(),
    }
}

fn resolve<'a>(world: &GameWorld, action: &'a Action) -> Resolution<'a> {
    for id in required_ids(action) {
        match world.sim().get_entity(id) {
            Some(entity) if !entity.is_dead() => {}
            Some(_) => return Resolution::Gone(id),
            None if world.sim().was_purged(id) => return Resolution::Gone(id),
            None => return Resolution::Missing(id),
        }
    }
    Resolution::Ready
}

/// Team whose state the action claims to change, when the claim must come
/// from the remote peer.
fn claimed_team(action: &Action) -> Option<Team> {
    match action {
        Action::UnitMove(p) | Action::AttackMove(p) => Some(p.team),
        Action::Attack(p) => Some(p.team),
        Action::UnitDamage(p) => Some(p.team),
        Action::TurretTarget(p) => Some(p.team),
        Action::BuildingPlace(p) | Action::BuildingQueue(p) => Some(p.team),
        Action::BuildingStart(p) => Some(p.team),
        Action::BuildingComplete(p) => Some(p.team),
        Action::BuildingCancel(p) => Some(p.team),
        Action::UnitProduce(p) => Some(p.team),
        Action::UnitSpawn(p) => Some(p.team),
        Action::AttackPerformed(_)
        | Action::TurretAttack(_)
        | Action::TurretDamage(_)
        | Action::PositionSync(_) => None,
    }
}

fn show_shot(world: &mut GameWorld, shooter: &EntityId, target: &EntityId, now_ms: u64) {
    let from = world.sim().get_entity(shooter).map(|e| e.position);
    let to = world.sim().get_entity(target).map(|e| e.position);
    if let Some(from) = from {
        world.sim_mut().add_effect(EffectKind::MuzzleFlash, from, now_ms);
    }
    if let Some(to) = to {
        world.sim_mut().add_effect(EffectKind::Hit, to, now_ms);
    }
}

fn to_action(event: &WorldEvent) -> Option<Action> {
    let action = match event {
        WorldEvent::UnitMoved { unit, team, destination } => Action::UnitMove(MovePayload {
            unit_id: unit.clone(),
            destination: (*destination).into(),
            team: *team,
        }),
        WorldEvent::AttackMoveOrdered { unit, team, destination } => {
            Action::AttackMove(MovePayload {
                unit_id: unit.clone(),
                destination: (*destination).into(),
                team: *team,
            })
        }
        WorldEvent::AttackStarted { attacker, target, team } => Action::Attack(AttackPayload {
            attacker_id: attacker.clone(),
            target_id: target.clone(),
            team: *team,
        }),
        WorldEvent::AttackPerformed {
            attacker,
            target,
            team,
            at_ms,
        } => Action::AttackPerformed(AttackPerformedPayload {
            attacker_id: attacker.clone(),
            target_id: target.clone(),
            team: *team,
            timestamp: *at_ms,
        }),
        WorldEvent::Damaged {
            source: DamageSource::Unit(_),
            target,
            target_team,
            amount,
            new_health,
        } => Action::UnitDamage(UnitDamagePayload {
            target_id: target.clone(),
            damage: *amount,
            new_health: *new_health,
            team: *target_team,
        }),
        WorldEvent::TurretTargetAcquired { turret, target, team } => {
            Action::TurretTarget(TurretTargetPayload {
                turret_id: turret.clone(),
                target_id: target.clone(),
                team: *team,
            })
        }
        WorldEvent::TurretFired {
            turret,
            target,
            damage,
            target_team,
            at_ms,
            ..
        } => Action::TurretDamage(TurretDamagePayload {
            turret_id: turret.clone(),
            target_id: target.clone(),
            damage: *damage,
            target_team: *target_team,
            timestamp: *at_ms,
        }),
        WorldEvent::BuildingPlaced {
            building,
            team,
            kind,
            position,
        } => Action::BuildingPlace(BuildingPayload {
            kind: *kind,
            position: (*position).into(),
            team: *team,
            building_id: Some(building.clone()),
        }),
        WorldEvent::BuildingQueued {
            building,
            team,
            kind,
            position,
        } => Action::BuildingQueue(BuildingPayload {
            kind: *kind,
            position: (*position).into(),
            team: *team,
            building_id: Some(building.clone()),
        }),
        WorldEvent::ConstructionStarted {
            building,
            team,
            kind,
            position,
        } => Action::BuildingStart(BuildingStartPayload {
            building_id: building.clone(),
            team: *team,
            kind: *kind,
            position: (*position).into(),
        }),
        WorldEvent::ConstructionCompleted { building, team, .. } => {
            Action::BuildingComplete(BuildingCompletePayload {
                building_id: building.clone(),
                team: *team,
            })
        }
        WorldEvent::ConstructionCancelled { building, team, .. } => {
            Action::BuildingCancel(BuildingCancelPayload {
                building_id: building.clone(),
                team: *team,
            })
        }
        WorldEvent::ProductionQueued {
            building,
            team,
            unit_kind,
        } => Action::UnitProduce(UnitProducePayload {
            unit_type: *unit_kind,
            building_id: building.clone(),
            team: *team,
        }),
        WorldEvent::UnitSpawned {
            unit,
            team,
            unit_kind,
            position,
            building,
        } => Action::UnitSpawn(UnitSpawnPayload {
            unit_type: *unit_kind,
            position: (*position).into(),
            team: *team,
            unit_id: unit.clone(),
            building_id: Some(building.clone()),
        }),
        WorldEvent::Damaged {
            source: DamageSource::Turret(_),
            ..
        }
        | WorldEvent::Died { .. }
        | WorldEvent::BaseUpgraded { .. }
        | WorldEvent::GameOver { .. } => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::combat::Authority;
    use skirmish_core::entity::Entity;
    use skirmish_core::entity_kind::{BuildingKind, UnitKind};
    use skirmish_core::math::Vec2Fixed;
    use skirmish_core::player_facade::PlayerCommand;
    use skirmish_core::world::starting_marine_id;
    use skirmish_protocol::actions::WirePoint;

    fn peer(team: Team) -> (GameWorld, Reconciler) {
        let config = GameConfig::default();
        let mut world = GameWorld::new_match(config.clone());
        world.configure_peer(Authority::Peer { local_team: team }, team.as_str());
        (world, Reconciler::new(team, &config))
    }

    fn remote_move(unit: &str) -> Action {
        Action::UnitMove(MovePayload {
            unit_id: EntityId::from(unit),
            destination: WirePoint { x: 100.0, y: 200.0 },
            team: Team::Enemy,
        })
    }

    #[test]
    fn test_move_before_spawn_is_applied_after_spawn() {
        let (mut world, mut reconciler) = peer(Team::Player);
        assert_eq!(
            reconciler.apply_remote(&mut world, remote_move("u1"), 0),
            ApplyOutcome::Deferred
        );
        assert!(reconciler.has_pending());

        let spawn = Action::UnitSpawn(UnitSpawnPayload {
            unit_type: UnitKind::Marine,
            position: WirePoint { x: 2000.0, y: 700.0 },
            team: Team::Enemy,
            unit_id: EntityId::from("u1"),
            building_id: None,
        });
        assert_eq!(reconciler.apply_remote(&mut world, spawn, 60), ApplyOutcome::Applied);

        assert_eq!(reconciler.retry_pending(&mut world, 150).applied, 0);
        let report = reconciler.retry_pending(&mut world, 200);
        assert_eq!(report.applied, 1);
        assert!(!reconciler.has_pending());

        let unit = world.sim().get_entity(&EntityId::from("u1")).unwrap();
        assert_eq!(unit.as_unit().unwrap().destination, Some(Vec2Fixed::from_ints(100, 200)));
    }

    #[test]
    fn test_missing_target_is_dropped_after_five_retries() {
        let (mut world, mut reconciler) = peer(Team::Player);
        let attacker = starting_marine_id(Team::Enemy, 1);
        let attack = Action::Attack(AttackPayload {
            attacker_id: attacker.clone(),
            target_id: EntityId::from("ghost"),
            team: Team::Enemy,
        });
        assert_eq!(reconciler.apply_remote(&mut world, attack, 0), ApplyOutcome::Deferred);

        let mut dropped_at = None;
        for now in (50..=2_000).step_by(50) {
            if reconciler.retry_pending(&mut world, now).dropped > 0 {
                dropped_at = Some(now);
            }
        }
        assert_eq!(dropped_at, Some(1_000));
        assert_eq!(reconciler.stats().retries, 5);
        assert_eq!(reconciler.stats().dropped, 1);
        let unit = world.sim().get_entity(&attacker).unwrap();
        assert_eq!(unit.as_unit().unwrap().attack_target, None);
    }

    #[test]
    fn test_dead_entities_are_ignored_not_deferred() {
        let (mut world, mut reconciler) = peer(Team::Player);
        let marine = starting_marine_id(Team::Enemy, 2);
        world.sim_mut().remove_entity(&marine);
        let action = Action::UnitMove(MovePayload {
            unit_id: marine,
            destination: WirePoint { x: 1.0, y: 1.0 },
            team: Team::Enemy,
        });
        assert_eq!(reconciler.apply_remote(&mut world, action, 0), ApplyOutcome::Ignored);
        assert!(!reconciler.has_pending());
    }

    #[test]
    fn test_damage_reports_only_apply_to_remote_units() {
        let (mut world, mut reconciler) = peer(Team::Player);
        let own = starting_marine_id(Team::Player, 1);
        let theirs = starting_marine_id(Team::Enemy, 1);

        let about_own = Action::UnitDamage(UnitDamagePayload {
            target_id: own.clone(),
            damage: 25,
            new_health: 55,
            team: Team::Player,
        });
        assert_eq!(reconciler.apply_remote(&mut world, about_own, 0), ApplyOutcome::Ignored);
        assert_eq!(world.sim().get_entity(&own).unwrap().health.current, 80);

        let about_theirs = Action::UnitDamage(UnitDamagePayload {
            target_id: theirs.clone(),
            damage: 25,
            new_health: 55,
            team: Team::Enemy,
        });
        assert_eq!(
            reconciler.apply_remote(&mut world, about_theirs.clone(), 0),
            ApplyOutcome::Applied
        );
        assert_eq!(reconciler.apply_remote(&mut world, about_theirs, 0), ApplyOutcome::Applied);
        assert_eq!(world.sim().get_entity(&theirs).unwrap().health.current, 55);
    }

    #[test]
    fn test_outbound_covers_local_orders_only() {
        let (mut world, reconciler) = peer(Team::Player);
        let events = world
            .issue(
                Team::Player,
                PlayerCommand::Move {
                    units: vec![starting_marine_id(Team::Player, 1)],
                    destination: Vec2Fixed::from_ints(900, 800),
                },
                0,
            )
            .unwrap();
        let actions = reconciler.outbound(&events);
        assert_eq!(actions.len(), 1);
        assert!(matches!(
            &actions[0],
            Action::UnitMove(p) if p.destination == WirePoint { x: 900.0, y: 800.0 }
        ));

        let foreign = vec![WorldEvent::UnitMoved {
            unit: starting_marine_id(Team::Enemy, 1),
            team: Team::Enemy,
            destination: Vec2Fixed::ZERO,
        }];
        assert!(reconciler.outbound(&foreign).is_empty());
    }

    #[test]
    fn test_queued_building_mirrors_type_and_position() {
        let (mut a, reconciler_a) = peer(Team::Player);
        let (mut b, mut reconciler_b) = peer(Team::Enemy);
        let spots: Vec<Vec2Fixed> =
            a.layout(Team::Player).spots().iter().map(|s| s.position).collect();

        let mut events = Vec::new();
        let orders = [(BuildingKind::Barracks, spots[0]), (BuildingKind::Reactor, spots[1])];
        for (kind, position) in orders {
            let command = PlayerCommand::Build { kind, position };
            events.extend(a.issue(Team::Player, command, 0).unwrap());
        }
        let actions = reconciler_a.outbound(&events);
        let Action::BuildingQueue(BuildingPayload {
            building_id: Some(id),
            ..
        }) = &actions[1]
        else {
            panic!("expected a queued building with an id");
        };
        let id = id.clone();

        for action in actions {
            assert_eq!(reconciler_b.apply_remote(&mut b, action, 10), ApplyOutcome::Applied);
        }
        let mirrored = b.sim().get_entity(&id).unwrap();
        assert_eq!(mirrored.position, spots[1]);
        assert!(!mirrored.is_completed(BuildingKind::Reactor));
        assert_eq!(
            mirrored.as_building().map(|building| building.building_kind),
            Some(BuildingKind::Reactor)
        );
        assert_eq!(
            mirrored
                .as_building()
                .and_then(|building| building.construction_started_ms),
            None
        );
    }

    #[test]
    fn test_turret_report_applies_once_without_local_turret() {
        let (mut world, mut reconciler) = peer(Team::Player);
        let target = starting_marine_id(Team::Player, 2);
        let report = Action::TurretDamage(TurretDamagePayload {
            turret_id: EntityId::from("enemy-turret"),
            target_id: target.clone(),
            damage: 20,
            target_team: Team::Player,
            timestamp: 0,
        });
        reconciler.apply_remote(&mut world, report, 0);
        assert_eq!(world.sim().get_entity(&target).unwrap().health.current, 60);

        world
            .sim_mut()
            .add_entity(
                Entity::completed_building(
                    Team::Enemy,
                    BuildingKind::Turret,
                    Vec2Fixed::from_ints(900, 800),
                )
                .with_id("enemy-turret-2"),
            )
            .unwrap();
        let report = Action::TurretDamage(TurretDamagePayload {
            turret_id: EntityId::from("enemy-turret-2"),
            target_id: target.clone(),
            damage: 20,
            target_team: Team::Player,
            timestamp: 600,
        });
        reconciler.apply_remote(&mut world, report, 600);
        assert_eq!(world.sim().get_entity(&target).unwrap().health.current, 60);
    }

    #[test]
    fn test_position_sync_overwrites_remote_units() {
        let (world_a, reconciler_a) = peer(Team::Enemy);
        let (mut world_b, mut reconciler_b) = peer(Team::Player);
        let marine = starting_marine_id(Team::Enemy, 1);
        world_b.sim_mut().get_entity_mut(&marine).unwrap().position = Vec2Fixed::from_ints(5, 5);

        let sync = reconciler_a.position_sync(&world_a);
        assert_eq!(reconciler_b.apply_remote(&mut world_b, sync, 1_000), ApplyOutcome::Applied);
        assert_eq!(
            world_b.sim().get_entity(&marine).unwrap().position,
            world_a.sim().get_entity(&marine).unwrap().position
        );
    }
}
