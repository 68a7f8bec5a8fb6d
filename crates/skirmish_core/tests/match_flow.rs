//! Whole-match scenarios on a single world.

use skirmish_core::config::GameConfig;
use skirmish_core::entity_kind::{BuildingKind, UnitKind};
use skirmish_core::events::WorldEvent;
use skirmish_core::player_facade::PlayerCommand;
use skirmish_core::team::Team;
use skirmish_core::world::{base_id, starting_marine_id, GameWorld};
use skirmish_test_utils::determinism::{
    find_first_divergence, verify_serialization_determinism, verify_world_determinism,
};
use skirmish_test_utils::fixtures::{match_world, pos, spot};

fn skirmish() -> GameWorld {
    let mut world = match_world();
    for team in Team::ALL {
        let units = vec![starting_marine_id(team, 1), starting_marine_id(team, 2)];
        world
            .issue(team, PlayerCommand::AttackMove { units, destination: pos(1200, 800) }, 0)
            .unwrap();
    }
    world
}

fn run(world: &mut GameWorld, from: u64, until: u64, step: u64) -> Vec<WorldEvent> {
    let mut events = Vec::new();
    let mut now = from;
    while now < until {
        now += step;
        events.extend(world.tick(now));
        events.extend(world.background_tick(now));
    }
    events
}

#[test]
fn test_skirmish_is_deterministic() {
    verify_world_determinism(skirmish, 1_500).assert_deterministic();
    assert_eq!(find_first_divergence(skirmish, 300), None);
}

#[test]
fn test_snapshot_survives_mid_fight() {
    assert!(verify_serialization_determinism(skirmish, 700));
}

#[test]
fn test_midfield_fight_leaves_deaths_behind() {
    let mut world = skirmish();
    let events = run(&mut world, 0, 30_000, 16);

    let deaths = events
        .iter()
        .filter(|event| matches!(event, WorldEvent::Died { .. }))
        .count();
    assert!(deaths > 0);
    for event in &events {
        if let WorldEvent::Died { entity, .. } = event {
            assert!(world.sim().get_entity(entity).is_none());
            assert!(world.sim().was_purged(entity));
        }
    }
    assert!(!world.is_over());
}

#[test]
fn test_depot_income_accrues_after_completion() {
    let mut world = match_world();
    let position = spot(&world, Team::Player, 0);
    world
        .issue(Team::Player, PlayerCommand::Build { kind: BuildingKind::SupplyDepot, position }, 0)
        .unwrap();
    let after_purchase = world.ledger(Team::Player).supplies();

    let construction = BuildingKind::SupplyDepot.stats().construction_time_ms;
    run(&mut world, 0, construction, 50);
    let at_completion = world.ledger(Team::Player).supplies();
    run(&mut world, construction, construction + 10_000, 50);
    let later = world.ledger(Team::Player).supplies();

    let rate = GameConfig::default().supply_rate_per_depot;
    assert!(later >= at_completion + rate * 10 - 1, "{at_completion} -> {later}");
    assert!(at_completion >= after_purchase);
}

#[test]
fn test_barracks_produces_a_marine() {
    let mut world = match_world();
    let position = spot(&world, Team::Player, 0);
    let events = world
        .issue(Team::Player, PlayerCommand::Build { kind: BuildingKind::Barracks, position }, 0)
        .unwrap();
    let WorldEvent::BuildingPlaced { building, .. } = events[0].clone() else {
        panic!("expected placement");
    };
    let built_at = BuildingKind::Barracks.stats().construction_time_ms;
    run(&mut world, 0, built_at, 50);

    world
        .issue(
            Team::Player,
            PlayerCommand::Produce {
                building,
                unit_kind: UnitKind::Marine,
            },
            built_at,
        )
        .unwrap();
    let ready_at = built_at + UnitKind::Marine.stats().build_time_ms + 100;
    let events = run(&mut world, built_at, ready_at, 50);
    let spawned: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            WorldEvent::UnitSpawned { unit, team, .. } if *team == Team::Player => {
                Some(unit.clone())
            }
            _ => None,
        })
        .collect();
    assert_eq!(spawned.len(), 1);
    assert_eq!(world.ledger(Team::Player).current_population(), 3);
}

#[test]
fn test_destroying_a_base_ends_the_match_once() {
    let mut world = match_world();
    world.sim_mut().get_entity_mut(&base_id(Team::Enemy)).unwrap().set_health(0);
    let events = run(&mut world, 0, 200, 50);

    let game_overs = events
        .iter()
        .filter(|event| matches!(event, WorldEvent::GameOver { .. }))
        .count();
    assert_eq!(game_overs, 1);
    assert_eq!(world.winner(), Some(Team::Player));
}
