//! Two sessions over a delayed link.

use skirmish_client::transport::LinkProfile;
use skirmish_core::config::GameConfig;
use skirmish_core::entity_kind::BuildingKind;
use skirmish_core::player_facade::PlayerCommand;
use skirmish_core::team::Team;
use skirmish_core::world::starting_marine_id;
use skirmish_test_utils::fixtures::pos;
use skirmish_test_utils::peers::Duel;

const FRAME_MS: u64 = 16;

fn skirmish_at_midfield(duel: &mut Duel) {
    for team in Team::ALL {
        let units = vec![starting_marine_id(team, 1), starting_marine_id(team, 2)];
        let now = duel.now_ms();
        duel.session_mut(team)
            .issue(
                PlayerCommand::AttackMove {
                    units,
                    destination: pos(1200, 800),
                },
                now,
            )
            .unwrap();
    }
}

#[test]
fn test_delayed_link_converges_after_a_fight() {
    let profile = LinkProfile {
        latency_ms: 60,
        jitter_ms: 0,
        seed: 0,
    };
    let mut duel = Duel::new(GameConfig::default(), profile);
    skirmish_at_midfield(&mut duel);
    duel.run_frames(20_000, FRAME_MS);
    duel.settle(5_000, 50);
    assert_eq!(duel.in_flight(), 0);
    let now = duel.now_ms();
    duel.run_background(now + 500, 50);

    let divergence = duel.divergence();
    assert!(divergence.is_consistent(), "{divergence:?}");
    assert!(divergence.max_position_drift < 150.0, "{divergence:?}");

    let player = duel.session(Team::Player).stats();
    let enemy = duel.session(Team::Enemy).stats();
    assert_eq!(player.enemies_killed, enemy.units_lost);
    assert_eq!(enemy.enemies_killed, player.units_lost);
}

#[test]
fn test_reordering_link_keeps_the_same_entities() {
    let profile = LinkProfile {
        latency_ms: 40,
        jitter_ms: 150,
        seed: 42,
    };
    let mut duel = Duel::new(GameConfig::default(), profile);
    skirmish_at_midfield(&mut duel);
    duel.run_frames(20_000, FRAME_MS);
    duel.settle(5_000, 50);

    let divergence = duel.divergence();
    assert_eq!(divergence.only_in_first, 0, "{divergence:?}");
    assert_eq!(divergence.only_in_second, 0, "{divergence:?}");
    for team in Team::ALL {
        let net = duel.session(team).net_stats();
        assert!(net.sent > 0);
        assert_eq!(net.malformed, 0);
        assert_eq!(net.unknown, 0);
    }
}

#[test]
fn test_background_wakeups_keep_construction_moving() {
    let mut duel = Duel::new(GameConfig::default(), LinkProfile::INSTANT);
    let position = duel.session(Team::Player).world().layout(Team::Player).spots()[0].position;
    duel.session_mut(Team::Player)
        .issue(
            PlayerCommand::Build {
                kind: BuildingKind::Generic,
                position,
            },
            0,
        )
        .unwrap();

    // No frames at all: only timer wakeups.
    duel.run_background(6_000, 50);
    let player_world = duel.session(Team::Player).world();
    let building = player_world
        .sim()
        .entities()
        .iter()
        .find(|e| e.position == position)
        .map(|e| e.id.clone())
        .unwrap();
    assert!(player_world.sim().get_entity(&building).unwrap().is_completed(BuildingKind::Generic));
    let mirrored = duel.session(Team::Enemy).world().sim().get_entity(&building).unwrap();
    assert!(mirrored.is_completed(BuildingKind::Generic));
}
