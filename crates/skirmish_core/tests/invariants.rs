//! Property tests for invariants that must hold on every peer.

use proptest::prelude::*;
use skirmish_core::entity::Entity;
use skirmish_core::entity_kind::{BuildingKind, UnitKind};
use skirmish_core::events::WorldEvent;
use skirmish_core::player_facade::PlayerCommand;
use skirmish_core::team::Team;
use skirmish_test_utils::determinism::strategies::{
    arb_damage, arb_frame_ms, arb_placeable_kind, arb_unit_kind,
};
use skirmish_test_utils::fixtures::{match_world, pos, spot};

#[derive(Debug, Clone)]
enum HealthOp {
    Damage(u32),
    Report(u32),
}

fn arb_health_op() -> impl Strategy<Value = HealthOp> {
    prop_oneof![
        arb_damage().prop_map(HealthOp::Damage),
        (0u32..250).prop_map(HealthOp::Report),
    ]
}

proptest! {
    #[test]
    fn prop_death_is_permanent(
        kind in arb_unit_kind(),
        ops in prop::collection::vec(arb_health_op(), 1..40),
    ) {
        let mut unit = Entity::unit(Team::Enemy, kind, pos(500, 500));
        let mut died = false;
        for op in ops {
            match op {
                HealthOp::Damage(amount) => {
                    unit.apply_damage(amount);
                }
                HealthOp::Report(value) => unit.set_health(value),
            }
            if died {
                prop_assert!(unit.is_dead());
                prop_assert_eq!(unit.health.current, 0);
            }
            died = unit.is_dead();
        }
    }

    #[test]
    fn prop_construction_progress_never_decreases(
        kind in arb_placeable_kind(),
        times in prop::collection::vec(0u64..30_000, 1..50),
    ) {
        let mut entity = Entity::building(Team::Player, kind, pos(460, 800));
        let building = entity.as_building_mut().unwrap();
        building.start_construction(1_000);
        let mut last = building.construction_progress;
        for now in times {
            building.advance_construction(now);
            prop_assert!(building.construction_progress >= last);
            prop_assert!(building.construction_progress <= skirmish_core::math::fx(1));
            last = building.construction_progress;
        }
    }

    #[test]
    fn prop_building_completes_on_any_frame_cadence(
        frames in prop::collection::vec(arb_frame_ms(), 1..400),
    ) {
        let mut world = match_world();
        let position = spot(&world, Team::Player, 0);
        let events = world
            .issue(Team::Player, PlayerCommand::Build { kind: BuildingKind::Generic, position }, 0)
            .unwrap();
        let WorldEvent::BuildingPlaced { building, .. } = &events[0] else {
            panic!("expected placement");
        };
        let construction_time = BuildingKind::Generic.stats().construction_time_ms;

        let mut now = 0;
        let mut last = skirmish_core::math::Fixed::ZERO;
        for frame in frames {
            now += frame;
            world.tick(now);
            let entity = world.sim().get_entity(building).unwrap();
            let state = entity.as_building().unwrap();
            prop_assert!(state.construction_progress >= last);
            last = state.construction_progress;
            if now >= construction_time {
                prop_assert!(entity.is_completed(BuildingKind::Generic));
            }
        }
    }
}
