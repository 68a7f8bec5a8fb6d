//! Simulation benchmarks for skirmish_core.
//!
//! Run with: `cargo bench -p skirmish_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use skirmish_core::config::GameConfig;
use skirmish_core::entity::Entity;
use skirmish_core::entity_kind::UnitKind;
use skirmish_core::math::Vec2Fixed;
use skirmish_core::player_facade::PlayerCommand;
use skirmish_core::team::Team;
use skirmish_core::world::GameWorld;

/// A match with two armies of `per_team` marines converging on midfield.
fn crowded_match(per_team: i32) -> GameWorld {
    let mut world = GameWorld::new_match(GameConfig::default());
    for team in Team::ALL {
        let x = if team == Team::Player { 500 } else { 1900 };
        let mut units = Vec::new();
        for n in 0..per_team {
            let entity = Entity::unit(team, UnitKind::Marine, Vec2Fixed::from_ints(x, 400 + n * 20))
                .with_id(format!("bench-{team}-{n}"));
            if let Ok(id) = world.sim_mut().add_entity(entity) {
                units.push(id);
            }
        }
        let _ = world.issue(
            team,
            PlayerCommand::AttackMove {
                units,
                destination: Vec2Fixed::from_ints(1200, 800),
            },
            0,
        );
    }
    world
}

pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("tick_40_units", |b| {
        b.iter_batched(
            || crowded_match(20),
            |mut world| {
                for frame in 1..=60 {
                    black_box(world.tick(frame * 16));
                }
                world
            },
            BatchSize::SmallInput,
        )
    });

    let world = crowded_match(20);
    c.bench_function("state_hash_40_units", |b| b.iter(|| black_box(world.sim().state_hash())));
    c.bench_function("snapshot_40_units", |b| b.iter(|| black_box(world.sim().serialize())));
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);
