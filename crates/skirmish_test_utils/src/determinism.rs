//! Determinism testing utilities.
//!
//! Two peers only converge if each of them simulates the battlefield the
//! same way from the same inputs. The movement, combat and construction
//! systems therefore use fixed-point math and iterate entities in sorted id
//! order; this module checks that they keep doing so.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual system determinism (movement, combat, etc.)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full match scenarios are reproducible

use skirmish_core::world::GameWorld;

/// Frame spacing used by the world-level helpers.
pub const FRAME_MS: u64 = 16;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step; receives the step index
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for tick in 1..=ticks {
            step(&mut state, tick);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Advance a world by one frame plus its background tick.
pub fn step_world(world: &mut GameWorld, tick: u64) {
    let now = tick * FRAME_MS;
    world.tick(now);
    world.background_tick(now);
}

/// Run a world twice from the same setup and compare final hashes.
pub fn verify_world_determinism<F>(setup_fn: F, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> GameWorld,
{
    verify_determinism(2, num_ticks, setup_fn, step_world, |world| world.sim().state_hash())
}

/// Compare two runs step by step, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs agree throughout, `Some(tick)` at the first step
/// whose hashes differ.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> GameWorld,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.sim().state_hash() != second.sim().state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        step_world(&mut first, tick);
        step_world(&mut second, tick);

        if first.sim().state_hash() != second.sim().state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a serialization round trip preserves the simulation exactly.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> GameWorld,
{
    let mut world = setup_fn();
    for tick in 1..=num_ticks {
        step_world(&mut world, tick);
    }

    let hash_before = world.sim().state_hash();
    let Ok(bytes) = world.sim().serialize() else {
        return false;
    };
    let Ok(restored) = skirmish_core::simulation::Simulation::deserialize(&bytes) else {
        return false;
    };

    hash_before == restored.state_hash()
}

/// Proptest strategies for simulation inputs.
pub mod strategies {
    use proptest::prelude::*;
    use skirmish_core::entity_kind::{BuildingKind, UnitKind};
    use skirmish_core::math::Vec2Fixed;

    /// A position inside the default 2400x1600 battlefield.
    pub fn arb_position() -> impl Strategy<Value = Vec2Fixed> {
        (0i32..2400, 0i32..1600).prop_map(|(x, y)| Vec2Fixed::from_ints(x, y))
    }

    /// Any unit type.
    pub fn arb_unit_kind() -> impl Strategy<Value = UnitKind> {
        prop_oneof![Just(UnitKind::Marine), Just(UnitKind::Warthog), Just(UnitKind::Scorpion)]
    }

    /// Any building a player can order.
    pub fn arb_placeable_kind() -> impl Strategy<Value = BuildingKind> {
        proptest::sample::select(BuildingKind::PLACEABLE.to_vec())
    }

    /// A damage amount in the range weapons deal.
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        1u32..200
    }

    /// Frame spacing between 1 ms and a quarter second.
    pub fn arb_frame_ms() -> impl Strategy<Value = u64> {
        1u64..250
    }
}
