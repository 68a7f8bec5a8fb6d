//! # Skirmish Core
//!
//! Deterministic battlefield simulation for a two-team skirmish.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO beyond loading a config file on request
//! - No system randomness
//! - No floating-point math in the simulation (uses fixed-point)
//!
//! Each multiplayer peer runs its own [`world::GameWorld`]. The
//! [`combat::Authority`] setting decides which state transitions a peer
//! computes itself and which it waits to receive from the other peer.
//!
//! ## Crate Structure
//!
//! - [`math`] - Fixed-point geometry
//! - [`entity`] - Units and buildings
//! - [`simulation`] - Entity collection and the per-tick update
//! - [`economy`] - Per-team resource ledger
//! - [`world`] - A whole match: simulation plus economy, construction and base layouts
//! - [`player_facade`] - The command surface shared by human input and the AI
//! - [`ai`] - Scripted opponent

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod base_layout;
pub mod combat;
pub mod components;
pub mod config;
pub mod construction;
pub mod economy;
pub mod entity;
pub mod entity_kind;
pub mod error;
pub mod events;
pub mod math;
pub mod player_facade;
pub mod production;
pub mod simulation;
pub mod systems;
pub mod team;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{AiController, Difficulty};
    pub use crate::combat::Authority;
    pub use crate::components::*;
    pub use crate::config::GameConfig;
    pub use crate::economy::ResourceLedger;
    pub use crate::entity::{Building, Entity, EntityKind, Unit};
    pub use crate::entity_kind::{BuildingKind, EntityType, UnitKind};
    pub use crate::error::{GameError, PlacementError, Result};
    pub use crate::events::{DamageSource, WorldEvent};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::player_facade::{PlayerCommand, PlayerFacade, TeamView};
    pub use crate::simulation::Simulation;
    pub use crate::team::Team;
    pub use crate::world::GameWorld;
}
