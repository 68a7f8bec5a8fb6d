//! Error types for the battlefield simulation.

use thiserror::Error;

use crate::components::EntityId;
use crate::entity_kind::{BuildingKind, UnitKind};

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Why a building could not be placed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// No base slot near the requested position.
    #[error("no building spot at the requested position")]
    NoBuildingSpot,
    /// The requested position is too far from the team's base.
    #[error("position is outside the base range")]
    OutOfBaseRange,
    /// The slot exists but the base upgrade level does not unlock it yet.
    #[error("building spot {0} is locked")]
    SpotLocked(usize),
    /// The slot already holds a building.
    #[error("building spot {0} is occupied")]
    SpotOccupied(usize),
    /// The footprint would overlap an existing building.
    #[error("footprint overlaps building {0}")]
    Overlap(EntityId),
    /// This building type can never be placed by a player.
    #[error("{0:?} cannot be placed")]
    NotPlaceable(BuildingKind),
}

/// Top-level error type for all simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Referenced entity does not exist in the live collection.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// An entity with this id is already live or was purged earlier.
    #[error("Duplicate entity id: {0}")]
    DuplicateEntity(EntityId),

    /// Command referenced an entity owned by the other team.
    #[error("Entity {0} is not owned by the issuing team")]
    NotOwned(EntityId),

    /// The issuing team cannot afford the cost.
    #[error("Insufficient resources: need {required} {resource}, have {available}")]
    InsufficientResources {
        /// Resource type.
        resource: &'static str,
        /// Amount required.
        required: u32,
        /// Amount available.
        available: u32,
    },

    /// Building placement rejected.
    #[error("Invalid placement: {0}")]
    InvalidPlacement(#[from] PlacementError),

    /// The building cannot produce the requested unit.
    #[error("{building:?} cannot produce {unit:?}")]
    CannotProduce {
        /// Producing building type.
        building: BuildingKind,
        /// Requested unit type.
        unit: UnitKind,
    },

    /// The building is still under construction.
    #[error("Building {0} is not yet constructed")]
    BuildingNotConstructed(EntityId),

    /// The production queue is full.
    #[error("Production queue of {0} is full")]
    QueueFull(EntityId),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Configuration could not be loaded.
    #[error("Failed to load config '{path}': {message}")]
    ConfigError {
        /// Path to the file that failed to load.
        path: String,
        /// Error message.
        message: String,
    },
}
