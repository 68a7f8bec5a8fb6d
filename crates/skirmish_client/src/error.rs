//! Session errors.

use skirmish_core::error::GameError;
use skirmish_protocol::ProtocolError;
use thiserror::Error;

/// Errors surfaced by a [`crate::session::GameSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// A local command was rejected by the simulation.
    #[error(transparent)]
    Game(#[from] GameError),

    /// A message could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The transport could not deliver a message.
    #[error("transport error: {0}")]
    Transport(String),

    /// The match has not started yet.
    #[error("match not started")]
    NotStarted,

    /// The match is over.
    #[error("match is over")]
    GameOver,
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
