//! Error types for the relay.

use skirmish_protocol::room::{PlayerId, RoomCode};
use thiserror::Error;

/// Relay errors. Request errors are reported back to the client that
/// caused them; the connection stays open.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No room has this code.
    #[error("room {0} does not exist")]
    RoomNotFound(RoomCode),

    /// The room already has two players.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The request needs room membership.
    #[error("player {0} is not in a room")]
    NotInRoom(PlayerId),

    /// The player must leave their current room first.
    #[error("player {0} is already in room {1}")]
    AlreadyInRoom(PlayerId, RoomCode),

    /// Only the room creator may start the match.
    #[error("only the room creator can start the match")]
    NotCreator,

    /// Both players must be present and ready.
    #[error("both players must be ready")]
    NotReady,

    /// The match has already started.
    #[error("the match in room {0} has already started")]
    AlreadyStarted(RoomCode),

    /// The match has not started yet.
    #[error("the match in room {0} has not started")]
    NotStarted(RoomCode),

    /// The client sent something that is not a relay request.
    #[error("malformed request: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Socket or listener failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`RelayError`].
pub type Result<T> = std::result::Result<T, RelayError>;
