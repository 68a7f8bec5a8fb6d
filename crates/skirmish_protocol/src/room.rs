//! Messages between a client and the relay.
//!
//! The relay knows nothing about the game beyond room membership: it relays
//! action envelopes verbatim, stamping each with the sender's id.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use skirmish_core::team::Team;

/// Relay-assigned connection id.
pub type PlayerId = u64;

/// Short code a second player uses to join a room.
pub type RoomCode = String;

/// Client to relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Open a new room and wait for an opponent.
    CreateRoom,
    /// Join an existing room.
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        /// Room to join.
        room_code: RoomCode,
    },
    /// Mark this player ready to start.
    Ready,
    /// Start the match. Only the room creator may, once both are ready.
    StartGame,
    /// An action for the other room member, as an encoded envelope.
    GameAction(Value),
    /// Report the match result.
    GameOver {
        /// Winning team.
        winner: Team,
    },
    /// Leave the room.
    LeaveRoom,
}

/// Relay to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum RelayMessage {
    /// Connection id assigned on connect.
    #[serde(rename_all = "camelCase")]
    Identity {
        /// This connection's id.
        player_id: PlayerId,
    },
    /// The room was created; the creator plays [`Team::Player`].
    #[serde(rename_all = "camelCase")]
    RoomCreated {
        /// Code to share.
        room_code: RoomCode,
        /// Team assigned to the creator.
        team: Team,
    },
    /// The room was joined; the joiner plays [`Team::Enemy`].
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        /// Joined room.
        room_code: RoomCode,
        /// Team assigned to the joiner.
        team: Team,
    },
    /// Readiness changed.
    #[serde(rename_all = "camelCase")]
    PlayersReady {
        /// Whether the creator may start.
        can_start: bool,
    },
    /// The match began.
    GameStarted,
    /// An action from the other room member, with `senderId` stamped.
    GameAction(Value),
    /// The other member disconnected; a grace window is running.
    #[serde(rename_all = "camelCase")]
    PlayerDisconnected {
        /// Who dropped.
        player_id: PlayerId,
        /// How long they have to come back.
        grace_ms: u64,
    },
    /// The match ended.
    GameOver {
        /// Winning team.
        winner: Team,
        /// Why it ended.
        reason: String,
    },
    /// A request was refused.
    Error {
        /// Explanation.
        message: String,
    },
}
