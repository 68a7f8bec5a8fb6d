//! # Skirmish Protocol
//!
//! Wire types shared by the client and the relay.
//!
//! Peers exchange [`ActionEnvelope`]s through the relay: a tag, a
//! tag-specific payload and, once relayed, the sender's identity. Room
//! lifecycle traffic between a client and the relay uses [`ClientMessage`]
//! and [`RelayMessage`]. Everything is JSON.
//!
//! ```text
//! {"action":"unitMove",
//!  "data":{"unitId":"p-player-3","destination":{"x":100.0,"y":200.0},"team":"player"},
//!  "senderId":"7"}
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod actions;
pub mod envelope;
pub mod error;
pub mod room;

pub use actions::{
    Action, AttackPayload, AttackPerformedPayload, BuildingCancelPayload, BuildingCompletePayload,
    BuildingPayload, BuildingStartPayload, MovePayload, PositionSyncPayload, TurretAttackPayload,
    TurretDamagePayload, TurretTargetPayload, UnitDamagePayload, UnitPosition, UnitProducePayload,
    UnitSpawnPayload, WirePoint,
};
pub use envelope::{stamp_sender, ActionEnvelope};
pub use error::ProtocolError;
pub use room::{ClientMessage, PlayerId, RelayMessage, RoomCode};
