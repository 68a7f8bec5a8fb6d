//! # Skirmish Relay
//!
//! The room relay two peers talk through. It pairs players into two-seat
//! rooms, runs the ready/start handshake, forwards game actions between the
//! seats with the sender's id stamped in, and declares a winner when a
//! player leaves or fails to come back within the grace window.
//!
//! The relay never looks inside game actions.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod error;
pub mod rooms;
pub mod server;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use rooms::{Delivery, Phase, Room, Rooms};
pub use server::{router, run, serve_on, RelayState};
