//! # Skirmish Client
//!
//! One peer of a skirmish match.
//!
//! In a multiplayer match each peer simulates the whole battlefield but is
//! authoritative only for its own team. Peers exchange discrete actions
//! through a relay; the [`reconciler`] decides which remote claims to apply
//! and parks the ones that refer to entities not yet seen locally.
//!
//! ## Crate Structure
//!
//! - [`session`] - The per-match context object
//! - [`reconciler`] - Outbound mapping, inbound application, pending-action retries
//! - [`scheduler`] - Background tick, retry and position-sync timers
//! - [`transport`] - Relay connections, including an in-process link
//! - [`input`] / [`camera`] - Pointer and keyboard handling
//! - [`victory`] - Match result and statistics
//! - [`divergence`] - Measuring how far two peers disagree
//! - [`logging`] - Subscriber setup for binaries

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod camera;
pub mod divergence;
pub mod error;
pub mod input;
pub mod logging;
pub mod reconciler;
pub mod scheduler;
pub mod session;
pub mod transport;
pub mod victory;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::divergence::{compare, Divergence};
    pub use crate::error::{Result, SessionError};
    pub use crate::input::{InputEvent, Key, MouseButton};
    pub use crate::reconciler::{ApplyOutcome, Reconciler};
    pub use crate::scheduler::{Scheduler, TimerTask};
    pub use crate::session::GameSession;
    pub use crate::transport::{link_pair, ChannelTransport, LinkProfile, LinkTransport, Transport};
    pub use crate::victory::{MatchState, MatchStats};
}
