//! Headless match runner for AI testing and CI verification.
//!
//! Runs skirmish matches without a renderer or a network:
//!
//! - **solo**: two AIs in one world, reporting the winner and statistics
//! - **duel**: two reconciling peers, each autopiloted by an AI, talking
//!   over an in-process link with configurable latency and reordering,
//!   reporting how far their worlds drifted apart
//! - **verify**: the same solo match several times, failing on any
//!   difference in the final state hash
//!
//! Reports are JSON on stdout; logs go to stderr.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod report;
pub mod runner;

pub use error::{HeadlessError, Result};
pub use report::{save, DuelReport, LinkReport, SoloReport};
pub use runner::{run_duel, run_solo, verify_determinism, DuelSettings, SoloSettings};

use std::path::Path;

use skirmish_core::config::GameConfig;

/// Load a RON match configuration, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<GameConfig> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading match configuration");
            Ok(GameConfig::load(path)?)
        }
        None => Ok(GameConfig::default()),
    }
}
