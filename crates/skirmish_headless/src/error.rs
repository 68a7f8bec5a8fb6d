//! Errors from headless runs.

use thiserror::Error;

/// Errors that stop a headless command.
#[derive(Debug, Error)]
pub enum HeadlessError {
    /// The match configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] skirmish_core::error::GameError),

    /// Writing a report failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A report could not be encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Repeated runs of the same match disagreed.
    #[error("non-deterministic: {unique} distinct final hashes over {runs} runs")]
    NonDeterministic {
        /// Runs performed.
        runs: u32,
        /// Distinct hashes seen.
        unique: usize,
    },
}

/// Result alias for headless commands.
pub type Result<T> = std::result::Result<T, HeadlessError>;
