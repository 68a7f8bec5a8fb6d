//! Protocol errors.

use thiserror::Error;

/// Errors decoding or encoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The action tag is not one this build understands.
    #[error("unknown action tag: {0}")]
    UnknownAction(String),

    /// The tag is known but its payload does not match.
    #[error("malformed {action} payload: {message}")]
    Malformed {
        /// Action tag.
        action: String,
        /// Decoder message.
        message: String,
    },

    /// The message is not valid JSON or lacks the envelope fields.
    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),
}
