//! Error types for the bridge layer.

use thiserror::Error;

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors that can occur while framing bridge messages.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The text was not valid JSON, or not an envelope.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A known command carried a payload of the wrong shape.
    #[error("malformed '{command}' payload: {reason}")]
    Malformed { command: String, reason: String },

    /// Message exceeds the framing limit.
    #[error("message too large: {0} bytes")]
    TooLarge(usize),
}
