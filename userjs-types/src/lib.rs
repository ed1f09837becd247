//! Core type definitions for the userjs engine.
//!
//! This crate defines the plain data exchanged with the privileged host:
//! - Script and request identifiers
//! - Script descriptors (parsed header, runtime overrides, config)
//! - Execution phases
//!
//! Nothing here talks to the host or to the page; the bridge and engine
//! crates build on these types.

mod ids;
mod phase;
mod script;

pub use ids::{RequestId, ScriptId};
pub use phase::ExecutionPhase;
pub use script::{CustomOverrides, ScriptConfig, ScriptDescriptor, ScriptMeta};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid script id: {0}")]
    InvalidScriptId(String),
}
