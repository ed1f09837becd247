//! Error types for the engine.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a GM API call, returned to the calling script only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("capability '{0}' is not granted")]
    Unavailable(String),

    #[error("'{0}' is not a function")]
    NotCallable(String),

    #[error("{capability}: {reason}")]
    InvalidArgument {
        capability: &'static str,
        reason: String,
    },
}

impl CapabilityError {
    pub(crate) fn invalid(capability: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            capability,
            reason: reason.into(),
        }
    }
}

/// Failure of a call forwarded to the page global object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("'{0}' is not accessible from this script")]
    Blocked(String),

    #[error("'{0}' is not a function")]
    NotCallable(String),

    #[error("{name} threw: {message}")]
    Threw { name: String, message: String },
}

/// Error thrown by a script body while it ran.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ScriptError {
    pub message: String,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Refusal of the page-exposed entry point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExternalError {
    #[error("origin '{origin}' may not call '{method}'")]
    OriginNotAllowed { origin: String, method: &'static str },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failure while dispatching a host message.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no pending injection named '{0}'")]
    UnknownInjection(String),

    #[error(transparent)]
    Bridge(#[from] userjs_bridge::BridgeError),
}
