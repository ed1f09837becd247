//! Execution phases relative to page load.

use serde::{Deserialize, Serialize};
use std::fmt;

/// When a script runs relative to the page's load progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionPhase {
    /// Before the document is parsed.
    #[serde(rename = "document-start")]
    Start,
    /// Once the document is parsed.
    #[default]
    #[serde(rename = "document-end")]
    End,
    /// After the end phase, on a later turn of the event loop.
    #[serde(rename = "document-idle")]
    Idle,
}

impl ExecutionPhase {
    /// Parses a declared `runAt` value. Accepts both `document-start` and
    /// the short `start` form; anything else is unrecognized.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let short = raw.strip_prefix("document-").unwrap_or(raw);
        match short {
            "start" => Some(Self::Start),
            "end" => Some(Self::End),
            "idle" => Some(Self::Idle),
            _ => None,
        }
    }

    /// Resolves the effective phase: the override wins, then the declared
    /// value; absent or unrecognized values fall back to `End`.
    pub fn resolve(custom: Option<&str>, declared: Option<&str>) -> Self {
        custom
            .or(declared)
            .and_then(Self::parse)
            .unwrap_or_default()
    }

    /// Returns the canonical header spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "document-start",
            Self::End => "document-end",
            Self::Idle => "document-idle",
        }
    }
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
