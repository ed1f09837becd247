//! Engine configuration, read from the `[engine]` table of a TOML file.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Trace value decode failures.
    #[serde(default)]
    pub debug: bool,
    /// Reported to scripts as `GM_info.scriptHandler`.
    #[serde(default = "default_handler_name")]
    pub handler_name: String,
    /// Page origins allowed to use the privileged entry point methods.
    #[serde(default)]
    pub external_origins: Vec<String>,
    /// Extra global names hidden from the protected view.
    #[serde(default)]
    pub blocked_globals: Vec<String>,
}

fn default_handler_name() -> String {
    "userjs".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug: false,
            handler_name: default_handler_name(),
            external_origins: Vec::new(),
            blocked_globals: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    engine: EngineConfig,
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    /// Falls back to defaults when the file is missing, unreadable or invalid.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No engine config at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::read(path) {
            Ok(config) => {
                info!("Loaded engine config from {:?}", path);
                config
            }
            Err(e) => {
                warn!("{}. Falling back to defaults.", e);
                Self::default()
            }
        }
    }

    /// Reads a TOML file, failing on any error.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses TOML text. A document without an `[engine]` table yields defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(file.engine)
    }

    /// Whether `origin` may use the privileged entry point methods.
    pub fn allows_origin(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/');
        self.external_origins
            .iter()
            .any(|allowed| allowed.trim_end_matches('/') == origin)
    }
}
