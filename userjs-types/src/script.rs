//! Script descriptors as received from the host.
//!
//! Every field is optional on the wire. Missing or `null` values collapse
//! to empty collections so that a malformed header never blocks a load.

use crate::ids::ScriptId;
use crate::phase::ExecutionPhase;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Treats an explicit `null` the same as a missing field.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One installed script, immutable once received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDescriptor {
    pub id: ScriptId,
    #[serde(default, deserialize_with = "null_default")]
    pub uuid: String,
    #[serde(default, deserialize_with = "null_default")]
    pub meta: ScriptMeta,
    #[serde(default, deserialize_with = "null_default")]
    pub custom: CustomOverrides,
    #[serde(default, deserialize_with = "null_default")]
    pub config: ScriptConfig,
}

/// Parsed script header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptMeta {
    #[serde(default, deserialize_with = "null_default")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub namespace: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub grant: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub require: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub resources: BTreeMap<String, String>,
    #[serde(default, rename = "match", deserialize_with = "null_default")]
    pub matches: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub include: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub exclude: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub run_at: Option<String>,
}

/// Runtime overrides set by the user in the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomOverrides {
    #[serde(default, deserialize_with = "null_default")]
    pub path_map: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_default")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub run_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptConfig {
    #[serde(default, deserialize_with = "null_default")]
    pub should_update: bool,
}

impl ScriptDescriptor {
    /// Creates a descriptor with the given id and an empty header.
    pub fn new(id: impl Into<ScriptId>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Effective execution phase (`custom.runAt ?? meta.runAt`).
    pub fn phase(&self) -> ExecutionPhase {
        ExecutionPhase::resolve(self.custom.run_at.as_deref(), self.meta.run_at.as_deref())
    }

    /// Name used in logs and error reports.
    pub fn display_name(&self) -> String {
        self.custom
            .name
            .as_deref()
            .or(self.meta.name.as_deref())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", self.id))
    }

    /// Resolves a dependency or resource URL through the path remap table.
    pub fn resolve_path<'a>(&'a self, url: &'a str) -> &'a str {
        self.custom.path_map.get(url).map(String::as_str).unwrap_or(url)
    }

    /// Returns the declared URL of a named resource, if this script declares it.
    pub fn resource_url(&self, name: &str) -> Option<&str> {
        self.meta.resources.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_custom_then_meta_then_id() {
        let mut script = ScriptDescriptor::new(7);
        assert_eq!(script.display_name(), "#7");
        script.meta.name = Some("Header Name".into());
        assert_eq!(script.display_name(), "Header Name");
        script.custom.name = Some("Custom".into());
        assert_eq!(script.display_name(), "Custom");
    }

    #[test]
    fn resolve_path_uses_path_map() {
        let mut script = ScriptDescriptor::new(1);
        script
            .custom
            .path_map
            .insert("https://cdn/a.js".into(), "local/a.js".into());
        assert_eq!(script.resolve_path("https://cdn/a.js"), "local/a.js");
        assert_eq!(script.resolve_path("https://cdn/b.js"), "https://cdn/b.js");
    }
}
