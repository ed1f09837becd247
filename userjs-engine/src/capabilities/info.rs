//! `GM_info`.

use crate::context::EngineContext;
use crate::sandbox::GrantSet;
use serde_json::{json, Value};
use userjs_types::ScriptDescriptor;

pub(crate) fn script_info(ctx: &EngineContext, script: &ScriptDescriptor, grants: &GrantSet) -> Value {
    let meta = &script.meta;
    let resources: Vec<Value> = meta
        .resources
        .iter()
        .map(|(name, url)| json!({ "name": name, "url": url }))
        .collect();
    json!({
        "scriptHandler": ctx.config().handler_name,
        "version": ctx.host_version(),
        "scriptWillUpdate": script.config.should_update,
        "uuid": script.uuid,
        "script": {
            "name": meta.name.clone().unwrap_or_default(),
            "namespace": meta.namespace.clone().unwrap_or_default(),
            "description": meta.description.clone().unwrap_or_default(),
            "version": meta.version.clone().unwrap_or_default(),
            "matches": meta.matches,
            "includes": meta.include,
            "excludes": meta.exclude,
            "resources": resources,
            "runAt": script.phase().as_str(),
            "unwrap": grants.is_unwrapped(),
        },
    })
}
