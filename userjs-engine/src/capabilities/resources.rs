//! `GM_getResourceText` and `GM_getResourceURL`.
//!
//! A script can only reach resources declared in its own header. The
//! declared URL is resolved through the script's path map to find the
//! cache key.

use super::{Args, GmReturn};
use crate::error::CapabilityError;
use crate::sandbox::Sandbox;
use serde_json::Value;
use tracing::debug;

/// Cache key of a declared resource.
fn resource_key(sandbox: &Sandbox, name: &str) -> Option<String> {
    let script = sandbox.script();
    let url = script.resource_url(name)?;
    Some(script.resolve_path(url).to_string())
}

pub(super) fn get_resource_text(sandbox: &Sandbox, args: &Args) -> Result<GmReturn, CapabilityError> {
    let name = args.string(0, "resource name")?;
    let Some(key) = resource_key(sandbox, &name) else {
        return Ok(GmReturn::Undefined);
    };
    Ok(match sandbox.ctx().resources().get(&key) {
        Some(bytes) => GmReturn::Value(Value::String(String::from_utf8_lossy(&bytes).into_owned())),
        None => GmReturn::Undefined,
    })
}

pub(super) fn get_resource_url(sandbox: &Sandbox, args: &Args) -> Result<GmReturn, CapabilityError> {
    let name = args.string(0, "resource name")?;
    let Some(key) = resource_key(sandbox, &name) else {
        return Ok(GmReturn::Undefined);
    };
    if let Some(url) = sandbox.cached_resource_url(&key) {
        return Ok(GmReturn::Value(Value::String(url)));
    }
    let url = match sandbox.ctx().resources().get(&key) {
        Some(bytes) => {
            let url = sandbox.real_window().create_object_url(&bytes);
            sandbox.remember_resource_url(&key, &url);
            url
        }
        None => {
            debug!(script_id = %sandbox.script().id, resource = %key, "Resource not cached, returning its key");
            key
        }
    };
    Ok(GmReturn::Value(Value::String(url)))
}
