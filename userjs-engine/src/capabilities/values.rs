use super::{Args, GmReturn};
use crate::error::CapabilityError;
use crate::sandbox::Sandbox;
use serde_json::Value;

pub(super) fn get_value(sandbox: &Sandbox, args: &Args) -> Result<GmReturn, CapabilityError> {
    let key = args.string(0, "key")?;
    let id = sandbox.script().id;
    Ok(match sandbox.ctx().values().get(id, &key) {
        Some(value) => GmReturn::Value(value),
        None => match args.value(1) {
            Some(default) => GmReturn::Value(default.clone()),
            None => GmReturn::Undefined,
        },
    })
}

pub(super) fn set_value(sandbox: &Sandbox, args: &Args) -> Result<GmReturn, CapabilityError> {
    let key = args.string(0, "key")?;
    let value = args.value(1).cloned().unwrap_or(Value::Null);
    sandbox.ctx().values().set(sandbox.script().id, &key, &value);
    Ok(GmReturn::Undefined)
}

pub(super) fn delete_value(sandbox: &Sandbox, args: &Args) -> Result<GmReturn, CapabilityError> {
    let key = args.string(0, "key")?;
    sandbox.ctx().values().delete(sandbox.script().id, &key);
    Ok(GmReturn::Undefined)
}

pub(super) fn list_values(sandbox: &Sandbox) -> Result<GmReturn, CapabilityError> {
    let keys = sandbox.ctx().values().keys(sandbox.script().id);
    Ok(GmReturn::Value(Value::from(keys)))
}
