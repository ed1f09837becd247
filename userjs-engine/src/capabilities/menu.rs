use super::{Args, GmReturn};
use crate::error::CapabilityError;
use crate::sandbox::Sandbox;
use userjs_bridge::{CoreMessage, MenuMessage, UnregisterMenuMessage};

pub(super) fn register(sandbox: &Sandbox, args: &Args) -> Result<GmReturn, CapabilityError> {
    let caption = args.string(0, "caption")?;
    let handler = args
        .callback(1)
        .ok_or_else(|| CapabilityError::invalid(args.capability(), "handler is not a function"))?;
    let key = sandbox.ctx().commands().register(sandbox.script().id, &caption, handler);
    sandbox
        .ctx()
        .port()
        .send(CoreMessage::RegisterMenu(MenuMessage { key, caption }));
    Ok(GmReturn::Undefined)
}

pub(super) fn unregister(sandbox: &Sandbox, args: &Args) -> Result<GmReturn, CapabilityError> {
    let caption = args.string(0, "caption")?;
    if let Some(key) = sandbox.ctx().commands().unregister(sandbox.script().id, &caption) {
        sandbox
            .ctx()
            .port()
            .send(CoreMessage::UnregisterMenu(UnregisterMenuMessage { key }));
    }
    Ok(GmReturn::Undefined)
}
