//! `GM_addStyle`.

use super::{Args, GmReturn, ScriptCallback};
use crate::error::CapabilityError;
use crate::lock;
use crate::sandbox::Sandbox;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex};
use userjs_bridge::{AddStyleMessage, CoreMessage};

enum State {
    Pending(Vec<ScriptCallback>),
    Resolved(Value),
}

/// Settles when the host reports the style element inserted.
///
/// `then` may be called before or after settlement; every registered
/// callback runs exactly once with the host's payload.
#[derive(Clone)]
pub struct StylePromise {
    state: Arc<Mutex<State>>,
}

impl StylePromise {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Pending(Vec::new()))),
        }
    }

    pub fn then(&self, callback: impl Fn(Value) + Send + Sync + 'static) {
        let callback: ScriptCallback = Arc::new(callback);
        let resolved = {
            let mut state = lock(&self.state);
            match &mut *state {
                State::Pending(waiting) => {
                    waiting.push(callback.clone());
                    None
                }
                State::Resolved(value) => Some(value.clone()),
            }
        };
        if let Some(value) = resolved {
            callback(value);
        }
    }

    pub(crate) fn resolve(&self, value: Value) {
        let waiting = {
            let mut state = lock(&self.state);
            if let State::Resolved(_) = &*state {
                return;
            }
            match std::mem::replace(&mut *state, State::Resolved(value.clone())) {
                State::Pending(waiting) => waiting,
                State::Resolved(_) => Vec::new(),
            }
        };
        for callback in waiting {
            callback(value.clone());
        }
    }

    /// The settled value, if any.
    pub fn value(&self) -> Option<Value> {
        match &*lock(&self.state) {
            State::Resolved(value) => Some(value.clone()),
            State::Pending(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.value().is_some()
    }
}

impl fmt::Debug for StylePromise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StylePromise").field("value", &self.value()).finish()
    }
}

pub(super) fn add_style(sandbox: &Sandbox, args: &Args) -> Result<GmReturn, CapabilityError> {
    let css = args.string(0, "css")?;
    let promise = StylePromise::new();
    let settle = promise.clone();
    let callback_id = sandbox
        .ctx()
        .callbacks()
        .register_one_shot(move |payload| settle.resolve(payload));
    sandbox
        .ctx()
        .port()
        .send(CoreMessage::AddStyle(AddStyleMessage { css, callback_id }));
    Ok(GmReturn::Style(promise))
}
