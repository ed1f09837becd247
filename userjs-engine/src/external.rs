//! Entry point exposed to the hosting page itself.
//!
//! Any page may ask the host to launch. Only pages on the configured origin
//! allow-list may query the host version or whether a script is installed.

use crate::context::EngineContext;
use crate::error::ExternalError;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use userjs_bridge::{CoreMessage, PostCommandMessage};
use userjs_types::RequestId;

pub struct ExternalApi {
    ctx: Arc<EngineContext>,
    origin: String,
    privileged: bool,
}

impl ExternalApi {
    pub(crate) fn new(ctx: Arc<EngineContext>, origin: &str) -> Self {
        let privileged = ctx.config().allows_origin(origin);
        Self {
            ctx,
            origin: origin.to_string(),
            privileged,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    /// Method names available to this origin.
    pub fn methods(&self) -> &'static [&'static str] {
        if self.privileged {
            &["start", "version", "isInstalled"]
        } else {
            &["start"]
        }
    }

    /// Asks the host to launch.
    pub fn start<F>(&self, done: F) -> RequestId
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.post("Launch", Value::Null, done)
    }

    /// Host version, delivered to `done`.
    pub fn version<F>(&self, done: F) -> Result<RequestId, ExternalError>
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.require_privilege("version")?;
        Ok(self.post("GetVersion", Value::Null, done))
    }

    /// Installed version of the named script (or null), delivered to `done`.
    pub fn is_installed<F>(&self, name: &str, namespace: Option<&str>, done: F) -> Result<RequestId, ExternalError>
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.require_privilege("isInstalled")?;
        let data = json!({ "name": name, "namespace": namespace });
        Ok(self.post("CheckScript", data, done))
    }

    fn require_privilege(&self, method: &'static str) -> Result<(), ExternalError> {
        if self.privileged {
            Ok(())
        } else {
            Err(ExternalError::OriginNotAllowed {
                origin: self.origin.clone(),
                method,
            })
        }
    }

    fn post<F>(&self, cmd: &str, data: Value, done: F) -> RequestId
    where
        F: FnOnce(Value) + Send + 'static,
    {
        let request_id = self.ctx.callbacks().register(done);
        debug!(cmd, request_id = %request_id, origin = %self.origin, "Posting page command");
        self.ctx.port().send(CoreMessage::PostCommand(PostCommandMessage {
            cmd: cmd.to_string(),
            request_id,
            data,
        }));
        request_id
    }
}
