//! One page session: inbound dispatch, script execution and failures.

use crate::assembler::{assemble, PreparedScript};
use crate::collaborators::{fresh_id, Collaborators, TabRequest};
use crate::config::EngineConfig;
use crate::context::EngineContext;
use crate::error::EngineError;
use crate::external::ExternalApi;
use crate::interpreter::PageInterpreter;
use crate::lock;
use crate::sandbox::SandboxBuilder;
use crate::scheduler::{ReadyState, Scheduler};
use crate::window::HostWindow;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use userjs_bridge::{decode_host, CoreMessage, HostMessage, HostPort, LoadScriptsMessage};
use userjs_types::{ExecutionPhase, ScriptDescriptor, ScriptId};

/// A script body that threw while running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFailure {
    pub script_id: ScriptId,
    pub script_name: String,
    pub message: String,
}

pub struct SessionBuilder {
    config: EngineConfig,
    collaborators: Collaborators,
    port: Arc<dyn HostPort>,
    window: Arc<dyn HostWindow>,
    interpreter: Arc<dyn PageInterpreter>,
}

impl SessionBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    pub fn build(self) -> Session {
        let ctx = Arc::new(EngineContext::new(self.config, self.port, self.collaborators));
        Session {
            inner: Arc::new(SessionInner {
                sandboxes: SandboxBuilder::new(ctx.clone()),
                ctx,
                window: self.window,
                interpreter: self.interpreter,
                sources: Mutex::new(HashMap::new()),
                requires: Mutex::new(HashMap::new()),
                injections: Mutex::new(HashMap::new()),
                deferred: Mutex::new(None),
                failures: Mutex::new(Vec::new()),
            }),
        }
    }
}

/// Engine state for one page. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    ctx: Arc<EngineContext>,
    sandboxes: SandboxBuilder,
    window: Arc<dyn HostWindow>,
    interpreter: Arc<dyn PageInterpreter>,
    sources: Mutex<HashMap<ScriptId, String>>,
    requires: Mutex<HashMap<String, String>>,
    /// Assembled scripts waiting for the host's `Injected`, by notify id.
    injections: Mutex<HashMap<String, PreparedScript>>,
    /// End and idle phases of loaded scripts.
    deferred: Mutex<Option<Scheduler>>,
    failures: Mutex<Vec<ScriptFailure>>,
}

impl Session {
    pub fn builder(
        port: Arc<dyn HostPort>,
        window: Arc<dyn HostWindow>,
        interpreter: Arc<dyn PageInterpreter>,
    ) -> SessionBuilder {
        SessionBuilder {
            config: EngineConfig::default(),
            collaborators: Collaborators::detached(),
            port,
            window,
            interpreter,
        }
    }

    pub fn context(&self) -> &Arc<EngineContext> {
        &self.inner.ctx
    }

    /// Tells the host the engine is listening.
    pub fn start(&self) {
        info!(handler = %self.inner.ctx.config().handler_name, "Session ready");
        self.inner.ctx.port().send(CoreMessage::Ready);
    }

    /// Handles one host message. Errors are logged, never propagated.
    pub fn on_message(&self, message: HostMessage) {
        let cmd = message.command();
        debug!(cmd, "Dispatching host message");
        if let Err(e) = self.dispatch(message) {
            warn!(cmd, error = %e, "Host message handler failed");
        }
    }

    /// Decodes and handles one framed host message.
    ///
    /// Unknown commands are ignored; undecodable text is an error.
    pub fn on_text(&self, text: &str) -> Result<(), EngineError> {
        if let Some(message) = decode_host(text)? {
            self.on_message(message);
        }
        Ok(())
    }

    fn dispatch(&self, message: HostMessage) -> Result<(), EngineError> {
        let ctx = &self.inner.ctx;
        let collaborators = ctx.collaborators();
        match message {
            HostMessage::LoadScripts(load) => self.load(load),
            HostMessage::Command(command) => {
                ctx.commands().trigger(&command.key);
            }
            HostMessage::Callback(reply) => {
                ctx.callbacks().resolve(reply.callback_id, reply.payload);
            }
            HostMessage::GotRequestId(payload) => collaborators.requests.on_request_id(payload),
            HostMessage::HttpRequested(payload) => collaborators.requests.on_requested(payload),
            HostMessage::TabClosed(tab) => collaborators.tabs.on_closed(&tab.id),
            HostMessage::UpdatedValues(updates) => {
                for (id, values) in updates {
                    if !ctx.values().apply_remote_update(id, values) {
                        debug!(script_id = %id, "Ignoring values of a script not on this page");
                    }
                }
            }
            HostMessage::NotificationClicked(event) => collaborators.notifications.on_clicked(&event.id),
            HostMessage::NotificationClosed(event) => collaborators.notifications.on_closed(&event.id),
            HostMessage::ScriptChecked(reply) => {
                ctx.callbacks().resolve(reply.callback_id, reply.result);
            }
            HostMessage::CommandResponse(reply) => {
                ctx.callbacks().resolve(reply.request_id, reply.result);
            }
            HostMessage::WatchOnlineMenuClicked(online) => collaborators.tabs.open(TabRequest {
                id: fresh_id(),
                script_id: None,
                url: online.url,
                active: true,
            }),
            HostMessage::Injected(injected) => return self.run_injected(&injected.notify_id),
        }
        Ok(())
    }

    fn load(&self, load: LoadScriptsMessage) {
        let ctx = &self.inner.ctx;
        let LoadScriptsMessage {
            version,
            scripts,
            mut values,
            code,
            require,
            cache,
        } = load;

        ctx.set_host_version(&version);
        for script in &scripts {
            ctx.values()
                .insert_script(script.id, values.remove(&script.id).unwrap_or_default());
        }
        lock(&self.inner.sources).extend(code);
        lock(&self.inner.requires).extend(require);
        let resources = ctx.resources().load_base64(cache);
        info!(scripts = scripts.len(), resources, version = %version, "Scripts loaded");

        let mut plan = Scheduler::plan(scripts);
        plan.drain(ExecutionPhase::Start, |script| self.execute(script));

        let mut deferred = lock(&self.inner.deferred);
        match deferred.as_mut() {
            Some(existing) => existing.merge(plan),
            None => *deferred = Some(plan),
        }
    }

    /// Builds, assembles and hands one script to the host for injection.
    pub fn execute(&self, script: ScriptDescriptor) {
        let Some(source) = lock(&self.inner.sources).get(&script.id).cloned() else {
            warn!(script_id = %script.id, "No source received, skipping script");
            return;
        };
        let sandbox = self
            .inner
            .sandboxes
            .build(Arc::new(script), self.inner.window.clone());
        let prepared = {
            let requires = lock(&self.inner.requires);
            assemble(sandbox, &source, &requires)
        };
        let message = prepared.unit.to_message();
        debug!(
            script_id = %prepared.sandbox.script().id,
            notify_id = %message.notify_id,
            "Injecting script"
        );
        lock(&self.inner.injections).insert(message.notify_id.clone(), prepared);
        self.inner.ctx.port().send(CoreMessage::Inject(message));
    }

    fn run_injected(&self, notify_id: &str) -> Result<(), EngineError> {
        let prepared = lock(&self.inner.injections)
            .remove(notify_id)
            .ok_or_else(|| EngineError::UnknownInjection(notify_id.to_string()))?;

        if let Err(e) = self.inner.interpreter.invoke(&prepared) {
            let failure = ScriptFailure {
                script_id: prepared.sandbox.script().id,
                script_name: prepared.script_name(),
                message: e.message,
            };
            error!(
                script_id = %failure.script_id,
                script = %failure.script_name,
                "Script failed: {}",
                failure.message
            );
            lock(&self.inner.failures).push(failure);
        }
        Ok(())
    }

    /// Runs the stashed end and idle phases once the document has loaded.
    pub async fn run_deferred(&self, ready: watch::Receiver<ReadyState>) {
        let plan = lock(&self.inner.deferred).take();
        let Some(plan) = plan else {
            return;
        };
        plan.run_deferred(ready, |script| self.execute(script)).await;
    }

    /// Sends `Ready`, then dispatches inbound messages until the host goes away.
    ///
    /// Each `LoadScripts` spawns the deferred phases of the scripts it carried.
    pub async fn serve(self, mut inbox: mpsc::UnboundedReceiver<HostMessage>, ready: watch::Receiver<ReadyState>) {
        self.start();
        while let Some(message) = inbox.recv().await {
            let loads = matches!(message, HostMessage::LoadScripts(_));
            self.on_message(message);
            if loads {
                let session = self.clone();
                let ready = ready.clone();
                tokio::spawn(async move { session.run_deferred(ready).await });
            }
        }
        info!("Host channel closed");
    }

    /// Script failures recorded so far, in order.
    pub fn failures(&self) -> Vec<ScriptFailure> {
        lock(&self.inner.failures).clone()
    }

    pub fn pending_injections(&self) -> usize {
        lock(&self.inner.injections).len()
    }

    /// Notify ids of assembled scripts still waiting for `Injected`.
    pub fn pending_notify_ids(&self) -> Vec<String> {
        lock(&self.inner.injections).keys().cloned().collect()
    }

    /// The entry point exposed to a page of the given origin.
    pub fn external(&self, origin: &str) -> ExternalApi {
        ExternalApi::new(self.inner.ctx.clone(), origin)
    }
}
