//! Shared test helpers for engine tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use userjs_bridge::mock::RecordingPort;
use userjs_bridge::{CoreMessage, HostMessage, InjectedMessage};
use userjs_engine::window::mock::MockWindow;
use userjs_engine::{
    Collaborators, EngineConfig, EngineContext, PageInterpreter, PreparedScript, Sandbox, SandboxBuilder,
    ScriptError, Session,
};
use userjs_types::ScriptDescriptor;

type Body = Box<dyn Fn(&PreparedScript) -> Result<(), ScriptError> + Send + Sync>;

/// Records the scripts it runs; bodies can be scripted per script name.
#[derive(Default)]
pub struct ScriptedInterpreter {
    ran: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    bodies: Mutex<HashMap<String, Body>>,
}

impl ScriptedInterpreter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes the named script throw.
    pub fn fail(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    /// Runs `body` when the named script is invoked.
    pub fn on_run(&self, name: &str, body: impl Fn(&PreparedScript) -> Result<(), ScriptError> + Send + Sync + 'static) {
        self.bodies.lock().unwrap().insert(name.to_string(), Box::new(body));
    }

    pub fn ran(&self) -> Vec<String> {
        self.ran.lock().unwrap().clone()
    }
}

impl PageInterpreter for ScriptedInterpreter {
    fn invoke(&self, script: &PreparedScript) -> Result<(), ScriptError> {
        let name = script.script_name();
        self.ran.lock().unwrap().push(name.clone());
        if self.failing.lock().unwrap().contains(&name) {
            return Err(ScriptError::new(format!("boom in {name}")));
        }
        match self.bodies.lock().unwrap().get(&name) {
            Some(body) => body(script),
            None => Ok(()),
        }
    }
}

pub fn make_script(id: u64, name: &str, grants: &[&str]) -> ScriptDescriptor {
    let mut script = ScriptDescriptor::new(id);
    script.meta.name = Some(name.to_string());
    script.meta.grant = grants.iter().map(|g| g.to_string()).collect();
    script
}

pub fn make_script_at(id: u64, name: &str, run_at: &str) -> ScriptDescriptor {
    let mut script = make_script(id, name, &["none"]);
    script.meta.run_at = Some(run_at.to_string());
    script
}

pub fn make_ctx() -> (Arc<EngineContext>, Arc<RecordingPort>) {
    make_ctx_with(EngineConfig::default(), Collaborators::detached())
}

pub fn make_ctx_with(config: EngineConfig, collaborators: Collaborators) -> (Arc<EngineContext>, Arc<RecordingPort>) {
    let port = Arc::new(RecordingPort::new());
    let ctx = Arc::new(EngineContext::new(config, port.clone(), collaborators));
    (ctx, port)
}

pub fn make_sandbox(ctx: &Arc<EngineContext>, script: ScriptDescriptor, window: &Arc<MockWindow>) -> Sandbox {
    SandboxBuilder::new(ctx.clone()).build(Arc::new(script), window.clone())
}

pub struct Harness {
    pub session: Session,
    pub port: Arc<RecordingPort>,
    pub interpreter: Arc<ScriptedInterpreter>,
    pub window: Arc<MockWindow>,
}

pub fn make_session() -> Harness {
    make_session_with(EngineConfig::default(), Collaborators::detached())
}

pub fn make_session_with(config: EngineConfig, collaborators: Collaborators) -> Harness {
    let port = Arc::new(RecordingPort::new());
    let interpreter = ScriptedInterpreter::new();
    let window = Arc::new(MockWindow::with_defaults());
    let session = Session::builder(port.clone(), window.clone(), interpreter.clone())
        .config(config)
        .collaborators(collaborators)
        .build();
    Harness {
        session,
        port,
        interpreter,
        window,
    }
}

impl Harness {
    /// Confirms every pending `Inject` and returns the other messages sent.
    pub fn ack_injections(&self) -> Vec<CoreMessage> {
        let mut others = Vec::new();
        loop {
            let sent = self.port.drain();
            if sent.is_empty() {
                return others;
            }
            for message in sent {
                match message {
                    CoreMessage::Inject(inject) => self.session.on_message(HostMessage::Injected(InjectedMessage {
                        notify_id: inject.notify_id,
                    })),
                    other => others.push(other),
                }
            }
        }
    }
}
