//! Transcript replay for the userscript engine.
//!
//! A transcript is a text file with one framed host message per line.
//! Blank lines and lines starting with `#` are skipped. The replay session
//! runs against an in-memory window; injections are acknowledged
//! automatically unless disabled, so script bodies run through a tracing
//! interpreter that only logs what it would execute.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use userjs_bridge::mock::RecordingPort;
use userjs_bridge::{decode_host, CoreMessage, HostMessage, InjectedMessage};
use userjs_engine::window::mock::MockWindow;
use userjs_engine::{EngineConfig, PageInterpreter, PreparedScript, ReadyState, ScriptError, ScriptFailure, Session};

/// Logs each script it is asked to run.
#[derive(Debug, Default)]
pub struct TraceInterpreter;

impl PageInterpreter for TraceInterpreter {
    fn invoke(&self, script: &PreparedScript) -> Result<(), ScriptError> {
        info!(
            script = %script.script_name(),
            notify_id = %script.unit.notify_id,
            params = ?script.unit.arg_names,
            bytes = script.unit.code.len(),
            "Running script"
        );
        Ok(())
    }
}

/// Parses a transcript, skipping blank lines, comments and unknown commands.
pub fn parse_transcript(text: &str) -> Result<Vec<HostMessage>> {
    let mut messages = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match decode_host(line).with_context(|| format!("line {}", index + 1))? {
            Some(message) => messages.push(message),
            None => warn!(line = index + 1, "Skipping unknown command"),
        }
    }
    Ok(messages)
}

/// Reads and parses a transcript file.
pub async fn read_transcript(path: impl AsRef<Path>) -> Result<Vec<HostMessage>> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading transcript {}", path.display()))?;
    parse_transcript(&text).with_context(|| format!("parsing transcript {}", path.display()))
}

/// An in-memory session fed from a transcript.
pub struct Replay {
    session: Session,
    port: Arc<RecordingPort>,
    auto_ack: bool,
}

impl Replay {
    /// A replay session; `auto_ack` answers every `Inject` with `Injected`.
    pub fn new(config: EngineConfig, auto_ack: bool) -> Self {
        let port = Arc::new(RecordingPort::new());
        let session = Session::builder(
            port.clone(),
            Arc::new(MockWindow::with_defaults()),
            Arc::new(TraceInterpreter),
        )
        .config(config)
        .build();
        Self {
            session,
            port,
            auto_ack,
        }
    }

    /// The session being driven.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Starts the session and returns what it sent.
    pub fn start(&self) -> Vec<CoreMessage> {
        self.session.start();
        self.pump()
    }

    /// Dispatches one host message and returns what the session sent.
    pub fn feed(&self, message: HostMessage) -> Vec<CoreMessage> {
        self.session.on_message(message);
        self.pump()
    }

    /// Marks the document loaded and runs the deferred phases.
    pub async fn finish(&self) -> Vec<CoreMessage> {
        let (_ready, rx) = watch::channel(ReadyState::Complete);
        self.session.run_deferred(rx).await;
        self.pump()
    }

    /// Script failures recorded by the session.
    pub fn failures(&self) -> Vec<ScriptFailure> {
        self.session.failures()
    }

    /// Drains the port, acknowledging injections if enabled.
    fn pump(&self) -> Vec<CoreMessage> {
        let mut out = Vec::new();
        loop {
            let sent = self.port.drain();
            if sent.is_empty() {
                return out;
            }
            for message in sent {
                if let (true, CoreMessage::Inject(inject)) = (self.auto_ack, &message) {
                    self.session.on_message(HostMessage::Injected(InjectedMessage {
                        notify_id: inject.notify_id.clone(),
                    }));
                }
                out.push(message);
            }
        }
    }
}
