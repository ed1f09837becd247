//! Phase scheduling.
//!
//! Scripts are bucketed by execution phase at load time. The start phase
//! runs as soon as scripts arrive; end runs once the document has been
//! parsed; idle runs on a later turn of the event loop.

use std::collections::VecDeque;
use tokio::sync::watch;
use tracing::{info, warn};
use userjs_types::{ExecutionPhase, ScriptDescriptor};

/// Document loading state as reported by the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadyState {
    #[default]
    Loading,
    Interactive,
    Complete,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    start: VecDeque<ScriptDescriptor>,
    end: VecDeque<ScriptDescriptor>,
    idle: VecDeque<ScriptDescriptor>,
}

impl Scheduler {
    /// Buckets scripts by phase, keeping their relative order.
    pub fn plan(scripts: impl IntoIterator<Item = ScriptDescriptor>) -> Self {
        let mut plan = Self::default();
        for script in scripts {
            plan.queue_mut(script.phase()).push_back(script);
        }
        plan
    }

    /// Appends another plan's queues behind this one's.
    pub fn merge(&mut self, other: Scheduler) {
        self.start.extend(other.start);
        self.end.extend(other.end);
        self.idle.extend(other.idle);
    }

    fn queue_mut(&mut self, phase: ExecutionPhase) -> &mut VecDeque<ScriptDescriptor> {
        match phase {
            ExecutionPhase::Start => &mut self.start,
            ExecutionPhase::End => &mut self.end,
            ExecutionPhase::Idle => &mut self.idle,
        }
    }

    pub fn len(&self, phase: ExecutionPhase) -> usize {
        match phase {
            ExecutionPhase::Start => self.start.len(),
            ExecutionPhase::End => self.end.len(),
            ExecutionPhase::Idle => self.idle.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.end.is_empty() && self.idle.is_empty()
    }

    /// Runs every queued script of a phase in order, consuming the queue.
    pub fn drain<F>(&mut self, phase: ExecutionPhase, mut exec: F) -> usize
    where
        F: FnMut(ScriptDescriptor),
    {
        let mut ran = 0;
        while let Some(script) = self.queue_mut(phase).pop_front() {
            exec(script);
            ran += 1;
        }
        if ran > 0 {
            info!(phase = %phase, scripts = ran, "Phase drained");
        }
        ran
    }

    /// Waits for the document to leave `Loading`, then runs end, yields once,
    /// and runs idle.
    ///
    /// If the ready-state sender goes away first, the phases run anyway.
    pub async fn run_deferred<F>(mut self, mut ready: watch::Receiver<ReadyState>, mut exec: F)
    where
        F: FnMut(ScriptDescriptor),
    {
        let loaded = ready.wait_for(|state| *state != ReadyState::Loading).await.is_ok();
        if !loaded {
            warn!("Ready-state channel closed while loading, running deferred phases");
        }
        self.drain(ExecutionPhase::End, &mut exec);
        tokio::task::yield_now().await;
        self.drain(ExecutionPhase::Idle, &mut exec);
    }
}
