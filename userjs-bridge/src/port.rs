//! Outbound half of the bridge.

use crate::protocol::CoreMessage;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Ordered, fire-and-forget delivery to the host.
///
/// `send` never blocks and never reports delivery; anything that needs an
/// answer registers a continuation in the callback registry first.
pub trait HostPort: Send + Sync {
    fn send(&self, message: CoreMessage);
}

/// A port backed by an unbounded tokio channel drained by the host glue.
#[derive(Debug, Clone)]
pub struct ChannelPort {
    tx: mpsc::UnboundedSender<CoreMessage>,
}

impl ChannelPort {
    /// Wraps an existing sender.
    pub fn new(tx: mpsc::UnboundedSender<CoreMessage>) -> Self {
        Self { tx }
    }

    /// Creates a port together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CoreMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl HostPort for ChannelPort {
    fn send(&self, message: CoreMessage) {
        let cmd = message.command();
        if self.tx.send(message).is_err() {
            warn!(cmd, "Host channel closed, dropping message");
        } else {
            debug!(cmd, "Sent message to host");
        }
    }
}

/// A recording port for testing.
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Mutex, PoisonError};

    /// Keeps every sent message in order.
    #[derive(Debug, Default)]
    pub struct RecordingPort {
        sent: Mutex<VecDeque<CoreMessage>>,
    }

    impl RecordingPort {
        pub fn new() -> Self {
            Self::default()
        }

        /// Removes and returns the oldest sent message.
        pub fn take(&self) -> Option<CoreMessage> {
            self.queue().pop_front()
        }

        /// Removes and returns everything sent so far.
        pub fn drain(&self) -> Vec<CoreMessage> {
            self.queue().drain(..).collect()
        }

        /// Returns a copy of everything sent so far.
        pub fn sent(&self) -> Vec<CoreMessage> {
            self.queue().iter().cloned().collect()
        }

        pub fn len(&self) -> usize {
            self.queue().len()
        }

        pub fn is_empty(&self) -> bool {
            self.queue().is_empty()
        }

        fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<CoreMessage>> {
            self.sent.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl HostPort for RecordingPort {
        fn send(&self, message: CoreMessage) {
            self.queue().push_back(message);
        }
    }
}
