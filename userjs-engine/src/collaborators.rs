//! Services outside the engine that GM capabilities delegate to.
//!
//! Each trait receives requests from scripts and the host events addressed
//! to those requests. `Detached` implementations log and drop everything.

use crate::capabilities::ScriptCallback;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use userjs_types::ScriptId;

/// Named event handlers supplied by a script (`onload`, `onclick`, ...).
#[derive(Clone, Default)]
pub struct Handlers(BTreeMap<String, ScriptCallback>);

impl Handlers {
    /// An empty handler set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the handler for an event name.
    pub fn insert(&mut self, name: impl Into<String>, handler: ScriptCallback) {
        self.0.insert(name.into(), handler);
    }

    /// Handler for an event name.
    pub fn get(&self, name: &str) -> Option<&ScriptCallback> {
        self.0.get(name)
    }

    /// Event names with a handler, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Invokes the named handler, if present.
    pub fn fire(&self, name: &str, payload: Value) -> bool {
        match self.0.get(name) {
            Some(handler) => {
                handler(payload);
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.keys()).finish()
    }
}

impl FromIterator<(String, ScriptCallback)> for Handlers {
    fn from_iter<I: IntoIterator<Item = (String, ScriptCallback)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One `GM_xmlhttpRequest` call.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub id: String,
    pub script_id: ScriptId,
    pub url: String,
    pub method: String,
    /// Remaining request details as given by the script.
    pub details: Value,
    pub handlers: Handlers,
}

#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub id: String,
    pub script_id: ScriptId,
    pub text: String,
    pub title: Option<String>,
    pub image: Option<String>,
    pub handlers: Handlers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabRequest {
    pub id: String,
    /// `None` for tabs the host itself asked for.
    pub script_id: Option<ScriptId>,
    pub url: String,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub id: String,
    pub script_id: ScriptId,
    pub url: String,
    pub name: Option<String>,
    pub handlers: Handlers,
}

pub trait RequestMultiplexer: Send + Sync {
    fn open(&self, request: HttpRequest);
    fn abort(&self, id: &str);
    /// Host bookkeeping for a request (`GotRequestId`).
    fn on_request_id(&self, payload: Value);
    /// Host progress event for a request (`HttpRequested`).
    fn on_requested(&self, payload: Value);
}

pub trait NotificationCenter: Send + Sync {
    fn show(&self, notification: NotificationRequest);
    fn on_clicked(&self, id: &str);
    fn on_closed(&self, id: &str);
}

pub trait TabManager: Send + Sync {
    fn open(&self, tab: TabRequest);
    fn close(&self, id: &str);
    fn on_closed(&self, id: &str);
}

pub trait DownloadManager: Send + Sync {
    fn download(&self, download: DownloadRequest);
}

/// Logs and drops every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl RequestMultiplexer for Detached {
    fn open(&self, request: HttpRequest) {
        debug!(request_id = %request.id, url = %request.url, "No request multiplexer attached");
    }

    fn abort(&self, id: &str) {
        debug!(request_id = id, "No request multiplexer attached");
    }

    fn on_request_id(&self, _payload: Value) {}

    fn on_requested(&self, _payload: Value) {}
}

impl NotificationCenter for Detached {
    fn show(&self, notification: NotificationRequest) {
        debug!(id = %notification.id, "No notification center attached");
    }

    fn on_clicked(&self, _id: &str) {}

    fn on_closed(&self, _id: &str) {}
}

impl TabManager for Detached {
    fn open(&self, tab: TabRequest) {
        debug!(id = %tab.id, url = %tab.url, "No tab manager attached");
    }

    fn close(&self, _id: &str) {}

    fn on_closed(&self, _id: &str) {}
}

impl DownloadManager for Detached {
    fn download(&self, download: DownloadRequest) {
        debug!(id = %download.id, url = %download.url, "No download manager attached");
    }
}

/// The full set of collaborators a session delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub requests: Arc<dyn RequestMultiplexer>,
    pub notifications: Arc<dyn NotificationCenter>,
    pub tabs: Arc<dyn TabManager>,
    pub downloads: Arc<dyn DownloadManager>,
}

impl Collaborators {
    /// Every slot logs and drops what it receives.
    pub fn detached() -> Self {
        Self {
            requests: Arc::new(Detached),
            notifications: Arc::new(Detached),
            tabs: Arc::new(Detached),
            downloads: Arc::new(Detached),
        }
    }

    /// Replaces the request multiplexer.
    pub fn with_requests(mut self, requests: Arc<dyn RequestMultiplexer>) -> Self {
        self.requests = requests;
        self
    }

    /// Replaces the notification center.
    pub fn with_notifications(mut self, notifications: Arc<dyn NotificationCenter>) -> Self {
        self.notifications = notifications;
        self
    }

    /// Replaces the tab manager.
    pub fn with_tabs(mut self, tabs: Arc<dyn TabManager>) -> Self {
        self.tabs = tabs;
        self
    }

    /// Replaces the download manager.
    pub fn with_downloads(mut self, downloads: Arc<dyn DownloadManager>) -> Self {
        self.downloads = downloads;
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::detached()
    }
}

/// Fresh id for a delegated request.
pub(crate) fn fresh_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Recording collaborators for tests.
pub mod mock {
    use super::*;
    use crate::lock;
    use std::sync::Mutex;

    /// Records every request and host event it receives.
    #[derive(Debug, Default)]
    pub struct RecordingCollaborator {
        pub requests: Mutex<Vec<HttpRequest>>,
        pub aborted: Mutex<Vec<String>>,
        pub host_events: Mutex<Vec<Value>>,
        pub notifications: Mutex<Vec<NotificationRequest>>,
        pub notification_events: Mutex<Vec<(String, &'static str)>>,
        pub tabs: Mutex<Vec<TabRequest>>,
        pub closed_tabs: Mutex<Vec<String>>,
        pub tab_events: Mutex<Vec<String>>,
        pub downloads: Mutex<Vec<DownloadRequest>>,
    }

    impl RecordingCollaborator {
        /// An empty recorder.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Collaborators with every slot pointing at `this`.
        pub fn collaborators(this: &Arc<Self>) -> Collaborators {
            Collaborators {
                requests: this.clone(),
                notifications: this.clone(),
                tabs: this.clone(),
                downloads: this.clone(),
            }
        }
    }

    impl RequestMultiplexer for RecordingCollaborator {
        fn open(&self, request: HttpRequest) {
            lock(&self.requests).push(request);
        }

        fn abort(&self, id: &str) {
            lock(&self.aborted).push(id.to_string());
        }

        fn on_request_id(&self, payload: Value) {
            lock(&self.host_events).push(payload);
        }

        fn on_requested(&self, payload: Value) {
            lock(&self.host_events).push(payload);
        }
    }

    impl NotificationCenter for RecordingCollaborator {
        fn show(&self, notification: NotificationRequest) {
            lock(&self.notifications).push(notification);
        }

        fn on_clicked(&self, id: &str) {
            lock(&self.notification_events).push((id.to_string(), "clicked"));
        }

        fn on_closed(&self, id: &str) {
            lock(&self.notification_events).push((id.to_string(), "closed"));
        }
    }

    impl TabManager for RecordingCollaborator {
        fn open(&self, tab: TabRequest) {
            lock(&self.tabs).push(tab);
        }

        fn close(&self, id: &str) {
            lock(&self.closed_tabs).push(id.to_string());
        }

        fn on_closed(&self, id: &str) {
            lock(&self.tab_events).push(id.to_string());
        }
    }

    impl DownloadManager for RecordingCollaborator {
        fn download(&self, download: DownloadRequest) {
            lock(&self.downloads).push(download);
        }
    }
}
