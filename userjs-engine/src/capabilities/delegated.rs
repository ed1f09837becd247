//! GM functions handed off to the host or to collaborators.

use super::{field_str, Args, GmReturn};
use crate::collaborators::{
    fresh_id, DownloadRequest, HttpRequest, NotificationRequest, RequestMultiplexer, TabManager, TabRequest,
};
use crate::error::CapabilityError;
use crate::sandbox::Sandbox;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::info;
use userjs_bridge::{ClipboardMessage, CoreMessage};

/// A tab opened by `GM_openInTab`.
#[derive(Clone)]
pub struct TabHandle {
    id: String,
    tabs: Arc<dyn TabManager>,
}

impl TabHandle {
    /// Tab id allocated for the request.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Asks the tab manager to close the tab.
    pub fn close(&self) {
        self.tabs.close(&self.id);
    }
}

impl fmt::Debug for TabHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabHandle").field("id", &self.id).finish()
    }
}

/// An in-flight `GM_xmlhttpRequest`.
#[derive(Clone)]
pub struct RequestHandle {
    id: String,
    requests: Arc<dyn RequestMultiplexer>,
}

impl RequestHandle {
    /// Request id allocated for the call.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Cancels the request through the multiplexer.
    pub fn abort(&self) {
        self.requests.abort(&self.id);
    }
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle").field("id", &self.id).finish()
    }
}

pub(super) fn log(sandbox: &Sandbox, args: &Args) -> Result<GmReturn, CapabilityError> {
    let script = sandbox.script();
    info!(
        target: "userjs::script",
        script_id = %script.id,
        script = %script.display_name(),
        "{}",
        args.render()
    );
    Ok(GmReturn::Undefined)
}

/// `GM_openInTab(url, background)` or `GM_openInTab(url, {active})`.
pub(super) fn open_in_tab(sandbox: &Sandbox, args: &Args) -> Result<GmReturn, CapabilityError> {
    let url = args.string(0, "url")?;
    let active = match args.value(1) {
        Some(Value::Bool(background)) => !background,
        Some(options @ Value::Object(_)) => options.get("active").and_then(Value::as_bool).unwrap_or(true),
        _ => true,
    };
    let tabs = sandbox.ctx().collaborators().tabs.clone();
    let id = fresh_id();
    tabs.open(TabRequest {
        id: id.clone(),
        script_id: Some(sandbox.script().id),
        url,
        active,
    });
    Ok(GmReturn::Tab(TabHandle { id, tabs }))
}

/// `GM_notification(text, title, image, onclick)` or `GM_notification({text, ...})`.
pub(super) fn notification(sandbox: &Sandbox, args: &Args) -> Result<GmReturn, CapabilityError> {
    let (text, title, image, mut handlers) = match args.value(0) {
        Some(fields @ Value::Object(_)) => (
            field_str(fields, "text"),
            field_str(fields, "title"),
            field_str(fields, "image"),
            args.handlers(0),
        ),
        _ => (args.opt_string(0), args.opt_string(1), args.opt_string(2), args.handlers(0)),
    };
    if let Some(onclick) = args.callback(3) {
        handlers.insert("onclick", onclick);
    }
    let text = text
        .filter(|t| !t.is_empty())
        .ok_or_else(|| CapabilityError::invalid(args.capability(), "notification text is required"))?;

    sandbox.ctx().collaborators().notifications.show(NotificationRequest {
        id: fresh_id(),
        script_id: sandbox.script().id,
        text,
        title,
        image,
        handlers,
    });
    Ok(GmReturn::Undefined)
}

pub(super) fn set_clipboard(sandbox: &Sandbox, args: &Args) -> Result<GmReturn, CapabilityError> {
    let data = args.string(0, "data")?;
    let content_type = args.opt_string(1).unwrap_or_else(|| "text/plain".to_string());
    sandbox
        .ctx()
        .port()
        .send(CoreMessage::SetClipboard(ClipboardMessage { data, content_type }));
    Ok(GmReturn::Undefined)
}

/// `GM_download(url, name)` or `GM_download({url, name, onload, ...})`.
pub(super) fn download(sandbox: &Sandbox, args: &Args) -> Result<GmReturn, CapabilityError> {
    let (url, name, handlers) = match args.value(0) {
        Some(fields @ Value::Object(_)) => (field_str(fields, "url"), field_str(fields, "name"), args.handlers(0)),
        _ => (args.opt_string(0), args.opt_string(1), args.handlers(0)),
    };
    let url = url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| CapabilityError::invalid(args.capability(), "url is required"))?;

    sandbox.ctx().collaborators().downloads.download(DownloadRequest {
        id: fresh_id(),
        script_id: sandbox.script().id,
        url,
        name,
        handlers,
    });
    Ok(GmReturn::Undefined)
}

pub(super) fn xmlhttp_request(sandbox: &Sandbox, args: &Args) -> Result<GmReturn, CapabilityError> {
    let details = args.value(0).cloned().unwrap_or(Value::Null);
    let url = field_str(&details, "url")
        .filter(|u| !u.is_empty())
        .ok_or_else(|| CapabilityError::invalid(args.capability(), "url is required"))?;
    let method = field_str(&details, "method")
        .map(|m| m.to_ascii_uppercase())
        .unwrap_or_else(|| "GET".to_string());

    let requests = sandbox.ctx().collaborators().requests.clone();
    let id = fresh_id();
    requests.open(HttpRequest {
        id: id.clone(),
        script_id: sandbox.script().id,
        url,
        method,
        details,
        handlers: args.handlers(0),
    });
    Ok(GmReturn::Request(RequestHandle { id, requests }))
}
