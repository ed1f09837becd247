//! Capability names and per-script grant sets.

use std::fmt;

/// A GM API binding a script may be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    UnsafeWindow,
    Info,
    GetValue,
    SetValue,
    DeleteValue,
    ListValues,
    GetResourceText,
    GetResourceUrl,
    AddStyle,
    Log,
    OpenInTab,
    RegisterMenuCommand,
    UnregisterMenuCommand,
    XmlHttpRequest,
    Download,
    Notification,
    SetClipboard,
    WindowClose,
}

impl Capability {
    /// Present in every sandbox, ahead of declared grants.
    pub const IMPLICIT: [Capability; 2] = [Capability::UnsafeWindow, Capability::Info];

    pub const ALL: [Capability; 18] = [
        Capability::UnsafeWindow,
        Capability::Info,
        Capability::GetValue,
        Capability::SetValue,
        Capability::DeleteValue,
        Capability::ListValues,
        Capability::GetResourceText,
        Capability::GetResourceUrl,
        Capability::AddStyle,
        Capability::Log,
        Capability::OpenInTab,
        Capability::RegisterMenuCommand,
        Capability::UnregisterMenuCommand,
        Capability::XmlHttpRequest,
        Capability::Download,
        Capability::Notification,
        Capability::SetClipboard,
        Capability::WindowClose,
    ];

    /// Grant name as written in a script header.
    pub fn name(self) -> &'static str {
        match self {
            Self::UnsafeWindow => "unsafeWindow",
            Self::Info => "GM_info",
            Self::GetValue => "GM_getValue",
            Self::SetValue => "GM_setValue",
            Self::DeleteValue => "GM_deleteValue",
            Self::ListValues => "GM_listValues",
            Self::GetResourceText => "GM_getResourceText",
            Self::GetResourceUrl => "GM_getResourceURL",
            Self::AddStyle => "GM_addStyle",
            Self::Log => "GM_log",
            Self::OpenInTab => "GM_openInTab",
            Self::RegisterMenuCommand => "GM_registerMenuCommand",
            Self::UnregisterMenuCommand => "GM_unregisterMenuCommand",
            Self::XmlHttpRequest => "GM_xmlhttpRequest",
            Self::Download => "GM_download",
            Self::Notification => "GM_notification",
            Self::SetClipboard => "GM_setClipboard",
            Self::WindowClose => "window.close",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cap| cap.name() == name)
    }

    /// Name of the GM object binding, if the capability has one.
    ///
    /// `window.close` is installed on the protected view instead.
    pub fn binding_name(self) -> Option<&'static str> {
        match self {
            Self::WindowClose => None,
            other => Some(other.name()),
        }
    }

    /// Whether the binding is a function rather than a value.
    pub fn is_function(self) -> bool {
        !matches!(self, Self::UnsafeWindow | Self::Info)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Effective capabilities of one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantSet {
    unwrapped: bool,
    /// Implicit capabilities first, then declared ones in declaration order.
    capabilities: Vec<Capability>,
}

impl GrantSet {
    /// Derives the grant set from a script's declared grants.
    ///
    /// No grants, or only `none`, means the script runs unwrapped against
    /// the real global object. Unknown names are ignored.
    pub fn from_grants<S: AsRef<str>>(grants: &[S]) -> Self {
        let declared: Vec<&str> = grants
            .iter()
            .map(|g| g.as_ref().trim())
            .filter(|g| !g.is_empty())
            .collect();
        let unwrapped = declared.iter().all(|g| *g == "none");

        let mut capabilities = Capability::IMPLICIT.to_vec();
        if !unwrapped {
            for cap in declared.iter().filter_map(|g| Capability::from_name(g)) {
                if !capabilities.contains(&cap) {
                    capabilities.push(cap);
                }
            }
        }
        Self {
            unwrapped,
            capabilities,
        }
    }

    pub fn is_unwrapped(&self) -> bool {
        self.unwrapped
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.capabilities.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}
