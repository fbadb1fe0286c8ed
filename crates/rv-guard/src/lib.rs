//! Capability guard injected ahead of previewed content.
//!
//! The guard is a set of small scripts. The navigation guard is always
//! installed; the network guard only when the session blocks network access.
//! Every override is wrapped so that a missing or non-writable primitive is
//! skipped instead of failing the render.

use core::fmt;
use core::str::FromStr;
use rv_core::PreviewError;

/// Prefix of every diagnostic the guard writes to the console.
pub const WARNING_PREFIX: &str = "[Preview] ";
const WARNING_SUFFIX: &str = " blocked.";

/// Per-session guard toggles. Evaluated once when the session is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardPolicy {
    pub block_network: bool,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            block_network: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    Navigation,
    Network,
}

/// One script to inject, in order, before any page script runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardScript {
    pub kind: GuardKind,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilityGuard {
    policy: GuardPolicy,
}

impl CapabilityGuard {
    pub fn new(policy: GuardPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> GuardPolicy {
        self.policy
    }

    pub fn scripts(&self) -> Vec<GuardScript> {
        let mut scripts = vec![GuardScript {
            kind: GuardKind::Navigation,
            source: navigation_guard_source(),
        }];
        if self.policy.block_network {
            scripts.push(GuardScript {
                kind: GuardKind::Network,
                source: network_guard_source(),
            });
        }
        scripts
    }

    /// Capabilities this policy intercepts.
    pub fn intercepted(&self) -> Vec<BlockedCapability> {
        BlockedCapability::ALL
            .into_iter()
            .filter(|capability| self.policy.block_network || !capability.is_network())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockedCapability {
    Fetch,
    XmlHttpRequest,
    XmlHttpRequestSend,
    SendBeacon,
    WebSocket,
    Navigation,
    FormSubmission,
}

impl BlockedCapability {
    pub const ALL: [Self; 7] = [
        Self::Fetch,
        Self::XmlHttpRequest,
        Self::XmlHttpRequestSend,
        Self::SendBeacon,
        Self::WebSocket,
        Self::Navigation,
        Self::FormSubmission,
    ];

    pub fn api_name(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::XmlHttpRequest => "XMLHttpRequest",
            Self::XmlHttpRequestSend => "XMLHttpRequest.send",
            Self::SendBeacon => "navigator.sendBeacon",
            Self::WebSocket => "WebSocket",
            Self::Navigation => "navigation",
            Self::FormSubmission => "form submission",
        }
    }

    pub fn is_network(self) -> bool {
        !matches!(self, Self::Navigation | Self::FormSubmission)
    }

    /// Console text the guard emits when this capability is intercepted.
    pub fn warning(self) -> String {
        format!("{WARNING_PREFIX}{}{WARNING_SUFFIX}", self.api_name())
    }

    /// Recognizes a guard warning. Any other console text yields `None`.
    pub fn from_warning(text: &str) -> Option<Self> {
        text.trim()
            .strip_prefix(WARNING_PREFIX)?
            .strip_suffix(WARNING_SUFFIX)?
            .parse()
            .ok()
    }
}

impl fmt::Display for BlockedCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

impl FromStr for BlockedCapability {
    type Err = PreviewError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|capability| capability.api_name() == input)
            .ok_or_else(|| {
                PreviewError::new(
                    "guard.unknown_capability",
                    format!("unknown capability `{input}`"),
                )
            })
    }
}

const GUARD_PRELUDE: &str = r#"
  var prefix = "[Preview] ";
  function warn(api) {
    try {
      console.warn(prefix + api + " blocked.");
    } catch (_error) {}
  }
  function guard(install) {
    try {
      install();
    } catch (_error) {}
  }
"#;

fn navigation_guard_source() -> String {
    format!(
        r#"(function () {{{GUARD_PRELUDE}
  guard(function () {{
    document.addEventListener("click", function (event) {{
      var target = event.target;
      var anchor = target && typeof target.closest === "function" ? target.closest("a") : null;
      if (anchor && anchor.href) {{
        event.preventDefault();
        event.stopPropagation();
        warn("navigation");
        return false;
      }}
    }}, true);
  }});
  guard(function () {{
    document.addEventListener("submit", function (event) {{
      event.preventDefault();
      event.stopPropagation();
      warn("form submission");
      return false;
    }}, true);
  }});
}})();
"#
    )
}

fn network_guard_source() -> String {
    format!(
        r#"(function () {{{GUARD_PRELUDE}
  var message = "Network requests are blocked in preview mode.";
  guard(function () {{
    window.fetch = function () {{
      warn("fetch");
      return Promise.reject(new Error(message));
    }};
  }});
  guard(function () {{
    window.Request = function Request() {{}};
    window.Response = function Response() {{}};
  }});
  guard(function () {{
    function BlockedXMLHttpRequest() {{
      warn("XMLHttpRequest");
      this.readyState = 0;
      this.responseText = "";
      this.response = null;
      this.status = 0;
      this.statusText = "";
    }}
    BlockedXMLHttpRequest.prototype.open = function () {{}};
    BlockedXMLHttpRequest.prototype.setRequestHeader = function () {{}};
    BlockedXMLHttpRequest.prototype.abort = function () {{}};
    BlockedXMLHttpRequest.prototype.addEventListener = function () {{}};
    BlockedXMLHttpRequest.prototype.removeEventListener = function () {{}};
    BlockedXMLHttpRequest.prototype.getAllResponseHeaders = function () {{ return ""; }};
    BlockedXMLHttpRequest.prototype.getResponseHeader = function () {{ return null; }};
    BlockedXMLHttpRequest.prototype.send = function () {{
      warn("XMLHttpRequest.send");
      throw new Error(message);
    }};
    window.XMLHttpRequest = BlockedXMLHttpRequest;
  }});
  guard(function () {{
    if (window.navigator && typeof window.navigator.sendBeacon === "function") {{
      window.navigator.sendBeacon = function () {{
        warn("navigator.sendBeacon");
        return false;
      }};
    }}
  }});
  guard(function () {{
    if (window.WebSocket) {{
      window.WebSocket = function WebSocket() {{
        warn("WebSocket");
        throw new Error(message);
      }};
    }}
  }});
}})();
"#
    )
}
