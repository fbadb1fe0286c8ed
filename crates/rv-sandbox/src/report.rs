//! What a scripted context observed while running a page.

use rv_guard::BlockedCapability;
use rv_js::ConsoleLine;
use rv_js::NavigationRequest;
use rv_js::NetworkRequest;
use rv_js::ScriptError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextReport {
    pub scripts_executed: usize,
    pub scripts_failed: usize,
    pub scripts_skipped: usize,
    pub errors: Vec<ScriptError>,
    /// Requests that got past the guard to the (never connected) network layer.
    pub network_requests: Vec<NetworkRequest>,
    /// Capabilities the guard intercepted, in interception order.
    pub blocked: Vec<BlockedCapability>,
    /// Navigations the page requested and the context declined to perform.
    pub navigations: Vec<NavigationRequest>,
    pub console: Vec<ConsoleLine>,
}

impl ContextReport {
    pub fn was_blocked(&self, capability: BlockedCapability) -> bool {
        self.blocked.contains(&capability)
    }
}

/// Result of a host-driven click or submit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionOutcome {
    /// False when the selector matched nothing.
    pub matched: bool,
    pub navigation_requested: bool,
    pub blocked: Vec<BlockedCapability>,
}
