//! JavaScript runtime for the isolated browsing context.
//!
//! A [`JsWorld`] owns one `boa_engine` context. The host loads a parsed
//! document into it, pulls scripts out in tree order, and drives lifecycle
//! events, virtual timers and mutation-observer delivery as discrete tasks.

mod bootstrap;
mod dom_shim;
mod native;

use boa_engine::Context;
use boa_engine::JsValue;
use boa_engine::Source;
use core::fmt;
use rv_core::PreviewError;
use rv_core::PreviewResult;
use rv_dom::NodeSnapshot;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Name of the read-only JS property that carries a node's helper marker.
pub const MARKER_PROPERTY: &str = "__pvMarker";

/// Desktop user agent reported by `navigator.userAgent`.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Upper bound on observer delivery rounds after a single task.
const MAX_DELIVERY_ROUNDS: usize = 16;

/// Runtime hardening knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsRuntimeConfig {
    /// Soft limit: when exceeded, execution continues but a runtime warning is recorded.
    pub max_scripts: usize,
    /// Preferred script-size budget in bytes.
    pub max_script_bytes: usize,
    pub max_error_messages: usize,
    pub max_console_lines: usize,
    /// Timer callbacks run per `run_timers_until` call.
    pub max_timer_runs_per_pump: usize,
    pub recursion_limit: usize,
    pub stack_size_limit: usize,
    pub loop_iteration_limit: u64,
}

impl Default for JsRuntimeConfig {
    fn default() -> Self {
        Self {
            max_scripts: 128,
            max_script_bytes: 2 * 1024 * 1024,
            max_error_messages: 24,
            max_console_lines: 500,
            max_timer_runs_per_pump: 256,
            recursion_limit: 512,
            stack_size_limit: 10 * 1024,
            loop_iteration_limit: 5_000_000,
        }
    }
}

/// Host-side facts exposed to page scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsHostEnvironment {
    pub page_url: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
    pub cookie_header: String,
}

impl Default for JsHostEnvironment {
    fn default() -> Self {
        Self {
            page_url: "about:srcdoc".to_owned(),
            viewport_width: 1280,
            viewport_height: 800,
            user_agent: DESKTOP_USER_AGENT.to_owned(),
            cookie_header: String::new(),
        }
    }
}

/// Per-script execution error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub origin: String,
    pub message: String,
}

/// Runtime outcome summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsExecutionReport {
    pub scripts_seen: usize,
    pub scripts_executed: usize,
    pub scripts_failed: usize,
    pub scripts_skipped: usize,
    pub errors: Vec<ScriptError>,
}

/// A script element that reached execution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PendingScript {
    /// `inline:<n>`, `helper:<n>` or `src:<url>`.
    pub origin: String,
    pub source: String,
    /// External scripts are never fetched.
    pub external: bool,
    #[serde(default)]
    pub helper: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Debug,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConsoleLine {
    pub level: ConsoleLevel,
    pub text: String,
}

/// A request that reached the (mocked) network layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkRequest {
    pub api: String,
    pub method: String,
    pub url: String,
}

/// A navigation the page asked for. The context never performs it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NavigationRequest {
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    DomContentLoaded,
    Load,
}

impl LifecycleEvent {
    fn event_name(self) -> &'static str {
        match self {
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::Load => "load",
        }
    }
}

/// One isolated JS realm with the DOM shim installed.
pub struct JsWorld {
    context: Context,
    config: JsRuntimeConfig,
    report: JsExecutionReport,
}

impl fmt::Debug for JsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsWorld")
            .field("config", &self.config)
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl JsWorld {
    pub fn new(config: JsRuntimeConfig, host: &JsHostEnvironment) -> PreviewResult<Self> {
        let mut context = Context::default();
        context
            .runtime_limits_mut()
            .set_recursion_limit(config.recursion_limit);
        context
            .runtime_limits_mut()
            .set_stack_size_limit(config.stack_size_limit);
        context
            .runtime_limits_mut()
            .set_loop_iteration_limit(config.loop_iteration_limit);
        native::register(&mut context)
            .map_err(|error| PreviewError::new("js.native", error.to_string()))?;

        let mut world = Self {
            context,
            config,
            report: JsExecutionReport::default(),
        };
        world.eval(bootstrap::BOOTSTRAP_ENV, "js.bootstrap")?;
        let limit = format!(
            "globalThis.__pv_console_limit = {};",
            world.config.max_console_lines
        );
        world.eval(&limit, "js.bootstrap")?;
        world.eval(&bootstrap::build_host_bootstrap(host), "js.host_bootstrap")?;
        world.eval(dom_shim::DOM_SHIM, "js.dom_shim")?;
        Ok(world)
    }

    /// Replaces the document with `nodes` (readyState `loading`).
    pub fn load_document(&mut self, nodes: &[NodeSnapshot]) -> PreviewResult<()> {
        let json = serde_json::to_string(nodes)
            .map_err(|error| PreviewError::new("js.snapshot_encode", error.to_string()))?;
        self.eval(&format!("__pv_load({json});"), "js.load")?;
        Ok(())
    }

    /// Next connected script that has not started, marking it as current.
    pub fn next_script(&mut self) -> PreviewResult<Option<PendingScript>> {
        let json = self.eval_string("__pv_next_script()", "js.next_script")?;
        serde_json::from_str(&json)
            .map_err(|error| PreviewError::new("js.next_script", error.to_string()))
    }

    /// Executes one script as a task. Returns whether it ran to completion.
    pub fn run_script(&mut self, script: &PendingScript) -> PreviewResult<bool> {
        self.report.scripts_seen = self.report.scripts_seen.saturating_add(1);
        let completed = self.execute(script);
        self.eval("__pv_finish_script();", "js.finish_script")?;
        self.after_task()?;
        Ok(completed)
    }

    /// Runs pending scripts until none are left. Scripts inserted while
    /// running (by `document.write` or DOM APIs) are picked up as well.
    pub fn run_scripts(&mut self) -> PreviewResult<usize> {
        let mut count = 0usize;
        while let Some(script) = self.next_script()? {
            self.run_script(&script)?;
            count = count.saturating_add(1);
        }
        Ok(count)
    }

    pub fn dispatch_lifecycle(&mut self, event: LifecycleEvent) -> PreviewResult<()> {
        let code = format!(
            "__pv_dispatch_lifecycle({});",
            bootstrap::js_string_literal(event.event_name())
        );
        self.eval(&code, "js.lifecycle")?;
        self.after_task()?;
        self.run_scripts()?;
        Ok(())
    }

    /// Due time (virtual ms) of the earliest pending timer.
    pub fn next_timer_due(&mut self) -> PreviewResult<Option<u64>> {
        let due = self.eval_number("__pv_next_timer_due()", "js.timers")?;
        Ok((due >= 0.0).then_some(due as u64))
    }

    /// Runs timers due at or before `now_ms`, one task at a time, then moves
    /// the virtual clock to `now_ms`.
    pub fn run_timers_until(&mut self, now_ms: u64) -> PreviewResult<usize> {
        let mut runs = 0usize;
        while runs < self.config.max_timer_runs_per_pump {
            let ran = self.eval_number(&format!("__pv_run_due_timers({now_ms}, 1)"), "js.timers")?;
            if ran < 1.0 {
                break;
            }
            runs = runs.saturating_add(1);
            self.after_task()?;
            self.run_scripts()?;
        }
        self.eval(&format!("__pv_advance_clock({now_ms});"), "js.timers")?;
        Ok(runs)
    }

    /// Counter bumped on every DOM mutation.
    pub fn dom_version(&mut self) -> PreviewResult<u64> {
        let version = self.eval_number("__pv_dom_version()", "js.dom_version")?;
        Ok(version.max(0.0) as u64)
    }

    pub fn export_document(&mut self) -> PreviewResult<Vec<NodeSnapshot>> {
        let json = self.eval_string("__pv_export()", "js.export")?;
        serde_json::from_str(&json)
            .map_err(|error| PreviewError::new("js.export_decode", error.to_string()))
    }

    /// Empties the JS array `globalThis[name]` and decodes its entries.
    pub fn drain_global<T: DeserializeOwned>(&mut self, name: &str) -> PreviewResult<Vec<T>> {
        let code = format!("__pv_drain({})", bootstrap::js_string_literal(name));
        let json = self.eval_string(&code, "js.drain")?;
        serde_json::from_str(&json).map_err(|error| PreviewError::new("js.drain", error.to_string()))
    }

    pub fn take_console(&mut self) -> PreviewResult<Vec<ConsoleLine>> {
        self.drain_global("__pv_console")
    }

    pub fn take_network_requests(&mut self) -> PreviewResult<Vec<NetworkRequest>> {
        self.drain_global("__pv_network_log")
    }

    pub fn take_navigations(&mut self) -> PreviewResult<Vec<NavigationRequest>> {
        self.drain_global("__pv_navigations")
    }

    /// Clicks the first element matching `selector`. False when nothing matched.
    pub fn click(&mut self, selector: &str) -> PreviewResult<bool> {
        let code = format!("__pv_click({})", bootstrap::js_string_literal(selector));
        self.interaction(&code)
    }

    /// Submits the form containing the first element matching `selector`.
    pub fn submit(&mut self, selector: &str) -> PreviewResult<bool> {
        let code = format!("__pv_submit({})", bootstrap::js_string_literal(selector));
        self.interaction(&code)
    }

    /// Evaluates `source` as a task and returns its completion value as a string.
    pub fn eval_to_string(&mut self, source: &str) -> PreviewResult<String> {
        let value = self.eval_string(source, "js.eval")?;
        self.after_task()?;
        Ok(value)
    }

    pub fn report(&self) -> &JsExecutionReport {
        &self.report
    }

    fn interaction(&mut self, code: &str) -> PreviewResult<bool> {
        let value = self.eval(code, "js.interaction")?;
        let matched = value.to_boolean();
        self.after_task()?;
        self.run_scripts()?;
        Ok(matched)
    }

    fn execute(&mut self, script: &PendingScript) -> bool {
        if script.external {
            self.report.scripts_skipped = self.report.scripts_skipped.saturating_add(1);
            return false;
        }

        if self.report.scripts_seen > hard_script_count_cap(self.config.max_scripts) {
            self.report.scripts_skipped = self.report.scripts_skipped.saturating_add(1);
            return false;
        }
        if self.report.scripts_seen == self.config.max_scripts.saturating_add(1) {
            self.push_error(
                "runtime",
                format!(
                    "script count exceeded soft limit {}; continuing",
                    self.config.max_scripts
                ),
            );
        }

        let source_len = script.source.len();
        if source_len > hard_script_byte_cap(self.config.max_script_bytes) {
            self.report.scripts_skipped = self.report.scripts_skipped.saturating_add(1);
            return false;
        }

        match self
            .context
            .eval(Source::from_bytes(script.source.as_bytes()))
        {
            Ok(_) => {
                self.report.scripts_executed = self.report.scripts_executed.saturating_add(1);
                true
            }
            Err(error) => {
                self.report.scripts_failed = self.report.scripts_failed.saturating_add(1);
                let message = if source_len > self.config.max_script_bytes {
                    format!(
                        "oversized script ({} bytes, preferred <= {}) failed: {error}",
                        source_len, self.config.max_script_bytes
                    )
                } else {
                    error.to_string()
                };
                let report = format!(
                    "__pv_console_push(\"error\", {});",
                    bootstrap::js_string_literal(&format!("Uncaught {error}"))
                );
                let _ = self.context.eval(Source::from_bytes(report.as_bytes()));
                self.push_error(&script.origin, message);
                false
            }
        }
    }

    fn push_error(&mut self, origin: &str, message: String) {
        if self.report.errors.len() < self.config.max_error_messages {
            self.report.errors.push(ScriptError {
                origin: origin.to_owned(),
                message,
            });
        }
    }

    /// Microtask checkpoint followed by mutation-observer delivery.
    fn after_task(&mut self) -> PreviewResult<()> {
        self.context.run_jobs();
        for _ in 0..MAX_DELIVERY_ROUNDS {
            let delivered = self.eval_number("__pv_deliver_mutations()", "js.mutations")?;
            self.context.run_jobs();
            if delivered < 1.0 {
                break;
            }
        }
        Ok(())
    }

    fn eval(&mut self, code: &str, error_code: &'static str) -> PreviewResult<JsValue> {
        self.context
            .eval(Source::from_bytes(code.as_bytes()))
            .map_err(|error| PreviewError::new(error_code, error.to_string()))
    }

    fn eval_string(&mut self, code: &str, error_code: &'static str) -> PreviewResult<String> {
        let value = self.eval(code, error_code)?;
        value
            .to_string(&mut self.context)
            .map(|text| text.to_std_string_escaped())
            .map_err(|error| PreviewError::new(error_code, error.to_string()))
    }

    fn eval_number(&mut self, code: &str, error_code: &'static str) -> PreviewResult<f64> {
        let value = self.eval(code, error_code)?;
        value
            .to_number(&mut self.context)
            .map_err(|error| PreviewError::new(error_code, error.to_string()))
    }
}

fn hard_script_byte_cap(preferred: usize) -> usize {
    let scaled = preferred.saturating_mul(4);
    let bounded = scaled.min(16 * 1024 * 1024);
    bounded.max(preferred)
}

/// Past this many scripts nothing else executes, which also ends runaway
/// `document.write` chains.
fn hard_script_count_cap(soft: usize) -> usize {
    soft.saturating_mul(4).max(soft)
}
