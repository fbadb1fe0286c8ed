//! Scripted browsing context: runs an augmented document inside an isolated
//! JS world and reports back to the render controller.

mod report;

use rv_core::PreviewResult;
use rv_dom::Document;
use rv_guard::BlockedCapability;
use rv_js::ConsoleLevel;
use rv_js::JsHostEnvironment;
use rv_js::JsRuntimeConfig;
use rv_js::JsWorld;
use rv_js::LifecycleEvent;
use rv_preview::AugmentedDocument;
use rv_preview::BrowsingContext;
use rv_preview::ContextAccess;
use rv_preview::ContextFactory;
use rv_preview::ContextSignal;
use rv_preview::FrameGeometry;
use rv_preview::RECORDER_BUFFER_GLOBAL;
use rv_preview::RecordedScript;
use rv_preview::SignalSink;
use std::time::Duration;
use tracing::debug;
use tracing::warn;

pub use report::ContextReport;
pub use report::InteractionOutcome;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedContextConfig {
    pub runtime: JsRuntimeConfig,
    /// Defaults for every context. The viewport is overridden by fixed frames.
    pub host: JsHostEnvironment,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedContextFactory {
    config: ScriptedContextConfig,
}

impl ScriptedContextFactory {
    pub fn new(config: ScriptedContextConfig) -> Self {
        Self { config }
    }
}

impl ContextFactory for ScriptedContextFactory {
    type Context = ScriptedContext;

    fn create(&mut self, sink: SignalSink) -> ScriptedContext {
        ScriptedContext::new(self.config.clone(), sink)
    }
}

/// One fresh JS realm per render session. Never reused.
#[derive(Debug)]
pub struct ScriptedContext {
    config: ScriptedContextConfig,
    sink: SignalSink,
    world: Option<JsWorld>,
    failure: Option<String>,
    virtual_ms: u64,
    loaded: bool,
    dom_version: u64,
    errors_reported: usize,
    removed: Vec<RecordedScript>,
    diagnostics: Vec<String>,
    report: ContextReport,
}

impl ScriptedContext {
    pub fn new(config: ScriptedContextConfig, sink: SignalSink) -> Self {
        Self {
            config,
            sink,
            world: None,
            failure: None,
            virtual_ms: 0,
            loaded: false,
            dom_version: 0,
            errors_reported: 0,
            removed: Vec::new(),
            diagnostics: Vec::new(),
            report: ContextReport::default(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Everything observed so far, script counters included.
    pub fn report(&self) -> ContextReport {
        let mut report = self.report.clone();
        if let Some(world) = &self.world {
            let runtime = world.report();
            report.scripts_executed = runtime.scripts_executed;
            report.scripts_failed = runtime.scripts_failed;
            report.scripts_skipped = runtime.scripts_skipped;
            report.errors = runtime.errors.clone();
        }
        report
    }

    /// Clicks the first element matching `selector`, as a user would.
    pub fn click(&mut self, selector: &str) -> InteractionOutcome {
        self.interact(|world| world.click(selector))
    }

    /// Submits the form around the first element matching `selector`.
    pub fn submit(&mut self, selector: &str) -> InteractionOutcome {
        self.interact(|world| world.submit(selector))
    }

    /// Evaluates `source` in the page realm and returns the completion value.
    pub fn evaluate(&mut self, source: &str) -> PreviewResult<String> {
        let value = match self.world.as_mut() {
            Some(world) => world.eval_to_string(source)?,
            None => return Ok(String::new()),
        };
        self.collect();
        self.check_activity();
        Ok(value)
    }

    fn interact(
        &mut self,
        action: impl FnOnce(&mut JsWorld) -> PreviewResult<bool>,
    ) -> InteractionOutcome {
        let navigations = self.report.navigations.len();
        let blocked = self.report.blocked.len();
        let matched = match self.world.as_mut().map(action) {
            Some(Ok(matched)) => matched,
            Some(Err(error)) => {
                self.diagnostics.push(error.to_string());
                false
            }
            None => false,
        };
        self.collect();
        self.check_activity();
        InteractionOutcome {
            matched,
            navigation_requested: self.report.navigations.len() > navigations,
            blocked: self.report.blocked[blocked..].to_vec(),
        }
    }

    fn host_environment(&self, document: &AugmentedDocument) -> JsHostEnvironment {
        let mut host = self.config.host.clone();
        if let FrameGeometry::Fixed { width, height, .. } = document.view().frame() {
            host.viewport_width = width;
            host.viewport_height = height;
        }
        host
    }

    fn boot(&mut self, document: &AugmentedDocument) -> PreviewResult<()> {
        let host = self.host_environment(document);
        let world = self
            .world
            .insert(JsWorld::new(self.config.runtime.clone(), &host)?);
        world.load_document(&document.snapshot())?;
        world.run_scripts()?;
        world.dispatch_lifecycle(LifecycleEvent::DomContentLoaded)?;
        world.dispatch_lifecycle(LifecycleEvent::Load)?;
        self.dom_version = world.dom_version()?;
        Ok(())
    }

    /// Drains everything the realm buffered since the last call.
    fn collect(&mut self) {
        let Some(world) = self.world.as_mut() else {
            return;
        };

        match world.drain_global::<RecordedScript>(RECORDER_BUFFER_GLOBAL) {
            Ok(scripts) => self.removed.extend(scripts),
            Err(error) => self.diagnostics.push(error.to_string()),
        }

        match world.take_console() {
            Ok(lines) => {
                for line in lines {
                    if line.level == ConsoleLevel::Warn {
                        if let Some(capability) = BlockedCapability::from_warning(&line.text) {
                            warn!(%capability, "preview blocked a capability");
                            self.report.blocked.push(capability);
                        }
                    }
                    self.report.console.push(line);
                }
            }
            Err(error) => self.diagnostics.push(error.to_string()),
        }

        match world.take_network_requests() {
            Ok(requests) => {
                for request in &requests {
                    debug!(api = %request.api, url = %request.url, "request reached the network layer");
                }
                self.report.network_requests.extend(requests);
            }
            Err(error) => self.diagnostics.push(error.to_string()),
        }

        match world.take_navigations() {
            Ok(navigations) => self.report.navigations.extend(navigations),
            Err(error) => self.diagnostics.push(error.to_string()),
        }

        let errors = &world.report().errors;
        for error in errors.iter().skip(self.errors_reported) {
            self.diagnostics
                .push(format!("{}: {}", error.origin, error.message));
        }
        self.errors_reported = errors.len();
    }

    fn check_activity(&mut self) {
        let Some(world) = self.world.as_mut() else {
            return;
        };
        match world.dom_version() {
            Ok(version) if version != self.dom_version => {
                self.dom_version = version;
                if self.loaded {
                    self.sink.emit(ContextSignal::DomActivity);
                }
            }
            Ok(_) => {}
            Err(error) => self.diagnostics.push(error.to_string()),
        }
    }
}

impl BrowsingContext for ScriptedContext {
    fn load(&mut self, document: &AugmentedDocument) {
        if let Err(error) = self.boot(document) {
            warn!(%error, "scripted context failed to load");
            self.diagnostics.push(error.to_string());
            if self.world.is_none() {
                self.failure = Some(error.to_string());
            }
        }
        self.collect();
        if self.world.is_some() {
            self.loaded = true;
            self.sink.emit(ContextSignal::Loaded);
        }
    }

    fn pump(&mut self, elapsed: Duration) {
        let step = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.virtual_ms = self.virtual_ms.saturating_add(step);
        let now = self.virtual_ms;
        let Some(world) = self.world.as_mut() else {
            return;
        };
        if let Err(error) = world.run_timers_until(now) {
            self.diagnostics.push(error.to_string());
        }
        self.collect();
        self.check_activity();
    }

    fn read_document(&mut self) -> ContextAccess<Document> {
        if let Some(reason) = &self.failure {
            return ContextAccess::inaccessible(reason.clone());
        }
        let Some(world) = self.world.as_mut() else {
            return ContextAccess::inaccessible("no document loaded");
        };
        match world.export_document() {
            Ok(nodes) => ContextAccess::Available(Document::from_snapshot(&nodes)),
            Err(error) => ContextAccess::inaccessible(error.to_string()),
        }
    }

    fn take_removed_scripts(&mut self) -> Vec<RecordedScript> {
        self.collect();
        std::mem::take(&mut self.removed)
    }

    fn take_diagnostics(&mut self) -> Vec<String> {
        std::mem::take(&mut self.diagnostics)
    }
}
