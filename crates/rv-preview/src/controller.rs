//! Render controller: one live session per preview surface.
//!
//! The controller is single-threaded and cooperative. The host calls
//! [`RenderController::tick`] from its event loop; every timer lives inside
//! the current session, so replacing or tearing down a session cancels them.

use crate::clock::Clock;
use crate::context::BrowsingContext;
use crate::context::ContextFactory;
use crate::context::ContextSignal;
use crate::context::SessionId;
use crate::context::SignalInbox;
use crate::document::AugmentedDocument;
use crate::marker::HelperMarker;
use crate::recorder::MutationRecorder;
use crate::recorder::ReintegrationPolicy;
use crate::serializer::Serializer;
use crate::view::ViewConfiguration;
use std::time::Duration;
use tracing::debug;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleTimings {
    /// Completion is assumed after this long without a load signal.
    pub fallback: Duration,
    /// Quiet period between completion and notifying the host.
    pub debounce: Duration,
    /// Upper bound on debounce extensions, counted from completion. Pages
    /// that mutate the DOM forever are delivered once this runs out.
    pub max_wait: Duration,
}

impl Default for SettleTimings {
    fn default() -> Self {
        Self {
            fallback: Duration::from_millis(500),
            debounce: Duration::from_millis(2000),
            max_wait: Duration::from_millis(8000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Idle,
    Building,
    /// Waiting for load or the fallback timeout.
    Rendering,
    /// Completion seen; the debounce window is open.
    Settled,
    /// The host has been handed the serialized output.
    Delivered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Started(SessionId),
    /// Only the container size changed; the session keeps running.
    Resized,
    Unchanged,
    /// Empty source: the surface was cleared and no session is live.
    Cleared,
}

/// Read-only view of the live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub reload_key: u64,
    pub marker: HelperMarker,
    pub view: ViewConfiguration,
    pub completed: bool,
    pub recorded_scripts: usize,
    pub augmented_markup: String,
}

#[derive(Debug, Clone)]
struct RenderRequest {
    source: String,
    view: ViewConfiguration,
    reload_key: u64,
}

struct RenderSession<X> {
    id: SessionId,
    reload_key: u64,
    view: ViewConfiguration,
    marker: HelperMarker,
    augmented_markup: String,
    completed: bool,
    delivered: bool,
    recorder: MutationRecorder,
    context: X,
    fallback_at: Option<Duration>,
    debounce_at: Option<Duration>,
    settle_by: Option<Duration>,
    last_pump: Duration,
}

type SettledCallback = Box<dyn FnMut(String)>;

pub struct RenderController<F: ContextFactory, C: Clock> {
    factory: F,
    clock: C,
    timings: SettleTimings,
    policy: ReintegrationPolicy,
    inbox: SignalInbox,
    session: Option<RenderSession<F::Context>>,
    next_session: SessionId,
    last_request: Option<RenderRequest>,
    callback: Option<SettledCallback>,
    phase: RenderPhase,
}

impl<F: ContextFactory, C: Clock> RenderController<F, C> {
    pub fn new(factory: F, clock: C) -> Self {
        Self {
            factory,
            clock,
            timings: SettleTimings::default(),
            policy: ReintegrationPolicy::default(),
            inbox: SignalInbox::new(),
            session: None,
            next_session: 1,
            last_request: None,
            callback: None,
            phase: RenderPhase::Idle,
        }
    }

    pub fn with_timings(mut self, timings: SettleTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_policy(mut self, policy: ReintegrationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn timings(&self) -> SettleTimings {
        self.timings
    }

    /// Registers the host's completion callback, replacing any earlier one.
    pub fn on_settled(&mut self, callback: impl FnMut(String) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    pub fn render(
        &mut self,
        source: &str,
        view: ViewConfiguration,
        reload_key: u64,
    ) -> RenderOutcome {
        let request = RenderRequest {
            source: source.to_owned(),
            view,
            reload_key,
        };

        if source.trim().is_empty() {
            self.drop_session();
            self.last_request = Some(request);
            debug!("empty source, preview cleared");
            return RenderOutcome::Cleared;
        }

        let live = self.session.is_some();
        if let Some(last) = self.last_request.as_mut().filter(|_| live) {
            let same_content = last.source == request.source && last.reload_key == reload_key;
            if same_content && !last.view.requires_reload(&view) {
                if last.view == view {
                    return RenderOutcome::Unchanged;
                }
                last.view = view;
                if let Some(session) = self.session.as_mut() {
                    session.view = view;
                }
                return RenderOutcome::Resized;
            }
        }

        self.start_session(request)
    }

    /// Forces a fresh session for the last request, if it had content.
    pub fn reload(&mut self) -> RenderOutcome {
        match self.last_request.clone() {
            Some(request) if !request.source.trim().is_empty() => self.start_session(request),
            Some(_) => RenderOutcome::Cleared,
            None => RenderOutcome::Unchanged,
        }
    }

    /// Advances the live session: pumps its context, applies signals, and
    /// fires due timers.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        let Some(session) = self.session.as_mut() else {
            self.inbox.drain();
            return;
        };

        let elapsed = now.saturating_sub(session.last_pump);
        session.last_pump = now;
        session.context.pump(elapsed);
        let removed = session.context.take_removed_scripts();
        session.recorder.extend(removed);
        for diagnostic in session.context.take_diagnostics() {
            debug!(session = session.id, %diagnostic, "context diagnostic");
        }

        self.apply_signals(now);

        if let Some(session) = self.session.as_mut() {
            if session.fallback_at.is_some_and(|deadline| deadline <= now) {
                debug!(session = session.id, "no load signal, settling on fallback timeout");
                complete(session, now, self.timings, &mut self.phase);
            }
        }

        let due = self
            .session
            .as_ref()
            .and_then(|session| session.debounce_at)
            .is_some_and(|deadline| deadline <= now);
        if due {
            self.deliver();
        }
    }

    /// Earliest pending timer, for hosts that sleep between ticks.
    pub fn next_deadline(&self) -> Option<Duration> {
        let session = self.session.as_ref()?;
        match (session.fallback_at, session.debounce_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Serializes the live session now without notifying the host.
    pub fn serialize_now(&mut self) -> Option<String> {
        let policy = self.policy;
        let session = self.session.as_mut()?;
        let removed = session.context.take_removed_scripts();
        session.recorder.extend(removed);
        let access = session.context.read_document();
        Some(Serializer.serialize(access, &session.marker, &mut session.recorder, policy))
    }

    /// Drops the live session and every pending timer. Nothing reaches the
    /// host afterwards until a new render starts.
    pub fn teardown(&mut self) {
        self.drop_session();
        self.last_request = None;
        debug!("preview torn down");
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    pub fn current_session(&self) -> Option<SessionInfo> {
        self.session.as_ref().map(|session| SessionInfo {
            id: session.id,
            reload_key: session.reload_key,
            marker: session.marker.clone(),
            view: session.view,
            completed: session.completed,
            recorded_scripts: session.recorder.len(),
            augmented_markup: session.augmented_markup.clone(),
        })
    }

    pub fn context(&self) -> Option<&F::Context> {
        self.session.as_ref().map(|session| &session.context)
    }

    pub fn context_mut(&mut self) -> Option<&mut F::Context> {
        self.session.as_mut().map(|session| &mut session.context)
    }

    fn start_session(&mut self, request: RenderRequest) -> RenderOutcome {
        self.drop_session();
        self.phase = RenderPhase::Building;

        let id = self.next_session;
        self.next_session += 1;
        let marker = HelperMarker::generate();
        let augmented = AugmentedDocument::build(&request.source, &request.view, &marker);

        let mut context = self.factory.create(self.inbox.sink(id));
        self.phase = RenderPhase::Rendering;
        let now = self.clock.now();
        context.load(&augmented);
        debug!(
            session = id,
            reload_key = request.reload_key,
            mode = %request.view.mode,
            block_network = request.view.block_network,
            "render session started"
        );

        let mut recorder = MutationRecorder::new();
        recorder.extend(context.take_removed_scripts());
        self.session = Some(RenderSession {
            id,
            reload_key: request.reload_key,
            view: request.view,
            marker,
            augmented_markup: augmented.markup(),
            completed: false,
            delivered: false,
            recorder,
            context,
            fallback_at: Some(now.saturating_add(self.timings.fallback)),
            debounce_at: None,
            settle_by: None,
            last_pump: now,
        });
        self.last_request = Some(request);
        self.apply_signals(now);
        RenderOutcome::Started(id)
    }

    fn apply_signals(&mut self, now: Duration) {
        for tagged in self.inbox.drain() {
            let Some(session) = self.session.as_mut().filter(|session| session.id == tagged.session)
            else {
                trace!(session = tagged.session, "dropping signal from a stale session");
                continue;
            };
            match tagged.signal {
                ContextSignal::Loaded => complete(session, now, self.timings, &mut self.phase),
                ContextSignal::DomActivity => {
                    if session.debounce_at.is_some() {
                        let restarted = now.saturating_add(self.timings.debounce);
                        session.debounce_at = Some(match session.settle_by {
                            Some(limit) => restarted.min(limit),
                            None => restarted,
                        });
                        trace!(session = session.id, "dom activity, debounce restarted");
                    }
                }
            }
        }
    }

    fn deliver(&mut self) {
        let policy = self.policy;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.debounce_at = None;
        session.delivered = true;
        let removed = session.context.take_removed_scripts();
        session.recorder.extend(removed);
        let access = session.context.read_document();
        let html = Serializer.serialize(access, &session.marker, &mut session.recorder, policy);
        debug!(session = session.id, bytes = html.len(), "preview settled");
        self.phase = RenderPhase::Delivered;
        if let Some(callback) = self.callback.as_mut() {
            callback(html);
        }
    }

    fn drop_session(&mut self) {
        if let Some(session) = self.session.take() {
            trace!(session = session.id, delivered = session.delivered, "session discarded");
        }
        self.inbox.drain();
        self.phase = RenderPhase::Idle;
    }
}

/// Marks the session complete once; later calls are ignored.
fn complete<X>(
    session: &mut RenderSession<X>,
    now: Duration,
    timings: SettleTimings,
    phase: &mut RenderPhase,
) {
    if session.completed {
        return;
    }
    session.completed = true;
    session.fallback_at = None;
    session.debounce_at = Some(now.saturating_add(timings.debounce));
    session.settle_by = Some(now.saturating_add(timings.max_wait.max(timings.debounce)));
    *phase = RenderPhase::Settled;
}

#[cfg(test)]
mod tests;
