use super::RenderController;
use super::RenderOutcome;
use super::RenderPhase;
use crate::clock::ManualClock;
use crate::context::BrowsingContext;
use crate::context::ContextFactory;
use crate::context::ContextSignal;
use crate::context::SignalSink;
use crate::document::AugmentedDocument;
use crate::recorder::RecordedScript;
use crate::serializer::ContextAccess;
use crate::view::ViewConfiguration;
use crate::view::ViewMode;
use rv_dom::Document;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Default)]
struct FakeState {
    loads: Vec<String>,
    document: Option<Document>,
    removed: Vec<RecordedScript>,
    sinks: Vec<SignalSink>,
    pumped: Duration,
}

type Shared = Rc<RefCell<FakeState>>;

struct FakeContext {
    shared: Shared,
    sink: SignalSink,
    emit_on_load: bool,
    readable: bool,
}

impl BrowsingContext for FakeContext {
    fn load(&mut self, document: &AugmentedDocument) {
        {
            let mut state = self.shared.borrow_mut();
            state.loads.push(document.markup());
            state.document = Some(document.document().clone());
        }
        if self.emit_on_load {
            self.sink.emit(ContextSignal::Loaded);
        }
    }

    fn pump(&mut self, elapsed: Duration) {
        let mut state = self.shared.borrow_mut();
        state.pumped = state.pumped.saturating_add(elapsed);
    }

    fn read_document(&mut self) -> ContextAccess<Document> {
        if !self.readable {
            return ContextAccess::inaccessible("blocked by test");
        }
        match self.shared.borrow().document.clone() {
            Some(document) => ContextAccess::Available(document),
            None => ContextAccess::inaccessible("nothing loaded"),
        }
    }

    fn take_removed_scripts(&mut self) -> Vec<RecordedScript> {
        std::mem::take(&mut self.shared.borrow_mut().removed)
    }
}

struct FakeFactory {
    shared: Shared,
    emit_on_load: bool,
    readable: bool,
}

impl ContextFactory for FakeFactory {
    type Context = FakeContext;

    fn create(&mut self, sink: SignalSink) -> FakeContext {
        self.shared.borrow_mut().sinks.push(sink.clone());
        FakeContext {
            shared: Rc::clone(&self.shared),
            sink,
            emit_on_load: self.emit_on_load,
            readable: self.readable,
        }
    }
}

struct Harness {
    controller: RenderController<FakeFactory, ManualClock>,
    clock: ManualClock,
    shared: Shared,
    delivered: Rc<RefCell<Vec<String>>>,
}

impl Harness {
    fn new(emit_on_load: bool) -> Self {
        Self::with_access(emit_on_load, true)
    }

    fn with_access(emit_on_load: bool, readable: bool) -> Self {
        let shared = Shared::default();
        let clock = ManualClock::new();
        let factory = FakeFactory {
            shared: Rc::clone(&shared),
            emit_on_load,
            readable,
        };
        let mut controller = RenderController::new(factory, clock.clone());
        let delivered = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&delivered);
        controller.on_settled(move |html| sink.borrow_mut().push(html));
        Self {
            controller,
            clock,
            shared,
            delivered,
        }
    }

    fn advance_to(&mut self, millis: u64) {
        self.clock.set(Duration::from_millis(millis));
        self.controller.tick();
    }

    fn deliveries(&self) -> Vec<String> {
        self.delivered.borrow().clone()
    }

    fn emit(&self, index: usize, signal: ContextSignal) {
        if let Some(sink) = self.shared.borrow().sinks.get(index) {
            sink.emit(signal);
        }
    }

    fn append_paragraph(&self, text: &str) {
        let mut state = self.shared.borrow_mut();
        let Some(document) = state.document.as_mut() else {
            return;
        };
        let Some(body) = document.body() else {
            return;
        };
        let paragraph = document.create_element("p");
        let content = document.create_text(text);
        document.append_child(paragraph, content);
        document.append_child(body, paragraph);
    }
}

#[test]
fn load_signal_settles_after_the_debounce_window() {
    let mut harness = Harness::new(true);
    let outcome = harness
        .controller
        .render("<p>hi</p>", ViewConfiguration::default(), 0);
    assert!(matches!(outcome, RenderOutcome::Started(_)));
    assert_eq!(harness.controller.phase(), RenderPhase::Settled);

    harness.advance_to(1999);
    assert!(harness.deliveries().is_empty());

    harness.advance_to(2000);
    let delivered = harness.deliveries();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].starts_with("<!DOCTYPE html>\n<html>"));
    assert!(delivered[0].contains("<p>hi</p>"));
    assert!(!delivered[0].contains("__pv_removed_scripts"));
    assert!(!delivered[0].contains("[Preview] "));
    assert_eq!(harness.controller.phase(), RenderPhase::Delivered);
}

#[test]
fn fallback_timeout_completes_silent_contexts() {
    let mut harness = Harness::new(false);
    harness
        .controller
        .render("<p>hi</p>", ViewConfiguration::default(), 0);

    harness.advance_to(499);
    assert_eq!(harness.controller.phase(), RenderPhase::Rendering);
    harness.advance_to(500);
    assert_eq!(harness.controller.phase(), RenderPhase::Settled);
    harness.advance_to(2499);
    assert!(harness.deliveries().is_empty());
    harness.advance_to(2500);
    assert_eq!(harness.deliveries().len(), 1);
    assert_eq!(harness.shared.borrow().pumped, Duration::from_millis(2500));
}

#[test]
fn dom_activity_inside_the_window_restarts_it() {
    let mut harness = Harness::new(true);
    harness
        .controller
        .render("<p>hi</p>", ViewConfiguration::default(), 0);

    harness.append_paragraph("late");
    harness.emit(0, ContextSignal::DomActivity);
    harness.advance_to(1500);
    harness.advance_to(2000);
    assert!(harness.deliveries().is_empty());

    harness.advance_to(3500);
    let delivered = harness.deliveries();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].contains("<p>late</p>"));
}

#[test]
fn endless_dom_activity_is_delivered_at_the_max_wait() {
    let mut harness = Harness::new(true);
    harness
        .controller
        .render("<p>hi</p>", ViewConfiguration::default(), 0);

    for second in 1..=7 {
        harness.emit(0, ContextSignal::DomActivity);
        harness.advance_to(second * 1000);
    }
    assert!(harness.deliveries().is_empty());
    assert_eq!(
        harness.controller.next_deadline(),
        Some(Duration::from_millis(8000))
    );

    harness.append_paragraph("tick");
    for second in 8..=30 {
        harness.emit(0, ContextSignal::DomActivity);
        harness.advance_to(second * 1000);
    }
    let delivered = harness.deliveries();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].contains("<p>tick</p>"));
    assert_eq!(harness.controller.phase(), RenderPhase::Delivered);
}

#[test]
fn completion_is_delivered_once() {
    let mut harness = Harness::new(true);
    harness
        .controller
        .render("<p>hi</p>", ViewConfiguration::default(), 0);
    harness.emit(0, ContextSignal::Loaded);
    harness.advance_to(600);
    harness.emit(0, ContextSignal::Loaded);
    harness.advance_to(2000);
    harness.emit(0, ContextSignal::Loaded);
    harness.emit(0, ContextSignal::DomActivity);
    harness.advance_to(10_000);
    assert_eq!(harness.deliveries().len(), 1);
}

#[test]
fn replaced_sessions_never_reach_the_host() {
    let mut harness = Harness::new(false);
    harness
        .controller
        .render("<p>first</p>", ViewConfiguration::default(), 0);
    harness.advance_to(300);
    let second = harness
        .controller
        .render("<p>second</p>", ViewConfiguration::default(), 0);
    assert!(matches!(second, RenderOutcome::Started(2)));

    harness.emit(0, ContextSignal::Loaded);
    harness.advance_to(600);
    assert_eq!(harness.controller.phase(), RenderPhase::Rendering);

    harness.advance_to(800);
    harness.advance_to(2800);
    let delivered = harness.deliveries();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].contains("second"));
    assert!(!delivered[0].contains("first"));
}

#[test]
fn teardown_cancels_pending_timers() {
    let mut harness = Harness::new(true);
    harness
        .controller
        .render("<p>hi</p>", ViewConfiguration::default(), 0);
    harness.advance_to(100);
    harness.controller.teardown();
    harness.emit(0, ContextSignal::DomActivity);
    harness.advance_to(5000);
    assert!(harness.deliveries().is_empty());
    assert_eq!(harness.controller.phase(), RenderPhase::Idle);
    assert!(harness.controller.current_session().is_none());
    assert!(harness.controller.next_deadline().is_none());
}

#[test]
fn custom_resizes_keep_the_session() {
    let mut harness = Harness::new(true);
    let view = ViewConfiguration::custom(800, 600);
    harness.controller.render("<p>hi</p>", view, 0);
    assert_eq!(
        harness.controller.render("<p>hi</p>", view, 0),
        RenderOutcome::Unchanged
    );
    assert_eq!(
        harness
            .controller
            .render("<p>hi</p>", view.with_custom_size(1000, 700), 0),
        RenderOutcome::Resized
    );
    assert_eq!(harness.shared.borrow().loads.len(), 1);

    let tablet = harness
        .controller
        .render("<p>hi</p>", ViewConfiguration::new(ViewMode::Tablet), 0);
    assert!(matches!(tablet, RenderOutcome::Started(2)));
    let rekeyed = harness
        .controller
        .render("<p>hi</p>", ViewConfiguration::new(ViewMode::Tablet), 1);
    assert!(matches!(rekeyed, RenderOutcome::Started(3)));
    assert_eq!(harness.shared.borrow().loads.len(), 3);
}

#[test]
fn empty_sources_clear_the_surface() {
    let mut harness = Harness::new(true);
    harness
        .controller
        .render("<p>hi</p>", ViewConfiguration::default(), 0);
    assert_eq!(
        harness
            .controller
            .render("  \n", ViewConfiguration::default(), 0),
        RenderOutcome::Cleared
    );
    assert!(harness.controller.current_session().is_none());
    harness.advance_to(5000);
    assert!(harness.deliveries().is_empty());
}

#[test]
fn reload_starts_a_fresh_session_with_a_new_marker() {
    let mut harness = Harness::new(true);
    harness
        .controller
        .render("<p>hi</p>", ViewConfiguration::default(), 0);
    let Some(first) = harness.controller.current_session() else {
        panic!("no live session");
    };
    assert!(matches!(harness.controller.reload(), RenderOutcome::Started(2)));
    let Some(second) = harness.controller.current_session() else {
        panic!("no live session after reload");
    };
    assert_ne!(first.marker, second.marker);
    assert!(
        second
            .augmented_markup
            .contains(&second.marker.attribute_name())
    );
    assert!(!second.augmented_markup.contains(&first.marker.attribute_name()));
}

#[test]
fn serialize_now_reintegrates_recorded_scripts_once() {
    let mut harness = Harness::new(true);
    harness
        .controller
        .render("<p>hi</p>", ViewConfiguration::default(), 0);
    harness.shared.borrow_mut().removed.extend([
        RecordedScript::page("<script>a()</script>"),
        RecordedScript::page("<script>b()</script>"),
        RecordedScript::page("<script>c()</script>"),
    ]);

    let first = harness.controller.serialize_now().unwrap_or_default();
    assert_eq!(first.matches("<script>c()</script>").count(), 1);
    assert!(!first.contains("a()"));

    let second = harness.controller.serialize_now().unwrap_or_default();
    assert!(!second.contains("c()"));
}

#[test]
fn unreadable_contexts_deliver_empty_output() {
    let mut harness = Harness::with_access(true, false);
    harness
        .controller
        .render("<p>hi</p>", ViewConfiguration::default(), 0);
    harness.advance_to(2000);
    assert_eq!(harness.deliveries(), vec![String::new()]);
}
