//! Seam between the render controller and whatever hosts the document.

use crate::document::AugmentedDocument;
use crate::recorder::RecordedScript;
use crate::serializer::ContextAccess;
use rv_dom::Document;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// Identifies one render session. Strictly increasing per controller.
pub type SessionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSignal {
    /// The document finished loading.
    Loaded,
    /// Scripts touched the document after load.
    DomActivity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggedSignal {
    pub session: SessionId,
    pub signal: ContextSignal,
}

/// Queue the controller drains on every tick.
#[derive(Debug, Clone, Default)]
pub struct SignalInbox {
    queue: Rc<RefCell<VecDeque<TaggedSignal>>>,
}

impl SignalInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self, session: SessionId) -> SignalSink {
        SignalSink {
            session,
            queue: Rc::clone(&self.queue),
        }
    }

    pub fn drain(&self) -> Vec<TaggedSignal> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

/// Handle a context uses to report back. Every signal is tagged with the
/// session that created the sink, so late signals from a replaced context
/// can be told apart.
#[derive(Debug, Clone)]
pub struct SignalSink {
    session: SessionId,
    queue: Rc<RefCell<VecDeque<TaggedSignal>>>,
}

impl SignalSink {
    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn emit(&self, signal: ContextSignal) {
        self.queue.borrow_mut().push_back(TaggedSignal {
            session: self.session,
            signal,
        });
    }
}

/// An isolated place where an augmented document is loaded and run.
///
/// Implementations never fail outward: problems surface as diagnostics, an
/// inaccessible document, or a missing load signal.
pub trait BrowsingContext {
    fn load(&mut self, document: &AugmentedDocument);

    /// Lets the context advance by `elapsed` since the previous pump.
    fn pump(&mut self, elapsed: Duration);

    fn read_document(&mut self) -> ContextAccess<Document>;

    /// Scripts removed since the last call, in removal order.
    fn take_removed_scripts(&mut self) -> Vec<RecordedScript>;

    fn take_diagnostics(&mut self) -> Vec<String> {
        Vec::new()
    }
}

pub trait ContextFactory {
    type Context: BrowsingContext;

    fn create(&mut self, sink: SignalSink) -> Self::Context;
}

#[cfg(test)]
mod tests {
    use super::ContextSignal;
    use super::SignalInbox;

    #[test]
    fn sinks_tag_signals_with_their_session() {
        let inbox = SignalInbox::new();
        inbox.sink(3).emit(ContextSignal::Loaded);
        inbox.sink(4).emit(ContextSignal::DomActivity);
        let drained = inbox.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].session, 3);
        assert_eq!(drained[1].signal, ContextSignal::DomActivity);
        assert!(inbox.is_empty());
    }
}
