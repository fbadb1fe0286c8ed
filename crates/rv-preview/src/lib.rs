//! Preview engine core: view configuration, augmented documents, the
//! mutation recorder, the serializer and the render controller.

pub mod clock;
pub mod context;
pub mod controller;
pub mod document;
pub mod marker;
pub mod recorder;
pub mod serializer;
pub mod view;

pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use context::BrowsingContext;
pub use context::ContextFactory;
pub use context::ContextSignal;
pub use context::SessionId;
pub use context::SignalInbox;
pub use context::SignalSink;
pub use context::TaggedSignal;
pub use controller::RenderController;
pub use controller::RenderOutcome;
pub use controller::RenderPhase;
pub use controller::SessionInfo;
pub use controller::SettleTimings;
pub use document::AugmentedDocument;
pub use document::RESET_STYLE;
pub use marker::HelperMarker;
pub use marker::MARKER_PROPERTY;
pub use recorder::MutationRecorder;
pub use recorder::RECORDER_BUFFER_GLOBAL;
pub use recorder::RecordedScript;
pub use recorder::ReintegrationPolicy;
pub use recorder::recorder_script;
pub use serializer::ContextAccess;
pub use serializer::Serializer;
pub use serializer::ensure_doctype;
pub use view::FrameGeometry;
pub use view::ViewConfiguration;
pub use view::ViewMode;
pub use view::ViewportWidth;
pub use view::clamp_custom_dimension;
