//! Drives one preview to settlement on a dedicated thread.

use rv_core::PreviewError;
use rv_core::PreviewResult;
use rv_preview::RenderController;
use rv_preview::RenderOutcome;
use rv_preview::SystemClock;
use rv_preview::ViewConfiguration;
use rv_sandbox::ContextReport;
use rv_sandbox::ScriptedContextFactory;
use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;
use std::time::Instant;
use tracing::debug;
use tracing::warn;

const RENDER_THREAD_STACK_SIZE: usize = 32 * 1024 * 1024;
const TICK_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone)]
pub(crate) struct RenderJob {
    pub source: String,
    pub view: ViewConfiguration,
    /// Give up waiting for settlement after this long and take the
    /// document as it is.
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RenderResult {
    pub html: String,
    pub report: Option<ContextReport>,
    pub timed_out: bool,
}

pub(crate) fn run(job: RenderJob) -> PreviewResult<RenderResult> {
    let handle = thread::Builder::new()
        .name("revela-render".to_owned())
        .stack_size(RENDER_THREAD_STACK_SIZE)
        .spawn(move || drive(job))
        .map_err(|error| PreviewError::new("render.thread_spawn", error.to_string()))?;
    handle
        .join()
        .map_err(|_| PreviewError::new("render.thread_panicked", "render thread panicked"))
}

fn drive(job: RenderJob) -> RenderResult {
    let mut controller =
        RenderController::new(ScriptedContextFactory::default(), SystemClock::default());
    let delivered: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&delivered);
    controller.on_settled(move |html| {
        sink.borrow_mut().get_or_insert(html);
    });

    match controller.render(&job.source, job.view, 0) {
        RenderOutcome::Started(session) => debug!(session, "render started"),
        RenderOutcome::Cleared => return RenderResult::default(),
        RenderOutcome::Resized | RenderOutcome::Unchanged => {}
    }

    let started = Instant::now();
    let mut timed_out = false;
    loop {
        controller.tick();
        if delivered.borrow().is_some() {
            break;
        }
        if started.elapsed() >= job.timeout {
            warn!(
                timeout_ms = job.timeout.as_millis(),
                "preview never settled, taking the current document"
            );
            timed_out = true;
            let html = controller.serialize_now().unwrap_or_default();
            delivered.borrow_mut().get_or_insert(html);
            break;
        }
        thread::sleep(TICK_INTERVAL);
    }

    let report = controller.context().map(|context| context.report());
    controller.teardown();
    let html = delivered.borrow_mut().take().unwrap_or_default();
    RenderResult {
        html,
        report,
        timed_out,
    }
}
