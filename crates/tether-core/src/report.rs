//! Process-wide error channel for failures that are isolated rather than
//! propagated: panicking listeners and panicking fire-and-forget work.

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::event::EventType;

type Sink = Arc<dyn Fn(&ErrorReport) + Send + Sync>;

static SINK: RwLock<Option<Sink>> = parking_lot::const_rwlock(None);

thread_local! {
    static CAPTURES: RefCell<Vec<Vec<ErrorReport>>> = const { RefCell::new(Vec::new()) };
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorOrigin {
    Listener { event_type: EventType },
    AsyncWork,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorReport {
    pub origin: ErrorOrigin,
    pub message: String,
}

/// Replace the process-wide sink. The default sink logs at `error`.
pub fn set_error_sink(sink: impl Fn(&ErrorReport) + Send + Sync + 'static) {
    *SINK.write() = Some(Arc::new(sink));
}

pub fn clear_error_sink() {
    *SINK.write() = None;
}

pub fn report_error(report: ErrorReport) {
    CAPTURES.with(|c| {
        if let Some(top) = c.borrow_mut().last_mut() {
            top.push(report.clone());
        }
    });

    // Clone out so a sink may replace itself without deadlocking.
    let sink = SINK.read().clone();
    match sink {
        Some(sink) => sink(&report),
        None => match &report.origin {
            ErrorOrigin::Listener { event_type } => {
                log::error!("listener for {event_type:?} panicked: {}", report.message)
            }
            ErrorOrigin::AsyncWork => {
                log::error!("async work item panicked: {}", report.message)
            }
        },
    }
}

struct CaptureGuard {
    armed: bool,
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if self.armed {
            CAPTURES.with(|c| {
                c.borrow_mut().pop();
            });
        }
    }
}

/// Runs `f` and returns every report raised on this thread while it ran.
/// Reports still reach the process-wide sink.
pub fn capture_errors<R>(f: impl FnOnce() -> R) -> (R, Vec<ErrorReport>) {
    CAPTURES.with(|c| c.borrow_mut().push(Vec::new()));
    let mut guard = CaptureGuard { armed: true };
    let result = f();
    guard.armed = false;
    let reports = CAPTURES.with(|c| c.borrow_mut().pop()).unwrap_or_default();
    (result, reports)
}
