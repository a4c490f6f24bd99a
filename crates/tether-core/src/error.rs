use std::any::Any;
use std::thread::ThreadId;

use web_time::Duration;

use crate::dispatcher::DispatcherState;
use crate::registry::NativeHandle;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("dispatcher is not accepting work (state: {state:?})")]
    NotInitialized { state: DispatcherState },
    #[error("dispatcher already initialized (state: {state:?})")]
    AlreadyInitialized { state: DispatcherState },
    #[error("called from thread {actual:?}, but the UI thread is {expected:?}")]
    ThreadAffinityViolation {
        expected: Option<ThreadId>,
        actual: ThreadId,
    },
    #[error("native bootstrap of {toolkit} failed: {reason}")]
    NativeBootstrap { toolkit: String, reason: String },
    #[error("action panicked on the UI thread: {message}")]
    ActionPanicked { message: String },
    #[error("work item was dropped before the UI thread ran it")]
    Abandoned,
    #[error("UI thread did not become ready within {timeout:?}")]
    StartupTimeout { timeout: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("native handle {0} is already registered")]
    DuplicateHandle(NativeHandle),
    #[error("cannot register a null native handle")]
    NullHandle,
}

#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    #[error("widget is disposed")]
    Disposed,
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Best-effort text of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}
