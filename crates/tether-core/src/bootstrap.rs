//! Hooks into the native toolkit that owns the UI thread.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapError {
    pub reason: String,
    /// Non-fatal failures leave the dispatcher usable in degraded mode.
    pub fatal: bool,
}

impl BootstrapError {
    pub fn fatal(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            fatal: true,
        }
    }

    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            fatal: false,
        }
    }
}

/// Everything the dispatcher needs from a native toolkit.
///
/// `bootstrap`, `pump` and `shutdown` always run on the UI thread. `wake` may
/// be called from any thread, right after work was queued.
pub trait NativeBootstrap: Send + Sync {
    fn toolkit(&self) -> &str;

    /// One-time setup that must precede creating any native control.
    fn bootstrap(&self) -> Result<(), BootstrapError> {
        Ok(())
    }

    /// Process pending native events. Called on every idle poll of the run loop.
    fn pump(&self) {}

    /// Nudge a native loop that is blocked in its own wait.
    fn wake(&self) {}

    fn shutdown(&self) {}
}

/// No native toolkit: work items are the only events.
#[derive(Clone, Copy, Debug, Default)]
pub struct Headless;

impl NativeBootstrap for Headless {
    fn toolkit(&self) -> &str {
        "headless"
    }
}
