//! The logical UI thread.
//!
//! A [`Dispatcher`] designates one OS thread as the UI thread and lets any
//! other thread hand it work, either blocking for the result ([`Dispatcher::invoke`])
//! or fire-and-forget ([`Dispatcher::invoke_async`]). Work runs in FIFO order.
//!
//! ```rust
//! use tether_core::*;
//!
//! let ui = Dispatcher::headless();
//! ui.initialize().unwrap();
//!
//! // Already on the UI thread: runs inline, nothing is queued.
//! let answer = ui.invoke(|| 6 * 7).unwrap();
//! assert_eq!(answer, 42);
//! ui.stop();
//! ```
//!
//! The lifecycle is
//! `Uninitialized -> Initializing -> Ready -> Running -> Draining -> Stopped`.
//! Only a fatal bootstrap failure steps back (to `Uninitialized`); a stopped
//! dispatcher cannot be re-initialized.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak, mpsc};
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use web_time::{Duration, Instant};

use crate::bootstrap::{Headless, NativeBootstrap};
use crate::config::DispatcherConfig;
use crate::error::{DispatchError, panic_message};
use crate::report::{ErrorOrigin, ErrorReport, report_error};

thread_local! {
    static CURRENT: RefCell<Option<Weak<Shared>>> = const { RefCell::new(None) };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatcherState {
    Uninitialized,
    /// Native bootstrap in progress on the would-be UI thread.
    Initializing,
    Ready,
    Running,
    Draining,
    Stopped,
}

impl DispatcherState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Uninitialized,
            1 => Self::Initializing,
            2 => Self::Ready,
            3 => Self::Running,
            4 => Self::Draining,
            _ => Self::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::Initializing => 1,
            Self::Ready => 2,
            Self::Running => 3,
            Self::Draining => 4,
            Self::Stopped => 5,
        }
    }

    /// States in which new work is queued.
    pub fn accepts_work(self) -> bool {
        matches!(self, Self::Ready | Self::Running)
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

enum WorkItem {
    Run(Job),
    Stop,
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    executed: AtomicU64,
    fast_path: AtomicU64,
    idle_polls: AtomicU64,
    panics: AtomicU64,
}

/// Point-in-time counters, for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    pub enqueued: u64,
    pub executed: u64,
    pub fast_path: u64,
    pub idle_polls: u64,
    pub panics: u64,
    pub queued: usize,
}

struct Shared {
    // State is written only while `queue` is held; the atomic mirror lets the
    // reentrant fast path read it without locking.
    state: AtomicU8,
    queue: Mutex<VecDeque<WorkItem>>,
    work_ready: Condvar,
    state_changed: Condvar,
    ui_thread: OnceLock<ThreadId>,
    degraded: AtomicBool,
    released: AtomicBool,
    bootstrap: Box<dyn NativeBootstrap>,
    config: DispatcherConfig,
    counters: Counters,
}

impl Shared {
    fn state(&self) -> DispatcherState {
        DispatcherState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, _held: &VecDeque<WorkItem>, state: DispatcherState) {
        self.state.store(state.as_u8(), Ordering::Release);
        self.state_changed.notify_all();
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig, bootstrap: impl NativeBootstrap + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: AtomicU8::new(DispatcherState::Uninitialized.as_u8()),
                queue: Mutex::new(VecDeque::new()),
                work_ready: Condvar::new(),
                state_changed: Condvar::new(),
                ui_thread: OnceLock::new(),
                degraded: AtomicBool::new(false),
                released: AtomicBool::new(false),
                bootstrap: Box::new(bootstrap),
                config,
                counters: Counters::default(),
            }),
        }
    }

    pub fn headless() -> Self {
        Self::new(DispatcherConfig::default(), Headless)
    }

    /// The dispatcher whose UI thread is the calling thread, if any.
    pub fn current() -> Option<Dispatcher> {
        CURRENT.with(|c| {
            c.borrow()
                .as_ref()
                .and_then(Weak::upgrade)
                .map(|shared| Dispatcher { shared })
        })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.shared.config
    }

    pub fn toolkit(&self) -> &str {
        self.shared.bootstrap.toolkit()
    }

    pub fn state(&self) -> DispatcherState {
        self.shared.state()
    }

    pub fn ui_thread_id(&self) -> Option<ThreadId> {
        self.shared.ui_thread.get().copied()
    }

    pub fn is_ui_thread(&self) -> bool {
        self.shared.ui_thread.get() == Some(&thread::current().id())
    }

    /// True when native bootstrap reported a non-fatal failure.
    pub fn is_degraded(&self) -> bool {
        self.shared.degraded.load(Ordering::Acquire)
    }

    pub fn same_dispatcher(&self, other: &Dispatcher) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn stats(&self) -> DispatcherStats {
        let c = &self.shared.counters;
        DispatcherStats {
            enqueued: c.enqueued.load(Ordering::Relaxed),
            executed: c.executed.load(Ordering::Relaxed),
            fast_path: c.fast_path.load(Ordering::Relaxed),
            idle_polls: c.idle_polls.load(Ordering::Relaxed),
            panics: c.panics.load(Ordering::Relaxed),
            queued: self.shared.queue.lock().len(),
        }
    }

    /// Makes the calling thread the UI thread and bootstraps the native toolkit.
    ///
    /// The bootstrap runs without the queue lock held, so [`Dispatcher::stop`]
    /// from another thread never waits on it. A stop that lands mid-bootstrap
    /// wins: the toolkit is shut down again and this returns
    /// [`DispatchError::NotInitialized`] with the `Stopped` state.
    pub fn initialize(&self) -> Result<(), DispatchError> {
        let shared = &self.shared;
        {
            let q = shared.queue.lock();
            let state = shared.state();
            if state != DispatcherState::Uninitialized {
                return Err(DispatchError::AlreadyInitialized { state });
            }
            shared.set_state(&q, DispatcherState::Initializing);
        }

        let toolkit = shared.bootstrap.toolkit().to_string();
        let outcome = shared.bootstrap.bootstrap();

        let q = shared.queue.lock();
        if shared.state() == DispatcherState::Stopped {
            drop(q);
            log::warn!("{toolkit} stopped while bootstrapping; shutting down");
            self.release_native();
            return Err(DispatchError::NotInitialized {
                state: DispatcherState::Stopped,
            });
        }
        if let Err(e) = outcome {
            if e.fatal {
                shared.set_state(&q, DispatcherState::Uninitialized);
                drop(q);
                log::error!("{toolkit} bootstrap failed: {}", e.reason);
                return Err(DispatchError::NativeBootstrap {
                    toolkit,
                    reason: e.reason,
                });
            }
            log::warn!(
                "{toolkit} bootstrap failed, continuing in degraded mode: {}",
                e.reason
            );
            shared.degraded.store(true, Ordering::Release);
        }

        let me = thread::current();
        // Only the Initializing -> Ready transition sets this, exactly once.
        let _ = shared.ui_thread.set(me.id());
        shared.set_state(&q, DispatcherState::Ready);
        drop(q);

        CURRENT.with(|c| *c.borrow_mut() = Some(Arc::downgrade(shared)));
        log::info!(
            "{toolkit} UI thread initialized on {:?} ({})",
            me.id(),
            me.name().unwrap_or("unnamed")
        );
        Ok(())
    }

    fn check_ui_thread(&self) -> Result<(), DispatchError> {
        let actual = thread::current().id();
        match self.shared.ui_thread.get() {
            None => Err(DispatchError::NotInitialized {
                state: self.state(),
            }),
            Some(expected) if *expected == actual => Ok(()),
            Some(expected) => Err(DispatchError::ThreadAffinityViolation {
                expected: Some(*expected),
                actual,
            }),
        }
    }

    /// Blocks the UI thread executing queued work until [`Dispatcher::stop`]
    /// is observed. Idle waits are bounded by the configured poll interval;
    /// each idle poll pumps the native toolkit.
    pub fn run_loop(&self) -> Result<(), DispatchError> {
        self.enter_running()?;
        if self.state() == DispatcherState::Stopped {
            return Ok(());
        }
        log::debug!("{} run loop entered", self.toolkit());

        let shared = &self.shared;
        let poll = shared.config.poll_interval;
        loop {
            let item = {
                let mut q = shared.queue.lock();
                loop {
                    if let Some(item) = q.pop_front() {
                        break Some(item);
                    }
                    if shared.work_ready.wait_for(&mut q, poll).timed_out() {
                        break q.pop_front();
                    }
                }
            };
            match item {
                None => {
                    shared.counters.idle_polls.fetch_add(1, Ordering::Relaxed);
                    shared.bootstrap.pump();
                }
                Some(WorkItem::Run(job)) => self.execute(job),
                Some(WorkItem::Stop) => break,
            }
        }

        self.finish_stop();
        log::debug!("{} run loop exited", self.toolkit());
        Ok(())
    }

    /// For toolkits whose own event loop owns the UI thread: marks the
    /// dispatcher running without blocking. The native loop then calls
    /// [`Dispatcher::drain_pending`] whenever [`NativeBootstrap::wake`] fires.
    pub fn attach_native_loop(&self) -> Result<(), DispatchError> {
        self.enter_running()?;
        log::debug!("{} dispatcher attached to native loop", self.toolkit());
        Ok(())
    }

    fn enter_running(&self) -> Result<(), DispatchError> {
        if let state @ (DispatcherState::Uninitialized | DispatcherState::Initializing) =
            self.state()
        {
            return Err(DispatchError::NotInitialized { state });
        }
        self.check_ui_thread()?;
        let q = self.shared.queue.lock();
        match self.shared.state() {
            DispatcherState::Ready => {
                self.shared.set_state(&q, DispatcherState::Running);
                Ok(())
            }
            DispatcherState::Stopped => {
                // Stopped from another thread before the loop started.
                drop(q);
                self.release_native();
                Ok(())
            }
            state @ DispatcherState::Running => Err(DispatchError::AlreadyInitialized { state }),
            state => Err(DispatchError::NotInitialized { state }),
        }
    }

    /// Executes everything queued at call time, without waiting for more.
    /// Returns `true` once a stop request has been observed.
    pub fn drain_pending(&self) -> Result<bool, DispatchError> {
        self.check_ui_thread()?;
        match self.state() {
            DispatcherState::Running | DispatcherState::Draining => {}
            DispatcherState::Stopped => return Ok(true),
            state => return Err(DispatchError::NotInitialized { state }),
        }

        let batch: Vec<WorkItem> = self.shared.queue.lock().drain(..).collect();
        for item in batch {
            match item {
                WorkItem::Run(job) => self.execute(job),
                WorkItem::Stop => {
                    self.finish_stop();
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn execute(&self, job: Job) {
        let counters = &self.shared.counters;
        counters.executed.fetch_add(1, Ordering::Relaxed);
        if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
            counters.panics.fetch_add(1, Ordering::Relaxed);
            report_error(ErrorReport {
                origin: ErrorOrigin::AsyncWork,
                message: panic_message(&*payload),
            });
        }
    }

    fn finish_stop(&self) {
        let leftovers = {
            let mut q = self.shared.queue.lock();
            self.shared.set_state(&q, DispatcherState::Stopped);
            std::mem::take(&mut *q)
        };
        if !leftovers.is_empty() {
            log::warn!("dropping {} work items queued after stop", leftovers.len());
        }
        drop(leftovers);
        self.release_native();
    }

    /// Shuts the toolkit down and forgets this dispatcher as the thread's
    /// current one. UI thread only; the shutdown runs once.
    fn release_native(&self) {
        CURRENT.with(|c| {
            let mut c = c.borrow_mut();
            if c.as_ref().is_some_and(|w| w.ptr_eq(&Arc::downgrade(&self.shared))) {
                *c = None;
            }
        });
        if !self.shared.released.swap(true, Ordering::AcqRel) {
            self.shared.bootstrap.shutdown();
        }
    }

    /// Requests shutdown. A running loop finishes the work queued ahead of
    /// the request, then exits. Without a running loop, queued work is dropped
    /// and blocked callers get [`DispatchError::Abandoned`]. Idempotent.
    pub fn stop(&self) {
        let shared = &self.shared;
        let mut q = shared.queue.lock();
        match shared.state() {
            DispatcherState::Running => {
                shared.set_state(&q, DispatcherState::Draining);
                q.push_back(WorkItem::Stop);
                shared.work_ready.notify_one();
                drop(q);
                shared.bootstrap.wake();
                log::debug!("{} stop requested; draining", shared.bootstrap.toolkit());
            }
            state @ (DispatcherState::Uninitialized
            | DispatcherState::Initializing
            | DispatcherState::Ready) => {
                let dropped = std::mem::take(&mut *q);
                shared.set_state(&q, DispatcherState::Stopped);
                drop(q);
                if !dropped.is_empty() {
                    log::warn!("stopped with {} unexecuted work items", dropped.len());
                }
                drop(dropped);
                // Off the UI thread, the next `initialize` or `run_loop` there releases.
                if state == DispatcherState::Ready && self.is_ui_thread() {
                    self.release_native();
                }
            }
            DispatcherState::Draining | DispatcherState::Stopped => {}
        }
    }

    /// Blocks until the UI thread has entered its loop (or attached to a native one).
    pub fn wait_until_running(&self, timeout: Duration) -> Result<(), DispatchError> {
        let deadline = Instant::now() + timeout;
        let mut q = self.shared.queue.lock();
        loop {
            match self.shared.state() {
                DispatcherState::Running => return Ok(()),
                state @ (DispatcherState::Draining | DispatcherState::Stopped) => {
                    return Err(DispatchError::NotInitialized { state });
                }
                DispatcherState::Uninitialized
                | DispatcherState::Initializing
                | DispatcherState::Ready => {}
            }
            if self
                .shared
                .state_changed
                .wait_until(&mut q, deadline)
                .timed_out()
            {
                return Err(DispatchError::StartupTimeout { timeout });
            }
        }
    }

    fn enqueue(&self, job: Job) -> Result<(), DispatchError> {
        let shared = &self.shared;
        let mut q = shared.queue.lock();
        let state = shared.state();
        if !state.accepts_work() {
            return Err(DispatchError::NotInitialized { state });
        }
        q.push_back(WorkItem::Run(job));
        shared.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        shared.work_ready.notify_one();
        drop(q);
        shared.bootstrap.wake();
        Ok(())
    }

    /// Runs `f` on the UI thread and returns its result.
    ///
    /// On the UI thread itself `f` runs inline with no queueing, so native
    /// callbacks can call this without deadlocking on themselves. From any
    /// other thread the caller blocks until the UI thread has run `f`; there is
    /// no timeout. A panic in `f` is caught on the UI thread and returned as
    /// [`DispatchError::ActionPanicked`].
    pub fn invoke<F, R>(&self, f: F) -> Result<R, DispatchError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_ui_thread() {
            let state = self.state();
            if state == DispatcherState::Stopped {
                return Err(DispatchError::NotInitialized { state });
            }
            self.shared
                .counters
                .fast_path
                .fetch_add(1, Ordering::Relaxed);
            return catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
                DispatchError::ActionPanicked {
                    message: panic_message(&*payload),
                }
            });
        }

        let (tx, rx) = mpsc::sync_channel::<Result<R, String>>(1);
        self.enqueue(Box::new(move || {
            let result = catch_unwind(AssertUnwindSafe(f)).map_err(|p| panic_message(&*p));
            // The caller may have given up; nothing to do then.
            let _ = tx.send(result);
        }))?;

        match rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(DispatchError::ActionPanicked { message }),
            Err(_) => Err(DispatchError::Abandoned),
        }
    }

    /// Queues `f` for the UI thread and returns immediately. Always queued,
    /// even from the UI thread. A panic in `f` goes to the error channel.
    pub fn invoke_async<F>(&self, f: F) -> Result<(), DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Box::new(f))
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("toolkit", &self.toolkit())
            .field("state", &self.state())
            .field("ui_thread", &self.ui_thread_id())
            .finish()
    }
}
