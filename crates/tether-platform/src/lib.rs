//! UI-thread runners (headless; desktop via winit)
//!
//! `spawn_ui_thread` gives tests and background-heavy apps a dedicated UI
//! thread; `run_on_current_thread` turns the caller into the UI thread;
//! `desktop::run_desktop_loop` hands the thread to a winit event loop and
//! pumps the dispatcher from it.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, anyhow};
use tether_core::*;
use web_time::Instant;

#[cfg(feature = "desktop")]
pub mod desktop;
pub mod tests;

/// A spawned UI thread running a dispatcher loop.
pub struct UiThread {
    dispatcher: Dispatcher,
    join: Option<JoinHandle<Result<(), DispatchError>>>,
}

impl UiThread {
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Stops the loop after the work already queued, then joins the thread.
    pub fn shutdown(mut self) -> anyhow::Result<()> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> anyhow::Result<()> {
        self.dispatcher.stop();
        let Some(join) = self.join.take() else {
            return Ok(());
        };
        match join.join() {
            Ok(result) => result.context("UI thread loop failed"),
            Err(payload) => Err(anyhow!("UI thread panicked: {}", panic_message(&*payload))),
        }
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        if let Err(e) = self.stop_and_join() {
            log::error!("{e:#}");
        }
    }
}

/// Spawns a named thread that becomes the UI thread and runs the dispatcher
/// loop. Returns once the loop is running, or fails if that takes longer than
/// `config.startup_timeout`.
pub fn spawn_ui_thread(
    config: DispatcherConfig,
    bootstrap: impl NativeBootstrap + 'static,
) -> anyhow::Result<UiThread> {
    let timeout = config.startup_timeout;
    let deadline = Instant::now() + timeout;
    let name = config.thread_name.clone();
    let dispatcher = Dispatcher::new(config, bootstrap);

    let (ready_tx, ready_rx) = mpsc::channel::<Result<(), DispatchError>>();
    let ui = dispatcher.clone();
    let join = thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            if let Err(e) = ui.initialize() {
                // Reported through the handshake; the spawner owns the error.
                let _ = ready_tx.send(Err(e));
                return Ok(());
            }
            let _ = ready_tx.send(Ok(()));
            ui.run_loop()
        })
        .with_context(|| format!("failed to spawn UI thread {name:?}"))?;

    match ready_rx.recv_timeout(timeout) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            let _ = join.join();
            return Err(e).context("UI thread failed to initialize");
        }
        Err(_) => {
            // Never blocks on the bootstrap; the UI thread sees the stop when
            // bootstrap returns, shuts the toolkit down, and exits on its own.
            dispatcher.stop();
            log::warn!("UI thread {name:?} not ready after {timeout:?}; abandoning it");
            return Err(DispatchError::StartupTimeout { timeout }.into());
        }
    }

    let remaining = deadline.saturating_duration_since(Instant::now());
    if let Err(e) = dispatcher.wait_until_running(remaining) {
        dispatcher.stop();
        return Err(e.into());
    }
    log::debug!("UI thread {name:?} running");

    Ok(UiThread {
        dispatcher,
        join: Some(join),
    })
}

/// Makes the calling thread the UI thread, runs `setup` on it, then blocks in
/// the dispatcher loop until stopped. Whatever `setup` returns stays alive for
/// the whole loop and is handed back afterwards.
pub fn run_on_current_thread<T>(
    config: DispatcherConfig,
    bootstrap: impl NativeBootstrap + 'static,
    setup: impl FnOnce(&Dispatcher) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    let dispatcher = Dispatcher::new(config, bootstrap);
    dispatcher.initialize()?;
    let state = match setup(&dispatcher) {
        Ok(state) => state,
        Err(e) => {
            dispatcher.stop();
            return Err(e);
        }
    };
    dispatcher.run_loop()?;
    Ok(state)
}
