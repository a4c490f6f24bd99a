//! # UI thread, native handles, and events
//!
//! Native toolkits (Win32, GTK, AppKit) are single-threaded and call back
//! into application code from their own event sources. Tether's core gives
//! widget bindings three pieces to build on:
//!
//! - [`Dispatcher`] owns the logical UI thread and runs work submitted from
//!   any thread on it, blocking (`invoke`) or fire-and-forget (`invoke_async`).
//! - [`HandleRegistry`] maps a native handle back to its managed owner, so a
//!   callback trampoline can find "which widget is this" without capturing it.
//! - [`EventDispatch`] is the per-widget listener table with a
//!   snapshot-then-iterate `notify` that isolates panicking listeners.
//!
//! [`Widget`] and [`Display`] tie them together the way bindings use them.
//!
//! ## Hopping threads
//!
//! ```rust
//! use std::thread;
//! use tether_core::*;
//!
//! let ui = Dispatcher::headless();
//! let worker_side = ui.clone();
//!
//! let ui_thread = thread::spawn(move || {
//!     ui.initialize().unwrap();
//!     ui.run_loop().unwrap();
//! });
//!
//! worker_side.wait_until_running(std::time::Duration::from_secs(5)).unwrap();
//! let on_ui = worker_side.invoke(|| Dispatcher::current().is_some()).unwrap();
//! assert!(on_ui);
//!
//! worker_side.stop();
//! ui_thread.join().unwrap();
//! ```
//!
//! ## Listener isolation
//!
//! A listener that panics is reported on the error channel ([`report`]) and
//! the remaining listeners still run. `notify` itself never propagates a
//! listener's failure to the code that raised the event.

pub mod bootstrap;
pub mod config;
pub mod dispatcher;
pub mod display;
pub mod error;
pub mod event;
pub mod listener;
pub mod prelude;
pub mod registry;
pub mod report;
pub mod typed;
pub mod widget;

pub use bootstrap::*;
pub use config::*;
pub use dispatcher::*;
pub use display::*;
pub use error::*;
pub use event::*;
pub use listener::*;
pub use registry::*;
pub use report::*;
pub use typed::*;
pub use widget::*;
