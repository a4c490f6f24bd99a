use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::thread;

use crate::dispatcher::Dispatcher;
use crate::error::{DispatchError, WidgetError};
use crate::event::{Event, EventType};
use crate::registry::{HandleRegistry, NativeHandle};
use crate::widget::Widget;

/// UI-thread side of a running toolkit: the dispatcher plus the registry that
/// maps native handles back to widgets.
///
/// Native callback trampolines should go through [`Display::route`] rather
/// than capture widgets directly:
///
/// ```rust
/// use tether_core::*;
///
/// let dispatcher = Dispatcher::headless();
/// dispatcher.initialize().unwrap();
/// let display = Display::new(dispatcher).unwrap();
///
/// let button = Widget::new(&display, "Button").unwrap();
/// display.attach_native(&button, NativeHandle::from_raw(0x1000)).unwrap();
/// button.on(EventType::Selection, |e: &mut Event| e.doit = false).unwrap();
///
/// // What a WM_COMMAND / "clicked" / target-action trampoline does:
/// let event = display
///     .route(NativeHandle::from_raw(0x1000), EventType::Selection, Event::new(EventType::Selection))
///     .unwrap();
/// assert!(event.is_cancelled());
/// display.dispose();
/// ```
#[derive(Clone)]
pub struct Display(Rc<DisplayInner>);

struct DisplayInner {
    dispatcher: Dispatcher,
    registry: HandleRegistry<Widget>,
    disposed: Cell<bool>,
}

impl Display {
    /// Must be called on the dispatcher's UI thread.
    pub fn new(dispatcher: Dispatcher) -> Result<Self, DispatchError> {
        if dispatcher.ui_thread_id().is_none() {
            return Err(DispatchError::NotInitialized {
                state: dispatcher.state(),
            });
        }
        if !dispatcher.is_ui_thread() {
            return Err(DispatchError::ThreadAffinityViolation {
                expected: dispatcher.ui_thread_id(),
                actual: thread::current().id(),
            });
        }
        Ok(Self(Rc::new(DisplayInner {
            dispatcher,
            registry: HandleRegistry::new(),
            disposed: Cell::new(false),
        })))
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.0.dispatcher
    }

    pub fn registry(&self) -> &HandleRegistry<Widget> {
        &self.0.registry
    }

    pub fn is_disposed(&self) -> bool {
        self.0.disposed.get()
    }

    /// Binds a freshly created native control to its widget. Call right after
    /// native creation, before the control can emit its first notification.
    /// Rebinding releases the old handle only once the new one is registered.
    pub fn attach_native(&self, widget: &Widget, handle: NativeHandle) -> Result<(), WidgetError> {
        if widget.is_disposed() {
            return Err(WidgetError::Disposed);
        }
        let previous = widget.handle();
        if previous == Some(handle) {
            return Ok(());
        }
        // A failed register leaves the existing binding untouched.
        self.0.registry.register(handle, widget.clone())?;
        if let Some(previous) = previous {
            self.0.registry.unregister(previous);
        }
        widget.set_handle(Some(handle));
        Ok(())
    }

    /// Unbinds the widget's native handle; call before or during native destruction.
    pub fn detach_native(&self, widget: &Widget) -> Option<NativeHandle> {
        let handle = widget.handle()?;
        widget.set_handle(None);
        self.0.registry.unregister(handle);
        Some(handle)
    }

    pub fn find_widget(&self, handle: NativeHandle) -> Option<Widget> {
        self.0.registry.try_resolve(handle)
    }

    /// Generic native callback trampoline: resolve the owner of `handle` and
    /// raise `event` on it. An unknown handle (callback before registration or
    /// after disposal) is a no-op returning `None`.
    pub fn route(&self, handle: NativeHandle, event_type: EventType, mut event: Event) -> Option<Event> {
        let Some(widget) = self.find_widget(handle) else {
            log::debug!("{event_type:?} for unregistered native handle {handle}; ignored");
            return None;
        };
        widget.notify_listeners(event_type, &mut event);
        Some(event)
    }

    pub fn sync_exec<F, R>(&self, f: F) -> Result<R, DispatchError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.0.dispatcher.invoke(f)
    }

    pub fn async_exec<F>(&self, f: F) -> Result<(), DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.0.dispatcher.invoke_async(f)
    }

    /// Disposes every widget that still owns a native handle. Idempotent.
    pub fn dispose(&self) {
        if self.0.disposed.replace(true) {
            return;
        }
        let widgets = self.0.registry.drain();
        log::debug!("display disposing {} widgets", widgets.len());
        for (_, widget) in widgets {
            widget.set_handle(None);
            widget.dispose();
        }
    }
}

impl fmt::Debug for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Display")
            .field("dispatcher", &self.0.dispatcher)
            .field("widgets", &self.0.registry.len())
            .field("disposed", &self.0.disposed.get())
            .finish()
    }
}
