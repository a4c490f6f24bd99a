use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::thread;

use web_time::Instant;

use crate::display::Display;
use crate::error::{DispatchError, WidgetError};
use crate::event::{Event, EventType};
use crate::listener::{EventDispatch, Listener, ListenerRef, NotifyOutcome};
use crate::registry::NativeHandle;
use crate::typed::{
    DisposeListener, FocusListener, KeyListener, ModifyListener, MouseListener,
    SelectionListener, TypedListener, VerifyListener,
};

/// Base of every managed widget.
///
/// `Rc`-based and therefore pinned to the thread that created it, which is
/// checked to be the display's UI thread. Platform glue attaches the native
/// handle through [`Display::attach_native`] and raises events through
/// [`Widget::notify_listeners`].
#[derive(Clone)]
pub struct Widget(Rc<WidgetInner>);

struct WidgetInner {
    kind: String,
    display: Display,
    handle: Cell<Option<NativeHandle>>,
    events: EventDispatch,
    data: RefCell<Option<Rc<dyn Any>>>,
    keyed_data: RefCell<HashMap<String, Rc<dyn Any>>>,
    disposing: Cell<bool>,
}

impl Widget {
    pub fn new(display: &Display, kind: impl Into<String>) -> Result<Self, WidgetError> {
        let dispatcher = display.dispatcher();
        if !dispatcher.is_ui_thread() {
            return Err(DispatchError::ThreadAffinityViolation {
                expected: dispatcher.ui_thread_id(),
                actual: thread::current().id(),
            }
            .into());
        }
        if display.is_disposed() {
            return Err(WidgetError::Disposed);
        }
        Ok(Self(Rc::new(WidgetInner {
            kind: kind.into(),
            display: display.clone(),
            handle: Cell::new(None),
            events: EventDispatch::new(),
            data: RefCell::new(None),
            keyed_data: RefCell::new(HashMap::new()),
            disposing: Cell::new(false),
        })))
    }

    pub fn kind(&self) -> &str {
        &self.0.kind
    }

    pub fn display(&self) -> &Display {
        &self.0.display
    }

    pub fn handle(&self) -> Option<NativeHandle> {
        self.0.handle.get()
    }

    pub(crate) fn set_handle(&self, handle: Option<NativeHandle>) {
        self.0.handle.set(handle);
    }

    pub fn is_disposed(&self) -> bool {
        self.0.events.is_disposed()
    }

    pub fn ptr_eq(&self, other: &Widget) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn check_widget(&self) -> Result<(), WidgetError> {
        if self.is_disposed() {
            Err(WidgetError::Disposed)
        } else {
            Ok(())
        }
    }

    pub fn add_listener(&self, event_type: EventType, listener: ListenerRef) -> Result<(), WidgetError> {
        self.0.events.add_listener(event_type, listener)
    }

    /// Registers a closure and returns the handle needed to remove it.
    pub fn on(
        &self,
        event_type: EventType,
        f: impl Listener + 'static,
    ) -> Result<ListenerRef, WidgetError> {
        let listener = ListenerRef::new(f);
        self.add_listener(event_type, listener.clone())?;
        Ok(listener)
    }

    pub fn remove_listener(&self, event_type: EventType, listener: &ListenerRef) -> bool {
        self.0.events.remove_listener(event_type, listener)
    }

    pub fn is_listening(&self, event_type: EventType) -> bool {
        self.0.events.hooks(event_type)
    }

    pub fn listeners(&self, event_type: EventType) -> Vec<ListenerRef> {
        self.0.events.listeners(event_type)
    }

    /// Raises `event` on this widget. Stamps `event_type`, `time` (now), and
    /// `widget` unless the glue already set one. A disposed widget notifies
    /// nobody.
    pub fn notify_listeners(&self, event_type: EventType, event: &mut Event) -> NotifyOutcome {
        if event.widget.is_none() {
            event.widget = Some(self.clone());
        }
        event.time = Instant::now();
        self.0.events.notify(event_type, event)
    }

    /// Builds a bare event of `event_type`, raises it, and hands it back so
    /// the caller can inspect `doit`.
    pub fn send(&self, event_type: EventType) -> Event {
        let mut event = Event::new(event_type);
        self.notify_listeners(event_type, &mut event);
        event
    }

    pub fn add_typed_listener(&self, listener: TypedListener) -> Result<(), WidgetError> {
        self.check_widget()?;
        let shared = ListenerRef::new(listener.clone());
        for &event_type in listener.event_types() {
            self.add_listener(event_type, shared.clone())?;
        }
        Ok(())
    }

    pub fn remove_typed_listener(&self, listener: &TypedListener) {
        let target = listener.target();
        for &event_type in listener.event_types() {
            self.0.events.remove_typed(event_type, target);
        }
    }

    pub fn add_selection_listener(&self, l: Rc<dyn SelectionListener>) -> Result<(), WidgetError> {
        self.add_typed_listener(TypedListener::Selection(l))
    }

    pub fn remove_selection_listener(&self, l: &Rc<dyn SelectionListener>) {
        self.remove_typed_listener(&TypedListener::Selection(l.clone()))
    }

    pub fn add_key_listener(&self, l: Rc<dyn KeyListener>) -> Result<(), WidgetError> {
        self.add_typed_listener(TypedListener::Key(l))
    }

    pub fn remove_key_listener(&self, l: &Rc<dyn KeyListener>) {
        self.remove_typed_listener(&TypedListener::Key(l.clone()))
    }

    pub fn add_mouse_listener(&self, l: Rc<dyn MouseListener>) -> Result<(), WidgetError> {
        self.add_typed_listener(TypedListener::Mouse(l))
    }

    pub fn remove_mouse_listener(&self, l: &Rc<dyn MouseListener>) {
        self.remove_typed_listener(&TypedListener::Mouse(l.clone()))
    }

    pub fn add_focus_listener(&self, l: Rc<dyn FocusListener>) -> Result<(), WidgetError> {
        self.add_typed_listener(TypedListener::Focus(l))
    }

    pub fn remove_focus_listener(&self, l: &Rc<dyn FocusListener>) {
        self.remove_typed_listener(&TypedListener::Focus(l.clone()))
    }

    pub fn add_modify_listener(&self, l: Rc<dyn ModifyListener>) -> Result<(), WidgetError> {
        self.add_typed_listener(TypedListener::Modify(l))
    }

    pub fn remove_modify_listener(&self, l: &Rc<dyn ModifyListener>) {
        self.remove_typed_listener(&TypedListener::Modify(l.clone()))
    }

    pub fn add_verify_listener(&self, l: Rc<dyn VerifyListener>) -> Result<(), WidgetError> {
        self.add_typed_listener(TypedListener::Verify(l))
    }

    pub fn remove_verify_listener(&self, l: &Rc<dyn VerifyListener>) {
        self.remove_typed_listener(&TypedListener::Verify(l.clone()))
    }

    pub fn add_dispose_listener(&self, l: Rc<dyn DisposeListener>) -> Result<(), WidgetError> {
        self.add_typed_listener(TypedListener::Dispose(l))
    }

    pub fn remove_dispose_listener(&self, l: &Rc<dyn DisposeListener>) {
        self.remove_typed_listener(&TypedListener::Dispose(l.clone()))
    }

    pub fn set_data(&self, data: Option<Rc<dyn Any>>) -> Result<(), WidgetError> {
        self.check_widget()?;
        *self.0.data.borrow_mut() = data;
        Ok(())
    }

    pub fn data(&self) -> Option<Rc<dyn Any>> {
        self.0.data.borrow().clone()
    }

    pub fn set_data_keyed(
        &self,
        key: impl Into<String>,
        value: Option<Rc<dyn Any>>,
    ) -> Result<(), WidgetError> {
        self.check_widget()?;
        let key = key.into();
        let previous = match value {
            Some(v) => self.0.keyed_data.borrow_mut().insert(key, v),
            None => self.0.keyed_data.borrow_mut().remove(&key),
        };
        drop(previous);
        Ok(())
    }

    pub fn data_keyed(&self, key: &str) -> Option<Rc<dyn Any>> {
        self.0.keyed_data.borrow().get(key).cloned()
    }

    /// Sends `Dispose` to listeners, unregisters the native handle, then
    /// releases every listener and data slot. Idempotent; reentrant calls
    /// from a `Dispose` listener are ignored.
    pub fn dispose(&self) {
        if self.is_disposed() || self.0.disposing.replace(true) {
            return;
        }
        self.send(EventType::Dispose);

        if let Some(handle) = self.0.handle.take() {
            let released = self.0.display.registry().unregister(handle);
            drop(released);
        }
        self.0.events.dispose();
        let data = self.0.data.borrow_mut().take();
        let keyed = std::mem::take(&mut *self.0.keyed_data.borrow_mut());
        drop((data, keyed));
        log::debug!("disposed {} widget", self.0.kind);
    }
}

impl fmt::Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Widget")
            .field("kind", &self.0.kind)
            .field("handle", &self.0.handle.get())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
