//! Per-widget listener tables and the notify algorithm.
//!
//! `notify` copies the listener list for the event type before calling
//! anything. A listener that adds or removes listeners (itself included) while
//! running cannot disturb the pass in flight: nothing is skipped or repeated,
//! and listeners added mid-pass first run on the next notification.
//!
//! Each listener call is isolated with `catch_unwind`. A panicking listener is
//! reported to the error channel ([`crate::report`]) and the pass continues.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use smallvec::SmallVec;

use crate::error::{WidgetError, panic_message};
use crate::event::{Event, EventType};
use crate::report::{ErrorOrigin, ErrorReport, report_error};

pub trait Listener {
    fn handle_event(&self, event: &mut Event);

    /// Identity of the typed listener this adapts, if any.
    fn typed_target(&self) -> Option<*const ()> {
        None
    }
}

impl<F: Fn(&mut Event)> Listener for F {
    fn handle_event(&self, event: &mut Event) {
        self(event)
    }
}

/// Shared handle to a listener. Identity (for removal) is the allocation.
#[derive(Clone)]
pub struct ListenerRef(Rc<dyn Listener>);

impl ListenerRef {
    pub fn new(listener: impl Listener + 'static) -> Self {
        Self(Rc::new(listener))
    }

    pub fn from_rc(listener: Rc<dyn Listener>) -> Self {
        Self(listener)
    }

    pub fn ptr_eq(&self, other: &ListenerRef) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }

    pub fn handle_event(&self, event: &mut Event) {
        self.0.handle_event(event)
    }

    pub fn typed_target(&self) -> Option<*const ()> {
        self.0.typed_target()
    }
}

impl fmt::Debug for ListenerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerRef({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

type Slot = SmallVec<[ListenerRef; 4]>;

/// Event type -> listeners, in registration order.
#[derive(Default)]
pub struct EventTable {
    slots: HashMap<EventType, Slot>,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, event_type: EventType, listener: ListenerRef) {
        self.slots.entry(event_type).or_default().push(listener);
    }

    /// Removes and returns the first registration of `listener`.
    pub fn remove(&mut self, event_type: EventType, listener: &ListenerRef) -> Option<ListenerRef> {
        self.remove_first(event_type, |l| l.ptr_eq(listener))
    }

    /// Removes and returns the first adapter wrapping the typed listener at `target`.
    pub fn remove_typed(&mut self, event_type: EventType, target: *const ()) -> Option<ListenerRef> {
        self.remove_first(event_type, |l| {
            l.typed_target().is_some_and(|t| std::ptr::eq(t, target))
        })
    }

    fn remove_first(
        &mut self,
        event_type: EventType,
        matches: impl Fn(&ListenerRef) -> bool,
    ) -> Option<ListenerRef> {
        let slot = self.slots.get_mut(&event_type)?;
        let index = slot.iter().position(matches)?;
        let removed = slot.remove(index);
        if slot.is_empty() {
            self.slots.remove(&event_type);
        }
        Some(removed)
    }

    pub fn hooks(&self, event_type: EventType) -> bool {
        self.slots.get(&event_type).is_some_and(|s| !s.is_empty())
    }

    pub fn listeners(&self, event_type: EventType) -> Vec<ListenerRef> {
        self.snapshot(event_type).into_vec()
    }

    fn snapshot(&self, event_type: EventType) -> Slot {
        self.slots.get(&event_type).cloned().unwrap_or_default()
    }

    /// Total registrations across all event types.
    pub fn len(&self) -> usize {
        self.slots.values().map(SmallVec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NotifyOutcome {
    /// Listeners called, including the ones that panicked.
    pub invoked: usize,
    pub failed: usize,
}

/// The event core owned by each widget: a lazily created [`EventTable`] plus
/// the disposed flag that closes it for good.
///
/// Confined to the UI thread, so interior mutability is a `RefCell`. The table
/// is never borrowed while a listener runs.
#[derive(Default)]
pub struct EventDispatch {
    table: RefCell<Option<EventTable>>,
    disposed: Cell<bool>,
}

impl EventDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub fn add_listener(
        &self,
        event_type: EventType,
        listener: ListenerRef,
    ) -> Result<(), WidgetError> {
        if self.disposed.get() {
            return Err(WidgetError::Disposed);
        }
        self.table
            .borrow_mut()
            .get_or_insert_with(EventTable::new)
            .add(event_type, listener);
        Ok(())
    }

    /// Removes the first matching registration; `false` if there was none.
    pub fn remove_listener(&self, event_type: EventType, listener: &ListenerRef) -> bool {
        // The removed listener is dropped after the borrow is released.
        let removed = self
            .table
            .borrow_mut()
            .as_mut()
            .and_then(|t| t.remove(event_type, listener));
        removed.is_some()
    }

    pub fn remove_typed(&self, event_type: EventType, target: *const ()) -> bool {
        let removed = self
            .table
            .borrow_mut()
            .as_mut()
            .and_then(|t| t.remove_typed(event_type, target));
        removed.is_some()
    }

    pub fn hooks(&self, event_type: EventType) -> bool {
        self.table
            .borrow()
            .as_ref()
            .is_some_and(|t| t.hooks(event_type))
    }

    pub fn listeners(&self, event_type: EventType) -> Vec<ListenerRef> {
        self.table
            .borrow()
            .as_ref()
            .map(|t| t.listeners(event_type))
            .unwrap_or_default()
    }

    pub fn listener_count(&self) -> usize {
        self.table.borrow().as_ref().map_or(0, EventTable::len)
    }

    /// Delivers `event` to every listener registered for `event_type` at the
    /// moment of the call. Never panics because a listener did.
    ///
    /// For cancellable kinds the caller reads `event.doit` afterwards; a veto
    /// does not cut the pass short.
    pub fn notify(&self, event_type: EventType, event: &mut Event) -> NotifyOutcome {
        event.event_type = event_type;
        let snapshot = match self.table.borrow().as_ref() {
            Some(table) => table.snapshot(event_type),
            None => return NotifyOutcome::default(),
        };

        let mut outcome = NotifyOutcome::default();
        for listener in &snapshot {
            outcome.invoked += 1;
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener.handle_event(event))) {
                outcome.failed += 1;
                report_error(ErrorReport {
                    origin: ErrorOrigin::Listener { event_type },
                    message: panic_message(&*payload),
                });
            }
        }
        outcome
    }

    /// Drops every listener and refuses new ones. Idempotent.
    pub fn dispose(&self) {
        self.disposed.set(true);
        // Listener destructors run after the borrow is released.
        let released = self.table.borrow_mut().take();
        drop(released);
    }
}

impl fmt::Debug for EventDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatch")
            .field("listeners", &self.listener_count())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}
