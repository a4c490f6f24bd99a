//! Typed listener interfaces and the adapter that plugs them into the
//! untyped [`EventTable`](crate::listener::EventTable).
//!
//! ```rust
//! use std::rc::Rc;
//! use tether_core::*;
//!
//! struct OnlyWhenShiftHeld;
//! impl SelectionListener for OnlyWhenShiftHeld {
//!     fn widget_selected(&self, e: &mut SelectionEvent) {
//!         e.doit = e.state_mask.contains(StateMask::SHIFT);
//!     }
//! }
//!
//! let adapter = TypedListener::Selection(Rc::new(OnlyWhenShiftHeld));
//! assert_eq!(adapter.event_types(), &[EventType::Selection, EventType::DefaultSelection]);
//! ```

use std::rc::Rc;

use web_time::Instant;

use crate::event::{Event, EventType, StateMask};
use crate::listener::Listener;
use crate::widget::Widget;

#[derive(Clone, Debug)]
pub struct SelectionEvent {
    pub widget: Option<Widget>,
    pub time: Instant,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub detail: i32,
    pub state_mask: StateMask,
    pub text: String,
    pub doit: bool,
}

impl From<&Event> for SelectionEvent {
    fn from(e: &Event) -> Self {
        Self {
            widget: e.widget.clone(),
            time: e.time,
            x: e.x,
            y: e.y,
            width: e.width,
            height: e.height,
            detail: e.detail,
            state_mask: e.state_mask,
            text: e.text.clone(),
            doit: e.doit,
        }
    }
}

#[derive(Clone, Debug)]
pub struct KeyEvent {
    pub widget: Option<Widget>,
    pub time: Instant,
    pub character: Option<char>,
    pub key_code: u32,
    pub state_mask: StateMask,
    pub doit: bool,
}

impl From<&Event> for KeyEvent {
    fn from(e: &Event) -> Self {
        Self {
            widget: e.widget.clone(),
            time: e.time,
            character: e.character,
            key_code: e.key_code,
            state_mask: e.state_mask,
            doit: e.doit,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MouseEvent {
    pub widget: Option<Widget>,
    pub time: Instant,
    pub x: i32,
    pub y: i32,
    pub button: u32,
    pub count: i32,
    pub state_mask: StateMask,
}

impl From<&Event> for MouseEvent {
    fn from(e: &Event) -> Self {
        Self {
            widget: e.widget.clone(),
            time: e.time,
            x: e.x,
            y: e.y,
            button: e.button,
            count: e.count,
            state_mask: e.state_mask,
        }
    }
}

/// Focus, modify, and dispose notifications carry no payload.
#[derive(Clone, Debug)]
pub struct WidgetEvent {
    pub widget: Option<Widget>,
    pub time: Instant,
}

impl From<&Event> for WidgetEvent {
    fn from(e: &Event) -> Self {
        Self {
            widget: e.widget.clone(),
            time: e.time,
        }
    }
}

pub type FocusEvent = WidgetEvent;
pub type ModifyEvent = WidgetEvent;
pub type DisposeEvent = WidgetEvent;

/// A pending text change. Listeners may rewrite `text` or veto with `doit`.
#[derive(Clone, Debug)]
pub struct VerifyEvent {
    pub widget: Option<Widget>,
    pub time: Instant,
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub character: Option<char>,
    pub key_code: u32,
    pub state_mask: StateMask,
    pub doit: bool,
}

impl From<&Event> for VerifyEvent {
    fn from(e: &Event) -> Self {
        Self {
            widget: e.widget.clone(),
            time: e.time,
            start: e.start,
            end: e.end,
            text: e.text.clone(),
            character: e.character,
            key_code: e.key_code,
            state_mask: e.state_mask,
            doit: e.doit,
        }
    }
}

pub trait SelectionListener {
    fn widget_selected(&self, event: &mut SelectionEvent);

    fn widget_default_selected(&self, _event: &mut SelectionEvent) {}
}

pub trait KeyListener {
    fn key_pressed(&self, event: &mut KeyEvent);

    fn key_released(&self, _event: &mut KeyEvent) {}
}

pub trait MouseListener {
    fn mouse_down(&self, _event: &MouseEvent) {}
    fn mouse_up(&self, _event: &MouseEvent) {}
    fn mouse_double_click(&self, _event: &MouseEvent) {}
}

pub trait FocusListener {
    fn focus_gained(&self, _event: &FocusEvent) {}
    fn focus_lost(&self, _event: &FocusEvent) {}
}

pub trait ModifyListener {
    fn modify_text(&self, event: &ModifyEvent);
}

pub trait VerifyListener {
    fn verify_text(&self, event: &mut VerifyEvent);
}

pub trait DisposeListener {
    fn widget_disposed(&self, event: &DisposeEvent);
}

/// Adapts one typed listener to the untyped table. The same adapter is
/// registered once per event type it covers.
#[derive(Clone)]
pub enum TypedListener {
    Selection(Rc<dyn SelectionListener>),
    Key(Rc<dyn KeyListener>),
    Mouse(Rc<dyn MouseListener>),
    Focus(Rc<dyn FocusListener>),
    Modify(Rc<dyn ModifyListener>),
    Verify(Rc<dyn VerifyListener>),
    Dispose(Rc<dyn DisposeListener>),
}

impl TypedListener {
    pub fn event_types(&self) -> &'static [EventType] {
        match self {
            TypedListener::Selection(_) => &[EventType::Selection, EventType::DefaultSelection],
            TypedListener::Key(_) => &[EventType::KeyDown, EventType::KeyUp],
            TypedListener::Mouse(_) => &[
                EventType::MouseDown,
                EventType::MouseUp,
                EventType::MouseDoubleClick,
            ],
            TypedListener::Focus(_) => &[EventType::FocusIn, EventType::FocusOut],
            TypedListener::Modify(_) => &[EventType::Modify],
            TypedListener::Verify(_) => &[EventType::Verify],
            TypedListener::Dispose(_) => &[EventType::Dispose],
        }
    }

    /// Address of the wrapped listener; two adapters over the same `Rc` share it.
    pub fn target(&self) -> *const () {
        match self {
            TypedListener::Selection(l) => Rc::as_ptr(l) as *const (),
            TypedListener::Key(l) => Rc::as_ptr(l) as *const (),
            TypedListener::Mouse(l) => Rc::as_ptr(l) as *const (),
            TypedListener::Focus(l) => Rc::as_ptr(l) as *const (),
            TypedListener::Modify(l) => Rc::as_ptr(l) as *const (),
            TypedListener::Verify(l) => Rc::as_ptr(l) as *const (),
            TypedListener::Dispose(l) => Rc::as_ptr(l) as *const (),
        }
    }
}

impl Listener for TypedListener {
    fn handle_event(&self, e: &mut Event) {
        match (self, e.event_type) {
            (TypedListener::Selection(l), EventType::Selection) => {
                let mut typed = SelectionEvent::from(&*e);
                l.widget_selected(&mut typed);
                e.doit = typed.doit;
            }
            (TypedListener::Selection(l), EventType::DefaultSelection) => {
                let mut typed = SelectionEvent::from(&*e);
                l.widget_default_selected(&mut typed);
                e.doit = typed.doit;
            }
            (TypedListener::Key(l), EventType::KeyDown) => {
                let mut typed = KeyEvent::from(&*e);
                l.key_pressed(&mut typed);
                e.doit = typed.doit;
            }
            (TypedListener::Key(l), EventType::KeyUp) => {
                let mut typed = KeyEvent::from(&*e);
                l.key_released(&mut typed);
                e.doit = typed.doit;
            }
            (TypedListener::Mouse(l), EventType::MouseDown) => l.mouse_down(&MouseEvent::from(&*e)),
            (TypedListener::Mouse(l), EventType::MouseUp) => l.mouse_up(&MouseEvent::from(&*e)),
            (TypedListener::Mouse(l), EventType::MouseDoubleClick) => {
                l.mouse_double_click(&MouseEvent::from(&*e))
            }
            (TypedListener::Focus(l), EventType::FocusIn) => l.focus_gained(&WidgetEvent::from(&*e)),
            (TypedListener::Focus(l), EventType::FocusOut) => l.focus_lost(&WidgetEvent::from(&*e)),
            (TypedListener::Modify(l), EventType::Modify) => l.modify_text(&WidgetEvent::from(&*e)),
            (TypedListener::Verify(l), EventType::Verify) => {
                let mut typed = VerifyEvent::from(&*e);
                l.verify_text(&mut typed);
                e.text = typed.text;
                e.doit = typed.doit;
            }
            (TypedListener::Dispose(l), EventType::Dispose) => {
                l.widget_disposed(&WidgetEvent::from(&*e))
            }
            (_, other) => log::debug!("typed listener ignores {other:?}"),
        }
    }

    fn typed_target(&self) -> Option<*const ()> {
        Some(self.target())
    }
}
