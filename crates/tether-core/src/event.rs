use web_time::Instant;

use crate::widget::Widget;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    KeyDown,
    KeyUp,
    MouseDown,
    MouseUp,
    MouseMove,
    MouseEnter,
    MouseExit,
    MouseDoubleClick,
    MouseHover,
    MouseWheel,
    Paint,
    Move,
    Resize,
    Dispose,
    Selection,
    DefaultSelection,
    FocusIn,
    FocusOut,
    Expand,
    Collapse,
    Iconify,
    Deiconify,
    Close,
    Show,
    Hide,
    Modify,
    Verify,
    Activate,
    Deactivate,
    Help,
    DragDetect,
    Arm,
    Traverse,
    MenuDetect,
    Settings,
    Gesture,
    Touch,
    /// Application-defined event kinds.
    Custom(u32),
}

impl EventType {
    /// Kinds whose `doit` flag is consulted by the originating native path.
    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            EventType::KeyDown
                | EventType::KeyUp
                | EventType::Verify
                | EventType::Traverse
                | EventType::Close
                | EventType::MenuDetect
                | EventType::DragDetect
                | EventType::Selection
                | EventType::Gesture
        )
    }
}

bitflags::bitflags! {
    /// Modifier keys and mouse buttons held while the event happened.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct StateMask: u32 {
        const SHIFT   = 1 << 0;
        const CTRL    = 1 << 1;
        const ALT     = 1 << 2;
        /// Cmd on macOS, Win key elsewhere.
        const COMMAND = 1 << 3;
        const BUTTON1 = 1 << 8;
        const BUTTON2 = 1 << 9;
        const BUTTON3 = 1 << 10;
    }
}

impl StateMask {
    pub const MODIFIERS: StateMask = StateMask::SHIFT
        .union(StateMask::CTRL)
        .union(StateMask::ALT)
        .union(StateMask::COMMAND);
    pub const BUTTONS: StateMask = StateMask::BUTTON1
        .union(StateMask::BUTTON2)
        .union(StateMask::BUTTON3);
}

/// One occurrence of an event, built by platform glue right before dispatch.
///
/// Every listener in a pass sees the same record. Listeners may write back
/// through `doit` (and `text` for `Verify`); nothing else is expected to change
/// mid-dispatch.
#[derive(Clone, Debug)]
pub struct Event {
    pub event_type: EventType,
    pub widget: Option<Widget>,
    pub time: Instant,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub button: u32,
    pub count: i32,
    pub state_mask: StateMask,
    pub character: Option<char>,
    pub key_code: u32,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub detail: i32,
    /// Cleared by a listener to veto a cancellable event. Dispatch does not stop.
    pub doit: bool,
}

impl Event {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            widget: None,
            time: Instant::now(),
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            button: 0,
            count: 0,
            state_mask: StateMask::empty(),
            character: None,
            key_code: 0,
            text: String::new(),
            start: 0,
            end: 0,
            detail: 0,
            doit: true,
        }
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn bounds(mut self, x: i32, y: i32, width: i32, height: i32) -> Self {
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self
    }

    pub fn button(mut self, button: u32, count: i32) -> Self {
        self.button = button;
        self.count = count;
        self
    }

    pub fn key(mut self, key_code: u32, character: Option<char>) -> Self {
        self.key_code = key_code;
        self.character = character;
        self
    }

    pub fn state(mut self, mask: StateMask) -> Self {
        self.state_mask = mask;
        self
    }

    /// Replacement text for the range `start..end` (Verify/Modify).
    pub fn text_change(mut self, text: impl Into<String>, start: usize, end: usize) -> Self {
        self.text = text.into();
        self.start = start;
        self.end = end;
        self
    }

    pub fn detail(mut self, detail: i32) -> Self {
        self.detail = detail;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        !self.doit
    }
}
