pub use crate::bootstrap::{BootstrapError, Headless, NativeBootstrap};
pub use crate::config::DispatcherConfig;
pub use crate::dispatcher::{Dispatcher, DispatcherState, DispatcherStats};
pub use crate::display::Display;
pub use crate::error::*;
pub use crate::event::{Event, EventType, StateMask};
pub use crate::listener::{EventDispatch, Listener, ListenerRef, NotifyOutcome};
pub use crate::registry::{HandleRegistry, NativeHandle};
pub use crate::report::{ErrorOrigin, ErrorReport, capture_errors};
pub use crate::typed::{
    DisposeEvent, DisposeListener, FocusEvent, FocusListener, KeyEvent, KeyListener,
    ModifyEvent, ModifyListener, MouseEvent, MouseListener, SelectionEvent, SelectionListener,
    TypedListener, VerifyEvent, VerifyListener,
};
pub use crate::widget::Widget;
