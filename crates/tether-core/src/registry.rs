use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;

use crate::error::RegistryError;

/// Opaque, pointer-sized identifier of a native control (HWND, GtkWidget*, NSView*).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NativeHandle(usize);

impl NativeHandle {
    pub const NULL: NativeHandle = NativeHandle(0);

    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }

    pub const fn as_raw(self) -> usize {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Maps native handles back to the managed objects that own them, so a
/// native callback trampoline can find its widget without closing over it.
///
/// Mutation is internally synchronized: registration may race unregistration
/// from different threads. Values are cloned out on lookup, so `W` is usually
/// a cheap reference type (`Rc`, `Arc`, a widget handle).
pub struct HandleRegistry<W> {
    map: RwLock<HashMap<NativeHandle, W>>,
}

impl<W> Default for HandleRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> HandleRegistry<W> {
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    /// Fails on a live duplicate; silently overwriting would misroute every
    /// later callback for that handle.
    pub fn register(&self, handle: NativeHandle, owner: W) -> Result<(), RegistryError> {
        if handle.is_null() {
            return Err(RegistryError::NullHandle);
        }
        let mut map = self.map.write();
        if map.contains_key(&handle) {
            log::warn!("native handle {handle} registered twice without unregister");
            return Err(RegistryError::DuplicateHandle(handle));
        }
        map.insert(handle, owner);
        Ok(())
    }

    /// Removes the entry if present. Absent handles are not an error: disposal
    /// may race a native destruction that already cleaned up.
    pub fn unregister(&self, handle: NativeHandle) -> Option<W> {
        self.map.write().remove(&handle)
    }

    pub fn contains(&self, handle: NativeHandle) -> bool {
        self.map.read().contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    pub fn handles(&self) -> Vec<NativeHandle> {
        let mut handles: Vec<_> = self.map.read().keys().copied().collect();
        handles.sort_unstable();
        handles
    }

    /// Empties the registry, handing back every entry (display shutdown).
    pub fn drain(&self) -> Vec<(NativeHandle, W)> {
        let mut entries: Vec<_> = std::mem::take(&mut *self.map.write()).into_iter().collect();
        entries.sort_unstable_by_key(|(h, _)| *h);
        entries
    }
}

impl<W: Clone> HandleRegistry<W> {
    pub fn try_resolve(&self, handle: NativeHandle) -> Option<W> {
        self.map.read().get(&handle).cloned()
    }
}

impl<W> fmt::Debug for HandleRegistry<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("len", &self.len())
            .finish()
    }
}
