// Combotype Manual Event Source
// Programmatic event injection for embedding and tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::SourceError;
use crate::hook::{EventSource, HookDecision, KeyHandler, MouseHandler};
use crate::{KeyStroke, MouseEvent};

#[derive(Default)]
struct Slots {
    keyboard: RwLock<Option<KeyHandler>>,
    mouse: RwLock<Option<MouseHandler>>,
    refuse_keyboard: AtomicBool,
    refuse_mouse: AtomicBool,
}

/// Event source driven by the caller.
///
/// Clones share the installed handlers, so one clone can be given to an
/// [`InputHook`](crate::hook::InputHook) while another injects events.
#[derive(Clone, Default)]
pub struct ManualSource {
    slots: Arc<Slots>,
}

impl ManualSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a key-down event. `None` when no keyboard handler is installed.
    pub fn key(&self, stroke: KeyStroke) -> Option<HookDecision> {
        // Call outside the lock so uninstalling never waits on a callback
        let handler = self.slots.keyboard.read().clone();
        handler.map(|handler| handler(stroke))
    }

    /// Deliver a mouse event. `None` when no mouse handler is installed.
    pub fn mouse(&self, event: MouseEvent) -> Option<HookDecision> {
        let handler = self.slots.mouse.read().clone();
        handler.map(|handler| handler(event))
    }

    /// Make keyboard installation fail
    pub fn fail_keyboard(&self, fail: bool) {
        self.slots.refuse_keyboard.store(fail, Ordering::Relaxed);
    }

    /// Make mouse installation fail
    pub fn fail_mouse(&self, fail: bool) {
        self.slots.refuse_mouse.store(fail, Ordering::Relaxed);
    }

    pub fn keyboard_installed(&self) -> bool {
        self.slots.keyboard.read().is_some()
    }

    pub fn mouse_installed(&self) -> bool {
        self.slots.mouse.read().is_some()
    }
}

impl EventSource for ManualSource {
    fn install_keyboard(&mut self, handler: KeyHandler) -> Result<(), SourceError> {
        if self.slots.refuse_keyboard.load(Ordering::Relaxed) {
            return Err(SourceError::Install("keyboard hook refused".to_string()));
        }
        let mut slot = self.slots.keyboard.write();
        if slot.is_some() {
            return Err(SourceError::AlreadyInstalled);
        }
        *slot = Some(handler);
        Ok(())
    }

    fn install_mouse(&mut self, handler: MouseHandler) -> Result<(), SourceError> {
        if self.slots.refuse_mouse.load(Ordering::Relaxed) {
            return Err(SourceError::Install("mouse hook refused".to_string()));
        }
        let mut slot = self.slots.mouse.write();
        if slot.is_some() {
            return Err(SourceError::AlreadyInstalled);
        }
        *slot = Some(handler);
        Ok(())
    }

    fn uninstall_keyboard(&mut self) {
        self.slots.keyboard.write().take();
    }

    fn uninstall_mouse(&mut self) {
        self.slots.mouse.write().take();
    }
}
