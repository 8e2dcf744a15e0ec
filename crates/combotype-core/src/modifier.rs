// Combotype Modifier Snapshot
// Left/right modifier and lock key state captured at the moment of a key press

use bitflags::bitflags;

use crate::Key;

bitflags! {
    /// State of the modifier and lock keys relevant to text production.
    ///
    /// Left and right variants are kept apart because layouts treat them
    /// differently (right Alt is AltGr on international layouts).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const LEFT_SHIFT = 1 << 0;
        const RIGHT_SHIFT = 1 << 1;
        const LEFT_CTRL = 1 << 2;
        const RIGHT_CTRL = 1 << 3;
        const LEFT_ALT = 1 << 4;
        const RIGHT_ALT = 1 << 5;
        const LEFT_META = 1 << 6;
        const RIGHT_META = 1 << 7;
        const CAPS_LOCK = 1 << 8;

        const SHIFT = Self::LEFT_SHIFT.bits() | Self::RIGHT_SHIFT.bits();
        const CTRL = Self::LEFT_CTRL.bits() | Self::RIGHT_CTRL.bits();
        const ALT = Self::LEFT_ALT.bits() | Self::RIGHT_ALT.bits();
        const META = Self::LEFT_META.bits() | Self::RIGHT_META.bits();
    }
}

impl Modifiers {
    /// Either shift key is held
    pub fn shift(self) -> bool {
        self.intersects(Self::SHIFT)
    }

    /// Either control key is held
    pub fn ctrl(self) -> bool {
        self.intersects(Self::CTRL)
    }

    /// Either alt key is held
    pub fn alt(self) -> bool {
        self.intersects(Self::ALT)
    }

    /// Either logo key is held
    pub fn meta(self) -> bool {
        self.intersects(Self::META)
    }

    pub fn caps_lock(self) -> bool {
        self.contains(Self::CAPS_LOCK)
    }

    /// The modifier flag a physical key maps to, if any.
    ///
    /// Caps Lock is excluded: it is a toggle, not a held modifier.
    pub fn from_key(key: Key) -> Option<Self> {
        let flag = match key {
            Key::LEFT_SHIFT => Self::LEFT_SHIFT,
            Key::RIGHT_SHIFT => Self::RIGHT_SHIFT,
            Key::LEFT_CTRL => Self::LEFT_CTRL,
            Key::RIGHT_CTRL => Self::RIGHT_CTRL,
            Key::LEFT_ALT => Self::LEFT_ALT,
            Key::RIGHT_ALT => Self::RIGHT_ALT,
            Key::LEFT_META => Self::LEFT_META,
            Key::RIGHT_META => Self::RIGHT_META,
            _ => return None,
        };
        Some(flag)
    }
}

/// Tracks held modifiers from a raw press/release stream.
///
/// Passive event sources see key events before any application has
/// interpreted them, so the modifier state has to be rebuilt locally
/// instead of queried from the system.
#[derive(Debug, Clone, Default)]
pub struct ModifierTracker {
    state: Modifiers,
}

impl ModifierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with Caps Lock already engaged (e.g. read from the keyboard LED).
    pub fn with_caps_lock(mut self, on: bool) -> Self {
        self.state.set(Modifiers::CAPS_LOCK, on);
        self
    }

    /// Apply a key event. `value` follows evdev: 0 release, 1 press, 2 repeat.
    pub fn update(&mut self, key: Key, value: i32) {
        if key == Key::CAPSLOCK {
            if value == 1 {
                self.state.toggle(Modifiers::CAPS_LOCK);
            }
            return;
        }

        if let Some(flag) = Modifiers::from_key(key) {
            match value {
                0 => self.state.remove(flag),
                1 | 2 => self.state.insert(flag),
                _ => {}
            }
        }
    }

    /// Snapshot of the current state
    pub fn snapshot(&self) -> Modifiers {
        self.state
    }

    /// Forget held keys, keeping the Caps Lock toggle.
    pub fn release_all(&mut self) {
        self.state &= Modifiers::CAPS_LOCK;
    }
}
