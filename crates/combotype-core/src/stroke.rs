// Combotype Raw Input Values
// Key strokes and mouse events as delivered by an event source

use std::fmt;

use crate::modifier::Modifiers;

/// One physical key press, captured by the event source.
///
/// The meaning of `virtual_key` belongs to the platform that produced it
/// (a Linux input code for evdev, a virtual-key code on Windows); only the
/// matching layout resolver interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyStroke {
    virtual_key: u32,
    scan_code: u32,
    modifiers: Modifiers,
}

impl KeyStroke {
    pub fn new(virtual_key: u32, scan_code: u32, modifiers: Modifiers) -> Self {
        Self {
            virtual_key,
            scan_code,
            modifiers,
        }
    }

    /// Stroke without modifiers or a scan code
    pub fn plain(virtual_key: u32) -> Self {
        Self::new(virtual_key, 0, Modifiers::empty())
    }

    pub fn virtual_key(&self) -> u32 {
        self.virtual_key
    }

    pub fn scan_code(&self) -> u32 {
        self.scan_code
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Same key with a different modifier snapshot
    pub fn with_modifiers(self, modifiers: Modifiers) -> Self {
        Self { modifiers, ..self }
    }
}

impl From<crate::Key> for KeyStroke {
    fn from(key: crate::Key) -> Self {
        Self::plain(u32::from(key.code()))
    }
}

impl fmt::Display for KeyStroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vk=0x{:02x} scan={} mods={:?}",
            self.virtual_key, self.scan_code, self.modifiers
        )
    }
}

/// Mouse buttons reported by event sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Mouse activity that may move the text caret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEvent {
    /// A button went down
    Button(MouseButton),
    /// Vertical or horizontal wheel movement
    Wheel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Key;

    #[test]
    fn test_stroke_from_key() {
        let stroke = KeyStroke::from(Key::A);
        assert_eq!(stroke.virtual_key(), 30);
        assert_eq!(stroke.scan_code(), 0);
        assert!(stroke.modifiers().is_empty());
    }

    #[test]
    fn test_with_modifiers_keeps_codes() {
        let stroke = KeyStroke::new(30, 0x1e, Modifiers::empty())
            .with_modifiers(Modifiers::LEFT_SHIFT);
        assert_eq!(stroke.scan_code(), 0x1e);
        assert!(stroke.modifiers().shift());
        assert!(stroke.to_string().starts_with("vk=0x1e scan=30"));
    }
}
