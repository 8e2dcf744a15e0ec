// Combotype Layout Resolution
// The boundary between raw key strokes and the text a keyboard layout produces

pub mod soft;
#[cfg(windows)]
pub mod windows;

pub use soft::{DeadKind, SoftLayout};
#[cfg(windows)]
pub use windows::WindowsLayout;

use serde::Deserialize;
use strum_macros::{Display, EnumString};

use crate::decode::TextFragment;
use crate::KeyStroke;

/// Upper bound on the characters a single resolution may report.
///
/// No known layout produces more than a few code units per keystroke;
/// anything longer is truncated.
pub const MAX_FRAGMENT_CHARS: usize = 10;

/// Outcome of resolving one stroke through a layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The stroke is a dead key; the layout has stored it for the next stroke.
    DeadKey,
    /// The stroke produced characters (at most [`MAX_FRAGMENT_CHARS`]).
    Text(TextFragment),
    /// The stroke produced nothing (modifier, function key, shortcut).
    NoText,
    /// The layout reported a size it should never report.
    Unexpected(i32),
}

impl Resolution {
    /// Interpret a ToUnicode-style result: a signed size plus a UTF-16 buffer.
    ///
    /// `-1` is a dead key, `0` no text, a positive size the number of code
    /// units written. Any other negative value is unexpected.
    pub fn from_utf16(size: i32, units: &[u16]) -> Self {
        match size {
            -1 => Resolution::DeadKey,
            0 => Resolution::NoText,
            n if n > 0 => {
                let len = (n as usize).min(units.len());
                let fragment: TextFragment = char::decode_utf16(units[..len].iter().copied())
                    .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .take(MAX_FRAGMENT_CHARS)
                    .collect();
                if fragment.is_empty() {
                    Resolution::NoText
                } else {
                    Resolution::Text(fragment)
                }
            }
            other => Resolution::Unexpected(other),
        }
    }
}

/// How a stroke affects the typed-text context, independent of its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    /// Produces (or composes) text
    Text,
    /// Modifier or lock key
    Modifier,
    /// Deletes the character before the caret
    Erase,
    /// Moves the caret or leaves the field (arrows, Enter, Escape, Tab)
    Navigation,
    /// Pressed with Control, Alt or a logo key held
    Shortcut,
}

/// Keyboard layout resolution, as provided by the operating system.
///
/// Implementations may keep composition state that every call observes and
/// mutates (Windows' `ToUnicode` consumes a stored dead key). The decoder
/// compensates for that with its restoration calls, so `resolve` must be
/// deterministic for a given stroke and internal state.
pub trait LayoutResolver {
    /// Resolve one stroke to text
    fn resolve(&mut self, stroke: &KeyStroke) -> Resolution;

    /// Classify a stroke for buffer maintenance
    fn role(&self, stroke: &KeyStroke) -> KeyRole;

    /// The stroke has been passed on to the focused application.
    ///
    /// Layouts that simulate downstream composition advance it here; layouts
    /// backed by the system's own state have nothing to do.
    fn deliver(&mut self, _stroke: &KeyStroke) {}

    /// Drop simulated composition state after strokes were missed
    fn resync(&mut self) {}
}

impl<R: LayoutResolver + ?Sized> LayoutResolver for Box<R> {
    fn resolve(&mut self, stroke: &KeyStroke) -> Resolution {
        (**self).resolve(stroke)
    }

    fn role(&self, stroke: &KeyStroke) -> KeyRole {
        (**self).role(stroke)
    }

    fn deliver(&mut self, stroke: &KeyStroke) {
        (**self).deliver(stroke)
    }

    fn resync(&mut self) {
        (**self).resync()
    }
}

/// Built-in software layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
    /// US QWERTY, no dead keys
    Us,
    /// US-International: ' " ` ~ ^ are dead keys, right Alt is AltGr
    #[default]
    UsIntl,
}
