// Combotype Key Type
// Linux input-event-codes.h key codes used by the software layouts and the evdev source

use std::fmt;

/// Represents a single keyboard key code.
///
/// This is a newtype wrapper around u16 for type safety.
/// The numeric values match Linux input-event-codes.h definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Key(pub u16);

impl Key {
    pub const ESC: Key = Key(1);
    pub const KEY_1: Key = Key(2);
    pub const KEY_6: Key = Key(7);
    pub const KEY_0: Key = Key(11);
    pub const MINUS: Key = Key(12);
    pub const EQUAL: Key = Key(13);
    pub const BACKSPACE: Key = Key(14);
    pub const TAB: Key = Key(15);
    pub const Q: Key = Key(16);
    pub const W: Key = Key(17);
    pub const E: Key = Key(18);
    pub const R: Key = Key(19);
    pub const T: Key = Key(20);
    pub const Y: Key = Key(21);
    pub const U: Key = Key(22);
    pub const I: Key = Key(23);
    pub const O: Key = Key(24);
    pub const P: Key = Key(25);
    pub const LEFT_BRACE: Key = Key(26);
    pub const RIGHT_BRACE: Key = Key(27);
    pub const ENTER: Key = Key(28);
    pub const LEFT_CTRL: Key = Key(29);
    pub const A: Key = Key(30);
    pub const S: Key = Key(31);
    pub const D: Key = Key(32);
    pub const F: Key = Key(33);
    pub const G: Key = Key(34);
    pub const H: Key = Key(35);
    pub const J: Key = Key(36);
    pub const K: Key = Key(37);
    pub const L: Key = Key(38);
    pub const SEMICOLON: Key = Key(39);
    pub const APOSTROPHE: Key = Key(40);
    pub const GRAVE: Key = Key(41);
    pub const LEFT_SHIFT: Key = Key(42);
    pub const BACKSLASH: Key = Key(43);
    pub const Z: Key = Key(44);
    pub const X: Key = Key(45);
    pub const C: Key = Key(46);
    pub const V: Key = Key(47);
    pub const B: Key = Key(48);
    pub const N: Key = Key(49);
    pub const M: Key = Key(50);
    pub const COMMA: Key = Key(51);
    pub const DOT: Key = Key(52);
    pub const SLASH: Key = Key(53);
    pub const RIGHT_SHIFT: Key = Key(54);
    pub const KP_ASTERISK: Key = Key(55);
    pub const LEFT_ALT: Key = Key(56);
    pub const SPACE: Key = Key(57);
    pub const CAPSLOCK: Key = Key(58);
    pub const F1: Key = Key(59);
    pub const F10: Key = Key(68);
    pub const NUMLOCK: Key = Key(69);
    pub const SCROLLLOCK: Key = Key(70);
    pub const KP7: Key = Key(71);
    pub const KP_MINUS: Key = Key(74);
    pub const KP_PLUS: Key = Key(78);
    pub const KP_DOT: Key = Key(83);
    pub const F11: Key = Key(87);
    pub const F12: Key = Key(88);
    pub const KP_ENTER: Key = Key(96);
    pub const RIGHT_CTRL: Key = Key(97);
    pub const KP_SLASH: Key = Key(98);
    pub const RIGHT_ALT: Key = Key(100);
    pub const HOME: Key = Key(102);
    pub const UP: Key = Key(103);
    pub const PAGE_UP: Key = Key(104);
    pub const LEFT: Key = Key(105);
    pub const RIGHT: Key = Key(106);
    pub const END: Key = Key(107);
    pub const DOWN: Key = Key(108);
    pub const PAGE_DOWN: Key = Key(109);
    pub const INSERT: Key = Key(110);
    pub const DELETE: Key = Key(111);
    pub const LEFT_META: Key = Key(125);
    pub const RIGHT_META: Key = Key(126);

    /// Get the raw numeric code value
    pub fn code(self) -> u16 {
        self.0
    }

    /// Get the name of this key
    pub fn name(self) -> &'static str {
        key_name(self.0)
    }

    /// Keys that move the caret or leave the current text field.
    pub fn is_navigation(self) -> bool {
        matches!(
            self,
            Key::ESC
                | Key::TAB
                | Key::ENTER
                | Key::KP_ENTER
                | Key::HOME
                | Key::UP
                | Key::PAGE_UP
                | Key::LEFT
                | Key::RIGHT
                | Key::END
                | Key::DOWN
                | Key::PAGE_DOWN
                | Key::INSERT
                | Key::DELETE
        )
    }

    /// Modifier and lock keys, which never produce text on their own.
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            Key::LEFT_CTRL
                | Key::RIGHT_CTRL
                | Key::LEFT_SHIFT
                | Key::RIGHT_SHIFT
                | Key::LEFT_ALT
                | Key::RIGHT_ALT
                | Key::LEFT_META
                | Key::RIGHT_META
                | Key::CAPSLOCK
                | Key::NUMLOCK
                | Key::SCROLLLOCK
        )
    }
}

impl From<u16> for Key {
    fn from(code: u16) -> Self {
        Key(code)
    }
}

impl From<Key> for u16 {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Display name for a key code
pub fn key_name(code: u16) -> &'static str {
    const LETTERS: [(u16, &str); 26] = [
        (16, "Q"),
        (17, "W"),
        (18, "E"),
        (19, "R"),
        (20, "T"),
        (21, "Y"),
        (22, "U"),
        (23, "I"),
        (24, "O"),
        (25, "P"),
        (30, "A"),
        (31, "S"),
        (32, "D"),
        (33, "F"),
        (34, "G"),
        (35, "H"),
        (36, "J"),
        (37, "K"),
        (38, "L"),
        (44, "Z"),
        (45, "X"),
        (46, "C"),
        (47, "V"),
        (48, "B"),
        (49, "N"),
        (50, "M"),
    ];
    if let Some((_, name)) = LETTERS.iter().find(|(c, _)| *c == code) {
        return name;
    }

    match code {
        0 => "RESERVED",
        1 => "ESC",
        2 => "KEY_1",
        3 => "KEY_2",
        4 => "KEY_3",
        5 => "KEY_4",
        6 => "KEY_5",
        7 => "KEY_6",
        8 => "KEY_7",
        9 => "KEY_8",
        10 => "KEY_9",
        11 => "KEY_0",
        12 => "MINUS",
        13 => "EQUAL",
        14 => "BACKSPACE",
        15 => "TAB",
        26 => "LEFT_BRACE",
        27 => "RIGHT_BRACE",
        28 => "ENTER",
        29 => "LEFT_CTRL",
        39 => "SEMICOLON",
        40 => "APOSTROPHE",
        41 => "GRAVE",
        42 => "LEFT_SHIFT",
        43 => "BACKSLASH",
        51 => "COMMA",
        52 => "DOT",
        53 => "SLASH",
        54 => "RIGHT_SHIFT",
        55 => "KPASTERISK",
        56 => "LEFT_ALT",
        57 => "SPACE",
        58 => "CAPSLOCK",
        59..=68 => "F1-F10",
        69 => "NUMLOCK",
        70 => "SCROLLLOCK",
        71..=83 => "KEYPAD",
        87 => "F11",
        88 => "F12",
        96 => "KPENTER",
        97 => "RIGHT_CTRL",
        98 => "KPSLASH",
        100 => "RIGHT_ALT",
        102 => "HOME",
        103 => "UP",
        104 => "PAGE_UP",
        105 => "LEFT",
        106 => "RIGHT",
        107 => "END",
        108 => "DOWN",
        109 => "PAGE_DOWN",
        110 => "INSERT",
        111 => "DELETE",
        125 => "LEFT_META",
        126 => "RIGHT_META",
        0x110 => "BTN_LEFT",
        0x111 => "BTN_RIGHT",
        0x112 => "BTN_MIDDLE",
        _ => "UNKNOWN",
    }
}
