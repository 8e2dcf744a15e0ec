// Combotype Software Layouts
// US and US-International layouts over Linux key codes, with dead-key composition

use super::{KeyRole, LayoutKind, LayoutResolver, Resolution};
use crate::decode::TextFragment;
use crate::modifier::Modifiers;
use crate::{Key, KeyStroke};

/// Diacritics produced by the US-International dead keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeadKind {
    Acute,
    Grave,
    Tilde,
    Diaeresis,
    Circumflex,
}

impl DeadKind {
    /// Character committed when the dead key is followed by Space or by a
    /// character it cannot combine with.
    pub fn spacing(self) -> char {
        match self {
            Self::Acute => '\'',
            Self::Grave => '`',
            Self::Tilde => '~',
            Self::Diaeresis => '"',
            Self::Circumflex => '^',
        }
    }

    /// Combine with a base letter
    pub fn compose(self, base: char) -> Option<char> {
        let out = match self {
            Self::Acute => match base {
                'a' => 'á',
                'e' => 'é',
                'i' => 'í',
                'o' => 'ó',
                'u' => 'ú',
                'y' => 'ý',
                'c' => 'ç',
                'A' => 'Á',
                'E' => 'É',
                'I' => 'Í',
                'O' => 'Ó',
                'U' => 'Ú',
                'Y' => 'Ý',
                'C' => 'Ç',
                _ => return None,
            },
            Self::Grave => match base {
                'a' => 'à',
                'e' => 'è',
                'i' => 'ì',
                'o' => 'ò',
                'u' => 'ù',
                'A' => 'À',
                'E' => 'È',
                'I' => 'Ì',
                'O' => 'Ò',
                'U' => 'Ù',
                _ => return None,
            },
            Self::Tilde => match base {
                'a' => 'ã',
                'n' => 'ñ',
                'o' => 'õ',
                'A' => 'Ã',
                'N' => 'Ñ',
                'O' => 'Õ',
                _ => return None,
            },
            Self::Diaeresis => match base {
                'a' => 'ä',
                'e' => 'ë',
                'i' => 'ï',
                'o' => 'ö',
                'u' => 'ü',
                'y' => 'ÿ',
                'A' => 'Ä',
                'E' => 'Ë',
                'I' => 'Ï',
                'O' => 'Ö',
                'U' => 'Ü',
                _ => return None,
            },
            Self::Circumflex => match base {
                'a' => 'â',
                'e' => 'ê',
                'i' => 'î',
                'o' => 'ô',
                'u' => 'û',
                'A' => 'Â',
                'E' => 'Ê',
                'I' => 'Î',
                'O' => 'Ô',
                'U' => 'Û',
                _ => return None,
            },
        };

        Some(out)
    }
}

/// What a stroke produces before composition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Char(char),
    Dead(DeadKind),
    Nothing,
}

/// Table-driven layout for Linux key codes.
///
/// The composition state models what the focused application holds: a dead
/// key stays pending until the next text-producing stroke is delivered.
/// `resolve` only reads that state, so repeated calls are harmless; the state
/// advances in [`LayoutResolver::deliver`].
#[derive(Debug, Clone)]
pub struct SoftLayout {
    kind: LayoutKind,
    pending: Option<DeadKind>,
}

impl SoftLayout {
    pub fn new(kind: LayoutKind) -> Self {
        Self {
            kind,
            pending: None,
        }
    }

    pub fn us() -> Self {
        Self::new(LayoutKind::Us)
    }

    pub fn us_intl() -> Self {
        Self::new(LayoutKind::UsIntl)
    }

    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    /// Dead key currently awaiting its base character
    pub fn pending_dead_key(&self) -> Option<DeadKind> {
        self.pending
    }

    /// Resolve a stroke against an explicit composition state.
    ///
    /// Returns the resolution and the state that follows once the stroke
    /// reaches the application.
    pub fn translate(
        &self,
        stroke: &KeyStroke,
        pending: Option<DeadKind>,
    ) -> (Resolution, Option<DeadKind>) {
        match (self.output(stroke), pending) {
            (Output::Nothing, pending) => (Resolution::NoText, pending),
            (Output::Dead(kind), None) => (Resolution::DeadKey, Some(kind)),
            (Output::Dead(kind), Some(prior)) => (
                Resolution::Text([prior.spacing(), kind.spacing()].into_iter().collect()),
                None,
            ),
            (Output::Char(ch), None) => (Resolution::Text(TextFragment::from(ch)), None),
            (Output::Char(ch), Some(prior)) => {
                let text: TextFragment = if ch == ' ' {
                    TextFragment::from(prior.spacing())
                } else if let Some(composed) = prior.compose(ch) {
                    TextFragment::from(composed)
                } else {
                    [prior.spacing(), ch].into_iter().collect()
                };
                (Resolution::Text(text), None)
            }
        }
    }

    fn is_altgr(&self, mods: Modifiers) -> bool {
        self.kind == LayoutKind::UsIntl && mods.contains(Modifiers::RIGHT_ALT)
    }

    fn is_shortcut(&self, mods: Modifiers) -> bool {
        let plain_alt = mods.contains(Modifiers::LEFT_ALT)
            || (mods.contains(Modifiers::RIGHT_ALT) && !self.is_altgr(mods));
        mods.ctrl() || mods.meta() || plain_alt
    }

    fn output(&self, stroke: &KeyStroke) -> Output {
        let Ok(code) = u16::try_from(stroke.virtual_key()) else {
            return Output::Nothing;
        };
        let key = Key::from(code);
        let mods = stroke.modifiers();

        if key.is_modifier() || self.is_shortcut(mods) {
            return Output::Nothing;
        }

        if let Some(lower) = letter(key) {
            let upper_case = mods.shift() != mods.caps_lock();
            if self.is_altgr(mods) {
                return altgr_letter(lower, upper_case).map_or(Output::Nothing, Output::Char);
            }
            return Output::Char(if upper_case {
                lower.to_ascii_uppercase()
            } else {
                lower
            });
        }

        if self.is_altgr(mods) {
            return Output::Nothing;
        }

        if self.kind == LayoutKind::UsIntl {
            match (key, mods.shift()) {
                (Key::APOSTROPHE, false) => return Output::Dead(DeadKind::Acute),
                (Key::APOSTROPHE, true) => return Output::Dead(DeadKind::Diaeresis),
                (Key::GRAVE, false) => return Output::Dead(DeadKind::Grave),
                (Key::GRAVE, true) => return Output::Dead(DeadKind::Tilde),
                (Key::KEY_6, true) => return Output::Dead(DeadKind::Circumflex),
                _ => {}
            }
        }

        match symbol(key) {
            Some((normal, shifted)) => Output::Char(if mods.shift() { shifted } else { normal }),
            None => Output::Nothing,
        }
    }
}

impl Default for SoftLayout {
    fn default() -> Self {
        Self::new(LayoutKind::default())
    }
}

impl LayoutResolver for SoftLayout {
    fn resolve(&mut self, stroke: &KeyStroke) -> Resolution {
        self.translate(stroke, self.pending).0
    }

    fn role(&self, stroke: &KeyStroke) -> KeyRole {
        let key = match u16::try_from(stroke.virtual_key()) {
            Ok(code) => Key::from(code),
            Err(_) => return KeyRole::Text,
        };

        if key.is_modifier() {
            KeyRole::Modifier
        } else if key == Key::BACKSPACE {
            KeyRole::Erase
        } else if key.is_navigation() {
            KeyRole::Navigation
        } else if self.is_shortcut(stroke.modifiers()) {
            KeyRole::Shortcut
        } else {
            KeyRole::Text
        }
    }

    fn deliver(&mut self, stroke: &KeyStroke) {
        self.pending = self.translate(stroke, self.pending).1;
    }

    fn resync(&mut self) {
        self.pending = None;
    }
}

fn letter(key: Key) -> Option<char> {
    let ch = match key.code() {
        16 => 'q',
        17 => 'w',
        18 => 'e',
        19 => 'r',
        20 => 't',
        21 => 'y',
        22 => 'u',
        23 => 'i',
        24 => 'o',
        25 => 'p',
        30 => 'a',
        31 => 's',
        32 => 'd',
        33 => 'f',
        34 => 'g',
        35 => 'h',
        36 => 'j',
        37 => 'k',
        38 => 'l',
        44 => 'z',
        45 => 'x',
        46 => 'c',
        47 => 'v',
        48 => 'b',
        49 => 'n',
        50 => 'm',
        _ => return None,
    };
    Some(ch)
}

/// US-International AltGr letters (lower, upper)
fn altgr_letter(lower: char, upper_case: bool) -> Option<char> {
    let (l, u) = match lower {
        'q' => ('ä', 'Ä'),
        'w' => ('å', 'Å'),
        'e' => ('é', 'É'),
        't' => ('þ', 'Þ'),
        'y' => ('ü', 'Ü'),
        'u' => ('ú', 'Ú'),
        'i' => ('í', 'Í'),
        'o' => ('ó', 'Ó'),
        'p' => ('ö', 'Ö'),
        'a' => ('á', 'Á'),
        's' => ('ß', '§'),
        'd' => ('ð', 'Ð'),
        'l' => ('ø', 'Ø'),
        'z' => ('æ', 'Æ'),
        'c' => ('©', '¢'),
        'n' => ('ñ', 'Ñ'),
        _ => return None,
    };
    Some(if upper_case { u } else { l })
}

/// Non-letter keys (normal, shifted)
fn symbol(key: Key) -> Option<(char, char)> {
    let pair = match key.code() {
        2 => ('1', '!'),
        3 => ('2', '@'),
        4 => ('3', '#'),
        5 => ('4', '$'),
        6 => ('5', '%'),
        7 => ('6', '^'),
        8 => ('7', '&'),
        9 => ('8', '*'),
        10 => ('9', '('),
        11 => ('0', ')'),
        12 => ('-', '_'),
        13 => ('=', '+'),
        26 => ('[', '{'),
        27 => (']', '}'),
        39 => (';', ':'),
        40 => ('\'', '"'),
        41 => ('`', '~'),
        43 => ('\\', '|'),
        51 => (',', '<'),
        52 => ('.', '>'),
        53 => ('/', '?'),
        57 => (' ', ' '),
        // Control characters, as a system layout reports them
        1 => ('\u{1b}', '\u{1b}'),
        14 => ('\u{8}', '\u{8}'),
        15 => ('\t', '\t'),
        28 | 96 => ('\r', '\r'),
        // Keypad, assuming Num Lock
        55 => ('*', '*'),
        71 => ('7', '7'),
        72 => ('8', '8'),
        73 => ('9', '9'),
        74 => ('-', '-'),
        75 => ('4', '4'),
        76 => ('5', '5'),
        77 => ('6', '6'),
        78 => ('+', '+'),
        79 => ('1', '1'),
        80 => ('2', '2'),
        81 => ('3', '3'),
        82 => ('0', '0'),
        83 => ('.', '.'),
        98 => ('/', '/'),
        _ => return None,
    };
    Some(pair)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(res: Resolution) -> String {
        match res {
            Resolution::Text(fragment) => fragment.to_string(),
            other => panic!("expected text, got {other:?}"),
        }
    }

    fn press(layout: &mut SoftLayout, stroke: KeyStroke) -> Resolution {
        let res = layout.resolve(&stroke);
        layout.deliver(&stroke);
        res
    }

    #[test]
    fn test_letters_shift_and_caps() {
        let mut layout = SoftLayout::us();
        assert_eq!(text(layout.resolve(&Key::A.into())), "a");

        let shifted = KeyStroke::from(Key::A).with_modifiers(Modifiers::LEFT_SHIFT);
        assert_eq!(text(layout.resolve(&shifted)), "A");

        let caps = KeyStroke::from(Key::A).with_modifiers(Modifiers::CAPS_LOCK);
        assert_eq!(text(layout.resolve(&caps)), "A");

        // Caps Lock and Shift cancel for letters only
        let both = Modifiers::CAPS_LOCK | Modifiers::RIGHT_SHIFT;
        assert_eq!(text(layout.resolve(&KeyStroke::from(Key::A).with_modifiers(both))), "a");
        assert_eq!(text(layout.resolve(&KeyStroke::from(Key::KEY_1).with_modifiers(both))), "!");
    }

    #[test]
    fn test_modifiers_and_shortcuts_produce_nothing() {
        let mut layout = SoftLayout::us_intl();
        assert_eq!(layout.resolve(&Key::LEFT_SHIFT.into()), Resolution::NoText);

        let ctrl_c = KeyStroke::from(Key::C).with_modifiers(Modifiers::LEFT_CTRL);
        assert_eq!(layout.resolve(&ctrl_c), Resolution::NoText);
        assert_eq!(layout.role(&ctrl_c), KeyRole::Shortcut);
    }

    #[test]
    fn test_us_has_no_dead_keys() {
        let mut layout = SoftLayout::us();
        assert_eq!(text(press(&mut layout, Key::APOSTROPHE.into())), "'");
        assert_eq!(text(press(&mut layout, Key::E.into())), "e");
    }

    #[test]
    fn test_intl_dead_key_composes_on_delivery() {
        let mut layout = SoftLayout::us_intl();
        assert_eq!(press(&mut layout, Key::APOSTROPHE.into()), Resolution::DeadKey);
        assert_eq!(layout.pending_dead_key(), Some(DeadKind::Acute));
        assert_eq!(text(press(&mut layout, Key::E.into())), "é");
        assert_eq!(layout.pending_dead_key(), None);
    }

    #[test]
    fn test_resolve_does_not_consume_pending_state() {
        let mut layout = SoftLayout::us_intl();
        press(&mut layout, Key::GRAVE.into());
        assert_eq!(text(layout.resolve(&Key::A.into())), "à");
        assert_eq!(text(layout.resolve(&Key::A.into())), "à");
        assert_eq!(layout.pending_dead_key(), Some(DeadKind::Grave));
    }

    #[test]
    fn test_dead_key_space_and_non_composable() {
        let mut layout = SoftLayout::us_intl();
        let tilde = KeyStroke::from(Key::GRAVE).with_modifiers(Modifiers::LEFT_SHIFT);

        press(&mut layout, tilde);
        assert_eq!(text(press(&mut layout, Key::SPACE.into())), "~");

        press(&mut layout, tilde);
        assert_eq!(text(press(&mut layout, Key::T.into())), "~t");
    }

    #[test]
    fn test_two_dead_keys_commit_both() {
        let mut layout = SoftLayout::us_intl();
        press(&mut layout, Key::APOSTROPHE.into());
        let circumflex = KeyStroke::from(Key::KEY_6).with_modifiers(Modifiers::LEFT_SHIFT);
        assert_eq!(text(press(&mut layout, circumflex)), "'^");
        assert_eq!(layout.pending_dead_key(), None);
    }

    #[test]
    fn test_modifier_press_keeps_dead_key_pending() {
        let mut layout = SoftLayout::us_intl();
        press(&mut layout, Key::APOSTROPHE.into());
        press(&mut layout, Key::LEFT_SHIFT.into());
        let shifted_e = KeyStroke::from(Key::E).with_modifiers(Modifiers::LEFT_SHIFT);
        assert_eq!(text(press(&mut layout, shifted_e)), "É");
    }

    #[test]
    fn test_altgr_letters() {
        let mut layout = SoftLayout::us_intl();
        let altgr_e = KeyStroke::from(Key::E).with_modifiers(Modifiers::RIGHT_ALT);
        assert_eq!(text(layout.resolve(&altgr_e)), "é");
        assert_eq!(layout.role(&altgr_e), KeyRole::Text);

        let us = SoftLayout::us();
        assert_eq!(us.role(&altgr_e), KeyRole::Shortcut);
    }

    #[test]
    fn test_roles() {
        let layout = SoftLayout::us_intl();
        assert_eq!(layout.role(&Key::BACKSPACE.into()), KeyRole::Erase);
        assert_eq!(layout.role(&Key::ENTER.into()), KeyRole::Navigation);
        assert_eq!(layout.role(&Key::LEFT.into()), KeyRole::Navigation);
        assert_eq!(layout.role(&Key::CAPSLOCK.into()), KeyRole::Modifier);
        assert_eq!(layout.role(&Key::SPACE.into()), KeyRole::Text);
        assert_eq!(layout.role(&KeyStroke::plain(0x1_0000)), KeyRole::Text);
    }

    #[test]
    fn test_unknown_codes_produce_nothing() {
        let mut layout = SoftLayout::us();
        assert_eq!(layout.resolve(&Key::F1.into()), Resolution::NoText);
        assert_eq!(layout.resolve(&KeyStroke::plain(0x1_0000)), Resolution::NoText);
    }
}
