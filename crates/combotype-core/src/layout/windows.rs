// Combotype Windows Layout
// Resolution through the active system keyboard layout via ToUnicode

use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
    ToUnicode, VK_BACK, VK_CAPITAL, VK_CONTROL, VK_DELETE, VK_DOWN, VK_END, VK_ESCAPE, VK_HOME,
    VK_INSERT, VK_LCONTROL, VK_LEFT, VK_LMENU, VK_LSHIFT, VK_LWIN, VK_MENU, VK_NEXT, VK_PRIOR,
    VK_RCONTROL, VK_RETURN, VK_RIGHT, VK_RMENU, VK_RSHIFT, VK_RWIN, VK_SHIFT, VK_TAB, VK_UP,
};

use super::{KeyRole, LayoutResolver, Resolution, MAX_FRAGMENT_CHARS};
use crate::modifier::Modifiers;
use crate::KeyStroke;

const KEY_DOWN: u8 = 0x80;
const KEY_TOGGLED: u8 = 0x01;

/// Layout backed by the system's own translation.
///
/// `ToUnicode` shares dead-key state with the focused application's
/// translation, so every call can consume a pending dead key. The decoder's
/// restoration calls put it back.
#[derive(Debug, Default)]
pub struct WindowsLayout;

impl WindowsLayout {
    pub fn new() -> Self {
        Self
    }

    /// Key state array reflecting the stroke's captured modifiers
    fn key_state(mods: Modifiers) -> [u8; 256] {
        let mut state = [0u8; 256];
        let mut press = |vk: u16, held: bool| {
            if held {
                state[vk as usize] = KEY_DOWN;
            }
        };

        press(VK_LSHIFT, mods.contains(Modifiers::LEFT_SHIFT));
        press(VK_RSHIFT, mods.contains(Modifiers::RIGHT_SHIFT));
        press(VK_SHIFT, mods.shift());
        press(VK_LCONTROL, mods.contains(Modifiers::LEFT_CTRL));
        press(VK_RCONTROL, mods.contains(Modifiers::RIGHT_CTRL));
        press(VK_CONTROL, mods.ctrl());
        press(VK_LMENU, mods.contains(Modifiers::LEFT_ALT));
        press(VK_RMENU, mods.contains(Modifiers::RIGHT_ALT));
        press(VK_MENU, mods.alt());
        press(VK_LWIN, mods.contains(Modifiers::LEFT_META));
        press(VK_RWIN, mods.contains(Modifiers::RIGHT_META));

        if mods.caps_lock() {
            state[VK_CAPITAL as usize] = KEY_TOGGLED;
        }
        state
    }

    /// AltGr arrives as left Control plus right Alt
    fn is_altgr(mods: Modifiers) -> bool {
        mods.contains(Modifiers::RIGHT_ALT)
    }

    fn is_shortcut(mods: Modifiers) -> bool {
        if Self::is_altgr(mods) {
            return mods.meta() || mods.contains(Modifiers::LEFT_ALT);
        }
        mods.ctrl() || mods.alt() || mods.meta()
    }
}

impl LayoutResolver for WindowsLayout {
    fn resolve(&mut self, stroke: &KeyStroke) -> Resolution {
        let state = Self::key_state(stroke.modifiers());
        let mut buffer = [0u16; MAX_FRAGMENT_CHARS];
        let size = unsafe {
            ToUnicode(
                stroke.virtual_key(),
                stroke.scan_code(),
                state.as_ptr(),
                buffer.as_mut_ptr(),
                buffer.len() as i32,
                0,
            )
        };
        Resolution::from_utf16(size, &buffer)
    }

    fn role(&self, stroke: &KeyStroke) -> KeyRole {
        let Ok(vk) = u16::try_from(stroke.virtual_key()) else {
            return KeyRole::Text;
        };

        match vk {
            VK_SHIFT | VK_LSHIFT | VK_RSHIFT | VK_CONTROL | VK_LCONTROL | VK_RCONTROL | VK_MENU
            | VK_LMENU | VK_RMENU | VK_LWIN | VK_RWIN | VK_CAPITAL => KeyRole::Modifier,
            VK_BACK => KeyRole::Erase,
            VK_LEFT | VK_RIGHT | VK_UP | VK_DOWN | VK_HOME | VK_END | VK_PRIOR | VK_NEXT
            | VK_RETURN | VK_ESCAPE | VK_TAB | VK_DELETE | VK_INSERT => KeyRole::Navigation,
            _ if Self::is_shortcut(stroke.modifiers()) => KeyRole::Shortcut,
            _ => KeyRole::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_state_sets_generic_and_sided_keys() {
        let state = WindowsLayout::key_state(Modifiers::RIGHT_SHIFT | Modifiers::CAPS_LOCK);
        assert_eq!(state[VK_RSHIFT as usize], KEY_DOWN);
        assert_eq!(state[VK_SHIFT as usize], KEY_DOWN);
        assert_eq!(state[VK_LSHIFT as usize], 0);
        assert_eq!(state[VK_CAPITAL as usize], KEY_TOGGLED);
        assert_eq!(state[VK_LWIN as usize], 0);

        let state = WindowsLayout::key_state(Modifiers::LEFT_META | Modifiers::RIGHT_META);
        assert_eq!(state[VK_LWIN as usize], KEY_DOWN);
        assert_eq!(state[VK_RWIN as usize], KEY_DOWN);
        assert_eq!(state[VK_SHIFT as usize], 0);
    }

    #[test]
    fn test_roles() {
        let layout = WindowsLayout::new();
        assert_eq!(layout.role(&KeyStroke::plain(VK_BACK as u32)), KeyRole::Erase);
        assert_eq!(layout.role(&KeyStroke::plain(VK_LEFT as u32)), KeyRole::Navigation);
        assert_eq!(layout.role(&KeyStroke::plain(VK_LSHIFT as u32)), KeyRole::Modifier);

        // 'C'
        let copy = KeyStroke::new(0x43, 0x2e, Modifiers::LEFT_CTRL);
        assert_eq!(layout.role(&copy), KeyRole::Shortcut);

        let altgr = KeyStroke::new(0x45, 0x12, Modifiers::LEFT_CTRL | Modifiers::RIGHT_ALT);
        assert_eq!(layout.role(&altgr), KeyRole::Text);
    }
}
