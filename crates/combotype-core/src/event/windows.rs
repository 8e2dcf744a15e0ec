// Combotype Windows Event Source
// Low-level keyboard and mouse hooks, each pumped on its own thread

use std::ptr;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use parking_lot::{const_rwlock, RwLock};
use windows_sys::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
use windows_sys::Win32::System::Threading::GetCurrentThreadId;
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
    GetKeyState, VK_CAPITAL, VK_LCONTROL, VK_LMENU, VK_LSHIFT, VK_LWIN, VK_RCONTROL, VK_RMENU,
    VK_RSHIFT, VK_RWIN,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetMessageW, PeekMessageW, PostThreadMessageW, SetWindowsHookExW,
    UnhookWindowsHookEx, KBDLLHOOKSTRUCT, LLKHF_INJECTED, MSG, PM_NOREMOVE, WH_KEYBOARD_LL,
    WH_MOUSE_LL, WINDOWS_HOOK_ID, WM_KEYDOWN, WM_LBUTTONDOWN, WM_MBUTTONDOWN, WM_MOUSEHWHEEL,
    WM_MOUSEWHEEL, WM_QUIT, WM_RBUTTONDOWN, WM_SYSKEYDOWN, WM_USER,
};

use super::SourceError;
use crate::hook::{EventSource, HookDecision, KeyHandler, MouseHandler};
use crate::modifier::Modifiers;
use crate::{KeyStroke, MouseButton, MouseEvent};

// Hook procedures have no user data pointer
static KEYBOARD: RwLock<Option<KeyHandler>> = const_rwlock(None);
static MOUSE: RwLock<Option<MouseHandler>> = const_rwlock(None);

type HookProc = unsafe extern "system" fn(i32, WPARAM, LPARAM) -> LRESULT;

/// Hook thread with its message loop
struct Pump {
    thread_id: u32,
    thread: Option<JoinHandle<()>>,
}

impl Pump {
    fn spawn(name: &str, kind: WINDOWS_HOOK_ID, proc_: HookProc) -> Result<Self, SourceError> {
        let (tx, rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || pump(kind, proc_, tx))?;

        match rx.recv() {
            Ok(Ok(thread_id)) => Ok(Self {
                thread_id,
                thread: Some(thread),
            }),
            Ok(Err(code)) => {
                let _ = thread.join();
                Err(SourceError::Install(format!(
                    "SetWindowsHookExW failed: {}",
                    std::io::Error::from_raw_os_error(code)
                )))
            }
            Err(_) => Err(SourceError::Install("hook thread exited".to_string())),
        }
    }
}

impl Drop for Pump {
    fn drop(&mut self) {
        unsafe {
            PostThreadMessageW(self.thread_id, WM_QUIT, 0, 0);
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Hook thread panicked");
            }
        }
    }
}

/// Install the hook, report the thread id, and pump until WM_QUIT
fn pump(kind: WINDOWS_HOOK_ID, proc_: HookProc, ready: mpsc::Sender<Result<u32, i32>>) {
    unsafe {
        let mut msg: MSG = std::mem::zeroed();
        // Force the message queue into existence before anyone posts to it
        PeekMessageW(&mut msg, ptr::null_mut(), WM_USER, WM_USER, PM_NOREMOVE);

        let hook = SetWindowsHookExW(kind, Some(proc_), GetModuleHandleW(ptr::null()), 0);
        if hook.is_null() {
            let code = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
            let _ = ready.send(Err(code));
            return;
        }
        let _ = ready.send(Ok(GetCurrentThreadId()));

        // 0 on WM_QUIT, -1 on error
        while GetMessageW(&mut msg, ptr::null_mut(), 0, 0) > 0 {}

        UnhookWindowsHookEx(hook);
    }
}

fn key_down(vk: u16) -> bool {
    unsafe { GetKeyState(vk as i32) < 0 }
}

fn current_modifiers() -> Modifiers {
    let mut mods = Modifiers::empty();
    for (vk, flag) in [
        (VK_LSHIFT, Modifiers::LEFT_SHIFT),
        (VK_RSHIFT, Modifiers::RIGHT_SHIFT),
        (VK_LCONTROL, Modifiers::LEFT_CTRL),
        (VK_RCONTROL, Modifiers::RIGHT_CTRL),
        (VK_LMENU, Modifiers::LEFT_ALT),
        (VK_RMENU, Modifiers::RIGHT_ALT),
        (VK_LWIN, Modifiers::LEFT_META),
        (VK_RWIN, Modifiers::RIGHT_META),
    ] {
        mods.set(flag, key_down(vk));
    }
    let caps = unsafe { GetKeyState(VK_CAPITAL as i32) } & 1 == 1;
    mods.set(Modifiers::CAPS_LOCK, caps);
    mods
}

fn decide(decision: Option<HookDecision>, code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    match decision {
        Some(HookDecision::Suppress) => 1,
        _ => unsafe { CallNextHookEx(ptr::null_mut(), code, wparam, lparam) },
    }
}

unsafe extern "system" fn keyboard_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let message = wparam as u32;
    if code < 0 || !(message == WM_KEYDOWN || message == WM_SYSKEYDOWN) {
        return CallNextHookEx(ptr::null_mut(), code, wparam, lparam);
    }

    let info = &*(lparam as *const KBDLLHOOKSTRUCT);
    if info.flags & LLKHF_INJECTED != 0 {
        // Our own dispatch output, or another tool's
        return CallNextHookEx(ptr::null_mut(), code, wparam, lparam);
    }

    // Never block the system's input thread on the slot
    let handler = KEYBOARD.try_read().and_then(|slot| slot.clone());
    let decision = handler.map(|handler| {
        handler(KeyStroke::new(info.vkCode, info.scanCode, current_modifiers()))
    });
    decide(decision, code, wparam, lparam)
}

unsafe extern "system" fn mouse_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let event = match wparam as u32 {
        WM_LBUTTONDOWN => Some(MouseEvent::Button(MouseButton::Left)),
        WM_RBUTTONDOWN => Some(MouseEvent::Button(MouseButton::Right)),
        WM_MBUTTONDOWN => Some(MouseEvent::Button(MouseButton::Middle)),
        WM_MOUSEWHEEL | WM_MOUSEHWHEEL => Some(MouseEvent::Wheel),
        _ => None,
    };
    let decision = match event {
        Some(event) if code >= 0 => {
            let handler = MOUSE.try_read().and_then(|slot| slot.clone());
            handler.map(|handler| handler(event))
        }
        _ => None,
    };
    decide(decision, code, wparam, lparam)
}

/// Event source over `WH_KEYBOARD_LL` and `WH_MOUSE_LL`.
///
/// Hooks are process-wide, so only one source can be installed at a time.
#[derive(Default)]
pub struct WindowsHookSource {
    keyboard: Option<Pump>,
    mouse: Option<Pump>,
}

impl WindowsHookSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSource for WindowsHookSource {
    fn install_keyboard(&mut self, handler: KeyHandler) -> Result<(), SourceError> {
        {
            let mut slot = KEYBOARD.write();
            if slot.is_some() {
                return Err(SourceError::AlreadyInstalled);
            }
            *slot = Some(handler);
        }
        match Pump::spawn("combotype-keyboard-hook", WH_KEYBOARD_LL, keyboard_proc) {
            Ok(pump) => {
                self.keyboard = Some(pump);
                Ok(())
            }
            Err(err) => {
                KEYBOARD.write().take();
                Err(err)
            }
        }
    }

    fn install_mouse(&mut self, handler: MouseHandler) -> Result<(), SourceError> {
        {
            let mut slot = MOUSE.write();
            if slot.is_some() {
                return Err(SourceError::AlreadyInstalled);
            }
            *slot = Some(handler);
        }
        match Pump::spawn("combotype-mouse-hook", WH_MOUSE_LL, mouse_proc) {
            Ok(pump) => {
                self.mouse = Some(pump);
                Ok(())
            }
            Err(err) => {
                MOUSE.write().take();
                Err(err)
            }
        }
    }

    fn uninstall_keyboard(&mut self) {
        // Joining the pump waits out any running callback
        if self.keyboard.take().is_some() {
            KEYBOARD.write().take();
        }
    }

    fn uninstall_mouse(&mut self) {
        if self.mouse.take().is_some() {
            MOUSE.write().take();
        }
    }
}

impl Drop for WindowsHookSource {
    fn drop(&mut self) {
        self.uninstall_keyboard();
        self.uninstall_mouse();
    }
}
