// Combotype evdev Event Source
// Passive polling of keyboard and pointer devices for low-latency observation

use std::io;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use evdev::{Device, EventType, LedType};

use super::SourceError;
use crate::hook::{EventSource, KeyHandler, MouseHandler};
use crate::input::{
    is_keyboard, is_pointer, is_virtual_device, matches_device_filter, DeviceCapabilities,
    BTN_LEFT, BTN_MIDDLE, BTN_RIGHT, REL_HWHEEL, REL_WHEEL,
};
use crate::modifier::ModifierTracker;
use crate::{Key, KeyStroke, MouseButton, MouseEvent};

/// Poll timeout; bounds how long uninstalling waits for a worker
const POLL_TIMEOUT_MS: i32 = 100;

const EV_SYN: u16 = 0x00;
const EV_KEY: u16 = 0x01;
const EV_REL: u16 = 0x02;
const EV_MSC: u16 = 0x04;
const SYN_DROPPED: u16 = 0x03;
const MSC_SCAN: u16 = 0x04;
/// EV_KEY codes from here on are buttons, not keys
const BTN_MISC: u16 = 0x100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Keyboard,
    Pointer,
}

/// Device information for listing devices
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub path: Option<String>,
    pub kind: DeviceKind,
}

/// Background polling thread with a stop flag
struct Worker {
    name: &'static str,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn<F>(name: &'static str, body: F) -> Result<Self, SourceError>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(flag))?;
        Ok(Self {
            name,
            stop,
            thread: Some(thread),
        })
    }

    /// Signal the thread and wait for its current callback to finish
    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("{} thread panicked", self.name);
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Linux event source reading evdev devices directly.
///
/// Devices are never grabbed: every event still reaches the compositor,
/// so handler decisions are advisory. Keyboards and pointers are polled on
/// one thread each.
pub struct EvdevSource {
    filter: Vec<String>,
    keyboard: Option<Worker>,
    mouse: Option<Worker>,
}

impl EvdevSource {
    /// Name prefix of synthetic devices that must not feed the matcher
    pub const VIRT_DEVICE_PREFIX: &'static str = "combotype (virtual)";

    /// Autodetect keyboards and pointers
    pub fn new() -> Self {
        Self::with_filter(Vec::new())
    }

    /// Use only the listed devices (by name or path)
    pub fn with_filter(filter: Vec<String>) -> Self {
        Self {
            filter,
            keyboard: None,
            mouse: None,
        }
    }

    /// List keyboard and pointer devices.
    ///
    /// This is useful for the --list-devices CLI flag.
    pub fn list_devices() -> Result<Vec<DeviceInfo>, SourceError> {
        let mut devices_info = Vec::new();

        for (path, device) in evdev::enumerate() {
            let caps = Self::capabilities(&device);
            let kind = if is_keyboard(&caps) {
                DeviceKind::Keyboard
            } else if is_pointer(&caps) {
                DeviceKind::Pointer
            } else {
                continue;
            };
            devices_info.push(DeviceInfo {
                index: devices_info.len(),
                name: device.name().unwrap_or("Unknown").to_string(),
                path: path.to_str().map(|s| s.to_string()),
                kind,
            });
        }

        if devices_info.is_empty() {
            return Err(SourceError::DeviceNotFound(
                "No keyboard or pointer devices found".to_string(),
            ));
        }

        Ok(devices_info)
    }

    /// Open devices of one kind, honoring the filter.
    ///
    /// With an explicit filter, pointers must still be listed to be watched.
    fn open(&self, kind: DeviceKind) -> Result<Vec<Device>, SourceError> {
        let mut devices = Vec::new();

        for (path, device) in evdev::enumerate() {
            let device_name = device.name().unwrap_or("Unknown");
            let device_path = path.to_str().unwrap_or_default();
            let caps = Self::capabilities(&device);
            let is_wanted = match kind {
                DeviceKind::Keyboard => is_keyboard(&caps),
                DeviceKind::Pointer => is_pointer(&caps),
            };
            let is_virtual = is_virtual_device(device_name, Self::VIRT_DEVICE_PREFIX);

            let selected =
                matches_device_filter(device_name, device_path, &self.filter, is_wanted, is_virtual);
            if selected && (kind == DeviceKind::Keyboard || is_wanted) {
                log::debug!("Watching {:?} device {} ({})", kind, device_name, device_path);
                devices.push(device);
            }
        }

        if devices.is_empty() {
            return Err(SourceError::DeviceNotFound(format!("No {:?} devices found", kind)));
        }

        Ok(devices)
    }

    fn capabilities(device: &Device) -> DeviceCapabilities {
        let keys = device
            .supported_keys()
            .map(|keys| keys.iter().map(|k| k.code()).collect())
            .unwrap_or_default();
        let axes = device
            .supported_relative_axes()
            .map(|axes| axes.iter().map(|a| a.0).collect())
            .unwrap_or_default();

        DeviceCapabilities::new(device.supported_events().contains(EventType::KEY), keys)
            .with_relative_axes(axes)
    }
}

impl Default for EvdevSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for EvdevSource {
    fn install_keyboard(&mut self, handler: KeyHandler) -> Result<(), SourceError> {
        if self.keyboard.is_some() {
            return Err(SourceError::AlreadyInstalled);
        }
        let devices = self.open(DeviceKind::Keyboard)?;
        log::info!("Watching {} keyboard device(s)", devices.len());
        self.keyboard = Some(Worker::spawn("combotype-keyboard", move |stop| {
            run_keyboards(devices, handler, stop)
        })?);
        Ok(())
    }

    fn install_mouse(&mut self, handler: MouseHandler) -> Result<(), SourceError> {
        if self.mouse.is_some() {
            return Err(SourceError::AlreadyInstalled);
        }
        let devices = self.open(DeviceKind::Pointer)?;
        log::info!("Watching {} pointer device(s)", devices.len());
        self.mouse = Some(Worker::spawn("combotype-mouse", move |stop| {
            run_pointers(devices, handler, stop)
        })?);
        Ok(())
    }

    fn uninstall_keyboard(&mut self) {
        // Dropping the worker joins it
        self.keyboard = None;
    }

    fn uninstall_mouse(&mut self) {
        self.mouse = None;
    }
}

fn create_poll_fds(devices: &[Device]) -> Vec<libc::pollfd> {
    devices
        .iter()
        .map(|d| libc::pollfd {
            fd: d.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        })
        .collect()
}

/// Wait for input. EINTR counts as a timeout.
fn poll(fds: &mut [libc::pollfd], timeout_ms: i32) -> io::Result<usize> {
    let result = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
    if result < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(0);
        }
        return Err(err);
    }
    Ok(result as usize)
}

fn caps_lock_lit(device: &Device) -> bool {
    device
        .get_led_state()
        .map(|leds| leds.contains(LedType::LED_CAPSL))
        .unwrap_or(false)
}

/// Raw keyboard events to strokes, across all watched keyboards
struct KeyboardState {
    modifiers: ModifierTracker,
    /// Last MSC_SCAN per device, consumed by the following key event
    scans: Vec<u32>,
}

impl KeyboardState {
    fn new(devices: usize, caps_lock: bool) -> Self {
        Self {
            modifiers: ModifierTracker::new().with_caps_lock(caps_lock),
            scans: vec![0; devices],
        }
    }

    /// Apply one event; returns a stroke for key presses and repeats
    fn apply(&mut self, device: usize, kind: u16, code: u16, value: i32) -> Option<KeyStroke> {
        match (kind, code) {
            (EV_MSC, MSC_SCAN) => {
                self.scans[device] = value as u32;
                None
            }
            (EV_KEY, code) if code < BTN_MISC => {
                let scan = std::mem::take(&mut self.scans[device]);
                self.modifiers.update(Key::from(code), value);
                matches!(value, 1 | 2)
                    .then(|| KeyStroke::new(u32::from(code), scan, self.modifiers.snapshot()))
            }
            (EV_SYN, SYN_DROPPED) => {
                log::warn!("Kernel dropped input events; releasing held modifiers");
                self.modifiers.release_all();
                None
            }
            _ => None,
        }
    }
}

/// Raw pointer event to a mouse event
fn pointer_event(kind: u16, code: u16, value: i32) -> Option<MouseEvent> {
    match (kind, code) {
        (EV_KEY, _) if value == 1 => match code {
            BTN_LEFT => Some(MouseEvent::Button(MouseButton::Left)),
            BTN_RIGHT => Some(MouseEvent::Button(MouseButton::Right)),
            BTN_MIDDLE => Some(MouseEvent::Button(MouseButton::Middle)),
            _ => None,
        },
        (EV_REL, REL_WHEEL | REL_HWHEEL) if value != 0 => Some(MouseEvent::Wheel),
        _ => None,
    }
}

fn run_keyboards(mut devices: Vec<Device>, handler: KeyHandler, stop: Arc<AtomicBool>) {
    let mut fds = create_poll_fds(&devices);
    let caps_lock = devices.iter().any(caps_lock_lit);
    let mut state = KeyboardState::new(devices.len(), caps_lock);

    while !stop.load(Ordering::Acquire) {
        match poll(&mut fds, POLL_TIMEOUT_MS) {
            Ok(0) => continue,
            Ok(_) => {}
            Err(err) => {
                log::error!("Keyboard poll failed, stopping: {}", err);
                break;
            }
        }

        for (i, device) in devices.iter_mut().enumerate() {
            if fds[i].revents & libc::POLLIN == 0 {
                continue;
            }
            let events = match device.fetch_events() {
                Ok(events) => events,
                Err(err) => {
                    log::warn!("Reading keyboard events failed: {}", err);
                    continue;
                }
            };
            for event in events {
                if let Some(stroke) = state.apply(i, event.event_type().0, event.code(), event.value()) {
                    handler(stroke);
                }
            }
        }
    }
}

fn run_pointers(mut devices: Vec<Device>, handler: MouseHandler, stop: Arc<AtomicBool>) {
    let mut fds = create_poll_fds(&devices);

    while !stop.load(Ordering::Acquire) {
        match poll(&mut fds, POLL_TIMEOUT_MS) {
            Ok(0) => continue,
            Ok(_) => {}
            Err(err) => {
                log::error!("Pointer poll failed, stopping: {}", err);
                break;
            }
        }

        for (i, device) in devices.iter_mut().enumerate() {
            if fds[i].revents & libc::POLLIN == 0 {
                continue;
            }
            let Ok(events) = device.fetch_events() else {
                continue;
            };
            for event in events {
                if let Some(mouse) = pointer_event(event.event_type().0, event.code(), event.value()) {
                    handler(mouse);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::HookDecision;
    use crate::modifier::Modifiers;

    #[test]
    fn test_scan_code_attaches_to_next_key() {
        let mut state = KeyboardState::new(2, false);
        assert_eq!(state.apply(0, EV_MSC, MSC_SCAN, 0x70004), None);

        let stroke = state.apply(0, EV_KEY, Key::A.code(), 1).unwrap();
        assert_eq!(stroke.virtual_key(), 30);
        assert_eq!(stroke.scan_code(), 0x70004);

        // Consumed; other devices keep their own
        let again = state.apply(0, EV_KEY, Key::A.code(), 2).unwrap();
        assert_eq!(again.scan_code(), 0);
        assert_eq!(state.apply(1, EV_KEY, Key::A.code(), 0), None);
    }

    #[test]
    fn test_modifiers_tracked_across_events() {
        let mut state = KeyboardState::new(1, true);
        let shift = state.apply(0, EV_KEY, Key::LEFT_SHIFT.code(), 1).unwrap();
        assert!(shift.modifiers().contains(Modifiers::LEFT_SHIFT));

        let a = state.apply(0, EV_KEY, Key::A.code(), 1).unwrap();
        assert!(a.modifiers().shift());
        assert!(a.modifiers().caps_lock());

        state.apply(0, EV_KEY, Key::LEFT_SHIFT.code(), 0);
        state.apply(0, EV_SYN, SYN_DROPPED, 0);
        let b = state.apply(0, EV_KEY, Key::B.code(), 1).unwrap();
        assert_eq!(b.modifiers(), Modifiers::CAPS_LOCK);
    }

    #[test]
    fn test_buttons_on_keyboards_are_ignored() {
        let mut state = KeyboardState::new(1, false);
        assert_eq!(state.apply(0, EV_KEY, BTN_LEFT, 1), None);
    }

    #[test]
    fn test_pointer_events() {
        assert_eq!(
            pointer_event(EV_KEY, BTN_LEFT, 1),
            Some(MouseEvent::Button(MouseButton::Left))
        );
        assert_eq!(pointer_event(EV_KEY, BTN_LEFT, 0), None);
        assert_eq!(pointer_event(EV_REL, REL_WHEEL, -1), Some(MouseEvent::Wheel));
        assert_eq!(pointer_event(EV_REL, 0, 5), None);
    }

    #[test]
    fn test_list_devices() {
        match EvdevSource::list_devices() {
            Ok(devices) => {
                println!("Found {} devices", devices.len());
                for device in &devices {
                    println!("  {}: {} {:?} ({:?})", device.index, device.name, device.kind, device.path);
                }
            }
            Err(SourceError::DeviceNotFound(_)) => {
                println!("Skipping test: no input devices found");
            }
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }

    #[test]
    fn test_install_and_uninstall_keyboard() {
        let mut source = EvdevSource::new();
        let handler: KeyHandler = Arc::new(|_stroke: KeyStroke| HookDecision::PassThrough);
        match source.install_keyboard(handler.clone()) {
            Ok(()) => {
                assert!(matches!(
                    source.install_keyboard(handler),
                    Err(SourceError::AlreadyInstalled)
                ));
                source.uninstall_keyboard();
                assert!(source.keyboard.is_none());
            }
            Err(SourceError::DeviceNotFound(_)) => {
                println!("Skipping test: no keyboard devices found");
            }
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }
}
