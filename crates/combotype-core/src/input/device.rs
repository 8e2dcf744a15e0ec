// Combotype Input Layer - Device Detection
// Classify evdev devices as keyboards or pointers from their capabilities

use std::collections::HashSet;

/// Capabilities read from an evdev device
#[derive(Debug, Clone, Default)]
pub struct DeviceCapabilities {
    /// Whether the device supports EV_KEY events
    pub has_ev_key: bool,
    /// Supported EV_KEY codes (keys and buttons)
    pub supported_keys: Vec<u16>,
    /// Supported EV_REL codes
    pub relative_axes: Vec<u16>,
}

impl DeviceCapabilities {
    pub fn new(has_ev_key: bool, supported_keys: Vec<u16>) -> Self {
        Self {
            has_ev_key,
            supported_keys,
            relative_axes: Vec::new(),
        }
    }

    pub fn with_relative_axes(mut self, axes: Vec<u16>) -> Self {
        self.relative_axes = axes;
        self
    }

    pub fn supports_key(&self, key_code: u16) -> bool {
        self.supported_keys.contains(&key_code)
    }

    pub fn supports_relative(&self, axis: u16) -> bool {
        self.relative_axes.contains(&axis)
    }

    fn key_set(&self) -> HashSet<u16> {
        self.supported_keys.iter().copied().collect()
    }
}

// Q W E R T Y
const QWERTY_CODES: &[u16] = &[16, 17, 18, 19, 20, 21];

// SPACE A Z
const A_Z_SPACE_CODES: &[u16] = &[57, 30, 44];

pub const BTN_LEFT: u16 = 0x110;
pub const BTN_RIGHT: u16 = 0x111;
pub const BTN_MIDDLE: u16 = 0x112;

pub const REL_HWHEEL: u16 = 0x06;
pub const REL_WHEEL: u16 = 0x08;

/// A device is a keyboard when it reports EV_KEY with the whole QWERTY
/// row plus A, Z and Space.
pub fn is_keyboard(capabilities: &DeviceCapabilities) -> bool {
    if !capabilities.has_ev_key {
        return false;
    }

    let key_set = capabilities.key_set();
    let qwerty_present = QWERTY_CODES.iter().all(|code| key_set.contains(code));
    let az_present = A_Z_SPACE_CODES.iter().all(|code| key_set.contains(code));

    qwerty_present && az_present
}

/// A device is a pointer when it has a primary button (mice, touchpads,
/// trackballs) or a scroll wheel.
pub fn is_pointer(capabilities: &DeviceCapabilities) -> bool {
    (capabilities.has_ev_key && capabilities.supports_key(BTN_LEFT))
        || capabilities.supports_relative(REL_WHEEL)
}

/// Devices whose name carries `prefix` are synthetic, typically the
/// dispatcher's own virtual keyboard, and must not feed the matcher.
pub fn is_virtual_device(name: &str, prefix: &str) -> bool {
    name.contains(prefix)
}
