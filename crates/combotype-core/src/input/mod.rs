// Combotype Input Layer
// Device detection and filtering logic

mod device;
mod filter;

pub use device::{
    is_keyboard, is_pointer, is_virtual_device, DeviceCapabilities, BTN_LEFT, BTN_MIDDLE,
    BTN_RIGHT, REL_HWHEEL, REL_WHEEL,
};
pub use filter::matches_device_filter;
