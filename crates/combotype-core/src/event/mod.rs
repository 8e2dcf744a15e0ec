// Combotype Event Sources
// Platform adapters behind the EventSource seam

pub mod manual;
#[cfg(all(feature = "evdev-source", target_os = "linux"))]
pub mod r#loop;
#[cfg(windows)]
pub mod windows;

pub use manual::ManualSource;
#[cfg(all(feature = "evdev-source", target_os = "linux"))]
pub use r#loop::{DeviceInfo, DeviceKind, EvdevSource};
#[cfg(windows)]
pub use windows::WindowsHookSource;

/// Errors installing or running a platform event source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Hook install failed: {0}")]
    Install(String),

    #[error("Handler already installed")]
    AlreadyInstalled,
}
