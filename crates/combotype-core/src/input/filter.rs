// Combotype Input Layer - Device Filtering
// Explicit device lists versus autodetection

/// Decide whether a device should be opened.
///
/// With an explicit filter list, a device is used when its path or name is
/// listed, virtual or not. Otherwise virtual devices are skipped and only
/// devices of the wanted kind (`is_wanted`) are used.
pub fn matches_device_filter(
    device_name: &str,
    device_path: &str,
    filter_names: &[String],
    is_wanted: bool,
    is_virtual: bool,
) -> bool {
    if !filter_names.is_empty() {
        return filter_names
            .iter()
            .any(|name| device_path == name || device_name == name);
    }

    !is_virtual && is_wanted
}
