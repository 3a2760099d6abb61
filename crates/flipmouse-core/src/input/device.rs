// FlipMouse Input Layer - Device Discovery
// Supported device matching, exclusive grab and per-device sinks

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::keymap::KeymapKind;

/// Name prefix of the devices this daemon creates itself.
pub const VIRTUAL_DEVICE_PREFIX: &str = "FlipMouse";

/// A device name the daemon attaches to and the scancode table it uses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupportedDevice {
    pub name: String,
    pub keymap: KeymapKind,
}

impl SupportedDevice {
    pub fn new(name: impl Into<String>, keymap: KeymapKind) -> Self {
        Self {
            name: name.into(),
            keymap,
        }
    }
}

/// Errors raised while attaching devices
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("No supported input device found")]
    NoSupportedDevice,

    #[error("Failed to create virtual device: {0}")]
    DeviceCreation(#[source] std::io::Error),
}

/// Find the entry whose name equals the device name exactly.
///
/// Our own virtual devices never match, whatever the list says.
pub fn find_supported<'a>(
    device_name: &str,
    supported: &'a [SupportedDevice],
) -> Option<&'a SupportedDevice> {
    if is_virtual_device(device_name) {
        return None;
    }
    supported.iter().find(|entry| entry.name == device_name)
}

/// Check if a device was created by this daemon.
pub fn is_virtual_device(name: &str) -> bool {
    name.starts_with(VIRTUAL_DEVICE_PREFIX)
}

/// The first attached device picks the keymap; later ones must live with it.
pub fn select_keymap(
    selected: Option<KeymapKind>,
    candidate: KeymapKind,
    device_name: &str,
) -> KeymapKind {
    match selected {
        None => {
            log::info!("Using {} keymap (from {})", candidate.as_ref(), device_name);
            candidate
        }
        Some(current) => {
            if current != candidate {
                log::warn!(
                    "Device {} wants the {} keymap, keeping {}",
                    device_name,
                    candidate.as_ref(),
                    current.as_ref()
                );
            }
            current
        }
    }
}

/// Device information for listing devices
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    /// Keymap the device would be attached with, if supported
    pub keymap: Option<KeymapKind>,
}

/// Attach the supported entries of a device list read in full up front.
///
/// Passthrough clones carry their source's name, so a clone that appeared
/// mid-scan would match the supported list itself. Reading every candidate
/// before the first `attach` keeps clones out. Returns the attached items
/// and the keymap the first of them selected.
pub fn attach_snapshot<T, S>(
    candidates: impl IntoIterator<Item = (PathBuf, T)>,
    supported: &[SupportedDevice],
    name_of: impl Fn(&T) -> String,
    mut attach: impl FnMut(&Path, &str, T) -> Option<S>,
) -> (Vec<S>, Option<KeymapKind>) {
    let snapshot: Vec<(PathBuf, T)> = candidates.into_iter().collect();
    let mut attached = Vec::new();
    let mut keymap = None;

    for (path, candidate) in snapshot {
        let name = name_of(&candidate);
        let Some(entry) = find_supported(&name, supported) else {
            continue;
        };
        log::info!("Found supported device: {} ({})", name, path.display());

        if let Some(item) = attach(&path, &name, candidate) {
            keymap = Some(select_keymap(keymap, entry.keymap, &name));
            attached.push(item);
        }
    }
    (attached, keymap)
}

#[cfg(feature = "hardware")]
pub use hardware::{discover, list_devices, Discovery, EvdevInput};

#[cfg(feature = "hardware")]
mod hardware {
    use std::io::{self, Read};
    use std::os::unix::io::{AsRawFd, RawFd};

    use evdev::Device;

    use super::{attach_snapshot, find_supported, DeviceError, DeviceInfo, SupportedDevice};
    use crate::event::DeviceHandle;
    use crate::keymap::KeymapKind;
    use crate::output::UinputSink;

    /// A grabbed event device read one raw record at a time.
    ///
    /// The grab is released when the input drops.
    pub struct EvdevInput {
        device: Device,
    }

    impl EvdevInput {
        pub fn new(device: Device) -> Self {
            Self { device }
        }
    }

    impl Read for EvdevInput {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = unsafe {
                libc::read(
                    self.device.as_raw_fd(),
                    buf.as_mut_ptr() as *mut libc::c_void,
                    buf.len(),
                )
            };
            if n < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(n as usize)
        }
    }

    impl AsRawFd for EvdevInput {
        fn as_raw_fd(&self) -> RawFd {
            self.device.as_raw_fd()
        }
    }

    impl Drop for EvdevInput {
        fn drop(&mut self) {
            // Fails harmlessly when the grab never succeeded or the device is gone
            let _ = self.device.ungrab();
        }
    }

    /// Attached devices and the keymap they selected.
    pub struct Discovery {
        pub devices: Vec<DeviceHandle>,
        pub keymap: KeymapKind,
    }

    /// Attach every supported device.
    ///
    /// A device whose passthrough sink cannot be created is skipped; a
    /// failed grab is only a warning. Zero attached devices is an error.
    pub fn discover(supported: &[SupportedDevice]) -> Result<Discovery, DeviceError> {
        let (devices, keymap) = attach_snapshot(
            evdev::enumerate(),
            supported,
            |device: &Device| device.name().unwrap_or("Unknown").to_string(),
            |path, name, mut device| {
                let sink = match UinputSink::passthrough_for(&device) {
                    Ok(sink) => sink,
                    Err(e) => {
                        log::warn!("Skipping {}: {}", name, e);
                        return None;
                    }
                };
                if let Err(e) = device.grab() {
                    log::warn!("Failed to grab {}: {} (events may be delivered twice)", name, e);
                }
                Some(DeviceHandle::new(
                    format!("{} ({})", name, path.display()),
                    Box::new(EvdevInput::new(device)),
                    Box::new(sink),
                ))
            },
        );

        match keymap {
            Some(keymap) if !devices.is_empty() => Ok(Discovery { devices, keymap }),
            _ => Err(DeviceError::NoSupportedDevice),
        }
    }

    /// List every input device and how it would be attached.
    ///
    /// This is useful for the --list-devices CLI flag.
    pub fn list_devices(supported: &[SupportedDevice]) -> Vec<DeviceInfo> {
        let mut infos: Vec<DeviceInfo> = evdev::enumerate()
            .map(|(path, device)| {
                let name = device.name().unwrap_or("Unknown").to_string();
                let keymap = find_supported(&name, supported).map(|entry| entry.keymap);
                DeviceInfo {
                    path: path.display().to_string(),
                    name,
                    keymap,
                }
            })
            .collect();
        infos.sort_by(|a, b| a.path.cmp(&b.path));
        infos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supported() -> Vec<SupportedDevice> {
        vec![
            SupportedDevice::new("mtk-kpd", KeymapKind::Keypad),
            SupportedDevice::new("AT Translated Set 2 keyboard", KeymapKind::Laptop),
        ]
    }

    #[test]
    fn test_exact_name_match() {
        let list = supported();
        assert_eq!(
            find_supported("mtk-kpd", &list).map(|e| e.keymap),
            Some(KeymapKind::Keypad)
        );
        assert_eq!(
            find_supported("AT Translated Set 2 keyboard", &list).map(|e| e.keymap),
            Some(KeymapKind::Laptop)
        );
        assert!(find_supported("mtk-kpd-2", &list).is_none());
        assert!(find_supported("MTK-KPD", &list).is_none());
    }

    #[test]
    fn test_virtual_device_never_matches() {
        let list = vec![SupportedDevice::new(
            "FlipMouse Virtual Mouse",
            KeymapKind::Keypad,
        )];
        assert!(is_virtual_device("FlipMouse Virtual Mouse"));
        assert!(find_supported("FlipMouse Virtual Mouse", &list).is_none());
    }

    #[test]
    fn test_first_device_selects_keymap() {
        let first = select_keymap(None, KeymapKind::Laptop, "laptop");
        assert_eq!(first, KeymapKind::Laptop);
        let second = select_keymap(Some(first), KeymapKind::Keypad, "keypad");
        assert_eq!(second, KeymapKind::Laptop);
    }

    #[test]
    fn test_clone_created_while_attaching_is_not_a_candidate() {
        use std::cell::RefCell;
        use std::rc::Rc;

        // A lazily read device directory that sees nodes added mid-scan
        let nodes = Rc::new(RefCell::new(vec!["mtk-kpd".to_string()]));
        let listing = {
            let nodes = Rc::clone(&nodes);
            let mut next = 0;
            std::iter::from_fn(move || {
                let name = nodes.borrow().get(next).cloned()?;
                let path = PathBuf::from(format!("/dev/input/event{}", next));
                next += 1;
                Some((path, name))
            })
        };

        let (attached, keymap) = attach_snapshot(
            listing,
            &supported(),
            |name: &String| name.clone(),
            |path, name, _| {
                // The passthrough clone shows up under the same name
                nodes.borrow_mut().push(name.to_string());
                Some(path.to_path_buf())
            },
        );

        assert_eq!(attached, vec![PathBuf::from("/dev/input/event0")]);
        assert_eq!(keymap, Some(KeymapKind::Keypad));
        assert_eq!(nodes.borrow().len(), 2);
    }

    #[test]
    fn test_failed_attach_does_not_select_keymap() {
        let listing = vec![
            (PathBuf::from("/dev/input/event0"), "AT Translated Set 2 keyboard"),
            (PathBuf::from("/dev/input/event1"), "Power Button"),
            (PathBuf::from("/dev/input/event2"), "mtk-kpd"),
        ];
        let (attached, keymap) = attach_snapshot(
            listing,
            &supported(),
            |name: &&str| name.to_string(),
            |_, name, _| (name == "mtk-kpd").then_some(name.to_string()),
        );
        assert_eq!(attached, vec!["mtk-kpd".to_string()]);
        assert_eq!(keymap, Some(KeymapKind::Keypad));
    }

    #[test]
    #[cfg(feature = "hardware")]
    fn test_list_devices() {
        // Works without permissions; devices that cannot be opened are not listed
        let infos = list_devices(&supported());
        assert!(infos.windows(2).all(|w| w[0].path <= w[1].path));
    }
}
