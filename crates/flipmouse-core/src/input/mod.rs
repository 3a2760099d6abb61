// FlipMouse Input Layer
// Device matching, discovery and raw record reading

mod device;
mod event;

pub use device::{
    attach_snapshot, find_supported, is_virtual_device, select_keymap, DeviceError, DeviceInfo,
    SupportedDevice, VIRTUAL_DEVICE_PREFIX,
};
pub use event::{read_record, EventInput, ReadOutcome};

#[cfg(feature = "hardware")]
pub use device::{discover, list_devices, Discovery, EvdevInput};
