// FlipMouse uinput Output Layer
// Virtual pointer creation and per-device passthrough clones

use std::io;

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, Device, EventType, InputEvent, RelativeAxisType};

use super::sink::EventSink;
use crate::codes::Key;
use crate::event::RawEvent;
use crate::input::DeviceError;

/// Name the virtual pointer registers under.
pub const POINTER_NAME: &str = "FlipMouse Virtual Mouse";

/// A uinput device used as an event sink
pub struct UinputSink {
    device: VirtualDevice,
}

impl UinputSink {
    /// Create the shared virtual pointer.
    pub fn create_pointer() -> Result<Self, DeviceError> {
        let mut axes = AttributeSet::<RelativeAxisType>::new();
        axes.insert(RelativeAxisType::REL_X);
        axes.insert(RelativeAxisType::REL_Y);
        axes.insert(RelativeAxisType::REL_WHEEL);
        axes.insert(RelativeAxisType::REL_HWHEEL);

        let mut buttons = AttributeSet::<evdev::Key>::new();
        buttons.insert(evdev::Key::new(Key::BTN_LEFT.code()));
        buttons.insert(evdev::Key::new(Key::BTN_RIGHT.code()));

        let device = VirtualDeviceBuilder::new()
            .map_err(DeviceError::DeviceCreation)?
            .name(POINTER_NAME)
            .with_relative_axes(&axes)
            .map_err(DeviceError::DeviceCreation)?
            .with_keys(&buttons)
            .map_err(DeviceError::DeviceCreation)?
            .build()
            .map_err(DeviceError::DeviceCreation)?;

        log::info!("Created virtual pointer: {}", POINTER_NAME);
        Ok(Self { device })
    }

    /// Create a passthrough clone of a physical device.
    ///
    /// Name, id, properties and every event class the source reports
    /// (keys, MSC, switches, relative axes) are copied. The input core drops
    /// events of a class the device never advertised, so a scancode record
    /// needs the MSC bits as much as a key needs its key bit.
    pub fn passthrough_for(source: &Device) -> Result<Self, DeviceError> {
        let name = source.name().unwrap_or("Unknown");
        let mut builder = VirtualDeviceBuilder::new()
            .map_err(DeviceError::DeviceCreation)?
            .name(name)
            .input_id(source.input_id())
            .with_properties(source.properties())
            .map_err(DeviceError::DeviceCreation)?;
        if let Some(keys) = source.supported_keys() {
            builder = builder
                .with_keys(keys)
                .map_err(DeviceError::DeviceCreation)?;
        }
        if let Some(misc) = source.misc_properties() {
            builder = builder
                .with_msc(misc)
                .map_err(DeviceError::DeviceCreation)?;
        }
        if let Some(switches) = source.supported_switches() {
            builder = builder
                .with_switches(switches)
                .map_err(DeviceError::DeviceCreation)?;
        }
        if let Some(axes) = source.supported_relative_axes() {
            builder = builder
                .with_relative_axes(axes)
                .map_err(DeviceError::DeviceCreation)?;
        }
        let device = builder.build().map_err(DeviceError::DeviceCreation)?;

        log::debug!("Created passthrough sink for {}", name);
        Ok(Self { device })
    }
}

impl EventSink for UinputSink {
    fn emit(&mut self, events: &[RawEvent]) -> io::Result<()> {
        // evdev terminates every batch with SYN_REPORT itself
        let batch: Vec<InputEvent> = events
            .iter()
            .filter(|event| !event.is_sync())
            .map(|event| InputEvent::new(EventType(event.kind), event.code, event.value))
            .collect();
        self.device.emit(&batch)
    }
}
