// FlipMouse Core Library
// Keypad to virtual pointer input mode multiplexer

pub mod action;
pub mod choreography;
pub mod codes;
pub mod control;
pub mod event;
pub mod input;
pub mod keymap;
pub mod mode;
pub mod output;
pub mod settings;
pub mod status;
pub mod transform;

pub use action::KeyAction;
pub use choreography::{Choreographer, MotionStep};
pub use codes::Key;
pub use control::{
    handle_command, handle_line, send_command, ClientError, ControlCommand, ControlError,
    ControlOutcome, ControlServer, Reply,
};
pub use event::{DeviceHandle, DispatchError, Dispatcher, RawEvent};
pub use input::{DeviceError, EventInput, ReadOutcome, SupportedDevice};
pub use keymap::{Keymap, KeymapKind};
pub use mode::{ModeState, Status, Transition};
pub use output::EventSink;
pub use settings::{Settings, SettingsError};
pub use status::{StatusFile, StatusPublisher};
pub use transform::{Classification, Classifier, PendingAction, ToggleTimer};

#[cfg(feature = "hardware")]
pub use input::{discover, list_devices, Discovery};
#[cfg(feature = "hardware")]
pub use output::UinputSink;
