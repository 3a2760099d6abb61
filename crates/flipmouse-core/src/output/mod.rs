// FlipMouse Output Layer
// Event sinks: passthrough clones and the shared virtual pointer

mod sink;

#[cfg(feature = "hardware")]
mod uinput;

pub use sink::EventSink;

#[cfg(feature = "hardware")]
pub use uinput::{UinputSink, POINTER_NAME};
