// FlipMouse Event Handling
// Raw event records and the dispatch loop

pub mod r#loop;
pub mod raw;

pub use r#loop::{DeviceHandle, DispatchError, Dispatcher};
pub use raw::RawEvent;
