// FlipMouse Control Channel
// Command protocol, socket server and one-shot client

pub mod client;
pub mod protocol;
pub mod server;

pub use client::{send_command, ClientError};
pub use protocol::{handle_command, handle_line, ControlCommand, ControlOutcome, Reply};
pub use server::{ControlError, ControlRequest, ControlServer};
