// FlipMouse Input Layer - Event Records
// One fixed-size record per read from a device stream

use std::io::{self, Read};
use std::os::unix::io::AsRawFd;

use crate::event::RawEvent;

/// Result of one read from a device stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete record
    Event(RawEvent),
    /// Fewer bytes than a record; discarded by the caller
    Short(usize),
    /// Nothing more to read: end of stream or the device is gone
    Closed,
    /// Spurious wakeup, nothing available yet
    Idle,
}

/// Read exactly one record with a single `read` call.
pub fn read_record<R: Read + ?Sized>(reader: &mut R) -> io::Result<ReadOutcome> {
    let mut buf = [0u8; RawEvent::RECORD_SIZE];
    match reader.read(&mut buf) {
        Ok(0) => Ok(ReadOutcome::Closed),
        Ok(n) if n < RawEvent::RECORD_SIZE => Ok(ReadOutcome::Short(n)),
        Ok(_) => Ok(RawEvent::from_record(&buf)
            .map(ReadOutcome::Event)
            .unwrap_or(ReadOutcome::Short(buf.len()))),
        Err(e) if e.raw_os_error() == Some(libc::ENODEV) => Ok(ReadOutcome::Closed),
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
            Ok(ReadOutcome::Idle)
        }
        Err(e) => Err(e),
    }
}

/// A pollable source of raw event records.
pub trait EventInput: AsRawFd {
    fn read_event(&mut self) -> io::Result<ReadOutcome>;
}

impl<T: Read + AsRawFd> EventInput for T {
    fn read_event(&mut self) -> io::Result<ReadOutcome> {
        read_record(self)
    }
}
