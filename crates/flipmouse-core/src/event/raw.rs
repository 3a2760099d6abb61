// FlipMouse Raw Events
// One kernel input_event record, decoded into plain fields

use std::fmt;
use std::mem;
use std::time::Duration;

use crate::action::KeyAction;
use crate::codes::{
    event_code_name, event_type_name, Key, EV_KEY, EV_MSC, EV_REL, EV_SYN, MSC_SCAN, SYN_REPORT,
};

/// A single input event as read from (or written to) an event device.
///
/// The binary layout is owned by the kernel; this type only mirrors its
/// fields so the rest of the crate never touches `libc::input_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawEvent {
    /// Seconds part of the event timestamp
    pub sec: i64,
    /// Microseconds part of the event timestamp
    pub usec: i64,
    /// Event type (EV_KEY, EV_REL, ...)
    pub kind: u16,
    /// Event code within its type
    pub code: u16,
    /// Event value (key state, relative delta, scancode, ...)
    pub value: i32,
}

impl RawEvent {
    /// Size of one record on the device stream.
    pub const RECORD_SIZE: usize = mem::size_of::<libc::input_event>();

    pub fn new(kind: u16, code: u16, value: i32) -> Self {
        Self {
            sec: 0,
            usec: 0,
            kind,
            code,
            value,
        }
    }

    pub fn key(key: Key, value: i32) -> Self {
        Self::new(EV_KEY, key.code(), value)
    }

    pub fn rel(axis: u16, value: i32) -> Self {
        Self::new(EV_REL, axis, value)
    }

    /// An MSC_SCAN event carrying a hardware scancode.
    pub fn scan(scancode: i32) -> Self {
        Self::new(EV_MSC, MSC_SCAN, scancode)
    }

    /// The SYN_REPORT marker that terminates a batch.
    pub fn sync() -> Self {
        Self::new(EV_SYN, SYN_REPORT, 0)
    }

    /// Same event stamped with the given time.
    pub fn at(mut self, time: Duration) -> Self {
        self.sec = time.as_secs() as i64;
        self.usec = i64::from(time.subsec_micros());
        self
    }

    /// Rewrite type, code and value, keeping the timestamp.
    pub fn rewritten(self, kind: u16, code: u16, value: i32) -> Self {
        Self {
            kind,
            code,
            value,
            ..self
        }
    }

    /// Event timestamp; negative kernel times clamp to zero.
    pub fn timestamp(&self) -> Duration {
        let secs = u64::try_from(self.sec).unwrap_or(0);
        let micros = u64::try_from(self.usec).unwrap_or(0);
        Duration::from_secs(secs) + Duration::from_micros(micros)
    }

    pub fn is_key(&self) -> bool {
        self.kind == EV_KEY
    }

    /// True for scancode-carrier events
    pub fn is_scan(&self) -> bool {
        self.kind == EV_MSC && self.code == MSC_SCAN
    }

    pub fn is_sync(&self) -> bool {
        self.kind == EV_SYN
    }

    /// Press/release/repeat state of an EV_KEY event.
    ///
    /// Scancode carriers hold a scancode in `value`, never a key state.
    pub fn key_action(&self) -> Option<KeyAction> {
        if !self.is_key() {
            return None;
        }
        KeyAction::try_from(self.value).ok()
    }

    /// Decode one record. Returns `None` unless `bytes` is exactly one record long.
    pub fn from_record(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::RECORD_SIZE {
            return None;
        }
        // SAFETY: length checked above; input_event is plain old data.
        let raw: libc::input_event =
            unsafe { std::ptr::read_unaligned(bytes.as_ptr().cast::<libc::input_event>()) };
        Some(Self {
            sec: raw.time.tv_sec as i64,
            usec: raw.time.tv_usec as i64,
            kind: raw.type_,
            code: raw.code,
            value: raw.value,
        })
    }

    /// Encode as one record in the kernel layout.
    pub fn to_record(&self) -> Vec<u8> {
        // Zeroed first so struct padding never carries garbage.
        // SAFETY: input_event is plain old data; all-zero is a valid value.
        let mut raw: libc::input_event = unsafe { mem::zeroed() };
        raw.time.tv_sec = self.sec as libc::time_t;
        raw.time.tv_usec = self.usec as libc::suseconds_t;
        raw.type_ = self.kind;
        raw.code = self.code;
        raw.value = self.value;
        // SAFETY: reading the bytes of a fully initialised POD value.
        let bytes = unsafe {
            std::slice::from_raw_parts(
                (&raw as *const libc::input_event).cast::<u8>(),
                Self::RECORD_SIZE,
            )
        };
        bytes.to_vec()
    }
}

impl fmt::Display for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time {}.{:06}, type {} ({}), code {} ({}), value {}",
            self.sec,
            self.usec,
            self.kind,
            event_type_name(self.kind),
            self.code,
            event_code_name(self.kind, self.code),
            self.value
        )
    }
}
