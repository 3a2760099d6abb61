// FlipMouse Event Codes
// Linux input-event-codes.h values used by the input multiplexer

use std::fmt;

/// EV_SYN event type (synchronization marker)
pub const EV_SYN: u16 = 0x00;
/// EV_KEY event type (keys and buttons)
pub const EV_KEY: u16 = 0x01;
/// EV_REL event type (relative axes)
pub const EV_REL: u16 = 0x02;
/// EV_MSC event type (miscellaneous, carries scancodes)
pub const EV_MSC: u16 = 0x04;

pub const SYN_REPORT: u16 = 0x00;
pub const MSC_SCAN: u16 = 0x04;

pub const REL_X: u16 = 0x00;
pub const REL_Y: u16 = 0x01;
pub const REL_HWHEEL: u16 = 0x06;
pub const REL_WHEEL: u16 = 0x08;

/// A logical key code as reported in EV_KEY events.
///
/// The numeric values match Linux input-event-codes.h definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Key(pub u16);

impl Key {
    pub const ENTER: Key = Key(28);
    pub const B: Key = Key(48);
    pub const F12: Key = Key(88);
    pub const UP: Key = Key(103);
    pub const LEFT: Key = Key(105);
    pub const RIGHT: Key = Key(106);
    pub const DOWN: Key = Key(108);
    pub const VOLUME_DOWN: Key = Key(114);
    pub const VOLUME_UP: Key = Key(115);
    pub const HELP: Key = Key(138);
    pub const MENU: Key = Key(139);
    pub const SEND: Key = Key(231);
    pub const BTN_LEFT: Key = Key(0x110);
    pub const BTN_RIGHT: Key = Key(0x111);

    /// Get the raw numeric code value
    pub fn code(self) -> u16 {
        self.0
    }

    /// Keys that switch between keyboard and pointer mode.
    ///
    /// The keypad reports its star key as HELP, laptops use F12.
    pub fn is_toggle(self) -> bool {
        self == Key::HELP || self == Key::F12
    }

    /// Get the name of this key
    pub fn name(self) -> &'static str {
        match self {
            Key::ENTER => "KEY_ENTER",
            Key::B => "KEY_B",
            Key::F12 => "KEY_F12",
            Key::UP => "KEY_UP",
            Key::LEFT => "KEY_LEFT",
            Key::RIGHT => "KEY_RIGHT",
            Key::DOWN => "KEY_DOWN",
            Key::VOLUME_DOWN => "KEY_VOLUMEDOWN",
            Key::VOLUME_UP => "KEY_VOLUMEUP",
            Key::HELP => "KEY_HELP",
            Key::MENU => "KEY_MENU",
            Key::SEND => "KEY_SEND",
            Key::BTN_LEFT => "BTN_LEFT",
            Key::BTN_RIGHT => "BTN_RIGHT",
            _ => "?",
        }
    }
}

impl From<u16> for Key {
    fn from(code: u16) -> Self {
        Key(code)
    }
}

impl From<Key> for u16 {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            "?" => write!(f, "KEY({})", self.0),
            name => f.write_str(name),
        }
    }
}

/// Symbolic name of an event type, for trace output.
pub fn event_type_name(kind: u16) -> &'static str {
    match kind {
        EV_SYN => "EV_SYN",
        EV_KEY => "EV_KEY",
        EV_REL => "EV_REL",
        EV_MSC => "EV_MSC",
        _ => "EV_?",
    }
}

/// Symbolic name of an event code within its type, for trace output.
pub fn event_code_name(kind: u16, code: u16) -> &'static str {
    match (kind, code) {
        (EV_SYN, SYN_REPORT) => "SYN_REPORT",
        (EV_MSC, MSC_SCAN) => "MSC_SCAN",
        (EV_REL, REL_X) => "REL_X",
        (EV_REL, REL_Y) => "REL_Y",
        (EV_REL, REL_HWHEEL) => "REL_HWHEEL",
        (EV_REL, REL_WHEEL) => "REL_WHEEL",
        (EV_KEY, code) => Key(code).name(),
        _ => "?",
    }
}
