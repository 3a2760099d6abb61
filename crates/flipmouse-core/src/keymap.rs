// FlipMouse Keymaps
// Built-in scancode -> logical key tables, one active per process

use indexmap::IndexMap;
use serde::Deserialize;
use strum_macros::{AsRefStr, EnumIter};

use crate::codes::Key;

/// Which built-in table a supported device uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, AsRefStr, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum KeymapKind {
    /// Feature-phone matrix keypad
    Keypad,
    /// AT keyboard, for testing on a laptop
    Laptop,
}

const KEYPAD_TABLE: &[(i32, Key)] = &[
    (35, Key::UP),
    (9, Key::DOWN),
    (19, Key::LEFT),
    (34, Key::RIGHT),
    (33, Key::MENU), // scroll up
    (2, Key::SEND),  // scroll down
    (42, Key::HELP), // star key
];

const LAPTOP_TABLE: &[(i32, Key)] = &[
    (200, Key::UP),
    (208, Key::DOWN),
    (203, Key::LEFT),
    (205, Key::RIGHT),
    (17, Key::MENU),
    (31, Key::SEND),
    (88, Key::HELP), // F12
];

/// Immutable scancode -> keycode table.
///
/// Lookups work in both directions. Keycodes that appear as targets here
/// are delivered through the scancode path while pointer mode is active.
#[derive(Debug, Clone, PartialEq)]
pub struct Keymap {
    by_scan: IndexMap<i32, Key>,
}

impl Keymap {
    pub fn builtin(kind: KeymapKind) -> Self {
        let table = match kind {
            KeymapKind::Keypad => KEYPAD_TABLE,
            KeymapKind::Laptop => LAPTOP_TABLE,
        };
        Self {
            by_scan: table.iter().copied().collect(),
        }
    }

    /// Logical key reported by a scancode, if the table knows it
    pub fn keycode_for(&self, scancode: i32) -> Option<Key> {
        self.by_scan.get(&scancode).copied()
    }

    /// Scancode that produces a logical key, if any
    pub fn scancode_for(&self, key: Key) -> Option<i32> {
        self.by_scan
            .iter()
            .find(|(_, mapped)| **mapped == key)
            .map(|(scan, _)| *scan)
    }

    /// True when `key` also arrives as a scancode-carrier event.
    pub fn is_scan_target(&self, key: Key) -> bool {
        self.scancode_for(key).is_some()
    }

    pub fn entries(&self) -> impl Iterator<Item = (i32, Key)> + '_ {
        self.by_scan.iter().map(|(scan, key)| (*scan, *key))
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::builtin(KeymapKind::Keypad)
    }
}
