// FlipMouse Key Actions
// Press, release and autorepeat edges carried in EV_KEY values

/// What an EV_KEY event reports about its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Release,
    Press,
    /// Kernel autorepeat while the key stays down
    Repeat,
}

impl KeyAction {
    /// The edge that starts a key's effect; autorepeat is not one.
    pub fn just_pressed(self) -> bool {
        self == KeyAction::Press
    }
}

impl TryFrom<i32> for KeyAction {
    /// The value that is not a key state
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(KeyAction::Release),
            1 => Ok(KeyAction::Press),
            2 => Ok(KeyAction::Repeat),
            other => Err(other),
        }
    }
}
