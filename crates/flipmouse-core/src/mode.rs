// FlipMouse Mode State
// The one shared enabled/speed/drag record and its mutation accessors

use std::fmt;

use crate::status::StatusPublisher;
use crate::transform::toggle::ToggleHold;

/// Result of a change to the `enabled` flag.
///
/// Passed on to the choreographer; an unchanged flag yields no motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub was_enabled: bool,
    pub now_enabled: bool,
}

impl Transition {
    pub fn is_change(&self) -> bool {
        self.was_enabled != self.now_enabled
    }
}

/// Snapshot published to the status file and returned by `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub enabled: bool,
    pub speed: i32,
    pub drag: bool,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "enabled={} speed={} drag={}",
            u8::from(self.enabled),
            self.speed,
            u8::from(self.drag)
        )
    }
}

/// Process-wide pointer mode state.
///
/// Owned by the dispatcher and lent to the classifier and the control
/// handler. Every change of `enabled` goes through [`ModeState::set_enabled`],
/// which publishes the status and hands back the [`Transition`].
#[derive(Debug, Clone)]
pub struct ModeState {
    enabled: bool,
    drag_mode: bool,
    speed: i32,
    min_speed: i32,
    toggle: ToggleHold,
}

impl ModeState {
    pub fn new(initial_speed: i32, min_speed: i32) -> Self {
        Self {
            enabled: false,
            drag_mode: false,
            speed: initial_speed.max(min_speed),
            min_speed,
            toggle: ToggleHold::Idle,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn drag_mode(&self) -> bool {
        self.drag_mode
    }

    pub fn speed(&self) -> i32 {
        self.speed
    }

    pub fn status(&self) -> Status {
        Status {
            enabled: self.enabled,
            speed: self.speed,
            drag: self.drag_mode,
        }
    }

    /// Set `enabled` and publish the new status.
    pub fn set_enabled(
        &mut self,
        enabled: bool,
        publisher: &mut dyn StatusPublisher,
    ) -> Transition {
        let transition = Transition {
            was_enabled: self.enabled,
            now_enabled: enabled,
        };
        self.enabled = enabled;
        publisher.publish(&self.status());
        transition
    }

    pub fn flip_enabled(&mut self, publisher: &mut dyn StatusPublisher) -> Transition {
        self.set_enabled(!self.enabled, publisher)
    }

    pub fn increase_speed(&mut self) -> i32 {
        self.speed = self.speed.saturating_add(1);
        self.speed
    }

    /// Decrement, never going below the configured floor.
    pub fn decrease_speed(&mut self) -> i32 {
        self.speed = (self.speed - 1).max(self.min_speed);
        self.speed
    }

    /// Flip drag mode, returning the new value.
    pub fn flip_drag(&mut self) -> bool {
        self.drag_mode = !self.drag_mode;
        self.drag_mode
    }

    pub fn toggle_hold(&self) -> ToggleHold {
        self.toggle
    }

    pub(crate) fn set_toggle_hold(&mut self, hold: ToggleHold) {
        self.toggle = hold;
    }
}

impl Default for ModeState {
    fn default() -> Self {
        Self::new(4, 1)
    }
}
