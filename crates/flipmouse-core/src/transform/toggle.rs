// FlipMouse Toggle Timer
// Tap vs. hold classification of the mode toggle key

use std::time::Duration;

use crate::codes::Key;
use crate::mode::{ModeState, Transition};
use crate::status::StatusPublisher;

/// Where the toggle key is in its press/release cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleHold {
    #[default]
    Idle,
    /// Key went down at `at` (event time)
    Pressed { at: Duration },
    /// Held past the threshold; a press of `key` was sent to the origin device
    Alternate { key: Key, since: Duration },
    /// Alternate press and release both sent, physical key still down
    Spent { since: Duration },
}

/// What a release of the toggle key amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleRelease {
    /// No press was recorded
    Spurious,
    /// Released before the threshold; `enabled` was flipped
    Tap(Transition),
    /// Held at least the threshold without the alternate function firing
    Held { held: Duration, eject: bool },
    /// The alternate press of `key` is still outstanding on the origin device
    AlternatePending { key: Key, eject: bool },
    /// The alternate function already completed
    Consumed { eject: bool },
}

impl ToggleRelease {
    /// True when the hold lasted long enough to request shutdown.
    pub fn ejects(&self) -> bool {
        match self {
            ToggleRelease::Held { eject, .. }
            | ToggleRelease::AlternatePending { eject, .. }
            | ToggleRelease::Consumed { eject } => *eject,
            ToggleRelease::Spurious | ToggleRelease::Tap(_) => false,
        }
    }
}

/// Classifies toggle key press/release pairs by hold duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleTimer {
    threshold: Duration,
    eject_after: Option<Duration>,
}

impl ToggleTimer {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            eject_after: None,
        }
    }

    /// Releasing after a hold of at least `limit` requests shutdown.
    pub fn with_eject_after(mut self, limit: Option<Duration>) -> Self {
        self.eject_after = limit;
        self
    }

    fn ejects(&self, held: Duration) -> bool {
        self.eject_after.is_some_and(|limit| held >= limit)
    }

    /// Record the press time.
    pub fn on_press(&self, mode: &mut ModeState, now: Duration) {
        mode.set_toggle_hold(ToggleHold::Pressed { at: now });
    }

    /// Classify the release. The pressed-at marker is always cleared.
    pub fn on_release(
        &self,
        mode: &mut ModeState,
        now: Duration,
        publisher: &mut dyn StatusPublisher,
    ) -> ToggleRelease {
        let outcome = match mode.toggle_hold() {
            ToggleHold::Idle => ToggleRelease::Spurious,
            ToggleHold::Pressed { at } => {
                let held = now.saturating_sub(at);
                log::debug!("Toggle key held for {:?}", held);
                if held < self.threshold {
                    ToggleRelease::Tap(mode.flip_enabled(publisher))
                } else {
                    ToggleRelease::Held {
                        held,
                        eject: self.ejects(held),
                    }
                }
            }
            ToggleHold::Alternate { key, since } => ToggleRelease::AlternatePending {
                key,
                eject: self.ejects(now.saturating_sub(since)),
            },
            ToggleHold::Spent { since } => ToggleRelease::Consumed {
                eject: self.ejects(now.saturating_sub(since)),
            },
        };
        mode.set_toggle_hold(ToggleHold::Idle);
        outcome
    }

    /// Scancode path of a held toggle key.
    ///
    /// Returns the value of the alternate `key` event to send to the origin
    /// device: a press once the hold exceeds the threshold, then the matching
    /// release on the next scancode report.
    pub fn on_scan(&self, mode: &mut ModeState, key: Key, now: Duration) -> Option<i32> {
        match mode.toggle_hold() {
            ToggleHold::Pressed { at } if now.saturating_sub(at) > self.threshold => {
                mode.set_toggle_hold(ToggleHold::Alternate { key, since: at });
                Some(1)
            }
            ToggleHold::Alternate { since, .. } => {
                mode.set_toggle_hold(ToggleHold::Spent { since });
                Some(0)
            }
            _ => None,
        }
    }
}

impl Default for ToggleTimer {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
