// FlipMouse Pointer Choreographer
// Scripted relative-motion walks played on mode transitions

use std::time::Duration;

use smallvec::SmallVec;

use crate::codes::{REL_X, REL_Y};
use crate::event::RawEvent;
use crate::mode::Transition;
use crate::settings::ChoreographySettings;

/// One relative-motion step of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionStep {
    pub dx: i32,
    pub dy: i32,
}

impl MotionStep {
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// The events of this step, X before Y, zero axes omitted.
    ///
    /// The sink terminates the batch with SYN_REPORT.
    pub fn events(&self) -> SmallVec<[RawEvent; 2]> {
        let mut events = SmallVec::new();
        if self.dx != 0 {
            events.push(RawEvent::rel(REL_X, self.dx));
        }
        if self.dy != 0 {
            events.push(RawEvent::rel(REL_Y, self.dy));
        }
        events
    }
}

/// Generates the parking and centering walks.
///
/// Only relative motion is available, so parking slams the pointer into
/// the bottom-right corner with enough large steps to reach it from
/// anywhere on a bounded display. Centering then walks back one axis at a
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choreographer {
    settings: ChoreographySettings,
}

impl Choreographer {
    pub fn new(settings: ChoreographySettings) -> Self {
        Self { settings }
    }

    /// Delay to leave after every emitted step.
    pub fn settle(&self) -> Duration {
        self.settings.settle()
    }

    pub fn park(&self) -> Vec<MotionStep> {
        let step = self.settings.park_step;
        (0..self.settings.park_reps)
            .map(|_| MotionStep::new(step, step))
            .collect()
    }

    /// Horizontal steps left, then vertical steps up, never both at once.
    pub fn center_from_park(&self) -> Vec<MotionStep> {
        let mut steps = Vec::new();
        for dx in split(self.settings.center_left, self.settings.center_step) {
            steps.push(MotionStep::new(-dx, 0));
        }
        for dy in split(self.settings.center_up, self.settings.center_step) {
            steps.push(MotionStep::new(0, -dy));
        }
        steps
    }

    /// The walk for a change of `enabled`; empty when nothing changed.
    pub fn on_mode_transition(&self, transition: Transition) -> Vec<MotionStep> {
        match (transition.was_enabled, transition.now_enabled) {
            (false, true) => {
                let mut steps = self.park();
                steps.extend(self.center_from_park());
                steps
            }
            (true, false) => self.park(),
            _ => Vec::new(),
        }
    }
}

impl Default for Choreographer {
    fn default() -> Self {
        Self::new(ChoreographySettings::default())
    }
}

/// Split `total` into chunks of at most `step`.
fn split(total: i32, step: i32) -> impl Iterator<Item = i32> {
    let step = step.max(1);
    let mut remaining = total.max(0);
    std::iter::from_fn(move || {
        if remaining == 0 {
            return None;
        }
        let chunk = remaining.min(step);
        remaining -= chunk;
        Some(chunk)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(was: bool, now: bool) -> Transition {
        Transition {
            was_enabled: was,
            now_enabled: now,
        }
    }

    #[test]
    fn test_park_slams_down_right() {
        let c = Choreographer::default();
        let steps = c.park();
        assert_eq!(steps.len(), 40);
        assert!(steps.iter().all(|s| *s == MotionStep::new(200, 200)));
    }

    #[test]
    fn test_center_moves_one_axis_at_a_time() {
        let c = Choreographer::default();
        let steps = c.center_from_park();

        assert!(steps.iter().all(|s| s.dx == 0 || s.dy == 0));
        let dx: i32 = steps.iter().map(|s| s.dx).sum();
        let dy: i32 = steps.iter().map(|s| s.dy).sum();
        assert_eq!(dx, -40);
        assert_eq!(dy, -60);

        // All horizontal steps come first
        let first_vertical = steps.iter().position(|s| s.dy != 0).unwrap();
        assert!(steps[..first_vertical].iter().all(|s| s.dy == 0));
        assert!(steps[first_vertical..].iter().all(|s| s.dx == 0));
        assert!(steps.iter().all(|s| s.dx.abs() <= 20 && s.dy.abs() <= 20));
    }

    #[test]
    fn test_uneven_offsets_are_split() {
        let c = Choreographer::new(ChoreographySettings {
            center_step: 15,
            center_left: 40,
            center_up: 0,
            ..ChoreographySettings::default()
        });
        let steps = c.center_from_park();
        assert_eq!(
            steps,
            vec![
                MotionStep::new(-15, 0),
                MotionStep::new(-15, 0),
                MotionStep::new(-10, 0)
            ]
        );
    }

    #[test]
    fn test_transitions() {
        let c = Choreographer::default();
        assert!(c.on_mode_transition(transition(false, false)).is_empty());
        assert!(c.on_mode_transition(transition(true, true)).is_empty());
        assert_eq!(c.on_mode_transition(transition(true, false)), c.park());

        let enable = c.on_mode_transition(transition(false, true));
        assert_eq!(enable.len(), 40 + 2 + 3);
        assert_eq!(enable[..40], c.park()[..]);
    }

    #[test]
    fn test_step_events() {
        assert_eq!(
            MotionStep::new(5, -3).events().as_slice(),
            &[RawEvent::rel(REL_X, 5), RawEvent::rel(REL_Y, -3)]
        );
        assert_eq!(
            MotionStep::new(0, -3).events().as_slice(),
            &[RawEvent::rel(REL_Y, -3)]
        );
        assert!(MotionStep::new(0, 0).events().is_empty());
    }
}
