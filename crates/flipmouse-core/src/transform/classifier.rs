// FlipMouse Event Classifier
// Decides per hardware event: pass, mute, or rewrite for the pointer

use crate::action::KeyAction;
use crate::codes::{Key, EV_KEY, EV_MSC, EV_REL, MSC_SCAN, REL_WHEEL, REL_X, REL_Y};
use crate::event::RawEvent;
use crate::keymap::Keymap;
use crate::mode::{ModeState, Transition};
use crate::status::StatusPublisher;

use super::toggle::{ToggleRelease, ToggleTimer};

/// What the dispatch loop must do with one input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Forward unchanged to the originating device's sink
    Pass,
    /// Drop
    Mute,
    /// Forward the rewritten event to the originating device's sink
    RouteOrigin(RawEvent),
    /// Send the rewritten event to the virtual pointer
    RoutePointer(RawEvent),
}

/// Classifier verdict plus the side effects the dispatcher must apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub action: PendingAction,
    /// Set when the event flipped `enabled`
    pub transition: Option<Transition>,
    /// Set when the event requests loop termination
    pub shutdown: bool,
}

impl Classification {
    fn action(action: PendingAction) -> Self {
        Self {
            action,
            transition: None,
            shutdown: false,
        }
    }
}

impl From<PendingAction> for Classification {
    fn from(action: PendingAction) -> Self {
        Self::action(action)
    }
}

/// Wheel keys, each with its own decimation counter.
#[derive(Debug, Clone, Copy)]
enum Wheel {
    Up = 0,
    Down = 1,
}

/// Stateful per-event classifier.
///
/// Holds the active keymap, the toggle timer and the wheel decimation
/// counters. Mode state is lent in on each call.
#[derive(Debug, Clone)]
pub struct Classifier {
    keymap: Keymap,
    toggle: ToggleTimer,
    wheel_slowdown: u32,
    wheel_counts: [u32; 2],
}

impl Classifier {
    pub fn new(keymap: Keymap, toggle: ToggleTimer, wheel_slowdown: u32) -> Self {
        Self {
            keymap,
            toggle,
            wheel_slowdown: wheel_slowdown.max(1),
            wheel_counts: [0; 2],
        }
    }

    /// Classify one event against the current mode.
    pub fn classify(
        &mut self,
        event: RawEvent,
        mode: &mut ModeState,
        publisher: &mut dyn StatusPublisher,
    ) -> Classification {
        let now = event.timestamp();

        // Long hold of the toggle key, seen through its scancode. Checked
        // before anything else so a long hold never reaches the key rules.
        if event.is_scan() {
            if let Some(key) = self.keymap.keycode_for(event.value) {
                if key.is_toggle() {
                    if let Some(value) = self.toggle.on_scan(mode, key, now) {
                        log::debug!("Trigger default button: {} value {}", key, value);
                        let rewritten = event.rewritten(EV_KEY, key.code(), value);
                        return PendingAction::RouteOrigin(rewritten).into();
                    }
                }
            }
        }

        if event.is_key() && Key(event.code).is_toggle() {
            return self.toggle_event(event, mode, publisher);
        }

        if !mode.enabled() {
            return PendingAction::Pass.into();
        }

        self.pointer_event(event, mode).into()
    }

    fn toggle_event(
        &mut self,
        event: RawEvent,
        mode: &mut ModeState,
        publisher: &mut dyn StatusPublisher,
    ) -> Classification {
        let now = event.timestamp();
        match event.key_action() {
            Some(KeyAction::Press) => {
                self.toggle.on_press(mode, now);
                PendingAction::RoutePointer(event).into()
            }
            Some(KeyAction::Release) => {
                let release = self.toggle.on_release(mode, now, publisher);
                let shutdown = release.ejects();
                if shutdown {
                    log::info!("Toggle key held past the eject limit, stopping");
                }
                let (action, transition) = match release {
                    ToggleRelease::Spurious | ToggleRelease::Consumed { .. } => {
                        (PendingAction::Mute, None)
                    }
                    ToggleRelease::Tap(transition) => {
                        log::info!(
                            "Mouse {} (manual)",
                            if transition.now_enabled { "enabled" } else { "disabled" }
                        );
                        (PendingAction::RoutePointer(event), Some(transition))
                    }
                    ToggleRelease::Held { .. } => (PendingAction::RoutePointer(event), None),
                    ToggleRelease::AlternatePending { key, .. } => (
                        PendingAction::RouteOrigin(event.rewritten(EV_KEY, key.code(), 0)),
                        None,
                    ),
                };
                Classification {
                    action,
                    transition,
                    shutdown,
                }
            }
            _ => PendingAction::Mute.into(),
        }
    }

    fn pointer_event(&mut self, event: RawEvent, mode: &mut ModeState) -> PendingAction {
        let key = match (event.kind, event.code) {
            (EV_MSC, MSC_SCAN) => match self.keymap.keycode_for(event.value) {
                Some(key) => {
                    log::trace!("Scan code {} mapped to {}", event.value, key);
                    key
                }
                None => return PendingAction::Pass,
            },
            (EV_KEY, code) => {
                let key = Key(code);
                if self.keymap.is_scan_target(key) {
                    log::trace!("{} handled by MSC_SCAN", key);
                    return PendingAction::Mute;
                }
                key
            }
            _ => return PendingAction::Pass,
        };

        let speed = mode.speed();
        let pressed = event.key_action().is_some_and(KeyAction::just_pressed);

        match key {
            Key::VOLUME_UP => {
                if pressed {
                    log::debug!("Mouse speed increased to {}", mode.increase_speed());
                }
                PendingAction::Mute
            }
            Key::VOLUME_DOWN => {
                if pressed {
                    log::debug!("Mouse speed decreased to {}", mode.decrease_speed());
                }
                PendingAction::Mute
            }
            Key::ENTER => {
                log::debug!("Mouse left click");
                PendingAction::RoutePointer(event.rewritten(
                    EV_KEY,
                    Key::BTN_LEFT.code(),
                    event.value,
                ))
            }
            // Only the press toggles dragging; release and repeat fall
            // through to the origin device untouched.
            Key::B if pressed => {
                let dragging = mode.flip_drag();
                log::debug!("Drag mode {}", if dragging { "enabled" } else { "disabled" });
                PendingAction::RoutePointer(event.rewritten(
                    EV_KEY,
                    Key::BTN_LEFT.code(),
                    i32::from(dragging),
                ))
            }
            Key::UP => PendingAction::RoutePointer(event.rewritten(EV_REL, REL_Y, -speed)),
            Key::DOWN => PendingAction::RoutePointer(event.rewritten(EV_REL, REL_Y, speed)),
            Key::LEFT => PendingAction::RoutePointer(event.rewritten(EV_REL, REL_X, -speed)),
            Key::RIGHT => PendingAction::RoutePointer(event.rewritten(EV_REL, REL_X, speed)),
            Key::MENU => self.wheel(Wheel::Up, event),
            Key::SEND => self.wheel(Wheel::Down, event),
            _ => PendingAction::Pass,
        }
    }

    /// Emit every Nth event of a wheel key, muting the rest.
    fn wheel(&mut self, wheel: Wheel, event: RawEvent) -> PendingAction {
        let slot = &mut self.wheel_counts[wheel as usize];
        let count = *slot;
        *slot = count.wrapping_add(1);
        if count % self.wheel_slowdown != 0 {
            return PendingAction::Mute;
        }
        let direction = match wheel {
            Wheel::Up => 1,
            Wheel::Down => -1,
        };
        PendingAction::RoutePointer(event.rewritten(EV_REL, REL_WHEEL, direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::KeymapKind;
    use crate::mode::Status;
    use std::time::Duration;

    fn classifier() -> Classifier {
        Classifier::new(
            Keymap::builtin(KeymapKind::Keypad),
            ToggleTimer::default(),
            5,
        )
    }

    fn enabled_mode() -> ModeState {
        let mut mode = ModeState::default();
        let mut sink: Vec<Status> = Vec::new();
        mode.set_enabled(true, &mut sink);
        mode
    }

    fn at(event: RawEvent, secs: f64) -> RawEvent {
        event.at(Duration::from_secs_f64(secs))
    }

    #[test]
    fn test_disabled_passes_everything() {
        let mut c = classifier();
        let mut mode = ModeState::default();
        let mut published: Vec<Status> = Vec::new();

        for event in [
            RawEvent::scan(35),
            RawEvent::key(Key::UP, 1),
            RawEvent::key(Key::VOLUME_UP, 1),
            RawEvent::key(Key::B, 1),
            RawEvent::key(Key::ENTER, 1),
            RawEvent::sync(),
        ] {
            let result = c.classify(event, &mut mode, &mut published);
            assert_eq!(result.action, PendingAction::Pass, "{event}");
        }
        assert_eq!(mode.speed(), 4);
        assert!(!mode.drag_mode());
    }

    #[test]
    fn test_directional_scan_becomes_motion() {
        let mut c = classifier();
        let mut mode = enabled_mode();
        let mut published: Vec<Status> = Vec::new();

        let result = c.classify(RawEvent::scan(35), &mut mode, &mut published);
        assert_eq!(
            result.action,
            PendingAction::RoutePointer(RawEvent::rel(REL_Y, -4))
        );
        let result = c.classify(RawEvent::scan(34), &mut mode, &mut published);
        assert_eq!(
            result.action,
            PendingAction::RoutePointer(RawEvent::rel(REL_X, 4))
        );
    }

    #[test]
    fn test_duplicate_keycode_muted_when_enabled() {
        let mut c = classifier();
        let mut mode = enabled_mode();
        let mut published: Vec<Status> = Vec::new();

        let result = c.classify(RawEvent::key(Key::UP, 1), &mut mode, &mut published);
        assert_eq!(result.action, PendingAction::Mute);
    }

    #[test]
    fn test_unknown_scan_passes() {
        let mut c = classifier();
        let mut mode = enabled_mode();
        let mut published: Vec<Status> = Vec::new();

        let result = c.classify(RawEvent::scan(99), &mut mode, &mut published);
        assert_eq!(result.action, PendingAction::Pass);
    }

    #[test]
    fn test_volume_keys_adjust_speed_on_press_only() {
        let mut c = classifier();
        let mut mode = enabled_mode();
        let mut published: Vec<Status> = Vec::new();

        for value in [1, 2, 0] {
            let result = c.classify(
                RawEvent::key(Key::VOLUME_UP, value),
                &mut mode,
                &mut published,
            );
            assert_eq!(result.action, PendingAction::Mute);
        }
        assert_eq!(mode.speed(), 5);

        c.classify(RawEvent::key(Key::VOLUME_DOWN, 1), &mut mode, &mut published);
        assert_eq!(mode.speed(), 4);
    }

    #[test]
    fn test_select_key_is_left_button() {
        let mut c = classifier();
        let mut mode = enabled_mode();
        let mut published: Vec<Status> = Vec::new();

        for value in [1, 0] {
            let result = c.classify(RawEvent::key(Key::ENTER, value), &mut mode, &mut published);
            assert_eq!(
                result.action,
                PendingAction::RoutePointer(RawEvent::key(Key::BTN_LEFT, value))
            );
        }
    }

    #[test]
    fn test_drag_press_mirrors_drag_mode() {
        let mut c = classifier();
        let mut mode = enabled_mode();
        let mut published: Vec<Status> = Vec::new();

        let first = c.classify(RawEvent::key(Key::B, 1), &mut mode, &mut published);
        assert_eq!(
            first.action,
            PendingAction::RoutePointer(RawEvent::key(Key::BTN_LEFT, 1))
        );
        assert!(mode.drag_mode());

        let second = c.classify(RawEvent::key(Key::B, 1), &mut mode, &mut published);
        assert_eq!(
            second.action,
            PendingAction::RoutePointer(RawEvent::key(Key::BTN_LEFT, 0))
        );
        assert!(!mode.drag_mode());
    }

    #[test]
    fn test_drag_release_passes_through() {
        let mut c = classifier();
        let mut mode = enabled_mode();
        let mut published: Vec<Status> = Vec::new();

        c.classify(RawEvent::key(Key::B, 1), &mut mode, &mut published);
        let release = c.classify(RawEvent::key(Key::B, 0), &mut mode, &mut published);
        assert_eq!(release.action, PendingAction::Pass);
        let repeat = c.classify(RawEvent::key(Key::B, 2), &mut mode, &mut published);
        assert_eq!(repeat.action, PendingAction::Pass);
        assert!(mode.drag_mode());
    }

    #[test]
    fn test_wheel_decimation_per_key() {
        let mut c = classifier();
        let mut mode = enabled_mode();
        let mut published: Vec<Status> = Vec::new();

        let mut up = 0;
        let mut down = 0;
        for _ in 0..10 {
            if let PendingAction::RoutePointer(ev) =
                c.classify(RawEvent::scan(33), &mut mode, &mut published).action
            {
                assert_eq!((ev.code, ev.value), (REL_WHEEL, 1));
                up += 1;
            }
            if let PendingAction::RoutePointer(ev) =
                c.classify(RawEvent::scan(2), &mut mode, &mut published).action
            {
                assert_eq!((ev.code, ev.value), (REL_WHEEL, -1));
                down += 1;
            }
        }
        assert_eq!(up, 2);
        assert_eq!(down, 2);
    }

    #[test]
    fn test_toggle_tap_reports_transition() {
        let mut c = classifier();
        let mut mode = ModeState::default();
        let mut published: Vec<Status> = Vec::new();

        let press = c.classify(at(RawEvent::key(Key::HELP, 1), 5.0), &mut mode, &mut published);
        assert!(matches!(press.action, PendingAction::RoutePointer(_)));
        assert_eq!(press.transition, None);

        let release = c.classify(at(RawEvent::key(Key::HELP, 0), 5.2), &mut mode, &mut published);
        assert_eq!(
            release.transition,
            Some(Transition {
                was_enabled: false,
                now_enabled: true
            })
        );
        assert!(mode.enabled());
        assert_eq!(published.len(), 1);
    }

    #[test]
    fn test_toggle_repeat_is_muted() {
        let mut c = classifier();
        let mut mode = ModeState::default();
        let mut published: Vec<Status> = Vec::new();

        c.classify(at(RawEvent::key(Key::F12, 1), 1.0), &mut mode, &mut published);
        let repeat = c.classify(at(RawEvent::key(Key::F12, 2), 1.3), &mut mode, &mut published);
        assert_eq!(repeat.action, PendingAction::Mute);
    }

    #[test]
    fn test_long_hold_emits_default_button_to_origin() {
        let mut c = classifier();
        let mut mode = ModeState::default();
        let mut published: Vec<Status> = Vec::new();

        c.classify(at(RawEvent::key(Key::HELP, 1), 1.0), &mut mode, &mut published);
        let alt_press = c.classify(at(RawEvent::scan(42), 2.5), &mut mode, &mut published);
        assert_eq!(
            alt_press.action,
            PendingAction::RouteOrigin(at(RawEvent::key(Key::HELP, 1), 2.5))
        );
        let alt_release = c.classify(at(RawEvent::scan(42), 2.6), &mut mode, &mut published);
        assert_eq!(
            alt_release.action,
            PendingAction::RouteOrigin(at(RawEvent::key(Key::HELP, 0), 2.6))
        );
        let key_release = c.classify(at(RawEvent::key(Key::HELP, 0), 2.7), &mut mode, &mut published);
        assert_eq!(key_release.action, PendingAction::Mute);
        assert!(!mode.enabled());
        assert!(published.is_empty());
    }

    #[test]
    fn test_release_after_eject_hold_requests_shutdown() {
        let mut c = Classifier::new(
            Keymap::builtin(KeymapKind::Keypad),
            ToggleTimer::default().with_eject_after(Some(Duration::from_secs(5))),
            5,
        );
        let mut mode = ModeState::default();
        let mut published: Vec<Status> = Vec::new();

        let tap = c.classify(at(RawEvent::key(Key::HELP, 1), 1.0), &mut mode, &mut published);
        assert!(!tap.shutdown);
        let tap = c.classify(at(RawEvent::key(Key::HELP, 0), 1.2), &mut mode, &mut published);
        assert!(!tap.shutdown);
        assert!(mode.enabled());

        c.classify(at(RawEvent::key(Key::HELP, 1), 10.0), &mut mode, &mut published);
        let release = c.classify(at(RawEvent::key(Key::HELP, 0), 16.0), &mut mode, &mut published);
        assert!(release.shutdown);
        assert_eq!(release.transition, None);
        assert!(mode.enabled());
        assert_eq!(published.len(), 1);
    }
}
