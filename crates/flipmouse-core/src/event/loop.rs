// FlipMouse Event Loop
// Single-threaded poll over device streams and the control socket

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::RawEvent;
use crate::choreography::Choreographer;
use crate::control::{handle_line, ControlServer};
use crate::input::{EventInput, ReadOutcome};
use crate::keymap::Keymap;
use crate::mode::{ModeState, Transition};
use crate::output::EventSink;
use crate::settings::Settings;
use crate::status::StatusPublisher;
use crate::transform::{Classifier, PendingAction, ToggleTimer};

/// Errors that end the event loop
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Waiting for input failed: {0}")]
    Wait(#[source] io::Error),
}

/// One attached physical device: where its events come from and where
/// passthrough and locally rewritten events go back to.
pub struct DeviceHandle {
    identity: String,
    input: Box<dyn EventInput>,
    sink: Box<dyn EventSink>,
}

impl DeviceHandle {
    pub fn new(
        identity: impl Into<String>,
        input: Box<dyn EventInput>,
        sink: Box<dyn EventSink>,
    ) -> Self {
        Self {
            identity: identity.into(),
            input,
            sink,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("identity", &self.identity)
            .field("fd", &self.input.as_raw_fd())
            .finish()
    }
}

fn pollfd(fd: RawFd) -> libc::pollfd {
    libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    }
}

const READY: libc::c_short = libc::POLLIN | libc::POLLHUP | libc::POLLERR | libc::POLLNVAL;
const BROKEN: libc::c_short = libc::POLLHUP | libc::POLLERR | libc::POLLNVAL;

/// The coordinator.
///
/// Owns every device handle, the virtual pointer, the control socket and
/// the mode state. Each ready source is handled to completion, including
/// any choreography, before the next one is looked at.
pub struct Dispatcher {
    devices: Vec<DeviceHandle>,
    pointer: Box<dyn EventSink>,
    control: Option<ControlServer>,
    classifier: Classifier,
    choreographer: Choreographer,
    mode: ModeState,
    publisher: Box<dyn StatusPublisher>,
    shutdown: Arc<AtomicBool>,
    poll_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        classifier: Classifier,
        choreographer: Choreographer,
        mode: ModeState,
        pointer: Box<dyn EventSink>,
        publisher: Box<dyn StatusPublisher>,
    ) -> Self {
        Self {
            devices: Vec::new(),
            pointer,
            control: None,
            classifier,
            choreographer,
            mode,
            publisher,
            shutdown: Arc::new(AtomicBool::new(false)),
            poll_timeout: Duration::from_millis(200),
        }
    }

    /// Build the classifier, choreographer and mode state from settings.
    pub fn from_settings(
        settings: &Settings,
        keymap: Keymap,
        pointer: Box<dyn EventSink>,
        publisher: Box<dyn StatusPublisher>,
    ) -> Self {
        let toggle = ToggleTimer::new(settings.toggle.hold_threshold())
            .with_eject_after(settings.toggle.eject_hold());
        let classifier = Classifier::new(keymap, toggle, settings.pointer.wheel_slowdown);
        let mode = ModeState::new(settings.pointer.initial_speed, settings.pointer.min_speed);
        Self::new(
            classifier,
            Choreographer::new(settings.choreography),
            mode,
            pointer,
            publisher,
        )
        .with_poll_timeout(settings.dispatch.poll_timeout())
    }

    pub fn with_devices(mut self, devices: Vec<DeviceHandle>) -> Self {
        self.devices.extend(devices);
        self
    }

    pub fn with_device(mut self, device: DeviceHandle) -> Self {
        self.devices.push(device);
        self
    }

    pub fn with_control(mut self, control: ControlServer) -> Self {
        self.control = Some(control);
        self
    }

    /// Share an externally owned termination flag (set by signal handlers).
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn mode(&self) -> &ModeState {
        &self.mode
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Park the pointer in its corner; used at startup, which begins disabled.
    pub fn park_pointer(&mut self) {
        let steps = self.choreographer.park();
        self.play(&steps);
    }

    pub fn publish_status(&mut self) {
        let status = self.mode.status();
        self.publisher.publish(&status);
    }

    fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Run until the termination flag is set, then release everything.
    pub fn run(mut self) -> Result<(), DispatchError> {
        log::info!(
            "Event loop started with {} device(s){}",
            self.devices.len(),
            if self.control.is_some() { " and control socket" } else { "" }
        );
        let timeout_ms = self.poll_timeout.as_millis().min(i32::MAX as u128) as libc::c_int;

        while !self.shutdown.load(Ordering::SeqCst) {
            let mut fds = Vec::with_capacity(self.devices.len() + 1);
            if let Some(control) = &self.control {
                fds.push(pollfd(control.as_raw_fd()));
            }
            let first_device = fds.len();
            fds.extend(self.devices.iter().map(|d| pollfd(d.input.as_raw_fd())));

            let poll_result =
                unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };

            if poll_result < 0 {
                let err = io::Error::last_os_error();
                // A signal interrupted the wait; the flag is checked above
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(DispatchError::Wait(err));
            }
            if poll_result == 0 {
                continue;
            }

            if first_device == 1 && fds[0].revents & READY != 0 {
                self.serve_control();
            }

            let mut gone = Vec::new();
            for (index, fd) in fds[first_device..].iter().enumerate() {
                if fd.revents & READY == 0 {
                    continue;
                }
                if !self.service_device(index, fd.revents) {
                    gone.push(index);
                }
            }
            for index in gone.into_iter().rev() {
                let device = self.devices.remove(index);
                log::warn!("Device {} disappeared, released", device.identity);
            }
        }

        log::info!(
            "Event loop stopped, releasing {} device(s)",
            self.devices.len()
        );
        Ok(())
    }

    /// Read and handle one record. Returns false when the device is gone.
    fn service_device(&mut self, index: usize, revents: libc::c_short) -> bool {
        let outcome = self.devices[index].input.read_event();
        match outcome {
            Ok(ReadOutcome::Event(event)) => {
                self.handle_event(index, event);
                true
            }
            Ok(ReadOutcome::Short(n)) => {
                log::warn!(
                    "Short read from {}: {} of {} bytes, discarded",
                    self.devices[index].identity,
                    n,
                    RawEvent::RECORD_SIZE
                );
                true
            }
            Ok(ReadOutcome::Idle) => true,
            Ok(ReadOutcome::Closed) => false,
            Err(e) => {
                log::warn!("Read from {} failed: {}", self.devices[index].identity, e);
                revents & BROKEN == 0
            }
        }
    }

    fn handle_event(&mut self, index: usize, event: RawEvent) {
        log::trace!("<{}< {}", self.devices[index].identity, event);

        let result = self
            .classifier
            .classify(event, &mut self.mode, self.publisher.as_mut());

        if let Some(transition) = result.transition {
            self.apply_transition(transition);
        }

        match result.action {
            PendingAction::Pass => self.write_origin(index, event),
            PendingAction::RouteOrigin(rewritten) => self.write_origin(index, rewritten),
            PendingAction::RoutePointer(rewritten) => {
                log::trace!(">M> {}", rewritten);
                if let Err(e) = self.pointer.emit(&[rewritten]) {
                    log::warn!("Failed to write to virtual pointer: {}", e);
                }
            }
            PendingAction::Mute => log::trace!(">X> {}", event),
        }

        if result.shutdown {
            self.request_shutdown();
        }
    }

    fn write_origin(&mut self, index: usize, event: RawEvent) {
        let device = &mut self.devices[index];
        log::trace!(">{}> {}", device.identity, event);
        if let Err(e) = device.sink.emit(&[event]) {
            log::warn!("Failed to write to {}: {}", device.identity, e);
        }
    }

    fn serve_control(&mut self) {
        let request = match self.control.as_ref().map(ControlServer::accept_request) {
            Some(Ok(Some(request))) => request,
            Some(Ok(None)) | None => return,
            Some(Err(e)) => {
                log::warn!("{}", e);
                return;
            }
        };

        let outcome = handle_line(request.line(), &mut self.mode, self.publisher.as_mut());
        if let Err(e) = request.respond(&outcome.reply) {
            log::warn!("Failed to reply to control client: {}", e);
        }

        if let Some(transition) = outcome.transition {
            self.apply_transition(transition);
        }
        if outcome.quit {
            log::info!("Quit requested over control socket");
            self.request_shutdown();
        }
    }

    /// Play the walk for a change of `enabled`. Manual and control paths
    /// both end up here.
    fn apply_transition(&mut self, transition: Transition) {
        if !transition.is_change() {
            return;
        }
        log::info!(
            "Mouse {}",
            if transition.now_enabled { "enabled" } else { "disabled" }
        );
        let steps = self.choreographer.on_mode_transition(transition);
        self.play(&steps);
    }

    fn play(&mut self, steps: &[crate::choreography::MotionStep]) {
        let settle = self.choreographer.settle();
        for step in steps {
            if let Err(e) = self.pointer.emit(&step.events()) {
                log::warn!("Failed to move virtual pointer: {}", e);
            }
            if !settle.is_zero() {
                std::thread::sleep(settle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{Key, REL_X, REL_Y};
    use crate::keymap::KeymapKind;
    use crate::mode::Status;
    use crate::settings::ChoreographySettings;
    use std::cell::RefCell;
    use std::os::unix::net::UnixStream;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<Vec<RawEvent>>>>);

    impl EventSink for Recorder {
        fn emit(&mut self, events: &[RawEvent]) -> io::Result<()> {
            self.0.borrow_mut().push(events.to_vec());
            Ok(())
        }
    }

    struct Published(Rc<RefCell<Vec<Status>>>);

    impl StatusPublisher for Published {
        fn publish(&mut self, status: &Status) {
            self.0.borrow_mut().push(*status);
        }
    }

    fn dispatcher(pointer: Recorder, published: Rc<RefCell<Vec<Status>>>) -> Dispatcher {
        let choreography = ChoreographySettings {
            park_reps: 2,
            settle_us: 0,
            ..ChoreographySettings::default()
        };
        Dispatcher::new(
            Classifier::new(Keymap::builtin(KeymapKind::Keypad), ToggleTimer::default(), 5),
            Choreographer::new(choreography),
            ModeState::default(),
            Box::new(pointer),
            Box::new(Published(published)),
        )
        .with_poll_timeout(Duration::from_millis(10))
    }

    fn device(origin: Recorder) -> (DeviceHandle, UnixStream) {
        let (reader, writer) = UnixStream::pair().unwrap();
        (
            DeviceHandle::new("test", Box::new(reader), Box::new(origin)),
            writer,
        )
    }

    #[test]
    fn test_park_pointer_at_startup() {
        let pointer = Recorder::default();
        let mut d = dispatcher(pointer.clone(), Rc::default());
        d.park_pointer();
        let batches = pointer.0.borrow();
        assert_eq!(batches.len(), 2);
        assert_eq!(
            batches[0],
            vec![RawEvent::rel(REL_X, 200), RawEvent::rel(REL_Y, 200)]
        );
    }

    #[test]
    fn test_disabled_events_go_to_origin() {
        let pointer = Recorder::default();
        let origin = Recorder::default();
        let mut d = dispatcher(pointer.clone(), Rc::default());
        let (handle, _writer) = device(origin.clone());
        d.devices.push(handle);

        let event = RawEvent::key(Key::UP, 1);
        d.handle_event(0, event);

        assert_eq!(origin.0.borrow().as_slice(), &[vec![event]]);
        assert!(pointer.0.borrow().is_empty());
    }

    #[test]
    fn test_tap_plays_choreography_once() {
        let pointer = Recorder::default();
        let published = Rc::new(RefCell::new(Vec::new()));
        let mut d = dispatcher(pointer.clone(), Rc::clone(&published));
        let (handle, _writer) = device(Recorder::default());
        d.devices.push(handle);

        d.handle_event(0, RawEvent::key(Key::HELP, 1));
        d.handle_event(0, RawEvent::key(Key::HELP, 0));

        assert!(d.mode().enabled());
        assert_eq!(published.borrow().len(), 1);
        // Two park steps, two horizontal and three vertical centering steps,
        // plus the press and release routed to the pointer
        assert_eq!(pointer.0.borrow().len(), 2 + 2 + 3 + 2);
    }

    #[test]
    fn test_closed_device_is_removed() {
        let pointer = Recorder::default();
        let d = dispatcher(pointer, Rc::default());
        let (handle, writer) = device(Recorder::default());
        let flag = d.shutdown_handle();
        let mut d = d.with_device(handle);
        assert_eq!(d.device_count(), 1);
        drop(writer);

        assert!(!d.service_device(0, libc::POLLIN));
        flag.store(true, Ordering::SeqCst);
        d.run().unwrap();
    }

    #[test]
    fn test_eject_hold_stops_the_loop() {
        use std::io::Write;
        use std::thread;

        let published = Rc::new(RefCell::new(Vec::new()));
        let choreography = ChoreographySettings {
            settle_us: 0,
            ..ChoreographySettings::default()
        };
        let d = Dispatcher::new(
            Classifier::new(
                Keymap::builtin(KeymapKind::Keypad),
                ToggleTimer::default().with_eject_after(Some(Duration::from_secs(5))),
                5,
            ),
            Choreographer::new(choreography),
            ModeState::default(),
            Box::new(Recorder::default()),
            Box::new(Published(Rc::clone(&published))),
        )
        .with_poll_timeout(Duration::from_millis(10));
        let (handle, mut writer) = device(Recorder::default());
        let d = d.with_device(handle);

        // Unblocks the loop if the hold never stops it
        let flag = d.shutdown_handle();
        let timed_out = Arc::new(AtomicBool::new(false));
        {
            let timed_out = Arc::clone(&timed_out);
            thread::spawn(move || {
                thread::sleep(Duration::from_secs(5));
                timed_out.store(true, Ordering::SeqCst);
                flag.store(true, Ordering::SeqCst);
            });
        }

        let press = RawEvent::key(Key::HELP, 1).at(Duration::from_secs(1));
        let release = RawEvent::key(Key::HELP, 0).at(Duration::from_secs(7));
        writer.write_all(&press.to_record()).unwrap();
        writer.write_all(&release.to_record()).unwrap();

        d.run().unwrap();
        assert!(!timed_out.load(Ordering::SeqCst));
        assert!(published.borrow().is_empty());
    }
}
