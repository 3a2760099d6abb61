// FlipMouse Control Protocol
// One-line textual commands and their replies

use std::fmt;

use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, EnumIter};

use crate::mode::{ModeState, Transition};
use crate::status::StatusPublisher;

/// Commands accepted on the control socket and by the client CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ControlCommand {
    Enable,
    Disable,
    Toggle,
    Status,
    Quit,
}

impl ControlCommand {
    /// Match a request line.
    ///
    /// Leading whitespace is skipped, then the line must start with a
    /// command token (case-sensitive). Anything after the token is ignored.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_start();
        ControlCommand::iter().find(|cmd| line.starts_with(cmd.as_ref()))
    }

    pub fn token(&self) -> &'static str {
        match self {
            ControlCommand::Enable => "enable",
            ControlCommand::Disable => "disable",
            ControlCommand::Toggle => "toggle",
            ControlCommand::Status => "status",
            ControlCommand::Quit => "quit",
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A single reply line, without the trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok(String),
    Err(String),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok(body) => write!(f, "ok {}", body),
            Reply::Err(reason) => write!(f, "err {}", reason),
        }
    }
}

/// Everything a handled request asks of the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlOutcome {
    pub reply: Reply,
    /// Present for commands that set `enabled`, changed or not
    pub transition: Option<Transition>,
    pub quit: bool,
}

impl ControlOutcome {
    fn reply(reply: Reply) -> Self {
        Self {
            reply,
            transition: None,
            quit: false,
        }
    }

    fn enabled(transition: Transition) -> Self {
        let state = if transition.now_enabled {
            "enabled"
        } else {
            "disabled"
        };
        Self {
            reply: Reply::Ok(state.to_string()),
            transition: Some(transition),
            quit: false,
        }
    }
}

/// Apply one command to the mode state.
pub fn handle_command(
    command: ControlCommand,
    mode: &mut ModeState,
    publisher: &mut dyn StatusPublisher,
) -> ControlOutcome {
    match command {
        ControlCommand::Enable => ControlOutcome::enabled(mode.set_enabled(true, publisher)),
        ControlCommand::Disable => ControlOutcome::enabled(mode.set_enabled(false, publisher)),
        ControlCommand::Toggle => ControlOutcome::enabled(mode.flip_enabled(publisher)),
        ControlCommand::Status => ControlOutcome::reply(Reply::Ok(mode.status().to_string())),
        ControlCommand::Quit => ControlOutcome {
            reply: Reply::Ok("quitting".to_string()),
            transition: None,
            quit: true,
        },
    }
}

/// Parse and apply one request line. Unknown input changes nothing.
pub fn handle_line(
    line: &str,
    mode: &mut ModeState,
    publisher: &mut dyn StatusPublisher,
) -> ControlOutcome {
    match ControlCommand::parse(line) {
        Some(command) => {
            log::info!("Control command: {}", command);
            handle_command(command, mode, publisher)
        }
        None => {
            log::debug!("Unknown control command: {:?}", line.trim_end());
            ControlOutcome::reply(Reply::Err("unknown_command".to_string()))
        }
    }
}
