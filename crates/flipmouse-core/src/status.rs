// FlipMouse Status Publication
// Plain-text status file rewritten on every change of mode

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::mode::Status;

/// Receives the current status after each mutation of `enabled`.
pub trait StatusPublisher {
    fn publish(&mut self, status: &Status);
}

/// Collecting publisher, handy for inspection.
impl StatusPublisher for Vec<Status> {
    fn publish(&mut self, status: &Status) {
        self.push(*status);
    }
}

/// Writes `enabled=<0|1> speed=<n> drag=<0|1>` to a fixed path.
///
/// Failures are logged and otherwise ignored; a missing status file must
/// never stop the input loop.
#[derive(Debug, Clone)]
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn write(&self, status: &Status) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, format!("{status}\n"))
    }
}

impl StatusPublisher for StatusFile {
    fn publish(&mut self, status: &Status) {
        match self.write(status) {
            Ok(()) => log::debug!("Status written to {}: {}", self.path.display(), status),
            Err(e) => log::warn!("Failed to write status file {}: {}", self.path.display(), e),
        }
    }
}
