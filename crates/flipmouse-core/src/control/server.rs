// FlipMouse Control Server
// Unix stream socket serving one command per connection

use std::fs;
use std::io::{self, Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::protocol::Reply;

/// Longest request read from one connection.
pub const MAX_REQUEST: usize = 127;

/// Errors raised by the control socket
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Failed to bind control socket {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to accept control connection: {0}")]
    Accept(#[source] io::Error),

    #[error("Control connection I/O error: {0}")]
    Io(#[from] io::Error),
}

/// An accepted connection and the line it sent.
#[derive(Debug)]
pub struct ControlRequest {
    stream: UnixStream,
    line: String,
}

impl ControlRequest {
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Write the reply line. The connection closes when `self` drops.
    pub fn respond(mut self, reply: &Reply) -> Result<(), ControlError> {
        self.stream.write_all(format!("{}\n", reply).as_bytes())?;
        self.stream.flush()?;
        Ok(())
    }
}

/// Listening control socket.
///
/// The socket file is removed again when the server drops.
#[derive(Debug)]
pub struct ControlServer {
    listener: UnixListener,
    path: PathBuf,
}

impl ControlServer {
    /// Bound on the single read of a request.
    pub const READ_TIMEOUT: Duration = Duration::from_millis(500);

    /// Bind at `path`, replacing a stale socket file.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self, ControlError> {
        let path = path.as_ref().to_path_buf();
        let bind_err = |source: io::Error| ControlError::Bind {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(bind_err)?;
            }
        }
        match fs::remove_file(&path) {
            Ok(()) => log::debug!("Removed stale control socket {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(bind_err(e)),
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;
        if let Err(e) = fs::set_permissions(&path, fs::Permissions::from_mode(0o666)) {
            log::warn!("Failed to chmod control socket {}: {}", path.display(), e);
        }

        log::info!("Control socket listening on {}", path.display());
        Ok(Self { listener, path })
    }

    /// Accept one pending connection and read its request.
    ///
    /// Returns `Ok(None)` when no connection was actually pending or the
    /// client closed without sending anything.
    pub fn accept_request(&self) -> Result<Option<ControlRequest>, ControlError> {
        let mut stream = match self.listener.accept() {
            Ok((stream, _)) => stream,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(e) => return Err(ControlError::Accept(e)),
        };
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(Self::READ_TIMEOUT))?;

        let mut buf = [0u8; MAX_REQUEST];
        let n = stream.read(&mut buf)?;
        if n == 0 {
            log::debug!("Control client closed without a request");
            return Ok(None);
        }

        Ok(Some(ControlRequest {
            stream,
            line: String::from_utf8_lossy(&buf[..n]).into_owned(),
        }))
    }
}

impl AsRawFd for ControlServer {
    fn as_raw_fd(&self) -> RawFd {
        self.listener.as_raw_fd()
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("Failed to remove control socket {}: {}", self.path.display(), e);
            }
        }
    }
}
