// FlipMouse Control Client
// Sends one command to a running daemon and returns its reply

use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::protocol::ControlCommand;

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REPLY: u64 = 256;

/// Client-side failures, each with its process exit code
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Cannot connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Control socket I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ClientError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ClientError::Io(_) => 2,
            ClientError::Connect { .. } => 3,
        }
    }
}

/// Send `command` and return the reply line without its newline.
pub fn send_command(path: impl AsRef<Path>, command: ControlCommand) -> Result<String, ClientError> {
    let path = path.as_ref();
    let mut stream = UnixStream::connect(path).map_err(|source| ClientError::Connect {
        path: path.to_path_buf(),
        source,
    })?;
    stream.set_read_timeout(Some(REPLY_TIMEOUT))?;

    stream.write_all(format!("{}\n", command).as_bytes())?;

    let mut reply = String::new();
    stream.take(MAX_REPLY).read_to_string(&mut reply)?;
    Ok(reply.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_failure_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let err = send_command(dir.path().join("missing"), ControlCommand::Status).unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_sends_token_and_reads_reply() {
        use std::os::unix::net::UnixListener;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 64];
            let n = conn.read(&mut buf).unwrap();
            assert_eq!(&buf[..n], b"toggle\n");
            conn.write_all(b"ok enabled\n").unwrap();
        });

        let reply = send_command(&path, ControlCommand::Toggle).unwrap();
        assert_eq!(reply, "ok enabled");
        server.join().unwrap();
    }
}
