//! Blocking client connection to the daemon.
//!
//! The C façade this library backs is synchronous, so the connection is
//! a plain blocking `UnixStream`: `send` returns only once the whole
//! frame is on the wire, which is what keeps the daemon's decoder in
//! sync and propagates daemon backpressure to the producer instead of
//! silently losing records.

use crate::error::{CloseError, ConnectError, SendError};
use notcat_protocol::{Hello, Priority, encode_frame};
use std::io;
use std::net::Shutdown;
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::path::Path;

#[derive(Debug)]
pub struct Connection {
    stream: Option<UnixStream>,
}

impl Connection {
    /// Connect to the daemon at `path` and write the hello preamble.
    ///
    /// Fails fast; retry policy belongs to the caller.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self, ConnectError> {
        Self::connect_with_hint(path, 0)
    }

    /// Connect with a legacy sink-type byte in the hello. Routing is
    /// daemon-side configuration; the daemon only records the hint.
    pub fn connect_with_hint(path: impl AsRef<Path>, sink_hint: u8) -> Result<Self, ConnectError> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ConnectError::NotFound { path: path.into() },
            io::ErrorKind::PermissionDenied => ConnectError::PermissionDenied { path: path.into() },
            io::ErrorKind::ConnectionRefused => ConnectError::Refused { path: path.into() },
            _ => ConnectError::Io {
                path: path.into(),
                source,
            },
        })?;

        let hello = Hello {
            pid: std::process::id(),
            sink_hint,
        };
        write_all(&stream, &hello.encode()).map_err(|source| ConnectError::Io {
            path: path.into(),
            source,
        })?;

        Ok(Self {
            stream: Some(stream),
        })
    }

    /// Encode one record and write the complete frame, blocking until
    /// every byte is written or the stream errors.
    ///
    /// Oversized messages are rejected before any byte goes out, so a
    /// failed send never leaves a partial frame on the wire. A write
    /// error closes the connection: the stream position is unknown and
    /// the daemon would misparse anything sent after it.
    pub fn send(&mut self, priority: Priority, message: &str) -> Result<(), SendError> {
        let stream = self.stream.as_ref().ok_or(SendError::Closed)?;
        let frame = encode_frame(priority, message)?;
        if let Err(source) = write_all(stream, &frame) {
            self.stream = None;
            return Err(SendError::Io(source));
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    #[cfg(test)]
    pub(crate) fn from_stream(stream: UnixStream) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    /// Release the stream. Idempotent: closing an already-closed
    /// connection is a no-op success.
    pub fn close(&mut self) -> Result<(), CloseError> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        match stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(source) => Err(CloseError::Io(source)),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

// MSG_NOSIGNAL instead of UnixStream::write_all: a C host process has
// not necessarily masked SIGPIPE, and a plain write to a dead socket
// would kill it instead of returning EPIPE.
fn write_all(stream: &UnixStream, mut buf: &[u8]) -> io::Result<()> {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    const SEND_FLAGS: libc::c_int = 0;

    let fd = stream.as_raw_fd();
    while !buf.is_empty() {
        let written = unsafe {
            libc::send(
                fd,
                buf.as_ptr().cast::<libc::c_void>(),
                buf.len(),
                SEND_FLAGS,
            )
        };
        if written < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if written == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "socket accepted no bytes",
            ));
        }
        buf = &buf[written as usize..];
    }
    Ok(())
}
