//! Legacy process-wide API: `init(sink_type)` / `log` / `close`.
//!
//! Superseded by the handle-based API; kept as a thin compatibility
//! layer over one implicit [`Connection`] owned by process-global state.
//! The sink-type byte is validated and forwarded as the hello hint, but
//! routing is daemon-side configuration.

use crate::connection::Connection;
use crate::error::{CloseError, InitError, LogError};
use notcat_protocol::{DEFAULT_SOCKET_PATH, Priority, SOCKET_PATH_ENV};
use parking_lot::Mutex;
use std::path::PathBuf;

pub const SINK_TYPE_LOCAL_FILE: u8 = 1;
pub const SINK_TYPE_ANDROID_LOGCAT: u8 = 2;

static GLOBAL: Mutex<Option<Connection>> = Mutex::new(None);

fn endpoint_path() -> PathBuf {
    std::env::var_os(SOCKET_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH))
}

/// Connect the implicit connection. Initializing twice is a success and
/// leaves the existing connection untouched.
pub fn init(sink_type: u8) -> Result<(), InitError> {
    if !matches!(sink_type, SINK_TYPE_LOCAL_FILE | SINK_TYPE_ANDROID_LOGCAT) {
        return Err(InitError::UnknownSinkType(sink_type));
    }

    let mut global = GLOBAL.lock();
    if global.is_some() {
        return Ok(());
    }
    *global = Some(Connection::connect_with_hint(endpoint_path(), sink_type)?);
    Ok(())
}

pub fn log(priority: Priority, message: &str) -> Result<(), LogError> {
    let mut global = GLOBAL.lock();
    let connection = global.as_mut().ok_or(LogError::NotInitialized)?;
    connection.send(priority, message)?;
    Ok(())
}

/// Tear down the implicit connection. Idempotent: closing without (or
/// after) `init` is a no-op success.
pub fn close() -> Result<(), CloseError> {
    let mut global = GLOBAL.lock();
    match global.take() {
        Some(mut connection) => connection.close(),
        None => Ok(()),
    }
}
