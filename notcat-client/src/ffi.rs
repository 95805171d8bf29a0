//! C façade. Prototypes live in `include/notcat.h`.
//!
//! Status codes are small stable integers; 0 means success. Handles are
//! opaque non-zero `uint64_t` values, 0 signalling connect failure.

use crate::connection::Connection;
use crate::error::{InitError, LogError, SendError};
use crate::legacy;
use crate::registry::HandleRegistry;
use notcat_protocol::Priority;
use std::ffi::{CStr, c_char, c_int, c_uchar};
use std::sync::LazyLock;
use tracing::warn;

pub const NOTCAT_OK: c_int = 0;
pub const NOTCAT_ERR_INVALID_ARGUMENT: c_int = 1;
pub const NOTCAT_ERR_BAD_PRIORITY: c_int = 2;
pub const NOTCAT_ERR_INVALID_HANDLE: c_int = 3;
pub const NOTCAT_ERR_CLOSED: c_int = 4;
pub const NOTCAT_ERR_TOO_LARGE: c_int = 5;
pub const NOTCAT_ERR_IO: c_int = 6;
pub const NOTCAT_ERR_NOT_INITIALIZED: c_int = 7;
pub const NOTCAT_ERR_UNKNOWN_SINK: c_int = 8;
pub const NOTCAT_ERR_CONNECT: c_int = 9;

static HANDLES: LazyLock<HandleRegistry> = LazyLock::new(HandleRegistry::new);

unsafe fn str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

fn priority_arg(raw: c_int) -> Option<Priority> {
    u8::try_from(raw).ok().and_then(Priority::from_u8)
}

fn send_status(result: Result<(), SendError>) -> c_int {
    match result {
        Ok(()) => NOTCAT_OK,
        Err(SendError::Closed) => NOTCAT_ERR_CLOSED,
        Err(SendError::MessageTooLarge(_)) => NOTCAT_ERR_TOO_LARGE,
        Err(SendError::Io(_)) => NOTCAT_ERR_IO,
    }
}

/// Open a connection to the daemon at `path`. Returns 0 on error.
///
/// # Safety
/// `path` must be a valid NUL-terminated string or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn notcat_connect(path: *const c_char) -> u64 {
    let Some(path) = (unsafe { str_arg(path) }) else {
        return 0;
    };
    match Connection::connect(path) {
        Ok(connection) => HANDLES.insert(connection),
        Err(error) => {
            warn!(%error, "notcat_connect failed");
            0
        }
    }
}

/// Send one record on an open handle.
///
/// # Safety
/// `message` must be a valid NUL-terminated string or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn notcat_log(handle: u64, priority: c_int, message: *const c_char) -> c_int {
    let Some(message) = (unsafe { str_arg(message) }) else {
        return NOTCAT_ERR_INVALID_ARGUMENT;
    };
    let Some(priority) = priority_arg(priority) else {
        return NOTCAT_ERR_BAD_PRIORITY;
    };
    HANDLES
        .with_connection(handle, |connection| {
            send_status(connection.send(priority, message))
        })
        .unwrap_or(NOTCAT_ERR_INVALID_HANDLE)
}

/// Close a handle. Closing an unknown or already-closed handle is a
/// no-op success; only `notcat_log` distinguishes a dead handle.
#[unsafe(no_mangle)]
pub extern "C" fn notcat_close(handle: u64) -> c_int {
    match HANDLES.remove(handle) {
        Some(connection) => match connection.lock().close() {
            Ok(()) => NOTCAT_OK,
            Err(_) => NOTCAT_ERR_IO,
        },
        None => NOTCAT_OK,
    }
}

/// Legacy: connect the process-wide implicit connection.
#[unsafe(no_mangle)]
pub extern "C" fn notcat_init(sink_type: c_uchar) -> c_int {
    match legacy::init(sink_type) {
        Ok(()) => NOTCAT_OK,
        Err(InitError::UnknownSinkType(_)) => NOTCAT_ERR_UNKNOWN_SINK,
        Err(InitError::Connect(error)) => {
            warn!(%error, "notcat_init failed");
            NOTCAT_ERR_CONNECT
        }
    }
}

/// Legacy: send one record on the implicit connection.
///
/// # Safety
/// `message` must be a valid NUL-terminated string or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn notcat_log_global(priority: c_int, message: *const c_char) -> c_int {
    let Some(message) = (unsafe { str_arg(message) }) else {
        return NOTCAT_ERR_INVALID_ARGUMENT;
    };
    let Some(priority) = priority_arg(priority) else {
        return NOTCAT_ERR_BAD_PRIORITY;
    };
    match legacy::log(priority, message) {
        Ok(()) => NOTCAT_OK,
        Err(LogError::NotInitialized) => NOTCAT_ERR_NOT_INITIALIZED,
        Err(LogError::Send(error)) => send_status(Err(error)),
    }
}

/// Legacy: tear down the implicit connection. Idempotent.
#[unsafe(no_mangle)]
pub extern "C" fn notcat_close_global() -> c_int {
    match legacy::close() {
        Ok(()) => NOTCAT_OK,
        Err(_) => NOTCAT_ERR_IO,
    }
}
