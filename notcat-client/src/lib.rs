#![warn(rust_2018_idioms)]

//! Client library for the notcat logging daemon.
//!
//! [`Connection`] is the handle-based API: connect to the daemon's
//! endpoint path, send prioritized records, close. The legacy
//! process-wide `init`/`log`/`close` triple in [`legacy`] is a
//! compatibility shim over one implicit connection. C callers go through
//! the [`ffi`] façade (`include/notcat.h`).
//!
//! A connection handle is single-writer: concurrent `send` and `close`
//! on the same handle is a caller error. The FFI layer serializes each
//! handle behind a mutex; Rust callers own the `Connection` and get the
//! same guarantee from `&mut self`.

pub mod connection;
pub mod error;
pub mod ffi;
pub mod legacy;
pub mod registry;

pub use connection::Connection;
pub use error::{CloseError, ConnectError, InitError, LogError, SendError};
pub use notcat_protocol::Priority;
