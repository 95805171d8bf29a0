use notcat_protocol::EncodeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("logging endpoint not found at {path}")]
    NotFound { path: PathBuf },

    #[error("permission denied connecting to {path}")]
    PermissionDenied { path: PathBuf },

    #[error("connection refused at {path}")]
    Refused { path: PathBuf },

    #[error("I/O error connecting to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("connection is closed")]
    Closed,

    #[error(transparent)]
    MessageTooLarge(#[from] EncodeError),

    #[error("I/O failure writing frame: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum CloseError {
    #[error("I/O failure during close: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum InitError {
    #[error("unknown sink type {0}")]
    UnknownSinkType(u8),

    #[error(transparent)]
    Connect(#[from] ConnectError),
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("logging not initialized")]
    NotInitialized,

    #[error(transparent)]
    Send(#[from] SendError),
}
