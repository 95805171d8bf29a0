use crate::config::ConfigError;
use crate::sink::SinkError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind socket {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Losing the listener means the daemon can no longer serve anyone,
    // so accept failures are fatal rather than retried.
    #[error("failed to accept client connection: {0}")]
    Accept(#[source] std::io::Error),

    #[error("failed to open sink: {0}")]
    Sink(#[from] SinkError),
}
