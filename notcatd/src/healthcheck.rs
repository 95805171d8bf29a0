use notcat_protocol::{DEFAULT_SOCKET_PATH, Hello, SOCKET_PATH_ENV};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;

/// Error type for healthcheck failures
#[derive(Debug)]
pub struct HealthcheckError(String);

impl std::fmt::Display for HealthcheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Healthcheck failed: {}", self.0)
    }
}

impl std::error::Error for HealthcheckError {}

/// Socket path the healthcheck targets: `NOTCAT_SOCKET` or the default.
pub fn default_socket_path() -> PathBuf {
    std::env::var_os(SOCKET_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH))
}

/// Check the daemon is accepting clients (used by `notcatd healthcheck`).
pub async fn healthcheck() -> Result<(), HealthcheckError> {
    healthcheck_at(&default_socket_path()).await
}

/// Check a specific endpoint path: connect and write a hello.
pub async fn healthcheck_at(path: &Path) -> Result<(), HealthcheckError> {
    let mut stream = tokio::time::timeout(Duration::from_secs(2), UnixStream::connect(path))
        .await
        .map_err(|_| HealthcheckError("connection timed out".to_string()))?
        .map_err(|e| {
            HealthcheckError(format!("cannot reach daemon at {}: {e}", path.display()))
        })?;

    let hello = Hello {
        pid: std::process::id(),
        sink_hint: 0,
    };
    stream
        .write_all(&hello.encode())
        .await
        .map_err(|e| HealthcheckError(format!("hello write failed: {e}")))?;
    Ok(())
}
