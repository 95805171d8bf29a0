//! Unix socket listener and accept loop.

use crate::config::Settings;
use crate::connection::Connection;
use crate::error::DaemonError;
use notcat_protocol::Record;
use std::sync::Arc;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

/// Accept clients until shutdown; spawn one connection task per client.
///
/// A failed `accept` is fatal — without the listener the daemon can no
/// longer serve anyone. Connection tasks are awaited before returning so
/// in-flight records reach the router.
pub async fn serve(
    settings: &Settings,
    dispatch: mpsc::Sender<Arc<Record>>,
    shutdown: CancellationToken,
) -> Result<(), DaemonError> {
    let path = &settings.socket_path;

    // A stale socket file from an unclean exit would make bind fail.
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed stale socket file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(DaemonError::Bind {
                path: path.clone(),
                source,
            });
        }
    }

    let listener = UnixListener::bind(path).map_err(|source| DaemonError::Bind {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "listening for log clients");

    let connections = shutdown.child_token();
    let tracker = TaskTracker::new();
    let mut next_id: u64 = 0;

    let result = loop {
        tokio::select! {
            _ = shutdown.cancelled() => break Ok(()),
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _)) => {
                        next_id += 1;
                        let connection = Connection::new(
                            next_id,
                            stream,
                            dispatch.clone(),
                            settings.max_message_len,
                        );
                        tracker.spawn(connection.run(connections.clone()));
                    }
                    Err(source) => break Err(DaemonError::Accept(source)),
                }
            }
        }
    };

    connections.cancel();
    tracker.close();
    tracker.wait().await;
    let _ = std::fs::remove_file(path);
    result
}
