pub mod logging;
pub mod server;

use crate::config::Settings;
use crate::error::DaemonError;
use crate::router::{Router, RouterConfig};
use crate::sink;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Build the sink set, spawn the router, and serve until a shutdown
/// signal or a fatal listener error.
pub async fn run(settings: Settings) -> Result<(), DaemonError> {
    let sinks = sink::build_sinks(&settings.sinks).await?;
    let names: Vec<String> = sinks.iter().map(|(s, _)| s.name().to_string()).collect();
    info!(sinks = ?names, "sink set ready");

    let router = Router::spawn(sinks, RouterConfig::from_settings(&settings));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    let result = server::serve(&settings, router.dispatcher(), shutdown.clone()).await;
    shutdown.cancel();
    router.shutdown().await;

    info!("daemon shutdown complete");
    result
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
