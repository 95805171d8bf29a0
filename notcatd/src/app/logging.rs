use crate::config::LogFormat;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for the daemon's own logs.
pub fn init(format: LogFormat) {
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_current_span(true),
                )
                .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
                .init();
        }
        LogFormat::Plain => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
                .init();
        }
    }
}
