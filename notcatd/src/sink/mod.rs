pub mod file;
pub mod platform;

use crate::config::SinkConfig;
use notcat_protocol::Record;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

pub use file::{FileFormat, FileSink};
pub use platform::PlatformSink;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink unavailable: {0}")]
    Unavailable(String),

    #[error("record rejected: {0}")]
    Rejected(String),
}

/// A backend that records one log record.
///
/// Dyn-compatible by using boxed futures instead of `impl Future`.
/// `accept` must be bounded in time; the router additionally wraps every
/// call in a timeout so a stalled backend cannot starve dispatch.
pub trait Sink: Send + Sync {
    /// Short stable name used in health transitions and counters.
    fn name(&self) -> &str;

    fn accept<'a>(
        &'a self,
        record: &'a Record,
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>>;
}

/// Build the configured sink set. The set is immutable for the daemon's
/// lifetime; failing to open any sink aborts startup.
pub async fn build_sinks(
    configs: &[SinkConfig],
) -> Result<Vec<(Arc<dyn Sink>, Option<notcat_protocol::Priority>)>, SinkError> {
    let mut sinks: Vec<(Arc<dyn Sink>, Option<notcat_protocol::Priority>)> = Vec::new();
    for config in configs {
        match config {
            SinkConfig::LocalFile {
                path,
                format,
                min_priority,
            } => {
                let sink: Arc<dyn Sink> = Arc::new(FileSink::create(path, *format).await?);
                sinks.push((sink, *min_priority));
            }
            SinkConfig::Platform { tag, min_priority } => {
                let sink: Arc<dyn Sink> = Arc::new(PlatformSink::new(tag.clone()));
                sinks.push((sink, *min_priority));
            }
        }
    }
    Ok(sinks)
}
