//! Append-only file sink.
//!
//! The file is opened with append semantics at construction and kept
//! open. A write failure surfaces as `SinkError::Io` and the router
//! marks the sink degraded; a later successful write (for example after
//! the file becomes writable again) restores it.

use super::{Sink, SinkError};
use chrono::{SecondsFormat, Utc};
use clap::ValueEnum;
use notcat_protocol::Record;
use serde::Deserialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Line format written by [`FileSink`].
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileFormat {
    /// `<RFC 3339 timestamp> <PRIORITY> <message>`
    #[default]
    Plain,
    /// One JSON object per line with timestamp/priority/message fields
    Json,
}

pub struct FileSink {
    name: String,
    path: PathBuf,
    format: FileFormat,
    file: Mutex<File>,
}

impl FileSink {
    pub async fn create(path: impl AsRef<Path>, format: FileFormat) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            name: format!("file:{}", path.display()),
            path,
            format,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format_line(&self, record: &Record) -> String {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        match self.format {
            FileFormat::Plain => {
                format!("{timestamp} {:7} {}\n", record.priority, record.message)
            }
            FileFormat::Json => {
                let mut line = serde_json::json!({
                    "timestamp": timestamp,
                    "priority": record.priority.as_str(),
                    "message": record.message,
                })
                .to_string();
                line.push('\n');
                line
            }
        }
    }
}

impl Sink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn accept<'a>(
        &'a self,
        record: &'a Record,
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>> {
        Box::pin(async move {
            let line = self.format_line(record);
            let mut file = self.file.lock().await;
            file.write_all(line.as_bytes()).await?;
            file.flush().await?;
            Ok(())
        })
    }
}
