use crate::sink::FileFormat;
use clap::{Parser, ValueEnum};
use notcat_protocol::{DEFAULT_SOCKET_PATH, MAX_MESSAGE_LEN, Priority};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0}")]
    Invalid(String),

    #[error("no sinks configured; pass --file-sink / --platform-sink or a config file with [[sinks]]")]
    NoSinks,

    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Output format for the daemon's own logs.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Command-line / environment configuration.
///
/// A TOML config file (`--config-file`) can replace the sink set and
/// override the transport knobs; flags still fill in anything the file
/// omits.
#[derive(Parser, Debug, Clone)]
#[command(name = "notcatd", version, about = "Logging transport and sink-routing daemon")]
pub struct Config {
    /// Unix socket path clients connect to
    #[arg(long, env = "NOTCAT_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    pub socket_path: PathBuf,

    /// Append records to this file
    #[arg(long, env = "NOTCAT_FILE_SINK")]
    pub file_sink: Option<PathBuf>,

    /// Line format for the file sink
    #[arg(long, env = "NOTCAT_FILE_FORMAT", default_value = "plain")]
    pub file_format: FileFormat,

    /// Also deliver records to the platform log facility
    #[arg(long, env = "NOTCAT_PLATFORM_SINK")]
    pub platform_sink: bool,

    /// Tag passed to the platform log facility
    #[arg(long, env = "NOTCAT_PLATFORM_TAG", default_value = "notcat")]
    pub platform_tag: String,

    /// Drop records below this priority before sink dispatch
    #[arg(long, env = "NOTCAT_MIN_PRIORITY")]
    pub min_priority: Option<Priority>,

    /// Pending records held per sink before the oldest is dropped
    #[arg(long, env = "NOTCAT_QUEUE_CAPACITY", default_value = "1024")]
    pub queue_capacity: usize,

    /// Consecutive delivery failures before a sink is marked degraded
    #[arg(long, env = "NOTCAT_DEGRADED_THRESHOLD", default_value = "3")]
    pub degraded_threshold: u32,

    /// Upper bound on a single sink delivery, in milliseconds
    #[arg(long, env = "NOTCAT_SINK_TIMEOUT_MS", default_value = "1000")]
    pub sink_timeout_ms: u64,

    /// Largest accepted frame payload, in bytes
    #[arg(long, env = "NOTCAT_MAX_MESSAGE_LEN", default_value_t = MAX_MESSAGE_LEN)]
    pub max_message_len: usize,

    /// Format for the daemon's own logs
    #[arg(long, env = "NOTCAT_LOG_FORMAT", default_value = "plain")]
    pub log_format: LogFormat,

    /// TOML configuration file
    #[arg(long, env = "NOTCAT_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,
}

/// One configured sink backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SinkConfig {
    LocalFile {
        path: PathBuf,
        #[serde(default)]
        format: FileFormat,
        #[serde(default)]
        min_priority: Option<Priority>,
    },
    Platform {
        #[serde(default = "default_platform_tag")]
        tag: String,
        #[serde(default)]
        min_priority: Option<Priority>,
    },
}

fn default_platform_tag() -> String {
    "notcat".to_string()
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    socket_path: Option<PathBuf>,
    queue_capacity: Option<usize>,
    degraded_threshold: Option<u32>,
    sink_timeout_ms: Option<u64>,
    max_message_len: Option<usize>,
    #[serde(default)]
    sinks: Vec<SinkConfig>,
}

/// Fully resolved daemon settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub socket_path: PathBuf,
    pub sinks: Vec<SinkConfig>,
    pub queue_capacity: usize,
    pub degraded_threshold: u32,
    pub sink_timeout: Duration,
    pub max_message_len: usize,
    pub log_format: LogFormat,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sinks.is_empty() {
            return Err(ConfigError::NoSinks);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue capacity cannot be 0".into()));
        }
        if self.degraded_threshold == 0 {
            return Err(ConfigError::Invalid(
                "degraded threshold cannot be 0".into(),
            ));
        }
        if self.sink_timeout.is_zero() {
            return Err(ConfigError::Invalid("sink timeout cannot be 0".into()));
        }
        if self.max_message_len == 0 || self.max_message_len > MAX_MESSAGE_LEN {
            return Err(ConfigError::Invalid(format!(
                "max message length must be within 1..={MAX_MESSAGE_LEN}"
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Resolve flags plus the optional config file into [`Settings`].
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let file = match &self.config_file {
            Some(path) => load_file(path)?,
            None => FileConfig::default(),
        };

        let mut sinks = Vec::new();
        if !file.sinks.is_empty() {
            sinks = file.sinks;
        } else {
            if let Some(path) = self.file_sink.clone() {
                sinks.push(SinkConfig::LocalFile {
                    path,
                    format: self.file_format,
                    min_priority: self.min_priority,
                });
            }
            if self.platform_sink {
                sinks.push(SinkConfig::Platform {
                    tag: self.platform_tag.clone(),
                    min_priority: self.min_priority,
                });
            }
        }

        let settings = Settings {
            socket_path: file.socket_path.unwrap_or(self.socket_path),
            sinks,
            queue_capacity: file.queue_capacity.unwrap_or(self.queue_capacity),
            degraded_threshold: file.degraded_threshold.unwrap_or(self.degraded_threshold),
            sink_timeout: Duration::from_millis(
                file.sink_timeout_ms.unwrap_or(self.sink_timeout_ms),
            ),
            max_message_len: file.max_message_len.unwrap_or(self.max_message_len),
            log_format: self.log_format,
        };
        settings.validate()?;
        Ok(settings)
    }
}

fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(args: &[&str]) -> Config {
        let mut argv = vec!["notcatd"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).expect("flags should parse")
    }

    #[test]
    fn file_sink_flag_builds_a_local_file_sink() {
        let settings = base_config(&["--file-sink", "/tmp/out.log"])
            .into_settings()
            .unwrap();
        assert_eq!(settings.sinks.len(), 1);
        assert!(matches!(
            &settings.sinks[0],
            SinkConfig::LocalFile { path, format: FileFormat::Plain, min_priority: None }
                if path == &PathBuf::from("/tmp/out.log")
        ));
    }

    #[test]
    fn platform_flag_builds_a_platform_sink_with_tag() {
        let settings = base_config(&["--platform-sink", "--platform-tag", "myapp"])
            .into_settings()
            .unwrap();
        assert_eq!(
            settings.sinks,
            vec![SinkConfig::Platform {
                tag: "myapp".into(),
                min_priority: None
            }]
        );
    }

    #[test]
    fn min_priority_flag_applies_to_cli_sinks() {
        let settings = base_config(&["--file-sink", "/tmp/out.log", "--min-priority", "warn"])
            .into_settings()
            .unwrap();
        assert!(matches!(
            &settings.sinks[0],
            SinkConfig::LocalFile { min_priority: Some(Priority::Warn), .. }
        ));
    }

    #[test]
    fn no_sinks_is_rejected() {
        let err = base_config(&[]).into_settings().unwrap_err();
        assert!(matches!(err, ConfigError::NoSinks));
    }

    #[test]
    fn zero_queue_capacity_is_rejected() {
        let err = base_config(&["--file-sink", "/tmp/out.log", "--queue-capacity", "0"])
            .into_settings()
            .unwrap_err();
        assert!(err.to_string().contains("queue capacity"));
    }

    #[test]
    fn max_message_len_cannot_exceed_protocol_ceiling() {
        let too_large = (MAX_MESSAGE_LEN + 1).to_string();
        let err = base_config(&["--file-sink", "/tmp/out.log", "--max-message-len", &too_large])
            .into_settings()
            .unwrap_err();
        assert!(err.to_string().contains("max message length"));
    }

    #[test]
    fn config_file_sinks_replace_cli_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("notcatd.toml");
        std::fs::write(
            &config_path,
            r#"
socket_path = "/tmp/other.sock"
queue_capacity = 16

[[sinks]]
kind = "local-file"
path = "/var/log/app.log"
format = "json"
min_priority = "info"

[[sinks]]
kind = "platform"
tag = "app"
"#,
        )
        .unwrap();

        let settings = base_config(&[
            "--file-sink",
            "/tmp/ignored.log",
            "--config-file",
            config_path.to_str().unwrap(),
        ])
        .into_settings()
        .unwrap();

        assert_eq!(settings.socket_path, PathBuf::from("/tmp/other.sock"));
        assert_eq!(settings.queue_capacity, 16);
        assert_eq!(settings.sinks.len(), 2);
        assert!(matches!(
            &settings.sinks[0],
            SinkConfig::LocalFile {
                format: FileFormat::Json,
                min_priority: Some(Priority::Info),
                ..
            }
        ));
        assert_eq!(
            settings.sinks[1],
            SinkConfig::Platform {
                tag: "app".into(),
                min_priority: None
            }
        );
    }

    #[test]
    fn unknown_config_file_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("notcatd.toml");
        std::fs::write(&config_path, "retention_days = 7\n").unwrap();

        let err = base_config(&["--config-file", config_path.to_str().unwrap()])
            .into_settings()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseFile { .. }));
    }
}
