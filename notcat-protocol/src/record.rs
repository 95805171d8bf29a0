use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Ceiling on the message payload of a single frame. Frames claiming a
/// longer payload are malformed and terminate the connection that sent
/// them, so a misbehaving client cannot make the daemon buffer
/// unbounded data.
pub const MAX_MESSAGE_LEN: usize = 64 * 1024;

/// Log priority, ordered from least to most severe.
///
/// The discriminants are the wire values; anything outside `0..=4` is
/// rejected at the codec layer rather than clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Priority {
    Verbose = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Priority {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Priority::Verbose),
            1 => Some(Priority::Debug),
            2 => Some(Priority::Info),
            3 => Some(Priority::Warn),
            4 => Some(Priority::Error),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Priority::Verbose => "VERBOSE",
            Priority::Debug => "DEBUG",
            Priority::Info => "INFO",
            Priority::Warn => "WARN",
            Priority::Error => "ERROR",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown priority '{0}', expected one of verbose, debug, info, warn, error")]
pub struct ParsePriorityError(String);

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "verbose" => Ok(Priority::Verbose),
            "debug" => Ok(Priority::Debug),
            "info" => Ok(Priority::Info),
            "warn" => Ok(Priority::Warn),
            "error" => Ok(Priority::Error),
            _ => Err(ParsePriorityError(s.to_string())),
        }
    }
}

/// One logged event: a priority and a UTF-8 message.
///
/// Immutable after construction; equality is by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub priority: Priority,
    pub message: String,
}

impl Record {
    pub fn new(priority: Priority, message: impl Into<String>) -> Self {
        Self {
            priority,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering_is_severity_order() {
        assert!(Priority::Verbose < Priority::Debug);
        assert!(Priority::Debug < Priority::Info);
        assert!(Priority::Info < Priority::Warn);
        assert!(Priority::Warn < Priority::Error);
    }

    #[test]
    fn priority_wire_values_round_trip() {
        for raw in 0u8..=4 {
            let priority = Priority::from_u8(raw).unwrap();
            assert_eq!(priority.as_u8(), raw);
        }
        assert_eq!(Priority::from_u8(5), None);
        assert_eq!(Priority::from_u8(255), None);
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("info".parse::<Priority>().unwrap(), Priority::Info);
        assert_eq!("WARN".parse::<Priority>().unwrap(), Priority::Warn);
        assert!("fatal".parse::<Priority>().is_err());
    }
}
