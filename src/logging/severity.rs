// SPDX-License-Identifier: Apache-2.0 OR MIT
// Severity levels for log records

use super::error::ParseLevelError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Log severity levels, totally ordered from most verbose to silent
///
/// A logger passes a record when `record.level >= logger.level`, so `Off`
/// as a threshold silences the logger entirely.
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Per-call tracing, usually compiled into hot paths
    #[default]
    Trace = 0,
    /// Developer diagnostics
    Debug = 1,
    /// Normal operational messages
    Info = 2,
    /// Something unexpected that the application recovered from
    Warn = 3,
    /// An operation failed
    Error = 4,
    /// The application cannot continue a major function
    Critical = 5,
    /// Threshold only: nothing is logged
    Off = 6,
}

impl Level {
    /// All levels in ascending order
    pub const ALL: [Level; 7] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Critical,
        Level::Off,
    ];

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get level name as static string
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Off => "OFF",
        }
    }

    /// Create from u8 value (returns None if invalid)
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Level::Trace),
            1 => Some(Level::Debug),
            2 => Some(Level::Info),
            3 => Some(Level::Warn),
            4 => Some(Level::Error),
            5 => Some(Level::Critical),
            6 => Some(Level::Off),
            _ => None,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" | "err" => Ok(Level::Error),
            "critical" | "crit" => Ok(Level::Critical),
            "off" => Ok(Level::Off),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}
