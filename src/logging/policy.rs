// SPDX-License-Identifier: Apache-2.0 OR MIT
// Backpressure and lifecycle policies

use super::error::ParsePolicyError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What a producer does when the queue is full
#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait for a consumer to make room; never loses records
    #[default]
    Block = 0,
    /// Evict the oldest queued record; counted as an overrun
    OverrunOldest = 1,
    /// Reject the new record; counted as a discard
    DropIfFull = 2,
}

impl OverflowPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            OverflowPolicy::Block => "block",
            OverflowPolicy::OverrunOldest => "overrun_oldest",
            OverflowPolicy::DropIfFull => "drop_if_full",
        }
    }

    pub(crate) const fn from_u8(value: u8) -> Self {
        match value {
            1 => OverflowPolicy::OverrunOldest,
            2 => OverflowPolicy::DropIfFull,
            _ => OverflowPolicy::Block,
        }
    }
}

impl std::fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverflowPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "block" => Ok(OverflowPolicy::Block),
            "overrun_oldest" | "overrun" => Ok(OverflowPolicy::OverrunOldest),
            "drop_if_full" | "drop" => Ok(OverflowPolicy::DropIfFull),
            _ => Err(ParsePolicyError {
                kind: "overflow policy",
                value: s.to_string(),
            }),
        }
    }
}

/// Whether a draining pool still queues new work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainPolicy {
    /// Refuse new work once shutdown has begun
    #[default]
    Reject,
    /// Keep queueing; whatever the workers do not reach is reported as lost
    Accept,
}

/// What the registry does when a logger name is registered twice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the existing logger and return an error
    #[default]
    Reject,
    /// Swap in the new logger and hand back the old one
    Replace,
}
