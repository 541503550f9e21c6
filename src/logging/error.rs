// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Error types for the dispatch core.
//!
//! None of these cross the producer/consumer boundary: `AsyncLogger::log`
//! never returns an error. They surface from construction, lifecycle and
//! flush calls, and from sinks to the worker that called them.

use super::consumer::PoolState;
use thiserror::Error;

/// Errors from the worker pool lifecycle and task submission
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("worker pool is not running (state: {state})")]
    NotRunning { state: PoolState },

    #[error("worker pool is draining and rejects new work")]
    Draining,

    #[error("worker pool has stopped")]
    Stopped,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("flush barrier was dropped before every worker reached it")]
    FlushInterrupted,

    #[error("background task failed: {0}")]
    Join(String),
}

/// Errors a sink reports for a single write or flush
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink rejected record: {0}")]
    Rejected(String),
}

/// Errors from the logger registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a logger named '{0}' is already registered")]
    DuplicateLogger(String),

    #[error("registry has been shut down")]
    Closed,

    #[error("flush failed for loggers: {}", .loggers.join(", "))]
    FlushFailed { loggers: Vec<String> },

    #[error(transparent)]
    Pool(#[from] PoolError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level '{0}'")]
pub struct ParseLevelError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParsePolicyError {
    pub kind: &'static str,
    pub value: String,
}
