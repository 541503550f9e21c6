// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Reporting for failures the dispatch pipeline cannot hand back to a caller.
//!
//! Sink errors and panics happen on worker threads, long after `log()`
//! returned. They are delivered to an [`ErrorHandler`]. The default handler,
//! and the loss report of a hard shutdown, write one JSON object per line
//! straight to stderr so they never depend on the queue they describe.

use super::error::SinkError;
use super::Level;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// What went wrong while dispatching to a sink
#[derive(Debug)]
pub enum FailureKind {
    SinkWrite(SinkError),
    SinkFlush(SinkError),
    Panic(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::SinkWrite(e) => write!(f, "sink write failed: {}", e),
            FailureKind::SinkFlush(e) => write!(f, "sink flush failed: {}", e),
            FailureKind::Panic(msg) => write!(f, "sink panicked: {}", msg),
        }
    }
}

/// A failed dispatch, as seen by the error handler
#[derive(Debug)]
pub struct DispatchFailure {
    pub logger: Arc<str>,
    /// Level of the record being written; `None` for flushes
    pub level: Option<Level>,
    pub kind: FailureKind,
}

/// Process-wide callback for dispatch failures
pub type ErrorHandler = Arc<dyn Fn(&DispatchFailure) + Send + Sync>;

/// Handler that reports each failure as a JSON line on stderr
pub fn default_error_handler() -> ErrorHandler {
    Arc::new(|failure: &DispatchFailure| {
        bootstrap_report(
            "dispatch failure",
            serde_json::json!({
                "logger": &*failure.logger,
                "level": failure.level.map(|l| l.as_str()),
                "error": failure.kind.to_string(),
            }),
        );
    })
}

/// Pass `failure` to `handler`; a panicking handler falls back to stderr
pub(crate) fn deliver(handler: &ErrorHandler, failure: &DispatchFailure) {
    let handled = panic::catch_unwind(AssertUnwindSafe(|| handler(failure)));
    if handled.is_err() {
        bootstrap_report(
            "error handler panicked",
            serde_json::json!({
                "logger": &*failure.logger,
                "error": failure.kind.to_string(),
            }),
        );
    }
}

/// Write a diagnostic directly to stderr, bypassing every queue
pub fn bootstrap_report(message: &str, details: serde_json::Value) {
    let line = serde_json::json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "level": Level::Error.as_str(),
        "source": "logdispatch",
        "message": message,
        "details": details,
    });
    eprintln!("{}", line);
}

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
