// SPDX-License-Identifier: Apache-2.0 OR MIT
// Log record carried from producers to sinks

use super::Level;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// Where a record was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
    pub module_path: &'static str,
}

impl SourceLocation {
    pub const fn new(file: &'static str, line: u32, module_path: &'static str) -> Self {
        Self {
            file,
            line,
            module_path,
        }
    }

    /// Location of the caller (module path is not available this way)
    #[track_caller]
    pub fn caller() -> Self {
        let loc = std::panic::Location::caller();
        Self::new(loc.file(), loc.line(), "")
    }

    pub const fn unknown() -> Self {
        Self::new("", 0, "")
    }

    pub fn is_unknown(&self) -> bool {
        self.file.is_empty()
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A single log message
///
/// The payload is fully rendered before the record is queued, so a record
/// owns everything it refers to and can outlive the producing call.
#[derive(Debug, Clone)]
pub struct Record {
    timestamp: SystemTime,
    location: SourceLocation,
    logger_name: Arc<str>,
    level: Level,
    thread_id: u64,
    payload: String,
    color_range: Option<(usize, usize)>,
}

impl Record {
    /// Create a record stamped with the current time and thread
    pub fn new(
        logger_name: Arc<str>,
        level: Level,
        location: SourceLocation,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: SystemTime::now(),
            location,
            logger_name,
            level,
            thread_id: current_thread_id(),
            payload: payload.into(),
            color_range: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Mark the byte range of the payload a color sink should highlight
    pub fn with_color_range(mut self, start: usize, end: usize) -> Self {
        self.color_range = Some((start, end));
        self
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn thread_id(&self) -> u64 {
        self.thread_id
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn color_range(&self) -> Option<(usize, usize)> {
        self.color_range
    }

    /// Split the payload into (before, colored, after)
    ///
    /// The range is clamped to the payload and shrunk to char boundaries.
    /// Without a color range everything lands in `before`.
    pub fn colored_segments(&self) -> (&str, &str, &str) {
        let payload = self.payload.as_str();
        let Some((start, end)) = self.color_range else {
            return (payload, "", "");
        };

        let mut end = end.min(payload.len());
        while !payload.is_char_boundary(end) {
            end -= 1;
        }
        let mut start = start.min(end);
        while !payload.is_char_boundary(start) {
            start -= 1;
        }

        (&payload[..start], &payload[start..end], &payload[end..])
    }
}

/// OS thread id of the caller, cached per thread
pub(crate) fn current_thread_id() -> u64 {
    thread_local! {
        static THREAD_ID: u64 = os_thread_id();
    }
    THREAD_ID.with(|id| *id)
}

#[cfg(target_os = "linux")]
fn os_thread_id() -> u64 {
    unsafe { libc::syscall(libc::SYS_gettid) as u64 }
}

#[cfg(not(target_os = "linux"))]
fn os_thread_id() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}
