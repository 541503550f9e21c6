// SPDX-License-Identifier: Apache-2.0 OR MIT
// SyncLogger: writes to its sinks on the calling thread
//
// Same filtering and flush-on rules as AsyncLogger, without the queue. Useful
// for loggers that must not lose records on a crash, and for code that runs
// before or after the worker pool.

use super::entry::{Record, SourceLocation};
use super::logger::LoggerCore;
use super::report::{default_error_handler, deliver, DispatchFailure, ErrorHandler, FailureKind};
use super::sink::Sink;
use super::Level;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Named logger that dispatches on the calling thread
///
/// Clones share the logger. Sink failures never reach the caller; they go
/// to the error handler and the failure counter, as they would on a worker.
#[derive(Clone)]
pub struct SyncLogger {
    core: Arc<LoggerCore>,
    error_handler: ErrorHandler,
    failures: Arc<AtomicU64>,
}

impl SyncLogger {
    pub fn new(name: &str, sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self::with_error_handler(name, sinks, default_error_handler())
    }

    pub fn with_error_handler(
        name: &str,
        sinks: Vec<Arc<dyn Sink>>,
        error_handler: ErrorHandler,
    ) -> Self {
        Self {
            core: Arc::new(LoggerCore::new(Arc::from(name), sinks)),
            error_handler,
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    #[inline]
    pub fn should_log(&self, level: Level) -> bool {
        self.core.passes(level)
    }

    /// Render the record and write it before returning
    #[inline]
    pub fn log(&self, level: Level, location: SourceLocation, args: fmt::Arguments<'_>) {
        if !self.should_log(level) {
            return;
        }
        let record = Record::new(self.core.name_arc(), level, location, fmt::format(args));
        self.submit(&record);
    }

    /// Write a prebuilt record, bypassing the level filter
    pub fn submit(&self, record: &Record) {
        self.core
            .write_record(record, &|level, kind| self.report(level, kind));
    }

    #[track_caller]
    pub fn trace(&self, message: &str) {
        self.log(Level::Trace, SourceLocation::caller(), format_args!("{}", message));
    }

    #[track_caller]
    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, SourceLocation::caller(), format_args!("{}", message));
    }

    #[track_caller]
    pub fn info(&self, message: &str) {
        self.log(Level::Info, SourceLocation::caller(), format_args!("{}", message));
    }

    #[track_caller]
    pub fn warn(&self, message: &str) {
        self.log(Level::Warn, SourceLocation::caller(), format_args!("{}", message));
    }

    #[track_caller]
    pub fn error(&self, message: &str) {
        self.log(Level::Error, SourceLocation::caller(), format_args!("{}", message));
    }

    #[track_caller]
    pub fn critical(&self, message: &str) {
        self.log(Level::Critical, SourceLocation::caller(), format_args!("{}", message));
    }

    pub fn flush(&self) {
        self.core.flush_sinks(&|level, kind| self.report(level, kind));
    }

    pub fn level(&self) -> Level {
        self.core.level()
    }

    pub fn set_level(&self, level: Level) {
        self.core.set_level(level);
    }

    /// Flush the sinks after every record at `level` or above
    pub fn flush_on(&self, level: Level) {
        self.core.set_flush_level(level);
    }

    pub fn flush_level(&self) -> Level {
        self.core.flush_level()
    }

    pub fn add_sink(&self, sink: Arc<dyn Sink>) {
        self.core.add_sink(sink);
    }

    pub fn remove_sink(&self, sink: &Arc<dyn Sink>) -> bool {
        self.core.remove_sink(sink)
    }

    pub fn clear_sinks(&self) {
        self.core.clear_sinks();
    }

    pub fn sinks(&self) -> Vec<Arc<dyn Sink>> {
        self.core.sinks_snapshot()
    }

    /// Sink errors and panics seen by this logger
    pub fn failure_counter(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// New logger with a copy of this one's sinks, settings and handler
    pub fn clone_with_name(&self, name: &str) -> SyncLogger {
        let logger =
            SyncLogger::with_error_handler(name, self.sinks(), Arc::clone(&self.error_handler));
        logger.set_level(self.level());
        logger.flush_on(self.flush_level());
        logger
    }

    pub(crate) fn same_logger(&self, other: &SyncLogger) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    fn report(&self, level: Option<Level>, kind: FailureKind) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        let failure = DispatchFailure {
            logger: self.core.name_arc(),
            level,
            kind,
        };
        deliver(&self.error_handler, &failure);
    }
}

impl fmt::Debug for SyncLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncLogger")
            .field("name", &self.name())
            .field("level", &self.level())
            .field("sinks", &self.core.sink_count())
            .finish()
    }
}
