// SPDX-License-Identifier: Apache-2.0 OR MIT
// AsyncLogger facade over the shared worker pool

use super::consumer::WorkerPool;
use super::entry::{Record, SourceLocation};
use super::error::PoolError;
use super::policy::OverflowPolicy;
use super::report::{panic_message, FailureKind};
use super::sink::Sink;
use super::Level;
use parking_lot::RwLock;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Receives the failures of one write or flush pass
pub(crate) type ReportFn<'a> = &'a dyn Fn(Option<Level>, FailureKind);

/// Default threshold for new loggers
pub const DEFAULT_LEVEL: Level = Level::Info;

/// Per-logger state shared with the worker threads
///
/// Queued tasks hold an `Arc<LoggerCore>`, so the name and sinks stay alive
/// until the last record referring to them has been dispatched.
pub(crate) struct LoggerCore {
    name: Arc<str>,
    level: AtomicU8,
    flush_level: AtomicU8,
    overflow: AtomicU8,
    sinks: RwLock<Vec<Arc<dyn Sink>>>,
}

impl LoggerCore {
    pub(crate) fn new(name: Arc<str>, sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self {
            name,
            level: AtomicU8::new(DEFAULT_LEVEL as u8),
            flush_level: AtomicU8::new(Level::Off as u8),
            overflow: AtomicU8::new(OverflowPolicy::default() as u8),
            sinks: RwLock::new(sinks),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub(crate) fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed)).unwrap_or(DEFAULT_LEVEL)
    }

    pub(crate) fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    pub(crate) fn flush_level(&self) -> Level {
        Level::from_u8(self.flush_level.load(Ordering::Relaxed)).unwrap_or(Level::Off)
    }

    pub(crate) fn set_flush_level(&self, level: Level) {
        self.flush_level.store(level as u8, Ordering::Relaxed);
    }

    fn overflow(&self) -> OverflowPolicy {
        OverflowPolicy::from_u8(self.overflow.load(Ordering::Relaxed))
    }

    fn set_overflow(&self, policy: OverflowPolicy) {
        self.overflow.store(policy as u8, Ordering::Relaxed);
    }

    /// Copy of the sink list, taken once per dispatched record
    pub(crate) fn sinks_snapshot(&self) -> Vec<Arc<dyn Sink>> {
        self.sinks.read().clone()
    }

    pub(crate) fn passes(&self, level: Level) -> bool {
        level != Level::Off && level as u8 >= self.level.load(Ordering::Relaxed)
    }

    /// Write `record` to every sink, then flush if it reaches the flush level
    ///
    /// A sink error or panic goes to `report` and skips that sink only.
    pub(crate) fn write_record(&self, record: &Record, report: ReportFn<'_>) {
        for sink in self.sinks_snapshot() {
            match panic::catch_unwind(AssertUnwindSafe(|| sink.write(record))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => report(Some(record.level()), FailureKind::SinkWrite(e)),
                Err(payload) => report(
                    Some(record.level()),
                    FailureKind::Panic(panic_message(payload.as_ref())),
                ),
            }
        }

        let flush_level = self.flush_level();
        if flush_level != Level::Off && record.level() >= flush_level {
            self.flush_sinks(report);
        }
    }

    pub(crate) fn flush_sinks(&self, report: ReportFn<'_>) {
        for sink in self.sinks_snapshot() {
            match panic::catch_unwind(AssertUnwindSafe(|| sink.flush())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => report(None, FailureKind::SinkFlush(e)),
                Err(payload) => report(None, FailureKind::Panic(panic_message(payload.as_ref()))),
            }
        }
    }

    pub(crate) fn add_sink(&self, sink: Arc<dyn Sink>) {
        self.sinks.write().push(sink);
    }

    /// Remove a sink by identity; returns whether it was attached
    pub(crate) fn remove_sink(&self, sink: &Arc<dyn Sink>) -> bool {
        let mut sinks = self.sinks.write();
        let before = sinks.len();
        sinks.retain(|s| !Arc::ptr_eq(s, sink));
        sinks.len() != before
    }

    pub(crate) fn clear_sinks(&self) {
        self.sinks.write().clear();
    }

    pub(crate) fn sink_count(&self) -> usize {
        self.sinks.read().len()
    }
}

/// Named logging facade bound to a worker pool
///
/// Cloning is cheap and every clone refers to the same logger. `log` never
/// reports errors: a record refused by a stopping pool or dropped by the
/// overflow policy only shows up in the pool's counters.
#[derive(Clone)]
pub struct AsyncLogger {
    core: Arc<LoggerCore>,
    pool: Arc<WorkerPool>,
}

impl AsyncLogger {
    pub fn new(name: &str, pool: Arc<WorkerPool>, sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self {
            core: Arc::new(LoggerCore::new(Arc::from(name), sinks)),
            pool,
        }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Would a record at `level` pass this logger's threshold?
    #[inline]
    pub fn should_log(&self, level: Level) -> bool {
        self.core.passes(level)
    }

    /// Render and queue a record
    #[inline]
    pub fn log(&self, level: Level, location: SourceLocation, args: fmt::Arguments<'_>) {
        if !self.should_log(level) {
            return;
        }
        let record = Record::new(self.core.name_arc(), level, location, fmt::format(args));
        let _ = self.submit(record);
    }

    /// Queue a prebuilt record, bypassing the level filter
    pub fn submit(&self, record: Record) -> Result<(), PoolError> {
        self.pool.submit(record, &self.core, self.core.overflow())
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

    /// Block until every record this thread queued before the call has
    /// reached the sinks, then flush them
    pub fn flush(&self) -> Result<(), PoolError> {
        self.pool.flush_logger(&self.core)
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

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.core.overflow()
    }

    pub fn set_overflow_policy(&self, policy: OverflowPolicy) {
        self.core.set_overflow(policy);
    }

    pub fn add_sink(&self, sink: Arc<dyn Sink>) {
        self.core.add_sink(sink);
    }

    /// Remove a sink by identity; returns whether it was attached
    pub fn remove_sink(&self, sink: &Arc<dyn Sink>) -> bool {
        self.core.remove_sink(sink)
    }

    pub fn clear_sinks(&self) {
        self.core.clear_sinks();
    }

    pub fn sinks(&self) -> Vec<Arc<dyn Sink>> {
        self.core.sinks_snapshot()
    }

    /// New logger on the same pool with a copy of this one's settings
    pub fn clone_with_name(&self, name: &str) -> AsyncLogger {
        let logger = AsyncLogger::new(name, Arc::clone(&self.pool), self.sinks());
        logger.set_level(self.level());
        logger.flush_on(self.flush_level());
        logger.set_overflow_policy(self.overflow_policy());
        logger
    }

    pub(crate) fn same_logger(&self, other: &AsyncLogger) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

impl fmt::Debug for AsyncLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncLogger")
            .field("name", &self.name())
            .field("level", &self.level())
            .field("overflow", &self.overflow_policy())
            .field("sinks", &self.core.sink_count())
            .finish()
    }
}
