// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Registry of named loggers sharing one worker pool.
//!
//! The registry is an ordinary value owned by the application: create it at
//! startup, hand `Arc<Registry>` (or `&Registry`) to whoever needs loggers,
//! and call [`Registry::shutdown`] on the way out. Teardown drops the
//! loggers before stopping the pool.
//!
//! Queued and synchronous loggers share one namespace: a name is taken no
//! matter which kind registered it.

use super::consumer::{PoolConfig, PoolStats, ShutdownReport, WorkerPool};
use super::error::RegistryError;
use super::logger::{AsyncLogger, DEFAULT_LEVEL};
use super::policy::{DuplicatePolicy, OverflowPolicy};
use super::report::{default_error_handler, ErrorHandler};
use super::sink::Sink;
use super::sync_logger::SyncLogger;
use super::Level;
use parking_lot::{ReentrantMutex, RwLock};
use std::cell::RefCell;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-logger overrides applied when a logger is created or configured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoggerSettings {
    pub level: Option<Level>,
    pub overflow: Option<OverflowPolicy>,
    pub flush_on: Option<Level>,
}

impl LoggerSettings {
    /// Overflow is ignored for synchronous loggers, which have no queue
    fn apply(&self, logger: &RegisteredLogger) {
        if let Some(level) = self.level {
            logger.set_level(level);
        }
        if let (Some(policy), RegisteredLogger::Async(logger)) = (self.overflow, logger) {
            logger.set_overflow_policy(policy);
        }
        if let Some(level) = self.flush_on {
            logger.flush_on(level);
        }
    }
}

/// A logger held by the registry, of either dispatch kind
#[derive(Debug, Clone)]
pub enum RegisteredLogger {
    Async(AsyncLogger),
    Sync(SyncLogger),
}

impl RegisteredLogger {
    pub fn name(&self) -> &str {
        match self {
            RegisteredLogger::Async(logger) => logger.name(),
            RegisteredLogger::Sync(logger) => logger.name(),
        }
    }

    pub fn level(&self) -> Level {
        match self {
            RegisteredLogger::Async(logger) => logger.level(),
            RegisteredLogger::Sync(logger) => logger.level(),
        }
    }

    pub fn set_level(&self, level: Level) {
        match self {
            RegisteredLogger::Async(logger) => logger.set_level(level),
            RegisteredLogger::Sync(logger) => logger.set_level(level),
        }
    }

    pub fn flush_on(&self, level: Level) {
        match self {
            RegisteredLogger::Async(logger) => logger.flush_on(level),
            RegisteredLogger::Sync(logger) => logger.flush_on(level),
        }
    }

    /// Flush the sinks; only a queued logger can fail to reach them
    pub fn flush(&self) -> Result<(), RegistryError> {
        match self {
            RegisteredLogger::Async(logger) => Ok(logger.flush()?),
            RegisteredLogger::Sync(logger) => {
                logger.flush();
                Ok(())
            }
        }
    }

    pub fn as_async(&self) -> Option<&AsyncLogger> {
        match self {
            RegisteredLogger::Async(logger) => Some(logger),
            RegisteredLogger::Sync(_) => None,
        }
    }

    pub fn as_sync(&self) -> Option<&SyncLogger> {
        match self {
            RegisteredLogger::Sync(logger) => Some(logger),
            RegisteredLogger::Async(_) => None,
        }
    }

    /// Same underlying logger, not just the same name
    pub fn same_logger(&self, other: &RegisteredLogger) -> bool {
        match (self, other) {
            (RegisteredLogger::Async(a), RegisteredLogger::Async(b)) => a.same_logger(b),
            (RegisteredLogger::Sync(a), RegisteredLogger::Sync(b)) => a.same_logger(b),
            _ => false,
        }
    }
}

impl From<AsyncLogger> for RegisteredLogger {
    fn from(logger: AsyncLogger) -> Self {
        RegisteredLogger::Async(logger)
    }
}

impl From<SyncLogger> for RegisteredLogger {
    fn from(logger: SyncLogger) -> Self {
        RegisteredLogger::Sync(logger)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub pool: PoolConfig,
    pub duplicate_policy: DuplicatePolicy,
    pub default_level: Level,
    pub default_overflow: OverflowPolicy,
    pub loggers: BTreeMap<String, LoggerSettings>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            duplicate_policy: DuplicatePolicy::default(),
            default_level: DEFAULT_LEVEL,
            default_overflow: OverflowPolicy::default(),
            loggers: BTreeMap::new(),
        }
    }
}

pub struct Registry {
    config: RwLock<RegistryConfig>,
    /// Recursive so logger construction can reach the pool slot while the
    /// creating thread already holds it
    pool: ReentrantMutex<RefCell<Option<Arc<WorkerPool>>>>,
    error_handler: ErrorHandler,
    loggers: RwLock<BTreeMap<String, RegisteredLogger>>,
    default_logger: RwLock<Option<RegisteredLogger>>,
    closed: AtomicBool,
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_error_handler(config, default_error_handler())
    }

    /// Registry whose pool reports dispatch failures to `error_handler`
    pub fn with_error_handler(config: RegistryConfig, error_handler: ErrorHandler) -> Self {
        Self {
            config: RwLock::new(config),
            pool: ReentrantMutex::new(RefCell::new(None)),
            error_handler,
            loggers: RwLock::new(BTreeMap::new()),
            default_logger: RwLock::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> RegistryConfig {
        self.config.read().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Shared pool, created and started on first use
    pub fn get_or_create_pool(&self) -> Result<Arc<WorkerPool>, RegistryError> {
        if self.is_closed() {
            return Err(RegistryError::Closed);
        }
        let slot = self.pool.lock();
        if let Some(pool) = slot.borrow().as_ref() {
            return Ok(Arc::clone(pool));
        }

        let pool_config = self.config.read().pool.clone();
        let pool = Arc::new(WorkerPool::with_error_handler(
            pool_config,
            Arc::clone(&self.error_handler),
        )?);
        pool.start()?;
        *slot.borrow_mut() = Some(Arc::clone(&pool));
        Ok(pool)
    }

    /// Build a logger on the shared pool and register it
    ///
    /// Registry defaults are applied first, then any per-logger settings.
    pub fn create_logger(
        &self,
        name: &str,
        sinks: Vec<Arc<dyn Sink>>,
    ) -> Result<AsyncLogger, RegistryError> {
        let _slot = self.pool.lock();
        let pool = self.get_or_create_pool()?;
        let logger = AsyncLogger::new(name, pool, sinks);
        logger.set_overflow_policy(self.config.read().default_overflow);
        self.register_configured(logger.clone().into())?;
        Ok(logger)
    }

    /// Build a logger that writes on the calling thread and register it
    ///
    /// It never touches the pool, so creating one does not start the
    /// workers. Sink failures go to the registry's error handler.
    pub fn create_sync_logger(
        &self,
        name: &str,
        sinks: Vec<Arc<dyn Sink>>,
    ) -> Result<SyncLogger, RegistryError> {
        let logger = SyncLogger::with_error_handler(name, sinks, Arc::clone(&self.error_handler));
        self.register_configured(logger.clone().into())?;
        Ok(logger)
    }

    fn register_configured(&self, logger: RegisteredLogger) -> Result<(), RegistryError> {
        {
            let config = self.config.read();
            logger.set_level(config.default_level);
            if let Some(settings) = config.loggers.get(logger.name()) {
                settings.apply(&logger);
            }
        }
        self.register_logger(logger)?;
        Ok(())
    }

    /// Add a logger under its own name
    ///
    /// With `DuplicatePolicy::Replace` the previous logger of that name is
    /// returned; with `Reject` the registry is left unchanged.
    pub fn register_logger(
        &self,
        logger: impl Into<RegisteredLogger>,
    ) -> Result<Option<RegisteredLogger>, RegistryError> {
        let logger = logger.into();
        if self.is_closed() {
            return Err(RegistryError::Closed);
        }
        let policy = self.config.read().duplicate_policy;
        let mut loggers = self.loggers.write();
        match loggers.entry(logger.name().to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(logger);
                Ok(None)
            }
            Entry::Occupied(mut slot) => match policy {
                DuplicatePolicy::Reject => Err(RegistryError::DuplicateLogger(slot.key().clone())),
                DuplicatePolicy::Replace => {
                    let old = slot.insert(logger.clone());
                    drop(loggers);
                    let mut default = self.default_logger.write();
                    if default.as_ref().is_some_and(|d| d.same_logger(&old)) {
                        *default = Some(logger);
                    }
                    Ok(Some(old))
                }
            },
        }
    }

    /// Queued logger registered under `name`
    pub fn get(&self, name: &str) -> Option<AsyncLogger> {
        self.loggers.read().get(name)?.as_async().cloned()
    }

    /// Synchronous logger registered under `name`
    pub fn get_sync(&self, name: &str) -> Option<SyncLogger> {
        self.loggers.read().get(name)?.as_sync().cloned()
    }

    pub fn get_registered(&self, name: &str) -> Option<RegisteredLogger> {
        self.loggers.read().get(name).cloned()
    }

    /// Unregister a logger; handles still held elsewhere keep working
    pub fn drop_logger(&self, name: &str) -> Option<RegisteredLogger> {
        let removed = self.loggers.write().remove(name)?;
        let mut default = self.default_logger.write();
        if default.as_ref().is_some_and(|d| d.same_logger(&removed)) {
            *default = None;
        }
        Some(removed)
    }

    pub fn drop_all(&self) {
        self.loggers.write().clear();
        *self.default_logger.write() = None;
    }

    /// Registered names in sorted order
    pub fn logger_names(&self) -> Vec<String> {
        self.loggers.read().keys().cloned().collect()
    }

    /// Set the level of every registered logger and of loggers created later
    pub fn set_level_all(&self, level: Level) {
        self.config.write().default_level = level;
        for logger in self.loggers.read().values() {
            logger.set_level(level);
        }
    }

    /// Store settings for `name` and apply them to the logger if it exists
    pub fn configure_logger(&self, name: &str, settings: LoggerSettings) {
        self.config
            .write()
            .loggers
            .insert(name.to_string(), settings);
        if let Some(logger) = self.get_registered(name) {
            settings.apply(&logger);
        }
    }

    /// Make `logger` the default, registering it if its name is free
    pub fn set_default_logger(&self, logger: impl Into<RegisteredLogger>) {
        let logger = logger.into();
        {
            let mut loggers = self.loggers.write();
            loggers
                .entry(logger.name().to_string())
                .or_insert_with(|| logger.clone());
        }
        *self.default_logger.write() = Some(logger);
    }

    pub fn default_logger(&self) -> Option<RegisteredLogger> {
        self.default_logger.read().clone()
    }

    /// Pool counters, if the pool has been created
    pub fn stats(&self) -> Option<PoolStats> {
        let slot = self.pool.lock();
        let stats = slot.borrow().as_ref().map(|pool| pool.stats());
        stats
    }

    /// Flush every registered logger
    ///
    /// All loggers are attempted; the names of those that failed are
    /// collected into the error.
    pub fn flush_all(&self) -> Result<(), RegistryError> {
        let loggers: Vec<RegisteredLogger> = self.loggers.read().values().cloned().collect();
        let failed: Vec<String> = loggers
            .iter()
            .filter(|logger| logger.flush().is_err())
            .map(|logger| logger.name().to_string())
            .collect();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::FlushFailed { loggers: failed })
        }
    }

    /// Flush all loggers, drop them, then drain and stop the pool
    ///
    /// Calling it again is a no-op.
    pub fn shutdown(&self) -> Result<ShutdownReport, RegistryError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(ShutdownReport::default());
        }
        let flushed = self.flush_all();
        self.drop_all();

        let pool = {
            let slot = self.pool.lock();
            let pool = slot.borrow_mut().take();
            pool
        };
        let report = pool.map(|pool| pool.shutdown()).unwrap_or_default();
        flushed.map(|()| report)
    }

    /// Stop the pool without draining; queued records are reported lost
    pub fn shutdown_now(&self) -> ShutdownReport {
        if self.closed.swap(true, Ordering::AcqRel) {
            return ShutdownReport::default();
        }
        self.drop_all();
        let pool = {
            let slot = self.pool.lock();
            let pool = slot.borrow_mut().take();
            pool
        };
        pool.map(|pool| pool.shutdown_now()).unwrap_or_default()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        if !self.is_closed() {
            let _ = self.shutdown();
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("loggers", &self.logger_names())
            .field("closed", &self.is_closed())
            .finish()
    }
}
