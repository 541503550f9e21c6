//! Tokio integration
//!
//! Flush barriers and shutdown block the calling thread. These helpers move
//! them onto tokio's blocking pool so async hosts never stall an executor
//! thread.

use crate::logging::{
    AsyncLogger, PoolError, PoolStats, Registry, RegistryConfig, RegistryError, ShutdownReport,
    Sink, SyncLogger,
};
use std::sync::Arc;

/// Flush `logger` without blocking the async runtime
pub async fn flush_async(logger: &AsyncLogger) -> Result<(), PoolError> {
    let logger = logger.clone();
    tokio::task::spawn_blocking(move || logger.flush())
        .await
        .map_err(|e| PoolError::Join(e.to_string()))?
}

/// Shut a registry down without blocking the async runtime
pub async fn shutdown_async(registry: Arc<Registry>) -> Result<ShutdownReport, RegistryError> {
    tokio::task::spawn_blocking(move || registry.shutdown())
        .await
        .map_err(|e| RegistryError::Pool(PoolError::Join(e.to_string())))?
}

/// Logging system for an async application
///
/// Owns the registry; loggers handed out are cheap clones usable from any
/// task or thread.
pub struct AsyncLogging {
    registry: Arc<Registry>,
}

impl AsyncLogging {
    /// Create the logging system and start its worker pool
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        let registry = Arc::new(Registry::new(config));
        registry.get_or_create_pool()?;
        Ok(Self { registry })
    }

    pub fn from_registry(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Get a registered logger
    pub fn logger(&self, name: &str) -> Option<AsyncLogger> {
        self.registry.get(name)
    }

    pub fn create_logger(
        &self,
        name: &str,
        sinks: Vec<Arc<dyn Sink>>,
    ) -> Result<AsyncLogger, RegistryError> {
        self.registry.create_logger(name, sinks)
    }

    /// Logger that writes on the calling thread; keep it to short writes
    /// inside async tasks
    pub fn create_sync_logger(
        &self,
        name: &str,
        sinks: Vec<Arc<dyn Sink>>,
    ) -> Result<SyncLogger, RegistryError> {
        self.registry.create_sync_logger(name, sinks)
    }

    /// Get the registry (for handing to synchronous code)
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn stats(&self) -> Option<PoolStats> {
        self.registry.stats()
    }

    pub async fn flush_all(&self) -> Result<(), RegistryError> {
        let registry = Arc::clone(&self.registry);
        tokio::task::spawn_blocking(move || registry.flush_all())
            .await
            .map_err(|e| RegistryError::Pool(PoolError::Join(e.to_string())))?
    }

    /// Shutdown the logging system
    pub async fn shutdown(self) -> Result<ShutdownReport, RegistryError> {
        shutdown_async(self.registry).await
    }
}
