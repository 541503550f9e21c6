//! Asynchronous log dispatch.
//!
//! Application threads hand finished records to an [`logging::AsyncLogger`];
//! a bounded queue and a fixed pool of worker threads deliver them to the
//! logger's sinks. Loggers and the shared pool are owned by a
//! [`logging::Registry`] created by the application.

pub mod config;
pub mod logging;

pub use config::{ConfigError, LoggingConfig};
pub use logging::{AsyncLogger, Level, Registry, RegistryConfig, SyncLogger};
