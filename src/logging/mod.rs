// Asynchronous log dispatch
//
// Producers format a record and queue it; a small pool of worker threads
// drains the bounded queue into each logger's sinks.
//
// Layering, bottom-up: RingBuffer -> BoundedQueue -> WorkerPool, with
// AsyncLogger as the producer facade and Registry owning the shared pool.
// SyncLogger skips the queue and writes on the caller's thread.

mod consumer;
mod entry;
mod error;
pub mod integration;
mod logger;
#[macro_use]
mod macros;
mod policy;
mod queue;
mod registry;
pub mod report;
mod ringbuffer;
mod severity;
mod sink;
mod sync_logger;

// Public exports
pub use consumer::{
    PoolConfig, PoolState, PoolStats, ShutdownReport, WorkerPool, DEFAULT_CAPACITY,
    DEFAULT_POLL_INTERVAL, DEFAULT_WORKERS,
};
pub use entry::{Record, SourceLocation};
pub use error::{ParseLevelError, ParsePolicyError, PoolError, RegistryError, SinkError};
pub use integration::AsyncLogging;
pub use logger::{AsyncLogger, DEFAULT_LEVEL};
pub use policy::{DrainPolicy, DuplicatePolicy, OverflowPolicy};
pub use queue::BoundedQueue;
pub use registry::{LoggerSettings, RegisteredLogger, Registry, RegistryConfig};
pub use report::{DispatchFailure, ErrorHandler, FailureKind};
pub use ringbuffer::RingBuffer;
pub use severity::Level;
pub use sink::{color, format_record, AnsiColorSink, JsonSink, NullSink, Sink, WriterSink};
pub use sync_logger::SyncLogger;
