// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Worker pool that drains the shared record queue into sinks.
//!
//! Lifecycle: `Created -> Running -> Draining -> Stopped`. A graceful
//! [`WorkerPool::shutdown`] lets the workers finish everything queued ahead
//! of the stop request; [`WorkerPool::shutdown_now`] skips `Draining` and
//! reports whatever was still queued as lost.
//!
//! With several workers, records created on the same thread still reach the
//! sinks in queue order: each record takes a ticket on its thread's
//! turnstile while the queue lock is held, and is written only after the
//! tickets before it.

use super::entry::Record;
use super::error::PoolError;
use super::logger::LoggerCore;
use super::policy::{DrainPolicy, OverflowPolicy};
use super::queue::BoundedQueue;
use super::report::{
    bootstrap_report, default_error_handler, deliver, DispatchFailure, ErrorHandler, FailureKind,
};
use super::Level;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_CAPACITY: usize = 8192;
pub const DEFAULT_WORKERS: usize = 1;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Producer threads are hashed onto this many turnstiles
const TURNSTILES: usize = 64;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolState {
    Created = 0,
    Running = 1,
    Draining = 2,
    Stopped = 3,
}

impl PoolState {
    pub const fn as_str(self) -> &'static str {
        match self {
            PoolState::Created => "created",
            PoolState::Running => "running",
            PoolState::Draining => "draining",
            PoolState::Stopped => "stopped",
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => PoolState::Created,
            1 => PoolState::Running,
            2 => PoolState::Draining,
            _ => PoolState::Stopped,
        }
    }
}

impl std::fmt::Display for PoolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Construction parameters; fixed for the pool's lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub capacity: usize,
    pub workers: usize,
    pub drain_policy: DrainPolicy,
    /// How often idle or parked workers look at the stop flag
    pub poll_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            workers: DEFAULT_WORKERS,
            drain_policy: DrainPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PoolConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_drain_policy(mut self, policy: DrainPolicy) -> Self {
        self.drain_policy = policy;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        if self.capacity == 0 {
            return Err(PoolError::InvalidConfig("capacity must be at least 1"));
        }
        if self.workers == 0 {
            return Err(PoolError::InvalidConfig("worker count must be at least 1"));
        }
        if self.poll_interval.is_zero() {
            return Err(PoolError::InvalidConfig("poll interval must be non-zero"));
        }
        Ok(())
    }
}

/// Snapshot of the pool's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub state: PoolState,
    pub queued: usize,
    pub capacity: usize,
    pub workers: usize,
    /// Records evicted by `OverrunOldest`
    pub overruns: u64,
    /// Records refused by `DropIfFull`
    pub discards: u64,
    /// Posts refused because the pool was draining or stopped
    pub rejected: u64,
    /// Sink errors and panics caught by workers
    pub failures: u64,
}

/// Outcome of a shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Records still queued when the workers stopped
    pub lost: usize,
    pub graceful: bool,
}

/// Unit of work on the shared queue
pub(crate) enum Task {
    Log {
        record: Record,
        logger: Arc<LoggerCore>,
    },
    Flush(FlushTicket),
    Terminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LatchOutcome {
    Pending,
    Completed,
    Interrupted,
}

struct LatchState {
    arrived: usize,
    outcome: LatchOutcome,
}

/// Barrier shared by one flush request and its per-worker tickets
///
/// Every worker parks on the latch after taking its ticket, so once all
/// tickets have arrived no worker is still processing a task dequeued
/// before the flush was posted.
struct FlushLatch {
    logger: Arc<LoggerCore>,
    expected: usize,
    state: Mutex<LatchState>,
    cond: Condvar,
}

impl FlushLatch {
    fn new(logger: Arc<LoggerCore>, expected: usize) -> Self {
        Self {
            logger,
            expected,
            state: Mutex::new(LatchState {
                arrived: 0,
                outcome: LatchOutcome::Pending,
            }),
            cond: Condvar::new(),
        }
    }

    fn finish(&self, outcome: LatchOutcome) {
        {
            let mut state = self.state.lock();
            if state.outcome == LatchOutcome::Pending {
                state.outcome = outcome;
            }
        }
        self.cond.notify_all();
    }

    /// Block the flushing thread until the barrier completes
    fn wait(&self, shared: &PoolShared) -> Result<(), PoolError> {
        let mut state = self.state.lock();
        loop {
            match state.outcome {
                LatchOutcome::Completed => return Ok(()),
                LatchOutcome::Interrupted => return Err(PoolError::FlushInterrupted),
                LatchOutcome::Pending => {}
            }
            if shared.hard_stop.load(Ordering::Acquire) {
                return Err(PoolError::FlushInterrupted);
            }
            self.cond.wait_for(&mut state, shared.poll_interval);
        }
    }
}

/// One worker's share of a flush barrier
///
/// A ticket dropped without reaching a worker (evicted or cleared from the
/// queue) interrupts the whole barrier.
pub(crate) struct FlushTicket {
    latch: Arc<FlushLatch>,
    arrived: bool,
}

impl FlushTicket {
    fn new(latch: Arc<FlushLatch>) -> Self {
        Self {
            latch,
            arrived: false,
        }
    }

    /// Park at the barrier; the last worker to arrive flushes the sinks
    fn arrive(mut self, shared: &PoolShared) {
        self.arrived = true;
        let latch = &self.latch;

        let mut state = latch.state.lock();
        state.arrived += 1;
        if state.arrived == latch.expected {
            drop(state);
            flush_sinks(shared, &latch.logger);
            latch.finish(LatchOutcome::Completed);
            return;
        }

        while state.outcome == LatchOutcome::Pending && !shared.hard_stop.load(Ordering::Acquire)
        {
            latch.cond.wait_for(&mut state, shared.poll_interval);
        }
    }
}

impl Drop for FlushTicket {
    fn drop(&mut self) {
        if !self.arrived {
            self.latch.finish(LatchOutcome::Interrupted);
        }
    }
}

/// Dispatch order for the records of a group of producer threads
///
/// Tickets are handed out under the queue lock, so they follow queue order.
/// Every ticket taken is served, since dispatch never unwinds past the
/// guard.
#[derive(Default)]
struct Turnstile {
    next: AtomicU64,
    serving: Mutex<u64>,
    cond: Condvar,
}

impl Turnstile {
    fn take(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Block until every earlier ticket has been served
    fn wait_turn(&self, ticket: u64) -> TurnGuard<'_> {
        let mut serving = self.serving.lock();
        while *serving != ticket {
            self.cond.wait(&mut serving);
        }
        TurnGuard { turnstile: self }
    }
}

/// Serves the next ticket when dropped
struct TurnGuard<'a> {
    turnstile: &'a Turnstile,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        *self.turnstile.serving.lock() += 1;
        self.turnstile.cond.notify_all();
    }
}

#[derive(Clone, Copy)]
struct Turn {
    stripe: usize,
    ticket: u64,
}

/// State shared between the pool handle and its worker threads
struct PoolShared {
    queue: BoundedQueue<Task>,
    turnstiles: Box<[Turnstile]>,
    state: AtomicU8,
    hard_stop: AtomicBool,
    /// Set once every Terminate task has been queued
    terminating: AtomicBool,
    poll_interval: Duration,
    error_handler: ErrorHandler,
    rejected: AtomicU64,
    failures: AtomicU64,
}

impl PoolShared {
    fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: PoolState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn report(&self, logger: &LoggerCore, level: Option<Level>, kind: FailureKind) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        let failure = DispatchFailure {
            logger: logger.name_arc(),
            level,
            kind,
        };
        deliver(&self.error_handler, &failure);
    }

    /// Take the next ticket for `record`'s producer thread; call with the
    /// queue lock held
    fn claim_turn(&self, record: &Record) -> Turn {
        let stripe = (record.thread_id() % self.turnstiles.len() as u64) as usize;
        Turn {
            stripe,
            ticket: self.turnstiles[stripe].take(),
        }
    }

    fn wait_turn(&self, turn: Turn) -> TurnGuard<'_> {
        self.turnstiles[turn.stripe].wait_turn(turn.ticket)
    }
}

/// Fixed-size pool of worker threads over one bounded queue
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    config: PoolConfig,
    workers: Mutex<Vec<JoinHandle<()>>>,
    /// Serializes flush barriers and the Terminate fan-out
    flush_lock: Mutex<()>,
    lifecycle: Mutex<()>,
}

impl WorkerPool {
    /// Create a pool in the `Created` state
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        Self::with_error_handler(config, default_error_handler())
    }

    pub fn with_error_handler(
        config: PoolConfig,
        error_handler: ErrorHandler,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        let shared = Arc::new(PoolShared {
            queue: BoundedQueue::new(config.capacity),
            turnstiles: (0..TURNSTILES).map(|_| Turnstile::default()).collect(),
            state: AtomicU8::new(PoolState::Created as u8),
            hard_stop: AtomicBool::new(false),
            terminating: AtomicBool::new(false),
            poll_interval: config.poll_interval,
            error_handler,
            rejected: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        });
        Ok(Self {
            shared,
            config,
            workers: Mutex::new(Vec::new()),
            flush_lock: Mutex::new(()),
            lifecycle: Mutex::new(()),
        })
    }

    /// Create and start a pool
    pub fn spawn(config: PoolConfig) -> Result<Arc<Self>, PoolError> {
        let pool = Arc::new(Self::new(config)?);
        pool.start()?;
        Ok(pool)
    }

    /// Start the worker threads; a no-op on a running pool
    pub fn start(&self) -> Result<(), PoolError> {
        let _guard = self.lifecycle.lock();
        match self.state() {
            PoolState::Created => {}
            PoolState::Running => return Ok(()),
            PoolState::Draining => return Err(PoolError::Draining),
            PoolState::Stopped => return Err(PoolError::Stopped),
        }

        let mut workers = self.workers.lock();
        for i in 0..self.config.workers {
            let shared = Arc::clone(&self.shared);
            let spawned = thread::Builder::new()
                .name(format!("logdispatch-{}", i))
                .spawn(move || worker_loop(&shared));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    self.shared.hard_stop.store(true, Ordering::Release);
                    for handle in workers.drain(..) {
                        let _ = handle.join();
                    }
                    self.shared.set_state(PoolState::Stopped);
                    return Err(PoolError::Spawn(e));
                }
            }
        }

        self.shared.set_state(PoolState::Running);
        Ok(())
    }

    pub fn state(&self) -> PoolState {
        self.shared.state()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn worker_count(&self) -> usize {
        self.config.workers
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn overrun_counter(&self) -> u64 {
        self.shared.queue.overrun_counter()
    }

    pub fn discard_counter(&self) -> u64 {
        self.shared.queue.discard_counter()
    }

    pub fn rejected_counter(&self) -> u64 {
        self.shared.rejected.load(Ordering::Relaxed)
    }

    pub fn failure_counter(&self) -> u64 {
        self.shared.failures.load(Ordering::Relaxed)
    }

    pub fn reset_counters(&self) {
        self.shared.queue.reset_overrun_counter();
        self.shared.queue.reset_discard_counter();
        self.shared.rejected.store(0, Ordering::Relaxed);
        self.shared.failures.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            state: self.state(),
            queued: self.queue_len(),
            capacity: self.config.capacity,
            workers: self.config.workers,
            overruns: self.overrun_counter(),
            discards: self.discard_counter(),
            rejected: self.rejected_counter(),
            failures: self.failure_counter(),
        }
    }

    /// Queue a record for `logger`'s sinks using `policy` when full
    pub(crate) fn submit(
        &self,
        record: Record,
        logger: &Arc<LoggerCore>,
        policy: OverflowPolicy,
    ) -> Result<(), PoolError> {
        self.admit()?;
        let task = Task::Log {
            record,
            logger: Arc::clone(logger),
        };
        match policy {
            OverflowPolicy::Block => self.shared.queue.enqueue_blocking(task),
            OverflowPolicy::OverrunOldest => self.shared.queue.enqueue_overwrite(task),
            // Counted by the queue; the drop is not an error for the producer
            OverflowPolicy::DropIfFull => {
                let _ = self.shared.queue.enqueue_if_space(task);
            }
        }
        Ok(())
    }

    fn admit(&self) -> Result<(), PoolError> {
        if self.shared.hard_stop.load(Ordering::Acquire) {
            self.shared.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(PoolError::Stopped);
        }
        match self.state() {
            PoolState::Running => Ok(()),
            PoolState::Draining if self.config.drain_policy == DrainPolicy::Accept => Ok(()),
            PoolState::Draining => {
                self.shared.rejected.fetch_add(1, Ordering::Relaxed);
                Err(PoolError::Draining)
            }
            PoolState::Stopped => {
                self.shared.rejected.fetch_add(1, Ordering::Relaxed);
                Err(PoolError::Stopped)
            }
            state @ PoolState::Created => Err(PoolError::NotRunning { state }),
        }
    }

    /// Wait until every task queued before this call has been dispatched,
    /// then flush `logger`'s sinks
    ///
    /// Must not be called from inside a sink: the calling worker would wait
    /// on itself.
    pub(crate) fn flush_logger(&self, logger: &Arc<LoggerCore>) -> Result<(), PoolError> {
        let _serial = self.flush_lock.lock();
        if self.shared.hard_stop.load(Ordering::Acquire) {
            return Err(PoolError::Stopped);
        }
        match self.state() {
            PoolState::Running => {}
            PoolState::Draining => return Err(PoolError::Draining),
            PoolState::Stopped => return Err(PoolError::Stopped),
            state @ PoolState::Created => return Err(PoolError::NotRunning { state }),
        }

        let latch = Arc::new(FlushLatch::new(Arc::clone(logger), self.config.workers));
        for _ in 0..self.config.workers {
            let ticket = FlushTicket::new(Arc::clone(&latch));
            self.shared.queue.enqueue_blocking(Task::Flush(ticket));
        }
        latch.wait(&self.shared)
    }

    /// Graceful shutdown: process everything already queued, then stop
    pub fn shutdown(&self) -> ShutdownReport {
        let _guard = self.lifecycle.lock();
        match self.state() {
            PoolState::Stopped => return ShutdownReport::default(),
            PoolState::Created => {
                self.shared.set_state(PoolState::Stopped);
                return ShutdownReport {
                    lost: 0,
                    graceful: true,
                };
            }
            PoolState::Running | PoolState::Draining => {}
        }

        self.shared.set_state(PoolState::Draining);
        {
            let _serial = self.flush_lock.lock();
            for _ in 0..self.config.workers {
                self.shared.queue.enqueue_blocking(Task::Terminate);
            }
            self.shared.terminating.store(true, Ordering::Release);
        }
        self.join_workers();

        let lost = self.discard_leftovers("records left after graceful shutdown");
        self.shared.set_state(PoolState::Stopped);
        ShutdownReport {
            lost,
            graceful: true,
        }
    }

    /// Hard shutdown: skip draining, stop workers after their current task
    ///
    /// Whatever is still queued is lost; the count goes to stderr and into
    /// the returned report.
    pub fn shutdown_now(&self) -> ShutdownReport {
        let _guard = self.lifecycle.lock();
        match self.state() {
            PoolState::Stopped => return ShutdownReport::default(),
            PoolState::Created => {
                self.shared.set_state(PoolState::Stopped);
                return ShutdownReport::default();
            }
            PoolState::Running | PoolState::Draining => {}
        }

        self.shared.hard_stop.store(true, Ordering::Release);
        let mut lost = count_records(self.shared.queue.drain());
        self.join_workers();
        lost += count_records(self.shared.queue.drain());

        if lost > 0 {
            bootstrap_report(
                "records lost in hard shutdown",
                serde_json::json!({ "lost": lost }),
            );
        }
        self.shared.set_state(PoolState::Stopped);
        ShutdownReport {
            lost,
            graceful: false,
        }
    }

    fn join_workers(&self) {
        let handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        let current = thread::current().id();
        for handle in handles {
            // A worker cannot join itself (last handle dropped inside a sink)
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                bootstrap_report("worker thread panicked", serde_json::Value::Null);
            }
        }
    }

    fn discard_leftovers(&self, message: &str) -> usize {
        let lost = count_records(self.shared.queue.drain());
        if lost > 0 {
            bootstrap_report(message, serde_json::json!({ "lost": lost }));
        }
        lost
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if matches!(self.state(), PoolState::Running | PoolState::Draining) {
            self.shutdown();
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

fn count_records(tasks: Vec<Task>) -> usize {
    tasks
        .into_iter()
        .filter(|task| matches!(task, Task::Log { .. }))
        .count()
}

fn worker_loop(shared: &PoolShared) {
    loop {
        if shared.hard_stop.load(Ordering::Acquire) {
            break;
        }
        let claimed = shared.queue.dequeue_timed_with(shared.poll_interval, |task| {
            let turn = match &task {
                Task::Log { record, .. } => Some(shared.claim_turn(record)),
                _ => None,
            };
            (task, turn)
        });
        match claimed {
            Some((Task::Log { record, logger }, turn)) => {
                let _turn = turn.map(|turn| shared.wait_turn(turn));
                dispatch(shared, &record, &logger);
            }
            Some((Task::Flush(ticket), _)) => ticket.arrive(shared),
            Some((Task::Terminate, _)) => break,
            // A Terminate may have been evicted by an overwriting producer
            None if shared.terminating.load(Ordering::Acquire) => break,
            None => {}
        }
    }
}

/// Write one record to every sink of its logger
///
/// Sink errors and panics are reported and the record is dropped for that
/// sink only.
fn dispatch(shared: &PoolShared, record: &Record, logger: &LoggerCore) {
    logger.write_record(record, &|level, kind| shared.report(logger, level, kind));
}

fn flush_sinks(shared: &PoolShared, logger: &LoggerCore) {
    logger.flush_sinks(&|level, kind| shared.report(logger, level, kind));
}
