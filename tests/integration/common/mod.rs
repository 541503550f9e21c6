// SPDX-License-Identifier: Apache-2.0 OR MIT
// Integration test utilities
//
// Sinks that record or hold back dispatched records, plus small helpers for
// waiting on worker threads.

#![allow(dead_code)]

use logdispatch::logging::{
    DrainPolicy, DuplicatePolicy, PoolConfig, Record, Registry, RegistryConfig, Sink, SinkError,
};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub const POLL: Duration = Duration::from_millis(10);

/// Records every payload it receives, in dispatch order
#[derive(Default)]
pub struct CaptureSink {
    records: Mutex<Vec<Record>>,
    flushes: AtomicUsize,
}

impl CaptureSink {
    pub fn payloads(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|r| r.payload().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl Sink for CaptureSink {
    fn write(&self, record: &Record) -> Result<(), SinkError> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Holds every write until opened, then records payloads like `CaptureSink`
#[derive(Default)]
pub struct GateSink {
    open: Mutex<bool>,
    cond: Condvar,
    entered: AtomicUsize,
    payloads: Mutex<Vec<String>>,
}

impl GateSink {
    pub fn open(&self) {
        *self.open.lock() = true;
        self.cond.notify_all();
    }

    /// Wait until `n` writes have reached the gate
    pub fn wait_entered(&self, n: usize) {
        wait_until("writes to reach the gate", || {
            self.entered.load(Ordering::SeqCst) >= n
        });
    }

    pub fn payloads(&self) -> Vec<String> {
        self.payloads.lock().clone()
    }
}

impl Sink for GateSink {
    fn write(&self, record: &Record) -> Result<(), SinkError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let mut open = self.open.lock();
        while !*open {
            self.cond.wait(&mut open);
        }
        drop(open);
        self.payloads.lock().push(record.payload().to_string());
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Poll `cond` until it holds, failing the test after five seconds
pub fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(1));
    }
}

pub fn pool_config(capacity: usize, workers: usize) -> PoolConfig {
    PoolConfig::default()
        .with_capacity(capacity)
        .with_workers(workers)
        .with_poll_interval(POLL)
}

pub fn registry(capacity: usize, workers: usize, drain_policy: DrainPolicy) -> Registry {
    Registry::new(RegistryConfig {
        pool: pool_config(capacity, workers).with_drain_policy(drain_policy),
        duplicate_policy: DuplicatePolicy::Reject,
        ..RegistryConfig::default()
    })
}
