// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Pool and registry shutdown behavior.

use crate::common::{pool_config, registry, wait_until, CaptureSink, GateSink};
use logdispatch::logging::{
    AsyncLogger, DrainPolicy, Level, PoolError, PoolState, Record, SourceLocation, WorkerPool,
};
use std::sync::Arc;
use std::thread;

fn record(payload: &str) -> Record {
    Record::new(Arc::from("drain"), Level::Info, SourceLocation::unknown(), payload)
}

#[test]
fn test_graceful_shutdown_processes_queued_and_rejects_new() {
    let pool = WorkerPool::spawn(pool_config(8, 1)).unwrap();
    let gate = Arc::new(GateSink::default());
    let logger = AsyncLogger::new("drain", Arc::clone(&pool), vec![gate.clone()]);

    logger.info("held");
    gate.wait_entered(1);
    for payload in ["one", "two", "three"] {
        logger.info(payload);
    }
    assert_eq!(pool.queue_len(), 3);

    let stopper = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.shutdown())
    };
    wait_until("pool to start draining", || pool.state() == PoolState::Draining);

    assert!(matches!(logger.submit(record("late")), Err(PoolError::Draining)));
    assert!(matches!(logger.flush(), Err(PoolError::Draining)));
    assert_eq!(pool.rejected_counter(), 1);

    gate.open();
    let report = stopper.join().unwrap();
    assert!(report.graceful);
    assert_eq!(report.lost, 0);
    assert_eq!(pool.state(), PoolState::Stopped);
    assert_eq!(gate.payloads(), vec!["held", "one", "two", "three"]);
}

#[test]
fn test_draining_accept_policy_accounts_for_late_records() {
    let pool = WorkerPool::spawn(pool_config(8, 1).with_drain_policy(DrainPolicy::Accept)).unwrap();
    let gate = Arc::new(GateSink::default());
    let logger = AsyncLogger::new("drain", Arc::clone(&pool), vec![gate.clone()]);

    logger.info("held");
    gate.wait_entered(1);
    for payload in ["one", "two", "three"] {
        logger.info(payload);
    }

    let stopper = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.shutdown())
    };
    wait_until("pool to start draining", || pool.state() == PoolState::Draining);

    logger.submit(record("late")).unwrap();
    assert_eq!(pool.rejected_counter(), 0);

    gate.open();
    let report = stopper.join().unwrap();
    // The late record is either dispatched or reported lost, never dropped silently
    assert_eq!(gate.payloads().len() + report.lost, 5);
    assert_eq!(&gate.payloads()[..4], &["held", "one", "two", "three"]);
}

#[test]
fn test_hard_shutdown_skips_draining() {
    let pool = WorkerPool::spawn(pool_config(16, 1)).unwrap();
    let gate = Arc::new(GateSink::default());
    let logger = AsyncLogger::new("hard", Arc::clone(&pool), vec![gate.clone()]);

    logger.info("a");
    gate.wait_entered(1);
    for i in 0..5 {
        logger.info(&i.to_string());
    }

    let stopper = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.shutdown_now())
    };
    wait_until("queue to be discarded", || pool.queue_len() == 0);
    gate.open();

    let report = stopper.join().unwrap();
    assert!(!report.graceful);
    assert_eq!(report.lost, 5);
    assert_eq!(gate.payloads(), vec!["a"]);
    assert_eq!(pool.state(), PoolState::Stopped);
    assert!(matches!(logger.submit(record("after")), Err(PoolError::Stopped)));
}

#[test]
fn test_registry_teardown_order() {
    let reg = registry(64, 2, DrainPolicy::Reject);
    let sink = Arc::new(CaptureSink::default());
    let net = reg.create_logger("net", vec![sink.clone()]).unwrap();
    let db = reg.create_logger("db", vec![sink.clone()]).unwrap();

    for i in 0..50 {
        net.info(&format!("net {}", i));
        db.info(&format!("db {}", i));
    }
    let pool = Arc::clone(net.pool());
    let report = reg.shutdown().unwrap();

    // Every logger was flushed before the pool stopped
    assert_eq!(report.lost, 0);
    assert_eq!(sink.len(), 100);
    assert_eq!(sink.flushes(), 2);
    assert!(reg.logger_names().is_empty());
    assert_eq!(pool.state(), PoolState::Stopped);

    // Handles kept by the application degrade to silent no-ops
    net.info("after shutdown");
    assert_eq!(sink.len(), 100);
    assert_eq!(pool.rejected_counter(), 1);
}

#[test]
fn test_dropping_registry_stops_pool() {
    let sink = Arc::new(CaptureSink::default());
    let pool = {
        let reg = registry(64, 1, DrainPolicy::Reject);
        let logger = reg.create_logger("scoped", vec![sink.clone()]).unwrap();
        logger.info("last words");
        Arc::clone(logger.pool())
    };
    assert_eq!(pool.state(), PoolState::Stopped);
    assert_eq!(sink.payloads(), vec!["last words"]);
}
