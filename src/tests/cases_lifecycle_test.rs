// Tests for active counts, finish detection and interruption while awaiting.

use std::thread;
use std::time::{Duration, Instant};

use crate::group::{GroupError, ThreadGroup, WorkerState};
use crate::interrupt;
use crate::support::{wait_until, Gate, PATIENCE};

/// Two of five started workers still blocked inside their task count as active.
#[test]
fn test_active_size_counts_running_workers() {
    let group = ThreadGroup::new("active");
    let gate = Gate::new();

    for i in 0..5 {
        let blocked = gate.clone();
        let worker = group
            .new_worker(move || {
                if i >= 3 {
                    blocked.wait();
                }
            })
            .unwrap();
        worker.start().unwrap();
    }

    assert!(wait_until(|| group.active_size() == 2));
    assert_eq!(group.active_size(), 2);
    assert_eq!(group.total_size(), 5);
    assert_eq!(group.results().len(), 3);

    gate.open();
    group.await_termination().unwrap();
    assert_eq!(group.active_size(), 0);
}

/// Finished only once shut down and every started worker is terminal.
#[test]
fn test_is_finished_waits_for_unwinding_workers() {
    let group = ThreadGroup::new("finish");
    let gate = Gate::new();
    let blocked = gate.clone();
    let worker = group.new_worker(move || blocked.wait()).unwrap();
    worker.start().unwrap();

    assert!(!group.is_finished());
    group.shutdown();
    assert!(group.is_shutdown());
    assert!(!group.is_finished());
    assert_eq!(worker.state(), WorkerState::Running);

    gate.open();
    group.await_termination().unwrap();
    assert!(group.is_finished());
}

/// Finishing naturally without shutdown does not count as finished.
#[test]
fn test_not_finished_without_shutdown() {
    let group = ThreadGroup::new("natural");
    let worker = group.new_worker(|| {}).unwrap();
    worker.start().unwrap();
    group.await_termination().unwrap();

    assert_eq!(group.active_size(), 0);
    assert!(!group.is_finished());
}

/// Shutdown wakes workers sleeping on their interrupt signal.
#[test]
fn test_shutdown_interrupts_sleeping_workers() {
    let group = ThreadGroup::new("sleepy");
    for _ in 0..4 {
        let worker = group
            .new_fallible_worker(|| {
                interrupt::sleep(Duration::from_secs(60))?;
                Ok(())
            })
            .unwrap();
        worker.start().unwrap();
    }

    let started = Instant::now();
    group.shutdown();
    group.await_termination().unwrap();
    assert!(started.elapsed() < PATIENCE);

    let results = group.results();
    assert_eq!(results.len(), 4);
    for outcome in &results {
        let fault = outcome.failure().unwrap();
        assert!(fault.to_string().contains("interrupted"));
    }
}

/// Tasks that poll the signal can stop cleanly.
#[test]
fn test_polling_worker_stops_cleanly_on_shutdown() {
    let group = ThreadGroup::new("poll");
    let worker = group
        .new_worker(|| {
            while !interrupt::is_interrupted() {
                thread::sleep(Duration::from_millis(1));
            }
        })
        .unwrap();
    worker.start().unwrap();

    group.shutdown();
    group.await_termination().unwrap();

    let results = group.results();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_success());
}

/// An interrupted waiter gets an error and keeps its interrupt signal.
#[test]
fn test_await_termination_reports_caller_interrupt() {
    let group = ThreadGroup::with_join_poll("waiter", Duration::from_millis(2));
    let gate = Gate::new();
    let blocked = gate.clone();
    let worker = group.new_worker(move || blocked.wait()).unwrap();
    worker.start().unwrap();

    let caller = interrupt::current();
    let interrupter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        caller.interrupt();
    });

    match group.await_termination() {
        Err(GroupError::JoinInterrupted { worker }) => assert_eq!(worker, "waiter-worker-0"),
        other => panic!("expected JoinInterrupted, got {:?}", other),
    }
    assert!(interrupt::is_interrupted());
    interrupter.join().unwrap();

    // The group itself is untouched by the waiter's interruption.
    assert!(!group.is_shutdown());
    assert!(worker.is_alive());

    assert!(interrupt::interrupted());
    gate.open();
    group.await_termination().unwrap();
    assert_eq!(group.results().len(), 1);
}

/// A caller interrupted before waiting fails straight away while work is running.
#[test]
fn test_pre_interrupted_caller_fails_fast() {
    let group = ThreadGroup::new("eager");
    let gate = Gate::new();
    let blocked = gate.clone();
    group.new_worker(move || blocked.wait()).unwrap().start().unwrap();

    interrupt::current().interrupt();
    assert!(matches!(
        group.await_termination(),
        Err(GroupError::JoinInterrupted { .. })
    ));
    assert!(interrupt::interrupted());

    gate.open();
    group.await_termination().unwrap();
}

/// Awaiting termination joins every finished OS thread and keeps panic payloads.
#[test]
fn test_await_termination_reaps_worker_threads() {
    let group = ThreadGroup::new("reap");
    let mut workers = Vec::new();
    for i in 0..6 {
        let worker = group
            .new_worker(move || {
                if i == 2 {
                    panic!("worker {} crashed", i);
                }
            })
            .unwrap();
        worker.start().unwrap();
        workers.push(worker);
    }
    let idle = group.new_worker(|| {}).unwrap();

    group.shutdown();
    group.await_termination().unwrap();

    for worker in &workers {
        assert!(worker.is_reaped(), "{} was not joined", worker.name());
    }
    assert!(!idle.is_reaped());

    let payload = workers[2].join_thread().unwrap_err();
    assert_eq!(
        payload.downcast_ref::<String>().map(String::as_str),
        Some("worker 2 crashed")
    );
    assert!(workers[0].join_thread().is_ok());
}
