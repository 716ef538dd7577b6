// Package group provides the thread group: a named set of worker threads
// with shared naming, outcome tracking and a one-way shutdown switch.

use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::interrupt::Interrupt;

use super::error::GroupError;
use super::outcome::{OutcomeLog, TaskFault, WorkerOutcome};
use super::worker::{Body, Worker};

/// Default interval at which joins re-check the caller's interrupt signal.
pub const DEFAULT_JOIN_POLL: Duration = Duration::from_millis(10);

/// Named group of worker threads.
///
/// Workers are created unstarted by [`ThreadGroup::new_worker`] and started
/// by the caller. Each worker records a [`WorkerOutcome`] when its task
/// finishes. [`ThreadGroup::shutdown`] blocks further creation and
/// interrupts every registered worker.
///
/// Share the group between threads through an `Arc`.
pub struct ThreadGroup {
    name: String,
    counter: AtomicUsize,
    workers: Mutex<Vec<Worker>>,
    outcomes: Arc<OutcomeLog>,
    shutdown: AtomicBool,
    join_poll: Duration,
}

impl ThreadGroup {
    /// Creates an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_join_poll(name, DEFAULT_JOIN_POLL)
    }

    /// Creates an empty group whose joins re-check interruption every `join_poll`.
    pub fn with_join_poll(name: impl Into<String>, join_poll: Duration) -> Self {
        Self {
            name: name.into(),
            counter: AtomicUsize::new(0),
            workers: Mutex::new(Vec::new()),
            outcomes: Arc::new(OutcomeLog::new()),
            shutdown: AtomicBool::new(false),
            join_poll,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wraps `task` into a new, unstarted worker.
    ///
    /// The worker is registered before this returns. A panic in `task` is
    /// recorded as a failed outcome and then resumed on the worker thread.
    pub fn new_worker<F>(&self, task: F) -> Result<Worker, GroupError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.new_fallible_worker(move || {
            task();
            Ok(())
        })
    }

    /// Like [`ThreadGroup::new_worker`] for tasks that report errors.
    ///
    /// An `Err` is recorded as [`TaskFault::Failed`] and then raised as a
    /// panic on the worker thread, so it surfaces like any unhandled fault.
    pub fn new_fallible_worker<F>(&self, task: F) -> Result<Worker, GroupError>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let mut workers = self.workers.lock();
        if self.shutdown.load(Ordering::SeqCst) {
            warn!(
                component = "thread-group",
                group = %self.name,
                event = "worker_rejected",
                "group is shut down, refusing new worker"
            );
            return Err(GroupError::AlreadyShutdown {
                group: self.name.clone(),
            });
        }

        let index = self.counter.fetch_add(1, Ordering::SeqCst);
        let name = format!("{}-worker-{}", self.name, index);
        let body = self.body(name.clone(), task);
        let worker = Worker::new(name, index, self.join_poll, body);
        workers.push(worker.clone());

        debug!(
            component = "thread-group",
            group = %self.name,
            worker = %worker.name(),
            total = workers.len(),
            event = "worker_registered",
            "worker registered"
        );
        Ok(worker)
    }

    fn body<F>(&self, name: String, task: F) -> Body
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let outcomes = Arc::clone(&self.outcomes);
        Box::new(move || match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(Ok(())) => {
                outcomes.record(WorkerOutcome::success(name.clone()));
                debug!(
                    component = "thread-group",
                    worker = %name,
                    event = "task_done",
                    "task completed"
                );
            }
            Ok(Err(err)) => {
                let fault = TaskFault::from_error(err);
                outcomes.record(WorkerOutcome::failed(name.clone(), fault.clone()));
                warn!(
                    component = "thread-group",
                    worker = %name,
                    event = "task_failed",
                    error = %fault,
                    "task failed"
                );
                panic!("{}", fault);
            }
            Err(payload) => {
                let fault = TaskFault::from_panic(&*payload);
                outcomes.record(WorkerOutcome::failed(name.clone(), fault.clone()));
                warn!(
                    component = "thread-group",
                    worker = %name,
                    event = "task_panicked",
                    error = %fault,
                    "task panicked"
                );
                panic::resume_unwind(payload);
            }
        })
    }

    /// Number of workers ever registered.
    pub fn total_size(&self) -> usize {
        self.workers.lock().len()
    }

    /// Number of registered workers currently running.
    ///
    /// A point-in-time approximation while workers start or finish.
    pub fn active_size(&self) -> usize {
        self.workers.lock().iter().filter(|w| w.is_alive()).count()
    }

    /// Blocks new workers and interrupts every registered one.
    ///
    /// Idempotent. Interruption is only a request; outcomes may keep
    /// arriving while workers unwind.
    pub fn shutdown(&self) {
        let workers = self.workers.lock();
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }

        for worker in workers.iter() {
            worker.interrupt();
        }

        info!(
            component = "thread-group",
            group = %self.name,
            total = workers.len(),
            event = "shutdown",
            "group shut down, workers interrupted"
        );
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Waits until every worker registered so far has terminated.
    ///
    /// Does not shut the group down. Workers that were never started are not
    /// alive and are not waited for. If the calling thread is interrupted
    /// while waiting, the signal is raised again on the caller and
    /// [`GroupError::JoinInterrupted`] is returned.
    pub fn await_termination(&self) -> Result<(), GroupError> {
        let workers = self.workers.lock().clone();
        for worker in &workers {
            if worker.join().is_err() {
                Interrupt::current().interrupt();
                warn!(
                    component = "thread-group",
                    group = %self.name,
                    worker = %worker.name(),
                    event = "join_interrupted",
                    "interrupted while awaiting termination"
                );
                return Err(GroupError::JoinInterrupted {
                    worker: worker.name().to_string(),
                });
            }
        }

        debug!(
            component = "thread-group",
            group = %self.name,
            total = workers.len(),
            event = "terminated",
            "all workers terminated"
        );
        Ok(())
    }

    /// Shut down and no registered worker still running.
    pub fn is_finished(&self) -> bool {
        let workers = self.workers.lock();
        self.is_shutdown() && !workers.iter().any(Worker::is_alive)
    }

    /// Copy of the outcomes recorded so far, in recording order.
    pub fn results(&self) -> Vec<WorkerOutcome> {
        self.outcomes.snapshot()
    }
}

impl std::fmt::Debug for ThreadGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadGroup")
            .field("name", &self.name)
            .field("total", &self.total_size())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
