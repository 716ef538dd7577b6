// Package group provides the worker handle handed out by a thread group.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::interrupt::{Interrupt, Interrupted};

use super::error::WorkerError;

/// Entry point a worker thread runs once started.
pub(crate) type Body = Box<dyn FnOnce() + Send + 'static>;

/// Lifecycle of a worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Registered but not started yet.
    Created,
    /// Started and not yet terminated.
    Running,
    /// The body returned or unwound.
    Terminated,
}

/// OS thread of a worker: not spawned, running, or joined with its result kept.
enum ThreadSlot {
    Empty,
    Spawned(JoinHandle<()>),
    Exited(thread::Result<()>),
}

struct Inner {
    name: String,
    index: usize,
    interrupt: Interrupt,
    state: Mutex<WorkerState>,
    terminated: Condvar,
    body: Mutex<Option<Body>>,
    thread: Mutex<ThreadSlot>,
    join_poll: Duration,
}

impl Inner {
    fn mark_terminated(&self) {
        *self.state.lock() = WorkerState::Terminated;
        self.terminated.notify_all();
    }

    /// Joins a terminated worker's OS thread and keeps its result.
    fn reap(&self) {
        if *self.state.lock() != WorkerState::Terminated {
            return;
        }
        let mut slot = self.thread.lock();
        *slot = match std::mem::replace(&mut *slot, ThreadSlot::Empty) {
            ThreadSlot::Spawned(handle) => ThreadSlot::Exited(handle.join()),
            other => other,
        };
    }
}

/// Handle to one worker of a [`ThreadGroup`](super::ThreadGroup).
///
/// The handle is created unstarted; call [`Worker::start`] to spawn the OS
/// thread. Clones refer to the same worker.
#[derive(Clone)]
pub struct Worker {
    inner: Arc<Inner>,
}

impl Worker {
    pub(crate) fn new(name: String, index: usize, join_poll: Duration, body: Body) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                index,
                interrupt: Interrupt::new(),
                state: Mutex::new(WorkerState::Created),
                terminated: Condvar::new(),
                body: Mutex::new(Some(body)),
                thread: Mutex::new(ThreadSlot::Empty),
                join_poll,
            }),
        }
    }

    /// Display name, also used as the OS thread name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Sequential index within the owning group.
    pub fn index(&self) -> usize {
        self.inner.index
    }

    pub fn state(&self) -> WorkerState {
        *self.inner.state.lock()
    }

    /// Started and not yet terminated.
    pub fn is_alive(&self) -> bool {
        self.state() == WorkerState::Running
    }

    pub fn is_started(&self) -> bool {
        self.state() != WorkerState::Created
    }

    /// Requests cooperative interruption.
    ///
    /// The signal is sticky: raised before [`Worker::start`] it is still
    /// visible to the task once it runs. Nothing forces the task to stop.
    pub fn interrupt(&self) {
        self.inner.interrupt.interrupt();
    }

    pub fn is_interrupted(&self) -> bool {
        self.inner.interrupt.is_interrupted()
    }

    /// Spawns the worker thread.
    pub fn start(&self) -> Result<(), WorkerError> {
        self.spawn(thread::Builder::new())
    }

    fn spawn(&self, builder: thread::Builder) -> Result<(), WorkerError> {
        let body = self
            .inner
            .body
            .lock()
            .take()
            .ok_or_else(|| WorkerError::AlreadyStarted {
                name: self.inner.name.clone(),
            })?;

        *self.inner.state.lock() = WorkerState::Running;

        let inner = Arc::clone(&self.inner);
        let spawned = builder
            .name(self.inner.name.clone())
            .spawn(move || {
                inner.interrupt.install();
                let _guard = TerminationGuard::new(inner);
                body();
            });

        match spawned {
            Ok(handle) => {
                tracing::debug!(
                    component = "thread-group",
                    worker = %self.inner.name,
                    event = "worker_started",
                    "worker started"
                );
                *self.inner.thread.lock() = ThreadSlot::Spawned(handle);
                // The worker may already be gone and its joiner may have missed the handle.
                self.inner.reap();
                Ok(())
            }
            Err(source) => {
                self.inner.mark_terminated();
                tracing::error!(
                    component = "thread-group",
                    worker = %self.inner.name,
                    event = "spawn_failed",
                    error = %source,
                    "failed to spawn worker thread"
                );
                Err(WorkerError::Spawn {
                    name: self.inner.name.clone(),
                    source,
                })
            }
        }
    }

    /// Waits until the worker has terminated.
    ///
    /// Returns immediately for a worker that was never started. While
    /// waiting, the calling thread's interrupt signal is checked and cleared;
    /// if it was raised the wait is abandoned with `Err(Interrupted)`.
    ///
    /// Once terminated, the OS thread is joined so its resources are freed;
    /// its result stays available through [`Worker::join_thread`].
    pub fn join(&self) -> Result<(), Interrupted> {
        let caller = Interrupt::current();
        {
            let mut state = self.inner.state.lock();
            while *state == WorkerState::Running {
                caller.check()?;
                self.inner
                    .terminated
                    .wait_for(&mut state, self.inner.join_poll);
            }
        }
        self.inner.reap();
        Ok(())
    }

    /// Joins the OS thread and hands back its panic payload, if any.
    ///
    /// The result can be taken once; later calls and calls on a
    /// never-started worker return `Ok(())`.
    pub fn join_thread(&self) -> thread::Result<()> {
        let mut slot = self.inner.thread.lock();
        match std::mem::replace(&mut *slot, ThreadSlot::Empty) {
            ThreadSlot::Spawned(handle) => handle.join(),
            ThreadSlot::Exited(result) => result,
            ThreadSlot::Empty => Ok(()),
        }
    }

    /// Whether the OS thread has been joined after termination.
    pub(crate) fn is_reaped(&self) -> bool {
        matches!(*self.inner.thread.lock(), ThreadSlot::Exited(_))
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

/// Marks the worker terminated once the body returns or unwinds.
struct TerminationGuard {
    inner: Arc<Inner>,
}

impl TerminationGuard {
    fn new(inner: Arc<Inner>) -> Self {
        Self { inner }
    }
}

impl Drop for TerminationGuard {
    fn drop(&mut self) {
        self.inner.mark_terminated();
        tracing::debug!(
            component = "thread-group",
            worker = %self.inner.name,
            event = "worker_terminated",
            "worker is gone"
        );
    }
}
