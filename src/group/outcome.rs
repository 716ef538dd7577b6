// Worker outcomes and the append-only log they are recorded into.

use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;

/// Failure captured from a worker's task.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskFault {
    /// The task panicked.
    #[error("task panicked: {message}")]
    Panicked { message: String },

    /// A fallible task returned an error.
    #[error("task failed: {0:#}")]
    Failed(Arc<anyhow::Error>),
}

impl TaskFault {
    /// Builds a fault from a panic payload.
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_string()
        };
        TaskFault::Panicked { message }
    }

    pub(crate) fn from_error(err: anyhow::Error) -> Self {
        TaskFault::Failed(Arc::new(err))
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, TaskFault::Panicked { .. })
    }

    /// Returns the underlying error of a [`TaskFault::Failed`].
    pub fn error(&self) -> Option<&anyhow::Error> {
        match self {
            TaskFault::Failed(err) => Some(err.as_ref()),
            TaskFault::Panicked { .. } => None,
        }
    }
}

/// Terminal result of one worker.
#[derive(Debug, Clone)]
pub struct WorkerOutcome {
    worker_name: String,
    failure: Option<TaskFault>,
}

impl WorkerOutcome {
    pub(crate) fn success(worker_name: String) -> Self {
        Self {
            worker_name,
            failure: None,
        }
    }

    pub(crate) fn failed(worker_name: String, fault: TaskFault) -> Self {
        Self {
            worker_name,
            failure: Some(fault),
        }
    }

    /// Display name of the worker that produced this outcome.
    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    /// Captured fault, `None` when the task completed normally.
    pub fn failure(&self) -> Option<&TaskFault> {
        self.failure.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Append-only outcome log with its own lock.
#[derive(Default)]
pub(crate) struct OutcomeLog {
    entries: Mutex<Vec<WorkerOutcome>>,
}

impl OutcomeLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, outcome: WorkerOutcome) {
        self.entries.lock().push(outcome);
    }

    /// Copies the outcomes recorded so far, in recording order.
    pub(crate) fn snapshot(&self) -> Vec<WorkerOutcome> {
        self.entries.lock().clone()
    }
}
