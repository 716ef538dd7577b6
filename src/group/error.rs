// Error definitions for thread groups and their workers.

use std::io;

/// Errors returned by [`ThreadGroup`](super::ThreadGroup) operations.
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    /// The group was shut down; it will never accept new workers again.
    #[error("thread group {group:?} is already shut down")]
    AlreadyShutdown { group: String },

    /// The waiting thread was interrupted while joining a worker.
    #[error("interrupted while joining worker {worker:?}")]
    JoinInterrupted { worker: String },
}

/// Errors returned by [`Worker`](super::Worker) lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("worker {name:?} has already been started")]
    AlreadyStarted { name: String },

    #[error("failed to spawn thread for worker {name:?}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
}
