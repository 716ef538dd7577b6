//! Thread groups: named worker threads with outcome tracking and shutdown.

pub mod error;
pub mod group;
pub mod outcome;
pub mod worker;

// Re-export main types
pub use error::{GroupError, WorkerError};
pub use group::{ThreadGroup, DEFAULT_JOIN_POLL};
pub use outcome::{TaskFault, WorkerOutcome};
pub use worker::{Worker, WorkerState};
