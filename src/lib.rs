//! Worker-thread groups.
//!
//! A [`ThreadGroup`](group::ThreadGroup) creates named worker threads on
//! demand, tracks their lifecycle, shuts them down cooperatively and keeps a
//! per-worker [`WorkerOutcome`](group::WorkerOutcome) for inspection.
//!
//! ```no_run
//! use threadunion::group::ThreadGroup;
//!
//! let group = ThreadGroup::new("ingest");
//! let worker = group.new_worker(|| println!("hello")).unwrap();
//! worker.start().unwrap();
//!
//! group.shutdown();
//! group.await_termination().unwrap();
//! assert_eq!(group.results().len(), 1);
//! ```

#[path = "shared/interrupt/mod.rs"]
pub mod interrupt;
#[cfg(test)]
mod tests;

#[cfg(test)]
pub use tests::support;

pub mod config;
pub mod shutdown;
pub mod group;

pub use interrupt::{Interrupt, Interrupted};
pub use group::{
    GroupError, TaskFault, ThreadGroup, Worker, WorkerError, WorkerOutcome, WorkerState,
};
