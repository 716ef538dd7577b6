//! Cooperative interruption signals.
//!
//! An [`Interrupt`] is a sticky flag plus a condition variable. Setting it
//! never stops a thread by force: code running on the thread has to poll
//! [`check`] / [`is_interrupted`] or block in [`sleep`], which wakes up early
//! once the flag is raised.
//!
//! Every thread has a "current" signal. Worker threads get the one owned by
//! their [`Worker`](crate::group::Worker) handle installed at start-up, any
//! other thread lazily gets a fresh one on first use.

use parking_lot::{Condvar, Mutex};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Returned by interruptible operations when the signal was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("interrupted")]
pub struct Interrupted;

struct Signal {
    flag: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

/// Shared, cloneable interruption signal.
#[derive(Clone)]
pub struct Interrupt {
    signal: Arc<Signal>,
}

thread_local! {
    static CURRENT: RefCell<Option<Interrupt>> = const { RefCell::new(None) };
}

impl Interrupt {
    /// Creates a new signal in the cleared state.
    pub fn new() -> Self {
        Self {
            signal: Arc::new(Signal {
                flag: AtomicBool::new(false),
                lock: Mutex::new(()),
                cond: Condvar::new(),
            }),
        }
    }

    /// Returns the calling thread's signal, creating it on first use.
    pub fn current() -> Self {
        CURRENT.with(|cell| cell.borrow_mut().get_or_insert_with(Interrupt::new).clone())
    }

    /// Makes this signal the calling thread's current one.
    pub(crate) fn install(&self) {
        CURRENT.with(|cell| *cell.borrow_mut() = Some(self.clone()));
    }

    /// Raises the flag and wakes every thread sleeping on it.
    pub fn interrupt(&self) {
        self.signal.flag.store(true, Ordering::SeqCst);
        // Taking the lock orders the store before a sleeper's check-then-wait.
        let _guard = self.signal.lock.lock();
        self.signal.cond.notify_all();
    }

    /// Reports the flag without clearing it.
    pub fn is_interrupted(&self) -> bool {
        self.signal.flag.load(Ordering::SeqCst)
    }

    /// Clears the flag, returning whether it was set.
    pub fn interrupted(&self) -> bool {
        self.signal.flag.swap(false, Ordering::SeqCst)
    }

    /// Clears the flag and fails if it was set.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.interrupted() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }

    /// Blocks for `duration` unless the signal is raised first.
    ///
    /// On interruption the flag is cleared and `Err(Interrupted)` returned,
    /// the same contract as [`Interrupt::check`].
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let deadline = Instant::now() + duration;
        let mut guard = self.signal.lock.lock();
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            self.signal.cond.wait_for(&mut guard, deadline - now);
        }
    }

    /// Reports whether both handles point at the same signal.
    pub fn same_as(&self, other: &Interrupt) -> bool {
        Arc::ptr_eq(&self.signal, &other.signal)
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interrupt")
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

/// Returns the calling thread's signal.
pub fn current() -> Interrupt {
    Interrupt::current()
}

/// Reports the calling thread's flag without clearing it.
pub fn is_interrupted() -> bool {
    Interrupt::current().is_interrupted()
}

/// Clears the calling thread's flag, returning whether it was set.
pub fn interrupted() -> bool {
    Interrupt::current().interrupted()
}

/// Clears the calling thread's flag and fails if it was set.
pub fn check() -> Result<(), Interrupted> {
    Interrupt::current().check()
}

/// Sleeps on the calling thread's signal.
pub fn sleep(duration: Duration) -> Result<(), Interrupted> {
    Interrupt::current().sleep(duration)
}
