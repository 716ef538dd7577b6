// Common test utilities: gates and polling helpers.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upper bound for anything a test waits on.
pub const PATIENCE: Duration = Duration::from_secs(10);

/// One-shot latch: tasks block in `wait` until `open` is called.
///
/// Waiting ignores interrupt signals, which lets tests keep a worker
/// running after shutdown.
#[derive(Clone, Default)]
pub struct Gate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        let (lock, cond) = &*self.inner;
        *lock.lock() = true;
        cond.notify_all();
    }

    pub fn wait(&self) {
        let (lock, cond) = &*self.inner;
        let mut opened = lock.lock();
        while !*opened {
            cond.wait(&mut opened);
        }
    }
}

/// Polls `cond` until it holds or `PATIENCE` runs out.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + PATIENCE;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}
