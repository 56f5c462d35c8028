//! Blocking wake primitive for idle consumers.
//!
//! A `Signal` is how worker threads avoid busy-polling empty category
//! queues: a worker that finds nothing to pop parks in `wait`/`wait_for`,
//! and the dispatching thread calls `signal_all` after pushing a job.
//!
//! The semantics are auto-reset: a `signal_all` wakes every thread parked
//! at that moment but does not stay latched for waiters that arrive
//! afterwards. One signal can serve several workers on the same category,
//! so a woken thread may find that a sibling already drained the queue;
//! callers must always re-check actual queue state after waking.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A one-to-many wake object built on a generation counter and a condvar.
#[derive(Debug, Default)]
pub struct Signal {
    generation: Mutex<u64>,
    cond: Condvar,
}

impl Signal {
    /// Creates a new, unsignaled `Signal`.
    pub fn new() -> Self {
        Signal::default()
    }

    /// Blocks the calling thread until some thread calls [`signal_all`].
    ///
    /// Only signals issued after this call starts waiting are observed;
    /// wakeups are shared, so the caller must re-check whatever condition
    /// it is waiting on.
    ///
    /// [`signal_all`]: Signal::signal_all
    pub fn wait(&self) {
        let mut generation = self.generation.lock().unwrap();
        let observed = *generation;
        while *generation == observed {
            generation = self.cond.wait(generation).unwrap();
        }
    }

    /// Blocks for at most `timeout`.
    ///
    /// Returns true if the thread was woken by a signal, false if the
    /// timeout elapsed first.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut generation = self.generation.lock().unwrap();
        let observed = *generation;
        while *generation == observed {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, result) = self.cond.wait_timeout(generation, deadline - now).unwrap();
            generation = guard;
            if result.timed_out() && *generation == observed {
                return false;
            }
        }
        true
    }

    /// Wakes every thread currently blocked in [`wait`] or [`wait_for`].
    ///
    /// Calling this with no waiters is a harmless no-op. The caller is
    /// never blocked.
    ///
    /// [`wait`]: Signal::wait
    /// [`wait_for`]: Signal::wait_for
    pub fn signal_all(&self) {
        let mut generation = self.generation.lock().unwrap();
        *generation = generation.wrapping_add(1);
        drop(generation);
        self.cond.notify_all();
    }
}
