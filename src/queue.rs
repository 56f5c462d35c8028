//! Mutex-guarded FIFO of job handles.
//!
//! One queue exists per category, each with its own private mutex, so
//! pushing work into one category never contends with another. The lock
//! is only ever held for a push or pop; callbacks run strictly outside
//! it. `MutexGuard` releases on every exit path, including unwind, which
//! is the entire locking discipline of this type.
//!
//! There is no blocking variant at this layer; blocking is layered on top
//! with [`Signal`](crate::signal::Signal).

use crate::job::JobHandle;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A thread-safe FIFO of jobs awaiting execution.
#[derive(Debug, Default)]
pub struct JobQueue {
    items: Mutex<VecDeque<JobHandle>>,
}

impl JobQueue {
    /// Creates a new, empty queue.
    pub fn new() -> Self {
        JobQueue::default()
    }

    /// Appends a job to the back of the queue.
    pub fn push(&self, job: JobHandle) {
        self.items.lock().unwrap().push_back(job);
    }

    /// Pops the front job, or `None` if the queue is empty.
    ///
    /// This is the authoritative emptiness test: an empty pop is a
    /// normal outcome, not an error.
    pub fn pop(&self) -> Option<JobHandle> {
        self.items.lock().unwrap().pop_front()
    }

    /// Momentary emptiness snapshot.
    ///
    /// May be stale by the time the caller acts on it; use the result of
    /// [`pop`](JobQueue::pop) to decide whether work was actually there.
    pub fn is_empty(&self) -> bool {
        self.items.lock().unwrap().is_empty()
    }

    /// Momentary length snapshot, with the same staleness caveat as
    /// [`is_empty`](JobQueue::is_empty).
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::AtomicCounter;
    use crate::job::CategoryId;
    use std::sync::Arc;

    fn handle() -> JobHandle {
        JobHandle::new(CategoryId::new(0), || {}, Arc::new(AtomicCounter::new(1)))
    }

    #[test]
    fn test_pop_on_empty_returns_none() {
        let queue = JobQueue::new();
        assert!(queue.is_empty());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_fifo_order() {
        let queue = JobQueue::new();
        let first = handle();
        let second = handle();
        queue.push(first.clone());
        queue.push(second.clone());
        assert_eq!(queue.len(), 2);

        assert!(queue.pop().unwrap().same_job(&first));
        assert!(queue.pop().unwrap().same_job(&second));
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }
}
