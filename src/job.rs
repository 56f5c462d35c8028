//! Job definitions: the schedulable unit of work and its bookkeeping.
//!
//! A job couples a one-shot callback with a category tag, a pending
//! dependency count, a dependents list, and a monotonic state tag. The
//! scheduler never inspects what the callback captures; whatever context
//! the producer needs travels inside the closure.
//!
//! Jobs are held through [`JobHandle`], an atomically reference-counted
//! handle. Cloning a handle is acquiring a reference, dropping it is
//! releasing one; the job's storage is freed when the last handle drops.
//! This replaces any manual acquire/release discipline, so there is no
//! way to touch a job after its last reference is gone.

use crate::counter::AtomicCounter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Routing key selecting which category queue (and signal) a job is
/// dispatched to. The valid range is established at system startup.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId(usize);

impl CategoryId {
    /// Creates a category id. Validity against a concrete system is
    /// checked where the id is used.
    pub const fn new(index: usize) -> Self {
        CategoryId(index)
    }

    /// The underlying queue index.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Lifecycle state of a job. States only ever advance.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum JobState {
    /// Created; dependencies may still be added.
    Waiting = 0,
    /// Pending count hit zero; sitting in its category queue.
    Enqueued = 1,
    /// A consumer is executing the callback.
    Running = 2,
    /// Callback returned; dependents have been or are being notified.
    Finished = 3,
}

impl JobState {
    fn from_u8(raw: u8) -> JobState {
        match raw {
            0 => JobState::Waiting,
            1 => JobState::Enqueued,
            2 => JobState::Running,
            3 => JobState::Finished,
            _ => unreachable!("invalid job state tag {raw}"),
        }
    }
}

type Callback = Box<dyn FnOnce() + Send + 'static>;

struct JobInner {
    category: CategoryId,
    /// Taken exactly once, when the job transitions to Running.
    callback: Mutex<Option<Callback>>,
    /// Initialized to 1: the creator's implicit "not yet dispatched" hold.
    pending_dependencies: AtomicCounter,
    dependents: Mutex<Vec<JobHandle>>,
    state: AtomicU8,
    finished: Mutex<bool>,
    finished_cond: Condvar,
    /// Shared live-job count for the owning system's capacity accounting.
    live_jobs: Arc<AtomicCounter>,
}

impl Drop for JobInner {
    fn drop(&mut self) {
        self.live_jobs.decrement();
    }
}

/// A shared handle to a scheduled unit of work.
///
/// Clone to hold an extra reference, drop to release it. Every holder of
/// a handle keeps the job alive; the dependents list of a parent job and
/// the category queue hold their own clones while their interest lasts.
#[derive(Clone)]
pub struct JobHandle {
    inner: Arc<JobInner>,
}

impl JobHandle {
    pub(crate) fn new<F>(category: CategoryId, callback: F, live_jobs: Arc<AtomicCounter>) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        JobHandle {
            inner: Arc::new(JobInner {
                category,
                callback: Mutex::new(Some(Box::new(callback))),
                pending_dependencies: AtomicCounter::new(1),
                dependents: Mutex::new(Vec::new()),
                state: AtomicU8::new(JobState::Waiting as u8),
                finished: Mutex::new(false),
                finished_cond: Condvar::new(),
                live_jobs,
            }),
        }
    }

    /// The category this job was created in.
    pub fn category(&self) -> CategoryId {
        self.inner.category
    }

    /// Current lifecycle state.
    pub fn state(&self) -> JobState {
        JobState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    /// Non-blocking completion query.
    pub fn is_finished(&self) -> bool {
        self.state() == JobState::Finished
    }

    /// True if both handles refer to the same job.
    pub fn same_job(&self, other: &JobHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Registers this job as a dependent of `parent`: this job will not
    /// be enqueued until `parent` has finished.
    ///
    /// Must be called before either job's own dispatch. The parent holds
    /// a handle to this job in its dependents list until it finishes.
    ///
    /// # Panics
    ///
    /// Panics if `parent` or `self` has already been dispatched. A parent
    /// past `Waiting` may finish before the edge is recorded, silently
    /// losing the ordering guarantee, so this is a fatal misuse.
    pub fn dependent_on(&self, parent: &JobHandle) {
        assert_eq!(
            self.state(),
            JobState::Waiting,
            "dependency added to a job that was already dispatched"
        );
        self.inner.pending_dependencies.increment();

        let mut dependents = parent.inner.dependents.lock().unwrap();
        assert_eq!(
            parent.state(),
            JobState::Waiting,
            "dependency added on a parent that was already dispatched"
        );
        dependents.push(self.clone());
    }

    /// Decrements the pending-dependency count, returning the post value.
    /// Exactly one caller observes zero and must enqueue the job.
    pub(crate) fn decrement_pending(&self) -> usize {
        self.inner.pending_dependencies.decrement()
    }

    pub(crate) fn transition(&self, from: JobState, to: JobState) {
        let swapped = self
            .inner
            .state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        assert!(
            swapped,
            "invalid job state transition {:?} -> {:?} (job was {:?})",
            from,
            to,
            self.state()
        );
    }

    /// Takes the callback for its single invocation.
    pub(crate) fn take_callback(&self) -> Callback {
        self.inner
            .callback
            .lock()
            .unwrap()
            .take()
            .expect("job callback taken twice")
    }

    /// Marks the job finished and wakes completion waiters. Called
    /// immediately after the callback returns, before dependents are
    /// notified.
    pub(crate) fn mark_finished(&self) {
        self.transition(JobState::Running, JobState::Finished);
        let mut finished = self.inner.finished.lock().unwrap();
        *finished = true;
        drop(finished);
        self.inner.finished_cond.notify_all();
    }

    /// Takes the dependents list for cascade re-dispatch, leaving it
    /// empty. Each returned handle is the reference acquired by
    /// [`dependent_on`](JobHandle::dependent_on).
    pub(crate) fn take_dependents(&self) -> Vec<JobHandle> {
        std::mem::take(&mut *self.inner.dependents.lock().unwrap())
    }

    /// Blocks until the job finishes.
    pub(crate) fn wait_finished(&self) {
        let mut finished = self.inner.finished.lock().unwrap();
        while !*finished {
            finished = self.inner.finished_cond.wait(finished).unwrap();
        }
    }

    /// Blocks until the job finishes or `timeout` elapses. Returns true
    /// if the job is finished.
    pub(crate) fn wait_finished_timeout(&self, timeout: Duration) -> bool {
        let mut finished = self.inner.finished.lock().unwrap();
        if !*finished {
            let (guard, _) = self
                .inner
                .finished_cond
                .wait_timeout(finished, timeout)
                .unwrap();
            finished = guard;
        }
        *finished
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("category", &self.inner.category)
            .field("state", &self.state())
            .field("pending", &self.inner.pending_dependencies.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live() -> Arc<AtomicCounter> {
        Arc::new(AtomicCounter::new(1))
    }

    #[test]
    fn test_new_job_initial_bookkeeping() {
        let job = JobHandle::new(CategoryId::new(2), || {}, live());
        assert_eq!(job.category(), CategoryId::new(2));
        assert_eq!(job.state(), JobState::Waiting);
        assert!(!job.is_finished());
        // The creator's implicit hold.
        assert_eq!(job.decrement_pending(), 0);
    }

    #[test]
    fn test_dependent_on_counts_and_edges() {
        let parent = JobHandle::new(CategoryId::new(0), || {}, live());
        let child = JobHandle::new(CategoryId::new(0), || {}, live());

        child.dependent_on(&parent);

        // Creator hold plus one dependency.
        assert_eq!(child.decrement_pending(), 1);
        let dependents = parent.take_dependents();
        assert_eq!(dependents.len(), 1);
        assert!(dependents[0].same_job(&child));
    }

    #[test]
    #[should_panic(expected = "already dispatched")]
    fn test_dependent_on_dispatched_parent_panics() {
        let parent = JobHandle::new(CategoryId::new(0), || {}, live());
        let child = JobHandle::new(CategoryId::new(0), || {}, live());

        parent.decrement_pending();
        parent.transition(JobState::Waiting, JobState::Enqueued);
        child.dependent_on(&parent);
    }

    #[test]
    fn test_state_machine_is_monotonic() {
        let job = JobHandle::new(CategoryId::new(0), || {}, live());
        job.transition(JobState::Waiting, JobState::Enqueued);
        job.transition(JobState::Enqueued, JobState::Running);
        job.mark_finished();
        assert!(job.is_finished());
        assert!(job.wait_finished_timeout(Duration::from_millis(1)));
    }

    #[test]
    #[should_panic(expected = "invalid job state transition")]
    fn test_skipping_states_panics() {
        let job = JobHandle::new(CategoryId::new(0), || {}, live());
        job.transition(JobState::Enqueued, JobState::Running);
    }

    #[test]
    fn test_live_count_released_on_last_drop() {
        let live_jobs = Arc::new(AtomicCounter::new(0));
        live_jobs.increment();
        let job = JobHandle::new(CategoryId::new(0), || {}, live_jobs.clone());
        let extra = job.clone();
        drop(job);
        assert_eq!(live_jobs.get(), 1);
        drop(extra);
        assert_eq!(live_jobs.get(), 0);
    }
}
