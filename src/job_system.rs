//! High-level job system interface.
//!
//! The `JobSystem` is the primary entry point for scheduling work. It
//! owns one queue (and optionally one wake signal) per category, the
//! live-job capacity accounting, and the pool of worker threads bound to
//! the designated worker category. It is an explicit handle: several
//! independent systems can coexist in one process, and tests tear one
//! down without any process-wide state.

use crate::consumer::JobConsumer;
use crate::counter::AtomicCounter;
use crate::error::SchedulerError;
use crate::job::{CategoryId, JobHandle, JobState};
use crate::queue::JobQueue;
use crate::signal::Signal;
use crate::worker::WorkerPool;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// How long a draining waiter blocks on the completion condvar between
/// drain attempts, when the awaited job is being executed elsewhere.
const DRAIN_WAIT_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for a [`JobSystem`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobSystemConfig {
    /// Number of category queue/signal slots. Fixed for the lifetime of
    /// the system.
    pub category_count: usize,
    /// Worker thread count. A value `<= 0` means "leave that many cores
    /// free" relative to detected hardware concurrency (at least one
    /// worker is always spawned).
    pub worker_threads: i32,
    /// The category the worker pool drains. Other categories are drained
    /// by whoever builds a [`JobConsumer`] for them.
    pub worker_category: CategoryId,
    /// Maximum number of jobs alive at once (created and not yet fully
    /// released). Exceeding it is a fatal fault, not backpressure, so
    /// size it for the worst concurrent load.
    pub max_live_jobs: usize,
    /// Pin each worker thread to a CPU core.
    pub pin_workers: bool,
}

impl Default for JobSystemConfig {
    fn default() -> Self {
        Self {
            category_count: 1,
            worker_threads: -1,
            worker_category: CategoryId::new(0),
            max_live_jobs: 4096,
            pin_workers: false,
        }
    }
}

impl JobSystemConfig {
    fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads > 0 {
            return self.worker_threads as usize;
        }
        let cores = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        cores
            .saturating_sub(self.worker_threads.unsigned_abs() as usize)
            .max(1)
    }
}

/// One category's queue and optional wake signal.
#[derive(Default)]
pub(crate) struct CategorySlot {
    pub(crate) queue: JobQueue,
    signal: Mutex<Option<Arc<Signal>>>,
}

/// State shared between the system handle, its consumers, and its
/// workers.
pub(crate) struct Shared {
    categories: Vec<CategorySlot>,
    live_jobs: Arc<AtomicCounter>,
    max_live_jobs: usize,
    #[cfg(feature = "metrics")]
    pub(crate) metrics: crate::metrics::Metrics,
}

impl Shared {
    pub(crate) fn slot(&self, category: CategoryId) -> Result<&CategorySlot, SchedulerError> {
        self.categories
            .get(category.index())
            .ok_or(SchedulerError::UnknownCategory {
                id: category.index(),
                category_count: self.categories.len(),
            })
    }

    pub(crate) fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Decrements the job's pending count; the thread that drives it to
    /// zero enqueues the job and wakes the category.
    pub(crate) fn dispatch(&self, job: &JobHandle) {
        if job.decrement_pending() > 0 {
            // Some other dependency's completion will get it there.
            return;
        }

        job.transition(JobState::Waiting, JobState::Enqueued);

        // Jobs only exist with a category validated at creation.
        let slot = &self.categories[job.category().index()];
        slot.queue.push(job.clone());

        #[cfg(feature = "metrics")]
        self.metrics
            .jobs_enqueued
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let signal = slot.signal.lock().unwrap().clone();
        if let Some(signal) = signal {
            signal.signal_all();
            #[cfg(feature = "metrics")]
            self.metrics
                .signals_raised
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }

    /// Runs a popped job to completion and cascades to its dependents.
    /// `job` is the queue's reference; it is released on return.
    pub(crate) fn execute(&self, job: JobHandle) {
        job.transition(JobState::Enqueued, JobState::Running);
        let callback = job.take_callback();
        callback();
        job.mark_finished();

        #[cfg(feature = "metrics")]
        self.metrics
            .jobs_executed
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        // Each dependent's handle was acquired by dependent_on and is
        // released here once the re-dispatch has been accounted.
        for dependent in job.take_dependents() {
            self.dispatch(&dependent);
        }
    }
}

/// The main job system managing category queues and worker threads.
///
/// # Example
///
/// ```
/// use jobflow::{JobSystem, JobSystemConfig, CategoryId};
///
/// let system = JobSystem::new(JobSystemConfig {
///     worker_threads: 2,
///     ..JobSystemConfig::default()
/// });
///
/// let job = system.run(CategoryId::new(0), || {
///     // runs before `run` returns
/// });
/// assert!(job.is_finished());
/// system.shutdown().unwrap();
/// ```
pub struct JobSystem {
    shared: Arc<Shared>,
    pool: Option<WorkerPool>,
}

impl JobSystem {
    /// Starts a job system: allocates the category slots, binds a signal
    /// to the worker category, and spawns the worker pool.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is inconsistent (no categories, a
    /// worker category outside the range, a zero job capacity).
    pub fn new(config: JobSystemConfig) -> Self {
        assert!(config.category_count > 0, "at least one category required");
        assert!(
            config.worker_category.index() < config.category_count,
            "worker category {:?} outside the {} configured categories",
            config.worker_category,
            config.category_count
        );
        assert!(config.max_live_jobs > 0, "job capacity must be nonzero");

        let shared = Arc::new(Shared {
            categories: (0..config.category_count)
                .map(|_| CategorySlot::default())
                .collect(),
            live_jobs: Arc::new(AtomicCounter::new(0)),
            max_live_jobs: config.max_live_jobs,
            #[cfg(feature = "metrics")]
            metrics: crate::metrics::Metrics::new(),
        });

        let worker_signal = Arc::new(Signal::new());
        *shared.categories[config.worker_category.index()]
            .signal
            .lock()
            .unwrap() = Some(Arc::clone(&worker_signal));

        let worker_threads = config.resolved_worker_threads();
        debug!(
            "starting job system: {} categories, {} worker thread(s) on {:?}",
            config.category_count, worker_threads, config.worker_category
        );

        let pool = WorkerPool::new(
            Arc::clone(&shared),
            config.worker_category,
            worker_signal,
            worker_threads,
            config.pin_workers,
        );

        JobSystem {
            shared,
            pool: Some(pool),
        }
    }

    /// Creates a job in `category` without dispatching it.
    ///
    /// The returned handle is the creator's reference. The job will not
    /// run until [`dispatch`](JobSystem::dispatch) releases its implicit
    /// creation hold (and any dependencies have finished). A created but
    /// never-dispatched job never runs; dropping its handles releases it.
    ///
    /// # Panics
    ///
    /// Panics if `category` is out of range or the configured
    /// `max_live_jobs` capacity is exhausted.
    pub fn create<F>(&self, category: CategoryId, callback: F) -> JobHandle
    where
        F: FnOnce() + Send + 'static,
    {
        assert!(
            category.index() < self.shared.category_count(),
            "unknown category id {} (system has {} categories)",
            category.index(),
            self.shared.category_count()
        );

        let live = self.shared.live_jobs.increment();
        assert!(
            live <= self.shared.max_live_jobs,
            "job capacity exhausted: {live} live jobs (max_live_jobs = {})",
            self.shared.max_live_jobs
        );

        #[cfg(feature = "metrics")]
        self.shared
            .metrics
            .jobs_created
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        JobHandle::new(category, callback, Arc::clone(&self.shared.live_jobs))
    }

    /// Releases the job's creation hold (or one dependency hold when
    /// called from a finishing parent). Exactly the call that drives the
    /// pending count to zero enqueues the job onto its category queue
    /// and wakes the category's signal, if one is bound.
    pub fn dispatch(&self, job: &JobHandle) {
        self.shared.dispatch(job);
    }

    /// [`dispatch`](JobSystem::dispatch), consuming the caller's handle.
    /// For fire-and-forget call sites that keep no interest in the job.
    pub fn dispatch_and_release(&self, job: JobHandle) {
        self.shared.dispatch(&job);
    }

    /// Creates and dispatches a job, then drains `category` on the
    /// calling thread until the job has executed. The returned handle is
    /// always finished.
    pub fn run<F>(&self, category: CategoryId, callback: F) -> JobHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let job = self.create(category, callback);
        self.dispatch(&job);

        let mut consumer = self.consumer();
        consumer
            .add_category(category)
            .expect("category validated by create");
        self.wait_draining(&job, &mut consumer);
        job
    }

    /// Blocks until `job` has finished. The wait parks on the job's
    /// completion condvar; it burns no CPU.
    pub fn wait(&self, job: &JobHandle) {
        job.wait_finished();
    }

    /// Waits for `job` while draining `consumer`'s categories on the
    /// calling thread. Use this when the waiting thread is itself a
    /// consumer of the awaited job's category, where a plain
    /// [`wait`](JobSystem::wait) could deadlock with nobody left to
    /// execute the job.
    pub fn wait_draining(&self, job: &JobHandle, consumer: &mut JobConsumer) {
        while !job.is_finished() {
            if !consumer.consume_job() {
                // Nothing to drain; the job is running (or queued)
                // elsewhere. Park briefly rather than spinning.
                job.wait_finished_timeout(DRAIN_WAIT_INTERVAL);
            }
        }
    }

    /// [`wait`](JobSystem::wait), consuming the caller's handle.
    pub fn wait_and_release(&self, job: JobHandle) {
        job.wait_finished();
    }

    /// Binds an externally owned signal to `category`, so dispatches
    /// into it wake a custom consumer loop.
    pub fn set_category_signal(
        &self,
        category: CategoryId,
        signal: Arc<Signal>,
    ) -> Result<(), SchedulerError> {
        let slot = self.shared.slot(category)?;
        *slot.signal.lock().unwrap() = Some(signal);
        Ok(())
    }

    /// The queue backing `category`.
    pub fn queue(&self, category: CategoryId) -> Result<&JobQueue, SchedulerError> {
        Ok(&self.shared.slot(category)?.queue)
    }

    /// Builds a consumer bound to this system with an empty poll list.
    pub fn consumer(&self) -> JobConsumer {
        JobConsumer::new(Arc::clone(&self.shared))
    }

    /// Number of jobs currently alive (created and not yet fully
    /// released), counted against `max_live_jobs`.
    pub fn live_jobs(&self) -> usize {
        self.shared.live_jobs.get()
    }

    /// Number of worker threads in the pool.
    pub fn worker_count(&self) -> usize {
        self.pool.as_ref().map_or(0, WorkerPool::size)
    }

    /// Number of configured categories.
    pub fn category_count(&self) -> usize {
        self.shared.category_count()
    }

    /// Snapshot of the system's counters.
    #[cfg(feature = "metrics")]
    pub fn metrics(&self) -> crate::metrics::MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Stops the worker pool, then synchronously drains every category
    /// queue on the calling thread. Remaining jobs are executed, not
    /// discarded; this is a finish-everything policy, not cancellation.
    pub fn shutdown(mut self) -> Result<(), SchedulerError> {
        let pool_result = match self.pool.take() {
            Some(pool) => pool.shutdown(),
            None => Ok(()),
        };

        let mut consumer = JobConsumer::new(Arc::clone(&self.shared));
        for index in 0..self.shared.category_count() {
            consumer
                .add_category(CategoryId::new(index))
                .expect("indices below category_count are valid");
        }
        let drained = consumer.consume_all();
        if drained > 0 {
            debug!("shutdown drained {drained} remaining job(s)");
        }

        pool_result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn two_category_system() -> JobSystem {
        // Workers drain category 0; category 1 is drained manually.
        JobSystem::new(JobSystemConfig {
            category_count: 2,
            worker_threads: 2,
            ..JobSystemConfig::default()
        })
    }

    #[test]
    fn test_system_creation() {
        let system = two_category_system();
        assert_eq!(system.worker_count(), 2);
        assert_eq!(system.category_count(), 2);
        assert_eq!(system.live_jobs(), 0);
        system.shutdown().expect("shutdown failed");
    }

    #[test]
    fn test_worker_threads_leave_cores_free() {
        let config = JobSystemConfig {
            worker_threads: -1_000_000,
            ..JobSystemConfig::default()
        };
        assert_eq!(config.resolved_worker_threads(), 1);

        let config = JobSystemConfig {
            worker_threads: 3,
            ..JobSystemConfig::default()
        };
        assert_eq!(config.resolved_worker_threads(), 3);
    }

    #[test]
    fn test_run_executes_before_returning() {
        let system = two_category_system();
        let value = Arc::new(AtomicUsize::new(0));

        let value_in_job = value.clone();
        let job = system.run(CategoryId::new(1), move || {
            value_in_job.store(42, Ordering::SeqCst);
        });

        assert!(job.is_finished());
        assert_eq!(value.load(Ordering::SeqCst), 42);
        system.shutdown().expect("shutdown failed");
    }

    #[test]
    fn test_unknown_category_is_typed_error() {
        let system = two_category_system();

        let result = system.set_category_signal(CategoryId::new(9), Arc::new(Signal::new()));
        assert!(matches!(
            result,
            Err(SchedulerError::UnknownCategory {
                id: 9,
                category_count: 2
            })
        ));
        assert!(system.queue(CategoryId::new(9)).is_err());

        let mut consumer = system.consumer();
        assert!(consumer.add_category(CategoryId::new(9)).is_err());
        assert!(consumer.add_category(CategoryId::new(1)).is_ok());
        // Duplicates are ignored.
        assert!(consumer.add_category(CategoryId::new(1)).is_ok());

        system.shutdown().expect("shutdown failed");
    }

    #[test]
    #[should_panic(expected = "job capacity exhausted")]
    fn test_capacity_exhaustion_is_fatal() {
        let system = JobSystem::new(JobSystemConfig {
            worker_threads: 1,
            max_live_jobs: 2,
            ..JobSystemConfig::default()
        });

        // Held, undispatched handles keep the jobs alive.
        let _a = system.create(CategoryId::new(0), || {});
        let _b = system.create(CategoryId::new(0), || {});
        let _c = system.create(CategoryId::new(0), || {});
    }

    #[test]
    fn test_shutdown_drains_pending_work() {
        let system = two_category_system();
        let executed = Arc::new(AtomicUsize::new(0));

        // Category 1 has no consumer, so these sit queued until shutdown.
        for _ in 0..5 {
            let executed = executed.clone();
            let job = system.create(CategoryId::new(1), move || {
                executed.fetch_add(1, Ordering::SeqCst);
            });
            system.dispatch_and_release(job);
        }

        assert_eq!(system.queue(CategoryId::new(1)).unwrap().len(), 5);
        system.shutdown().expect("shutdown failed");
        assert_eq!(executed.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_undispatched_job_never_runs() {
        let system = two_category_system();
        let executed = Arc::new(AtomicUsize::new(0));

        let executed_in_job = executed.clone();
        let job = system.create(CategoryId::new(1), move || {
            executed_in_job.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(system.live_jobs(), 1);
        drop(job);
        assert_eq!(system.live_jobs(), 0);

        system.shutdown().expect("shutdown failed");
        assert_eq!(executed.load(Ordering::SeqCst), 0);
    }
}
