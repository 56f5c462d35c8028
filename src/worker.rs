//! Worker thread implementation.
//!
//! Worker threads run an infinite consume loop over the designated worker
//! category: drain the queue, then park on the category's signal until a
//! dispatch wakes them. Parking uses a bounded wait so the shutdown flag
//! is always noticed even if no new work (and no signal) ever arrives.

use crate::consumer::JobConsumer;
use crate::error::SchedulerError;
use crate::job::CategoryId;
use crate::job_system::Shared;
use crate::signal::Signal;
use log::{debug, error, trace};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Upper bound on how long a worker parks before re-checking the
/// shutdown flag and its queue.
const PARK_INTERVAL: Duration = Duration::from_millis(100);

/// A worker thread draining one category queue.
struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Creates and starts a new worker thread.
    fn new(
        id: usize,
        shared: Arc<Shared>,
        category: CategoryId,
        signal: Arc<Signal>,
        shutdown: Arc<AtomicBool>,
        pin_to_core: bool,
    ) -> Self {
        let handle = thread::Builder::new()
            .name(format!("jobflow-worker-{id}"))
            .spawn(move || {
                // Pin worker to its core for better cache locality
                if pin_to_core {
                    if let Some(core_ids) = core_affinity::get_core_ids() {
                        if id < core_ids.len() {
                            core_affinity::set_for_current(core_ids[id]);
                        }
                    }
                }

                Worker::run_loop(id, shared, category, signal, shutdown);
            })
            .expect("failed to spawn worker thread");

        Worker {
            id,
            handle: Some(handle),
        }
    }

    /// Main execution loop: consume until empty, then park on the signal.
    fn run_loop(
        id: usize,
        shared: Arc<Shared>,
        category: CategoryId,
        signal: Arc<Signal>,
        shutdown: Arc<AtomicBool>,
    ) {
        debug!("worker {id} started on category {category:?}");

        let mut consumer = JobConsumer::new(shared);
        consumer
            .add_category(category)
            .expect("worker category validated at startup");

        loop {
            let executed = consumer.consume_all();
            if executed > 0 {
                trace!("worker {id} executed {executed} job(s)");
            }

            if shutdown.load(Ordering::Acquire) {
                // Finish-everything policy: one last drain before exit.
                consumer.consume_all();
                break;
            }

            // Spurious and shared wakeups are fine; the loop re-checks
            // the queue either way.
            signal.wait_for(PARK_INTERVAL);
        }

        debug!("worker {id} exiting");
    }

    fn join(mut self) -> thread::Result<()> {
        match self.handle.take() {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }
}

/// A fixed pool of worker threads bound to one category.
pub(crate) struct WorkerPool {
    workers: Vec<Worker>,
    shutdown: Arc<AtomicBool>,
    signal: Arc<Signal>,
}

impl WorkerPool {
    /// Spawns `num_threads` workers draining `category`, parking on
    /// `signal` when idle.
    pub(crate) fn new(
        shared: Arc<Shared>,
        category: CategoryId,
        signal: Arc<Signal>,
        num_threads: usize,
        pin_to_core: bool,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let workers = (0..num_threads)
            .map(|id| {
                Worker::new(
                    id,
                    Arc::clone(&shared),
                    category,
                    Arc::clone(&signal),
                    Arc::clone(&shutdown),
                    pin_to_core,
                )
            })
            .collect();

        WorkerPool {
            workers,
            shutdown,
            signal,
        }
    }

    /// Returns the number of worker threads in the pool.
    pub(crate) fn size(&self) -> usize {
        self.workers.len()
    }

    /// Stops all workers and waits for them to finish. Workers drain
    /// their queue once more after observing the flag, so pending work
    /// in the worker category is executed rather than discarded.
    pub(crate) fn shutdown(self) -> Result<(), SchedulerError> {
        self.shutdown.store(true, Ordering::Release);
        self.signal.signal_all();

        let mut panicked = 0;
        for worker in self.workers {
            let worker_id = worker.id;
            if worker.join().is_err() {
                panicked += 1;
                error!("worker {worker_id} panicked during execution");
            }
        }

        if panicked > 0 {
            Err(SchedulerError::WorkersPanicked(panicked))
        } else {
            Ok(())
        }
    }
}
