//! Job consumer: pops and executes work from a set of category queues.
//!
//! A consumer is a lightweight helper bound to the categories a given
//! thread intends to drain. Worker threads each own one bound to the
//! worker category; any other thread can build one to drain a category
//! synchronously (a frame loop, a shutdown path, a drain-while-waiting
//! call site).

use crate::error::SchedulerError;
use crate::job::CategoryId;
use crate::job_system::Shared;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pops jobs from one or more category queues and executes them on the
/// calling thread.
pub struct JobConsumer {
    shared: Arc<Shared>,
    categories: Vec<CategoryId>,
}

impl JobConsumer {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        JobConsumer {
            shared,
            categories: Vec::new(),
        }
    }

    /// Binds a category to this consumer's poll list.
    ///
    /// Categories are polled in the order they were added. Adding the
    /// same category twice is a no-op; an out-of-range id is a typed
    /// error.
    pub fn add_category(&mut self, category: CategoryId) -> Result<(), SchedulerError> {
        self.shared.slot(category)?;
        if !self.categories.contains(&category) {
            self.categories.push(category);
        }
        Ok(())
    }

    /// Pops and executes at most one job.
    ///
    /// Polls the bound queues in order; on success the job's callback is
    /// invoked, completion is cascaded to its dependents, and the queue's
    /// reference on the job is released. Returns false only if every
    /// bound queue was empty.
    pub fn consume_job(&mut self) -> bool {
        for &category in &self.categories {
            let job = match self.shared.slot(category) {
                Ok(slot) => slot.queue.pop(),
                Err(_) => unreachable!("bound categories are validated on add"),
            };
            if let Some(job) = job {
                self.shared.execute(job);
                return true;
            }
        }
        false
    }

    /// Executes jobs until every bound queue is empty. Returns the
    /// number of jobs executed.
    pub fn consume_all(&mut self) -> usize {
        let mut executed = 0;
        while self.consume_job() {
            executed += 1;
        }
        executed
    }

    /// Executes jobs until `budget` elapses or every bound queue is
    /// empty, whichever comes first. Never spin-waits out the remainder
    /// of the budget. Returns the number of jobs executed.
    pub fn consume_for(&mut self, budget: Duration) -> usize {
        let start = Instant::now();
        let mut executed = 0;
        while start.elapsed() < budget {
            if !self.consume_job() {
                break;
            }
            executed += 1;
        }
        executed
    }
}
