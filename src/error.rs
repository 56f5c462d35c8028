//! Error types for scheduler configuration and shutdown.
//!
//! Programmer misuse of the job graph itself (dispatching a job more times
//! than it has holds, adding a dependency to an already-dispatched job,
//! exceeding the configured job capacity) is a fatal assertion, not an
//! error value. The variants here cover the recoverable surface: category
//! wiring and worker shutdown.

use thiserror::Error;

/// Errors surfaced by the job system's configuration and lifecycle API.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A category id outside the range established at startup was passed
    /// to `set_category_signal`, `queue`, or `JobConsumer::add_category`.
    #[error("unknown category id {id} (system has {category_count} categories)")]
    UnknownCategory { id: usize, category_count: usize },

    /// One or more worker threads panicked before or during shutdown.
    #[error("{0} worker thread(s) panicked")]
    WorkersPanicked(usize),
}
