//! # jobflow - Dependency-Aware Categorized Job Scheduler
//!
//! A job scheduler that multiplexes asynchronous work (asset loading,
//! logging, background I/O) across a fixed pool of worker threads and
//! per-category FIFO queues. Producers submit callbacks, optionally wire
//! dependency edges between jobs, and dispatch; a job runs exactly once,
//! only after every job it depends on has fully finished.
//!
//! ## Architecture
//!
//! - **Jobs**: one-shot callbacks with a category tag, a pending
//!   dependency count, and a dependents list, held through
//!   reference-counted handles
//! - **Category queues**: one mutex-guarded FIFO per category, each with
//!   an optional wake signal
//! - **Consumers**: per-thread helpers that pop and execute jobs from a
//!   chosen set of categories
//! - **Worker threads**: OS threads draining the designated worker
//!   category, parked on its signal when idle
//!
//! ## Example
//!
//! ```no_run
//! use jobflow::{CategoryId, JobSystem, JobSystemConfig};
//!
//! let system = JobSystem::new(JobSystemConfig::default());
//!
//! let load = system.create(CategoryId::new(0), || {
//!     println!("load bytes from disk");
//! });
//! let decode = system.create(CategoryId::new(0), || {
//!     println!("decode, strictly after load finished");
//! });
//! decode.dependent_on(&load);
//!
//! system.dispatch_and_release(load);
//! system.dispatch(&decode);
//! system.wait_and_release(decode);
//!
//! system.shutdown().unwrap();
//! ```

pub mod consumer;
pub mod counter;
pub mod error;
pub mod job;
pub mod job_system;
pub mod metrics;
pub mod queue;
pub mod signal;
mod worker;

pub use consumer::JobConsumer;
pub use counter::AtomicCounter;
pub use error::SchedulerError;
pub use job::{CategoryId, JobHandle, JobState};
pub use job_system::{JobSystem, JobSystemConfig};
pub use queue::JobQueue;
pub use signal::Signal;
