use jobflow::{CategoryId, JobSystem, JobSystemConfig, SchedulerError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// A panicking callback kills its worker thread; the scheduler makes no
// attempt to recover it. Shutdown reports the casualty, and work the
// dead worker left queued is still executed by the shutdown drain.
#[test]
fn test_worker_panic_reported_and_queue_drained() {
    let system = JobSystem::new(JobSystemConfig {
        worker_threads: 1,
        ..JobSystemConfig::default()
    });
    let executed = Arc::new(AtomicUsize::new(0));

    let panicking = system.create(CategoryId::new(0), || {
        panic!("intentional panic for testing");
    });
    system.dispatch_and_release(panicking);

    // Let the worker pick the job up and die.
    std::thread::sleep(Duration::from_millis(100));

    let executed_after = executed.clone();
    let survivor = system.create(CategoryId::new(0), move || {
        executed_after.fetch_add(1, Ordering::SeqCst);
    });
    system.dispatch_and_release(survivor);

    match system.shutdown() {
        Err(SchedulerError::WorkersPanicked(count)) => assert_eq!(count, 1),
        other => panic!("expected WorkersPanicked, got {other:?}"),
    }
    assert_eq!(executed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_live_job_released_despite_panic() {
    let system = JobSystem::new(JobSystemConfig {
        worker_threads: 1,
        ..JobSystemConfig::default()
    });

    let job = system.create(CategoryId::new(0), || {
        panic!("intentional panic for testing");
    });
    system.dispatch_and_release(job);

    std::thread::sleep(Duration::from_millis(100));

    // The queue's handle was dropped during the unwind.
    assert_eq!(system.live_jobs(), 0);
    let _ = system.shutdown();
}
