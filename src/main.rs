use jobflow::{CategoryId, JobSystem, JobSystemConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

// Category layout of a typical client: background workers plus a queue
// drained once per frame on the main thread.
const GENERAL: CategoryId = CategoryId::new(0);
const FRAME: CategoryId = CategoryId::new(1);

fn main() {
    env_logger::init();

    println!("jobflow - Dependency-Aware Categorized Job Scheduler\n");

    let system = JobSystem::new(JobSystemConfig {
        category_count: 2,
        worker_threads: 4,
        worker_category: GENERAL,
        ..JobSystemConfig::default()
    });
    println!(
        "Initialized job system with {} worker threads\n",
        system.worker_count()
    );

    // Example 1: fire and block until done
    println!("Example 1: Synchronous run");
    system.run(GENERAL, || {
        println!("  Hello from a worker job!");
    });
    println!("  Job completed\n");

    // Example 2: parallel fan-out with a dependent final job
    println!("Example 2: Parallel fan-out");
    let sum = Arc::new(AtomicUsize::new(0));
    let num_jobs = 100;

    let start = Instant::now();
    let jobs: Vec<_> = (0..num_jobs)
        .map(|i| {
            let sum = sum.clone();
            system.create(GENERAL, move || {
                sum.fetch_add(i, Ordering::SeqCst);
            })
        })
        .collect();

    let sum_in_final = sum.clone();
    let final_job = system.create(GENERAL, move || {
        println!(
            "  All inputs done, sum = {}",
            sum_in_final.load(Ordering::SeqCst)
        );
    });
    for job in &jobs {
        final_job.dependent_on(job);
    }

    for job in jobs {
        system.dispatch_and_release(job);
    }
    system.dispatch(&final_job);
    system.wait_and_release(final_job);

    let expected: usize = (0..num_jobs).sum();
    println!(
        "  Executed {} jobs + 1 dependent in {:?} (expected sum: {})\n",
        num_jobs,
        start.elapsed(),
        expected
    );

    // Example 3: a multi-stage pipeline across categories. The last
    // stage lands in the frame queue and is drained here, the way a
    // render thread would pick up a finished upload once per frame.
    println!("Example 3: Pipeline staged across categories");
    let load = system.create(GENERAL, || {
        println!("  [general] load bytes from disk");
    });
    let decode = system.create(GENERAL, || {
        println!("  [general] decode image");
    });
    let upload = system.create(FRAME, || {
        println!("  [frame]   upload to graphics device");
    });
    decode.dependent_on(&load);
    upload.dependent_on(&decode);

    system.dispatch_and_release(load);
    system.dispatch_and_release(decode);
    system.dispatch(&upload);

    let mut frame_consumer = system.consumer();
    frame_consumer.add_category(FRAME).expect("known category");
    system.wait_draining(&upload, &mut frame_consumer);
    println!("  Pipeline complete\n");

    println!("Shutting down job system...");
    match system.shutdown() {
        Ok(()) => println!("Done!"),
        Err(e) => eprintln!("Shutdown error: {e}"),
    }
}
