//! Stress tests for EntiGraph.
//!
//! These tests verify behavior under heavy load and concurrent access.

use crate::fixtures::person;
use entigraph_core::{Context, FetchRequest, Predicate, Values};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of commits to perform.
    pub commits: usize,
    /// Instances created per commit.
    pub batch: usize,
    /// Number of concurrent reader threads.
    pub readers: usize,
    /// Number of concurrent writer threads.
    pub writers: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            commits: 200,
            batch: 10,
            readers: 4,
            writers: 4,
        }
    }
}

/// Creates `config.batch` people per commit, `config.commits` times.
///
/// Expects a context over the people schema.
pub fn stress_sequential_commits(ctx: &Context, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0;
    let mut failed = 0;

    for round in 0..config.commits {
        let sets: Vec<Values> = (0..config.batch)
            .map(|i| person(&format!("p{round}-{i}"), (i % 90) as i64))
            .collect();
        match ctx.bulk_create("Person", sets).and_then(|_| ctx.save()) {
            Ok(_) => successful += 1,
            Err(_) => {
                ctx.rollback();
                failed += 1;
            }
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Runs predicate fetches against snapshots while one thread commits.
///
/// Every snapshot must hold a whole number of batches: a reader never sees
/// part of a commit.
pub fn stress_snapshot_readers(ctx: Arc<Context>, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let done = Arc::new(AtomicBool::new(false));
    let reads = Arc::new(AtomicUsize::new(0));
    let torn = Arc::new(AtomicUsize::new(0));

    let readers: Vec<_> = (0..config.readers)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let done = Arc::clone(&done);
            let reads = Arc::clone(&reads);
            let torn = Arc::clone(&torn);
            let batch = config.batch;
            thread::spawn(move || {
                let request = FetchRequest::new("Person").filter(Predicate::all());
                while !done.load(Ordering::Acquire) {
                    let snapshot = ctx.snapshot();
                    let visible = snapshot.count(&request).unwrap_or(usize::MAX);
                    if visible % batch != 0
                        || visible / batch != snapshot.sequence().as_u64() as usize
                    {
                        torn.fetch_add(1, Ordering::Relaxed);
                    }
                    reads.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    let writes = stress_sequential_commits(&ctx, config);
    done.store(true, Ordering::Release);
    for reader in readers {
        reader.join().expect("Reader thread panicked");
    }

    let torn = torn.load(Ordering::Relaxed);
    StressTestResult::new(
        writes.successful_ops + reads.load(Ordering::Relaxed) - torn,
        writes.failed_ops + torn,
        start.elapsed(),
    )
}

/// Outcome of [`stress_concurrent_writers`].
#[derive(Debug, Clone)]
pub struct ConcurrentWriteResult {
    /// Saves counted as successes, failed saves as failures.
    pub result: StressTestResult,
    /// Saves that returned `true` and so appended a batch.
    pub committed_saves: usize,
    /// Instances created across all writers.
    pub creates: usize,
}

/// Runs `config.writers` threads that each create and save
/// `config.commits` times against the same context.
///
/// A save may return `false` when another writer's save already committed
/// the shared pending work.
pub fn stress_concurrent_writers(ctx: Arc<Context>, config: &StressConfig) -> ConcurrentWriteResult {
    let start = Instant::now();
    let committed = Arc::new(AtomicUsize::new(0));
    let saved = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let writers: Vec<_> = (0..config.writers)
        .map(|writer| {
            let ctx = Arc::clone(&ctx);
            let committed = Arc::clone(&committed);
            let saved = Arc::clone(&saved);
            let failed = Arc::clone(&failed);
            let config = config.clone();
            thread::spawn(move || {
                for round in 0..config.commits {
                    let sets: Vec<Values> = (0..config.batch)
                        .map(|i| person(&format!("w{writer}-{round}-{i}"), (i % 90) as i64))
                        .collect();
                    match ctx.bulk_create("Person", sets).and_then(|_| ctx.save()) {
                        Ok(wrote) => {
                            saved.fetch_add(1, Ordering::Relaxed);
                            if wrote {
                                committed.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().expect("Writer thread panicked");
    }

    ConcurrentWriteResult {
        result: StressTestResult::new(
            saved.load(Ordering::Relaxed),
            failed.load(Ordering::Relaxed),
            start.elapsed(),
        ),
        committed_saves: committed.load(Ordering::Relaxed),
        creates: config.writers * config.commits * config.batch,
    }
}
