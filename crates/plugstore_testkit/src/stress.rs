//! Stress tests for plugstore.
//!
//! These helpers hammer a database from several threads and report how
//! many operations succeeded.

use plugstore_db::{Database, Pk, Transaction};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
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
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Size of each entry in bytes.
    pub entry_size: usize,
    /// Partition to work in.
    pub partition: String,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
            entry_size: 256,
            partition: "stress".to_string(),
        }
    }
}

/// Result of [`stress_concurrent_next_key`].
#[derive(Debug, Clone)]
pub struct KeyStressResult {
    /// Throughput and failure counts.
    pub result: StressTestResult,
    /// Every key that was stored.
    pub keys: Vec<Pk>,
}

impl KeyStressResult {
    /// Number of distinct keys among [`KeyStressResult::keys`].
    pub fn distinct(&self) -> usize {
        self.keys.iter().collect::<HashSet<_>>().len()
    }
}

/// Creates and stores keys with `next_key` from several threads, one write
/// transaction per key.
pub fn stress_concurrent_next_key(db: &Database, config: &StressConfig) -> KeyStressResult {
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|_| {
            let db = db.clone();
            let failed = Arc::clone(&failed);
            let partition = config.partition.clone();
            let operations = config.operations;
            thread::spawn(move || {
                let mut keys = Vec::with_capacity(operations);
                for _ in 0..operations {
                    let tx = db.partition(&partition).begin_write();
                    let key = tx.next_key();
                    match tx.put_bytes(key, b"{}") {
                        Ok(_) => keys.push(key),
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    let _ = tx.commit();
                }
                keys
            })
        })
        .collect();

    let mut keys = Vec::new();
    for handle in handles {
        keys.extend(handle.join().expect("Thread panicked"));
    }

    KeyStressResult {
        result: StressTestResult::new(keys.len(), failed.load(Ordering::Relaxed), start.elapsed()),
        keys,
    }
}

/// Overwrites a small set of entries from several threads while readers
/// check that every read sees a complete value.
///
/// A read fails if it returns anything other than `entry_size` copies of a
/// single byte, which would mean a torn write became visible.
pub fn stress_concurrent_writers(db: &Database, config: &StressConfig) -> StressTestResult {
    const SLOTS: usize = 8;
    let keys: Arc<Vec<Pk>> = Arc::new((0..SLOTS).map(|_| Pk::random()).collect());
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let db = db.clone();
            let keys = Arc::clone(&keys);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let partition = config.partition.clone();
            let operations = config.operations;
            let entry_size = config.entry_size;
            thread::spawn(move || {
                for i in 0..operations {
                    let key = keys[(t + i) % SLOTS];
                    let ok = if (t + i) % 2 == 0 {
                        let fill = (t * 31 + i) as u8;
                        let tx = db.partition(&partition).begin_write();
                        let ok = tx.put_bytes(key, &vec![fill; entry_size]).is_ok();
                        tx.commit().is_ok() && ok
                    } else {
                        let tx = db.partition(&partition).begin_read();
                        let ok = match tx.get_bytes(key) {
                            Ok(bytes) => {
                                bytes.len() == entry_size && bytes.iter().all(|b| *b == bytes[0])
                            }
                            Err(err) => err.is_entity_not_found(),
                        };
                        tx.commit().is_ok() && ok
                    };
                    if ok {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}
