//! Concurrency stress helpers.
//!
//! These drive many threads against one [`SyncStore`] and report what the
//! version tracker let through.

use bytes::Bytes;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use tasksync_core::{ClientId, SyncStore, VersionId};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total append attempts.
    pub total_ops: usize,
    /// Accepted appends.
    pub successful_ops: usize,
    /// Appends rejected as conflicts.
    pub conflicts: usize,
    /// Appends that failed for any other reason.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Attempts per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, conflicts: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + conflicts + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            conflicts,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    fn merge(self, other: Self) -> Self {
        Self::new(
            self.successful_ops + other.successful_ops,
            self.conflicts + other.conflicts,
            self.failed_ops + other.failed_ops,
            self.duration.max(other.duration),
        )
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Attempts: {}", self.total_ops);
        println!("Accepted: {}", self.successful_ops);
        println!("Conflicts: {}", self.conflicts);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Versions each thread commits.
    pub versions_per_thread: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Payload size in bytes.
    pub payload_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            versions_per_thread: 100,
            threads: 4,
            payload_size: 256,
        }
    }
}

/// Releases `threads` appends with the same parent at once.
///
/// Returns how many were accepted and how many conflicted.
pub fn race_same_parent(
    store: &Arc<SyncStore>,
    client: ClientId,
    parent: VersionId,
    threads: usize,
) -> StressTestResult {
    let barrier = Arc::new(Barrier::new(threads));
    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let store = Arc::clone(store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.append_batch(client, parent, Bytes::from(format!("racer-{i}")))
            })
        })
        .collect();

    let mut accepted = 0;
    let mut conflicts = 0;
    let mut failed = 0;
    for handle in handles {
        match handle.join().expect("racer panicked") {
            Ok(_) => accepted += 1,
            Err(e) if e.is_conflict() => conflicts += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(accepted, conflicts, failed, start.elapsed())
}

/// Devices sharing one client, each pulling and retrying on conflict until
/// it has committed its share of versions.
pub fn stress_shared_client(
    store: &Arc<SyncStore>,
    client: ClientId,
    config: &StressConfig,
) -> StressTestResult {
    let handles: Vec<_> = (0..config.threads)
        .map(|device| {
            let store = Arc::clone(store);
            let config = config.clone();
            thread::spawn(move || {
                let payload = Bytes::from(vec![device as u8; config.payload_size]);
                let start = Instant::now();
                let (mut accepted, mut conflicts, mut failed) = (0, 0, 0);

                while accepted < config.versions_per_thread {
                    let parent = match store.latest_version(client) {
                        Ok(latest) => latest,
                        Err(_) => {
                            failed += 1;
                            break;
                        }
                    };
                    match store.append_batch(client, parent, payload.clone()) {
                        Ok(_) => accepted += 1,
                        Err(e) if e.is_conflict() => conflicts += 1,
                        Err(_) => {
                            failed += 1;
                            break;
                        }
                    }
                }

                StressTestResult::new(accepted, conflicts, failed, start.elapsed())
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|h| h.join().expect("device panicked"))
        .reduce(StressTestResult::merge)
        .unwrap_or_else(|| StressTestResult::new(0, 0, 0, Duration::ZERO))
}

/// One thread per client, each committing without contention.
pub fn stress_independent_clients(
    store: &Arc<SyncStore>,
    config: &StressConfig,
) -> (Vec<ClientId>, StressTestResult) {
    let clients: Vec<_> = (0..config.threads).map(|_| ClientId::generate()).collect();
    let start = Instant::now();

    let handles: Vec<_> = clients
        .iter()
        .map(|&client| {
            let store = Arc::clone(store);
            let config = config.clone();
            thread::spawn(move || {
                let payload = Bytes::from(vec![0xAB; config.payload_size]);
                let mut parent = VersionId::NIL;
                let (mut accepted, mut failed) = (0, 0);
                for _ in 0..config.versions_per_thread {
                    match store.append_batch(client, parent, payload.clone()) {
                        Ok(outcome) => {
                            parent = outcome.version;
                            accepted += 1;
                        }
                        Err(_) => failed += 1,
                    }
                }
                (accepted, failed)
            })
        })
        .collect();

    let (accepted, failed) = handles
        .into_iter()
        .map(|h| h.join().expect("client thread panicked"))
        .fold((0, 0), |(a, f), (a2, f2)| (a + a2, f + f2));

    (clients, StressTestResult::new(accepted, 0, failed, start.elapsed()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasksync_core::StoreConfig;

    fn create_store() -> Arc<SyncStore> {
        Arc::new(SyncStore::in_memory(StoreConfig::default()))
    }

    #[test]
    fn race_has_one_winner() {
        let store = create_store();
        let client = ClientId::generate();

        let result = race_same_parent(&store, client, VersionId::NIL, 8);
        assert_eq!(result.successful_ops, 1);
        assert_eq!(result.conflicts, 7);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(store.latest_version(client).unwrap(), VersionId::new(1));
    }

    #[test]
    fn shared_client_history_stays_linear() {
        let store = create_store();
        let client = ClientId::generate();
        let config = StressConfig {
            versions_per_thread: 50,
            threads: 4,
            payload_size: 16,
        };

        let result = stress_shared_client(&store, client, &config);
        result.print_summary("shared client");
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.total_ops, result.successful_ops + result.conflicts);
        assert_eq!(result.successful_ops, 200);

        let history = store.read_batches(client, VersionId::NIL, None).unwrap();
        assert_eq!(history.len(), 200);
        for (i, batch) in history.iter().enumerate() {
            assert_eq!(batch.version, VersionId::new(i as u64 + 1));
            assert_eq!(batch.parent, VersionId::new(i as u64));
        }
    }

    #[test]
    fn independent_clients_never_conflict() {
        let store = create_store();
        let config = StressConfig {
            versions_per_thread: 100,
            threads: 4,
            payload_size: 32,
        };

        let (clients, result) = stress_independent_clients(&store, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 400);
        for client in clients {
            assert_eq!(store.latest_version(client).unwrap(), VersionId::new(100));
        }
    }
}
