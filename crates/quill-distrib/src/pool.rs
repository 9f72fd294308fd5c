//! The process-wide bounded worker pool.
//!
//! Distribution and scheduled publishing both execute their work here, so
//! total concurrency is bounded in one place. Tens of permits is enough;
//! unbounded parallelism would overload the per-user store.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Default number of concurrent workers.
pub const DEFAULT_WORKER_PERMITS: usize = 25;

/// A semaphore-bounded task pool on top of the tokio runtime.
///
/// Cloning is cheap; all clones share the same permit budget.
#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    permits: usize,
}

impl WorkerPool {
    /// Create a pool with the given number of permits.
    pub fn new(permits: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            permits,
        }
    }

    /// The configured permit count.
    pub fn permits(&self) -> usize {
        self.permits
    }

    /// Spawn a task that runs once a permit is available.
    ///
    /// The permit is held for the duration of the task.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let semaphore = self.semaphore.clone();
        tokio::spawn(async move {
            // The semaphore is never closed, so acquire cannot fail.
            let _permit = semaphore.acquire_owned().await.expect("pool semaphore closed");
            fut.await
        })
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKER_PERMITS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_all_tasks_complete() {
        let pool = WorkerPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let counter = counter.clone();
                pool.spawn(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 32);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                pool.spawn(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
