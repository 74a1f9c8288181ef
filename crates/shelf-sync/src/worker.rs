//! # Worker Pool
//!
//! Bounds how much offloaded work the engine has in flight.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Semaphore (size = N permits)                                          │
//! │                                                                         │
//! │  run(remote call)        ── permit ──► awaited on the runtime          │
//! │  run_blocking(file I/O)  ── permit ──► spawn_blocking thread           │
//! │                                                                         │
//! │  Call N+1 waits for a permit; nothing is spawned until it gets one.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::{SyncError, SyncResult};

/// Default number of concurrent offloaded calls.
pub const DEFAULT_WORKERS: usize = 4;

/// Semaphore-bounded executor for remote calls and blocking I/O.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        WorkerPool::new(DEFAULT_WORKERS)
    }
}

impl WorkerPool {
    /// Creates a pool running at most `size` calls at once (minimum 1).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        WorkerPool {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Awaits `fut` while holding a permit.
    pub async fn run<F, T>(&self, fut: F) -> SyncResult<T>
    where
        F: Future<Output = T>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SyncError::ShuttingDown)?;
        Ok(fut.await)
    }

    /// Runs `f` on the blocking thread pool while holding a permit.
    ///
    /// A panic inside `f` is returned as `WorkerFailed`.
    pub async fn run_blocking<F, T>(&self, f: F) -> SyncResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| SyncError::ShuttingDown)?;

        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await?;

        Ok(result)
    }

    /// Stops handing out permits; queued and future calls fail with
    /// `ShuttingDown`.
    pub fn close(&self) {
        self.permits.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_returns_value() {
        let pool = WorkerPool::new(2);
        assert_eq!(pool.run(async { 40 + 2 }).await.unwrap(), 42);
        assert_eq!(pool.run_blocking(|| "done").await.unwrap(), "done");
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_blocking_work_is_bounded() {
        let pool = WorkerPool::new(2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let pool = pool.clone();
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                pool.run_blocking(move || {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_panic_becomes_error() {
        let pool = WorkerPool::new(1);
        let result: SyncResult<()> = pool.run_blocking(|| panic!("snapshot disk on fire")).await;
        assert!(matches!(result, Err(SyncError::WorkerFailed(_))));

        // The permit came back
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_closed_pool_refuses_work() {
        let pool = WorkerPool::new(1);
        pool.close();
        assert!(matches!(
            pool.run(async {}).await,
            Err(SyncError::ShuttingDown)
        ));
    }

    #[test]
    fn test_minimum_size() {
        assert_eq!(WorkerPool::new(0).size(), 1);
    }
}
