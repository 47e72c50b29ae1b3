//! Bounded-concurrency worker pool.
//!
//! Every submitted future is spawned immediately but must take a semaphore
//! permit before it runs, so at most `max_workers` execute at once. Results
//! come back in completion order, tagged with the caller's key.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

/// Outcome of one task: its value, or a description of why it produced none.
pub type TaskOutcome<T> = std::result::Result<T, String>;

/// Semaphore-gated set of spawned tasks. Dropping the pool aborts whatever
/// is still running.
pub struct WorkerPool<K, T> {
    permits: Arc<Semaphore>,
    tasks: JoinSet<(K, TaskOutcome<T>)>,
    max_workers: usize,
}

impl<K, T> WorkerPool<K, T>
where
    K: Send + 'static,
    T: Send + 'static,
{
    /// A pool with `max_workers` slots (at least one).
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_workers)),
            tasks: JoinSet::new(),
            max_workers,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Tasks submitted and not yet collected.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Queue `task`; it starts once a slot is free.
    pub fn submit<F>(&mut self, key: K, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permits = self.permits.clone();
        self.tasks.spawn(async move {
            let outcome = match permits.acquire_owned().await {
                Ok(_permit) => AssertUnwindSafe(task)
                    .catch_unwind()
                    .await
                    .map_err(|payload| panic_message(payload.as_ref())),
                Err(_) => Err("worker pool closed".to_string()),
            };
            (key, outcome)
        });
    }

    /// Wait for the next task to finish, in whatever order they complete.
    /// Returns `None` once every submitted task has been collected.
    pub async fn next_completed(&mut self) -> Option<(K, TaskOutcome<T>)> {
        loop {
            match self.tasks.join_next().await? {
                Ok(done) => return Some(done),
                // Panics are caught inside the task, so this is cancellation.
                Err(e) => warn!(error = %e, "worker task did not complete"),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("task panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("task panicked: {s}")
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn collects_every_task() {
        let mut pool = WorkerPool::new(3);
        for i in 0..10usize {
            pool.submit(i, async move { i * 2 });
        }
        assert_eq!(pool.pending(), 10);

        let mut seen = Vec::new();
        while let Some((key, outcome)) = pool.next_completed().await {
            assert_eq!(outcome.unwrap(), key * 2);
            seen.push(key);
        }
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(pool.pending(), 0);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_capacity() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut pool = WorkerPool::new(2);

        for i in 0..6 {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            pool.submit(i, async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            });
        }
        while pool.next_completed().await.is_some() {}

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn results_arrive_in_completion_order() {
        let mut pool = WorkerPool::new(2);
        pool.submit("slow", async {
            tokio::time::sleep(Duration::from_millis(200)).await;
        });
        pool.submit("fast", async {});

        let (first, _) = pool.next_completed().await.unwrap();
        let (second, _) = pool.next_completed().await.unwrap();
        assert_eq!((first, second), ("fast", "slow"));
    }

    async fn explode() -> i32 {
        panic!("boom")
    }

    #[tokio::test]
    async fn panic_is_captured_per_task() {
        let mut pool = WorkerPool::new(2);
        pool.submit(0, explode());
        pool.submit(1, async { 7 });

        let mut outcomes: Vec<(i32, TaskOutcome<i32>)> = Vec::new();
        while let Some(done) = pool.next_completed().await {
            outcomes.push(done);
        }
        outcomes.sort_by_key(|(k, _)| *k);

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].1.as_ref().unwrap_err().contains("boom"));
        assert_eq!(outcomes[1].1, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_pool_aborts_running_and_queued_tasks() {
        let token = Arc::new(());
        let mut pool = WorkerPool::new(1);
        for i in 0..3 {
            let held = token.clone();
            pool.submit(i, async move {
                let _held = held;
                tokio::time::sleep(Duration::from_secs(3600)).await;
            });
        }

        // Let the first task start and park in its sleep.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(Arc::strong_count(&token), 4);

        drop(pool);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(Arc::strong_count(&token), 1);
    }

    #[test]
    fn zero_workers_becomes_one() {
        let pool: WorkerPool<(), ()> = WorkerPool::new(0);
        assert_eq!(pool.max_workers(), 1);
    }
}
