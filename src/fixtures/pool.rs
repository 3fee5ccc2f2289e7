//! Bounded worker pool for batch provisioning and teardown.
//!
//! Tasks are spawned all at once and gated by a semaphore, so at most
//! `max_workers` run concurrently. Every task is awaited; results come back in
//! submission order regardless of completion order.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::SuiteConfig;
use crate::error::{Error, Result};

use super::scope::Finalizer;

/// Results of a batch, in submission order.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    results: Vec<Result<T>>,
}

impl<T> BatchOutcome<T> {
    /// Per-task results.
    pub fn results(&self) -> &[Result<T>] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Every failure in the batch.
    pub fn errors(&self) -> Vec<&Error> {
        self.results.iter().filter_map(|r| r.as_ref().err()).collect()
    }

    /// All values, or the first error in submission order.
    pub fn into_result(self) -> Result<Vec<T>> {
        self.results.into_iter().collect()
    }

    /// Splits into successes and failures.
    pub fn into_parts(self) -> (Vec<T>, Vec<Error>) {
        let mut values = Vec::new();
        let mut errors = Vec::new();
        for result in self.results {
            match result {
                Ok(value) => values.push(value),
                Err(e) => errors.push(e),
            }
        }
        (values, errors)
    }
}

/// Caps how many provisioning tasks hit the platform at once.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    max_workers: usize,
}

impl WorkerPool {
    /// A pool running at most `max_workers` tasks at a time (at least one).
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_workers)),
            max_workers,
        }
    }

    /// A pool sized by `max_workers` in the suite configuration.
    pub fn from_config(config: &SuiteConfig) -> Self {
        Self::new(config.max_workers)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Runs async tasks and waits for all of them.
    pub async fn run_all<T, F, Fut, I>(&self, tasks: I) -> BatchOutcome<T>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let mut set = JoinSet::new();
        let mut submitted = 0;
        for (index, task) in tasks.into_iter().enumerate() {
            let permits = Arc::clone(&self.permits);
            set.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => task().await,
                    Err(e) => Err(Error::Worker(e.to_string())),
                };
                (index, result)
            });
            submitted += 1;
        }
        tracing::debug!(tasks = submitted, max_workers = self.max_workers, "batch started");

        collect(set, submitted).await
    }

    /// Runs blocking closures on the blocking thread pool, at most
    /// `max_workers` at a time, and waits for all of them.
    pub async fn run_blocking_all<T, F, I>(&self, tasks: I) -> BatchOutcome<T>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.run_all(tasks.into_iter().map(|task| {
            move || async move {
                tokio::task::spawn_blocking(task)
                    .await
                    .map_err(|e| Error::Worker(e.to_string()))?
            }
        }))
        .await
    }
}

async fn collect<T: 'static>(mut set: JoinSet<(usize, Result<T>)>, submitted: usize) -> BatchOutcome<T> {
    let mut slots: Vec<Option<Result<T>>> = (0..submitted).map(|_| None).collect();
    let mut lost = Vec::new();

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => {
                tracing::error!(error = %e, "pooled task did not complete");
                lost.push(e.to_string());
            }
        }
    }

    // A panicked task cannot report its index; its slot stays empty.
    let mut lost = lost.into_iter();
    let results = slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| {
                Err(Error::Worker(
                    lost.next().unwrap_or_else(|| "task result missing".to_string()),
                ))
            })
        })
        .collect();
    BatchOutcome { results }
}

/// Entities created by [`provision_batch`] and the finalizers that remove them.
///
/// The finalizers are orphans: no scope owns them until the caller hands them
/// to one, usually through [`TestScope::adopt_orphans`](super::TestScope::adopt_orphans).
#[derive(Debug)]
pub struct Provisioned<T> {
    pub items: Vec<T>,
    pub orphans: Vec<Finalizer>,
    pub errors: Vec<Error>,
}

impl<T> Provisioned<T> {
    /// Fails when any creation failed. Orphans of the successful creations
    /// stay in place so they can still be gathered.
    pub fn check(&self) -> Result<()> {
        match self.errors.first() {
            Some(e) => Err(Error::Worker(format!(
                "{} of {} creations failed, first: {}",
                self.errors.len(),
                self.errors.len() + self.items.len(),
                e
            ))),
            None => Ok(()),
        }
    }
}

/// Creates `count` entities concurrently on `pool`.
///
/// `create` receives the task index and returns the entity plus the finalizer
/// removing it. Failed creations are collected, not raised.
pub async fn provision_batch<T, F, Fut>(pool: &WorkerPool, count: usize, create: F) -> Provisioned<T>
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(T, Finalizer)>> + Send + 'static,
    T: Send + 'static,
{
    tracing::info!(count, max_workers = pool.max_workers(), "provisioning batch");
    let create = Arc::new(create);
    let outcome = pool
        .run_all((0..count).map(|index| {
            let create = Arc::clone(&create);
            move || create(index)
        }))
        .await;

    let (created, errors) = outcome.into_parts();
    let (items, orphans): (Vec<T>, Vec<Finalizer>) = created.into_iter().unzip();
    if !errors.is_empty() {
        tracing::warn!(failed = errors.len(), count, "batch provisioning had failures");
    }
    Provisioned {
        items,
        orphans,
        errors,
    }
}

/// Runs orphan finalizers concurrently on `pool`.
///
/// Every finalizer runs; failures are reported together as
/// [`Error::Teardown`].
pub async fn gather_finalizers(pool: &WorkerPool, finalizers: Vec<Finalizer>) -> Result<()> {
    let total = finalizers.len();
    tracing::info!(finalizers = total, "gathering orphan finalizers");

    let outcome = pool
        .run_all(finalizers.into_iter().map(|finalizer| {
            move || async move { Ok::<_, Error>(finalizer.run_reporting().await) }
        }))
        .await;

    let (reports, lost) = outcome.into_parts();
    let mut failures: Vec<String> = reports.into_iter().filter_map(|r| r.err()).collect();
    failures.extend(lost.iter().map(|e| e.to_string()));
    if failures.is_empty() {
        Ok(())
    } else {
        Err(Error::Teardown(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_is_bounded() {
        let pool = WorkerPool::new(3);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let outcome = pool
            .run_all((0..12).map(|i| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                move || async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(i)
                }
            }))
            .await;

        assert_eq!(outcome.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn results_keep_submission_order() {
        let pool = WorkerPool::new(4);
        let outcome = pool
            .run_all((0..5u64).map(|i| {
                move || async move {
                    tokio::time::sleep(Duration::from_millis(5 * (5 - i))).await;
                    Ok(i)
                }
            }))
            .await;

        assert_eq!(outcome.into_result().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn every_failure_is_reported() {
        let pool = WorkerPool::new(2);
        let outcome = pool
            .run_blocking_all((0..6).map(|i| {
                move || {
                    if i % 3 == 0 {
                        Err(Error::Cluster(format!("svc-{} refused", i)))
                    } else {
                        Ok(i)
                    }
                }
            }))
            .await;

        assert_eq!(outcome.errors().len(), 2);
        let err = outcome.into_result().unwrap_err();
        assert!(err.to_string().contains("svc-0"));
    }

    #[tokio::test]
    async fn panicking_task_becomes_worker_error() {
        let pool = WorkerPool::new(2);
        let outcome = pool
            .run_all((0..3).map(|i| {
                move || async move {
                    if i == 1 {
                        panic!("boom");
                    }
                    Ok(i)
                }
            }))
            .await;

        let (values, errors) = outcome.into_parts();
        assert_eq!(values, vec![0, 2]);
        assert!(matches!(errors.as_slice(), [Error::Worker(_)]));
    }

    #[test]
    fn zero_workers_still_runs() {
        assert_eq!(WorkerPool::new(0).max_workers(), 1);
    }

    #[tokio::test]
    async fn batch_orphans_are_all_gathered() {
        let pool = WorkerPool::new(4);
        let deleted = Arc::new(AtomicUsize::new(0));

        let provisioned = {
            let deleted = Arc::clone(&deleted);
            provision_batch(&pool, 20, move |i| {
                let deleted = Arc::clone(&deleted);
                async move {
                    let name = format!("svc-{}", i);
                    let finalizer = Finalizer::new(format!("delete {}", name), move || async move {
                        deleted.fetch_add(1, Ordering::SeqCst);
                        if i == 7 {
                            return Err(Error::Cluster("still in use".to_string()));
                        }
                        Ok(())
                    });
                    Ok((name, finalizer))
                }
            })
            .await
        };

        provisioned.check().unwrap();
        assert_eq!(provisioned.items.len(), 20);
        assert_eq!(provisioned.items[7], "svc-7");

        let err = gather_finalizers(&pool, provisioned.orphans)
            .await
            .unwrap_err();

        assert_eq!(deleted.load(Ordering::SeqCst), 20);
        match err {
            Error::Teardown(failures) => {
                assert_eq!(failures, vec!["delete svc-7: cluster operation failed: still in use"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn failed_creations_are_collected() {
        let pool = WorkerPool::new(2);
        let provisioned = provision_batch(&pool, 4, |i| async move {
            if i == 3 {
                return Err(Error::Cluster("quota exceeded".to_string()));
            }
            Ok((i, Finalizer::new("noop", || async { Ok(()) })))
        })
        .await;

        assert_eq!(provisioned.items, vec![0, 1, 2]);
        assert_eq!(provisioned.orphans.len(), 3);
        assert!(provisioned.check().is_err());
    }
}
