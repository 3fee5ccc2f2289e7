//! Per-test resource scopes and their finalizers.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};

use super::blame::blame;
use super::pool::{gather_finalizers, WorkerPool};

/// Future returned by a finalizer.
pub type FinalizerFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// A deferred teardown action. Nothing runs until [`Finalizer::run`].
pub struct Finalizer {
    label: String,
    action: Box<dyn FnOnce() -> FinalizerFuture + Send + 'static>,
}

impl Finalizer {
    pub fn new<F, Fut>(label: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            label: label.into(),
            action: Box::new(move || Box::pin(action())),
        }
    }

    /// Describes what the finalizer tears down.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Runs the action.
    pub async fn run(self) -> Result<()> {
        tracing::debug!(finalizer = %self.label, "running finalizer");
        let result = (self.action)().await;
        if let Err(e) = &result {
            tracing::warn!(finalizer = %self.label, error = %e, "finalizer failed");
        }
        result
    }

    /// Runs the action, describing a failure as `{label}: {error}`.
    pub async fn run_reporting(self) -> std::result::Result<(), String> {
        let label = self.label.clone();
        self.run().await.map_err(|e| format!("{}: {}", label, e))
    }
}

impl std::fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Finalizer").field("label", &self.label).finish()
    }
}

/// Resources owned by one test (or one module of tests).
///
/// Finalizers run innermost-first on [`TestScope::teardown`]. A failing
/// finalizer never stops the others; all failures are reported together.
/// Clones share the same finalizer stack, so a test body can own one handle
/// while [`TestScope::run`] keeps another for teardown.
#[derive(Clone)]
pub struct TestScope {
    name: String,
    finalizers: Arc<Mutex<Vec<Finalizer>>>,
}

impl TestScope {
    /// Creates a scope for the test called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            finalizers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Runs `body` with a fresh scope and tears the scope down afterwards,
    /// whether the body returned, failed or panicked.
    ///
    /// A panic in the body is resumed once teardown has finished. An error
    /// from the body wins over a teardown error, which is then only logged.
    pub async fn run<F, Fut, T>(name: impl Into<String>, body: F) -> Result<T>
    where
        F: FnOnce(TestScope) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let mut scope = Self::new(name);
        let outcome = tokio::spawn(body(scope.clone())).await;
        let teardown = scope.teardown().await;

        let result = match outcome {
            Ok(result) => result,
            Err(join) if join.is_panic() => {
                if let Err(e) = &teardown {
                    tracing::warn!(scope = %scope.name, error = %e, "teardown after panic failed");
                }
                std::panic::resume_unwind(join.into_panic());
            }
            Err(join) => Err(Error::Worker(format!("test body of {}: {}", scope.name, join))),
        };

        match (result, teardown) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(teardown)) => {
                tracing::warn!(scope = %scope.name, error = %teardown, "teardown after failure failed");
                Err(e)
            }
        }
    }

    /// Test name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A unique resource name attributed to this test.
    pub fn blame(&self, prefix: &str) -> String {
        blame(&self.name, prefix)
    }

    fn stack(&self) -> MutexGuard<'_, Vec<Finalizer>> {
        self.finalizers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a teardown action.
    pub fn add_finalizer<F, Fut>(&mut self, label: impl Into<String>, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.push(Finalizer::new(label, action));
    }

    /// Registers an already built finalizer.
    pub fn push(&mut self, finalizer: Finalizer) {
        tracing::debug!(scope = %self.name, finalizer = %finalizer.label(), "registered finalizer");
        self.stack().push(finalizer);
    }

    /// Takes ownership of finalizers produced by a concurrent batch.
    ///
    /// They are torn down together, concurrently on `pool`, as one step of
    /// this scope's teardown.
    pub fn adopt_orphans(&mut self, pool: &WorkerPool, orphans: Vec<Finalizer>) {
        if orphans.is_empty() {
            return;
        }
        let pool = pool.clone();
        let label = format!("{} orphan finalizers", orphans.len());
        self.add_finalizer(label, move || async move {
            gather_finalizers(&pool, orphans).await
        });
    }

    /// Finalizers not yet run.
    pub fn pending(&self) -> usize {
        self.stack().len()
    }

    /// Runs every finalizer, last registered first.
    pub async fn teardown(&mut self) -> Result<()> {
        let total = self.pending();
        tracing::info!(scope = %self.name, finalizers = total, "tearing down");

        let mut failures = Vec::new();
        loop {
            let next = self.stack().pop();
            let Some(finalizer) = next else { break };
            if let Err(failure) = finalizer.run_reporting().await {
                failures.push(failure);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            tracing::warn!(scope = %self.name, failed = failures.len(), total, "teardown incomplete");
            Err(Error::Teardown(failures))
        }
    }
}

impl Drop for TestScope {
    fn drop(&mut self) {
        if Arc::strong_count(&self.finalizers) > 1 {
            return;
        }
        let stack = self.stack();
        if !stack.is_empty() {
            let labels: Vec<&str> = stack.iter().map(Finalizer::label).collect();
            tracing::warn!(
                scope = %self.name,
                leaked = ?labels,
                "scope dropped without teardown; resources may be left behind"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn finalizers_run_in_reverse_order() {
        let log = recorder();
        let mut scope = TestScope::new("test_order");
        for name in ["certificate", "app", "service"] {
            let log = Arc::clone(&log);
            scope.add_finalizer(name, move || async move {
                log.lock().unwrap().push(name.to_string());
                Ok(())
            });
        }

        scope.teardown().await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["service", "app", "certificate"]);
        assert_eq!(scope.pending(), 0);
    }

    #[tokio::test]
    async fn failing_finalizer_does_not_skip_the_rest() {
        let log = recorder();
        let mut scope = TestScope::new("test_failures");
        for i in 0..5 {
            let log = Arc::clone(&log);
            scope.add_finalizer(format!("resource-{}", i), move || async move {
                log.lock().unwrap().push(format!("resource-{}", i));
                if i == 2 {
                    return Err(Error::Cluster("delete refused".to_string()));
                }
                Ok(())
            });
        }

        let err = scope.teardown().await.unwrap_err();

        assert_eq!(log.lock().unwrap().len(), 5);
        match err {
            Error::Teardown(failures) => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].contains("resource-2"));
                assert!(failures[0].contains("delete refused"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn teardown_twice_is_a_no_op() {
        let mut scope = TestScope::new("test_twice");
        scope.add_finalizer("noop", || async { Ok(()) });

        scope.teardown().await.unwrap();
        scope.teardown().await.unwrap();
    }

    #[tokio::test]
    async fn adopted_orphans_run_with_the_scope() {
        let log = recorder();
        let pool = WorkerPool::new(2);
        let orphans = (0..3)
            .map(|i| {
                let log = Arc::clone(&log);
                Finalizer::new(format!("svc-{}", i), move || async move {
                    log.lock().unwrap().push(format!("svc-{}", i));
                    Ok(())
                })
            })
            .collect();

        let mut scope = TestScope::new("test_pagination");
        scope.adopt_orphans(&pool, orphans);
        assert_eq!(scope.pending(), 1);

        scope.teardown().await.unwrap();

        let mut deleted = log.lock().unwrap().clone();
        deleted.sort();
        assert_eq!(deleted, vec!["svc-0", "svc-1", "svc-2"]);
    }

    #[tokio::test]
    async fn run_tears_down_after_a_panicking_body() {
        let log = recorder();
        let seen = Arc::clone(&log);

        let outcome = tokio::spawn(TestScope::run("test_panics", move |mut scope| async move {
            scope.add_finalizer("delete svc", move || async move {
                seen.lock().unwrap().push("delete svc".to_string());
                Ok(())
            });
            assert_eq!(1, 2, "body fails after creating a resource");
            Ok::<_, Error>(())
        }))
        .await;

        assert!(outcome.unwrap_err().is_panic());
        assert_eq!(*log.lock().unwrap(), vec!["delete svc"]);
    }

    #[tokio::test]
    async fn run_reports_the_body_error_after_teardown() {
        let log = recorder();
        let seen = Arc::clone(&log);

        let err = TestScope::run("test_errors", move |mut scope| async move {
            scope.add_finalizer("delete app", move || async move {
                seen.lock().unwrap().push("delete app".to_string());
                Ok(())
            });
            Err::<(), _>(Error::Cluster("app never became ready".to_string()))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Cluster(ref msg) if msg.contains("never became ready")));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn run_surfaces_teardown_failures_of_a_passing_body() {
        let value = TestScope::run("test_ok", |mut scope| async move {
            scope.add_finalizer("refused", || async {
                Err(Error::Cluster("still referenced".to_string()))
            });
            Ok::<_, Error>(7)
        })
        .await;

        match value {
            Err(Error::Teardown(failures)) => assert!(failures[0].starts_with("refused:")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn scope_blames_with_its_name() {
        let scope = TestScope::new("test_mtls");
        assert!(scope.blame("httpbin").starts_with("httpbin-test-mtls-"));
    }
}
