//! Bounded waiting with exponential backoff.
//!
//! Every wait in the kit (widget visibility, navigation hops, URL changes,
//! deployment readiness) goes through [`poll_until`], so a slow or broken
//! environment surfaces as [`Error::Timeout`] instead of a hang.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Error, Result};

/// Exponential backoff with configurable min/max.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl ExponentialBackoff {
    /// Creates a new backoff starting at `initial`, capping at `max`.
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Returns the current backoff duration.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Advances to the next interval (doubles, capped at max).
    pub fn next(&mut self) {
        self.current = (self.current * 2).min(self.max);
    }

    /// Resets backoff to the initial value.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Limits for a single bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Give up after this long.
    pub timeout: Duration,
    /// First polling interval.
    pub initial_poll: Duration,
    /// Polling interval cap.
    pub max_poll: Duration,
}

impl WaitConfig {
    /// Creates a wait bounded by `timeout` with default polling intervals.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            initial_poll: Duration::from_millis(50),
            max_poll: Duration::from_millis(500),
        }
    }
}

/// Polls `probe` until it returns true or the wait expires.
///
/// `what` names the awaited condition in the timeout error.
pub async fn poll_until<F, Fut>(config: &WaitConfig, what: &str, mut probe: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + config.timeout;
    let mut backoff = ExponentialBackoff::new(config.initial_poll, config.max_poll);

    loop {
        if probe().await {
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::debug!(condition = %what, timeout = ?config.timeout, "wait expired");
            return Err(Error::Timeout(config.timeout, what.to_string()));
        }

        tokio::time::sleep(backoff.current().min(deadline - now)).await;
        backoff.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn backoff_doubles_and_caps() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(50), Duration::from_millis(150));
        backoff.next();
        assert_eq!(backoff.current(), Duration::from_millis(100));
        backoff.next();
        assert_eq!(backoff.current(), Duration::from_millis(150));
        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_millis(50));
    }

    #[tokio::test]
    async fn poll_returns_once_condition_holds() {
        let calls = AtomicUsize::new(0);
        let config = WaitConfig {
            timeout: Duration::from_secs(2),
            initial_poll: Duration::from_millis(1),
            max_poll: Duration::from_millis(2),
        };

        let counter = &calls;
        poll_until(&config, "third probe", || async move {
            counter.fetch_add(1, Ordering::SeqCst) >= 2
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn poll_times_out_with_condition_name() {
        let config = WaitConfig {
            timeout: Duration::from_millis(20),
            initial_poll: Duration::from_millis(5),
            max_poll: Duration::from_millis(5),
        };

        let err = poll_until(&config, "never", || async { false })
            .await
            .unwrap_err();

        match err {
            Error::Timeout(timeout, what) => {
                assert_eq!(timeout, Duration::from_millis(20));
                assert_eq!(what, "never");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
