use crate::domain::model::PageResponse;
use crate::utils::error::{HarvestError, Result};
use chrono::{DateTime, Local};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Delay inserted after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// Doubles per attempt, never exceeding `cap`.
    Exponential { initial: Duration, cap: Duration },
}

impl Backoff {
    /// Delay after the `attempt`-th failure (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(wait) => wait,
            Backoff::Exponential { initial, cap } => {
                let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                initial.checked_mul(factor).unwrap_or(cap).min(cap)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success { status: u16 },
    /// Well-formed response that yielded nothing usable.
    Empty { status: u16 },
    Status { status: u16 },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub struct AttemptReport {
    pub at: DateTime<Local>,
    pub context: String,
    pub attempt: u32,
    pub max_attempts: u32,
    pub outcome: AttemptOutcome,
}

pub trait AttemptObserver: Send + Sync {
    fn on_attempt(&self, report: &AttemptReport);
}

/// Writes every attempt to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl AttemptObserver for TracingObserver {
    fn on_attempt(&self, report: &AttemptReport) {
        let time = report.at.format("%H:%M:%S");
        match &report.outcome {
            AttemptOutcome::Success { status } => tracing::debug!(
                "time: {}, {}, attempt: {}/{}, response: {}",
                time,
                report.context,
                report.attempt,
                report.max_attempts,
                status
            ),
            AttemptOutcome::Empty { status } => tracing::warn!(
                "time: {}, {}, attempt: {}/{}, response: {}, message: \"Server response ok but no records retrieved\"",
                time,
                report.context,
                report.attempt,
                report.max_attempts,
                status
            ),
            AttemptOutcome::Status { status } => tracing::warn!(
                "time: {}, {}, attempt: {}/{}, response: {}, message: \"Server not responding with appropriate data\"",
                time,
                report.context,
                report.attempt,
                report.max_attempts,
                status
            ),
            AttemptOutcome::Error { message } => tracing::warn!(
                "time: {}, {}, attempt: {}/{}, error: {}",
                time,
                report.context,
                report.attempt,
                report.max_attempts,
                message
            ),
        }
    }
}

/// Bounded retry with backoff. Every call to [`RetryPolicy::execute`] starts its own counter.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
    observer: Arc<dyn AttemptObserver>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn fixed(max_attempts: u32, wait: Duration) -> Self {
        Self::new(max_attempts, Backoff::Fixed(wait))
    }

    pub fn exponential(max_attempts: u32, initial: Duration, cap: Duration) -> Self {
        Self::new(max_attempts, Backoff::Exponential { initial, cap })
    }

    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    pub fn report(&self, context: &str, attempt: u32, outcome: AttemptOutcome) {
        self.observer.on_attempt(&AttemptReport {
            at: Local::now(),
            context: context.to_string(),
            attempt,
            max_attempts: self.max_attempts,
            outcome,
        });
    }

    /// Sleeps for the backoff that follows the `attempt`-th failure.
    pub async fn wait(&self, attempt: u32) {
        let delay = self.backoff.delay(attempt);
        if !delay.is_zero() {
            tracing::debug!("Waiting {:?} before trying again", delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// Runs `op` until it yields a success status or `max_attempts` is reached.
    pub async fn execute<F, Fut>(&self, context: &str, mut op: F) -> Result<PageResponse>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<PageResponse>> + Send,
    {
        let mut attempt = 1;
        loop {
            let reason = match op().await {
                Ok(response) if response.is_success() => {
                    self.report(
                        context,
                        attempt,
                        AttemptOutcome::Success {
                            status: response.status,
                        },
                    );
                    return Ok(response);
                }
                Ok(response) => {
                    self.report(
                        context,
                        attempt,
                        AttemptOutcome::Status {
                            status: response.status,
                        },
                    );
                    if response.is_gone() {
                        return Err(HarvestError::PageGone {
                            context: context.to_string(),
                            status: response.status,
                        });
                    }
                    format!("last status {}", response.status)
                }
                Err(e) => {
                    let message = e.to_string();
                    self.report(
                        context,
                        attempt,
                        AttemptOutcome::Error {
                            message: message.clone(),
                        },
                    );
                    message
                }
            };

            if attempt >= self.max_attempts {
                return Err(HarvestError::RetriesExhausted {
                    context: context.to_string(),
                    attempts: attempt,
                    reason,
                });
            }
            self.wait(attempt).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct RecordingObserver {
        pub reports: Mutex<Vec<AttemptReport>>,
    }

    impl AttemptObserver for RecordingObserver {
        fn on_attempt(&self, report: &AttemptReport) {
            self.reports.lock().unwrap().push(report.clone());
        }
    }

    #[test]
    fn test_fixed_backoff_is_constant() {
        let backoff = Backoff::Fixed(Duration::from_secs(120));
        assert_eq!(backoff.delay(1), Duration::from_secs(120));
        assert_eq!(backoff.delay(7), Duration::from_secs(120));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_secs(2),
            cap: Duration::from_secs(10),
        };
        assert_eq!(backoff.delay(1), Duration::from_secs(2));
        assert_eq!(backoff.delay(2), Duration::from_secs(4));
        assert_eq!(backoff.delay(3), Duration::from_secs(8));
        assert_eq!(backoff.delay(4), Duration::from_secs(10));
        assert_eq!(backoff.delay(64), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_execute_retries_until_success() {
        let observer = Arc::new(RecordingObserver::default());
        let policy = RetryPolicy::fixed(5, Duration::ZERO).with_observer(observer.clone());
        let calls = AtomicU32::new(0);

        let response = policy
            .execute("detail", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Ok::<_, HarvestError>(PageResponse::new(503, ""))
                    } else {
                        Ok(PageResponse::new(200, "ok"))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(response.body, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let reports = observer.reports.lock().unwrap();
        let attempts: Vec<u32> = reports.iter().map(|r| r.attempt).collect();
        assert_eq!(attempts, vec![1, 2, 3]);
        assert_eq!(reports[2].outcome, AttemptOutcome::Success { status: 200 });
    }

    #[tokio::test]
    async fn test_execute_gives_up_after_max_attempts() {
        let policy = RetryPolicy::fixed(3, Duration::ZERO);
        let calls = AtomicU32::new(0);

        let result = policy
            .execute("detail", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<PageResponse, _>(HarvestError::ProcessingError {
                        message: "connection reset".to_string(),
                    })
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(HarvestError::RetriesExhausted {
                attempts, reason, ..
            }) => {
                assert_eq!(attempts, 3);
                assert!(reason.contains("connection reset"));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_stops_at_once_on_missing_page() {
        let policy = RetryPolicy::fixed(5, Duration::ZERO);
        let calls = AtomicU32::new(0);

        let result = policy
            .execute("detail", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, HarvestError>(PageResponse::new(404, "")) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(HarvestError::PageGone { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_each_execute_starts_fresh_counter() {
        let policy = RetryPolicy::fixed(2, Duration::ZERO);
        for _ in 0..2 {
            let calls = AtomicU32::new(0);
            let result = policy
                .execute("search", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, HarvestError>(PageResponse::new(500, "")) }
                })
                .await;
            assert!(result.is_err());
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }
    }
}
