//! Bounded retry delivery for one-way backend calls
//!
//! Used by the hotkey path. Delivery is best effort: when the backend never
//! shows up within the attempt budget the call is dropped without telling
//! the user, since pressing the hotkey again starts a fresh delivery.

use super::{ConnectionManager, Failure, OneWayCall};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 200;

/// Attempt budget for one logical call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

/// How a delivery ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The transport completed the call
    Delivered { attempts: u32 },
    /// The attempt budget ran out before the backend became reachable
    Dropped { attempts: u32 },
    /// The backend was reached but the call failed for good
    Rejected { attempts: u32 },
}

/// State of one logical call while it is being retried
#[derive(Debug)]
struct RetryAttempt<'a> {
    call: &'a OneWayCall,
    attempt: u32,
    policy: RetryPolicy,
}

impl<'a> RetryAttempt<'a> {
    fn new(call: &'a OneWayCall, policy: RetryPolicy) -> Self {
        Self {
            call,
            attempt: 0,
            policy,
        }
    }

    /// Consume an attempt; returns false once the budget is spent
    fn begin(&mut self) -> bool {
        if self.attempt >= self.policy.max_attempts {
            return false;
        }
        self.attempt += 1;
        true
    }
}

/// Delivers one-way calls through the connection manager
#[derive(Clone)]
pub struct RetryScheduler {
    connections: Arc<ConnectionManager>,
    policy: RetryPolicy,
}

impl RetryScheduler {
    pub fn new(connections: Arc<ConnectionManager>, policy: RetryPolicy) -> Self {
        Self {
            connections,
            policy,
        }
    }

    /// Deliver `call` in the background. No handle is returned; the attempt
    /// budget bounds the work.
    pub fn dispatch(&self, call: OneWayCall) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let outcome = scheduler.deliver(call).await;
            tracing::trace!("One-way delivery finished: {:?}", outcome);
        });
    }

    /// Deliver `call`, retrying while the backend is not ready
    pub async fn deliver(&self, call: OneWayCall) -> DispatchOutcome {
        let mut attempt = RetryAttempt::new(&call, self.policy);

        while attempt.begin() {
            if attempt.attempt > 1 {
                tokio::time::sleep(attempt.policy.delay).await;
            }

            let Some(backend) = self.connections.get_connection().await else {
                tracing::debug!(
                    "{}: backend not reachable (attempt {}/{})",
                    attempt.call.method(),
                    attempt.attempt,
                    attempt.policy.max_attempts
                );
                continue;
            };

            match backend.call_one_way(attempt.call).await {
                Ok(()) => {
                    tracing::debug!(
                        "{} delivered (attempt {})",
                        attempt.call.method(),
                        attempt.attempt
                    );
                    return DispatchOutcome::Delivered {
                        attempts: attempt.attempt,
                    };
                }
                Err(e) => match self.connections.classify(&e) {
                    Failure::Retryable => {
                        tracing::debug!(
                            "{}: backend not ready yet: {} (attempt {}/{})",
                            attempt.call.method(),
                            e,
                            attempt.attempt,
                            attempt.policy.max_attempts
                        );
                        self.connections.invalidate().await;
                    }
                    Failure::Fatal => {
                        tracing::debug!("{} failed: {}", attempt.call.method(), e);
                        return DispatchOutcome::Rejected {
                            attempts: attempt.attempt,
                        };
                    }
                },
            }
        }

        tracing::debug!(
            "{} dropped after {} attempts",
            call.method(),
            attempt.attempt
        );
        DispatchOutcome::Dropped {
            attempts: attempt.attempt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::fake::{access_denied, service_unknown, FakeBackend, FakeConnector};
    use std::sync::atomic::Ordering;
    use tokio::time::Instant;

    fn scheduler(connector: Arc<FakeConnector>) -> RetryScheduler {
        RetryScheduler::new(
            Arc::new(ConnectionManager::new(connector)),
            RetryPolicy::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivers_on_first_attempt() {
        let backend = Arc::new(FakeBackend::new());
        let scheduler = scheduler(Arc::new(FakeConnector::new(backend.clone())));

        let outcome = scheduler
            .deliver(OneWayCall::Translate("hello".into()))
            .await;

        assert_eq!(outcome, DispatchOutcome::Delivered { attempts: 1 });
        assert_eq!(backend.calls(), vec!["Translate(hello)"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_backend_is_dropped_silently() {
        let backend = Arc::new(FakeBackend::new());
        let connector = Arc::new(FakeConnector::unavailable(backend.clone()));
        let scheduler = scheduler(connector.clone());
        let started = Instant::now();

        let outcome = scheduler
            .deliver(OneWayCall::Translate("hello".into()))
            .await;

        assert_eq!(outcome, DispatchOutcome::Dropped { attempts: 10 });
        assert!(backend.calls().is_empty());
        assert_eq!(connector.connects(), 10);
        // nine gaps of 200ms between ten attempts
        assert_eq!(started.elapsed(), Duration::from_millis(1800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_unknown_reconnects_and_retries() {
        let backend = Arc::new(FakeBackend::new());
        backend.script_one_way(vec![Err(service_unknown()), Err(service_unknown())]);
        let connector = Arc::new(FakeConnector::new(backend.clone()));
        let scheduler = scheduler(connector.clone());

        let outcome = scheduler.deliver(OneWayCall::ShowHistory).await;

        assert_eq!(outcome, DispatchOutcome::Delivered { attempts: 3 });
        assert_eq!(backend.calls().len(), 3);
        assert_eq!(connector.connects(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_failure_stops_retrying() {
        let backend = Arc::new(FakeBackend::new());
        backend.script_one_way(vec![Err(service_unknown()), Err(access_denied())]);
        let scheduler = scheduler(Arc::new(FakeConnector::new(backend.clone())));

        let outcome = scheduler
            .deliver(OneWayCall::Translate("hello".into()))
            .await;

        assert_eq!(outcome, DispatchOutcome::Rejected { attempts: 2 });
        assert_eq!(backend.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_appearing_late_is_reached() {
        let backend = Arc::new(FakeBackend::new());
        let connector = Arc::new(FakeConnector::unavailable(backend.clone()));
        let scheduler = scheduler(connector.clone());

        let task = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.deliver(OneWayCall::Translate("late".into())).await }
        });

        tokio::time::sleep(Duration::from_millis(500)).await;
        connector.available.store(true, Ordering::SeqCst);

        let outcome = task.await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::Delivered { attempts } if attempts > 1));
        assert_eq!(backend.calls(), vec!["Translate(late)"]);
    }
}
