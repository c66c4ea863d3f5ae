//! Registry of in-flight request/response calls
//!
//! Every call issued by the settings surface is tracked here with a
//! cancellation token so closing the surface can abort all of them at once.
//! A call's handle leaves the set before its callback runs, and a cancelled
//! call never runs a callback at all.

use super::{ConnectionManager, Failure, TranslatorBackend};
use crate::error::RpcError;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Error callback for a single tracked call
pub type ErrorHandler = Box<dyn FnOnce(RpcError) + Send + 'static>;

type DefaultErrorHandler = Arc<dyn Fn(RpcError) + Send + Sync + 'static>;

struct RegistryInner {
    connections: Arc<ConnectionManager>,
    calls: Mutex<HashMap<u64, CancellationToken>>,
    next_id: AtomicU64,
    idle: Notify,
    default_error: DefaultErrorHandler,
}

impl RegistryInner {
    fn lock_calls(&self) -> std::sync::MutexGuard<'_, HashMap<u64, CancellationToken>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Remove a finished call; false when cancellation already removed it
    fn release(&self, id: u64) -> bool {
        let mut calls = self.lock_calls();
        let removed = calls.remove(&id).is_some();
        if calls.is_empty() {
            self.idle.notify_waiters();
        }
        removed
    }
}

/// Tracks cancellable backend calls for one settings surface
#[derive(Clone)]
pub struct CallRegistry {
    inner: Arc<RegistryInner>,
}

impl CallRegistry {
    /// Create a registry; `default_error` handles failures of calls issued
    /// without their own error callback
    pub fn new<F>(connections: Arc<ConnectionManager>, default_error: F) -> Self
    where
        F: Fn(RpcError) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(RegistryInner {
                connections,
                calls: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                idle: Notify::new(),
                default_error: Arc::new(default_error),
            }),
        }
    }

    /// Issue one tracked call. Returns immediately; exactly one of the
    /// callbacks runs on completion unless the call is cancelled first.
    pub fn invoke<T, F, Fut, S>(&self, op: F, on_success: S, on_error: Option<ErrorHandler>)
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn TranslatorBackend>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, RpcError>> + Send + 'static,
        S: FnOnce(T) + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let token = CancellationToken::new();
        self.inner.lock_calls().insert(id, token.clone());

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let connections = inner.connections.clone();
            let call = async move {
                let backend = connections.get_connection().await.ok_or_else(|| {
                    RpcError::Unavailable("translator backend is not reachable".to_string())
                })?;
                let result = op(backend).await;
                if let Err(ref e) = result {
                    if connections.classify(e) == Failure::Retryable {
                        connections.invalidate().await;
                    }
                }
                result
            };

            let result = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::trace!("Tracked call {} cancelled", id);
                    return;
                }
                result = call => result,
            };

            if !inner.release(id) {
                return;
            }

            match result {
                Ok(value) => on_success(value),
                Err(e) => {
                    tracing::debug!("Tracked call {} failed: {}", id, e);
                    match on_error {
                        Some(handler) => handler(e),
                        None => (inner.default_error)(e),
                    }
                }
            }
        });
    }

    /// Cancel every tracked call; the set is empty when this returns
    pub fn cancel_all(&self) {
        let drained: Vec<CancellationToken> = {
            let mut calls = self.inner.lock_calls();
            calls.drain().map(|(_, token)| token).collect()
        };
        if !drained.is_empty() {
            tracing::debug!("Cancelling {} tracked call(s)", drained.len());
        }
        for token in drained {
            token.cancel();
        }
        self.inner.idle.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.inner.lock_calls().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until no tracked call is in flight
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.is_empty() {
                return;
            }
            notified.await;
        }
    }
}
