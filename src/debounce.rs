//! Debouncing of hotkey captures
//!
//! The first capture arms a timer; captures arriving while it runs only
//! replace the pending text. When the timer fires the latest text is
//! emitted once. A running timer is never pushed back, so a burst of
//! presses costs at most one quiet period of latency.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_QUIET_PERIOD_MS: u64 = 80;

/// Single-slot holder for the newest candidate
#[derive(Debug, Default)]
pub struct PendingSlot {
    slot: Mutex<Option<String>>,
}

impl PendingSlot {
    /// Store `candidate`, replacing whatever was pending
    pub fn put(&self, candidate: String) {
        *self.lock() = Some(candidate);
    }

    /// Take the pending candidate and leave the slot empty
    pub fn take(&self) -> Option<String> {
        self.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct DebounceInner {
    quiet_period: Duration,
    pending: PendingSlot,
    /// Armed timer, if any
    timer: Mutex<Option<JoinHandle<()>>>,
    emit: mpsc::UnboundedSender<String>,
}

impl DebounceInner {
    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fire(&self) {
        let candidate = {
            let mut timer = self.lock_timer();
            *timer = None;
            self.pending.take()
        };

        match candidate {
            Some(text) => {
                if self.emit.send(text).is_err() {
                    tracing::debug!("Debounce receiver closed, dropping capture");
                }
            }
            None => tracing::trace!("Debounce timer fired with nothing pending"),
        }
    }
}

/// Coalesces bursts of captures into one delayed emission
#[derive(Clone)]
pub struct Debouncer {
    inner: Arc<DebounceInner>,
}

impl Debouncer {
    pub fn new(quiet_period: Duration, emit: mpsc::UnboundedSender<String>) -> Self {
        Self {
            inner: Arc::new(DebounceInner {
                quiet_period,
                pending: PendingSlot::default(),
                timer: Mutex::new(None),
                emit,
            }),
        }
    }

    /// Create a debouncer together with the receiver of its emissions
    pub fn channel(quiet_period: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(quiet_period, tx), rx)
    }

    /// Record a candidate and arm the timer if it is not already running
    pub fn notify(&self, candidate: String) {
        let mut timer = self.inner.lock_timer();
        self.inner.pending.put(candidate);

        if timer.is_some() {
            return;
        }

        let inner = self.inner.clone();
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.quiet_period).await;
            inner.fire();
        }));
    }

    /// Disarm the timer and discard the pending candidate
    pub fn cancel(&self) {
        let mut timer = self.inner.lock_timer();
        if let Some(handle) = timer.take() {
            handle.abort();
        }
        self.inner.pending.take();
    }

    pub fn is_armed(&self) -> bool {
        self.inner.lock_timer().is_some()
    }
}
