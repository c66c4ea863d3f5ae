//! Lazily-established backend connection
//!
//! The handle is built on first use and dropped whenever a call fails
//! with a connection-level error, so a restarted backend is picked up
//! on the next attempt.

use super::{classify, Connector, Failure, TranslatorBackend};
use crate::error::RpcError;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Owns the single backend handle
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    handle: Mutex<Option<Arc<dyn TranslatorBackend>>>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            handle: Mutex::new(None),
        }
    }

    /// Return the cached handle, building it first if needed.
    ///
    /// Construction failures yield `None`; reporting them is up to the caller.
    pub async fn get_connection(&self) -> Option<Arc<dyn TranslatorBackend>> {
        let mut handle = self.handle.lock().await;
        if let Some(existing) = handle.as_ref() {
            return Some(existing.clone());
        }

        match self.connector.connect().await {
            Ok(backend) => {
                *handle = Some(backend.clone());
                Some(backend)
            }
            Err(e) => {
                tracing::debug!("Backend connection not available: {}", e);
                None
            }
        }
    }

    /// Drop the cached handle so the next call reconnects
    pub async fn invalidate(&self) {
        if self.handle.lock().await.take().is_some() {
            tracing::debug!("Backend connection invalidated");
        }
    }

    /// Whether a handle is currently cached
    pub async fn is_connected(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    pub fn classify(&self, error: &RpcError) -> Failure {
        classify(error)
    }
}
