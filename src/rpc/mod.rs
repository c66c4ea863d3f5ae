//! Backend RPC module
//!
//! Everything that talks to the translator backend goes through here:
//! - [`ConnectionManager`] owns the lazily-built backend handle
//! - [`RetryScheduler`] delivers one-way calls with bounded retries
//! - [`CallRegistry`] tracks cancellable request/response calls
//!
//! The backend itself is reached through the [`TranslatorBackend`] trait;
//! the D-Bus implementation lives in [`dbus`].

pub mod connection;
pub mod dbus;
pub mod registry;
pub mod retry;

#[cfg(test)]
pub(crate) mod fake;

pub use connection::ConnectionManager;
pub use registry::{CallRegistry, ErrorHandler};
pub use retry::{DispatchOutcome, RetryPolicy, RetryScheduler};

use crate::error::RpcError;
use std::sync::Arc;

/// Well-known D-Bus error names meaning "the backend is not registered yet"
pub mod markers {
    pub const SERVICE_UNKNOWN: &str = "org.freedesktop.DBus.Error.ServiceUnknown";
    pub const UNKNOWN_OBJECT: &str = "org.freedesktop.DBus.Error.UnknownObject";
    pub const UNKNOWN_METHOD: &str = "org.freedesktop.DBus.Error.UnknownMethod";

    /// Short forms matched as substrings of unstructured error names
    pub(crate) const SERVICE_NOT_READY: &[&str] =
        &["ServiceUnknown", "UnknownObject", "UnknownMethod"];
}

/// How a failed call should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// The backend is not reachable yet; reconnecting and retrying may help
    Retryable,
    /// Communication worked but the call failed; do not retry
    Fatal,
}

/// Classify a backend error as retryable or fatal
pub fn classify(error: &RpcError) -> Failure {
    match error {
        RpcError::Unavailable(_) => Failure::Retryable,
        RpcError::Remote { name, .. } => {
            if markers::SERVICE_NOT_READY
                .iter()
                .any(|marker| name.contains(marker))
            {
                Failure::Retryable
            } else {
                Failure::Fatal
            }
        }
        RpcError::Transport(_) => Failure::Fatal,
    }
}

/// Fire-and-forget backend methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneWayCall {
    /// Translate the given text and show the result
    Translate(String),
    /// Open the backend's history window
    ShowHistory,
    /// Open the backend's settings window
    ShowSettings,
}

impl OneWayCall {
    /// D-Bus method name of this call
    pub fn method(&self) -> &'static str {
        match self {
            OneWayCall::Translate(_) => "Translate",
            OneWayCall::ShowHistory => "ShowHistory",
            OneWayCall::ShowSettings => "ShowSettings",
        }
    }
}

/// Anki model/deck status as reported by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnkiStatus {
    pub model_status: String,
    pub deck_status: String,
    pub deck_name: String,
}

impl From<(String, String, String)> for AnkiStatus {
    fn from((model_status, deck_status, deck_name): (String, String, String)) -> Self {
        Self {
            model_status,
            deck_status,
            deck_name,
        }
    }
}

/// Result of an Anki settings action: a user-facing message plus the new status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnkiActionResult {
    pub message: String,
    pub status: AnkiStatus,
}

impl From<(String, String, String, String)> for AnkiActionResult {
    fn from(
        (message, model_status, deck_status, deck_name): (String, String, String, String),
    ) -> Self {
        Self {
            message,
            status: AnkiStatus {
                model_status,
                deck_status,
                deck_name,
            },
        }
    }
}

/// Deck listing; an empty error string from the backend means success
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeckList {
    pub decks: Vec<String>,
    pub error: Option<String>,
}

impl From<(Vec<String>, String)> for DeckList {
    fn from((decks, error): (Vec<String>, String)) -> Self {
        Self {
            decks,
            error: if error.is_empty() { None } else { Some(error) },
        }
    }
}

/// Trait for the remote translator service
#[async_trait::async_trait]
pub trait TranslatorBackend: Send + Sync {
    /// Issue a one-way call; resolves once the transport has completed
    async fn call_one_way(&self, call: &OneWayCall) -> Result<(), RpcError>;

    async fn get_anki_status(&self) -> Result<AnkiStatus, RpcError>;

    async fn create_anki_model(&self) -> Result<AnkiActionResult, RpcError>;

    async fn list_anki_decks(&self) -> Result<DeckList, RpcError>;

    async fn select_anki_deck(&self, deck: &str) -> Result<AnkiActionResult, RpcError>;

    async fn save_settings(&self) -> Result<AnkiActionResult, RpcError>;
}

/// Trait for building backend handles
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn TranslatorBackend>, RpcError>;
}
