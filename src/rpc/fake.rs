//! Scripted backend used by the unit tests in this crate

use super::{
    AnkiActionResult, AnkiStatus, Connector, DeckList, OneWayCall, TranslatorBackend,
};
use crate::error::RpcError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub(crate) fn service_unknown() -> RpcError {
    RpcError::Remote {
        name: super::markers::SERVICE_UNKNOWN.to_string(),
        message: "The name com.translator.desktop was not provided by any .service files"
            .to_string(),
    }
}

pub(crate) fn access_denied() -> RpcError {
    RpcError::Remote {
        name: "org.freedesktop.DBus.Error.AccessDenied".to_string(),
        message: "Rejected".to_string(),
    }
}

pub(crate) struct FakeBackend {
    /// Results handed out to one-way calls in order; `Ok` once exhausted
    one_way_script: Mutex<VecDeque<Result<(), RpcError>>>,
    /// Result of every request/response call
    failure: Mutex<Option<RpcError>>,
    decks: Mutex<DeckList>,
    /// Every call issued, as "Method" or "Method(arg)"
    calls: Mutex<Vec<String>>,
    /// When set, request/response calls wait for a permit before answering
    gate: Option<Arc<Semaphore>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self {
            one_way_script: Mutex::new(VecDeque::new()),
            failure: Mutex::new(None),
            decks: Mutex::new(DeckList::default()),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub(crate) fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub(crate) fn script_one_way(&self, results: Vec<Result<(), RpcError>>) {
        self.one_way_script.lock().unwrap().extend(results);
    }

    pub(crate) fn fail_requests_with(&self, error: RpcError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub(crate) fn set_decks(&self, decks: DeckList) {
        *self.decks.lock().unwrap() = decks;
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn answer<T>(&self, value: T) -> Result<T, RpcError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        match self.failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(value),
        }
    }

    fn action(message: &str, deck_name: &str) -> AnkiActionResult {
        AnkiActionResult {
            message: message.to_string(),
            status: AnkiStatus {
                model_status: "Model ready".to_string(),
                deck_status: "Selected".to_string(),
                deck_name: deck_name.to_string(),
            },
        }
    }
}

#[async_trait::async_trait]
impl TranslatorBackend for FakeBackend {
    async fn call_one_way(&self, call: &OneWayCall) -> Result<(), RpcError> {
        match call {
            OneWayCall::Translate(text) => self.record(format!("Translate({})", text)),
            other => self.record(other.method().to_string()),
        }
        self.one_way_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn get_anki_status(&self) -> Result<AnkiStatus, RpcError> {
        self.record("GetAnkiStatus".to_string());
        self.answer(Self::action("", "Default").status).await
    }

    async fn create_anki_model(&self) -> Result<AnkiActionResult, RpcError> {
        self.record("CreateAnkiModel".to_string());
        self.answer(Self::action("Model created.", "Default")).await
    }

    async fn list_anki_decks(&self) -> Result<DeckList, RpcError> {
        self.record("ListAnkiDecks".to_string());
        let decks = self.decks.lock().unwrap().clone();
        self.answer(decks).await
    }

    async fn select_anki_deck(&self, deck: &str) -> Result<AnkiActionResult, RpcError> {
        self.record(format!("SelectAnkiDeck({})", deck));
        self.answer(Self::action("Deck selected.", deck)).await
    }

    async fn save_settings(&self) -> Result<AnkiActionResult, RpcError> {
        self.record("SaveSettings".to_string());
        self.answer(Self::action("Settings saved.", "Default")).await
    }
}

pub(crate) struct FakeConnector {
    pub(crate) backend: Arc<FakeBackend>,
    pub(crate) available: AtomicBool,
    pub(crate) connects: AtomicUsize,
}

impl FakeConnector {
    pub(crate) fn new(backend: Arc<FakeBackend>) -> Self {
        Self {
            backend,
            available: AtomicBool::new(true),
            connects: AtomicUsize::new(0),
        }
    }

    pub(crate) fn unavailable(backend: Arc<FakeBackend>) -> Self {
        let connector = Self::new(backend);
        connector.available.store(false, Ordering::SeqCst);
        connector
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Connector for FakeConnector {
    async fn connect(&self) -> Result<Arc<dyn TranslatorBackend>, RpcError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.available.load(Ordering::SeqCst) {
            Ok(self.backend.clone())
        } else {
            Err(RpcError::Unavailable("session bus down".to_string()))
        }
    }
}
