//! Anki settings panel
//!
//! Relays the settings actions to the backend and renders the answers
//! through a [`StatusView`]. Every action is a tracked call, so closing the
//! panel aborts whatever is still in flight and no late answer reaches a
//! view that is gone.

use crate::rpc::{AnkiActionResult, AnkiStatus, CallRegistry, ConnectionManager};
use crate::style::{self, paint, Tone};
use std::sync::Arc;

/// Shown when a tracked call fails and no specific handler was supplied
pub const TRANSIENT_FAILURE_MESSAGE: &str =
    "The translator is not responding right now. Please try again in a moment.";

/// Shown when Anki reports no decks at all
pub const NO_DECKS_MESSAGE: &str = "No decks found. Create a deck in Anki first.";

/// Where the panel renders results
pub trait StatusView: Send + Sync {
    /// A one-line user-facing message
    fn show_message(&self, message: &str);

    /// Current model and deck state
    fn show_status(&self, status: &AnkiStatus);

    /// Decks the user can pick from; never called with an empty list
    fn show_decks(&self, decks: &[String]);
}

/// One open settings surface
pub struct SettingsPanel {
    registry: CallRegistry,
    view: Arc<dyn StatusView>,
}

impl SettingsPanel {
    pub fn open(connections: Arc<ConnectionManager>, view: Arc<dyn StatusView>) -> Self {
        style::ensure_panel_style();

        let fallback = view.clone();
        let registry = CallRegistry::new(connections, move |e| {
            tracing::debug!("Settings call failed: {}", e);
            fallback.show_message(TRANSIENT_FAILURE_MESSAGE);
        });

        Self { registry, view }
    }

    /// Fetch and show the model/deck status
    pub fn refresh_status(&self) {
        let view = self.view.clone();
        self.registry.invoke(
            |backend| async move { backend.get_anki_status().await },
            move |status| view.show_status(&status),
            None,
        );
    }

    /// Ask the backend to create the note model
    pub fn create_model(&self) {
        let view = self.view.clone();
        self.registry.invoke(
            |backend| async move { backend.create_anki_model().await },
            move |result| show_action(view.as_ref(), &result),
            None,
        );
    }

    /// List decks; an empty list shows a message instead of a picker
    pub fn list_decks(&self) {
        let view = self.view.clone();
        self.registry.invoke(
            |backend| async move { backend.list_anki_decks().await },
            move |list| {
                if let Some(error) = list.error {
                    view.show_message(&error);
                } else if list.decks.is_empty() {
                    view.show_message(NO_DECKS_MESSAGE);
                } else {
                    view.show_decks(&list.decks);
                }
            },
            None,
        );
    }

    pub fn select_deck(&self, deck: &str) {
        let deck = deck.to_string();
        let view = self.view.clone();
        self.registry.invoke(
            move |backend| async move { backend.select_anki_deck(&deck).await },
            move |result| show_action(view.as_ref(), &result),
            None,
        );
    }

    pub fn save_settings(&self) {
        let view = self.view.clone();
        self.registry.invoke(
            |backend| async move { backend.save_settings().await },
            move |result| show_action(view.as_ref(), &result),
            None,
        );
    }

    /// Abort every call still in flight
    pub fn close(&self) {
        self.registry.cancel_all();
    }

    pub fn registry(&self) -> &CallRegistry {
        &self.registry
    }
}

impl Drop for SettingsPanel {
    fn drop(&mut self) {
        self.close();
    }
}

fn show_action(view: &dyn StatusView, result: &AnkiActionResult) {
    if !result.message.is_empty() {
        view.show_message(&result.message);
    }
    view.show_status(&result.status);
}

/// Prints panel output to stdout
#[derive(Debug, Default)]
pub struct ConsoleView;

impl StatusView for ConsoleView {
    fn show_message(&self, message: &str) {
        println!("{}", message);
    }

    fn show_status(&self, status: &AnkiStatus) {
        println!("{}", paint("Anki", Tone::Heading));
        println!("  Model: {}", status.model_status);
        println!("  Deck:  {}", status.deck_status);
        if status.deck_name.is_empty() {
            println!("  Name:  {}", paint("(none)", Tone::Muted));
        } else {
            println!("  Name:  {}", paint(&status.deck_name, Tone::Good));
        }
    }

    fn show_decks(&self, decks: &[String]) {
        println!("{}", paint("Decks", Tone::Heading));
        for (index, deck) in decks.iter().enumerate() {
            println!("  {:>2}. {}", index + 1, deck);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::fake::{access_denied, FakeBackend, FakeConnector};
    use crate::rpc::DeckList;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Shown {
        Message(String),
        Status(String),
        Decks(Vec<String>),
    }

    #[derive(Default)]
    struct RecordingView {
        shown: Mutex<Vec<Shown>>,
    }

    impl RecordingView {
        fn shown(&self) -> Vec<Shown> {
            self.shown.lock().unwrap().clone()
        }
    }

    impl StatusView for RecordingView {
        fn show_message(&self, message: &str) {
            self.shown
                .lock()
                .unwrap()
                .push(Shown::Message(message.to_string()));
        }

        fn show_status(&self, status: &AnkiStatus) {
            self.shown
                .lock()
                .unwrap()
                .push(Shown::Status(status.deck_name.clone()));
        }

        fn show_decks(&self, decks: &[String]) {
            self.shown.lock().unwrap().push(Shown::Decks(decks.to_vec()));
        }
    }

    fn panel(backend: Arc<FakeBackend>) -> (SettingsPanel, Arc<RecordingView>) {
        let connections = Arc::new(ConnectionManager::new(Arc::new(FakeConnector::new(
            backend,
        ))));
        let view = Arc::new(RecordingView::default());
        (SettingsPanel::open(connections, view.clone()), view)
    }

    fn decks(names: &[&str]) -> DeckList {
        DeckList {
            decks: names.iter().map(|s| s.to_string()).collect(),
            error: None,
        }
    }

    #[tokio::test]
    async fn test_deck_listing_then_selection() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_decks(decks(&["Deck A", "Deck B"]));
        let (panel, view) = panel(backend.clone());

        panel.list_decks();
        panel.registry().wait_idle().await;
        assert_eq!(
            view.shown(),
            vec![Shown::Decks(vec!["Deck A".into(), "Deck B".into()])]
        );

        panel.select_deck("Deck B");
        panel.registry().wait_idle().await;
        assert_eq!(
            backend.calls(),
            vec!["ListAnkiDecks", "SelectAnkiDeck(Deck B)"]
        );
        assert_eq!(
            view.shown()[1..],
            [
                Shown::Message("Deck selected.".into()),
                Shown::Status("Deck B".into())
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_deck_list_shows_message() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_decks(decks(&[]));
        let (panel, view) = panel(backend.clone());

        panel.list_decks();
        panel.registry().wait_idle().await;

        assert_eq!(view.shown(), vec![Shown::Message(NO_DECKS_MESSAGE.into())]);
        assert_eq!(backend.calls(), vec!["ListAnkiDecks"]);
    }

    #[tokio::test]
    async fn test_deck_list_error_is_shown() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_decks(DeckList {
            decks: Vec::new(),
            error: Some("Anki is not running".into()),
        });
        let (panel, view) = panel(backend);

        panel.list_decks();
        panel.registry().wait_idle().await;

        assert_eq!(
            view.shown(),
            vec![Shown::Message("Anki is not running".into())]
        );
    }

    #[tokio::test]
    async fn test_failed_call_shows_transient_message_once() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail_requests_with(access_denied());
        let (panel, view) = panel(backend);

        panel.save_settings();
        panel.registry().wait_idle().await;

        assert_eq!(
            view.shown(),
            vec![Shown::Message(TRANSIENT_FAILURE_MESSAGE.into())]
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_shows_transient_message() {
        let connections = Arc::new(ConnectionManager::new(Arc::new(
            FakeConnector::unavailable(Arc::new(FakeBackend::new())),
        )));
        let view = Arc::new(RecordingView::default());
        let panel = SettingsPanel::open(connections, view.clone());

        panel.refresh_status();
        panel.registry().wait_idle().await;

        assert_eq!(
            view.shown(),
            vec![Shown::Message(TRANSIENT_FAILURE_MESSAGE.into())]
        );
    }

    #[tokio::test]
    async fn test_concurrent_actions_update_independently() {
        let backend = Arc::new(FakeBackend::new());
        let (panel, view) = panel(backend);

        panel.refresh_status();
        panel.create_model();
        panel.registry().wait_idle().await;

        let shown = view.shown();
        assert_eq!(shown.len(), 3);
        assert!(shown.contains(&Shown::Message("Model created.".into())));
    }

    #[tokio::test]
    async fn test_close_drops_late_answers() {
        let gate = Arc::new(Semaphore::new(0));
        let backend = Arc::new(FakeBackend::gated(gate.clone()));
        backend.set_decks(decks(&["Deck A"]));
        let (panel, view) = panel(backend.clone());

        panel.list_decks();
        panel.refresh_status();
        while backend.calls().len() < 2 {
            tokio::task::yield_now().await;
        }

        panel.close();
        assert!(panel.registry().is_empty());

        gate.add_permits(2);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(view.shown().is_empty());
    }
}
