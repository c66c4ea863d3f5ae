//! D-Bus bindings for the translator backend
//!
//! The backend registers `com.translator.desktop` on the session bus.
//! Building a proxy does not check that the name is owned, so a backend
//! that is still starting shows up as `ServiceUnknown` on the first call.

use super::{
    AnkiActionResult, AnkiStatus, Connector, DeckList, OneWayCall, TranslatorBackend,
};
use crate::config::BackendConfig;
use crate::error::RpcError;
use std::sync::Arc;
use zbus::proxy::CacheProperties;
use zbus::Connection;

pub const DEFAULT_BUS_NAME: &str = "com.translator.desktop";
pub const DEFAULT_OBJECT_PATH: &str = "/com/translator/desktop";
pub const DEFAULT_INTERFACE: &str = "com.translator.desktop";

#[zbus::proxy(
    interface = "com.translator.desktop",
    default_service = "com.translator.desktop",
    default_path = "/com/translator/desktop"
)]
trait Translator {
    fn translate(&self, text: &str) -> zbus::Result<()>;

    fn show_history(&self) -> zbus::Result<()>;

    fn show_settings(&self) -> zbus::Result<()>;

    fn get_anki_status(&self) -> zbus::Result<(String, String, String)>;

    fn create_anki_model(&self) -> zbus::Result<(String, String, String, String)>;

    fn list_anki_decks(&self) -> zbus::Result<(Vec<String>, String)>;

    fn select_anki_deck(&self, deck: &str) -> zbus::Result<(String, String, String, String)>;

    fn save_settings(&self) -> zbus::Result<(String, String, String, String)>;
}

/// Backend handle backed by a session bus proxy
pub struct DbusBackend {
    proxy: TranslatorProxy<'static>,
}

#[async_trait::async_trait]
impl TranslatorBackend for DbusBackend {
    async fn call_one_way(&self, call: &OneWayCall) -> Result<(), RpcError> {
        tracing::trace!("Calling {} on backend", call.method());
        match call {
            OneWayCall::Translate(text) => self.proxy.translate(text).await?,
            OneWayCall::ShowHistory => self.proxy.show_history().await?,
            OneWayCall::ShowSettings => self.proxy.show_settings().await?,
        }
        Ok(())
    }

    async fn get_anki_status(&self) -> Result<AnkiStatus, RpcError> {
        Ok(self.proxy.get_anki_status().await?.into())
    }

    async fn create_anki_model(&self) -> Result<AnkiActionResult, RpcError> {
        Ok(self.proxy.create_anki_model().await?.into())
    }

    async fn list_anki_decks(&self) -> Result<DeckList, RpcError> {
        Ok(self.proxy.list_anki_decks().await?.into())
    }

    async fn select_anki_deck(&self, deck: &str) -> Result<AnkiActionResult, RpcError> {
        Ok(self.proxy.select_anki_deck(deck).await?.into())
    }

    async fn save_settings(&self) -> Result<AnkiActionResult, RpcError> {
        Ok(self.proxy.save_settings().await?.into())
    }
}

/// Connects to the backend over the session bus
pub struct DbusConnector {
    bus_name: String,
    object_path: String,
    interface: String,
}

impl DbusConnector {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            bus_name: config.bus_name.clone(),
            object_path: config.object_path.clone(),
            interface: config.interface.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Connector for DbusConnector {
    async fn connect(&self) -> Result<Arc<dyn TranslatorBackend>, RpcError> {
        let connection = Connection::session().await?;

        let proxy = TranslatorProxy::builder(&connection)
            .destination(self.bus_name.clone())?
            .path(self.object_path.clone())?
            .interface(self.interface.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?;

        tracing::debug!(
            "Connected to backend {} at {}",
            self.bus_name,
            self.object_path
        );

        Ok(Arc::new(DbusBackend { proxy }))
    }
}
