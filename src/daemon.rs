//! Daemon module - main event loop orchestration
//!
//! Wires the hotkey controller, selection capture, debouncer and the
//! backend retry path together, and follows the settings file so a new
//! binding takes effect without a restart.

use crate::config::Config;
use crate::debounce::Debouncer;
use crate::error::{Result, TranslatorError};
use crate::hotkey::{self, Capture, HotkeyController, HotkeyEvent, CAPTURE_BINDING_ID};
use crate::notification;
use crate::rpc::dbus::DbusConnector;
use crate::rpc::{ConnectionManager, OneWayCall, RetryScheduler};
use crate::sanitize::SelectionSanitizer;
use crate::selection::SelectionChain;
use crate::settings::{SettingsStore, SettingsWatcher};
use pidlock::Pidlock;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

/// Write PID file for external control via signals
fn write_pid_file() -> Option<PathBuf> {
    let pid_path = Config::pid_file();

    // Ensure parent directory exists
    if let Some(parent) = pid_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create PID file directory: {}", e);
            return None;
        }
    }

    let pid = std::process::id();
    if let Err(e) = std::fs::write(&pid_path, pid.to_string()) {
        tracing::warn!("Failed to write PID file: {}", e);
        return None;
    }

    tracing::debug!("PID file written: {:?} (pid={})", pid_path, pid);
    Some(pid_path)
}

/// Remove PID file on shutdown
fn cleanup_pid_file(path: &PathBuf) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove PID file: {}", e);
        }
    }
}

/// Composition root for the hotkey → translate path
pub struct Dispatcher {
    config: Config,
    pid_file_path: Option<PathBuf>,
}

impl Dispatcher {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            pid_file_path: None,
        }
    }

    /// Re-read the binding and tell the user when it cannot be bound
    async fn reload_binding(&self, controller: &mut HotkeyController, store: &SettingsStore) {
        if let Err(e) = controller.reload(store).await {
            tracing::warn!("Hotkey '{}' not bound: {}", controller.binding(), e);
            if self.config.hotkey.notify_on_failure {
                notification::send(
                    "Translator hotkey",
                    &format!("Cannot bind '{}': {}", controller.binding(), e),
                )
                .await;
            }
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting translator-hotkey daemon");

        // Single instance check
        let runtime_dir = Config::runtime_dir();
        std::fs::create_dir_all(&runtime_dir)?;
        let lock_path = runtime_dir.join("daemon.lock");
        let mut pidlock = Pidlock::new(&lock_path.to_string_lossy());
        if let Err(e) = pidlock.acquire() {
            return Err(TranslatorError::Config(format!(
                "Another translator-hotkey daemon is already running ({:?})",
                e
            )));
        }

        // Write PID file for `translator-hotkey trigger`
        self.pid_file_path = write_pid_file();

        let mut sigusr1 = signal(SignalKind::user_defined1()).map_err(|e| {
            TranslatorError::Config(format!("Failed to set up SIGUSR1 handler: {}", e))
        })?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
            TranslatorError::Config(format!("Failed to set up SIGTERM handler: {}", e))
        })?;

        // Backend path
        let connections = Arc::new(ConnectionManager::new(Arc::new(DbusConnector::new(
            &self.config.backend,
        ))));
        let retry = RetryScheduler::new(connections, self.config.dispatch.retry_policy());
        tracing::info!(
            "Backend: {} {} (debounce {}ms, {} attempts every {}ms)",
            self.config.backend.bus_name,
            self.config.backend.object_path,
            self.config.dispatch.debounce_ms,
            self.config.dispatch.retry_max_attempts,
            self.config.dispatch.retry_delay_ms
        );

        // Capture path
        let (debouncer, mut emitted) = Debouncer::channel(self.config.dispatch.quiet_period());
        let capture = Capture::new(
            Arc::new(SelectionChain::default()),
            SelectionSanitizer::new(self.config.selection.max_chars),
            debouncer.clone(),
        );

        // Hotkey binding (if enabled)
        let store = self.config.settings_store()?;
        let (hotkey_tx, mut hotkey_rx) = mpsc::channel(32);
        let mut controller = if self.config.hotkey.enabled {
            match hotkey::create_shell(hotkey_tx) {
                Ok(shell) => Some(HotkeyController::new(shell)),
                Err(e) => {
                    tracing::warn!("Built-in hotkey unavailable: {}", e);
                    if self.config.hotkey.notify_on_failure {
                        notification::send("Translator hotkey", &e.to_string()).await;
                    }
                    None
                }
            }
        } else {
            drop(hotkey_tx);
            tracing::info!(
                "Built-in hotkey disabled, bind 'translator-hotkey trigger' in the compositor"
            );
            None
        };

        let mut watcher: Option<SettingsWatcher> = None;
        if let Some(ref mut controller) = controller {
            tracing::info!("Settings file: {:?}", store.path());
            match store.watch() {
                Ok(w) => watcher = Some(w),
                Err(e) => tracing::warn!("Hotkey changes need a restart: {}", e),
            }
            self.reload_binding(controller, &store).await;
        }

        // Main event loop
        loop {
            tokio::select! {
                Some(event) = hotkey_rx.recv() => {
                    let HotkeyEvent::Activated(id) = event;
                    if id == CAPTURE_BINDING_ID {
                        let capture = capture.clone();
                        tokio::spawn(async move { capture.run().await });
                    } else {
                        tracing::trace!("Ignoring activation of unknown binding {}", id);
                    }
                }

                Some(()) = async {
                    match &mut watcher {
                        Some(w) => w.changed().await,
                        None => std::future::pending().await,
                    }
                } => {
                    tracing::debug!("Settings changed");
                    if let Some(ref mut controller) = controller {
                        self.reload_binding(controller, &store).await;
                    }
                }

                Some(text) = emitted.recv() => {
                    tracing::debug!("Sending selection to the translator");
                    retry.dispatch(OneWayCall::Translate(text));
                }

                // SIGUSR1 - capture now (for compositor keybindings)
                _ = sigusr1.recv() => {
                    tracing::debug!("Received SIGUSR1 (capture)");
                    let capture = capture.clone();
                    tokio::spawn(async move { capture.run().await });
                }

                // Handle graceful shutdown (SIGINT from Ctrl+C)
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT, shutting down...");
                    break;
                }

                // Handle graceful shutdown (SIGTERM from systemctl stop)
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down...");
                    break;
                }
            }
        }

        // Cleanup
        debouncer.cancel();
        if let Some(mut controller) = controller {
            controller.shutdown().await;
        }

        if let Some(ref path) = self.pid_file_path {
            cleanup_pid_file(path);
        }
        if let Err(e) = pidlock.release() {
            tracing::debug!("Failed to release daemon lock: {:?}", e);
        }

        tracing::info!("Daemon stopped");

        Ok(())
    }
}
