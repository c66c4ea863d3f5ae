//! Binding lifecycle and the capture action
//!
//! The controller keeps the shell registration in step with the settings
//! store. It holds a cached copy of the binding so repeated change
//! notifications for the same value do nothing.

use super::{Accelerator, AcceleratorShell};
use crate::debounce::Debouncer;
use crate::error::HotkeyError;
use crate::sanitize::SelectionSanitizer;
use crate::selection::SelectionSource;
use crate::settings::SettingsStore;
use std::sync::Arc;

/// Stable identifier the capture binding is registered under
pub const CAPTURE_BINDING_ID: &str = "translate-selection";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingState {
    Unbound,
    Bound(Accelerator),
}

/// Binds and unbinds the capture accelerator
pub struct HotkeyController {
    shell: Box<dyn AcceleratorShell>,
    state: BindingState,
    /// Last binding text seen in the store
    cached: String,
}

impl HotkeyController {
    pub fn new(shell: Box<dyn AcceleratorShell>) -> Self {
        Self {
            shell,
            state: BindingState::Unbound,
            cached: String::new(),
        }
    }

    pub fn state(&self) -> &BindingState {
        &self.state
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.state, BindingState::Bound(_))
    }

    /// The binding text the controller last acted on
    pub fn binding(&self) -> &str {
        &self.cached
    }

    /// Re-read the store and apply the binding if it changed.
    ///
    /// An unreadable store keeps the current registration.
    pub async fn reload(&mut self, store: &SettingsStore) -> Result<(), HotkeyError> {
        match store.hotkey_binding() {
            Ok(binding) => self.apply_binding(&binding).await,
            Err(e) => {
                tracing::warn!("Keeping current hotkey, settings unreadable: {}", e);
                Ok(())
            }
        }
    }

    /// Move to the state described by `binding`; empty means unbound.
    ///
    /// When the accelerator cannot be parsed or registered the controller
    /// stays Unbound and the error is returned.
    pub async fn apply_binding(&mut self, binding: &str) -> Result<(), HotkeyError> {
        let binding = binding.trim();
        if binding == self.cached {
            tracing::trace!("Hotkey binding unchanged");
            return Ok(());
        }

        self.unbind().await;
        self.cached = binding.to_string();

        if binding.is_empty() {
            tracing::info!("Hotkey unbound");
            return Ok(());
        }

        let accelerator: Accelerator = binding.parse()?;
        self.shell.register(CAPTURE_BINDING_ID, &accelerator).await?;
        tracing::info!("Hotkey bound to {}", accelerator);
        self.state = BindingState::Bound(accelerator);
        Ok(())
    }

    /// Release the binding; used on teardown
    pub async fn shutdown(&mut self) {
        self.unbind().await;
    }

    async fn unbind(&mut self) {
        if let BindingState::Bound(accelerator) =
            std::mem::replace(&mut self.state, BindingState::Unbound)
        {
            if let Err(e) = self.shell.unregister(CAPTURE_BINDING_ID).await {
                tracing::debug!("Ignoring failure to unregister {}: {}", accelerator, e);
            }
        }
    }
}

/// The capture action run on every activation
#[derive(Clone)]
pub struct Capture {
    source: Arc<dyn SelectionSource>,
    sanitizer: SelectionSanitizer,
    debouncer: Debouncer,
}

impl Capture {
    pub fn new(
        source: Arc<dyn SelectionSource>,
        sanitizer: SelectionSanitizer,
        debouncer: Debouncer,
    ) -> Self {
        Self {
            source,
            sanitizer,
            debouncer,
        }
    }

    /// Read the primary selection and queue it; returns whether anything
    /// was queued
    pub async fn run(&self) -> bool {
        let raw = self.source.read_primary().await;
        match self.sanitizer.sanitize(raw.as_deref()) {
            Some(text) => {
                tracing::debug!("Captured {} byte(s) of selection", text.len());
                self.debouncer.notify(text);
                true
            }
            None => {
                tracing::debug!("Selection ignored");
                false
            }
        }
    }
}
