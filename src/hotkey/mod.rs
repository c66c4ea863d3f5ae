//! Hotkey binding
//!
//! The accelerator shell is the seam between the binding logic and the
//! platform. On Linux the shell watches keyboards through evdev, which
//! works under every Wayland compositor because it sits below the display
//! server. The user must be in the 'input' group.
//!
//! Other platforms have no built-in shell; bind a compositor shortcut to
//! `translator-hotkey trigger` instead.

pub mod accelerator;
pub mod controller;
#[cfg(target_os = "linux")]
pub mod evdev_listener;

pub use accelerator::{Accelerator, Modifier};
pub use controller::{BindingState, Capture, HotkeyController, CAPTURE_BINDING_ID};

use crate::error::HotkeyError;
use tokio::sync::mpsc;

/// Events emitted by an accelerator shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// The accelerator registered under this id was pressed
    Activated(String),
}

/// Registers accelerators with the platform and reports activations
#[async_trait::async_trait]
pub trait AcceleratorShell: Send {
    /// Bind `accelerator` under `id`, replacing any previous binding with that id
    async fn register(&mut self, id: &str, accelerator: &Accelerator)
        -> Result<(), HotkeyError>;

    /// Remove the binding for `id`; unknown ids are ignored
    async fn unregister(&mut self, id: &str) -> Result<(), HotkeyError>;
}

/// Create the platform accelerator shell
///
/// On Linux, uses evdev for kernel-level key event detection.
#[cfg(target_os = "linux")]
pub fn create_shell(
    events: mpsc::Sender<HotkeyEvent>,
) -> Result<Box<dyn AcceleratorShell>, HotkeyError> {
    Ok(Box::new(evdev_listener::EvdevShell::new(events)))
}

/// Create the platform accelerator shell
#[cfg(not(target_os = "linux"))]
pub fn create_shell(
    _events: mpsc::Sender<HotkeyEvent>,
) -> Result<Box<dyn AcceleratorShell>, HotkeyError> {
    Err(HotkeyError::NotSupported(
        "Built-in hotkey detection is only available on Linux. \
         Bind a desktop shortcut to 'translator-hotkey trigger' instead."
            .to_string(),
    ))
}
