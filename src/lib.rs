//! translator-hotkey: hotkey-driven selection translation for Linux
//!
//! This library provides the dispatch layer between the desktop and the
//! translator backend:
//! - Binding a global accelerator via evdev (kernel-level, works on all compositors)
//! - Reading the primary selection (wl-paste, xclip fallback)
//! - Sanitizing and debouncing captured text
//! - Delivering calls over D-Bus with bounded retries while the backend starts
//! - Tracking cancellable settings calls for the Anki settings panel
//!
//! # Architecture
//!
//! ```text
//!                   ┌──────────────────┐        ┌──────────────────┐
//!                   │  Settings file   │───────▶│ HotkeyController │
//!                   │ (notify watcher) │ change │  bind / unbind   │
//!                   └──────────────────┘        └──────────────────┘
//!                                                        │
//!                                                        ▼ activation
//!                                               ┌──────────────────┐
//!                                               │     Capture      │
//!                                               │ primary selection│
//!                                               └──────────────────┘
//!                                                        │
//!                                                        ▼ raw text
//!                                               ┌──────────────────┐
//!                                               │    Sanitizer     │ drop paths, URLs,
//!                                               │ truncate to 200  │ numeric noise
//!                                               └──────────────────┘
//!                                                        │
//!                                                        ▼ candidate
//!                                               ┌──────────────────┐
//!                                               │    Debouncer     │ last write wins,
//!                                               │      80 ms       │ timer never reset
//!                                               └──────────────────┘
//!                                                        │
//!                                                        ▼ Translate(text)
//!   ┌──────────────────┐                        ┌──────────────────┐
//!   │  SettingsPanel   │                        │  RetryScheduler  │ 10 attempts,
//!   │  (CallRegistry)  │                        │  fire and forget │ 200 ms apart
//!   └──────────────────┘                        └──────────────────┘
//!            │ tracked, cancellable                      │
//!            └───────────────────┬───────────────────────┘
//!                                ▼
//!                       ┌──────────────────┐
//!                       │ConnectionManager │ lazy handle, dropped on
//!                       │    (zbus)        │ ServiceUnknown & co.
//!                       └──────────────────┘
//!                                │
//!                                ▼
//!                     com.translator.desktop
//! ```

pub mod cli;
pub mod config;
pub mod daemon;
pub mod debounce;
pub mod error;
pub mod hotkey;
pub mod notification;
pub mod panel;
pub mod rpc;
pub mod sanitize;
pub mod selection;
pub mod settings;
pub mod style;

pub use cli::{AnkiAction, Cli, Commands, HotkeyAction};
pub use config::Config;
pub use daemon::Dispatcher;
pub use error::{Result, TranslatorError};
