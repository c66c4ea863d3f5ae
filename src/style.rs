//! Console styling for the settings panel
//!
//! Styling is decided once per process: the first panel to open checks
//! whether stdout is a terminal and whether `NO_COLOR` is set, and every
//! later panel reuses that decision.

use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot initializer; set on first use and never reset
#[derive(Debug)]
pub struct StyleGuard {
    applied: AtomicBool,
}

impl StyleGuard {
    pub const fn new() -> Self {
        Self {
            applied: AtomicBool::new(false),
        }
    }

    /// Run `apply` if this guard has not fired yet; returns whether it ran
    pub fn apply_once(&self, apply: impl FnOnce()) -> bool {
        if self.applied.swap(true, Ordering::SeqCst) {
            return false;
        }
        apply();
        true
    }

    pub fn is_applied(&self) -> bool {
        self.applied.load(Ordering::SeqCst)
    }
}

impl Default for StyleGuard {
    fn default() -> Self {
        Self::new()
    }
}

static PANEL_STYLE: StyleGuard = StyleGuard::new();
static COLOR_ENABLED: AtomicBool = AtomicBool::new(false);

/// Apply panel styling for this process; later calls do nothing
pub fn ensure_panel_style() -> bool {
    PANEL_STYLE.apply_once(|| {
        let enabled = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        COLOR_ENABLED.store(enabled, Ordering::SeqCst);
        tracing::trace!("Panel styling applied (color: {})", enabled);
    })
}

/// Colour roles used by the console view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Heading,
    Good,
    Problem,
    Muted,
}

impl Tone {
    fn code(self) -> &'static str {
        match self {
            Tone::Heading => "1",
            Tone::Good => "32",
            Tone::Problem => "33",
            Tone::Muted => "90",
        }
    }
}

/// Wrap `text` in the escape codes for `tone` when colour is enabled
pub fn paint(text: &str, tone: Tone) -> String {
    if COLOR_ENABLED.load(Ordering::SeqCst) {
        format!("\x1b[{}m{}\x1b[0m", tone.code(), text)
    } else {
        text.to_string()
    }
}
