//! Primary selection retrieval
//!
//! Fallback chain:
//! 1. wl-paste --primary - Wayland compositors with primary selection support
//! 2. xclip -o -selection primary - X11 and XWayland
//!
//! A selection that cannot be read is treated as absent, never as an error.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Give up on a selection tool that does not answer within this time
const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Source of the current primary selection
#[async_trait::async_trait]
pub trait SelectionSource: Send + Sync {
    /// Read the primary selection; `None` when nothing can be read
    async fn read_primary(&self) -> Option<String>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Runs an external tool and takes its stdout as the selection
pub struct CommandSelection {
    name: &'static str,
    program: &'static str,
    args: &'static [&'static str],
}

impl CommandSelection {
    pub fn wl_paste() -> Self {
        Self {
            name: "wl-paste",
            program: "wl-paste",
            args: &["--primary", "--no-newline"],
        }
    }

    pub fn xclip() -> Self {
        Self {
            name: "xclip",
            program: "xclip",
            args: &["-o", "-selection", "primary"],
        }
    }
}

#[async_trait::async_trait]
impl SelectionSource for CommandSelection {
    async fn read_primary(&self) -> Option<String> {
        let output = Command::new(self.program)
            .args(self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(READ_TIMEOUT, output).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                if e.kind() == std::io::ErrorKind::NotFound {
                    tracing::trace!("{} not installed", self.program);
                } else {
                    tracing::debug!("{} failed to start: {}", self.program, e);
                }
                return None;
            }
            Err(_) => {
                tracing::debug!("{} timed out", self.program);
                return None;
            }
        };

        if !output.status.success() {
            // wl-paste exits non-zero when the selection is empty
            tracing::trace!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Tries each source in order until one yields a selection
pub struct SelectionChain {
    sources: Vec<Box<dyn SelectionSource>>,
}

impl SelectionChain {
    pub fn new(sources: Vec<Box<dyn SelectionSource>>) -> Self {
        Self { sources }
    }
}

impl Default for SelectionChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(CommandSelection::wl_paste()),
            Box::new(CommandSelection::xclip()),
        ])
    }
}

#[async_trait::async_trait]
impl SelectionSource for SelectionChain {
    async fn read_primary(&self) -> Option<String> {
        for source in &self.sources {
            if let Some(text) = source.read_primary().await {
                tracing::debug!("Primary selection read via {}", source.name());
                return Some(text);
            }
            tracing::trace!("{} returned no selection, trying next", source.name());
        }
        None
    }

    fn name(&self) -> &'static str {
        "selection chain"
    }
}
