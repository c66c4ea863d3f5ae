// Command-line interface definitions for translator-hotkey
//
// This module is separate so it can be used by both the binary (main.rs)
// and build.rs for generating man pages.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "translator-hotkey")]
#[command(author, version, about = "Translate the selected text with a global hotkey")]
#[command(long_about = "
translator-hotkey sends the current primary selection to the desktop
translator whenever the configured hotkey is pressed.

SETUP:
  1. Add yourself to the input group: sudo usermod -aG input $USER
  2. Log out and back in
  3. Install wl-clipboard (Wayland) or xclip (X11)
  4. Run: translator-hotkey hotkey set '<Super>t'
  5. Run: translator-hotkey (to start the daemon)

USAGE:
  Select a word or phrase, press the hotkey, and the translator window
  shows the result. Without input group access, bind a compositor
  shortcut to 'translator-hotkey trigger' instead.
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Override the debounce quiet period in milliseconds
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Override the settings file holding the hotkey binding
    #[arg(long, value_name = "FILE")]
    pub settings_file: Option<std::path::PathBuf>,

    /// Disable built-in hotkey detection (use `trigger` from the compositor)
    #[arg(long)]
    pub no_hotkey: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as daemon (default if no command specified)
    Daemon,

    /// Send text to the translator
    Translate {
        /// Text to translate
        text: String,
    },

    /// Open the translator's history window
    History,

    /// Open the translator's settings window
    ShowSettings,

    /// Show or change the hotkey binding
    Hotkey {
        #[command(subcommand)]
        action: HotkeyAction,
    },

    /// Anki settings actions
    Anki {
        #[command(subcommand)]
        action: AnkiAction,
    },

    /// Capture the selection in the running daemon (send SIGUSR1)
    Trigger,

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
pub enum HotkeyAction {
    /// Print the current binding
    Show,
    /// Bind an accelerator, e.g. '<Super>t' or '<Control><Alt>F13'
    Set {
        accelerator: String,
    },
    /// Remove the binding
    Clear,
}

#[derive(Subcommand)]
pub enum AnkiAction {
    /// Show model and deck status
    Status,
    /// Create the translator note model in Anki
    CreateModel,
    /// List Anki decks
    Decks,
    /// Select the deck new notes go to
    Select {
        deck: String,
    },
    /// Save the Anki settings
    Save,
}
