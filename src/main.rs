//! translator-hotkey - translate the selected text with a global hotkey
//!
//! Run with `translator-hotkey` or `translator-hotkey daemon` to start the daemon.
//! Use `translator-hotkey hotkey set '<Super>t'` to choose the binding.
//! Use `translator-hotkey anki decks` to work with the Anki settings.

use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use translator_hotkey::cli::{AnkiAction, Cli, Commands, HotkeyAction};
use translator_hotkey::config::{self, Config};
use translator_hotkey::daemon::Dispatcher;
use translator_hotkey::panel::{ConsoleView, SettingsPanel};
use translator_hotkey::rpc::dbus::DbusConnector;
use translator_hotkey::rpc::{ConnectionManager, DispatchOutcome, OneWayCall, RetryScheduler};
use translator_hotkey::sanitize::SelectionSanitizer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(format!("translator_hotkey={},warn", log_level))
            }),
        )
        .with_target(false)
        .init();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(debounce_ms) = cli.debounce_ms {
        config.dispatch.debounce_ms = debounce_ms;
    }
    if let Some(settings_file) = cli.settings_file {
        config.settings_file = settings_file.to_string_lossy().into_owned();
    }
    if cli.no_hotkey {
        config.hotkey.enabled = false;
    }

    // Run the appropriate command
    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => {
            let mut dispatcher = Dispatcher::new(config);
            if let Err(e) = dispatcher.run().await {
                translator_hotkey::notification::send_sync(
                    "Translator hotkey stopped",
                    &e.to_string(),
                );
                return Err(e.into());
            }
        }

        Commands::Translate { text } => {
            let sanitizer = SelectionSanitizer::new(config.selection.max_chars);
            let Some(text) = sanitizer.sanitize(Some(&text)) else {
                anyhow::bail!("Nothing to translate: text is empty, a path, a URL or only numbers");
            };
            send_one_way(&config, OneWayCall::Translate(text)).await?;
        }

        Commands::History => {
            send_one_way(&config, OneWayCall::ShowHistory).await?;
        }

        Commands::ShowSettings => {
            send_one_way(&config, OneWayCall::ShowSettings).await?;
        }

        Commands::Hotkey { action } => {
            run_hotkey(&config, action)?;
        }

        Commands::Anki { action } => {
            run_anki(&config, action).await;
        }

        Commands::Trigger => {
            send_trigger()?;
        }

        Commands::Config => {
            show_config(&config)?;
        }
    }

    Ok(())
}

fn connections(config: &Config) -> Arc<ConnectionManager> {
    Arc::new(ConnectionManager::new(Arc::new(DbusConnector::new(
        &config.backend,
    ))))
}

/// Deliver a one-way call with the configured retries and report how it went
async fn send_one_way(config: &Config, call: OneWayCall) -> anyhow::Result<()> {
    let method = call.method();
    let scheduler = RetryScheduler::new(connections(config), config.dispatch.retry_policy());

    match scheduler.deliver(call).await {
        DispatchOutcome::Delivered { attempts } => {
            tracing::debug!("{} delivered after {} attempt(s)", method, attempts);
            Ok(())
        }
        DispatchOutcome::Dropped { attempts } => anyhow::bail!(
            "The translator did not answer after {} attempts. Is it running?",
            attempts
        ),
        DispatchOutcome::Rejected { .. } => {
            anyhow::bail!("The translator rejected {} (run with -v for details)", method)
        }
    }
}

fn run_hotkey(config: &Config, action: HotkeyAction) -> anyhow::Result<()> {
    let store = config.settings_store()?;

    match action {
        HotkeyAction::Show => {
            let binding = store.hotkey_binding()?;
            if binding.is_empty() {
                println!("(unbound)");
            } else {
                println!("{}", binding);
            }
        }
        HotkeyAction::Set { accelerator } => {
            store.set_hotkey_binding(&accelerator)?;
            println!("Hotkey set to {}", accelerator.trim());
        }
        HotkeyAction::Clear => {
            store.set_hotkey_binding("")?;
            println!("Hotkey cleared");
        }
    }

    Ok(())
}

async fn run_anki(config: &Config, action: AnkiAction) {
    let panel = SettingsPanel::open(connections(config), Arc::new(ConsoleView));

    match action {
        AnkiAction::Status => panel.refresh_status(),
        AnkiAction::CreateModel => panel.create_model(),
        AnkiAction::Decks => panel.list_decks(),
        AnkiAction::Select { deck } => panel.select_deck(&deck),
        AnkiAction::Save => panel.save_settings(),
    }

    tokio::select! {
        _ = panel.registry().wait_idle() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::debug!("Interrupted, cancelling pending calls");
        }
    }
    panel.close();
}

/// Ask the running daemon to capture the selection
#[cfg(target_os = "linux")]
fn send_trigger() -> anyhow::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid_file = Config::pid_file();
    let pid: i32 = std::fs::read_to_string(&pid_file)
        .map_err(|_| anyhow::anyhow!("translator-hotkey daemon is not running ({:?} not found)", pid_file))?
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid PID file {:?}", pid_file))?;

    kill(Pid::from_raw(pid), Signal::SIGUSR1)
        .map_err(|e| anyhow::anyhow!("Failed to signal daemon (pid {}): {}", pid, e))?;
    tracing::debug!("Sent SIGUSR1 to pid {}", pid);
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn send_trigger() -> anyhow::Result<()> {
    anyhow::bail!("trigger is only supported on Linux")
}

/// Show current configuration
fn show_config(config: &Config) -> anyhow::Result<()> {
    println!("Current Configuration\n");
    println!("=====================\n");

    println!("[backend]");
    println!("  bus_name = {:?}", config.backend.bus_name);
    println!("  object_path = {:?}", config.backend.object_path);
    println!("  interface = {:?}", config.backend.interface);

    println!("\n[dispatch]");
    println!("  debounce_ms = {}", config.dispatch.debounce_ms);
    println!("  retry_max_attempts = {}", config.dispatch.retry_max_attempts);
    println!("  retry_delay_ms = {}", config.dispatch.retry_delay_ms);

    println!("\n[selection]");
    println!("  max_chars = {}", config.selection.max_chars);

    println!("\n[hotkey]");
    println!("  enabled = {}", config.hotkey.enabled);
    println!("  notify_on_failure = {}", config.hotkey.notify_on_failure);

    println!("\n---");
    if let Some(path) = Config::default_path() {
        println!("Config file: {:?}", path);
    }
    let settings_file = config.resolve_settings_file()?;
    println!("Settings file: {:?}", settings_file);
    match config.settings_store()?.hotkey_binding() {
        Ok(binding) if binding.is_empty() => println!("Hotkey: (unbound)"),
        Ok(binding) => println!("Hotkey: {}", binding),
        Err(e) => println!("Hotkey: unreadable ({})", e),
    }
    println!("PID file: {:?}", Config::pid_file());

    Ok(())
}
