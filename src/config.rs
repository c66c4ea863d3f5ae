//! Configuration loading and types for translator-hotkey
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/translator-hotkey/config.toml)
//! 3. Environment variables (TRANSLATOR_HOTKEY_*)
//! 4. CLI arguments (highest priority)

use crate::debounce::DEFAULT_QUIET_PERIOD_MS;
use crate::error::TranslatorError;
use crate::rpc::dbus::{DEFAULT_BUS_NAME, DEFAULT_INTERFACE, DEFAULT_OBJECT_PATH};
use crate::rpc::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_MS};
use crate::sanitize::DEFAULT_MAX_CHARS;
use crate::settings::SettingsStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# translator-hotkey configuration
#
# Location: ~/.config/translator-hotkey/config.toml
# All settings can be overridden via CLI flags

# Settings file holding the hotkey binding, shared with the translator's
# preferences window. Use "auto" for the default location
# (~/.config/translator-hotkey/settings.toml) or give a path.
settings_file = "auto"

[backend]
# D-Bus coordinates of the translator service on the session bus
bus_name = "com.translator.desktop"
object_path = "/com/translator/desktop"
interface = "com.translator.desktop"

[dispatch]
# Quiet period after a hotkey press before the selection is sent (ms).
# Presses inside the window replace the pending text; the timer is not reset.
debounce_ms = 80

# Attempts made to reach a backend that is not running yet
retry_max_attempts = 10

# Fixed delay between attempts (ms)
retry_delay_ms = 200

[selection]
# Selections longer than this are cut (UTF-16 code units)
max_chars = 200

[hotkey]
# Enable built-in hotkey detection (default: true)
# Set to false when binding `translator-hotkey trigger` in the compositor
# enabled = true

# Show a desktop notification when the configured hotkey cannot be bound
# notify_on_failure = true
"#;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Path to the settings file, or "auto" for the default location
    #[serde(default = "default_settings_file")]
    pub settings_file: String,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub hotkey: HotkeyConfig,
}

/// Where the translator service lives on the session bus
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_bus_name")]
    pub bus_name: String,

    #[serde(default = "default_object_path")]
    pub object_path: String,

    #[serde(default = "default_interface")]
    pub interface: String,
}

/// Debounce and retry timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct DispatchConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Selection sanitizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SelectionConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

/// Built-in hotkey detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct HotkeyConfig {
    /// Set to false when using compositor keybindings instead
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub notify_on_failure: bool,
}

fn default_settings_file() -> String {
    "auto".to_string()
}

fn default_bus_name() -> String {
    DEFAULT_BUS_NAME.to_string()
}

fn default_object_path() -> String {
    DEFAULT_OBJECT_PATH.to_string()
}

fn default_interface() -> String {
    DEFAULT_INTERFACE.to_string()
}

fn default_debounce_ms() -> u64 {
    DEFAULT_QUIET_PERIOD_MS
}

fn default_retry_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}

fn default_true() -> bool {
    true
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            bus_name: default_bus_name(),
            object_path: default_object_path(),
            interface: default_interface(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl DispatchConfig {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            notify_on_failure: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            dispatch: DispatchConfig::default(),
            selection: SelectionConfig::default(),
            hotkey: HotkeyConfig::default(),
            settings_file: default_settings_file(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "translator-hotkey")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the runtime directory for ephemeral files (pid file, lock)
    pub fn runtime_dir() -> PathBuf {
        // Use XDG_RUNTIME_DIR if available, otherwise fall back to /tmp
        std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
            .join("translator-hotkey")
    }

    /// Pid file of the running daemon, read by `trigger`
    pub fn pid_file() -> PathBuf {
        Self::runtime_dir().join("pid")
    }

    /// Resolve the settings file path; "auto" means the default location
    pub fn resolve_settings_file(&self) -> Result<PathBuf, TranslatorError> {
        match self.settings_file.trim() {
            "" | "auto" => SettingsStore::default_path().ok_or_else(|| {
                TranslatorError::Config("Cannot determine the settings directory".to_string())
            }),
            path => Ok(PathBuf::from(path)),
        }
    }

    pub fn settings_store(&self) -> Result<SettingsStore, TranslatorError> {
        Ok(SettingsStore::new(self.resolve_settings_file()?))
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<(), TranslatorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bus_name) = lookup("TRANSLATOR_HOTKEY_BUS_NAME") {
            self.backend.bus_name = bus_name;
        }
        if let Some(debounce) = lookup("TRANSLATOR_HOTKEY_DEBOUNCE_MS") {
            self.dispatch.debounce_ms = debounce.trim().parse().map_err(|_| {
                TranslatorError::Config(format!(
                    "TRANSLATOR_HOTKEY_DEBOUNCE_MS must be a number of milliseconds, got '{}'",
                    debounce
                ))
            })?;
        }
        if let Some(settings_file) = lookup("TRANSLATOR_HOTKEY_SETTINGS_FILE") {
            self.settings_file = settings_file;
        }
        Ok(())
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, TranslatorError> {
    // Start with defaults
    let mut config = Config::default();

    // Determine config file path
    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    // Load from file if it exists
    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| TranslatorError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| TranslatorError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    // Override from environment variables
    config.apply_env(|key| std::env::var(key).ok())?;

    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &Config, path: &Path) -> Result<(), TranslatorError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            TranslatorError::Config(format!("Failed to create config dir: {}", e))
        })?;
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| TranslatorError::Config(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(path, contents)
        .map_err(|e| TranslatorError::Config(format!("Failed to write config: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend.bus_name, "com.translator.desktop");
        assert_eq!(config.backend.object_path, "/com/translator/desktop");
        assert_eq!(config.dispatch.debounce_ms, 80);
        assert_eq!(config.dispatch.retry_policy(), RetryPolicy::default());
        assert_eq!(config.selection.max_chars, 200);
        assert!(config.hotkey.enabled);
        assert_eq!(config.settings_file, "auto");
    }

    #[test]
    fn test_default_template_matches_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.backend, defaults.backend);
        assert_eq!(parsed.dispatch, defaults.dispatch);
        assert_eq!(parsed.selection, defaults.selection);
        assert_eq!(parsed.hotkey, defaults.hotkey);
    }

    #[test]
    fn test_parse_partial_config_toml() {
        let toml_str = r#"
            settings_file = "/tmp/translator-settings.toml"

            [dispatch]
            debounce_ms = 150

            [hotkey]
            enabled = false
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.dispatch.debounce_ms, 150);
        assert_eq!(config.dispatch.retry_max_attempts, 10); // default
        assert!(!config.hotkey.enabled);
        assert!(config.hotkey.notify_on_failure); // default
        assert_eq!(config.backend, BackendConfig::default());
        assert_eq!(
            config.resolve_settings_file().unwrap(),
            PathBuf::from("/tmp/translator-settings.toml")
        );
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TRANSLATOR_HOTKEY_BUS_NAME", "org.example.Translator"),
            ("TRANSLATOR_HOTKEY_DEBOUNCE_MS", "120"),
        ]);
        let mut config = Config::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.backend.bus_name, "org.example.Translator");
        assert_eq!(config.dispatch.quiet_period(), Duration::from_millis(120));
        assert_eq!(config.settings_file, "auto");
    }

    #[test]
    fn test_bad_env_debounce_is_config_error() {
        let mut config = Config::default();
        let result = config.apply_env(|key| {
            (key == "TRANSLATOR_HOTKEY_DEBOUNCE_MS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(TranslatorError::Config(_))));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.dispatch.retry_delay_ms = 500;
        config.selection.max_chars = 64;
        save_config(&config, &path).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.dispatch.retry_delay_ms, 500);
        assert_eq!(loaded.selection.max_chars, 64);
    }

    #[test]
    fn test_invalid_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[dispatch]\ndebounce_ms = \"fast\"\n").unwrap();

        assert!(matches!(
            load_config(Some(&path)),
            Err(TranslatorError::Config(_))
        ));
    }
}
