//! Persistent settings store
//!
//! The hotkey binding lives in a small TOML file shared with the backend's
//! preferences window:
//!
//! ```toml
//! hotkey = ["<Super>t"]
//! ```
//!
//! The list holds zero or one accelerator; an empty list or a missing file
//! means the hotkey is unbound. Other keys in the file are left untouched.

use crate::error::{SettingsError, TranslatorError};
use crate::hotkey::Accelerator;
use directories::ProjectDirs;
use notify::{Config as NotifyConfig, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Key holding the accelerator list
pub const HOTKEY_KEY: &str = "hotkey";

/// Handle to the settings file
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: ~/.config/translator-hotkey/settings.toml
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "translator-hotkey")
            .map(|dirs| dirs.config_dir().join("settings.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current binding, or an empty string when unbound
    pub fn hotkey_binding(&self) -> Result<String, SettingsError> {
        let table = self.read_table()?;

        let binding = match table.get(HOTKEY_KEY) {
            None => String::new(),
            Some(toml::Value::Array(values)) => values
                .first()
                .and_then(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            Some(toml::Value::String(single)) => single.trim().to_string(),
            Some(other) => {
                return Err(SettingsError::Parse {
                    path: self.display(),
                    message: format!("'{}' must be a list of strings, found {}", HOTKEY_KEY, other.type_str()),
                })
            }
        };

        Ok(binding)
    }

    /// Replace the binding; an empty string unbinds.
    ///
    /// A malformed accelerator is rejected before anything is written.
    pub fn set_hotkey_binding(&self, binding: &str) -> Result<(), TranslatorError> {
        let binding = binding.trim();
        let list = if binding.is_empty() {
            Vec::new()
        } else {
            let accelerator: Accelerator = binding.parse()?;
            vec![toml::Value::String(accelerator.as_str().to_string())]
        };

        let mut table = self.read_table()?;
        table.insert(HOTKEY_KEY.to_string(), toml::Value::Array(list));
        self.write_table(&table)?;

        tracing::info!("Hotkey binding set to {:?}", binding);
        Ok(())
    }

    /// Start watching the file for changes
    pub fn watch(&self) -> Result<SettingsWatcher, SettingsError> {
        SettingsWatcher::new(&self.path)
    }

    fn read_table(&self) -> Result<toml::Table, SettingsError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(toml::Table::new()),
            Err(e) => {
                return Err(SettingsError::Read {
                    path: self.display(),
                    message: e.to_string(),
                })
            }
        };

        toml::from_str(&contents).map_err(|e| SettingsError::Parse {
            path: self.display(),
            message: e.to_string(),
        })
    }

    fn write_table(&self, table: &toml::Table) -> Result<(), SettingsError> {
        let write_err = |e: &dyn std::fmt::Display| SettingsError::Write {
            path: self.display(),
            message: e.to_string(),
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_err(&e))?;
        }

        let contents = toml::to_string(table).map_err(|e| write_err(&e))?;

        // Write then rename so watchers never see a half-written file
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, contents).map_err(|e| write_err(&e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| write_err(&e))?;
        Ok(())
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }
}

/// Change notifications for the settings file
pub struct SettingsWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<()>,
}

impl SettingsWatcher {
    fn new(path: &Path) -> Result<Self, SettingsError> {
        let watch_err = |e: &dyn std::fmt::Display| SettingsError::Watch(e.to_string());

        let file_name: OsString = path
            .file_name()
            .ok_or_else(|| SettingsError::Watch(format!("{} is not a file", path.display())))?
            .to_os_string();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        return;
                    }
                    let touches_file = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()));
                    if touches_file {
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::warn!("Settings watch error: {:?}", e),
            },
            NotifyConfig::default(),
        )
        .map_err(|e| watch_err(&e))?;

        // Watch the parent directory; the file may not exist yet and is
        // replaced on every write
        std::fs::create_dir_all(&parent).map_err(|e| watch_err(&e))?;
        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .map_err(|e| watch_err(&e))?;

        tracing::debug!("Watching {:?} for settings changes", path);
        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Wait for the next change; several quick writes may arrive as
    /// several notifications
    pub async fn changed(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn store() -> (TempDir, SettingsStore) {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.toml"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_unbound() {
        let (_dir, store) = store();
        assert_eq!(store.hotkey_binding().unwrap(), "");
    }

    #[test]
    fn test_set_and_read_back() {
        let (_dir, store) = store();

        store.set_hotkey_binding("<Super>t").unwrap();
        assert_eq!(store.hotkey_binding().unwrap(), "<Super>t");

        let contents = std::fs::read_to_string(store.path()).unwrap();
        assert!(contents.contains("hotkey = [\"<Super>t\"]"));
    }

    #[test]
    fn test_clear_writes_empty_list() {
        let (_dir, store) = store();
        store.set_hotkey_binding("<Super>t").unwrap();
        store.set_hotkey_binding("").unwrap();

        assert_eq!(store.hotkey_binding().unwrap(), "");
        let contents = std::fs::read_to_string(store.path()).unwrap();
        assert!(contents.contains("hotkey = []"));
    }

    #[test]
    fn test_invalid_binding_is_not_written() {
        let (_dir, store) = store();
        store.set_hotkey_binding("<Super>t").unwrap();

        let result = store.set_hotkey_binding("<Bogus>t");
        assert!(matches!(
            result,
            Err(TranslatorError::Hotkey(crate::error::HotkeyError::InvalidAccelerator(_)))
        ));
        assert_eq!(store.hotkey_binding().unwrap(), "<Super>t");
    }

    #[test]
    fn test_other_keys_are_preserved() {
        let (_dir, store) = store();
        std::fs::write(
            store.path(),
            "source_language = \"de\"\nhotkey = [\"<Control>F13\"]\n",
        )
        .unwrap();

        assert_eq!(store.hotkey_binding().unwrap(), "<Control>F13");
        store.set_hotkey_binding("<Super>y").unwrap();

        let table: toml::Table =
            toml::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(table["source_language"].as_str(), Some("de"));
        assert_eq!(store.hotkey_binding().unwrap(), "<Super>y");
    }

    #[test]
    fn test_wrong_type_is_a_parse_error() {
        let (_dir, store) = store();
        std::fs::write(store.path(), "hotkey = 5\n").unwrap();
        assert!(matches!(
            store.hotkey_binding(),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_watcher_reports_writes() {
        let (_dir, store) = store();
        let mut watcher = store.watch().unwrap();

        store.set_hotkey_binding("<Super>t").unwrap();

        let changed = tokio::time::timeout(Duration::from_secs(5), watcher.changed()).await;
        assert_eq!(changed.unwrap(), Some(()));
    }
}
