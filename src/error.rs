//! Error types for translator-hotkey
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the translator-hotkey application
#[derive(Error, Debug)]
pub enum TranslatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    #[error("Backend error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to hotkey binding and detection
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Invalid accelerator '{0}'. Expected something like '<Super>t' or '<Control><Alt>F13'.")]
    InvalidAccelerator(String),

    #[error("Unknown key name: '{0}'. Use evtest or wev to find valid key names.")]
    UnknownKey(String),

    #[error("Cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("No keyboard device found in /dev/input/")]
    NoKeyboard,

    #[error("Global hotkeys are not supported on this platform: {0}")]
    NotSupported(String),

    #[error("evdev error: {0}")]
    Evdev(String),
}

/// Errors returned by calls to the translator backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// No connection to the session bus could be established
    #[error("Backend connection unavailable: {0}")]
    Unavailable(String),

    /// The bus or the backend answered with a named D-Bus error
    #[error("{name}: {message}")]
    Remote { name: String, message: String },

    /// Any other failure while talking to the backend
    #[error("Transport failure: {0}")]
    Transport(String),
}

/// Errors related to the persistent settings store
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Cannot read settings file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Invalid settings file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Cannot write settings file {path}: {message}")]
    Write { path: String, message: String },

    #[error("Cannot watch settings file: {0}")]
    Watch(String),
}

/// Result type alias using TranslatorError
pub type Result<T> = std::result::Result<T, TranslatorError>;

impl From<zbus::Error> for RpcError {
    fn from(e: zbus::Error) -> Self {
        match e {
            zbus::Error::MethodError(name, detail, _) => RpcError::Remote {
                name: name.to_string(),
                message: detail.unwrap_or_default(),
            },
            zbus::Error::FDO(fdo) => RpcError::from(*fdo),
            zbus::Error::InputOutput(io) => RpcError::Unavailable(io.to_string()),
            zbus::Error::Address(address) => RpcError::Unavailable(address),
            other => RpcError::Transport(other.to_string()),
        }
    }
}

impl From<zbus::fdo::Error> for RpcError {
    fn from(e: zbus::fdo::Error) -> Self {
        use crate::rpc::markers;
        use zbus::fdo::Error as Fdo;

        let remote = |name: &str, message: String| RpcError::Remote {
            name: name.to_string(),
            message,
        };

        match e {
            Fdo::ServiceUnknown(message) => remote(markers::SERVICE_UNKNOWN, message),
            Fdo::UnknownObject(message) => remote(markers::UNKNOWN_OBJECT, message),
            Fdo::UnknownMethod(message) => remote(markers::UNKNOWN_METHOD, message),
            Fdo::ZBus(inner) => RpcError::from(inner),
            other => RpcError::Transport(other.to_string()),
        }
    }
}
