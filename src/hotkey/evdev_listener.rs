//! evdev-based accelerator shell
//!
//! Uses the Linux evdev interface to detect key presses at the kernel level.
//! This works on all Wayland compositors because it bypasses the display server.
//!
//! The user must be in the 'input' group to access /dev/input/* devices.

use super::{Accelerator, AcceleratorShell, HotkeyEvent, Modifier};
use crate::error::HotkeyError;
use evdev::{Device, InputEventKind, Key};
use std::collections::{HashMap, HashSet};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

/// Physical keys that satisfy a modifier group
fn modifier_keys(modifier: Modifier) -> [Key; 2] {
    match modifier {
        Modifier::Control => [Key::KEY_LEFTCTRL, Key::KEY_RIGHTCTRL],
        Modifier::Alt => [Key::KEY_LEFTALT, Key::KEY_RIGHTALT],
        Modifier::Shift => [Key::KEY_LEFTSHIFT, Key::KEY_RIGHTSHIFT],
        Modifier::Super => [Key::KEY_LEFTMETA, Key::KEY_RIGHTMETA],
    }
}

const ALL_MODIFIERS: [Modifier; 4] = [
    Modifier::Control,
    Modifier::Alt,
    Modifier::Shift,
    Modifier::Super,
];

/// Which modifier groups must be held, and which must not
#[derive(Debug, Clone)]
struct ModifierMatch {
    required: Vec<[Key; 2]>,
    forbidden: Vec<[Key; 2]>,
}

impl ModifierMatch {
    fn new(accelerator: &Accelerator) -> Self {
        let (required, forbidden): (Vec<&Modifier>, Vec<&Modifier>) = ALL_MODIFIERS
            .iter()
            .partition(|m| accelerator.modifiers().contains(*m));
        Self {
            required: required.into_iter().map(|m| modifier_keys(*m)).collect(),
            forbidden: forbidden.into_iter().map(|m| modifier_keys(*m)).collect(),
        }
    }

    fn is_modifier(key: Key) -> bool {
        ALL_MODIFIERS
            .iter()
            .any(|m| modifier_keys(*m).contains(&key))
    }

    fn satisfied(&self, held: &HashSet<Key>) -> bool {
        let group_held = |group: &[Key; 2]| group.iter().any(|k| held.contains(k));
        self.required.iter().all(group_held) && !self.forbidden.iter().any(group_held)
    }
}

/// Listener for one accelerator
pub struct EvdevListener {
    /// The key to listen for
    target_key: Key,
    modifiers: ModifierMatch,
    /// Paths to keyboard devices
    device_paths: Vec<PathBuf>,
    /// Signal to stop the listener task
    stop_signal: Option<oneshot::Sender<()>>,
}

impl EvdevListener {
    /// Create a listener for `accelerator` on every attached keyboard
    pub fn new(accelerator: &Accelerator) -> Result<Self, HotkeyError> {
        let target_key = parse_key_name(accelerator.key())?;
        let device_paths = find_keyboard_devices()?;

        if device_paths.is_empty() {
            return Err(HotkeyError::NoKeyboard);
        }

        tracing::debug!(
            "Found {} keyboard device(s): {:?}",
            device_paths.len(),
            device_paths
        );

        Ok(Self {
            target_key,
            modifiers: ModifierMatch::new(accelerator),
            device_paths,
            stop_signal: None,
        })
    }

    /// Start watching; activations are reported as `id`
    pub fn start(&mut self, id: String, tx: mpsc::Sender<HotkeyEvent>) {
        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_signal = Some(stop_tx);

        let target_key = self.target_key;
        let modifiers = self.modifiers.clone();
        let device_paths = self.device_paths.clone();

        tokio::task::spawn_blocking(move || {
            evdev_listener_loop(device_paths, target_key, modifiers, id, tx, stop_rx);
        });
    }

    pub fn stop(&mut self) {
        if let Some(stop) = self.stop_signal.take() {
            let _ = stop.send(());
        }
    }
}

impl Drop for EvdevListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Accelerator shell keeping one evdev listener per binding id
pub struct EvdevShell {
    events: mpsc::Sender<HotkeyEvent>,
    listeners: HashMap<String, EvdevListener>,
}

impl EvdevShell {
    pub fn new(events: mpsc::Sender<HotkeyEvent>) -> Self {
        Self {
            events,
            listeners: HashMap::new(),
        }
    }
}

#[async_trait::async_trait]
impl AcceleratorShell for EvdevShell {
    async fn register(
        &mut self,
        id: &str,
        accelerator: &Accelerator,
    ) -> Result<(), HotkeyError> {
        if let Some(mut previous) = self.listeners.remove(id) {
            previous.stop();
        }

        let mut listener = EvdevListener::new(accelerator)?;
        listener.start(id.to_string(), self.events.clone());
        tracing::info!("Listening for {} ({})", accelerator, id);
        self.listeners.insert(id.to_string(), listener);
        Ok(())
    }

    async fn unregister(&mut self, id: &str) -> Result<(), HotkeyError> {
        if let Some(mut listener) = self.listeners.remove(id) {
            listener.stop();
            tracing::debug!("Stopped listening for {}", id);
        }
        Ok(())
    }
}

/// Main listener loop running in a blocking task
fn evdev_listener_loop(
    device_paths: Vec<PathBuf>,
    target_key: Key,
    modifiers: ModifierMatch,
    id: String,
    tx: mpsc::Sender<HotkeyEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    // Open all keyboard devices in non-blocking mode
    let mut devices: Vec<Device> = device_paths
        .iter()
        .filter_map(|path| match Device::open(path) {
            Ok(device) => {
                // fetch_events must return immediately when idle
                let fd = device.as_raw_fd();
                unsafe {
                    let flags = libc::fcntl(fd, libc::F_GETFL);
                    if flags != -1 {
                        libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                    }
                }
                tracing::debug!("Opened device (non-blocking): {:?}", path);
                Some(device)
            }
            Err(e) => {
                tracing::warn!("Failed to open {:?}: {}", path, e);
                None
            }
        })
        .collect();

    if devices.is_empty() {
        tracing::error!("No keyboard devices could be opened");
        return;
    }

    let mut held_modifiers: HashSet<Key> = HashSet::new();
    // Suppresses auto-repeat until the key is released
    let mut is_pressed = false;

    loop {
        match stop_rx.try_recv() {
            Ok(_) | Err(oneshot::error::TryRecvError::Closed) => {
                tracing::debug!("Hotkey listener stopping");
                return;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
        }

        for device in &mut devices {
            let Ok(events) = device.fetch_events() else {
                continue;
            };
            for event in events {
                let InputEventKind::Key(key) = event.kind() else {
                    continue;
                };
                let value = event.value();

                if ModifierMatch::is_modifier(key) {
                    match value {
                        1 => {
                            held_modifiers.insert(key);
                        }
                        0 => {
                            held_modifiers.remove(&key);
                        }
                        _ => {}
                    }
                }

                if key != target_key {
                    continue;
                }

                match value {
                    1 if !is_pressed && modifiers.satisfied(&held_modifiers) => {
                        is_pressed = true;
                        tracing::debug!("Hotkey pressed");
                        if tx.blocking_send(HotkeyEvent::Activated(id.clone())).is_err() {
                            return;
                        }
                    }
                    0 => is_pressed = false,
                    _ => {}
                }
            }
        }

        std::thread::sleep(std::time::Duration::from_millis(5));
    }
}

/// Find all keyboard input devices
fn find_keyboard_devices() -> Result<Vec<PathBuf>, HotkeyError> {
    let mut keyboards = Vec::new();

    let input_dir = std::fs::read_dir("/dev/input")
        .map_err(|e| HotkeyError::DeviceAccess(format!("/dev/input: {}", e)))?;

    for entry in input_dir {
        let entry = entry.map_err(|e| HotkeyError::DeviceAccess(e.to_string()))?;
        let path = entry.path();

        let is_event_device = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false);

        if !is_event_device {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                // A keyboard should have at least some letter keys
                let has_keys = device
                    .supported_keys()
                    .map(|keys| {
                        keys.contains(Key::KEY_A)
                            && keys.contains(Key::KEY_Z)
                            && keys.contains(Key::KEY_ENTER)
                    })
                    .unwrap_or(false);

                if has_keys {
                    tracing::debug!(
                        "Found keyboard: {:?} ({:?})",
                        path,
                        device.name().unwrap_or("unknown")
                    );
                    keyboards.push(path);
                }
            }
            Err(e) => {
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    return Err(HotkeyError::DeviceAccess(path.display().to_string()));
                }
                tracing::trace!("Skipping {:?}: {}", path, e);
            }
        }
    }

    Ok(keyboards)
}

/// Map an accelerator key name to the evdev key
fn parse_key_name(name: &str) -> Result<Key, HotkeyError> {
    let key = match name {
        "A" => Key::KEY_A,
        "B" => Key::KEY_B,
        "C" => Key::KEY_C,
        "D" => Key::KEY_D,
        "E" => Key::KEY_E,
        "F" => Key::KEY_F,
        "G" => Key::KEY_G,
        "H" => Key::KEY_H,
        "I" => Key::KEY_I,
        "J" => Key::KEY_J,
        "K" => Key::KEY_K,
        "L" => Key::KEY_L,
        "M" => Key::KEY_M,
        "N" => Key::KEY_N,
        "O" => Key::KEY_O,
        "P" => Key::KEY_P,
        "Q" => Key::KEY_Q,
        "R" => Key::KEY_R,
        "S" => Key::KEY_S,
        "T" => Key::KEY_T,
        "U" => Key::KEY_U,
        "V" => Key::KEY_V,
        "W" => Key::KEY_W,
        "X" => Key::KEY_X,
        "Y" => Key::KEY_Y,
        "Z" => Key::KEY_Z,

        "0" => Key::KEY_0,
        "1" => Key::KEY_1,
        "2" => Key::KEY_2,
        "3" => Key::KEY_3,
        "4" => Key::KEY_4,
        "5" => Key::KEY_5,
        "6" => Key::KEY_6,
        "7" => Key::KEY_7,
        "8" => Key::KEY_8,
        "9" => Key::KEY_9,

        // F13-F24 are often unused and make good hotkeys
        "F1" => Key::KEY_F1,
        "F2" => Key::KEY_F2,
        "F3" => Key::KEY_F3,
        "F4" => Key::KEY_F4,
        "F5" => Key::KEY_F5,
        "F6" => Key::KEY_F6,
        "F7" => Key::KEY_F7,
        "F8" => Key::KEY_F8,
        "F9" => Key::KEY_F9,
        "F10" => Key::KEY_F10,
        "F11" => Key::KEY_F11,
        "F12" => Key::KEY_F12,
        "F13" => Key::KEY_F13,
        "F14" => Key::KEY_F14,
        "F15" => Key::KEY_F15,
        "F16" => Key::KEY_F16,
        "F17" => Key::KEY_F17,
        "F18" => Key::KEY_F18,
        "F19" => Key::KEY_F19,
        "F20" => Key::KEY_F20,
        "F21" => Key::KEY_F21,
        "F22" => Key::KEY_F22,
        "F23" => Key::KEY_F23,
        "F24" => Key::KEY_F24,

        "SCROLLLOCK" => Key::KEY_SCROLLLOCK,
        "PAUSE" => Key::KEY_PAUSE,
        "INSERT" => Key::KEY_INSERT,
        "HOME" => Key::KEY_HOME,
        "END" => Key::KEY_END,
        "PAGEUP" => Key::KEY_PAGEUP,
        "PAGEDOWN" => Key::KEY_PAGEDOWN,
        "DELETE" => Key::KEY_DELETE,
        "SYSRQ" => Key::KEY_SYSRQ,

        "SPACE" => Key::KEY_SPACE,
        "ENTER" => Key::KEY_ENTER,
        "TAB" => Key::KEY_TAB,
        "BACKSPACE" => Key::KEY_BACKSPACE,
        "ESC" => Key::KEY_ESC,
        "GRAVE" => Key::KEY_GRAVE,
        "MINUS" => Key::KEY_MINUS,
        "EQUAL" => Key::KEY_EQUAL,
        "COMMA" => Key::KEY_COMMA,
        "DOT" => Key::KEY_DOT,
        "SLASH" => Key::KEY_SLASH,
        "BACKSLASH" => Key::KEY_BACKSLASH,
        "SEMICOLON" => Key::KEY_SEMICOLON,
        "APOSTROPHE" => Key::KEY_APOSTROPHE,
        "LEFTBRACE" => Key::KEY_LEFTBRACE,
        "RIGHTBRACE" => Key::KEY_RIGHTBRACE,

        _ => return Err(HotkeyError::UnknownKey(name.to_string())),
    };

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(accel: &str) -> ModifierMatch {
        ModifierMatch::new(&accel.parse().unwrap())
    }

    #[test]
    fn test_parse_key_name() {
        assert_eq!(parse_key_name("T").unwrap(), Key::KEY_T);
        assert_eq!(parse_key_name("7").unwrap(), Key::KEY_7);
        assert_eq!(parse_key_name("F13").unwrap(), Key::KEY_F13);
        assert_eq!(parse_key_name("SCROLLLOCK").unwrap(), Key::KEY_SCROLLLOCK);
        assert_eq!(parse_key_name("DOT").unwrap(), Key::KEY_DOT);
    }

    #[test]
    fn test_parse_key_name_error() {
        assert!(parse_key_name("INVALID_KEY_NAME").is_err());
    }

    #[test]
    fn test_every_accelerator_key_maps_to_evdev() {
        for accel in ["<Super>t", "F24", "<Alt>period", "<Control>bracketleft", "Print"] {
            let parsed: Accelerator = accel.parse().unwrap();
            assert!(parse_key_name(parsed.key()).is_ok(), "{}", accel);
        }
    }

    #[test]
    fn test_either_side_satisfies_modifier() {
        let m = matcher("<Super>t");
        assert!(m.satisfied(&HashSet::from([Key::KEY_LEFTMETA])));
        assert!(m.satisfied(&HashSet::from([Key::KEY_RIGHTMETA])));
        assert!(!m.satisfied(&HashSet::new()));
    }

    #[test]
    fn test_extra_modifiers_do_not_match() {
        let m = matcher("<Super>t");
        assert!(!m.satisfied(&HashSet::from([Key::KEY_LEFTMETA, Key::KEY_LEFTSHIFT])));

        let m = matcher("<Control><Alt>F13");
        assert!(m.satisfied(&HashSet::from([Key::KEY_RIGHTCTRL, Key::KEY_LEFTALT])));
        assert!(!m.satisfied(&HashSet::from([Key::KEY_RIGHTCTRL])));
    }

    #[test]
    fn test_is_modifier() {
        assert!(ModifierMatch::is_modifier(Key::KEY_RIGHTALT));
        assert!(!ModifierMatch::is_modifier(Key::KEY_T));
    }
}
