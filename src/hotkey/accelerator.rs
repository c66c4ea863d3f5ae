//! Accelerator strings
//!
//! Bindings are stored the way GNOME stores them: zero or more `<Modifier>`
//! prefixes followed by a key name, e.g. `<Super>t` or `<Control><Alt>F13`.

use crate::error::HotkeyError;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Modifier groups; either the left or the right physical key satisfies one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Control,
    Alt,
    Shift,
    Super,
}

impl Modifier {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "control" | "ctrl" | "ctl" | "primary" => Some(Modifier::Control),
            "alt" | "mod1" => Some(Modifier::Alt),
            "shift" | "shft" => Some(Modifier::Shift),
            "super" | "meta" | "hyper" | "mod4" => Some(Modifier::Super),
            _ => None,
        }
    }
}

/// A parsed accelerator: modifier set plus one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accelerator {
    text: String,
    modifiers: BTreeSet<Modifier>,
    /// evdev-style key name without the `KEY_` prefix, e.g. "T", "F13", "SPACE"
    key: String,
}

impl Accelerator {
    pub fn modifiers(&self) -> &BTreeSet<Modifier> {
        &self.modifiers
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The accelerator as written in the settings store
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Accelerator {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || HotkeyError::InvalidAccelerator(text.to_string());

        let mut modifiers = BTreeSet::new();
        let mut rest = text;
        while let Some(after_open) = rest.strip_prefix('<') {
            let close = after_open.find('>').ok_or_else(invalid)?;
            let modifier = Modifier::parse(&after_open[..close]).ok_or_else(invalid)?;
            modifiers.insert(modifier);
            rest = &after_open[close + 1..];
        }

        if rest.is_empty() || rest.contains(['<', '>']) || rest.contains(char::is_whitespace) {
            return Err(invalid());
        }

        let key = key_name(rest).ok_or_else(|| HotkeyError::UnknownKey(rest.to_string()))?;

        Ok(Self {
            text: text.to_string(),
            modifiers,
            key,
        })
    }
}

/// Map a GDK key name to the evdev-style name used by the listener
fn key_name(name: &str) -> Option<String> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphanumeric() {
            return Some(c.to_ascii_uppercase().to_string());
        }
    }

    if let Some(number) = name
        .strip_prefix('F')
        .or_else(|| name.strip_prefix('f'))
        .and_then(|n| n.parse::<u8>().ok())
    {
        return (1..=24).contains(&number).then(|| format!("F{}", number));
    }

    let mapped = match name.to_ascii_lowercase().as_str() {
        "space" => "SPACE",
        "return" | "enter" => "ENTER",
        "tab" => "TAB",
        "escape" | "esc" => "ESC",
        "backspace" => "BACKSPACE",
        "pause" => "PAUSE",
        "scroll_lock" | "scrolllock" => "SCROLLLOCK",
        "insert" => "INSERT",
        "delete" => "DELETE",
        "home" => "HOME",
        "end" => "END",
        "page_up" | "prior" => "PAGEUP",
        "page_down" | "next" => "PAGEDOWN",
        "print" => "SYSRQ",
        "grave" => "GRAVE",
        "minus" => "MINUS",
        "equal" => "EQUAL",
        "comma" => "COMMA",
        "period" => "DOT",
        "slash" => "SLASH",
        "backslash" => "BACKSLASH",
        "semicolon" => "SEMICOLON",
        "apostrophe" => "APOSTROPHE",
        "bracketleft" => "LEFTBRACE",
        "bracketright" => "RIGHTBRACE",
        _ => return None,
    };
    Some(mapped.to_string())
}
