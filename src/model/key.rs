use std::fmt;
use std::str::FromStr;

/// Keys without a printable character, recorded by symbolic name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Shift,
    Control,
    Alt,
    Meta,
    CapsLock,
    Enter,
    Tab,
    Backspace,
    Delete,
    Escape,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    F(u8),
}

impl NamedKey {
    const SIMPLE: [(NamedKey, &'static str); 19] = [
        (NamedKey::ArrowUp, "ArrowUp"),
        (NamedKey::ArrowDown, "ArrowDown"),
        (NamedKey::ArrowLeft, "ArrowLeft"),
        (NamedKey::ArrowRight, "ArrowRight"),
        (NamedKey::Shift, "Shift"),
        (NamedKey::Control, "Control"),
        (NamedKey::Alt, "Alt"),
        (NamedKey::Meta, "Meta"),
        (NamedKey::CapsLock, "CapsLock"),
        (NamedKey::Enter, "Enter"),
        (NamedKey::Tab, "Tab"),
        (NamedKey::Backspace, "Backspace"),
        (NamedKey::Delete, "Delete"),
        (NamedKey::Escape, "Escape"),
        (NamedKey::Home, "Home"),
        (NamedKey::End, "End"),
        (NamedKey::PageUp, "PageUp"),
        (NamedKey::PageDown, "PageDown"),
        (NamedKey::Insert, "Insert"),
    ];
}

impl fmt::Display for NamedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let NamedKey::F(n) = self {
            return write!(f, "F{}", n);
        }
        let name = Self::SIMPLE
            .iter()
            .find(|(key, _)| key == self)
            .map(|(_, name)| *name)
            .unwrap_or("Unknown");
        f.write_str(name)
    }
}

impl FromStr for NamedKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((key, _)) = Self::SIMPLE.iter().find(|(_, name)| *name == s) {
            return Ok(*key);
        }
        // F1..F24
        if let Some(n) = s.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
            if (1..=24).contains(&n) {
                return Ok(NamedKey::F(n));
            }
        }
        Err(s.to_string())
    }
}

/// A key as carried by a `key_press` step.
///
/// Printable keys keep their literal character; everything else uses a
/// `NamedKey`. The string form of a step's `key` field is a single character
/// for the former and the symbolic name for the latter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyInput {
    Char(char),
    Named(NamedKey),
}

impl KeyInput {
    /// Classify a captured key.
    ///
    /// `text` is what the OS reports the key would type (if anything);
    /// `fallback` is used when that text is missing or not printable.
    pub fn from_captured(text: Option<&str>, fallback: NamedKey) -> Self {
        match text.and_then(printable_char) {
            Some(c) => KeyInput::Char(c),
            None => KeyInput::Named(fallback),
        }
    }

    /// Parse the `key` field of a stored step.
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(c) = printable_char(s) {
            return Some(KeyInput::Char(c));
        }
        s.parse::<NamedKey>().ok().map(KeyInput::Named)
    }
}

impl fmt::Display for KeyInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyInput::Char(c) => write!(f, "{}", c),
            KeyInput::Named(key) => write!(f, "{}", key),
        }
    }
}

fn printable_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_control() => Some(c),
        _ => None,
    }
}
