//! Key chords and binding modes.
//!
//! ## Key chord notation
//!
//! A chord is written `mod-mod-key`, e.g. `alt-shift-h` or `cmd-enter`.
//! Modifiers are `cmd`, `alt`, `ctrl` and `shift`.  The canonical form lists
//! modifiers in that order and lowercases the key, so `Shift-Alt-H` and
//! `alt-shift-h` name the same binding.

use std::fmt;
use std::str::FromStr;

use crate::command::Command;

// ── Modifier ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Cmd,
    Alt,
    Ctrl,
    Shift,
}

impl Modifier {
    pub fn name(self) -> &'static str {
        match self {
            Modifier::Cmd   => "cmd",
            Modifier::Alt   => "alt",
            Modifier::Ctrl  => "ctrl",
            Modifier::Shift => "shift",
        }
    }

    /// Canonical order.
    pub const ALL: &'static [Modifier] = &[Modifier::Cmd, Modifier::Alt, Modifier::Ctrl, Modifier::Shift];

    /// Parse a name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        Self::ALL.iter().copied().find(|m| m.name() == lower)
    }
}

// ── KeyChord ──────────────────────────────────────────────────────────────────

/// Named keys accepted besides single letters, digits and `f1`–`f20`.
const NAMED_KEYS: &[&str] = &[
    "esc", "enter", "tab", "space", "backspace", "left", "right", "up", "down",
    "minus", "equal", "comma", "period", "slash", "backslash", "semicolon",
    "quote", "backtick", "leftsquarebracket", "rightsquarebracket",
    "pageup", "pagedown", "home", "end", "forwarddelete",
    "keypad0", "keypad1", "keypad2", "keypad3", "keypad4", "keypad5",
    "keypad6", "keypad7", "keypad8", "keypad9", "keypadclear",
    "keypaddecimalmark", "keypaddivide", "keypadenter", "keypadequal",
    "keypadminus", "keypadmultiply", "keypadplus",
];

fn is_known_key(key: &str) -> bool {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c.is_ascii_alphanumeric(),
        _ => {
            NAMED_KEYS.contains(&key)
                || key
                    .strip_prefix('f')
                    .and_then(|n| n.parse::<u8>().ok())
                    .is_some_and(|n| (1..=20).contains(&n))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyChord {
    /// Sorted, without duplicates.
    modifiers: Vec<Modifier>,
    key: String,
}

impl KeyChord {
    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl FromStr for KeyChord {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        let mut parts: Vec<&str> = s.split('-').collect();
        let key = parts.pop().unwrap_or_default().to_ascii_lowercase();
        if key.is_empty() {
            return Err(format!("Can't parse '{s}' binding: missing key"));
        }
        if !is_known_key(&key) {
            return Err(format!("Can't parse the key in '{s}' binding: unknown key '{key}'"));
        }

        let mut modifiers = Vec::new();
        for part in parts {
            let m = Modifier::from_name(part)
                .ok_or_else(|| format!("Can't parse modifiers in '{s}' binding: unknown modifier '{part}'"))?;
            if !modifiers.contains(&m) {
                modifiers.push(m);
            }
        }
        modifiers.sort();
        Ok(KeyChord { modifiers, key })
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{}-", m.name())?;
        }
        f.write_str(&self.key)
    }
}

// ── Mode ──────────────────────────────────────────────────────────────────────

/// What a key chord is bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct HotkeyBinding {
    pub chord: KeyChord,
    pub commands: Vec<Command>,
}

impl HotkeyBinding {
    /// Canonical chord description; the key under which the binding is
    /// stored.
    pub fn description(&self) -> String {
        self.chord.to_string()
    }
}

/// A named set of bindings, kept in the order they were first added.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mode {
    pub name: String,
    bindings: Vec<HotkeyBinding>,
}

impl Mode {
    pub fn new(name: impl Into<String>) -> Self {
        Mode { name: name.into(), bindings: Vec::new() }
    }

    /// Bind, replacing any binding for the same chord in place.
    pub fn set(&mut self, binding: HotkeyBinding) {
        match self.bindings.iter_mut().find(|b| b.chord == binding.chord) {
            Some(existing) => *existing = binding,
            None => self.bindings.push(binding),
        }
    }

    /// Remove the binding whose canonical description is `description`.
    pub fn remove(&mut self, description: &str) -> Option<HotkeyBinding> {
        let pos = self.bindings.iter().position(|b| b.description() == description)?;
        Some(self.bindings.remove(pos))
    }

    pub fn lookup(&self, chord: &KeyChord) -> Option<&HotkeyBinding> {
        self.bindings.iter().find(|b| &b.chord == chord)
    }

    pub fn bindings(&self) -> &[HotkeyBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
