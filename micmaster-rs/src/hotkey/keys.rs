//! Key tokens and virtual-key codes.
//!
//! Tokens are the lowercase names used in stored bindings (`ctrl`, `shift`,
//! `alt`, `windows`, `a`, `f5`, `page up`, ...).

use super::binding::HotkeyBinding;
use super::HotkeyError;

/// Held modifier keys of a chord.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub windows: bool,
}

impl Modifiers {
    fn set(&mut self, token: &str) -> bool {
        match token {
            "ctrl" => self.ctrl = true,
            "shift" => self.shift = true,
            "alt" => self.alt = true,
            "windows" => self.windows = true,
            _ => return false,
        }
        true
    }
}

/// A binding resolved to modifiers plus exactly one virtual key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chord {
    pub modifiers: Modifiers,
    pub vk: u16,
}

const NAMED_KEYS: &[(&str, u16)] = &[
    ("backspace", 0x08),
    ("tab", 0x09),
    ("enter", 0x0D),
    ("pause", 0x13),
    ("caps lock", 0x14),
    ("esc", 0x1B),
    ("space", 0x20),
    ("page up", 0x21),
    ("page down", 0x22),
    ("end", 0x23),
    ("home", 0x24),
    ("left", 0x25),
    ("up", 0x26),
    ("right", 0x27),
    ("down", 0x28),
    ("print screen", 0x2C),
    ("insert", 0x2D),
    ("delete", 0x2E),
    ("num lock", 0x90),
    ("scroll lock", 0x91),
    ("volume mute", 0xAD),
    ("volume down", 0xAE),
    ("volume up", 0xAF),
    ("play/pause media", 0xB3),
];

pub fn is_modifier(token: &str) -> bool {
    matches!(token, "ctrl" | "shift" | "alt" | "windows")
}

/// Token for a virtual-key code reported by the keyboard hook.
pub fn token_for_vk(vk: u16) -> Option<String> {
    let token = match vk {
        0x10 | 0xA0 | 0xA1 => "shift".to_string(),
        0x11 | 0xA2 | 0xA3 => "ctrl".to_string(),
        0x12 | 0xA4 | 0xA5 => "alt".to_string(),
        0x5B | 0x5C => "windows".to_string(),
        0x30..=0x39 | 0x41..=0x5A => char::from(vk as u8).to_ascii_lowercase().to_string(),
        0x70..=0x87 => format!("f{}", vk - 0x6F),
        _ => NAMED_KEYS
            .iter()
            .find(|(_, code)| *code == vk)
            .map(|(name, _)| name.to_string())?,
    };
    Some(token)
}

/// Virtual-key code for a non-modifier token.
pub fn vk_for_token(token: &str) -> Option<u16> {
    let bytes = token.as_bytes();
    if bytes.len() == 1 {
        let c = bytes[0].to_ascii_uppercase();
        if c.is_ascii_digit() || c.is_ascii_uppercase() {
            return Some(u16::from(c));
        }
    }
    if let Some(n) = token.strip_prefix('f').and_then(|n| n.parse::<u16>().ok()) {
        if (1..=24).contains(&n) {
            return Some(0x6F + n);
        }
    }
    NAMED_KEYS
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, code)| *code)
}

/// Resolve a binding to a registrable chord.
///
/// A chord needs exactly one non-modifier key and every token must be known.
pub fn chord_for(binding: &HotkeyBinding) -> Result<Chord, HotkeyError> {
    let invalid = |reason: &str| HotkeyError::InvalidBinding {
        binding: binding.to_string(),
        reason: reason.to_string(),
    };

    let mut modifiers = Modifiers::default();
    let mut key = None;
    for token in binding.tokens() {
        if modifiers.set(token) {
            continue;
        }
        let vk = vk_for_token(token).ok_or_else(|| invalid(&format!("unknown key '{token}'")))?;
        if key.replace(vk).is_some() {
            return Err(invalid("more than one non-modifier key"));
        }
    }

    let vk = key.ok_or_else(|| invalid("no non-modifier key"))?;
    Ok(Chord { modifiers, vk })
}
