//! Hotkey bindings and key-combination recording.

use super::keys;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Canonical hotkey: the set of held key tokens, sorted and joined by `+`.
///
/// `{"ctrl", "a"}` and `{"a", "ctrl"}` both become `"a+ctrl"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HotkeyBinding(String);

impl HotkeyBinding {
    /// Canonicalize a set of key tokens. `None` when no keys are given.
    pub fn from_keys<I, S>(keys: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = keys
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if set.is_empty() {
            return None;
        }
        Some(Self(set.into_iter().collect::<Vec<_>>().join("+")))
    }

    /// Parse a stored binding, normalizing token order.
    pub fn parse(s: &str) -> Option<Self> {
        Self::from_keys(s.split('+'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split('+')
    }
}

impl fmt::Display for HotkeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collects key-downs while a hotkey is being recorded.
#[derive(Debug, Default)]
pub struct KeyRecorder {
    pressed: BTreeSet<String>,
}

impl KeyRecorder {
    pub fn clear(&mut self) {
        self.pressed.clear();
    }

    /// Record a key-down. Returns false for a key already held.
    pub fn press(&mut self, token: &str) -> bool {
        self.pressed.insert(token.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty()
    }

    /// True once any non-modifier key has been pressed.
    pub fn has_key(&self) -> bool {
        self.pressed.iter().any(|token| !keys::is_modifier(token))
    }

    /// Live label, e.g. `a + ctrl`.
    pub fn label(&self) -> String {
        self.pressed
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" + ")
    }

    pub fn finish(&self) -> Option<HotkeyBinding> {
        HotkeyBinding::from_keys(&self.pressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        let a = HotkeyBinding::from_keys(["ctrl", "a"]).unwrap();
        let b = HotkeyBinding::from_keys(["a", "ctrl"]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "a+ctrl");
    }

    #[test]
    fn test_empty_set_has_no_binding() {
        assert!(HotkeyBinding::from_keys(Vec::<String>::new()).is_none());
        assert!(HotkeyBinding::parse("").is_none());
    }

    #[test]
    fn test_parse_normalizes() {
        let binding = HotkeyBinding::parse("shift+Ctrl+m").unwrap();
        assert_eq!(binding.as_str(), "ctrl+m+shift");
        assert_eq!(binding.tokens().collect::<Vec<_>>(), vec!["ctrl", "m", "shift"]);
    }

    #[test]
    fn test_recorder_dedups_and_labels() {
        let mut recorder = KeyRecorder::default();
        assert!(recorder.press("ctrl"));
        assert!(recorder.press("a"));
        assert!(!recorder.press("ctrl"));
        assert_eq!(recorder.label(), "a + ctrl");
        assert_eq!(recorder.finish().unwrap().as_str(), "a+ctrl");

        recorder.clear();
        assert!(recorder.is_empty());
        assert!(recorder.finish().is_none());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let binding = HotkeyBinding::parse("ctrl+m").unwrap();
        assert_eq!(serde_json::to_string(&binding).unwrap(), "\"ctrl+m\"");
    }
}
