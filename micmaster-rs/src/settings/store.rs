//! Settings document persistence.
//!
//! The document is a JSON file holding every profile (in display order)
//! and the active profile index. Loading never fails: a missing or
//! unreadable document is replaced by one holding only the default profile,
//! and older documents are migrated in place. Saving writes a temp file in
//! the same directory and renames it over the target.

use super::profile::{Profile, Theme, DEFAULT_PROFILE};
use super::SettingsError;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Ordered profiles plus the active profile pointer.
///
/// A profile named [`DEFAULT_PROFILE`] always exists and `active_index`
/// always points at an existing profile.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsDocument {
    profiles: Vec<(String, Profile)>,
    active_index: usize,
}

impl Default for SettingsDocument {
    fn default() -> Self {
        Self {
            profiles: vec![(DEFAULT_PROFILE.to_string(), Profile::default())],
            active_index: 0,
        }
    }
}

impl SettingsDocument {
    /// Build a document, restoring its invariants.
    pub fn from_profiles(profiles: Vec<(String, Profile)>, active_index: usize) -> Self {
        let mut document = Self {
            profiles,
            active_index,
        };
        document.ensure_invariants();
        document
    }

    pub fn profiles(&self) -> &[(String, Profile)] {
        &self.profiles
    }

    pub fn names(&self) -> Vec<String> {
        self.profiles.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.profiles.iter().position(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, profile)| profile)
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active_name(&self) -> &str {
        &self.profiles[self.active_index].0
    }

    pub fn active_profile(&self) -> &Profile {
        &self.profiles[self.active_index].1
    }

    pub(crate) fn active_profile_mut(&mut self) -> &mut Profile {
        &mut self.profiles[self.active_index].1
    }

    pub(crate) fn set_active_index(&mut self, index: usize) {
        self.active_index = index;
        self.ensure_invariants();
    }

    pub(crate) fn push(&mut self, name: String, profile: Profile) {
        self.profiles.push((name, profile));
    }

    pub(crate) fn rename_at(&mut self, index: usize, name: String) {
        self.profiles[index].0 = name;
    }

    /// Remove the profile at `index`, keeping the same profile active when
    /// possible. Returns true if the removed profile was the active one.
    pub(crate) fn remove_at(&mut self, index: usize) -> bool {
        self.profiles.remove(index);
        let was_active = index == self.active_index;
        if was_active {
            self.active_index = 0;
        } else if index < self.active_index {
            self.active_index -= 1;
        }
        self.ensure_invariants();
        was_active
    }

    /// Insert a missing default profile, clamp the active index and
    /// normalize every profile. Returns true if anything changed.
    pub(crate) fn ensure_invariants(&mut self) -> bool {
        let mut changed = false;
        if self.position(DEFAULT_PROFILE).is_none() {
            self.profiles
                .insert(0, (DEFAULT_PROFILE.to_string(), Profile::default()));
            if self.profiles.len() > 1 {
                self.active_index += 1;
            }
            changed = true;
        }
        if self.active_index >= self.profiles.len() {
            self.active_index = 0;
            changed = true;
        }
        for (_, profile) in &mut self.profiles {
            changed |= profile.normalize();
        }
        changed
    }
}

struct ProfileMap<'a>(&'a [(String, Profile)]);

impl Serialize for ProfileMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, profile) in self.0 {
            map.serialize_entry(name, profile)?;
        }
        map.end()
    }
}

impl Serialize for SettingsDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut doc = serializer.serialize_struct("SettingsDocument", 2)?;
        doc.serialize_field("profiles", &ProfileMap(&self.profiles))?;
        doc.serialize_field("current_profile", &self.active_index)?;
        doc.end()
    }
}

/// How a loaded document came to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOrigin {
    /// Read as-is
    Existing,
    /// Read and upgraded
    Migrated,
    /// No file existed
    Created,
    /// The file could not be used and was replaced
    Recovered(String),
}

/// Result of [`SettingsStore::load`].
#[derive(Debug)]
pub struct Loaded {
    pub document: SettingsDocument,
    pub origin: LoadOrigin,
    /// Set when a created, migrated or recovered document could not be
    /// written back.
    pub save_error: Option<SettingsError>,
}

/// Reads and writes the settings file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, self-healing as needed.
    pub fn load(&self) -> Loaded {
        let (document, origin) = match fs::read_to_string(&self.path) {
            Ok(text) => match decode(&text) {
                Ok((document, false)) => (document, LoadOrigin::Existing),
                Ok((document, true)) => (document, LoadOrigin::Migrated),
                Err(reason) => {
                    warn!(
                        path = %self.path.display(),
                        reason = %reason,
                        "Settings file is malformed; starting from defaults"
                    );
                    (SettingsDocument::default(), LoadOrigin::Recovered(reason))
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No settings file; creating defaults");
                (SettingsDocument::default(), LoadOrigin::Created)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read settings");
                (
                    SettingsDocument::default(),
                    LoadOrigin::Recovered(e.to_string()),
                )
            }
        };

        let save_error = match origin {
            LoadOrigin::Existing => None,
            _ => self.save(&document).err(),
        };
        if let Some(e) = &save_error {
            warn!(error = %e, "Failed to write settings after load");
        }

        debug!(
            profiles = document.len(),
            active = document.active_name(),
            origin = ?origin,
            "Settings loaded"
        );
        Loaded {
            document,
            origin,
            save_error,
        }
    }

    /// Write the whole document atomically.
    pub fn save(&self, document: &SettingsDocument) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(document)?;
        self.write_atomic(json.as_bytes())
            .map_err(|source| SettingsError::Persistence {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }

    fn write_atomic(&self, bytes: &[u8]) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Parse and migrate a document. Returns whether migration changed it.
fn decode(text: &str) -> Result<(SettingsDocument, bool), String> {
    let mut root: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let root_map = root
        .as_object_mut()
        .ok_or_else(|| "document is not an object".to_string())?;

    let mut migrated = false;

    let profiles = match root_map.remove("profiles") {
        Some(Value::Object(map)) => map,
        None => {
            migrated = true;
            Map::new()
        }
        Some(_) => return Err("'profiles' is not an object".to_string()),
    };

    let active_index = match root_map.get("current_profile").and_then(Value::as_u64) {
        Some(index) => index as usize,
        None => {
            migrated = true;
            0
        }
    };

    let defaults = profile_defaults();
    let mut decoded = Vec::with_capacity(profiles.len());
    for (name, mut value) in profiles {
        migrated |= migrate_profile(&mut value, &defaults);
        let profile: Profile = serde_json::from_value(value)
            .map_err(|e| format!("profile '{name}': {e}"))?;
        decoded.push((name, profile));
    }

    let mut document = SettingsDocument {
        profiles: decoded,
        active_index,
    };
    migrated |= document.ensure_invariants();
    Ok((document, migrated))
}

fn profile_defaults() -> Map<String, Value> {
    match serde_json::to_value(Profile::default()) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Bring one stored profile up to the current shape.
///
/// Missing fields are filled from defaults, fields of the wrong type are
/// reset, the volume is clamped and the theme is normalized.
fn migrate_profile(value: &mut Value, defaults: &Map<String, Value>) -> bool {
    let Value::Object(map) = value else {
        return false;
    };
    let mut changed = false;

    for (key, default_value) in defaults {
        match map.get_mut(key) {
            None => {
                map.insert(key.clone(), default_value.clone());
                changed = true;
            }
            Some(current) => {
                changed |= migrate_field(key, current, default_value);
            }
        }
    }
    changed
}

fn migrate_field(key: &str, current: &mut Value, default_value: &Value) -> bool {
    let replacement = match key {
        "volume" => match current.as_f64() {
            Some(v) => {
                let clamped = v.round().clamp(0.0, 100.0) as u64;
                (current.as_u64() != Some(clamped)).then(|| Value::from(clamped))
            }
            None => Some(default_value.clone()),
        },
        "theme" => {
            let theme = current
                .as_str()
                .and_then(|s| s.parse::<Theme>().ok())
                .unwrap_or_default();
            (current.as_str() != Some(theme.as_str())).then(|| Value::from(theme.as_str()))
        }
        "hotkey" => match current {
            Value::Null => None,
            Value::String(s) if !s.trim().is_empty() => None,
            _ => Some(Value::Null),
        },
        "auto_mute_apps" => match current {
            Value::Array(items) if items.iter().all(Value::is_string) => None,
            Value::Array(items) => Some(Value::Array(
                items.iter().filter(|v| v.is_string()).cloned().collect(),
            )),
            _ => Some(default_value.clone()),
        },
        _ => {
            let same_kind = std::mem::discriminant(current) == std::mem::discriminant(default_value);
            (!same_kind).then(|| default_value.clone())
        }
    };

    match replacement {
        Some(value) => {
            *current = value;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::HotkeyBinding;
    use serde_json::json;
    use tempfile::tempdir;

    fn store_in(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("settings.json"))
    }

    #[test]
    fn test_missing_file_creates_and_persists_defaults() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        let loaded = store.load();
        assert_eq!(loaded.origin, LoadOrigin::Created);
        assert!(loaded.save_error.is_none());
        assert_eq!(loaded.document, SettingsDocument::default());
        assert!(store.path().exists());

        assert_eq!(store.load().origin, LoadOrigin::Existing);
    }

    #[test]
    fn test_corrupt_file_is_replaced() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{ not json").unwrap();

        let loaded = store.load();
        assert!(matches!(loaded.origin, LoadOrigin::Recovered(_)));
        assert_eq!(loaded.document.names(), vec!["Default"]);

        let text = fs::read_to_string(store.path()).unwrap();
        assert!(serde_json::from_str::<Value>(&text).is_ok());
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        let work = Profile {
            volume: 40,
            theme: Theme::Light,
            auto_mute_enabled: true,
            auto_mute_watchlist: vec!["teams.exe".into()],
            hotkey: HotkeyBinding::parse("ctrl+m"),
            ..Profile::default()
        };
        let document = SettingsDocument::from_profiles(
            vec![
                ("Default".into(), Profile::default()),
                ("Zeta".into(), Profile::default()),
                ("Work".into(), work),
            ],
            2,
        );

        store.save(&document).unwrap();
        let loaded = store.load();
        assert_eq!(loaded.origin, LoadOrigin::Existing);
        assert_eq!(loaded.document, document);
        assert_eq!(loaded.document.names(), vec!["Default", "Zeta", "Work"]);
    }

    #[test]
    fn test_saved_format() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&SettingsDocument::default()).unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(value["current_profile"], 0);
        assert_eq!(value["profiles"]["Default"]["volume"], 100);
        assert_eq!(value["profiles"]["Default"]["enable_logging"], true);
        assert_eq!(value["profiles"]["Default"]["auto_mute_apps"], json!([]));
    }

    #[test]
    fn test_migrates_old_document() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let old = json!({
            "profiles": {
                "Work": {
                    "volume": 250,
                    "theme": "Solarized",
                    "enable_auto_mute": true,
                    "auto_mute_apps": ["teams.exe", "Teams.exe", 7]
                }
            },
            "current_profile": 0
        });
        fs::write(store.path(), old.to_string()).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.origin, LoadOrigin::Migrated);
        let document = loaded.document;
        assert_eq!(document.names(), vec!["Default", "Work"]);
        assert_eq!(document.active_name(), "Work");

        let work = document.get("Work").unwrap();
        assert_eq!(work.volume, 100);
        assert_eq!(work.theme, Theme::Dark);
        assert!(work.auto_mute_enabled);
        assert_eq!(work.auto_mute_watchlist, vec!["teams.exe"]);
        assert!(work.logging_enabled);

        assert_eq!(store.load().origin, LoadOrigin::Existing);
    }

    #[test]
    fn test_stale_active_index_is_clamped() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let doc = json!({
            "profiles": { "Default": serde_json::to_value(Profile::default()).unwrap() },
            "current_profile": 9
        });
        fs::write(store.path(), doc.to_string()).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.origin, LoadOrigin::Migrated);
        assert_eq!(loaded.document.active_index(), 0);
    }

    #[test]
    fn test_unwritable_location_reports_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let store = SettingsStore::new(blocker.join("settings.json"));

        let loaded = store.load();
        assert!(matches!(
            loaded.save_error,
            Some(SettingsError::Persistence { .. })
        ));
        assert_eq!(loaded.document, SettingsDocument::default());
    }
}
