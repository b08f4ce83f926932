//! Session save/load
//!
//! A save is a header, the flag bag, and opaque bincode sections keyed by
//! registry name ("timeline", "evidence", ...). Each registry owns the
//! encoding of its own section.

use crate::flags::FlagSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Current on-disk save version
pub const SAVE_VERSION: u32 = 1;

/// Save system errors
#[derive(Debug, Error)]
pub enum SaveError {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    /// Version mismatch
    #[error("Version mismatch: save version {0}, current version {1}")]
    VersionMismatch(u32, u32),
    /// Slot not found
    #[error("Save slot not found: {0}")]
    SlotNotFound(String),
    /// Section missing from the save
    #[error("Save section not found: {0}")]
    SectionNotFound(String),
}

/// Save file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveFormat {
    /// JSON (human readable)
    Json,
    /// Binary (compact)
    #[default]
    Binary,
}

impl SaveFormat {
    fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Binary => "sav",
        }
    }
}

/// Save data header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveHeader {
    /// Save format version
    pub version: u32,
    /// Save name/title
    pub name: String,
    /// Case/scenario identifier
    pub case_id: String,
    /// Save timestamp (Unix timestamp)
    pub timestamp: u64,
    /// Simulated seconds since the incident
    pub elapsed: f64,
    /// Role active when saved
    pub active_role: String,
}

impl SaveHeader {
    /// Create a new header
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: SAVE_VERSION,
            name: name.into(),
            case_id: String::new(),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            elapsed: 0.0,
            active_role: String::new(),
        }
    }

    /// Set case id
    pub fn with_case(mut self, case_id: impl Into<String>) -> Self {
        self.case_id = case_id.into();
        self
    }

    /// Set simulated time
    pub fn with_elapsed(mut self, elapsed: f64) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Set active role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.active_role = role.into();
        self
    }
}

/// Complete save data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveData {
    /// Save header
    pub header: SaveHeader,
    /// Scene flags
    pub flags: FlagSnapshot,
    /// Registry sections (bincode)
    pub sections: HashMap<String, Vec<u8>>,
}

impl SaveData {
    /// Create new save data
    pub fn new(header: SaveHeader, flags: FlagSnapshot) -> Self {
        Self {
            header,
            flags,
            sections: HashMap::new(),
        }
    }

    /// Store a registry section
    pub fn store_section<T: Serialize>(&mut self, key: impl Into<String>, data: &T) -> Result<(), SaveError> {
        let bytes = bincode::serialize(data)
            .map_err(|e| SaveError::Serialization(e.to_string()))?;
        self.sections.insert(key.into(), bytes);
        Ok(())
    }

    /// Load a registry section
    pub fn load_section<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<T, SaveError> {
        let bytes = self
            .sections
            .get(key)
            .ok_or_else(|| SaveError::SectionNotFound(key.to_string()))?;
        bincode::deserialize(bytes).map_err(|e| SaveError::Deserialization(e.to_string()))
    }

    /// Check if a section is present
    pub fn has_section(&self, key: &str) -> bool {
        self.sections.contains_key(key)
    }
}

/// Save slot info (for listing in a menu)
#[derive(Debug, Clone)]
pub struct SaveSlot {
    /// Slot identifier
    pub id: String,
    /// Save header (or None if empty)
    pub header: Option<SaveHeader>,
    /// File path
    pub path: PathBuf,
}

impl SaveSlot {
    /// Whether slot holds a save
    pub fn is_occupied(&self) -> bool {
        self.header.is_some()
    }
}

/// Save manager
pub struct SaveManager {
    /// Base save directory
    save_dir: PathBuf,
    /// Save file format
    format: SaveFormat,
    /// Highest save version this build can read
    version: u32,
    /// Maximum number of auto-saves
    max_autosaves: usize,
}

impl SaveManager {
    /// Create a new save manager
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
            format: SaveFormat::Binary,
            version: SAVE_VERSION,
            max_autosaves: 3,
        }
    }

    /// Set save format
    pub fn with_format(mut self, format: SaveFormat) -> Self {
        self.format = format;
        self
    }

    /// Set version
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Set max autosaves
    pub fn with_max_autosaves(mut self, max: usize) -> Self {
        self.max_autosaves = max.max(1);
        self
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.save_dir
            .join(format!("{}.{}", slot, self.format.extension()))
    }

    /// Save to slot
    pub fn save(&self, slot: &str, data: &SaveData) -> Result<PathBuf, SaveError> {
        fs::create_dir_all(&self.save_dir)?;
        let path = self.slot_path(slot);

        let bytes = match self.format {
            SaveFormat::Json => serde_json::to_vec_pretty(data)
                .map_err(|e| SaveError::Serialization(e.to_string()))?,
            SaveFormat::Binary => bincode::serialize(data)
                .map_err(|e| SaveError::Serialization(e.to_string()))?,
        };

        fs::write(&path, bytes)?;
        log::info!("Saved session '{}' to {}", data.header.name, path.display());
        Ok(path)
    }

    /// Load from slot
    pub fn load(&self, slot: &str) -> Result<SaveData, SaveError> {
        let path = self.slot_path(slot);
        if !path.exists() {
            return Err(SaveError::SlotNotFound(slot.to_string()));
        }

        let bytes = fs::read(&path)?;
        let data: SaveData = match self.format {
            SaveFormat::Json => serde_json::from_slice(&bytes)
                .map_err(|e| SaveError::Deserialization(e.to_string()))?,
            SaveFormat::Binary => bincode::deserialize(&bytes)
                .map_err(|e| SaveError::Deserialization(e.to_string()))?,
        };

        if data.header.version > self.version {
            return Err(SaveError::VersionMismatch(data.header.version, self.version));
        }

        Ok(data)
    }

    /// Delete a save slot
    pub fn delete(&self, slot: &str) -> Result<(), SaveError> {
        let path = self.slot_path(slot);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Check if slot exists
    pub fn exists(&self, slot: &str) -> bool {
        self.slot_path(slot).exists()
    }

    /// List all save slots, newest first
    pub fn list_slots(&self) -> Result<Vec<SaveSlot>, SaveError> {
        if !self.save_dir.exists() {
            return Ok(Vec::new());
        }

        let mut slots = Vec::new();
        for entry in fs::read_dir(&self.save_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == self.format.extension()).unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    let header = match self.load(stem) {
                        Ok(data) => Some(data.header),
                        Err(e) => {
                            log::warn!("Skipping unreadable save {}: {}", path.display(), e);
                            None
                        }
                    };
                    slots.push(SaveSlot {
                        id: stem.to_string(),
                        header,
                        path,
                    });
                }
            }
        }

        slots.sort_by(|a, b| {
            let ts_a = a.header.as_ref().map(|h| h.timestamp).unwrap_or(0);
            let ts_b = b.header.as_ref().map(|h| h.timestamp).unwrap_or(0);
            ts_b.cmp(&ts_a)
        });

        Ok(slots)
    }

    /// Auto-save, overwriting the oldest (or first empty) autosave slot
    pub fn autosave(&self, data: &SaveData) -> Result<String, SaveError> {
        let mut oldest: Option<(String, u64)> = None;
        for i in 0..self.max_autosaves {
            let slot = format!("autosave_{}", i);
            let timestamp = if self.exists(&slot) {
                self.load(&slot).map(|d| d.header.timestamp).unwrap_or(0)
            } else {
                0
            };
            if oldest.as_ref().map(|(_, ts)| timestamp < *ts).unwrap_or(true) {
                oldest = Some((slot, timestamp));
            }
        }

        let slot = oldest
            .map(|(slot, _)| slot)
            .unwrap_or_else(|| "autosave_0".to_string());
        self.save(&slot, data)?;
        Ok(slot)
    }

    /// Quick save
    pub fn quicksave(&self, data: &SaveData) -> Result<(), SaveError> {
        self.save("quicksave", data).map(|_| ())
    }

    /// Quick load
    pub fn quickload(&self) -> Result<SaveData, SaveError> {
        self.load("quicksave")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{FlagKey, GameFlags};
    use std::env::temp_dir;

    fn sample() -> SaveData {
        let mut flags = GameFlags::new();
        flags.set_bool(FlagKey::HasGlovesOn, true);
        SaveData::new(
            SaveHeader::new("Test Save")
                .with_case("case-17")
                .with_role("Photographer"),
            flags.snapshot(),
        )
    }

    #[test]
    fn test_section_roundtrip() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Section {
            markers: Vec<u32>,
        }

        let mut save = sample();
        let section = Section { markers: vec![1, 2, 5] };
        save.store_section("evidence", &section).unwrap();

        let loaded: Section = save.load_section("evidence").unwrap();
        assert_eq!(loaded, section);
        assert!(matches!(
            save.load_section::<Section>("missing"),
            Err(SaveError::SectionNotFound(_))
        ));
    }

    #[test]
    fn test_save_manager_json() {
        let save_dir = temp_dir().join("csi_test_saves_json");
        let _ = fs::remove_dir_all(&save_dir);

        let manager = SaveManager::new(&save_dir).with_format(SaveFormat::Json);
        manager.save("slot1", &sample()).unwrap();
        assert!(manager.exists("slot1"));

        let loaded = manager.load("slot1").unwrap();
        assert_eq!(loaded.header.case_id, "case-17");
        assert!(loaded.flags.values[&FlagKey::HasGlovesOn].as_bool());

        manager.delete("slot1").unwrap();
        assert!(!manager.exists("slot1"));

        let _ = fs::remove_dir_all(&save_dir);
    }

    #[test]
    fn test_version_mismatch() {
        let save_dir = temp_dir().join("csi_test_saves_version");
        let _ = fs::remove_dir_all(&save_dir);

        let mut data = sample();
        data.header.version = SAVE_VERSION + 1;
        let manager = SaveManager::new(&save_dir);
        manager.save("future", &data).unwrap();

        assert!(matches!(
            manager.load("future"),
            Err(SaveError::VersionMismatch(_, _))
        ));
        assert!(matches!(manager.load("absent"), Err(SaveError::SlotNotFound(_))));

        let _ = fs::remove_dir_all(&save_dir);
    }

    #[test]
    fn test_autosave_rotation() {
        let save_dir = temp_dir().join("csi_test_saves_auto");
        let _ = fs::remove_dir_all(&save_dir);

        let manager = SaveManager::new(&save_dir).with_max_autosaves(2);
        let first = manager.autosave(&sample()).unwrap();
        let second = manager.autosave(&sample()).unwrap();
        assert_ne!(first, second);
        assert_eq!(manager.list_slots().unwrap().len(), 2);

        let _ = fs::remove_dir_all(&save_dir);
    }

    #[test]
    fn test_quick_slot() {
        let save_dir = temp_dir().join("csi_test_saves_quick");
        let _ = fs::remove_dir_all(&save_dir);

        let manager = SaveManager::new(&save_dir);
        assert!(matches!(manager.quickload(), Err(SaveError::SlotNotFound(_))));

        manager.quicksave(&sample()).unwrap();
        let loaded = manager.quickload().unwrap();
        assert_eq!(loaded.header.active_role, "Photographer");

        let _ = fs::remove_dir_all(&save_dir);
    }
}
