//! Shortcut table persistence.
//!
//! Tables are stored as a JSON map of chord string to intent:
//!
//! ```json
//! {
//!   "ctrl+s": "save",
//!   "meta+shift+p": "command-palette"
//! }
//! ```
//!
//! Loading is lenient about individual entries: invalid chord strings are
//! reported but do not prevent the valid ones from applying, so one bad
//! hand-edit never wipes a user's whole table.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::shortcuts::{KeySet, ShortcutParseError};

/// Error that can occur when loading or saving a shortcut table.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid chord '{chord}': {error}")]
    InvalidChord {
        chord: String,
        #[source]
        error: ShortcutParseError,
    },
}

/// On-disk form of a shortcut table: chord strings mapped to intents.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ShortcutTableFile<I> {
    pub bindings: HashMap<String, I>,
}

impl<I> Default for ShortcutTableFile<I> {
    fn default() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }
}

impl<I: Serialize + DeserializeOwned + Clone> ShortcutTableFile<I> {
    /// Load from a JSON file. A missing file loads as an empty table.
    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save to a JSON file, creating parent directories as needed.
    ///
    /// Writes to a sibling temp file and renames over the target so a crash
    /// mid-write never leaves a truncated table behind.
    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Parse the stored chords into a dispatch table.
    ///
    /// Invalid chords are returned as errors alongside the table built from
    /// the valid entries.
    pub fn into_table(self) -> (HashMap<KeySet, I>, Vec<PersistenceError>) {
        let mut table = HashMap::with_capacity(self.bindings.len());
        let mut errors = Vec::new();
        for (chord, intent) in self.bindings {
            match chord.parse::<KeySet>() {
                Ok(set) => {
                    table.insert(set, intent);
                }
                Err(error) => errors.push(PersistenceError::InvalidChord { chord, error }),
            }
        }
        (table, errors)
    }

    /// Snapshot a live dispatch table into its on-disk form.
    pub fn from_table(table: &HashMap<KeySet, I>) -> Self {
        Self {
            bindings: table
                .iter()
                .map(|(set, intent)| (set.to_string(), intent.clone()))
                .collect(),
        }
    }
}

/// Default path for the shortcut table (~/.tapestry/shortcuts.json).
pub fn default_table_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".tapestry")
        .join("shortcuts.json")
}
