//! Save data and the key-value storage boundary.
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::StorageError;

/// Key the save record is stored under.
pub const SAVE_GAME_KEY: &str = "save_game";

/// Persistent player progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveGame {
    pub level: u32,
    #[serde(default)]
    pub score: u32,
}

impl Default for SaveGame {
    fn default() -> Self {
        Self { level: 1, score: 0 }
    }
}

/// Trait for abstracting key-value persistence.
/// Platform-specific implementations should provide this.
pub trait GameStorage {
    /// Read the value stored under `key`, or `None` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be modified.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Write `save` under [`SAVE_GAME_KEY`].
///
/// # Errors
///
/// Returns an error if serialization or the storage write fails.
pub fn save_game<S: GameStorage + ?Sized>(storage: &S, save: &SaveGame) -> Result<(), StorageError> {
    let json = serde_json::to_string(save).map_err(|source| StorageError::Format {
        key: SAVE_GAME_KEY.to_string(),
        source,
    })?;
    storage.write(SAVE_GAME_KEY, &json)
}

/// Read the save record, or `None` if nothing was saved yet.
///
/// # Errors
///
/// Returns an error if the storage read fails or the stored JSON is invalid.
pub fn load_game<S: GameStorage + ?Sized>(storage: &S) -> Result<Option<SaveGame>, StorageError> {
    storage
        .read(SAVE_GAME_KEY)?
        .map(|json| {
            serde_json::from_str(&json).map_err(|source| StorageError::Format {
                key: SAVE_GAME_KEY.to_string(),
                source,
            })
        })
        .transpose()
}

/// Delete the save record.
///
/// # Errors
///
/// Returns an error if the storage cannot be modified.
pub fn clear_save<S: GameStorage + ?Sized>(storage: &S) -> Result<(), StorageError> {
    storage.remove(SAVE_GAME_KEY)
}

/// In-process storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_save_reads_as_none() {
        let storage = MemoryStorage::new();
        assert_eq!(load_game(&storage).unwrap(), None);
    }

    #[test]
    fn save_then_load_returns_same_record() {
        let storage = MemoryStorage::new();
        let save = SaveGame {
            level: 42,
            score: 7,
        };
        save_game(&storage, &save).unwrap();

        let raw = storage.read(SAVE_GAME_KEY).unwrap().expect("stored");
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["level"], 42);
        assert_eq!(load_game(&storage).unwrap(), Some(save));

        clear_save(&storage).unwrap();
        assert_eq!(load_game(&storage).unwrap(), None);
    }

    #[test]
    fn level_only_record_defaults_score() {
        let storage = MemoryStorage::new();
        storage.write(SAVE_GAME_KEY, r#"{"level": 3}"#).unwrap();
        assert_eq!(
            load_game(&storage).unwrap(),
            Some(SaveGame { level: 3, score: 0 })
        );
    }

    #[test]
    fn corrupt_save_is_a_format_error() {
        let storage = MemoryStorage::new();
        storage.write(SAVE_GAME_KEY, "not json").unwrap();
        assert!(matches!(
            load_game(&storage),
            Err(StorageError::Format { .. })
        ));
    }
}
