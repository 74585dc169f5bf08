//! Long-term memory: remembered facts keyed by short slugs.

use std::fmt;
use std::sync::Arc;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use crate::core::error::StorageError;
use crate::core::storage::{BlobStore, MEMORY_BLOB};

/// One remembered fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub key: String,
    pub value: String,
}

impl MemoryEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Key/value facts in insertion order.
///
/// Overwriting a key keeps its original position, so iteration order (and
/// everything derived from it, like the persona instruction) is stable.
/// Serialized as a flat JSON object of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    entries: Vec<MemoryEntry>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.entries.iter()
    }

    /// Sets `key` to `value`, returning true if the stored value changed.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) if entry.value == value => false,
            Some(entry) => {
                entry.value = value;
                true
            }
            None => {
                self.entries.push(MemoryEntry { key, value });
                true
            }
        }
    }

    /// Returns `self` with `updates` applied in order; later updates win.
    pub fn merged(&self, updates: &[MemoryEntry]) -> Memory {
        let mut merged = self.clone();
        for update in updates {
            merged.insert(update.key.clone(), update.value.clone());
        }
        merged
    }
}

impl FromIterator<MemoryEntry> for Memory {
    fn from_iter<I: IntoIterator<Item = MemoryEntry>>(iter: I) -> Self {
        let mut memory = Memory::new();
        for entry in iter {
            memory.insert(entry.key, entry.value);
        }
        memory
    }
}

impl Serialize for Memory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.key, &entry.value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Memory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MemoryVisitor;

        impl<'de> Visitor<'de> for MemoryVisitor {
            type Value = Memory;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping memory keys to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Memory, A::Error> {
                let mut memory = Memory::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    memory.insert(key, value);
                }
                Ok(memory)
            }
        }

        deserializer.deserialize_map(MemoryVisitor)
    }
}

/// Durable memory, loaded once and rewritten after every change.
pub struct MemoryStore {
    store: Arc<dyn BlobStore>,
    current: Memory,
}

impl MemoryStore {
    /// Loads persisted memory. Missing or malformed state yields an empty
    /// mapping rather than an error.
    pub fn load(store: Arc<dyn BlobStore>) -> Self {
        let current = match store.read(MEMORY_BLOB) {
            Ok(Some(raw)) => match serde_json::from_str::<Memory>(&raw) {
                Ok(memory) => memory,
                Err(source) => {
                    let err = StorageError::Parse {
                        name: MEMORY_BLOB.to_string(),
                        source,
                    };
                    warn!(error = %err, "discarding malformed memory");
                    Memory::new()
                }
            },
            Ok(None) => Memory::new(),
            Err(err) => {
                warn!(error = %err, "memory unreadable, starting empty");
                Memory::new()
            }
        };
        debug!(entries = current.len(), "memory loaded");
        Self { store, current }
    }

    pub fn memory(&self) -> &Memory {
        &self.current
    }

    /// Applies `updates` (last write wins) and persists the result.
    ///
    /// A failed write is logged; the merged mapping is still kept in memory
    /// for the rest of the run.
    pub fn merge(&mut self, updates: &[MemoryEntry]) -> &Memory {
        let merged = self.current.merged(updates);
        if merged == self.current {
            return &self.current;
        }

        match serde_json::to_string(&merged) {
            Ok(contents) => {
                if let Err(err) = self.store.write(MEMORY_BLOB, &contents) {
                    warn!(error = %err, "failed to persist memory");
                }
            }
            Err(err) => warn!(error = %err, "failed to serialize memory"),
        }
        debug!(updates = updates.len(), entries = merged.len(), "memory merged");
        self.current = merged;
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::InMemoryBlobStore;

    fn entries(pairs: &[(&str, &str)]) -> Vec<MemoryEntry> {
        pairs
            .iter()
            .map(|(key, value)| MemoryEntry::new(*key, *value))
            .collect()
    }

    #[test]
    fn merge_is_idempotent() {
        let old: Memory = entries(&[("name", "Sam"), ("pet", "cat")]).into_iter().collect();
        let updates = entries(&[("pet", "dog"), ("favorite_genre", "sci-fi")]);

        let once = old.merged(&updates);
        let twice = once.merged(&updates);
        assert_eq!(once, twice);
    }

    #[test]
    fn later_updates_win_and_keep_original_position() {
        let old: Memory = entries(&[("name", "Sam"), ("pet", "cat")]).into_iter().collect();
        let merged = old.merged(&entries(&[("pet", "dog"), ("pet", "parrot"), ("city", "Oslo")]));

        let keys: Vec<&str> = merged.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["name", "pet", "city"]);
        assert_eq!(merged.get("pet"), Some("parrot"));
    }

    #[test]
    fn json_preserves_insertion_order() {
        let memory: Memory = entries(&[("zeta", "1"), ("alpha", "2")]).into_iter().collect();
        let json = serde_json::to_string(&memory).expect("serialize");
        assert_eq!(json, r#"{"zeta":"1","alpha":"2"}"#);

        let back: Memory = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, memory);
    }

    #[test]
    fn persisted_memory_round_trips_through_the_store() {
        let blobs: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::new());
        let mut store = MemoryStore::load(Arc::clone(&blobs));
        assert!(store.memory().is_empty());

        store.merge(&entries(&[("favorite_genre", "sci-fi"), ("name", "Ada")]));
        let expected = store.memory().clone();

        let reloaded = MemoryStore::load(blobs);
        assert_eq!(reloaded.memory(), &expected);
    }

    #[test]
    fn malformed_memory_loads_as_empty() {
        let blobs: Arc<dyn BlobStore> =
            Arc::new(InMemoryBlobStore::with_blob(MEMORY_BLOB, "[not, an, object"));
        assert!(MemoryStore::load(blobs).memory().is_empty());

        let blobs: Arc<dyn BlobStore> =
            Arc::new(InMemoryBlobStore::with_blob(MEMORY_BLOB, r#"{"count": 3}"#));
        assert!(MemoryStore::load(blobs).memory().is_empty());
    }

    #[test]
    fn unchanged_merge_skips_the_write() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let mut store = MemoryStore::load(blobs.clone());
        store.merge(&[]);
        assert!(blobs.read(MEMORY_BLOB).expect("read").is_none());
    }
}
