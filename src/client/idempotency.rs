//! Content-addressed idempotency keys.
//!
//! # Responsibilities
//! - Hash the canonical JSON of a payload (SHA-256, hex)
//! - Map each hash to one opaque key, minting it on first sight
//! - Optionally persist the mapping so keys survive client restarts
//!
//! # Design Decisions
//! - Canonical form sorts object keys recursively, so field order never changes the key
//! - The file index rewrites the whole map on each new key; it is small and append-rare

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("payload cannot be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("key store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage for the content-hash → key mapping.
pub trait KeyIndex: Send + Sync + fmt::Debug {
    /// Return the key stored under `hash`, or store `mint()` and return it.
    fn get_or_insert(&self, hash: &str, mint: &dyn Fn() -> String) -> Result<String, KeyError>;
}

/// Index that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryKeyIndex {
    keys: DashMap<String, String>,
}

impl MemoryKeyIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyIndex for MemoryKeyIndex {
    fn get_or_insert(&self, hash: &str, mint: &dyn Fn() -> String) -> Result<String, KeyError> {
        Ok(self
            .keys
            .entry(hash.to_string())
            .or_insert_with(mint)
            .value()
            .clone())
    }
}

/// Index persisted as a JSON object in a file.
#[derive(Debug)]
pub struct FileKeyIndex {
    path: PathBuf,
    keys: Mutex<HashMap<String, String>>,
}

impl FileKeyIndex {
    /// Open `path`, loading any mapping already stored there.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let path = path.as_ref().to_path_buf();
        let keys = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let keys: HashMap<String, String> = serde_json::from_reader(reader)?;
            tracing::debug!(path = %path.display(), count = keys.len(), "Loaded idempotency keys");
            keys
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            keys: Mutex::new(keys),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, keys: &HashMap<String, String>) -> Result<(), KeyError> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer(&mut writer, keys)?;
        writer.flush()?;
        Ok(())
    }
}

impl KeyIndex for FileKeyIndex {
    fn get_or_insert(&self, hash: &str, mint: &dyn Fn() -> String) -> Result<String, KeyError> {
        let mut keys = self.keys.lock().expect("key index mutex poisoned");
        if let Some(existing) = keys.get(hash) {
            return Ok(existing.clone());
        }

        let fresh = mint();
        keys.insert(hash.to_string(), fresh.clone());
        if let Err(e) = self.save(&keys) {
            keys.remove(hash);
            return Err(e);
        }
        Ok(fresh)
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect::<Map<_, _>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Hex SHA-256 of the canonical JSON serialization of `payload`.
pub fn payload_hash<T: Serialize + ?Sized>(payload: &T) -> Result<String, KeyError> {
    let canonical = canonicalize(serde_json::to_value(payload)?);
    let bytes = serde_json::to_vec(&canonical)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Derives one stable idempotency key per distinct payload.
#[derive(Debug, Clone)]
pub struct IdempotencyKeyManager {
    index: Arc<dyn KeyIndex>,
}

impl IdempotencyKeyManager {
    pub fn new(index: Arc<dyn KeyIndex>) -> Self {
        Self { index }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyIndex::new()))
    }

    /// Persist keys in a JSON file at `path`.
    pub fn with_file(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        Ok(Self::new(Arc::new(FileKeyIndex::open(path)?)))
    }

    /// Key for `payload`: the stored one if this content was seen, else a new UUID.
    pub fn key_for<T: Serialize + ?Sized>(&self, payload: &T) -> Result<String, KeyError> {
        let hash = payload_hash(payload)?;
        self.index
            .get_or_insert(&hash, &|| uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_same_payload_same_key() {
        let manager = IdempotencyKeyManager::in_memory();
        let payload = json!({"name": "Mouse", "price": 100});
        let a = manager.key_for(&payload).unwrap();
        let b = manager.key_for(&payload).unwrap();
        assert_eq!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_different_payload_different_key() {
        let manager = IdempotencyKeyManager::in_memory();
        let a = manager.key_for(&json!({"name": "Mouse"})).unwrap();
        let b = manager.key_for(&json!({"name": "Keyboard"})).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_field_order_is_irrelevant() {
        #[derive(Serialize)]
        struct Ordered {
            price: u32,
            name: &'static str,
        }
        let typed = payload_hash(&Ordered { price: 1, name: "x" }).unwrap();
        let dynamic = payload_hash(&json!({"name": "x", "price": 1})).unwrap();
        assert_eq!(typed, dynamic);
        assert_eq!(typed.len(), 64);
    }

    #[test]
    fn test_hash_of_known_input() {
        // sha256("{}")
        assert_eq!(
            payload_hash(&json!({})).unwrap(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn test_unserializable_payload_surfaces_error() {
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], "non-string key");
        let err = IdempotencyKeyManager::in_memory().key_for(&map).unwrap_err();
        assert!(matches!(err, KeyError::Serialize(_)));
    }

    #[test]
    fn test_file_index_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        let payload = json!({"name": "Mouse"});

        let first = IdempotencyKeyManager::with_file(&path).unwrap().key_for(&payload).unwrap();
        let second = IdempotencyKeyManager::with_file(&path).unwrap().key_for(&payload).unwrap();
        assert_eq!(first, second);

        let index = FileKeyIndex::open(&path).unwrap();
        let stored = index
            .get_or_insert(&payload_hash(&payload).unwrap(), &|| "fresh".to_string())
            .unwrap();
        assert_eq!(stored, first);
    }

    #[test]
    fn test_file_index_write_failure_is_not_remembered() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("missing-dir");
        let index = FileKeyIndex::open(parent.join("keys.json")).unwrap();
        let err = index.get_or_insert("h", &|| "k".to_string()).unwrap_err();
        assert!(matches!(err, KeyError::Io(_)));

        // Once the directory exists a fresh key is minted, not the rolled-back one.
        std::fs::create_dir(&parent).unwrap();
        assert_eq!(index.get_or_insert("h", &|| "k2".to_string()).unwrap(), "k2");
    }
}
