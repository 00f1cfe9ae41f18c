/// Draft persistence: a key-value port, its native backends, and the
/// fail-soft draft store the wizard talks to.
use log::{debug, warn};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::schema::draft::Draft;

/// Storage key of the serialized draft.
pub const DRAFT_KEY: &str = "ballas_rp_sheet_v1";
/// Storage key of the endpoint override.
pub const ENDPOINT_KEY: &str = "ballas_rp_sheets_endpoint_v1";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A string key-value backend.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-process backend for hosts without persistent storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: FxHashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::Unavailable(format!("invalid key '{key}'")));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(path, value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Decode a stored draft. Only a JSON object yields fields: strings are
/// kept, numbers and booleans stringified, everything else dropped.
pub fn decode_draft(raw: &str) -> Result<Draft, StoreError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let serde_json::Value::Object(map) = value else {
        return Ok(Draft::new());
    };

    let mut draft = Draft::new();
    for (key, value) in map {
        match value {
            serde_json::Value::String(s) => draft.set(key, s),
            serde_json::Value::Number(n) => draft.set(key, n.to_string()),
            serde_json::Value::Bool(b) => draft.set(key, b.to_string()),
            _ => {}
        }
    }
    Ok(draft)
}

/// Draft and endpoint persistence with fail-soft semantics: reads that
/// fail yield an empty value, writes that fail are logged and dropped.
#[derive(Debug, Clone)]
pub struct DraftStore<S: KeyValueStore> {
    backend: S,
}

impl<S: KeyValueStore> DraftStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn load(&self) -> Draft {
        let raw = match self.backend.get(DRAFT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Draft::new(),
            Err(e) => {
                warn!("draft storage unavailable, starting empty: {e}");
                return Draft::new();
            }
        };
        decode_draft(&raw).unwrap_or_else(|e| {
            warn!("stored draft is malformed, starting empty: {e}");
            Draft::new()
        })
    }

    pub fn save(&mut self, draft: &Draft) {
        let result = serde_json::to_string(draft)
            .map_err(StoreError::from)
            .and_then(|json| self.backend.set(DRAFT_KEY, &json));
        match result {
            Ok(()) => debug!("draft saved ({} fields)", draft.len()),
            Err(e) => warn!("draft not saved, keeping it in memory only: {e}"),
        }
    }

    /// Remove the stored draft. The endpoint override is left alone.
    pub fn clear(&mut self) {
        if let Err(e) = self.backend.remove(DRAFT_KEY) {
            warn!("stored draft not removed: {e}");
        }
    }

    pub fn endpoint_override(&self) -> String {
        match self.backend.get(ENDPOINT_KEY) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                warn!("endpoint override unreadable: {e}");
                String::new()
            }
        }
    }

    pub fn set_endpoint_override(&mut self, url: &str) {
        if let Err(e) = self.backend.set(ENDPOINT_KEY, url) {
            warn!("endpoint override not saved: {e}");
        }
    }

    /// Trimmed override when non-empty, otherwise the trimmed default.
    pub fn effective_endpoint(&self, default: &str) -> String {
        let saved = self.endpoint_override();
        let saved = saved.trim();
        if saved.is_empty() {
            default.trim().to_string()
        } else {
            saved.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Backend whose every operation fails, standing in for disabled storage.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("disabled".to_string()))
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("quota".to_string()))
        }
        fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disabled".to_string()))
        }
    }

    fn sample() -> Draft {
        [("name", "Alex"), ("role", "Runner"), ("set", "Davis")]
            .into_iter()
            .collect()
    }

    #[test]
    fn load_empty_store() {
        let store = DraftStore::new(MemoryStore::new());
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_then_load() {
        let mut store = DraftStore::new(MemoryStore::new());
        store.save(&sample());
        assert_eq!(store.load(), sample());
    }

    #[test]
    fn save_of_load_keeps_representation() {
        let mut store = DraftStore::new(MemoryStore::new());
        store.save(&sample());
        let before = store.backend().get(DRAFT_KEY).unwrap();
        let loaded = store.load();
        store.save(&loaded);
        assert_eq!(store.backend().get(DRAFT_KEY).unwrap(), before);
    }

    #[test]
    fn malformed_json_loads_empty() {
        let mut backend = MemoryStore::new();
        backend.set(DRAFT_KEY, "{not json").unwrap();
        assert!(DraftStore::new(backend).load().is_empty());
    }

    #[test]
    fn non_object_json_loads_empty() {
        let mut backend = MemoryStore::new();
        backend.set(DRAFT_KEY, "[1,2,3]").unwrap();
        assert!(DraftStore::new(backend).load().is_empty());
    }

    #[test]
    fn decode_coerces_scalars() {
        let draft = decode_draft(r#"{"name":"Mona","age":31,"vip":true,"x":null,"y":[1]}"#).unwrap();
        assert_eq!(draft.get("name"), "Mona");
        assert_eq!(draft.get("age"), "31");
        assert_eq!(draft.get("vip"), "true");
        assert_eq!(draft.len(), 3);
    }

    #[test]
    fn broken_backend_is_silent() {
        let mut store = DraftStore::new(BrokenStore);
        store.save(&sample());
        store.clear();
        store.set_endpoint_override("https://example.test");
        assert!(store.load().is_empty());
        assert_eq!(store.endpoint_override(), "");
    }

    #[test]
    fn clear_keeps_endpoint_override() {
        let mut store = DraftStore::new(MemoryStore::new());
        store.save(&sample());
        store.set_endpoint_override("https://example.test/hook");
        store.clear();
        assert!(store.load().is_empty());
        assert_eq!(store.endpoint_override(), "https://example.test/hook");
    }

    #[test]
    fn effective_endpoint_prefers_override() {
        let mut store = DraftStore::new(MemoryStore::new());
        assert_eq!(store.effective_endpoint(" https://default "), "https://default");
        store.set_endpoint_override("  ");
        assert_eq!(store.effective_endpoint("https://default"), "https://default");
        store.set_endpoint_override(" https://override ");
        assert_eq!(store.effective_endpoint("https://default"), "https://override");
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DraftStore::new(FileStore::new(dir.path().join("sheet")));
        assert!(store.load().is_empty());
        store.save(&sample());
        assert_eq!(store.load(), sample());
        store.clear();
        assert!(store.load().is_empty());
        store.clear();
    }

    #[test]
    fn file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = FileStore::new(dir.path());
        assert!(backend.set("../escape", "x").is_err());
    }
}
