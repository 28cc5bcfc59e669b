//! Record stores.
//!
//! The pipeline never talks to a store; only [`crate::session::Session`]
//! does. Stores own identifiers: `create` returns the id the record will
//! carry from then on.

use crate::engine::types::{FastMap, Fields, Record, RecordId, Value, ASSESSMENT_SCHEMA, CASE_SCHEMA};
use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};
use smol_str::SmolStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record '{id}' not found in '{collection}'")]
    NotFound { collection: String, id: String },

    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backing service could not take the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// The persistence contract. Every call either fully happens or fails.
pub trait RecordStore {
    fn load_all(&self, collection: &str) -> StoreResult<Vec<Record>>;
    fn create(&mut self, collection: &str, fields: Fields) -> StoreResult<RecordId>;

    /// Create every row, returning ids in row order.
    ///
    /// The default creates one row at a time and is not atomic: rows before
    /// a failing one stay stored. Stores that can write a batch at once
    /// should override it.
    fn create_many(&mut self, collection: &str, rows: Vec<Fields>) -> StoreResult<Vec<RecordId>> {
        rows.into_iter()
            .map(|fields| self.create(collection, fields))
            .collect()
    }

    /// Merge `partial` into the stored record.
    fn update(&mut self, collection: &str, id: &str, partial: &Fields) -> StoreResult<()>;
    fn delete(&mut self, collection: &str, id: &str) -> StoreResult<()>;
}

type Collection = IndexMap<RecordId, Fields>;

/// In-memory store. Collections keep insertion order.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    collections: FastMap<SmolStr, Collection>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_collections(&[CASE_SCHEMA.collection, ASSESSMENT_SCHEMA.collection])
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collections(names: &[&str]) -> Self {
        let collections = names
            .iter()
            .map(|n| (SmolStr::new(n), Collection::default()))
            .collect();
        Self { collections }
    }

    fn collection(&self, name: &str) -> StoreResult<&Collection> {
        self.collections
            .get(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
    }

    fn collection_mut(&mut self, name: &str) -> StoreResult<&mut Collection> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |c| c.len())
    }

    fn insert_with_id(&mut self, collection: &str, id: RecordId, fields: Fields) -> StoreResult<()> {
        self.collection_mut(collection)?.insert(id, fields);
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn load_all(&self, collection: &str) -> StoreResult<Vec<Record>> {
        Ok(self
            .collection(collection)?
            .iter()
            .map(|(id, fields)| Record::new(id.clone(), fields.clone()))
            .collect())
    }

    fn create(&mut self, collection: &str, fields: Fields) -> StoreResult<RecordId> {
        let id = RecordId::new(ulid::Ulid::new().to_string());
        self.insert_with_id(collection, id.clone(), fields)?;
        Ok(id)
    }

    fn create_many(&mut self, collection: &str, rows: Vec<Fields>) -> StoreResult<Vec<RecordId>> {
        let target = self.collection_mut(collection)?;
        target.reserve(rows.len());
        Ok(rows
            .into_iter()
            .map(|fields| {
                let id = RecordId::new(ulid::Ulid::new().to_string());
                target.insert(id.clone(), fields);
                id
            })
            .collect())
    }

    fn update(&mut self, collection: &str, id: &str, partial: &Fields) -> StoreResult<()> {
        let stored = self
            .collection_mut(collection)?
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        for (name, value) in partial {
            stored.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    fn delete(&mut self, collection: &str, id: &str) -> StoreResult<()> {
        self.collection_mut(collection)?
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
    }
}

/// A [`MemoryStore`] mirrored to one JSON file.
///
/// The file holds `{ "<collection>": [ { "id": ..., <fields> }, ... ] }`.
/// Each mutation is applied to a copy, written out, and only then made
/// visible, so a failed write leaves both the file and the store as they
/// were.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    #[instrument]
    pub fn open(path: &Path) -> StoreResult<Self> {
        let mut inner = MemoryStore::new();
        if path.exists() {
            info!("Loading store file from {:?}", path);
            let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            if !content.trim().is_empty() {
                read_collections(&mut inner, &content)?;
            }
        } else {
            info!("No store file at {:?}, starting empty", path);
        }
        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit(&mut self, next: MemoryStore) -> StoreResult<()> {
        save(&self.path, &next)?;
        self.inner = next;
        Ok(())
    }
}

fn read_collections(store: &mut MemoryStore, content: &str) -> StoreResult<()> {
    let root: Map<String, JsonValue> = serde_json::from_str(content)?;
    for (collection, rows) in root {
        let JsonValue::Array(rows) = rows else {
            return Err(StoreError::Serialization(format!(
                "collection '{collection}' is not an array"
            )));
        };
        store
            .collections
            .entry(SmolStr::new(&collection))
            .or_default();
        for row in rows {
            let JsonValue::Object(mut obj) = row else {
                return Err(StoreError::Serialization(format!(
                    "row in '{collection}' is not an object"
                )));
            };
            let id = match obj.remove("id") {
                Some(JsonValue::String(s)) => RecordId::new(s),
                _ => {
                    return Err(StoreError::Serialization(format!(
                        "row in '{collection}' has no string id"
                    )))
                }
            };
            let fields: Fields = obj
                .into_iter()
                .map(|(k, v)| (SmolStr::new(k), Value::from(v)))
                .collect();
            store.insert_with_id(&collection, id, fields)?;
        }
    }
    Ok(())
}

fn to_json(store: &MemoryStore) -> JsonValue {
    // Deterministic file layout regardless of hash order.
    let mut names: Vec<&SmolStr> = store.collections.keys().collect();
    names.sort();
    let mut root = Map::new();
    for name in names {
        let rows = store.collections[name]
            .iter()
            .map(|(id, fields)| {
                let mut obj = Map::new();
                obj.insert("id".into(), JsonValue::String(id.to_string()));
                for (k, v) in fields {
                    obj.insert(k.to_string(), JsonValue::from(v));
                }
                JsonValue::Object(obj)
            })
            .collect();
        root.insert(name.to_string(), JsonValue::Array(rows));
    }
    JsonValue::Object(root)
}

fn save(path: &Path, store: &MemoryStore) -> StoreResult<()> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(io_err)?;

    let content = serde_json::to_vec_pretty(&to_json(store))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&content).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

impl RecordStore for JsonFileStore {
    fn load_all(&self, collection: &str) -> StoreResult<Vec<Record>> {
        self.inner.load_all(collection)
    }

    #[instrument(skip(self, fields), fields(path = ?self.path))]
    fn create(&mut self, collection: &str, fields: Fields) -> StoreResult<RecordId> {
        let mut next = self.inner.clone();
        let id = next.create(collection, fields)?;
        self.commit(next).inspect_err(|e| warn!("create not persisted: {}", e))?;
        Ok(id)
    }

    /// One file write for the whole batch.
    #[instrument(skip(self, rows), fields(path = ?self.path, rows = rows.len()))]
    fn create_many(&mut self, collection: &str, rows: Vec<Fields>) -> StoreResult<Vec<RecordId>> {
        let mut next = self.inner.clone();
        let ids = next.create_many(collection, rows)?;
        self.commit(next).inspect_err(|e| warn!("batch create not persisted: {}", e))?;
        Ok(ids)
    }

    #[instrument(skip(self, partial), fields(path = ?self.path))]
    fn update(&mut self, collection: &str, id: &str, partial: &Fields) -> StoreResult<()> {
        let mut next = self.inner.clone();
        next.update(collection, id, partial)?;
        self.commit(next).inspect_err(|e| warn!("update not persisted: {}", e))
    }

    #[instrument(skip(self), fields(path = ?self.path))]
    fn delete(&mut self, collection: &str, id: &str) -> StoreResult<()> {
        let mut next = self.inner.clone();
        next.delete(collection, id)?;
        self.commit(next).inspect_err(|e| warn!("delete not persisted: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (SmolStr::new(*k), v.clone()))
            .collect()
    }

    #[test]
    fn test_memory_crud_keeps_order() {
        let mut store = MemoryStore::new();
        let a = store
            .create("dengueData", fields(&[("location", "Iligan".into())]))
            .unwrap();
        let b = store
            .create("dengueData", fields(&[("location", "Cagayan".into())]))
            .unwrap();
        assert_ne!(a, b);

        store
            .update("dengueData", &a, &fields(&[("cases", Value::Integer(4))]))
            .unwrap();
        let all = store.load_all("dengueData").unwrap();
        assert_eq!(all[0].id, a);
        assert_eq!(all[0].number("cases"), Some(4.0));
        assert_eq!(all[1].id, b);

        store.delete("dengueData", &a).unwrap();
        assert_eq!(store.len("dengueData"), 1);
    }

    #[test]
    fn test_memory_errors() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.load_all("patients"),
            Err(StoreError::UnknownCollection(_))
        ));
        assert!(matches!(
            store.delete("studentData", "nope"),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.update("studentData", "nope", &Fields::default()),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_memory_create_many_is_all_or_nothing() {
        let mut store = MemoryStore::new();
        let rows = vec![
            fields(&[("location", "Iligan".into())]),
            fields(&[("location", "Butuan".into())]),
        ];
        assert!(matches!(
            store.create_many("patients", rows.clone()),
            Err(StoreError::UnknownCollection(_))
        ));

        let ids = store.create_many("dengueData", rows).unwrap();
        let all = store.load_all("dengueData").unwrap();
        assert_eq!(all.iter().map(|r| r.id.clone()).collect::<Vec<_>>(), ids);
        assert_eq!(all[1].text("location"), "Butuan");
    }

    #[test]
    fn test_read_collections_rejects_rows_without_id() {
        let mut store = MemoryStore::new();
        let err = read_collections(&mut store, r#"{"dengueData": [{"location": "X"}]}"#).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
