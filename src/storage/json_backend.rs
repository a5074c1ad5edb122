//! Durable JSON-file backend.
//!
//! Layers write-through persistence on top of [`MemoryStore`]: every
//! successful mutation re-serializes the collections to a single JSON file
//! with an atomic tempfile rename. Suitable for local/embedded use; a real
//! deployment points the core at a managed document store instead.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::write_atomic;
use crate::errors::{CoreError, Result};
use crate::storage::{
    Collection, Document, DocumentStore, FieldFilter, MemoryStore, StoreTransaction, WriteOp,
};

pub struct JsonStore {
    memory: MemoryStore,
    path: PathBuf,
}

impl JsonStore {
    /// Opens (or creates) the store file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let store = Self {
            memory: MemoryStore::new(),
            path,
        };
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let data = fs::read_to_string(&self.path)?;
        let collections: BTreeMap<String, BTreeMap<Uuid, Document>> =
            serde_json::from_str(&data)?;
        let mut docs = Vec::new();
        for (name, entries) in collections {
            let collection = Collection::from_name(&name).ok_or_else(|| {
                CoreError::Storage(format!("unknown collection `{name}` in store file"))
            })?;
            for (id, doc) in entries {
                docs.push((collection, id, doc));
            }
        }
        self.memory.restore(docs);
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let mut collections: BTreeMap<&'static str, BTreeMap<Uuid, Document>> = BTreeMap::new();
        for (collection, id, doc) in self.memory.dump() {
            collections.entry(collection.name()).or_default().insert(id, doc);
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&collections)?;
        write_atomic(&self.path, &json)
    }
}

impl DocumentStore for JsonStore {
    fn run_transaction(
        &self,
        op: &mut dyn FnMut(&mut dyn StoreTransaction) -> Result<()>,
    ) -> Result<()> {
        self.memory.run_transaction(op)?;
        self.persist()
    }

    fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Document>> {
        self.memory.get(collection, id)
    }

    fn set(&self, collection: Collection, id: Uuid, doc: Document) -> Result<()> {
        self.memory.set(collection, id, doc)?;
        self.persist()
    }

    fn query(
        &self,
        collection: Collection,
        filters: &[FieldFilter],
    ) -> Result<Vec<(Uuid, Document)>> {
        self.memory.query(collection, filters)
    }

    fn commit_batch(&self, writes: Vec<WriteOp>) -> Result<()> {
        self.memory.commit_batch(writes)?;
        self.persist()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
