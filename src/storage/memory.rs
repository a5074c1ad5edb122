//! In-memory document store with optimistic transactions.
//!
//! Simulates the reference store's transaction primitive with per-document
//! versioned compare-and-swap and a bounded retry loop: a transaction records
//! the version of every document it reads, and commits only if none of them
//! changed underneath it.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use crate::errors::{CoreError, Result};
use crate::storage::{Collection, Document, DocumentStore, FieldFilter, StoreTransaction, WriteOp};

const DEFAULT_MAX_RETRIES: u32 = 5;

type DocKey = (Collection, Uuid);

#[derive(Debug, Clone)]
struct Versioned {
    version: u64,
    doc: Document,
}

/// Thread-safe in-memory backend; also the test double for the core.
pub struct MemoryStore {
    inner: Mutex<State>,
    max_retries: u32,
}

#[derive(Default)]
struct State {
    docs: HashMap<DocKey, Versioned>,
    next_version: u64,
}

impl State {
    fn apply(&mut self, op: WriteOp) {
        self.next_version += 1;
        match op {
            WriteOp::Set {
                collection,
                id,
                doc,
            } => {
                self.docs.insert(
                    (collection, id),
                    Versioned {
                        version: self.next_version,
                        doc,
                    },
                );
            }
            WriteOp::Delete { collection, id } => {
                self.docs.remove(&(collection, id));
            }
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_max_retries(DEFAULT_MAX_RETRIES)
    }

    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            inner: Mutex::new(State::default()),
            max_retries: max_retries.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock means a panic mid-write; propagating the panic is
        // the only sound option for an in-memory store.
        self.inner.lock().expect("memory store lock poisoned")
    }

    /// Snapshot of every stored document, for durable backends layered on
    /// top.
    pub(crate) fn dump(&self) -> Vec<(Collection, Uuid, Document)> {
        let state = self.lock();
        let mut docs: Vec<_> = state
            .docs
            .iter()
            .map(|((collection, id), versioned)| (*collection, *id, versioned.doc.clone()))
            .collect();
        docs.sort_by_key(|(collection, id, _)| (collection.name(), *id));
        docs
    }

    /// Replaces the store contents with a previously dumped snapshot.
    pub(crate) fn restore(&self, docs: Vec<(Collection, Uuid, Document)>) {
        let mut state = self.lock();
        state.docs.clear();
        for (collection, id, doc) in docs {
            state.next_version += 1;
            let version = state.next_version;
            state.docs.insert((collection, id), Versioned { version, doc });
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

struct MemTransaction {
    snapshot: HashMap<DocKey, Versioned>,
    /// Versions observed by reads; `None` records "document was absent".
    reads: HashMap<DocKey, Option<u64>>,
    /// Buffered writes, also consulted for read-your-writes; `None` is a
    /// pending delete.
    writes: HashMap<DocKey, Option<Document>>,
    write_order: Vec<DocKey>,
}

impl StoreTransaction for MemTransaction {
    fn get(&mut self, collection: Collection, id: Uuid) -> Result<Option<Document>> {
        let key = (collection, id);
        if let Some(pending) = self.writes.get(&key) {
            return Ok(pending.clone());
        }
        let versioned = self.snapshot.get(&key);
        self.reads
            .entry(key)
            .or_insert_with(|| versioned.map(|v| v.version));
        Ok(versioned.map(|v| v.doc.clone()))
    }

    fn set(&mut self, collection: Collection, id: Uuid, doc: Document) {
        let key = (collection, id);
        if self.writes.insert(key, Some(doc)).is_none() {
            self.write_order.push(key);
        }
    }

    fn delete(&mut self, collection: Collection, id: Uuid) {
        let key = (collection, id);
        if self.writes.insert(key, None).is_none() {
            self.write_order.push(key);
        }
    }
}

impl DocumentStore for MemoryStore {
    fn run_transaction(
        &self,
        op: &mut dyn FnMut(&mut dyn StoreTransaction) -> Result<()>,
    ) -> Result<()> {
        for _ in 0..self.max_retries {
            let snapshot = self.lock().docs.clone();
            let mut tx = MemTransaction {
                snapshot,
                reads: HashMap::new(),
                writes: HashMap::new(),
                write_order: Vec::new(),
            };
            // Business errors abort immediately with no writes applied.
            op(&mut tx)?;

            let mut state = self.lock();
            let conflicted = tx.reads.iter().any(|(key, observed)| {
                state.docs.get(key).map(|v| v.version) != *observed
            });
            if conflicted {
                continue;
            }
            for key in tx.write_order {
                let op = match tx.writes.remove(&key) {
                    Some(Some(doc)) => WriteOp::Set {
                        collection: key.0,
                        id: key.1,
                        doc,
                    },
                    Some(None) => WriteOp::Delete {
                        collection: key.0,
                        id: key.1,
                    },
                    None => continue,
                };
                state.apply(op);
            }
            return Ok(());
        }
        Err(CoreError::Conflict(self.max_retries))
    }

    fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Document>> {
        Ok(self
            .lock()
            .docs
            .get(&(collection, id))
            .map(|v| v.doc.clone()))
    }

    fn set(&self, collection: Collection, id: Uuid, doc: Document) -> Result<()> {
        self.lock().apply(WriteOp::Set {
            collection,
            id,
            doc,
        });
        Ok(())
    }

    fn query(
        &self,
        collection: Collection,
        filters: &[FieldFilter],
    ) -> Result<Vec<(Uuid, Document)>> {
        let state = self.lock();
        let mut matches: Vec<(Uuid, Document)> = state
            .docs
            .iter()
            .filter(|((c, _), _)| *c == collection)
            .filter(|(_, versioned)| filters.iter().all(|f| f.matches(&versioned.doc)))
            .map(|((_, id), versioned)| (*id, versioned.doc.clone()))
            .collect();
        matches.sort_by_key(|(id, _)| *id);
        Ok(matches)
    }

    fn commit_batch(&self, writes: Vec<WriteOp>) -> Result<()> {
        let mut state = self.lock();
        for op in writes {
            state.apply(op);
        }
        Ok(())
    }
}
