//! Storage abstraction consumed by the ledger core.
//!
//! The core does not reimplement a document database; it relies on a store
//! capability offering keyed documents, multi-document atomic transactions
//! with retry on write conflict, grouped batched writes under a per-batch
//! ceiling, and equality/range queries. Backends implement [`DocumentStore`];
//! tests substitute the in-memory one.

pub mod json_backend;
pub mod memory;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::{CoreError, Result};

pub use json_backend::JsonStore;
pub use memory::MemoryStore;

/// Documents are schemaless JSON values; typed access goes through
/// [`encode`]/[`decode`].
pub type Document = Value;

/// Hard ceiling imposed by the reference store is 500 operations per batch;
/// jobs chunk at 400 to stay safely under it.
pub const MAX_BATCH_OPS: usize = 400;

/// Named document collections used by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Accounts,
    CreditCards,
    Expenses,
    Loans,
    LoanPayments,
    RecurringExpenses,
    JobLogs,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Accounts,
        Collection::CreditCards,
        Collection::Expenses,
        Collection::Loans,
        Collection::LoanPayments,
        Collection::RecurringExpenses,
        Collection::JobLogs,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Accounts => "accounts",
            Collection::CreditCards => "credit_cards",
            Collection::Expenses => "expenses",
            Collection::Loans => "loans",
            Collection::LoanPayments => "loan_payments",
            Collection::RecurringExpenses => "recurring_expenses",
            Collection::JobLogs => "_job_logs",
        }
    }

    pub fn from_name(name: &str) -> Option<Collection> {
        Collection::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// A single queued write inside a batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Set {
        collection: Collection,
        id: Uuid,
        doc: Document,
    },
    Delete {
        collection: Collection,
        id: Uuid,
    },
}

/// Server-side-equivalent query filters: `field == value` and
/// `field <= value`.
#[derive(Debug, Clone)]
pub enum FieldFilter {
    Eq(&'static str, Value),
    Le(&'static str, Value),
}

impl FieldFilter {
    /// Evaluates the filter against a document. Missing fields never match.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            FieldFilter::Eq(field, expected) => doc.get(field) == Some(expected),
            FieldFilter::Le(field, bound) => match doc.get(field) {
                Some(actual) => value_le(actual, bound),
                None => false,
            },
        }
    }
}

fn value_le(actual: &Value, bound: &Value) -> bool {
    match (actual, bound) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a <= b,
            _ => false,
        },
        // Dates serialize as RFC 3339 / ISO 8601 strings, which order
        // lexicographically.
        (Value::String(a), Value::String(b)) => a <= b,
        _ => false,
    }
}

/// Read/write surface inside one atomic transaction.
///
/// All reads observe a single consistent snapshot with read-your-writes; all
/// buffered writes commit together or not at all.
pub trait StoreTransaction {
    fn get(&mut self, collection: Collection, id: Uuid) -> Result<Option<Document>>;
    fn set(&mut self, collection: Collection, id: Uuid, doc: Document);
    fn delete(&mut self, collection: Collection, id: Uuid);
}

/// The durable document store capability.
pub trait DocumentStore: Send + Sync {
    /// Runs `op` as an all-or-nothing transaction, retrying a bounded number
    /// of times when a concurrent transaction committed to a document this
    /// one read. Errors returned by `op` abort without retry and with zero
    /// side effects.
    fn run_transaction(
        &self,
        op: &mut dyn FnMut(&mut dyn StoreTransaction) -> Result<()>,
    ) -> Result<()>;

    fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Document>>;

    fn set(&self, collection: Collection, id: Uuid, doc: Document) -> Result<()>;

    fn query(
        &self,
        collection: Collection,
        filters: &[FieldFilter],
    ) -> Result<Vec<(Uuid, Document)>>;

    /// Commits a group of writes together. Callers are responsible for
    /// chunking below [`MAX_BATCH_OPS`].
    fn commit_batch(&self, writes: Vec<WriteOp>) -> Result<()>;

    /// Store-assigned timestamp used for `created_at`/`updated_at` and
    /// due-date comparisons.
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Accumulates writes and commits incrementally as each chunk fills.
///
/// Mirrors the scheduled jobs' best-effort consistency: already-committed
/// chunks stay committed even when a later chunk fails.
pub struct BatchWriter<'a> {
    store: &'a dyn DocumentStore,
    pending: Vec<WriteOp>,
    limit: usize,
    committed: usize,
}

impl<'a> BatchWriter<'a> {
    pub fn new(store: &'a dyn DocumentStore, limit: usize) -> Self {
        Self {
            store,
            pending: Vec::new(),
            limit: limit.clamp(1, MAX_BATCH_OPS),
            committed: 0,
        }
    }

    pub fn push(&mut self, op: WriteOp) -> Result<()> {
        self.pending.push(op);
        if self.pending.len() >= self.limit {
            self.commit_pending()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if !self.pending.is_empty() {
            self.commit_pending()?;
        }
        Ok(())
    }

    /// Number of writes committed so far.
    pub fn committed(&self) -> usize {
        self.committed
    }

    fn commit_pending(&mut self) -> Result<()> {
        let chunk = std::mem::take(&mut self.pending);
        let len = chunk.len();
        self.store.commit_batch(chunk)?;
        self.committed += len;
        Ok(())
    }
}

/// Serializes a domain value into a stored document.
pub fn encode<T: Serialize>(value: &T) -> Result<Document> {
    serde_json::to_value(value).map_err(|err| CoreError::Serde(err.to_string()))
}

/// Deserializes a stored document into a domain value.
pub fn decode<T: DeserializeOwned>(doc: Document) -> Result<T> {
    serde_json::from_value(doc).map_err(|err| CoreError::Serde(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{Collection, FieldFilter};
    use serde_json::json;

    #[test]
    fn collection_names_round_trip() {
        for collection in Collection::ALL {
            assert_eq!(Collection::from_name(collection.name()), Some(collection));
        }
        assert_eq!(Collection::from_name("nope"), None);
    }

    #[test]
    fn eq_filter_requires_exact_match() {
        let doc = json!({"is_active": true, "amount": 10.0});
        assert!(FieldFilter::Eq("is_active", json!(true)).matches(&doc));
        assert!(!FieldFilter::Eq("is_active", json!(false)).matches(&doc));
        assert!(!FieldFilter::Eq("missing", json!(true)).matches(&doc));
    }

    #[test]
    fn le_filter_orders_dates_lexicographically() {
        let doc = json!({"next_due_date": "2025-06-30"});
        assert!(FieldFilter::Le("next_due_date", json!("2025-07-01")).matches(&doc));
        assert!(FieldFilter::Le("next_due_date", json!("2025-06-30")).matches(&doc));
        assert!(!FieldFilter::Le("next_due_date", json!("2025-06-29")).matches(&doc));
    }
}
