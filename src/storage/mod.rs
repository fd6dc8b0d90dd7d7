//!
//! workroom storage module
//! ------------------------
//! A small document-store abstraction modelled on the operations the HTTP
//! layer needs: insert one document, find one or many by an equality filter,
//! stream a lazy cursor, update one document with `$set` / `$addToSet` /
//! `$pull` style operators (optionally upserting), and delete one document.
//!
//! Documents are plain JSON objects. Every stored document carries an `_id`
//! field holding a 24-hex `DocumentId`. Filters are conjunctions of equality
//! terms; a term against an array field matches when the array contains the
//! value. An empty filter matches every document, in insertion order.
//!
//! The public API centers around the `DocumentStore` trait, usually shared as
//! `SharedStore` (`Arc<dyn DocumentStore>`) and addressed per collection
//! through the `Collection` handle.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::Serialize;
use serde_json::Value;

use crate::error::AppResult;

pub mod memory;
mod object_id;

pub use memory::MemoryStore;
pub use object_id::DocumentId;

/// A stored record: a JSON object with an `_id`.
pub type Document = serde_json::Map<String, Value>;

/// Lazy sequence of documents in the order the store yields them.
pub type DocumentStream = BoxStream<'static, AppResult<Document>>;

pub type SharedStore = Arc<dyn DocumentStore>;

pub const ID_FIELD: &str = "_id";

/// Conjunction of `field == value` terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    terms: Vec<(String, Value)>,
}

impl Filter {
    /// Matches every document.
    pub fn all() -> Self { Self::default() }

    pub fn by_id(id: DocumentId) -> Self { Self::all().eq(ID_FIELD, id.to_hex()) }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.terms.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    pub fn terms(&self) -> &[(String, Value)] { &self.terms }

    pub fn matches(&self, doc: &Document) -> bool {
        self.terms.iter().all(|(field, expected)| match doc.get(field) {
            Some(Value::Array(items)) => {
                items.contains(expected) || matches!(expected, Value::Array(e) if e == items)
            }
            Some(actual) => actual == expected,
            // a null term also matches an absent field
            None => expected.is_null(),
        })
    }

    /// Starting document for an upsert that matched nothing.
    pub(crate) fn seed_document(&self) -> Document {
        let mut doc = Document::new();
        for (field, value) in &self.terms {
            doc.insert(field.clone(), value.clone());
        }
        doc
    }
}

/// Field-level update operators applied atomically to one document.
///
/// Order of application: `$set`, then `$addToSet`, then `$pull`. `_id` is
/// immutable and is ignored by `$set`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Document,
    add_to_set: Vec<(String, Vec<Value>)>,
    pull: Vec<(String, Vec<Value>)>,
}

impl Update {
    pub fn new() -> Self { Self::default() }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        if field != ID_FIELD {
            self.set.insert(field, value.into());
        }
        self
    }

    /// `$set` every field of `patch`.
    pub fn set_all(mut self, patch: Document) -> Self {
        for (k, v) in patch {
            if k != ID_FIELD {
                self.set.insert(k, v);
            }
        }
        self
    }

    /// Set-union `values` into the array at `field`.
    pub fn add_to_set(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.add_to_set.push((field.into(), values));
        self
    }

    /// Remove every occurrence of `values` from the array at `field`.
    pub fn pull(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.pull.push((field.into(), values));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.add_to_set.is_empty() && self.pull.is_empty()
    }

    /// Apply to `doc` in place; returns true when the document changed.
    ///
    /// A scalar found where an array is expected is treated as a one-element
    /// array, so `$pull` on a single pending email still clears it.
    pub fn apply(&self, doc: &mut Document) -> bool {
        let before = doc.clone();
        for (k, v) in &self.set {
            doc.insert(k.clone(), v.clone());
        }
        for (field, values) in &self.add_to_set {
            let mut items = take_array(doc, field);
            for v in values {
                if !items.contains(v) {
                    items.push(v.clone());
                }
            }
            doc.insert(field.clone(), Value::Array(items));
        }
        for (field, values) in &self.pull {
            if !doc.contains_key(field) { continue; }
            let mut items = take_array(doc, field);
            items.retain(|item| !values.contains(item));
            doc.insert(field.clone(), Value::Array(items));
        }
        *doc != before
    }
}

fn take_array(doc: &mut Document, field: &str) -> Vec<Value> {
    match doc.remove(field) {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => Vec::new(),
        Some(scalar) => vec![scalar],
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: DocumentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<DocumentId>,
    pub upserted_count: u64,
}

impl UpdateResult {
    pub fn matched(modified: bool) -> Self {
        Self { acknowledged: true, matched_count: 1, modified_count: modified as u64, upserted_id: None, upserted_count: 0 }
    }

    pub fn upserted(id: DocumentId) -> Self {
        Self { acknowledged: true, matched_count: 0, modified_count: 0, upserted_id: Some(id), upserted_count: 1 }
    }

    pub fn unmatched() -> Self {
        Self { acknowledged: true, matched_count: 0, modified_count: 0, upserted_id: None, upserted_count: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Backend seam for the record access layer.
///
/// Each call is atomic with respect to a single document; there are no
/// multi-document transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert `doc`, assigning an `_id` when it has none.
    async fn insert_one(&self, collection: &str, doc: Document) -> AppResult<InsertResult>;

    /// First document matching `filter`, in insertion order.
    async fn find_one(&self, collection: &str, filter: &Filter) -> AppResult<Option<Document>>;

    async fn find(&self, collection: &str, filter: &Filter) -> AppResult<Vec<Document>>;

    /// Lazy cursor over the documents matching `filter`.
    fn find_stream(&self, collection: &str, filter: Filter) -> DocumentStream;

    /// Update the first document matching `filter`. With `upsert`, a miss
    /// inserts a document seeded from the filter's terms.
    async fn update_one(&self, collection: &str, filter: &Filter, update: &Update, upsert: bool) -> AppResult<UpdateResult>;

    async fn delete_one(&self, collection: &str, filter: &Filter) -> AppResult<DeleteResult>;
}

/// A named collection on a shared store.
#[derive(Clone)]
pub struct Collection {
    store: SharedStore,
    name: &'static str,
}

impl Collection {
    pub fn new(store: SharedStore, name: &'static str) -> Self { Self { store, name } }

    pub fn name(&self) -> &'static str { self.name }

    pub async fn create(&self, doc: Document) -> AppResult<InsertResult> {
        self.store.insert_one(self.name, doc).await
    }

    pub async fn find_one(&self, filter: &Filter) -> AppResult<Option<Document>> {
        self.store.find_one(self.name, filter).await
    }

    pub async fn find_many(&self, filter: &Filter) -> AppResult<Vec<Document>> {
        self.store.find(self.name, filter).await
    }

    pub fn stream(&self, filter: Filter) -> DocumentStream {
        self.store.find_stream(self.name, filter)
    }

    /// Update with `upsert = true`.
    pub async fn update_or_upsert(&self, filter: &Filter, update: &Update) -> AppResult<UpdateResult> {
        self.store.update_one(self.name, filter, update, true).await
    }

    pub async fn delete_one(&self, filter: &Filter) -> AppResult<DeleteResult> {
        self.store.delete_one(self.name, filter).await
    }
}
