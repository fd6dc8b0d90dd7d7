use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    DeleteResult, Document, DocumentId, DocumentStore, DocumentStream, Filter, InsertResult, Update, UpdateResult,
    ID_FIELD,
};
use crate::error::{AppError, AppResult};

const MEMORY_SCHEME: &str = "memory://";
const FILE_SCHEME: &str = "file://";

fn sanitize_collection(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

struct Inner {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    /// Directory holding one `<collection>.json` per collection when persistent.
    dir: Option<PathBuf>,
    /// Serializes persisted writes from snapshot copy through commit.
    write_lock: tokio::sync::Mutex<()>,
}

/// In-process document store.
///
/// Collections are insertion-ordered vectors behind a single `RwLock`, which
/// makes every write atomic per call. When opened on a directory, each
/// mutation is applied to a copy of the collection, written as that
/// collection's JSON snapshot (tmp file + rename), and only then made visible.
/// A failed snapshot write leaves the in-memory state untouched.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self { Self::new() }
}

impl MemoryStore {
    /// Purely in-memory store; contents are lost on drop.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                dir: None,
                write_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Open (or create) a persisted store rooted at `dir`, loading every
    /// `*.json` collection snapshot found there.
    pub fn open(dir: impl AsRef<Path>) -> AppResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(|e| AppError::unavailable(format!("cannot create {}: {}", dir.display(), e)))?;
        let mut collections: HashMap<String, Vec<Document>> = HashMap::new();
        let rd = std::fs::read_dir(&dir)
            .map_err(|e| AppError::unavailable(format!("cannot read {}: {}", dir.display(), e)))?;
        for ent in rd.flatten() {
            let path = ent.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") { continue; }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(|s| s.to_string()) else { continue; };
            let bytes = std::fs::read(&path)
                .map_err(|e| AppError::unavailable(format!("cannot read {}: {}", path.display(), e)))?;
            let docs: Vec<Document> = serde_json::from_slice(&bytes)
                .map_err(|e| AppError::unavailable(format!("corrupt snapshot {}: {}", path.display(), e)))?;
            debug!(target: "storage", collection = %name, documents = docs.len(), "loaded snapshot");
            collections.insert(name, docs);
        }
        info!(target: "storage", "document store opened at {} ({} collections)", dir.display(), collections.len());
        Ok(Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(collections),
                dir: Some(dir),
                write_lock: tokio::sync::Mutex::new(()),
            }),
        })
    }

    /// `memory://` (or empty) gives an in-memory store; anything else is a
    /// directory, optionally `file://`-prefixed, with `database` appended.
    pub fn from_uri(uri: &str, database: &str) -> AppResult<Self> {
        let uri = uri.trim();
        if uri.is_empty() || uri.starts_with(MEMORY_SCHEME) {
            info!(target: "storage", "using in-memory document store");
            return Ok(Self::new());
        }
        let root = uri.strip_prefix(FILE_SCHEME).unwrap_or(uri);
        Self::open(Path::new(root).join(database))
    }

    pub fn is_persistent(&self) -> bool { self.inner.dir.is_some() }

    fn snapshot_path(&self, collection: &str) -> Option<PathBuf> {
        self.inner.dir.as_ref().map(|d| d.join(format!("{}.json", sanitize_collection(collection))))
    }

    async fn write_snapshot(&self, path: &Path, docs: &[Document]) -> AppResult<()> {
        let bytes = serde_json::to_vec_pretty(docs)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| AppError::unavailable(format!("cannot write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| AppError::unavailable(format!("cannot replace {}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Run `op` against `collection`. `op` returns its result and whether it
    /// changed anything. In persisted mode the change is committed only after
    /// its snapshot is on disk.
    async fn mutate<R, F>(&self, collection: &str, op: F) -> AppResult<R>
    where
        F: FnOnce(&mut Vec<Document>) -> AppResult<(R, bool)> + Send,
        R: Send,
    {
        let Some(path) = self.snapshot_path(collection) else {
            let mut guard = self.inner.collections.write();
            let docs = guard.entry(collection.to_string()).or_default();
            return op(docs).map(|(result, _)| result);
        };

        let _writer = self.inner.write_lock.lock().await;
        let mut candidate = self.inner.collections.read().get(collection).cloned().unwrap_or_default();
        let (result, changed) = op(&mut candidate)?;
        if changed {
            if let Err(e) = self.write_snapshot(&path, &candidate).await {
                warn!(target: "storage", collection, "snapshot failed, write discarded: {}", e);
                return Err(e);
            }
            self.inner.collections.write().insert(collection.to_string(), candidate);
        }
        Ok(result)
    }

    /// Next document matching `filter` at or after `*pos`, advancing the cursor.
    fn next_match(&self, collection: &str, filter: &Filter, pos: &mut usize) -> Option<Document> {
        let guard = self.inner.collections.read();
        let docs = guard.get(collection)?;
        while *pos < docs.len() {
            let doc = &docs[*pos];
            *pos += 1;
            if filter.matches(doc) {
                return Some(doc.clone());
            }
        }
        None
    }
}

fn id_of(doc: &Document) -> AppResult<Option<DocumentId>> {
    match doc.get(ID_FIELD) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => s.parse().map(Some),
        Some(other) => Err(AppError::invalid_key(format!("unsupported _id value {}", other))),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, collection: &str, mut doc: Document) -> AppResult<InsertResult> {
        let id = match id_of(&doc)? {
            Some(id) => id,
            None => DocumentId::generate(),
        };
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));
        self.mutate(collection, move |docs| {
            let id_filter = Filter::by_id(id);
            if docs.iter().any(|d| id_filter.matches(d)) {
                return Err(AppError::user("duplicate_key".to_string(), format!("duplicate _id {}", id)));
            }
            docs.push(doc);
            Ok((InsertResult { acknowledged: true, inserted_id: id }, true))
        })
        .await
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> AppResult<Option<Document>> {
        let mut pos = 0;
        Ok(self.next_match(collection, filter, &mut pos))
    }

    async fn find(&self, collection: &str, filter: &Filter) -> AppResult<Vec<Document>> {
        let guard = self.inner.collections.read();
        Ok(guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    fn find_stream(&self, collection: &str, filter: Filter) -> DocumentStream {
        let this = self.clone();
        let collection = collection.to_string();
        Box::pin(async_stream::stream! {
            let mut pos = 0usize;
            while let Some(doc) = this.next_match(&collection, &filter, &mut pos) {
                yield Ok(doc);
            }
        })
    }

    async fn update_one(&self, collection: &str, filter: &Filter, update: &Update, upsert: bool) -> AppResult<UpdateResult> {
        self.mutate(collection, |docs| {
            if let Some(doc) = docs.iter_mut().find(|d| filter.matches(d)) {
                let modified = update.apply(doc);
                return Ok((UpdateResult::matched(modified), modified));
            }
            if !upsert {
                return Ok((UpdateResult::unmatched(), false));
            }
            let mut doc = filter.seed_document();
            let id = match id_of(&doc)? {
                Some(id) => id,
                None => DocumentId::generate(),
            };
            doc.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));
            update.apply(&mut doc);
            docs.push(doc);
            Ok((UpdateResult::upserted(id), true))
        })
        .await
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> AppResult<DeleteResult> {
        self.mutate(collection, |docs| {
            let removed = match docs.iter().position(|d| filter.matches(d)) {
                Some(idx) => {
                    docs.remove(idx);
                    true
                }
                None => false,
            };
            Ok((DeleteResult { acknowledged: true, deleted_count: removed as u64 }, removed))
        })
        .await
    }
}
