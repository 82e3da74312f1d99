use crate::dao::Document;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local document store with the same ordering and merge rules as
/// the `documents` table.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

#[derive(Default)]
struct Collections {
    next_seq: u64,
    documents: HashMap<String, Vec<Entry>>,
}

struct Entry {
    seq: u64,
    document: Document,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` when `id` is already taken in `kind`.
    pub async fn insert(
        &self,
        kind: &str,
        id: &str,
        body: &Value,
        created_at: DateTime<Utc>,
    ) -> Option<Document> {
        let mut collections = self.inner.write().await;
        collections.next_seq += 1;
        let seq = collections.next_seq;
        let entries = collections.documents.entry(kind.to_string()).or_default();
        if entries.iter().any(|entry| entry.document.id == id) {
            return None;
        }
        let document = Document {
            id: id.to_string(),
            body: body.clone(),
            created_at,
        };
        entries.push(Entry {
            seq,
            document: document.clone(),
        });
        Some(document)
    }

    pub async fn find_all(&self, kind: &str) -> Vec<Document> {
        let collections = self.inner.read().await;
        let Some(entries) = collections.documents.get(kind) else {
            return Vec::new();
        };
        let mut sorted: Vec<&Entry> = entries.iter().collect();
        sorted.sort_by(|a, b| {
            b.document
                .created_at
                .cmp(&a.document.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        sorted.into_iter().map(|entry| entry.document.clone()).collect()
    }

    pub async fn merge(&self, kind: &str, id: &str, patch: &Value) -> Option<Document> {
        let mut collections = self.inner.write().await;
        let entry = collections
            .documents
            .get_mut(kind)?
            .iter_mut()
            .find(|entry| entry.document.id == id)?;
        match (&mut entry.document.body, patch) {
            (Value::Object(body), Value::Object(patch)) => {
                for (key, value) in patch {
                    body.insert(key.clone(), value.clone());
                }
            }
            (body, patch) => *body = patch.clone(),
        }
        Some(entry.document.clone())
    }

    pub async fn exists(&self, kind: &str, id: &str) -> bool {
        let collections = self.inner.read().await;
        collections
            .documents
            .get(kind)
            .is_some_and(|entries| entries.iter().any(|entry| entry.document.id == id))
    }

    pub async fn delete(&self, kind: &str, id: &str) -> bool {
        let mut collections = self.inner.write().await;
        let Some(entries) = collections.documents.get_mut(kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.document.id != id);
        entries.len() != before
    }
}
