use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{apply_ops, lookup_path, Document, DocumentStore, Filter, NewDocument, Patch};
use crate::error::StoreError;

/// In-process document store. Every call holds one lock, so patches are atomic
/// exactly as they are against Postgres.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a document outright. Deletion is an administrative operation,
    /// so it lives here rather than on `DocumentStore`.
    pub async fn delete(&self, id: &str) -> bool {
        self.docs.lock().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.docs.lock().await.len()
    }

    pub async fn count_of_type(&self, doc_type: &str) -> usize {
        self.docs
            .lock()
            .await
            .values()
            .filter(|d| d.doc_type == doc_type)
            .count()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(&self, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let docs = self.docs.lock().await;
        let mut found: Vec<Document> =
            docs.values().filter(|d| filter.matches(d)).cloned().collect();

        match &filter.order_by {
            Some(path) => found.sort_by(|a, b| {
                compare_values(lookup_path(&a.body, path), lookup_path(&b.body, path))
            }),
            None => found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))),
        }
        Ok(found)
    }

    async fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.docs.lock().await.get(id).cloned())
    }

    async fn create(&self, new: NewDocument) -> Result<Document, StoreError> {
        let mut docs = self.docs.lock().await;

        for field in &new.unique {
            let Some(value) = new.body.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = docs
                .values()
                .any(|d| d.doc_type == new.doc_type && d.body.get(field) == Some(value));
            if taken {
                return Err(StoreError::Conflict {
                    doc_type: new.doc_type.clone(),
                    field: field.clone(),
                    value: value_label(value),
                });
            }
        }

        let id = new.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if docs.contains_key(&id) {
            return Err(StoreError::Conflict {
                doc_type: new.doc_type,
                field: "_id".to_string(),
                value: id,
            });
        }

        let now = Utc::now();
        let doc = Document {
            id: id.clone(),
            doc_type: new.doc_type,
            rev: 1,
            body: new.body,
            created_at: now,
            updated_at: now,
        };
        docs.insert(id, doc.clone());
        Ok(doc)
    }

    async fn create_if_not_exists(
        &self,
        id: &str,
        doc_type: &str,
        body: Value,
    ) -> Result<bool, StoreError> {
        let mut docs = self.docs.lock().await;
        if docs.contains_key(id) {
            return Ok(false);
        }
        let now = Utc::now();
        docs.insert(
            id.to_string(),
            Document {
                id: id.to_string(),
                doc_type: doc_type.to_string(),
                rev: 1,
                body,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(true)
    }

    async fn patch(&self, id: &str, patch: Patch) -> Result<Document, StoreError> {
        let mut docs = self.docs.lock().await;
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| StoreError::Missing(id.to_string()))?;

        if let Some(expected) = patch.if_revision {
            if expected != doc.rev {
                return Err(StoreError::RevisionMismatch {
                    id: id.to_string(),
                    expected,
                    actual: doc.rev,
                });
            }
        }

        let mut body = doc.body.clone();
        apply_ops(&mut body, &patch.ops)?;
        doc.body = body;
        doc.rev += 1;
        doc.updated_at = Utc::now();
        Ok(doc.clone())
    }
}

fn value_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => value_label(x).cmp(&value_label(y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
