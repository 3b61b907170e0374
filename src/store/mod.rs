//! Document store capability.
//!
//! Inventory items, team members and daily activity logs are schema-less JSON
//! documents addressed by an opaque id and grouped by a document type. The
//! store guarantees that a single `Patch` is applied atomically to one
//! document; there are no cross-document transactions.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::StoreError;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub doc_type: String,
    pub rev: i64,
    pub body: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.body.clone())
            .map_err(|e| StoreError::Malformed(format!("{} ({}): {}", self.id, self.doc_type, e)))
    }

    /// Reads a dotted path such as `owner._ref` out of the body.
    pub fn field(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.body, path)
    }
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: Option<String>,
    pub doc_type: String,
    pub body: Value,
    /// Top-level fields whose values must be unique among documents of `doc_type`.
    pub unique: Vec<String>,
}

impl NewDocument {
    pub fn new(doc_type: impl Into<String>, body: Value) -> Self {
        Self {
            id: None,
            doc_type: doc_type.into(),
            body,
            unique: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn unique_on(mut self, field: impl Into<String>) -> Self {
        self.unique.push(field.into());
        self
    }
}

/// A filtered read over one document type.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub doc_type: String,
    pub eq: Vec<(String, Value)>,
    pub prefix: Option<(String, String)>,
    pub order_by: Option<String>,
}

impl Filter {
    pub fn by_type(doc_type: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            ..Self::default()
        }
    }

    pub fn eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.eq.push((path.into(), value.into()));
        self
    }

    pub fn prefix(mut self, path: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.prefix = Some((path.into(), prefix.into()));
        self
    }

    pub fn order_by(mut self, path: impl Into<String>) -> Self {
        self.order_by = Some(path.into());
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        if doc.doc_type != self.doc_type {
            return false;
        }
        let eq_ok = self
            .eq
            .iter()
            .all(|(path, expected)| doc.field(path) == Some(expected));
        let prefix_ok = match &self.prefix {
            Some((path, prefix)) => doc
                .field(path)
                .and_then(Value::as_str)
                .map_or(false, |s| s.starts_with(prefix.as_str())),
            None => true,
        };
        eq_ok && prefix_ok
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    Set(String, Value),
    SetIfMissing(String, Value),
    Unset(String),
    Append(String, Vec<Value>),
    Prepend(String, Vec<Value>),
    Inc(String, i64),
}

/// An ordered list of field operations applied atomically to one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub if_revision: Option<i64>,
    pub ops: Vec<PatchOp>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn if_revision(mut self, rev: i64) -> Self {
        self.if_revision = Some(rev);
        self
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(PatchOp::Set(field.into(), value.into()));
        self
    }

    pub fn set_if_missing(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(PatchOp::SetIfMissing(field.into(), value.into()));
        self
    }

    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.ops.push(PatchOp::Unset(field.into()));
        self
    }

    pub fn append(mut self, field: impl Into<String>, items: Vec<Value>) -> Self {
        self.ops.push(PatchOp::Append(field.into(), items));
        self
    }

    pub fn prepend(mut self, field: impl Into<String>, items: Vec<Value>) -> Self {
        self.ops.push(PatchOp::Prepend(field.into(), items));
        self
    }

    pub fn inc(mut self, field: impl Into<String>, by: i64) -> Self {
        self.ops.push(PatchOp::Inc(field.into(), by));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn query(&self, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Document>, StoreError>;

    /// Creates a document, failing with `StoreError::Conflict` when a unique field collides.
    async fn create(&self, doc: NewDocument) -> Result<Document, StoreError>;

    /// Returns `true` when the document was created by this call.
    async fn create_if_not_exists(
        &self,
        id: &str,
        doc_type: &str,
        body: Value,
    ) -> Result<bool, StoreError>;

    async fn patch(&self, id: &str, patch: Patch) -> Result<Document, StoreError>;
}

/// Applies patch operations to a document body in order.
pub fn apply_ops(body: &mut Value, ops: &[PatchOp]) -> Result<(), StoreError> {
    let obj = body
        .as_object_mut()
        .ok_or_else(|| StoreError::Malformed("document body is not an object".to_string()))?;

    for op in ops {
        match op {
            PatchOp::Set(field, value) => {
                obj.insert(field.clone(), value.clone());
            }
            PatchOp::SetIfMissing(field, value) => {
                if obj.get(field).map_or(true, Value::is_null) {
                    obj.insert(field.clone(), value.clone());
                }
            }
            PatchOp::Unset(field) => {
                obj.remove(field);
            }
            PatchOp::Append(field, items) => {
                array_field(obj, field)?.extend(items.iter().cloned());
            }
            PatchOp::Prepend(field, items) => {
                let arr = array_field(obj, field)?;
                let tail = std::mem::take(arr);
                arr.extend(items.iter().cloned());
                arr.extend(tail);
            }
            PatchOp::Inc(field, by) => {
                let current = match obj.get(field) {
                    None | Some(Value::Null) => 0,
                    Some(v) => v.as_i64().ok_or_else(|| {
                        StoreError::Malformed(format!("{} is not an integer", field))
                    })?,
                };
                obj.insert(field.clone(), Value::from(current + by));
            }
        }
    }
    Ok(())
}

fn array_field<'a>(
    obj: &'a mut Map<String, Value>,
    field: &str,
) -> Result<&'a mut Vec<Value>, StoreError> {
    let slot = obj
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    slot.as_array_mut()
        .ok_or_else(|| StoreError::Malformed(format!("{} is not an array", field)))
}

pub(crate) fn lookup_path<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(body, |node, key| node.get(key))
}
