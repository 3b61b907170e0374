use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{types::Json, FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{apply_ops, Document, DocumentStore, Filter, NewDocument, Patch};
use crate::database::Database;
use crate::error::StoreError;

const COLUMNS: &str = "id, doc_type, rev, body, created_at, updated_at";

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    doc_type: String,
    rev: i64,
    body: Json<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            doc_type: row.doc_type,
            rev: row.rev,
            body: row.body.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Documents kept as JSONB rows in a single `documents` table.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: Database,
}

impl PgDocumentStore {
    pub fn new(pool: Database) -> Self {
        Self { pool }
    }
}

fn path_segments(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn query(&self, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM documents WHERE doc_type = ", COLUMNS));
        qb.push_bind(filter.doc_type.clone());

        for (path, value) in &filter.eq {
            qb.push(" AND body #> ");
            qb.push_bind(path_segments(path));
            qb.push(" = ");
            qb.push_bind(Json(value.clone()));
        }

        if let Some((path, prefix)) = &filter.prefix {
            qb.push(" AND body #>> ");
            qb.push_bind(path_segments(path));
            qb.push(" LIKE ");
            qb.push_bind(format!("{}%", escape_like(prefix)));
        }

        match &filter.order_by {
            Some(path) => {
                qb.push(" ORDER BY body #>> ");
                qb.push_bind(path_segments(path));
            }
            None => {
                qb.push(" ORDER BY created_at, id");
            }
        }

        let rows = qb
            .build_query_as::<DocumentRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Document::from))
    }

    async fn create(&self, new: NewDocument) -> Result<Document, StoreError> {
        let mut tx = self.pool.begin().await?;

        for field in &new.unique {
            let Some(value) = new.body.get(field).filter(|v| !v.is_null()) else {
                continue;
            };

            // Serialises concurrent creates that compete for the same unique field.
            sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind(format!("{}.{}", new.doc_type, field))
                .execute(&mut *tx)
                .await?;

            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM documents WHERE doc_type = $1 AND body -> $2 = $3)",
            )
            .bind(&new.doc_type)
            .bind(field)
            .bind(Json(value.clone()))
            .fetch_one(&mut *tx)
            .await?;

            if taken {
                return Err(StoreError::Conflict {
                    doc_type: new.doc_type.clone(),
                    field: field.clone(),
                    value: value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string()),
                });
            }
        }

        let id = new.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "INSERT INTO documents (id, doc_type, rev, body) VALUES ($1, $2, 1, $3) \
             ON CONFLICT (id) DO NOTHING RETURNING {}",
            COLUMNS
        ))
        .bind(&id)
        .bind(&new.doc_type)
        .bind(Json(new.body))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::Conflict {
            doc_type: new.doc_type.clone(),
            field: "_id".to_string(),
            value: id.clone(),
        })?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn create_if_not_exists(
        &self,
        id: &str,
        doc_type: &str,
        body: Value,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO documents (id, doc_type, rev, body) VALUES ($1, $2, 1, $3) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .bind(doc_type)
        .bind(Json(body))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn patch(&self, id: &str, patch: Patch) -> Result<Document, StoreError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents WHERE id = $1 FOR UPDATE",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::Missing(id.to_string()))?;

        if let Some(expected) = patch.if_revision {
            if expected != current.rev {
                return Err(StoreError::RevisionMismatch {
                    id: id.to_string(),
                    expected,
                    actual: current.rev,
                });
            }
        }

        let mut body = current.body.0;
        apply_ops(&mut body, &patch.ops)?;

        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "UPDATE documents SET body = $2, rev = rev + 1, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            COLUMNS
        ))
        .bind(id)
        .bind(Json(body))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("LAB_-"), "LAB\\_-");
        assert_eq!(escape_like("50%"), "50\\%");
    }

    #[test]
    fn dotted_paths_split_into_segments() {
        assert_eq!(path_segments("owner._ref"), vec!["owner", "_ref"]);
        assert_eq!(path_segments("itemId"), vec!["itemId"]);
    }
}
