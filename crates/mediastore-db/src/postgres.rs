//! Postgres-backed document store (JSONB bodies in a single `documents` table).

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use std::time::Duration;
use uuid::Uuid;

use crate::document::{
    Condition, DocumentStore, Filter, FindOptions, SortOrder, StoreError, StoreResult,
};

const CONNECTION_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("Migration failed: {}", e)))
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn value_as_text(value: &Value) -> String {
    value
        .as_str()
        .map(String::from)
        .unwrap_or_else(|| value.to_string())
}

fn push_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    for condition in &filter.conditions {
        match condition {
            Condition::Eq(field, value) if field == "id" => {
                builder.push(" AND id::text = ").push_bind(value_as_text(value));
            }
            Condition::Ne(field, value) if field == "id" => {
                builder.push(" AND id::text <> ").push_bind(value_as_text(value));
            }
            Condition::Eq(field, value) => {
                builder
                    .push(" AND COALESCE(body -> ")
                    .push_bind(field.clone())
                    .push(", 'null'::jsonb) = ")
                    .push_bind(Json(value.clone()));
            }
            Condition::Ne(field, value) => {
                builder
                    .push(" AND COALESCE(body -> ")
                    .push_bind(field.clone())
                    .push(", 'null'::jsonb) <> ")
                    .push_bind(Json(value.clone()));
            }
            Condition::ContainsCi(field, needle) => {
                builder
                    .push(" AND body ->> ")
                    .push_bind(field.clone())
                    .push(" ILIKE ")
                    .push_bind(format!("%{}%", escape_like(needle)));
            }
            Condition::Prefix(field, prefix) => {
                builder
                    .push(" AND body ->> ")
                    .push_bind(field.clone())
                    .push(" LIKE ")
                    .push_bind(format!("{}%", escape_like(prefix)));
            }
            Condition::ContainsAny(field, values) => {
                builder
                    .push(" AND COALESCE(body -> ")
                    .push_bind(field.clone())
                    .push(", '[]'::jsonb) ?| ")
                    .push_bind(values.clone());
            }
        }
    }
}

fn with_id(id: Uuid, Json(mut body): Json<Value>) -> Value {
    if let Some(object) = body.as_object_mut() {
        object.insert("id".to_string(), Value::String(id.to_string()));
    }
    body
}

fn without_id(mut doc: Value) -> StoreResult<Value> {
    let object = doc
        .as_object_mut()
        .ok_or_else(|| StoreError::InvalidDocument("document must be an object".into()))?;
    object.remove("id");
    Ok(doc)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    #[tracing::instrument(skip(self, doc), fields(db.table = "documents"))]
    async fn insert_one(&self, collection: &str, doc: Value) -> StoreResult<String> {
        let body = without_id(doc)?;
        let id: Uuid = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            INSERT INTO documents (collection, body)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(collection)
        .bind(Json(body))
        .fetch_one(&self.pool)
        .await?;

        Ok(id.to_string())
    }

    #[tracing::instrument(skip(self, filter), fields(db.table = "documents"))]
    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Value>> {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT id, body FROM documents WHERE collection = ");
        builder.push_bind(collection.to_string());
        push_conditions(&mut builder, filter);
        builder.push(" ORDER BY created_at LIMIT 1");

        let row: Option<(Uuid, Json<Value>)> = builder
            .build_query_as::<(Uuid, Json<Value>)>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(id, body)| with_id(id, body)))
    }

    #[tracing::instrument(skip(self, filter, options), fields(db.table = "documents"))]
    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Value>> {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT id, body FROM documents WHERE collection = ");
        builder.push_bind(collection.to_string());
        push_conditions(&mut builder, filter);

        match &options.sort {
            Some((field, order)) => {
                builder.push(" ORDER BY body -> ").push_bind(field.clone());
                builder.push(match order {
                    SortOrder::Asc => " ASC",
                    SortOrder::Desc => " DESC",
                });
                builder.push(", created_at");
            }
            None => {
                builder.push(" ORDER BY created_at");
            }
        }

        if let Some(limit) = options.limit {
            builder
                .push(" LIMIT ")
                .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        builder
            .push(" OFFSET ")
            .push_bind(i64::try_from(options.offset).unwrap_or(i64::MAX));

        let rows: Vec<(Uuid, Json<Value>)> = builder
            .build_query_as::<(Uuid, Json<Value>)>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, body)| with_id(id, body))
            .collect())
    }

    #[tracing::instrument(skip(self, patch), fields(db.table = "documents"))]
    async fn update_one(&self, collection: &str, id: &str, patch: Value) -> StoreResult<bool> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(false);
        };
        let patch = without_id(patch)?;

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET body = body || $1
            WHERE collection = $2 AND id = $3
            "#,
        )
        .bind(Json(patch))
        .bind(collection)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents"))]
    async fn delete_one(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(false);
        };

        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self, filter), fields(db.table = "documents"))]
    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM documents WHERE collection = ");
        builder.push_bind(collection.to_string());
        push_conditions(&mut builder, filter);

        let count: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}
