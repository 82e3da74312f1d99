use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Error, FromRow, PgPool};

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Document {
    pub id: String,
    pub body: Value,
    pub created_at: DateTime<Utc>,
}

pub async fn insert(
    db_connection_pool: &PgPool,
    kind: &str,
    id: &str,
    body: &Value,
    created_at: DateTime<Utc>,
) -> Result<Document, Error> {
    sqlx::query_as(
        r#"
              insert into documents(kind, id, body, created_at) values ($1, $2, $3, $4)
              returning id, body, created_at
            "#,
    )
    .bind(kind)
    .bind(id)
    .bind(body)
    .bind(created_at)
    .fetch_one(db_connection_pool)
    .await
}

pub async fn find_all(db_connection_pool: &PgPool, kind: &str) -> Result<Vec<Document>, Error> {
    sqlx::query_as(
        r#"
              select id, body, created_at from documents
              where kind = $1
              order by created_at desc, seq desc
            "#,
    )
    .bind(kind)
    .fetch_all(db_connection_pool)
    .await
}

/// Shallow-merges `patch` into the stored body; keys absent from `patch` keep their values.
pub async fn merge(
    db_connection_pool: &PgPool,
    kind: &str,
    id: &str,
    patch: &Value,
) -> Result<Option<Document>, Error> {
    sqlx::query_as(
        r#"
              update documents set body = body || $1
              where kind = $2 and id = $3
              returning id, body, created_at
            "#,
    )
    .bind(patch)
    .bind(kind)
    .bind(id)
    .fetch_optional(db_connection_pool)
    .await
}

pub async fn exists(db_connection_pool: &PgPool, kind: &str, id: &str) -> Result<bool, Error> {
    sqlx::query_scalar("select exists(select 1 from documents where kind = $1 and id = $2)")
        .bind(kind)
        .bind(id)
        .fetch_one(db_connection_pool)
        .await
}

pub async fn delete(db_connection_pool: &PgPool, kind: &str, id: &str) -> Result<bool, Error> {
    let result = sqlx::query("delete from documents where kind = $1 and id = $2")
        .bind(kind)
        .bind(id)
        .execute(db_connection_pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
