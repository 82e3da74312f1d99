use crate::dao::{self, Document};
use crate::memory::MemoryStore;
use crate::model::{Entity, Kind, Record, ValidationError, ValidationRules};
use crate::utils::{generate_id, with_timeout};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::error::ErrorKind;
use sqlx::PgPool;
use std::fmt;
use std::time::Duration;

const ID_GENERATION_ATTEMPTS: usize = 5;

#[derive(Debug)]
pub enum StoreError {
    Validation(ValidationError),
    NotFound(Kind),
    DuplicateId(String),
    IdsExhausted(Kind),
    Timeout(Duration),
    Corrupt(String),
    Database(sqlx::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Validation(err) => fmt::Display::fmt(err, f),
            StoreError::NotFound(kind) => f.write_str(&kind.not_found_message()),
            StoreError::DuplicateId(id) => write!(f, "Document id {id} is already taken"),
            StoreError::IdsExhausted(kind) => {
                write!(f, "Could not generate a unique id for new {kind}")
            }
            StoreError::Timeout(duration) => {
                write!(f, "Store did not answer within {}ms", duration.as_millis())
            }
            StoreError::Corrupt(message) => write!(f, "Malformed document: {message}"),
            StoreError::Database(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Validation(err) => Some(err),
            StoreError::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        StoreError::Validation(err)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

/// Raw document storage, untyped apart from the collection discriminator.
#[derive(Clone)]
pub enum Store {
    Postgres(PgPool),
    Memory(MemoryStore),
}

impl Store {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Postgres(_) => "postgres",
            Store::Memory(_) => "memory",
        }
    }

    async fn insert(
        &self,
        kind: Kind,
        id: &str,
        body: &Value,
        created_at: DateTime<Utc>,
    ) -> Result<Document, StoreError> {
        match self {
            Store::Postgres(pool) => dao::insert(pool, kind.collection(), id, body, created_at)
                .await
                .map_err(|err| match err {
                    sqlx::Error::Database(db_err)
                        if db_err.kind() == ErrorKind::UniqueViolation =>
                    {
                        StoreError::DuplicateId(id.to_string())
                    }
                    err => err.into(),
                }),
            Store::Memory(memory) => memory
                .insert(kind.collection(), id, body, created_at)
                .await
                .ok_or_else(|| StoreError::DuplicateId(id.to_string())),
        }
    }

    async fn find_all(&self, kind: Kind) -> Result<Vec<Document>, StoreError> {
        match self {
            Store::Postgres(pool) => Ok(dao::find_all(pool, kind.collection()).await?),
            Store::Memory(memory) => Ok(memory.find_all(kind.collection()).await),
        }
    }

    async fn merge(
        &self,
        kind: Kind,
        id: &str,
        patch: &Value,
    ) -> Result<Option<Document>, StoreError> {
        match self {
            Store::Postgres(pool) => Ok(dao::merge(pool, kind.collection(), id, patch).await?),
            Store::Memory(memory) => Ok(memory.merge(kind.collection(), id, patch).await),
        }
    }

    async fn exists(&self, kind: Kind, id: &str) -> Result<bool, StoreError> {
        match self {
            Store::Postgres(pool) => Ok(dao::exists(pool, kind.collection(), id).await?),
            Store::Memory(memory) => Ok(memory.exists(kind.collection(), id).await),
        }
    }

    async fn delete(&self, kind: Kind, id: &str) -> Result<bool, StoreError> {
        match self {
            Store::Postgres(pool) => Ok(dao::delete(pool, kind.collection(), id).await?),
            Store::Memory(memory) => Ok(memory.delete(kind.collection(), id).await),
        }
    }
}

/// Typed, validated access to the document collections.
#[derive(Clone)]
pub struct Repository {
    store: Store,
    rules: ValidationRules,
    timeout: Duration,
}

impl Repository {
    pub fn new(store: Store, rules: ValidationRules, timeout: Duration) -> Self {
        Self {
            store,
            rules,
            timeout,
        }
    }

    pub async fn create<E: Entity>(&self, input: E::Input) -> Result<Record<E>, StoreError> {
        let entity = E::from_input(input, &self.rules)?;
        let body =
            serde_json::to_value(&entity).map_err(|err| StoreError::Corrupt(err.to_string()))?;
        let created_at = Utc::now();
        for _ in 1..=ID_GENERATION_ATTEMPTS {
            let id = generate_id();
            let inserted = with_timeout(
                self.timeout,
                self.store.insert(E::KIND, &id, &body, created_at),
            )
            .await;
            match inserted {
                Ok(document) => return decode(E::KIND, document),
                Err(StoreError::DuplicateId(id)) => {
                    tracing::warn!("Generated {} id {} collides, retrying", E::KIND, id)
                }
                Err(err) => return Err(err),
            }
        }
        tracing::error!(
            "Could not persist new {}. Exhausted all retries of generating a unique id",
            E::KIND
        );
        Err(StoreError::IdsExhausted(E::KIND))
    }

    /// Every record of `E`, newest first.
    pub async fn get_all<E: Entity>(&self) -> Result<Vec<Record<E>>, StoreError> {
        with_timeout(self.timeout, self.store.find_all(E::KIND))
            .await?
            .into_iter()
            .map(|document| decode(E::KIND, document))
            .collect()
    }

    /// Replaces the supplied fields of `id`. An unknown id is reported as
    /// not found even when the supplied fields would not pass validation.
    pub async fn update<E: Entity>(
        &self,
        id: &str,
        input: E::Input,
    ) -> Result<Record<E>, StoreError> {
        if let Err(err) = E::check_patch(&input, &self.rules) {
            let exists = with_timeout(self.timeout, self.store.exists(E::KIND, id)).await?;
            return Err(if exists {
                err.into()
            } else {
                StoreError::NotFound(E::KIND)
            });
        }
        let patch =
            serde_json::to_value(&input).map_err(|err| StoreError::Corrupt(err.to_string()))?;
        let document = with_timeout(self.timeout, self.store.merge(E::KIND, id, &patch))
            .await?
            .ok_or(StoreError::NotFound(E::KIND))?;
        decode(E::KIND, document)
    }

    pub async fn delete<E: Entity>(&self, id: &str) -> Result<(), StoreError> {
        let deleted = with_timeout(self.timeout, self.store.delete(E::KIND, id)).await?;
        if deleted {
            Ok(())
        } else {
            Err(StoreError::NotFound(E::KIND))
        }
    }
}

fn decode<E: Entity>(kind: Kind, document: Document) -> Result<Record<E>, StoreError> {
    let fields = serde_json::from_value(document.body)
        .map_err(|err| StoreError::Corrupt(format!("{kind} {}: {err}", document.id)))?;
    Ok(Record {
        id: document.id,
        fields,
        created_at: document.created_at,
    })
}
