use crate::error::{ApiError, Operation, Payload};
use crate::model::{Entity, Record};
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    message: &'static str,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    message: String,
}

/// The list/create/update/delete family for one entity kind.
pub fn collection<E: Entity>() -> Router<AppState> {
    let path = E::KIND.path();
    Router::new()
        .route(
            path,
            get(list::<E>).post(create::<E>).fallback(method_not_allowed),
        )
        .route(
            &format!("{path}/:id"),
            put(update::<E>)
                .delete(delete::<E>)
                .fallback(method_not_allowed),
        )
}

pub async fn list<E: Entity>(
    State(state): State<AppState>,
) -> Result<Json<Vec<Record<E>>>, ApiError> {
    let records = state
        .repository
        .get_all::<E>()
        .await
        .map_err(|err| ApiError::from_store(err, Operation::List))?;
    Ok(Json(records))
}

pub async fn create<E: Entity>(
    State(state): State<AppState>,
    Payload(input): Payload<E::Input>,
) -> Result<(StatusCode, Json<Record<E>>), ApiError> {
    let record = state
        .repository
        .create::<E>(input)
        .await
        .map_err(|err| ApiError::from_store(err, Operation::Create))?;
    tracing::debug!("Created {} {}", E::KIND, record.id);
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update<E: Entity>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Payload(input): Payload<E::Input>,
) -> Result<Json<Record<E>>, ApiError> {
    let record = state
        .repository
        .update::<E>(&id, input)
        .await
        .map_err(|err| ApiError::from_store(err, Operation::Update))?;
    tracing::debug!("Updated {} {}", E::KIND, id);
    Ok(Json(record))
}

pub async fn delete<E: Entity>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .repository
        .delete::<E>(&id)
        .await
        .map_err(|err| ApiError::from_store(err, Operation::Delete))?;
    tracing::debug!("Deleted {} {}", E::KIND, id);
    Ok(Json(MessageResponse {
        message: E::KIND.deleted_message(),
    }))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Server is running",
        timestamp: Utc::now(),
    })
}

pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::method_not_allowed(format!("Method {method} not allowed"))
}

pub async fn fallback() -> ApiError {
    ApiError::not_found("Route not found")
}
