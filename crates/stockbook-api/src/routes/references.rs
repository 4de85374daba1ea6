//! Reference collection CRUD and filtered queries

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use stockbook_core::{FilterPredicate, ReferenceKind};

use crate::error::ApiError;
use crate::AppState;

fn parse_kind(kind: &str) -> Result<ReferenceKind, ApiError> {
    kind.parse::<ReferenceKind>()
        .map_err(ApiError::bad_request)
}

/// GET /api/references/:kind
pub async fn list_references(
    state: State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let ledger = state.ledger.read().await;
    Ok(Json(ledger.list(kind)))
}

/// GET /api/references/:kind/:id
pub async fn get_reference(
    state: State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let kind = parse_kind(&kind)?;
    let ledger = state.ledger.read().await;
    Ok(Json(ledger.get(kind, &id)?))
}

/// POST /api/references/:kind
pub async fn create_reference(
    state: State<AppState>,
    Path(kind): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let kind = parse_kind(&kind)?;
    let (created, event) = {
        let mut ledger = state.ledger.write().await;
        ledger.create(kind, payload)?
    };
    state.dispatch(&event).await;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/references/:kind/:id
pub async fn update_reference(
    state: State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let kind = parse_kind(&kind)?;
    let (updated, event) = {
        let mut ledger = state.ledger.write().await;
        ledger.update(kind, &id, payload)?
    };
    state.dispatch(&event).await;
    Ok(Json(updated))
}

/// DELETE /api/references/:kind/:id
pub async fn delete_reference(
    state: State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let kind = parse_kind(&kind)?;
    let event = {
        let mut ledger = state.ledger.write().await;
        ledger.delete(kind, &id)?
    };
    state.dispatch(&event).await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/filter/:kind
pub async fn filter_references(
    state: State<AppState>,
    Path(kind): Path<String>,
    Json(predicates): Json<Vec<FilterPredicate>>,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let ledger = state.ledger.read().await;
    Ok(Json(ledger.filter(kind, &predicates)))
}
