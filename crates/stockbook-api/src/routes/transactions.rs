//! Stock movement entry

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use stockbook_core::{LedgerEvent, TransactionPayload};

use crate::error::ApiError;
use crate::AppState;

/// POST /api/transactions
pub async fn create_transaction(
    state: State<AppState>,
    Json(payload): Json<TransactionPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let mut ledger = state.ledger.write().await;
    let event = ledger.add_transaction(payload)?;
    let LedgerEvent::TransactionAdded { id } = &event else {
        return Err(ApiError::InternalError);
    };
    let created = ledger
        .transaction(id)
        .map(|tx| serde_json::to_value(tx).unwrap_or(serde_json::Value::Null))
        .unwrap_or(serde_json::Value::Null);
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/transactions
pub async fn list_transactions(
    state: State<AppState>,
) -> Json<Vec<serde_json::Value>> {
    let ledger = state.ledger.read().await;
    let rows = ledger
        .transactions()
        .iter()
        .map(|tx| serde_json::to_value(tx).unwrap_or(serde_json::Value::Null))
        .collect();
    Json(rows)
}
