//! Runtime settings endpoints

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use stockbook_utils::format_datetime;

use super::parse_date;
use crate::error::ApiError;
use crate::AppState;

/// GET /api/settings
pub async fn get_settings(state: State<AppState>) -> Json<serde_json::Value> {
    let settings = state.settings.read().await;
    Json(serde_json::to_value(settings.settings()).unwrap_or(serde_json::Value::Null))
}

#[derive(Debug, Deserialize)]
pub struct BlockingDateRequest {
    /// `null` clears the blocking date
    pub blocking_date: Option<String>,
}

/// POST /api/settings/blocking-date
///
/// Persists the new blocking date, then rebuilds the checkpoint so
/// subsequent balance queries can take the fast path. The recomputation
/// outcome is reported but never fails the request.
pub async fn set_blocking_date(
    state: State<AppState>,
    Json(request): Json<BlockingDateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let blocking_date = match &request.blocking_date {
        Some(raw) => Some(parse_date(raw)?),
        None => None,
    };

    {
        let mut settings = state.settings.write().await;
        settings.set_blocking_date(blocking_date).map_err(|e| {
            log::error!("Failed to persist settings: {}", e);
            ApiError::InternalError
        })?;
    }

    let recomputed = match blocking_date {
        Some(date) => {
            let ledger = state.ledger.read().await;
            state.balances.recompute_checkpoint(&ledger, date)
        }
        None => false,
    };

    Ok(Json(serde_json::json!({
        "blocking_date": blocking_date.map(|d| format_datetime(&d)),
        "checkpoint_recomputed": recomputed,
    })))
}
