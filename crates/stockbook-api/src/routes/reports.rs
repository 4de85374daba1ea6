//! Balance and turnover report endpoints

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use stockbook_core::{BalanceReportRow, FilterPredicate, TurnoverReportEngine, TurnoverRow};

use super::parse_date;
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    /// Target date; defaults to now
    pub date: Option<String>,
    /// Storage id to scope the report to
    pub storage: Option<String>,
}

/// GET /api/reports/balance
pub async fn balance_report(
    state: State<AppState>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<Vec<BalanceReportRow>>, ApiError> {
    let target_date = match &query.date {
        Some(raw) => parse_date(raw)?,
        None => chrono::Local::now().naive_local(),
    };
    let blocking_date = state.settings.read().await.blocking_date();
    let ledger = state.ledger.read().await;
    let rows = state.balances.balance_report(
        &ledger,
        blocking_date,
        target_date,
        query.storage.as_deref(),
    );
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct TurnoverRequest {
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub filters: Vec<FilterPredicate>,
}

/// POST /api/reports/turnover
pub async fn turnover_report(
    state: State<AppState>,
    Json(request): Json<TurnoverRequest>,
) -> Result<Json<Vec<TurnoverRow>>, ApiError> {
    let start = parse_date(&request.start_date)?;
    let end = parse_date(&request.end_date)?;
    let ledger = state.ledger.read().await;
    let rows = TurnoverReportEngine::generate(
        &ledger,
        start,
        end,
        request.storage.as_deref(),
        &request.filters,
    )?;
    Ok(Json(rows))
}
