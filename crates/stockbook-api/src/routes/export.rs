//! Reference data export through the tabular formatters

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use stockbook_core::ReferenceKind;
use stockbook_export::ExportFormat;

use crate::error::ApiError;
use crate::AppState;

/// GET /api/export/:kind/:format
pub async fn export_references(
    state: State<AppState>,
    Path((kind, format)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let format = format.parse::<ExportFormat>()?;
    render_export(&state, &kind, format).await
}

/// GET /api/export/:kind
///
/// Uses the `export_format` setting as the format.
pub async fn export_references_default(
    state: State<AppState>,
    Path(kind): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let format = {
        let settings = state.settings.read().await;
        configured_format(&settings.settings().export_format)?
    };
    render_export(&state, &kind, format).await
}

/// Parse the persisted default format, rejecting unusable settings values
fn configured_format(raw: &str) -> Result<ExportFormat, ApiError> {
    raw.parse::<ExportFormat>().map_err(|e| {
        log::warn!("Configured export format {:?} is not usable: {}", raw, e);
        ApiError::bad_request(format!("Configured export format is invalid: {}", raw))
    })
}

async fn render_export(
    state: &AppState,
    kind: &str,
    format: ExportFormat,
) -> Result<impl IntoResponse, ApiError> {
    let kind = kind
        .parse::<ReferenceKind>()
        .map_err(ApiError::bad_request)?;
    let rows = {
        let ledger = state.ledger.read().await;
        ledger.list(kind)
    };
    let document = stockbook_export::export(format, &rows)?;
    Ok(([(header::CONTENT_TYPE, format.content_type())], document))
}

// ==================== Tests ====================
