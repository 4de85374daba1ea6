//! HTTP JSON API server
//!
//! Routes are organized into modules:
//! - routes::references: Reference collection CRUD and filtered queries
//! - routes::transactions: Stock movement entry
//! - routes::reports: Balance and turnover reports
//! - routes::settings: Runtime settings and blocking date control
//! - routes::export: Reference data export (csv, markdown, json, xml)

pub mod error;
pub mod routes;

use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;
use stockbook_config::{Config, SettingsStore};
use stockbook_core::{BalanceEngine, Ledger, LedgerEvent};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

pub use error::ApiError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<Ledger>>,
    pub settings: Arc<RwLock<SettingsStore>>,
    pub balances: Arc<BalanceEngine>,
    pub config: Config,
}

impl AppState {
    /// React to a ledger mutation. Unit edits change base-unit conversion,
    /// so the cached balances are rebuilt immediately; other events only
    /// log. Must be called without holding a ledger guard.
    pub async fn dispatch(&self, event: &LedgerEvent) {
        match event {
            LedgerEvent::UnitChanged { id } => {
                log::info!("Unit {} changed, rebuilding checkpoint", id);
                let blocking_date = self.settings.read().await.blocking_date();
                if let Some(date) = blocking_date {
                    let ledger = self.ledger.read().await;
                    self.balances.recompute_checkpoint(&ledger, date);
                }
            }
            other => log::debug!("Ledger event: {:?}", other),
        }
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    use routes::export::{export_references, export_references_default};
    use routes::references::{
        create_reference, delete_reference, filter_references, get_reference, list_references,
        update_reference,
    };
    use routes::reports::{balance_report, turnover_report};
    use routes::settings::{get_settings, set_blocking_date};
    use routes::transactions::{create_transaction, list_transactions};

    Router::new()
        .route("/api/accessibility", get(accessibility))
        .route("/api/references/:kind", get(list_references))
        .route("/api/references/:kind", post(create_reference))
        .route("/api/references/:kind/:id", get(get_reference))
        .route("/api/references/:kind/:id", put(update_reference))
        .route("/api/references/:kind/:id", delete(delete_reference))
        .route("/api/filter/:kind", post(filter_references))
        .route("/api/transactions", get(list_transactions))
        .route("/api/transactions", post(create_transaction))
        .route("/api/reports/balance", get(balance_report))
        .route("/api/reports/turnover", post(turnover_report))
        .route("/api/settings", get(get_settings))
        .route("/api/settings/blocking-date", post(set_blocking_date))
        .route("/api/export/:kind", get(export_references_default))
        .route("/api/export/:kind/:format", get(export_references))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn accessibility() -> &'static str {
    "SUCCESS"
}

/// Start the HTTP server.
///
/// Creates the router, binds to the configured address and serves until
/// shutdown.
pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let router = create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    eprintln!("[INFO] Starting stockbook server on http://{}", addr);
    eprintln!("[INFO] Available routes:");
    eprintln!("[INFO]   - /api/accessibility (Health check)");
    eprintln!("[INFO]   - /api/references/:kind (Reference CRUD)");
    eprintln!("[INFO]   - /api/filter/:kind (Filtered queries)");
    eprintln!("[INFO]   - /api/transactions (Stock movements)");
    eprintln!("[INFO]   - /api/reports/* (Balance and turnover reports)");
    eprintln!("[INFO]   - /api/settings (Runtime settings)");
    eprintln!("[INFO]   - /api/export/:kind[/:format] (Tabular export)");

    axum::serve(listener, router).await?;
    eprintln!("[INFO] Server stopped gracefully");
    Ok(())
}
