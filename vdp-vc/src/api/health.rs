//! Liveness and catalog readiness

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    /// Books in the loaded catalog; `None` until the first scan finishes
    pub catalog_books: Option<usize>,
}

/// GET /health
///
/// Public. Reports the catalog without scanning it, so a cold service
/// answers immediately.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "vdp-vc".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        catalog_books: state.catalog.loaded_books().await,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
