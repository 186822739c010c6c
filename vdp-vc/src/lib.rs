//! vdp-vc library - Vocabulary Catalog service
//!
//! Loads vocabulary books from disk through the repair and normalization
//! pipeline, serves them over HTTP, and accepts learner progress updates
//! into the shared cache store.

use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use vdp_common::cache::CacheStore;
use vdp_common::db::ProgressStore;
use vdp_common::progress::ProgressWriter;

pub mod api;
pub mod pagination;
pub mod vocab;

use vocab::Catalog;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    /// Low-latency progress and session store
    pub cache: Arc<dyn CacheStore>,
    /// Reconciled progress records
    pub durable: Arc<dyn ProgressStore>,
    pub writer: ProgressWriter,
}

impl AppState {
    pub fn new(
        catalog: Arc<Catalog>,
        cache: Arc<dyn CacheStore>,
        durable: Arc<dyn ProgressStore>,
    ) -> Self {
        let writer = ProgressWriter::new(Arc::clone(&cache));
        Self {
            catalog,
            cache,
            durable,
            writer,
        }
    }
}

/// Build application router
///
/// Catalog reads and `/health` are public; progress routes need a session.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let protected = Router::new()
        .route("/api/vocab/status", post(api::update_status))
        .route("/api/vocab/progress", get(api::get_progress))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let public = Router::new()
        .route("/api/vocab/books", get(api::list_books))
        .route("/api/vocab/book", get(api::get_book_page))
        .route("/api/vocab/review-plan", get(api::get_review_plan))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
