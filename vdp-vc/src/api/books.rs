//! Catalog read endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::pagination::calculate_pagination;
use crate::vocab::{VocabularyBook, VocabularyEntry};
use crate::AppState;

/// Terms included in a review plan
const REVIEW_PLAN_SIZE: usize = 20;

const REVIEW_TIP: &str =
    "Review these words today, then mark each one as known, fuzzy or unknown.";

/// Query parameters for the book page endpoint
///
/// Numeric parameters are parsed leniently; anything unparseable falls back
/// to the default.
#[derive(Debug, Deserialize)]
pub struct BookQuery {
    pub book: Option<String>,
    pub page: Option<String>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
}

fn lenient_int(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}

#[derive(Debug, Serialize)]
pub struct BooksResponse {
    pub books: Vec<VocabularyBook>,
}

/// One page of a book's entries
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPageResponse {
    pub book: String,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
    pub entries: Vec<VocabularyEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewPlanQuery {
    pub book: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewPlan {
    pub book: Option<String>,
    pub date: String,
    pub words: Vec<String>,
    pub tip: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewPlanResponse {
    pub plan: ReviewPlan,
}

/// GET /api/vocab/books
pub async fn list_books(State(state): State<AppState>) -> Result<Json<BooksResponse>, CatalogError> {
    let snapshot = state.catalog.snapshot().await?;
    Ok(Json(BooksResponse {
        books: snapshot.books().to_vec(),
    }))
}

/// GET /api/vocab/book?book=&page=&pageSize=
///
/// Unknown books answer 404 with an empty page and an `error` message.
pub async fn get_book_page(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> Result<Response, CatalogError> {
    let book_id = query
        .book
        .filter(|b| !b.is_empty())
        .ok_or(CatalogError::MissingBook)?;
    let snapshot = state.catalog.snapshot().await?;

    let entries = snapshot.entries(&book_id);
    let total = entries.map_or(0, <[VocabularyEntry]>::len);
    let pagination = calculate_pagination(
        total,
        lenient_int(query.page.as_deref()),
        lenient_int(query.page_size.as_deref()),
    );

    let (status, page_entries, error) = match entries {
        Some(entries) => (StatusCode::OK, entries[pagination.range(total)].to_vec(), None),
        None => (
            StatusCode::NOT_FOUND,
            Vec::new(),
            Some(format!("Book not found: {}", book_id)),
        ),
    };

    let body = BookPageResponse {
        book: book_id,
        page: pagination.page,
        page_size: pagination.page_size,
        total,
        total_pages: pagination.total_pages,
        entries: page_entries,
        error,
    };
    Ok((status, Json(body)).into_response())
}

/// GET /api/vocab/review-plan?book=
pub async fn get_review_plan(
    State(state): State<AppState>,
    Query(query): Query<ReviewPlanQuery>,
) -> Result<Json<ReviewPlanResponse>, CatalogError> {
    let book_id = query.book.filter(|b| !b.is_empty());

    let words = match &book_id {
        Some(id) => {
            let snapshot = state.catalog.snapshot().await?;
            snapshot
                .entries(id)
                .unwrap_or_default()
                .iter()
                .take(REVIEW_PLAN_SIZE)
                .map(|entry| entry.term.clone())
                .collect()
        }
        None => Vec::new(),
    };

    Ok(Json(ReviewPlanResponse {
        plan: ReviewPlan {
            book: book_id,
            date: Utc::now().to_rfc3339(),
            words,
            tip: REVIEW_TIP.to_string(),
        },
    }))
}

/// Catalog endpoint errors
#[derive(Debug)]
pub enum CatalogError {
    MissingBook,
    Unavailable(String),
}

impl From<vdp_common::Error> for CatalogError {
    fn from(e: vdp_common::Error) -> Self {
        error!("Catalog unavailable: {}", e);
        CatalogError::Unavailable(e.to_string())
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            CatalogError::MissingBook => (StatusCode::BAD_REQUEST, "Missing book id".to_string()),
            CatalogError::Unavailable(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Catalog unavailable: {}", msg),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
