//! Learner progress endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, error};
use vdp_common::progress::merged_statuses;
use vdp_common::Status;

use super::auth::LearnerId;
use crate::AppState;

/// Body of a status update
///
/// Ids may arrive as JSON strings or numbers.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub book_id: Option<Value>,
    pub word_id: Option<Value>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateResponse {
    pub success: bool,
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub book: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub book: String,
    pub statuses: HashMap<String, Status>,
}

fn id_param(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// POST /api/vocab/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(LearnerId(user_id)): Extension<LearnerId>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResponse>, ProgressError> {
    let (Some(book_id), Some(word_id), Some(status)) = (
        id_param(request.book_id.as_ref()),
        id_param(request.word_id.as_ref()),
        request.status.as_deref(),
    ) else {
        return Err(ProgressError::BadRequest("Missing params".to_string()));
    };

    let status: Status = status
        .parse()
        .map_err(|e: vdp_common::Error| ProgressError::BadRequest(e.to_string()))?;

    match state.writer.record_status(user_id, &book_id, &word_id, status).await {
        Ok(_) => {
            debug!(user_id, book_id = %book_id, word_id = %word_id, %status, "Status recorded");
            Ok(Json(StatusUpdateResponse {
                success: true,
                user_id,
            }))
        }
        Err(vdp_common::Error::InvalidInput(msg)) => Err(ProgressError::BadRequest(msg)),
        Err(e) => Err(ProgressError::WriteFailed(e.to_string())),
    }
}

/// GET /api/vocab/progress?book=
///
/// The learner's current status per word of one book, cache over durable.
pub async fn get_progress(
    State(state): State<AppState>,
    Extension(LearnerId(user_id)): Extension<LearnerId>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<ProgressResponse>, ProgressError> {
    let book = query
        .book
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ProgressError::BadRequest("Missing book id".to_string()))?;

    let statuses = merged_statuses(state.durable.as_ref(), state.cache.as_ref(), user_id, &book)
        .await
        .map_err(|e| {
            error!(user_id, book = %book, "Progress read failed: {}", e);
            ProgressError::ReadFailed(e.to_string())
        })?;

    Ok(Json(ProgressResponse { book, statuses }))
}

/// Progress endpoint errors
#[derive(Debug)]
pub enum ProgressError {
    BadRequest(String),
    WriteFailed(String),
    ReadFailed(String),
}

impl IntoResponse for ProgressError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ProgressError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ProgressError::WriteFailed(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": format!("Progress not saved: {}", msg) }),
            ),
            ProgressError::ReadFailed(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": format!("Progress unavailable: {}", msg) }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
