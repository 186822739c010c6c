//! Session authentication middleware
//!
//! Sessions are issued by the external login service, which stores
//! `session:{id}` → user id in the shared cache store. Requests carry the
//! session id in the `session_id` cookie.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error};

use crate::AppState;
use vdp_common::progress::keys;

/// Cookie holding the session id
pub const SESSION_COOKIE: &str = "session_id";

/// Authenticated learner, inserted as a request extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LearnerId(pub i64);

/// Authentication middleware
///
/// Resolves the session cookie to a learner id and hands it to the handler.
/// Returns 401 when the cookie is missing or the session is unknown.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let session_id = session_cookie(request.headers()).ok_or(AuthError::MissingSession)?;

    let stored = state
        .cache
        .get(&keys::session(&session_id))
        .await
        .map_err(|e| {
            error!("Session lookup failed: {}", e);
            AuthError::Store(e.to_string())
        })?;

    let user_id = stored
        .and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or_else(|| {
            debug!("Unknown or malformed session");
            AuthError::UnknownSession
        })?;

    request.extensions_mut().insert(LearnerId(user_id));
    Ok(next.run(request).await)
}

/// Value of the session cookie, if present and non-empty
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Authentication error types for HTTP responses
#[derive(Debug)]
pub enum AuthError {
    MissingSession,
    UnknownSession,
    Store(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingSession => (StatusCode::UNAUTHORIZED, "Not logged in".to_string()),
            AuthError::UnknownSession => {
                (StatusCode::UNAUTHORIZED, "Session expired or invalid".to_string())
            }
            AuthError::Store(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Authentication error: {}", msg),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
