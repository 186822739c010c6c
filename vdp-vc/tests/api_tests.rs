//! Integration tests for vdp-vc API endpoints
//!
//! Tests cover:
//! - Health endpoint (no session required)
//! - Book listing, paging and review plans over a scratch vocabulary root
//! - Session authentication on the progress routes
//! - Status updates through the cache and the cache-over-durable read merge

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method
use vdp_common::cache::{CacheBatch, CacheStore, HashGuard, MemoryCacheStore};
use vdp_common::db::{init_database, ProgressStore, SqliteProgressStore};
use vdp_common::progress::keys;
use vdp_common::{Error, ProgressRecord, Result, Status};
use vdp_vc::vocab::Catalog;
use vdp_vc::{build_router, AppState};

const SESSION: &str = "sess-7";
const USER_ID: i64 = 7;

/// Scratch environment: vocabulary root, cache and durable store
struct TestEnv {
    _dir: TempDir,
    state: AppState,
    cache: Arc<MemoryCacheStore>,
    durable: Arc<SqliteProgressStore>,
}

/// Test helper: write a small vocabulary root with two books
fn write_vocabulary(root: &std::path::Path) {
    let topik = root.join("topik1");
    fs::create_dir_all(&topik).unwrap();
    let words: Vec<Value> = (0..45)
        .map(|n| json!({"id": format!("w{}", n), "word": format!("단어{}", n), "meaning": format!("词{}", n)}))
        .collect();
    fs::write(
        topik.join("01.json"),
        serde_json::to_string(&json!([{"lesson": "L1", "words": words}])).unwrap(),
    )
    .unwrap();

    let seoul = root.join("seoul");
    fs::create_dir_all(&seoul).unwrap();
    fs::write(
        seoul.join("a.json"),
        r#""vocabulary_units": [{"unit_id":"U1","words":[{"word":"안녕","meaning":"你好"}]}]}"#,
    )
    .unwrap();
}

async fn setup_env_with_cache(cache: Arc<dyn CacheStore>, memory: Arc<MemoryCacheStore>) -> TestEnv {
    let dir = TempDir::new().unwrap();
    let vocab_root = dir.path().join("vocabularies");
    write_vocabulary(&vocab_root);

    let pool = init_database(&dir.path().join("vdp.db")).await.unwrap();
    let durable = Arc::new(SqliteProgressStore::new(pool));

    memory
        .apply(CacheBatch::new().set(keys::session(SESSION), USER_ID.to_string()))
        .await
        .unwrap();

    let state = AppState::new(Arc::new(Catalog::new(vocab_root)), cache, durable.clone());
    TestEnv {
        _dir: dir,
        state,
        cache: memory,
        durable,
    }
}

async fn setup_env() -> TestEnv {
    let cache = Arc::new(MemoryCacheStore::new());
    setup_env_with_cache(cache.clone(), cache).await
}

/// Test helper: Create request without a body
fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Create JSON request carrying the session cookie
fn session_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, format!("session_id={}", SESSION));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let env = setup_env().await;
    let app = build_router(env.state);

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "vdp-vc");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_health_reports_catalog_once_loaded() {
    let env = setup_env().await;
    let app = build_router(env.state);

    let response = app.clone().oneshot(test_request("GET", "/health")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert!(body["catalogBooks"].is_null());

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/vocab/books"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["catalogBooks"], 2);
}

// =============================================================================
// Catalog reads
// =============================================================================

#[tokio::test]
async fn test_books_listing() {
    let env = setup_env().await;
    let app = build_router(env.state);

    let response = app.oneshot(test_request("GET", "/api/vocab/books")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let books = body["books"].as_array().unwrap();
    assert_eq!(books.len(), 2);
    // Sorted by directory name
    assert_eq!(books[0]["id"], "seoul");
    assert_eq!(books[0]["total"], 1);
    assert_eq!(books[0]["units"], json!(["U1"]));
    assert_eq!(books[1]["id"], "topik1");
    assert_eq!(books[1]["total"], 45);
    assert_eq!(books[1]["sourceFiles"], json!(["01.json"]));
}

#[tokio::test]
async fn test_book_pagination() {
    let env = setup_env().await;
    let app = build_router(env.state);

    let response = app
        .oneshot(test_request("GET", "/api/vocab/book?book=topik1&page=3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["book"], "topik1");
    assert_eq!(body["page"], 3);
    assert_eq!(body["pageSize"], 20);
    assert_eq!(body["total"], 45);
    assert_eq!(body["totalPages"], 3);
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[0]["id"], "w40");
    assert_eq!(entries[0]["unit"], "L1");
    assert_eq!(entries[0]["bookId"], "topik1");
}

#[tokio::test]
async fn test_book_page_size_and_page_clamped() {
    let env = setup_env().await;
    let app = build_router(env.state);

    let response = app
        .oneshot(test_request("GET", "/api/vocab/book?book=topik1&page=99&pageSize=1000"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["pageSize"], 100);
    assert_eq!(body["page"], 1);
    assert_eq!(body["entries"].as_array().unwrap().len(), 45);
}

#[tokio::test]
async fn test_unknown_book_is_not_found() {
    let env = setup_env().await;
    let app = build_router(env.state);

    let response = app
        .oneshot(test_request("GET", "/api/vocab/book?book=does-not-exist"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["entries"], json!([]));
    assert_eq!(body["total"], 0);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_missing_book_param_is_bad_request() {
    let env = setup_env().await;
    let app = build_router(env.state);

    let response = app.oneshot(test_request("GET", "/api/vocab/book")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_review_plan_takes_first_twenty_terms() {
    let env = setup_env().await;
    let app = build_router(env.state);

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/vocab/review-plan?book=topik1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let words = body["plan"]["words"].as_array().unwrap();
    assert_eq!(words.len(), 20);
    assert_eq!(words[0], "단어0");
    assert_eq!(body["plan"]["book"], "topik1");
    assert!(body["plan"]["date"].is_string());
    assert!(body["plan"]["tip"].is_string());

    let response = app
        .oneshot(test_request("GET", "/api/vocab/review-plan?book=does-not-exist"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["plan"]["words"], json!([]));
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_status_update_requires_session() {
    let env = setup_env().await;
    let app = build_router(env.state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/vocab/status")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"bookId": "topik1", "wordId": "w1", "status": "known"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("GET")
        .uri("/api/vocab/progress?book=topik1")
        .header(header::COOKIE, "session_id=unknown-session")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert!(env.cache.smembers(keys::DIRTY_USERS).await.unwrap().is_empty());
}

// =============================================================================
// Progress
// =============================================================================

#[tokio::test]
async fn test_status_update_writes_cache() {
    let env = setup_env().await;
    let app = build_router(env.state);

    let response = app
        .oneshot(session_request(
            "POST",
            "/api/vocab/status",
            Some(json!({"bookId": "topik1", "wordId": "w1", "status": "known"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["userId"], USER_ID);

    let statuses = env.cache.hgetall(&keys::status_hash(USER_ID)).await.unwrap();
    assert_eq!(statuses["topik1:w1"], "known");
    let stamps = env.cache.hgetall(&keys::timestamp_hash(USER_ID)).await.unwrap();
    assert!(stamps["topik1:w1"].parse::<i64>().unwrap() > 0);
    assert_eq!(env.cache.smembers(keys::DIRTY_USERS).await.unwrap(), vec!["7"]);
}

#[tokio::test]
async fn test_status_update_rejects_bad_params() {
    let env = setup_env().await;
    let app = build_router(env.state);

    let bodies = [
        json!({"bookId": "topik1", "wordId": "w1"}),
        json!({"bookId": "", "wordId": "w1", "status": "known"}),
        json!({"bookId": "topik1", "wordId": "w1", "status": "mastered"}),
    ];
    for body in bodies {
        let response = app
            .clone()
            .oneshot(session_request("POST", "/api/vocab/status", Some(body.clone())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
    }

    assert!(env.cache.smembers(keys::DIRTY_USERS).await.unwrap().is_empty());
}

/// Cache whose reads succeed but whose batches are rejected
struct RejectingWrites {
    inner: Arc<MemoryCacheStore>,
}

#[async_trait]
impl CacheStore for RejectingWrites {
    async fn apply(&self, _batch: CacheBatch) -> Result<()> {
        Err(Error::Cache("read-only replica".to_string()))
    }
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        self.inner.hgetall(key).await
    }
    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        self.inner.smembers(key).await
    }
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }
    async fn srem_if_hashes_unchanged(
        &self,
        set_key: &str,
        member: &str,
        guards: &[HashGuard<'_>],
    ) -> Result<bool> {
        self.inner.srem_if_hashes_unchanged(set_key, member, guards).await
    }
}

#[tokio::test]
async fn test_status_update_cache_failure_is_server_error() {
    let memory = Arc::new(MemoryCacheStore::new());
    let cache = Arc::new(RejectingWrites {
        inner: memory.clone(),
    });
    let env = setup_env_with_cache(cache, memory).await;
    let app = build_router(env.state);

    let response = app
        .oneshot(session_request(
            "POST",
            "/api/vocab/status",
            Some(json!({"bookId": "topik1", "wordId": "w1", "status": "fuzzy"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], false);
    assert!(env.cache.hgetall(&keys::status_hash(USER_ID)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_progress_merges_cache_over_durable() {
    let env = setup_env().await;
    env.durable
        .upsert(&ProgressRecord {
            user_id: USER_ID,
            book_id: "topik1".to_string(),
            word_id: "w1".to_string(),
            status: Status::Unknown,
            updated_at: chrono::Utc::now(),
        })
        .await
        .unwrap();
    env.durable
        .upsert(&ProgressRecord {
            user_id: USER_ID,
            book_id: "topik1".to_string(),
            word_id: "w2".to_string(),
            status: Status::Fuzzy,
            updated_at: chrono::Utc::now(),
        })
        .await
        .unwrap();

    let app = build_router(env.state);
    let response = app
        .clone()
        .oneshot(session_request(
            "POST",
            "/api/vocab/status",
            Some(json!({"bookId": "topik1", "wordId": "w1", "status": "known"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(session_request("GET", "/api/vocab/progress?book=topik1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["book"], "topik1");
    assert_eq!(body["statuses"], json!({"w1": "known", "w2": "fuzzy"}));
}
