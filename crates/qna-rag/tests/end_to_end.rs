//! End-to-end flows through the HTTP router with offline providers

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use qna_rag::config::RagConfig;
use qna_rag::providers::{HashingEmbedder, LlmProvider};
use qna_rag::server::{state::AppState, RagServer};
use qna_rag::types::NewDocument;
use qna_rag::{Database, Error, Result};

/// Echoes how much context it was given
struct ContextEcho;

#[async_trait]
impl LlmProvider for ContextEcho {
    async fn chat(&self, _system: &str, user: &str) -> Result<String> {
        Ok(format!("Answer based on {} characters of prompt.", user.len()))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "echo"
    }

    fn model(&self) -> &str {
        "echo"
    }
}

fn router_with(db: Database) -> Router {
    let state = AppState::from_parts(
        RagConfig::default(),
        db,
        Arc::new(HashingEmbedder::new()),
        Arc::new(ContextEcho),
    )
    .unwrap();
    RagServer::with_state(state).router()
}

async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn basic_ingest_select_search_ask() {
    let router = router_with(Database::in_memory().unwrap());

    let (status, body) = post(
        &router,
        "/api/ingest",
        json!({"filename": "a.txt", "content": "Python is a programming language."}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document_id"], 1);

    let (status, _) = post(&router, "/api/selection/add", json!({"document_ids": [1]})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = post(&router, "/api/search", json!({"question": "Python", "top_k": 1})).await;
    assert_eq!(body["documents"], json!([1]));

    let (status, body) = post(&router, "/api/ask", json!({"question": "What is Python?"})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["answer"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn disjoint_selection_never_leaks() {
    let router = router_with(Database::in_memory().unwrap());
    let first = "Python is a programming language.";

    post(&router, "/api/ingest", json!({"filename": "a.txt", "content": first})).await;
    post(
        &router,
        "/api/ingest",
        json!({"filename": "b.txt", "content": "Rust is a systems programming language."}),
    )
    .await;
    post(&router, "/api/selection/add", json!({"document_ids": [2]})).await;

    for top_k in [1, 2, 10] {
        let (_, body) = post(&router, "/api/search", json!({"question": first, "top_k": top_k})).await;
        assert_eq!(body["documents"], json!([2]));

        let (_, body) =
            post(&router, "/api/search/bm25", json!({"question": first, "top_k": top_k})).await;
        assert_eq!(body["documents"], json!([2]));
    }
}

#[tokio::test]
async fn empty_selection_and_empty_query() {
    let router = router_with(Database::in_memory().unwrap());
    post(&router, "/api/ingest", json!({"filename": "a.txt", "content": "some words"})).await;

    for top_k in [1, 5, 100] {
        for uri in ["/api/search", "/api/search/bm25"] {
            let (_, body) = post(&router, uri, json!({"question": "some words", "top_k": top_k})).await;
            assert_eq!(body["documents"], json!([]));
        }
    }

    post(&router, "/api/selection/add", json!({"document_ids": [1]})).await;
    let (_, body) = post(&router, "/api/search/bm25", json!({"question": ""})).await;
    assert_eq!(body["documents"], json!([]));

    // Nothing retrieved still yields an answer
    post(&router, "/api/selection/remove", json!({"document_ids": [1]})).await;
    let (status, body) = post(&router, "/api/ask", json!({"question": "anything?"})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["answer"].as_str().unwrap().starts_with("Answer based on"));
}

#[tokio::test]
async fn batch_ingest_reports_each_item() {
    let router = router_with(Database::in_memory().unwrap());
    let (status, body) = post(
        &router,
        "/api/ingest/batch",
        json!({"documents": [
            {"filename": "a.txt", "content": "alpha"},
            {"filename": "b.txt", "content": " "},
            {"filename": "c.txt", "content": "gamma"}
        ]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["filename"], "a.txt");
    assert!(items[1]["error"].is_string());
    assert_eq!(items[2]["filename"], "c.txt");

    // Items embed concurrently, so id assignment order is not fixed
    let mut ids = vec![
        items[0]["document_id"].as_i64().unwrap(),
        items[2]["document_id"].as_i64().unwrap(),
    ];
    ids.sort();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn wrong_dimension_leaves_no_document() {
    let db = Database::in_memory().unwrap();
    let err = db
        .insert_document(&NewDocument::upload("a.txt", "text"), vec![0.0; 100])
        .unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 384, actual: 100 }));
    assert_eq!(db.document_count().unwrap(), 0);
}

#[tokio::test]
async fn state_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("qna.db");

    {
        let router = router_with(Database::open(&path).unwrap());
        post(&router, "/api/ingest", json!({"filename": "a.txt", "content": "persistent"})).await;
        post(&router, "/api/selection/add", json!({"document_ids": [1]})).await;
    }

    let router = router_with(Database::open(&path).unwrap());
    let (_, body) = post(&router, "/api/search/bm25", json!({"question": "persistent"})).await;
    assert_eq!(body["documents"], json!([1]));
}
