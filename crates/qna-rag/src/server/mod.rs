//! HTTP server for the Q&A service

pub mod routes;
pub mod state;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use state::AppState;

/// Q&A HTTP Server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a new server, building providers and opening the database
    pub async fn new(config: RagConfig) -> Result<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Create from prepared state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let router = Router::new()
            // Health check
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .nest("/api", routes::api_routes(self.config.server.max_body_size))
            .with_state(self.state.clone())
            // Middleware layers (order matters - applied bottom to top)
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new());

        if self.config.server.enable_cors {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            router
        }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.router();

        tracing::info!("Starting Q&A server on http://{}", addr);
        tracing::info!("API info: http://{}/api/info", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Shared state
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint: state flag plus a database round trip
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if !state.is_ready() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    match state.db().run(|db| db.document_count()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!("Readiness check failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::providers::HashingEmbedder;
    use crate::storage::Database;
    use crate::test_support::ScriptedLlm;

    fn server_with(llm: ScriptedLlm) -> (RagServer, Arc<ScriptedLlm>) {
        let llm = Arc::new(llm);
        let state = AppState::from_parts(
            RagConfig::default(),
            Database::in_memory().unwrap(),
            Arc::new(HashingEmbedder::new()),
            llm.clone(),
        )
        .unwrap();
        (RagServer::with_state(state), llm)
    }

    fn server() -> RagServer {
        server_with(ScriptedLlm::answering("An answer.")).0
    }

    async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        let response = router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn ingest(router: &Router, filename: &str, content: &str) -> i64 {
        let (status, body) = call(
            router,
            Method::POST,
            "/api/ingest",
            Some(json!({"filename": filename, "content": content})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["document_id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let router = server().router();
        let response = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_not_ready() {
        let server = server();
        server.state.set_ready(false);
        let response = server
            .router()
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_ingest_rejects_empty_content() {
        let router = server().router();
        let (status, body) = call(
            &router,
            Method::POST,
            "/api/ingest",
            Some(json!({"filename": "a.txt", "content": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "validation_error");
    }

    #[tokio::test]
    async fn test_ingest_batch_endpoint() {
        let router = server().router();
        let (status, body) = call(
            &router,
            Method::POST,
            "/api/ingest/batch",
            Some(json!({"documents": [
                {"filename": "a.txt", "content": "alpha"},
                {"filename": "empty.txt", "content": ""},
                {"filename": "c.txt", "content": "gamma"}
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["filename"], "a.txt");
        assert!(items[0]["document_id"].is_i64());
        assert_eq!(items[1]["filename"], "empty.txt");
        assert!(items[1]["error"].is_string());
        assert!(items[2]["document_id"].is_i64());

        let (_, docs) = call(&router, Method::GET, "/api/documents", None).await;
        assert_eq!(docs.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_bodies_use_error_envelope() {
        let router = server().router();
        let cases = [
            ("/api/search", json!({"question": "rust", "top_k": -1})),
            ("/api/ask", json!({"question": "rust", "strategy": "fuzzy"})),
            ("/api/ingest", json!({"filename": "a.txt"})),
        ];
        for (uri, payload) in cases {
            let (status, body) = call(&router, Method::POST, uri, Some(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["error"]["type"], "validation_error", "{}", uri);
            assert!(body["error"]["message"].is_string(), "{}", uri);
        }

        let response = router
            .oneshot(
                Request::post("/api/search")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_selection_flow() {
        let router = server().router();
        let a = ingest(&router, "a.txt", "alpha").await;
        let b = ingest(&router, "b.txt", "beta").await;

        let (status, _) = call(
            &router,
            Method::POST,
            "/api/selection/add",
            Some(json!({"document_ids": [b, a.to_string(), b]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&router, Method::GET, "/api/selection", None).await;
        assert_eq!(body["selected_documents"], json!([b, a]));

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/selection/remove",
            Some(json!({"document_ids": [b, 999]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], 2);

        let (_, body) = call(&router, Method::GET, "/api/selection", None).await;
        assert_eq!(body["selected_documents"], json!([a]));
    }

    #[tokio::test]
    async fn test_selection_errors() {
        let router = server().router();
        ingest(&router, "a.txt", "alpha").await;

        let (status, _) = call(
            &router,
            Method::POST,
            "/api/selection/add",
            Some(json!({"document_ids": ["abc"]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/selection/add",
            Some(json!({"document_ids": [1, 42]})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found");

        let (_, body) = call(&router, Method::GET, "/api/selection", None).await;
        assert_eq!(body["selected_documents"], json!([]));
    }

    #[tokio::test]
    async fn test_search_endpoints() {
        let router = server().router();
        let a = ingest(&router, "a.txt", "Python is a programming language.").await;
        let b = ingest(&router, "b.txt", "The Eiffel Tower stands in Paris.").await;
        let c = ingest(&router, "c.txt", "Bread is baked from flour and water.").await;

        // Nothing selected yet
        let (_, body) = call(
            &router,
            Method::POST,
            "/api/search",
            Some(json!({"question": "Python"})),
        )
        .await;
        assert_eq!(body["documents"], json!([]));

        call(
            &router,
            Method::POST,
            "/api/selection/add",
            Some(json!({"document_ids": [a, b, c]})),
        )
        .await;

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/search",
            Some(json!({"question": "Python is a programming language.", "top_k": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["documents"], json!([a]));

        let (_, body) = call(
            &router,
            Method::POST,
            "/api/search/bm25",
            Some(json!({"question": "eiffel paris", "top_k": 1})),
        )
        .await;
        assert_eq!(body["documents"], json!([b]));

        let (_, body) = call(
            &router,
            Method::POST,
            "/api/search/bm25",
            Some(json!({"question": ""})),
        )
        .await;
        assert_eq!(body["documents"], json!([]));
    }

    #[tokio::test]
    async fn test_ask() {
        let (server, llm) = server_with(ScriptedLlm::answering("Python is a language."));
        let router = server.router();
        let a = ingest(&router, "a.txt", "Python is a programming language.").await;
        call(
            &router,
            Method::POST,
            "/api/selection/add",
            Some(json!({"document_ids": [a]})),
        )
        .await;

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/ask",
            Some(json!({"question": "What is Python?", "strategy": "bm25"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["question"], "What is Python?");
        assert_eq!(body["answer"], "Python is a language.");

        let (_, prompt) = llm.last_prompt().unwrap();
        assert!(prompt.contains("Python is a programming language."));

        let (status, _) = call(
            &router,
            Method::POST,
            "/api/ask",
            Some(json!({"question": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_ask_llm_failure() {
        let (server, _) = server_with(ScriptedLlm::failing());
        let router = server.router();
        let (status, body) = call(
            &router,
            Method::POST,
            "/api/ask",
            Some(json!({"question": "What is Python?"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["type"], "llm_error");
    }

    #[tokio::test]
    async fn test_documents_endpoints() {
        let router = server().router();
        let a = ingest(&router, "a.txt", "alpha").await;

        let (_, body) = call(&router, Method::GET, "/api/documents", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["filename"], "a.txt");
        assert_eq!(body[0]["source"], "upload");

        let (status, body) = call(&router, Method::GET, &format!("/api/documents/{}", a), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"], "alpha");
        assert_eq!(body["selected"], false);

        let (status, _) = call(&router, Method::GET, "/api/documents/77", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&router, Method::GET, "/api/documents/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
