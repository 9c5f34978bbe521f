//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Answer a question from the knowledge base |
//! | `POST` | `/documents` | Embed and store one document |
//! | `DELETE` | `/documents` | Remove every document |
//! | `GET`  | `/status` | Document count, providers, credential presence |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `embedding_failed` (502),
//! `store_error` (500), `internal` (500).
//!
//! Malformed request bodies use the same envelope, as does a handler panic
//! (`internal`).
//!
//! Gate rejections, an empty knowledge base, off-topic questions and
//! generation failures are not errors: they return `200` with a fixed
//! message in `response`.
//!
//! # CORS
//!
//! Any origin; `GET`, `POST`, `DELETE`, `OPTIONS`; `Content-Type` header.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::any::Any as PanicPayload;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};

use ragchat_core::models::{Metadata, NewDocument};

use crate::chat::{answer_query, ChatError};
use crate::config::{presence, Config};
use crate::context::AppContext;
use crate::ingest::{add_document, IngestError};

/// Build the router over a ready application context.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/chat", post(handle_chat))
        .route(
            "/documents",
            post(handle_add_document).delete(handle_delete_documents),
        )
        .route("/status", get(handle_status))
        .route("/health", get(handle_health))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .with_state(ctx)
}

/// Start the HTTP server on `server.bind` and run until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let ctx = AppContext::from_config(config).await?;
    let app = build_router(ctx.clone());

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(bind = %bind_addr, "server listening");
    println!("ragchat listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ctx.close().await;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn embedding_failed(message: String) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "embedding_failed",
        message,
    }
}

fn store_error(err: anyhow::Error) -> AppError {
    tracing::error!(error = %err, "document store error");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "store_error",
        message: format!("{:#}", err),
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyQuery => bad_request(err.to_string()),
            ChatError::Embedding(_) => {
                tracing::warn!(error = %err, "chat request failed");
                embedding_failed(err.to_string())
            }
            ChatError::Store(e) => store_error(e),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::EmptyContent => bad_request(err.to_string()),
            IngestError::Embedding(_) => {
                tracing::warn!(error = %err, "document not added");
                embedding_failed(err.to_string())
            }
            IngestError::Store(e) => store_error(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

fn handle_panic(payload: Box<dyn PanicPayload + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "request handler panicked");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: "internal server error".to_string(),
    }
    .into_response()
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
    /// Number of documents the answer was grounded on.
    sources: usize,
}

async fn handle_chat(
    State(ctx): State<AppContext>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(req) = payload?;
    let query = req.query.unwrap_or_default();
    let reply = answer_query(&ctx, &query).await?;
    tracing::info!(outcome = ?reply.outcome, sources = reply.sources.len(), "chat answered");
    Ok(Json(ChatResponse {
        response: reply.answer,
        sources: reply.sources.len(),
    }))
}

// ============ POST /documents ============

#[derive(Deserialize)]
struct AddDocumentRequest {
    #[serde(default)]
    content: String,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Serialize)]
struct AddDocumentResponse {
    document_id: String,
}

async fn handle_add_document(
    State(ctx): State<AppContext>,
    payload: Result<Json<AddDocumentRequest>, JsonRejection>,
) -> Result<Json<AddDocumentResponse>, AppError> {
    let Json(req) = payload?;
    if req.content.trim().is_empty() {
        return Err(bad_request("content must not be empty"));
    }
    let doc = NewDocument::new(req.content, req.metadata);
    let document_id = add_document(ctx.ingest_embedder.as_ref(), ctx.store.as_ref(), &doc).await?;
    tracing::info!(id = %document_id, "document added");
    Ok(Json(AddDocumentResponse { document_id }))
}

// ============ DELETE /documents ============

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

async fn handle_delete_documents(
    State(ctx): State<AppContext>,
) -> Result<Json<MessageResponse>, AppError> {
    let removed = ctx.store.delete_all().await.map_err(store_error)?;
    tracing::info!(removed, "all documents deleted");
    Ok(Json(MessageResponse {
        message: format!("Deleted {} documents from database", removed),
    }))
}

// ============ GET /status ============

#[derive(Serialize)]
struct StatusResponse {
    documents: u64,
    backend: &'static str,
    embedding: ProviderStatus,
    generation: ProviderStatus,
    retrieval: RetrievalStatus,
}

#[derive(Serialize)]
struct ProviderStatus {
    provider: String,
    model: String,
    credentials: &'static str,
}

#[derive(Serialize)]
struct RetrievalStatus {
    top_k: usize,
    similarity_threshold: f64,
}

async fn handle_status(State(ctx): State<AppContext>) -> Result<Json<StatusResponse>, AppError> {
    let documents = ctx.store.count().await.map_err(store_error)?;
    let cfg = &ctx.config;
    Ok(Json(StatusResponse {
        documents,
        backend: ctx.backend_name(),
        embedding: ProviderStatus {
            provider: cfg.embedding.provider.clone(),
            model: cfg.embedding.model.clone(),
            credentials: presence(&cfg.credentials.huggingface_token),
        },
        generation: ProviderStatus {
            provider: cfg.generation.provider.clone(),
            model: cfg.generation.model.clone(),
            credentials: presence(&cfg.credentials.gemini_api_key),
        },
        retrieval: RetrievalStatus {
            top_k: cfg.retrieval.top_k,
            similarity_threshold: cfg.retrieval.similarity_threshold,
        },
    }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
