//! HTTP front door: one query endpoint plus a health probe.
//!
//! Each `*Unavailable` failure maps to a retryable 503 carrying its kind;
//! the "I don't know" fallback is a normal 200 answer.

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::knowledge::pipeline::QueryPipeline;

pub struct AppState {
    pub pipeline: QueryPipeline,
}

#[derive(Debug, Deserialize)]
struct AnswerParams {
    query: String,
}

#[derive(Debug, Serialize)]
struct AnswerResponse {
    answer: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

async fn get_answer(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnswerParams>,
) -> Response {
    match state.pipeline.answer(&params.query).await {
        Ok(answer) => (StatusCode::OK, Json(AnswerResponse { answer })).into_response(),
        Err(e) => {
            error!(kind = e.kind(), error = %e, "Query pipeline failed");
            let status = if e.is_retryable() {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (
                status,
                Json(ErrorResponse {
                    error: e.kind(),
                    message: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "Support RAG service operational")
}

/// Build the HTTP router. The frontend dev server runs on a different
/// origin, so CORS is open; tighten to known origins in production.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/get_answer", get(get_answer))
        .route("/health", get(health_check))
        .layer(cors)
        .with_state(state)
}
