//! HTTP transport module for tumor-classifier
//!
//! Axum routes over [`ServiceContext`]. Response envelopes mirror the ones the
//! browser page expects: `/predict` answers `{status, output}` on success,
//! `{success: false, message}` for bad input and `{status: "error", details}`
//! for anything else; `/fetch-samples` answers `{success, payload | error}`.

use crate::config::Config;
use crate::error::{ClassifierError, Result};
use crate::service::{ServiceContext, ServiceInfo};
use axum::{
    Json, Router,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");
const FEATURE_NAMES_SLOT: &str = "{{FEATURE_NAMES}}";

/// Shared state for HTTP server
#[derive(Clone)]
pub struct HttpState {
    pub service: Arc<ServiceContext>,
}

/// Build the router; split out from [`start_http_server`] so tests can drive it directly
pub fn router(service: Arc<ServiceContext>) -> Router {
    let state = HttpState { service };
    Router::new()
        .route("/", get(index_handler))
        .route("/api/features", get(features_handler))
        .route("/predict", post(predict_handler))
        .route("/fetch-samples", get(fetch_samples_handler))
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Render the page with the feature list embedded as a JSON array
pub fn render_index(feature_names: &[String]) -> String {
    let names = serde_json::to_string(feature_names).unwrap_or_else(|_| "[]".to_string());
    // keep the array from closing the surrounding <script>
    let names = names.replace("</", "<\\/");
    INDEX_TEMPLATE.replace(FEATURE_NAMES_SLOT, &names)
}

/// Main page
pub async fn index_handler(State(state): State<HttpState>) -> Html<String> {
    Html(render_index(state.service.feature_names()))
}

/// Feature names for clients that build their own form
pub async fn features_handler(State(state): State<HttpState>) -> Json<Value> {
    Json(json!({ "feature_names": state.service.feature_names() }))
}

/// Validate and score a submission
pub async fn predict_handler(
    State(state): State<HttpState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(submission) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "message": rejection.body_text() })),
            )
                .into_response();
        }
    };

    let service = state.service.clone();
    let outcome = tokio::task::spawn_blocking(move || service.score(&submission))
        .await
        .map_err(ClassifierError::from)
        .and_then(|r| r);

    match outcome {
        Ok(output) => Json(json!({ "status": "success", "output": output })).into_response(),
        Err(ClassifierError::Validation(err)) => {
            tracing::debug!(field = err.field().unwrap_or("-"), "Rejected submission: {}", err);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "message": err.to_string() })),
            )
                .into_response()
        }
        Err(err) => {
            tracing::error!("Prediction failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "details": err.to_string() })),
            )
                .into_response()
        }
    }
}

/// One random example per class from the dataset
pub async fn fetch_samples_handler(State(state): State<HttpState>) -> Json<Value> {
    let service = state.service.clone();
    let outcome = tokio::task::spawn_blocking(move || service.sample_cases())
        .await
        .map_err(ClassifierError::from)
        .and_then(|r| r);

    match outcome {
        Ok(payload) => Json(json!({ "success": true, "payload": payload })),
        Err(err) => {
            tracing::warn!("Sample fetch failed: {}", err);
            Json(json!({ "success": false, "error": err.to_string() }))
        }
    }
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

/// Info endpoint
pub async fn info_handler(State(state): State<HttpState>) -> Json<ServiceInfo> {
    Json(state.service.info())
}

async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let mut resp = next.run(req).await;

    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(
        request_id = %request_id,
        status = resp.status().as_u16(),
        "{} {} {:.2}ms",
        method,
        path,
        latency_ms
    );
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        resp.headers_mut().insert("x-request-id", value);
    }
    resp
}

/// Start the HTTP server
pub async fn start_http_server(config: &Config, service: Arc<ServiceContext>) -> Result<()> {
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!("Starting HTTP server on {}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
