//! Liveness endpoint
use crate::context::AppContext;
use axum::{response::Json, routing::get, Router};
use serde_json::json;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/health", get(health_check))
}

/// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
