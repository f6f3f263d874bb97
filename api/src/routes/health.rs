use axum::Json;
use serde_json::{Value, json};

/// Health check endpoint for container orchestration probes.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
