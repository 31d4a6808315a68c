//! Unauthenticated index route, doubles as a health check

use axum::Json;
use serde_json::{json, Value};

/// GET /
pub async fn welcome() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the pipeline API. Pipelines are served under /v1/pipelines."
    }))
}
