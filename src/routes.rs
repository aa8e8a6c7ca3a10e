use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::config::Config;
use crate::handlers;
use crate::state::AppState;

pub fn create_routes(config: &Config) -> Router<AppState> {
    Router::new()
        // Health check
        .route("/api/health", get(health_check))
        // Assistant
        .route("/ask", post(handlers::ask))
        .route(
            "/audio",
            post(handlers::audio).layer(DefaultBodyLimit::max(config.system.max_upload_bytes)),
        )
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "assistant": state.assistant.describe(),
    }))
}
