//! Health check endpoint.

use axum::{extract::State, routing::get, Json, Router};

use crate::json::HealthResponse;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = state
        .run(|engine| Ok(engine.database().ping().is_ok()))
        .await
        .unwrap_or(false);

    Json(HealthResponse {
        status: if database { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
    })
}
