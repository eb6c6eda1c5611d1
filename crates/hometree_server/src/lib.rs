//! HTTP surface for hometree.
//!
//! Handlers translate requests into [`IntegrityEngine`] calls and map
//! engine results to JSON responses. The engine is synchronous, so every
//! call runs on the blocking thread pool.

pub mod config;
pub mod error;
pub mod json;
pub mod routes;

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::{self, Next},
    response::Response,
    Router,
};
use hometree_core::{EngineResult, IntegrityEngine};
use log::info;

pub use config::{Args, ServerConfig};
pub use error::{ApiError, ErrorResponse};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    engine: IntegrityEngine,
}

impl AppState {
    pub fn new(engine: IntegrityEngine) -> Self {
        Self { engine }
    }

    /// Runs one engine operation off the async runtime.
    pub async fn run<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&IntegrityEngine) -> EngineResult<T> + Send + 'static,
    {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || op(&engine))
            .await
            .map_err(|err| ApiError::Internal(format!("engine task failed: {err}")))?
            .map_err(ApiError::from)
    }
}

/// Builds the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .merge(routes::entities::routes())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn log_request(request: Request, next: Next) -> Response {
    let started_at = Instant::now();
    let method = request.method().clone();
    // Path templates only; raw paths carry entity keys.
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    info!(
        "event=http_request module=http method={} route={} status={} duration_ms={}",
        method,
        route,
        response.status().as_u16(),
        started_at.elapsed().as_millis()
    );
    response
}
