//! Liveness (`/health`) and readiness (`/health/ready`) endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde_json::json;
use tracing::error;

use crate::AppState;

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
}

/// Basic health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "up",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now(),
    }))
}

/// Readiness check endpoint. Pings the database when one is configured.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.db {
        Some(db) => match db.ping().await {
            Ok(()) => "up",
            Err(e) => {
                error!("Database health check failed: {}", e);
                "down"
            }
        },
        None => "not_configured",
    };

    let ready = database != "down";
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "ready": ready,
            "database": database,
            "timestamp": Utc::now(),
        })),
    )
}
