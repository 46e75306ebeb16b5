// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Route Prefix: none (`/`, `/health`)

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// GET / - service banner
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Apidon API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Social media backend for the Apidon client",
        "endpoints": {
            "health": "/health",
            "api": "/api/* (POST, bearer token required)"
        }
    }))
}

/// GET /health - store connectivity check
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.store().health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "store": "connected",
                "environment": format!("{:?}", state.config.environment).to_lowercase(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "store": "disconnected",
                    "timestamp": chrono::Utc::now().to_rfc3339()
                })),
            )
        }
    }
}
