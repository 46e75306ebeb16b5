// handlers/protected/warmer.rs - POST /api/serverWarmer
//
// Fans a cheap request out to the configured endpoints, forwarding the
// caller's bearer token so protected routes are actually entered.

use axum::{extract::State, http::HeaderMap, Extension};
use tracing::info;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;
use crate::warmer::{warm, WarmReport};

/// POST /api/serverWarmer
pub async fn server_warmer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
) -> ApiResult<WarmReport> {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let warmer = &state.config.warmer;
    let report = warm(&state.http, &warmer.base_url, &warmer.targets, bearer).await;

    info!(
        username = %user.username,
        warmed = report.warmed,
        failed = report.failed.len(),
        "server warmed"
    );
    Ok(ApiResponse::success(report))
}
