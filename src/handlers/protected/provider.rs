// handlers/protected/provider.rs - Feed provider selection, deals and ratings
//
// POST /api/provider/showcase
// POST /api/provider/select
// POST /api/provider/deal
// POST /api/provider/rate

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::middleware::{ok_status, ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::models::{now_ms, CurrentProvider, ProviderRating};
use crate::paths;
use crate::state::AppState;
use crate::store::{get_as, set_as};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectRequest {
    pub provider_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub score: i64,
}

/// POST /api/provider/showcase - providers the client can choose from
pub async fn showcase(State(state): State<AppState>, Extension(_user): Extension<AuthUser>) -> ApiResult<Value> {
    let providers = state.provider.showcase().await?;
    Ok(ApiResponse::success(json!({ "providers": providers })))
}

/// POST /api/provider/select - remember the requester's provider
pub async fn select(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<SelectRequest>,
) -> ApiResult<Value> {
    let name = body.provider_name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid_field("providerName", "providerName must not be empty"));
    }

    let providers = state.provider.showcase().await?;
    if !providers.iter().any(|p| p.name == name) {
        return Err(ApiError::invalid_field("providerName", format!("Unknown provider '{}'", name)));
    }

    let current = CurrentProvider {
        name: name.to_string(),
        start_time: now_ms(),
    };
    set_as(state.store(), &paths::current_provider(&user.username)?, &current).await?;

    info!(username = %user.username, provider = %name, "provider selected");
    Ok(ApiResponse::success(json!({ "provider": current })))
}

async fn current_provider(state: &AppState, username: &str) -> Result<CurrentProvider, ApiError> {
    get_as::<CurrentProvider>(state.store(), &paths::current_provider(username)?)
        .await?
        .ok_or_else(|| ApiError::validation("No provider selected"))
}

/// POST /api/provider/deal - feed suggestions from the selected provider
pub async fn deal(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    let current = current_provider(&state, &user.username).await?;
    let post_doc_paths = state.provider.deal(&current.name, &user.username).await?;

    Ok(ApiResponse::success(json!({
        "provider": current.name,
        "postDocPaths": post_doc_paths
    })))
}

/// POST /api/provider/rate - score the selected provider from 1 to 5
pub async fn rate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<RateRequest>,
) -> ApiResult<Value> {
    let score = match u8::try_from(body.score) {
        Ok(score @ 1..=5) => score,
        _ => return Err(ApiError::invalid_field("score", "score must be between 1 and 5")),
    };

    state
        .locks
        .acquire(format!("providerRate-{}", user.username), async {
            let current = current_provider(&state, &user.username).await?;
            state.provider.rate(&current.name, &user.username, score).await?;

            let rating = ProviderRating { score, ts: now_ms() };
            set_as(state.store(), &paths::provider_rating(&user.username, &current.name)?, &rating).await?;
            info!(username = %user.username, provider = %current.name, score, "provider rated");
            Ok::<_, ApiError>(())
        })
        .await?;

    Ok(ok_status("rated"))
}
