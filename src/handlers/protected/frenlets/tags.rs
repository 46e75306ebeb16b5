// handlers/protected/frenlets/tags.rs - POST /api/frenlets/createTag and /api/frenlets/deleteTag
//
// Tags live in the array `tags` of `users/{u}/frenlets/frenlets`.

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::models::FrenletTags;
use crate::paths;
use crate::state::AppState;
use crate::store::{get_as, set_as, FieldUpdate};

use crate::handlers::protected::validate;

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub tag: String,
}

/// POST /api/frenlets/createTag
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<TagRequest>,
) -> ApiResult<Value> {
    let tag = validate::tag(&body.tag)?;
    let path = paths::frenlet_root(&user.username)?;

    let tags = state
        .locks
        .acquire(format!("tagCreate-{}", user.username), async {
            let store = state.store();
            let current: Option<FrenletTags> = get_as(store, &path).await?;
            match current {
                Some(existing) if existing.tags.contains(&tag) => {
                    Err(ApiError::validation(format!("Tag '{}' already exists", tag)))
                }
                Some(mut existing) => {
                    store
                        .update(&path, vec![FieldUpdate::array_union("tags", vec![json!(tag)])])
                        .await?;
                    existing.tags.push(tag.clone());
                    Ok(existing.tags)
                }
                None => {
                    let created = FrenletTags { tags: vec![tag.clone()] };
                    set_as(store, &path, &created).await?;
                    Ok(created.tags)
                }
            }
        })
        .await?;

    info!(username = %user.username, tag = %tag, "frenlet tag created");
    Ok(ApiResponse::success(json!({ "tags": tags })))
}

/// POST /api/frenlets/deleteTag
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<TagRequest>,
) -> ApiResult<Value> {
    let tag = validate::tag(&body.tag)?;
    let path = paths::frenlet_root(&user.username)?;

    let tags = state
        .locks
        .acquire(format!("tagCreate-{}", user.username), async {
            let store = state.store();
            let mut current: FrenletTags = get_as(store, &path).await?.unwrap_or_default();
            if !current.tags.contains(&tag) {
                return Err(ApiError::validation(format!("Tag '{}' does not exist", tag)));
            }
            store
                .update(&path, vec![FieldUpdate::array_remove("tags", vec![json!(tag)])])
                .await?;
            current.tags.retain(|t| t != &tag);
            Ok(current.tags)
        })
        .await?;

    info!(username = %user.username, tag = %tag, "frenlet tag deleted");
    Ok(ApiResponse::success(json!({ "tags": tags })))
}
