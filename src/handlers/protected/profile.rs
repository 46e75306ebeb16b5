// handlers/protected/profile.rs - POST /api/updateFullname and /api/changeProfilePhoto

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::models::User;
use crate::paths;
use crate::state::AppState;
use crate::store::{get_as, FieldUpdate};

use super::validate;

pub const MAX_FULLNAME_CHARS: usize = 30;

#[derive(Debug, Deserialize)]
pub struct UpdateFullnameRequest {
    pub fullname: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeProfilePhotoRequest {
    pub image: String,
}

/// POST /api/updateFullname
pub async fn update_fullname(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<UpdateFullnameRequest>,
) -> ApiResult<Value> {
    let fullname = validate::text("fullname", &body.fullname, 1, MAX_FULLNAME_CHARS)?;
    let path = paths::user(&user.username)?;

    state
        .locks
        .acquire(
            format!("fullnameUpdate-{}", user.username),
            state
                .store()
                .update(&path, vec![FieldUpdate::set("fullname", fullname.clone())]),
        )
        .await?;

    info!(username = %user.username, "fullname updated");
    Ok(ApiResponse::success(json!({ "fullname": fullname })))
}

/// POST /api/changeProfilePhoto - returns the replaced image so the client
/// can clean it up from its media bucket
pub async fn change_profile_photo(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<ChangeProfilePhotoRequest>,
) -> ApiResult<Value> {
    let image = validate::http_url("image", &body.image)?;
    let path = paths::user(&user.username)?;

    let previous = state
        .locks
        .acquire(format!("profilePhotoChange-{}", user.username), async {
            let store = state.store();
            let current: User = get_as(store, &path)
                .await?
                .ok_or_else(|| ApiError::not_found(format!("User {} not found", user.username)))?;
            store
                .update(&path, vec![FieldUpdate::set("image", image.clone())])
                .await?;
            Ok::<_, ApiError>(current.image)
        })
        .await?;

    info!(username = %user.username, "profile photo changed");
    Ok(ApiResponse::success(json!({
        "image": image,
        "previousImage": previous
    })))
}
