// handlers/protected/posts.rs - POST /api/postUpload and /api/postDelete

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{ok_status, ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::models::{now_ms, NftStatus, Post};
use crate::mutation::{delete_collection, delete_doc, update_doc, MutationPlan};
use crate::ownership::fetch_owned_as;
use crate::paths::{self, PostRef};
use crate::state::AppState;
use crate::store::{set_as, FieldUpdate};

use super::validate;

pub const MAX_DESCRIPTION_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUploadRequest {
    #[serde(default)]
    pub description: String,
    pub image: String,
}

/// Body shared by every endpoint that targets a single post
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDocRequest {
    pub post_doc_path: String,
}

/// POST /api/postUpload - create a post owned by the requester
pub async fn upload(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<PostUploadRequest>,
) -> ApiResult<Value> {
    let description = validate::text("description", &body.description, 0, MAX_DESCRIPTION_CHARS)?;
    let image = validate::http_url("image", &body.image)?;

    let store = state.store();
    if store.get(&paths::user(&user.username)?).await?.is_none() {
        return Err(ApiError::not_found(format!("User {} not found", user.username)));
    }

    let path = paths::post(&user.username, &Uuid::new_v4().to_string())?;
    let post = Post {
        sender_username: user.username.clone(),
        description,
        image,
        timestamp: now_ms(),
        like_count: 0,
        comment_count: 0,
        nft_status: NftStatus::default(),
    };
    set_as(store, &path, &post).await?;

    info!(username = %user.username, %path, "post uploaded");
    Ok(ApiResponse::success(json!({ "postDocPath": path.to_string() })))
}

/// POST /api/postDelete - delete an owned post with its likes and comments
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<PostDocRequest>,
) -> ApiResult<Value> {
    let post_ref = PostRef::parse(&body.post_doc_path)?;

    state
        .locks
        .acquire(
            format!("postDelete-{}", user.username),
            delete_owned_post(&state, &user.username, &post_ref),
        )
        .await?;

    info!(username = %user.username, path = %post_ref.path, "post deleted");
    Ok(ok_status("deleted"))
}

async fn delete_owned_post(state: &AppState, requester: &str, post_ref: &PostRef) -> Result<(), ApiError> {
    let store = state.store();
    let post: Post = fetch_owned_as(store, &post_ref.path, "senderUsername", requester, ApiError::NotOwner).await?;

    let mut plan = MutationPlan::new("postDelete")
        .step("deletePost", delete_doc(store, post_ref.path.clone()))
        .step("deleteLikes", delete_collection(store, paths::likes(&post_ref.path)?))
        .step("deleteComments", delete_collection(store, paths::comments(&post_ref.path)?));

    if post.nft_status.minted {
        plan = plan.step(
            "decrementNftCount",
            update_doc(store, paths::user(requester)?, vec![FieldUpdate::increment("nftCount", -1)]),
        );
    }

    plan.run_parallel().await.into_result()
}
