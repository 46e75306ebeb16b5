// handlers/protected/likes.rs - POST /api/like and /api/deleteLike
//
// Both sides run under the requester's `like-{username}` key so a double
// tap cannot double-count.

use axum::{extract::State, Extension};
use serde_json::Value;
use tracing::info;

use crate::error::ApiError;
use crate::middleware::{ok_status, ApiResult, AuthUser, JsonBody};
use crate::models::{now_ms, Interaction, Like, Notification, NotificationCause, Post};
use crate::mutation::{delete_doc, set_doc, update_doc, MutationPlan};
use crate::paths::{self, notification_id, PostRef};
use crate::state::AppState;
use crate::store::{get_as, to_document, FieldUpdate};

use super::notifications::{notify, withdraw};
use super::posts::PostDocRequest;

/// POST /api/like - like a post once
pub async fn like(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<PostDocRequest>,
) -> ApiResult<Value> {
    let post_ref = PostRef::parse(&body.post_doc_path)?;
    state
        .locks
        .acquire(format!("like-{}", user.username), add_like(&state, &user.username, &post_ref))
        .await?;

    info!(username = %user.username, path = %post_ref.path, "post liked");
    Ok(ok_status("liked"))
}

/// POST /api/deleteLike - remove the requester's like
pub async fn delete_like(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<PostDocRequest>,
) -> ApiResult<Value> {
    let post_ref = PostRef::parse(&body.post_doc_path)?;
    state
        .locks
        .acquire(format!("like-{}", user.username), remove_like(&state, &user.username, &post_ref))
        .await?;

    info!(username = %user.username, path = %post_ref.path, "like removed");
    Ok(ok_status("unliked"))
}

async fn load_post(state: &AppState, post_ref: &PostRef) -> Result<Post, ApiError> {
    get_as::<Post>(state.store(), &post_ref.path)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} not found", post_ref.path)))
}

async fn add_like(state: &AppState, liker: &str, post_ref: &PostRef) -> Result<(), ApiError> {
    let store = state.store();
    let post = load_post(state, post_ref).await?;

    let like_path = paths::like(&post_ref.path, liker)?;
    if store.get(&like_path).await?.is_some() {
        return Err(ApiError::validation("Post is already liked"));
    }

    let ts = now_ms();
    let like = Like {
        sender: liker.to_string(),
        ts,
    };
    let mirror = Interaction {
        post_doc_path: post_ref.path.to_string(),
        message: None,
        ts,
    };

    let mut plan = MutationPlan::new("like")
        .step("setLike", set_doc(store, like_path, to_document(&like)?))
        .step(
            "incrementLikeCount",
            update_doc(store, post_ref.path.clone(), vec![FieldUpdate::increment("likeCount", 1)]),
        )
        .step(
            "setLikeMirror",
            set_doc(store, paths::like_mirror(liker, &post_ref.post_id)?, to_document(&mirror)?),
        );

    if post.sender_username != liker {
        let mut notification = Notification::new(NotificationCause::Like, liker);
        notification.post_doc_path = Some(post_ref.path.to_string());
        let id = notification_id::like(liker, &post_ref.path);
        plan = plan.step("notify", notify(store, &post.sender_username, &id, &notification)?);
    }

    plan.run_parallel().await.into_result()
}

async fn remove_like(state: &AppState, liker: &str, post_ref: &PostRef) -> Result<(), ApiError> {
    let store = state.store();
    let post = load_post(state, post_ref).await?;

    let like_path = paths::like(&post_ref.path, liker)?;
    if store.get(&like_path).await?.is_none() {
        return Err(ApiError::validation("Post is not liked"));
    }

    let mut plan = MutationPlan::new("deleteLike")
        .step("deleteLike", delete_doc(store, like_path))
        .step(
            "decrementLikeCount",
            update_doc(store, post_ref.path.clone(), vec![FieldUpdate::increment("likeCount", -1)]),
        )
        .step("deleteLikeMirror", delete_doc(store, paths::like_mirror(liker, &post_ref.post_id)?));

    if post.sender_username != liker {
        let id = notification_id::like(liker, &post_ref.path);
        plan = plan.step("withdrawNotification", withdraw(store, &post.sender_username, &id)?);
    }

    plan.run_parallel().await.into_result()
}
