// handlers/protected/comments.rs - POST /api/sendComment and /api/deleteComment

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{ok_status, ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::models::{now_ms, Comment, Interaction, Notification, NotificationCause, Post};
use crate::mutation::{delete_doc, set_doc, update_doc, MutationPlan};
use crate::ownership::fetch_owned;
use crate::paths::{self, notification_id, PostRef};
use crate::state::AppState;
use crate::store::{get_as, to_document, FieldUpdate};

use super::notifications::{notify, withdraw};
use super::validate;

pub const MAX_COMMENT_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCommentRequest {
    pub post_doc_path: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCommentRequest {
    pub post_doc_path: String,
    pub comment_id: String,
}

/// POST /api/sendComment - comment on a post
pub async fn send(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<SendCommentRequest>,
) -> ApiResult<Value> {
    let post_ref = PostRef::parse(&body.post_doc_path)?;
    let message = validate::text("message", &body.message, 1, MAX_COMMENT_CHARS)?;
    let store = state.store();

    let post: Post = get_as(store, &post_ref.path)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} not found", post_ref.path)))?;

    let comment_id = Uuid::new_v4().to_string();
    let comment_path = paths::comment(&post_ref.path, &comment_id)?;
    let ts = now_ms();
    let comment = Comment {
        sender: user.username.clone(),
        message: message.clone(),
        ts,
    };
    let mirror = Interaction {
        post_doc_path: post_ref.path.to_string(),
        message: Some(message),
        ts,
    };

    let mut plan = MutationPlan::new("sendComment")
        .step("setComment", set_doc(store, comment_path.clone(), to_document(&comment)?))
        .step(
            "incrementCommentCount",
            update_doc(store, post_ref.path.clone(), vec![FieldUpdate::increment("commentCount", 1)]),
        )
        .step(
            "setCommentMirror",
            set_doc(store, paths::comment_mirror(&user.username, &comment_id)?, to_document(&mirror)?),
        );

    if post.sender_username != user.username {
        let mut notification = Notification::new(NotificationCause::Comment, user.username.as_str());
        notification.post_doc_path = Some(post_ref.path.to_string());
        plan = plan.step(
            "notify",
            notify(store, &post.sender_username, &notification_id::comment(&comment_id), &notification)?,
        );
    }

    plan.run_parallel().await.into_result()?;

    info!(username = %user.username, path = %comment_path, "comment sent");
    Ok(ApiResponse::success(json!({ "commentDocPath": comment_path.to_string() })))
}

/// POST /api/deleteComment - delete one of the requester's comments
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<DeleteCommentRequest>,
) -> ApiResult<Value> {
    let post_ref = PostRef::parse(&body.post_doc_path)?;
    let comment_path = paths::comment(&post_ref.path, &body.comment_id)?;

    state
        .locks
        .acquire(format!("commentDelete-{}", user.username), async {
            let store = state.store();
            fetch_owned(store, &comment_path, "sender", &user.username, ApiError::NotOwner).await?;

            let mut plan = MutationPlan::new("deleteComment")
                .step("deleteComment", delete_doc(store, comment_path.clone()))
                .step(
                    "decrementCommentCount",
                    update_doc(store, post_ref.path.clone(), vec![FieldUpdate::increment("commentCount", -1)]),
                )
                .step(
                    "deleteCommentMirror",
                    delete_doc(store, paths::comment_mirror(&user.username, &body.comment_id)?),
                );

            if post_ref.owner != user.username {
                plan = plan.step(
                    "withdrawNotification",
                    withdraw(store, &post_ref.owner, &notification_id::comment(&body.comment_id))?,
                );
            }

            plan.run_parallel().await.into_result()
        })
        .await?;

    info!(username = %user.username, path = %comment_path, "comment deleted");
    Ok(ok_status("deleted"))
}
