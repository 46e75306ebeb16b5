// handlers/protected/follow.rs - POST /api/follow and /api/unfollow
//
// A follow edge is stored twice: `users/{target}/followers/{me}` and
// `users/{me}/followings/{target}`. Both counters move with it.

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::ApiError;
use crate::middleware::{ok_status, ApiResult, AuthUser, JsonBody};
use crate::models::{now_ms, FollowEdge, Notification, NotificationCause};
use crate::mutation::{delete_doc, set_doc, update_doc, MutationPlan};
use crate::paths::{self, notification_id};
use crate::state::AppState;
use crate::store::{to_document, DocumentStore, FieldUpdate};

use super::notifications::{notify, withdraw};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    pub operation_to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FollowOp {
    Follow,
    Unfollow,
}

/// POST /api/follow
pub async fn follow(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<FollowRequest>,
) -> ApiResult<Value> {
    run(&state, &user.username, &body.operation_to, FollowOp::Follow).await?;
    info!(username = %user.username, target = %body.operation_to, "followed");
    Ok(ok_status("followed"))
}

/// POST /api/unfollow
pub async fn unfollow(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<FollowRequest>,
) -> ApiResult<Value> {
    run(&state, &user.username, &body.operation_to, FollowOp::Unfollow).await?;
    info!(username = %user.username, target = %body.operation_to, "unfollowed");
    Ok(ok_status("unfollowed"))
}

async fn run(state: &AppState, requester: &str, target: &str, op: FollowOp) -> Result<(), ApiError> {
    if target.trim().is_empty() {
        return Err(ApiError::invalid_field("operationTo", "operationTo must not be empty"));
    }
    if target == requester {
        return Err(ApiError::validation("You cannot follow yourself"));
    }

    // The edge is keyed on the requester so follow and unfollow serialize
    state
        .locks
        .acquire(format!("follow-{}", requester), async {
            let store = state.store();
            require_user(store, requester).await?;
            require_user(store, target).await?;

            let following_path = paths::following(requester, target)?;
            let exists = store.get(&following_path).await?.is_some();
            match (op, exists) {
                (FollowOp::Follow, true) => return Err(ApiError::validation(format!("Already following {}", target))),
                (FollowOp::Unfollow, false) => return Err(ApiError::validation(format!("Not following {}", target))),
                _ => {}
            }

            let follower_path = paths::follower(target, requester)?;
            let notification_id = notification_id::follow(requester);

            let plan = match op {
                FollowOp::Follow => {
                    let edge = to_document(&FollowEdge { ts: now_ms() })?;
                    let notification = Notification::new(NotificationCause::Follow, requester);
                    MutationPlan::new("follow")
                        .step("setFollower", set_doc(store, follower_path, edge.clone()))
                        .step("setFollowing", set_doc(store, following_path, edge))
                        .step(
                            "incrementFollowerCount",
                            update_doc(store, paths::user(target)?, vec![FieldUpdate::increment("followerCount", 1)]),
                        )
                        .step(
                            "incrementFollowingCount",
                            update_doc(store, paths::user(requester)?, vec![FieldUpdate::increment("followingCount", 1)]),
                        )
                        .step("notify", notify(store, target, &notification_id, &notification)?)
                }
                FollowOp::Unfollow => MutationPlan::new("unfollow")
                    .step("deleteFollower", delete_doc(store, follower_path))
                    .step("deleteFollowing", delete_doc(store, following_path))
                    .step(
                        "decrementFollowerCount",
                        update_doc(store, paths::user(target)?, vec![FieldUpdate::increment("followerCount", -1)]),
                    )
                    .step(
                        "decrementFollowingCount",
                        update_doc(store, paths::user(requester)?, vec![FieldUpdate::increment("followingCount", -1)]),
                    )
                    .step("withdrawNotification", withdraw(store, target, &notification_id)?),
            };

            plan.run_parallel().await.into_result()
        })
        .await
}

async fn require_user(store: &dyn DocumentStore, username: &str) -> Result<(), ApiError> {
    match store.get(&paths::user(username)?).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found(format!("User {} not found", username))),
    }
}
