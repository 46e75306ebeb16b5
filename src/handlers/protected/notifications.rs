// handlers/protected/notifications.rs - Notification inbox and the helpers
// other handlers use to create or withdraw notifications

use axum::{extract::State, Extension};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::models::Notification;
use crate::mutation::{delete_doc, set_doc, StepFuture};
use crate::paths;
use crate::store::{from_document, to_document, DocumentStore, FieldUpdate, WriteBatch};
use crate::state::AppState;

/// Step writing `notification` into `recipient`'s inbox under `id`
pub fn notify<'a>(
    store: &'a dyn DocumentStore,
    recipient: &str,
    id: &str,
    notification: &Notification,
) -> Result<StepFuture<'a>, ApiError> {
    let path = paths::notification(recipient, id)?;
    Ok(set_doc(store, path, to_document(notification)?))
}

/// Step removing a notification; a missing one is not an error
pub fn withdraw<'a>(store: &'a dyn DocumentStore, recipient: &str, id: &str) -> Result<StepFuture<'a>, ApiError> {
    Ok(delete_doc(store, paths::notification(recipient, id)?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: String,
    #[serde(flatten)]
    pub notification: Notification,
}

/// POST /api/notifications/list - the requester's notifications, newest first
pub async fn list(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    let collection = paths::notifications(&user.username)?;
    let mut views = Vec::new();
    for (path, doc) in state.store().list(&collection).await? {
        let notification: Notification = from_document(&path, doc)?;
        views.push(NotificationView {
            id: path.id().to_string(),
            notification,
        });
    }
    views.sort_by(|a, b| b.notification.ts.cmp(&a.notification.ts).then_with(|| a.id.cmp(&b.id)));

    let unseen = views.iter().filter(|v| !v.notification.seen).count();
    Ok(ApiResponse::success(json!({
        "notifications": views,
        "unseen": unseen
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSeenRequest {
    /// Marks every notification when absent
    #[serde(default)]
    pub notification_ids: Option<Vec<String>>,
}

/// POST /api/notifications/markSeen - flag notifications as seen in one batch
pub async fn mark_seen(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<MarkSeenRequest>,
) -> ApiResult<Value> {
    let store = state.store();
    let collection = paths::notifications(&user.username)?;

    let mut batch = WriteBatch::new();
    for (path, doc) in store.list(&collection).await? {
        let wanted = match &body.notification_ids {
            Some(ids) => ids.iter().any(|id| id == path.id()),
            None => true,
        };
        let seen = doc.get("seen").and_then(Value::as_bool).unwrap_or(false);
        if wanted && !seen {
            batch = batch.update(path, vec![FieldUpdate::set("seen", true)]);
        }
    }

    let marked = batch.len();
    if !batch.is_empty() {
        store.commit(batch).await?;
    }
    info!(username = %user.username, marked, "notifications marked seen");

    Ok(ApiResponse::success(json!({ "marked": marked })))
}
