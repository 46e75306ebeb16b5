// handlers/protected/frenlets/frenlet.rs - POST /api/frenlets/sendFrenlet and /api/frenlets/deleteFrenlet

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::protected::validate;
use crate::middleware::{ok_status, ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::models::{now_ms, Frenlet, FrenletTags, Notification, NotificationCause};
use crate::ownership::fetch_participant;
use crate::paths::{self, frenlet_mirrors, notification_id, FrenletRef};
use crate::state::AppState;
use crate::store::{get_as, to_document, WriteBatch};

use super::{commit_mirrored, MAX_FRENLET_CHARS};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFrenletRequest {
    pub frenlet_receiver: String,
    pub message: String,
    pub tag: String,
}

/// Body shared by the endpoints addressing one frenlet copy
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrenletDocRequest {
    pub frenlet_doc_path: String,
}

/// POST /api/frenlets/sendFrenlet - send a tagged frenlet to a mutual follower
pub async fn send(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<SendFrenletRequest>,
) -> ApiResult<Value> {
    let sender = user.username.as_str();
    let receiver = body.frenlet_receiver.trim();
    if receiver.is_empty() {
        return Err(ApiError::invalid_field("frenletReceiver", "frenletReceiver must not be empty"));
    }
    if receiver == sender {
        return Err(ApiError::validation("You cannot send a frenlet to yourself"));
    }
    let message = validate::text("message", &body.message, 1, MAX_FRENLET_CHARS)?;
    let tag = validate::tag(&body.tag)?;

    let store = state.store();
    if store.get(&paths::user(receiver)?).await?.is_none() {
        return Err(ApiError::not_found(format!("User {} not found", receiver)));
    }

    let follows = store.get(&paths::following(sender, receiver)?).await?.is_some();
    let followed_back = store.get(&paths::following(receiver, sender)?).await?.is_some();
    if !(follows && followed_back) {
        return Err(ApiError::forbidden("Frenlets can only be sent between mutual followers"));
    }

    let tags: FrenletTags = get_as(store, &paths::frenlet_root(sender)?).await?.unwrap_or_default();
    if !tags.tags.contains(&tag) {
        return Err(ApiError::invalid_field("tag", format!("Unknown tag '{}'", tag)));
    }

    let frenlet_id = Uuid::new_v4().to_string();
    let (outgoing, incoming) = frenlet_mirrors(sender, receiver, &frenlet_id)?;
    let frenlet = Frenlet {
        frenlet_doc_id: frenlet_id.clone(),
        frenlet_sender: sender.to_string(),
        frenlet_receiver: receiver.to_string(),
        message,
        tag,
        ts: now_ms(),
        replies: Vec::new(),
    };
    let mut notification = Notification::new(NotificationCause::Frenlet, sender);
    notification.frenlet_doc_path = Some(incoming.to_string());

    let doc = to_document(&frenlet)?;
    let batch = WriteBatch::new()
        .set(outgoing.clone(), doc.clone())
        .set(incoming, doc)
        .set(
            paths::notification(receiver, &notification_id::frenlet(&frenlet_id))?,
            to_document(&notification)?,
        );
    commit_mirrored(store, batch, "sendFrenlet").await?;

    info!(sender, receiver, frenlet_id = %frenlet_id, "frenlet sent");
    Ok(ApiResponse::success(json!({ "frenletDocPath": outgoing.to_string() })))
}

/// POST /api/frenlets/deleteFrenlet - either participant removes both copies
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<FrenletDocRequest>,
) -> ApiResult<Value> {
    let frenlet_ref = FrenletRef::parse(&body.frenlet_doc_path)?;

    state
        .locks
        .acquire(format!("frenletDelete-{}", user.username), async {
            let store = state.store();
            let frenlet = fetch_participant(store, &frenlet_ref.path, &user.username).await?;
            let (outgoing, incoming) =
                frenlet_mirrors(&frenlet.frenlet_sender, &frenlet.frenlet_receiver, &frenlet.frenlet_doc_id)?;

            let batch = WriteBatch::new()
                .delete(outgoing)
                .delete(incoming)
                .delete(paths::notification(
                    &frenlet.frenlet_receiver,
                    &notification_id::frenlet(&frenlet.frenlet_doc_id),
                )?);
            commit_mirrored(store, batch, "deleteFrenlet").await
        })
        .await?;

    info!(username = %user.username, path = %frenlet_ref.path, "frenlet deleted");
    Ok(ok_status("deleted"))
}
