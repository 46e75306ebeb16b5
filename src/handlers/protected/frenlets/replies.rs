// handlers/protected/frenlets/replies.rs - replies on a frenlet, plus mirror repair
//
// POST /api/frenlets/sendReply
// POST /api/frenlets/deleteReply
// POST /api/frenlets/repairMirrors
//
// All three share the `frenletReply-{username}` key.

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::handlers::protected::validate;
use crate::middleware::{ok_status, ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::models::{now_ms, Frenlet, Replet};
use crate::ownership::fetch_participant;
use crate::paths::{frenlet_mirrors, FrenletRef};
use crate::state::AppState;
use crate::store::{get_as, to_document, FieldUpdate, WriteBatch};

use super::frenlet::FrenletDocRequest;
use super::{commit_mirrored, MAX_FRENLET_CHARS};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReplyRequest {
    pub frenlet_doc_path: String,
    pub replet: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReplyRequest {
    pub frenlet_doc_path: String,
    pub replet: Replet,
}

/// POST /api/frenlets/sendReply - append a reply to both copies
pub async fn send(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<SendReplyRequest>,
) -> ApiResult<Value> {
    let frenlet_ref = FrenletRef::parse(&body.frenlet_doc_path)?;
    let message = validate::text("replet", &body.replet, 1, MAX_FRENLET_CHARS)?;

    let replet = state
        .locks
        .acquire(format!("frenletReply-{}", user.username), async {
            let store = state.store();
            let frenlet = fetch_participant(store, &frenlet_ref.path, &user.username).await?;
            let replet = Replet {
                message,
                sender: user.username.clone(),
                ts: now_ms(),
            };
            ensure_new_reply(&frenlet, &replet)?;

            let entry = vec![serde_json::to_value(&replet).map_err(|e| ApiError::internal_server_error(e.to_string()))?];
            let (outgoing, incoming) =
                frenlet_mirrors(&frenlet.frenlet_sender, &frenlet.frenlet_receiver, &frenlet.frenlet_doc_id)?;
            let batch = WriteBatch::new()
                .update(outgoing, vec![FieldUpdate::array_union("replies", entry.clone())])
                .update(incoming, vec![FieldUpdate::array_union("replies", entry)]);
            commit_mirrored(store, batch, "sendReply").await?;
            Ok::<_, ApiError>(replet)
        })
        .await?;

    info!(username = %user.username, path = %frenlet_ref.path, "frenlet reply sent");
    Ok(ApiResponse::success(json!({ "replet": replet })))
}

/// POST /api/frenlets/deleteReply - the reply's author removes it from both copies
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<DeleteReplyRequest>,
) -> ApiResult<Value> {
    let frenlet_ref = FrenletRef::parse(&body.frenlet_doc_path)?;
    let target = body.replet;

    state
        .locks
        .acquire(format!("frenletReply-{}", user.username), async {
            let store = state.store();
            let frenlet = fetch_participant(store, &frenlet_ref.path, &user.username).await?;

            if !frenlet.replies.contains(&target) {
                return Err(ApiError::not_found("Reply not found"));
            }
            if target.sender != user.username {
                warn!(username = %user.username, author = %target.sender, "attempt to delete another user's reply");
                return Err(ApiError::forbidden("Only the author can delete a reply"));
            }

            let entry = vec![serde_json::to_value(&target).map_err(|e| ApiError::internal_server_error(e.to_string()))?];
            let (outgoing, incoming) =
                frenlet_mirrors(&frenlet.frenlet_sender, &frenlet.frenlet_receiver, &frenlet.frenlet_doc_id)?;
            let batch = WriteBatch::new()
                .update(outgoing, vec![FieldUpdate::array_remove("replies", entry.clone())])
                .update(incoming, vec![FieldUpdate::array_remove("replies", entry)]);
            commit_mirrored(store, batch, "deleteReply").await
        })
        .await?;

    info!(username = %user.username, path = %frenlet_ref.path, "frenlet reply deleted");
    Ok(ok_status("deleted"))
}

/// POST /api/frenlets/repairMirrors - rebuild a missing or diverged copy
pub async fn repair(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<FrenletDocRequest>,
) -> ApiResult<Value> {
    let frenlet_ref = FrenletRef::parse(&body.frenlet_doc_path)?;

    let repaired = state
        .locks
        .acquire(format!("frenletReply-{}", user.username), async {
            let store = state.store();
            let known = fetch_participant(store, &frenlet_ref.path, &user.username).await?;
            let (outgoing_path, incoming_path) =
                frenlet_mirrors(&known.frenlet_sender, &known.frenlet_receiver, &known.frenlet_doc_id)?;

            let outgoing: Option<Frenlet> = get_as(store, &outgoing_path).await?;
            let incoming: Option<Frenlet> = get_as(store, &incoming_path).await?;
            let other = if frenlet_ref.path == outgoing_path { incoming.as_ref() } else { outgoing.as_ref() };
            let merged = merge_copies(&known, other);

            if outgoing.as_ref() == Some(&merged) && incoming.as_ref() == Some(&merged) {
                return Ok(false);
            }

            let doc = to_document(&merged)?;
            let batch = WriteBatch::new().set(outgoing_path, doc.clone()).set(incoming_path, doc);
            store.commit(batch).await?;
            warn!(frenlet_id = %merged.frenlet_doc_id, "frenlet copies repaired");
            Ok::<_, ApiError>(true)
        })
        .await?;

    info!(username = %user.username, path = %frenlet_ref.path, repaired, "frenlet mirrors checked");
    Ok(ApiResponse::success(json!({ "repaired": repaired })))
}

/// Array union keeps one copy of equal values, so an exact duplicate would be dropped silently
fn ensure_new_reply(frenlet: &Frenlet, replet: &Replet) -> Result<(), ApiError> {
    if frenlet.replies.contains(replet) {
        return Err(ApiError::invalid_field("replet", "An identical reply was just sent"));
    }
    Ok(())
}

/// Union of both copies' replies ordered by timestamp; other fields come from `base`
pub fn merge_copies(base: &Frenlet, other: Option<&Frenlet>) -> Frenlet {
    let mut merged = base.clone();
    if let Some(other) = other {
        merged.replies.extend(other.replies.iter().cloned());
    }
    merged
        .replies
        .sort_by(|a, b| (a.ts, &a.sender, &a.message).cmp(&(b.ts, &b.sender, &b.message)));
    merged.replies.dedup();
    merged
}
