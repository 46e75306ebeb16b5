use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::models::Frenlet;
use crate::store::{from_document, DocPath, Document, DocumentStore};

/// Loads `path` and checks that `doc[owner_field] == requester`.
///
/// A missing document never proceeds: it is reported as `NotFound`.
/// A document owned by someone else yields `on_mismatch`.
pub async fn fetch_owned(
    store: &dyn DocumentStore,
    path: &DocPath,
    owner_field: &str,
    requester: &str,
    on_mismatch: fn(String) -> ApiError,
) -> Result<Document, ApiError> {
    let doc = store
        .get(path)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} not found", path)))?;

    match doc.get(owner_field).and_then(|v| v.as_str()) {
        Some(owner) if owner == requester => Ok(doc),
        _ => {
            tracing::warn!(%path, requester, "ownership check failed");
            Err(on_mismatch(format!("{} is not the owner of {}", requester, path)))
        }
    }
}

/// Typed variant of `fetch_owned`
pub async fn fetch_owned_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    path: &DocPath,
    owner_field: &str,
    requester: &str,
    on_mismatch: fn(String) -> ApiError,
) -> Result<T, ApiError> {
    let doc = fetch_owned(store, path, owner_field, requester, on_mismatch).await?;
    Ok(from_document(path, doc)?)
}

/// Loads a frenlet copy and checks the requester is its sender or receiver
pub async fn fetch_participant(
    store: &dyn DocumentStore,
    path: &DocPath,
    requester: &str,
) -> Result<Frenlet, ApiError> {
    let doc = store
        .get(path)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} not found", path)))?;
    let frenlet: Frenlet = from_document(path, doc)?;

    if frenlet.is_participant(requester) {
        Ok(frenlet)
    } else {
        tracing::warn!(%path, requester, "frenlet participant check failed");
        Err(ApiError::forbidden("Not a participant of this frenlet"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    async fn seeded() -> (MemoryStore, DocPath) {
        let store = MemoryStore::new();
        let path = DocPath::parse("users/alice/posts/p1").unwrap();
        store
            .set(&path, json!({"senderUsername": "alice"}).as_object().cloned().unwrap())
            .await
            .unwrap();
        (store, path)
    }

    #[tokio::test]
    async fn test_owner_gets_document() {
        let (store, path) = seeded().await;
        let doc = fetch_owned(&store, &path, "senderUsername", "alice", ApiError::NotOwner)
            .await
            .unwrap();
        assert_eq!(doc["senderUsername"], "alice");
    }

    #[tokio::test]
    async fn test_mismatch_uses_caller_error() {
        let (store, path) = seeded().await;
        let err = fetch_owned(&store, &path, "senderUsername", "mallory", ApiError::NotOwner)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 522);

        let err = fetch_owned(&store, &path, "senderUsername", "mallory", ApiError::Forbidden)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_missing_document_fails_closed() {
        let store = MemoryStore::new();
        let path = DocPath::parse("users/alice/posts/nope").unwrap();
        let err = fetch_owned(&store, &path, "senderUsername", "alice", ApiError::NotOwner)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_missing_owner_field_is_a_mismatch() {
        let store = MemoryStore::new();
        let path = DocPath::parse("users/alice/posts/p2").unwrap();
        store.set(&path, Document::new()).await.unwrap();
        let err = fetch_owned(&store, &path, "senderUsername", "alice", ApiError::NotOwner)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 522);
    }
}
