mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use apidon_api::store::{DocPath, DocumentStore};
use common::TestServer;

async fn with_friends() -> Result<TestServer> {
    let server = TestServer::start().await?;
    server.seed_users(&["alice", "bob", "mallory"]).await?;
    server.befriend("alice", "bob").await?;
    let (status, _) = server.post("/api/frenlets/createTag", "alice", json!({ "tag": "friends" })).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(server)
}

async fn send_frenlet(server: &TestServer) -> Result<String> {
    let (status, body) = server
        .post(
            "/api/frenlets/sendFrenlet",
            "alice",
            json!({ "frenletReceiver": "bob", "message": "coffee?", "tag": "friends" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    Ok(body["data"]["frenletDocPath"].as_str().unwrap().to_string())
}

fn incoming_of(outgoing: &str) -> String {
    let id = outgoing.rsplit('/').next().unwrap();
    format!("users/bob/frenlets/frenlets/incoming/{}", id)
}

async fn replies(server: &TestServer, path: &str) -> Result<Vec<Value>> {
    Ok(server.field(path, "replies").await?.as_array().cloned().unwrap_or_default())
}

#[tokio::test]
async fn tags_reject_spaces_duplicates_and_unknowns() -> Result<()> {
    let server = TestServer::start().await?;
    server.seed_user("alice").await?;

    let (status, _) = server.post("/api/frenlets/createTag", "alice", json!({ "tag": "best friend" })).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = server.post("/api/frenlets/createTag", "alice", json!({ "tag": "" })).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = server.post("/api/frenlets/createTag", "alice", json!({ "tag": "work" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tags"], json!(["work"]));

    let (status, _) = server.post("/api/frenlets/createTag", "alice", json!({ "tag": "work" })).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = server.post("/api/frenlets/deleteTag", "alice", json!({ "tag": "work" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tags"], json!([]));

    let (status, _) = server.post("/api/frenlets/deleteTag", "alice", json!({ "tag": "work" })).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn frenlet_requires_mutual_follow() -> Result<()> {
    let server = with_friends().await?;
    server.post("/api/follow", "alice", json!({ "operationTo": "mallory" })).await?;

    let (status, _) = server
        .post(
            "/api/frenlets/sendFrenlet",
            "alice",
            json!({ "frenletReceiver": "mallory", "message": "hi", "tag": "friends" }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn frenlet_requires_known_tag() -> Result<()> {
    let server = with_friends().await?;

    let (status, body) = server
        .post(
            "/api/frenlets/sendFrenlet",
            "alice",
            json!({ "frenletReceiver": "bob", "message": "hi", "tag": "unknown" }),
        )
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["field_errors"]["tag"].is_string());
    Ok(())
}

#[tokio::test]
async fn frenlet_lands_in_both_boxes_and_notifies() -> Result<()> {
    let server = with_friends().await?;
    let outgoing = send_frenlet(&server).await?;
    let incoming = incoming_of(&outgoing);

    assert_eq!(server.doc(&outgoing).await?, server.doc(&incoming).await?);
    assert_eq!(server.field(&incoming, "frenletSender").await?, "alice");

    let (_, inbox) = server.post("/api/notifications/list", "bob", json!({})).await?;
    let causes: Vec<_> = inbox["data"]["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["cause"].as_str().unwrap().to_string())
        .collect();
    assert!(causes.contains(&"frenlet".to_string()));
    Ok(())
}

#[tokio::test]
async fn reply_appears_in_both_copies() -> Result<()> {
    let server = with_friends().await?;
    let outgoing = send_frenlet(&server).await?;
    let incoming = incoming_of(&outgoing);

    let (status, body) = server
        .post("/api/frenlets/sendReply", "bob", json!({ "frenletDocPath": incoming, "replet": "sure" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["replet"]["sender"], "bob");

    let out = replies(&server, &outgoing).await?;
    let inc = replies(&server, &incoming).await?;
    assert_eq!(out.len(), 1);
    assert_eq!(out, inc);
    Ok(())
}

#[tokio::test]
async fn outsider_cannot_reply() -> Result<()> {
    let server = with_friends().await?;
    let outgoing = send_frenlet(&server).await?;

    let (status, _) = server
        .post("/api/frenlets/sendReply", "mallory", json!({ "frenletDocPath": outgoing, "replet": "hey" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(replies(&server, &outgoing).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn only_reply_author_can_delete_it() -> Result<()> {
    let server = with_friends().await?;
    let outgoing = send_frenlet(&server).await?;
    let incoming = incoming_of(&outgoing);

    let (_, body) = server
        .post("/api/frenlets/sendReply", "bob", json!({ "frenletDocPath": incoming, "replet": "sure" }))
        .await?;
    let replet = body["data"]["replet"].clone();

    let (status, _) = server
        .post("/api/frenlets/deleteReply", "alice", json!({ "frenletDocPath": outgoing, "replet": replet }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(replies(&server, &outgoing).await?.len(), 1);

    let (status, _) = server
        .post("/api/frenlets/deleteReply", "bob", json!({ "frenletDocPath": incoming, "replet": replet }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(replies(&server, &outgoing).await?.is_empty());
    assert!(replies(&server, &incoming).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn deleting_missing_reply_is_404_without_mutation() -> Result<()> {
    let server = with_friends().await?;
    let outgoing = send_frenlet(&server).await?;
    let before = server.doc(&outgoing).await?;

    let ghost = json!({ "message": "never sent", "sender": "alice", "ts": 1 });
    let (status, _) = server
        .post("/api/frenlets/deleteReply", "alice", json!({ "frenletDocPath": outgoing, "replet": ghost }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(server.doc(&outgoing).await?, before);
    Ok(())
}

#[tokio::test]
async fn either_participant_deletes_both_copies() -> Result<()> {
    let server = with_friends().await?;
    let outgoing = send_frenlet(&server).await?;
    let incoming = incoming_of(&outgoing);

    let (status, _) = server
        .post("/api/frenlets/deleteFrenlet", "mallory", json!({ "frenletDocPath": outgoing }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .post("/api/frenlets/deleteFrenlet", "bob", json!({ "frenletDocPath": incoming }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(!server.exists(&outgoing).await?);
    assert!(!server.exists(&incoming).await?);
    Ok(())
}

#[tokio::test]
async fn repair_restores_missing_copy() -> Result<()> {
    let server = with_friends().await?;
    let outgoing = send_frenlet(&server).await?;
    let incoming = incoming_of(&outgoing);
    server
        .post("/api/frenlets/sendReply", "alice", json!({ "frenletDocPath": outgoing, "replet": "ping" }))
        .await?;

    // Simulate a copy lost before writes were batched
    server.store.delete(&DocPath::parse(&incoming)?).await?;

    let (status, _) = server
        .post("/api/frenlets/sendReply", "alice", json!({ "frenletDocPath": outgoing, "replet": "again" }))
        .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(replies(&server, &outgoing).await?.len(), 1);

    let (status, body) = server
        .post("/api/frenlets/repairMirrors", "alice", json!({ "frenletDocPath": outgoing }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["repaired"], true);
    assert_eq!(server.doc(&outgoing).await?, server.doc(&incoming).await?);

    let (_, body) = server
        .post("/api/frenlets/repairMirrors", "alice", json!({ "frenletDocPath": outgoing }))
        .await?;
    assert_eq!(body["data"]["repaired"], false);
    Ok(())
}
