mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::TestServer;

#[tokio::test]
async fn follow_updates_both_sides_and_counters() -> Result<()> {
    let server = TestServer::start().await?;
    server.seed_users(&["alice", "bob"]).await?;

    let (status, _) = server.post("/api/follow", "alice", json!({ "operationTo": "bob" })).await?;
    assert_eq!(status, StatusCode::OK);

    assert!(server.exists("users/bob/followers/alice").await?);
    assert!(server.exists("users/alice/followings/bob").await?);
    assert_eq!(server.field("users/bob", "followerCount").await?, 1);
    assert_eq!(server.field("users/alice", "followingCount").await?, 1);

    let (status, _) = server.post("/api/follow", "alice", json!({ "operationTo": "bob" })).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(server.field("users/bob", "followerCount").await?, 1);

    let (status, _) = server.post("/api/unfollow", "alice", json!({ "operationTo": "bob" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(!server.exists("users/bob/followers/alice").await?);
    assert_eq!(server.field("users/bob", "followerCount").await?, 0);
    assert_eq!(server.field("users/alice", "followingCount").await?, 0);

    let (status, _) = server.post("/api/unfollow", "alice", json!({ "operationTo": "bob" })).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn follow_rejects_self_and_unknown_users() -> Result<()> {
    let server = TestServer::start().await?;
    server.seed_user("alice").await?;

    let (status, _) = server.post("/api/follow", "alice", json!({ "operationTo": "alice" })).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = server.post("/api/follow", "alice", json!({ "operationTo": "ghost" })).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn fullname_is_trimmed_and_bounded() -> Result<()> {
    let server = TestServer::start().await?;
    server.seed_user("alice").await?;

    let (status, _) = server
        .post("/api/updateFullname", "alice", json!({ "fullname": "  Alice Liddell " }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.field("users/alice", "fullname").await?, "Alice Liddell");

    let (status, _) = server
        .post("/api/updateFullname", "alice", json!({ "fullname": "x".repeat(31) }))
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn profile_photo_change_returns_previous_image() -> Result<()> {
    let server = TestServer::start().await?;
    server.seed_user("alice").await?;

    let (_, body) = server
        .post("/api/changeProfilePhoto", "alice", json!({ "image": "https://img.apidon.com/a.png" }))
        .await?;
    assert!(body["data"]["previousImage"].is_null());

    let (status, body) = server
        .post("/api/changeProfilePhoto", "alice", json!({ "image": "https://img.apidon.com/b.png" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["previousImage"], "https://img.apidon.com/a.png");
    assert_eq!(server.field("users/alice", "image").await?, "https://img.apidon.com/b.png");
    Ok(())
}

#[tokio::test]
async fn notifications_are_newest_first_and_can_be_marked_seen() -> Result<()> {
    let server = TestServer::start().await?;
    server.seed_users(&["alice", "bob", "carol"]).await?;

    server.post("/api/follow", "bob", json!({ "operationTo": "alice" })).await?;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    server.post("/api/follow", "carol", json!({ "operationTo": "alice" })).await?;

    let (_, body) = server.post("/api/notifications/list", "alice", json!({})).await?;
    let list = body["data"]["notifications"].as_array().unwrap().clone();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["sender"], "carol");
    assert_eq!(body["data"]["unseen"], 2);

    let first_id = list[1]["id"].as_str().unwrap().to_string();
    let (_, body) = server
        .post("/api/notifications/markSeen", "alice", json!({ "notificationIds": [first_id] }))
        .await?;
    assert_eq!(body["data"]["marked"], 1);

    let (_, body) = server.post("/api/notifications/markSeen", "alice", json!({})).await?;
    assert_eq!(body["data"]["marked"], 1);

    let (_, body) = server.post("/api/notifications/list", "alice", json!({})).await?;
    assert_eq!(body["data"]["unseen"], 0);
    Ok(())
}

#[tokio::test]
async fn unfollow_withdraws_follow_notification() -> Result<()> {
    let server = TestServer::start().await?;
    server.seed_users(&["alice", "bob"]).await?;

    server.post("/api/follow", "bob", json!({ "operationTo": "alice" })).await?;
    server.post("/api/unfollow", "bob", json!({ "operationTo": "alice" })).await?;

    let (_, body) = server.post("/api/notifications/list", "alice", json!({})).await?;
    assert!(body["data"]["notifications"].as_array().unwrap().is_empty());
    Ok(())
}
