/// Document models stored under the paths built in `crate::paths`.
/// Field names follow the camelCase layout the web client reads.
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unix milliseconds
pub type Timestamp = i64;

pub fn now_ms() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub follower_count: i64,
    #[serde(default)]
    pub following_count: i64,
    #[serde(default)]
    pub nft_count: i64,
}

impl User {
    pub fn new(username: impl Into<String>, fullname: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            fullname: fullname.into(),
            image: None,
            follower_count: 0,
            following_count: 0,
            nft_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub sender_username: String,
    pub description: String,
    pub image: String,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub nft_status: NftStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftStatus {
    #[serde(default)]
    pub minted: bool,
    #[serde(default)]
    pub metadata_link: Option<String>,
    #[serde(default)]
    pub listing: Option<NftListing>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftListing {
    pub price: Decimal,
    pub currency: String,
    pub sold: bool,
    pub buyer: Option<String>,
    pub listed_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub sender: String,
    pub ts: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub sender: String,
    pub message: String,
    pub ts: Timestamp,
}

/// Copy of a comment or like kept under the acting user's interaction history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub post_doc_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub ts: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowEdge {
    pub ts: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrenletTags {
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frenlet {
    pub frenlet_doc_id: String,
    pub frenlet_sender: String,
    pub frenlet_receiver: String,
    pub message: String,
    pub tag: String,
    pub ts: Timestamp,
    #[serde(default)]
    pub replies: Vec<Replet>,
}

impl Frenlet {
    pub fn is_participant(&self, username: &str) -> bool {
        self.frenlet_sender == username || self.frenlet_receiver == username
    }
}

/// Reply entry; identified by the (message, sender, ts) triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replet {
    pub message: String,
    pub sender: String,
    pub ts: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationCause {
    Like,
    Comment,
    Follow,
    Frenlet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub cause: NotificationCause,
    pub sender: String,
    pub seen: bool,
    pub ts: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_doc_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frenlet_doc_path: Option<String>,
}

impl Notification {
    pub fn new(cause: NotificationCause, sender: impl Into<String>) -> Self {
        Self {
            cause,
            sender: sender.into(),
            seen: false,
            ts: now_ms(),
            post_doc_path: None,
            frenlet_doc_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentProvider {
    pub name: String,
    pub start_time: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRating {
    pub score: u8,
    pub ts: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_defaults_missing_counters() {
        let post: Post = serde_json::from_value(json!({
            "senderUsername": "alice",
            "description": "hello",
            "image": "https://img.apidon.com/1.png",
            "timestamp": 1
        }))
        .unwrap();
        assert_eq!(post.like_count, 0);
        assert!(!post.nft_status.minted);
    }

    #[test]
    fn test_listing_price_serializes_as_string() {
        let listing = NftListing {
            price: Decimal::new(1250, 2),
            currency: "MATIC".to_string(),
            sold: false,
            buyer: None,
            listed_at: 0,
        };
        let value = serde_json::to_value(&listing).unwrap();
        assert_eq!(value["price"], "12.50");
        assert_eq!(value["listedAt"], 0);
    }

    #[test]
    fn test_notification_cause_is_camel_case() {
        let value = serde_json::to_value(Notification::new(NotificationCause::Frenlet, "bob")).unwrap();
        assert_eq!(value["cause"], "frenlet");
        assert!(value.get("postDocPath").is_none());
    }
}
