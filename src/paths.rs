//! Document layout of the Apidon store.
//!
//! ```text
//! users/{u}
//! users/{u}/posts/{postId}
//! users/{u}/posts/{postId}/likes/{liker}
//! users/{u}/posts/{postId}/comments/{commentId}
//! users/{u}/personal/postInteractions/{comments|likes}/{id}
//! users/{u}/followers/{follower}
//! users/{u}/followings/{target}
//! users/{u}/frenlets/frenlets                      (tags)
//! users/{u}/frenlets/frenlets/{incoming|outgoing}/{frenletId}
//! users/{u}/notifications/{id}
//! users/{u}/provider/currentProvider
//! users/{u}/providerRatings/{providerName}
//! ```

use sha2::{Digest, Sha256};

use crate::store::{CollectionPath, DocPath, PathError};

pub fn user(username: &str) -> Result<DocPath, PathError> {
    CollectionPath::parse("users")?.doc(username)
}

pub fn posts(username: &str) -> Result<CollectionPath, PathError> {
    user(username)?.collection("posts")
}

pub fn post(username: &str, post_id: &str) -> Result<DocPath, PathError> {
    posts(username)?.doc(post_id)
}

pub fn likes(post: &DocPath) -> Result<CollectionPath, PathError> {
    post.collection("likes")
}

pub fn like(post: &DocPath, liker: &str) -> Result<DocPath, PathError> {
    likes(post)?.doc(liker)
}

pub fn comments(post: &DocPath) -> Result<CollectionPath, PathError> {
    post.collection("comments")
}

pub fn comment(post: &DocPath, comment_id: &str) -> Result<DocPath, PathError> {
    comments(post)?.doc(comment_id)
}

fn interactions(username: &str, kind: &str) -> Result<CollectionPath, PathError> {
    user(username)?
        .child("personal", "postInteractions")?
        .collection(kind)
}

pub fn comment_mirror(commenter: &str, comment_id: &str) -> Result<DocPath, PathError> {
    interactions(commenter, "comments")?.doc(comment_id)
}

pub fn like_mirror(liker: &str, post_id: &str) -> Result<DocPath, PathError> {
    interactions(liker, "likes")?.doc(post_id)
}

pub fn follower(username: &str, follower: &str) -> Result<DocPath, PathError> {
    user(username)?.child("followers", follower)
}

pub fn following(username: &str, target: &str) -> Result<DocPath, PathError> {
    user(username)?.child("followings", target)
}

pub fn frenlet_root(username: &str) -> Result<DocPath, PathError> {
    user(username)?.child("frenlets", "frenlets")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrenletBox {
    Incoming,
    Outgoing,
}

impl FrenletBox {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrenletBox::Incoming => "incoming",
            FrenletBox::Outgoing => "outgoing",
        }
    }
}

pub fn frenlet(username: &str, direction: FrenletBox, frenlet_id: &str) -> Result<DocPath, PathError> {
    frenlet_root(username)?.child(direction.as_str(), frenlet_id)
}

pub fn notifications(username: &str) -> Result<CollectionPath, PathError> {
    user(username)?.collection("notifications")
}

pub fn notification(username: &str, id: &str) -> Result<DocPath, PathError> {
    notifications(username)?.doc(id)
}

pub fn current_provider(username: &str) -> Result<DocPath, PathError> {
    user(username)?.child("provider", "currentProvider")
}

pub fn provider_rating(username: &str, provider: &str) -> Result<DocPath, PathError> {
    user(username)?.child("providerRatings", provider)
}

/// A `users/{owner}/posts/{postId}` path supplied by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRef {
    pub owner: String,
    pub post_id: String,
    pub path: DocPath,
}

impl PostRef {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let path = DocPath::parse(raw)?;
        match path.segments() {
            [users, owner, posts, post_id] if users == "users" && posts == "posts" => Ok(Self {
                owner: owner.clone(),
                post_id: post_id.clone(),
                path: path.clone(),
            }),
            _ => Err(PathError::UnexpectedLayout(raw.to_string())),
        }
    }
}

/// A `users/{owner}/frenlets/frenlets/{incoming|outgoing}/{frenletId}` path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrenletRef {
    pub owner: String,
    pub direction: FrenletBox,
    pub frenlet_id: String,
    pub path: DocPath,
}

impl FrenletRef {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let path = DocPath::parse(raw)?;
        match path.segments() {
            [users, owner, frenlets, frenlets_doc, direction, frenlet_id]
                if users == "users" && frenlets == "frenlets" && frenlets_doc == "frenlets" =>
            {
                let direction = match direction.as_str() {
                    "incoming" => FrenletBox::Incoming,
                    "outgoing" => FrenletBox::Outgoing,
                    _ => return Err(PathError::UnexpectedLayout(raw.to_string())),
                };
                Ok(Self {
                    owner: owner.clone(),
                    direction,
                    frenlet_id: frenlet_id.clone(),
                    path: path.clone(),
                })
            }
            _ => Err(PathError::UnexpectedLayout(raw.to_string())),
        }
    }
}

/// Paths of the sender's outgoing copy and the receiver's incoming copy
pub fn frenlet_mirrors(sender: &str, receiver: &str, frenlet_id: &str) -> Result<(DocPath, DocPath), PathError> {
    Ok((
        frenlet(sender, FrenletBox::Outgoing, frenlet_id)?,
        frenlet(receiver, FrenletBox::Incoming, frenlet_id)?,
    ))
}

/// Notification ids are derived from the triggering action so undoing the
/// action can delete the notification without a query.
pub mod notification_id {
    use super::*;

    pub fn like(sender: &str, post: &DocPath) -> String {
        format!("like-{}-{}", sender, short_hash(&post.to_string()))
    }

    pub fn comment(comment_id: &str) -> String {
        format!("comment-{}", comment_id)
    }

    pub fn follow(sender: &str) -> String {
        format!("follow-{}", sender)
    }

    pub fn frenlet(frenlet_id: &str) -> String {
        format!("frenlet-{}", frenlet_id)
    }

    fn short_hash(input: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        hash[..16].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_ref_parse() {
        let post = PostRef::parse("/users/alice/posts/p1").unwrap();
        assert_eq!(post.owner, "alice");
        assert_eq!(post.post_id, "p1");
        assert!(PostRef::parse("users/alice/frenlets/p1").is_err());
    }

    #[test]
    fn test_frenlet_ref_parse() {
        let r = FrenletRef::parse("users/bob/frenlets/frenlets/incoming/f1").unwrap();
        assert_eq!(r.owner, "bob");
        assert_eq!(r.direction, FrenletBox::Incoming);
        assert!(FrenletRef::parse("users/bob/frenlets/frenlets/sideways/f1").is_err());
    }

    #[test]
    fn test_mirrors_point_at_both_users() {
        let (outgoing, incoming) = frenlet_mirrors("alice", "bob", "f1").unwrap();
        assert_eq!(outgoing.to_string(), "users/alice/frenlets/frenlets/outgoing/f1");
        assert_eq!(incoming.to_string(), "users/bob/frenlets/frenlets/incoming/f1");
    }

    #[test]
    fn test_like_notification_id_is_stable() {
        let post = post("alice", "p1").unwrap();
        let a = notification_id::like("bob", &post);
        let b = notification_id::like("bob", &post);
        assert_eq!(a, b);
        assert!(a.starts_with("like-bob-"));
        assert_eq!(a.len(), "like-bob-".len() + 16);
    }

    #[test]
    fn test_usernames_cannot_escape_their_segment() {
        assert!(user("../admin").is_err());
        assert!(user("al ice").is_err());
        assert!(user("a/b").is_err());
    }
}
