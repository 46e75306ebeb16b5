use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Path is empty")]
    Empty,

    #[error("Invalid path segment '{segment}' in {path}")]
    InvalidSegment { path: String, segment: String },

    #[error("{0} does not point to a document")]
    NotADocument(String),

    #[error("{0} does not point to a collection")]
    NotACollection(String),

    #[error("Unexpected path layout: {0}")]
    UnexpectedLayout(String),
}

fn split_segments(raw: &str) -> Result<Vec<String>, PathError> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(PathError::Empty);
    }

    trimmed
        .split('/')
        .map(|segment| {
            if is_valid_segment(segment) {
                Ok(segment.to_string())
            } else {
                Err(PathError::InvalidSegment {
                    path: raw.to_string(),
                    segment: segment.to_string(),
                })
            }
        })
        .collect()
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment.len() <= 512
        && !segment.chars().any(|c| c.is_control() || c.is_whitespace())
}

/// Path to a single document, e.g. `users/alice/posts/123`.
/// Always an even number of segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocPath {
    segments: Vec<String>,
}

/// Path to a collection, e.g. `users/alice/posts`.
/// Always an odd number of segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl DocPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let segments = split_segments(raw)?;
        if segments.len() % 2 != 0 {
            return Err(PathError::NotADocument(raw.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment
    pub fn id(&self) -> &str {
        // Parsing guarantees at least two segments
        &self.segments[self.segments.len() - 1]
    }

    pub fn parent(&self) -> CollectionPath {
        CollectionPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    pub fn collection(&self, name: &str) -> Result<CollectionPath, PathError> {
        let mut segments = self.segments.clone();
        segments.extend(split_segments(name)?);
        if segments.len() % 2 == 0 {
            return Err(PathError::NotACollection(name.to_string()));
        }
        Ok(CollectionPath { segments })
    }

    /// Equivalent to `self.collection(collection)?.doc(id)`
    pub fn child(&self, collection: &str, id: &str) -> Result<DocPath, PathError> {
        self.collection(collection)?.doc(id)
    }
}

impl CollectionPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let segments = split_segments(raw)?;
        if segments.len() % 2 == 0 {
            return Err(PathError::NotACollection(raw.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn doc(&self, id: &str) -> Result<DocPath, PathError> {
        if !is_valid_segment(id) || id.contains('/') {
            return Err(PathError::InvalidSegment {
                path: self.to_string(),
                segment: id.to_string(),
            });
        }
        let mut segments = self.segments.clone();
        segments.push(id.to_string());
        Ok(DocPath { segments })
    }

    /// True when `doc` sits directly under this collection
    pub fn contains(&self, doc: &DocPath) -> bool {
        doc.segments.len() == self.segments.len() + 1 && doc.segments.starts_with(&self.segments)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document_path() {
        let path = DocPath::parse("/users/alice/posts/p1").unwrap();
        assert_eq!(path.id(), "p1");
        assert_eq!(path.parent().to_string(), "users/alice/posts");
        assert_eq!(path.to_string(), "users/alice/posts/p1");
    }

    #[test]
    fn test_rejects_collection_as_document() {
        assert_eq!(
            DocPath::parse("users/alice/posts"),
            Err(PathError::NotADocument("users/alice/posts".to_string()))
        );
    }

    #[test]
    fn test_rejects_traversal_and_empty_segments() {
        assert!(matches!(
            DocPath::parse("users/../posts/p1"),
            Err(PathError::InvalidSegment { .. })
        ));
        assert!(matches!(
            DocPath::parse("users//posts/p1"),
            Err(PathError::InvalidSegment { .. })
        ));
        assert_eq!(DocPath::parse("  "), Err(PathError::Empty));
    }

    #[test]
    fn test_child_and_contains() {
        let user = DocPath::parse("users/alice").unwrap();
        let post = user.child("posts", "p1").unwrap();
        let posts = user.collection("posts").unwrap();
        assert!(posts.contains(&post));
        assert!(!posts.contains(&post.child("likes", "bob").unwrap()));
        assert!(user.collection("frenlets/frenlets").is_err());
    }
}
