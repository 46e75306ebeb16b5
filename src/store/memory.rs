use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{apply_updates, CollectionPath, DocPath, Document, DocumentStore, FieldUpdate, StoreError, Write, WriteBatch};

/// In-process document store used for development and tests.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<DocPath, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        Ok(self.docs.read().await.get(path).cloned())
    }

    async fn set(&self, path: &DocPath, doc: Document) -> Result<(), StoreError> {
        self.docs.write().await.insert(path.clone(), doc);
        Ok(())
    }

    async fn update(&self, path: &DocPath, updates: Vec<FieldUpdate>) -> Result<(), StoreError> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;

        // Apply to a copy so a type mismatch halfway through leaves the doc untouched
        let mut next = doc.clone();
        apply_updates(&mut next, &updates)?;
        *doc = next;
        Ok(())
    }

    async fn delete(&self, path: &DocPath) -> Result<bool, StoreError> {
        Ok(self.docs.write().await.remove(path).is_some())
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<(DocPath, Document)>, StoreError> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .filter(|(path, _)| collection.contains(path))
            .map(|(path, doc)| (path.clone(), doc.clone()))
            .collect())
    }

    async fn delete_collection(&self, collection: &CollectionPath) -> Result<usize, StoreError> {
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|path, _| !collection.contains(path));
        Ok(before - docs.len())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut docs = self.docs.write().await;

        // Stage every write against a private view first
        let mut staged: HashMap<DocPath, Option<Document>> = HashMap::new();
        for write in batch.into_writes() {
            match write {
                Write::Set(path, doc) => {
                    staged.insert(path, Some(doc));
                }
                Write::Delete(path) => {
                    staged.insert(path, None);
                }
                Write::Update(path, updates) => {
                    let current = match staged.get(&path) {
                        Some(entry) => entry.clone(),
                        None => docs.get(&path).cloned(),
                    };
                    let mut doc = current.ok_or_else(|| StoreError::NotFound(path.to_string()))?;
                    apply_updates(&mut doc, &updates)?;
                    staged.insert(path, Some(doc));
                }
            }
        }

        for (path, doc) in staged {
            match doc {
                Some(doc) => {
                    docs.insert(path, doc);
                }
                None => {
                    docs.remove(&path);
                }
            }
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
