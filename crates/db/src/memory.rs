use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use bson::{Bson, Document};
use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::change::{ChangeFeed, ChangeKind, DocumentChange};
use crate::error::{StoreError, StoreResult};
use crate::path::{CollectionRef, DocumentRef, child_segment};
use crate::store::{DocumentSnapshot, DocumentStore};

/// In-process document store keyed by full document path.
///
/// Every mutation is published on the change feed, so triggers observe
/// writes made by any holder of the store.
pub struct MemoryStore {
    docs: RwLock<BTreeMap<String, Document>>,
    feed: ChangeFeed,
}

impl MemoryStore {
    pub fn new(feed_capacity: usize) -> Self {
        Self {
            docs: RwLock::new(BTreeMap::new()),
            feed: ChangeFeed::new(feed_capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    /// Paths of every stored document under `prefix`, in order.
    pub fn paths_under(&self, prefix: &str) -> Vec<String> {
        self.docs
            .read()
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Distinct first segments below `prefix` across every stored path.
    fn child_segments(&self, prefix: &str) -> BTreeSet<String> {
        self.docs
            .read()
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .filter_map(|(path, _)| child_segment(path, prefix))
            .map(str::to_string)
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, doc: &DocumentRef) -> StoreResult<Option<DocumentSnapshot>> {
        Ok(self
            .docs
            .read()
            .get(doc.path())
            .map(|fields| DocumentSnapshot {
                reference: doc.clone(),
                fields: fields.clone(),
            }))
    }

    async fn set(&self, doc: &DocumentRef, fields: Document) -> StoreResult<()> {
        let previous = self.docs.write().insert(doc.path().to_string(), fields);
        let kind = if previous.is_some() {
            ChangeKind::Updated
        } else {
            ChangeKind::Created
        };
        self.feed.publish(doc.clone(), kind);
        Ok(())
    }

    async fn array_remove(&self, doc: &DocumentRef, field: &str, value: Bson) -> StoreResult<()> {
        {
            let mut docs = self.docs.write();
            let fields = docs
                .get_mut(doc.path())
                .ok_or_else(|| StoreError::NotFound(doc.path().to_string()))?;
            if let Some(Bson::Array(items)) = fields.get_mut(field) {
                items.retain(|item| item != &value);
            }
        }
        self.feed.publish(doc.clone(), ChangeKind::Updated);
        Ok(())
    }

    async fn list_collections(&self, doc: &DocumentRef) -> StoreResult<Vec<CollectionRef>> {
        let prefix = format!("{}/", doc.path());
        let ids = self.child_segments(&prefix);
        ids.iter().map(|id| doc.collection(id)).collect()
    }

    async fn list_documents(
        &self,
        collection: &CollectionRef,
        limit: usize,
    ) -> StoreResult<Vec<DocumentRef>> {
        let prefix = format!("{}/", collection.path());
        let ids = self.child_segments(&prefix);
        ids.iter().take(limit).map(|id| collection.doc(id)).collect()
    }

    async fn delete(&self, doc: &DocumentRef) -> StoreResult<()> {
        let removed = self.docs.write().remove(doc.path());
        if removed.is_some() {
            self.feed.publish(doc.clone(), ChangeKind::Deleted);
        }
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<DocumentChange> {
        self.feed.subscribe()
    }
}
