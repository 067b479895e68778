use async_trait::async_trait;
use bson::{Bson, Document};
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;

use crate::change::DocumentChange;
use crate::error::StoreResult;
use crate::path::{CollectionRef, DocumentRef};

/// The contents of a document as read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub reference: DocumentRef,
    pub fields: Document,
}

impl DocumentSnapshot {
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        Ok(bson::from_document(self.fields.clone())?)
    }
}

/// Hierarchical document store: documents live in collections, and any
/// document may own nested sub-collections.
///
/// A sub-collection can outlive its parent document; deleting a document
/// never removes its sub-collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads a document, `None` when it does not exist.
    async fn get(&self, doc: &DocumentRef) -> StoreResult<Option<DocumentSnapshot>>;

    /// Creates or fully replaces a document.
    async fn set(&self, doc: &DocumentRef, fields: Document) -> StoreResult<()>;

    /// Removes every occurrence of `value` from the array field `field`.
    ///
    /// A missing field or absent value is a no-op; a missing document is
    /// `StoreError::NotFound`.
    async fn array_remove(&self, doc: &DocumentRef, field: &str, value: Bson) -> StoreResult<()>;

    /// Collections directly beneath `doc` with at least one document stored
    /// somewhere below them. `doc` itself need not exist.
    async fn list_collections(&self, doc: &DocumentRef) -> StoreResult<Vec<CollectionRef>>;

    /// Up to `limit` documents of `collection`, ordered by id.
    ///
    /// Includes missing documents: ids with nothing stored at the id itself
    /// but with documents stored in their sub-collections.
    async fn list_documents(
        &self,
        collection: &CollectionRef,
        limit: usize,
    ) -> StoreResult<Vec<DocumentRef>>;

    /// Deletes a single document. Deleting an absent document succeeds.
    async fn delete(&self, doc: &DocumentRef) -> StoreResult<()>;

    /// Subscribes to writes made through or observed by this store.
    fn changes(&self) -> broadcast::Receiver<DocumentChange>;
}
