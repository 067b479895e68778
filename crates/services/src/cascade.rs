//! Subtree deletion over the document hierarchy.
//!
//! Traversal runs on an explicit work stack instead of recursion. A
//! collection is drained one page at a time: each page is a fresh listing,
//! every document on it is fully deleted (descendants first) before the
//! next listing, and draining stops at the first page shorter than the
//! page size. Missing documents are expanded like any other, so nothing
//! stored under a deleted intermediate document is left behind.

use std::sync::Arc;

use convo_db::{CollectionRef, DocumentRef, DocumentStore, StoreResult};
use tracing::{debug, info};

/// What a subtree deletion did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Delete calls issued, the root included.
    pub documents_deleted: u64,
    /// Collection listings fetched, empty ones included.
    pub pages_fetched: u64,
    /// Work items processed.
    pub steps: u64,
}

enum Step {
    /// List the sub-collections of a document, then delete it.
    Expand(DocumentRef),
    /// Fetch the next page of a collection.
    Drain(CollectionRef),
    Delete(DocumentRef),
}

#[derive(Clone)]
pub struct SubtreeDeleter {
    store: Arc<dyn DocumentStore>,
    page_size: usize,
}

impl SubtreeDeleter {
    pub fn new(store: Arc<dyn DocumentStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Deletes `root` and every document nested beneath it.
    ///
    /// Safe to repeat: an absent root with no sub-collections is a no-op.
    pub async fn delete_subtree(&self, root: &DocumentRef) -> StoreResult<DeletionReport> {
        let mut report = DeletionReport::default();
        let mut stack = vec![Step::Expand(root.clone())];

        while let Some(step) = stack.pop() {
            report.steps += 1;
            match step {
                Step::Expand(doc) => {
                    // Pushed first so it runs after every sub-collection drains.
                    stack.push(Step::Delete(doc.clone()));
                    let collections = self.store.list_collections(&doc).await?;
                    for collection in collections.into_iter().rev() {
                        stack.push(Step::Drain(collection));
                    }
                }
                Step::Drain(collection) => {
                    let page = self
                        .store
                        .list_documents(&collection, self.page_size)
                        .await?;
                    report.pages_fetched += 1;
                    debug!(collection = %collection, count = page.len(), "Fetched page");

                    if page.len() >= self.page_size {
                        // Runs after this page is gone, against a fresh listing.
                        stack.push(Step::Drain(collection));
                    }
                    for doc in page.into_iter().rev() {
                        stack.push(Step::Expand(doc));
                    }
                }
                Step::Delete(doc) => {
                    self.store.delete(&doc).await?;
                    report.documents_deleted += 1;
                }
            }
        }

        info!(
            path = %root,
            deleted = report.documents_deleted,
            pages = report.pages_fetched,
            "Subtree deleted"
        );
        Ok(report)
    }
}
