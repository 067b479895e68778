use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, Bson, DateTime, Document};
use futures::TryStreamExt;
use mongodb::change_stream::event::{OperationType, ResumeToken};
use mongodb::{Collection, Database};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::change::{ChangeFeed, ChangeKind, DocumentChange};
use crate::error::{StoreError, StoreResult};
use crate::models::StoredDocument;
use crate::path::{CollectionRef, DocumentRef, child_segment};
use crate::store::{DocumentSnapshot, DocumentStore};

/// Document hierarchy flattened into a single MongoDB collection.
///
/// Each record is keyed by its full path and remembers both its collection
/// and its parent document, which is all sub-collection enumeration needs.
pub struct MongoStore {
    documents: Collection<StoredDocument>,
    feed: ChangeFeed,
}

impl MongoStore {
    pub fn new(db: &Database, feed_capacity: usize) -> Self {
        Self {
            documents: db.collection(StoredDocument::COLLECTION),
            feed: ChangeFeed::new(feed_capacity),
        }
    }

    fn raw(&self) -> Collection<Document> {
        self.documents.clone_with_type()
    }

    /// Distinct first segments below `prefix` (ending in `/`) among the
    /// ancestor paths of stored documents.
    async fn nested_segments(&self, prefix: &str) -> StoreResult<BTreeSet<String>> {
        // Every path starting with `a/b/` sorts between `a/b/` and `a/b0`.
        let upper = format!("{}0", prefix.trim_end_matches('/'));
        let ancestors = self
            .documents
            .distinct(
                "ancestors",
                doc! { "ancestors": { "$elemMatch": { "$gt": prefix, "$lt": upper } } },
            )
            .await?;

        Ok(ancestors
            .iter()
            .filter_map(Bson::as_str)
            .filter_map(|path| child_segment(path, prefix))
            .map(str::to_string)
            .collect())
    }

    /// Feeds the change feed from a MongoDB change stream, so writes made by
    /// other clients reach subscribers too. Requires a replica set.
    ///
    /// The stream is reopened after any failure, resuming after the last
    /// event seen, until the returned task is aborted.
    pub fn spawn_change_stream(&self) -> JoinHandle<()> {
        let raw = self.raw();
        let feed = self.feed.clone();

        tokio::spawn(async move {
            let mut resume_token: Option<ResumeToken> = None;
            let mut backoff = RETRY_MIN;

            loop {
                match watch(&raw, &feed, &mut resume_token, &mut backoff).await {
                    Ok(()) => warn!("Change stream closed, reopening"),
                    Err(e) => error!(%e, retry_in = ?backoff, "Change stream failed"),
                }

                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(RETRY_MAX);
            }
        })
    }
}

const RETRY_MIN: Duration = Duration::from_millis(500);
const RETRY_MAX: Duration = Duration::from_secs(30);

/// Publishes change events until the stream ends or fails, keeping
/// `resume_token` at the last event seen. Any delivered event resets
/// `backoff`.
async fn watch(
    raw: &Collection<Document>,
    feed: &ChangeFeed,
    resume_token: &mut Option<ResumeToken>,
    backoff: &mut Duration,
) -> mongodb::error::Result<()> {
    let mut action = raw.watch();
    if let Some(token) = resume_token.clone() {
        action = action.resume_after(token);
    }
    let mut stream = action.await?;
    info!(resumed = resume_token.is_some(), "Watching document changes");

    while let Some(event) = stream.try_next().await? {
        *resume_token = stream.resume_token();
        *backoff = RETRY_MIN;

        let kind = match event.operation_type {
            OperationType::Insert => ChangeKind::Created,
            OperationType::Update | OperationType::Replace => ChangeKind::Updated,
            OperationType::Delete => ChangeKind::Deleted,
            other => {
                debug!(?other, "Ignoring change stream event");
                continue;
            }
        };

        let Some(path) = event
            .document_key
            .as_ref()
            .and_then(|key| key.get_str("_id").ok())
        else {
            continue;
        };

        match DocumentRef::parse(path) {
            Ok(document) => feed.publish(document, kind),
            Err(e) => warn!(%e, "Skipping change for malformed path"),
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn get(&self, doc: &DocumentRef) -> StoreResult<Option<DocumentSnapshot>> {
        let stored = self.documents.find_one(doc! { "_id": doc.path() }).await?;
        Ok(stored.map(|stored| DocumentSnapshot {
            reference: doc.clone(),
            fields: stored.fields,
        }))
    }

    async fn set(&self, doc: &DocumentRef, fields: Document) -> StoreResult<()> {
        let collection = doc.parent();
        let stored = StoredDocument {
            path: doc.path().to_string(),
            collection: collection.path().to_string(),
            parent: collection.parent().map(|p| p.path().to_string()),
            ancestors: doc
                .ancestors()
                .iter()
                .map(|a| a.path().to_string())
                .collect(),
            fields,
            updated_at: DateTime::now(),
        };

        self.documents
            .replace_one(doc! { "_id": doc.path() }, &stored)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn array_remove(&self, doc: &DocumentRef, field: &str, value: Bson) -> StoreResult<()> {
        let target = format!("fields.{field}");
        let result = self
            .documents
            .update_one(
                doc! { "_id": doc.path(), target.as_str(): { "$type": "array" } },
                doc! {
                    "$pull": { target.as_str(): value },
                    "$set": { "updated_at": DateTime::now() },
                },
            )
            .await?;

        if result.matched_count == 0 {
            // Either the document is gone or the field is not an array.
            let exists = self
                .documents
                .count_documents(doc! { "_id": doc.path() })
                .await?;
            if exists == 0 {
                return Err(StoreError::NotFound(doc.path().to_string()));
            }
        }
        Ok(())
    }

    async fn list_collections(&self, doc: &DocumentRef) -> StoreResult<Vec<CollectionRef>> {
        let mut paths: BTreeSet<String> = self
            .documents
            .distinct("collection", doc! { "parent": doc.path() })
            .await?
            .iter()
            .filter_map(Bson::as_str)
            .map(str::to_string)
            .collect();

        // Collections reachable only through documents that no longer exist.
        let prefix = format!("{}/", doc.path());
        for id in self.nested_segments(&prefix).await? {
            paths.insert(format!("{prefix}{id}"));
        }

        paths.iter().map(|path| CollectionRef::parse(path)).collect()
    }

    async fn list_documents(
        &self,
        collection: &CollectionRef,
        limit: usize,
    ) -> StoreResult<Vec<DocumentRef>> {
        let existing: Vec<Document> = self
            .raw()
            .find(doc! { "collection": collection.path() })
            .projection(doc! { "_id": 1 })
            .sort(doc! { "_id": 1 })
            .limit(limit as i64)
            .await?
            .try_collect()
            .await?;

        let mut paths = BTreeSet::new();
        for id in &existing {
            let path = id
                .get_str("_id")
                .map_err(|_| StoreError::InvalidPath(id.to_string()))?;
            paths.insert(path.to_string());
        }

        let prefix = format!("{}/", collection.path());
        for id in self.nested_segments(&prefix).await? {
            paths.insert(format!("{prefix}{id}"));
        }

        paths
            .iter()
            .take(limit)
            .map(|path| DocumentRef::parse(path))
            .collect()
    }

    async fn delete(&self, doc: &DocumentRef) -> StoreResult<()> {
        let result = self.documents.delete_one(doc! { "_id": doc.path() }).await?;
        debug!(path = %doc, deleted = result.deleted_count, "Document delete");
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<DocumentChange> {
        self.feed.subscribe()
    }
}
