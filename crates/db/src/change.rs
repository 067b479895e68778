use tokio::sync::broadcast;
use tracing::trace;

use crate::path::DocumentRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// A single write observed on a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    pub document: DocumentRef,
    pub kind: ChangeKind,
}

/// Fan-out of document writes to any number of subscribers.
///
/// Publishing never blocks; slow subscribers observe `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<DocumentChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, document: DocumentRef, kind: ChangeKind) {
        trace!(path = %document, ?kind, "Document change");
        // No subscribers is fine: nobody is listening for triggers.
        let _ = self.tx.send(DocumentChange { document, kind });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DocumentChange> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(1024)
    }
}
