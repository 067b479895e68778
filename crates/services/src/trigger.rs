//! Write triggers on conversation documents.

use std::collections::HashMap;
use std::sync::Arc;

use convo_db::models::Conversation;
use convo_db::{ChangeKind, DocumentChange, DocumentRef, DocumentStore, StoreError};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cascade::{DeletionReport, SubtreeDeleter};

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Invalid document pattern: {0}")]
    InvalidPattern(String),
    #[error("Missing path parameter: {0}")]
    MissingParam(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A document path template such as `conversations/{conversationId}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, TriggerError> {
        let segments: Vec<Segment> = pattern
            .split('/')
            .map(|part| {
                if part.is_empty() {
                    return Err(TriggerError::InvalidPattern(pattern.to_string()));
                }
                match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                    Some("") => Err(TriggerError::InvalidPattern(pattern.to_string())),
                    Some(name) => Ok(Segment::Param(name.to_string())),
                    None => Ok(Segment::Literal(part.to_string())),
                }
            })
            .collect::<Result<_, _>>()?;

        if segments.len() % 2 != 0 {
            return Err(TriggerError::InvalidPattern(pattern.to_string()));
        }
        Ok(Self { segments })
    }

    /// Path parameters when `doc` matches this pattern exactly.
    pub fn matches(&self, doc: &DocumentRef) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = doc.segments().collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }
}

/// A write to a document matching a trigger's pattern.
#[derive(Debug, Clone)]
pub struct WriteEvent {
    pub document: DocumentRef,
    pub kind: ChangeKind,
    pub params: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The conversation exists and still has members, or is already gone.
    Skipped,
    Deleted(DeletionReport),
}

/// Deletes any written conversation that exists but has nobody left in it.
pub struct EmptyConversationTrigger {
    store: Arc<dyn DocumentStore>,
    deleter: SubtreeDeleter,
}

impl EmptyConversationTrigger {
    pub const DOCUMENT: &'static str = "conversations/{conversationId}";

    pub fn new(store: Arc<dyn DocumentStore>, deleter: SubtreeDeleter) -> Self {
        Self { store, deleter }
    }

    pub fn pattern() -> PathPattern {
        PathPattern {
            segments: vec![
                Segment::Literal(Conversation::COLLECTION.to_string()),
                Segment::Param(Conversation::ID_PARAM.to_string()),
            ],
        }
    }

    pub async fn handle(&self, event: &WriteEvent) -> Result<TriggerOutcome, TriggerError> {
        let conversation_id = event
            .params
            .get(Conversation::ID_PARAM)
            .ok_or_else(|| TriggerError::MissingParam(Conversation::ID_PARAM.to_string()))?;
        self.sweep(conversation_id).await
    }

    /// Re-reads `conversations/{conversation_id}` and deletes it with its
    /// subtree when its member list is empty or absent.
    pub async fn sweep(&self, conversation_id: &str) -> Result<TriggerOutcome, TriggerError> {
        let conversation = Conversation::reference(conversation_id)?;

        let Some(snapshot) = self.store.get(&conversation).await? else {
            debug!(%conversation_id, "Conversation gone, nothing to sweep");
            return Ok(TriggerOutcome::Skipped);
        };
        let current: Conversation = snapshot.decode()?;
        if !current.has_no_members() {
            return Ok(TriggerOutcome::Skipped);
        }

        let report = self.deleter.delete_subtree(&conversation).await?;
        info!(
            %conversation_id,
            deleted = report.documents_deleted,
            "Empty conversation deleted"
        );
        Ok(TriggerOutcome::Deleted(report))
    }
}

/// Routes store changes that match the trigger's pattern to the trigger, one
/// event at a time. Failures are logged and the loop moves on.
pub struct TriggerDispatcher {
    trigger: Arc<EmptyConversationTrigger>,
    pattern: PathPattern,
}

impl TriggerDispatcher {
    pub fn new(trigger: Arc<EmptyConversationTrigger>) -> Self {
        Self {
            trigger,
            pattern: EmptyConversationTrigger::pattern(),
        }
    }

    pub fn spawn(self, mut changes: broadcast::Receiver<DocumentChange>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(document = EmptyConversationTrigger::DOCUMENT, "Trigger dispatcher started");
            loop {
                match changes.recv().await {
                    Ok(change) => self.dispatch(change).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Trigger dispatcher lagged behind the change feed");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            info!("Trigger dispatcher stopped");
        })
    }

    async fn dispatch(&self, change: DocumentChange) {
        let Some(params) = self.pattern.matches(&change.document) else {
            return;
        };
        let event = WriteEvent {
            document: change.document,
            kind: change.kind,
            params,
        };

        if let Err(e) = self.trigger.handle(&event).await {
            error!(path = %event.document, kind = ?event.kind, %e, "Trigger failed");
        }
    }
}
