use std::sync::Arc;

use bson::Bson;
use convo_db::models::Conversation;
use convo_db::{DocumentRef, DocumentStore, StoreError};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::auth::AuthContext;
use crate::cascade::{DeletionReport, SubtreeDeleter};
use crate::error::CallableError;

const REQUIRED: &str = "conversationId and authenticated user are required.";
const NOT_FOUND: &str = "Conversation not found.";

/// A callable invocation: the payload plus the caller identity supplied by
/// the invocation context.
#[derive(Debug, Clone)]
pub struct CallableRequest<T> {
    pub data: T,
    pub auth: Option<AuthContext>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoveMemberRequest {
    #[serde(rename = "conversationId", default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveMemberResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalOutcome {
    pub remaining_members: usize,
    pub cascade: Option<DeletionReport>,
}

enum RemovalError {
    NotFound,
    Store(StoreError),
}

impl From<StoreError> for RemovalError {
    fn from(err: StoreError) -> Self {
        RemovalError::Store(err)
    }
}

pub struct MembershipService {
    store: Arc<dyn DocumentStore>,
    deleter: SubtreeDeleter,
}

impl MembershipService {
    pub fn new(store: Arc<dyn DocumentStore>, deleter: SubtreeDeleter) -> Self {
        Self { store, deleter }
    }

    /// Removes the caller from a conversation, deleting the conversation and
    /// everything beneath it once nobody is left.
    ///
    /// The member removal is committed on its own; a failing cascade does not
    /// undo it.
    pub async fn remove_member(
        &self,
        request: CallableRequest<RemoveMemberRequest>,
    ) -> Result<RemoveMemberResponse, CallableError> {
        let conversation_id = request.data.conversation_id.filter(|id| !id.is_empty());
        let (Some(conversation_id), Some(auth)) = (conversation_id, request.auth) else {
            return Err(CallableError::invalid_argument(REQUIRED));
        };
        let conversation = Conversation::reference(&conversation_id)
            .map_err(|_| CallableError::invalid_argument(REQUIRED))?;

        match self.remove_and_sweep(&conversation, &auth.uid).await {
            Ok(outcome) => {
                info!(
                    %conversation_id,
                    uid = %auth.uid,
                    remaining = outcome.remaining_members,
                    deleted = outcome.cascade.is_some(),
                    "Member removed"
                );
                Ok(RemoveMemberResponse { success: true })
            }
            Err(RemovalError::NotFound) => Err(CallableError::not_found(NOT_FOUND)),
            Err(RemovalError::Store(e)) => {
                error!(%conversation_id, %e, "Error deleting conversation");
                Err(CallableError::internal(format!("An error occurred: {e}")))
            }
        }
    }

    async fn remove_and_sweep(
        &self,
        conversation: &DocumentRef,
        uid: &str,
    ) -> Result<RemovalOutcome, RemovalError> {
        if self.store.get(conversation).await?.is_none() {
            return Err(RemovalError::NotFound);
        }

        self.store
            .array_remove(conversation, Conversation::MEMBERS_FIELD, Bson::from(uid))
            .await?;

        // Separate round trip: a concurrent removal may land in between, and
        // the write trigger covers whichever side loses.
        let Some(snapshot) = self.store.get(conversation).await? else {
            return Ok(RemovalOutcome {
                remaining_members: 0,
                cascade: None,
            });
        };
        let current: Conversation = snapshot.decode()?;

        let cascade = if current.has_no_members() {
            Some(self.deleter.delete_subtree(conversation).await?)
        } else {
            None
        };

        Ok(RemovalOutcome {
            remaining_members: current.members().len(),
            cascade,
        })
    }
}
