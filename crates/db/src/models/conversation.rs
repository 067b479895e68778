use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::path::{CollectionRef, DocumentRef};

/// Top-level chat thread. Unknown fields are preserved in the store and
/// ignored here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    /// Member uids. Entries of other types are kept and still count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Bson>>,
}

impl Conversation {
    pub const COLLECTION: &'static str = "conversations";
    pub const MEMBERS_FIELD: &'static str = "members";
    pub const ID_PARAM: &'static str = "conversationId";

    /// Reference to `conversations/{id}`.
    pub fn reference(id: &str) -> StoreResult<DocumentRef> {
        CollectionRef::root(Self::COLLECTION)?.doc(id)
    }

    pub fn members(&self) -> &[Bson] {
        self.members.as_deref().unwrap_or_default()
    }

    /// The string entries of the member list.
    pub fn member_ids(&self) -> Vec<String> {
        self.members()
            .iter()
            .filter_map(Bson::as_str)
            .map(str::to_string)
            .collect()
    }

    /// An absent or empty member list both count as "no members".
    pub fn has_no_members(&self) -> bool {
        self.members().is_empty()
    }
}
