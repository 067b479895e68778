use bson::{DateTime, Document};
use serde::{Deserialize, Serialize};

/// One document of the hierarchy as persisted in MongoDB.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Full document path, e.g. `conversations/c1/messages/m1`.
    #[serde(rename = "_id")]
    pub path: String,
    /// Path of the collection holding the document.
    pub collection: String,
    /// Path of the document owning that collection, `None` at the top level.
    pub parent: Option<String>,
    /// Paths of every enclosing document, nearest first.
    #[serde(default)]
    pub ancestors: Vec<String>,
    #[serde(default)]
    pub fields: Document,
    pub updated_at: DateTime,
}

impl StoredDocument {
    pub const COLLECTION: &'static str = "documents";
}
