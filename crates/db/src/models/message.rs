use bson::DateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub author_id: String,
    pub content: String,
    pub created_at: DateTime,
}

impl Message {
    pub const COLLECTION: &'static str = "messages";
}
