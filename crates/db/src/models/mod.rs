pub mod conversation;
pub mod message;
pub mod stored_document;

pub use conversation::Conversation;
pub use message::Message;
pub use stored_document::StoredDocument;
