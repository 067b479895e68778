pub mod change;
pub mod error;
pub mod indexes;
pub mod memory;
pub mod models;
pub mod mongo;
pub mod path;
pub mod store;

use convo_config::DatabaseSettings;
use mongodb::{Client, Database};
use tracing::info;

pub use change::{ChangeFeed, ChangeKind, DocumentChange};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use path::{CollectionRef, DocumentRef};
pub use store::{DocumentSnapshot, DocumentStore};

/// Connects to MongoDB and returns the configured database handle.
pub async fn connect(settings: &DatabaseSettings) -> Result<Database, mongodb::error::Error> {
    let client = Client::with_uri_str(&settings.url).await?;
    let db = client.database(&settings.name);
    info!(database = %settings.name, "Connected to MongoDB");
    Ok(db)
}
