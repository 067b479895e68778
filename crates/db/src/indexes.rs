use mongodb::{Database, IndexModel};
use tracing::info;

use crate::models::StoredDocument;

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Documents: page through a collection in id order, find the
    // sub-collections of a document, and reach everything nested below a
    // document that no longer exists.
    create_indexes(
        db,
        StoredDocument::COLLECTION,
        vec![
            index(bson::doc! { "collection": 1, "_id": 1 }),
            index(bson::doc! { "parent": 1, "collection": 1 }),
            index(bson::doc! { "ancestors": 1 }),
        ],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    let coll = db.collection::<bson::Document>(collection);
    match coll.create_indexes(indexes.clone()).await {
        Ok(_) => {
            info!(collection, "Indexes created");
            Ok(())
        }
        Err(e) => {
            // IndexKeySpecsConflict (code 86): an index with the same name but
            // different options already exists. Drop and recreate.
            if let mongodb::error::ErrorKind::Command(ref cmd_err) = *e.kind {
                if cmd_err.code == 86 {
                    tracing::warn!(
                        collection,
                        "Index conflict detected, dropping conflicting indexes and retrying"
                    );
                    coll.drop_indexes().await?;
                    coll.create_indexes(indexes).await?;
                    info!(collection, "Indexes recreated after conflict resolution");
                    return Ok(());
                }
            }
            Err(e)
        }
    }
}
