//! MongoDB-backed overlay store

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{self, Bson, Document, doc, oid::ObjectId};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

use crate::config::StoreConfig;

use super::store::OverlayStore;
use super::types::{ID_KEY, Overlay, OverlayError, OverlayPatch, coerce_integer};

/// Overlay store backed by a MongoDB collection
pub struct MongoOverlayStore {
    db: Database,
    collection: Collection<Document>,
}

impl MongoOverlayStore {
    /// Create a store from configuration.
    ///
    /// The driver connects lazily, so this succeeds even when the server is
    /// not reachable yet; use [`OverlayStore::ping`] to check.
    pub async fn connect(config: &StoreConfig) -> Result<Self, OverlayError> {
        let client = Client::with_uri_str(&config.mongo_uri)
            .await
            .map_err(storage_error)?;

        info!(
            "Using MongoDB overlay store: db={}, collection={}",
            config.db_name, config.collection
        );

        Ok(Self::from_client(&client, &config.db_name, &config.collection))
    }

    /// Create a store on an existing client
    pub fn from_client(client: &Client, db_name: &str, collection: &str) -> Self {
        let db = client.database(db_name);
        let collection = db.collection::<Document>(collection);
        Self { db, collection }
    }
}

fn storage_error(e: mongodb::error::Error) -> OverlayError {
    OverlayError::Storage(e.to_string())
}

/// Build the document stored for a patch (without `_id`)
fn patch_to_document(patch: &OverlayPatch) -> Result<Document, OverlayError> {
    let mut document = Document::new();

    for (key, value) in patch.geometry.fields() {
        document.insert(key, value);
    }
    for (key, value) in &patch.extra {
        let value = bson::to_bson(value).map_err(|e| OverlayError::InvalidField {
            field: key.clone(),
            reason: e.to_string(),
        })?;
        document.insert(key.clone(), value);
    }

    Ok(document)
}

/// Convert a stored document back into an overlay record
fn document_to_overlay(mut document: Document) -> Result<Overlay, OverlayError> {
    let id = match document.remove(ID_KEY) {
        Some(Bson::ObjectId(id)) => id,
        other => {
            return Err(OverlayError::Storage(format!(
                "overlay document has a non-ObjectId _id: {:?}",
                other
            )));
        }
    };

    let mut overlay = Overlay::new(id, OverlayPatch::default());
    for (key, value) in document {
        let value = value.into_relaxed_extjson();
        match overlay.geometry.slot_mut(&key) {
            // Documents written by other tools may hold non-numeric geometry;
            // keep those as plain attributes instead of failing the read.
            Some(slot) => match coerce_integer(&key, &value) {
                Ok(v) => *slot = Some(v),
                Err(_) => {
                    overlay.extra.insert(key, value);
                }
            },
            None => {
                overlay.extra.insert(key, value);
            }
        }
    }

    Ok(overlay)
}

#[async_trait]
impl OverlayStore for MongoOverlayStore {
    async fn create(&self, fields: OverlayPatch) -> Result<Overlay, OverlayError> {
        let document = patch_to_document(&fields)?;
        let result = self
            .collection
            .insert_one(document, None)
            .await
            .map_err(storage_error)?;

        let id = result.inserted_id.as_object_id().ok_or_else(|| {
            OverlayError::Storage(format!(
                "store returned a non-ObjectId id: {}",
                result.inserted_id
            ))
        })?;

        debug!("Inserted overlay {}", id);
        Ok(Overlay::new(id, fields))
    }

    async fn list(&self) -> Result<Vec<Overlay>, OverlayError> {
        let cursor = self
            .collection
            .find(None, None)
            .await
            .map_err(storage_error)?;
        let documents: Vec<Document> = cursor.try_collect().await.map_err(storage_error)?;

        documents.into_iter().map(document_to_overlay).collect()
    }

    async fn update(&self, id: ObjectId, patch: OverlayPatch) -> Result<Overlay, OverlayError> {
        let filter = doc! { "_id": id };

        // `$set` with no fields is rejected by the server, so an empty patch
        // is just a read.
        let document = if patch.is_empty() {
            self.collection
                .find_one(filter, None)
                .await
                .map_err(storage_error)?
        } else {
            let options = FindOneAndUpdateOptions::builder()
                .return_document(ReturnDocument::After)
                .build();
            let update = doc! { "$set": patch_to_document(&patch)? };
            self.collection
                .find_one_and_update(filter, update, options)
                .await
                .map_err(storage_error)?
        };

        match document {
            Some(document) => document_to_overlay(document),
            None => Err(OverlayError::NotFound(id.to_hex())),
        }
    }

    async fn delete(&self, id: ObjectId) -> Result<(), OverlayError> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(storage_error)?;

        if result.deleted_count == 0 {
            return Err(OverlayError::NotFound(id.to_hex()));
        }
        debug!("Deleted overlay {}", id);
        Ok(())
    }

    async fn ping(&self) -> Result<(), OverlayError> {
        self.db
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map(|_| ())
            .map_err(storage_error)
    }

    fn backend_name(&self) -> &'static str {
        "mongo"
    }
}
