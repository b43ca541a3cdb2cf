//! In-process overlay store
//!
//! Keeps records in insertion order behind an async `RwLock`. Identifiers
//! are generated the same way the MongoDB driver generates them, so clients
//! cannot tell the backends apart.

use async_trait::async_trait;
use indexmap::IndexMap;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;
use tracing::debug;

use super::store::OverlayStore;
use super::types::{Overlay, OverlayError, OverlayPatch};

/// Overlay store held entirely in memory
#[derive(Default)]
pub struct MemoryOverlayStore {
    records: RwLock<IndexMap<ObjectId, Overlay>>,
}

impl MemoryOverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl OverlayStore for MemoryOverlayStore {
    async fn create(&self, fields: OverlayPatch) -> Result<Overlay, OverlayError> {
        let overlay = Overlay::new(ObjectId::new(), fields);
        self.records
            .write()
            .await
            .insert(overlay.id, overlay.clone());
        debug!("Stored overlay {} in memory", overlay.id);
        Ok(overlay)
    }

    async fn list(&self) -> Result<Vec<Overlay>, OverlayError> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn update(&self, id: ObjectId, patch: OverlayPatch) -> Result<Overlay, OverlayError> {
        let mut records = self.records.write().await;
        let overlay = records
            .get_mut(&id)
            .ok_or_else(|| OverlayError::NotFound(id.to_hex()))?;
        overlay.apply(&patch);
        Ok(overlay.clone())
    }

    async fn delete(&self, id: ObjectId) -> Result<(), OverlayError> {
        // shift_remove keeps the remaining records in insertion order
        match self.records.write().await.shift_remove(&id) {
            Some(_) => Ok(()),
            None => Err(OverlayError::NotFound(id.to_hex())),
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
