//! OverlayStore trait definition

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use super::types::{Overlay, OverlayError, OverlayPatch};

/// Trait for overlay record stores (MongoDB or in-process)
///
/// Every operation is a single store round-trip. Atomicity is per record;
/// there are no cross-record guarantees.
#[async_trait]
pub trait OverlayStore: Send + Sync {
    /// Insert a new record and return it with its store-assigned id
    async fn create(&self, fields: OverlayPatch) -> Result<Overlay, OverlayError>;

    /// All records in the store's natural iteration order
    async fn list(&self) -> Result<Vec<Overlay>, OverlayError>;

    /// Merge `patch` into the record with `id` and return the updated record.
    ///
    /// Returns `OverlayError::NotFound` if no record matches.
    async fn update(&self, id: ObjectId, patch: OverlayPatch) -> Result<Overlay, OverlayError>;

    /// Remove the record with `id`. Returns `OverlayError::NotFound` if no
    /// record matches.
    async fn delete(&self, id: ObjectId) -> Result<(), OverlayError>;

    /// Check that the backing store is reachable
    async fn ping(&self) -> Result<(), OverlayError> {
        Ok(())
    }

    /// Short name of the backend, for logs and health output
    fn backend_name(&self) -> &'static str;
}
