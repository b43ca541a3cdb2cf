//! Overlay record module
//!
//! Create/list/update/delete over overlay records held in a document store.

mod memory;
mod mongo;
pub mod routes;
mod store;
pub mod types;

pub use memory::MemoryOverlayStore;
pub use mongo::MongoOverlayStore;
pub use routes::{OverlayAppState, overlay_routes};
pub use store::OverlayStore;
pub use types::{Geometry, Overlay, OverlayError, OverlayPatch};
