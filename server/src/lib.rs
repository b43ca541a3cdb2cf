//! OverlayHub Server Library
//!
//! This module exports the server components for use in integration tests
//! and external tooling.

pub mod config;
pub mod media;
pub mod overlay;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use media::{MediaAppState, UploadDir, media_routes};
pub use overlay::{MemoryOverlayStore, MongoOverlayStore, Overlay, OverlayError, OverlayStore};
pub use server::{AppState, build_app};
