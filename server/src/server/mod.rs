//! Router assembly and server-level endpoints

mod app;
mod health;
mod prometheus;

pub use app::{AppState, build_app};
pub use health::{HealthResponse, health};
pub use prometheus::{install_prometheus_recorder, prometheus_metrics};
