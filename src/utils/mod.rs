//! Utils Module
pub mod config;
pub mod telemetry;

pub use config::{AppConfig, ClientSettings};
pub use telemetry::init_tracing;
