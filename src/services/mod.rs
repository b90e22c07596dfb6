//! Services Module
//!
//! The request-facing layer: data sources and the dashboard handler built
//! on top of them.

pub mod dashboard;
pub mod source;

pub use dashboard::{Dashboard, DashboardReport, DashboardSettings, Merged, Section};
pub use source::{RemoteSource, SnapshotSource, StatsSource};
