//! Field Analytics
//!
//! Data-access layer for a cricket field-setting dashboard:
//! - Length-weighted merging of per-length statistics
//! - Resilient remote fetches with bounded retries and backoff
//! - TTL response cache keyed by request signature
//! - Per-mode snapshot datasets loaded once and kept resident

pub mod error;
pub mod memory;
pub mod remote;
pub mod services;
pub mod stats;
pub mod utils;

// Re-exports for convenience
pub use error::{StatsError, StatsResult};
pub use memory::{ModeDataStore, ResponseCache, SnapshotLoader};
pub use remote::{FetchError, ResilientClient, RetryPolicy};
pub use services::{Dashboard, DashboardReport, RemoteSource, SnapshotSource, StatsSource};
pub use stats::{merge, BowlKind, DeliveryLength, LengthSet, MetricContext, Mode, WeightTable};
