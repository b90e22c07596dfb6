//! Memory Module
//!
//! In-process state that outlives a single request: the response cache for
//! remote calls and the per-mode dataset store for offline snapshots.

pub mod cache;
pub mod dataset;
pub mod snapshot;
pub mod store;

pub use cache::{CacheConfig, Clock, ManualClock, ResponseCache, Signature, SystemClock};
pub use dataset::{ByLength, ModeDataset, PerBatter};
pub use snapshot::{write_snapshot, SnapshotLoader};
pub use store::{DatasetLoader, ModeDataStore};
