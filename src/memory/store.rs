//! Mode Data Store
//!
//! Keeps each competition mode's dataset resident after its first use.
//! Toggling between modes never reloads a mode that is already loaded.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};

use super::dataset::ModeDataset;
use crate::error::StatsResult;
use crate::stats::Mode;

/// Produces the full dataset for a mode.
#[async_trait]
pub trait DatasetLoader: Send + Sync {
    async fn load(&self, mode: &Mode) -> StatsResult<ModeDataset>;
}

type Slot = Arc<OnceCell<Arc<ModeDataset>>>;

pub struct ModeDataStore {
    loader: Arc<dyn DatasetLoader>,
    slots: RwLock<HashMap<Mode, Slot>>,
}

impl ModeDataStore {
    pub fn new(loader: Arc<dyn DatasetLoader>) -> Self {
        Self {
            loader,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Dataset for `mode`, loading it on first use. A failed load is not
    /// remembered; the next request tries again.
    pub async fn active(&self, mode: &Mode) -> StatsResult<Arc<ModeDataset>> {
        let slot = self.slot(mode).await;
        let dataset = slot
            .get_or_try_init(|| async {
                info!("Loading dataset for mode {}", mode);
                self.loader.load(mode).await.map(Arc::new)
            })
            .await?;
        Ok(dataset.clone())
    }

    /// Swap in a new dataset for `mode` wholesale.
    pub async fn replace(&self, mode: &Mode, dataset: ModeDataset) {
        let slot = Arc::new(OnceCell::new_with(Some(Arc::new(dataset))));
        self.slots.write().await.insert(mode.clone(), slot);
        info!("Replaced dataset for mode {}", mode);
    }

    /// Modes whose dataset is currently resident.
    pub async fn loaded_modes(&self) -> Vec<Mode> {
        let slots = self.slots.read().await;
        let mut modes: Vec<Mode> = slots
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(mode, _)| mode.clone())
            .collect();
        modes.sort();
        modes
    }

    async fn slot(&self, mode: &Mode) -> Slot {
        if let Some(slot) = self.slots.read().await.get(mode) {
            return slot.clone();
        }
        debug!("Creating dataset slot for mode {}", mode);
        self.slots
            .write()
            .await
            .entry(mode.clone())
            .or_default()
            .clone()
    }
}
