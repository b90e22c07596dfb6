//! Offline Snapshots
//!
//! One zstd-compressed bincode file per (mode, metric):
//! `<root>/<mode>/<metric>.bin`. A metric file that is absent loads as an
//! empty table; an absent mode directory means the mode is unknown.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use super::dataset::ModeDataset;
use super::store::DatasetLoader;
use crate::error::{StatsError, StatsResult};
use crate::stats::Mode;

const ZSTD_LEVEL: i32 = 3;

/// File stems, one per metric family.
pub mod files {
    pub const BALL_COUNTS: &str = "ball_counts";
    pub const FIELD_SETUPS: &str = "field_setups";
    pub const SECTOR_EV: &str = "sector_ev";
    pub const ZONE_STRENGTH: &str = "zone_strength";
    pub const SHOT_PROFILE: &str = "shot_profile";
    pub const ABILITY_360: &str = "ability_360";
    pub const SIMILARITY: &str = "similarity";
    pub const INTENT_RELIABILITY: &str = "intent_reliability";
    pub const INTENT_IMPACT: &str = "intent_impact";
    pub const WAGON_WHEEL: &str = "wagon_wheel";
}

#[derive(Debug, Clone)]
pub struct SnapshotLoader {
    root: PathBuf,
}

impl SnapshotLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read every metric file of `mode`. Blocking.
    pub fn load_blocking(&self, mode: &Mode) -> StatsResult<ModeDataset> {
        let dir = mode_dir(&self.root, mode)?;
        if !dir.is_dir() {
            return Err(StatsError::UnknownMode(mode.to_string()));
        }

        let dataset = ModeDataset {
            mode: Some(mode.clone()),
            ball_counts: read_table(&dir, files::BALL_COUNTS)?,
            field_setups: read_table(&dir, files::FIELD_SETUPS)?,
            sector_ev: read_table(&dir, files::SECTOR_EV)?,
            zone_strength: read_table(&dir, files::ZONE_STRENGTH)?,
            shot_profile: read_table(&dir, files::SHOT_PROFILE)?,
            ability_360: read_table(&dir, files::ABILITY_360)?,
            similarity: read_table(&dir, files::SIMILARITY)?,
            intent_reliability: read_table(&dir, files::INTENT_RELIABILITY)?,
            intent_impact: read_table(&dir, files::INTENT_IMPACT)?,
            wagon_wheel: read_table(&dir, files::WAGON_WHEEL)?,
        };
        info!(
            "Loaded snapshot for mode {} ({} batters) from {:?}",
            mode,
            dataset.ball_counts.len(),
            dir
        );
        Ok(dataset)
    }
}

#[async_trait]
impl DatasetLoader for SnapshotLoader {
    async fn load(&self, mode: &Mode) -> StatsResult<ModeDataset> {
        let loader = self.clone();
        let mode = mode.clone();
        tokio::task::spawn_blocking(move || loader.load_blocking(&mode))
            .await
            .map_err(|e| StatsError::snapshot(self.root(), e))?
    }
}

/// Write `dataset` in the layout [`SnapshotLoader`] reads.
pub fn write_snapshot(root: &Path, dataset: &ModeDataset) -> StatsResult<()> {
    let mode = dataset
        .mode
        .as_ref()
        .ok_or_else(|| StatsError::InvalidContext("dataset has no mode".into()))?;
    let dir = mode_dir(root, mode)?;
    fs::create_dir_all(&dir).map_err(|e| StatsError::snapshot(&dir, e))?;

    write_table(&dir, files::BALL_COUNTS, &dataset.ball_counts)?;
    write_table(&dir, files::FIELD_SETUPS, &dataset.field_setups)?;
    write_table(&dir, files::SECTOR_EV, &dataset.sector_ev)?;
    write_table(&dir, files::ZONE_STRENGTH, &dataset.zone_strength)?;
    write_table(&dir, files::SHOT_PROFILE, &dataset.shot_profile)?;
    write_table(&dir, files::ABILITY_360, &dataset.ability_360)?;
    write_table(&dir, files::SIMILARITY, &dataset.similarity)?;
    write_table(&dir, files::INTENT_RELIABILITY, &dataset.intent_reliability)?;
    write_table(&dir, files::INTENT_IMPACT, &dataset.intent_impact)?;
    write_table(&dir, files::WAGON_WHEEL, &dataset.wagon_wheel)?;
    Ok(())
}

fn mode_dir(root: &Path, mode: &Mode) -> StatsResult<PathBuf> {
    let name = mode.as_str();
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(StatsError::InvalidContext(format!(
            "mode {name:?} is not a valid directory name"
        )));
    }
    Ok(root.join(name))
}

fn table_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.bin"))
}

fn read_table<T: DeserializeOwned + Default>(dir: &Path, stem: &str) -> StatsResult<T> {
    let path = table_path(dir, stem);
    if !path.exists() {
        debug!("No snapshot at {:?}, using an empty table", path);
        return Ok(T::default());
    }
    let file = File::open(&path).map_err(|e| StatsError::snapshot(&path, e))?;
    let decoder = zstd::stream::read::Decoder::new(BufReader::new(file))
        .map_err(|e| StatsError::snapshot(&path, e))?;
    bincode::deserialize_from(decoder).map_err(|e| StatsError::snapshot(&path, e))
}

fn write_table<T: Serialize>(dir: &Path, stem: &str, table: &T) -> StatsResult<()> {
    let path = table_path(dir, stem);
    let file = File::create(&path).map_err(|e| StatsError::snapshot(&path, e))?;
    let writer = BufWriter::new(file);
    let mut encoder = zstd::stream::write::Encoder::new(writer, ZSTD_LEVEL)
        .map_err(|e| StatsError::snapshot(&path, e))?;
    bincode::serialize_into(&mut encoder, table).map_err(|e| StatsError::snapshot(&path, e))?;
    encoder.finish().map_err(|e| StatsError::snapshot(&path, e))?;
    Ok(())
}
