//! Mode Dataset
//!
//! Every table for one competition mode, as loaded from its snapshots.
//! Read-only once built; shared as `Arc<ModeDataset>`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::stats::{
    AbilityScores, BallCountTable, BowlKind, DeliveryLength, FieldSetup, IntentCounts,
    IntentReading, LengthWeightResolver, MetricContext, Mode, PerLength, SectorTable, ShotRecord,
    SimilarityRow, WagonShot, WeightTable, ZoneRecord,
};

pub type ByLength<T> = BTreeMap<DeliveryLength, T>;

/// batter → bowl kind → T
pub type PerBatter<T> = BTreeMap<String, BTreeMap<BowlKind, T>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeDataset {
    pub mode: Option<Mode>,
    pub ball_counts: BallCountTable,
    /// One setup per single length and outfielder count.
    pub field_setups: PerBatter<ByLength<BTreeMap<u8, FieldSetup>>>,
    pub sector_ev: PerBatter<ByLength<SectorTable>>,
    pub zone_strength: PerBatter<ByLength<ZoneRecord>>,
    pub shot_profile: PerBatter<ByLength<ShotRecord>>,
    pub ability_360: PerBatter<ByLength<AbilityScores>>,
    /// bowl kind → length → batter → similarity row
    pub similarity: BTreeMap<BowlKind, ByLength<BTreeMap<String, SimilarityRow>>>,
    /// batter → bowl kind → metric name → length → reading
    pub intent_reliability: PerBatter<BTreeMap<String, ByLength<IntentReading>>>,
    pub intent_impact: PerBatter<IntentCounts>,
    pub wagon_wheel: PerBatter<ByLength<Vec<WagonShot>>>,
}

impl ModeDataset {
    pub fn empty(mode: Mode) -> Self {
        Self {
            mode: Some(mode),
            ..Self::default()
        }
    }

    pub fn weights(&self, batter: &str, bowl_kind: &BowlKind) -> WeightTable {
        LengthWeightResolver::new(&self.ball_counts).weights(batter, bowl_kind)
    }

    /// Every batter with ball counts, sorted.
    pub fn batters(&self) -> Vec<String> {
        self.ball_counts.keys().cloned().collect()
    }

    pub fn bowl_kinds(&self, batter: &str) -> Vec<BowlKind> {
        self.ball_counts
            .get(batter)
            .map(|kinds| kinds.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Lengths with a ball-count entry for the pair, canonical order.
    pub fn lengths(&self, batter: &str, bowl_kind: &BowlKind) -> Vec<DeliveryLength> {
        self.ball_counts
            .get(batter)
            .and_then(|kinds| kinds.get(bowl_kind))
            .map(|counts| counts.keys().copied().collect())
            .unwrap_or_default()
    }

    /// The context's selected lengths mapped to their record in `table`.
    pub fn select<T: Clone>(
        &self,
        table: &PerBatter<ByLength<T>>,
        ctx: &MetricContext,
    ) -> PerLength<T> {
        let by_length = table
            .get(&ctx.batter)
            .and_then(|kinds| kinds.get(&ctx.bowl_kind));
        ctx.lengths
            .iter()
            .map(|len| (len, by_length.and_then(|m| m.get(&len)).cloned()))
            .collect()
    }

    pub fn similarity_rows(&self, ctx: &MetricContext) -> PerLength<SimilarityRow> {
        let by_length = self.similarity.get(&ctx.bowl_kind);
        ctx.lengths
            .iter()
            .map(|len| {
                let row = by_length
                    .and_then(|m| m.get(&len))
                    .and_then(|rows| rows.get(&ctx.batter))
                    .cloned();
                (len, row)
            })
            .collect()
    }
}
