//! Dashboard
//!
//! Request/response handler used by the presentation layer. Each call takes
//! an explicit [`MetricContext`], fetches per-length records from the
//! configured [`StatsSource`] and merges them by balls faced.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::source::StatsSource;
use crate::error::StatsResult;
use crate::stats::aggregate::selection_weight;
use crate::stats::{
    impact_curve, merge, paired_readings, rank_similar, reliable_readings, wagon_wheel,
    AbilityScores, BowlKind, DeliveryLength, FieldSetup, ImpactPoint, IntentPair, IntentReading,
    LengthSet, MetricContext, MetricRecord, Mode, PerLength, ProtectionStats, RunClass,
    SectorTable, ShotRecord, SimilarBatter, WagonShot, WeightTable, ZoneRecord, ZoneShares,
};

#[derive(Debug, Clone)]
pub struct DashboardSettings {
    /// Similar batters listed.
    pub top_n: usize,
    /// Minimum balls behind an intent reading.
    pub min_balls: u64,
    /// Minimum samples for a ball index on the impact curve.
    pub min_count: f64,
    /// Intent metric shown in the report.
    pub intent_metric: String,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            top_n: 5,
            min_balls: 10,
            min_count: 5.0,
            intent_metric: "intrel".to_string(),
        }
    }
}

/// A merged record plus what went into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Merged<T> {
    pub value: T,
    /// Balls faced over the selected lengths.
    pub balls: u64,
    /// Selected lengths that had both data and weight.
    pub lengths: LengthSet,
}

impl<T> Merged<T> {
    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}

/// One part of a report. A failed part never takes others down with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Section<T> {
    Ready(T),
    Empty,
    Failed(String),
}

impl<T> Section<T> {
    fn build(name: &str, result: StatsResult<T>, is_empty: impl FnOnce(&T) -> bool) -> Self {
        match result {
            Ok(value) if is_empty(&value) => Section::Empty,
            Ok(value) => Section::Ready(value),
            Err(e) => {
                warn!("Dashboard section {} failed: {}", name, e);
                Section::Failed(e.notice())
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Section::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Section::Ready(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub context: MetricContext,
    pub outfielders: Option<u8>,
    pub weights: Section<WeightTable>,
    pub field_setup: Section<FieldSetup>,
    pub protection: Section<Merged<ProtectionStats>>,
    pub sector_ev: Section<Merged<SectorTable>>,
    pub zone_strength: Section<Merged<ZoneRecord>>,
    pub zone_shares: Section<BTreeMap<RunClass, ZoneShares>>,
    pub ability_360: Section<Merged<AbilityScores>>,
    pub shot_profile: Section<Merged<ShotRecord>>,
    pub similar_batters: Section<Vec<SimilarBatter>>,
    pub intent_reliability: Section<BTreeMap<DeliveryLength, IntentReading>>,
    pub intent_impact: Section<Vec<ImpactPoint>>,
    pub wagon_wheel: Section<Vec<WagonShot>>,
}

pub struct Dashboard {
    source: Arc<dyn StatsSource>,
    settings: DashboardSettings,
}

impl Dashboard {
    pub fn new(source: Arc<dyn StatsSource>) -> Self {
        Self::with_settings(source, DashboardSettings::default())
    }

    pub fn with_settings(source: Arc<dyn StatsSource>, settings: DashboardSettings) -> Self {
        Self { source, settings }
    }

    // ──────────────────────────────────────────────────────────────────────
    // DRILL-DOWN
    // ──────────────────────────────────────────────────────────────────────

    pub async fn batters(&self, mode: &Mode) -> StatsResult<Vec<String>> {
        self.source.batters(mode).await
    }

    pub async fn bowl_kinds(&self, mode: &Mode, batter: &str) -> StatsResult<Vec<BowlKind>> {
        self.source.bowl_kinds(mode, batter).await
    }

    pub async fn lengths(
        &self,
        mode: &Mode,
        batter: &str,
        bowl_kind: &BowlKind,
    ) -> StatsResult<Vec<DeliveryLength>> {
        self.source.lengths(mode, batter, bowl_kind).await
    }

    pub async fn outfielder_options(&self, ctx: &MetricContext) -> StatsResult<Vec<u8>> {
        self.source.outfielder_options(ctx).await
    }

    /// Balls faced per selected length.
    pub async fn weights(&self, ctx: &MetricContext) -> StatsResult<WeightTable> {
        let weights = self.source.weights(&ctx.mode, &ctx.batter, &ctx.bowl_kind).await?;
        Ok(weights.restricted_to(&ctx.lengths))
    }

    // ──────────────────────────────────────────────────────────────────────
    // MERGED METRICS
    // ──────────────────────────────────────────────────────────────────────

    async fn merged<R: MetricRecord>(
        &self,
        ctx: &MetricContext,
        records: PerLength<R>,
    ) -> StatsResult<Merged<R>> {
        let weights = self.weights(ctx).await?;
        let lengths = records
            .iter()
            .filter(|(len, record)| record.is_some() && weights.weight(**len) > 0)
            .map(|(len, _)| *len)
            .collect();
        debug!(
            "Merging {} lengths for {} vs {}",
            records.len(),
            ctx.batter,
            ctx.bowl_kind
        );
        Ok(Merged {
            value: merge(&records, &weights),
            balls: selection_weight(&records, &weights),
            lengths,
        })
    }

    pub async fn field_setup(
        &self,
        ctx: &MetricContext,
        outfielders: u8,
    ) -> StatsResult<Option<FieldSetup>> {
        self.source.field_setup(ctx, outfielders).await
    }

    pub async fn protection_stats(
        &self,
        ctx: &MetricContext,
        outfielders: u8,
    ) -> StatsResult<Merged<ProtectionStats>> {
        let records = self.source.protection_stats(ctx, outfielders).await?;
        self.merged(ctx, records).await
    }

    pub async fn sector_ev(&self, ctx: &MetricContext) -> StatsResult<Merged<SectorTable>> {
        let records = self.source.sector_ev(ctx).await?;
        self.merged(ctx, records).await
    }

    pub async fn zone_strength(&self, ctx: &MetricContext) -> StatsResult<Merged<ZoneRecord>> {
        let records = self.source.zone_strength(ctx).await?;
        self.merged(ctx, records).await
    }

    /// Zone shares of every run class, from merged raw run counts.
    pub async fn zone_shares(
        &self,
        ctx: &MetricContext,
    ) -> StatsResult<BTreeMap<RunClass, ZoneShares>> {
        let zones = self.zone_strength(ctx).await?;
        if zones.is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(RunClass::ALL
            .into_iter()
            .map(|class| (class, zones.value.shares(class, "runs")))
            .collect())
    }

    pub async fn ability_360(&self, ctx: &MetricContext) -> StatsResult<Merged<AbilityScores>> {
        let records = self.source.ability_360(ctx).await?;
        self.merged(ctx, records).await
    }

    pub async fn shot_profile(&self, ctx: &MetricContext) -> StatsResult<Merged<ShotRecord>> {
        let records = self.source.shot_profile(ctx).await?;
        self.merged(ctx, records).await
    }

    pub async fn similar_batters(&self, ctx: &MetricContext) -> StatsResult<Vec<SimilarBatter>> {
        let records = self.source.similarity(ctx, self.settings.top_n).await?;
        let merged = self.merged(ctx, records).await?;
        if merged.is_empty() {
            return Ok(Vec::new());
        }
        Ok(rank_similar(&merged.value, &ctx.batter, self.settings.top_n))
    }

    // ──────────────────────────────────────────────────────────────────────
    // UNMERGED VIEWS
    // ──────────────────────────────────────────────────────────────────────

    pub async fn intent_reliability(
        &self,
        ctx: &MetricContext,
        metric: &str,
    ) -> StatsResult<BTreeMap<DeliveryLength, IntentReading>> {
        let readings = self.source.intent_reliability(ctx, metric).await?;
        Ok(reliable_readings(&readings, &ctx.lengths, self.settings.min_balls))
    }

    /// Two intent metrics per length, kept where both clear `min_balls`.
    pub async fn paired_intent(
        &self,
        ctx: &MetricContext,
        strike_rate_metric: &str,
        control_metric: &str,
    ) -> StatsResult<BTreeMap<DeliveryLength, IntentPair>> {
        let strike_rate = self.source.intent_reliability(ctx, strike_rate_metric).await?;
        let control = self.source.intent_reliability(ctx, control_metric).await?;
        Ok(paired_readings(&strike_rate, &control, &ctx.lengths, self.settings.min_balls))
    }

    pub async fn intent_impact(&self, ctx: &MetricContext) -> StatsResult<Vec<ImpactPoint>> {
        let counts = self.source.intent_counts(ctx).await?;
        Ok(impact_curve(&counts, self.settings.min_count))
    }

    pub async fn wagon_wheel(&self, ctx: &MetricContext) -> StatsResult<Vec<WagonShot>> {
        let weights = self.weights(ctx).await?;
        let shots = self.source.wagon_wheel(ctx).await?;
        Ok(wagon_wheel(shots, &weights))
    }

    // ──────────────────────────────────────────────────────────────────────
    // REPORT
    // ──────────────────────────────────────────────────────────────────────

    /// Every section for one context. Without an explicit outfielder count
    /// the smallest available one is used.
    pub async fn report(&self, ctx: &MetricContext, outfielders: Option<u8>) -> DashboardReport {
        let outfielders = match outfielders {
            Some(n) => Ok(Some(n)),
            None => self
                .outfielder_options(ctx)
                .await
                .map(|options| options.first().copied()),
        };

        let (outfielders, field_setup, protection) = match outfielders {
            Ok(Some(n)) => (
                Some(n),
                Section::build("field_setup", self.field_setup(ctx, n).await, Option::is_none)
                    .flatten_option(),
                Section::build("protection", self.protection_stats(ctx, n).await, Merged::is_empty),
            ),
            Ok(None) => (None, Section::Empty, Section::Empty),
            Err(e) => {
                warn!("Could not list outfielder options: {}", e);
                let notice = e.notice();
                (None, Section::Failed(notice.clone()), Section::Failed(notice))
            }
        };

        let intent_metric = self.settings.intent_metric.clone();

        DashboardReport {
            context: ctx.clone(),
            outfielders,
            weights: Section::build("weights", self.weights(ctx).await, |w| w.total() == 0),
            field_setup,
            protection,
            sector_ev: Section::build("sector_ev", self.sector_ev(ctx).await, Merged::is_empty),
            zone_strength: Section::build(
                "zone_strength",
                self.zone_strength(ctx).await,
                Merged::is_empty,
            ),
            zone_shares: Section::build(
                "zone_shares",
                self.zone_shares(ctx).await,
                BTreeMap::is_empty,
            ),
            ability_360: Section::build(
                "ability_360",
                self.ability_360(ctx).await,
                Merged::is_empty,
            ),
            shot_profile: Section::build(
                "shot_profile",
                self.shot_profile(ctx).await,
                Merged::is_empty,
            ),
            similar_batters: Section::build(
                "similar_batters",
                self.similar_batters(ctx).await,
                Vec::is_empty,
            ),
            intent_reliability: Section::build(
                "intent_reliability",
                self.intent_reliability(ctx, &intent_metric).await,
                BTreeMap::is_empty,
            ),
            intent_impact: Section::build(
                "intent_impact",
                self.intent_impact(ctx).await,
                Vec::is_empty,
            ),
            wagon_wheel: Section::build("wagon_wheel", self.wagon_wheel(ctx).await, Vec::is_empty),
        }
    }
}

impl<T> Section<Option<T>> {
    fn flatten_option(self) -> Section<T> {
        match self {
            Section::Ready(Some(value)) => Section::Ready(value),
            Section::Ready(None) | Section::Empty => Section::Empty,
            Section::Failed(notice) => Section::Failed(notice),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatsError;
    use crate::remote::{FetchError, TransientFailure};
    use serde_json::json;

    #[test]
    fn test_section_states() {
        let ready = Section::build("x", Ok(vec![1]), Vec::is_empty);
        assert_eq!(ready, Section::Ready(vec![1]));

        let empty = Section::build("x", Ok(Vec::<u8>::new()), Vec::is_empty);
        assert_eq!(empty, Section::Empty);

        let err = StatsError::Fetch(FetchError::Exhausted {
            endpoint: "/sector-ev".into(),
            attempts: 4,
            last: TransientFailure::Status(503),
        });
        let failed = Section::build("x", Err::<Vec<u8>, _>(err), Vec::is_empty);
        match failed {
            Section::Failed(notice) => assert!(notice.contains("unavailable")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_section_serialization() {
        assert_eq!(
            serde_json::to_value(Section::Ready(3)).unwrap(),
            json!({ "status": "ready", "data": 3 })
        );
        assert_eq!(
            serde_json::to_value(Section::<u8>::Empty).unwrap(),
            json!({ "status": "empty" })
        );
    }

    #[test]
    fn test_flatten_option() {
        assert_eq!(Section::Ready(Some(1)).flatten_option(), Section::Ready(1));
        assert_eq!(Section::<Option<u8>>::Ready(None).flatten_option(), Section::Empty);
    }
}
