//! Statistics Sources
//!
//! One interface over the two places per-length tables come from: snapshot
//! files loaded into a [`ModeDataStore`] and the remote statistics service.
//! Sources return raw per-length records; merging happens in the dashboard.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{StatsError, StatsResult};
use crate::memory::{Clock, ModeDataStore, ModeDataset, ResponseCache, SystemClock};
use crate::remote::api::{field, per_length};
use crate::remote::{Endpoint, HttpTransport, ResilientClient, StatsApi, Transport};
use crate::stats::{
    AbilityScores, BowlKind, DeliveryLength, FieldSetup, IntentCounts, IntentReading,
    MetricContext, Mode, PerLength, ProtectionStats, SectorTable, ShotRecord, SimilarityRow,
    WagonShot, WeightTable, ZoneRecord,
};
use crate::utils::{AppConfig, ClientSettings};

#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn batters(&self, mode: &Mode) -> StatsResult<Vec<String>>;

    async fn bowl_kinds(&self, mode: &Mode, batter: &str) -> StatsResult<Vec<BowlKind>>;

    /// Lengths with data for the pair, canonical order.
    async fn lengths(
        &self,
        mode: &Mode,
        batter: &str,
        bowl_kind: &BowlKind,
    ) -> StatsResult<Vec<DeliveryLength>>;

    async fn weights(
        &self,
        mode: &Mode,
        batter: &str,
        bowl_kind: &BowlKind,
    ) -> StatsResult<WeightTable>;

    /// Outfielder counts a field setup exists for, ascending.
    async fn outfielder_options(&self, ctx: &MetricContext) -> StatsResult<Vec<u8>>;

    async fn field_setup(
        &self,
        ctx: &MetricContext,
        outfielders: u8,
    ) -> StatsResult<Option<FieldSetup>>;

    async fn protection_stats(
        &self,
        ctx: &MetricContext,
        outfielders: u8,
    ) -> StatsResult<PerLength<ProtectionStats>>;

    async fn sector_ev(&self, ctx: &MetricContext) -> StatsResult<PerLength<SectorTable>>;

    async fn zone_strength(&self, ctx: &MetricContext) -> StatsResult<PerLength<ZoneRecord>>;

    async fn ability_360(&self, ctx: &MetricContext) -> StatsResult<PerLength<AbilityScores>>;

    async fn shot_profile(&self, ctx: &MetricContext) -> StatsResult<PerLength<ShotRecord>>;

    /// The batter's similarity row per selected length.
    async fn similarity(
        &self,
        ctx: &MetricContext,
        top_n: usize,
    ) -> StatsResult<PerLength<SimilarityRow>>;

    async fn intent_reliability(
        &self,
        ctx: &MetricContext,
        metric: &str,
    ) -> StatsResult<BTreeMap<DeliveryLength, IntentReading>>;

    async fn intent_counts(&self, ctx: &MetricContext) -> StatsResult<IntentCounts>;

    async fn wagon_wheel(&self, ctx: &MetricContext) -> StatsResult<PerLength<Vec<WagonShot>>>;
}

// ──────────────────────────────────────────────────────────────────────────────
// SNAPSHOT SOURCE
// ──────────────────────────────────────────────────────────────────────────────

/// Serves everything from mode datasets resident in a [`ModeDataStore`].
pub struct SnapshotSource {
    store: Arc<ModeDataStore>,
}

impl SnapshotSource {
    pub fn new(store: Arc<ModeDataStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ModeDataStore> {
        &self.store
    }

    /// Per-outfielder setups stored for the context's batter at one length.
    fn setups_at<'a>(
        dataset: &'a ModeDataset,
        ctx: &MetricContext,
        length: DeliveryLength,
    ) -> Option<&'a BTreeMap<u8, FieldSetup>> {
        dataset
            .field_setups
            .get(&ctx.batter)
            .and_then(|kinds| kinds.get(&ctx.bowl_kind))
            .and_then(|by_length| by_length.get(&length))
    }
}

#[async_trait]
impl StatsSource for SnapshotSource {
    async fn batters(&self, mode: &Mode) -> StatsResult<Vec<String>> {
        Ok(self.store.active(mode).await?.batters())
    }

    async fn bowl_kinds(&self, mode: &Mode, batter: &str) -> StatsResult<Vec<BowlKind>> {
        Ok(self.store.active(mode).await?.bowl_kinds(batter))
    }

    async fn lengths(
        &self,
        mode: &Mode,
        batter: &str,
        bowl_kind: &BowlKind,
    ) -> StatsResult<Vec<DeliveryLength>> {
        Ok(self.store.active(mode).await?.lengths(batter, bowl_kind))
    }

    async fn weights(
        &self,
        mode: &Mode,
        batter: &str,
        bowl_kind: &BowlKind,
    ) -> StatsResult<WeightTable> {
        Ok(self.store.active(mode).await?.weights(batter, bowl_kind))
    }

    async fn outfielder_options(&self, ctx: &MetricContext) -> StatsResult<Vec<u8>> {
        let dataset = self.store.active(&ctx.mode).await?;
        let options: BTreeSet<u8> = ctx
            .lengths
            .iter()
            .filter_map(|len| Self::setups_at(&dataset, ctx, len))
            .flat_map(|setups| setups.keys().copied())
            .collect();
        Ok(options.into_iter().collect())
    }

    async fn field_setup(
        &self,
        ctx: &MetricContext,
        outfielders: u8,
    ) -> StatsResult<Option<FieldSetup>> {
        let dataset = self.store.active(&ctx.mode).await?;
        let weights = dataset.weights(&ctx.batter, &ctx.bowl_kind);
        let Some(length) = weights.dominant(&ctx.lengths) else {
            return Ok(None);
        };
        debug!(
            "Using {} field setup for {} ({} outfielders)",
            length.label(),
            ctx.batter,
            outfielders
        );
        Ok(Self::setups_at(&dataset, ctx, length)
            .and_then(|setups| setups.get(&outfielders).cloned()))
    }

    async fn protection_stats(
        &self,
        ctx: &MetricContext,
        outfielders: u8,
    ) -> StatsResult<PerLength<ProtectionStats>> {
        let dataset = self.store.active(&ctx.mode).await?;
        Ok(ctx
            .lengths
            .iter()
            .map(|len| {
                let stats = Self::setups_at(&dataset, ctx, len)
                    .and_then(|setups| setups.get(&outfielders))
                    .map(|setup| setup.protection_stats);
                (len, stats)
            })
            .collect())
    }

    async fn sector_ev(&self, ctx: &MetricContext) -> StatsResult<PerLength<SectorTable>> {
        let dataset = self.store.active(&ctx.mode).await?;
        Ok(dataset.select(&dataset.sector_ev, ctx))
    }

    async fn zone_strength(&self, ctx: &MetricContext) -> StatsResult<PerLength<ZoneRecord>> {
        let dataset = self.store.active(&ctx.mode).await?;
        Ok(dataset.select(&dataset.zone_strength, ctx))
    }

    async fn ability_360(&self, ctx: &MetricContext) -> StatsResult<PerLength<AbilityScores>> {
        let dataset = self.store.active(&ctx.mode).await?;
        Ok(dataset.select(&dataset.ability_360, ctx))
    }

    async fn shot_profile(&self, ctx: &MetricContext) -> StatsResult<PerLength<ShotRecord>> {
        let dataset = self.store.active(&ctx.mode).await?;
        Ok(dataset.select(&dataset.shot_profile, ctx))
    }

    async fn similarity(
        &self,
        ctx: &MetricContext,
        _top_n: usize,
    ) -> StatsResult<PerLength<SimilarityRow>> {
        let dataset = self.store.active(&ctx.mode).await?;
        Ok(dataset.similarity_rows(ctx))
    }

    async fn intent_reliability(
        &self,
        ctx: &MetricContext,
        metric: &str,
    ) -> StatsResult<BTreeMap<DeliveryLength, IntentReading>> {
        let dataset = self.store.active(&ctx.mode).await?;
        Ok(dataset
            .intent_reliability
            .get(&ctx.batter)
            .and_then(|kinds| kinds.get(&ctx.bowl_kind))
            .and_then(|metrics| metrics.get(metric))
            .cloned()
            .unwrap_or_default())
    }

    async fn intent_counts(&self, ctx: &MetricContext) -> StatsResult<IntentCounts> {
        let dataset = self.store.active(&ctx.mode).await?;
        Ok(dataset
            .intent_impact
            .get(&ctx.batter)
            .and_then(|kinds| kinds.get(&ctx.bowl_kind))
            .cloned()
            .unwrap_or_default())
    }

    async fn wagon_wheel(&self, ctx: &MetricContext) -> StatsResult<PerLength<Vec<WagonShot>>> {
        let dataset = self.store.active(&ctx.mode).await?;
        Ok(dataset.select(&dataset.wagon_wheel, ctx))
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// REMOTE SOURCE
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SimilarityEntry {
    length: DeliveryLength,
    batter: String,
    similarity: f64,
}

/// Serves everything from the remote statistics service.
pub struct RemoteSource {
    api: StatsApi,
}

impl RemoteSource {
    /// HTTP-backed source for the configured service.
    pub fn connect(config: &AppConfig, settings: &ClientSettings) -> StatsResult<Self> {
        let url = config.api_url.as_deref().ok_or(StatsError::NotConfigured)?;
        let transport =
            HttpTransport::new(url, config.api_key.as_deref(), settings.request_timeout)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            settings,
            Arc::new(SystemClock),
        ))
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        settings: &ClientSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let client = ResilientClient::new(transport, settings.retry.clone());
        let cache = ResponseCache::new(settings.cache.capacity, clock);
        Self {
            api: StatsApi::new(client, cache, settings.cache.ttl),
        }
    }

    pub fn api(&self) -> &StatsApi {
        &self.api
    }

    async fn get<T>(
        &self,
        mode: &Mode,
        endpoint: Endpoint,
        body: Value,
        key: &str,
    ) -> StatsResult<T>
    where
        T: DeserializeOwned + Default + Send,
    {
        let response = self.api.fetch(mode, endpoint, body).await?;
        Ok(field(endpoint, &response, key)?)
    }

    async fn get_per_length<T>(
        &self,
        ctx: &MetricContext,
        endpoint: Endpoint,
        body: Value,
        key: &str,
    ) -> StatsResult<PerLength<T>>
    where
        T: DeserializeOwned + Send,
    {
        let by_length: BTreeMap<DeliveryLength, T> =
            self.get(&ctx.mode, endpoint, body, key).await?;
        Ok(per_length(by_length, &ctx.lengths))
    }

    fn pair_body(mode: &Mode, batter: &str, bowl_kind: &BowlKind) -> Value {
        json!({ "mode": mode.as_str(), "batter": batter, "bowl_kind": bowl_kind.as_str() })
    }
}

#[async_trait]
impl StatsSource for RemoteSource {
    async fn batters(&self, mode: &Mode) -> StatsResult<Vec<String>> {
        let body = json!({ "mode": mode.as_str() });
        self.get(mode, Endpoint::ListBatters, body, "batters").await
    }

    async fn bowl_kinds(&self, mode: &Mode, batter: &str) -> StatsResult<Vec<BowlKind>> {
        let body = json!({ "mode": mode.as_str(), "batter": batter });
        let names: Vec<String> = self.get(mode, Endpoint::ListBowlKinds, body, "bowl_kinds").await?;
        let kinds: BTreeSet<BowlKind> = names.into_iter().map(BowlKind::new).collect();
        Ok(kinds.into_iter().collect())
    }

    async fn lengths(
        &self,
        mode: &Mode,
        batter: &str,
        bowl_kind: &BowlKind,
    ) -> StatsResult<Vec<DeliveryLength>> {
        let body = Self::pair_body(mode, batter, bowl_kind);
        let lengths: BTreeSet<DeliveryLength> =
            self.get(mode, Endpoint::ListLengths, body, "lengths").await?;
        Ok(lengths.into_iter().collect())
    }

    async fn weights(
        &self,
        mode: &Mode,
        batter: &str,
        bowl_kind: &BowlKind,
    ) -> StatsResult<WeightTable> {
        if batter.is_empty() || bowl_kind.as_str().is_empty() {
            return Ok(WeightTable::default());
        }
        let body = Self::pair_body(mode, batter, bowl_kind);
        let counts: BTreeMap<DeliveryLength, u64> =
            self.get(mode, Endpoint::ListLengths, body, "ball_counts").await?;
        Ok(WeightTable::new(counts))
    }

    async fn outfielder_options(&self, ctx: &MetricContext) -> StatsResult<Vec<u8>> {
        let options: BTreeSet<u8> = self
            .get(&ctx.mode, Endpoint::ListOutfielderOptions, ctx.to_body(), "outfielders")
            .await?;
        Ok(options.into_iter().collect())
    }

    async fn field_setup(
        &self,
        ctx: &MetricContext,
        outfielders: u8,
    ) -> StatsResult<Option<FieldSetup>> {
        let body = ctx.to_body_with(json!({ "outfielders": outfielders }));
        self.get(&ctx.mode, Endpoint::FieldSetup, body, "field_setup").await
    }

    async fn protection_stats(
        &self,
        ctx: &MetricContext,
        outfielders: u8,
    ) -> StatsResult<PerLength<ProtectionStats>> {
        let body = ctx.to_body_with(json!({ "outfielders": outfielders }));
        self.get_per_length(ctx, Endpoint::ProtectionStats, body, "protection_stats").await
    }

    async fn sector_ev(&self, ctx: &MetricContext) -> StatsResult<PerLength<SectorTable>> {
        self.get_per_length(ctx, Endpoint::SectorEv, ctx.to_body(), "sector_ev").await
    }

    async fn zone_strength(&self, ctx: &MetricContext) -> StatsResult<PerLength<ZoneRecord>> {
        self.get_per_length(ctx, Endpoint::ZoneStrength, ctx.to_body(), "zone_strength").await
    }

    /// Served alongside zone strength, so the second read is a cache hit.
    async fn ability_360(&self, ctx: &MetricContext) -> StatsResult<PerLength<AbilityScores>> {
        self.get_per_length(ctx, Endpoint::ZoneStrength, ctx.to_body(), "score_360").await
    }

    async fn shot_profile(&self, ctx: &MetricContext) -> StatsResult<PerLength<ShotRecord>> {
        self.get_per_length(ctx, Endpoint::ShotProfile, ctx.to_body(), "shot_profile").await
    }

    async fn similarity(
        &self,
        ctx: &MetricContext,
        top_n: usize,
    ) -> StatsResult<PerLength<SimilarityRow>> {
        let body = ctx.to_body_with(json!({ "top_n": top_n }));
        let entries: Vec<SimilarityEntry> = self
            .get(&ctx.mode, Endpoint::SimilarBatters, body, "similarity_data")
            .await?;

        let mut rows: BTreeMap<DeliveryLength, SimilarityRow> = BTreeMap::new();
        for entry in entries {
            rows.entry(entry.length)
                .or_default()
                .scores
                .insert(entry.batter, entry.similarity);
        }
        Ok(per_length(rows, &ctx.lengths))
    }

    async fn intent_reliability(
        &self,
        ctx: &MetricContext,
        metric: &str,
    ) -> StatsResult<BTreeMap<DeliveryLength, IntentReading>> {
        let body = ctx.to_body_with(json!({ "metric": metric }));
        self.get(&ctx.mode, Endpoint::IntentReliability, body, "intent_reliability").await
    }

    async fn intent_counts(&self, ctx: &MetricContext) -> StatsResult<IntentCounts> {
        self.get(&ctx.mode, Endpoint::IntentImpact, ctx.to_body(), "intent_impact").await
    }

    async fn wagon_wheel(&self, ctx: &MetricContext) -> StatsResult<PerLength<Vec<WagonShot>>> {
        self.get_per_length(ctx, Endpoint::WagonWheel, ctx.to_body(), "wagon_wheel").await
    }
}
