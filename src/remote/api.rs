//! Statistics Service Endpoints
//!
//! Logical endpoints of the remote service and the cached fetch path every
//! one of them goes through.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::client::ResilientClient;
use super::error::FetchError;
use crate::memory::{ResponseCache, Signature};
use crate::stats::{DeliveryLength, LengthSet, Mode, PerLength};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    ListBatters,
    ListBowlKinds,
    ListLengths,
    ListOutfielderOptions,
    FieldSetup,
    ProtectionStats,
    SectorEv,
    ZoneStrength,
    ShotProfile,
    SimilarBatters,
    IntentReliability,
    IntentImpact,
    WagonWheel,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::ListBatters => "/list-batters",
            Endpoint::ListBowlKinds => "/list-bowl-kinds",
            Endpoint::ListLengths => "/list-lengths",
            Endpoint::ListOutfielderOptions => "/list-outfielder-options",
            Endpoint::FieldSetup => "/field-setup",
            Endpoint::ProtectionStats => "/protection-stats",
            Endpoint::SectorEv => "/sector-ev",
            Endpoint::ZoneStrength => "/zone-strength",
            Endpoint::ShotProfile => "/shot-profile",
            Endpoint::SimilarBatters => "/similar-batters",
            Endpoint::IntentReliability => "/intent-reliability",
            Endpoint::IntentImpact => "/intent-impact",
            Endpoint::WagonWheel => "/wagon-wheel",
        }
    }
}

/// Cached, retrying access to the statistics service.
pub struct StatsApi {
    client: ResilientClient,
    cache: ResponseCache<Value>,
    ttl: Duration,
}

impl StatsApi {
    pub fn new(client: ResilientClient, cache: ResponseCache<Value>, ttl: Duration) -> Self {
        Self { client, cache, ttl }
    }

    pub fn cache(&self) -> &ResponseCache<Value> {
        &self.cache
    }

    /// POST `body` to `endpoint`, answering from the cache when possible.
    pub async fn fetch(
        &self,
        mode: &Mode,
        endpoint: Endpoint,
        body: Value,
    ) -> Result<Value, FetchError> {
        let signature = Signature::new(mode, endpoint.path(), &body);
        self.cache
            .get_or_fetch(signature, || self.client.post_json(endpoint.path(), &body), self.ttl)
            .await
    }
}

/// Decode `response[key]`. An absent or null key is empty data.
pub fn field<T: DeserializeOwned + Default>(
    endpoint: Endpoint,
    response: &Value,
    key: &str,
) -> Result<T, FetchError> {
    match response.get(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| FetchError::Decode {
            endpoint: endpoint.path().to_string(),
            message: format!("field {key:?}: {e}"),
        }),
    }
}

/// Spread a length-keyed map over the selection, `None` where absent.
pub fn per_length<T>(
    mut by_length: BTreeMap<DeliveryLength, T>,
    lengths: &LengthSet,
) -> PerLength<T> {
    lengths
        .iter()
        .map(|len| (len, by_length.remove(&len)))
        .collect()
}
