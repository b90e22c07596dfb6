//! Length Weights
//!
//! How many deliveries of each length a batter faced against a bowl kind.
//! These counts are the merge weights for every multi-length query.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::context::BowlKind;
use super::length::{DeliveryLength, LengthSet};

/// batter → bowl kind → length → balls faced.
pub type BallCountTable = BTreeMap<String, BTreeMap<BowlKind, BTreeMap<DeliveryLength, u64>>>;

/// Ball count per delivery length for one (batter, bowl kind) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable {
    counts: BTreeMap<DeliveryLength, u64>,
}

impl WeightTable {
    pub fn new(counts: BTreeMap<DeliveryLength, u64>) -> Self {
        Self { counts }
    }

    /// Weight of a length. Lengths never faced weigh 0.
    pub fn weight(&self, length: DeliveryLength) -> u64 {
        self.counts.get(&length).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Only the selected lengths, for callers that display the weights used.
    pub fn restricted_to(&self, lengths: &LengthSet) -> WeightTable {
        WeightTable {
            counts: lengths
                .iter()
                .map(|len| (len, self.weight(len)))
                .collect(),
        }
    }

    /// Lengths with at least one ball, in canonical order.
    pub fn faced(&self) -> LengthSet {
        self.counts
            .iter()
            .filter(|(_, balls)| **balls > 0)
            .map(|(len, _)| *len)
            .collect()
    }

    /// Selected length with the most balls; ties go to canonical order.
    pub fn dominant(&self, lengths: &LengthSet) -> Option<DeliveryLength> {
        lengths
            .iter()
            .fold(None, |best: Option<DeliveryLength>, len| match best {
                Some(b) if self.weight(b) >= self.weight(len) => Some(b),
                _ => Some(len),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeliveryLength, u64)> + '_ {
        self.counts.iter().map(|(len, balls)| (*len, *balls))
    }
}

impl FromIterator<(DeliveryLength, u64)> for WeightTable {
    fn from_iter<I: IntoIterator<Item = (DeliveryLength, u64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

/// Resolves merge weights from a mode's ball-count table.
pub struct LengthWeightResolver<'a> {
    counts: &'a BallCountTable,
}

impl<'a> LengthWeightResolver<'a> {
    pub fn new(counts: &'a BallCountTable) -> Self {
        Self { counts }
    }

    /// Unknown or empty batter / bowl kind gives an all-zero table.
    pub fn weights(&self, batter: &str, bowl_kind: &BowlKind) -> WeightTable {
        if batter.is_empty() || bowl_kind.as_str().is_empty() {
            return WeightTable::default();
        }
        self.counts
            .get(batter)
            .and_then(|kinds| kinds.get(bowl_kind))
            .map(|counts| WeightTable::new(counts.clone()))
            .unwrap_or_default()
    }
}
