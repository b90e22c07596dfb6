//! Delivery Lengths
//!
//! The closed set of pitching-length categories and the order-independent
//! selection of them that every query carries.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StatsError;

/// Where a delivery pitches. Variant order is the canonical sort order
/// (nearest the batter first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryLength {
    Full,
    GoodLength,
    ShortOfAGoodLength,
    Short,
}

impl DeliveryLength {
    pub const ALL: [DeliveryLength; 4] = [
        DeliveryLength::Full,
        DeliveryLength::GoodLength,
        DeliveryLength::ShortOfAGoodLength,
        DeliveryLength::Short,
    ];

    /// Wire name used by the statistics service and the snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryLength::Full => "FULL",
            DeliveryLength::GoodLength => "GOOD_LENGTH",
            DeliveryLength::ShortOfAGoodLength => "SHORT_OF_A_GOOD_LENGTH",
            DeliveryLength::Short => "SHORT",
        }
    }

    /// Human readable label, e.g. "SHORT OF A GOOD LENGTH".
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl fmt::Display for DeliveryLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryLength {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace([' ', '-'], "_");
        DeliveryLength::ALL
            .iter()
            .copied()
            .find(|len| len.as_str() == normalized)
            .ok_or_else(|| StatsError::UnknownLength(s.to_string()))
    }
}

/// A selection of delivery lengths. Stored sorted and de-duplicated, so two
/// selections with the same members compare equal whatever order they were
/// picked in.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LengthSet(BTreeSet<DeliveryLength>);

impl LengthSet {
    pub fn new(lengths: impl IntoIterator<Item = DeliveryLength>) -> Self {
        Self(lengths.into_iter().collect())
    }

    pub fn single(length: DeliveryLength) -> Self {
        Self::new([length])
    }

    /// Parse a comma separated list such as `"SHORT,FULL"`.
    pub fn parse_list(list: &str) -> Result<Self, StatsError> {
        let lengths = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(DeliveryLength::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(lengths))
    }

    pub fn iter(&self) -> impl Iterator<Item = DeliveryLength> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, length: DeliveryLength) -> bool {
        self.0.contains(&length)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Wire names in canonical order.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|len| len.as_str()).collect()
    }
}

impl FromIterator<DeliveryLength> for LengthSet {
    fn from_iter<I: IntoIterator<Item = DeliveryLength>>(iter: I) -> Self {
        Self::new(iter)
    }
}
