//! Query context: which mode, batter, bowl kind and lengths a request is about.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::length::LengthSet;
use crate::error::StatsError;

/// Competition format (each has its own dataset).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Mode(String);

impl Mode {
    pub fn new(name: impl AsRef<str>) -> Result<Self, StatsError> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(StatsError::InvalidContext("mode must not be empty".into()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bowling style the statistics are split by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BowlKind(String);

impl BowlKind {
    /// "pace bowler" / "spin bowler" are accepted as aliases of "pace" / "spin".
    pub fn new(name: impl AsRef<str>) -> Self {
        let lowered = name.as_ref().trim().to_lowercase();
        let canonical = lowered.strip_suffix(" bowler").unwrap_or(&lowered);
        Self(canonical.to_string())
    }

    pub fn pace() -> Self {
        Self("pace".to_string())
    }

    pub fn spin() -> Self {
        Self("spin".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BowlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One dashboard query. Built per request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricContext {
    pub mode: Mode,
    pub batter: String,
    pub bowl_kind: BowlKind,
    pub lengths: LengthSet,
}

impl MetricContext {
    pub fn new(
        mode: Mode,
        batter: impl Into<String>,
        bowl_kind: BowlKind,
        lengths: LengthSet,
    ) -> Self {
        Self {
            mode,
            batter: batter.into().trim().to_string(),
            bowl_kind,
            lengths,
        }
    }

    /// Request body shared by every per-context endpoint.
    pub fn to_body(&self) -> Value {
        json!({
            "mode": self.mode.as_str(),
            "batter": self.batter,
            "bowl_kind": self.bowl_kind.as_str(),
            "lengths": self.lengths.names(),
        })
    }

    /// Same as [`to_body`](Self::to_body) with extra top-level fields merged in.
    pub fn to_body_with(&self, extra: Value) -> Value {
        let mut body = self.to_body();
        if let (Value::Object(base), Value::Object(more)) = (&mut body, extra) {
            base.extend(more);
        }
        body
    }
}
