//! Metric Record Families
//!
//! Every per-length table the dashboard serves. Each family flattens into
//! keyed numeric fields through [`MetricRecord`] so a single merge routine
//! handles all of them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::length::DeliveryLength;

/// A per-length record made of keyed numeric fields.
///
/// `from_fields(fields())` must reproduce the record for any record in
/// normal form (rows sorted, angles in `[0, 360)`).
pub trait MetricRecord: Sized {
    type Key: Ord + Clone;

    fn fields(&self) -> Vec<(Self::Key, f64)>;

    fn from_fields(fields: BTreeMap<Self::Key, f64>) -> Self;
}

// ──────────────────────────────────────────────────────────────────────────────
// SECTOR EV
// ──────────────────────────────────────────────────────────────────────────────

/// Sector angle in thousandths of a degree, normalised to `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AngleKey(i64);

impl AngleKey {
    pub fn from_degrees(deg: f64) -> Self {
        let milli = (deg.rem_euclid(360.0) * 1000.0).round() as i64;
        Self(milli.rem_euclid(360_000))
    }

    pub fn degrees(&self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectorSeries {
    /// Running EV, inside the 30-yard circle.
    Run,
    /// Boundary EV, outside the 30-yard circle.
    Boundary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorRow {
    pub theta_center_deg: f64,
    pub ev_run: f64,
    pub ev_bd: f64,
}

/// Expected run value per angular sector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectorTable {
    pub rows: Vec<SectorRow>,
}

impl SectorTable {
    /// Min and max over both EV series, for a shared color scale.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.rows
            .iter()
            .flat_map(|row| [row.ev_run, row.ev_bd])
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

impl MetricRecord for SectorTable {
    type Key = (AngleKey, SectorSeries);

    fn fields(&self) -> Vec<(Self::Key, f64)> {
        self.rows
            .iter()
            .flat_map(|row| {
                let angle = AngleKey::from_degrees(row.theta_center_deg);
                [
                    ((angle, SectorSeries::Run), row.ev_run),
                    ((angle, SectorSeries::Boundary), row.ev_bd),
                ]
            })
            .collect()
    }

    fn from_fields(fields: BTreeMap<Self::Key, f64>) -> Self {
        let mut by_angle: BTreeMap<AngleKey, SectorRow> = BTreeMap::new();
        for ((angle, series), value) in fields {
            let row = by_angle.entry(angle).or_insert_with(|| SectorRow {
                theta_center_deg: angle.degrees(),
                ev_run: 0.0,
                ev_bd: 0.0,
            });
            match series {
                SectorSeries::Run => row.ev_run = value,
                SectorSeries::Boundary => row.ev_bd = value,
            }
        }
        Self {
            rows: by_angle.into_values().collect(),
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// ZONE STRENGTH
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunClass {
    Overall,
    Running,
    Boundary,
}

impl RunClass {
    pub const ALL: [RunClass; 3] = [RunClass::Overall, RunClass::Running, RunClass::Boundary];
}

/// Raw zone counts per run class (`total_runs`, `st_runs`, `leg_runs`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneRecord {
    pub classes: BTreeMap<RunClass, BTreeMap<String, f64>>,
}

/// Percentage of a run class scored in each zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneShares {
    pub straight: f64,
    pub leg: f64,
    pub off: f64,
    pub behind: f64,
}

impl ZoneRecord {
    pub fn value(&self, class: RunClass, key: &str) -> f64 {
        self.classes
            .get(&class)
            .and_then(|fields| fields.get(key))
            .copied()
            .unwrap_or(0.0)
    }

    /// Zone shares of `total_runs`, computed from this record's raw counts.
    /// `kind` picks the numerator family, e.g. `"runs"` reads `st_runs`.
    pub fn shares(&self, class: RunClass, kind: &str) -> ZoneShares {
        let total = self.value(class, "total_runs");
        let pct = |zone: &str| {
            if total == 0.0 {
                0.0
            } else {
                self.value(class, &format!("{zone}_{kind}")) / total * 100.0
            }
        };
        ZoneShares {
            straight: pct("st"),
            leg: pct("leg"),
            off: pct("off"),
            behind: pct("bk"),
        }
    }
}

impl MetricRecord for ZoneRecord {
    type Key = (RunClass, String);

    fn fields(&self) -> Vec<(Self::Key, f64)> {
        self.classes
            .iter()
            .flat_map(|(class, fields)| {
                fields.iter().map(move |(name, value)| ((*class, name.clone()), *value))
            })
            .collect()
    }

    fn from_fields(fields: BTreeMap<Self::Key, f64>) -> Self {
        let mut classes: BTreeMap<RunClass, BTreeMap<String, f64>> = BTreeMap::new();
        for ((class, name), value) in fields {
            classes.entry(class).or_default().insert(name, value);
        }
        Self { classes }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// SHOT PROFILE
// ──────────────────────────────────────────────────────────────────────────────

/// Raw figures per shot type (`runs`, `balls`, `avg_runs`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShotRecord {
    pub shots: BTreeMap<String, BTreeMap<String, f64>>,
}

impl ShotRecord {
    /// `(shot, value)` for one value type, highest first.
    pub fn ranked(&self, value_type: &str) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .shots
            .iter()
            .map(|(shot, fields)| (shot.clone(), fields.get(value_type).copied().unwrap_or(0.0)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    /// Share of total runs per shot, from raw run counts.
    pub fn shares(&self) -> BTreeMap<String, f64> {
        let total: f64 = self
            .shots
            .values()
            .map(|fields| fields.get("runs").copied().unwrap_or(0.0))
            .sum();
        self.shots
            .iter()
            .map(|(shot, fields)| {
                let runs = fields.get("runs").copied().unwrap_or(0.0);
                let share = if total == 0.0 { 0.0 } else { runs / total * 100.0 };
                (shot.clone(), share)
            })
            .collect()
    }
}

impl MetricRecord for ShotRecord {
    type Key = (String, String);

    fn fields(&self) -> Vec<(Self::Key, f64)> {
        self.shots
            .iter()
            .flat_map(|(shot, fields)| {
                fields.iter().map(move |(name, value)| ((shot.clone(), name.clone()), *value))
            })
            .collect()
    }

    fn from_fields(fields: BTreeMap<Self::Key, f64>) -> Self {
        let mut shots: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        for ((shot, name), value) in fields {
            shots.entry(shot).or_default().insert(name, value);
        }
        Self { shots }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// SIMPLE KEYED FAMILIES
// ──────────────────────────────────────────────────────────────────────────────

/// "360" ability scores by name. Deltas may be negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityScores {
    pub scores: BTreeMap<String, f64>,
}

impl MetricRecord for AbilityScores {
    type Key = String;

    fn fields(&self) -> Vec<(String, f64)> {
        self.scores.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    fn from_fields(fields: BTreeMap<String, f64>) -> Self {
        Self { scores: fields }
    }
}

/// Similarity of one batter to every other batter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimilarityRow {
    pub scores: BTreeMap<String, f64>,
}

impl MetricRecord for SimilarityRow {
    type Key = String;

    fn fields(&self) -> Vec<(String, f64)> {
        self.scores.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    fn from_fields(fields: BTreeMap<String, f64>) -> Self {
        Self { scores: fields }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtectionField {
    Overall,
    Running,
    Boundary,
}

/// Share (%) of each run category the recommended field is estimated to save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtectionStats {
    #[serde(default)]
    pub overall: f64,
    #[serde(default)]
    pub running: f64,
    #[serde(default)]
    pub boundary: f64,
}

impl MetricRecord for ProtectionStats {
    type Key = ProtectionField;

    fn fields(&self) -> Vec<(ProtectionField, f64)> {
        vec![
            (ProtectionField::Overall, self.overall),
            (ProtectionField::Running, self.running),
            (ProtectionField::Boundary, self.boundary),
        ]
    }

    fn from_fields(fields: BTreeMap<ProtectionField, f64>) -> Self {
        let get = |field| fields.get(&field).copied().unwrap_or(0.0);
        Self {
            overall: get(ProtectionField::Overall),
            running: get(ProtectionField::Running),
            boundary: get(ProtectionField::Boundary),
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// NON-MERGED RECORDS
// ──────────────────────────────────────────────────────────────────────────────

/// Angles (degrees) of the players given a special role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecialFielders {
    #[serde(rename = "30_yard_wall", default)]
    pub thirty_yard_wall: Option<f64>,
    #[serde(default)]
    pub sprinter: Option<f64>,
    #[serde(default)]
    pub catcher: Option<f64>,
    #[serde(default)]
    pub superfielder: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FielderShare {
    pub angle: f64,
    #[serde(alias = "ev_run_percent", alias = "ev_bd_percent")]
    pub percent: f64,
}

/// One pre-computed field placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSetup {
    #[serde(default)]
    pub infielder_positions: Vec<f64>,
    #[serde(default)]
    pub outfielder_positions: Vec<f64>,
    #[serde(default)]
    pub special_fielders: SpecialFielders,
    #[serde(default)]
    pub protection_stats: ProtectionStats,
    /// Share of total running EV each infielder saves.
    #[serde(default)]
    pub infielder_ev_run_percent: Vec<FielderShare>,
    /// Share of total boundary EV each outfielder saves.
    #[serde(default)]
    pub outfielder_ev_bd_percent: Vec<FielderShare>,
}

/// An intent metric value for one length, with the sample size behind it.
/// An undefined value is NaN in memory and `null` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntentReading {
    #[serde(with = "nan_as_null")]
    pub value: f64,
    pub balls: u64,
}

mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        let value = (!value.is_nan()).then_some(*value);
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

/// Per-ball-index totals used for the intent impact curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentCounts {
    #[serde(default)]
    pub batter_ith_ball_count: BTreeMap<u32, f64>,
    #[serde(default)]
    pub batter_ith_ball_raw_runs: BTreeMap<u32, f64>,
    #[serde(default)]
    pub batter_ith_ball_controlled_runs: BTreeMap<u32, f64>,
    #[serde(default)]
    pub non_striker_ith_ball_raw_runs: BTreeMap<u32, f64>,
    #[serde(default)]
    pub non_striker_ith_ball_controlled_runs: BTreeMap<u32, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactPoint {
    pub ball: u32,
    pub raw: f64,
    pub controlled: f64,
}

/// One scoring shot of the wagon wheel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WagonShot {
    pub angle_deg: f64,
    pub runs: u32,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub length: Option<DeliveryLength>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_round_trip_normal_form() {
        let table = SectorTable {
            rows: vec![
                SectorRow { theta_center_deg: 7.5, ev_run: 0.4, ev_bd: 1.2 },
                SectorRow { theta_center_deg: 22.5, ev_run: 0.1, ev_bd: -0.3 },
            ],
        };
        let rebuilt = SectorTable::from_fields(table.fields().into_iter().collect());
        assert_eq!(rebuilt, table);
    }

    #[test]
    fn test_angle_key_wraps() {
        assert_eq!(AngleKey::from_degrees(367.5), AngleKey::from_degrees(7.5));
        assert_eq!(AngleKey::from_degrees(-352.5), AngleKey::from_degrees(7.5));
        assert_eq!(AngleKey::from_degrees(360.0).degrees(), 0.0);
    }

    #[test]
    fn test_value_range_spans_both_series() {
        let table = SectorTable {
            rows: vec![
                SectorRow { theta_center_deg: 0.0, ev_run: 0.5, ev_bd: 3.0 },
                SectorRow { theta_center_deg: 15.0, ev_run: -1.0, ev_bd: 2.0 },
            ],
        };
        assert_eq!(table.value_range(), Some((-1.0, 3.0)));
        assert_eq!(SectorTable::default().value_range(), None);
    }

    #[test]
    fn test_zone_shares_zero_total() {
        let record = ZoneRecord::default();
        assert_eq!(record.shares(RunClass::Overall, "runs"), ZoneShares::default());
    }

    #[test]
    fn test_shot_ranking_desc_then_name() {
        let mut shots = BTreeMap::new();
        shots.insert("cut".to_string(), BTreeMap::from([("runs".to_string(), 10.0)]));
        shots.insert("drive".to_string(), BTreeMap::from([("runs".to_string(), 30.0)]));
        shots.insert("pull".to_string(), BTreeMap::from([("runs".to_string(), 10.0)]));
        let record = ShotRecord { shots };
        let names: Vec<String> = record.ranked("runs").into_iter().map(|(s, _)| s).collect();
        assert_eq!(names, vec!["drive", "cut", "pull"]);
        assert_eq!(record.shares()["drive"], 60.0);
    }

    #[test]
    fn test_field_setup_decodes_wire_names() {
        let json = r#"{
            "infielder_positions": [30.0, 90.0],
            "outfielder_positions": [180.0],
            "special_fielders": {"30_yard_wall": 90.0, "catcher": 180.0},
            "protection_stats": {"overall": 50.0, "running": 40.0, "boundary": 60.0},
            "infielder_ev_run_percent": [{"angle": 30.0, "ev_run_percent": 12.5}],
            "outfielder_ev_bd_percent": [{"angle": 180.0, "ev_bd_percent": 20.0}]
        }"#;
        let setup: FieldSetup = serde_json::from_str(json).unwrap();
        assert_eq!(setup.special_fielders.thirty_yard_wall, Some(90.0));
        assert_eq!(setup.special_fielders.sprinter, None);
        assert_eq!(setup.infielder_ev_run_percent[0].percent, 12.5);
        assert_eq!(setup.protection_stats.boundary, 60.0);
    }

    #[test]
    fn test_intent_null_value_is_nan() {
        let reading: IntentReading =
            serde_json::from_str(r#"{"value": null, "balls": 40}"#).unwrap();
        assert!(reading.value.is_nan());
        assert_eq!(reading.balls, 40);

        assert_eq!(
            serde_json::to_value(reading).unwrap(),
            serde_json::json!({ "value": null, "balls": 40 })
        );

        let stored = bincode::serialize(&reading).unwrap();
        let restored: IntentReading = bincode::deserialize(&stored).unwrap();
        assert!(restored.value.is_nan());

        let defined: IntentReading =
            serde_json::from_str(r#"{"value": 1.25, "balls": 3}"#).unwrap();
        assert_eq!(defined.value, 1.25);
    }
}
