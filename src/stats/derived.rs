//! Derived views: similarity ranking, intent reliability filtering and
//! pairing, the intent impact curve and wagon wheel assembly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::aggregate::PerLength;
use super::length::{DeliveryLength, LengthSet};
use super::records::{ImpactPoint, IntentCounts, IntentReading, SimilarityRow, WagonShot};
use super::weights::WeightTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarBatter {
    pub batter: String,
    pub similarity: f64,
}

/// Top `top_n` batters of a merged similarity row, `batter` excluded,
/// highest first and ties by name.
pub fn rank_similar(row: &SimilarityRow, batter: &str, top_n: usize) -> Vec<SimilarBatter> {
    let mut ranked: Vec<SimilarBatter> = row
        .scores
        .iter()
        .filter(|(other, _)| other.as_str() != batter)
        .map(|(other, score)| SimilarBatter {
            batter: other.clone(),
            similarity: *score,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.batter.cmp(&b.batter))
    });
    ranked.truncate(top_n);
    ranked
}

/// Readings for the selected lengths with a real value and enough balls.
pub fn reliable_readings(
    readings: &BTreeMap<DeliveryLength, IntentReading>,
    lengths: &LengthSet,
    min_balls: u64,
) -> BTreeMap<DeliveryLength, IntentReading> {
    readings
        .iter()
        .filter(|(len, reading)| {
            lengths.contains(**len) && !reading.value.is_nan() && reading.balls >= min_balls
        })
        .map(|(len, reading)| (*len, *reading))
        .collect()
}

/// Strike-rate and control readings of one length side by side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntentPair {
    pub strike_rate: f64,
    pub control: f64,
    /// The smaller of the two sample sizes.
    pub balls: u64,
}

/// Selected lengths where both readings are defined and the smaller sample
/// has at least `min_balls` balls.
pub fn paired_readings(
    strike_rate: &BTreeMap<DeliveryLength, IntentReading>,
    control: &BTreeMap<DeliveryLength, IntentReading>,
    lengths: &LengthSet,
    min_balls: u64,
) -> BTreeMap<DeliveryLength, IntentPair> {
    strike_rate
        .iter()
        .filter(|(len, _)| lengths.contains(**len))
        .filter_map(|(len, sr)| {
            let con = control.get(len)?;
            let balls = sr.balls.min(con.balls);
            let defined = !sr.value.is_nan() && !con.value.is_nan();
            (defined && balls >= min_balls).then_some((
                *len,
                IntentPair {
                    strike_rate: sr.value,
                    control: con.value,
                    balls,
                },
            ))
        })
        .collect()
}

/// Cumulative (batter − non-striker) runs per ball over ball indices with
/// at least `min_count` samples, raw and controlled.
pub fn impact_curve(counts: &IntentCounts, min_count: f64) -> Vec<ImpactPoint> {
    let per_ball = |runs: &BTreeMap<u32, f64>, ball: u32, n: f64| {
        runs.get(&ball).copied().unwrap_or(0.0) / n
    };

    let mut raw = 0.0;
    let mut controlled = 0.0;
    counts
        .batter_ith_ball_count
        .iter()
        .filter(|(_, n)| **n >= min_count && **n > 0.0)
        .map(|(ball, n)| {
            raw += per_ball(&counts.batter_ith_ball_raw_runs, *ball, *n)
                - per_ball(&counts.non_striker_ith_ball_raw_runs, *ball, *n);
            controlled += per_ball(&counts.batter_ith_ball_controlled_runs, *ball, *n)
                - per_ball(&counts.non_striker_ith_ball_controlled_runs, *ball, *n);
            ImpactPoint {
                ball: *ball,
                raw,
                controlled,
            }
        })
        .collect()
}

/// Shots of every selected length the batter has history at, canonical
/// length order, each tagged with its length.
pub fn wagon_wheel(per_length: PerLength<Vec<WagonShot>>, weights: &WeightTable) -> Vec<WagonShot> {
    per_length
        .into_iter()
        .filter(|(len, _)| weights.weight(*len) > 0)
        .flat_map(|(len, shots)| {
            shots.unwrap_or_default().into_iter().map(move |mut shot| {
                shot.length.get_or_insert(len);
                shot
            })
        })
        .collect()
}
