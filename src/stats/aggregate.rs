//! Weighted Merge Across Lengths
//!
//! Folds the per-length records of a multi-length selection into one record,
//! weighting each length by the balls the batter faced at that length.
//!
//! Percentages are never averaged here: families that expose shares derive
//! them from the merged raw counts afterwards (see [`ZoneRecord::shares`]
//! and [`ShotRecord::shares`]).
//!
//! [`ZoneRecord::shares`]: super::records::ZoneRecord::shares
//! [`ShotRecord::shares`]: super::records::ShotRecord::shares

use std::collections::BTreeMap;

use super::length::DeliveryLength;
use super::records::MetricRecord;
use super::weights::WeightTable;

/// Selected lengths mapped to their record, `None` where the length has no data.
pub type PerLength<R> = BTreeMap<DeliveryLength, Option<R>>;

/// `Σ w·v / Σ w` per field over the lengths in `records`.
///
/// Missing records and missing fields count as 0 in the numerator while the
/// length's weight still counts in the denominator. When the denominator is
/// 0 every field comes back as 0.
pub fn merge<R: MetricRecord>(records: &PerLength<R>, weights: &WeightTable) -> R {
    let mut numerators: BTreeMap<R::Key, f64> = BTreeMap::new();
    let mut denominator = 0.0;
    let mut contributors = Vec::new();

    for (length, record) in records {
        let weight = weights.weight(*length) as f64;
        if weight > 0.0 {
            contributors.push(record.as_ref());
        }
        if let Some(record) = record {
            for (key, value) in record.fields() {
                let acc = numerators.entry(key).or_insert(0.0);
                if weight > 0.0 {
                    *acc += weight * value;
                }
            }
        }
        denominator += weight;
    }

    // One weighted length: its values pass through exactly, other lengths
    // only add zero-valued keys.
    if let [sole] = contributors.as_slice() {
        let mut fields: BTreeMap<R::Key, f64> =
            numerators.into_keys().map(|key| (key, 0.0)).collect();
        if let Some(record) = sole {
            fields.extend(record.fields());
        }
        return R::from_fields(fields);
    }

    let merged = numerators
        .into_iter()
        .map(|(key, num)| {
            let value = if denominator > 0.0 { num / denominator } else { 0.0 };
            (key, value)
        })
        .collect();
    R::from_fields(merged)
}

/// Sum of the selected lengths' weights. Zero means "no history for this
/// selection" and callers may show a no-data notice.
pub fn selection_weight<R>(records: &PerLength<R>, weights: &WeightTable) -> u64 {
    records.keys().map(|len| weights.weight(*len)).sum()
}
