//! Statistics Module
//!
//! Domain types for the field-setting dashboard and the length-weighted
//! merge that combines per-length tables.

pub mod aggregate;
pub mod context;
pub mod derived;
pub mod length;
pub mod records;
pub mod weights;

pub use aggregate::{merge, PerLength};
pub use context::{BowlKind, MetricContext, Mode};
pub use derived::{
    impact_curve, paired_readings, rank_similar, reliable_readings, wagon_wheel, IntentPair,
    SimilarBatter,
};
pub use length::{DeliveryLength, LengthSet};
pub use records::{
    AbilityScores, FielderShare, FieldSetup, ImpactPoint, IntentCounts, IntentReading,
    MetricRecord, ProtectionStats, RunClass, SectorRow, SectorTable, ShotRecord, SimilarityRow,
    SpecialFielders, WagonShot, ZoneRecord, ZoneShares,
};
pub use weights::{BallCountTable, LengthWeightResolver, WeightTable};
