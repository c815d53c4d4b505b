//! Surge types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete surge band derived from the demand/supply ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurgeBand {
    None,
    Low,
    Medium,
    High,
    Extreme,
}

impl SurgeBand {
    /// Band for a demand/supply ratio
    ///
    /// Thresholds are strict: a ratio of exactly 2.0 is `Medium`.
    pub fn from_ratio(ratio: Decimal) -> Self {
        if ratio > dec!(3) {
            SurgeBand::Extreme
        } else if ratio > dec!(2) {
            SurgeBand::High
        } else if ratio > dec!(1.5) {
            SurgeBand::Medium
        } else if ratio > dec!(1.2) {
            SurgeBand::Low
        } else {
            SurgeBand::None
        }
    }

    pub fn multiplier(&self) -> Decimal {
        match self {
            SurgeBand::None => dec!(1.0),
            SurgeBand::Low => dec!(1.25),
            SurgeBand::Medium => dec!(1.5),
            SurgeBand::High => dec!(2.0),
            SurgeBand::Extreme => dec!(2.5),
        }
    }

    /// How long a surge in this band is expected to last
    pub fn expected_duration_minutes(&self) -> i64 {
        match self {
            SurgeBand::None => 0,
            SurgeBand::Low => 15,
            SurgeBand::Medium => 30,
            SurgeBand::High => 45,
            SurgeBand::Extreme => 60,
        }
    }

    pub fn is_active(&self) -> bool {
        *self != SurgeBand::None
    }
}

impl fmt::Display for SurgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SurgeBand::None => "none",
            SurgeBand::Low => "low",
            SurgeBand::Medium => "medium",
            SurgeBand::High => "high",
            SurgeBand::Extreme => "extreme",
        };
        f.write_str(label)
    }
}

/// Where the demand/supply ratio came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSource {
    /// Aggregated from the historical data store
    History,
    /// Derived from the context's demand/supply levels
    Snapshot,
}

/// Smoothing parameters for consecutive surge multipliers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// Weight of the new raw multiplier, 0-1
    pub alpha: Decimal,
    /// Largest change allowed between consecutive applied multipliers
    pub max_step: Decimal,
    /// Previous multipliers older than this are ignored
    pub window_secs: i64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            alpha: dec!(0.5),
            max_step: dec!(0.25),
            window_secs: 300,
        }
    }
}

/// Surge multiplier applied to a (location cell, category)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurgeInfo {
    /// Applied (smoothed) multiplier
    pub multiplier: Decimal,
    /// Band multiplier before smoothing
    pub raw_multiplier: Decimal,
    pub band: SurgeBand,
    /// Demand/supply ratio the band was derived from
    pub ratio: Decimal,
    pub reason: String,
    /// Estimated time the surge persists
    pub duration_minutes: i64,
    pub affected_radius_km: Decimal,
    /// The applied multiplier differs from the raw band multiplier
    pub smoothed: bool,
    pub source: SignalSource,
    /// Confidence in the demand signal, 0-1
    pub confidence: Decimal,
    pub computed_at: DateTime<Utc>,
}

impl SurgeInfo {
    pub fn is_active(&self) -> bool {
        self.multiplier > Decimal::ONE
    }
}
