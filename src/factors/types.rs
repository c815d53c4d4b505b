//! Factor types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which contextual signal a multiplier is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    BaseDemand,
    Seasonal,
    Time,
    Weather,
    Event,
    Competition,
    Urgency,
    Quality,
    Location,
}

impl FactorKind {
    pub const ALL: [FactorKind; 9] = [
        FactorKind::BaseDemand,
        FactorKind::Seasonal,
        FactorKind::Time,
        FactorKind::Weather,
        FactorKind::Event,
        FactorKind::Competition,
        FactorKind::Urgency,
        FactorKind::Quality,
        FactorKind::Location,
    ];

    /// Human-readable label used in explanations
    pub fn label(&self) -> &'static str {
        match self {
            FactorKind::BaseDemand => "demand",
            FactorKind::Seasonal => "season",
            FactorKind::Time => "time of day",
            FactorKind::Weather => "weather",
            FactorKind::Event => "local events",
            FactorKind::Competition => "competition",
            FactorKind::Urgency => "urgency",
            FactorKind::Quality => "quality tier",
            FactorKind::Location => "location cost of living",
        }
    }
}

impl fmt::Display for FactorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Factor calculation errors
#[derive(Debug, Clone, Error)]
pub enum FactorError {
    /// Upstream data for the factor could not be obtained
    #[error("{kind} factor unavailable: {reason}")]
    Unavailable { kind: FactorKind, reason: String },
    /// Calculator produced a multiplier that is zero or negative
    #[error("{kind} factor produced non-positive multiplier {value}")]
    NonPositive { kind: FactorKind, value: Decimal },
}

/// Output of a single calculator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactorOutcome {
    pub multiplier: Decimal,
    /// How much the calculator trusts its input, 0-1
    pub confidence: Decimal,
}

impl FactorOutcome {
    pub fn new(multiplier: Decimal, confidence: Decimal) -> Self {
        Self {
            multiplier,
            confidence,
        }
    }

    /// A "no effect" multiplier
    pub fn neutral(confidence: Decimal) -> Self {
        Self::new(Decimal::ONE, confidence)
    }
}

/// Named set of multipliers applied to the base price
///
/// Every multiplier is positive; 1.0 means "no effect".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PricingFactors {
    pub base_demand: Decimal,
    pub seasonal: Decimal,
    pub time: Decimal,
    pub weather: Decimal,
    pub event: Decimal,
    pub competition: Decimal,
    pub urgency: Decimal,
    pub quality: Decimal,
    pub location: Decimal,
}

impl PricingFactors {
    /// All multipliers at 1.0
    pub fn neutral() -> Self {
        Self {
            base_demand: dec!(1),
            seasonal: dec!(1),
            time: dec!(1),
            weather: dec!(1),
            event: dec!(1),
            competition: dec!(1),
            urgency: dec!(1),
            quality: dec!(1),
            location: dec!(1),
        }
    }

    pub fn get(&self, kind: FactorKind) -> Decimal {
        match kind {
            FactorKind::BaseDemand => self.base_demand,
            FactorKind::Seasonal => self.seasonal,
            FactorKind::Time => self.time,
            FactorKind::Weather => self.weather,
            FactorKind::Event => self.event,
            FactorKind::Competition => self.competition,
            FactorKind::Urgency => self.urgency,
            FactorKind::Quality => self.quality,
            FactorKind::Location => self.location,
        }
    }

    pub fn set(&mut self, kind: FactorKind, value: Decimal) {
        let slot = match kind {
            FactorKind::BaseDemand => &mut self.base_demand,
            FactorKind::Seasonal => &mut self.seasonal,
            FactorKind::Time => &mut self.time,
            FactorKind::Weather => &mut self.weather,
            FactorKind::Event => &mut self.event,
            FactorKind::Competition => &mut self.competition,
            FactorKind::Urgency => &mut self.urgency,
            FactorKind::Quality => &mut self.quality,
            FactorKind::Location => &mut self.location,
        };
        *slot = value;
    }

    /// Iterate `(kind, multiplier)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (FactorKind, Decimal)> + '_ {
        FactorKind::ALL.iter().map(move |k| (*k, self.get(*k)))
    }

    /// Combined multiplier, `None` on overflow
    pub fn product(&self) -> Option<Decimal> {
        self.iter()
            .try_fold(Decimal::ONE, |acc, (_, m)| acc.checked_mul(m))
    }
}

impl Default for PricingFactors {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Per-factor record kept for confidence scoring and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactorAssessment {
    pub kind: FactorKind,
    pub multiplier: Decimal,
    pub confidence: Decimal,
    /// The calculator failed and a neutral value was substituted
    pub degraded: bool,
}

/// Result of running every calculator for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorEvaluation {
    pub factors: PricingFactors,
    pub assessments: Vec<FactorAssessment>,
}

impl FactorEvaluation {
    pub fn assessment(&self, kind: FactorKind) -> Option<&FactorAssessment> {
        self.assessments.iter().find(|a| a.kind == kind)
    }

    pub fn degraded_count(&self) -> usize {
        self.assessments.iter().filter(|a| a.degraded).count()
    }
}
