//! Pricing types

use crate::context::{Currency, Money, ValidationError};
use crate::currency::CurrencyConversion;
use crate::experiment::AppliedVariant;
use crate::factors::{FactorKind, PricingFactors};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pricing errors
///
/// Quotes only fail for invalid caller input; every transient failure is
/// absorbed into a degraded price instead.
#[derive(Debug, Error)]
pub enum PricingError {
    /// Caller input rejected
    #[error("Invalid input {field}: {reason}")]
    InvalidInput { field: String, reason: String },
    /// A collaborator needed to answer the request failed
    #[error("{collaborator} unavailable: {reason}")]
    Unavailable {
        collaborator: &'static str,
        reason: String,
    },
}

impl From<ValidationError> for PricingError {
    fn from(e: ValidationError) -> Self {
        PricingError::InvalidInput {
            field: e.field,
            reason: e.reason,
        }
    }
}

/// Relative weights of the confidence components of a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceWeights {
    pub factors: Decimal,
    pub surge: Decimal,
    pub conversion: Decimal,
}

impl ConfidenceWeights {
    /// Weighted average of the component confidences, in `[0, 1]`
    pub fn combine(&self, factors: Decimal, surge: Decimal, conversion: Decimal) -> Decimal {
        let total = self.factors + self.surge + self.conversion;
        if total <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        ((self.factors * factors + self.surge * surge + self.conversion * conversion) / total)
            .clamp(Decimal::ZERO, Decimal::ONE)
            .round_dp(4)
    }
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            factors: Decimal::new(6, 1),
            surge: Decimal::new(25, 2),
            conversion: Decimal::new(15, 2),
        }
    }
}

/// Direction of a factor's effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Increase,
    Decrease,
}

/// A factor that materially moved the price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorContribution {
    pub factor: FactorKind,
    pub multiplier: Decimal,
    pub impact: Impact,
    pub description: String,
}

/// A cheaper time to book while surge is active
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAlternative {
    pub starts_at: DateTime<Utc>,
    pub estimated_price: Decimal,
    pub savings: Decimal,
    pub surge_multiplier: Decimal,
    pub description: String,
}

/// Human-readable account of how a price was reached
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub summary: String,
    pub primary_factors: Vec<FactorContribution>,
    pub alternatives: Vec<PriceAlternative>,
    /// Set when the price is a base-price passthrough
    pub degraded: bool,
}

/// A computed quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicPrice {
    pub service_id: String,
    pub provider_id: String,
    pub base_price: Money,
    pub final_price: Decimal,
    /// Currency of `final_price`
    pub currency: Currency,
    pub factors: PricingFactors,
    pub surge_multiplier: Decimal,
    /// 0-1
    pub confidence: Decimal,
    pub valid_until: DateTime<Utc>,
    pub explanation: Explanation,
    pub conversion: Option<CurrencyConversion>,
    pub experiment: Option<AppliedVariant>,
    pub computed_at: DateTime<Utc>,
}

impl DynamicPrice {
    pub fn final_money(&self) -> Money {
        Money::new(self.final_price, self.currency.clone())
    }

    pub fn is_degraded(&self) -> bool {
        self.explanation.degraded
    }
}
