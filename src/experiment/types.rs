//! Experiment types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Experiment manager errors
#[derive(Debug, Error)]
pub enum ExperimentError {
    /// No experiment with this id
    #[error("Experiment not found: {0}")]
    NotFound(Uuid),
    /// Experiment definition is invalid
    #[error("Invalid experiment {field}: {reason}")]
    Invalid { field: String, reason: String },
    /// Variant name not part of the experiment
    #[error("Unknown variant '{variant}' in experiment {experiment_id}")]
    UnknownVariant { experiment_id: Uuid, variant: String },
    /// Reading or writing persisted configuration failed
    #[error("Experiment persistence failed: {0}")]
    Persistence(String),
}

impl ExperimentError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// One arm of a pricing experiment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingVariant {
    pub name: String,
    /// Multiplier layered on top of the computed price
    pub price_multiplier: Decimal,
    /// Customer segment the variant is shown to; `None` targets everyone
    pub target_segment: Option<String>,
}

impl PricingVariant {
    pub fn new(name: impl Into<String>, price_multiplier: Decimal) -> Self {
        Self {
            name: name.into(),
            price_multiplier,
            target_segment: None,
        }
    }

    pub fn for_segment(mut self, segment: impl Into<String>) -> Self {
        self.target_segment = Some(segment.into());
        self
    }

    pub fn targets(&self, segment: Option<&str>) -> bool {
        match (&self.target_segment, segment) {
            (None, _) => true,
            (Some(target), Some(segment)) => target == segment,
            (Some(_), None) => false,
        }
    }
}

/// A pricing experiment with its run window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingExperiment {
    pub id: Uuid,
    pub name: String,
    pub variants: Vec<PricingVariant>,
    /// Inclusive start of the run window
    pub start: DateTime<Utc>,
    /// Exclusive end of the run window
    pub end: DateTime<Utc>,
}

impl PricingExperiment {
    pub fn new(
        name: impl Into<String>,
        variants: Vec<PricingVariant>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            variants,
            start,
            end,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now < self.end
    }

    pub fn variant(&self, name: &str) -> Option<&PricingVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    pub fn validate(&self) -> Result<(), ExperimentError> {
        if self.name.trim().is_empty() {
            return Err(ExperimentError::invalid("name", "must not be empty"));
        }
        if self.variants.is_empty() {
            return Err(ExperimentError::invalid("variants", "at least one variant is required"));
        }
        if self.end <= self.start {
            return Err(ExperimentError::invalid("end", "must be after start"));
        }
        for (i, variant) in self.variants.iter().enumerate() {
            if variant.price_multiplier <= Decimal::ZERO {
                return Err(ExperimentError::invalid(
                    "variants.price_multiplier",
                    format!("variant '{}' multiplier must be positive", variant.name),
                ));
            }
            if self.variants[..i].iter().any(|v| v.name == variant.name) {
                return Err(ExperimentError::invalid(
                    "variants.name",
                    format!("duplicate variant '{}'", variant.name),
                ));
            }
        }
        Ok(())
    }
}

/// Variant applied to a live quote
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppliedVariant {
    pub experiment_id: Uuid,
    pub experiment_name: String,
    pub variant: String,
    pub price_multiplier: Decimal,
}

/// Historical price elasticity used for outcome prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticityData {
    /// Conversion rate at the unmodified price
    pub base_conversion_rate: Decimal,
    /// Price elasticity of demand, usually negative
    pub elasticity: f64,
    pub average_order_value: Decimal,
    /// Requests expected over the experiment window
    pub expected_requests: u64,
}

/// Predicted outcome for one variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantPrediction {
    pub variant: String,
    pub price_multiplier: Decimal,
    pub expected_conversion_rate: Decimal,
    pub expected_revenue_per_request: Decimal,
    pub expected_revenue: Decimal,
}

/// Observed results for one variant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOutcome {
    pub exposures: u64,
    pub conversions: u64,
    pub revenue: Decimal,
}

impl VariantOutcome {
    pub fn conversion_rate(&self) -> Option<Decimal> {
        if self.exposures == 0 {
            return None;
        }
        Some(Decimal::from(self.conversions) / Decimal::from(self.exposures))
    }
}
