//! Urgency and quality-tier calculators

use super::{FactorCalculator, FactorError, FactorKind, FactorOutcome};
use crate::context::{PricingContext, PricingOptions, QualityTier, Urgency};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Faster service costs more; emergencies at least 1.5x
#[derive(Debug, Default, Clone, Copy)]
pub struct UrgencyFactor;

impl UrgencyFactor {
    pub fn multiplier_for(urgency: Urgency) -> Decimal {
        match urgency {
            Urgency::Low => dec!(0.95),
            Urgency::Medium => dec!(1.0),
            Urgency::High => dec!(1.3),
            Urgency::Emergency => dec!(1.6),
        }
    }
}

impl FactorCalculator for UrgencyFactor {
    fn kind(&self) -> FactorKind {
        FactorKind::Urgency
    }

    fn calculate(
        &self,
        _ctx: &PricingContext,
        opts: &PricingOptions,
    ) -> Result<FactorOutcome, FactorError> {
        Ok(FactorOutcome::new(Self::multiplier_for(opts.urgency), dec!(1)))
    }
}

/// Premium tier at least 1.2x, budget at most 0.8x
#[derive(Debug, Default, Clone, Copy)]
pub struct QualityFactor;

impl QualityFactor {
    pub fn multiplier_for(tier: QualityTier) -> Decimal {
        match tier {
            QualityTier::Budget => dec!(0.8),
            QualityTier::Standard => dec!(1.0),
            QualityTier::Premium => dec!(1.25),
        }
    }
}

impl FactorCalculator for QualityFactor {
    fn kind(&self) -> FactorKind {
        FactorKind::Quality
    }

    fn calculate(
        &self,
        _ctx: &PricingContext,
        opts: &PricingOptions,
    ) -> Result<FactorOutcome, FactorError> {
        Ok(FactorOutcome::new(Self::multiplier_for(opts.quality_tier), dec!(1)))
    }
}
