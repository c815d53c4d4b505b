//! Demand, competition and location calculators

use super::{FactorCalculator, FactorError, FactorKind, FactorOutcome};
use crate::context::{DemandLevel, PricingContext, PricingOptions};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Soft demand pressure from the snapshot demand level
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseDemandFactor;

impl FactorCalculator for BaseDemandFactor {
    fn kind(&self) -> FactorKind {
        FactorKind::BaseDemand
    }

    fn calculate(
        &self,
        ctx: &PricingContext,
        _opts: &PricingOptions,
    ) -> Result<FactorOutcome, FactorError> {
        let multiplier = match ctx.demand_level {
            DemandLevel::Low => dec!(0.95),
            DemandLevel::Medium => dec!(1.0),
            DemandLevel::High => dec!(1.05),
            DemandLevel::Surge => dec!(1.1),
        };
        Ok(FactorOutcome::new(multiplier, dec!(0.85)))
    }
}

/// Heavier competition pushes prices down
#[derive(Debug, Default, Clone, Copy)]
pub struct CompetitionFactor;

impl FactorCalculator for CompetitionFactor {
    fn kind(&self) -> FactorKind {
        FactorKind::Competition
    }

    fn calculate(
        &self,
        ctx: &PricingContext,
        _opts: &PricingOptions,
    ) -> Result<FactorOutcome, FactorError> {
        let level = ctx.competition_level.clamp(Decimal::ZERO, Decimal::ONE);
        Ok(FactorOutcome::new(dec!(1.1) - dec!(0.2) * level, dec!(0.8)))
    }
}

/// Cost-of-living index relative to a US baseline
#[derive(Debug, Default, Clone, Copy)]
pub struct LocationFactor;

impl LocationFactor {
    pub fn cost_of_living(country_code: &str) -> Option<Decimal> {
        let index = match country_code {
            "US" | "DE" | "FR" | "NZ" | "JP" => dec!(1.0),
            "CA" => dec!(0.95),
            "GB" | "IE" | "NL" | "SE" | "AU" | "AE" => dec!(1.05),
            "CH" => dec!(1.3),
            "NO" => dec!(1.2),
            "DK" | "SG" | "HK" => dec!(1.15),
            "IT" | "KR" => dec!(0.9),
            "ES" => dec!(0.85),
            "CN" => dec!(0.75),
            "PL" | "MX" | "BR" => dec!(0.7),
            "ZA" => dec!(0.65),
            "TR" | "TH" => dec!(0.6),
            "IN" | "ID" | "PH" | "KE" => dec!(0.55),
            "NG" => dec!(0.5),
            _ => return None,
        };
        Some(index)
    }
}

impl FactorCalculator for LocationFactor {
    fn kind(&self) -> FactorKind {
        FactorKind::Location
    }

    fn calculate(
        &self,
        ctx: &PricingContext,
        _opts: &PricingOptions,
    ) -> Result<FactorOutcome, FactorError> {
        match Self::cost_of_living(&ctx.location.country_code) {
            Some(index) => Ok(FactorOutcome::new(index, dec!(0.9))),
            None => Ok(FactorOutcome::neutral(dec!(0.6))),
        }
    }
}
