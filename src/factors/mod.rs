//! Factor calculators
//!
//! Independent, side-effect free functions turning context into multipliers.
//! A failing calculator degrades to a neutral multiplier instead of failing
//! the quote.

mod environment;
mod market;
mod request;
mod temporal;
mod types;

pub use environment::{EventFactor, WeatherFactor};
pub use market::{BaseDemandFactor, CompetitionFactor, LocationFactor};
pub use request::{QualityFactor, UrgencyFactor};
pub use temporal::{SeasonalFactor, TimeOfDayFactor};
pub use types::{
    FactorAssessment, FactorError, FactorEvaluation, FactorKind, FactorOutcome, PricingFactors,
};

use crate::context::{PricingContext, PricingOptions};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

/// Confidence assigned to a factor whose calculator failed
const DEGRADED_FACTOR_CONFIDENCE: Decimal = dec!(0.3);

/// Trait for factor calculator implementations
pub trait FactorCalculator: Send + Sync {
    /// Which multiplier this calculator produces
    fn kind(&self) -> FactorKind;
    /// Derive the multiplier from context and request options
    fn calculate(
        &self,
        ctx: &PricingContext,
        opts: &PricingOptions,
    ) -> Result<FactorOutcome, FactorError>;
}

/// The full family of calculators applied to every quote
#[derive(Clone)]
pub struct FactorSet {
    calculators: Vec<Arc<dyn FactorCalculator>>,
}

impl FactorSet {
    /// One calculator per factor kind
    pub fn standard() -> Self {
        Self {
            calculators: vec![
                Arc::new(BaseDemandFactor),
                Arc::new(SeasonalFactor),
                Arc::new(TimeOfDayFactor),
                Arc::new(WeatherFactor),
                Arc::new(EventFactor),
                Arc::new(CompetitionFactor),
                Arc::new(UrgencyFactor),
                Arc::new(QualityFactor),
                Arc::new(LocationFactor),
            ],
        }
    }

    /// Replace the calculator for `calculator.kind()`, or add it
    pub fn with_calculator(mut self, calculator: Arc<dyn FactorCalculator>) -> Self {
        let kind = calculator.kind();
        self.calculators.retain(|c| c.kind() != kind);
        self.calculators.push(calculator);
        self
    }

    pub fn len(&self) -> usize {
        self.calculators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calculators.is_empty()
    }

    /// Run every calculator, substituting neutral multipliers for failures
    pub fn evaluate(&self, ctx: &PricingContext, opts: &PricingOptions) -> FactorEvaluation {
        let mut factors = PricingFactors::neutral();
        let mut assessments = Vec::with_capacity(self.calculators.len());

        for calculator in &self.calculators {
            let kind = calculator.kind();
            let result = calculator.calculate(ctx, opts).and_then(|outcome| {
                if outcome.multiplier > Decimal::ZERO {
                    Ok(outcome)
                } else {
                    Err(FactorError::NonPositive {
                        kind,
                        value: outcome.multiplier,
                    })
                }
            });

            let assessment = match result {
                Ok(outcome) => FactorAssessment {
                    kind,
                    multiplier: outcome.multiplier,
                    confidence: outcome.confidence.clamp(Decimal::ZERO, Decimal::ONE),
                    degraded: false,
                },
                Err(e) => {
                    tracing::warn!(factor = %kind, error = %e, "Factor degraded to neutral");
                    crate::telemetry::increment(crate::telemetry::CounterMetric::FactorDegraded);
                    FactorAssessment {
                        kind,
                        multiplier: Decimal::ONE,
                        confidence: DEGRADED_FACTOR_CONFIDENCE,
                        degraded: true,
                    }
                }
            };

            factors.set(kind, assessment.multiplier);
            assessments.push(assessment);
        }

        FactorEvaluation {
            factors,
            assessments,
        }
    }
}

impl Default for FactorSet {
    fn default() -> Self {
        Self::standard()
    }
}
