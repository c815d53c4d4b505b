//! Weather and local-event calculators

use super::{FactorCalculator, FactorError, FactorKind, FactorOutcome};
use crate::context::{PricingContext, PricingOptions, WeatherCondition};
use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Observations older than this lower the factor's confidence
const STALE_WEATHER_HOURS: i64 = 3;

/// Cap on the combined event uplift
const MAX_EVENT_MULTIPLIER: Decimal = dec!(1.5);

/// Events further away than this have no effect
const EVENT_RADIUS_KM: Decimal = dec!(10);

/// Adverse weather raises prices
#[derive(Debug, Default, Clone, Copy)]
pub struct WeatherFactor;

impl FactorCalculator for WeatherFactor {
    fn kind(&self) -> FactorKind {
        FactorKind::Weather
    }

    fn calculate(
        &self,
        ctx: &PricingContext,
        _opts: &PricingOptions,
    ) -> Result<FactorOutcome, FactorError> {
        let Some(weather) = &ctx.weather else {
            return Ok(FactorOutcome::neutral(dec!(0.7)));
        };

        let multiplier = match weather.condition {
            WeatherCondition::Clear | WeatherCondition::Cloudy => dec!(1.0),
            WeatherCondition::Rain => dec!(1.15),
            WeatherCondition::Snow => dec!(1.25),
            WeatherCondition::Storm => dec!(1.35),
            WeatherCondition::ExtremeHeat => dec!(1.1),
        };

        let age = ctx.timestamp - weather.observed_at;
        let confidence = if age > Duration::hours(STALE_WEATHER_HOURS) {
            dec!(0.6)
        } else {
            dec!(0.9)
        };

        Ok(FactorOutcome::new(multiplier, confidence))
    }
}

/// Nearby events add demand, scaled by attendance and proximity
#[derive(Debug, Default, Clone, Copy)]
pub struct EventFactor;

impl FactorCalculator for EventFactor {
    fn kind(&self) -> FactorKind {
        FactorKind::Event
    }

    fn calculate(
        &self,
        ctx: &PricingContext,
        _opts: &PricingOptions,
    ) -> Result<FactorOutcome, FactorError> {
        if ctx.local_events.is_empty() {
            return Ok(FactorOutcome::neutral(dec!(0.8)));
        }

        let uplift: Decimal = ctx
            .local_events
            .iter()
            .map(|event| {
                let proximity =
                    (Decimal::ONE - event.distance_km / EVENT_RADIUS_KM).max(Decimal::ZERO);
                Decimal::from(event.expected_attendance) / dec!(10000) * dec!(0.05) * proximity
            })
            .sum();

        let multiplier = (Decimal::ONE + uplift).min(MAX_EVENT_MULTIPLIER);
        Ok(FactorOutcome::new(multiplier, dec!(0.85)))
    }
}
