//! Seasonal and time-of-day calculators

use super::{FactorCalculator, FactorError, FactorKind, FactorOutcome};
use crate::context::{PricingContext, PricingOptions, Season};
use chrono::Weekday;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Seasonal demand swing
#[derive(Debug, Default, Clone, Copy)]
pub struct SeasonalFactor;

impl SeasonalFactor {
    pub fn multiplier_for(season: Season) -> Decimal {
        match season {
            Season::Spring => dec!(1.0),
            Season::Summer => dec!(1.1),
            Season::Autumn => dec!(1.0),
            Season::Winter => dec!(1.05),
        }
    }
}

impl FactorCalculator for SeasonalFactor {
    fn kind(&self) -> FactorKind {
        FactorKind::Seasonal
    }

    fn calculate(
        &self,
        ctx: &PricingContext,
        _opts: &PricingOptions,
    ) -> Result<FactorOutcome, FactorError> {
        Ok(FactorOutcome::new(
            Self::multiplier_for(ctx.season),
            dec!(0.9),
        ))
    }
}

/// Peak hours, late-night premium and weekend uplift
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeOfDayFactor;

impl TimeOfDayFactor {
    /// Multiplier for an hour and weekday, shared with the forecaster
    pub fn multiplier_for(hour: u32, day: Weekday) -> Decimal {
        let hourly = match hour {
            7..=9 | 17..=19 => dec!(1.2),
            22..=23 | 0..=5 => dec!(1.15),
            _ => dec!(1.0),
        };
        match day {
            Weekday::Sat | Weekday::Sun => hourly * dec!(1.1),
            _ => hourly,
        }
    }
}

impl FactorCalculator for TimeOfDayFactor {
    fn kind(&self) -> FactorKind {
        FactorKind::Time
    }

    fn calculate(
        &self,
        ctx: &PricingContext,
        _opts: &PricingOptions,
    ) -> Result<FactorOutcome, FactorError> {
        Ok(FactorOutcome::new(
            Self::multiplier_for(ctx.time_of_day, ctx.day_of_week),
            dec!(0.95),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Currency, Location};
    use chrono::{TimeZone, Utc};

    fn ctx_at(y: i32, m: u32, d: u32, h: u32) -> PricingContext {
        let loc = Location::new(51.5, -0.12, Currency::new("GBP").unwrap(), "GB");
        PricingContext::new(loc, Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap())
    }

    #[test]
    fn test_seasonal_summer_premium() {
        let out = SeasonalFactor
            .calculate(&ctx_at(2026, 7, 1, 12), &PricingOptions::default())
            .unwrap();
        assert_eq!(out.multiplier, dec!(1.1));
    }

    #[test]
    fn test_time_of_day_peaks() {
        // 2026-10-14 is a Wednesday
        assert_eq!(TimeOfDayFactor::multiplier_for(8, Weekday::Wed), dec!(1.2));
        assert_eq!(TimeOfDayFactor::multiplier_for(12, Weekday::Wed), dec!(1.0));
        assert_eq!(TimeOfDayFactor::multiplier_for(23, Weekday::Wed), dec!(1.15));
        assert_eq!(TimeOfDayFactor::multiplier_for(12, Weekday::Sat), dec!(1.1));

        let out = TimeOfDayFactor
            .calculate(&ctx_at(2026, 10, 14, 18), &PricingOptions::default())
            .unwrap();
        assert_eq!(out.multiplier, dec!(1.2));
    }

    #[test]
    fn test_every_hour_positive() {
        for day in [Weekday::Mon, Weekday::Sat] {
            for hour in 0..24 {
                assert!(TimeOfDayFactor::multiplier_for(hour, day) > Decimal::ZERO);
            }
        }
    }
}
