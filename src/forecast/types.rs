//! Forecast types

use crate::context::{DemandLevel, ValidationError};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Spacing between forecast points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Hour,
    Day,
    Week,
}

impl Granularity {
    pub fn step(&self) -> Duration {
        match self {
            Granularity::Hour => Duration::hours(1),
            Granularity::Day => Duration::days(1),
            Granularity::Week => Duration::weeks(1),
        }
    }
}

/// Half-open forecast window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ForecastPeriod {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window of `hours` starting at `start`
    pub fn hours_from(start: DateTime<Utc>, hours: i64) -> Self {
        Self::new(start, start + Duration::hours(hours))
    }

    /// Number of ticks at a granularity, rounding a partial last tick up
    pub fn tick_count(&self, granularity: Granularity) -> i64 {
        let span = (self.end - self.start).num_seconds();
        let step = granularity.step().num_seconds();
        if span <= 0 {
            return 0;
        }
        (span + step - 1) / step
    }

    pub fn validate(
        &self,
        granularity: Granularity,
        max_points: usize,
    ) -> Result<(), ValidationError> {
        if self.end <= self.start {
            return Err(ValidationError::new("period", "end must be after start"));
        }
        let ticks = self.tick_count(granularity);
        if ticks > max_points as i64 {
            return Err(ValidationError::new(
                "period",
                format!("{} points exceeds limit of {}", ticks, max_points),
            ));
        }
        Ok(())
    }
}

/// Multipliers behind a forecast point's recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastFactors {
    pub surge: Decimal,
    pub seasonal: Decimal,
    pub time: Decimal,
}

/// Expected demand and pricing at one tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub demand_level: DemandLevel,
    /// Expected demand/supply ratio
    pub ratio: Decimal,
    pub recommended_multiplier: Decimal,
    /// 0-1
    pub confidence: Decimal,
    pub factors: ForecastFactors,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_count() {
        let start = Utc::now();
        let period = ForecastPeriod::hours_from(start, 24);
        assert_eq!(period.tick_count(Granularity::Hour), 24);
        assert_eq!(period.tick_count(Granularity::Day), 1);
        assert_eq!(ForecastPeriod::hours_from(start, 25).tick_count(Granularity::Day), 2);
    }

    #[test]
    fn test_period_validation() {
        let start = Utc::now();
        assert!(ForecastPeriod::new(start, start).validate(Granularity::Hour, 100).is_err());
        assert!(ForecastPeriod::hours_from(start, 200).validate(Granularity::Hour, 100).is_err());
        assert!(ForecastPeriod::hours_from(start, 200).validate(Granularity::Day, 100).is_ok());
    }
}
